//! HAR Service CLI
//!
//! Trains the activity classifier and serves it over HTTP.

use clap::{Parser, Subcommand};
use har_service::{
    config::Config,
    dataset,
    model::{ActivityClassifier, TrainOptions},
    server::{self, ServerConfig},
    trainer, VERSION,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "har-service")]
#[command(version = VERSION)]
#[command(about = "Human activity recognition service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long)]
        port: Option<u16>,

        /// Path to the dataset file
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Path to the model artifact
        #[arg(long)]
        model: Option<PathBuf>,
    },

    /// Train the classifier from the accumulated dataset
    Train {
        /// Path to the dataset file
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Path to the model artifact
        #[arg(long)]
        model: Option<PathBuf>,
    },

    /// Classify the samples in a local .ts file
    Predict {
        /// The .ts file to classify
        file: PathBuf,

        /// Path to the model artifact
        #[arg(long)]
        model: Option<PathBuf>,
    },

    /// Show configuration
    Config,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            dataset,
            model,
        } => {
            cmd_serve(host, port, dataset, model);
        }
        Commands::Train { dataset, model } => {
            cmd_train(dataset, model);
        }
        Commands::Predict { file, model } => {
            cmd_predict(file, model);
        }
        Commands::Config => {
            cmd_config();
        }
    }
}

/// Load the configuration and apply CLI overrides.
fn resolve_config(
    host: Option<String>,
    port: Option<u16>,
    dataset: Option<PathBuf>,
    model: Option<PathBuf>,
) -> Config {
    let mut config = Config::load().unwrap_or_default();
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(dataset) = dataset {
        config.dataset_path = dataset;
    }
    if let Some(model) = model {
        config.model_path = model;
    }
    config
}

fn cmd_serve(
    host: Option<String>,
    port: Option<u16>,
    dataset: Option<PathBuf>,
    model: Option<PathBuf>,
) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "har_service=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = resolve_config(host, port, dataset, model);
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }
    if !config.dataset_path.exists() {
        eprintln!(
            "Warning: Dataset file {:?} does not exist; uploads will fail until it is created",
            config.dataset_path
        );
    }

    println!("HAR Service v{VERSION}");
    println!("  Dataset: {:?}", config.dataset_path);
    println!("  Model:   {:?}", config.model_path);
    println!("  Uploads: {:?}", config.uploads_dir);
    println!();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting async runtime: {e}");
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(async {
        let (addr, shutdown_tx) = server::run(ServerConfig::from_config(&config)).await?;
        println!("Listening on http://{addr}");
        println!("Press Ctrl+C to stop");

        tokio::signal::ctrl_c().await?;
        println!();
        println!("Shutting down...");
        let _ = shutdown_tx.send(());

        Ok::<(), anyhow::Error>(())
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_train(dataset: Option<PathBuf>, model: Option<PathBuf>) {
    let config = resolve_config(None, None, dataset, model);

    println!("Training classifier");
    println!("  Dataset: {:?}", config.dataset_path);
    println!("  Model:   {:?}", config.model_path);
    println!("  Kernels: {}", config.num_kernels);
    println!();

    let options = TrainOptions {
        num_kernels: config.num_kernels,
        seed: config.seed,
        ..TrainOptions::default()
    };

    match trainer::train_from_file(
        &config.dataset_path,
        &config.model_path,
        config.num_channels,
        config.series_length,
        &options,
    ) {
        Ok(report) => {
            println!("Training complete in {:.2}s", report.elapsed_secs);
            println!("  Samples:  {}", report.samples);
            println!("  Labels:   {}", report.labels.join(" "));
            println!(
                "  Training accuracy: {:.1}%",
                report.training_accuracy * 100.0
            );
        }
        Err(e) => {
            eprintln!("Error: training failed: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_predict(file: PathBuf, model: Option<PathBuf>) {
    let config = resolve_config(None, None, None, model);

    let classifier = match ActivityClassifier::load(&config.model_path) {
        Ok(clf) => clf,
        Err(e) => {
            eprintln!("Error: could not load model artifact: {e}");
            eprintln!("Train one first with `har-service train`.");
            std::process::exit(1);
        }
    };

    let text = match std::fs::read_to_string(&file) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error reading {file:?}: {e}");
            std::process::exit(1);
        }
    };

    let doc = match dataset::parse(&text) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Error parsing {file:?}: {e}");
            std::process::exit(1);
        }
    };

    match classifier.predict_batch(&doc.samples) {
        Ok(labels) => {
            for (i, label) in labels.iter().enumerate() {
                println!("Sample {}: {label}", i + 1);
            }
        }
        Err(e) => {
            eprintln!("Error: prediction failed: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}
