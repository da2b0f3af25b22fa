//! HTTP server for activity prediction and labeled uploads.
//!
//! This module provides an HTTP server that:
//! - Classifies raw sensor readings via POST /predict
//! - Accepts labeled samples via POST /upload_labeled_activity, appending
//!   them to the dataset and retraining in the background
//! - Exposes retrain progress via GET /training_status
//!
//! # Architecture
//!
//! ```text
//! Phone App ──→ POST /predict ────────────→ [RwLock classifier] ──→ label
//!          ──→ POST /upload_labeled_activity
//!                    │
//!                    ├─→ uploads/<uuid>.ts (audit record)
//!                    ├─→ dataset file append + header update
//!                    └─→ background retrain ──→ artifact ──→ swap classifier
//! ```

use crate::config::Config;
use crate::dataset::{self, DatasetStore};
use crate::model::{ActivityClassifier, ModelError, TrainOptions};
use crate::trainer;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Path to the accumulating dataset file
    pub dataset_path: PathBuf,
    /// Path to the classifier artifact
    pub model_path: PathBuf,
    /// Directory for upload audit records
    pub uploads_dir: PathBuf,
    /// Expected number of channels per sample
    pub num_channels: usize,
    /// Expected number of readings per channel
    pub series_length: usize,
    /// Training knobs used by background retrains
    pub train_options: TrainOptions,
}

impl ServerConfig {
    /// Build a server configuration from the service configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            dataset_path: config.dataset_path.clone(),
            model_path: config.model_path.clone(),
            uploads_dir: config.uploads_dir.clone(),
            num_channels: config.num_channels,
            series_length: config.series_length,
            train_options: TrainOptions {
                num_kernels: config.num_kernels,
                seed: config.seed,
                ..TrainOptions::default()
            },
        }
    }
}

/// Background retrain progress, exposed via GET /training_status.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TrainingStatus {
    Idle,
    Running {
        started_at: DateTime<Utc>,
    },
    Completed {
        finished_at: DateTime<Utc>,
        samples: usize,
        training_accuracy: f64,
    },
    Failed {
        failed_at: DateTime<Utc>,
        error: String,
    },
}

/// Shared server state
pub struct ServerState {
    /// The serving classifier. Predictions take the read lock; a finished
    /// retrain swaps the value under the write lock, so readers never see
    /// a half-replaced classifier.
    classifier: RwLock<ActivityClassifier>,
    /// The dataset file; all mutation happens under this lock
    dataset: Mutex<DatasetStore>,
    /// Latest retrain status
    training: RwLock<TrainingStatus>,
    /// Set when an upload wants a retrain; consumed by the worker
    retrain_pending: AtomicBool,
    /// Set while a retrain worker is alive
    retrain_active: AtomicBool,
    /// Server configuration
    config: ServerConfig,
}

impl ServerState {
    /// Load the artifact and build the server state.
    ///
    /// A missing or corrupt artifact is startup-fatal: without a classifier
    /// the server cannot answer any prediction.
    pub fn new(config: ServerConfig) -> Result<Self, ModelError> {
        let classifier = ActivityClassifier::load(&config.model_path)?;

        Ok(Self {
            classifier: RwLock::new(classifier),
            dataset: Mutex::new(DatasetStore::new(config.dataset_path.clone())),
            training: RwLock::new(TrainingStatus::Idle),
            retrain_pending: AtomicBool::new(false),
            retrain_active: AtomicBool::new(false),
            config,
        })
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn invalid_sample(error: String) -> HandlerError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error,
            code: "INVALID_SAMPLE".to_string(),
        }),
    )
}

fn internal(code: &str, error: String) -> HandlerError {
    tracing::error!("{code}: {error}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error,
            code: code.to_string(),
        }),
    )
}

/// GET /
async fn welcome() -> &'static str {
    "Welcome to the HAR Server!"
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /training_status
async fn training_status(State(state): State<Arc<ServerState>>) -> Json<TrainingStatus> {
    Json(state.training.read().await.clone())
}

/// POST /predict
///
/// The body is `.ts`-formatted sample text. The first sample is classified
/// and the label returned as a plain-text sentence.
async fn predict(
    State(state): State<Arc<ServerState>>,
    body: String,
) -> Result<String, HandlerError> {
    let doc = dataset::parse(&body).map_err(|e| invalid_sample(e.to_string()))?;

    // parse() guarantees at least one sample.
    let sample = &doc.samples[0];
    sample
        .validate_shape(state.config.num_channels, state.config.series_length)
        .map_err(|e| invalid_sample(e.to_string()))?;

    let label = {
        let classifier = state.classifier.read().await;
        classifier.predict(sample).map_err(|e| match e {
            ModelError::InvalidSample(msg) => invalid_sample(msg),
            other => internal("MODEL_ERROR", other.to_string()),
        })?
    };

    tracing::info!("Prediction: {label}");
    Ok(format!("You are performing {label}"))
}

/// POST /upload_labeled_activity
///
/// The body is one bare data line with a trailing `:<label>` token. The
/// sample is appended to the dataset, the header's label enumeration is
/// updated idempotently, and a background retrain is scheduled. The
/// response does not wait for training; progress is visible via
/// GET /training_status.
async fn upload_labeled_activity(
    State(state): State<Arc<ServerState>>,
    body: String,
) -> Result<String, HandlerError> {
    let line = body.trim();
    let (data, label) = dataset::split_trailing_label(line)
        .ok_or_else(|| invalid_sample("missing trailing :<label> token".to_string()))?;
    if label.is_empty() {
        return Err(invalid_sample("empty label".to_string()));
    }

    dataset::validate_series_length(data, state.config.num_channels, state.config.series_length)
        .map_err(|e| invalid_sample(e.to_string()))?;

    // Refuse to persist anything the retrain could not parse back.
    dataset::parse_data_line(data, 1, false).map_err(|e| invalid_sample(e.to_string()))?;

    // Audit record of the verbatim upload. Best effort: losing the record
    // does not lose the sample.
    let audit_path = state
        .config
        .uploads_dir
        .join(format!("{}.ts", uuid::Uuid::new_v4()));
    if let Err(e) = std::fs::write(&audit_path, line) {
        tracing::warn!("Failed to write upload audit record {audit_path:?}: {e}");
    }

    {
        let store = state.dataset.lock().await;
        store
            .append_sample(data, label)
            .map_err(|e| internal("IO_ERROR", e.to_string()))?;
    }

    tracing::info!("Stored labeled sample for {label}, scheduling retrain");
    schedule_retrain(state.clone());

    Ok(format!("Data for {label} was received and saved"))
}

/// Request a background retrain.
///
/// Requests coalesce: one worker drains the pending flag in a loop, so a
/// burst of uploads costs at most the in-flight run plus one follow-up,
/// and the final run always sees the latest dataset.
fn schedule_retrain(state: Arc<ServerState>) {
    state.retrain_pending.store(true, Ordering::SeqCst);
    if state.retrain_active.swap(true, Ordering::SeqCst) {
        return;
    }

    tokio::spawn(async move {
        loop {
            while state.retrain_pending.swap(false, Ordering::SeqCst) {
                run_retrain(&state).await;
            }
            state.retrain_active.store(false, Ordering::SeqCst);

            // A request that landed between the drain and the flag clear
            // must not be lost; reclaim the worker role or hand it over.
            if !state.retrain_pending.load(Ordering::SeqCst)
                || state.retrain_active.swap(true, Ordering::SeqCst)
            {
                break;
            }
        }
    });
}

/// Run one full retrain and swap the classifier on success.
async fn run_retrain(state: &Arc<ServerState>) {
    *state.training.write().await = TrainingStatus::Running {
        started_at: Utc::now(),
    };
    tracing::info!("Retraining classifier from {:?}", state.config.dataset_path);

    let dataset_path = state.config.dataset_path.clone();
    let model_path = state.config.model_path.clone();
    let num_channels = state.config.num_channels;
    let series_length = state.config.series_length;
    let options = state.config.train_options.clone();

    let result = tokio::task::spawn_blocking(move || {
        trainer::train_from_file(
            &dataset_path,
            &model_path,
            num_channels,
            series_length,
            &options,
        )
    })
    .await;

    let outcome = match result {
        Ok(Ok(report)) => match ActivityClassifier::load(&state.config.model_path) {
            Ok(new_classifier) => {
                *state.classifier.write().await = new_classifier;
                tracing::info!(
                    samples = report.samples,
                    accuracy = report.training_accuracy,
                    elapsed_secs = report.elapsed_secs,
                    "Retrain complete, classifier swapped"
                );
                TrainingStatus::Completed {
                    finished_at: Utc::now(),
                    samples: report.samples,
                    training_accuracy: report.training_accuracy,
                }
            }
            Err(e) => {
                tracing::error!("Failed to reload artifact after retrain: {e}");
                TrainingStatus::Failed {
                    failed_at: Utc::now(),
                    error: e.to_string(),
                }
            }
        },
        Ok(Err(e)) => {
            // The prior classifier keeps serving.
            tracing::error!("Retrain failed: {e}");
            TrainingStatus::Failed {
                failed_at: Utc::now(),
                error: e.to_string(),
            }
        }
        Err(e) => {
            tracing::error!("Retrain task panicked: {e}");
            TrainingStatus::Failed {
                failed_at: Utc::now(),
                error: e.to_string(),
            }
        }
    };

    *state.training.write().await = outcome;
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    std::fs::create_dir_all(&config.uploads_dir)?;

    let host = config.host.clone();
    let port = config.port;
    let state = Arc::new(ServerState::new(config).map_err(|e| {
        anyhow::anyhow!("cannot load model artifact (train one first with `har-service train`): {e}")
    })?);

    let app = Router::new()
        .route("/", get(welcome))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/upload_labeled_activity", post(upload_labeled_activity))
        .route("/training_status", get(training_status))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address {host}:{port}: {e}"))?;
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("HAR server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {e}");
        }
    });

    Ok((actual_addr, shutdown_tx))
}
