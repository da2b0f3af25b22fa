//! HAR Service - human activity recognition over HTTP.
//!
//! A phone records short windows of accelerometer and gyroscope readings and
//! sends them to this service as sktime/aeon `.ts` text. The service
//! classifies each window into an activity label with a ROCKET-style
//! classifier (random convolution kernels feeding a multinomial logistic
//! regression), and accepts labeled windows that grow the training set and
//! trigger a background retrain.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        HAR Service                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │   Dataset   │──▶│   Trainer   │──▶│  Artifact   │        │
//! │  │  (.ts file) │   │ (full refit)│   │ (bincode)   │        │
//! │  └─────────────┘   └─────────────┘   └─────────────┘        │
//! │         ▲                                    │              │
//! │         │                                    ▼              │
//! │  ┌─────────────────────────────────────────────────┐        │
//! │  │   HTTP server: /predict reads the classifier,   │        │
//! │  │   /upload_labeled_activity appends + retrains   │        │
//! │  └─────────────────────────────────────────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use har_service::model::{ActivityClassifier, TrainOptions};
//! use har_service::trainer;
//!
//! // Fit a classifier from an accumulated dataset file and write the
//! // artifact the server loads at startup.
//! let report = trainer::train_from_file(
//!     "train.ts".as_ref(),
//!     "classifier.bin".as_ref(),
//!     6,
//!     100,
//!     &TrainOptions::default(),
//! )
//! .expect("training failed");
//! println!("fitted {} samples", report.samples);
//! ```

pub mod config;
pub mod dataset;
pub mod model;
pub mod server;
pub mod trainer;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use dataset::{DatasetStore, FormatError, StoreError, TsDocument, TsHeader, TsSample};
pub use model::{ActivityClassifier, ModelError, RocketTransform, TrainOptions};
pub use server::{ServerConfig, TrainingStatus};
pub use trainer::{TrainReport, TrainerError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
