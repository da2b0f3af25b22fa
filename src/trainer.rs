//! Full-dataset training.
//!
//! Every run reads the whole accumulated dataset, fits a fresh classifier
//! and overwrites the artifact. There is no incremental mode: retraining
//! cost grows with the dataset, which is why the server runs this off the
//! request path.

use crate::dataset::{DatasetStore, StoreError};
use crate::model::{ActivityClassifier, ModelError, TrainOptions};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

/// Summary of a completed training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainReport {
    /// Number of samples fitted
    pub samples: usize,
    /// Label set seen at training time
    pub labels: Vec<String>,
    /// Fraction of training samples the fitted model classifies correctly
    pub training_accuracy: f64,
    /// Wall-clock training time in seconds
    pub elapsed_secs: f64,
}

/// Trainer errors.
#[derive(Debug)]
pub enum TrainerError {
    Dataset(StoreError),
    Model(ModelError),
}

impl std::fmt::Display for TrainerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrainerError::Dataset(e) => write!(f, "dataset error: {e}"),
            TrainerError::Model(e) => write!(f, "model error: {e}"),
        }
    }
}

impl std::error::Error for TrainerError {}

impl From<StoreError> for TrainerError {
    fn from(e: StoreError) -> Self {
        TrainerError::Dataset(e)
    }
}

impl From<ModelError> for TrainerError {
    fn from(e: ModelError) -> Self {
        TrainerError::Model(e)
    }
}

/// Train a classifier from the dataset file and write the artifact.
///
/// The sample shape comes from the dataset header when declared, falling
/// back to the passed defaults. Any unreadable file or malformed sample
/// aborts the run before the artifact is touched; the write itself is
/// atomic, so a failed run never leaves a partial artifact behind.
pub fn train_from_file(
    dataset_path: &Path,
    model_path: &Path,
    num_channels: usize,
    series_length: usize,
    options: &TrainOptions,
) -> Result<TrainReport, TrainerError> {
    let started = Instant::now();

    let doc = DatasetStore::new(dataset_path).load()?;
    let num_channels = doc.header.dimensions.unwrap_or(num_channels);
    let series_length = doc.header.series_length.unwrap_or(series_length);

    let classifier =
        ActivityClassifier::train(&doc.samples, num_channels, series_length, options)?;

    let predictions = classifier.predict_batch(&doc.samples)?;
    let correct = predictions
        .iter()
        .zip(doc.samples.iter())
        .filter(|(pred, sample)| sample.label.as_deref() == Some(pred.as_str()))
        .count();

    classifier.save(model_path)?;

    Ok(TrainReport {
        samples: doc.samples.len(),
        labels: classifier.labels().to_vec(),
        training_accuracy: correct as f64 / doc.samples.len() as f64,
        elapsed_secs: started.elapsed().as_secs_f64(),
    })
}
