//! The activity classifier and its on-disk artifact.
//!
//! Random convolution features ([`RocketTransform`]) feed a multinomial
//! logistic regression. The fitted transform, the fitted linear model and
//! the label set serialize together as one bincode artifact, produced whole
//! by training and consumed whole at load.

use crate::dataset::TsSample;
use crate::model::rocket::RocketTransform;
use linfa::prelude::*;
use linfa_logistic::{MultiFittedLogisticRegression, MultiLogisticRegression};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Knobs for a training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainOptions {
    /// Number of random convolution kernels
    pub num_kernels: usize,
    /// Seed for kernel sampling
    pub seed: u64,
    /// Iteration cap for the logistic regression solver
    pub max_iterations: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            num_kernels: crate::config::DEFAULT_NUM_KERNELS,
            seed: 42,
            max_iterations: 200,
        }
    }
}

/// A fitted activity classifier.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActivityClassifier {
    transform: RocketTransform,
    model: MultiFittedLogisticRegression<f64, String>,
    labels: Vec<String>,
}

impl ActivityClassifier {
    /// Fit a classifier on labeled samples.
    ///
    /// Every sample must carry a label and match the declared shape. The
    /// full batch is fitted in one shot; there is no incremental mode.
    pub fn train(
        samples: &[TsSample],
        num_channels: usize,
        series_length: usize,
        options: &TrainOptions,
    ) -> Result<Self, ModelError> {
        if samples.is_empty() {
            return Err(ModelError::EmptyDataset);
        }

        let mut targets = Vec::with_capacity(samples.len());
        for (i, sample) in samples.iter().enumerate() {
            sample
                .validate_shape(num_channels, series_length)
                .map_err(|e| ModelError::InvalidSample(format!("sample {i}: {e}")))?;
            let label = sample
                .label
                .clone()
                .ok_or_else(|| ModelError::InvalidSample(format!("sample {i} has no label")))?;
            targets.push(label);
        }

        let labels: Vec<String> = targets
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if labels.len() < 2 {
            return Err(ModelError::Train(format!(
                "need at least two distinct labels, got {}",
                labels.len()
            )));
        }

        let transform =
            RocketTransform::fit(options.num_kernels, num_channels, series_length, options.seed);
        let records = transform.transform(samples);
        let dataset = Dataset::new(records, Array1::from_vec(targets));

        let model = MultiLogisticRegression::default()
            .max_iterations(options.max_iterations)
            .fit(&dataset)
            .map_err(|e| ModelError::Train(e.to_string()))?;

        Ok(Self {
            transform,
            model,
            labels,
        })
    }

    /// Predict the activity label for one sample.
    pub fn predict(&self, sample: &TsSample) -> Result<String, ModelError> {
        sample
            .validate_shape(self.transform.num_channels(), self.transform.series_length())
            .map_err(|e| ModelError::InvalidSample(e.to_string()))?;

        let features = self.transform.transform(std::slice::from_ref(sample));
        let predictions = self.model.predict(&features);
        predictions
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::Train("classifier produced no prediction".to_string()))
    }

    /// Predict labels for a batch of samples.
    pub fn predict_batch(&self, samples: &[TsSample]) -> Result<Vec<String>, ModelError> {
        for (i, sample) in samples.iter().enumerate() {
            sample
                .validate_shape(self.transform.num_channels(), self.transform.series_length())
                .map_err(|e| ModelError::InvalidSample(format!("sample {i}: {e}")))?;
        }
        let features = self.transform.transform(samples);
        Ok(self.model.predict(&features).into_iter().collect())
    }

    /// The sorted set of labels seen at training time.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Expected sample shape, as `(num_channels, series_length)`.
    pub fn expected_shape(&self) -> (usize, usize) {
        (
            self.transform.num_channels(),
            self.transform.series_length(),
        )
    }

    /// Serialize the classifier to disk.
    ///
    /// The artifact is written to a temporary sibling and renamed into
    /// place, so a concurrent load never observes a half-written file and a
    /// failed run leaves any prior artifact intact.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let bytes =
            bincode::serialize(self).map_err(|e| ModelError::Encode(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ModelError::Io(e.to_string()))?;
        }

        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, bytes).map_err(|e| ModelError::Io(e.to_string()))?;
        std::fs::rename(&tmp, path).map_err(|e| ModelError::Io(e.to_string()))?;
        Ok(())
    }

    /// Load a serialized classifier from disk.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let bytes = std::fs::read(path).map_err(|e| ModelError::Io(e.to_string()))?;
        bincode::deserialize(&bytes).map_err(|e| ModelError::Decode(e.to_string()))
    }
}

/// Classifier errors.
#[derive(Debug)]
pub enum ModelError {
    /// Training was attempted on an empty sample set
    EmptyDataset,
    /// A sample failed shape or label checks
    InvalidSample(String),
    /// The underlying solver failed
    Train(String),
    /// Artifact file access failed
    Io(String),
    /// Artifact serialization failed
    Encode(String),
    /// Artifact deserialization failed
    Decode(String),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::EmptyDataset => write!(f, "training set is empty"),
            ModelError::InvalidSample(e) => write!(f, "invalid sample: {e}"),
            ModelError::Train(e) => write!(f, "training failed: {e}"),
            ModelError::Io(e) => write!(f, "artifact IO error: {e}"),
            ModelError::Encode(e) => write!(f, "artifact encode error: {e}"),
            ModelError::Decode(e) => write!(f, "artifact decode error: {e}"),
        }
    }
}

impl std::error::Error for ModelError {}

#[cfg(test)]
mod tests {
    use super::*;

    const CHANNELS: usize = 2;
    const LENGTH: usize = 20;

    fn options() -> TrainOptions {
        TrainOptions {
            num_kernels: 50,
            seed: 1,
            max_iterations: 200,
        }
    }

    fn still_sample() -> TsSample {
        TsSample {
            channels: vec![vec![0.0; LENGTH]; CHANNELS],
            label: Some("sitting".to_string()),
        }
    }

    fn moving_sample(phase: f64) -> TsSample {
        let series: Vec<f64> = (0..LENGTH)
            .map(|i| ((i as f64 + phase) * 0.9).sin() * 5.0)
            .collect();
        TsSample {
            channels: vec![series.clone(), series],
            label: Some("jogging".to_string()),
        }
    }

    fn training_set() -> Vec<TsSample> {
        let mut samples = Vec::new();
        for i in 0..4 {
            samples.push(still_sample());
            samples.push(moving_sample(i as f64));
        }
        samples
    }

    #[test]
    fn test_train_and_predict() {
        let samples = training_set();
        let clf = ActivityClassifier::train(&samples, CHANNELS, LENGTH, &options()).unwrap();

        assert_eq!(clf.labels(), &["jogging".to_string(), "sitting".to_string()]);
        assert_eq!(clf.predict(&still_sample()).unwrap(), "sitting");
        assert_eq!(clf.predict(&moving_sample(0.0)).unwrap(), "jogging");
    }

    #[test]
    fn test_predictions_stay_in_label_set() {
        let samples = training_set();
        let clf = ActivityClassifier::train(&samples, CHANNELS, LENGTH, &options()).unwrap();

        let odd: Vec<f64> = (0..LENGTH).map(|i| (i % 3) as f64 - 1.0).collect();
        let label = clf
            .predict(&TsSample {
                channels: vec![odd.clone(), odd],
                label: None,
            })
            .unwrap();
        assert!(clf.labels().contains(&label));
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let err = ActivityClassifier::train(&[], CHANNELS, LENGTH, &options()).unwrap_err();
        assert!(matches!(err, ModelError::EmptyDataset));
    }

    #[test]
    fn test_single_class_rejected() {
        let samples = vec![still_sample(), still_sample()];
        let err =
            ActivityClassifier::train(&samples, CHANNELS, LENGTH, &options()).unwrap_err();
        assert!(matches!(err, ModelError::Train(_)));
    }

    #[test]
    fn test_unlabeled_sample_rejected() {
        let mut samples = training_set();
        samples[0].label = None;
        let err =
            ActivityClassifier::train(&samples, CHANNELS, LENGTH, &options()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidSample(_)));
    }

    #[test]
    fn test_wrong_shape_rejected_at_predict() {
        let samples = training_set();
        let clf = ActivityClassifier::train(&samples, CHANNELS, LENGTH, &options()).unwrap();

        let short = TsSample {
            channels: vec![vec![0.0; LENGTH / 2]; CHANNELS],
            label: None,
        };
        assert!(matches!(
            clf.predict(&short).unwrap_err(),
            ModelError::InvalidSample(_)
        ));
    }

    #[test]
    fn test_artifact_roundtrip() {
        let samples = training_set();
        let clf = ActivityClassifier::train(&samples, CHANNELS, LENGTH, &options()).unwrap();

        let path = std::env::temp_dir().join("har-classifier-roundtrip.bin");
        clf.save(&path).unwrap();

        let loaded = ActivityClassifier::load(&path).unwrap();
        assert_eq!(loaded.labels(), clf.labels());
        assert_eq!(
            loaded.predict(&still_sample()).unwrap(),
            clf.predict(&still_sample()).unwrap()
        );
    }

    #[test]
    fn test_load_missing_artifact_fails() {
        let path = std::env::temp_dir().join("har-classifier-nonexistent.bin");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            ActivityClassifier::load(&path).unwrap_err(),
            ModelError::Io(_)
        ));
    }

    #[test]
    fn test_corrupt_artifact_fails_to_decode() {
        let path = std::env::temp_dir().join("har-classifier-corrupt.bin");
        std::fs::write(&path, b"not a classifier").unwrap();
        assert!(matches!(
            ActivityClassifier::load(&path).unwrap_err(),
            ModelError::Decode(_)
        ));
    }
}
