//! Random convolution kernel features for time-series classification.
//!
//! This is the ROCKET transform: a large set of kernels with random lengths,
//! weights, biases, dilations and paddings is sampled once, and every series
//! is summarized by two numbers per kernel: the proportion of positive
//! convolution values (PPV) and the maximum value. The resulting feature
//! vector feeds a linear classifier.

use crate::dataset::TsSample;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Candidate kernel lengths.
const KERNEL_LENGTHS: [usize; 3] = [7, 9, 11];

/// One random convolution kernel, bound to a single input channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocketKernel {
    /// Index of the channel this kernel convolves
    pub channel: usize,
    /// Mean-centered kernel weights
    pub weights: Vec<f64>,
    /// Additive bias
    pub bias: f64,
    /// Spacing between kernel taps
    pub dilation: usize,
    /// Zero padding applied to both ends of the series
    pub padding: usize,
}

impl RocketKernel {
    /// Convolve the kernel over one series and pool the activations.
    ///
    /// Returns `(ppv, max)`. A kernel whose dilated span exceeds the padded
    /// series has no valid positions and pools to `(0.0, 0.0)`.
    pub fn apply(&self, series: &[f64]) -> (f64, f64) {
        let len = series.len() as isize;
        let span = ((self.weights.len() - 1) * self.dilation) as isize;
        let pad = self.padding as isize;

        let start = -pad;
        let end = len + pad - span;

        let mut positive = 0usize;
        let mut count = 0usize;
        let mut max = f64::NEG_INFINITY;

        let mut pos = start;
        while pos < end {
            let mut sum = self.bias;
            for (j, w) in self.weights.iter().enumerate() {
                let idx = pos + (j * self.dilation) as isize;
                if idx >= 0 && idx < len {
                    sum += w * series[idx as usize];
                }
            }
            if sum > max {
                max = sum;
            }
            if sum > 0.0 {
                positive += 1;
            }
            count += 1;
            pos += 1;
        }

        if count == 0 {
            (0.0, 0.0)
        } else {
            (positive as f64 / count as f64, max)
        }
    }
}

/// A fitted set of random kernels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocketTransform {
    num_channels: usize,
    series_length: usize,
    kernels: Vec<RocketKernel>,
}

impl RocketTransform {
    /// Sample `num_kernels` kernels for series of the given shape.
    ///
    /// Deterministic for a fixed seed, so retraining with an unchanged
    /// configuration reproduces the same feature space.
    pub fn fit(num_kernels: usize, num_channels: usize, series_length: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).expect("unit normal is well-formed");

        let kernels = (0..num_kernels)
            .map(|_| {
                let length = KERNEL_LENGTHS[rng.gen_range(0..KERNEL_LENGTHS.len())];

                let mut weights: Vec<f64> =
                    (0..length).map(|_| normal.sample(&mut rng)).collect();
                let mean = weights.iter().sum::<f64>() / length as f64;
                for w in &mut weights {
                    *w -= mean;
                }

                let bias = rng.gen_range(-1.0..1.0);

                // Dilation is sampled on a log scale, capped so the dilated
                // kernel still fits the series.
                let max_exponent = (((series_length.max(2) - 1) as f64)
                    / ((length - 1) as f64))
                    .log2()
                    .max(0.0);
                let dilation = (2f64.powf(rng.gen_range(0.0..=max_exponent)) as usize).max(1);

                let padding = if rng.gen_bool(0.5) {
                    ((length - 1) * dilation) / 2
                } else {
                    0
                };

                RocketKernel {
                    channel: rng.gen_range(0..num_channels),
                    weights,
                    bias,
                    dilation,
                    padding,
                }
            })
            .collect();

        Self {
            num_channels,
            series_length,
            kernels,
        }
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn series_length(&self) -> usize {
        self.series_length
    }

    /// Number of features produced per sample (two per kernel).
    pub fn num_features(&self) -> usize {
        self.kernels.len() * 2
    }

    /// Compute the feature vector for one sample.
    ///
    /// The sample must have been shape-validated: every kernel's channel
    /// index is within `num_channels`.
    pub fn transform_sample(&self, sample: &TsSample) -> Vec<f64> {
        let mut features = Vec::with_capacity(self.num_features());
        for kernel in &self.kernels {
            let (ppv, max) = kernel.apply(&sample.channels[kernel.channel]);
            features.push(ppv);
            features.push(max);
        }
        features
    }

    /// Compute the feature matrix for a batch of samples.
    pub fn transform(&self, samples: &[TsSample]) -> Array2<f64> {
        let cols = self.num_features();
        let mut flat = Vec::with_capacity(samples.len() * cols);
        for sample in samples {
            flat.extend(self.transform_sample(sample));
        }
        Array2::from_shape_vec((samples.len(), cols), flat)
            .expect("feature rows have uniform width")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(values: Vec<f64>) -> TsSample {
        TsSample {
            channels: vec![values.clone(), values],
            label: None,
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let a = RocketTransform::fit(20, 2, 50, 7);
        let b = RocketTransform::fit(20, 2, 50, 7);
        assert_eq!(a.kernels, b.kernels);

        let c = RocketTransform::fit(20, 2, 50, 8);
        assert_ne!(a.kernels, c.kernels);
    }

    #[test]
    fn test_kernel_channels_in_range() {
        let transform = RocketTransform::fit(100, 6, 100, 1);
        assert!(transform.kernels.iter().all(|k| k.channel < 6));
    }

    #[test]
    fn test_weights_are_centered() {
        let transform = RocketTransform::fit(50, 2, 100, 3);
        for kernel in &transform.kernels {
            let mean = kernel.weights.iter().sum::<f64>() / kernel.weights.len() as f64;
            assert!(mean.abs() < 1e-9);
        }
    }

    #[test]
    fn test_ppv_in_unit_interval() {
        let transform = RocketTransform::fit(50, 2, 30, 11);
        let features = transform.transform_sample(&sample((0..30).map(|i| i as f64).collect()));
        for pair in features.chunks(2) {
            assert!((0.0..=1.0).contains(&pair[0]), "ppv {} out of range", pair[0]);
        }
    }

    #[test]
    fn test_transform_shape() {
        let transform = RocketTransform::fit(25, 2, 10, 5);
        let samples = vec![
            sample(vec![0.0; 10]),
            sample(vec![1.0; 10]),
            sample(vec![-1.0; 10]),
        ];
        let matrix = transform.transform(&samples);
        assert_eq!(matrix.shape(), &[3, 50]);
    }

    #[test]
    fn test_short_series_does_not_panic() {
        let transform = RocketTransform::fit(40, 1, 4, 2);
        let s = TsSample {
            channels: vec![vec![1.0, -1.0, 1.0, -1.0]],
            label: None,
        };
        let features = transform.transform_sample(&s);
        assert_eq!(features.len(), 80);
        assert!(features.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_distinct_signals_get_distinct_features() {
        let transform = RocketTransform::fit(50, 2, 20, 9);
        let quiet = transform.transform_sample(&sample(vec![0.0; 20]));
        let active =
            transform.transform_sample(&sample((0..20).map(|i| (i as f64).sin() * 5.0).collect()));
        assert_ne!(quiet, active);
    }
}
