//! Classification for the HAR service.
//!
//! This module contains:
//! - The ROCKET random-kernel feature transform
//! - The fitted classifier and its serialized artifact

pub mod classifier;
pub mod rocket;

// Re-export commonly used types
pub use classifier::{ActivityClassifier, ModelError, TrainOptions};
pub use rocket::{RocketKernel, RocketTransform};
