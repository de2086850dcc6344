//! Model inference for windows.

mod classifier;

pub use classifier::{OnnxClassifier, read_labels};

use crate::error::BoxError;
use crate::geo::Size;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// One class prediction for a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Class label.
    pub label: String,
    /// Confidence in [0, 1].
    pub confidence: f32,
}

impl Prediction {
    /// Create a prediction.
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// A model that classifies window pixels.
///
/// Implementations must be callable from several worker threads at once.
pub trait InferenceClient: Send + Sync {
    /// Predictions for one window, highest confidence first.
    fn predict(&self, pixels: &RgbImage) -> Result<Vec<Prediction>, BoxError>;

    /// Input size the model is fixed to, `None` when it accepts any size.
    /// Windows are resampled to this size before [`Self::predict`].
    fn input_size(&self) -> Option<Size> {
        None
    }
}

/// Device used for inference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceDevice {
    /// CUDA GPU.
    #[default]
    Gpu,
    /// CPU only.
    Cpu,
}

impl std::fmt::Display for InferenceDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gpu => write!(f, "GPU"),
            Self::Cpu => write!(f, "CPU"),
        }
    }
}
