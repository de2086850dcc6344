//! ONNX image classifier.

use super::{InferenceClient, InferenceDevice, Prediction};
use crate::error::{BoxError, Error, Result};
use crate::geo::Size;
use image::RgbImage;
use image::imageops::{self, FilterType};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::{Tensor, ValueType};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Image classifier backed by an ONNX Runtime session.
///
/// The model takes a single NCHW float input of RGB values scaled to [0, 1]
/// and produces one score per label. The session is shared by all workers
/// and serialized internally.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    labels: Vec<String>,
    input_size: Option<Size>,
    top_k: usize,
}

impl OnnxClassifier {
    /// Load a model and its labels.
    ///
    /// The input size is read from the model's first input; dynamic height
    /// or width leave it open.
    pub fn new(
        model: &Path,
        labels: &Path,
        device: InferenceDevice,
        top_k: usize,
    ) -> Result<Self> {
        let labels = read_labels(labels)?;
        if labels.is_empty() {
            return Err(Error::ClassifierBuild {
                reason: "labels file contains no labels".to_string(),
            });
        }

        let session = build_session(model, device).map_err(|e| Error::ClassifierBuild {
            reason: format!("{}: {e}", model.display()),
        })?;
        let input_size = model_input_size(&session)?;

        info!(
            "Loaded model: {}, {} labels, input {}, device: {}",
            model.display(),
            labels.len(),
            input_size.map_or_else(|| "dynamic".to_string(), |s| s.to_string()),
            device
        );

        Ok(Self {
            session: Mutex::new(session),
            labels,
            input_size,
            top_k: top_k.max(1),
        })
    }

    fn to_tensor(&self, pixels: &RgbImage) -> std::result::Result<Tensor<f32>, BoxError> {
        let (width, height) = self
            .input_size
            .map_or_else(|| pixels.dimensions(), |s| (s.width, s.height));
        let resized;
        let pixels = if pixels.dimensions() == (width, height) {
            pixels
        } else {
            resized = imageops::resize(pixels, width, height, FilterType::Triangle);
            &resized
        };

        let plane = (width * height) as usize;
        let mut data = vec![0.0_f32; 3 * plane];
        for (i, p) in pixels.pixels().enumerate() {
            for c in 0..3 {
                data[c * plane + i] = f32::from(p[c]) / 255.0;
            }
        }
        let shape = [1_usize, 3, height as usize, width as usize];
        Ok(Tensor::from_array((shape, data))?)
    }
}

impl InferenceClient for OnnxClassifier {
    fn predict(&self, pixels: &RgbImage) -> std::result::Result<Vec<Prediction>, BoxError> {
        let input = self.to_tensor(pixels)?;

        let scores: Vec<f32> = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| "inference session lock poisoned")?;
            let outputs = session.run(ort::inputs![input])?;
            let (_, data) = outputs[0].try_extract_tensor::<f32>()?;
            data.to_vec()
        };

        if scores.len() != self.labels.len() {
            return Err(format!(
                "model produced {} scores for {} labels",
                scores.len(),
                self.labels.len()
            )
            .into());
        }

        Ok(top_predictions(&self.labels, &normalize(scores), self.top_k))
    }

    fn input_size(&self) -> Option<Size> {
        self.input_size
    }
}

/// Height and width of the first input, `None` when either is dynamic.
fn model_input_size(session: &Session) -> Result<Option<Size>> {
    let mismatch = |reason: String| Error::ClassifierBuild { reason };
    let input = session
        .inputs()
        .first()
        .ok_or_else(|| mismatch("model has no inputs".to_string()))?;
    let ValueType::Tensor { shape, .. } = input.dtype() else {
        return Err(mismatch(format!("input '{}' is not a tensor", input.name())));
    };
    let dims: Vec<i64> = shape.iter().copied().collect();
    nchw_input_size(&dims).map_err(mismatch)
}

/// Input size of an NCHW shape with three channels. Non-positive
/// dimensions are dynamic.
fn nchw_input_size(dims: &[i64]) -> std::result::Result<Option<Size>, String> {
    let [_, channels, height, width] = dims else {
        return Err(format!("expected NCHW input, got shape {dims:?}"));
    };
    if *channels > 0 && *channels != 3 {
        return Err(format!("expected 3 input channels, got {channels}"));
    }
    match (u32::try_from(*height), u32::try_from(*width)) {
        (Ok(h), Ok(w)) if h > 0 && w > 0 => Ok(Some(Size::new(w, h))),
        _ => Ok(None),
    }
}

fn build_session(model: &Path, device: InferenceDevice) -> std::result::Result<Session, String> {
    let builder = Session::builder()
        .map_err(|e| e.to_string())?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| e.to_string())?;

    #[allow(unused_mut)]
    let mut builder = match device {
        InferenceDevice::Cpu => builder,
        #[cfg(feature = "cuda")]
        InferenceDevice::Gpu => {
            use ort::execution_providers::CUDAExecutionProvider;
            tracing::debug!("Registering CUDA execution provider");
            builder
                .with_execution_providers([CUDAExecutionProvider::default().build()])
                .map_err(|e| e.to_string())?
        }
        #[cfg(not(feature = "cuda"))]
        InferenceDevice::Gpu => {
            tracing::warn!("GPU requested but CUDA support is not compiled in, using CPU");
            builder
        }
    };

    builder.commit_from_file(model).map_err(|e| e.to_string())
}

/// Read labels, one per line. Blank lines are skipped.
pub fn read_labels(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::LabelsRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}

/// Scores that already form a probability distribution are kept; anything
/// else (logits) goes through softmax.
fn normalize(scores: Vec<f32>) -> Vec<f32> {
    let sum: f32 = scores.iter().sum();
    let is_distribution =
        scores.iter().all(|s| (0.0..=1.0).contains(s)) && (sum - 1.0).abs() < 1e-3;
    if is_distribution {
        return scores;
    }

    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f32 = exp.iter().sum();
    exp.into_iter().map(|e| e / total).collect()
}

/// The `k` best-scoring labels, highest first. Ties keep label order.
fn top_predictions(labels: &[String], scores: &[f32], k: usize) -> Vec<Prediction> {
    let mut ranked: Vec<usize> = (0..scores.len()).collect();
    ranked.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    ranked
        .into_iter()
        .take(k)
        .map(|i| Prediction::new(labels[i].clone(), scores[i]))
        .collect()
}
