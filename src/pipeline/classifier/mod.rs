pub mod lazy;
pub mod mock;
pub mod model;
pub mod onnx;

pub use lazy::LazyModel;
pub use mock::{MockBehavior, MockClassifier, MockModelLoader};
pub use model::LoadedModel;
pub use onnx::OnnxModelLoader;

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::artifacts::ArtifactError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("Label mapping: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Model file not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Model initialization: {0}")]
    ModelInit(String),

    #[error("Classifier backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Tokenization error: {0}")]
    Tokenization(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Model emitted {got} logits, label mapping has {expected} classes")]
    OutputShape { expected: usize, got: usize },
}

/// A text classifier that produces one logit per class.
pub trait SequenceClassifier: Send + Sync {
    fn logits(&self, text: &str) -> Result<Vec<f32>, ClassifierError>;

    /// Softmax over the logits plus argmax. Non-finite logits (NaN, ±inf)
    /// are an inference error.
    fn predict(&self, text: &str) -> Result<Prediction, ClassifierError> {
        let logits = self.logits(text)?;
        let probabilities = softmax(&logits);
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(ClassifierError::Inference(format!(
                "non-finite probabilities from logits {logits:?}"
            )));
        }
        Prediction::from_probabilities(probabilities)
            .ok_or_else(|| ClassifierError::Inference("model returned no logits".to_string()))
    }
}

/// Builds a classifier backend for a model directory.
pub trait ModelLoader: Send + Sync {
    fn load(
        &self,
        model_dir: &Path,
        max_seq_len: usize,
    ) -> Result<Box<dyn SequenceClassifier>, ClassifierError>;
}

/// Result of one forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub class_index: usize,
    /// Maximum probability, i.e. `probabilities[class_index]`.
    pub confidence: f32,
    /// Sums to 1 over all classes.
    pub probabilities: Vec<f32>,
}

impl Prediction {
    /// Ties resolve to the lowest index.
    pub fn from_probabilities(probabilities: Vec<f32>) -> Option<Self> {
        let (class_index, confidence) = probabilities
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (i, p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((i, p)),
            })?;
        Some(Self { class_index, confidence, probabilities })
    }
}

/// Numerically stable softmax. Empty input yields an empty vector.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        exps.into_iter().map(|e| e / sum).collect()
    } else {
        exps
    }
}
