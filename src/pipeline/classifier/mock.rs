use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ClassifierError, ModelLoader, SequenceClassifier};

/// Mock classifier for testing: returns fixed logits for every input.
#[derive(Debug, Clone)]
pub struct MockClassifier {
    behavior: MockBehavior,
}

/// What a mock model does when loaded and queried.
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    Logits(Vec<f32>),
    FailInference(String),
    FailLoad(String),
}

impl MockBehavior {
    /// Logits whose softmax reproduces `probs` (up to float error).
    pub fn probabilities(probs: &[f32]) -> Self {
        MockBehavior::Logits(probs.iter().map(|p| p.max(1e-12).ln()).collect())
    }
}

impl MockClassifier {
    pub fn new(behavior: MockBehavior) -> Self {
        Self { behavior }
    }

    pub fn from_probabilities(probs: &[f32]) -> Self {
        Self::new(MockBehavior::probabilities(probs))
    }

    pub fn failing(message: &str) -> Self {
        Self::new(MockBehavior::FailInference(message.to_string()))
    }
}

impl SequenceClassifier for MockClassifier {
    fn logits(&self, _text: &str) -> Result<Vec<f32>, ClassifierError> {
        match &self.behavior {
            MockBehavior::Logits(logits) => Ok(logits.clone()),
            MockBehavior::FailInference(msg) | MockBehavior::FailLoad(msg) => {
                Err(ClassifierError::Inference(msg.clone()))
            }
        }
    }
}

/// Mock loader keyed by model directory. Unknown directories fail like a
/// missing `model.onnx` would.
#[derive(Debug, Default)]
pub struct MockModelLoader {
    models: HashMap<PathBuf, MockBehavior>,
    loads: AtomicUsize,
}

impl MockModelLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, dir: &Path, behavior: MockBehavior) -> Self {
        self.models.insert(dir.to_path_buf(), behavior);
        self
    }

    /// Number of `load` calls so far, successful or not.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ModelLoader for MockModelLoader {
    fn load(
        &self,
        model_dir: &Path,
        _max_seq_len: usize,
    ) -> Result<Box<dyn SequenceClassifier>, ClassifierError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        match self.models.get(model_dir) {
            Some(MockBehavior::FailLoad(msg)) => Err(ClassifierError::ModelInit(msg.clone())),
            Some(behavior) => Ok(Box::new(MockClassifier::new(behavior.clone()))),
            None => Err(ClassifierError::ModelNotFound(model_dir.join("model.onnx"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probabilities_round_trip_through_softmax() {
        let mock = MockClassifier::from_probabilities(&[0.1, 0.3, 0.6]);
        let prediction = mock.predict("anything").unwrap();
        assert_eq!(prediction.class_index, 2);
        assert!((prediction.confidence - 0.6).abs() < 1e-5);
    }

    #[test]
    fn failing_mock_reports_inference_error() {
        let mock = MockClassifier::failing("boom");
        assert_eq!(mock.predict("x"), Err(ClassifierError::Inference("boom".into())));
    }

    #[test]
    fn loader_counts_and_fails_unknown_dirs() {
        let loader = MockModelLoader::new()
            .with_model(Path::new("/m/ok"), MockBehavior::Logits(vec![0.0, 1.0]))
            .with_model(Path::new("/m/bad"), MockBehavior::FailLoad("corrupt".into()));

        assert!(loader.load(Path::new("/m/ok"), 256).is_ok());
        assert!(matches!(
            loader.load(Path::new("/m/bad"), 256),
            Err(ClassifierError::ModelInit(_))
        ));
        assert!(matches!(
            loader.load(Path::new("/m/none"), 256),
            Err(ClassifierError::ModelNotFound(_))
        ));
        assert_eq!(loader.load_count(), 3);
    }
}
