use std::path::Path;

use super::{ClassifierError, ModelLoader, SequenceClassifier};

pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

// ═══════════════════════════════════════════════════════════
// ONNX sequence classifier (behind `onnx` feature)
// ═══════════════════════════════════════════════════════════

#[cfg(feature = "onnx")]
mod backend {
    use super::{ClassifierError, SequenceClassifier, MODEL_FILE, TOKENIZER_FILE};
    use ort::session::Session;
    use std::path::Path;
    use std::sync::Mutex;

    /// Fine-tuned PhoBERT classification head exported to ONNX.
    ///
    /// Requires `model.onnx` and `tokenizer.json` in the model directory.
    /// Inputs are `input_ids` and `attention_mask`; output 0 holds the logits
    /// with shape `[1, num_labels]`.
    pub struct OnnxClassifier {
        session: Mutex<Session>,
        tokenizer: tokenizers::Tokenizer,
    }

    impl OnnxClassifier {
        pub fn load(model_dir: &Path, max_seq_len: usize) -> Result<Self, ClassifierError> {
            let model_path = model_dir.join(MODEL_FILE);
            let tokenizer_path = model_dir.join(TOKENIZER_FILE);

            if !model_path.exists() {
                return Err(ClassifierError::ModelNotFound(model_path));
            }
            if !tokenizer_path.exists() {
                return Err(ClassifierError::ModelNotFound(tokenizer_path));
            }

            let session = Session::builder()
                .map_err(|e: ort::Error| ClassifierError::ModelInit(e.to_string()))?
                .with_intra_threads(2)
                .map_err(|e: ort::Error| ClassifierError::ModelInit(e.to_string()))?
                .commit_from_file(&model_path)
                .map_err(|e: ort::Error| ClassifierError::ModelInit(format!("ONNX load failed: {e}")))?;

            let mut tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| ClassifierError::ModelInit(format!("Tokenizer load failed: {e}")))?;
            tokenizer
                .with_truncation(Some(tokenizers::TruncationParams {
                    max_length: max_seq_len,
                    ..Default::default()
                }))
                .map_err(|e| ClassifierError::ModelInit(format!("Tokenizer truncation: {e}")))?;
            tokenizer.with_padding(None);

            tracing::info!(dir = %model_dir.display(), max_seq_len, "ONNX classifier loaded");

            Ok(Self {
                session: Mutex::new(session),
                tokenizer,
            })
        }
    }

    impl SequenceClassifier for OnnxClassifier {
        fn logits(&self, text: &str) -> Result<Vec<f32>, ClassifierError> {
            use ort::value::TensorRef;

            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| ClassifierError::Tokenization(e.to_string()))?;

            let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
            let attention_mask: Vec<i64> = encoding
                .get_attention_mask()
                .iter()
                .map(|&m| m as i64)
                .collect();
            let seq_len = input_ids.len();

            let ids_array = ndarray::Array2::from_shape_vec((1, seq_len), input_ids)
                .map_err(|e| ClassifierError::Inference(e.to_string()))?;
            let mask_array = ndarray::Array2::from_shape_vec((1, seq_len), attention_mask)
                .map_err(|e| ClassifierError::Inference(e.to_string()))?;

            let ids_tensor = TensorRef::from_array_view(&ids_array)
                .map_err(|e| ClassifierError::Inference(e.to_string()))?;
            let mask_tensor = TensorRef::from_array_view(&mask_array)
                .map_err(|e| ClassifierError::Inference(e.to_string()))?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| ClassifierError::Inference("Session lock poisoned".to_string()))?;

            let outputs = session
                .run(ort::inputs![ids_tensor, mask_tensor])
                .map_err(|e| ClassifierError::Inference(format!("ONNX inference failed: {e}")))?;

            let (shape, logits) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| ClassifierError::Inference(format!("Output extraction: {e}")))?;

            // [1, num_labels]
            if shape.len() != 2 || shape[0] != 1 {
                return Err(ClassifierError::Inference(format!(
                    "Unexpected logits shape: {shape:?}, expected [1, num_labels]"
                )));
            }

            Ok(logits.to_vec())
        }
    }
}

#[cfg(feature = "onnx")]
pub use backend::OnnxClassifier;

/// Production loader. Without the `onnx` feature every load fails with a
/// configuration error so the caller can fall back to heuristics.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnnxModelLoader;

impl ModelLoader for OnnxModelLoader {
    #[cfg(feature = "onnx")]
    fn load(
        &self,
        model_dir: &Path,
        max_seq_len: usize,
    ) -> Result<Box<dyn SequenceClassifier>, ClassifierError> {
        Ok(Box::new(OnnxClassifier::load(model_dir, max_seq_len)?))
    }

    #[cfg(not(feature = "onnx"))]
    fn load(
        &self,
        model_dir: &Path,
        _max_seq_len: usize,
    ) -> Result<Box<dyn SequenceClassifier>, ClassifierError> {
        Err(ClassifierError::BackendUnavailable(format!(
            "cannot load {}: built without the `onnx` feature",
            model_dir.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn loader_without_backend_reports_configuration_error() {
        let err = OnnxModelLoader.load(Path::new("/models/phobert_kssv"), 256).err();
        assert!(matches!(err, Some(ClassifierError::BackendUnavailable(msg)) if msg.contains("onnx")));
    }

    #[cfg(feature = "onnx")]
    #[test]
    fn loader_reports_missing_model_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = OnnxModelLoader.load(dir.path(), 256).err();
        assert!(matches!(err, Some(ClassifierError::ModelNotFound(p)) if p.ends_with(MODEL_FILE)));
    }
}
