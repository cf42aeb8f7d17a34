use std::path::Path;

use super::{ClassifierError, ModelLoader, Prediction, SequenceClassifier};
use crate::pipeline::artifacts::{ArtifactResolver, LabelMapping};

/// A classifier backend paired with the label mapping resolved for it.
pub struct LoadedModel {
    backend: Box<dyn SequenceClassifier>,
    mapping: LabelMapping,
}

impl LoadedModel {
    pub fn new(backend: Box<dyn SequenceClassifier>, mapping: LabelMapping) -> Self {
        Self { backend, mapping }
    }

    /// Resolve the label mapping first (cheap, and the most common
    /// misconfiguration), then build the backend.
    pub fn load(
        loader: &dyn ModelLoader,
        resolver: &ArtifactResolver,
        model_dir: &Path,
        max_seq_len: usize,
    ) -> Result<Self, ClassifierError> {
        let mapping = resolver.resolve(model_dir)?;
        let backend = loader.load(model_dir, max_seq_len)?;
        Ok(Self::new(backend, mapping))
    }

    pub fn mapping(&self) -> &LabelMapping {
        &self.mapping
    }

    /// Forward pass; the output width must match the label mapping.
    pub fn predict(&self, text: &str) -> Result<Prediction, ClassifierError> {
        let prediction = self.backend.predict(text)?;
        let expected = self.mapping.num_classes();
        if prediction.probabilities.len() != expected {
            return Err(ClassifierError::OutputShape {
                expected,
                got: prediction.probabilities.len(),
            });
        }
        Ok(prediction)
    }
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("mapping", &self.mapping)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::artifacts::ArtifactError;
    use crate::pipeline::classifier::{MockBehavior, MockClassifier, MockModelLoader};
    use tempfile::TempDir;

    fn label_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("label_map.json"),
            r#"{"id2label": {"0": "điện", "1": "nước"}, "label2id": {"điện": 0, "nước": 1}}"#,
        )
        .unwrap();
        dir
    }

    #[test]
    fn load_resolves_mapping_and_backend() {
        let dir = label_dir();
        let loader = MockModelLoader::new().with_model(dir.path(), MockBehavior::probabilities(&[0.3, 0.7]));
        let model =
            LoadedModel::load(&loader, &ArtifactResolver::category(), dir.path(), 256).unwrap();

        let prediction = model.predict("mất nước").unwrap();
        assert_eq!(prediction.class_index, 1);
        assert!(!model.mapping().is_combined());
    }

    #[test]
    fn mapping_failure_surfaces_before_backend() {
        let dir = TempDir::new().unwrap();
        let loader = MockModelLoader::new().with_model(dir.path(), MockBehavior::probabilities(&[1.0]));
        let err = LoadedModel::load(&loader, &ArtifactResolver::category(), dir.path(), 256).unwrap_err();
        assert!(matches!(err, ClassifierError::Artifact(ArtifactError::NoMapping { .. })));
        assert_eq!(loader.load_count(), 0);
    }

    #[test]
    fn width_mismatch_is_reported() {
        let dir = label_dir();
        let model = LoadedModel::new(
            Box::new(MockClassifier::from_probabilities(&[0.2, 0.3, 0.5])),
            ArtifactResolver::category().resolve(dir.path()).unwrap(),
        );
        assert_eq!(
            model.predict("x").unwrap_err(),
            ClassifierError::OutputShape { expected: 2, got: 3 }
        );
    }
}
