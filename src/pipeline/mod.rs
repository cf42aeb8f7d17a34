pub mod types;
pub mod normalize;
pub mod ner;
pub mod artifacts; // label mapping discovery
pub mod classifier;
pub mod policy;
pub mod audit;
pub mod reply;
pub mod orchestrator;

pub use orchestrator::TriagePipeline;
pub use types::{EnrichedResult, ExtractedMeta, Priority, PrioritySource};

use thiserror::Error;

use classifier::ClassifierError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TriageError {
    /// A model could not be loaded. Cached: later calls return the same error.
    #[error("Model configuration error: {0}")]
    Configuration(ClassifierError),

    #[error("Category inference failed: {0}")]
    Inference(ClassifierError),
}
