pub mod mapping;
pub mod strategies;

pub use mapping::{CombinedMap, LabelIndex, LabelMapping, COMBINED_SEPARATOR};
pub use strategies::{ArtifactResolver, NamedStrategy, CATEGORY_STRATEGIES, PRIORITY_STRATEGIES};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArtifactError {
    #[error("Model directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("No usable label mapping in {dir} (tried: {tried})")]
    NoMapping { dir: PathBuf, tried: String },

    #[error("Inconsistent label mapping: {0}")]
    Inconsistent(String),

    #[error("Class index {index} outside label mapping of {len} classes")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Malformed combined label '{0}'")]
    MalformedCombinedLabel(String),
}
