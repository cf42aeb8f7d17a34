//! Index ↔ label tables shipped next to a fine-tuned model.

use std::collections::{BTreeMap, BTreeSet};

use super::ArtifactError;
use crate::pipeline::types::{Priority, ProbabilityMap};

/// Separator inside a combined class label: `"điện|urgent"`.
pub const COMBINED_SEPARATOR: char = '|';

/// Bidirectional index ↔ label table. Indices are contiguous from 0 so that
/// position `i` of a probability vector is always class `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelIndex {
    id2label: BTreeMap<usize, String>,
}

impl LabelIndex {
    /// Build from both directions and check they agree.
    pub fn from_parts(
        id2label: BTreeMap<usize, String>,
        label2id: BTreeMap<String, usize>,
    ) -> Result<Self, ArtifactError> {
        if id2label.len() != label2id.len() {
            return Err(ArtifactError::Inconsistent(format!(
                "id2label has {} entries, label2id has {}",
                id2label.len(),
                label2id.len()
            )));
        }
        for (id, label) in &id2label {
            if label2id.get(label) != Some(id) {
                return Err(ArtifactError::Inconsistent(format!(
                    "label '{label}' maps to index {id} but not back"
                )));
            }
        }
        Self::checked(id2label)
    }

    /// Build from the forward direction only (model configs often omit the
    /// reverse table). Duplicate labels are rejected.
    pub fn from_id2label(id2label: BTreeMap<usize, String>) -> Result<Self, ArtifactError> {
        let mut seen = BTreeSet::new();
        for label in id2label.values() {
            if !seen.insert(label.as_str()) {
                return Err(ArtifactError::Inconsistent(format!("duplicate label '{label}'")));
            }
        }
        Self::checked(id2label)
    }

    fn checked(id2label: BTreeMap<usize, String>) -> Result<Self, ArtifactError> {
        if id2label.is_empty() {
            return Err(ArtifactError::Inconsistent("empty label mapping".to_string()));
        }
        if id2label.keys().copied().ne(0..id2label.len()) {
            return Err(ArtifactError::Inconsistent(
                "class indices are not contiguous from 0".to_string(),
            ));
        }
        if id2label.values().any(|l| l.trim().is_empty()) {
            return Err(ArtifactError::Inconsistent("blank label".to_string()));
        }
        Ok(Self { id2label })
    }

    pub fn len(&self) -> usize {
        self.id2label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id2label.is_empty()
    }

    pub fn label(&self, index: usize) -> Result<&str, ArtifactError> {
        self.id2label
            .get(&index)
            .map(String::as_str)
            .ok_or(ArtifactError::IndexOutOfRange { index, len: self.len() })
    }

    /// Labels in index order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.id2label.values().map(String::as_str)
    }

    /// Label every entry of a probability vector.
    pub fn probabilities(&self, probs: &[f32]) -> ProbabilityMap {
        self.labels()
            .zip(probs)
            .map(|(label, p)| (label.to_string(), *p))
            .collect()
    }

    /// True when every label has the `category|priority` shape.
    pub fn is_all_composite(&self) -> bool {
        self.labels().all(|l| l.contains(COMBINED_SEPARATOR))
    }

    /// True when every label is a `LABEL_<n>` placeholder written by an
    /// export that never saw the real label names.
    pub fn is_all_placeholder(&self) -> bool {
        self.labels().all(|l| {
            l.strip_prefix("LABEL_")
                .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        })
    }
}

/// Mapping for a joint category × priority model.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedMap {
    index: LabelIndex,
}

impl CombinedMap {
    pub fn new(index: LabelIndex) -> Self {
        Self { index }
    }

    /// Check every composite label against the declared `LABELS` and
    /// `PRIORITIES` lists, when the artifact ships them.
    pub fn check_declared(
        &self,
        categories: Option<&[String]>,
        priorities: Option<&[String]>,
    ) -> Result<(), ArtifactError> {
        for label in self.index.labels() {
            let (category, priority) = label.split_once(COMBINED_SEPARATOR).unwrap_or((label, ""));
            if categories.is_some_and(|c| !c.iter().any(|d| d.trim() == category.trim())) {
                return Err(ArtifactError::Inconsistent(format!(
                    "'{label}' uses an undeclared category"
                )));
            }
            if priorities.is_some_and(|p| !p.iter().any(|d| d.trim() == priority.trim())) {
                return Err(ArtifactError::Inconsistent(format!(
                    "'{label}' uses an undeclared priority"
                )));
            }
        }
        Ok(())
    }

    pub fn index(&self) -> &LabelIndex {
        &self.index
    }

    /// Split class `index` into category and (if present) priority.
    ///
    /// A label without separator decodes to a category with no priority.
    /// An empty category or an unknown priority is a decode error.
    pub fn decode(&self, index: usize) -> Result<(String, Option<Priority>), ArtifactError> {
        let label = self.index.label(index)?;
        match label.split_once(COMBINED_SEPARATOR) {
            None => Ok((label.trim().to_string(), None)),
            Some((category, priority)) => {
                let category = category.trim();
                if category.is_empty() {
                    return Err(ArtifactError::MalformedCombinedLabel(label.to_string()));
                }
                let priority = priority
                    .parse::<Priority>()
                    .map_err(|_| ArtifactError::MalformedCombinedLabel(label.to_string()))?;
                Ok((category.to_string(), Some(priority)))
            }
        }
    }

    /// Raw joint distribution keyed by composite label.
    pub fn combined_probabilities(&self, probs: &[f32]) -> ProbabilityMap {
        self.index.probabilities(probs)
    }

    /// Per-category distribution: mass of every class sharing a category is summed.
    pub fn aggregate_categories(&self, probs: &[f32]) -> ProbabilityMap {
        let mut out = ProbabilityMap::new();
        for (label, p) in self.index.labels().zip(probs) {
            let category = category_part(label);
            if !category.is_empty() {
                out.accumulate(category, *p);
            }
        }
        out
    }

    /// Highest joint probability among classes of `category`.
    pub fn priority_confidence(&self, probs: &[f32], category: &str) -> Option<f32> {
        self.index
            .labels()
            .zip(probs)
            .filter(|(label, _)| category_part(label) == category)
            .map(|(_, p)| *p)
            .reduce(f32::max)
    }
}

fn category_part(label: &str) -> &str {
    label
        .split_once(COMBINED_SEPARATOR)
        .map_or(label, |(category, _)| category)
        .trim()
}

/// Label mapping shape chosen at load time.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelMapping {
    /// index → category (or, for the priority model, index → priority).
    Simple(LabelIndex),
    /// index → `category|priority`.
    Combined(CombinedMap),
}

impl LabelMapping {
    pub fn num_classes(&self) -> usize {
        match self {
            LabelMapping::Simple(index) => index.len(),
            LabelMapping::Combined(map) => map.index().len(),
        }
    }

    pub fn is_combined(&self) -> bool {
        matches!(self, LabelMapping::Combined(_))
    }

    pub fn shape_name(&self) -> &'static str {
        match self {
            LabelMapping::Simple(_) => "simple",
            LabelMapping::Combined(_) => "combined",
        }
    }

    /// Priority models must only emit labels `Priority` understands.
    pub fn ensure_priority_labels(&self) -> Result<(), ArtifactError> {
        let LabelMapping::Simple(index) = self else {
            return Err(ArtifactError::Inconsistent(
                "priority model cannot use a combined mapping".to_string(),
            ));
        };
        match index.labels().find(|l| l.parse::<Priority>().is_err()) {
            Some(bad) => Err(ArtifactError::Inconsistent(format!("unknown priority label '{bad}'"))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(labels: &[&str]) -> BTreeMap<usize, String> {
        labels.iter().enumerate().map(|(i, l)| (i, l.to_string())).collect()
    }

    fn combined(labels: &[&str]) -> CombinedMap {
        CombinedMap::new(LabelIndex::from_id2label(ids(labels)).unwrap())
    }

    #[test]
    fn from_parts_accepts_consistent_tables() {
        let id2label = ids(&["điện", "nước"]);
        let label2id = [("điện".to_string(), 0), ("nước".to_string(), 1)].into();
        let index = LabelIndex::from_parts(id2label, label2id).unwrap();
        assert_eq!(index.label(1).unwrap(), "nước");
        assert_eq!(index.labels().collect::<Vec<_>>(), ["điện", "nước"]);
    }

    #[test]
    fn from_parts_rejects_disagreeing_tables() {
        let id2label = ids(&["điện", "nước"]);
        let label2id = [("điện".to_string(), 1), ("nước".to_string(), 0)].into();
        assert!(matches!(
            LabelIndex::from_parts(id2label, label2id),
            Err(ArtifactError::Inconsistent(_))
        ));
    }

    #[test]
    fn rejects_gaps_duplicates_and_empty() {
        let gap: BTreeMap<usize, String> = [(0, "a".to_string()), (2, "b".to_string())].into();
        assert!(LabelIndex::from_id2label(gap).is_err());
        assert!(LabelIndex::from_id2label(ids(&["a", "a"])).is_err());
        assert!(LabelIndex::from_id2label(BTreeMap::new()).is_err());
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let index = LabelIndex::from_id2label(ids(&["a"])).unwrap();
        assert_eq!(
            index.label(3),
            Err(ArtifactError::IndexOutOfRange { index: 3, len: 1 })
        );
    }

    #[test]
    fn placeholder_and_composite_detection() {
        let placeholders = LabelIndex::from_id2label(ids(&["LABEL_0", "LABEL_1"])).unwrap();
        assert!(placeholders.is_all_placeholder());
        let composite = LabelIndex::from_id2label(ids(&["điện|normal", "nước|high"])).unwrap();
        assert!(composite.is_all_composite());
        assert!(!composite.is_all_placeholder());
        let simple = LabelIndex::from_id2label(ids(&["điện", "LABEL_1"])).unwrap();
        assert!(!simple.is_all_placeholder());
        assert!(!simple.is_all_composite());
    }

    #[test]
    fn aggregates_classes_sharing_a_category() {
        let map = combined(&["điện|normal", "điện|high"]);
        let agg = map.aggregate_categories(&[0.3, 0.2]);
        assert!((agg.get("điện") - 0.5).abs() < 1e-6);
        assert_eq!(agg.len(), 1);
    }

    #[test]
    fn aggregation_spans_categories() {
        let map = combined(&["điện|normal", "nước|urgent", "điện|urgent", "nước|high"]);
        let agg = map.aggregate_categories(&[0.1, 0.4, 0.3, 0.2]);
        assert!((agg.get("điện") - 0.4).abs() < 1e-6);
        assert!((agg.get("nước") - 0.6).abs() < 1e-6);
        assert!((agg.total() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn decode_splits_category_and_priority() {
        let map = combined(&["điện|normal", "thiết bị|urgent", "khác"]);
        assert_eq!(map.decode(1).unwrap(), ("thiết bị".to_string(), Some(Priority::Urgent)));
        assert_eq!(map.decode(2).unwrap(), ("khác".to_string(), None));
    }

    #[test]
    fn decode_rejects_malformed_labels() {
        let map = combined(&["|high", "điện|soon"]);
        assert!(matches!(map.decode(0), Err(ArtifactError::MalformedCombinedLabel(_))));
        assert!(matches!(map.decode(1), Err(ArtifactError::MalformedCombinedLabel(_))));
        assert!(matches!(map.decode(9), Err(ArtifactError::IndexOutOfRange { .. })));
    }

    #[test]
    fn declared_lists_must_cover_every_label() {
        let map = combined(&["điện|normal", "nước|urgent"]);
        let categories = ["điện".to_string(), "nước".to_string()];
        let priorities = ["normal".to_string(), "high".to_string(), "urgent".to_string()];
        assert!(map.check_declared(Some(&categories[..]), Some(&priorities[..])).is_ok());
        assert!(map.check_declared(None, None).is_ok());

        assert!(map.check_declared(Some(&categories[..1]), None).is_err());
        assert!(map.check_declared(None, Some(&priorities[..2])).is_err());
    }

    #[test]
    fn priority_confidence_is_max_within_category() {
        let map = combined(&["điện|normal", "điện|urgent", "nước|high"]);
        let probs = [0.2, 0.5, 0.3];
        assert_eq!(map.priority_confidence(&probs, "điện"), Some(0.5));
        assert_eq!(map.priority_confidence(&probs, "internet"), None);
    }

    #[test]
    fn priority_label_check() {
        let ok = LabelMapping::Simple(
            LabelIndex::from_id2label(ids(&["normal", "high", "urgent"])).unwrap(),
        );
        assert!(ok.ensure_priority_labels().is_ok());
        let bad = LabelMapping::Simple(LabelIndex::from_id2label(ids(&["low", "high"])).unwrap());
        assert!(bad.ensure_priority_labels().is_err());
        let joint = LabelMapping::Combined(combined(&["điện|high"]));
        assert!(joint.ensure_priority_labels().is_err());
    }
}
