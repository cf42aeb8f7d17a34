use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Urgency tier of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Normal,
    High,
    Urgent,
}

impl Priority {
    /// Used whenever no classifier or heuristic decides otherwise.
    pub const DEFAULT: Priority = Priority::High;

    pub const ALL: [Priority; 3] = [Priority::Normal, Priority::High, Priority::Urgent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    /// Coerce free-form input (client-supplied or model-emitted) to a priority.
    /// Unknown or empty values become `High`.
    pub fn parse_lenient(raw: &str) -> Priority {
        raw.parse().unwrap_or(Priority::DEFAULT)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPriority(pub String);

impl fmt::Display for UnknownPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown priority label '{}'", self.0)
    }
}

impl std::error::Error for UnknownPriority {}

impl FromStr for Priority {
    type Err = UnknownPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(UnknownPriority(other.to_string())),
        }
    }
}

/// Category labels the fine-tuned model is trained on.
pub const CATEGORY_LABELS: [&str; 6] = ["điện", "nước", "internet", "thiết bị", "vệ sinh", "khác"];

/// Label forced by the connectivity rescue rule.
pub const INTERNET_LABEL: &str = "internet";

/// Label used when a category has to be named but nothing was inferred.
pub const OTHER_LABEL: &str = "khác";

/// Human-facing category name for a model label.
pub fn category_display_name(label: &str) -> &'static str {
    match label {
        "điện" => "Điện",
        "nước" => "Nước",
        "internet" => "Internet",
        "thiết bị" => "Cơ sở vật chất",
        "vệ sinh" => "Vệ sinh",
        _ => "Khác",
    }
}

/// Label → probability. Ordered so serialized results are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProbabilityMap(BTreeMap<String, f32>);

impl ProbabilityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, label: &str) -> f32 {
        self.0.get(label).copied().unwrap_or(0.0)
    }

    pub fn insert(&mut self, label: impl Into<String>, p: f32) {
        self.0.insert(label.into(), p);
    }

    /// Add `p` to the mass already held by `label`.
    pub fn accumulate(&mut self, label: impl Into<String>, p: f32) {
        *self.0.entry(label.into()).or_insert(0.0) += p;
    }

    pub fn total(&self) -> f32 {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Highest-mass label. Ties resolve to the lexicographically first label.
    pub fn argmax(&self) -> Option<(&str, f32)> {
        self.iter()
            .fold(None, |best: Option<(&str, f32)>, (label, p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((label, p)),
            })
    }

    /// Pure transform: raise `target` to at least `min_mass`, then rescale the
    /// whole map so it sums to 1. The receiver is left untouched.
    pub fn adjust(&self, target: &str, min_mass: f32) -> ProbabilityMap {
        let mut next = self.0.clone();
        let slot = next.entry(target.to_string()).or_insert(0.0);
        *slot = slot.max(min_mass);

        let total: f32 = next.values().sum();
        if total > 0.0 {
            for p in next.values_mut() {
                *p /= total;
            }
        }
        ProbabilityMap(next)
    }
}

impl FromIterator<(String, f32)> for ProbabilityMap {
    fn from_iter<I: IntoIterator<Item = (String, f32)>>(iter: I) -> Self {
        ProbabilityMap(iter.into_iter().collect())
    }
}

/// Situational metadata pulled from the report text.
/// `None` always means "no match"; fields are never empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedMeta {
    pub building: Option<String>,
    pub room: Option<String>,
    pub floor: Option<String>,
    pub elapsed_time: Option<String>,
}

impl ExtractedMeta {
    pub fn is_empty(&self) -> bool {
        self.building.is_none()
            && self.room.is_none()
            && self.floor.is_none()
            && self.elapsed_time.is_none()
    }
}

/// Where the final priority came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrioritySource {
    /// Decoded from a joint category×priority model.
    CombinedModel,
    /// Chosen by the threshold policy over the dedicated priority model.
    PriorityModel,
    /// Backup keyword rules (no category model available).
    Heuristic,
    /// No priority signal at all; safe default.
    Default,
}

/// A policy intervention applied during one classification call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyOverride {
    /// Neither urgent nor high cleared its threshold; high was forced.
    AmbiguousPriorityDefault { p_high: f32 },
    /// Low-confidence category replaced by `internet`.
    InternetRescue { previous: Option<String>, previous_confidence: f32 },
    /// Critical safety phrase forced `urgent`.
    CriticalEscalation { phrase: String, previous: Priority },
    /// High-tier phrase forced `high`.
    HighEscalation { phrase: String, previous: Priority },
    /// No usable category model; heuristics produced the result.
    HeuristicFallback { reason: String },
}

/// Output of one `classify` call. Created fresh per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedResult {
    pub category: Option<String>,
    pub category_confidence: f32,
    pub category_probs: ProbabilityMap,
    /// Raw joint distribution, present only for combined models.
    pub combined_probs: Option<ProbabilityMap>,
    pub priority: Priority,
    pub priority_confidence: f32,
    /// Threshold-adjusted priority distribution when a priority model ran.
    pub priority_probs: Option<ProbabilityMap>,
    pub priority_source: PrioritySource,
    pub overrides: Vec<PolicyOverride>,
    pub meta: ExtractedMeta,
}

impl EnrichedResult {
    pub fn has_priority_from_combined_model(&self) -> bool {
        self.priority_source == PrioritySource::CombinedModel
    }

    pub fn category_display_name(&self) -> &'static str {
        category_display_name(self.category.as_deref().unwrap_or(OTHER_LABEL))
    }
}
