pub mod fallback;
pub mod keywords;
pub mod priority;
pub mod thresholds;

pub use fallback::{backup_priority, heuristic_category};
pub use keywords::{apply_overrides, escalate_priority, rescue_category, Decision};
pub use priority::{choose_priority, PriorityChoice};

use serde::{Deserialize, Serialize};

/// Tunable decision constants; defaults come from [`thresholds`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub urgent_min: f32,
    pub high_min: f32,
    pub ambiguous_high_floor: f32,
    pub rescue_below: f32,
    pub rescue_floor: f32,
    pub escalation_ceiling: f32,
    pub critical_floor: f32,
    pub high_floor: f32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            urgent_min: thresholds::URGENT_MIN,
            high_min: thresholds::HIGH_MIN,
            ambiguous_high_floor: thresholds::AMBIGUOUS_HIGH_FLOOR,
            rescue_below: thresholds::RESCUE_BELOW,
            rescue_floor: thresholds::RESCUE_FLOOR,
            escalation_ceiling: thresholds::ESCALATION_CEILING,
            critical_floor: thresholds::CRITICAL_FLOOR,
            high_floor: thresholds::HIGH_FLOOR,
        }
    }
}

/// Whole-phrase match on normalized text: `"rò rỉ"` matches
/// `"phong 203 rò rỉ nước"` but `"nổ"` does not match `"nổi"`.
pub fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    let haystack = format!(" {} ", normalized.split_whitespace().collect::<Vec<_>>().join(" "));
    let needle = format!(" {} ", phrase.trim());
    haystack.contains(&needle)
}

/// First phrase of `vocabulary` present in `normalized`.
pub fn first_phrase<'a>(normalized: &str, vocabulary: &[&'a str]) -> Option<&'a str> {
    vocabulary
        .iter()
        .copied()
        .find(|phrase| contains_phrase(normalized, phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_threshold_constants() {
        let config = PolicyConfig::default();
        assert_eq!(config.urgent_min, 0.55);
        assert_eq!(config.high_min, 0.35);
        assert_eq!(config.ambiguous_high_floor, 0.60);
        assert_eq!(config.escalation_ceiling, 0.85);
        assert_eq!(config.critical_floor, 0.90);
        assert_eq!(config.high_floor, 0.75);
    }

    #[test]
    fn phrase_matching_respects_word_boundaries() {
        assert!(contains_phrase("phong 203 rò rỉ nước", "rò rỉ"));
        assert!(contains_phrase("nổ", "nổ"));
        assert!(!contains_phrase("phao nổi", "nổ"));
        assert!(!contains_phrase("chập chờn", "chập điện"));
        assert!(contains_phrase("a  b", "a b"));
    }

    #[test]
    fn first_phrase_follows_vocabulary_order() {
        assert_eq!(first_phrase("khét và bốc khói", &["bốc khói", "khét"]), Some("bốc khói"));
        assert_eq!(first_phrase("bình thường", &["bốc khói"]), None);
    }
}
