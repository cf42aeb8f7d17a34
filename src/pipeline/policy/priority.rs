use super::PolicyConfig;
use crate::pipeline::types::{Priority, ProbabilityMap};

/// Outcome of threshold-based priority selection.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityChoice {
    pub priority: Priority,
    pub confidence: f32,
    /// normal/high/urgent masses, with `high` lifted to the floor in the
    /// ambiguous branch (not renormalized).
    pub probabilities: ProbabilityMap,
    /// Neither threshold was met and `high` was forced.
    pub ambiguous: bool,
}

/// Thresholds, not argmax: urgent ≥ `urgent_min`, else high ≥ `high_min`,
/// else high at `ambiguous_high_floor`. Never picks `normal`.
pub fn choose_priority(probs: &ProbabilityMap, config: &PolicyConfig) -> PriorityChoice {
    let p_normal = probs.get(Priority::Normal.as_str());
    let p_high = probs.get(Priority::High.as_str());
    let p_urgent = probs.get(Priority::Urgent.as_str());

    let (priority, confidence, high_mass, ambiguous) = if p_urgent >= config.urgent_min {
        (Priority::Urgent, p_urgent, p_high, false)
    } else if p_high >= config.high_min {
        (Priority::High, p_high, p_high, false)
    } else {
        let forced = p_high.max(config.ambiguous_high_floor);
        (Priority::High, forced, forced, true)
    };

    let mut probabilities = ProbabilityMap::new();
    probabilities.insert(Priority::Normal.as_str(), p_normal);
    probabilities.insert(Priority::High.as_str(), high_mass);
    probabilities.insert(Priority::Urgent.as_str(), p_urgent);

    PriorityChoice {
        priority,
        confidence,
        probabilities,
        ambiguous,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probs(normal: f32, high: f32, urgent: f32) -> ProbabilityMap {
        [("normal", normal), ("high", high), ("urgent", urgent)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    fn choose(normal: f32, high: f32, urgent: f32) -> PriorityChoice {
        choose_priority(&probs(normal, high, urgent), &PolicyConfig::default())
    }

    #[test]
    fn urgent_above_threshold() {
        let choice = choose(0.10, 0.30, 0.60);
        assert_eq!(choice.priority, Priority::Urgent);
        assert!((choice.confidence - 0.60).abs() < 1e-6);
        assert!(!choice.ambiguous);
    }

    #[test]
    fn high_tier_beats_larger_normal() {
        let choice = choose(0.50, 0.40, 0.10);
        assert_eq!(choice.priority, Priority::High);
        assert!((choice.confidence - 0.40).abs() < 1e-6);
    }

    #[test]
    fn ambiguous_defaults_to_high_with_floor() {
        let choice = choose(0.70, 0.20, 0.10);
        assert_eq!(choice.priority, Priority::High);
        assert!((choice.confidence - 0.60).abs() < 1e-6);
        assert!(choice.ambiguous);
        // lifted, not renormalized
        assert!((choice.probabilities.get("high") - 0.60).abs() < 1e-6);
        assert!((choice.probabilities.get("normal") - 0.70).abs() < 1e-6);
    }

    #[test]
    fn thresholds_are_inclusive() {
        assert_eq!(choose(0.0, 0.45, 0.55).priority, Priority::Urgent);
        let choice = choose(0.60, 0.35, 0.05);
        assert_eq!(choice.priority, Priority::High);
        assert!(!choice.ambiguous);
    }

    #[test]
    fn normal_is_never_chosen() {
        for normal in [0.0, 0.5, 0.9, 1.0] {
            let rest = (1.0 - normal) / 2.0;
            assert_ne!(choose(normal, rest, rest).priority, Priority::Normal);
        }
    }

    #[test]
    fn missing_labels_count_as_zero() {
        let choice = choose_priority(&ProbabilityMap::new(), &PolicyConfig::default());
        assert_eq!(choice.priority, Priority::High);
        assert!((choice.confidence - 0.60).abs() < 1e-6);
    }

    #[test]
    fn custom_thresholds_apply() {
        let config = PolicyConfig {
            urgent_min: 0.7,
            ..PolicyConfig::default()
        };
        let choice = choose_priority(&probs(0.1, 0.3, 0.6), &config);
        assert_eq!(choice.priority, Priority::High);
        assert!(choice.ambiguous);
    }
}
