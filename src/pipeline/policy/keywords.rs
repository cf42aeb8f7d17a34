//! Keyword-driven corrections applied after the models have spoken.
//!
//! Vocabularies are written in normalized spelling (see `normalize`), e.g.
//! "rò rỉ nước nhiều" rather than "rò rỉ nhiều".

use super::{first_phrase, PolicyConfig};
use crate::pipeline::types::{PolicyOverride, Priority, ProbabilityMap, INTERNET_LABEL};

/// Connectivity terms that rescue a low-confidence category.
pub const CONNECTIVITY_TERMS: &[&str] = &["wifi", "wi fi", "internet", "mạng"];

/// Safety-critical phrases, checked first.
pub const CRITICAL_PHRASES: &[&str] = &[
    "cháy",
    "chập điện mạnh",
    "tia lửa",
    "tóe lửa",
    "bốc khói",
    "khét",
    "mùi khét",
    "nổ",
    "rò rỉ gas",
    "gas rò",
    "vỡ ống",
    "vỡ đường ống",
    "tràn nước",
    "ngập",
    "rò rỉ nước nhiều",
    "rò rỉ nước mạnh",
    "điện giật",
    "sự cố nguy hiểm",
];

/// Degraded-service phrases.
pub const HIGH_PHRASES: &[&str] = &[
    "rò rỉ",
    "chập",
    "tắc nghẽn",
    "tắc cống",
    "tắc bồn",
    "nghẹt",
    "mùi khó chịu",
    "mùi nặng",
    "nhấp nháy",
    "sụt áp",
    "mất nước cục bộ",
    "mất điện cục bộ",
];

/// The decision state the policy rules operate on.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub category: Option<String>,
    pub category_confidence: f32,
    pub priority: Priority,
    pub priority_confidence: f32,
    pub priority_probs: Option<ProbabilityMap>,
    pub overrides: Vec<PolicyOverride>,
}

/// Low-confidence category + connectivity term → `internet`.
pub fn rescue_category(mut decision: Decision, normalized: &str, config: &PolicyConfig) -> Decision {
    if decision.category_confidence >= config.rescue_below
        || first_phrase(normalized, CONNECTIVITY_TERMS).is_none()
    {
        return decision;
    }

    decision.overrides.push(PolicyOverride::InternetRescue {
        previous: decision.category.take(),
        previous_confidence: decision.category_confidence,
    });
    decision.category = Some(INTERNET_LABEL.to_string());
    decision.category_confidence = decision.category_confidence.max(config.rescue_floor);
    decision
}

/// Safety phrases raise priority when the current choice is not confident.
/// A critical match is final for this call; the high tier never runs after it.
pub fn escalate_priority(mut decision: Decision, normalized: &str, config: &PolicyConfig) -> Decision {
    if decision.priority_confidence >= config.escalation_ceiling {
        return decision;
    }

    if let Some(phrase) = first_phrase(normalized, CRITICAL_PHRASES) {
        decision.overrides.push(PolicyOverride::CriticalEscalation {
            phrase: phrase.to_string(),
            previous: decision.priority,
        });
        return raise(decision, Priority::Urgent, config.critical_floor);
    }

    if decision.priority != Priority::Urgent {
        if let Some(phrase) = first_phrase(normalized, HIGH_PHRASES) {
            decision.overrides.push(PolicyOverride::HighEscalation {
                phrase: phrase.to_string(),
                previous: decision.priority,
            });
            return raise(decision, Priority::High, config.high_floor);
        }
    }

    decision
}

fn raise(mut decision: Decision, priority: Priority, floor: f32) -> Decision {
    decision.priority = priority;
    decision.priority_confidence = decision.priority_confidence.max(floor);
    decision.priority_probs = decision
        .priority_probs
        .map(|probs| probs.adjust(priority.as_str(), floor));
    decision
}

/// Rescue, then escalation.
pub fn apply_overrides(decision: Decision, normalized: &str, config: &PolicyConfig) -> Decision {
    let decision = rescue_category(decision, normalized, config);
    escalate_priority(decision, normalized, config)
}
