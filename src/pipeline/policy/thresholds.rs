//! Product-tuned decision constants. These are operational choices biased
//! towards over-flagging; keep them here rather than inline.

/// P(urgent) at or above this picks `urgent`.
pub const URGENT_MIN: f32 = 0.55;

/// P(high) at or above this picks `high`.
pub const HIGH_MIN: f32 = 0.35;

/// Confidence floor when neither threshold is met and `high` is forced.
pub const AMBIGUOUS_HIGH_FLOOR: f32 = 0.60;

/// Category confidence below this allows the connectivity rescue.
pub const RESCUE_BELOW: f32 = 0.60;

/// Category confidence after a connectivity rescue.
pub const RESCUE_FLOOR: f32 = 0.70;

/// Keyword escalation only runs when priority confidence is below this.
pub const ESCALATION_CEILING: f32 = 0.85;

/// Urgent mass / confidence after a critical-phrase escalation.
pub const CRITICAL_FLOOR: f32 = 0.90;

/// High mass / confidence after a high-tier escalation.
pub const HIGH_FLOOR: f32 = 0.75;

/// Category confidence assigned by the keyword fallback.
pub const HEURISTIC_CATEGORY_CONFIDENCE: f32 = 0.50;
