//! Heuristics used when no category model can be loaded.

use super::first_phrase;
use crate::pipeline::types::Priority;

/// Keyword table per category, in precedence order. Normalized spelling.
pub const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "điện",
        &["điện", "ổ cắm", "cầu dao", "aptomat", "bóng đèn", "đèn", "công tắc"],
    ),
    (
        "nước",
        &["nước", "vòi", "ống nước", "bình nóng lạnh", "vỡ ống"],
    ),
    (
        "internet",
        &["internet", "wifi", "router", "modem"],
    ),
    (
        "thiết bị",
        &["thiết bị", "quạt", "điều hòa", "máy lạnh", "giường", "tủ", "bàn", "ghế", "cửa", "khóa"],
    ),
    (
        "vệ sinh",
        &["vệ sinh", "rác", "hôi", "bẩn", "bồn cầu", "tắc cống", "cống"],
    ),
];

/// Phrases that make any report urgent.
const URGENT_KEYWORDS: &[&str] = &[
    "khẩn cấp",
    "khẩn",
    "nguy hiểm",
    "cháy",
    "chập điện",
    "tia lửa",
    "bốc khói",
    "vỡ ống",
    "ngập nặng",
    "rò rỉ mạnh",
    "mất hoàn toàn",
    "toàn dãy",
    "toàn khu",
];

/// Utility outage scope, urgent for điện / nước.
const UTILITY_OUTAGE: &[&str] = &["không có nước", "không có điện", "mất hoàn toàn", "toàn dãy", "toàn khu"];

/// Degraded utility, high for điện / nước.
const UTILITY_DEGRADED: &[&str] = &["rò rỉ", "rò nước", "nhấp nháy", "chập chờn"];

/// Unsanitary conditions, high for vệ sinh.
const SANITATION_BAD: &[&str] = &["hôi thối", "rất bẩn", "đầy rác", "tràn rác"];

/// First category whose keywords appear in the normalized text.
pub fn heuristic_category(normalized: &str) -> Option<&'static str> {
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| first_phrase(normalized, keywords).is_some())
        .map(|(category, _)| *category)
}

/// Backup priority rules over the raw report (case-folded, substring match).
/// Anything not matched is `high`, never `normal`.
pub fn backup_priority(raw: &str, category: Option<&str>) -> Priority {
    let text = raw.to_lowercase();
    let any = |keywords: &[&str]| keywords.iter().any(|k| text.contains(k));

    if any(URGENT_KEYWORDS) {
        return Priority::Urgent;
    }
    if matches!(category, Some("điện" | "nước")) {
        if any(UTILITY_OUTAGE) {
            return Priority::Urgent;
        }
        if any(UTILITY_DEGRADED) {
            return Priority::High;
        }
    }
    if category == Some("vệ sinh") && any(SANITATION_BAD) {
        return Priority::High;
    }
    Priority::High
}
