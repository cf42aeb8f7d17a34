//! Rule-based metadata extraction: building, room, floor, elapsed time.
//!
//! Patterns accept both raw spellings ("phòng", "tầng", "10/10") and the
//! normalized ones ("phong", "tang", "10 10"). Extraction never fails; a
//! field with no match is `None`.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::types::ExtractedMeta;

/// Floors outside this range are treated as "not determined".
pub const MIN_FLOOR: u32 = 1;
pub const MAX_FLOOR: u32 = 15;

/// Vietnamese number words one..ten.
const NUMBER_WORDS: &[(&str, u32)] = &[
    ("một", 1),
    ("hai", 2),
    ("ba", 3),
    ("bốn", 4),
    ("năm", 5),
    ("sáu", 6),
    ("bảy", 7),
    ("tám", 8),
    ("chín", 9),
    ("mười", 10),
];

const NUMBER_WORD_ALT: &str = "một|hai|ba|bốn|năm|sáu|bảy|tám|chín|mười";

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid extraction regex")
}

/// Building tag + room: B3-402, b3 402, B3.402.
static BUILDING_ROOM: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b([a-z]\d)[\-\s.]?(\d{3,4})\b"));

/// Looser room markers, tried in order.
static ROOM_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        re(r"(?i)\b(?:phòng|phong|p\.?)\s*(?:khách\s*sạn\s*sinh\s*viên|kssv)?\s*[-:\s]?([a-z]?\d{2,4}(?:[a-z]\d{0,2})?)\b"),
        re(r"(?i)\bkssv\s*[-:\s]?(\d{2,4})\b"),
        re(r"(?i)\bp\s*\.?\s*([a-z]?\d{2,4}(?:[a-z]\d{0,2})?)\b"),
    ]
});

static EXPLICIT_FLOOR: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b(?:tầng|tang)\s*(\d{1,2})\b"));

static TRAILING_ROOM_DIGITS: LazyLock<Regex> = LazyLock::new(|| re(r"(\d{3,4})$"));

/// Fixed colloquial phrases. List order is precedence order.
static FIXED_TIME_PHRASES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"từ\s*tối\s*qua",
        r"tối\s*qua",
        r"đêm\s*qua",
        r"chiều\s*hôm\s*qua",
        r"hôm\s*qua",
        r"hôm\s*kia",
        r"sáng\s*nay",
        r"trưa\s*nay",
        r"chiều\s*nay",
        r"tối\s*nay",
        r"hôm\s*nay",
        r"từ\s*sáng",
    ]
    .iter()
    .map(|p| re(&format!(r"(?i)\b{p}\b")))
    .collect()
});

static CALENDAR_DATE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\bngày\s*(\d{1,2})\s*[/\-.\s]\s*(\d{1,2})(?:\s*[/\-.\s]\s*(\d{2,4}))?\b")
});

static DAYS_AGO_NUMERIC: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        re(r"(?i)\bcách\s*đây\s*(\d{1,2})\s*(?:ngày|hôm)\b"),
        re(r"(?i)\b(\d{1,2})\s*(?:ngày|hôm)\s*trước\b"),
    ]
});

static DAYS_AGO_WORDS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        re(&format!(r"(?i)\bcách\s*đây\s*({NUMBER_WORD_ALT})\s*(?:ngày|hôm)\b")),
        re(&format!(r"(?i)\b({NUMBER_WORD_ALT})\s*(?:ngày|hôm)\s*trước\b")),
    ]
});

static DAYS_RECENT_NUMERIC: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        re(r"(?i)\b(\d{1,2})\s*(?:ngày|hôm)\s*nay\b"),
        re(r"(?i)\b(\d{1,2})\s*(?:ngày|hôm)\b"),
    ]
});

static DAYS_RECENT_WORDS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        re(&format!(r"(?i)\b({NUMBER_WORD_ALT})\s*(?:ngày|hôm)\s*nay\b")),
        re(&format!(r"(?i)\b({NUMBER_WORD_ALT})\s*(?:ngày|hôm)\b")),
    ]
});

static VAGUE_RECENT: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b(?:mấy|vài)\s*(?:hôm|ngày)(?:\s*nay)?\b"));

/// Extract building, room, floor and elapsed time from report text.
pub fn extract(text: &str) -> ExtractedMeta {
    let text = text.trim();
    let mut meta = ExtractedMeta::default();

    if let Some(caps) = BUILDING_ROOM.captures(text) {
        meta.building = Some(caps[1].to_uppercase());
        meta.room = Some(caps[2].to_string());
    } else {
        meta.room = ROOM_PATTERNS
            .iter()
            .find_map(|p| p.captures(text))
            .map(|caps| clean_room_token(&caps[1]))
            .filter(|room| !room.is_empty());
    }

    meta.floor = explicit_floor(text).or_else(|| meta.room.as_deref().and_then(infer_floor_from_room));
    meta.elapsed_time = extract_elapsed_time(text);
    meta
}

/// "tầng N"; a value outside the building's floors is ignored, which lets
/// the room digits decide.
fn explicit_floor(text: &str) -> Option<String> {
    EXPLICIT_FLOOR
        .captures(text)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .filter(|n| (MIN_FLOOR..=MAX_FLOOR).contains(n))
        .map(|n| n.to_string())
}

/// Strip spaces and hyphens, upper-case.
fn clean_room_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_uppercase)
        .collect()
}

/// Floor implied by a room string.
///
/// The digits after the last '-' win ("B3-402" → 402); otherwise the trailing
/// 3–4 digit run ("KSSV214" → 214); otherwise every digit in the string.
pub fn infer_floor_from_room(room: &str) -> Option<String> {
    let room = room.trim();
    let digits: String = if let Some((_, tail)) = room.rsplit_once('-') {
        tail.chars().filter(char::is_ascii_digit).collect()
    } else if let Some(caps) = TRAILING_ROOM_DIGITS.captures(room) {
        caps[1].to_string()
    } else {
        room.chars().filter(char::is_ascii_digit).collect()
    };
    floor_from_digits(&digits)
}

/// ≥4 digits: the first two are the floor (1205 → 12); otherwise the first
/// digit (402 → 4). Out-of-range results are rejected, never clamped.
pub fn floor_from_digits(digits: &str) -> Option<String> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let prefix_len = if digits.len() >= 4 { 2 } else { 1 };
    let floor: u32 = digits[..prefix_len].parse().ok()?;
    (MIN_FLOOR..=MAX_FLOOR)
        .contains(&floor)
        .then(|| floor.to_string())
}

fn number_word(word: &str) -> Option<u32> {
    let word = word.to_lowercase();
    NUMBER_WORDS
        .iter()
        .find(|(w, _)| *w == word)
        .map(|(_, n)| *n)
}

fn first_capture<'t>(patterns: &[Regex], text: &'t str) -> Option<Captures<'t>> {
    patterns.iter().find_map(|p| p.captures(text))
}

/// Tiers are checked strictly in order; the first tier that matches wins.
fn extract_elapsed_time(text: &str) -> Option<String> {
    // 1. fixed colloquial phrases
    if let Some(m) = FIXED_TIME_PHRASES.iter().find_map(|p| p.find(text)) {
        return Some(collapse_whitespace(&m.as_str().to_lowercase()));
    }

    // 2. calendar date
    if let Some(date) = CALENDAR_DATE.captures(text).and_then(|caps| format_date(&caps)) {
        return Some(date);
    }

    // 3. "N ngày trước" / "cách đây N ngày"
    if let Some(n) = first_capture(&DAYS_AGO_NUMERIC, text).and_then(|c| c[1].parse::<u32>().ok()) {
        return Some(format!("{n} ngày trước"));
    }

    // 4. same with spelled-out numbers
    if let Some(n) = first_capture(&DAYS_AGO_WORDS, text).and_then(|c| number_word(&c[1])) {
        return Some(format!("{n} ngày trước"));
    }

    // 5. generic "N ngày (nay)", numeric then spelled-out
    if let Some(n) = first_capture(&DAYS_RECENT_NUMERIC, text).and_then(|c| c[1].parse::<u32>().ok()) {
        return Some(format!("{n} ngày gần đây"));
    }
    if let Some(n) = first_capture(&DAYS_RECENT_WORDS, text).and_then(|c| number_word(&c[1])) {
        return Some(format!("{n} ngày gần đây"));
    }

    // 6. vague recency
    if VAGUE_RECENT.is_match(text) {
        return Some("gần đây".to_string());
    }

    None
}

fn format_date(caps: &Captures) -> Option<String> {
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return None;
    }
    Some(match caps.get(3) {
        Some(year) => format!("ngày {day}/{month}/{}", year.as_str()),
        None => format!("ngày {day}/{month}"),
    })
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
