//! Text normalizer applied before any model or extraction step.
//!
//! NFC → lowercase → phrase substitution → punctuation strip → stop-word
//! removal → whitespace collapse. The pass is repeated until the text stops
//! changing, so `normalize(normalize(x)) == normalize(x)`.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Upper bound on normalization passes. Real reports settle in one or two.
const MAX_PASSES: usize = 8;

/// Ordered phrase substitutions. Canonical outputs that contain one of the
/// sources appear first as identity entries so they are never rewritten again.
const SUBSTITUTIONS: &[(&str, &str)] = &[
    // water leaks
    ("rò rỉ nước", "rò rỉ nước"),
    ("rò rỉ gas", "rò rỉ gas"),
    ("vòi bị rỉ", "rò rỉ nước"),
    ("rò nước", "rò rỉ nước"),
    ("rò rỉ", "rò rỉ nước"),
    // dormitory naming
    ("khách sạn sinh viên", "kssv"),
    ("ký túc xá", "kssv"),
    ("ký túc", "kssv"),
    ("ktx", "kssv"),
    ("khu vực", "khu"),
    ("phòng", "phong"),
    ("tầng", "tang"),
    // connectivity
    ("wi-fi", "wifi"),
    ("wi fi", "wifi"),
    ("mất mạng", "mất internet"),
    ("mạng", "internet"),
    // electrical / equipment
    ("thiết bị điện", "thiết bị"),
    ("thiết bị", "thiết bị"),
    ("đèn điện", "điện"),
    ("bị hỏng", "hỏng"),
    // sanitation
    ("nhà tắm", "vệ sinh"),
    ("toilet", "vệ sinh"),
    ("wc", "vệ sinh"),
];

/// Filler words dropped after substitution. Multi-word entries come first.
const STOP_WORDS: &[&str] = &[
    "phản ánh", "báo cáo", "tình trạng", "luôn luôn",
    "bị", "trong", "ở", "tại", "đã", "vẫn", "rất", "có", "này", "kia", "đó",
    "rồi", "luôn", "đang", "vừa", "cũng", "chưa", "nữa",
];

/// Compounds that must survive stop-word removal intact.
const PROTECTED_PHRASES: &[&str] = &["thiết bị"];

static SUBSTITUTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = SUBSTITUTIONS
        .iter()
        .map(|(from, _)| regex::escape(from))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b(?:{alternation})\b")).expect("Invalid substitution table")
});

static SUBSTITUTION_TARGETS: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| SUBSTITUTIONS.iter().copied().collect());

static STOP_WORD_TOKENS: LazyLock<Vec<Vec<&'static str>>> =
    LazyLock::new(|| split_phrases(STOP_WORDS));

static PROTECTED_TOKENS: LazyLock<Vec<Vec<&'static str>>> =
    LazyLock::new(|| split_phrases(PROTECTED_PHRASES));

fn split_phrases(phrases: &[&'static str]) -> Vec<Vec<&'static str>> {
    phrases
        .iter()
        .map(|p| p.split_whitespace().collect())
        .collect()
}

/// Canonicalize a raw report. Pure, never fails; empty input yields "".
pub fn normalize(text: &str) -> String {
    let mut current = normalize_pass(text);
    for _ in 1..MAX_PASSES {
        let next = normalize_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn normalize_pass(text: &str) -> String {
    let composed: String = text.nfc().collect();
    let lowered = composed.to_lowercase();
    let substituted = substitute_phrases(&lowered);
    let stripped = strip_punctuation(&substituted);
    remove_stop_words(&stripped)
}

fn substitute_phrases(text: &str) -> String {
    SUBSTITUTION_RE
        .replace_all(text, |caps: &regex::Captures| {
            let matched = &caps[0];
            SUBSTITUTION_TARGETS
                .get(matched)
                .copied()
                .unwrap_or(matched)
                .to_string()
        })
        .into_owned()
}

/// Anything that is not a letter, digit or whitespace becomes a space.
fn strip_punctuation(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect()
}

/// Whole-word stop-word removal; also collapses whitespace and trims.
fn remove_stop_words(text: &str) -> String {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut kept: Vec<&str> = Vec::with_capacity(tokens.len());
    let mut i = 0;

    'outer: while i < tokens.len() {
        let rest = &tokens[i..];
        for protected in PROTECTED_TOKENS.iter() {
            if rest.starts_with(protected) {
                kept.extend_from_slice(&rest[..protected.len()]);
                i += protected.len();
                continue 'outer;
            }
        }
        for stop in STOP_WORD_TOKENS.iter() {
            if rest.starts_with(stop) {
                i += stop.len();
                continue 'outer;
            }
        }
        kept.push(tokens[i]);
        i += 1;
    }

    kept.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn lowercases_and_strips_punctuation() {
        assert_eq!(normalize("Mất ĐIỆN!!!"), "mất điện");
    }

    #[test]
    fn composes_decomposed_vietnamese() {
        // "điện" written with combining marks
        let decomposed = "đie\u{0323}\u{0302}n";
        assert_eq!(normalize(decomposed), "điện");
    }

    #[test]
    fn dormitory_names_collapse_to_kssv() {
        assert_eq!(normalize("KTX khu B"), "kssv khu b");
        assert_eq!(normalize("Ký túc xá khu vực A"), "kssv khu a");
    }

    #[test]
    fn wifi_variants_share_one_token() {
        assert_eq!(normalize("Wi-Fi yếu"), "wifi yếu");
        assert_eq!(normalize("wi fi yếu"), "wifi yếu");
        assert_eq!(normalize("WIFI yếu"), "wifi yếu");
    }

    #[test]
    fn network_outage_becomes_internet() {
        assert_eq!(normalize("Phòng 203 mất mạng"), "phong 203 mất internet");
        assert_eq!(normalize("mạng chậm"), "internet chậm");
    }

    #[test]
    fn leak_synonyms_collapse() {
        assert_eq!(normalize("vòi bị rỉ"), "rò rỉ nước");
        assert_eq!(normalize("rò nước"), "rò rỉ nước");
        assert_eq!(normalize("rò rỉ"), "rò rỉ nước");
        assert_eq!(normalize("rò rỉ nước"), "rò rỉ nước");
        assert_eq!(normalize("rò rỉ gas"), "rò rỉ gas");
    }

    #[test]
    fn removes_stop_words_as_whole_words() {
        assert_eq!(normalize("Phản ánh: đèn đã bị hỏng rồi"), "đèn hỏng");
        // "có" inside another word is untouched
        assert_eq!(normalize("cống"), "cống");
    }

    #[test]
    fn equipment_compound_survives() {
        assert_eq!(normalize("thiết bị điện bị hỏng"), "thiết bị hỏng");
        assert_eq!(normalize("Thiết bị hỏng"), "thiết bị hỏng");
    }

    #[test]
    fn sanitation_synonyms() {
        assert_eq!(normalize("WC tắc"), "vệ sinh tắc");
        assert_eq!(normalize("nhà tắm bẩn"), "vệ sinh bẩn");
    }

    #[test]
    fn keeps_room_digits_apart() {
        assert_eq!(normalize("B3-402 mất nước"), "b3 402 mất nước");
    }

    #[test]
    fn empty_and_blank_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \t\n "), "");
        assert_eq!(normalize("!!! ..."), "");
    }

    #[test]
    fn stop_word_removal_exposing_new_phrase_still_idempotent() {
        // removing "rất" brings "đèn điện" together
        let once = normalize("đèn rất điện");
        assert_eq!(once, "điện");
        assert_eq!(normalize(&once), once);
    }

    const WORDS: &[&str] = &[
        "Phòng", "phòng", "tầng", "B3-402", "KTX", "ký", "túc", "xá", "đã", "bị", "hỏng",
        "rò", "rỉ", "nước", "vòi", "Wi-Fi", "wifi", "mạng", "mất", "điện", "đèn", "thiết",
        "bị", "rất", "rồi", "có", "WC", "toilet", "nhà", "tắm", "!", ",", ".", "-", "?",
        "tối", "qua", "3", "ngày", "trước", "khu", "vực", "phản", "ánh", "luôn", "bốc",
        "khói", "1205", "P.305", "internet", "chập", "chờn",
    ];

    proptest! {
        #[test]
        fn normalize_is_idempotent(words in prop::collection::vec(prop::sample::select(WORDS), 0..16)) {
            let text = words.join(" ");
            let once = normalize(&text);
            prop_assert_eq!(normalize(&once), once.clone());
        }

        #[test]
        fn output_has_no_punctuation_or_double_spaces(words in prop::collection::vec(prop::sample::select(WORDS), 0..16)) {
            let out = normalize(&words.join(""));
            prop_assert!(out.chars().all(|c| c.is_alphanumeric() || c == ' '));
            prop_assert!(!out.contains("  "));
            prop_assert_eq!(out.trim(), out.as_str());
        }
    }
}
