//! Fast regex pass over the raw query. No I/O, no LLM.

use std::collections::BTreeSet;
use std::time::Instant;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use super::types::{StructuredRequest, Warning, WarningCategory, DEFAULT_DAYS};

const NUMBER: &str =
    r"(\d+|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|thirteen|fourteen)";

lazy_static! {
    static ref DAYS_RE: Regex = Regex::new(&format!(r"\b{NUMBER}[\s-]*days?\b")).unwrap();
    static ref WEEKS_RE: Regex = Regex::new(&format!(r"\b{NUMBER}[\s-]*weeks?\b")).unwrap();
    static ref A_WEEK_RE: Regex = Regex::new(
        r"\b(?:a|per|whole|full|entire|for the|for a)\s+week\b|\bweekly\b|\bweek[\s-]long\b"
    )
    .unwrap();
    static ref DASH_UPPER_RE: Regex = Regex::new(r"\bDASH\b").unwrap();
    static ref RESTRICTION_RULES: Vec<(&'static str, Regex)> = vec![
        ("vegan", Regex::new(r"\bvegan\b").unwrap()),
        ("vegetarian", Regex::new(r"\bvegetarian\b").unwrap()),
        ("pescatarian", Regex::new(r"\bpescatarian\b").unwrap()),
        ("paleo", Regex::new(r"\bpaleo\b").unwrap()),
        ("keto", Regex::new(r"\bketo(?:genic)?\b").unwrap()),
        ("gluten-free", Regex::new(r"\bgluten[- ]?free\b").unwrap()),
        ("dairy-free", Regex::new(r"\bdairy[- ]?free\b").unwrap()),
        ("nut-free", Regex::new(r"\bnut[- ]?free\b").unwrap()),
        ("soy-free", Regex::new(r"\bsoy[- ]?free\b").unwrap()),
        ("halal", Regex::new(r"\bhalal\b").unwrap()),
        ("kosher", Regex::new(r"\bkosher\b").unwrap()),
        ("mediterranean", Regex::new(r"\bmediterranean\b").unwrap()),
        ("dash", Regex::new(r"\bdash[- ]diet\b").unwrap()),
    ];
    static ref PREFERENCE_RULES: Vec<(&'static str, Regex)> = vec![
        ("low-carb", Regex::new(r"\blow[- ]?carb(?:s|ohydrates?)?\b").unwrap()),
        ("high-protein", Regex::new(r"\bhigh[- ]?protein\b").unwrap()),
        ("low-fat", Regex::new(r"\blow[- ]?fat\b").unwrap()),
        ("low-sodium", Regex::new(r"\blow[- ]?(?:sodium|salt)\b").unwrap()),
    ];
    static ref REQUIREMENT_RULES: Vec<(&'static str, Regex)> = vec![
        (
            "budget-friendly",
            Regex::new(r"\b(?:budget|cheap|affordable|inexpensive|low[- ]?cost)\b").unwrap()
        ),
        (
            "quick",
            Regex::new(r"\b(?:quick|quickly|fast|rapid|15\s*min\w*|under\s*\d+\s*min\w*)\b").unwrap()
        ),
        ("easy", Regex::new(r"\b(?:easy|simple|straightforward)\b").unwrap()),
        ("healthy", Regex::new(r"\b(?:healthy|nutritious|wholesome)\b").unwrap()),
    ];
}

/// Draft request produced by the pattern pass.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub request: StructuredRequest,
    /// False when no duration phrase matched and the default was used.
    pub duration_explicit: bool,
    pub latency_ms: u64,
}

pub fn extract(query: &str) -> Extraction {
    let started = Instant::now();
    let lower = query.to_lowercase();
    let mut warnings = Vec::new();

    let (raw_days, duration_explicit) = match extract_duration(&lower) {
        Some(days) => (days, true),
        None => {
            warnings.push(Warning::new(
                WarningCategory::DaysUnspecified,
                format!("Duration not specified. Defaulting to {DEFAULT_DAYS} days."),
            ));
            (DEFAULT_DAYS, false)
        }
    };
    let (duration_days, clamp_warning) = StructuredRequest::clamp_duration(raw_days);
    warnings.extend(clamp_warning);

    let mut dietary_restrictions = matching(&RESTRICTION_RULES, &lower);
    if DASH_UPPER_RE.is_match(query) {
        dietary_restrictions.insert("dash".to_string());
    }
    let preferences = matching(&PREFERENCE_RULES, &lower);
    let special_requirements = matching(&REQUIREMENT_RULES, &lower);

    if dietary_restrictions.is_empty() {
        warnings.push(Warning::new(
            WarningCategory::DietaryRestrictionsUnspecified,
            "No dietary restrictions specified. Generating general meal plan.",
        ));
    }
    if preferences.is_empty() {
        warnings.push(Warning::new(
            WarningCategory::PreferencesUnspecified,
            "No nutritional preferences specified. Generating balanced meal plan.",
        ));
    }
    if special_requirements.is_empty() {
        warnings.push(Warning::new(
            WarningCategory::SpecialRequirementsUnspecified,
            "No special requirements specified. Generating standard meal plan.",
        ));
    }
    warnings.extend(StructuredRequest::conflicts(&dietary_restrictions));

    let latency_ms = started.elapsed().as_millis() as u64;
    debug!(
        duration_days,
        duration_explicit,
        restrictions = ?dietary_restrictions,
        preferences = ?preferences,
        special = ?special_requirements,
        latency_ms,
        "pattern extraction done"
    );

    Extraction {
        request: StructuredRequest {
            duration_days,
            dietary_restrictions,
            preferences,
            special_requirements,
            warnings,
        },
        duration_explicit,
        latency_ms,
    }
}

/// Unclamped day count named by the query, if any.
fn extract_duration(lower: &str) -> Option<u32> {
    if let Some(caps) = DAYS_RE.captures(lower) {
        return Some(parse_number(&caps[1]));
    }
    if let Some(caps) = WEEKS_RE.captures(lower) {
        return Some(parse_number(&caps[1]).saturating_mul(7));
    }
    if A_WEEK_RE.is_match(lower) {
        return Some(7);
    }
    None
}

fn parse_number(raw: &str) -> u32 {
    match raw {
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "thirteen" => 13,
        "fourteen" => 14,
        digits => digits.parse().unwrap_or(u32::MAX),
    }
}

fn matching(rules: &[(&'static str, Regex)], text: &str) -> BTreeSet<String> {
    rules
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(name, _)| name.to_string())
        .collect()
}
