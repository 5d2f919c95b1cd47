use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub const MIN_DAYS: u32 = 1;
pub const MAX_DAYS: u32 = 7;
pub const DEFAULT_DAYS: u32 = 7;

pub const DIETARY_RESTRICTIONS: &[&str] = &[
    "vegan",
    "vegetarian",
    "pescatarian",
    "paleo",
    "keto",
    "gluten-free",
    "dairy-free",
    "nut-free",
    "soy-free",
    "halal",
    "kosher",
    "mediterranean",
    "dash",
];

pub const PREFERENCES: &[&str] = &["low-carb", "high-protein", "low-fat", "low-sodium"];

pub const SPECIAL_REQUIREMENTS: &[&str] = &["budget-friendly", "quick", "easy", "healthy"];

/// Restriction pairs that cannot both hold. Flagged, never resolved.
pub const CONFLICTS: &[(&str, &str, &str)] = &[
    (
        "vegan",
        "pescatarian",
        "Vegan excludes all animal products including fish.",
    ),
    (
        "vegan",
        "vegetarian",
        "Vegan excludes all animal products, vegetarian excludes meat but allows dairy and eggs.",
    ),
    (
        "pescatarian",
        "vegetarian",
        "Pescatarian includes fish, vegetarian does not.",
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningCategory {
    #[serde(rename = "days_unspecified")]
    DaysUnspecified,
    #[serde(rename = "days_capped_at_7")]
    DaysCappedAt7,
    #[serde(rename = "days_below_minimum")]
    DaysBelowMinimum,
    #[serde(rename = "dietary_restrictions_unspecified")]
    DietaryRestrictionsUnspecified,
    #[serde(rename = "preferences_unspecified")]
    PreferencesUnspecified,
    #[serde(rename = "special_requirements_unspecified")]
    SpecialRequirementsUnspecified,
    #[serde(rename = "conflicting_restrictions")]
    ConflictingRestrictions,
    #[serde(rename = "synonym_inference")]
    SynonymInference,
}

impl WarningCategory {
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(raw.trim().to_string())).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub category: WarningCategory,
    pub value: String,
}

impl Warning {
    pub fn new(category: WarningCategory, value: impl Into<String>) -> Self {
        Self {
            category,
            value: value.into(),
        }
    }
}

/// Typed form of a natural-language meal-plan query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredRequest {
    pub duration_days: u32,
    pub dietary_restrictions: BTreeSet<String>,
    pub preferences: BTreeSet<String>,
    pub special_requirements: BTreeSet<String>,
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

impl Default for StructuredRequest {
    fn default() -> Self {
        Self {
            duration_days: DEFAULT_DAYS,
            dietary_restrictions: BTreeSet::new(),
            preferences: BTreeSet::new(),
            special_requirements: BTreeSet::new(),
            warnings: Vec::new(),
        }
    }
}

impl StructuredRequest {
    pub fn has_warning(&self, category: WarningCategory) -> bool {
        self.warnings.iter().any(|w| w.category == category)
    }

    /// Clamp a raw duration into `[MIN_DAYS, MAX_DAYS]`, returning the
    /// warning that explains the adjustment, if any.
    pub fn clamp_duration(raw: u32) -> (u32, Option<Warning>) {
        if raw > MAX_DAYS {
            (
                MAX_DAYS,
                Some(Warning::new(
                    WarningCategory::DaysCappedAt7,
                    format!("Requested {raw} days. Limited to {MAX_DAYS} days maximum."),
                )),
            )
        } else if raw < MIN_DAYS {
            (
                MIN_DAYS,
                Some(Warning::new(
                    WarningCategory::DaysBelowMinimum,
                    format!("Requested {raw} days. Generating at least {MIN_DAYS} day."),
                )),
            )
        } else {
            (raw, None)
        }
    }

    /// Conflicting restriction pairs present in `restrictions`.
    pub fn conflicts(restrictions: &BTreeSet<String>) -> Vec<Warning> {
        CONFLICTS
            .iter()
            .filter(|(a, b, _)| restrictions.contains(*a) && restrictions.contains(*b))
            .map(|(a, b, why)| {
                Warning::new(
                    WarningCategory::ConflictingRestrictions,
                    format!("Conflicting dietary restrictions detected: {a}, {b}. {why}"),
                )
            })
            .collect()
    }

    /// Append `warning` unless an identical one is already present.
    pub fn push_warning(&mut self, warning: Warning) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn clamps_duration_with_warning() {
        let (days, warning) = StructuredRequest::clamp_duration(10);
        assert_eq!(days, 7);
        assert_eq!(warning.unwrap().category, WarningCategory::DaysCappedAt7);

        let (days, warning) = StructuredRequest::clamp_duration(0);
        assert_eq!(days, 1);
        assert_eq!(warning.unwrap().category, WarningCategory::DaysBelowMinimum);

        assert_eq!(StructuredRequest::clamp_duration(4), (4, None));
    }

    #[test]
    fn detects_each_conflicting_pair() {
        let warnings = StructuredRequest::conflicts(&set(&["vegan", "pescatarian", "keto"]));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].value.contains("vegan, pescatarian"));

        assert_eq!(
            StructuredRequest::conflicts(&set(&["vegan", "vegetarian", "pescatarian"])).len(),
            3
        );
        assert!(StructuredRequest::conflicts(&set(&["keto", "halal"])).is_empty());
    }

    #[test]
    fn warning_categories_use_taxonomy_names() {
        let w = Warning::new(WarningCategory::DaysCappedAt7, "x");
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["category"], "days_capped_at_7");
        assert_eq!(
            WarningCategory::parse("synonym_inference"),
            Some(WarningCategory::SynonymInference)
        );
        assert_eq!(WarningCategory::parse("made_up"), None);
    }
}
