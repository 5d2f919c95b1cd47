use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::generator::{DayPlan, GeneratedDays};
use crate::parser::{ParsedQuery, StructuredRequest};
use crate::telemetry::TotalLogging;

use super::dto::{MealPlan, Summary};

lazy_static! {
    static ref FIRST_INT_RE: Regex = Regex::new(r"\d+").unwrap();
}

const DEFAULT_PREP_TIME: &str = "25 mins";

pub fn summarize(request: &StructuredRequest, days: &[DayPlan]) -> Summary {
    let total_meals: usize = days.iter().map(|d| d.meals.len()).sum();

    let minutes: Vec<u64> = days
        .iter()
        .flat_map(|d| &d.meals)
        .filter_map(|m| FIRST_INT_RE.find(&m.preparation_time))
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    let avg_prep_time = if minutes.is_empty() {
        DEFAULT_PREP_TIME.to_string()
    } else {
        format!("{} mins", minutes.iter().sum::<u64>() / minutes.len() as u64)
    };

    let base = if request.special_requirements.contains("budget-friendly") {
        2.0
    } else {
        3.5
    };
    let meals = total_meals as f64;
    let estimated_cost = format!("${}-{}", (meals * base) as u64, (meals * (base + 1.5)) as u64);

    let dietary_compliance = request
        .dietary_restrictions
        .iter()
        .chain(request.preferences.iter())
        .cloned()
        .collect();

    Summary {
        total_meals,
        dietary_compliance,
        estimated_cost,
        avg_prep_time,
    }
}

/// Builds the response for a freshly generated plan.
pub fn assemble(parsed: &ParsedQuery, generated: GeneratedDays, elapsed_ms: u64) -> MealPlan {
    let summary = summarize(&parsed.request, &generated.days);
    let total = TotalLogging::combine(&parsed.logging, &generated.logging, elapsed_ms);
    MealPlan {
        id: Uuid::new_v4(),
        duration_days: parsed.request.duration_days,
        generated_at: OffsetDateTime::now_utc(),
        meal_plan: generated.days,
        summary,
        warnings: parsed.request.warnings.clone(),
        query_validation_llm_logging: parsed.logging.clone(),
        meal_generation_llm_logging: generated.logging,
        total_llm_logging: total,
    }
}

/// A cached plan keeps its content; warnings and query logging describe the
/// request that hit it.
pub fn refresh_cached(mut plan: MealPlan, parsed: &ParsedQuery, elapsed_ms: u64) -> MealPlan {
    plan.warnings = parsed.request.warnings.clone();
    plan.query_validation_llm_logging = parsed.logging.clone();
    plan.total_llm_logging =
        TotalLogging::combine(&parsed.logging, &plan.meal_generation_llm_logging, elapsed_ms);
    plan
}
