use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::generator::DayPlan;
use crate::parser::Warning;
use crate::telemetry::{MealGenerationLogging, QueryValidationLogging, TotalLogging};

#[derive(Debug, Deserialize)]
pub struct GenerateMealPlanRequest {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_meals: usize,
    pub dietary_compliance: Vec<String>,
    pub estimated_cost: String,
    pub avg_prep_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlan {
    pub id: Uuid,
    pub duration_days: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub meal_plan: Vec<DayPlan>,
    pub summary: Summary,
    #[serde(default)]
    pub warnings: Vec<Warning>,
    pub query_validation_llm_logging: QueryValidationLogging,
    pub meal_generation_llm_logging: MealGenerationLogging,
    pub total_llm_logging: TotalLogging,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
}
