use std::time::Instant;

use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::cache::CacheKey;
use crate::error::ApiError;
use crate::state::AppState;

use super::assembler;
use super::dto::MealPlan;

pub const MAX_QUERY_CHARS: usize = 2000;

#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("Invalid request: {0}")]
    InvalidQuery(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<PlannerError> for ApiError {
    fn from(e: PlannerError) -> Self {
        match e {
            PlannerError::InvalidQuery(msg) => ApiError::BadRequest(format!("Invalid request: {msg}")),
            PlannerError::Internal(e) => ApiError::Internal(e),
        }
    }
}

fn check_query(query: &str) -> Result<(), PlannerError> {
    if query.trim().is_empty() {
        return Err(PlannerError::InvalidQuery("query must not be blank".into()));
    }
    let chars = query.chars().count();
    if chars > MAX_QUERY_CHARS {
        return Err(PlannerError::InvalidQuery(format!(
            "query is {chars} characters; the limit is {MAX_QUERY_CHARS}"
        )));
    }
    Ok(())
}

/// Parse, look up the cache, otherwise generate day by day and cache the result.
#[instrument(skip(state, query), fields(query_len = query.len()))]
pub async fn generate_plan(state: &AppState, query: &str) -> Result<MealPlan, PlannerError> {
    check_query(query)?;
    let started = Instant::now();

    let parsed = state.parser.parse(query).await;
    let key = CacheKey::from_request(&parsed.request);

    if let Some(cached) = state.cache.get(&key).await {
        let plan = assembler::refresh_cached(cached, &parsed, started.elapsed().as_millis() as u64);
        info!(plan_id = %plan.id, total_ms = plan.total_llm_logging.total_duration_ms, "served from cache");
        return Ok(plan);
    }

    let start_date = OffsetDateTime::now_utc().date();
    let generated = state.generator.generate(&parsed.request, start_date).await;
    let plan = assembler::assemble(&parsed, generated, started.elapsed().as_millis() as u64);
    state.cache.put(&key, &plan).await;

    info!(
        plan_id = %plan.id,
        days = plan.duration_days,
        meals = plan.summary.total_meals,
        tokens = plan.total_llm_logging.metrics.tokens_total,
        total_ms = plan.total_llm_logging.total_duration_ms,
        "meal plan generated"
    );
    Ok(plan)
}
