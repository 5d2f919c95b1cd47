use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{error::ApiError, state::AppState};

use super::dto::{GenerateMealPlanRequest, HealthResponse, MealPlan};
use super::services;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/generate-meal-plan", post(generate_meal_plan))
        .route("/health", get(health))
}

/// POST /generate-meal-plan { "query": "..." }
#[instrument(skip(state, body))]
pub async fn generate_meal_plan(
    State(state): State<AppState>,
    body: Result<Json<GenerateMealPlanRequest>, JsonRejection>,
) -> Result<Json<MealPlan>, ApiError> {
    let Json(body) = body.map_err(|e| {
        warn!(error = %e, "rejected request body");
        ApiError::from(e)
    })?;
    if body.query.is_empty() {
        return Err(ApiError::Unprocessable(
            "query: String should have at least 1 character".into(),
        ));
    }

    // detached: a dropped connection must not stop generation half-way
    let task = tokio::spawn(async move { services::generate_plan(&state, &body.query).await });
    let plan = task
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("generation task failed: {e}")))??;
    Ok(Json(plan))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: state.config.app_name.clone(),
    })
}
