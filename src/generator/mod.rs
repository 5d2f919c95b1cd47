//! Sequential per-day meal generation with tiered fallback:
//! full-day LLM call, then single-meal LLM call, then a static placeholder.

mod context;
mod meal;
pub mod slot;

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::Date;
use tracing::{info, instrument, warn};

use crate::llm::{extract_json, CompletionRequest, LlmClient, LlmTask, ResponseFormat};
use crate::parser::StructuredRequest;
use crate::prompts::{self, Constraints, DayPromptInput};
use crate::telemetry::{DayLogging, MealGenerationLogging};

use context::DiversityContext;
pub use meal::{Meal, MealType};
use slot::{MealSlot, Resolution, SlotFailure};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    pub day: u32,
    /// `YYYY-MM-DD`
    pub date: String,
    pub meals: Vec<Meal>,
}

#[derive(Debug, Clone)]
pub struct GeneratedDays {
    pub days: Vec<DayPlan>,
    pub logging: MealGenerationLogging,
}

#[derive(Clone)]
pub struct MealGenerator {
    llm: Arc<dyn LlmClient>,
}

impl MealGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Days run strictly in order: each prompt carries the digest of every
    /// day before it.
    #[instrument(skip(self, request), fields(duration_days = request.duration_days))]
    pub async fn generate(&self, request: &StructuredRequest, start: Date) -> GeneratedDays {
        let started = Instant::now();
        let conflict_note = conflict_note(request);
        let constraints = constraints(request, conflict_note.as_deref());

        let mut context = DiversityContext::default();
        let mut logging = MealGenerationLogging::default();
        let mut days = Vec::with_capacity(request.duration_days as usize);

        for day in 1..=request.duration_days {
            let date = start
                .checked_add(time::Duration::days(i64::from(day - 1)))
                .unwrap_or(start)
                .to_string();
            let (plan, day_logging) = self.generate_day(day, &date, &constraints, &context).await;
            info!(
                day,
                %date,
                meals = plan.meals.len(),
                retries = day_logging.single_meal_retries,
                placeholders = day_logging.placeholders,
                tokens = day_logging.metrics.tokens_total,
                "day generated"
            );
            context.record_day(day, &plan.meals);
            logging.push_day(day_logging);
            days.push(plan);
        }

        logging.total_duration_ms = started.elapsed().as_millis() as u64;
        info!(
            days = days.len(),
            tokens = logging.metrics.tokens_total,
            llm_latency_ms = logging.metrics.llm_latency_ms,
            total_ms = logging.total_duration_ms,
            "meal generation finished"
        );
        GeneratedDays { days, logging }
    }

    async fn generate_day(
        &self,
        day: u32,
        date: &str,
        constraints: &Constraints<'_>,
        context: &DiversityContext,
    ) -> (DayPlan, DayLogging) {
        let meal_types = MealType::for_day(day);
        let mut day_logging = DayLogging {
            day,
            ..Default::default()
        };
        let mut slots: Vec<MealSlot> = meal_types.iter().copied().map(MealSlot::new).collect();

        for slot in &mut slots {
            slot.begin_day_attempt();
        }
        match self
            .request_day(day, date, &meal_types, constraints, context, &mut day_logging)
            .await
        {
            Ok(mut candidates) => {
                for slot in &mut slots {
                    let result = take_candidate(&mut candidates, slot.meal_type)
                        .ok_or(SlotFailure::Missing(slot.meal_type))
                        .and_then(|value| {
                            Meal::from_llm_value(&value, slot.meal_type).map_err(SlotFailure::from)
                        });
                    if let Err(e) = &result {
                        warn!(day, meal_type = %slot.meal_type, error = %e, "day response meal rejected");
                    }
                    slot.on_day_result(result);
                }
            }
            Err(failure) => {
                warn!(day, error = %failure, "day request failed; retrying each meal on its own");
                for slot in &mut slots {
                    slot.on_day_result(Err(failure.clone()));
                }
            }
        }

        for slot in slots.iter_mut().filter(|s| s.needs_single_attempt()) {
            day_logging.single_meal_retries += 1;
            let result = self
                .request_single(slot.meal_type, constraints, context, &mut day_logging)
                .await;
            match &result {
                Ok(_) => info!(day, meal_type = %slot.meal_type, "single-meal retry succeeded"),
                Err(e) => warn!(day, meal_type = %slot.meal_type, error = %e, "single-meal retry failed; using placeholder"),
            }
            slot.on_single_result(result);
        }

        let mut meals = Vec::with_capacity(slots.len());
        for slot in slots {
            let (meal, resolution) = slot.finish();
            if resolution == Resolution::Placeholder {
                day_logging.placeholders += 1;
            }
            meals.push(meal);
        }

        (
            DayPlan {
                day,
                date: date.to_string(),
                meals,
            },
            day_logging,
        )
    }

    async fn request_day(
        &self,
        day: u32,
        date: &str,
        meal_types: &[MealType],
        constraints: &Constraints<'_>,
        context: &DiversityContext,
        day_logging: &mut DayLogging,
    ) -> Result<Vec<Value>, SlotFailure> {
        let previous_meals = context.previous_meals();
        let previous_nutrition = context.nutrition_summary();
        let prompt = prompts::day_plan(&DayPromptInput {
            day,
            date,
            meal_types,
            constraints,
            previous_meals: &previous_meals,
            previous_nutrition: &previous_nutrition,
        });

        let completion = self
            .llm
            .complete(CompletionRequest {
                task: LlmTask::DayPlan {
                    day,
                    meal_types: meal_types.to_vec(),
                },
                system: prompts::DAY_PLAN_SYSTEM.to_string(),
                prompt,
                temperature: 0.6,
                format: ResponseFormat::JsonObject,
            })
            .await
            .map_err(|e| SlotFailure::Request(e.to_string()))?;
        day_logging.metrics.record(&completion);

        let parsed: Value = serde_json::from_str(extract_json(&completion.content))
            .map_err(|e| SlotFailure::Malformed(e.to_string()))?;
        match parsed {
            Value::Object(mut obj) => match obj.remove("meals") {
                Some(Value::Array(meals)) => Ok(meals),
                _ => Err(SlotFailure::Malformed("missing `meals` array".into())),
            },
            Value::Array(meals) => Ok(meals),
            _ => Err(SlotFailure::Malformed("expected an object with `meals`".into())),
        }
    }

    async fn request_single(
        &self,
        meal_type: MealType,
        constraints: &Constraints<'_>,
        context: &DiversityContext,
        day_logging: &mut DayLogging,
    ) -> Result<Meal, SlotFailure> {
        let prompt = prompts::single_meal(meal_type, constraints, &context.previous_recipe_names());
        let completion = self
            .llm
            .complete(CompletionRequest {
                task: LlmTask::SingleMeal { meal_type },
                system: prompts::SINGLE_MEAL_SYSTEM.to_string(),
                prompt,
                temperature: 0.6,
                format: ResponseFormat::JsonObject,
            })
            .await
            .map_err(|e| SlotFailure::Request(e.to_string()))?;
        day_logging.metrics.record(&completion);

        let mut value: Value = serde_json::from_str(extract_json(&completion.content))
            .map_err(|e| SlotFailure::Malformed(e.to_string()))?;
        // some models wrap the single meal like a day response
        let nested = value
            .get_mut("meals")
            .and_then(Value::as_array_mut)
            .map(|meals| take_candidate(meals, meal_type));
        if let Some(candidate) = nested {
            value = candidate.ok_or(SlotFailure::Missing(meal_type))?;
        }
        Ok(Meal::from_llm_value(&value, meal_type)?)
    }
}

/// Remove and return the first candidate claiming `meal_type`.
fn take_candidate(candidates: &mut Vec<Value>, meal_type: MealType) -> Option<Value> {
    let idx = candidates.iter().position(|c| {
        c.get("meal_type")
            .and_then(Value::as_str)
            .map(|t| t.trim().eq_ignore_ascii_case(meal_type.as_str()))
            .unwrap_or(false)
    })?;
    Some(candidates.remove(idx))
}

fn join_or_none<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    let joined = items
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        "none".to_string()
    } else {
        joined
    }
}

fn constraints<'a>(request: &StructuredRequest, conflict_note: Option<&'a str>) -> Constraints<'a> {
    Constraints {
        restrictions: join_or_none(&request.dietary_restrictions),
        preferences: join_or_none(&request.preferences),
        requirements: join_or_none(&request.special_requirements),
        conflict_note,
    }
}

/// Conflicting restrictions go to the model as requested; nothing is dropped.
fn conflict_note(request: &StructuredRequest) -> Option<String> {
    let conflicts = StructuredRequest::conflicts(&request.dietary_restrictions);
    if conflicts.is_empty() {
        return None;
    }
    Some(format!(
        "The user asked for these restrictions together even though they conflict: {}. \
         Respect every listed restriction; do not drop any of them.",
        join_or_none(&request.dietary_restrictions)
    ))
}
