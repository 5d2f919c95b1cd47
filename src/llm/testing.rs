//! Scripted LLM double for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{Completion, CompletionRequest, LlmClient, LlmError, LlmTask, TokenUsage};
use crate::generator::MealType;

type Script = dyn Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync;

pub struct ScriptedLlm {
    script: Box<Script>,
    calls: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
    /// Applied to generation calls only; validation answers at once.
    generation_delay: Option<Duration>,
}

impl ScriptedLlm {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            generation_delay: None,
        }
    }

    /// Every call fails like an unavailable provider.
    pub fn failing() -> Self {
        Self::new(|_| {
            Err(LlmError::Api {
                status: 503,
                body: "service unavailable".into(),
            })
        })
    }

    /// Answers every task with well-formed JSON; validation echoes no changes.
    pub fn chef() -> Self {
        Self::new(|req| match &req.task {
            LlmTask::QueryValidation => Err(LlmError::EmptyResponse),
            LlmTask::DayPlan { day, meal_types } => Ok(day_json(*day, meal_types)),
            LlmTask::SingleMeal { meal_type } => Ok(meal_json(*meal_type, "Retry").to_string()),
        })
    }

    pub fn with_generation_delay(mut self, delay: Duration) -> Self {
        self.generation_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.generation_delay {
            if !matches!(request.task, LlmTask::QueryValidation) {
                tokio::time::sleep(delay).await;
            }
        }
        let content = (self.script)(&request)?;
        Ok(Completion {
            content,
            usage: TokenUsage {
                prompt: 100,
                completion: 50,
                total: 150,
            },
            latency_ms: 5,
        })
    }
}

pub fn meal_json(meal_type: MealType, tag: &str) -> serde_json::Value {
    json!({
        "meal_type": meal_type.as_str(),
        "recipe_name": format!("{tag} {meal_type} dish"),
        "description": format!("A {meal_type} made for testing."),
        "ingredients": ["1 cup oats", "2 tbsp seeds"],
        "nutritional_info": { "calories": 400, "protein": 20, "carbs": 45, "fat": 12 },
        "preparation_time": "20 mins",
        "instructions": "Combine and cook until done.",
        "source": "AI Generated"
    })
}

pub fn day_json(day: u32, meal_types: &[MealType]) -> String {
    let meals: Vec<_> = meal_types
        .iter()
        .map(|t| meal_json(*t, &format!("Day {day}")))
        .collect();
    json!({ "meals": meals }).to_string()
}
