//! Per-request LLM usage accounting. Each phase owns its logging object and
//! the planner merges them at the end; nothing here is global.

use serde::{Deserialize, Serialize};

use crate::llm::Completion;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmCallMetrics {
    pub tokens_prompt: u64,
    pub tokens_completion: u64,
    pub tokens_total: u64,
    pub llm_latency_ms: u64,
}

impl LlmCallMetrics {
    pub fn record(&mut self, completion: &Completion) {
        let usage = completion.usage;
        let total = if usage.total == 0 {
            usage.prompt + usage.completion
        } else {
            usage.total
        };
        self.tokens_prompt += usage.prompt;
        self.tokens_completion += usage.completion;
        self.tokens_total += total;
        self.llm_latency_ms += completion.latency_ms;
    }

    pub fn add_latency(&mut self, latency_ms: u64) {
        self.llm_latency_ms += latency_ms;
    }

    pub fn absorb(&mut self, other: &LlmCallMetrics) {
        self.tokens_prompt += other.tokens_prompt;
        self.tokens_completion += other.tokens_completion;
        self.tokens_total += other.tokens_total;
        self.llm_latency_ms += other.llm_latency_ms;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationChange {
    pub from: u32,
    pub to: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub added: Vec<String>,
    /// Items the model proposed outside the canonical vocabulary.
    pub ignored: Vec<String>,
}

impl FieldChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.ignored.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_days: Option<DurationChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dietary_restrictions: Option<FieldChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<FieldChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_requirements: Option<FieldChange>,
}

impl ValidationChanges {
    pub fn is_empty(&self) -> bool {
        self.duration_days.is_none()
            && self.dietary_restrictions.is_none()
            && self.preferences.is_none()
            && self.special_requirements.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryValidationLogging {
    #[serde(flatten)]
    pub metrics: LlmCallMetrics,
    pub regex_latency_ms: u64,
    pub total_duration_ms: u64,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes_made: Option<ValidationChanges>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayLogging {
    pub day: u32,
    #[serde(flatten)]
    pub metrics: LlmCallMetrics,
    pub single_meal_retries: u32,
    pub placeholders: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealGenerationLogging {
    #[serde(flatten)]
    pub metrics: LlmCallMetrics,
    pub total_duration_ms: u64,
    pub days_generated: u32,
    pub per_day_logging: Vec<DayLogging>,
}

impl MealGenerationLogging {
    pub fn push_day(&mut self, day: DayLogging) {
        self.metrics.absorb(&day.metrics);
        self.days_generated += 1;
        self.per_day_logging.push(day);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalLogging {
    #[serde(flatten)]
    pub metrics: LlmCallMetrics,
    pub total_duration_ms: u64,
    pub query_validation_tokens: u64,
    pub meal_generation_tokens: u64,
    pub query_validation_time_ms: u64,
    pub meal_generation_time_ms: u64,
}

impl TotalLogging {
    pub fn combine(
        query: &QueryValidationLogging,
        generation: &MealGenerationLogging,
        total_duration_ms: u64,
    ) -> Self {
        let mut metrics = query.metrics;
        metrics.absorb(&generation.metrics);
        Self {
            metrics,
            total_duration_ms,
            query_validation_tokens: query.metrics.tokens_total,
            meal_generation_tokens: generation.metrics.tokens_total,
            query_validation_time_ms: query.metrics.llm_latency_ms,
            meal_generation_time_ms: generation.metrics.llm_latency_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::TokenUsage;

    fn completion(prompt: u64, completion: u64, total: u64, latency_ms: u64) -> Completion {
        Completion {
            content: String::new(),
            usage: TokenUsage {
                prompt,
                completion,
                total,
            },
            latency_ms,
        }
    }

    #[test]
    fn record_fills_missing_total() {
        let mut m = LlmCallMetrics::default();
        m.record(&completion(10, 5, 0, 40));
        m.record(&completion(1, 1, 2, 10));
        assert_eq!(m.tokens_total, 17);
        assert_eq!(m.llm_latency_ms, 50);
    }

    #[test]
    fn combine_sums_both_phases() {
        let query = QueryValidationLogging {
            metrics: LlmCallMetrics {
                tokens_prompt: 100,
                tokens_completion: 20,
                tokens_total: 120,
                llm_latency_ms: 300,
            },
            enabled: true,
            ..Default::default()
        };
        let mut generation = MealGenerationLogging::default();
        generation.push_day(DayLogging {
            day: 1,
            metrics: LlmCallMetrics {
                tokens_prompt: 500,
                tokens_completion: 400,
                tokens_total: 900,
                llm_latency_ms: 2000,
            },
            ..Default::default()
        });

        let total = TotalLogging::combine(&query, &generation, 2500);
        assert_eq!(total.metrics.tokens_total, 1020);
        assert_eq!(total.metrics.tokens_prompt, 600);
        assert_eq!(total.query_validation_tokens, 120);
        assert_eq!(total.meal_generation_tokens, 900);
        assert_eq!(total.metrics.llm_latency_ms, 2300);
        assert_eq!(generation.days_generated, 1);
    }

    #[test]
    fn flattened_fields_serialize_at_top_level() {
        let day = DayLogging {
            day: 2,
            metrics: LlmCallMetrics {
                tokens_total: 7,
                ..Default::default()
            },
            ..Default::default()
        };
        let json = serde_json::to_value(&day).unwrap();
        assert_eq!(json["day"], 2);
        assert_eq!(json["tokens_total"], 7);
        assert!(json.get("metrics").is_none());
    }
}
