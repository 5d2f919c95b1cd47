//! LLM pass that corrects and extends the pattern draft. Never fails the
//! request: any problem returns the draft unchanged with `enabled = false`.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::extractor::Extraction;
use super::types::{
    StructuredRequest, Warning, WarningCategory, DIETARY_RESTRICTIONS, PREFERENCES,
    SPECIAL_REQUIREMENTS,
};
use crate::llm::{extract_json, CompletionRequest, LlmClient, LlmTask, ResponseFormat};
use crate::prompts;
use crate::telemetry::{DurationChange, FieldChange, QueryValidationLogging, ValidationChanges};

#[derive(Debug, Deserialize)]
struct ValidationReply {
    validated: ValidatedFields,
    #[serde(default)]
    additional_warnings: Vec<ReplyWarning>,
}

#[derive(Debug, Deserialize)]
struct ValidatedFields {
    duration_days: i64,
    #[serde(default)]
    dietary_restrictions: Vec<String>,
    #[serde(default)]
    preferences: Vec<String>,
    #[serde(default)]
    special_requirements: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ReplyWarning {
    category: String,
    value: String,
}

/// What the model gets to see: the draft without the pattern warnings.
#[derive(Serialize)]
struct DraftView<'a> {
    duration_days: u32,
    dietary_restrictions: &'a BTreeSet<String>,
    preferences: &'a BTreeSet<String>,
    special_requirements: &'a BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct Validation {
    pub request: StructuredRequest,
    pub logging: QueryValidationLogging,
}

#[derive(Clone)]
pub struct QueryValidator {
    llm: Arc<dyn LlmClient>,
    enabled: bool,
}

impl QueryValidator {
    pub fn new(llm: Arc<dyn LlmClient>, enabled: bool) -> Self {
        Self { llm, enabled }
    }

    pub async fn validate(&self, query: &str, extraction: &Extraction) -> Validation {
        let draft = &extraction.request;
        let mut logging = QueryValidationLogging {
            regex_latency_ms: extraction.latency_ms,
            ..Default::default()
        };

        if !self.enabled || !self.llm.is_configured() {
            debug!(enabled = self.enabled, "llm query validation skipped");
            return Validation {
                request: draft.clone(),
                logging,
            };
        }

        let draft_json = serde_json::to_string_pretty(&DraftView {
            duration_days: draft.duration_days,
            dietary_restrictions: &draft.dietary_restrictions,
            preferences: &draft.preferences,
            special_requirements: &draft.special_requirements,
        })
        .unwrap_or_else(|_| "{}".to_string());
        let prompt = prompts::query_validation(&prompts::ValidationPromptInput {
            query,
            draft_json: &draft_json,
            restrictions: DIETARY_RESTRICTIONS,
            preferences: PREFERENCES,
            requirements: SPECIAL_REQUIREMENTS,
        });

        let started = Instant::now();
        let completion = match self
            .llm
            .complete(CompletionRequest {
                task: LlmTask::QueryValidation,
                system: prompts::QUERY_VALIDATION_SYSTEM.to_string(),
                prompt,
                temperature: 0.3,
                format: ResponseFormat::JsonSchema {
                    name: "query_validation",
                    schema: prompts::query_validation_schema(),
                },
            })
            .await
        {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "llm query validation failed; keeping pattern draft");
                logging.metrics.add_latency(started.elapsed().as_millis() as u64);
                logging.error = Some(e.to_string());
                return Validation {
                    request: draft.clone(),
                    logging,
                };
            }
        };
        logging.metrics.record(&completion);

        let reply: ValidationReply = match serde_json::from_str(extract_json(&completion.content)) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "llm query validation reply does not match schema; keeping pattern draft");
                logging.error = Some(format!("invalid validation reply: {e}"));
                return Validation {
                    request: draft.clone(),
                    logging,
                };
            }
        };

        let (request, changes) = merge(draft, extraction.duration_explicit, reply);
        if changes.is_empty() {
            info!("llm validation made no changes");
        } else {
            info!(changes = ?changes, "llm validation adjusted the request");
        }
        logging.enabled = true;
        logging.changes_made = Some(changes);
        Validation { request, logging }
    }
}

/// Fold the model's answer into the draft. Only additions from the
/// canonical vocabulary are taken; nothing extracted is ever removed.
fn merge(
    draft: &StructuredRequest,
    duration_explicit: bool,
    reply: ValidationReply,
) -> (StructuredRequest, ValidationChanges) {
    let mut request = draft.clone();
    let mut changes = ValidationChanges::default();

    if !duration_explicit {
        let raw = u32::try_from(reply.validated.duration_days.max(0)).unwrap_or(u32::MAX);
        // the model inferred a duration, even if it clamps back to the default
        if raw != draft.duration_days {
            let (days, warning) = StructuredRequest::clamp_duration(raw);
            if days != draft.duration_days {
                changes.duration_days = Some(DurationChange {
                    from: draft.duration_days,
                    to: days,
                });
            }
            request.duration_days = days;
            request
                .warnings
                .retain(|w| w.category != WarningCategory::DaysUnspecified);
            if let Some(w) = warning {
                request.push_warning(w);
            }
        }
    }

    changes.dietary_restrictions = extend_field(
        &mut request.dietary_restrictions,
        &mut request.warnings,
        reply.validated.dietary_restrictions,
        DIETARY_RESTRICTIONS,
        WarningCategory::DietaryRestrictionsUnspecified,
    );
    changes.preferences = extend_field(
        &mut request.preferences,
        &mut request.warnings,
        reply.validated.preferences,
        PREFERENCES,
        WarningCategory::PreferencesUnspecified,
    );
    changes.special_requirements = extend_field(
        &mut request.special_requirements,
        &mut request.warnings,
        reply.validated.special_requirements,
        SPECIAL_REQUIREMENTS,
        WarningCategory::SpecialRequirementsUnspecified,
    );

    for w in reply.additional_warnings {
        match WarningCategory::parse(&w.category) {
            // everything else is recomputed locally
            Some(WarningCategory::SynonymInference) => {
                if !request.has_warning(WarningCategory::SynonymInference) {
                    request.push_warning(Warning::new(WarningCategory::SynonymInference, w.value));
                }
            }
            Some(_) => {}
            None => debug!(category = %w.category, "dropping unknown warning category"),
        }
    }

    for conflict in StructuredRequest::conflicts(&request.dietary_restrictions) {
        request.push_warning(conflict);
    }

    (request, changes)
}

fn extend_field(
    field: &mut BTreeSet<String>,
    warnings: &mut Vec<Warning>,
    proposed: Vec<String>,
    vocabulary: &[&'static str],
    unspecified: WarningCategory,
) -> Option<FieldChange> {
    let mut change = FieldChange::default();
    for raw in proposed {
        match canonical(&raw, vocabulary) {
            Some(item) if !field.contains(item) => change.added.push(item.to_string()),
            Some(_) => {}
            None => change.ignored.push(raw),
        }
    }
    change.added.sort();
    change.added.dedup();
    if !change.added.is_empty() {
        field.extend(change.added.iter().cloned());
        warnings.retain(|w| w.category != unspecified);
    }
    (!change.is_empty()).then_some(change)
}

fn canonical(raw: &str, vocabulary: &[&'static str]) -> Option<&'static str> {
    let normalized = raw.trim().to_lowercase().replace(['_', ' '], "-");
    let normalized = normalized.trim_end_matches("-diet");
    vocabulary.iter().copied().find(|v| *v == normalized)
}
