//! Two-phase query parsing: regex extraction, then LLM correction.

mod dump;
pub mod extractor;
pub mod types;
pub mod validator;

use std::sync::Arc;
use std::time::Instant;

use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::config::ParserConfig;
use crate::llm::LlmClient;
use crate::telemetry::QueryValidationLogging;

use dump::{DumpRecord, QueryDump};
pub use types::{StructuredRequest, Warning};
pub use validator::QueryValidator;

#[derive(Debug, Clone)]
pub struct ParsedQuery {
    pub request: StructuredRequest,
    pub logging: QueryValidationLogging,
}

#[derive(Clone)]
pub struct QueryParser {
    validator: QueryValidator,
    dump: Option<QueryDump>,
}

impl QueryParser {
    pub fn new(llm: Arc<dyn LlmClient>, config: &ParserConfig) -> Self {
        Self {
            validator: QueryValidator::new(llm, config.llm_validation),
            dump: config
                .query_dump
                .then(|| QueryDump::new(config.dump_dir.clone())),
        }
    }

    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn parse(&self, query: &str) -> ParsedQuery {
        let started = Instant::now();

        let extraction = extractor::extract(query);
        let validation = self.validator.validate(query, &extraction).await;

        let mut logging = validation.logging;
        logging.total_duration_ms = started.elapsed().as_millis() as u64;
        let request = validation.request;

        info!(
            duration_days = request.duration_days,
            restrictions = ?request.dietary_restrictions,
            preferences = ?request.preferences,
            special = ?request.special_requirements,
            warnings = request.warnings.len(),
            total_ms = logging.total_duration_ms,
            "query parsed"
        );

        if let Some(dump) = &self.dump {
            dump.write(&DumpRecord {
                timestamp: OffsetDateTime::now_utc().unix_timestamp(),
                query,
                initial_extraction: &extraction.request,
                final_extraction: &request,
                llm_logging: &logging,
            })
            .await;
        }

        ParsedQuery { request, logging }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedLlm;
    use crate::parser::types::WarningCategory;

    fn config(dump_dir: Option<&std::path::Path>) -> ParserConfig {
        ParserConfig {
            llm_validation: true,
            query_dump: dump_dir.is_some(),
            dump_dir: dump_dir
                .map(|d| d.to_path_buf())
                .unwrap_or_else(|| "query_dumps".into()),
        }
    }

    #[tokio::test]
    async fn ambiguous_query_defaults_to_a_week() {
        let parser = QueryParser::new(Arc::new(ScriptedLlm::failing()), &config(None));
        let parsed = parser.parse("I need healthy meals for next week").await;
        assert_eq!(parsed.request.duration_days, 7);
        assert!(parsed.request.has_warning(WarningCategory::DaysUnspecified));
        assert!(parsed.request.special_requirements.contains("healthy"));
        assert!(!parsed.logging.enabled);
    }

    #[tokio::test]
    async fn writes_dump_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let parser = QueryParser::new(Arc::new(ScriptedLlm::failing()), &config(Some(dir.path())));
        parser.parse("3 day keto plan").await;
        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }
}
