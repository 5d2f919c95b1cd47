use std::path::PathBuf;

use anyhow::Context;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{error, info};
use uuid::Uuid;

use super::types::StructuredRequest;
use crate::telemetry::QueryValidationLogging;

#[derive(Debug, Serialize)]
pub struct DumpRecord<'a> {
    pub timestamp: i64,
    pub query: &'a str,
    pub initial_extraction: &'a StructuredRequest,
    pub final_extraction: &'a StructuredRequest,
    pub llm_logging: &'a QueryValidationLogging,
}

/// Writes one JSON file per parsed query for offline debugging.
#[derive(Debug, Clone)]
pub struct QueryDump {
    dir: PathBuf,
}

impl QueryDump {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Best effort: failures are logged and swallowed.
    pub async fn write(&self, record: &DumpRecord<'_>) {
        match self.try_write(record).await {
            Ok(path) => info!(path = %path.display(), "query dump written"),
            Err(e) => error!(error = %e, "query dump failed"),
        }
    }

    async fn try_write(&self, record: &DumpRecord<'_>) -> anyhow::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create dump dir {}", self.dir.display()))?;
        let short_id = Uuid::new_v4().simple().to_string();
        let path = self.dir.join(format!(
            "query_dump_{}_{}.json",
            OffsetDateTime::now_utc().unix_timestamp(),
            &short_id[..8]
        ));
        let body = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_pretty_json_record() {
        let dir = tempfile::tempdir().unwrap();
        let dump = QueryDump::new(dir.path().join("dumps"));
        let request = StructuredRequest::default();
        let logging = QueryValidationLogging::default();
        let record = DumpRecord {
            timestamp: 1,
            query: "a week of meals",
            initial_extraction: &request,
            final_extraction: &request,
            llm_logging: &logging,
        };

        let path = dump.try_write(&record).await.unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("query_dump_"));
        let saved: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(saved["query"], "a week of meals");
        assert_eq!(saved["final_extraction"]["duration_days"], 7);
    }
}
