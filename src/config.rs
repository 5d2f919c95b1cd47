use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    /// `0` disables expiry.
    pub ttl_hours: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParserConfig {
    pub llm_validation: bool,
    pub query_dump: bool,
    pub dump_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    pub debug: bool,
    pub llm: LlmConfig,
    pub cache: CacheConfig,
    pub parser: ParserConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let llm = LlmConfig {
            api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
        };
        let cache = CacheConfig {
            enabled: env_flag("ENABLE_CACHE", true)?,
            dir: std::env::var("CACHE_DIR")
                .unwrap_or_else(|_| "meals_store".into())
                .into(),
            ttl_hours: std::env::var("CACHE_TTL_HOURS")
                .ok()
                .map(|v| v.parse::<u64>())
                .transpose()
                .map_err(|e| anyhow::anyhow!("CACHE_TTL_HOURS: {e}"))?
                .unwrap_or(24),
        };
        let parser = ParserConfig {
            llm_validation: env_flag("ENABLE_LLM_VALIDATION", true)?,
            query_dump: env_flag("ENABLE_QUERY_DUMP", false)?,
            dump_dir: std::env::var("QUERY_DUMP_DIR")
                .unwrap_or_else(|_| "query_dumps".into())
                .into(),
        };
        Ok(Self {
            app_name: std::env::var("APP_NAME").unwrap_or_else(|_| "meal-planner-api".into()),
            debug: env_flag("APP_DEBUG", false)?,
            llm,
            cache,
            parser,
        })
    }
}

fn env_flag(name: &str, default: bool) -> anyhow::Result<bool> {
    match std::env::var(name) {
        Ok(raw) => parse_flag(&raw).ok_or_else(|| anyhow::anyhow!("{name}: not a boolean: {raw}")),
        Err(_) => Ok(default),
    }
}

pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
