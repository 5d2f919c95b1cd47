use crate::cache::PlanCache;
use crate::config::{AppConfig, CacheConfig};
use crate::generator::MealGenerator;
use crate::llm::{LlmClient, OpenAiClient};
use crate::parser::QueryParser;
use crate::storage::{FileStore, MemoryStore, PlanStore};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub parser: QueryParser,
    pub generator: MealGenerator,
    pub cache: PlanCache,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let llm = Arc::new(OpenAiClient::new(&config.llm)?) as Arc<dyn LlmClient>;
        if !llm.is_configured() {
            warn!("OPENAI_API_KEY is not set; every meal will fall back to a placeholder");
        }

        let store = open_store(&config.cache).await?;

        Ok(Self::from_parts(config, llm, store))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        llm: Arc<dyn LlmClient>,
        store: Arc<dyn PlanStore>,
    ) -> Self {
        Self {
            parser: QueryParser::new(llm.clone(), &config.parser),
            generator: MealGenerator::new(llm),
            cache: PlanCache::new(store, &config.cache),
            config,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::llm::testing::ScriptedLlm;

        Self::fake_with(
            Arc::new(ScriptedLlm::chef()),
            Arc::new(MemoryStore::default()),
        )
    }

    #[cfg(test)]
    pub fn fake_with(llm: Arc<dyn LlmClient>, store: Arc<dyn PlanStore>) -> Self {
        use crate::config::{LlmConfig, ParserConfig};

        let config = Arc::new(AppConfig {
            app_name: "meal-planner-api".into(),
            debug: false,
            llm: LlmConfig {
                api_key: Some("test".into()),
                model: "gpt-4o-mini".into(),
                base_url: "http://fake.local/v1".into(),
            },
            cache: CacheConfig {
                enabled: true,
                dir: "unused".into(),
                ttl_hours: 24,
            },
            parser: ParserConfig {
                llm_validation: true,
                query_dump: false,
                dump_dir: "unused".into(),
            },
        });
        Self::from_parts(config, llm, store)
    }
}

/// A disabled cache never touches the cache directory.
async fn open_store(config: &CacheConfig) -> anyhow::Result<Arc<dyn PlanStore>> {
    if config.enabled {
        return Ok(Arc::new(FileStore::open(&config.dir).await?));
    }
    info!("plan cache disabled; nothing is written to disk");
    Ok(Arc::new(MemoryStore::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_cache_creates_no_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("plans");
        let mut config = CacheConfig {
            enabled: false,
            dir: dir.clone(),
            ttl_hours: 24,
        };
        open_store(&config).await.unwrap();
        assert!(!dir.exists());

        config.enabled = true;
        open_store(&config).await.unwrap();
        assert!(dir.is_dir());
    }
}
