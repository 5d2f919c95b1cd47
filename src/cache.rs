//! Plan cache keyed on the semantic parameters of a request.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use crate::config::CacheConfig;
use crate::parser::StructuredRequest;
use crate::planner::dto::MealPlan;
use crate::storage::PlanStore;

/// The request fields a cached plan depends on. Sets are kept sorted so the
/// order in which a user listed them never changes the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyParams {
    pub dietary_restrictions: Vec<String>,
    pub preferences: Vec<String>,
    pub special_requirements: Vec<String>,
    pub duration_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    params: KeyParams,
    canonical: String,
    digest: String,
}

impl CacheKey {
    pub fn from_request(request: &StructuredRequest) -> Self {
        let sorted = |set: &std::collections::BTreeSet<String>| -> Vec<String> {
            let mut v: Vec<String> = set.iter().map(|s| s.trim().to_lowercase()).collect();
            v.sort();
            v.dedup();
            v
        };
        let params = KeyParams {
            dietary_restrictions: sorted(&request.dietary_restrictions),
            preferences: sorted(&request.preferences),
            special_requirements: sorted(&request.special_requirements),
            duration_days: request.duration_days,
        };
        // struct field order is fixed, so this is stable
        let canonical = serde_json::to_string(&params).unwrap_or_default();
        let digest = hex::encode(Sha256::digest(canonical.as_bytes()));
        Self {
            params,
            canonical,
            digest,
        }
    }

    pub fn params(&self) -> &KeyParams {
        &self.params
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Hex sha256 of the canonical form.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

/// Wraps a [`PlanStore`] with the enable flag and TTL-at-lookup.
/// Storage failures are logged and treated as misses.
#[derive(Clone)]
pub struct PlanCache {
    store: Arc<dyn PlanStore>,
    enabled: bool,
    ttl_secs: Option<i64>,
}

impl PlanCache {
    pub fn new(store: Arc<dyn PlanStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            enabled: config.enabled,
            ttl_secs: (config.ttl_hours > 0).then(|| config.ttl_hours.saturating_mul(3600) as i64),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[instrument(skip_all, fields(key = %key.digest()))]
    pub async fn get(&self, key: &CacheKey) -> Option<MealPlan> {
        if !self.enabled {
            return None;
        }
        let stored = match self.store.load(key).await {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                debug!(params = key.canonical(), "cache miss");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "cache lookup failed; treating as miss");
                return None;
            }
        };

        if let Some(ttl) = self.ttl_secs {
            let age = OffsetDateTime::now_utc().unix_timestamp() - stored.cached_at;
            if age > ttl {
                info!(age_secs = age, ttl_secs = ttl, "cache entry expired; evicting");
                match self.store.remove_if(key, stored.cached_at).await {
                    Ok(true) => {}
                    Ok(false) => debug!("entry was refreshed before eviction; kept"),
                    Err(e) => warn!(error = %e, "failed to evict expired cache entry"),
                }
                return None;
            }
        }
        info!(plan_id = %stored.plan.id, "cache hit");
        Some(stored.plan)
    }

    #[instrument(skip_all, fields(key = %key.digest(), plan_id = %plan.id))]
    pub async fn put(&self, key: &CacheKey, plan: &MealPlan) {
        if !self.enabled {
            return;
        }
        let now = OffsetDateTime::now_utc().unix_timestamp();
        match self.store.save(key, plan, now).await {
            Ok(()) => info!("plan cached"),
            Err(e) => warn!(error = %e, "failed to cache plan"),
        }
    }
}
