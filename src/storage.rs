use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::cache::{CacheKey, KeyParams};
use crate::planner::dto::MealPlan;

const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, PartialEq)]
pub struct StoredPlan {
    pub plan: MealPlan,
    /// Unix seconds.
    pub cached_at: i64,
}

/// Key-value seam for cached plans; the medium behind it is swappable.
#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn load(&self, key: &CacheKey) -> anyhow::Result<Option<StoredPlan>>;
    async fn save(&self, key: &CacheKey, plan: &MealPlan, cached_at: i64) -> anyhow::Result<()>;
    /// Drops the entry only while it is still the one written at `cached_at`,
    /// so a fresher save that raced the caller survives.
    async fn remove_if(&self, key: &CacheKey, cached_at: i64) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    #[serde(flatten)]
    pub params: KeyParams,
    pub file: String,
    pub cached_at: i64,
}

type Index = BTreeMap<String, IndexEntry>;

/// One JSON record per plan plus `index.json` mapping key digest to record.
///
/// Reads go against the in-memory copy of the index; writers are serialized
/// and replace the index file atomically.
pub struct FileStore {
    dir: PathBuf,
    index: RwLock<Index>,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub async fn open(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("create cache dir {}", dir.display()))?;

        let index = match tokio::fs::read(dir.join(INDEX_FILE)).await {
            Ok(bytes) => match serde_json::from_slice::<Index>(&bytes) {
                Ok(index) => index,
                Err(e) => {
                    warn!(error = %e, "cache index unreadable; starting empty");
                    Index::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Index::new(),
            Err(e) => return Err(e).context("read cache index"),
        };
        info!(dir = %dir.display(), entries = index.len(), "cache store opened");

        Ok(Self {
            dir,
            index: RwLock::new(index),
            write_lock: Mutex::new(()),
        })
    }

    fn record_name(digest: &str) -> String {
        format!("plan_{digest}.json")
    }

    async fn write_atomic(&self, name: &str, bytes: &[u8]) -> anyhow::Result<()> {
        let tmp = self.dir.join(format!("{name}.tmp"));
        let dest = self.dir.join(name);
        tokio::fs::write(&tmp, bytes)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &dest)
            .await
            .with_context(|| format!("rename into {}", dest.display()))?;
        Ok(())
    }

    /// Caller must hold `write_lock`.
    async fn commit_index(&self, next: Index) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec_pretty(&next)?;
        self.write_atomic(INDEX_FILE, &bytes).await?;
        *self.index.write().await = next;
        Ok(())
    }

    /// Removes the index entry when `matches` accepts it. Runs under `write_lock`.
    async fn drop_entry(
        &self,
        digest: &str,
        matches: impl FnOnce(&IndexEntry) -> bool,
    ) -> anyhow::Result<Option<IndexEntry>> {
        let _guard = self.write_lock.lock().await;
        let mut next = self.index.read().await.clone();
        if !next.get(digest).is_some_and(matches) {
            return Ok(None);
        }
        let removed = next.remove(digest);
        self.commit_index(next).await?;
        Ok(removed)
    }
}

#[async_trait]
impl PlanStore for FileStore {
    async fn load(&self, key: &CacheKey) -> anyhow::Result<Option<StoredPlan>> {
        let Some(entry) = self.index.read().await.get(key.digest()).cloned() else {
            return Ok(None);
        };
        let path = self.dir.join(&entry.file);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(file = %entry.file, "cache record missing; dropping index entry");
                self.drop_entry(key.digest(), |current| *current == entry).await?;
                return Ok(None);
            }
            Err(e) => return Err(e).with_context(|| format!("read {}", path.display())),
        };
        let plan: MealPlan = serde_json::from_slice(&bytes)
            .with_context(|| format!("decode {}", path.display()))?;
        Ok(Some(StoredPlan {
            plan,
            cached_at: entry.cached_at,
        }))
    }

    async fn save(&self, key: &CacheKey, plan: &MealPlan, cached_at: i64) -> anyhow::Result<()> {
        let file = Self::record_name(key.digest());
        let bytes = serde_json::to_vec_pretty(plan)?;

        let _guard = self.write_lock.lock().await;
        self.write_atomic(&file, &bytes).await?;
        let mut next = self.index.read().await.clone();
        next.insert(
            key.digest().to_string(),
            IndexEntry {
                params: key.params().clone(),
                file,
                cached_at,
            },
        );
        self.commit_index(next).await
    }

    async fn remove_if(&self, key: &CacheKey, cached_at: i64) -> anyhow::Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut next = self.index.read().await.clone();
        let Some(entry) = next.get(key.digest()).filter(|e| e.cached_at == cached_at).cloned() else {
            return Ok(false);
        };
        next.remove(key.digest());
        self.commit_index(next).await?;
        // still under the lock, so no save can rewrite the record in between
        match tokio::fs::remove_file(self.dir.join(&entry.file)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e).context("remove cache record"),
        }
        Ok(true)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    plans: RwLock<HashMap<String, StoredPlan>>,
}

#[async_trait]
impl PlanStore for MemoryStore {
    async fn load(&self, key: &CacheKey) -> anyhow::Result<Option<StoredPlan>> {
        Ok(self.plans.read().await.get(key.digest()).cloned())
    }

    async fn save(&self, key: &CacheKey, plan: &MealPlan, cached_at: i64) -> anyhow::Result<()> {
        self.plans.write().await.insert(
            key.digest().to_string(),
            StoredPlan {
                plan: plan.clone(),
                cached_at,
            },
        );
        Ok(())
    }

    async fn remove_if(&self, key: &CacheKey, cached_at: i64) -> anyhow::Result<bool> {
        let mut plans = self.plans.write().await;
        if plans.get(key.digest()).is_some_and(|p| p.cached_at == cached_at) {
            plans.remove(key.digest());
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::StructuredRequest;
    use crate::planner::dto::tests::sample_plan;

    fn key(days: u32) -> CacheKey {
        CacheKey::from_request(&StructuredRequest {
            duration_days: days,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn writes_record_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let k = key(2);
        store.save(&k, &sample_plan(2), 1_700_000_000).await.unwrap();

        let index: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join(INDEX_FILE)).unwrap()).unwrap();
        let entry = &index[k.digest()];
        assert_eq!(entry["duration_days"], 2);
        assert_eq!(entry["cached_at"], 1_700_000_000);
        assert!(dir.path().join(entry["file"].as_str().unwrap()).exists());
        assert!(!dir.path().join("index.json.tmp").exists());
    }

    #[tokio::test]
    async fn missing_record_drops_index_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let k = key(1);
        store.save(&k, &sample_plan(1), 0).await.unwrap();
        std::fs::remove_file(dir.path().join(FileStore::record_name(k.digest()))).unwrap();

        assert!(store.load(&k).await.unwrap().is_none());
        let reopened = FileStore::open(dir.path()).await.unwrap();
        assert!(reopened.index.read().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_index_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), b"{not json").unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        assert!(store.load(&key(3)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_deletes_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let k = key(4);
        store.save(&k, &sample_plan(4), 0).await.unwrap();
        assert!(!store.remove_if(&k, 1).await.unwrap());
        assert!(store.remove_if(&k, 0).await.unwrap());
        assert!(store.load(&k).await.unwrap().is_none());
        assert!(!dir.path().join(FileStore::record_name(k.digest())).exists());
    }

    #[tokio::test]
    async fn stale_eviction_spares_a_fresh_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let k = key(5);
        store.save(&k, &sample_plan(5), 100).await.unwrap();
        let stale = store.load(&k).await.unwrap().unwrap();

        let fresh = sample_plan(5);
        store.save(&k, &fresh, 200).await.unwrap();
        assert!(!store.remove_if(&k, stale.cached_at).await.unwrap());

        let kept = store.load(&k).await.unwrap().unwrap();
        assert_eq!(kept.cached_at, 200);
        assert_eq!(kept.plan, fresh);
        assert!(dir.path().join(FileStore::record_name(k.digest())).exists());
        let reopened = FileStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.index.read().await[k.digest()].cached_at, 200);
    }

    #[tokio::test]
    async fn memory_store_eviction_is_conditional() {
        let store = MemoryStore::default();
        let k = key(6);
        store.save(&k, &sample_plan(6), 100).await.unwrap();
        store.save(&k, &sample_plan(6), 200).await.unwrap();
        assert!(!store.remove_if(&k, 100).await.unwrap());
        assert_eq!(store.load(&k).await.unwrap().unwrap().cached_at, 200);
        assert!(store.remove_if(&k, 200).await.unwrap());
        assert!(store.load(&k).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_saves_keep_index_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(FileStore::open(dir.path()).await.unwrap());
        let mut handles = Vec::new();
        for days in 1..=7 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.save(&key(days), &sample_plan(days), 0).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let reopened = FileStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.index.read().await.len(), 7);
    }
}
