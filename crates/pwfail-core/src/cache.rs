//! Cached build summaries, keyed by (tool, org, pipeline, build).
//!
//! An entry is only reused while every Playwright job in the build still has
//! the state it had when the entry was written. Any difference means a full
//! recompute; there are no partial updates.

use crate::aggregate::BuildSummary;
use crate::error::Result;
use crate::io;
use crate::paths;
use crate::types::{BuildInfo, FailureRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const CACHE_VERSION: u32 = 1;

/// Job id → job state, for every Playwright job in the build.
pub type JobStates = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Entry types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheIdentity {
    pub tool_path: String,
    pub org_slug: String,
    pub pipeline_slug: String,
    pub build_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMeta {
    pub org_slug: String,
    pub pipeline_slug: String,
    pub build_number: String,
    pub tool_path: String,
    pub cached_at: DateTime<Utc>,
    pub job_states: JobStates,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePayload {
    pub build: BuildInfo,
    pub summary: BuildSummary,
    pub jobs: Vec<FailureRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub version: u32,
    pub meta: CacheMeta,
    pub payload: CachePayload,
}

impl CacheEntry {
    pub fn new(key: &CacheIdentity, job_states: JobStates, payload: CachePayload) -> Self {
        Self {
            version: CACHE_VERSION,
            meta: CacheMeta {
                org_slug: key.org_slug.clone(),
                pipeline_slug: key.pipeline_slug.clone(),
                build_number: key.build_number.clone(),
                tool_path: key.tool_path.clone(),
                cached_at: Utc::now(),
                job_states,
            },
            payload,
        }
    }

    pub fn identity(&self) -> CacheIdentity {
        CacheIdentity {
            tool_path: self.meta.tool_path.clone(),
            org_slug: self.meta.org_slug.clone(),
            pipeline_slug: self.meta.pipeline_slug.clone(),
            build_number: self.meta.build_number.clone(),
        }
    }

    /// True when the entry was written by this schema for the same build and
    /// the live job-state snapshot is identical.
    pub fn is_valid(&self, key: &CacheIdentity, live_states: &JobStates) -> bool {
        self.version == CACHE_VERSION
            && self.identity() == *key
            && self.meta.job_states == *live_states
    }
}

// ---------------------------------------------------------------------------
// CacheStore
// ---------------------------------------------------------------------------

/// Storage for cache entries. `get` never fails: unreadable entries are
/// reported as absent.
pub trait CacheStore {
    fn get(&self, key: &CacheIdentity) -> Option<CacheEntry>;
    fn put(&self, key: &CacheIdentity, entry: &CacheEntry) -> Result<()>;
    /// Human-readable location of the entry, if the store has one.
    fn location(&self, key: &CacheIdentity) -> Option<String>;
}

/// One pretty-printed JSON file per key under a directory.
#[derive(Debug, Clone)]
pub struct FsCacheStore {
    dir: PathBuf,
}

impl FsCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &CacheIdentity) -> PathBuf {
        self.dir.join(paths::cache_file_name(key))
    }
}

impl CacheStore for FsCacheStore {
    fn get(&self, key: &CacheIdentity) -> Option<CacheEntry> {
        let path = self.path_for(key);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable cache entry");
                return None;
            }
        };
        match serde_json::from_str(&data) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "corrupt cache entry");
                None
            }
        }
    }

    fn put(&self, key: &CacheIdentity, entry: &CacheEntry) -> Result<()> {
        let data = serde_json::to_string_pretty(entry)?;
        io::atomic_write(&self.path_for(key), data.as_bytes())
    }

    fn location(&self, key: &CacheIdentity) -> Option<String> {
        Some(self.path_for(key).display().to_string())
    }
}

/// In-process store, used when nothing should touch the filesystem.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<CacheIdentity, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic elsewhere while holding the lock leaves the map itself intact.
    fn entries(&self) -> MutexGuard<'_, HashMap<CacheIdentity, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &CacheIdentity) -> Option<CacheEntry> {
        self.entries().get(key).cloned()
    }

    fn put(&self, key: &CacheIdentity, entry: &CacheEntry) -> Result<()> {
        self.entries().insert(key.clone(), entry.clone());
        Ok(())
    }

    fn location(&self, _key: &CacheIdentity) -> Option<String> {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key() -> CacheIdentity {
        CacheIdentity {
            tool_path: "bk-fetch".into(),
            org_slug: "acme".into(),
            pipeline_slug: "web".into(),
            build_number: "7".into(),
        }
    }

    fn states(pairs: &[(&str, &str)]) -> JobStates {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn entry(job_states: JobStates) -> CacheEntry {
        CacheEntry::new(
            &key(),
            job_states,
            CachePayload {
                build: BuildInfo::default(),
                summary: BuildSummary::default(),
                jobs: Vec::new(),
            },
        )
    }

    #[test]
    fn identical_snapshot_is_valid() {
        let e = entry(states(&[("j1", "failed")]));
        assert!(e.is_valid(&key(), &states(&[("j1", "failed")])));
    }

    #[test]
    fn new_job_invalidates() {
        let e = entry(states(&[("j1", "failed")]));
        assert!(!e.is_valid(&key(), &states(&[("j1", "failed"), ("j2", "running")])));
    }

    #[test]
    fn state_change_invalidates() {
        let e = entry(states(&[("j1", "failed")]));
        assert!(!e.is_valid(&key(), &states(&[("j1", "passed")])));
    }

    #[test]
    fn removed_job_invalidates() {
        let e = entry(states(&[("j1", "failed"), ("j2", "passed")]));
        assert!(!e.is_valid(&key(), &states(&[("j1", "failed")])));
    }

    #[test]
    fn identity_and_version_must_match() {
        let e = entry(states(&[]));
        let mut other = key();
        other.tool_path = "/opt/other-fetch".into();
        assert!(!e.is_valid(&other, &states(&[])));

        let mut old = entry(states(&[]));
        old.version = CACHE_VERSION + 1;
        assert!(!old.is_valid(&key(), &states(&[])));
    }

    #[test]
    fn fs_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FsCacheStore::new(dir.path().join("cache"));
        assert!(store.get(&key()).is_none());

        let e = entry(states(&[("j1", "failed")]));
        store.put(&key(), &e).unwrap();
        assert_eq!(store.get(&key()), Some(e));
        assert!(store
            .location(&key())
            .unwrap()
            .ends_with("acme__web__7__bk-fetch.json"));
    }

    #[test]
    fn fs_store_treats_corrupt_file_as_miss() {
        let dir = TempDir::new().unwrap();
        let store = FsCacheStore::new(dir.path());
        std::fs::write(store.path_for(&key()), "{ not json").unwrap();
        assert!(store.get(&key()).is_none());
    }

    #[test]
    fn memory_store_overwrites() {
        let store = MemoryCacheStore::new();
        store.put(&key(), &entry(states(&[("j1", "running")]))).unwrap();
        store.put(&key(), &entry(states(&[("j1", "failed")]))).unwrap();
        assert_eq!(store.len(), 1);
        let got = store.get(&key()).unwrap();
        assert_eq!(got.meta.job_states, states(&[("j1", "failed")]));
    }

    #[test]
    fn memory_store_survives_poisoned_lock() {
        let store = MemoryCacheStore::new();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = store.entries.lock().unwrap();
            panic!("writer died holding the lock");
        }));
        assert!(store.entries.is_poisoned());

        let e = entry(states(&[("j1", "failed")]));
        store.put(&key(), &e).unwrap();
        assert_eq!(store.get(&key()), Some(e));
        assert_eq!(store.len(), 1);
    }
}
