//! Analysis cache keyed by content identity.
//!
//! [`AnalysisCache`] fronts two tiers: an optional primary [`CacheStore`]
//! (the [`FileStore`] in this crate) and an in-process [`MemoryStore`].
//! Failures of the primary are logged and absorbed by the memory tier, so a
//! caller never sees cache unavailability; at worst it sees a miss.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analysis::FileAnalysis;
use crate::config::CacheConfig;
use crate::language::Language;

/// Errors raised by a cache store.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Key-value store with per-entry expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    fn name(&self) -> &'static str;
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
    async fn ping(&self) -> Result<(), CacheError>;
    async fn close(&self) -> Result<(), CacheError>;
}

/// Opaque identity of a file's content.
///
/// Either assigned by the content provider (e.g. a git blob id) or the
/// SHA-256 of the content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContentIdentity(String);

impl ContentIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identity derived from the content itself.
    pub fn of(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cache key for one analysis. Never derived from the path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub repository: String,
    pub language: Language,
    pub identity: ContentIdentity,
}

impl CacheKey {
    pub fn new(repository: &str, language: Language, identity: ContentIdentity) -> Self {
        Self {
            repository: repository.to_string(),
            language,
            identity,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "analysis:{}:{}:{}",
            self.repository, self.language, self.identity
        )
    }
}

/// Hit and miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Two-tier analysis cache handle.
pub struct AnalysisCache {
    primary: Option<Box<dyn CacheStore>>,
    fallback: MemoryStore,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl AnalysisCache {
    /// Memory-only cache.
    pub fn in_memory(default_ttl: Duration) -> Self {
        Self {
            primary: None,
            fallback: MemoryStore::new(),
            default_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cache with `store` as the primary tier.
    pub fn with_store(store: Box<dyn CacheStore>, default_ttl: Duration) -> Self {
        Self {
            primary: Some(store),
            ..Self::in_memory(default_ttl)
        }
    }

    /// Open the configured primary store.
    ///
    /// Opening is retried `connect_retries` times with `retry_delay_ms`
    /// between attempts. When every attempt fails, or no cache directory can
    /// be determined, the cache runs memory-only.
    pub async fn connect(config: &CacheConfig) -> Self {
        let ttl = config.ttl();
        if !config.enabled {
            debug!("persistent cache disabled");
            return Self::in_memory(ttl);
        }

        let Some(dir) = config.resolved_dir() else {
            warn!("no cache directory available, using in-process cache");
            return Self::in_memory(ttl);
        };

        let attempts = config.connect_retries.max(1);
        for attempt in 1..=attempts {
            match open_and_ping(&dir).await {
                Ok(store) => {
                    info!(dir = %dir.display(), "analysis cache connected");
                    return Self::with_store(Box::new(store), ttl);
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "cache connection failed");
                    if attempt < attempts {
                        tokio::time::sleep(Duration::from_millis(config.retry_delay_ms)).await;
                    }
                }
            }
        }

        warn!("using in-process cache");
        Self::in_memory(ttl)
    }

    /// Whether a primary store is attached.
    pub fn is_persistent(&self) -> bool {
        self.primary.is_some()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<FileAnalysis> {
        let key_str = key.to_string();
        let raw = match self.read(&key_str).await {
            Some(raw) => raw,
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        match serde_json::from_str::<FileAnalysis>(&raw) {
            Ok(analysis) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key_str, "cache hit");
                Some(analysis)
            }
            Err(e) => {
                warn!(key = %key_str, error = %e, "undecodable cache entry, treating as miss");
                self.misses.fetch_add(1, Ordering::Relaxed);
                self.delete(key).await;
                None
            }
        }
    }

    async fn read(&self, key: &str) -> Option<String> {
        if let Some(primary) = &self.primary {
            match primary.get(key).await {
                Ok(Some(raw)) => return Some(raw),
                Ok(None) => {}
                Err(e) => {
                    warn!(store = primary.name(), key, error = %e, "cache read failed");
                }
            }
        }
        self.fallback.get(key).await.ok().flatten()
    }

    /// Store with the default TTL. Returns whether the value was stored.
    pub async fn put(&self, key: &CacheKey, analysis: &FileAnalysis) -> bool {
        self.put_with_ttl(key, analysis, self.default_ttl).await
    }

    pub async fn put_with_ttl(&self, key: &CacheKey, analysis: &FileAnalysis, ttl: Duration) -> bool {
        let key_str = key.to_string();
        let encoded = match serde_json::to_string(analysis) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(key = %key_str, error = %e, "could not encode analysis");
                return false;
            }
        };

        if let Some(primary) = &self.primary {
            match primary.set(&key_str, &encoded, ttl).await {
                Ok(()) => return true,
                Err(e) => {
                    warn!(store = primary.name(), key = %key_str, error = %e, "cache write failed");
                }
            }
        }
        self.fallback.set(&key_str, &encoded, ttl).await.is_ok()
    }

    /// Remove an entry from both tiers.
    pub async fn delete(&self, key: &CacheKey) {
        let key_str = key.to_string();
        if let Some(primary) = &self.primary {
            if let Err(e) = primary.delete(&key_str).await {
                warn!(store = primary.name(), key = %key_str, error = %e, "cache delete failed");
            }
        }
        let _ = self.fallback.delete(&key_str).await;
    }

    /// Health of the primary store. Memory-only caches are always healthy.
    pub async fn ping(&self) -> Result<(), CacheError> {
        match &self.primary {
            Some(primary) => primary.ping().await,
            None => Ok(()),
        }
    }

    pub async fn close(&self) {
        if let Some(primary) = &self.primary {
            if let Err(e) = primary.close().await {
                warn!(store = primary.name(), error = %e, "cache close failed");
            }
        }
        let _ = self.fallback.close().await;
        debug!(hits = self.stats().hits, misses = self.stats().misses, "analysis cache closed");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

async fn open_and_ping(dir: &std::path::Path) -> Result<FileStore, CacheError> {
    let store = FileStore::open(dir).await?;
    store.ping().await?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{UndocumentedItem, UnitKind};
    use tempfile::TempDir;

    fn analysis() -> FileAnalysis {
        FileAnalysis {
            path: "a.py".to_string(),
            language: Language::Python,
            needs_docs: true,
            original_content: "def foo():\n    return 1\n".to_string(),
            undocumented_items: vec![UndocumentedItem {
                kind: UnitKind::Function,
                name: "foo".to_string(),
                line: 1,
                code: "def foo():\n    return 1".to_string(),
            }],
        }
    }

    fn key(id: &str) -> CacheKey {
        CacheKey::new("acme/widgets", Language::Python, ContentIdentity::new(id))
    }

    /// Store that fails every operation.
    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        fn name(&self) -> &'static str {
            "broken"
        }
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Unavailable("down".to_string()))
        }
        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("down".to_string()))
        }
        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("down".to_string()))
        }
        async fn ping(&self) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("down".to_string()))
        }
        async fn close(&self) -> Result<(), CacheError> {
            Ok(())
        }
    }

    #[test]
    fn test_key_format() {
        assert_eq!(key("abc").to_string(), "analysis:acme/widgets:python:abc");
    }

    #[test]
    fn test_content_identity_is_sha256() {
        let id = ContentIdentity::of(b"hello");
        assert_eq!(
            id.as_str(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_ne!(id, ContentIdentity::of(b"hello!"));
    }

    #[tokio::test]
    async fn test_memory_hit_and_miss() {
        let cache = AnalysisCache::in_memory(Duration::from_secs(60));
        assert!(cache.get(&key("abc")).await.is_none());
        assert!(cache.put(&key("abc"), &analysis()).await);
        assert_eq!(cache.get(&key("abc")).await, Some(analysis()));
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[tokio::test]
    async fn test_repository_scopes_key() {
        let cache = AnalysisCache::in_memory(Duration::from_secs(60));
        cache.put(&key("abc"), &analysis()).await;
        let other = CacheKey::new("acme/other", Language::Python, ContentIdentity::new("abc"));
        assert!(cache.get(&other).await.is_none());
    }

    #[tokio::test]
    async fn test_broken_primary_falls_back() {
        let cache = AnalysisCache::with_store(Box::new(BrokenStore), Duration::from_secs(60));
        assert!(cache.put(&key("abc"), &analysis()).await);
        assert_eq!(cache.get(&key("abc")).await, Some(analysis()));
        assert!(cache.ping().await.is_err());
        cache.delete(&key("abc")).await;
        assert!(cache.get(&key("abc")).await.is_none());
    }

    #[tokio::test]
    async fn test_file_store_tier() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let cache = AnalysisCache::with_store(Box::new(store), Duration::from_secs(60));
        cache.put(&key("abc"), &analysis()).await;
        cache.close().await;

        let reopened = FileStore::open(dir.path()).await.unwrap();
        let cache = AnalysisCache::with_store(Box::new(reopened), Duration::from_secs(60));
        assert_eq!(cache.get(&key("abc")).await, Some(analysis()));
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_miss() {
        let store = MemoryStore::new();
        store
            .set(&key("abc").to_string(), "{\"path\": 3}", Duration::from_secs(60))
            .await
            .unwrap();
        let cache = AnalysisCache::with_store(Box::new(store), Duration::from_secs(60));
        assert!(cache.get(&key("abc")).await.is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_connect_disabled_is_memory_only() {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        let cache = AnalysisCache::connect(&config).await;
        assert!(!cache.is_persistent());
        assert!(cache.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_connect_gives_up_after_retries() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file in the way").unwrap();

        let config = CacheConfig {
            enabled: true,
            dir: Some(blocker.join("analysis")),
            connect_retries: 2,
            retry_delay_ms: 1,
            ..CacheConfig::default()
        };
        let cache = AnalysisCache::connect(&config).await;
        assert!(!cache.is_persistent());
    }

    #[tokio::test]
    async fn test_connect_opens_file_store() {
        let dir = TempDir::new().unwrap();
        let config = CacheConfig {
            enabled: true,
            dir: Some(dir.path().join("analysis")),
            ..CacheConfig::default()
        };
        let cache = AnalysisCache::connect(&config).await;
        assert!(cache.is_persistent());
        assert!(cache.ping().await.is_ok());
    }
}
