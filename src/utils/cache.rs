//! Response cache in front of a [`Fetcher`]
//!
//! Bodies are keyed by the SHA-224 of their URL. Each store owns its own lock:
//! lookups share it, writes take it exclusively.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::debug;

use crate::error::FetchError;
use crate::models::content_key;
use crate::utils::http::{get_with_retry, with_retry, Fetcher};

/// Pause between retry attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// A cached body and when it was stored, in unix seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub body: Vec<u8>,
    pub cached_at: u64,
}

impl CacheEntry {
    /// Fresh while `cached_at + ttl > now`.
    pub fn is_fresh(&self, ttl: u64, now: u64) -> bool {
        self.cached_at.saturating_add(ttl) > now
    }
}

pub trait CacheStore {
    fn read(&self, key: &str) -> Result<Option<CacheEntry>, FetchError>;
    fn write(&self, key: &str, body: &[u8]) -> Result<(), FetchError>;
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn poisoned() -> FetchError {
    FetchError::Cache(io::Error::other("cache lock poisoned"))
}

/// One file per entry under a directory; the file's mtime is its age.
#[derive(Debug)]
pub struct FileCacheStore {
    dir: PathBuf,
    lock: RwLock<()>,
}

impl FileCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileCacheStore {
            dir: dir.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl CacheStore for FileCacheStore {
    fn read(&self, key: &str) -> Result<Option<CacheEntry>, FetchError> {
        let _guard = self.lock.read().map_err(|_| poisoned())?;
        let path = self.entry_path(key);
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let cached_at = metadata
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let body = fs::read(&path)?;
        Ok(Some(CacheEntry { body, cached_at }))
    }

    fn write(&self, key: &str, body: &[u8]) -> Result<(), FetchError> {
        let _guard = self.lock.write().map_err(|_| poisoned())?;
        fs::create_dir_all(&self.dir)?;
        fs::write(self.entry_path(key), body)?;
        Ok(())
    }
}

/// Process-local store, mostly for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry with an explicit timestamp.
    pub fn insert(&self, key: &str, body: &[u8], cached_at: u64) -> Result<(), FetchError> {
        self.entries.write().map_err(|_| poisoned())?.insert(
            key.to_string(),
            CacheEntry {
                body: body.to_vec(),
                cached_at,
            },
        );
        Ok(())
    }
}

impl CacheStore for MemoryCacheStore {
    fn read(&self, key: &str) -> Result<Option<CacheEntry>, FetchError> {
        Ok(self
            .entries
            .read()
            .map_err(|_| poisoned())?
            .get(key)
            .cloned())
    }

    fn write(&self, key: &str, body: &[u8]) -> Result<(), FetchError> {
        self.insert(key, body, unix_now())
    }
}

/// Fetches subscription bodies, consulting the cache first.
pub struct SubscriptionLoader {
    fetcher: Box<dyn Fetcher>,
    store: Box<dyn CacheStore>,
    retry_delay: Duration,
}

impl SubscriptionLoader {
    pub fn new(fetcher: Box<dyn Fetcher>, store: Box<dyn CacheStore>) -> Self {
        SubscriptionLoader {
            fetcher,
            store,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Body of `url`, from cache when younger than `ttl` seconds.
    ///
    /// `refresh` skips the lookup; the fresh body still replaces the entry.
    pub fn load(
        &self,
        url: &str,
        user_agent: &str,
        ttl: u64,
        retry_times: u32,
        refresh: bool,
    ) -> Result<Vec<u8>, FetchError> {
        let key = content_key(url);
        if !refresh {
            if let Some(entry) = self.store.read(&key)? {
                if entry.is_fresh(ttl, unix_now()) {
                    debug!("Cache hit for {}", url);
                    return Ok(entry.body);
                }
                debug!("Cache entry for {} is stale", url);
            }
        }

        debug!("Fetching {}", url);
        let body = get_with_retry(
            self.fetcher.as_ref(),
            url,
            user_agent,
            retry_times,
            self.retry_delay,
        )?;
        self.store.write(&key, &body)?;
        Ok(body)
    }

    /// `subscription-userinfo` of `url`; never cached.
    ///
    /// Failed requests are retried like a GET. A response without the
    /// header is final.
    pub fn userinfo(&self, url: &str, user_agent: &str, retry_times: u32) -> Option<String> {
        with_retry(url, retry_times, self.retry_delay, || {
            self.fetcher.head_userinfo(url, user_agent)
        })
        .unwrap_or_else(|e| {
            debug!("No userinfo for {}: {}", url, e);
            None
        })
    }
}
