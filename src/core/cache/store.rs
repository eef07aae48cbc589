//! Key-value stores backing the audio cache.
//!
//! Values are base64 text. Every backend honors an optional per-entry TTL and
//! expired entries read as absent. A TTL too large for the backend to
//! represent stores the entry without expiry.

use async_trait::async_trait;
use moka::Expiry;
use moka::future::{Cache as MokaCache, CacheBuilder as MokaCacheBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_128;

/// Default capacity of the in-memory store.
pub const DEFAULT_MEMORY_ENTRIES: u64 = 10_000;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Expiring string store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Check that the store is reachable and usable.
    async fn ping(&self) -> StoreResult<()>;

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store `value`; `None` keeps the entry until it is deleted.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;

    /// Returns whether an entry was removed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// All live keys, sorted.
    async fn keys(&self) -> StoreResult<Vec<String>>;

    /// Remaining lifetime of `key`. `Ok(None)` means absent or no expiry.
    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>>;

    fn backend_type(&self) -> &str;
}

// =============================================================================
// Memory store
// =============================================================================

struct MemoryEntry {
    value: Arc<str>,
    ttl: Option<Duration>,
    inserted_at: Instant,
}

impl MemoryEntry {
    fn remaining(&self) -> Option<Duration> {
        self.ttl
            .map(|ttl| ttl.saturating_sub(self.inserted_at.elapsed()))
    }
}

/// Per-entry lifetime for moka, taken from the TTL given to `set`.
struct EntryExpiry;

impl Expiry<String, Arc<MemoryEntry>> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Arc<MemoryEntry>,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Arc<MemoryEntry>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// A TTL whose deadline cannot be represented is treated as no expiry.
fn representable_ttl(ttl: Option<Duration>, now: Instant) -> Option<Duration> {
    ttl.filter(|d| now.checked_add(*d).is_some())
}

/// In-process store backed by moka with per-entry expiry.
pub struct MemoryStore {
    cache: MokaCache<String, Arc<MemoryEntry>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_ENTRIES)
    }
}

impl MemoryStore {
    pub fn new(max_entries: u64) -> Self {
        Self {
            cache: MokaCacheBuilder::new(max_entries)
                .expire_after(EntryExpiry)
                .build(),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self
            .cache
            .get(key)
            .await
            .map(|entry| entry.value.to_string()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let now = Instant::now();
        let ttl = representable_ttl(ttl, now);
        if ttl.is_none() {
            debug!("Storing {} without expiry", key);
        }
        let entry = Arc::new(MemoryEntry {
            value: Arc::from(value),
            ttl,
            inserted_at: now,
        });
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.cache.remove(key).await.is_some())
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .cache
            .iter()
            .map(|(key, _)| key.as_ref().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        Ok(self
            .cache
            .get(key)
            .await
            .and_then(|entry| entry.remaining()))
    }

    fn backend_type(&self) -> &str {
        "memory"
    }
}

// =============================================================================
// Filesystem store
// =============================================================================

/// Sidecar metadata stored next to each value file.
#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    key: String,
    expires_at: Option<u64>,
    created_at: u64,
    size: usize,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write `contents` to a temp file unique to this writer, then rename it over
/// `path`. Concurrent writers of one path never share a temp file; the last
/// rename wins.
async fn write_atomic(path: &Path, contents: &[u8]) -> StoreResult<()> {
    let mut temp_path = path.as_os_str().to_owned();
    temp_path.push(format!(
        ".{}.{}.tmp",
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    let temp_path = PathBuf::from(temp_path);

    let result = async {
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp_path, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e.into());
    }
    Ok(())
}

/// Persistent store under a directory, sharded by the xxh3 hash of the key.
///
/// Layout: `<base>/<2 hex chars>/<32 hex chars>` for the value and a `.meta`
/// JSON sidecar carrying the original key and expiry.
pub struct FilesystemStore {
    base_path: PathBuf,
}

impl FilesystemStore {
    pub async fn new(base_path: impl Into<PathBuf>) -> StoreResult<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn value_path(&self, key: &str) -> PathBuf {
        let hash = format!("{:032x}", xxh3_128(key.as_bytes()));
        let dir = &hash[0..2];
        self.base_path.join(dir).join(hash)
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.value_path(key).with_extension("meta")
    }

    async fn read_meta(path: &Path) -> StoreResult<Option<EntryMeta>> {
        match fs::read(path).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Metadata for a key that has not expired; expired entries are removed.
    async fn live_meta(&self, key: &str) -> StoreResult<Option<EntryMeta>> {
        let Some(meta) = Self::read_meta(&self.meta_path(key)).await? else {
            return Ok(None);
        };
        if meta.expires_at.is_some_and(|at| unix_now() >= at) {
            debug!("Expired filesystem entry for key {}", key);
            self.remove_files(key).await;
            return Ok(None);
        }
        Ok(Some(meta))
    }

    async fn remove_files(&self, key: &str) {
        let _ = fs::remove_file(self.value_path(key)).await;
        let _ = fs::remove_file(self.meta_path(key)).await;
    }
}

#[async_trait]
impl KeyValueStore for FilesystemStore {
    async fn ping(&self) -> StoreResult<()> {
        let metadata = fs::metadata(&self.base_path).await?;
        if !metadata.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "{} is not a directory",
                self.base_path.display()
            )));
        }
        if metadata.permissions().readonly() {
            return Err(StoreError::Unavailable(format!(
                "{} is read-only",
                self.base_path.display()
            )));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        if self.live_meta(key).await?.is_none() {
            return Ok(None);
        }
        match fs::read_to_string(self.value_path(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let _ = fs::remove_file(self.meta_path(key)).await;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let value_path = self.value_path(key);
        if let Some(parent) = value_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        write_atomic(&value_path, value.as_bytes()).await?;

        let now = unix_now();
        let meta = EntryMeta {
            key: key.to_string(),
            expires_at: ttl.and_then(|d| now.checked_add(d.as_secs())),
            created_at: now,
            size: value.len(),
        };
        write_atomic(&self.meta_path(key), &serde_json::to_vec(&meta)?).await
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let existed = fs::try_exists(self.meta_path(key)).await?;
        self.remove_files(key).await;
        Ok(existed)
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        let now = unix_now();
        let mut keys = Vec::new();

        let mut shards = fs::read_dir(&self.base_path).await?;
        while let Some(shard) = shards.next_entry().await? {
            if !shard.file_type().await?.is_dir() {
                continue;
            }
            let mut files = fs::read_dir(shard.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let path = file.path();
                if path.extension().and_then(|e| e.to_str()) != Some("meta") {
                    continue;
                }
                match Self::read_meta(&path).await {
                    Ok(Some(meta)) if !meta.expires_at.is_some_and(|at| now >= at) => {
                        keys.push(meta.key)
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Skipping unreadable cache metadata {:?}: {}", path, e),
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        Ok(self.live_meta(key).await?.and_then(|meta| {
            meta.expires_at
                .map(|at| Duration::from_secs(at.saturating_sub(unix_now())))
        }))
    }

    fn backend_type(&self) -> &str {
        "filesystem"
    }
}
