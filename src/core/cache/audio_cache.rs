use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::OnceCell;
use tracing::{debug, error};

use super::store::KeyValueStore;
use crate::core::audio::AudioContainer;
use crate::core::errors::SpeechResult;

/// Counters for cache traffic.
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    inner: Arc<RwLock<CacheCounts>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheCounts {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.inner.write().hits += 1;
    }

    pub fn record_miss(&self) {
        self.inner.write().misses += 1;
    }

    pub fn record_set(&self) {
        self.inner.write().sets += 1;
    }

    pub fn snapshot(&self) -> CacheCounts {
        *self.inner.read()
    }
}

/// Store TTL for a configured number of seconds; zero or less means no expiry.
pub fn ttl_from_seconds(ttl_seconds: i64) -> Option<Duration> {
    u64::try_from(ttl_seconds)
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

/// Read-through cache of base64 audio containers.
///
/// Not transactional: two concurrent misses on one key both compute and the
/// last write wins.
pub struct AudioCache {
    store: Arc<dyn KeyValueStore>,
    ready: OnceCell<()>,
    metrics: CacheMetrics,
}

impl AudioCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            ready: OnceCell::new(),
            metrics: CacheMetrics::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Ping the store the first time it is used. A failed ping is retried on
    /// the next call.
    async fn ensure_ready(&self) -> SpeechResult<()> {
        self.ready
            .get_or_try_init(|| async {
                self.store.ping().await.map_err(|e| {
                    error!(
                        "Failed to reach {} cache store: {}",
                        self.store.backend_type(),
                        e
                    );
                    e
                })
            })
            .await?;
        Ok(())
    }

    /// Return the stored base64 value for `key`, or compute, store and return it.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &str,
        ttl_seconds: i64,
        compute: F,
    ) -> SpeechResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SpeechResult<AudioContainer>>,
    {
        self.ensure_ready().await?;

        match self.store.get(key).await {
            Ok(Some(value)) if !value.is_empty() => {
                self.metrics.record_hit();
                debug!("Cache hit for key {}", key);
                return Ok(value);
            }
            Ok(_) => {}
            Err(e) => {
                error!("Cache read failed for key {}: {}", key, e);
                return Err(e.into());
            }
        }
        self.metrics.record_miss();
        debug!("Cache miss for key {}", key);

        let container = compute().await?;
        let value = container.to_base64();

        if let Err(e) = self
            .store
            .set(key, &value, ttl_from_seconds(ttl_seconds))
            .await
        {
            error!("Cache write failed for key {}: {}", key, e);
            return Err(e.into());
        }
        self.metrics.record_set();
        debug!(
            "Cached {} bytes of audio under {} (ttl={}s)",
            container.len(),
            key,
            ttl_seconds
        );

        Ok(value)
    }
}
