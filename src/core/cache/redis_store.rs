//! Shared Redis store.
//!
//! Values are plain Redis strings written with `SET .. EX`. The connection is
//! opened on first use and reconnects on its own afterwards.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::store::{KeyValueStore, StoreError, StoreResult};

/// Redis rejects expirations whose millisecond deadline overflows an i64.
const MAX_EXPIRE_SECONDS: u64 = (i64::MAX as u64 / 1000) / 2;

const SCAN_BATCH: usize = 500;

pub struct RedisStore {
    client: Client,
    connection: OnceCell<ConnectionManager>,
    connect_timeout: Duration,
}

impl RedisStore {
    /// Parse `url` without connecting.
    pub fn new(url: &str) -> StoreResult<Self> {
        let client = Client::open(url)?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
            connect_timeout: Duration::from_secs(5),
        })
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    async fn connection(&self) -> StoreResult<ConnectionManager> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                let config = ConnectionManagerConfig::new()
                    .set_number_of_retries(1)
                    .set_connection_timeout(self.connect_timeout)
                    .set_response_timeout(self.connect_timeout);
                let manager = self
                    .client
                    .get_connection_manager_with_config(config)
                    .await?;
                info!(
                    "Connected to Redis at {}",
                    self.client.get_connection_info().addr
                );
                Ok::<_, StoreError>(manager)
            })
            .await?;
        Ok(manager.clone())
    }
}

/// Seconds for `SET .. EX`; `None` when the entry should not expire.
fn expire_seconds(ttl: Option<Duration>) -> Option<u64> {
    let secs = ttl?.as_secs().max(1);
    (secs <= MAX_EXPIRE_SECONDS).then_some(secs)
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn ping(&self) -> StoreResult<()> {
        let mut con = self.connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut con).await?;
        if pong != "PONG" {
            return Err(StoreError::Unavailable(format!(
                "unexpected PING reply: {pong}"
            )));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut con = self.connection().await?;
        let value: Option<String> = con.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let mut con = self.connection().await?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        match expire_seconds(ttl) {
            Some(secs) => {
                cmd.arg("EX").arg(secs);
            }
            None if ttl.is_some() => debug!("Storing {} without expiry", key),
            None => {}
        }
        let _: () = cmd.query_async(&mut con).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut con = self.connection().await?;
        let removed: i64 = con.del(key).await?;
        Ok(removed > 0)
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        let mut con = self.connection().await?;
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut con)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        let mut con = self.connection().await?;
        let secs: i64 = con.ttl(key).await?;
        // -1: no expiry, -2: absent
        Ok(u64::try_from(secs).ok().map(Duration::from_secs))
    }

    fn backend_type(&self) -> &str {
        "redis"
    }
}
