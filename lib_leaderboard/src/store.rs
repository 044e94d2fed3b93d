//! Redis-backed score store.
//!
//! One sorted set per (mode, kind): member = serialized [`PlayerEntry`],
//! score = the player's point value.
//!
//! Key pattern:
//!
//! ```text
//! leaderboard:{mode}:{kind}   -> sorted set, TTL-bound
//! ```
//!
//! The TTL is deliberately shorter than the refresh interval: if the refresh
//! worker dies, the cache goes cold after one missed cycle and readers see
//! `NotInitialized` instead of arbitrarily stale data.

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::model::PlayerEntry;
use crate::modes::{ModeId, RankingKind};

/// Expiry on every leaderboard key. Must stay below the refresh interval.
pub const CACHE_TTL: Duration = Duration::from_secs(3 * 60 * 60);

/// Bound on the initial connection attempt.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
/// Bound on the liveness probe. The probe must never block a request path
/// waiting on a dead store.
const PING_TIMEOUT: Duration = Duration::from_secs(2);
/// Bound on read operations.
const READ_TIMEOUT: Duration = Duration::from_secs(5);
/// Bound on the bulk replace. Generous: a full mode can be thousands of
/// members, but it is still one pipelined round trip.
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// ZADD members per pipeline command.
const ZADD_CHUNK: usize = 500;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store is disabled, not yet connected, or the connection is down.
    #[error("score store unavailable")]
    Unavailable,

    #[error("redis error: {0}")]
    Redis(#[from] RedisError),

    #[error("entry serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Connection lifecycle. A `Failed` connection is retried on the next
/// liveness probe rather than permanently given up on.
enum ConnState {
    Unconnected,
    Connected(ConnectionManager),
    Failed,
}

/// Handle to the leaderboard cache. Constructed once at process start and
/// passed to both the refresh scheduler and the query service.
pub struct ScoreStore {
    /// `None` means the store is disabled: every operation reports
    /// unavailable and nothing blocks.
    client: Option<redis::Client>,
    state: Mutex<ConnState>,
    ttl: Duration,
}

impl ScoreStore {
    /// Opens a handle to the given Redis URL. The actual connection is
    /// established lazily, on the first liveness probe or write.
    pub fn new(url: &str, ttl: Duration) -> Result<Self, RedisError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client: Some(client),
            state: Mutex::new(ConnState::Unconnected),
            ttl,
        })
    }

    /// A store with no backing Redis at all. Every operation reports
    /// unavailable.
    pub fn disabled() -> Self {
        Self {
            client: None,
            state: Mutex::new(ConnState::Unconnected),
            ttl: CACHE_TTL,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cheap liveness probe (PING with its own short timeout). Also the
    /// place where a `Failed` connection gets its retry.
    pub async fn is_available(&self) -> bool {
        let Some(mut conn) = self.ensure_connected().await else {
            return false;
        };
        match timeout(
            PING_TIMEOUT,
            redis::cmd("PING").query_async::<String>(&mut conn),
        )
        .await
        {
            Ok(Ok(_)) => true,
            _ => {
                warn!("cache liveness probe failed");
                *self.state.lock().await = ConnState::Failed;
                false
            }
        }
    }

    /// Atomically replaces the whole sorted set for (mode, kind): delete,
    /// bulk insert, TTL, all in one MULTI/EXEC pipeline. No reader observes
    /// a partially-written key.
    pub async fn replace(
        &self,
        mode: ModeId,
        kind: RankingKind,
        entries: &[PlayerEntry],
    ) -> Result<(), StoreError> {
        let Some(mut conn) = self.ensure_connected().await else {
            return Err(StoreError::Unavailable);
        };
        let key = cache_key(mode, kind);

        let mut items: Vec<(i64, String)> = Vec::with_capacity(entries.len());
        for entry in entries {
            items.push((entry.point, serde_json::to_string(entry)?));
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.del(&key).ignore();
        for chunk in items.chunks(ZADD_CHUNK) {
            pipe.zadd_multiple(&key, chunk).ignore();
        }
        pipe.expire(&key, self.ttl.as_secs() as i64).ignore();

        timeout(WRITE_TIMEOUT, pipe.query_async::<()>(&mut conn))
            .await
            .map_err(|_| StoreError::Unavailable)??;
        Ok(())
    }

    /// Reads the `[offset, offset+limit-1]` window in descending score
    /// order. `None` when the key does not exist, which is distinct from an
    /// existing-but-empty set.
    pub async fn range_by_rank(
        &self,
        mode: ModeId,
        kind: RankingKind,
        offset: u64,
        limit: u64,
    ) -> Result<Option<Vec<(String, i64)>>, StoreError> {
        let Some(mut conn) = self.current().await else {
            return Err(StoreError::Unavailable);
        };
        let key = cache_key(mode, kind);

        if limit == 0 {
            // A zero window would otherwise become ZREVRANGE 0 -1 (the whole
            // set, -1 counting from the end).
            let exists: bool = timeout(READ_TIMEOUT, conn.exists(&key))
                .await
                .map_err(|_| StoreError::Unavailable)??;
            return Ok(exists.then(Vec::new));
        }

        let start = offset as isize;
        let stop = (offset + limit - 1) as isize;
        let (exists, rows): (bool, Vec<(String, i64)>) = timeout(
            READ_TIMEOUT,
            redis::pipe()
                .exists(&key)
                .zrevrange_withscores(&key, start, stop)
                .query_async(&mut conn),
        )
        .await
        .map_err(|_| StoreError::Unavailable)??;

        Ok(exists.then_some(rows))
    }

    /// Total number of members for (mode, kind). Zero for a missing key.
    pub async fn count(&self, mode: ModeId, kind: RankingKind) -> Result<u64, StoreError> {
        let Some(mut conn) = self.current().await else {
            return Err(StoreError::Unavailable);
        };
        let key = cache_key(mode, kind);
        let n: u64 = timeout(READ_TIMEOUT, conn.zcard(&key))
            .await
            .map_err(|_| StoreError::Unavailable)??;
        Ok(n)
    }

    pub async fn exists(&self, mode: ModeId, kind: RankingKind) -> Result<bool, StoreError> {
        let Some(mut conn) = self.current().await else {
            return Err(StoreError::Unavailable);
        };
        let key = cache_key(mode, kind);
        let exists: bool = timeout(READ_TIMEOUT, conn.exists(&key))
            .await
            .map_err(|_| StoreError::Unavailable)??;
        Ok(exists)
    }

    /// Connected manager, establishing the connection if needed. Both
    /// `Unconnected` and `Failed` states trigger a bounded attempt here.
    async fn ensure_connected(&self) -> Option<ConnectionManager> {
        let client = self.client.as_ref()?;
        let mut state = self.state.lock().await;
        if let ConnState::Connected(mgr) = &*state {
            return Some(mgr.clone());
        }
        match timeout(CONNECT_TIMEOUT, ConnectionManager::new(client.clone())).await {
            Ok(Ok(mgr)) => {
                info!("cache connection established");
                *state = ConnState::Connected(mgr.clone());
                Some(mgr)
            }
            Ok(Err(e)) => {
                warn!("cache unavailable: {}", e);
                *state = ConnState::Failed;
                None
            }
            Err(_) => {
                warn!("cache connection attempt timed out");
                *state = ConnState::Failed;
                None
            }
        }
    }

    /// Connected manager without a reconnect attempt. Read paths use this so
    /// a dead store fails fast; the liveness probe is what reconnects.
    async fn current(&self) -> Option<ConnectionManager> {
        match &*self.state.lock().await {
            ConnState::Connected(mgr) => Some(mgr.clone()),
            _ => None,
        }
    }
}

/// `leaderboard:{mode}:{kind}`
pub fn cache_key(mode: ModeId, kind: RankingKind) -> String {
    format!("leaderboard:{}:{}", mode.as_u16(), kind.as_wire())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(raw: u16) -> ModeId {
        ModeId::from_wire(raw).unwrap()
    }

    #[test]
    fn key_layout() {
        assert_eq!(cache_key(mode(1), RankingKind::Overall), "leaderboard:1:0");
        assert_eq!(cache_key(mode(20), RankingKind::Weekly), "leaderboard:20:1");
    }

    #[tokio::test]
    async fn disabled_store_is_never_available() {
        let store = ScoreStore::disabled();
        assert!(!store.is_available().await);
        assert!(!store.is_available().await); // stays down, no retry loop to get stuck in
    }

    #[tokio::test]
    async fn disabled_store_rejects_operations() {
        let store = ScoreStore::disabled();
        let entries = vec![PlayerEntry::default()];
        assert!(matches!(
            store.replace(mode(1), RankingKind::Overall, &entries).await,
            Err(StoreError::Unavailable)
        ));
        assert!(matches!(
            store.range_by_rank(mode(1), RankingKind::Overall, 0, 100).await,
            Err(StoreError::Unavailable)
        ));
        assert!(matches!(
            store.count(mode(1), RankingKind::Overall).await,
            Err(StoreError::Unavailable)
        ));
        assert!(matches!(
            store.exists(mode(1), RankingKind::Overall).await,
            Err(StoreError::Unavailable)
        ));
    }
}
