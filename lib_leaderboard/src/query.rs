//! Read side of the leaderboard cache.
//!
//! Every failure mode a caller can see is one of the four [`QueryError`]
//! variants; raw transport errors never escape. When the cache layer is
//! down the service says so instead of silently falling back to the live
//! upstream API.

use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::model::{LeaderboardPage, PlayerEntry};
use crate::modes::{ModeId, RankingKind};
use crate::store::ScoreStore;

/// Default page size when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: u64 = 100;

/// Upper bound on a single page.
pub const MAX_PAGE_LIMIT: u64 = 1000;

#[derive(Debug, Error)]
pub enum QueryError {
    /// The caller asked for a mode or kind outside the supported sets.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The cache layer is down. Distinct from "no data yet" so callers can
    /// tell an outage from a cold cache.
    #[error("leaderboard cache unavailable")]
    StoreUnavailable,

    /// No refresh has ever succeeded for this (mode, kind).
    #[error("leaderboard not initialized for mode {mode} ranking_type {kind}")]
    NotInitialized { mode: u16, kind: u8 },

    /// The key exists but holds no entries.
    #[error("leaderboard empty for mode {mode} ranking_type {kind}")]
    Empty { mode: u16, kind: u8 },
}

/// Paged reads over the score store.
pub struct QueryService {
    store: Arc<ScoreStore>,
}

impl QueryService {
    pub fn new(store: Arc<ScoreStore>) -> Self {
        Self { store }
    }

    /// Returns one page of the global leaderboard for (mode, kind).
    ///
    /// Entries come back in store order (score descending) with ranks
    /// rewritten to the dense window `offset+1 ..= offset+len`; the page
    /// total is the full set cardinality.
    pub async fn get_page(
        &self,
        mode: u16,
        ranking_type: u8,
        limit: u64,
        offset: u64,
    ) -> Result<LeaderboardPage, QueryError> {
        let mode = ModeId::from_wire(mode)
            .ok_or_else(|| QueryError::InvalidParameter(format!("unknown mode {mode}")))?;
        let kind = RankingKind::from_wire(ranking_type).ok_or_else(|| {
            QueryError::InvalidParameter(format!("unknown ranking_type {ranking_type}"))
        })?;
        let limit = limit.min(MAX_PAGE_LIMIT);

        if !self.store.is_available().await {
            return Err(QueryError::StoreUnavailable);
        }

        let rows = self
            .store
            .range_by_rank(mode, kind, offset, limit)
            .await
            .map_err(|_| QueryError::StoreUnavailable)?
            .ok_or(QueryError::NotInitialized {
                mode: mode.as_u16(),
                kind: kind.as_wire(),
            })?;
        let total = self
            .store
            .count(mode, kind)
            .await
            .map_err(|_| QueryError::StoreUnavailable)?;

        if total == 0 {
            return Err(QueryError::Empty {
                mode: mode.as_u16(),
                kind: kind.as_wire(),
            });
        }

        // Members are parsed sequentially in store order; output order is
        // the store's score order, never parse-completion order.
        let mut ranking_list: Vec<PlayerEntry> = Vec::with_capacity(rows.len());
        for (member, _score) in &rows {
            match serde_json::from_str::<PlayerEntry>(member) {
                Ok(mut entry) => {
                    entry.rank = (offset + ranking_list.len() as u64 + 1) as u32;
                    ranking_list.push(entry);
                }
                Err(e) => warn!("skipping unparseable cache member: {}", e),
            }
        }

        let season = ranking_list.first().and_then(|e| e.season.clone());

        Ok(LeaderboardPage {
            season,
            ranking_list,
            total,
            mode: mode.as_u16(),
            ranking_type: kind.as_wire(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_with_dead_store() -> QueryService {
        QueryService::new(Arc::new(ScoreStore::disabled()))
    }

    #[tokio::test]
    async fn unknown_mode_is_invalid_regardless_of_store_state() {
        let svc = service_with_dead_store();
        let err = svc.get_page(99, 0, 100, 0).await.unwrap_err();
        assert!(matches!(err, QueryError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn unknown_ranking_type_is_invalid() {
        let svc = service_with_dead_store();
        let err = svc.get_page(1, 7, 100, 0).await.unwrap_err();
        assert!(matches!(err, QueryError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn dead_store_reports_unavailable_not_empty() {
        let svc = service_with_dead_store();
        let err = svc.get_page(1, 0, 100, 0).await.unwrap_err();
        assert!(matches!(err, QueryError::StoreUnavailable));
    }
}
