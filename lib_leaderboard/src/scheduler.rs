//! Periodic refresh driver.
//!
//! One cooperative task owns the whole refresh pipeline. The cycle is
//! awaited inline between ticks, so a second cycle can never start while
//! one is still running, even when a cycle overruns its interval.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{error, info, warn};

use crate::aggregator::aggregate;
use crate::model::Server;
use crate::modes::{ModeId, RankingKind, ranking_pairs};
use crate::store::ScoreStore;
use crate::upstream::UpstreamClient;

/// Full refresh every 4 hours. The cache TTL (3 h) is deliberately shorter:
/// one missed cycle and the cache goes cold instead of serving stale data.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(4 * 60 * 60);

/// Breather between (mode, kind) pairs within a cycle.
const PAIR_DELAY: Duration = Duration::from_millis(500);

/// Drives the aggregator across the modes x kinds cross-product on a fixed
/// interval and writes the results into the score store.
pub struct RefreshScheduler {
    upstream: Arc<UpstreamClient>,
    store: Arc<ScoreStore>,
    refresh_interval: Duration,
}

impl RefreshScheduler {
    pub fn new(
        upstream: Arc<UpstreamClient>,
        store: Arc<ScoreStore>,
        refresh_interval: Duration,
    ) -> Self {
        if store.ttl() >= refresh_interval {
            warn!(
                "cache TTL ({:?}) is not shorter than the refresh interval ({:?}); \
                 a stalled worker will keep serving old data",
                store.ttl(),
                refresh_interval
            );
        }
        Self {
            upstream,
            store,
            refresh_interval,
        }
    }

    /// Runs until the shutdown channel fires. The first cycle starts
    /// immediately; subsequent ticks come at the fixed interval.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_cycle().await {
                        Ok(total) => {
                            let next = Utc::now() + self.refresh_interval;
                            info!(
                                "refresh cycle complete: {} players total, next run around {}",
                                total,
                                next.format("%Y-%m-%d %H:%M:%S UTC")
                            );
                        }
                        // A failed cycle must never kill the loop; wait for
                        // the next tick and try again.
                        Err(e) => error!("refresh cycle failed: {:#}", e),
                    }
                }
                _ = shutdown.recv() => {
                    info!("refresh scheduler shutting down");
                    return;
                }
            }
        }
    }

    /// One full pass over every available (mode, kind) pair. Returns the
    /// total number of players written.
    async fn run_cycle(&self) -> anyhow::Result<u64> {
        info!("starting leaderboard refresh");

        let servers = self.upstream.list_servers().await;
        if servers.is_empty() {
            anyhow::bail!("server list unavailable, retrying next interval");
        }
        info!("{} servers found", servers.len());

        let mut total: u64 = 0;
        for (mode, kind) in ranking_pairs() {
            // Weekly boards do not exist for every mode; probe before paying
            // for a full aggregation. Overall boards always exist.
            if kind == RankingKind::Weekly && !self.kind_available(mode, kind, &servers).await {
                info!("mode {} {} not available, skipped", mode, kind);
                continue;
            }

            let entries = aggregate(&self.upstream, mode, kind, &servers).await;
            if entries.is_empty() {
                // Keep whatever snapshot is already cached for this pair.
                warn!("mode {} {}: nothing fetched, previous snapshot kept", mode, kind);
            } else {
                match self.store.replace(mode, kind, &entries).await {
                    Ok(()) => {
                        info!("mode {} {}: {} players cached", mode, kind, entries.len());
                        total += entries.len() as u64;
                    }
                    Err(e) => error!("mode {} {}: cache write failed: {}", mode, kind, e),
                }
            }

            sleep(PAIR_DELAY).await;
        }

        Ok(total)
    }

    /// Existence probe: one test fetch against the first server only. A pair
    /// that yields nothing there is skipped for this cycle.
    async fn kind_available(&self, mode: ModeId, kind: RankingKind, servers: &[Server]) -> bool {
        let Some(first) = servers.first() else {
            return false;
        };
        match self.upstream.fetch_server_ranking(mode, kind, first).await {
            Some((entries, _)) => !entries.is_empty(),
            None => false,
        }
    }
}
