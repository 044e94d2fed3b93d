//! # Leaderboard Refresh Worker
//!
//! Long-running daemon that rebuilds the global leaderboard cache. Every
//! interval it fetches the upstream server list, aggregates each available
//! (mode, kind) ranking across all servers, and bulk-replaces the Redis
//! sorted sets the API server reads from.
//!
//! The store handle and upstream client are constructed here and handed to
//! the scheduler; nothing in the library holds process-global state.

use anyhow::Result;
use clap::Parser;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use lib_leaderboard::scheduler::RefreshScheduler;
use lib_leaderboard::store::ScoreStore;
use lib_leaderboard::upstream::UpstreamClient;

/// Configuration for the refresh worker, from CLI arguments and environment
/// variables.
#[derive(Parser, Debug)]
#[clap(author, version, about = "Global leaderboard refresh worker")]
struct WorkerConfig {
    /// Redis connection URL for the leaderboard cache.
    #[clap(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379/0")]
    redis_url: String,

    /// Base URL of the upstream game API.
    #[clap(long, env = "UPSTREAM_BASE_URL", default_value = "https://tw.ncsoft.com/aion2")]
    upstream_base_url: String,

    /// Seconds between full refresh cycles.
    #[clap(long, env = "REFRESH_INTERVAL_SECS", default_value_t = 4 * 60 * 60)]
    refresh_interval_secs: u64,

    /// TTL in seconds on every cached leaderboard key. Keep it below the
    /// refresh interval so a stalled worker self-expires its cache.
    #[clap(long, env = "CACHE_TTL_SECS", default_value_t = 3 * 60 * 60)]
    cache_ttl_secs: u64,
}

fn setup_logging() {
    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log_level))
        .unwrap();
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::parse();
    setup_logging();

    info!("leaderboard refresh worker starting");
    info!(
        "refresh interval: {:.1}h, cache TTL: {:.1}h",
        config.refresh_interval_secs as f64 / 3600.0,
        config.cache_ttl_secs as f64 / 3600.0
    );

    let upstream = Arc::new(UpstreamClient::new(&config.upstream_base_url)?);
    let store = Arc::new(ScoreStore::new(
        &config.redis_url,
        Duration::from_secs(config.cache_ttl_secs),
    )?);

    let (shutdown_tx, _) = broadcast::channel(1);
    let scheduler = RefreshScheduler::new(
        upstream,
        store,
        Duration::from_secs(config.refresh_interval_secs),
    );
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_tx.subscribe()));

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut term_signal =
                    signal::unix::signal(signal::unix::SignalKind::terminate()).unwrap();
                term_signal.recv().await;
                info!("SIGTERM received, initiating shutdown.");
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
    }

    let _ = shutdown_tx.send(());
    let _ = scheduler_handle.await;

    info!("Shutdown complete.");
    Ok(())
}
