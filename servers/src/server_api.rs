//! # Leaderboard HTTP API
//!
//! Serves the consolidated global leaderboard out of the Redis cache, plus
//! a handful of thin pass-through endpoints that forward single lookups to
//! the upstream game API verbatim.
//!
//! Query errors map onto HTTP statuses so the frontend can tell the cases
//! apart: 400 bad parameters, 503 cache layer down, 404 no data (either
//! never refreshed or empty).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use serde::Deserialize;
use serde_json::{Value, json};
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use lib_leaderboard::query::{DEFAULT_PAGE_LIMIT, QueryError, QueryService};
use lib_leaderboard::store::ScoreStore;
use lib_leaderboard::upstream::UpstreamClient;

/// Configuration for the HTTP API server, from CLI arguments and
/// environment variables.
#[derive(Parser, Debug)]
#[clap(author, version, about = "Global leaderboard HTTP API")]
struct AppConfig {
    /// HTTP server port.
    #[clap(long, env = "API_PORT", default_value_t = 8000)]
    port: u16,

    /// Redis connection URL for the leaderboard cache.
    #[clap(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379/0")]
    redis_url: String,

    /// Base URL of the upstream game API.
    #[clap(long, env = "UPSTREAM_BASE_URL", default_value = "https://tw.ncsoft.com/aion2")]
    upstream_base_url: String,

    /// TTL in seconds on cached leaderboard keys (must match the worker).
    #[clap(long, env = "CACHE_TTL_SECS", default_value_t = 3 * 60 * 60)]
    cache_ttl_secs: u64,
}

struct AppState {
    query: QueryService,
    upstream: UpstreamClient,
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
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::parse();
    setup_logging();

    let store = Arc::new(ScoreStore::new(
        &config.redis_url,
        Duration::from_secs(config.cache_ttl_secs),
    )?);
    let upstream = UpstreamClient::new(&config.upstream_base_url)?;
    let state = Arc::new(AppState {
        query: QueryService::new(store),
        upstream,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/leaderboard", get(leaderboard_handler))
        .route("/api/search/{character_name}", get(search_handler))
        .route("/api/character_info", get(character_info_handler))
        .route("/api/character_equipment", get(character_equipment_handler))
        .layer(cors)
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("leaderboard API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete.");
    Ok(())
}

async fn health_handler() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
struct LeaderboardParams {
    mode: u16,
    #[serde(default)]
    ranking_type: u8,
    #[serde(default = "default_limit")]
    limit: u64,
    #[serde(default)]
    offset: u64,
}

fn default_limit() -> u64 {
    DEFAULT_PAGE_LIMIT
}

async fn leaderboard_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .query
        .get_page(params.mode, params.ranking_type, params.limit, params.offset)
        .await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
struct CharacterParams {
    character_id: String,
    server_id: i64,
}

/// `GET /api/search/{character_name}` — forwarded character search.
async fn search_handler(
    State(state): State<Arc<AppState>>,
    Path(character_name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let body = state
        .upstream
        .passthrough_get(
            "/api/search/aion2tw/search/v2/character",
            &[("keyword", character_name)],
        )
        .await
        .map_err(ApiError::upstream)?;
    Ok(Json(body))
}

/// `GET /api/character_info?character_id=..&server_id=..` — forwarded.
async fn character_info_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CharacterParams>,
) -> Result<Json<Value>, ApiError> {
    let body = state
        .upstream
        .passthrough_get(
            "/api/character/info",
            &[
                ("lang", "en".to_string()),
                ("characterId", params.character_id),
                ("serverId", params.server_id.to_string()),
            ],
        )
        .await
        .map_err(ApiError::upstream)?;
    Ok(Json(body))
}

/// `GET /api/character_equipment?character_id=..&server_id=..` — forwarded.
async fn character_equipment_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CharacterParams>,
) -> Result<Json<Value>, ApiError> {
    let body = state
        .upstream
        .passthrough_get(
            "/api/character/equipment",
            &[
                ("lang", "en".to_string()),
                ("characterId", params.character_id),
                ("serverId", params.server_id.to_string()),
            ],
        )
        .await
        .map_err(ApiError::upstream)?;
    Ok(Json(body))
}

/// Maps library errors onto HTTP responses with a JSON body carrying an
/// `error_type` tag the frontend can switch on.
#[derive(Debug)]
enum ApiError {
    Query(QueryError),
    /// A pass-through request to the upstream failed.
    Upstream(String),
}

impl ApiError {
    fn upstream(e: reqwest::Error) -> Self {
        warn!("upstream pass-through failed: {}", e);
        ApiError::Upstream(e.to_string())
    }
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        ApiError::Query(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::Query(e) => {
                let (status, tag) = match e {
                    QueryError::InvalidParameter(_) => (StatusCode::BAD_REQUEST, "InvalidParameter"),
                    QueryError::StoreUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "StoreUnavailable"),
                    QueryError::NotInitialized { .. } => (StatusCode::NOT_FOUND, "NotInitialized"),
                    QueryError::Empty { .. } => (StatusCode::NOT_FOUND, "Empty"),
                };
                (status, tag, e.to_string())
            }
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "UpstreamUnavailable", msg.clone()),
        };
        (
            status,
            Json(json!({
                "error_type": error_type,
                "message": message
            })),
        )
            .into_response()
    }
}

/// Listens for Ctrl-C and SIGTERM so the server can drain in-flight
/// requests before exiting.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
