//! HTTP client for the upstream game API.
//!
//! The upstream is rate-sensitive and occasionally unreliable, so every
//! failure here degrades to "no data" instead of propagating: the refresh
//! pipeline treats a missing server or a missing mode as a gap, never as a
//! fatal error.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

use crate::model::{PlayerEntry, RankingListResponse, Server, ServerListResponse};
use crate::modes::{ModeId, RankingKind};

/// Bound on every upstream call.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// The upstream rejects requests without a browser-looking identification.
const UPSTREAM_USER_AGENT: &str = "Mozilla/5.0";

/// Client for the game's public ranking API.
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
}

impl UpstreamClient {
    /// Builds the client once; the timeout and identification header apply
    /// to every request made through it.
    pub fn new(base_url: impl Into<String>) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .user_agent(UPSTREAM_USER_AGENT)
            .build()?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self { http, base_url })
    }

    /// Fetches the current server list. Returns an empty list on any
    /// failure; callers must treat empty as "upstream unavailable", not as
    /// "zero servers exist".
    pub async fn list_servers(&self) -> Vec<Server> {
        let url = format!("{}/api/gameinfo/servers", self.base_url);
        match self
            .get_json::<ServerListResponse>(&url, &[("lang", "en".to_string())])
            .await
        {
            Ok(resp) => resp.server_list,
            Err(e) => {
                warn!("failed to fetch server list: {}", e);
                Vec::new()
            }
        }
    }

    /// Fetches one server's ranking for a (mode, kind) pair. Returns the raw
    /// entries plus the response's season blob, or `None` on any network,
    /// HTTP or decode failure.
    pub async fn fetch_server_ranking(
        &self,
        mode: ModeId,
        kind: RankingKind,
        server: &Server,
    ) -> Option<(Vec<PlayerEntry>, Option<Value>)> {
        let url = format!("{}/api/ranking/list", self.base_url);
        let query = [
            ("lang", "en".to_string()),
            ("rankingContentsType", mode.as_u16().to_string()),
            ("rankingType", kind.as_wire().to_string()),
            ("serverId", server.server_id.to_string()),
        ];
        match self.get_json::<RankingListResponse>(&url, &query).await {
            Ok(resp) => Some((resp.ranking_list, resp.season)),
            Err(e) => {
                warn!(
                    "ranking fetch failed for server {} ({}): {}",
                    server.server_id, server.server_name, e
                );
                None
            }
        }
    }

    /// Forwards one GET to the upstream and returns its JSON body verbatim.
    /// Used by the thin pass-through endpoints only; the core pipeline never
    /// calls this.
    pub async fn passthrough_get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> reqwest::Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        self.get_json(&url, query).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> reqwest::Result<T> {
        self.http
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let client = UpstreamClient::new("https://example.com/aion2/").unwrap();
        assert_eq!(client.base_url, "https://example.com/aion2");
    }
}
