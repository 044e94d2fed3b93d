//! Wire and cache data structures.
//!
//! The upstream DTOs mirror the game API's JSON contract. Player identity
//! fields vary by mode (character name, class, guild, ...), so everything
//! except the score and our own tags is kept in a flattened map and carried
//! through the cache untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response of `GET /api/gameinfo/servers`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerListResponse {
    #[serde(default)]
    pub server_list: Vec<Server>,
}

/// One game server as reported by the upstream API. Fetched fresh on every
/// refresh cycle, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub server_id: i64,
    pub server_name: String,
    #[serde(default)]
    pub server_short_name: String,
}

/// Response of `GET /api/ranking/list` for one (mode, kind, server).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingListResponse {
    #[serde(default)]
    pub ranking_list: Vec<PlayerEntry>,
    #[serde(default)]
    pub season: Option<Value>,
}

/// One ranked player.
///
/// `rank`, `server_name` and `server_short_name` are assigned by the
/// aggregator; only `point` is trusted from upstream. Whatever per-server
/// rank the upstream reports is overwritten by the global one. Each entry is
/// stored as one JSON string in the cache sorted set, with `point` as the
/// set score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEntry {
    #[serde(default)]
    pub point: i64,
    #[serde(default)]
    pub rank: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server_short_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<Value>,
    /// Identity fields opaque to this service (character id, name, class,
    /// job, level, ...). Preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One page of the global leaderboard, as served over HTTP.
///
/// Field names are fixed by the existing consumer contract; note the mixed
/// `rankingList` / `ranking_type` naming is deliberate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardPage {
    pub season: Option<Value>,
    #[serde(rename = "rankingList")]
    pub ranking_list: Vec<PlayerEntry>,
    pub total: u64,
    pub mode: u16,
    pub ranking_type: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANKING_FIXTURE: &str = r#"{
        "rankingList": [
            {
                "rank": 1,
                "characterId": "c-1001",
                "characterName": "Kromede",
                "classId": 5,
                "level": 55,
                "point": 1234
            },
            {
                "rank": 2,
                "characterId": "c-1002",
                "characterName": "Vidar",
                "classId": 2,
                "level": 54,
                "point": 987
            }
        ],
        "season": {"id": 3, "name": "Season 3"}
    }"#;

    #[test]
    fn parses_ranking_response() {
        let resp: RankingListResponse = serde_json::from_str(RANKING_FIXTURE).unwrap();
        assert_eq!(resp.ranking_list.len(), 2);
        assert_eq!(resp.ranking_list[0].point, 1234);
        assert_eq!(resp.ranking_list[1].point, 987);
        assert_eq!(
            resp.ranking_list[0].extra.get("characterName"),
            Some(&Value::String("Kromede".into()))
        );
        assert!(resp.season.is_some());
    }

    #[test]
    fn member_serialization_preserves_opaque_fields() {
        let resp: RankingListResponse = serde_json::from_str(RANKING_FIXTURE).unwrap();
        let mut entry = resp.ranking_list[0].clone();
        entry.rank = 7;
        entry.server_name = "Siel".into();
        entry.server_short_name = "SL".into();

        let member = serde_json::to_string(&entry).unwrap();
        let back: PlayerEntry = serde_json::from_str(&member).unwrap();
        assert_eq!(back, entry);
        assert_eq!(back.extra.get("characterId"), Some(&Value::String("c-1001".into())));
        assert_eq!(back.rank, 7);
    }

    #[test]
    fn missing_ranking_list_defaults_to_empty() {
        let resp: RankingListResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.ranking_list.is_empty());
        assert!(resp.season.is_none());
    }

    #[test]
    fn page_serializes_contract_field_names() {
        let page = LeaderboardPage {
            season: None,
            ranking_list: vec![],
            total: 0,
            mode: 1,
            ranking_type: 0,
        };
        let json = serde_json::to_value(&page).unwrap();
        assert!(json.get("rankingList").is_some());
        assert!(json.get("ranking_type").is_some());
        assert!(json.get("total").is_some());
    }
}
