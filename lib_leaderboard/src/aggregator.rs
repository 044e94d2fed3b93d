//! Cross-server aggregation for one (mode, kind) pair.
//!
//! Servers are fetched strictly sequentially with a small delay between
//! calls; the upstream is rate-sensitive and one request in flight at a
//! time is the agreed load bound. A single server outage must not abort the
//! whole mode, so failures are logged and skipped.

use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::model::{PlayerEntry, Server};
use crate::modes::{ModeId, RankingKind};
use crate::upstream::UpstreamClient;

/// Delay between per-server upstream calls.
pub const REQUEST_DELAY: Duration = Duration::from_millis(100);

/// Fetches every server's ranking for (mode, kind), tags entries with their
/// origin server, and globally re-ranks by score.
///
/// An empty result means "no data this cycle": callers must keep the
/// previous snapshot rather than overwrite the cache with nothing — stale
/// data is strictly preferred over wiping the cache on a transient total
/// failure.
pub async fn aggregate(
    client: &UpstreamClient,
    mode: ModeId,
    kind: RankingKind,
    servers: &[Server],
) -> Vec<PlayerEntry> {
    let mut all_players: Vec<PlayerEntry> = Vec::new();

    for server in servers {
        match client.fetch_server_ranking(mode, kind, server).await {
            Some((entries, season)) => {
                info!(
                    "server {} ({}): {} players",
                    server.server_id,
                    server.server_name,
                    entries.len()
                );
                all_players.extend(tag_entries(entries, server, season.as_ref()));
            }
            None => {
                warn!(
                    "server {} ({}): no data",
                    server.server_id, server.server_name
                );
            }
        }
        sleep(REQUEST_DELAY).await;
    }

    if all_players.is_empty() {
        warn!("no players fetched for mode {} {}", mode, kind);
        return all_players;
    }

    rank_entries(&mut all_players);
    all_players
}

/// Stamps every entry with its origin server and the season blob from that
/// server's response.
pub fn tag_entries(
    mut entries: Vec<PlayerEntry>,
    server: &Server,
    season: Option<&Value>,
) -> Vec<PlayerEntry> {
    for entry in &mut entries {
        entry.server_name = server.server_name.clone();
        entry.server_short_name = server.server_short_name.clone();
        if entry.season.is_none() {
            entry.season = season.cloned();
        }
    }
    entries
}

/// Sorts by score descending and assigns dense 1-based ranks. The sort is
/// stable, so ties keep their arrival order: server iteration order first,
/// then the original per-server order.
pub fn rank_entries(entries: &mut [PlayerEntry]) {
    entries.sort_by_key(|e| std::cmp::Reverse(e.point));
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = (i + 1) as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(name: &str, point: i64) -> PlayerEntry {
        let mut e = PlayerEntry {
            point,
            ..Default::default()
        };
        e.extra
            .insert("characterName".into(), Value::String(name.into()));
        e
    }

    fn server(id: i64, name: &str, short: &str) -> Server {
        Server {
            server_id: id,
            server_name: name.into(),
            server_short_name: short.into(),
        }
    }

    #[test]
    fn global_ranking_across_servers() {
        // Server 1 "Siel" returns 500 and 900, server 2 "Israphel" returns
        // 700; the merged board must read 900, 700, 500 with ranks 1..3.
        let siel = server(1, "Siel", "SL");
        let israphel = server(2, "Israphel", "IS");

        let mut all = Vec::new();
        all.extend(tag_entries(
            vec![entry("a", 500), entry("b", 900)],
            &siel,
            None,
        ));
        all.extend(tag_entries(vec![entry("c", 700)], &israphel, None));
        rank_entries(&mut all);

        let points: Vec<i64> = all.iter().map(|e| e.point).collect();
        assert_eq!(points, vec![900, 700, 500]);
        let ranks: Vec<u32> = all.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(all[0].server_name, "Siel");
        assert_eq!(all[1].server_name, "Israphel");
        assert_eq!(all[2].server_name, "Siel");
    }

    #[test]
    fn ranks_are_dense_and_consistent_with_score_order() {
        let mut entries: Vec<PlayerEntry> =
            [10, 50, 30, 50, 20].iter().map(|&p| entry("x", p)).collect();
        rank_entries(&mut entries);

        for (i, e) in entries.iter().enumerate() {
            assert_eq!(e.rank, (i + 1) as u32);
        }
        for pair in entries.windows(2) {
            assert!(pair[0].point >= pair[1].point);
        }
    }

    #[test]
    fn ties_keep_arrival_order() {
        let mut entries = vec![entry("first", 700), entry("second", 700), entry("third", 700)];
        rank_entries(&mut entries);

        let names: Vec<&str> = entries
            .iter()
            .map(|e| e.extra["characterName"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        assert_eq!(
            entries.iter().map(|e| e.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn tagging_sets_server_and_season() {
        let season = json!({"id": 3});
        let tagged = tag_entries(vec![entry("a", 1)], &server(1, "Siel", "SL"), Some(&season));
        assert_eq!(tagged[0].server_name, "Siel");
        assert_eq!(tagged[0].server_short_name, "SL");
        assert_eq!(tagged[0].season, Some(season));
    }

    #[test]
    fn tagging_does_not_clobber_existing_season() {
        let mut e = entry("a", 1);
        e.season = Some(json!({"id": 1}));
        let tagged = tag_entries(vec![e], &server(1, "Siel", "SL"), Some(&json!({"id": 2})));
        assert_eq!(tagged[0].season, Some(json!({"id": 1})));
    }
}
