//! Game mode identifiers and ranking kinds.
//!
//! The upstream API keys its rankings by `rankingContentsType` (the game
//! mode) and `rankingType` (overall vs weekly). Both sets are fixed by the
//! game, not discovered at runtime.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A game ranking category identifier (`rankingContentsType` upstream).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModeId(u16);

/// The modes the game currently exposes rankings for.
pub const SUPPORTED_MODES: [ModeId; 7] = [
    ModeId(1),
    ModeId(3),
    ModeId(4),
    ModeId(5),
    ModeId(6),
    ModeId(20),
    ModeId(21),
];

impl ModeId {
    /// Validates a raw mode id against the supported set.
    pub fn from_wire(raw: u16) -> Option<Self> {
        SUPPORTED_MODES.iter().copied().find(|m| m.0 == raw)
    }

    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Overall vs weekly ranking variant (`rankingType` upstream).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RankingKind {
    Overall,
    Weekly,
}

impl RankingKind {
    pub const ALL: [RankingKind; 2] = [RankingKind::Overall, RankingKind::Weekly];

    pub fn from_wire(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(RankingKind::Overall),
            1 => Some(RankingKind::Weekly),
            _ => None,
        }
    }

    pub const fn as_wire(self) -> u8 {
        match self {
            RankingKind::Overall => 0,
            RankingKind::Weekly => 1,
        }
    }
}

impl fmt::Display for RankingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankingKind::Overall => write!(f, "overall"),
            RankingKind::Weekly => write!(f, "weekly"),
        }
    }
}

/// The full cross-product of modes and kinds, mode-major. This is the order
/// a refresh cycle walks the leaderboards in.
pub fn ranking_pairs() -> impl Iterator<Item = (ModeId, RankingKind)> {
    SUPPORTED_MODES
        .into_iter()
        .flat_map(|mode| RankingKind::ALL.into_iter().map(move |kind| (mode, kind)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_validation() {
        assert_eq!(ModeId::from_wire(1), Some(ModeId(1)));
        assert_eq!(ModeId::from_wire(21), Some(ModeId(21)));
        assert_eq!(ModeId::from_wire(2), None);
        assert_eq!(ModeId::from_wire(99), None);
    }

    #[test]
    fn kind_wire_mapping() {
        assert_eq!(RankingKind::from_wire(0), Some(RankingKind::Overall));
        assert_eq!(RankingKind::from_wire(1), Some(RankingKind::Weekly));
        assert_eq!(RankingKind::from_wire(2), None);
        assert_eq!(RankingKind::Overall.as_wire(), 0);
        assert_eq!(RankingKind::Weekly.as_wire(), 1);
    }

    #[test]
    fn pairs_cover_cross_product_mode_major() {
        let pairs: Vec<_> = ranking_pairs().collect();
        assert_eq!(pairs.len(), 14);
        // Mode-major: both kinds of one mode before the next mode.
        assert_eq!(pairs[0], (ModeId(1), RankingKind::Overall));
        assert_eq!(pairs[1], (ModeId(1), RankingKind::Weekly));
        assert_eq!(pairs[2], (ModeId(3), RankingKind::Overall));
        assert_eq!(pairs[13], (ModeId(21), RankingKind::Weekly));
    }
}
