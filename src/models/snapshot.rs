//! Derived statistics snapshots.
//!
//! Snapshots are computed on demand over a trailing window and
//! discarded after rendering; they are never persisted.

use serde::{Deserialize, Serialize};

use super::PlayerId;

/// Kills-per-death rounded to two decimal places; 0.0 when deaths is zero.
pub fn kd_ratio(kills: u64, deaths: u64) -> f64 {
    if deaths == 0 {
        0.0
    } else {
        (kills as f64 / deaths as f64 * 100.0).round() / 100.0
    }
}

/// An opposing player together with a kill count against/by the subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpponentTally {
    pub player: PlayerId,
    pub name: String,
    pub count: u64,
}

/// Per-player statistics over a trailing window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStatsSnapshot {
    pub player: PlayerId,

    /// Last known display name
    pub name: String,

    /// Window length in days
    pub window_days: u32,

    /// Deaths caused, teamkills excluded
    pub kills: u64,

    /// Own deaths with a resolved cause, teamkills included
    pub deaths: u64,

    /// Wounds inflicted, teamkills excluded
    pub wounds: u64,

    /// Revives performed
    pub revives_given: u64,

    /// Own deaths that were teamkills
    pub times_teamkilled: u64,

    /// kills / deaths, rounded to 2 dp; 0.0 when deaths is zero
    pub kd_ratio: f64,

    /// Weapon with the most wounds inflicted, raw identifier
    pub favorite_weapon: Option<String>,

    /// Opponent the subject has killed most
    pub top_victim: Option<OpponentTally>,

    /// Opponent who has killed the subject most
    pub top_nemesis: Option<OpponentTally>,
}

/// Server-wide totals with no identity filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerTotals {
    pub kills: u64,
    pub wounds: u64,
    pub deaths: u64,
    pub revives: u64,
    pub favorite_weapon: Option<String>,
}

/// Server-wide statistics: the window's top killer plus overall totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStatsSnapshot {
    pub window_days: u32,

    /// Full per-player snapshot for the window's top killer
    pub top_player: PlayerStatsSnapshot,

    pub totals: ServerTotals,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kd_ratio_rounds_to_two_places() {
        assert_eq!(kd_ratio(45, 30), 1.50);
        assert_eq!(kd_ratio(1, 3), 0.33);
        assert_eq!(kd_ratio(2, 3), 0.67);
    }

    #[test]
    fn test_kd_ratio_zero_deaths_is_sentinel() {
        assert_eq!(kd_ratio(0, 0), 0.0);
        assert_eq!(kd_ratio(17, 0), 0.0);
    }

    #[test]
    fn test_kd_ratio_exact() {
        assert_eq!(kd_ratio(30, 30), 1.0);
        assert_eq!(kd_ratio(0, 5), 0.0);
    }

    #[test]
    fn test_snapshot_serialization() {
        let snap = PlayerStatsSnapshot {
            player: PlayerId::new(76561198000000001),
            name: "Ace".to_string(),
            window_days: 30,
            kills: 45,
            deaths: 30,
            wounds: 60,
            revives_given: 4,
            times_teamkilled: 2,
            kd_ratio: kd_ratio(45, 30),
            favorite_weapon: Some("BP_AK74_Rifle".to_string()),
            top_victim: Some(OpponentTally {
                player: PlayerId::new(76561198000000002),
                name: "Bravo".to_string(),
                count: 5,
            }),
            top_nemesis: None,
        };

        let json = serde_json::to_string(&snap).unwrap();
        let back: PlayerStatsSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kills, 45);
        assert_eq!(back.kd_ratio, 1.50);
        assert_eq!(back.top_victim.unwrap().count, 5);
    }
}
