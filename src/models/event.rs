//! Combat event records.
//!
//! These mirror the rows the game-server logger appends to the event
//! store (wounds, deaths, revives) plus the player roster. They are
//! consumed read-only; nothing in this crate writes combat events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PlayerId;

/// A wound inflicted on a player (downed, not necessarily dead).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WoundEvent {
    /// When the wound was logged
    pub time: DateTime<Utc>,

    /// Player who was wounded
    pub victim: Option<PlayerId>,

    /// Player who inflicted the wound (None for environment/unknown)
    pub attacker: Option<PlayerId>,

    /// Damage dealt
    pub damage: f64,

    /// Raw weapon identifier (e.g., "BP_AK74_Rifle")
    pub weapon: String,

    /// Whether attacker and victim were on the same team
    pub teamkill: bool,
}

/// A death, linked back to the wound that caused it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeathEvent {
    /// When the death was logged
    pub time: DateTime<Utc>,

    /// When the causing wound was logged
    pub wound_time: Option<DateTime<Utc>>,

    /// Player who died
    pub victim: Option<PlayerId>,

    /// Player who caused the death (None for environment/unknown)
    pub attacker: Option<PlayerId>,

    /// Raw weapon identifier
    pub weapon: String,

    /// Same-team flag; None means the cause was never resolved
    pub teamkill: Option<bool>,
}

/// A revive of a downed player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviveEvent {
    /// When the revive was logged
    pub time: DateTime<Utc>,

    /// When the causing wound was logged
    pub wound_time: Option<DateTime<Utc>>,

    /// Player who was revived
    pub victim: Option<PlayerId>,

    /// Player who performed the revive
    pub reviver: Option<PlayerId>,
}

/// Roster entry: a stable identity and the last name it was seen under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: PlayerId,

    /// Last known display name
    pub last_name: String,
}
