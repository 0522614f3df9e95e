//! Message formatting for chat surfaces.
//!
//! Renders snapshots into a structured embed (external chat) or plain
//! text (in-game). Field order is fixed; it is part of the contract
//! with the community, not negotiable per call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{PlayerStatsSnapshot, ServerStatsSnapshot};

/// Errors from posting a message to a chat surface.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("message channel unavailable: {0}")]
    Unavailable(String),
}

/// Destination for rendered messages (chat channel, stdout, test buffer).
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn post(&self, message: &MessageEmbed) -> Result<(), SinkError>;
}

/// One name/value pair in an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    fn new(name: &str, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            inline,
        }
    }
}

/// A structured chat message: title, color, ordered fields, timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEmbed {
    pub title: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub timestamp: DateTime<Utc>,
}

/// Turn a raw weapon identifier into a display name: strip the `BP_`
/// prefix and replace underscores with spaces.
pub fn prettify_weapon(raw: &str) -> String {
    let trimmed = raw.strip_prefix("BP_").unwrap_or(raw);
    trimmed.replace('_', " ")
}

fn weapon_display(weapon: &Option<String>) -> String {
    match weapon {
        Some(w) => prettify_weapon(w),
        None => "N/A".to_string(),
    }
}

fn kd_display(snapshot: &PlayerStatsSnapshot) -> String {
    if snapshot.deaths == 0 {
        "0".to_string()
    } else {
        format!("{:.2}", snapshot.kd_ratio)
    }
}

fn title(window_days: u32) -> String {
    format!("Squad Server Stats for the Last {} Days", window_days)
}

/// Personal stats embed for the external chat channel.
///
/// The opponent fields are always present; with no opponent in the
/// window they render an empty name and a zero count.
pub fn personal_embed(snapshot: &PlayerStatsSnapshot, color: u32) -> MessageEmbed {
    let (victim_name, victim_count) = match &snapshot.top_victim {
        Some(victim) => (victim.name.as_str(), victim.count),
        None => ("", 0),
    };
    let (nemesis_name, nemesis_count) = match &snapshot.top_nemesis {
        Some(nemesis) => (nemesis.name.as_str(), nemesis.count),
        None => ("", 0),
    };

    let fields = vec![
        EmbedField::new("Found in Game Name", snapshot.name.clone(), false),
        EmbedField::new("SteamID", snapshot.player.to_string(), true),
        EmbedField::new("Total Kills", snapshot.kills.to_string(), true),
        EmbedField::new("Total Wounds", snapshot.wounds.to_string(), true),
        EmbedField::new("Total Deaths", snapshot.deaths.to_string(), true),
        EmbedField::new("K/D Ratio", kd_display(snapshot), true),
        EmbedField::new(
            "Times Teamkilled",
            snapshot.times_teamkilled.to_string(),
            true,
        ),
        EmbedField::new("Total Revives", snapshot.revives_given.to_string(), true),
        EmbedField::new(
            "Favorite Weapon",
            weapon_display(&snapshot.favorite_weapon),
            true,
        ),
        EmbedField::new(
            "Top Victim",
            format!(
                "`{}` has Killed `{}` `{}` Times!",
                snapshot.name, victim_name, victim_count
            ),
            true,
        ),
        EmbedField::new(
            "Top Nemesis",
            format!(
                "`{}` has Killed `{}` `{}` Times!",
                nemesis_name, snapshot.name, nemesis_count
            ),
            true,
        ),
    ];

    MessageEmbed {
        title: title(snapshot.window_days),
        color,
        fields,
        timestamp: Utc::now(),
    }
}

/// Daily digest embed: top player first, then server totals.
pub fn daily_embed(snapshot: &ServerStatsSnapshot, color: u32) -> MessageEmbed {
    let top = &snapshot.top_player;
    let fields = vec![
        EmbedField::new("Top Player", top.name.clone(), false),
        EmbedField::new("SteamID", top.player.to_string(), true),
        EmbedField::new("Total Kills", top.kills.to_string(), true),
        EmbedField::new("Total Wounds", top.wounds.to_string(), true),
        EmbedField::new("Total Deaths", top.deaths.to_string(), true),
        EmbedField::new("K/D Ratio", kd_display(top), true),
        EmbedField::new("Times Teamkilled", top.times_teamkilled.to_string(), true),
        EmbedField::new("Total Revives", top.revives_given.to_string(), true),
        EmbedField::new(
            "Favorite Weapon",
            weapon_display(&top.favorite_weapon),
            true,
        ),
        EmbedField::new(
            "Server Total Kills",
            snapshot.totals.kills.to_string(),
            false,
        ),
        EmbedField::new(
            "Server Total Wounds",
            snapshot.totals.wounds.to_string(),
            true,
        ),
        EmbedField::new(
            "Server Total Deaths",
            snapshot.totals.deaths.to_string(),
            true,
        ),
        EmbedField::new(
            "Server Total Revives",
            snapshot.totals.revives.to_string(),
            true,
        ),
        EmbedField::new(
            "Server Favorite Weapon",
            weapon_display(&snapshot.totals.favorite_weapon),
            true,
        ),
    ];

    MessageEmbed {
        title: title(snapshot.window_days),
        color,
        fields,
        timestamp: Utc::now(),
    }
}

/// Plain-text rendering for the in-game warn channel.
pub fn ingame_text(snapshot: &PlayerStatsSnapshot) -> String {
    format!(
        "Your Stats\nWounds: {}\nKills: {}\nDeaths: {}\nK/D: {}\nRevives: {}",
        snapshot.wounds,
        snapshot.kills,
        snapshot.deaths,
        kd_display(snapshot),
        snapshot.revives_given
    )
}
