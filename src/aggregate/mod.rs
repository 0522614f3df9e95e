//! Time-windowed statistics computation.
//!
//! Turns raw wound/death/revive rows into per-player and server-wide
//! snapshots over a trailing window. Pure read/compute: the sub-queries
//! of one snapshot run concurrently and all complete before assembly,
//! so the response is atomic from the caller's side.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::debug;

use crate::models::{
    kd_ratio, OpponentTally, PlayerId, PlayerStatsSnapshot, ServerStatsSnapshot, ServerTotals,
};
use crate::store::{
    DeathQuery, EventStore, PlayerTally, ReviveQuery, StoreError, TeamkillFilter, WoundQuery,
};

/// Errors from snapshot computation.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("query window must be at least 1 day, got {0}")]
    WindowTooShort(u32),

    #[error("no stats recorded for player {0}")]
    IdentityNotFound(PlayerId),

    #[error("no qualifying events in the last {0} day(s)")]
    NoDataInWindow(u32),

    #[error("event store error: {0}")]
    Store(#[from] StoreError),
}

/// Computes statistics snapshots against an event store.
pub struct StatsAggregator<S> {
    store: Arc<S>,
}

impl<S> Clone for StatsAggregator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: EventStore> StatsAggregator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn cutoff(window_days: u32) -> Result<DateTime<Utc>, AggregateError> {
        if window_days < 1 {
            return Err(AggregateError::WindowTooShort(window_days));
        }
        Ok(Utc::now() - Duration::days(i64::from(window_days)))
    }

    /// Compute a snapshot for one player.
    ///
    /// An identity with no roster record is an error; a known identity
    /// with no events in the window yields a valid all-zero snapshot.
    pub async fn player_stats(
        &self,
        player: PlayerId,
        window_days: u32,
    ) -> Result<PlayerStatsSnapshot, AggregateError> {
        let since = Self::cutoff(window_days)?;

        let record = self
            .store
            .find_player(player)
            .await?
            .ok_or(AggregateError::IdentityNotFound(player))?;

        debug!("Computing {}-day stats for {}", window_days, player);
        self.scoped_stats(player, record.last_name, window_days, since)
            .await
    }

    /// Compute the server-wide snapshot: the window's top killer in
    /// full, plus unfiltered totals.
    pub async fn server_stats(
        &self,
        window_days: u32,
    ) -> Result<ServerStatsSnapshot, AggregateError> {
        let since = Self::cutoff(window_days)?;

        let leader: PlayerTally = self
            .store
            .top_attacker(&DeathQuery::since(since))
            .await?
            .ok_or(AggregateError::NoDataInWindow(window_days))?;

        debug!(
            "Top killer for last {} day(s): {} ({} kills)",
            window_days, leader.name, leader.count
        );

        let top_player = self
            .scoped_stats(leader.player, leader.name, window_days, since)
            .await?;

        let kills_q = DeathQuery::since(since);
        let deaths_q = DeathQuery::since(since).with_teamkill(TeamkillFilter::Resolved);
        let wounds_q = WoundQuery::since(since);
        let revives_q = ReviveQuery::since(since);

        let (kills, wounds, deaths, revives, weapon) = tokio::join!(
            self.store.count_deaths(&kills_q),
            self.store.count_wounds(&wounds_q),
            self.store.count_deaths(&deaths_q),
            self.store.count_revives(&revives_q),
            self.store.top_weapon(&wounds_q),
        );

        Ok(ServerStatsSnapshot {
            window_days,
            top_player,
            totals: ServerTotals {
                kills: kills?,
                wounds: wounds?,
                deaths: deaths?,
                revives: revives?,
                favorite_weapon: weapon?.map(|t| t.weapon),
            },
        })
    }

    /// Per-player metrics with a pre-resolved display name. Shared by
    /// the personal path and the server-wide top-player path.
    async fn scoped_stats(
        &self,
        player: PlayerId,
        name: String,
        window_days: u32,
        since: DateTime<Utc>,
    ) -> Result<PlayerStatsSnapshot, AggregateError> {
        let kills_q = DeathQuery::since(since).by(player);
        let deaths_q = DeathQuery::since(since)
            .of(player)
            .with_teamkill(TeamkillFilter::Resolved);
        let teamkilled_q = DeathQuery::since(since)
            .of(player)
            .with_teamkill(TeamkillFilter::Teamkill);
        let wounds_q = WoundQuery::since(since).by(player);
        let revives_q = ReviveQuery::since(since).by(player);
        let victim_q = DeathQuery::since(since).by(player).excluding_victim(player);
        let nemesis_q = DeathQuery::since(since)
            .of(player)
            .excluding_attacker(player);

        let (kills, deaths, wounds, teamkilled, revives, weapon, top_victim, top_nemesis) = tokio::join!(
            self.store.count_deaths(&kills_q),
            self.store.count_deaths(&deaths_q),
            self.store.count_wounds(&wounds_q),
            self.store.count_deaths(&teamkilled_q),
            self.store.count_revives(&revives_q),
            self.store.top_weapon(&wounds_q),
            self.store.top_victim(&victim_q),
            self.store.top_attacker(&nemesis_q),
        );

        let kills = kills?;
        let deaths = deaths?;

        Ok(PlayerStatsSnapshot {
            player,
            name,
            window_days,
            kills,
            deaths,
            wounds: wounds?,
            revives_given: revives?,
            times_teamkilled: teamkilled?,
            kd_ratio: kd_ratio(kills, deaths),
            favorite_weapon: weapon?.map(|t| t.weapon),
            top_victim: top_victim?.map(tally_to_opponent),
            top_nemesis: top_nemesis?.map(tally_to_opponent),
        })
    }
}

fn tally_to_opponent(tally: PlayerTally) -> OpponentTally {
    OpponentTally {
        player: tally.player,
        name: tally.name,
        count: tally.count,
    }
}
