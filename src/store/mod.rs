//! Event store boundary.
//!
//! The game-server logger owns the wound/death/revive tables; this crate
//! only reads them. `EventStore` is the narrow query interface the
//! aggregator needs: filtered counts plus group-by-top-1 lookups. Each
//! filter is a typed query spec rather than an ad-hoc condition bag.
//!
//! Backends:
//! - `memory`: Vec-backed store for tests and the CLI
//! - `jsonl`: read-only loader that hydrates a memory store from a
//!   logger export directory

pub mod jsonl;
pub mod memory;

pub use jsonl::load_export;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{PlayerId, PlayerRecord};

/// Errors that can occur talking to an event store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Teamkill filter applied to wound/death queries.
///
/// Death rows carry a nullable teamkill flag; None means the cause was
/// never resolved and the row is excluded from every tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamkillFilter {
    /// Only non-teamkill rows ("real" kills/wounds)
    Real,
    /// Only teamkill rows
    Teamkill,
    /// Any row with a resolved flag, teamkills included
    Resolved,
}

impl TeamkillFilter {
    /// Whether a row's flag passes this filter.
    pub fn matches(self, flag: Option<bool>) -> bool {
        match self {
            TeamkillFilter::Real => flag == Some(false),
            TeamkillFilter::Teamkill => flag == Some(true),
            TeamkillFilter::Resolved => flag.is_some(),
        }
    }
}

/// Filter over wound rows.
#[derive(Debug, Clone)]
pub struct WoundQuery {
    pub since: DateTime<Utc>,
    pub attacker: Option<PlayerId>,
    pub teamkill: TeamkillFilter,
}

impl WoundQuery {
    /// All real (non-teamkill) wounds since the cutoff.
    pub fn since(cutoff: DateTime<Utc>) -> Self {
        Self {
            since: cutoff,
            attacker: None,
            teamkill: TeamkillFilter::Real,
        }
    }

    /// Restrict to wounds inflicted by one player.
    pub fn by(mut self, attacker: PlayerId) -> Self {
        self.attacker = Some(attacker);
        self
    }

    pub fn with_teamkill(mut self, filter: TeamkillFilter) -> Self {
        self.teamkill = filter;
        self
    }
}

/// Filter over death rows.
#[derive(Debug, Clone)]
pub struct DeathQuery {
    pub since: DateTime<Utc>,
    pub attacker: Option<PlayerId>,
    pub victim: Option<PlayerId>,
    /// Drop rows where the victim is this player (self-kill exclusion)
    pub excluding_victim: Option<PlayerId>,
    /// Drop rows where the attacker is this player
    pub excluding_attacker: Option<PlayerId>,
    pub teamkill: TeamkillFilter,
}

impl DeathQuery {
    /// All real (non-teamkill) deaths since the cutoff.
    pub fn since(cutoff: DateTime<Utc>) -> Self {
        Self {
            since: cutoff,
            attacker: None,
            victim: None,
            excluding_victim: None,
            excluding_attacker: None,
            teamkill: TeamkillFilter::Real,
        }
    }

    /// Restrict to deaths caused by one player.
    pub fn by(mut self, attacker: PlayerId) -> Self {
        self.attacker = Some(attacker);
        self
    }

    /// Restrict to deaths of one player.
    pub fn of(mut self, victim: PlayerId) -> Self {
        self.victim = Some(victim);
        self
    }

    pub fn excluding_victim(mut self, victim: PlayerId) -> Self {
        self.excluding_victim = Some(victim);
        self
    }

    pub fn excluding_attacker(mut self, attacker: PlayerId) -> Self {
        self.excluding_attacker = Some(attacker);
        self
    }

    pub fn with_teamkill(mut self, filter: TeamkillFilter) -> Self {
        self.teamkill = filter;
        self
    }
}

/// Filter over revive rows.
#[derive(Debug, Clone)]
pub struct ReviveQuery {
    pub since: DateTime<Utc>,
    pub reviver: Option<PlayerId>,
}

impl ReviveQuery {
    /// All revives since the cutoff.
    pub fn since(cutoff: DateTime<Utc>) -> Self {
        Self {
            since: cutoff,
            reviver: None,
        }
    }

    /// Restrict to revives performed by one player.
    pub fn by(mut self, reviver: PlayerId) -> Self {
        self.reviver = Some(reviver);
        self
    }
}

/// A weapon with its wound count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeaponTally {
    pub weapon: String,
    pub count: u64,
}

/// A player with a death-row count attributed to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerTally {
    pub player: PlayerId,
    /// Last known display name from the roster, or the raw id if unknown
    pub name: String,
    pub count: u64,
}

/// Read-only query interface over the combat event tables.
///
/// Group-by-top-1 results break count ties by the store's own iteration
/// order; callers must not rely on which side of a tie wins.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Count wound rows matching the filter.
    async fn count_wounds(&self, query: &WoundQuery) -> Result<u64, StoreError>;

    /// Count death rows matching the filter.
    async fn count_deaths(&self, query: &DeathQuery) -> Result<u64, StoreError>;

    /// Count revive rows matching the filter.
    async fn count_revives(&self, query: &ReviveQuery) -> Result<u64, StoreError>;

    /// Weapon with the most matching wound rows, if any.
    async fn top_weapon(&self, query: &WoundQuery) -> Result<Option<WeaponTally>, StoreError>;

    /// Attacker with the most matching death rows, if any.
    /// Rows with no attacker are skipped.
    async fn top_attacker(&self, query: &DeathQuery) -> Result<Option<PlayerTally>, StoreError>;

    /// Victim with the most matching death rows, if any.
    /// Rows with no victim are skipped.
    async fn top_victim(&self, query: &DeathQuery) -> Result<Option<PlayerTally>, StoreError>;

    /// Roster lookup by stable identity.
    async fn find_player(&self, id: PlayerId) -> Result<Option<PlayerRecord>, StoreError>;
}
