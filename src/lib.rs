//! # Squad Stats
//!
//! Player combat statistics service for Squad game servers.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (events, snapshots, identities)
//! - **store**: Event store boundary (typed queries, memory + JSONL backends)
//! - **aggregate**: Time-windowed statistics computation
//! - **resolver**: Chat-user to game-identity resolution (whitelister session)
//! - **gateway**: Command authorization, cooldowns and dispatch
//! - **digest**: Daily leaderboard scheduler
//! - **present**: Message formatting for chat surfaces
//! - **config**: Configuration loading and validation

pub mod aggregate;
pub mod config;
pub mod digest;
pub mod gateway;
pub mod models;
pub mod present;
pub mod resolver;
pub mod store;

pub use models::*;

use chrono::NaiveTime;

/// Parse a wall-clock time string (e.g., "10:00", "23:45") as a UTC time of day.
pub fn parse_clock_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}
