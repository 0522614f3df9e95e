//! Core data models for the stats service.

mod event;
mod ids;
mod snapshot;

pub use event::*;
pub use ids::*;
pub use snapshot::*;
