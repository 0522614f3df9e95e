//! JSONL export loader.
//!
//! Hydrates a `MemoryStore` from a logger export directory. Each file is
//! JSON Lines, one record per line. Missing files are treated as empty
//! tables; unparseable lines are skipped with a warning so one bad row
//! never blocks a whole import.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::models::{DeathEvent, PlayerRecord, ReviveEvent, WoundEvent};

use super::{MemoryStore, StoreError};

/// Tables in a logger export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportTable {
    Player,
    Wound,
    Death,
    Revive,
}

impl ExportTable {
    /// Filename for this table within an export directory.
    pub fn filename(&self) -> &'static str {
        match self {
            ExportTable::Player => "players.jsonl",
            ExportTable::Wound => "wounds.jsonl",
            ExportTable::Death => "deaths.jsonl",
            ExportTable::Revive => "revives.jsonl",
        }
    }
}

/// Read one JSONL file, skipping unparseable lines.
fn read_table<T: DeserializeOwned>(dir: &Path, table: ExportTable) -> Result<Vec<T>, StoreError> {
    let path = dir.join(table.filename());
    if !path.exists() {
        debug!("No {} in export, treating as empty", table.filename());
        return Ok(Vec::new());
    }

    let file = File::open(&path)?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(
                    "Skipping bad line {} in {}: {}",
                    line_no + 1,
                    table.filename(),
                    e
                );
            }
        }
    }

    Ok(records)
}

/// Load a full export directory into a fresh in-memory store.
pub fn load_export(dir: &Path) -> Result<MemoryStore, StoreError> {
    let store = MemoryStore::new();

    for player in read_table::<PlayerRecord>(dir, ExportTable::Player)? {
        store.upsert_player(player);
    }
    for wound in read_table::<WoundEvent>(dir, ExportTable::Wound)? {
        store.record_wound(wound);
    }
    for death in read_table::<DeathEvent>(dir, ExportTable::Death)? {
        store.record_death(death);
    }
    for revive in read_table::<ReviveEvent>(dir, ExportTable::Revive)? {
        store.record_revive(revive);
    }

    info!(
        "Loaded export from {:?}: {} events",
        dir,
        store.event_count()
    );
    Ok(store)
}
