//! In-memory event store.
//!
//! Backs tests and the CLI. Rows live in insertion order, so group-top
//! ties resolve to whichever group appeared first — the same "store
//! decides" nondeterminism the SQL backend exhibits.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::models::{DeathEvent, PlayerId, PlayerRecord, ReviveEvent, WoundEvent};

use super::{
    DeathQuery, EventStore, PlayerTally, ReviveQuery, StoreError, WeaponTally, WoundQuery,
};

#[derive(Default)]
struct Inner {
    players: HashMap<PlayerId, PlayerRecord>,
    wounds: Vec<WoundEvent>,
    deaths: Vec<DeathEvent>,
    revives: Vec<ReviveEvent>,
}

/// Vec-backed event store guarded by a single `RwLock`.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update a roster entry, refreshing the last known name.
    pub fn upsert_player(&self, record: PlayerRecord) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.players.insert(record.id, record);
    }

    pub fn record_wound(&self, event: WoundEvent) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.wounds.push(event);
    }

    pub fn record_death(&self, event: DeathEvent) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.deaths.push(event);
    }

    pub fn record_revive(&self, event: ReviveEvent) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.revives.push(event);
    }

    /// Total rows across the three event tables.
    pub fn event_count(&self) -> usize {
        let inner = self.inner.read().expect("store lock poisoned");
        inner.wounds.len() + inner.deaths.len() + inner.revives.len()
    }
}

fn wound_matches(event: &WoundEvent, query: &WoundQuery) -> bool {
    if event.time < query.since {
        return false;
    }
    if let Some(attacker) = query.attacker {
        if event.attacker != Some(attacker) {
            return false;
        }
    }
    query.teamkill.matches(Some(event.teamkill))
}

fn death_matches(event: &DeathEvent, query: &DeathQuery) -> bool {
    if event.time < query.since {
        return false;
    }
    if let Some(attacker) = query.attacker {
        if event.attacker != Some(attacker) {
            return false;
        }
    }
    if let Some(victim) = query.victim {
        if event.victim != Some(victim) {
            return false;
        }
    }
    if let Some(excluded) = query.excluding_victim {
        if event.victim == Some(excluded) {
            return false;
        }
    }
    if let Some(excluded) = query.excluding_attacker {
        if event.attacker == Some(excluded) {
            return false;
        }
    }
    query.teamkill.matches(event.teamkill)
}

fn revive_matches(event: &ReviveEvent, query: &ReviveQuery) -> bool {
    if event.time < query.since {
        return false;
    }
    if let Some(reviver) = query.reviver {
        if event.reviver != Some(reviver) {
            return false;
        }
    }
    true
}

/// Tally keys in first-seen order and return the group with the highest
/// count. Ties keep the earlier group.
fn group_top<K: PartialEq + Clone>(keys: impl Iterator<Item = K>) -> Option<(K, u64)> {
    let mut groups: Vec<(K, u64)> = Vec::new();
    for key in keys {
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, count)) => *count += 1,
            None => groups.push((key, 1)),
        }
    }

    let mut best: Option<(K, u64)> = None;
    for (key, count) in groups {
        match &best {
            Some((_, best_count)) if count <= *best_count => {}
            _ => best = Some((key, count)),
        }
    }
    best
}

impl Inner {
    fn display_name(&self, id: PlayerId) -> String {
        self.players
            .get(&id)
            .map(|p| p.last_name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn count_wounds(&self, query: &WoundQuery) -> Result<u64, StoreError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.wounds.iter().filter(|w| wound_matches(w, query)).count() as u64)
    }

    async fn count_deaths(&self, query: &DeathQuery) -> Result<u64, StoreError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.deaths.iter().filter(|d| death_matches(d, query)).count() as u64)
    }

    async fn count_revives(&self, query: &ReviveQuery) -> Result<u64, StoreError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .revives
            .iter()
            .filter(|r| revive_matches(r, query))
            .count() as u64)
    }

    async fn top_weapon(&self, query: &WoundQuery) -> Result<Option<WeaponTally>, StoreError> {
        let inner = self.inner.read().expect("store lock poisoned");
        let top = group_top(
            inner
                .wounds
                .iter()
                .filter(|w| wound_matches(w, query))
                .map(|w| w.weapon.clone()),
        );
        Ok(top.map(|(weapon, count)| WeaponTally { weapon, count }))
    }

    async fn top_attacker(&self, query: &DeathQuery) -> Result<Option<PlayerTally>, StoreError> {
        let inner = self.inner.read().expect("store lock poisoned");
        let top = group_top(
            inner
                .deaths
                .iter()
                .filter(|d| death_matches(d, query))
                .filter_map(|d| d.attacker),
        );
        Ok(top.map(|(player, count)| PlayerTally {
            player,
            name: inner.display_name(player),
            count,
        }))
    }

    async fn top_victim(&self, query: &DeathQuery) -> Result<Option<PlayerTally>, StoreError> {
        let inner = self.inner.read().expect("store lock poisoned");
        let top = group_top(
            inner
                .deaths
                .iter()
                .filter(|d| death_matches(d, query))
                .filter_map(|d| d.victim),
        );
        Ok(top.map(|(player, count)| PlayerTally {
            player,
            name: inner.display_name(player),
            count,
        }))
    }

    async fn find_player(&self, id: PlayerId) -> Result<Option<PlayerRecord>, StoreError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.players.get(&id).cloned())
    }
}
