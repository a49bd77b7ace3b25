//! Spell usage analytics
//!
//! Events are append-only; the per-user aggregate counts each event once.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ActorId, SpellId, UsageEventId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CastContext {
    Combat,
    Exploration,
    #[default]
    Unknown,
}

/// One cast of a spell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEvent {
    pub id: UsageEventId,
    pub user_id: UserId,
    #[serde(default)]
    pub actor_id: Option<ActorId>,
    pub spell_id: SpellId,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub context: CastContext,
}

/// Per-spell counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageStats {
    pub count: u32,
    pub combat: u32,
    pub exploration: u32,
    pub last_used: Option<DateTime<Utc>>,
}

impl UsageStats {
    pub fn record(&mut self, context: CastContext, at: DateTime<Utc>) {
        self.count = self.count.saturating_add(1);
        match context {
            CastContext::Combat => self.combat = self.combat.saturating_add(1),
            CastContext::Exploration => self.exploration = self.exploration.saturating_add(1),
            CastContext::Unknown => {}
        }
        if self.last_used.map_or(true, |last| at > last) {
            self.last_used = Some(at);
        }
    }
}

/// Everything the module stores for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSpellData {
    pub user_id: UserId,
    #[serde(default)]
    pub favorites: BTreeSet<SpellId>,
    #[serde(default)]
    pub notes: BTreeMap<SpellId, String>,
    #[serde(default)]
    pub usage: BTreeMap<SpellId, UsageStats>,
}

impl UserSpellData {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            favorites: BTreeSet::new(),
            notes: BTreeMap::new(),
            usage: BTreeMap::new(),
        }
    }

    /// Flip a favorite. Returns the new state.
    pub fn toggle_favorite(&mut self, spell: SpellId) -> bool {
        if self.favorites.remove(&spell) {
            false
        } else {
            self.favorites.insert(spell);
            true
        }
    }

    /// Blank notes delete the entry.
    pub fn set_note(&mut self, spell: SpellId, note: &str) {
        let note = note.trim();
        if note.is_empty() {
            self.notes.remove(&spell);
        } else {
            self.notes.insert(spell, note.to_string());
        }
    }

    pub fn record_usage(&mut self, event: &UsageEvent) {
        self.usage
            .entry(event.spell_id.clone())
            .or_default()
            .record(event.context, event.timestamp);
    }

    /// Recompute every counter from the full event log.
    pub fn rebuild_usage<'a>(&mut self, events: impl IntoIterator<Item = &'a UsageEvent>) {
        self.usage.clear();
        for event in events {
            self.record_usage(event);
        }
    }

    /// Most-used spells, ties broken by id.
    pub fn most_used(&self, limit: usize) -> Vec<(&SpellId, &UsageStats)> {
        let mut entries: Vec<_> = self.usage.iter().collect();
        entries.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));
        entries.truncate(limit);
        entries
    }
}
