//! In-memory document store.
//!
//! Stands in for the host's document database. Spell lists and actors are
//! kept as loose JSON documents, the way the host stores them, and decoded on
//! every read so damaged documents surface the same way they would in a
//! live world.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use spellbook_domain::{
    Actor, ActorId, ClassSwapTracking, Pack, PackId, Spell, SpellId, SpellList, SpellListHeader,
    SpellListId, UsageEvent, UsageEventId, UserId, UserSpellData,
};
use tokio::sync::RwLock;

use crate::app::Repositories;
use crate::infrastructure::ports::{
    ActorRepo, PackRepo, RepoError, SettingsRepo, SpellListRepo, SpellRepo, UsageEventRepo,
    UserDataRepo,
};

/// Initial contents, usually loaded from a JSON file.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSeed {
    pub packs: Vec<Pack>,
    pub spells: Vec<Spell>,
    pub lists: Vec<Value>,
    pub actors: Vec<Value>,
}

impl StoreSeed {
    pub async fn load(path: &Path) -> Result<Self, RepoError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RepoError::database("seed", e))?;
        serde_json::from_str(&raw).map_err(RepoError::serialization)
    }
}

#[derive(Default)]
struct StoreState {
    packs: BTreeMap<PackId, Pack>,
    locked_packs: BTreeSet<PackId>,
    spells: BTreeMap<SpellId, Spell>,
    lists: BTreeMap<SpellListId, Value>,
    actors: BTreeMap<ActorId, Value>,
    usage: Vec<UsageEvent>,
    usage_ids: BTreeSet<UsageEventId>,
    user_data: BTreeMap<UserId, UserSpellData>,
}

impl StoreState {
    fn ensure_accessible(&self, pack: &PackId) -> Result<(), RepoError> {
        if self.locked_packs.contains(pack) {
            return Err(RepoError::database(
                "pack",
                format!("pack {} is not accessible", pack),
            ));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: StoreSeed) -> Result<Self, RepoError> {
        let mut state = StoreState::default();
        for pack in seed.packs {
            state.packs.insert(pack.id.clone(), pack);
        }
        for spell in seed.spells {
            state.spells.insert(spell.id.clone(), spell);
        }
        for doc in seed.lists {
            let id = SpellListId::new(document_id(&doc).unwrap_or_default())
                .map_err(|e| RepoError::corrupted("SpellList", "<seed>", e))?;
            state.lists.insert(id, doc);
        }
        for doc in seed.actors {
            let id = ActorId::new(document_id(&doc).unwrap_or_default())
                .map_err(|e| RepoError::corrupted("Actor", "<seed>", e))?;
            state.actors.insert(id, doc);
        }
        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Register a pack unless one with the same id exists.
    pub async fn ensure_pack(&self, pack: Pack) {
        self.state
            .write()
            .await
            .packs
            .entry(pack.id.clone())
            .or_insert(pack);
    }

    pub async fn put_spell(&self, spell: Spell) {
        self.state
            .write()
            .await
            .spells
            .insert(spell.id.clone(), spell);
    }

    /// Make a pack's documents unreadable and unwritable, as the host does
    /// for packs the current user cannot see.
    pub async fn set_pack_locked(&self, pack: &PackId, locked: bool) {
        let mut state = self.state.write().await;
        if locked {
            state.locked_packs.insert(pack.clone());
        } else {
            state.locked_packs.remove(pack);
        }
    }

    #[cfg(test)]
    pub async fn insert_raw_list(&self, id: SpellListId, doc: Value) {
        self.state.write().await.lists.insert(id, doc);
    }

    #[cfg(test)]
    pub async fn insert_raw_actor(&self, id: ActorId, doc: Value) {
        self.state.write().await.actors.insert(id, doc);
    }

    /// Wire this store into the engine's repository set.
    pub fn repositories(self: &Arc<Self>, settings: Arc<dyn SettingsRepo>) -> Repositories {
        Repositories {
            settings,
            actors: self.clone(),
            lists: self.clone(),
            spells: self.clone(),
            packs: self.clone(),
            usage: self.clone(),
            user_data: self.clone(),
        }
    }
}

fn document_id(doc: &Value) -> Option<String> {
    doc.get("id").and_then(Value::as_str).map(str::to_string)
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn decode_list(id: &SpellListId, raw: &Value) -> Result<SpellList, RepoError> {
    let mut doc = raw.clone();
    if let Some(fields) = doc.as_object_mut() {
        let found = fields.get("spells").filter(|v| !v.is_array()).map(describe);
        if let Some(found) = found {
            tracing::warn!(
                list_id = %id,
                found,
                "Spell list spells field is not a sequence, treating as empty"
            );
            fields.insert("spells".to_string(), Value::Array(Vec::new()));
        }
    }
    serde_json::from_value(doc).map_err(|e| RepoError::corrupted("SpellList", id, e))
}

/// Drop swap tracking entries that no longer parse.
fn scrub_swap_tracking(id: &ActorId, flags: &mut Map<String, Value>) {
    match flags.get("swapTracking") {
        None | Some(Value::Object(_)) => {}
        Some(_) => {
            tracing::warn!(actor_id = %id, "Swap tracking is not a map, resetting");
            flags.remove("swapTracking");
            return;
        }
    }
    let Some(Value::Object(entries)) = flags.get_mut("swapTracking") else {
        return;
    };
    entries.retain(|class, entry| {
        let ok = serde_json::from_value::<ClassSwapTracking>(entry.clone()).is_ok();
        if !ok {
            tracing::warn!(actor_id = %id, class = %class, "Malformed swap tracking, resetting");
        }
        ok
    });
}

fn decode_actor(id: &ActorId, raw: &Value) -> Result<Actor, RepoError> {
    let mut doc = raw.clone();
    if let Some(flags) = doc.get_mut("flags").and_then(Value::as_object_mut) {
        scrub_swap_tracking(id, flags);
    }
    serde_json::from_value(doc).map_err(|e| RepoError::corrupted("Actor", id, e))
}

fn raw_source_pack(doc: &Value) -> Option<&str> {
    doc.get("sourcePack").and_then(Value::as_str)
}

#[async_trait]
impl SpellListRepo for MemoryStore {
    async fn list_headers(&self, pack: &PackId) -> Result<Vec<SpellListHeader>, RepoError> {
        let state = self.state.read().await;
        if !state.packs.contains_key(pack) {
            return Err(RepoError::not_found("Pack", pack));
        }
        state.ensure_accessible(pack)?;

        let mut headers = Vec::new();
        for (id, doc) in &state.lists {
            if raw_source_pack(doc) != Some(pack.as_str()) {
                continue;
            }
            match decode_list(id, doc) {
                Ok(list) => headers.push(list.header()),
                Err(e) => tracing::warn!(
                    list_id = %id,
                    error = %e,
                    "Skipping unreadable spell list"
                ),
            }
        }
        Ok(headers)
    }

    async fn get(&self, id: &SpellListId) -> Result<Option<SpellList>, RepoError> {
        let state = self.state.read().await;
        let Some(doc) = state.lists.get(id) else {
            return Ok(None);
        };
        if let Some(pack) = raw_source_pack(doc).and_then(|p| PackId::new(p).ok()) {
            state.ensure_accessible(&pack)?;
        }
        decode_list(id, doc).map(Some)
    }

    async fn save(&self, list: &SpellList) -> Result<(), RepoError> {
        let doc = serde_json::to_value(list).map_err(RepoError::serialization)?;
        let mut state = self.state.write().await;
        state.ensure_accessible(list.source_pack())?;
        state.lists.insert(list.id().clone(), doc);
        Ok(())
    }

    async fn delete(&self, id: &SpellListId) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        let pack = state
            .lists
            .get(id)
            .ok_or_else(|| RepoError::not_found("SpellList", id))?
            .get("sourcePack")
            .and_then(Value::as_str)
            .and_then(|p| PackId::new(p).ok());
        if let Some(pack) = pack {
            state.ensure_accessible(&pack)?;
        }
        state.lists.remove(id);
        Ok(())
    }
}

#[async_trait]
impl ActorRepo for MemoryStore {
    async fn get(&self, id: &ActorId) -> Result<Option<Actor>, RepoError> {
        let state = self.state.read().await;
        match state.actors.get(id) {
            Some(doc) => decode_actor(id, doc).map(Some),
            None => Ok(None),
        }
    }

    async fn save(&self, actor: &Actor) -> Result<(), RepoError> {
        let doc = serde_json::to_value(actor).map_err(RepoError::serialization)?;
        self.state.write().await.actors.insert(actor.id.clone(), doc);
        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<ActorId>, RepoError> {
        Ok(self.state.read().await.actors.keys().cloned().collect())
    }

    async fn get_flag(&self, id: &ActorId, key: &str) -> Result<Option<Value>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .actors
            .get(id)
            .and_then(|doc| doc.get("flags"))
            .and_then(|flags| flags.get(key))
            .cloned())
    }
}

#[async_trait]
impl SpellRepo for MemoryStore {
    async fn get(&self, id: &SpellId) -> Result<Option<Spell>, RepoError> {
        Ok(self.state.read().await.spells.get(id).cloned())
    }
}

#[async_trait]
impl PackRepo for MemoryStore {
    async fn list(&self) -> Result<Vec<Pack>, RepoError> {
        Ok(self.state.read().await.packs.values().cloned().collect())
    }
}

#[async_trait]
impl UsageEventRepo for MemoryStore {
    async fn append(&self, event: &UsageEvent) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        if !state.usage_ids.insert(event.id) {
            return Ok(false);
        }
        state.usage.push(event.clone());
        Ok(true)
    }

    async fn list_for_user(&self, user: &UserId) -> Result<Vec<UsageEvent>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .usage
            .iter()
            .filter(|e| &e.user_id == user)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserDataRepo for MemoryStore {
    async fn get(&self, user: &UserId) -> Result<Option<UserSpellData>, RepoError> {
        Ok(self.state.read().await.user_data.get(user).cloned())
    }

    async fn save(&self, data: &UserSpellData) -> Result<(), RepoError> {
        self.state
            .write()
            .await
            .user_data
            .insert(data.user_id.clone(), data.clone());
        Ok(())
    }
}
