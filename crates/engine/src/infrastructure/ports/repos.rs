//! Repository port traits for document access.
//!
//! The host document store is the source of truth. Every write here is atomic
//! at document granularity and visible to the writer once it resolves.

use async_trait::async_trait;
use serde_json::Value;
use spellbook_domain::{
    Actor, ActorId, ModuleSettings, Pack, PackId, Spell, SpellId, SpellList, SpellListHeader,
    SpellListId, UsageEvent, UserId, UserSpellData,
};

use super::error::RepoError;

// =============================================================================
// Settings Storage
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettingsRepo: Send + Sync {
    async fn get(&self) -> Result<Option<ModuleSettings>, RepoError>;
    async fn save(&self, settings: &ModuleSettings) -> Result<(), RepoError>;
}

// =============================================================================
// Document Ports (one per document type)
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActorRepo: Send + Sync {
    /// Malformed swap tracking is reset on read; other damage is `Corrupted`.
    async fn get(&self, id: &ActorId) -> Result<Option<Actor>, RepoError>;
    async fn save(&self, actor: &Actor) -> Result<(), RepoError>;
    async fn list_ids(&self) -> Result<Vec<ActorId>, RepoError>;
    /// One module flag exactly as stored, before any normalization.
    async fn get_flag(&self, id: &ActorId, key: &str) -> Result<Option<Value>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpellListRepo: Send + Sync {
    /// Pack index. Fails when the pack is missing or not accessible;
    /// unreadable entries are skipped.
    async fn list_headers(&self, pack: &PackId) -> Result<Vec<SpellListHeader>, RepoError>;
    /// A `spells` field that is not a sequence reads as empty.
    async fn get(&self, id: &SpellListId) -> Result<Option<SpellList>, RepoError>;
    async fn save(&self, list: &SpellList) -> Result<(), RepoError>;
    async fn delete(&self, id: &SpellListId) -> Result<(), RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpellRepo: Send + Sync {
    async fn get(&self, id: &SpellId) -> Result<Option<Spell>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackRepo: Send + Sync {
    /// All packs with folder metadata, in no particular order.
    async fn list(&self) -> Result<Vec<Pack>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsageEventRepo: Send + Sync {
    /// Append an event. Returns `false` when an event with the same id exists.
    async fn append(&self, event: &UsageEvent) -> Result<bool, RepoError>;
    async fn list_for_user(&self, user: &UserId) -> Result<Vec<UsageEvent>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDataRepo: Send + Sync {
    async fn get(&self, user: &UserId) -> Result<Option<UserSpellData>, RepoError>;
    async fn save(&self, data: &UserSpellData) -> Result<(), RepoError>;
}
