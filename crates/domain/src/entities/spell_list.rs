//! Spell list entity
//!
//! # Invariants
//!
//! - `Standard` lists are read-only: their owning pack is the source of truth.
//! - `Duplicate` lists always name the original they were copied from.
//! - `Merged` lists are built from at least two sources; their spells are a
//!   snapshot taken at merge time, not a live view.
//! - `ActorOwned` lists carry a personal spellbook and are never hideable.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::{ActorId, PackId, SpellId, SpellListId};
use crate::value_objects::{ClassIdentifier, ListName};

/// Minimum number of sources for a merged list.
pub const MIN_MERGE_SOURCES: usize = 2;

// ============================================================================
// Kind
// ============================================================================

/// What a list is, with only the fields each variant permits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SpellListKind {
    Standard,
    Custom,
    #[serde(rename_all = "camelCase")]
    Duplicate {
        original_id: SpellListId,
        /// Mod-time of the original when last copied or restored.
        #[serde(default)]
        original_modified_at: Option<DateTime<Utc>>,
        #[serde(default)]
        original_version: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    Merged { source_ids: Vec<SpellListId> },
    #[serde(rename_all = "camelCase")]
    ActorOwned { actor_id: ActorId },
}

/// Fieldless mirror of [`SpellListKind`] for views and filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpellListKindTag {
    Standard,
    Custom,
    Duplicate,
    Merged,
    ActorOwned,
}

/// Folder inside the module pack where a list lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListFolder {
    Custom,
    Merged,
    Modified,
    ActorSpellbooks,
}

impl ListFolder {
    pub fn name(&self) -> &'static str {
        match self {
            ListFolder::Custom => "Custom Spell Lists",
            ListFolder::Merged => "Merged Spell Lists",
            ListFolder::Modified => "Modified Spell Lists",
            ListFolder::ActorSpellbooks => "Actor Spellbooks",
        }
    }
}

impl SpellListKind {
    pub fn tag(&self) -> SpellListKindTag {
        match self {
            SpellListKind::Standard => SpellListKindTag::Standard,
            SpellListKind::Custom => SpellListKindTag::Custom,
            SpellListKind::Duplicate { .. } => SpellListKindTag::Duplicate,
            SpellListKind::Merged { .. } => SpellListKindTag::Merged,
            SpellListKind::ActorOwned { .. } => SpellListKindTag::ActorOwned,
        }
    }

    /// Module-pack folder; `None` for standard lists, which live in their own packs.
    pub fn folder(&self) -> Option<ListFolder> {
        match self {
            SpellListKind::Standard => None,
            SpellListKind::Custom => Some(ListFolder::Custom),
            SpellListKind::Duplicate { .. } => Some(ListFolder::Modified),
            SpellListKind::Merged { .. } => Some(ListFolder::Merged),
            SpellListKind::ActorOwned { .. } => Some(ListFolder::ActorSpellbooks),
        }
    }
}

// ============================================================================
// Edits
// ============================================================================

/// Set difference of a list against a reference list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellListDiff {
    pub added: BTreeSet<SpellId>,
    pub removed: BTreeSet<SpellId>,
}

impl SpellListDiff {
    pub fn between(reference: &BTreeSet<SpellId>, current: &BTreeSet<SpellId>) -> Self {
        Self {
            added: current.difference(reference).cloned().collect(),
            removed: reference.difference(current).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// A batch of additions and removals applied atomically. Removals run first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkEdit {
    #[serde(default)]
    pub add: BTreeSet<SpellId>,
    #[serde(default)]
    pub remove: BTreeSet<SpellId>,
}

impl BulkEdit {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

// ============================================================================
// Entity
// ============================================================================

/// A spell list document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellList {
    id: SpellListId,
    name: ListName,
    identifier: ClassIdentifier,
    source_pack: PackId,
    kind: SpellListKind,
    #[serde(default)]
    spells: BTreeSet<SpellId>,
    #[serde(default)]
    is_subclass: bool,
    modified_at: DateTime<Utc>,
    #[serde(default)]
    version: u64,
}

impl SpellList {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// A read-only list owned by a content pack.
    pub fn standard(
        id: SpellListId,
        name: ListName,
        identifier: ClassIdentifier,
        source_pack: PackId,
        spells: BTreeSet<SpellId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            identifier,
            source_pack,
            kind: SpellListKind::Standard,
            spells,
            is_subclass: false,
            modified_at: now,
            version: 1,
        }
    }

    /// A new, empty, user-authored list.
    pub fn custom(
        id: SpellListId,
        name: ListName,
        identifier: ClassIdentifier,
        module_pack: PackId,
        is_subclass: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            identifier,
            source_pack: module_pack,
            kind: SpellListKind::Custom,
            spells: BTreeSet::new(),
            is_subclass,
            modified_at: now,
            version: 1,
        }
    }

    /// An editable copy of `original`.
    pub fn duplicate_of(
        original: &SpellList,
        id: SpellListId,
        name: ListName,
        module_pack: PackId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            identifier: original.identifier.clone(),
            source_pack: module_pack,
            kind: SpellListKind::Duplicate {
                original_id: original.id.clone(),
                original_modified_at: Some(original.modified_at),
                original_version: Some(original.version),
            },
            spells: original.spells.clone(),
            is_subclass: original.is_subclass,
            modified_at: now,
            version: 1,
        }
    }

    /// Union snapshot of `sources`.
    ///
    /// # Errors
    ///
    /// `Validation` when fewer than two distinct sources are given.
    pub fn merged(
        id: SpellListId,
        name: ListName,
        identifier: ClassIdentifier,
        module_pack: PackId,
        sources: &[&SpellList],
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let mut source_ids: Vec<SpellListId> = Vec::with_capacity(sources.len());
        for source in sources {
            if !source_ids.contains(&source.id) {
                source_ids.push(source.id.clone());
            }
        }
        if source_ids.len() < MIN_MERGE_SOURCES {
            return Err(DomainError::validation(format!(
                "A merged list needs at least {} distinct sources",
                MIN_MERGE_SOURCES
            )));
        }
        let spells = sources
            .iter()
            .flat_map(|s| s.spells.iter().cloned())
            .collect();
        let is_subclass = sources.iter().all(|s| s.is_subclass);
        Ok(Self {
            id,
            name,
            identifier,
            source_pack: module_pack,
            kind: SpellListKind::Merged { source_ids },
            spells,
            is_subclass,
            modified_at: now,
            version: 1,
        })
    }

    /// A personal spellbook for one of an actor's classes.
    pub fn actor_owned(
        id: SpellListId,
        name: ListName,
        identifier: ClassIdentifier,
        module_pack: PackId,
        actor_id: ActorId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            identifier,
            source_pack: module_pack,
            kind: SpellListKind::ActorOwned { actor_id },
            spells: BTreeSet::new(),
            is_subclass: false,
            modified_at: now,
            version: 1,
        }
    }

    pub fn with_spells(mut self, spells: impl IntoIterator<Item = SpellId>) -> Self {
        self.spells = spells.into_iter().collect();
        self
    }

    pub fn with_subclass(mut self, is_subclass: bool) -> Self {
        self.is_subclass = is_subclass;
        self
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> &SpellListId {
        &self.id
    }

    pub fn name(&self) -> &ListName {
        &self.name
    }

    pub fn identifier(&self) -> &ClassIdentifier {
        &self.identifier
    }

    pub fn source_pack(&self) -> &PackId {
        &self.source_pack
    }

    pub fn kind(&self) -> &SpellListKind {
        &self.kind
    }

    pub fn kind_tag(&self) -> SpellListKindTag {
        self.kind.tag()
    }

    pub fn spells(&self) -> &BTreeSet<SpellId> {
        &self.spells
    }

    pub fn contains(&self, spell: &SpellId) -> bool {
        self.spells.contains(spell)
    }

    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }

    pub fn is_subclass(&self) -> bool {
        self.is_subclass
    }

    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Original this list was duplicated from.
    pub fn original_id(&self) -> Option<&SpellListId> {
        match &self.kind {
            SpellListKind::Duplicate { original_id, .. } => Some(original_id),
            _ => None,
        }
    }

    pub fn source_ids(&self) -> &[SpellListId] {
        match &self.kind {
            SpellListKind::Merged { source_ids } => source_ids,
            _ => &[],
        }
    }

    pub fn owner(&self) -> Option<&ActorId> {
        match &self.kind {
            SpellListKind::ActorOwned { actor_id } => Some(actor_id),
            _ => None,
        }
    }

    pub fn is_standard(&self) -> bool {
        matches!(self.kind, SpellListKind::Standard)
    }

    pub fn is_actor_owned(&self) -> bool {
        matches!(self.kind, SpellListKind::ActorOwned { .. })
    }

    /// Lists authored inside the module pack (custom, duplicate, merged).
    pub fn is_module_authored(&self) -> bool {
        matches!(
            self.kind,
            SpellListKind::Custom | SpellListKind::Duplicate { .. } | SpellListKind::Merged { .. }
        )
    }

    pub fn can_rename(&self) -> bool {
        self.is_module_authored()
    }

    pub fn can_delete(&self) -> bool {
        !self.is_standard()
    }

    pub fn can_hide(&self) -> bool {
        !self.is_actor_owned()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    fn ensure_mutable(&self) -> Result<(), DomainError> {
        if self.is_standard() {
            return Err(DomainError::constraint(format!(
                "Spell list '{}' is a standard list and cannot be edited",
                self.name
            )));
        }
        Ok(())
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.modified_at = now;
        self.version += 1;
    }

    /// Add a spell. Returns `false` when it was already present.
    pub fn add_spell(&mut self, spell: SpellId, now: DateTime<Utc>) -> Result<bool, DomainError> {
        self.ensure_mutable()?;
        if !self.spells.insert(spell) {
            return Ok(false);
        }
        self.touch(now);
        Ok(true)
    }

    /// Remove a spell. Returns `false` when it was absent.
    pub fn remove_spell(
        &mut self,
        spell: &SpellId,
        now: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        self.ensure_mutable()?;
        if !self.spells.remove(spell) {
            return Ok(false);
        }
        self.touch(now);
        Ok(true)
    }

    /// Apply removals, then additions. Returns the effective change.
    pub fn apply_bulk(
        &mut self,
        edit: &BulkEdit,
        now: DateTime<Utc>,
    ) -> Result<SpellListDiff, DomainError> {
        self.ensure_mutable()?;
        let before = self.spells.clone();
        for spell in &edit.remove {
            self.spells.remove(spell);
        }
        for spell in &edit.add {
            self.spells.insert(spell.clone());
        }
        let diff = SpellListDiff::between(&before, &self.spells);
        if !diff.is_empty() {
            self.touch(now);
        }
        Ok(diff)
    }

    /// Rename. Returns the previous name.
    pub fn rename(&mut self, name: ListName, now: DateTime<Utc>) -> Result<ListName, DomainError> {
        if !self.can_rename() {
            return Err(DomainError::constraint(format!(
                "Spell list '{}' cannot be renamed",
                self.name
            )));
        }
        let previous = std::mem::replace(&mut self.name, name);
        self.touch(now);
        Ok(previous)
    }

    /// Overwrite spells with the original's current contents.
    pub fn restore_from(
        &mut self,
        original: &SpellList,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        match &mut self.kind {
            SpellListKind::Duplicate {
                original_id,
                original_modified_at,
                original_version,
            } => {
                if *original_id != original.id {
                    return Err(DomainError::validation(format!(
                        "List {} is not a copy of {}",
                        self.id, original.id
                    )));
                }
                *original_modified_at = Some(original.modified_at);
                *original_version = Some(original.version);
            }
            _ => {
                return Err(DomainError::constraint(format!(
                    "Spell list '{}' is not a duplicate",
                    self.name
                )))
            }
        }
        self.spells = original.spells.clone();
        self.touch(now);
        Ok(())
    }

    /// Difference of this list against `original`.
    pub fn diff_against(&self, original: &SpellList) -> SpellListDiff {
        SpellListDiff::between(&original.spells, &self.spells)
    }

    /// Whether the original moved on since the copy was last synced.
    pub fn original_changed(&self, original: &SpellList) -> bool {
        match &self.kind {
            SpellListKind::Duplicate {
                original_modified_at,
                original_version,
                ..
            } => {
                original_modified_at.map_or(true, |t| t < original.modified_at)
                    || original_version.map_or(true, |v| v != original.version)
            }
            _ => false,
        }
    }

    /// Header without the spell payload.
    pub fn header(&self) -> SpellListHeader {
        SpellListHeader {
            id: self.id.clone(),
            name: self.name.clone(),
            identifier: self.identifier.clone(),
            source_pack: self.source_pack.clone(),
            kind: self.kind.clone(),
            is_subclass: self.is_subclass,
            spell_count: self.spells.len(),
            modified_at: self.modified_at,
        }
    }
}

/// Pack-index entry for a list: everything except the spell set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellListHeader {
    pub id: SpellListId,
    pub name: ListName,
    pub identifier: ClassIdentifier,
    pub source_pack: PackId,
    pub kind: SpellListKind,
    pub is_subclass: bool,
    pub spell_count: usize,
    pub modified_at: DateTime<Utc>,
}

impl SpellListHeader {
    pub fn kind_tag(&self) -> SpellListKindTag {
        self.kind.tag()
    }

    pub fn original_id(&self) -> Option<&SpellListId> {
        match &self.kind {
            SpellListKind::Duplicate { original_id, .. } => Some(original_id),
            _ => None,
        }
    }

    pub fn owner(&self) -> Option<&ActorId> {
        match &self.kind {
            SpellListKind::ActorOwned { actor_id } => Some(actor_id),
            _ => None,
        }
    }
}

// ============================================================================
// Catalog view
// ============================================================================

/// Catalog grouping, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListGroup {
    ActorOwned,
    Custom,
    Merged,
    Standard,
    Hidden,
}

/// View flags derived from settings plus the stored subclass flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellListFlags {
    pub hidden: bool,
    pub registered: bool,
    pub is_subclass: bool,
}

/// One row of the catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellListMeta {
    pub id: SpellListId,
    pub name: ListName,
    pub identifier: ClassIdentifier,
    pub kind: SpellListKindTag,
    pub source_pack: PackId,
    pub spell_count: usize,
    pub flags: SpellListFlags,
    pub group: ListGroup,
    pub original_id: Option<SpellListId>,
    pub actor_id: Option<ActorId>,
}

impl SpellListMeta {
    pub fn from_header(header: &SpellListHeader, hidden: bool, registered: bool) -> Self {
        let kind = header.kind_tag();
        let group = match kind {
            SpellListKindTag::ActorOwned => ListGroup::ActorOwned,
            _ if hidden => ListGroup::Hidden,
            SpellListKindTag::Custom | SpellListKindTag::Duplicate => ListGroup::Custom,
            SpellListKindTag::Merged => ListGroup::Merged,
            SpellListKindTag::Standard => ListGroup::Standard,
        };
        Self {
            id: header.id.clone(),
            name: header.name.clone(),
            identifier: header.identifier.clone(),
            kind,
            source_pack: header.source_pack.clone(),
            spell_count: header.spell_count,
            flags: SpellListFlags {
                hidden: hidden && kind != SpellListKindTag::ActorOwned,
                registered,
                is_subclass: header.is_subclass,
            },
            group,
            original_id: header.original_id().cloned(),
            actor_id: header.owner().cloned(),
        }
    }
}
