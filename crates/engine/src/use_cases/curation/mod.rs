//! Spell list curation.
//!
//! Privileged operations on the list catalog. Every mutation of a list runs
//! under that list's lock; settings changes go through the settings lock.
//! Name checks and the save that claims the name share one naming lock.
//! Non-privileged callers reach these through [`CurationGateway`].

mod gateway;

pub use gateway::CurationGateway;

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use spellbook_domain::{
    BulkEdit, ClassIdentifier, DomainError, DomainEvent, ErrorKind, ListChange, ListName,
    SpellId, SpellList, SpellListDiff, SpellListId, SpellListMeta,
};
use spellbook_shared::{CreateCustomListData, CurationRequest, MergeListsData};

use crate::entities::{Catalog, Settings, SettingsError};
use crate::infrastructure::locks::KeyedLocks;
use crate::infrastructure::ports::{
    ClockPort, DelegationError, EventPublisher, RandomPort, RepoError,
};
use crate::use_cases::registry::{Registry, RegistryError};

/// Suffix for editable copies of standard lists.
const MODIFIED_SUFFIX: &str = "(Modified)";

#[derive(Debug, thiserror::Error)]
pub enum CurationError {
    #[error("Spell list not found: {0}")]
    ListNotFound(SpellListId),
    #[error("Spell not found: {0}")]
    SpellNotFound(SpellId),
    #[error("A spell list named '{0}' already exists")]
    DuplicateName(ListName),
    #[error("Not allowed: {0}")]
    Invalid(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Delegation(#[from] DelegationError),
    #[error("Malformed curation answer: {0}")]
    Decode(String),
}

impl CurationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ListNotFound(_) | Self::SpellNotFound(_) => ErrorKind::NotFound,
            Self::DuplicateName(_) | Self::Invalid(_) => ErrorKind::Invalid,
            Self::Domain(e) => e.kind(),
            Self::Settings(e) => e.kind(),
            Self::Registry(e) => e.kind(),
            Self::Repo(e) => e.kind(),
            Self::Delegation(e) => e.kind(),
            Self::Decode(_) => ErrorKind::Internal,
        }
    }
}

/// Serializable result of a curation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CurationOutcome {
    List {
        list: SpellList,
    },
    /// `created` is false when an existing copy was returned instead.
    Duplicated {
        list: SpellList,
        created: bool,
    },
    Changed {
        changed: bool,
    },
    Diff {
        diff: SpellListDiff,
    },
    Deleted,
}

pub struct Curation {
    catalog: Arc<Catalog>,
    settings: Arc<Settings>,
    registry: Arc<Registry>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn ClockPort>,
    random: Arc<dyn RandomPort>,
    locks: KeyedLocks<SpellListId>,
    /// Taken after any list locks.
    naming: Mutex<()>,
}

impl Curation {
    pub fn new(
        catalog: Arc<Catalog>,
        settings: Arc<Settings>,
        registry: Arc<Registry>,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        Self {
            catalog,
            settings,
            registry,
            events,
            clock,
            random,
            locks: KeyedLocks::new(),
            naming: Mutex::new(()),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Every readable list with its view flags, grouped for display.
    pub async fn list_all(&self) -> Result<Vec<SpellListMeta>, CurationError> {
        let settings = self.settings.get().await?;
        let mut rows: Vec<SpellListMeta> = self
            .catalog
            .headers()
            .await
            .iter()
            .map(|h| {
                SpellListMeta::from_header(
                    h,
                    settings.is_hidden(&h.id),
                    settings.is_registered(&h.id),
                )
            })
            .collect();
        rows.sort_by(|a, b| {
            a.group
                .cmp(&b.group)
                .then_with(|| a.name.folded().cmp(&b.name.folded()))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(rows)
    }

    pub async fn select(&self, list_id: &SpellListId) -> Result<SpellList, CurationError> {
        self.require(list_id).await
    }

    pub async fn diff_against_original(
        &self,
        list_id: &SpellListId,
    ) -> Result<SpellListDiff, CurationError> {
        let list = self.require(list_id).await?;
        let original = self.original_of(&list).await?;
        Ok(list.diff_against(&original))
    }

    pub async fn original_changed_since_copy(
        &self,
        list_id: &SpellListId,
    ) -> Result<bool, CurationError> {
        let list = self.require(list_id).await?;
        let original = self.original_of(&list).await?;
        Ok(list.original_changed(&original))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Editable copy of a standard list. An existing copy is returned as is.
    pub async fn duplicate_for_editing(
        &self,
        standard_id: &SpellListId,
    ) -> Result<(SpellList, bool), CurationError> {
        let _guard = self.locks.lock(standard_id).await;
        let original = self.require(standard_id).await?;
        if !original.is_standard() {
            return Err(CurationError::Invalid(format!(
                "'{}' is not a standard list; edit it directly",
                original.name()
            )));
        }
        if let Some(existing) = self.existing_copy(standard_id).await? {
            tracing::debug!(
                list_id = %standard_id,
                copy_id = %existing.id(),
                "Redirecting to existing copy"
            );
            return Ok((existing, false));
        }

        let _naming = self.naming.lock().await;
        let name = self
            .catalog
            .available_name(&original.name().with_suffix(MODIFIED_SUFFIX)?)
            .await?;
        let copy = SpellList::duplicate_of(
            &original,
            self.new_list_id()?,
            name,
            self.catalog.module_pack().clone(),
            self.clock.now(),
        );
        self.catalog.save_list(&copy).await?;
        self.announce(&copy, ListChange::Created);
        Ok((copy, true))
    }

    pub async fn create_custom(
        &self,
        data: CreateCustomListData,
    ) -> Result<SpellList, CurationError> {
        let name = ListName::new(data.name)?;
        let identifier = ClassIdentifier::new(data.identifier)?;
        let _naming = self.naming.lock().await;
        self.ensure_name_free(&name, None).await?;
        let list = SpellList::custom(
            self.new_list_id()?,
            name,
            identifier,
            self.catalog.module_pack().clone(),
            data.is_subclass,
            self.clock.now(),
        );
        self.catalog.save_list(&list).await?;
        self.announce(&list, ListChange::Created);
        Ok(list)
    }

    /// Union snapshot of two or more lists, optionally hiding the sources.
    pub async fn merge(&self, data: MergeListsData) -> Result<SpellList, CurationError> {
        let mut source_ids = Vec::new();
        for raw in data.source_ids {
            let id = SpellListId::new(raw)?;
            if !source_ids.contains(&id) {
                source_ids.push(id);
            }
        }
        if source_ids.len() < spellbook_domain::MIN_MERGE_SOURCES {
            return Err(CurationError::Invalid(format!(
                "merging needs at least {} distinct lists",
                spellbook_domain::MIN_MERGE_SOURCES
            )));
        }
        let name = ListName::new(data.name)?;

        let _guards = self.locks.lock_many(source_ids.iter()).await;
        let mut sources = Vec::with_capacity(source_ids.len());
        for id in &source_ids {
            sources.push(self.require(id).await?);
        }
        let naming = self.naming.lock().await;
        self.ensure_name_free(&name, None).await?;
        let identifier = match data.identifier {
            Some(raw) => ClassIdentifier::new(raw)?,
            None => sources[0].identifier().clone(),
        };
        let refs: Vec<&SpellList> = sources.iter().collect();
        let merged = SpellList::merged(
            self.new_list_id()?,
            name,
            identifier,
            self.catalog.module_pack().clone(),
            &refs,
            self.clock.now(),
        )?;
        self.catalog.save_list(&merged).await?;
        drop(naming);
        self.announce(&merged, ListChange::Created);

        if data.hide_sources {
            let hideable: Vec<SpellListId> = sources
                .iter()
                .filter(|s| s.can_hide())
                .map(|s| s.id().clone())
                .collect();
            let newly_hidden = self
                .settings
                .update(|s| {
                    Ok(hideable
                        .iter()
                        .filter(|id| s.hidden_spell_lists.insert((*id).clone()))
                        .cloned()
                        .collect::<Vec<_>>())
                })
                .await?;
            for id in newly_hidden {
                self.events.publish(DomainEvent::VisibilityChanged {
                    list_id: id,
                    hidden: true,
                });
            }
        }
        Ok(merged)
    }

    pub async fn rename(
        &self,
        list_id: &SpellListId,
        name: &str,
    ) -> Result<SpellList, CurationError> {
        let name = ListName::new(name)?;
        let _guard = self.locks.lock(list_id).await;
        let mut list = self.require(list_id).await?;
        if !list.can_rename() {
            return Err(CurationError::Invalid(format!("'{}' cannot be renamed", list.name())));
        }
        let _naming = self.naming.lock().await;
        self.ensure_name_free(&name, Some(list_id)).await?;
        let previous = list.rename(name, self.clock.now())?;
        self.catalog.save_list(&list).await?;
        tracing::info!(
            list_id = %list_id,
            from = %previous,
            to = %list.name(),
            "Spell list renamed"
        );
        self.announce(&list, ListChange::Renamed);
        Ok(list)
    }

    pub async fn add_spell(
        &self,
        list_id: &SpellListId,
        spell_id: &SpellId,
    ) -> Result<bool, CurationError> {
        self.require_spell(spell_id).await?;
        let _guard = self.locks.lock(list_id).await;
        let mut list = self.require(list_id).await?;
        let changed = list.add_spell(spell_id.clone(), self.clock.now())?;
        if changed {
            self.catalog.save_list(&list).await?;
            self.announce(&list, ListChange::SpellsChanged);
        }
        Ok(changed)
    }

    pub async fn remove_spell(
        &self,
        list_id: &SpellListId,
        spell_id: &SpellId,
    ) -> Result<bool, CurationError> {
        let _guard = self.locks.lock(list_id).await;
        let mut list = self.require(list_id).await?;
        let changed = list.remove_spell(spell_id, self.clock.now())?;
        if changed {
            self.catalog.save_list(&list).await?;
            self.announce(&list, ListChange::SpellsChanged);
        }
        Ok(changed)
    }

    /// Removals then additions, written once.
    pub async fn bulk_apply(
        &self,
        list_id: &SpellListId,
        edit: &BulkEdit,
    ) -> Result<SpellListDiff, CurationError> {
        for spell in &edit.add {
            self.require_spell(spell).await?;
        }
        let _guard = self.locks.lock(list_id).await;
        let mut list = self.require(list_id).await?;
        let diff = list.apply_bulk(edit, self.clock.now())?;
        if !diff.is_empty() {
            self.catalog.save_list(&list).await?;
            self.announce(&list, ListChange::SpellsChanged);
        }
        Ok(diff)
    }

    /// Reset a modified copy to its original's current spells.
    pub async fn restore_from_original(
        &self,
        list_id: &SpellListId,
    ) -> Result<SpellList, CurationError> {
        let _guard = self.locks.lock(list_id).await;
        let mut list = self.require(list_id).await?;
        let original = self.original_of(&list).await?;
        list.restore_from(&original, self.clock.now())?;
        self.catalog.save_list(&list).await?;
        self.announce(&list, ListChange::Restored);
        Ok(list)
    }

    /// Delete a non-standard list and drop it from the registry and hidden set.
    pub async fn delete(&self, list_id: &SpellListId) -> Result<(), CurationError> {
        let _guard = self.locks.lock(list_id).await;
        let list = self.require(list_id).await?;
        if !list.can_delete() {
            return Err(CurationError::Invalid(format!(
                "'{}' is a standard list and cannot be deleted",
                list.name()
            )));
        }
        self.catalog.delete_list(&list).await?;
        self.settings.update(|s| Ok(s.forget_list(list_id))).await?;
        tracing::info!(list_id = %list_id, "Spell list deleted");
        self.announce(&list, ListChange::Deleted);
        Ok(())
    }

    pub async fn set_registered(
        &self,
        list_id: &SpellListId,
        enabled: bool,
    ) -> Result<bool, CurationError> {
        Ok(self.registry.set(list_id, enabled).await?)
    }

    /// Hide or show a list. Spellbooks are never hidden.
    pub async fn set_hidden(
        &self,
        list_id: &SpellListId,
        hidden: bool,
    ) -> Result<bool, CurationError> {
        let list = self.require(list_id).await?;
        if hidden && !list.can_hide() {
            return Err(CurationError::Invalid(format!(
                "'{}' is a personal spellbook and cannot be hidden",
                list.name()
            )));
        }
        let changed = self
            .settings
            .update(|s| {
                Ok(if hidden {
                    s.hidden_spell_lists.insert(list_id.clone())
                } else {
                    s.hidden_spell_lists.remove(list_id)
                })
            })
            .await?;
        if changed {
            self.events.publish(DomainEvent::VisibilityChanged {
                list_id: list_id.clone(),
                hidden,
            });
        }
        Ok(changed)
    }

    /// Run a wire request.
    pub async fn execute(
        &self,
        request: CurationRequest,
    ) -> Result<CurationOutcome, CurationError> {
        let name = request.name();
        tracing::debug!(request = name, "Curation request");
        match request {
            CurationRequest::DuplicateForEditing { list_id } => {
                let (list, created) = self
                    .duplicate_for_editing(&SpellListId::new(list_id)?)
                    .await?;
                Ok(CurationOutcome::Duplicated { list, created })
            }
            CurationRequest::CreateCustom { data } => Ok(CurationOutcome::List {
                list: self.create_custom(data).await?,
            }),
            CurationRequest::Merge { data } => Ok(CurationOutcome::List {
                list: self.merge(data).await?,
            }),
            CurationRequest::Rename { list_id, name } => Ok(CurationOutcome::List {
                list: self.rename(&SpellListId::new(list_id)?, &name).await?,
            }),
            CurationRequest::AddSpell { list_id, spell_id } => Ok(CurationOutcome::Changed {
                changed: self
                    .add_spell(&SpellListId::new(list_id)?, &SpellId::new(spell_id)?)
                    .await?,
            }),
            CurationRequest::RemoveSpell { list_id, spell_id } => Ok(CurationOutcome::Changed {
                changed: self
                    .remove_spell(&SpellListId::new(list_id)?, &SpellId::new(spell_id)?)
                    .await?,
            }),
            CurationRequest::BulkApply { list_id, add, remove } => {
                let edit = BulkEdit {
                    add: parse_spells(add)?,
                    remove: parse_spells(remove)?,
                };
                Ok(CurationOutcome::Diff {
                    diff: self.bulk_apply(&SpellListId::new(list_id)?, &edit).await?,
                })
            }
            CurationRequest::RestoreFromOriginal { list_id } => Ok(CurationOutcome::List {
                list: self.restore_from_original(&SpellListId::new(list_id)?).await?,
            }),
            CurationRequest::Delete { list_id } => {
                self.delete(&SpellListId::new(list_id)?).await?;
                Ok(CurationOutcome::Deleted)
            }
            CurationRequest::SetRegistered { list_id, enabled } => Ok(CurationOutcome::Changed {
                changed: self.set_registered(&SpellListId::new(list_id)?, enabled).await?,
            }),
            CurationRequest::SetHidden { list_id, hidden } => Ok(CurationOutcome::Changed {
                changed: self.set_hidden(&SpellListId::new(list_id)?, hidden).await?,
            }),
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn require(&self, list_id: &SpellListId) -> Result<SpellList, CurationError> {
        self.catalog
            .get_list(list_id)
            .await?
            .ok_or_else(|| CurationError::ListNotFound(list_id.clone()))
    }

    async fn require_spell(&self, spell_id: &SpellId) -> Result<(), CurationError> {
        match self.catalog.spell(spell_id).await? {
            Some(_) => Ok(()),
            None => Err(CurationError::SpellNotFound(spell_id.clone())),
        }
    }

    async fn original_of(&self, list: &SpellList) -> Result<SpellList, CurationError> {
        let original_id = list.original_id().ok_or_else(|| {
            CurationError::Invalid(format!("'{}' is not a copy of another list", list.name()))
        })?;
        self.require(original_id).await
    }

    /// Smallest-id modified copy of `original` in the module pack.
    async fn existing_copy(
        &self,
        original: &SpellListId,
    ) -> Result<Option<SpellList>, CurationError> {
        let index = self.catalog.pack_index(self.catalog.module_pack()).await?;
        match index.iter().find(|h| h.original_id() == Some(original)) {
            Some(header) => Ok(self.catalog.get_list(&header.id).await?),
            None => Ok(None),
        }
    }

    async fn ensure_name_free(
        &self,
        name: &ListName,
        except: Option<&SpellListId>,
    ) -> Result<(), CurationError> {
        if self.catalog.name_taken(name, except).await {
            return Err(CurationError::DuplicateName(name.clone()));
        }
        Ok(())
    }

    fn new_list_id(&self) -> Result<SpellListId, CurationError> {
        Ok(SpellListId::new(format!("JournalEntry.{}", self.random.document_id()))?)
    }

    fn announce(&self, list: &SpellList, change: ListChange) {
        self.events.publish(DomainEvent::SpellListChanged {
            list_id: list.id().clone(),
            kind: list.kind_tag(),
            change,
        });
    }
}

fn parse_spells(raw: Vec<String>) -> Result<BTreeSet<SpellId>, DomainError> {
    raw.into_iter().map(SpellId::new).collect()
}
