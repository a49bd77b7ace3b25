//! Class spell pool resolution.
//!
//! Sources are tried in a fixed order and the first one that yields spells
//! wins: the actor's personal spellbook, the class's custom lists, the list
//! shipped next to the class item, a module-authored list, and finally a
//! standard list for the identifier from any pack. Sources that cannot be
//! read are skipped with a warning.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use spellbook_domain::{
    Actor, ActorClass, ClassIdentifier, PackId, SpellId, SpellListHeader, SpellListId,
    SpellListKindTag,
};

use crate::entities::Catalog;

/// Where a pool came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PoolSource {
    PersonalSpellbook { list_id: SpellListId },
    ClassCustomLists { list_ids: Vec<SpellListId> },
    PackColocated { list_id: SpellListId },
    ModuleCustom { list_id: SpellListId },
    GlobalIdentifier { list_id: SpellListId },
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub spells: BTreeSet<SpellId>,
    pub source: PoolSource,
}

impl Resolution {
    fn empty() -> Self {
        Self {
            spells: BTreeSet::new(),
            source: PoolSource::Nothing,
        }
    }
}

pub struct SpellListResolver {
    catalog: Arc<Catalog>,
}

impl SpellListResolver {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Pool for one class of an actor, subclass lists included.
    ///
    /// A personal spellbook shadows every other source, subclass lists too.
    pub async fn resolve_for_class(&self, actor: &Actor, class: &ActorClass) -> Resolution {
        let mut resolution = self
            .resolve(&class.identifier, class.source_pack.as_ref(), Some(actor))
            .await;
        if matches!(resolution.source, PoolSource::PersonalSpellbook { .. }) {
            return resolution;
        }
        if let Some(subclass) = &class.subclass {
            let extra = self.resolve(subclass, class.source_pack.as_ref(), None).await;
            resolution.spells.extend(extra.spells);
        }
        resolution
    }

    /// Pool for an identifier. `actor` enables the actor-specific tiers.
    pub async fn resolve(
        &self,
        identifier: &ClassIdentifier,
        source_pack: Option<&PackId>,
        actor: Option<&Actor>,
    ) -> Resolution {
        if let Some(actor) = actor {
            if let Some(found) = self.personal_spellbook(actor, identifier).await {
                return found;
            }
            if let Some(found) = self.class_custom_lists(actor, identifier).await {
                return found;
            }
        }
        if let Some(pack) = source_pack {
            if let Some(found) = self.pack_colocated(identifier, pack).await {
                return found;
            }
        }
        if let Some(found) = self.module_custom(identifier).await {
            return found;
        }
        self.global(identifier).await.unwrap_or_else(|| {
            tracing::debug!(identifier = %identifier, "No spell list for class");
            Resolution::empty()
        })
    }

    /// Spells of a list; `None` when it is missing or unreadable.
    async fn list_spells(&self, id: &SpellListId) -> Option<BTreeSet<SpellId>> {
        match self.catalog.get_list(id).await {
            Ok(Some(list)) => Some(list.spells().clone()),
            Ok(None) => {
                tracing::warn!(list_id = %id, "Referenced spell list does not exist");
                None
            }
            Err(e) => {
                tracing::warn!(list_id = %id, error = %e, "Skipping unreadable spell list");
                None
            }
        }
    }

    async fn personal_spellbook(
        &self,
        actor: &Actor,
        identifier: &ClassIdentifier,
    ) -> Option<Resolution> {
        let book = actor.spellbook_id(identifier)?;
        let spells = self.list_spells(book).await?;
        (!spells.is_empty()).then(|| Resolution {
            spells,
            source: PoolSource::PersonalSpellbook {
                list_id: book.clone(),
            },
        })
    }

    async fn class_custom_lists(
        &self,
        actor: &Actor,
        identifier: &ClassIdentifier,
    ) -> Option<Resolution> {
        let ids = &actor.class_rules(identifier)?.custom_spell_list_ids;
        let mut spells = BTreeSet::new();
        let mut used = Vec::new();
        for id in ids {
            if let Some(found) = self.list_spells(id).await {
                spells.extend(found);
                used.push(id.clone());
            }
        }
        (!spells.is_empty()).then(|| Resolution {
            spells,
            source: PoolSource::ClassCustomLists { list_ids: used },
        })
    }

    async fn pack_index(&self, pack: &PackId) -> Arc<Vec<SpellListHeader>> {
        match self.catalog.pack_index(pack).await {
            Ok(headers) => headers,
            Err(e) => {
                tracing::warn!(pack_id = %pack, error = %e, "Skipping inaccessible pack");
                Arc::new(Vec::new())
            }
        }
    }

    /// The modified copy standing in for `original`, if one exists.
    async fn override_of(&self, original: &SpellListId) -> Option<SpellListId> {
        self.pack_index(self.catalog.module_pack())
            .await
            .iter()
            .find(|h| h.original_id() == Some(original))
            .map(|h| h.id.clone())
    }

    /// Spells of `list`, or of its modified copy when there is one.
    async fn with_override(&self, list: &SpellListId) -> Option<(SpellListId, BTreeSet<SpellId>)> {
        if let Some(copy) = self.override_of(list).await {
            if let Some(spells) = self.list_spells(&copy).await {
                return Some((copy, spells));
            }
        }
        let spells = self.list_spells(list).await?;
        Some((list.clone(), spells))
    }

    async fn pack_colocated(
        &self,
        identifier: &ClassIdentifier,
        pack: &PackId,
    ) -> Option<Resolution> {
        let index = self.pack_index(pack).await;
        let header = index
            .iter()
            .find(|h| &h.identifier == identifier && h.kind_tag() != SpellListKindTag::ActorOwned)?;
        let overridden = self.override_of(&header.id).await.is_some();
        let (list_id, spells) = self.with_override(&header.id).await?;
        (overridden || !spells.is_empty()).then(|| Resolution {
            spells,
            source: PoolSource::PackColocated { list_id },
        })
    }

    async fn module_custom(&self, identifier: &ClassIdentifier) -> Option<Resolution> {
        let index = self.pack_index(self.catalog.module_pack()).await;
        let candidates = index.iter().filter(|h| {
            &h.identifier == identifier
                && matches!(
                    h.kind_tag(),
                    SpellListKindTag::Custom
                        | SpellListKindTag::Duplicate
                        | SpellListKindTag::Merged
                )
        });
        for header in candidates {
            if let Some(spells) = self.list_spells(&header.id).await {
                if !spells.is_empty() {
                    return Some(Resolution {
                        spells,
                        source: PoolSource::ModuleCustom {
                            list_id: header.id.clone(),
                        },
                    });
                }
            }
        }
        None
    }

    /// First standard list for the identifier by (pack sort key, pack id, list id).
    async fn global(&self, identifier: &ClassIdentifier) -> Option<Resolution> {
        let packs = match self.catalog.packs().await {
            Ok(packs) => packs,
            Err(e) => {
                tracing::warn!(error = %e, "Pack enumeration failed");
                return None;
            }
        };
        for pack in packs {
            let index = self.pack_index(&pack.id).await;
            let Some(header) = index
                .iter()
                .find(|h| &h.identifier == identifier && h.kind_tag() == SpellListKindTag::Standard)
            else {
                continue;
            };
            if let Some((list_id, spells)) = self.with_override(&header.id).await {
                return Some(Resolution {
                    spells,
                    source: PoolSource::GlobalIdentifier { list_id },
                });
            }
        }
        None
    }
}
