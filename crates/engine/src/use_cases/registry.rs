//! Class spell list registry.
//!
//! An enabled entry advertises a list to other modules as a class pool.
//! Entries live in the settings document, so toggles are serialized by the
//! settings lock.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use spellbook_domain::{
    ClassIdentifier, DomainEvent, ErrorKind, RegistryEntry, SpellId, SpellListId,
};

use crate::entities::{Catalog, Settings, SettingsError};
use crate::infrastructure::ports::{EventPublisher, RepoError};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Spell list not found: {0}")]
    ListNotFound(SpellListId),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ListNotFound(_) => ErrorKind::NotFound,
            Self::Settings(e) => e.kind(),
            Self::Repo(e) => e.kind(),
        }
    }
}

/// A registered list as external consumers see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredPool {
    pub list_id: SpellListId,
    pub identifier: ClassIdentifier,
    pub spells: BTreeSet<SpellId>,
}

pub struct Registry {
    settings: Arc<Settings>,
    catalog: Arc<Catalog>,
    events: Arc<dyn EventPublisher>,
}

impl Registry {
    pub fn new(
        settings: Arc<Settings>,
        catalog: Arc<Catalog>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            settings,
            catalog,
            events,
        }
    }

    async fn require(&self, list_id: &SpellListId) -> Result<(), RegistryError> {
        match self.catalog.get_list(list_id).await? {
            Some(_) => Ok(()),
            None => Err(RegistryError::ListNotFound(list_id.clone())),
        }
    }

    /// Flip the entry. Returns the new state.
    pub async fn toggle(&self, list_id: &SpellListId) -> Result<bool, RegistryError> {
        self.require(list_id).await?;
        let enabled = self
            .settings
            .update(|s| {
                let enabled = !s.is_registered(list_id);
                s.registry.insert(list_id.clone(), enabled);
                Ok(enabled)
            })
            .await?;
        self.announce(list_id, enabled);
        Ok(enabled)
    }

    /// Set the entry. Returns whether it changed.
    pub async fn set(&self, list_id: &SpellListId, enabled: bool) -> Result<bool, RegistryError> {
        self.require(list_id).await?;
        let changed = self
            .settings
            .update(|s| Ok(s.registry.insert(list_id.clone(), enabled) != Some(enabled)))
            .await?;
        if changed {
            self.announce(list_id, enabled);
        }
        Ok(changed)
    }

    fn announce(&self, list_id: &SpellListId, enabled: bool) {
        tracing::info!(list_id = %list_id, enabled, "Registry entry changed");
        self.events.publish(DomainEvent::RegistryChanged {
            list_id: list_id.clone(),
            enabled,
        });
    }

    pub async fn enabled_entries(&self) -> Result<Vec<RegistryEntry>, RegistryError> {
        Ok(self
            .settings
            .get()
            .await?
            .registry_entries()
            .into_iter()
            .filter(|e| e.enabled)
            .collect())
    }

    /// Pools of enabled entries. Entries whose list is gone are skipped.
    pub async fn registered_pools(&self) -> Result<Vec<RegisteredPool>, RegistryError> {
        let mut pools = Vec::new();
        for entry in self.enabled_entries().await? {
            match self.catalog.get_list(&entry.list_id).await {
                Ok(Some(list)) => pools.push(RegisteredPool {
                    list_id: entry.list_id,
                    identifier: list.identifier().clone(),
                    spells: list.spells().clone(),
                }),
                Ok(None) => tracing::warn!(
                    list_id = %entry.list_id,
                    "Registered list does not exist"
                ),
                Err(e) => tracing::warn!(
                    list_id = %entry.list_id,
                    error = %e,
                    "Registered list unreadable"
                ),
            }
        }
        Ok(pools)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{list_id, World};

    #[tokio::test]
    async fn toggle_flips_and_announces() {
        let world = World::new().await;
        world.add_pack("phb.lists", 0).await;
        world
            .add_list(world.standard_list("S1", "Cleric", "cleric", "phb.lists", &["bless"]))
            .await;
        let registry = world.app().use_cases.registry;

        assert!(registry.toggle(&list_id("S1")).await.unwrap());
        assert!(!registry.toggle(&list_id("S1")).await.unwrap());
        assert_eq!(world.events.of_type("registry_changed").len(), 2);
    }

    #[tokio::test]
    async fn enabled_pools_skip_vanished_lists() {
        let world = World::new().await;
        world.add_pack("phb.lists", 0).await;
        world
            .add_list(world.standard_list("S1", "Cleric", "cleric", "phb.lists", &["bless"]))
            .await;
        let registry = world.app().use_cases.registry;
        registry.set(&list_id("S1"), true).await.unwrap();
        assert!(!registry.set(&list_id("S1"), true).await.unwrap());
        world
            .settings
            .update(|s| {
                s.registry.insert(list_id("gone"), true);
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(registry.enabled_entries().await.unwrap().len(), 2);
        let pools = registry.registered_pools().await.unwrap();
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].list_id, list_id("S1"));
    }

    #[tokio::test]
    async fn unknown_lists_cannot_be_registered() {
        let world = World::new().await;
        let err = world
            .app()
            .use_cases
            .registry
            .toggle(&list_id("nope"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
