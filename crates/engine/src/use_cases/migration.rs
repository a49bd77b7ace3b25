//! World data migration.
//!
//! Brings stored flags and settings up to the current shape: scalar
//! `customSpellList` rules become sequences, inconsistent swap tracking is
//! reset, and references to lists that no longer exist are dropped. Safe to
//! run repeatedly; a second run over migrated data changes nothing.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use spellbook_domain::{ActorId, ClassIdentifier, ErrorKind, SpellListId};

use crate::entities::{Catalog, Settings, SettingsError};
use crate::infrastructure::locks::KeyedLocks;
use crate::infrastructure::ports::{
    ActorRepo, Notification, NotificationLevel, NotificationPort, RepoError,
};
use crate::use_cases::swap::repair_tracking;

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl MigrationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Settings(e) => e.kind(),
            Self::Repo(e) => e.kind(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub actors_scanned: usize,
    /// Actors whose class rules were stored in a legacy shape.
    pub normalized_rules: Vec<ActorId>,
    /// Swap windows reset because their stored state was unusable.
    pub reset_swap_tracking: usize,
    /// Spellbook references to lists that no longer exist.
    pub dangling_spellbooks: Vec<(ActorId, ClassIdentifier)>,
    pub dropped_hidden: Vec<SpellListId>,
    pub dropped_registry: Vec<SpellListId>,
    pub unreadable_actors: Vec<ActorId>,
}

impl MigrationReport {
    pub fn changed_anything(&self) -> bool {
        !self.normalized_rules.is_empty()
            || self.reset_swap_tracking > 0
            || !self.dangling_spellbooks.is_empty()
            || !self.dropped_hidden.is_empty()
            || !self.dropped_registry.is_empty()
    }

    fn summary(&self) -> String {
        format!(
            "Spell Book migration: {} actor(s) with legacy class rules, {} swap window(s) reset, \
             {} dangling spellbook(s), {} hidden and {} registry entries removed",
            self.normalized_rules.len(),
            self.reset_swap_tracking,
            self.dangling_spellbooks.len(),
            self.dropped_hidden.len(),
            self.dropped_registry.len()
        )
    }
}

pub struct Migration {
    actors: Arc<dyn ActorRepo>,
    settings: Arc<Settings>,
    catalog: Arc<Catalog>,
    notifier: Arc<dyn NotificationPort>,
    locks: Arc<KeyedLocks<ActorId>>,
}

impl Migration {
    pub fn new(
        actors: Arc<dyn ActorRepo>,
        settings: Arc<Settings>,
        catalog: Arc<Catalog>,
        notifier: Arc<dyn NotificationPort>,
        locks: Arc<KeyedLocks<ActorId>>,
    ) -> Self {
        Self {
            actors,
            settings,
            catalog,
            notifier,
            locks,
        }
    }

    pub async fn run(&self) -> Result<MigrationReport, MigrationError> {
        let mut report = MigrationReport::default();
        for actor_id in self.actors.list_ids().await? {
            report.actors_scanned += 1;
            if let Err(e) = self.migrate_actor(&actor_id, &mut report).await {
                tracing::warn!(actor_id = %actor_id, error = %e, "Actor skipped by migration");
                report.unreadable_actors.push(actor_id);
            }
        }
        self.migrate_settings(&mut report).await?;

        if report.changed_anything() {
            tracing::info!(
                actors = report.actors_scanned,
                normalized = report.normalized_rules.len(),
                reset = report.reset_swap_tracking,
                "Migration changed stored data"
            );
            let settings = self.settings.get().await?;
            if !settings.suppress_migration_warnings {
                self.notifier
                    .notify(Notification::gms(NotificationLevel::Info, report.summary()));
            }
        } else {
            tracing::debug!(actors = report.actors_scanned, "Migration found nothing to change");
        }
        Ok(report)
    }

    async fn migrate_actor(
        &self,
        actor_id: &ActorId,
        report: &mut MigrationReport,
    ) -> Result<(), RepoError> {
        let _guard = self.locks.lock(actor_id).await;
        let Some(mut actor) = self.actors.get(actor_id).await? else {
            return Ok(());
        };
        let mut dirty = false;

        let raw_rules = self.actors.get_flag(actor_id, "classRules").await?;
        if raw_rules.as_ref().is_some_and(has_legacy_rules) {
            report.normalized_rules.push(actor_id.clone());
            dirty = true;
        }

        // The store drops unparseable entries on read; persist the drop.
        let raw_tracking = self.actors.get_flag(actor_id, "swapTracking").await?;
        let dropped = dropped_tracking_entries(raw_tracking.as_ref(), &actor);
        if dropped > 0 {
            report.reset_swap_tracking += dropped;
            dirty = true;
        }
        let repaired = repair_tracking(&mut actor);
        if !repaired.is_empty() {
            report.reset_swap_tracking += repaired.len();
            dirty = true;
        }

        let mut dangling = Vec::new();
        for (class, list_id) in &actor.flags.spellbooks {
            if self.catalog.get_list(list_id).await?.is_none() {
                dangling.push(class.clone());
            }
        }
        for class in dangling {
            tracing::warn!(
                actor_id = %actor_id,
                class = %class,
                "Dropping dangling spellbook reference"
            );
            actor.flags.spellbooks.remove(&class);
            report.dangling_spellbooks.push((actor_id.clone(), class));
            dirty = true;
        }

        if dirty {
            self.actors.save(&actor).await?;
        }
        Ok(())
    }

    /// Drop hidden and registry ids whose list is known to be gone.
    /// Lists that cannot be read right now are kept.
    async fn migrate_settings(&self, report: &mut MigrationReport) -> Result<(), MigrationError> {
        let settings = self.settings.get().await?;
        let referenced: BTreeSet<&SpellListId> = settings
            .hidden_spell_lists
            .iter()
            .chain(settings.registry.keys())
            .collect();
        let mut missing = BTreeSet::new();
        for id in referenced {
            match self.catalog.get_list(id).await {
                Ok(None) => {
                    missing.insert(id.clone());
                }
                Ok(Some(_)) => {}
                Err(e) => tracing::warn!(
                    list_id = %id,
                    error = %e,
                    "Keeping unreadable list reference"
                ),
            }
        }
        if missing.is_empty() {
            return Ok(());
        }

        let (hidden, registry) = self
            .settings
            .update(|s| {
                let hidden: Vec<_> = missing
                    .iter()
                    .filter(|id| s.hidden_spell_lists.remove(*id))
                    .cloned()
                    .collect();
                let registry: Vec<_> = missing
                    .iter()
                    .filter(|id| s.registry.remove(*id).is_some())
                    .cloned()
                    .collect();
                Ok((hidden, registry))
            })
            .await?;
        report.dropped_hidden = hidden;
        report.dropped_registry = registry;
        Ok(())
    }
}

/// A scalar or legacy-keyed custom list anywhere in the stored rules.
fn has_legacy_rules(raw: &Value) -> bool {
    let Some(classes) = raw.as_object() else {
        return false;
    };
    classes.values().filter_map(Value::as_object).any(|rules| {
        rules.contains_key("customSpellList")
            || rules
                .get("customSpellListIds")
                .is_some_and(|ids| !ids.is_array())
    })
}

fn dropped_tracking_entries(raw: Option<&Value>, actor: &spellbook_domain::Actor) -> usize {
    match raw {
        None | Some(Value::Null) => 0,
        Some(Value::Object(entries)) => entries
            .keys()
            .filter(|class| {
                ClassIdentifier::new(class.as_str())
                    .map(|c| actor.swap_tracking(&c).is_none())
                    .unwrap_or(true)
            })
            .count(),
        Some(_) => 1,
    }
}
