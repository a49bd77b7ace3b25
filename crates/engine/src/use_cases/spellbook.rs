//! Personal spellbooks.
//!
//! Spellbook casters keep an actor-owned list per class. Learning a spell
//! spends a free learn while the level allowance lasts; after that the spell
//! counts as copied.

use std::sync::Arc;

use serde::Serialize;
use spellbook_domain::{
    free_spellbook_learns, Actor, ActorId, ClassIdentifier, DomainError, DomainEvent, ErrorKind,
    ListChange, ListName, Participant, SpellId, SpellList, SpellListId, UserId,
    DEFAULT_STARTING_SPELLS,
};

use crate::entities::{Catalog, Settings, SettingsError};
use crate::infrastructure::locks::KeyedLocks;
use crate::infrastructure::ports::{ActorRepo, ClockPort, EventPublisher, RandomPort, RepoError};
use crate::use_cases::rules::RuleResolver;

#[derive(Debug, thiserror::Error)]
pub enum SpellbookError {
    #[error("Actor not found: {0}")]
    ActorNotFound(ActorId),
    #[error("Actor {actor_id} has no class {class}")]
    ClassNotFound {
        actor_id: ActorId,
        class: ClassIdentifier,
    },
    #[error("Spell not found: {0}")]
    SpellNotFound(SpellId),
    #[error("User {user_id} cannot change actor {actor_id}")]
    PermissionDenied { user_id: UserId, actor_id: ActorId },
    #[error("Cannot learn spell: {0}")]
    Invalid(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl SpellbookError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ActorNotFound(_) | Self::ClassNotFound { .. } | Self::SpellNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::Invalid(_) => ErrorKind::Invalid,
            Self::Domain(e) => e.kind(),
            Self::Settings(e) => e.kind(),
            Self::Repo(e) => e.kind(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LearnCost {
    Free,
    Copied,
    AlreadyKnown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnOutcome {
    pub spellbook_id: SpellListId,
    pub cost: LearnCost,
    pub free_remaining: u32,
}

pub struct PersonalSpellbooks {
    actors: Arc<dyn ActorRepo>,
    catalog: Arc<Catalog>,
    settings: Arc<Settings>,
    rules: Arc<RuleResolver>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn ClockPort>,
    random: Arc<dyn RandomPort>,
    locks: Arc<KeyedLocks<ActorId>>,
}

impl PersonalSpellbooks {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        actors: Arc<dyn ActorRepo>,
        catalog: Arc<Catalog>,
        settings: Arc<Settings>,
        rules: Arc<RuleResolver>,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
        locks: Arc<KeyedLocks<ActorId>>,
    ) -> Self {
        Self {
            actors,
            catalog,
            settings,
            rules,
            events,
            clock,
            random,
            locks,
        }
    }

    async fn load_writable(
        &self,
        participant: &Participant,
        actor_id: &ActorId,
        class: &ClassIdentifier,
    ) -> Result<Actor, SpellbookError> {
        let actor = self
            .actors
            .get(actor_id)
            .await?
            .ok_or_else(|| SpellbookError::ActorNotFound(actor_id.clone()))?;
        if !actor.can_write(participant) {
            return Err(SpellbookError::PermissionDenied {
                user_id: participant.user_id().clone(),
                actor_id: actor_id.clone(),
            });
        }
        if actor.class(class).is_none() {
            return Err(SpellbookError::ClassNotFound {
                actor_id: actor_id.clone(),
                class: class.clone(),
            });
        }
        Ok(actor)
    }

    /// Whether the class keeps a spellbook under the current rules.
    pub async fn needs_spellbook(
        &self,
        actor: &Actor,
        class: &ClassIdentifier,
    ) -> Result<bool, SpellbookError> {
        let settings = self.settings.get().await?;
        Ok(self.rules.for_class(actor, class, &settings).force_wizard_mode)
    }

    /// The class's spellbook, created on first use.
    pub async fn ensure_spellbook(
        &self,
        participant: &Participant,
        actor_id: &ActorId,
        class: &ClassIdentifier,
    ) -> Result<SpellList, SpellbookError> {
        let _guard = self.locks.lock(actor_id).await;
        let mut actor = self.load_writable(participant, actor_id, class).await?;
        self.ensure_locked(&mut actor, class).await
    }

    /// Caller holds the actor lock.
    async fn ensure_locked(
        &self,
        actor: &mut Actor,
        class: &ClassIdentifier,
    ) -> Result<SpellList, SpellbookError> {
        if let Some(id) = actor.spellbook_id(class).cloned() {
            match self.catalog.get_list(&id).await? {
                Some(book) => return Ok(book),
                None => tracing::warn!(
                    actor_id = %actor.id,
                    list_id = %id,
                    "Spellbook vanished, creating a new one"
                ),
            }
        }

        let class_name = actor.class(class).map(|c| c.name.clone()).unwrap_or_default();
        let base = ListName::new(format!("{} ({}) Spellbook", actor.name, class_name))?;
        let name = self.catalog.available_name(&base).await?;
        let id = SpellListId::new(format!("JournalEntry.{}", self.random.document_id()))?;
        let book = SpellList::actor_owned(
            id.clone(),
            name,
            class.clone(),
            self.catalog.module_pack().clone(),
            actor.id.clone(),
            self.clock.now(),
        );
        self.catalog.save_list(&book).await?;
        actor.flags.spellbooks.insert(class.clone(), id.clone());
        self.actors.save(actor).await?;

        tracing::info!(actor_id = %actor.id, class = %class, list_id = %id, "Spellbook created");
        self.events.publish(DomainEvent::SpellListChanged {
            list_id: id,
            kind: book.kind_tag(),
            change: ListChange::Created,
        });
        Ok(book)
    }

    /// Copy a spell into the class's spellbook.
    pub async fn learn(
        &self,
        participant: &Participant,
        actor_id: &ActorId,
        class_id: &ClassIdentifier,
        spell_id: &SpellId,
    ) -> Result<LearnOutcome, SpellbookError> {
        let _guard = self.locks.lock(actor_id).await;
        let mut actor = self.load_writable(participant, actor_id, class_id).await?;
        let settings = self.settings.get().await?;
        let rules = self.rules.for_class(&actor, class_id, &settings);
        let Some(class) = actor.class(class_id).cloned() else {
            return Err(SpellbookError::ClassNotFound {
                actor_id: actor_id.clone(),
                class: class_id.clone(),
            });
        };

        let spell = self
            .catalog
            .spell(spell_id)
            .await?
            .ok_or_else(|| SpellbookError::SpellNotFound(spell_id.clone()))?;
        if spell.is_cantrip() {
            return Err(SpellbookError::Invalid(format!(
                "{} is a cantrip; cantrips are not kept in a spellbook",
                spell.name
            )));
        }
        let max_level = self.rules.system().max_spell_level(class_id, class.levels);
        if spell.level.as_number() > max_level {
            return Err(SpellbookError::Invalid(format!(
                "{} is level {}, above level {} spells",
                spell.name,
                spell.level.as_number(),
                max_level
            )));
        }

        let allowance = free_spellbook_learns(
            rules.starting_spell_count.unwrap_or(DEFAULT_STARTING_SPELLS),
            class.levels,
        );
        let mut book = self.ensure_locked(&mut actor, class_id).await?;
        let ledger = actor.flags.spellbook_ledger.entry(class_id.clone()).or_default();
        let used = ledger.free.len() as u32;

        if book.contains(spell_id) {
            return Ok(LearnOutcome {
                spellbook_id: book.id().clone(),
                cost: LearnCost::AlreadyKnown,
                free_remaining: allowance.saturating_sub(used),
            });
        }

        let cost = if used < allowance {
            ledger.free.insert(spell_id.clone());
            LearnCost::Free
        } else {
            ledger.copied.insert(spell_id.clone());
            LearnCost::Copied
        };
        let free_remaining = allowance.saturating_sub(ledger.free.len() as u32);

        book.add_spell(spell_id.clone(), self.clock.now())?;
        self.catalog.save_list(&book).await?;
        self.actors.save(&actor).await?;

        tracing::info!(
            actor_id = %actor_id,
            class = %class_id,
            spell_id = %spell_id,
            cost = ?cost,
            "Spell learned"
        );
        self.events.publish(DomainEvent::SpellListChanged {
            list_id: book.id().clone(),
            kind: book.kind_tag(),
            change: ListChange::SpellsChanged,
        });
        Ok(LearnOutcome {
            spellbook_id: book.id().clone(),
            cost,
            free_remaining,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{class, spell_id, user_id, World};
    use spellbook_domain::ClassRules;

    #[tokio::test]
    async fn spellbook_is_created_once() {
        let world = World::new().await;
        let actor = world.caster("Actor.w", "wizard", 1).await;
        let books = world.app().use_cases.spellbooks;
        let owner = Participant::player(user_id("player-1"));

        let first = books.ensure_spellbook(&owner, &actor.id, &class("wizard")).await.unwrap();
        let second = books.ensure_spellbook(&owner, &actor.id, &class("wizard")).await.unwrap();
        assert_eq!(first.id(), second.id());
        assert!(first.is_actor_owned());
        assert_eq!(world.actor(&actor.id).await.spellbook_id(&class("wizard")), Some(first.id()));
        assert_eq!(world.events.of_type("spell_list_changed").len(), 1);
    }

    #[tokio::test]
    async fn learns_are_free_until_the_allowance_runs_out() {
        let world = World::new().await;
        world.add_spell("magic-missile", 1, false).await;
        world.add_spell("shield", 1, false).await;
        let mut actor = world.caster("Actor.w", "wizard", 1).await;
        actor.flags.class_rules.insert(
            class("wizard"),
            ClassRules {
                starting_spell_count: Some(1),
                ..Default::default()
            },
        );
        world.save_actor(&actor).await;
        let books = world.app().use_cases.spellbooks;
        let owner = Participant::player(user_id("player-1"));

        let first = books
            .learn(&owner, &actor.id, &class("wizard"), &spell_id("magic-missile"))
            .await
            .unwrap();
        assert_eq!(first.cost, LearnCost::Free);
        assert_eq!(first.free_remaining, 0);

        let second = books
            .learn(&owner, &actor.id, &class("wizard"), &spell_id("shield"))
            .await
            .unwrap();
        assert_eq!(second.cost, LearnCost::Copied);

        let again = books
            .learn(&owner, &actor.id, &class("wizard"), &spell_id("shield"))
            .await
            .unwrap();
        assert_eq!(again.cost, LearnCost::AlreadyKnown);

        let ledger = world.actor(&actor.id).await.flags.spellbook_ledger[&class("wizard")].clone();
        assert!(ledger.free.contains(&spell_id("magic-missile")));
        assert!(ledger.copied.contains(&spell_id("shield")));
    }

    #[tokio::test]
    async fn cantrips_and_high_levels_are_refused() {
        let world = World::new().await;
        world.add_spell("light", 0, false).await;
        world.add_spell("fireball", 3, false).await;
        let actor = world.caster("Actor.w", "wizard", 1).await;
        let books = world.app().use_cases.spellbooks;
        let owner = Participant::player(user_id("player-1"));

        for spell in ["light", "fireball"] {
            let err = books
                .learn(&owner, &actor.id, &class("wizard"), &spell_id(spell))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Invalid);
        }
        let err = books
            .learn(&owner, &actor.id, &class("wizard"), &spell_id("wish"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
