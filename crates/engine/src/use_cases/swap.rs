//! Swap window use cases.
//!
//! Long rests and level-ups open windows per (class, kind) according to the
//! class's own policy. A host event id makes each trigger idempotent.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use spellbook_domain::{
    Actor, ActorId, ClassIdentifier, DomainError, DomainEvent, ErrorKind, HostEventId,
    OpenOutcome, Participant, SpellId, SwapKind, SwapPolicy, SwapStatus, SwapTrigger, UserId,
    WindowMode,
};

use crate::entities::{Settings, SettingsError};
use crate::infrastructure::locks::KeyedLocks;
use crate::infrastructure::ports::{ActorRepo, ClockPort, EventPublisher, RepoError};
use crate::use_cases::preparation::state_of;
use crate::use_cases::rules::RuleResolver;

#[derive(Debug, thiserror::Error)]
pub enum SwapError {
    #[error("Actor not found: {0}")]
    ActorNotFound(ActorId),
    #[error("User {user_id} cannot change actor {actor_id}")]
    PermissionDenied { user_id: UserId, actor_id: ActorId },
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl SwapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ActorNotFound(_) => ErrorKind::NotFound,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::Domain(e) => e.kind(),
            Self::Settings(e) => e.kind(),
            Self::Repo(e) => e.kind(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenedWindow {
    pub class: ClassIdentifier,
    pub kind: SwapKind,
    pub mode: WindowMode,
    /// Status of the window this one replaced.
    pub replaced: Option<SwapStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestOutcome {
    pub opened: Vec<OpenedWindow>,
    /// Whether owners should be asked to review their spells.
    pub prompt: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapWindowStatus {
    pub class: ClassIdentifier,
    pub kind: SwapKind,
    pub status: SwapStatus,
    pub trigger: Option<SwapTrigger>,
    pub mode: WindowMode,
}

/// Reset windows whose stored state contradicts itself.
///
/// Returns what was reset so writers can persist the repair.
pub fn repair_tracking(actor: &mut Actor) -> Vec<(ClassIdentifier, SwapKind)> {
    let mut reset = Vec::new();
    for (class, tracking) in actor.flags.swap_tracking.iter_mut() {
        for kind in SwapKind::ALL {
            let window = tracking.get_mut(kind);
            if !window.state.is_consistent() {
                tracing::warn!(class = %class, kind = %kind, "Resetting inconsistent swap window");
                window.reset();
                reset.push((class.clone(), kind));
            }
        }
    }
    reset
}

pub struct SwapWindows {
    actors: Arc<dyn ActorRepo>,
    settings: Arc<Settings>,
    rules: Arc<RuleResolver>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn ClockPort>,
    locks: Arc<KeyedLocks<ActorId>>,
}

impl SwapWindows {
    pub fn new(
        actors: Arc<dyn ActorRepo>,
        settings: Arc<Settings>,
        rules: Arc<RuleResolver>,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn ClockPort>,
        locks: Arc<KeyedLocks<ActorId>>,
    ) -> Self {
        Self {
            actors,
            settings,
            rules,
            events,
            clock,
            locks,
        }
    }

    async fn load(&self, actor_id: &ActorId) -> Result<Actor, SwapError> {
        self.actors
            .get(actor_id)
            .await?
            .ok_or_else(|| SwapError::ActorNotFound(actor_id.clone()))
    }

    /// Open every window a trigger calls for. Mutates `actor` in place.
    async fn open_windows(
        &self,
        actor: &mut Actor,
        classes: &[ClassIdentifier],
        trigger: SwapTrigger,
        event_id: &HostEventId,
    ) -> Result<Vec<OpenedWindow>, SwapError> {
        let settings = self.settings.get().await?;
        let now = self.clock.now();
        let mut opened = Vec::new();
        for class_id in classes {
            let Some(class) = actor.class(class_id).cloned() else {
                continue;
            };
            if !self.rules.is_spellcaster(actor, class_id) {
                continue;
            }
            let rules = self.rules.for_class(actor, class_id, &settings);
            let caps = self.rules.caps(&class, &rules, settings.rules_version);
            let state = state_of(actor, class_id, caps);
            for kind in SwapKind::ALL {
                let policy = rules.swap_policy(kind);
                if !policy.opens_on(trigger) {
                    continue;
                }
                let mode = if trigger == SwapTrigger::LongRest
                    && kind == SwapKind::Spell
                    && policy == SwapPolicy::LongRest
                    && self.rules.reprepares(class_id, settings.rules_version)
                {
                    WindowMode::Reprepare
                } else {
                    WindowMode::Swap
                };
                let snapshot: BTreeSet<SpellId> = state.prepared_of(kind);
                let window = actor.swap_tracking_mut(class_id).get_mut(kind);
                let replaced = match window.open(trigger, mode, event_id.clone(), snapshot, now) {
                    OpenOutcome::AlreadyOpen => continue,
                    OpenOutcome::Opened => None,
                    OpenOutcome::Replaced { previous } => Some(previous),
                };
                tracing::info!(
                    actor_id = %actor.id,
                    class = %class_id,
                    kind = %kind,
                    trigger = %trigger,
                    "Swap window opened"
                );
                opened.push(OpenedWindow {
                    class: class_id.clone(),
                    kind,
                    mode,
                    replaced,
                });
            }
        }
        Ok(opened)
    }

    fn publish_opened(&self, actor_id: &ActorId, trigger: SwapTrigger, opened: &[OpenedWindow]) {
        for window in opened {
            self.events.publish(DomainEvent::SwapWindowOpened {
                actor_id: actor_id.clone(),
                class: window.class.clone(),
                kind: window.kind,
                trigger,
            });
        }
    }

    /// A rest finished. Short rests open nothing.
    pub async fn on_rest_completed(
        &self,
        actor_id: &ActorId,
        event_id: &HostEventId,
        long_rest: bool,
    ) -> Result<RestOutcome, SwapError> {
        if !long_rest {
            return Ok(RestOutcome::default());
        }
        let _guard = self.locks.lock(actor_id).await;
        let mut actor = self.load(actor_id).await?;
        let before = actor.clone();
        repair_tracking(&mut actor);

        let classes: Vec<ClassIdentifier> =
            actor.classes.iter().map(|c| c.identifier.clone()).collect();
        let opened = self
            .open_windows(&mut actor, &classes, SwapTrigger::LongRest, event_id)
            .await?;
        if !opened.is_empty() {
            actor.flags.long_rest_completed = true;
        }
        if actor != before {
            self.actors.save(&actor).await?;
        }
        self.publish_opened(actor_id, SwapTrigger::LongRest, &opened);

        let settings = self.settings.get().await?;
        let prompt = !opened.is_empty() && self.rules.prompts_after_long_rest(&actor, &settings);
        Ok(RestOutcome { opened, prompt })
    }

    /// The actor document changed. Opens level-up windows for classes whose
    /// level rose and records the new levels.
    pub async fn on_actor_updated(
        &self,
        actor_id: &ActorId,
        event_id: &HostEventId,
    ) -> Result<Vec<OpenedWindow>, SwapError> {
        let _guard = self.locks.lock(actor_id).await;
        let mut actor = self.load(actor_id).await?;
        let before = actor.clone();
        repair_tracking(&mut actor);

        let levelled: Vec<ClassIdentifier> = actor
            .levelled_classes()
            .into_iter()
            .map(|(class, from, to)| {
                tracing::debug!(actor_id = %actor_id, class = %class, from, to, "Class level rose");
                class
            })
            .collect();
        let opened = self
            .open_windows(&mut actor, &levelled, SwapTrigger::LevelUp, event_id)
            .await?;
        actor.record_levels();
        if actor != before {
            self.actors.save(&actor).await?;
        }
        self.publish_opened(actor_id, SwapTrigger::LevelUp, &opened);
        Ok(opened)
    }

    /// Close a pending window. Spells already unlearned stay unlearned.
    pub async fn cancel(
        &self,
        participant: &Participant,
        actor_id: &ActorId,
        class: &ClassIdentifier,
        kind: SwapKind,
    ) -> Result<SwapStatus, SwapError> {
        let _guard = self.locks.lock(actor_id).await;
        let mut actor = self.load(actor_id).await?;
        if !actor.can_write(participant) {
            return Err(SwapError::PermissionDenied {
                user_id: participant.user_id().clone(),
                actor_id: actor_id.clone(),
            });
        }
        let from = actor.swap_tracking_mut(class).get_mut(kind).cancel()?;
        self.actors.save(&actor).await?;
        tracing::info!(
            actor_id = %actor_id,
            class = %class,
            kind = %kind,
            from = ?from,
            "Swap window cancelled"
        );
        self.events.publish(DomainEvent::SwapWindowCancelled {
            actor_id: actor_id.clone(),
            class: class.clone(),
            kind,
            from,
        });
        Ok(from)
    }

    /// Every tracked window of the actor, inconsistent ones shown closed.
    pub async fn status(&self, actor_id: &ActorId) -> Result<Vec<SwapWindowStatus>, SwapError> {
        let mut actor = self.load(actor_id).await?;
        repair_tracking(&mut actor);
        Ok(actor
            .flags
            .swap_tracking
            .iter()
            .flat_map(|(class, tracking)| {
                SwapKind::ALL.into_iter().map(move |kind| {
                    let window = tracking.get(kind);
                    SwapWindowStatus {
                        class: class.clone(),
                        kind,
                        status: window.status(),
                        trigger: window.trigger,
                        mode: window.mode,
                    }
                })
            })
            .collect())
    }

    /// Windows still waiting for the owner.
    pub async fn pending(&self, actor_id: &ActorId) -> Result<Vec<SwapWindowStatus>, SwapError> {
        Ok(self
            .status(actor_id)
            .await?
            .into_iter()
            .filter(|w| {
                matches!(
                    w.status,
                    SwapStatus::Open | SwapStatus::Unlearned | SwapStatus::Learned
                )
            })
            .collect())
    }

    /// Clear the post-rest marker once the owner has seen the prompt.
    pub async fn acknowledge_long_rest(
        &self,
        participant: &Participant,
        actor_id: &ActorId,
    ) -> Result<bool, SwapError> {
        let _guard = self.locks.lock(actor_id).await;
        let mut actor = self.load(actor_id).await?;
        if !actor.can_write(participant) {
            return Err(SwapError::PermissionDenied {
                user_id: participant.user_id().clone(),
                actor_id: actor_id.clone(),
            });
        }
        if !actor.flags.long_rest_completed {
            return Ok(false);
        }
        actor.flags.long_rest_completed = false;
        self.actors.save(&actor).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{class, spell_id, user_id, World};
    use spellbook_domain::{ActorSpell, ModuleSettings, RulesVersion, SwapState};

    fn event(id: &str) -> HostEventId {
        HostEventId::new(id).unwrap()
    }

    #[tokio::test]
    async fn long_rest_opens_reprepare_for_prepared_casters() {
        let world = World::new().await;
        let mut actor = world.caster("Actor.c", "cleric", 3).await;
        actor.spells.push(ActorSpell::new(spell_id("bless"), class("cleric"), 1));
        world.save_actor(&actor).await;
        let swaps = world.app().use_cases.swaps;

        let outcome = swaps.on_rest_completed(&actor.id, &event("rest-1"), true).await.unwrap();
        assert_eq!(outcome.opened.len(), 1);
        assert_eq!(outcome.opened[0].mode, WindowMode::Reprepare);
        assert!(outcome.prompt);

        let stored = world.actor(&actor.id).await;
        assert!(stored.flags.long_rest_completed);
        let window = stored.swap_tracking(&class("cleric")).unwrap().get(SwapKind::Spell);
        assert_eq!(
            window.state,
            SwapState::Open {
                snapshot: [spell_id("bless")].into()
            }
        );
    }

    #[tokio::test]
    async fn repeated_rest_events_are_ignored() {
        let world = World::new().await;
        let actor = world.caster("Actor.c", "cleric", 3).await;
        let swaps = world.app().use_cases.swaps;

        swaps.on_rest_completed(&actor.id, &event("rest-1"), true).await.unwrap();
        let again = swaps.on_rest_completed(&actor.id, &event("rest-1"), true).await.unwrap();
        assert!(again.opened.is_empty());
        assert_eq!(world.events.of_type("swap_window_opened").len(), 1);
    }

    #[tokio::test]
    async fn short_rests_open_nothing() {
        let world = World::new().await;
        let actor = world.caster("Actor.c", "cleric", 3).await;
        let outcome = world
            .app()
            .use_cases
            .swaps
            .on_rest_completed(&actor.id, &event("rest-1"), false)
            .await
            .unwrap();
        assert!(outcome.opened.is_empty());
        assert!(!world.actor(&actor.id).await.flags.long_rest_completed);
    }

    #[tokio::test]
    async fn prompt_can_be_disabled() {
        let world = World::new().await;
        world
            .set_settings(ModuleSettings {
                disable_long_rest_swap_prompt: true,
                ..Default::default()
            })
            .await;
        let actor = world.caster("Actor.c", "cleric", 3).await;
        let outcome = world
            .app()
            .use_cases
            .swaps
            .on_rest_completed(&actor.id, &event("rest-1"), true)
            .await
            .unwrap();
        assert_eq!(outcome.opened.len(), 1);
        assert!(!outcome.prompt);
    }

    #[tokio::test]
    async fn level_up_opens_swap_windows_once() {
        let world = World::new().await;
        world
            .set_settings(ModuleSettings {
                rules_version: RulesVersion::Modern,
                ..Default::default()
            })
            .await;
        let mut actor = world.caster("Actor.s", "sorcerer", 2).await;
        actor.record_levels();
        actor.classes[0].levels = 3;
        world.save_actor(&actor).await;
        let swaps = world.app().use_cases.swaps;

        let opened = swaps.on_actor_updated(&actor.id, &event("update-1")).await.unwrap();
        let kinds: Vec<SwapKind> = opened.iter().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![SwapKind::Cantrip, SwapKind::Spell]);
        assert!(opened.iter().all(|w| w.mode == WindowMode::Swap));

        let again = swaps.on_actor_updated(&actor.id, &event("update-2")).await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn cancel_closes_pending_windows_only() {
        let world = World::new().await;
        let actor = world.caster("Actor.c", "cleric", 3).await;
        let swaps = world.app().use_cases.swaps;
        let owner = Participant::player(user_id("player-1"));

        let err = swaps
            .cancel(&owner, &actor.id, &class("cleric"), SwapKind::Spell)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);

        swaps.on_rest_completed(&actor.id, &event("rest-1"), true).await.unwrap();
        assert_eq!(swaps.pending(&actor.id).await.unwrap().len(), 1);
        let from = swaps
            .cancel(&owner, &actor.id, &class("cleric"), SwapKind::Spell)
            .await
            .unwrap();
        assert_eq!(from, SwapStatus::Open);
        assert!(swaps.pending(&actor.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn inconsistent_windows_read_as_closed() {
        let world = World::new().await;
        let mut actor = world.caster("Actor.c", "cleric", 3).await;
        actor.swap_tracking_mut(&class("cleric")).spell.state = SwapState::Completed {
            snapshot: [spell_id("bless")].into(),
            unlearned: spell_id("bless"),
            learned: spell_id("bless"),
        };
        world.save_actor(&actor).await;

        let status = world.app().use_cases.swaps.status(&actor.id).await.unwrap();
        assert!(status.iter().all(|w| w.status == SwapStatus::Closed));
    }

    #[tokio::test]
    async fn long_rest_marker_is_acknowledged_once() {
        let world = World::new().await;
        let actor = world.caster("Actor.c", "cleric", 3).await;
        let swaps = world.app().use_cases.swaps;
        let owner = Participant::player(user_id("player-1"));

        swaps.on_rest_completed(&actor.id, &event("rest-1"), true).await.unwrap();
        assert!(swaps.acknowledge_long_rest(&owner, &actor.id).await.unwrap());
        assert!(!swaps.acknowledge_long_rest(&owner, &actor.id).await.unwrap());
    }
}
