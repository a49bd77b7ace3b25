//! Preparation use cases.
//!
//! Reads materialize the per-class state from the actor's spell items.
//! Commits validate a full selection, judge it against the swap windows,
//! and write the actor once.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use spellbook_domain::{
    evaluate_swap, Actor, ActorClass, ActorId, ClassIdentifier, ClassSwapTracking, DomainError,
    DomainEvent, EnforcementBehavior, ErrorKind, Participant, PreparationCaps, PreparationDiff,
    PreparationState, RitualCasting, RuleSet, SpellId, SpellLevel, SwapKind, SwapStatus, UserId,
};

use crate::entities::{Catalog, Settings, SettingsError};
use crate::infrastructure::locks::KeyedLocks;
use crate::infrastructure::ports::{
    ActorRepo, EventPublisher, Notification, NotificationLevel, NotificationPort, RepoError,
};
use crate::use_cases::resolver::{Resolution, SpellListResolver};
use crate::use_cases::rules::RuleResolver;
use crate::use_cases::swap::repair_tracking;

#[derive(Debug, thiserror::Error)]
pub enum PreparationError {
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
    #[error("Invalid selection: {0}")]
    Invalid(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl PreparationError {
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

/// Everything the preparation sheet shows for one class.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparationView {
    pub state: PreparationState,
    pub rules: RuleSet,
    pub pool: Resolution,
    /// Spells this class may cast as rituals.
    pub rituals: BTreeSet<SpellId>,
    pub swap: ClassSwapTracking,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitOutcome {
    pub diff: PreparationDiff,
    /// Swap violations let through by lenient enforcement.
    pub warnings: Vec<String>,
    pub swap: BTreeMap<SwapKind, SwapStatus>,
    /// False when nothing had to be written.
    pub written: bool,
}

/// Current state of a class built from the actor's items.
pub fn state_of(actor: &Actor, class: &ClassIdentifier, caps: PreparationCaps) -> PreparationState {
    let mut state = PreparationState::new(class.clone(), caps);
    for spell in actor.spells_for(class) {
        state.levels.insert(spell.spell_id.clone(), spell.level);
        if spell.is_granted() {
            state.granted.insert(spell.spell_id.clone());
        } else if spell.is_always_prepared() {
            state.always_prepared.insert(spell.spell_id.clone());
        } else if spell.is_user_prepared() {
            state.prepared.insert(spell.spell_id.clone());
        }
    }
    state
}

pub struct Preparation {
    actors: Arc<dyn ActorRepo>,
    catalog: Arc<Catalog>,
    settings: Arc<Settings>,
    rules: Arc<RuleResolver>,
    resolver: Arc<SpellListResolver>,
    events: Arc<dyn EventPublisher>,
    notifier: Arc<dyn NotificationPort>,
    locks: Arc<KeyedLocks<ActorId>>,
}

impl Preparation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        actors: Arc<dyn ActorRepo>,
        catalog: Arc<Catalog>,
        settings: Arc<Settings>,
        rules: Arc<RuleResolver>,
        resolver: Arc<SpellListResolver>,
        events: Arc<dyn EventPublisher>,
        notifier: Arc<dyn NotificationPort>,
        locks: Arc<KeyedLocks<ActorId>>,
    ) -> Self {
        Self {
            actors,
            catalog,
            settings,
            rules,
            resolver,
            events,
            notifier,
            locks,
        }
    }

    async fn load(&self, actor_id: &ActorId) -> Result<Actor, PreparationError> {
        self.actors
            .get(actor_id)
            .await?
            .ok_or_else(|| PreparationError::ActorNotFound(actor_id.clone()))
    }

    fn class_of<'a>(
        actor: &'a Actor,
        class: &ClassIdentifier,
    ) -> Result<&'a ActorClass, PreparationError> {
        actor
            .class(class)
            .ok_or_else(|| PreparationError::ClassNotFound {
                actor_id: actor.id.clone(),
                class: class.clone(),
            })
    }

    /// Preparation state, pool and ritual set for one class.
    pub async fn materialize(
        &self,
        actor_id: &ActorId,
        class_id: &ClassIdentifier,
    ) -> Result<PreparationView, PreparationError> {
        let mut actor = self.load(actor_id).await?;
        // Read path: inconsistent windows are shown closed, not rewritten.
        repair_tracking(&mut actor);
        let class = Self::class_of(&actor, class_id)?;
        let settings = self.settings.get().await?;
        let rules = self.rules.for_class(&actor, class_id, &settings);
        let caps = self.rules.caps(class, &rules, settings.rules_version);

        let mut state = state_of(&actor, class_id, caps);
        let pool = self.resolver.resolve_for_class(&actor, class).await;
        let rituals = self.rituals(&actor, class_id, &rules, &state, &pool).await;
        state.ritual_only = rituals
            .iter()
            .filter(|id| !state.is_castable(id))
            .cloned()
            .collect();

        Ok(PreparationView {
            state,
            rules,
            pool,
            rituals,
            swap: actor.swap_tracking(class_id).cloned().unwrap_or_default(),
        })
    }

    async fn rituals(
        &self,
        actor: &Actor,
        class: &ClassIdentifier,
        rules: &RuleSet,
        state: &PreparationState,
        pool: &Resolution,
    ) -> BTreeSet<SpellId> {
        let flagged: BTreeSet<SpellId> = actor
            .spells_for(class)
            .filter(|s| s.ritual)
            .map(|s| s.spell_id.clone())
            .collect();
        let candidates: BTreeSet<SpellId> = match rules.ritual_casting {
            RitualCasting::None => return BTreeSet::new(),
            RitualCasting::PreparedOnly => state
                .prepared
                .union(&state.always_prepared)
                .cloned()
                .collect(),
            RitualCasting::Always => pool
                .spells
                .iter()
                .chain(state.prepared.iter())
                .chain(state.always_prepared.iter())
                .cloned()
                .collect(),
        };
        let docs = match self.catalog.spells(candidates.iter()).await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!(error = %e, "Spell documents unavailable, using item flags only");
                BTreeMap::new()
            }
        };
        candidates
            .into_iter()
            .filter(|id| flagged.contains(id) || docs.get(id).map_or(false, |s| s.ritual))
            .collect()
    }

    /// Spells the class may select: its pool, its spellbook, and whatever
    /// the actor already holds for it.
    async fn allowed(
        &self,
        actor: &Actor,
        class: &ActorClass,
        rules: &RuleSet,
    ) -> BTreeSet<SpellId> {
        let mut allowed = self.resolver.resolve_for_class(actor, class).await.spells;
        if let Some(book) = actor.spellbook_id(&class.identifier) {
            match self.catalog.get_list(book).await {
                Ok(Some(list)) => allowed.extend(list.spells().iter().cloned()),
                Ok(None) => tracing::warn!(list_id = %book, "Spellbook list is missing"),
                Err(e) => tracing::warn!(list_id = %book, error = %e, "Spellbook list unreadable"),
            }
        }
        if rules.force_wizard_mode {
            // Cantrips are never copied into a spellbook; take them from the class list.
            let class_list = self
                .resolver
                .resolve(&class.identifier, class.source_pack.as_ref(), None)
                .await;
            match self.catalog.spells(class_list.spells.iter()).await {
                Ok(docs) => allowed.extend(
                    docs.into_values()
                        .filter(|s| s.is_cantrip())
                        .map(|s| s.id),
                ),
                Err(e) => tracing::warn!(error = %e, "Class cantrips unavailable"),
            }
        }
        allowed.extend(actor.spells_for(&class.identifier).map(|s| s.spell_id.clone()));
        allowed
    }

    /// Replace the user-prepared selection of one class.
    ///
    /// `selection` is the whole wanted set of cantrips and leveled spells.
    /// Always-prepared spells in it are ignored; granted ones are rejected.
    pub async fn commit(
        &self,
        participant: &Participant,
        actor_id: &ActorId,
        class_id: &ClassIdentifier,
        selection: BTreeSet<SpellId>,
    ) -> Result<CommitOutcome, PreparationError> {
        let _guard = self.locks.lock(actor_id).await;
        let mut actor = self.load(actor_id).await?;
        if !actor.can_write(participant) {
            return Err(PreparationError::PermissionDenied {
                user_id: participant.user_id().clone(),
                actor_id: actor_id.clone(),
            });
        }
        let repaired = repair_tracking(&mut actor);
        let class = Self::class_of(&actor, class_id)?.clone();
        let settings = self.settings.get().await?;
        let rules = self.rules.for_class(&actor, class_id, &settings);
        let caps = self.rules.caps(&class, &rules, settings.rules_version);
        let state = state_of(&actor, class_id, caps);

        let selection: BTreeSet<SpellId> = selection
            .into_iter()
            .filter(|id| !state.always_prepared.contains(id))
            .collect();
        if let Some(granted) = selection.iter().find(|id| state.granted.contains(id)) {
            return Err(PreparationError::Invalid(format!(
                "{} is granted by a feature and cannot be changed",
                granted
            )));
        }
        let levels = self.levels_for(&actor, &class, &rules, &state, &selection).await?;

        let mut warnings = Vec::new();
        let mut tracking = actor.swap_tracking(class_id).cloned().unwrap_or_default();
        for kind in SwapKind::ALL {
            let persisted = state.prepared_of(kind);
            let requested: BTreeSet<SpellId> = selection
                .iter()
                .filter(|id| {
                    levels.get(*id).map_or(false, |l| l.is_cantrip()) == (kind == SwapKind::Cantrip)
                })
                .cloned()
                .collect();
            let current = tracking.get(kind).clone();
            match evaluate_swap(&current, &persisted, &requested, caps.cap_for(kind) as usize) {
                Ok(outcome) => tracking.get_mut(kind).state = outcome.next,
                Err(violation) if violation.is_cap() => {
                    return Err(PreparationError::Invalid(format!("{}: {}", kind, violation)));
                }
                Err(violation) => match settings.enforcement_behavior {
                    EnforcementBehavior::Enforced => {
                        return Err(PreparationError::Invalid(format!("{}: {}", kind, violation)));
                    }
                    EnforcementBehavior::NotifyGm | EnforcementBehavior::Unenforced => {
                        warnings.push(format!("{}: {}", kind, violation));
                    }
                },
            }
        }

        let diff = PreparationDiff::between(&state.prepared, &selection);
        let tracking_changed =
            actor.swap_tracking(class_id).cloned().unwrap_or_default() != tracking;
        let swap = SwapKind::ALL
            .iter()
            .map(|k| (*k, tracking.get(*k).status()))
            .collect();
        if diff.is_empty() && !tracking_changed && repaired.is_empty() {
            return Ok(CommitOutcome {
                diff,
                warnings,
                swap,
                written: false,
            });
        }

        actor.set_prepared(class_id, &selection, &levels);
        *actor.swap_tracking_mut(class_id) = tracking;
        self.actors.save(&actor).await?;

        tracing::info!(
            actor_id = %actor_id,
            class = %class_id,
            added = diff.added.len(),
            removed = diff.removed.len(),
            warnings = warnings.len(),
            "Preparation committed"
        );
        if !warnings.is_empty() && settings.enforcement_behavior == EnforcementBehavior::NotifyGm {
            self.notifier.notify(Notification::gms(
                NotificationLevel::Warning,
                format!(
                    "{} changed {} spells outside the swap rules: {}",
                    actor.name,
                    class.name,
                    warnings.join("; ")
                ),
            ));
        }
        self.events.publish(DomainEvent::PreparationCommitted {
            actor_id: actor_id.clone(),
            class: class_id.clone(),
            diff: diff.clone(),
            warnings: warnings.clone(),
        });

        Ok(CommitOutcome {
            diff,
            warnings,
            swap,
            written: true,
        })
    }

    /// Levels for every selected spell, validating the new ones.
    async fn levels_for(
        &self,
        actor: &Actor,
        class: &ActorClass,
        rules: &RuleSet,
        state: &PreparationState,
        selection: &BTreeSet<SpellId>,
    ) -> Result<BTreeMap<SpellId, SpellLevel>, PreparationError> {
        let mut levels = state.levels.clone();
        let fresh: Vec<&SpellId> = selection
            .iter()
            .filter(|id| !levels.contains_key(*id))
            .collect();
        if fresh.is_empty() {
            return Ok(levels);
        }
        let allowed = self.allowed(actor, class, rules).await;
        for id in fresh {
            if !allowed.contains(id) {
                return Err(PreparationError::Invalid(format!(
                    "{} is not on the {} spell list",
                    id, class.name
                )));
            }
            let spell = self
                .catalog
                .spell(id)
                .await?
                .ok_or_else(|| PreparationError::SpellNotFound(id.clone()))?;
            if spell.level.as_number() > state.caps.max_spell_level {
                return Err(PreparationError::Invalid(format!(
                    "{} is level {}, above the highest level {} can prepare",
                    id,
                    spell.level.as_number(),
                    class.name
                )));
            }
            levels.insert(id.clone(), spell.level);
        }
        Ok(levels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{class, spell_id, user_id, World};
    use spellbook_domain::{
        ActorSpell, HostEventId, ModuleSettings, PreparationMode, SwapState, SwapTrigger,
        WindowMode,
    };

    fn ids(names: &[&str]) -> BTreeSet<SpellId> {
        names.iter().map(|n| spell_id(n)).collect()
    }

    async fn cleric_world() -> (World, Actor) {
        let world = World::new().await;
        world.add_pack("phb.lists", 0).await;
        for (id, level) in [
            ("light", 0),
            ("guidance", 0),
            ("sacred-flame", 0),
            ("thaumaturgy", 0),
            ("spare-the-dying", 0),
            ("bless", 1),
            ("cure-wounds", 1),
            ("shield-of-faith", 1),
            ("spirit-guardians", 3),
        ] {
            world.add_spell(id, level, false).await;
        }
        world.add_spell("detect-magic", 1, true).await;
        world
            .add_list(world.standard_list(
                "S1",
                "Cleric",
                "cleric",
                "phb.lists",
                &[
                    "light",
                    "guidance",
                    "sacred-flame",
                    "thaumaturgy",
                    "spare-the-dying",
                    "bless",
                    "cure-wounds",
                    "shield-of-faith",
                    "spirit-guardians",
                    "detect-magic",
                ],
            ))
            .await;
        let actor = world.caster("Actor.c", "cleric", 1).await;
        (world, actor)
    }

    #[tokio::test]
    async fn commit_adds_spells_within_caps() {
        let (world, actor) = cleric_world().await;
        let app = world.app();
        let owner = Participant::player(user_id("player-1"));

        let outcome = app
            .use_cases
            .preparation
            .commit(&owner, &actor.id, &class("cleric"), ids(&["light", "bless"]))
            .await
            .unwrap();
        assert!(outcome.written);
        assert_eq!(outcome.diff.added, ids(&["bless", "light"]));

        let view = app
            .use_cases
            .preparation
            .materialize(&actor.id, &class("cleric"))
            .await
            .unwrap();
        assert_eq!(view.state.prepared, ids(&["bless", "light"]));
        assert!(view.state.is_within_caps());
        assert_eq!(world.events.of_type("preparation_committed").len(), 1);
    }

    /// Holds three cantrips with a cantrip swap window open on them.
    async fn cantrip_window(world: &World, actor: &mut Actor, level: u8) {
        actor.classes[0].levels = level;
        for id in ["light", "guidance", "sacred-flame"] {
            actor.spells.push(ActorSpell::new(spell_id(id), class("cleric"), 0));
        }
        actor.swap_tracking_mut(&class("cleric")).cantrip.open(
            SwapTrigger::LongRest,
            WindowMode::Swap,
            HostEventId::new("rest-1").unwrap(),
            ids(&["light", "guidance", "sacred-flame"]),
            world.now(),
        );
        world.save_actor(actor).await;
    }

    #[tokio::test]
    async fn swap_window_allows_a_single_learn_despite_free_capacity() {
        let (world, mut actor) = cleric_world().await;
        cantrip_window(&world, &mut actor, 4).await;

        let err = world
            .app()
            .use_cases
            .preparation
            .commit(
                &Participant::gm(user_id("gm")),
                &actor.id,
                &class("cleric"),
                ids(&["light", "guidance", "thaumaturgy", "spare-the-dying"]),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);

        let stored = world.actor(&actor.id).await;
        assert_eq!(stored.spells, actor.spells);
        assert_eq!(stored.flags.swap_tracking, actor.flags.swap_tracking);
        assert!(world.events.all().is_empty());
    }

    #[tokio::test]
    async fn concurrent_commits_on_one_actor_are_serialized() {
        let (world, mut actor) = cleric_world().await;
        cantrip_window(&world, &mut actor, 1).await;
        let app = world.app();
        let gm = Participant::gm(user_id("gm"));
        let prep = &app.use_cases.preparation;
        let cleric = class("cleric");

        let (first, second) = tokio::join!(
            prep.commit(
                &gm,
                &actor.id,
                &cleric,
                ids(&["light", "guidance", "thaumaturgy"]),
            ),
            prep.commit(
                &gm,
                &actor.id,
                &cleric,
                ids(&["light", "guidance", "spare-the-dying"]),
            ),
        );

        // Whichever ran second was judged against the completed swap.
        let (winner, loser) = match (first, second) {
            (Ok(_), Err(e)) => ("thaumaturgy", e),
            (Err(e), Ok(_)) => ("spare-the-dying", e),
            other => panic!("expected exactly one commit to succeed: {:?}", other),
        };
        assert_eq!(loser.kind(), ErrorKind::Invalid);

        let stored = world.actor(&actor.id).await;
        let view = prep.materialize(&actor.id, &class("cleric")).await.unwrap();
        assert_eq!(view.state.prepared, ids(&["guidance", "light", winner]));
        assert_eq!(
            stored.swap_tracking(&class("cleric")).unwrap().cantrip.state,
            SwapState::Completed {
                snapshot: ids(&["light", "guidance", "sacred-flame"]),
                unlearned: spell_id("sacred-flame"),
                learned: spell_id(winner),
            }
        );
        assert_eq!(world.events.of_type("preparation_committed").len(), 1);
    }

    #[tokio::test]
    async fn unchanged_selection_writes_nothing() {
        let (world, actor) = cleric_world().await;
        let app = world.app();
        let owner = Participant::player(user_id("player-1"));

        let outcome = app
            .use_cases
            .preparation
            .commit(&owner, &actor.id, &class("cleric"), BTreeSet::new())
            .await
            .unwrap();
        assert!(!outcome.written);
        assert!(world.events.all().is_empty());
    }

    #[tokio::test]
    async fn strangers_cannot_commit() {
        let (world, actor) = cleric_world().await;
        let err = world
            .app()
            .use_cases
            .preparation
            .commit(
                &Participant::player(user_id("someone-else")),
                &actor.id,
                &class("cleric"),
                ids(&["bless"]),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn cap_violations_are_rejected_even_unenforced() {
        let (world, actor) = cleric_world().await;
        world
            .set_settings(ModuleSettings {
                enforcement_behavior: EnforcementBehavior::Unenforced,
                ..Default::default()
            })
            .await;
        let err = world
            .app()
            .use_cases
            .preparation
            .commit(
                &Participant::gm(user_id("gm")),
                &actor.id,
                &class("cleric"),
                ids(&[
                    "bless",
                    "cure-wounds",
                    "shield-of-faith",
                    "detect-magic",
                    "light",
                    "guidance",
                ]),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert!(world.actor(&actor.id).await.spells.is_empty());
    }

    #[tokio::test]
    async fn spells_off_the_list_or_too_high_are_rejected() {
        let (world, actor) = cleric_world().await;
        world.add_spell("fireball", 3, false).await;
        let app = world.app();
        let gm = Participant::gm(user_id("gm"));

        let err = app
            .use_cases
            .preparation
            .commit(&gm, &actor.id, &class("cleric"), ids(&["fireball"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);

        let err = app
            .use_cases
            .preparation
            .commit(&gm, &actor.id, &class("cleric"), ids(&["spirit-guardians"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[tokio::test]
    async fn granted_spells_are_read_only() {
        let (world, mut actor) = cleric_world().await;
        let mut granted = ActorSpell::new(spell_id("bless"), class("cleric"), 1);
        granted.granted_by = Some("Amulet".into());
        actor.spells.push(granted);
        world.save_actor(&actor).await;

        let err = world
            .app()
            .use_cases
            .preparation
            .commit(&Participant::gm(user_id("gm")), &actor.id, &class("cleric"), ids(&["bless"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[tokio::test]
    async fn removal_without_window_depends_on_enforcement() {
        let (world, mut actor) = cleric_world().await;
        actor.spells.push(ActorSpell::new(spell_id("bless"), class("cleric"), 1));
        world.save_actor(&actor).await;
        let gm = Participant::gm(user_id("gm"));

        let err = world
            .app()
            .use_cases
            .preparation
            .commit(&gm, &actor.id, &class("cleric"), BTreeSet::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);

        world
            .set_settings(ModuleSettings {
                enforcement_behavior: EnforcementBehavior::NotifyGm,
                ..Default::default()
            })
            .await;
        let outcome = world
            .app()
            .use_cases
            .preparation
            .commit(&gm, &actor.id, &class("cleric"), BTreeSet::new())
            .await
            .unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(world.notifier.all().len(), 1);
        let stored = world.actor(&actor.id).await;
        assert!(stored.spells.iter().all(|s| !s.prepared));
    }

    #[tokio::test]
    async fn reprepare_window_accepts_any_set_within_caps() {
        let (world, mut actor) = cleric_world().await;
        actor.classes[0].levels = 5;
        actor.spells.push(ActorSpell::new(spell_id("bless"), class("cleric"), 1));
        actor.swap_tracking_mut(&class("cleric")).spell.open(
            SwapTrigger::LongRest,
            WindowMode::Reprepare,
            HostEventId::new("rest-1").unwrap(),
            ids(&["bless"]),
            world.now(),
        );
        world.save_actor(&actor).await;

        let outcome = world
            .app()
            .use_cases
            .preparation
            .commit(
                &Participant::gm(user_id("gm")),
                &actor.id,
                &class("cleric"),
                ids(&["cure-wounds", "shield-of-faith", "detect-magic"]),
            )
            .await
            .unwrap();
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.swap[&SwapKind::Spell], SwapStatus::Open);
    }

    #[tokio::test]
    async fn always_prepared_spells_are_ignored_in_selections() {
        let (world, mut actor) = cleric_world().await;
        let mut domain = ActorSpell::new(spell_id("bless"), class("cleric"), 1);
        domain.mode = PreparationMode::Always;
        actor.spells.push(domain);
        world.save_actor(&actor).await;

        let outcome = world
            .app()
            .use_cases
            .preparation
            .commit(&Participant::gm(user_id("gm")), &actor.id, &class("cleric"), ids(&["bless"]))
            .await
            .unwrap();
        assert!(!outcome.written);
    }

    #[tokio::test]
    async fn rituals_follow_the_class_policy() {
        let (world, mut actor) = cleric_world().await;
        actor.spells.push(ActorSpell::new(spell_id("detect-magic"), class("cleric"), 1));
        world.save_actor(&actor).await;
        let prep = world.app().use_cases.preparation;

        let view = prep.materialize(&actor.id, &class("cleric")).await.unwrap();
        assert_eq!(view.rituals, ids(&["detect-magic"]));
        assert!(view.state.ritual_only.is_empty());

        let wizard = world.caster("Actor.w", "wizard", 1).await;
        world
            .add_list(world.standard_list(
                "S2",
                "Wizard",
                "wizard",
                "phb.lists",
                &["detect-magic", "light"],
            ))
            .await;
        let view = prep.materialize(&wizard.id, &class("wizard")).await.unwrap();
        assert_eq!(view.state.ritual_only, ids(&["detect-magic"]));
    }
}
