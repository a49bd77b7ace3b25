//! Host lifecycle hooks.
//!
//! The host fires named callbacks and may fire the same logical event more
//! than once. Each event carries an id; a repeated id is acknowledged without
//! running the handler again. Ids are remembered for a bounded retention
//! period.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use spellbook_domain::{ActorId, ErrorKind, HostEventId, Participant, SpellListId};

use crate::entities::Catalog;
use crate::infrastructure::ports::{
    ActorRepo, Audience, Notification, NotificationLevel, NotificationPort, RepoError,
};
use crate::use_cases::{
    FocusError, FocusSummary, Migration, MigrationError, MigrationReport, OpenedWindow,
    PartyFocus, PersonalSpellbooks, RestOutcome, SpellbookError, SwapError, SwapWindowStatus,
    SwapWindows,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    RestCompleted {
        event_id: HostEventId,
        actor_id: ActorId,
        long_rest: bool,
    },
    ActorUpdated {
        event_id: HostEventId,
        actor_id: ActorId,
    },
    ActorSheetRendered {
        event_id: HostEventId,
        actor_id: ActorId,
        user: Participant,
    },
    JournalDirectoryActivated {
        event_id: HostEventId,
    },
    GroupSheetRendered {
        event_id: HostEventId,
        group_id: ActorId,
    },
}

impl HostEvent {
    pub fn event_id(&self) -> &HostEventId {
        match self {
            Self::RestCompleted { event_id, .. }
            | Self::ActorUpdated { event_id, .. }
            | Self::ActorSheetRendered { event_id, .. }
            | Self::JournalDirectoryActivated { event_id }
            | Self::GroupSheetRendered { event_id, .. } => event_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::RestCompleted { .. } => "restCompleted",
            Self::ActorUpdated { .. } => "actorUpdated",
            Self::ActorSheetRendered { .. } => "actorSheetRendered",
            Self::JournalDirectoryActivated { .. } => "journalDirectoryActivated",
            Self::GroupSheetRendered { .. } => "groupSheetRendered",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HookOutcome {
    /// The event id was already handled.
    Duplicate,
    Rest { outcome: RestOutcome },
    LevelUp { opened: Vec<OpenedWindow> },
    #[serde(rename_all = "camelCase")]
    Sheet {
        created_spellbooks: Vec<SpellListId>,
        pending: Vec<SwapWindowStatus>,
    },
    Directory { migration: Option<MigrationReport> },
    Group { summary: FocusSummary },
}

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error(transparent)]
    Swap(#[from] SwapError),
    #[error(transparent)]
    Spellbook(#[from] SpellbookError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error(transparent)]
    Focus(#[from] FocusError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl HookError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Swap(e) => e.kind(),
            Self::Spellbook(e) => e.kind(),
            Self::Migration(e) => e.kind(),
            Self::Focus(e) => e.kind(),
            Self::Repo(e) => e.kind(),
        }
    }
}

pub struct HookDispatcher {
    actors: Arc<dyn ActorRepo>,
    catalog: Arc<Catalog>,
    swaps: Arc<SwapWindows>,
    spellbooks: Arc<PersonalSpellbooks>,
    focus: Arc<PartyFocus>,
    migration: Arc<Migration>,
    notifier: Arc<dyn NotificationPort>,
    /// Event id to the instant it was first dispatched.
    seen: DashMap<HostEventId, Instant>,
    retention: Duration,
    migrated: AtomicBool,
}

impl HookDispatcher {
    pub fn new(
        actors: Arc<dyn ActorRepo>,
        catalog: Arc<Catalog>,
        swaps: Arc<SwapWindows>,
        spellbooks: Arc<PersonalSpellbooks>,
        focus: Arc<PartyFocus>,
        migration: Arc<Migration>,
        notifier: Arc<dyn NotificationPort>,
        retention: Duration,
    ) -> Self {
        Self {
            actors,
            catalog,
            swaps,
            spellbooks,
            focus,
            migration,
            notifier,
            seen: DashMap::new(),
            retention,
            migrated: AtomicBool::new(false),
        }
    }

    /// Run the handler for an event once per event id.
    ///
    /// A failed handler forgets the id so the host may retry.
    pub async fn dispatch(&self, event: HostEvent) -> Result<HookOutcome, HookError> {
        let event_id = event.event_id().clone();
        if !self.remember(&event_id) {
            tracing::debug!(
                hook = event.name(),
                event_id = %event_id,
                "Duplicate host event ignored"
            );
            return Ok(HookOutcome::Duplicate);
        }
        let hook = event.name();
        let result = self.run(event).await;
        if let Err(e) = &result {
            tracing::warn!(hook, event_id = %event_id, error = %e, "Host hook failed");
            self.seen.remove(&event_id);
        }
        result
    }

    /// Forget event ids older than the retention period.
    pub fn purge_seen(&self) -> usize {
        let before = self.seen.len();
        let retention = self.retention;
        self.seen.retain(|_, seen_at| seen_at.elapsed() < retention);
        before - self.seen.len()
    }

    pub fn tracked_events(&self) -> usize {
        self.seen.len()
    }

    /// Returns false when the id was seen within the retention period.
    fn remember(&self, event_id: &HostEventId) -> bool {
        match self.seen.entry(event_id.clone()) {
            Entry::Occupied(entry) if entry.get().elapsed() < self.retention => false,
            Entry::Occupied(mut entry) => {
                entry.insert(Instant::now());
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(Instant::now());
                true
            }
        }
    }

    async fn run(&self, event: HostEvent) -> Result<HookOutcome, HookError> {
        match event {
            HostEvent::RestCompleted {
                event_id,
                actor_id,
                long_rest,
            } => {
                let outcome = self
                    .swaps
                    .on_rest_completed(&actor_id, &event_id, long_rest)
                    .await?;
                if outcome.prompt {
                    self.prompt_owners(&actor_id).await?;
                }
                Ok(HookOutcome::Rest { outcome })
            }
            HostEvent::ActorUpdated { event_id, actor_id } => {
                let opened = self.swaps.on_actor_updated(&actor_id, &event_id).await?;
                Ok(HookOutcome::LevelUp { opened })
            }
            HostEvent::ActorSheetRendered { actor_id, user, .. } => {
                let created_spellbooks = self.ensure_spellbooks(&actor_id, &user).await?;
                let pending = self.swaps.pending(&actor_id).await?;
                Ok(HookOutcome::Sheet {
                    created_spellbooks,
                    pending,
                })
            }
            HostEvent::JournalDirectoryActivated { .. } => {
                self.catalog.refresh().await;
                if self.migrated.swap(true, Ordering::SeqCst) {
                    return Ok(HookOutcome::Directory { migration: None });
                }
                match self.migration.run().await {
                    Ok(report) => Ok(HookOutcome::Directory {
                        migration: Some(report),
                    }),
                    Err(e) => {
                        self.migrated.store(false, Ordering::SeqCst);
                        Err(e.into())
                    }
                }
            }
            HostEvent::GroupSheetRendered { group_id, .. } => Ok(HookOutcome::Group {
                summary: self.focus.summary(&group_id).await?,
            }),
        }
    }

    async fn prompt_owners(&self, actor_id: &ActorId) -> Result<(), HookError> {
        let Some(actor) = self.actors.get(actor_id).await? else {
            return Ok(());
        };
        for owner in &actor.owners {
            self.notifier.notify(Notification {
                audience: Audience::User {
                    user_id: owner.clone(),
                },
                level: NotificationLevel::Info,
                message: format!(
                    "{} finished a long rest and may change prepared spells.",
                    actor.name
                ),
            });
        }
        Ok(())
    }

    /// Create missing spellbooks for classes that need one. Only writers of
    /// the actor trigger creation; other viewers see the sheet as is.
    async fn ensure_spellbooks(
        &self,
        actor_id: &ActorId,
        user: &Participant,
    ) -> Result<Vec<SpellListId>, HookError> {
        let Some(actor) = self.actors.get(actor_id).await? else {
            return Ok(Vec::new());
        };
        if !actor.can_write(user) {
            return Ok(Vec::new());
        }
        let mut created = Vec::new();
        for class in &actor.classes {
            if !self.spellbooks.needs_spellbook(&actor, &class.identifier).await? {
                continue;
            }
            let existing = match actor.spellbook_id(&class.identifier) {
                Some(id) => self.catalog.get_list(id).await?.is_some(),
                None => false,
            };
            if existing {
                continue;
            }
            let book = self
                .spellbooks
                .ensure_spellbook(user, actor_id, &class.identifier)
                .await?;
            created.push(book.id().clone());
        }
        Ok(created)
    }
}
