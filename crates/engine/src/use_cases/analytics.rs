//! Spell usage analytics and per-user spell data.
//!
//! Usage events are append-only. The per-user aggregate is bumped only when
//! the store accepted an event as new, so replays never double count. A replay
//! rebuilds the aggregate from the log when an earlier bump was lost.

use std::sync::Arc;

use spellbook_domain::{
    ActorId, CastContext, ErrorKind, SpellId, UsageEvent, UsageEventId, UsageStats, UserId,
    UserSpellData,
};

use crate::infrastructure::locks::KeyedLocks;
use crate::infrastructure::ports::{ClockPort, RandomPort, RepoError, UsageEventRepo, UserDataRepo};

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl AnalyticsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Repo(e) => e.kind(),
        }
    }
}

pub struct Analytics {
    usage: Arc<dyn UsageEventRepo>,
    user_data: Arc<dyn UserDataRepo>,
    clock: Arc<dyn ClockPort>,
    random: Arc<dyn RandomPort>,
    locks: KeyedLocks<UserId>,
}

impl Analytics {
    pub fn new(
        usage: Arc<dyn UsageEventRepo>,
        user_data: Arc<dyn UserDataRepo>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        Self {
            usage,
            user_data,
            clock,
            random,
            locks: KeyedLocks::new(),
        }
    }

    /// Store an event. Returns `false` when the id was already recorded.
    pub async fn record(&self, event: UsageEvent) -> Result<bool, AnalyticsError> {
        let _guard = self.locks.lock(&event.user_id).await;
        if !self.usage.append(&event).await? {
            tracing::debug!(event_id = %event.id, "Usage event already recorded");
            self.reconcile(&event.user_id).await?;
            return Ok(false);
        }
        let mut data = self.load(&event.user_id).await?;
        data.record_usage(&event);
        self.user_data.save(&data).await?;
        tracing::debug!(
            user_id = %event.user_id,
            spell_id = %event.spell_id,
            context = ?event.context,
            "Spell cast recorded"
        );
        Ok(true)
    }

    /// Record a cast happening now under a fresh event id.
    pub async fn record_cast(
        &self,
        user_id: UserId,
        actor_id: Option<ActorId>,
        spell_id: SpellId,
        context: CastContext,
    ) -> Result<UsageEvent, AnalyticsError> {
        let event = UsageEvent {
            id: UsageEventId::from_uuid(self.random.gen_uuid()),
            user_id,
            actor_id,
            spell_id,
            timestamp: self.clock.now(),
            context,
        };
        self.record(event.clone()).await?;
        Ok(event)
    }

    /// Flip a favorite. Returns the new state.
    pub async fn toggle_favorite(
        &self,
        user_id: &UserId,
        spell_id: SpellId,
    ) -> Result<bool, AnalyticsError> {
        let _guard = self.locks.lock(user_id).await;
        let mut data = self.load(user_id).await?;
        let favorite = data.toggle_favorite(spell_id);
        self.user_data.save(&data).await?;
        Ok(favorite)
    }

    /// Blank notes delete the entry.
    pub async fn set_note(
        &self,
        user_id: &UserId,
        spell_id: SpellId,
        note: &str,
    ) -> Result<(), AnalyticsError> {
        let _guard = self.locks.lock(user_id).await;
        let mut data = self.load(user_id).await?;
        let before = data.clone();
        data.set_note(spell_id, note);
        if data != before {
            self.user_data.save(&data).await?;
        }
        Ok(())
    }

    pub async fn user_data(&self, user_id: &UserId) -> Result<UserSpellData, AnalyticsError> {
        self.load(user_id).await
    }

    pub async fn most_used(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<(SpellId, UsageStats)>, AnalyticsError> {
        let data = self.load(user_id).await?;
        Ok(data
            .most_used(limit)
            .into_iter()
            .map(|(id, stats)| (id.clone(), *stats))
            .collect())
    }

    /// Raw events for a user, oldest first.
    pub async fn history(&self, user_id: &UserId) -> Result<Vec<UsageEvent>, AnalyticsError> {
        let mut events = self.usage.list_for_user(user_id).await?;
        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(events)
    }

    /// Bring the aggregate back in line with the event log.
    async fn reconcile(&self, user_id: &UserId) -> Result<(), AnalyticsError> {
        let events = self.usage.list_for_user(user_id).await?;
        let mut data = self.load(user_id).await?;
        let stored = data.clone();
        data.rebuild_usage(&events);
        if data != stored {
            tracing::warn!(
                user_id = %user_id,
                events = events.len(),
                "Usage counters rebuilt from the event log"
            );
            self.user_data.save(&data).await?;
        }
        Ok(())
    }

    async fn load(&self, user_id: &UserId) -> Result<UserSpellData, AnalyticsError> {
        Ok(self
            .user_data
            .get(user_id)
            .await?
            .unwrap_or_else(|| UserSpellData::new(user_id.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{MockUsageEventRepo, MockUserDataRepo};
    use crate::infrastructure::clock::{FixedClock, SequentialRandom};
    use crate::test_fixtures::{spell_id, user_id, World};

    #[tokio::test]
    async fn replayed_events_count_once() {
        let world = World::new().await;
        let analytics = world.app().use_cases.analytics;
        let event = UsageEvent {
            id: UsageEventId::new(),
            user_id: user_id("player-1"),
            actor_id: None,
            spell_id: spell_id("bless"),
            timestamp: world.now(),
            context: CastContext::Combat,
        };

        assert!(analytics.record(event.clone()).await.unwrap());
        assert!(!analytics.record(event).await.unwrap());

        let data = analytics.user_data(&user_id("player-1")).await.unwrap();
        let stats = data.usage[&spell_id("bless")];
        assert_eq!(stats.count, 1);
        assert_eq!(stats.combat, 1);
    }

    #[tokio::test]
    async fn most_used_ranks_by_count() {
        let world = World::new().await;
        let analytics = world.app().use_cases.analytics;
        let user = user_id("player-1");
        for spell in ["bless", "shield", "shield", "fireball", "shield", "fireball"] {
            analytics
                .record_cast(user.clone(), None, spell_id(spell), CastContext::Unknown)
                .await
                .unwrap();
        }

        let top = analytics.most_used(&user, 2).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].0, spell_id("shield"));
        assert_eq!(top[0].1.count, 3);
        assert_eq!(top[1].0, spell_id("fireball"));
        assert_eq!(analytics.history(&user).await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn favorites_and_notes() {
        let world = World::new().await;
        let analytics = world.app().use_cases.analytics;
        let user = user_id("player-1");

        assert!(analytics.toggle_favorite(&user, spell_id("bless")).await.unwrap());
        analytics.set_note(&user, spell_id("bless"), "  concentration  ").await.unwrap();
        let data = analytics.user_data(&user).await.unwrap();
        assert!(data.favorites.contains(&spell_id("bless")));
        assert_eq!(data.notes[&spell_id("bless")], "concentration");

        assert!(!analytics.toggle_favorite(&user, spell_id("bless")).await.unwrap());
        analytics.set_note(&user, spell_id("bless"), " ").await.unwrap();
        let data = analytics.user_data(&user).await.unwrap();
        assert!(data.favorites.is_empty());
        assert!(data.notes.is_empty());
    }

    fn fixed_event() -> UsageEvent {
        UsageEvent {
            id: UsageEventId::new(),
            user_id: user_id("player-1"),
            actor_id: None,
            spell_id: spell_id("bless"),
            timestamp: chrono::Utc::now(),
            context: CastContext::Combat,
        }
    }

    fn analytics(usage: MockUsageEventRepo, user_data: MockUserDataRepo) -> Analytics {
        Analytics::new(
            Arc::new(usage),
            Arc::new(user_data),
            Arc::new(FixedClock(chrono::Utc::now())),
            Arc::new(SequentialRandom::default()),
        )
    }

    #[tokio::test]
    async fn duplicate_events_skip_the_aggregate_write() {
        let event = fixed_event();
        let mut counted = UserSpellData::new(user_id("player-1"));
        counted.record_usage(&event);

        let mut usage = MockUsageEventRepo::new();
        usage.expect_append().returning(|_| Ok(false));
        let log = vec![event.clone()];
        usage
            .expect_list_for_user()
            .returning(move |_| Ok(log.clone()));
        let mut user_data = MockUserDataRepo::new();
        user_data
            .expect_get()
            .returning(move |_| Ok(Some(counted.clone())));
        user_data.expect_save().never();

        let recorded = analytics(usage, user_data).record(event).await.unwrap();
        assert!(!recorded);
    }

    #[tokio::test]
    async fn retry_after_a_failed_aggregate_save_counts_the_event() {
        let event = fixed_event();
        let mut seq = mockall::Sequence::new();

        let mut usage = MockUsageEventRepo::new();
        usage
            .expect_append()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(true));
        usage
            .expect_append()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(false));
        let log = vec![event.clone()];
        usage
            .expect_list_for_user()
            .returning(move |_| Ok(log.clone()));

        let mut user_data = MockUserDataRepo::new();
        user_data.expect_get().returning(|_| Ok(None));
        let mut saves = mockall::Sequence::new();
        user_data
            .expect_save()
            .times(1)
            .in_sequence(&mut saves)
            .returning(|_| Err(RepoError::database("save_user_data", "disk full")));
        user_data
            .expect_save()
            .times(1)
            .in_sequence(&mut saves)
            .withf(|data| {
                data.usage
                    .get(&spell_id("bless"))
                    .map_or(false, |s| s.count == 1 && s.combat == 1)
            })
            .returning(|_| Ok(()));

        let analytics = analytics(usage, user_data);
        let err = analytics.record(event.clone()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(!analytics.record(event).await.unwrap());
    }
}
