//! Shared test helpers.
//!
//! `World` is an in-memory host: a document store, a settings document,
//! recorded events and notifications, and a fixed clock. Use cases under test
//! are wired through `World::app` so they share the same store.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use spellbook_domain::{
    Actor, ActorClass, ActorId, ClassIdentifier, DomainEvent, Dnd5eSystem, ListName,
    ModuleSettings, Pack, PackId, Spell, SpellId, SpellList, SpellListId, UserId,
};

use crate::app::{App, Services};
use crate::entities::{Catalog, Settings};
use crate::infrastructure::clock::{FixedClock, SequentialRandom};
use crate::infrastructure::config::{EngineConfig, DEFAULT_MODULE_PACK};
use crate::infrastructure::delegation::DelegationBus;
use crate::infrastructure::memory::MemoryStore;
use crate::infrastructure::ports::{
    ActorRepo, DelegationPort, EventPublisher, Notification, NotificationPort, SettingsRepo,
};
use crate::infrastructure::settings::InMemorySettingsRepo;

// =============================================================================
// Id helpers
// =============================================================================

pub fn class(id: &str) -> ClassIdentifier {
    ClassIdentifier::new(id).unwrap()
}

pub fn list_id(id: &str) -> SpellListId {
    SpellListId::new(id).unwrap()
}

pub fn spell_id(id: &str) -> SpellId {
    SpellId::new(id).unwrap()
}

pub fn user_id(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

fn title(id: &str) -> String {
    id.split(['-', '.'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// Recording ports
// =============================================================================

#[derive(Default)]
pub struct RecordingEvents(Mutex<Vec<DomainEvent>>);

impl RecordingEvents {
    pub fn all(&self) -> Vec<DomainEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn of_type(&self, event_type: &str) -> Vec<DomainEvent> {
        self.all()
            .into_iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }
}

impl EventPublisher for RecordingEvents {
    fn publish(&self, event: DomainEvent) {
        self.0.lock().unwrap().push(event);
    }
}

#[derive(Default)]
pub struct RecordingNotifier(Mutex<Vec<Notification>>);

impl RecordingNotifier {
    pub fn all(&self) -> Vec<Notification> {
        self.0.lock().unwrap().clone()
    }
}

impl NotificationPort for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.0.lock().unwrap().push(notification);
    }
}

// =============================================================================
// World
// =============================================================================

pub struct World {
    pub store: Arc<MemoryStore>,
    pub catalog: Arc<Catalog>,
    pub settings: Arc<Settings>,
    pub events: Arc<RecordingEvents>,
    pub notifier: Arc<RecordingNotifier>,
    settings_repo: Arc<dyn SettingsRepo>,
    config: EngineConfig,
    clock: Arc<FixedClock>,
    random: Arc<SequentialRandom>,
}

impl World {
    /// An empty world holding only the module pack.
    pub async fn new() -> Self {
        let config = EngineConfig::from_lookup(|_| None).unwrap();
        let store = Arc::new(MemoryStore::new());
        store
            .ensure_pack(Pack::journal(
                PackId::new(DEFAULT_MODULE_PACK).unwrap(),
                "Custom Spell Lists",
                1_000,
            ))
            .await;
        let settings_repo: Arc<dyn SettingsRepo> = Arc::new(InMemorySettingsRepo::new());
        let repos = store.repositories(settings_repo.clone());
        let catalog = Arc::new(Catalog::new(
            repos.packs,
            repos.lists,
            repos.spells,
            config.module_pack.clone(),
            config.index_ttl,
        ));

        Self {
            store,
            catalog,
            settings: Arc::new(Settings::new(settings_repo.clone())),
            events: Arc::new(RecordingEvents::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            settings_repo,
            config,
            clock: Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())),
            random: Arc::new(SequentialRandom::default()),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.0
    }

    pub fn module_pack(&self) -> PackId {
        self.catalog.module_pack().clone()
    }

    /// An app with no GM reachable for delegation.
    pub fn app(&self) -> App {
        self.app_with_delegation(Arc::new(DelegationBus::new()))
    }

    pub fn app_with_delegation(&self, delegation: Arc<dyn DelegationPort>) -> App {
        let services = Services {
            clock: self.clock.clone(),
            random: self.random.clone(),
            system: Arc::new(Dnd5eSystem::new()),
            delegation,
            events: self.events.clone(),
            notifier: self.notifier.clone(),
        };
        App::assemble(
            self.store.repositories(self.settings_repo.clone()),
            services,
            &self.config,
            self.catalog.clone(),
            self.settings.clone(),
        )
    }

    // -------------------------------------------------------------------------
    // Packs, spells and lists
    // -------------------------------------------------------------------------

    pub async fn add_pack(&self, id: &str, sort_key: i64) -> PackId {
        let pack = PackId::new(id).unwrap();
        self.store
            .ensure_pack(Pack::journal(pack.clone(), title(id), sort_key))
            .await;
        pack
    }

    /// Make a pack unreadable, as the host does for packs a user cannot see.
    pub async fn lock_pack(&self, id: &str) {
        self.store
            .set_pack_locked(&PackId::new(id).unwrap(), true)
            .await;
    }

    pub async fn add_spell(&self, id: &str, level: u8, ritual: bool) -> Spell {
        let spell = Spell::new(spell_id(id), title(id), level).with_ritual(ritual);
        self.store.put_spell(spell.clone()).await;
        spell
    }

    pub fn standard_list(
        &self,
        id: &str,
        name: &str,
        identifier: &str,
        pack: &str,
        spells: &[&str],
    ) -> SpellList {
        SpellList::standard(
            list_id(id),
            ListName::new(name).unwrap(),
            class(identifier),
            PackId::new(pack).unwrap(),
            spells.iter().map(|s| spell_id(s)).collect(),
            self.now(),
        )
    }

    pub async fn add_list(&self, list: SpellList) -> SpellList {
        self.catalog.save_list(&list).await.unwrap();
        list
    }

    pub async fn list(&self, id: &SpellListId) -> SpellList {
        self.catalog.require_list(id).await.unwrap()
    }

    // -------------------------------------------------------------------------
    // Actors and settings
    // -------------------------------------------------------------------------

    /// A single-class caster owned by `player-1`, saved to the store.
    pub async fn caster(&self, id: &str, identifier: &str, level: u8) -> Actor {
        let name = id.trim_start_matches("Actor.");
        let actor = Actor::new(ActorId::new(id).unwrap(), title(name))
            .with_owner(user_id("player-1"))
            .with_class(ActorClass {
                identifier: class(identifier),
                name: title(identifier),
                levels: level,
                source_pack: None,
                subclass: None,
                ability_mod: 2,
            });
        self.save_actor(&actor).await;
        actor
    }

    pub async fn save_actor(&self, actor: &Actor) {
        ActorRepo::save(self.store.as_ref(), actor).await.unwrap();
    }

    pub async fn actor(&self, id: &ActorId) -> Actor {
        ActorRepo::get(self.store.as_ref(), id)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("actor {} not found", id))
    }

    pub async fn set_settings(&self, settings: ModuleSettings) {
        self.settings.replace(settings).await.unwrap();
    }
}
