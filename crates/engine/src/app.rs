//! Application state and composition.

use std::sync::Arc;

use spellbook_domain::{ActorId, SpellcastingSystem};

use crate::api::{HookDispatcher, PrivilegedQueryHandler};
use crate::entities::{Catalog, Settings};
use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::locks::KeyedLocks;
use crate::infrastructure::ports::{
    ActorRepo, ClockPort, DelegationPort, EventPublisher, NotificationPort, PackRepo, RandomPort,
    SettingsRepo, SpellListRepo, SpellRepo, UsageEventRepo, UserDataRepo,
};
use crate::use_cases;

/// Main application state.
///
/// Holds all repository ports, use cases and the host-facing entry points.
pub struct App {
    pub repositories: Repositories,
    pub use_cases: UseCases,
    pub catalog: Arc<Catalog>,
    pub settings: Arc<Settings>,
    pub hooks: Arc<HookDispatcher>,
    pub queries: Arc<PrivilegedQueryHandler>,
}

/// Container for all repository ports.
#[derive(Clone)]
pub struct Repositories {
    pub settings: Arc<dyn SettingsRepo>,
    pub actors: Arc<dyn ActorRepo>,
    pub lists: Arc<dyn SpellListRepo>,
    pub spells: Arc<dyn SpellRepo>,
    pub packs: Arc<dyn PackRepo>,
    pub usage: Arc<dyn UsageEventRepo>,
    pub user_data: Arc<dyn UserDataRepo>,
}

/// Collaborators that are not document stores.
#[derive(Clone)]
pub struct Services {
    pub clock: Arc<dyn ClockPort>,
    pub random: Arc<dyn RandomPort>,
    pub system: Arc<dyn SpellcastingSystem>,
    pub delegation: Arc<dyn DelegationPort>,
    pub events: Arc<dyn EventPublisher>,
    pub notifier: Arc<dyn NotificationPort>,
}

/// Container for all use cases.
pub struct UseCases {
    pub rules: Arc<use_cases::RuleResolver>,
    pub resolver: Arc<use_cases::SpellListResolver>,
    pub preparation: Arc<use_cases::Preparation>,
    pub swaps: Arc<use_cases::SwapWindows>,
    pub spellbooks: Arc<use_cases::PersonalSpellbooks>,
    pub curation: Arc<use_cases::Curation>,
    pub curation_gateway: Arc<use_cases::CurationGateway>,
    pub registry: Arc<use_cases::Registry>,
    pub analytics: Arc<use_cases::Analytics>,
    pub focus: Arc<use_cases::PartyFocus>,
    pub migration: Arc<use_cases::Migration>,
}

impl App {
    /// Create a new App with all dependencies wired up.
    pub fn new(repos: Repositories, services: Services, config: &EngineConfig) -> Self {
        let catalog = Arc::new(Catalog::new(
            repos.packs.clone(),
            repos.lists.clone(),
            repos.spells.clone(),
            config.module_pack.clone(),
            config.index_ttl,
        ));
        let settings = Arc::new(Settings::new(repos.settings.clone()));
        Self::assemble(repos, services, config, catalog, settings)
    }

    /// Wire use cases around an existing catalog and settings entity.
    pub(crate) fn assemble(
        repos: Repositories,
        services: Services,
        config: &EngineConfig,
        catalog: Arc<Catalog>,
        settings: Arc<Settings>,
    ) -> Self {
        // Actor documents are written by several use cases; they share one lock set.
        let actor_locks: Arc<KeyedLocks<ActorId>> = Arc::new(KeyedLocks::new());

        let rules = Arc::new(use_cases::RuleResolver::new(services.system.clone()));
        let resolver = Arc::new(use_cases::SpellListResolver::new(catalog.clone()));

        let preparation = Arc::new(use_cases::Preparation::new(
            repos.actors.clone(),
            catalog.clone(),
            settings.clone(),
            rules.clone(),
            resolver.clone(),
            services.events.clone(),
            services.notifier.clone(),
            actor_locks.clone(),
        ));
        let swaps = Arc::new(use_cases::SwapWindows::new(
            repos.actors.clone(),
            settings.clone(),
            rules.clone(),
            services.events.clone(),
            services.clock.clone(),
            actor_locks.clone(),
        ));
        let spellbooks = Arc::new(use_cases::PersonalSpellbooks::new(
            repos.actors.clone(),
            catalog.clone(),
            settings.clone(),
            rules.clone(),
            services.events.clone(),
            services.clock.clone(),
            services.random.clone(),
            actor_locks.clone(),
        ));

        let registry = Arc::new(use_cases::Registry::new(
            settings.clone(),
            catalog.clone(),
            services.events.clone(),
        ));
        let curation = Arc::new(use_cases::Curation::new(
            catalog.clone(),
            settings.clone(),
            registry.clone(),
            services.events.clone(),
            services.clock.clone(),
            services.random.clone(),
        ));
        let curation_gateway = Arc::new(use_cases::CurationGateway::new(
            curation.clone(),
            services.delegation.clone(),
            config.delegation_timeout,
        ));

        let analytics = Arc::new(use_cases::Analytics::new(
            repos.usage.clone(),
            repos.user_data.clone(),
            services.clock.clone(),
            services.random.clone(),
        ));
        let focus = Arc::new(use_cases::PartyFocus::new(
            repos.actors.clone(),
            settings.clone(),
            services.delegation.clone(),
            services.events.clone(),
            config.delegation_timeout,
            actor_locks.clone(),
        ));
        let migration = Arc::new(use_cases::Migration::new(
            repos.actors.clone(),
            settings.clone(),
            catalog.clone(),
            services.notifier.clone(),
            actor_locks,
        ));

        let hooks = Arc::new(HookDispatcher::new(
            repos.actors.clone(),
            catalog.clone(),
            swaps.clone(),
            spellbooks.clone(),
            focus.clone(),
            migration.clone(),
            services.notifier.clone(),
            config.hook_retention,
        ));
        let queries = Arc::new(PrivilegedQueryHandler::new(curation.clone(), focus.clone()));

        let use_cases = UseCases {
            rules,
            resolver,
            preparation,
            swaps,
            spellbooks,
            curation,
            curation_gateway,
            registry,
            analytics,
            focus,
            migration,
        };

        Self {
            repositories: repos,
            use_cases,
            catalog,
            settings,
            hooks,
            queries,
        }
    }
}
