//! Spellbook Engine - Main entry point.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spellbook_domain::Dnd5eSystem;
use spellbook_engine::api::serve_delegated_queries;
use spellbook_engine::app::{App, Services};
use spellbook_engine::infrastructure::{
    clock::{SystemClock, SystemRandom},
    config::EngineConfig,
    delegation::DelegationBus,
    events::{BroadcastEventBus, TracingNotifier},
    memory::{MemoryStore, StoreSeed},
    ports::{ClockPort, SettingsRepo},
    settings::{InMemorySettingsRepo, SqliteSettingsRepo},
};

const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spellbook_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Spellbook Engine");

    let config = EngineConfig::from_env()?;
    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock::new());

    let store = match &config.data_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading world data");
            MemoryStore::from_seed(StoreSeed::load(path).await?)?
        }
        None => MemoryStore::new(),
    };
    let store = Arc::new(store);

    let settings_repo: Arc<dyn SettingsRepo> = match &config.settings_db {
        Some(path) => {
            tracing::info!(path = %path.display(), "Opening settings database");
            Arc::new(SqliteSettingsRepo::new(path, clock.clone()).await?)
        }
        None => Arc::new(InMemorySettingsRepo::new()),
    };

    let events = Arc::new(BroadcastEventBus::new());
    let delegation = Arc::new(DelegationBus::new());
    let services = Services {
        clock,
        random: Arc::new(SystemRandom::new()),
        system: Arc::new(Dnd5eSystem::new()),
        delegation: delegation.clone(),
        events: events.clone(),
        notifier: Arc::new(TracingNotifier),
    };
    let app = Arc::new(App::new(store.repositories(settings_repo), services, &config));
    let cancel = CancellationToken::new();

    // Keep pack indexes in step with list writes
    let mut subscription = events.subscribe();
    let catalog = app.catalog.clone();
    let events_cancel = cancel.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = events_cancel.cancelled() => break,
                received = subscription.recv() => match received {
                    Ok(event) => catalog.apply_event(&event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Event subscriber lagged, refreshing catalog");
                        catalog.refresh().await;
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    });

    // Drop expired cache entries and forgotten hook event ids
    let sweep_catalog = app.catalog.clone();
    let sweep_hooks = app.hooks.clone();
    let sweep_cancel = cancel.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CACHE_SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = sweep_cancel.cancelled() => break,
                _ = interval.tick() => {
                    let purged = sweep_catalog.purge_expired().await;
                    if purged > 0 {
                        tracing::debug!(purged, "Expired cache entries dropped");
                    }
                    let forgotten = sweep_hooks.purge_seen();
                    if forgotten > 0 {
                        tracing::debug!(forgotten, "Expired host event ids dropped");
                    }
                }
            }
        }
    });

    let responder = match &config.responder {
        Some(gm) => {
            let calls = delegation.register(gm.clone());
            Some(tokio::spawn(serve_delegated_queries(
                calls,
                app.queries.clone(),
                cancel.clone(),
            )))
        }
        None => {
            tracing::info!("No GM responder configured, delegated writes will be unavailable");
            None
        }
    };

    match app.use_cases.migration.run().await {
        Ok(report) => tracing::info!(
            actors = report.actors_scanned,
            changed = report.changed_anything(),
            "Startup migration finished"
        ),
        Err(e) => tracing::error!(error = %e, "Startup migration failed"),
    }

    tracing::info!("Spellbook Engine ready");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    cancel.cancel();
    if let Some(responder) = responder {
        if let Err(e) = responder.await {
            tracing::warn!(error = %e, "Responder task ended abnormally");
        }
    }

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
