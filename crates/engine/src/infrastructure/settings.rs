//! Module settings storage.
//!
//! World-level options are one JSON blob. The SQLite store keeps it in a
//! single-row-per-scope table; the in-memory store backs tests and worlds
//! without a configured database.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use spellbook_domain::ModuleSettings;
use sqlx::{Row, SqlitePool};
use tokio::sync::RwLock;

use crate::infrastructure::ports::{ClockPort, RepoError, SettingsRepo};

const WORLD_SCOPE: &str = "world";

/// SQLite implementation for module settings storage.
pub struct SqliteSettingsRepo {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
}

impl SqliteSettingsRepo {
    pub async fn new(db_path: &Path, clock: Arc<dyn ClockPort>) -> Result<Self, RepoError> {
        let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", db_path.display()))
            .await
            .map_err(|e| RepoError::database("settings", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS module_settings (
                scope TEXT PRIMARY KEY NOT NULL,
                settings_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| RepoError::database("settings", e))?;

        Ok(Self { pool, clock })
    }
}

#[async_trait]
impl SettingsRepo for SqliteSettingsRepo {
    async fn get(&self) -> Result<Option<ModuleSettings>, RepoError> {
        let row = sqlx::query("SELECT settings_json FROM module_settings WHERE scope = ?")
            .bind(WORLD_SCOPE)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("settings", e))?;

        match row {
            Some(row) => {
                let json: String = row.get("settings_json");
                let settings = serde_json::from_str(&json)
                    .map_err(|e| RepoError::corrupted("ModuleSettings", WORLD_SCOPE, e))?;
                Ok(Some(settings))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, settings: &ModuleSettings) -> Result<(), RepoError> {
        let json = serde_json::to_string(settings).map_err(RepoError::serialization)?;
        let now = self.clock.now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO module_settings (scope, settings_json, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(scope) DO UPDATE SET
                settings_json = excluded.settings_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(WORLD_SCOPE)
        .bind(json)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("settings", e))?;

        Ok(())
    }
}

/// Process-local settings.
#[derive(Default)]
pub struct InMemorySettingsRepo {
    settings: RwLock<Option<ModuleSettings>>,
}

impl InMemorySettingsRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: ModuleSettings) -> Self {
        Self {
            settings: RwLock::new(Some(settings)),
        }
    }
}

#[async_trait]
impl SettingsRepo for InMemorySettingsRepo {
    async fn get(&self) -> Result<Option<ModuleSettings>, RepoError> {
        Ok(self.settings.read().await.clone())
    }

    async fn save(&self, settings: &ModuleSettings) -> Result<(), RepoError> {
        *self.settings.write().await = Some(settings.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use chrono::Utc;
    use spellbook_domain::{EnforcementBehavior, SpellListId};

    async fn sqlite_repo(dir: &tempfile::TempDir) -> SqliteSettingsRepo {
        let path = dir.path().join("settings.db");
        SqliteSettingsRepo::new(&path, Arc::new(FixedClock(Utc::now())))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn sqlite_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let repo = sqlite_repo(&dir).await;
        assert_eq!(repo.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn sqlite_upserts_the_world_blob() {
        let dir = tempfile::tempdir().unwrap();
        let repo = sqlite_repo(&dir).await;

        let mut settings = ModuleSettings::default();
        settings
            .hidden_spell_lists
            .insert(SpellListId::new("JournalEntry.a").unwrap());
        repo.save(&settings).await.unwrap();

        settings.enforcement_behavior = EnforcementBehavior::NotifyGm;
        repo.save(&settings).await.unwrap();

        let stored = repo.get().await.unwrap().unwrap();
        assert_eq!(stored, settings);
    }

    #[tokio::test]
    async fn sqlite_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let repo = sqlite_repo(&dir).await;
            let settings = ModuleSettings {
                spell_comparison_max: 5,
                ..Default::default()
            };
            repo.save(&settings).await.unwrap();
        }
        let reopened = sqlite_repo(&dir).await;
        assert_eq!(reopened.get().await.unwrap().unwrap().spell_comparison_max, 5);
    }

    #[tokio::test]
    async fn in_memory_round_trips() {
        let repo = InMemorySettingsRepo::new();
        assert_eq!(repo.get().await.unwrap(), None);
        repo.save(&ModuleSettings::default()).await.unwrap();
        assert_eq!(repo.get().await.unwrap(), Some(ModuleSettings::default()));
    }
}
