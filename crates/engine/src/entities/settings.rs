//! Module settings entity.
//!
//! World options live in one settings document. Every write goes through a
//! single mutex, so registry and visibility toggles are serialized globally.

use std::sync::Arc;

use spellbook_domain::{ComparisonSet, DomainError, ErrorKind, ModuleSettings};
use tokio::sync::Mutex;

use crate::infrastructure::ports::{RepoError, SettingsRepo};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

impl SettingsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SettingsError::Repo(e) => e.kind(),
            SettingsError::Invalid(e) => e.kind(),
        }
    }
}

pub struct Settings {
    repo: Arc<dyn SettingsRepo>,
    write: Mutex<()>,
}

impl Settings {
    pub fn new(repo: Arc<dyn SettingsRepo>) -> Self {
        Self {
            repo,
            write: Mutex::new(()),
        }
    }

    /// Current settings. Returns defaults if none have been saved.
    pub async fn get(&self) -> Result<ModuleSettings, SettingsError> {
        Ok(self.repo.get().await?.unwrap_or_default())
    }

    /// Read-modify-write under the settings lock.
    ///
    /// Nothing is written when `apply` fails, when the result does not
    /// validate, or when nothing changed.
    pub async fn update<T, F>(&self, apply: F) -> Result<T, SettingsError>
    where
        F: FnOnce(&mut ModuleSettings) -> Result<T, DomainError>,
    {
        let _guard = self.write.lock().await;
        let before = self.get().await?;
        let mut settings = before.clone();
        let out = apply(&mut settings)?;
        if settings != before {
            settings.validate()?;
            self.repo.save(&settings).await?;
        }
        Ok(out)
    }

    /// An empty comparison selection sized by `spellComparisonMax`.
    pub async fn comparison(&self) -> Result<ComparisonSet, SettingsError> {
        Ok(ComparisonSet::new(self.get().await?.spell_comparison_max)?)
    }

    /// Replace the whole document.
    pub async fn replace(&self, settings: ModuleSettings) -> Result<ModuleSettings, SettingsError> {
        settings.validate()?;
        let _guard = self.write.lock().await;
        self.repo.save(&settings).await?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::MockSettingsRepo;
    use spellbook_domain::SpellListId;

    #[tokio::test]
    async fn missing_settings_read_as_defaults() {
        let mut repo = MockSettingsRepo::new();
        repo.expect_get().returning(|| Ok(None));
        let settings = Settings::new(Arc::new(repo));
        assert_eq!(settings.get().await.unwrap(), ModuleSettings::default());
    }

    #[tokio::test]
    async fn unchanged_updates_do_not_write() {
        let mut repo = MockSettingsRepo::new();
        repo.expect_get().returning(|| Ok(None));
        repo.expect_save().never();
        let settings = Settings::new(Arc::new(repo));

        let hidden = settings
            .update(|s| Ok(s.is_hidden(&SpellListId::new("S1").unwrap())))
            .await
            .unwrap();
        assert!(!hidden);
    }

    #[tokio::test]
    async fn invalid_results_are_not_saved() {
        let mut repo = MockSettingsRepo::new();
        repo.expect_get().returning(|| Ok(None));
        repo.expect_save().never();
        let settings = Settings::new(Arc::new(repo));

        let err = settings
            .update(|s| {
                s.spell_comparison_max = 1;
                Ok(())
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[tokio::test]
    async fn changes_are_saved_once() {
        let mut repo = MockSettingsRepo::new();
        repo.expect_get().returning(|| Ok(None));
        repo.expect_save()
            .withf(|s| s.is_registered(&SpellListId::new("S1").unwrap()))
            .times(1)
            .returning(|_| Ok(()));
        let settings = Settings::new(Arc::new(repo));

        settings
            .update(|s| {
                s.registry.insert(SpellListId::new("S1").unwrap(), true);
                Ok(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn comparison_capacity_follows_settings() {
        let mut repo = MockSettingsRepo::new();
        repo.expect_get().returning(|| {
            Ok(Some(ModuleSettings {
                spell_comparison_max: 4,
                ..ModuleSettings::default()
            }))
        });
        let settings = Settings::new(Arc::new(repo));

        let set = settings.comparison().await.unwrap();
        assert_eq!(set.max_size(), 4);
        assert!(set.is_empty());
    }
}
