//! Process configuration read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use spellbook_domain::{PackId, UserId};

pub const DEFAULT_MODULE_PACK: &str = "spell-book.custom-spell-lists";
const DEFAULT_DELEGATION_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_INDEX_TTL_SECS: u64 = 3_600;
const DEFAULT_HOOK_RETENTION_SECS: u64 = 3_600;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
    #[error("{key} is invalid: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a delegated write waits for a privileged answer.
    pub delegation_timeout: Duration,
    /// SQLite settings database; `None` keeps settings in memory.
    pub settings_db: Option<PathBuf>,
    /// JSON seed for the in-memory document store.
    pub data_path: Option<PathBuf>,
    /// Pack holding module-authored lists.
    pub module_pack: PackId,
    pub index_ttl: Duration,
    /// How long a host event id is remembered for duplicate detection.
    pub hook_retention: Duration,
    /// GM whose session answers delegated queries in this process.
    pub responder: Option<UserId>,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let delegation_ms = parse_positive(
            "SPELLBOOK_DELEGATION_TIMEOUT_MS",
            non_blank("SPELLBOOK_DELEGATION_TIMEOUT_MS"),
            DEFAULT_DELEGATION_TIMEOUT_MS,
        )?;
        let ttl_secs = parse_positive(
            "SPELLBOOK_INDEX_TTL_SECS",
            non_blank("SPELLBOOK_INDEX_TTL_SECS"),
            DEFAULT_INDEX_TTL_SECS,
        )?;
        let retention_secs = parse_positive(
            "SPELLBOOK_HOOK_RETENTION_SECS",
            non_blank("SPELLBOOK_HOOK_RETENTION_SECS"),
            DEFAULT_HOOK_RETENTION_SECS,
        )?;
        let module_pack = PackId::new(
            non_blank("SPELLBOOK_MODULE_PACK").unwrap_or_else(|| DEFAULT_MODULE_PACK.to_string()),
        )
        .map_err(|e| ConfigError::Invalid {
            key: "SPELLBOOK_MODULE_PACK",
            message: e.to_string(),
        })?;

        let responder = non_blank("SPELLBOOK_GM_USER")
            .map(UserId::new)
            .transpose()
            .map_err(|e| ConfigError::Invalid {
                key: "SPELLBOOK_GM_USER",
                message: e.to_string(),
            })?;

        Ok(Self {
            delegation_timeout: Duration::from_millis(delegation_ms),
            settings_db: non_blank("SPELLBOOK_SETTINGS_DB").map(PathBuf::from),
            data_path: non_blank("SPELLBOOK_DATA_PATH").map(PathBuf::from),
            module_pack,
            index_ttl: Duration::from_secs(ttl_secs),
            hook_retention: Duration::from_secs(retention_secs),
            responder,
        })
    }
}

fn parse_positive(
    key: &'static str,
    raw: Option<String>,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidNumber { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<EngineConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.delegation_timeout, Duration::from_secs(10));
        assert_eq!(config.module_pack.as_str(), DEFAULT_MODULE_PACK);
        assert!(config.settings_db.is_none());
        assert_eq!(config.hook_retention, Duration::from_secs(3_600));
    }

    #[test]
    fn overrides_are_read() {
        let config = config(&[
            ("SPELLBOOK_DELEGATION_TIMEOUT_MS", "250"),
            ("SPELLBOOK_SETTINGS_DB", "/tmp/spellbook.db"),
            ("SPELLBOOK_MODULE_PACK", "world.my-lists"),
            ("SPELLBOOK_GM_USER", "gm-1"),
            ("SPELLBOOK_HOOK_RETENTION_SECS", "60"),
        ])
        .unwrap();
        assert_eq!(config.delegation_timeout, Duration::from_millis(250));
        assert_eq!(config.settings_db, Some(PathBuf::from("/tmp/spellbook.db")));
        assert_eq!(config.module_pack.as_str(), "world.my-lists");
        assert_eq!(config.responder.as_ref().map(UserId::as_str), Some("gm-1"));
        assert_eq!(config.hook_retention, Duration::from_secs(60));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = config(&[("SPELLBOOK_DELEGATION_TIMEOUT_MS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { .. }));
    }
}
