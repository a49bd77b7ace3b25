use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Ids minted by this crate (events, delegated queries).
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            pub fn to_uuid(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

/// Ids owned by the host document store. They are opaque strings
/// (`Compendium.dnd5e.spells.Item.abc`, `Actor.xyz`, ...), ordered
/// lexically so every collection keyed by them iterates deterministically.
macro_rules! define_key {
    ($name:ident, $label:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Wrap a host id. Rejects blank ids.
            pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
                let value = value.into();
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(DomainError::invalid_id(concat!($label, " cannot be empty")));
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = DomainError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Host document ids
define_key!(SpellId, "Spell id");
define_key!(SpellListId, "Spell list id");
define_key!(ActorId, "Actor id");
define_key!(UserId, "User id");
define_key!(PackId, "Pack id");

// Host lifecycle events carry their own id so handlers can de-duplicate
define_key!(HostEventId, "Host event id");

// Locally minted ids
define_id!(UsageEventId);
define_id!(QueryId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_keys_are_trimmed() {
        let id = SpellId::new("  Compendium.dnd5e.spells.Item.bless ").unwrap();
        assert_eq!(id.as_str(), "Compendium.dnd5e.spells.Item.bless");
    }

    #[test]
    fn blank_host_keys_are_rejected() {
        assert!(matches!(
            SpellListId::new("   "),
            Err(DomainError::InvalidId(_))
        ));
    }

    #[test]
    fn host_keys_deserialize_through_validation() {
        let ok: Result<ActorId, _> = serde_json::from_str("\"Actor.abc\"");
        assert!(ok.is_ok());
        let blank: Result<ActorId, _> = serde_json::from_str("\"\"");
        assert!(blank.is_err());
    }

    #[test]
    fn host_keys_order_lexically() {
        let mut ids = vec![
            SpellId::new("c").unwrap(),
            SpellId::new("a").unwrap(),
            SpellId::new("b").unwrap(),
        ];
        ids.sort();
        let raw: Vec<&str> = ids.iter().map(|i| i.as_str()).collect();
        assert_eq!(raw, vec!["a", "b", "c"]);
    }
}
