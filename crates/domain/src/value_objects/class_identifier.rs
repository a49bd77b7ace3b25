//! Class identifier slug

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Lower-case slug naming a class or subclass (`wizard`, `cleric_light`).
///
/// Spell lists, class rules and actor classes all join on this value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClassIdentifier(String);

impl ClassIdentifier {
    /// Create a validated identifier.
    ///
    /// Input is trimmed and lower-cased; only ASCII letters, digits, `-` and
    /// `_` are accepted afterwards.
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        let normalized = value.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(DomainError::validation("Class identifier cannot be empty"));
        }
        if normalized.len() > MAX_IDENTIFIER_LENGTH {
            return Err(DomainError::validation(format!(
                "Class identifier cannot exceed {} characters",
                MAX_IDENTIFIER_LENGTH
            )));
        }
        if let Some(bad) = normalized
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(DomainError::validation(format!(
                "Class identifier '{}' contains invalid character '{}'",
                normalized, bad
            )));
        }
        Ok(Self(normalized))
    }

    /// Derive an identifier from a display name ("Eldritch Knight" -> "eldritch-knight").
    pub fn from_name(name: &str) -> Result<Self, DomainError> {
        let mut slug = String::with_capacity(name.len());
        let mut pending_dash = false;
        for c in name.trim().chars() {
            if c.is_ascii_alphanumeric() || c == '_' {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(c.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }
        Self::new(slug)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ClassIdentifier {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for ClassIdentifier {
    type Error = DomainError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ClassIdentifier> for String {
    fn from(id: ClassIdentifier) -> String {
        id.0
    }
}
