//! Validated name newtypes
//!
//! These newtypes ensure that names are valid by construction:
//! - Non-empty
//! - Within length limits
//! - Trimmed of leading/trailing whitespace

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Maximum length for list names
const MAX_NAME_LENGTH: usize = 200;

// ============================================================================
// ListName
// ============================================================================

/// A validated spell list name (non-empty, <=200 chars, trimmed)
///
/// Catalog uniqueness is case-insensitive; compare through [`ListName::folded`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ListName(String);

impl ListName {
    /// Create a new validated list name.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if:
    /// - The name is empty after trimming
    /// - The name exceeds 200 characters after trimming
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("Spell list name cannot be empty"));
        }
        if trimmed.chars().count() > MAX_NAME_LENGTH {
            return Err(DomainError::validation(format!(
                "Spell list name cannot exceed {} characters",
                MAX_NAME_LENGTH
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-folded key used for uniqueness checks.
    pub fn folded(&self) -> String {
        self.0.to_lowercase()
    }

    /// Case-insensitive equality.
    pub fn same_as(&self, other: &ListName) -> bool {
        self.folded() == other.folded()
    }

    /// Append a suffix, e.g. "Cleric" -> "Cleric (Modified)".
    pub fn with_suffix(&self, suffix: &str) -> Result<Self, DomainError> {
        Self::new(format!("{} {}", self.0, suffix))
    }
}

impl fmt::Display for ListName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ListName {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ListName> for String {
    fn from(name: ListName) -> String {
        name.0
    }
}
