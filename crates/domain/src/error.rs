//! Unified error types for the domain layer
//!
//! Provides a common error type that can be used across all domain operations,
//! and the coarse [`ErrorKind`] taxonomy every engine error maps onto.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Validation failed (e.g., invalid field values)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Invalid ID format
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Entity not found
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Business rule violation
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Parse error (for value objects)
    #[error("Parse error: {0}")]
    Parse(String),

    /// State transition not allowed
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// A bounded set is at capacity
    #[error("{what} exceeds capacity: {requested}/{max}")]
    CapacityExceeded {
        what: &'static str,
        requested: usize,
        max: usize,
    },
}

impl DomainError {
    /// Creates a validation error for business rule violations.
    ///
    /// Use this when domain invariants or constraints are violated:
    /// - Required fields are empty or missing
    /// - Values are outside allowed ranges
    /// - Names collide with existing catalog entries
    ///
    /// # Example
    /// ```ignore
    /// if name.is_empty() {
    ///     return Err(DomainError::validation("List name cannot be empty"));
    /// }
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Create a constraint violation error
    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::Constraint(msg.into())
    }

    /// Create an invalid ID error
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Creates a parse error for string-to-type conversion failures.
    ///
    /// Use this in `FromStr` implementations when the input string
    /// doesn't match any known variant or format.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an invalid state transition error
    pub fn invalid_state_transition(msg: impl Into<String>) -> Self {
        Self::InvalidStateTransition(msg.into())
    }

    /// Create a capacity error
    pub fn capacity_exceeded(what: &'static str, requested: usize, max: usize) -> Self {
        Self::CapacityExceeded {
            what,
            requested,
            max,
        }
    }

    /// Map onto the caller-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            _ => ErrorKind::Invalid,
        }
    }
}

/// Caller-facing error taxonomy.
///
/// Read paths recover from `Corruption` locally; write paths surface
/// `Invalid`, `PermissionDenied` or `Unavailable` and leave state unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    NotFound,
    Invalid,
    PermissionDenied,
    Unavailable,
    Corruption,
    /// Storage or transport failure that fits none of the above.
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Invalid => "invalid",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Corruption => "corruption",
            ErrorKind::Internal => "internal",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = DomainError::validation("name cannot be empty");
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(err.to_string(), "Validation failed: name cannot be empty");
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[test]
    fn test_not_found_error() {
        let err = DomainError::not_found("SpellList", "Compendium.dnd5e.lists.JournalEntry.cleric");
        assert!(matches!(err, DomainError::NotFound { .. }));
        assert!(err.to_string().contains("SpellList"));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_constraint_error() {
        let err = DomainError::constraint("standard lists are read-only");
        assert_eq!(
            err.to_string(),
            "Constraint violation: standard lists are read-only"
        );
    }

    #[test]
    fn test_capacity_error() {
        let err = DomainError::capacity_exceeded("prepared spells", 5, 4);
        assert_eq!(err.to_string(), "prepared spells exceeds capacity: 5/4");
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[test]
    fn test_error_kind_serializes_camel_case() {
        let json = serde_json::to_string(&ErrorKind::PermissionDenied).unwrap();
        assert_eq!(json, "\"permissionDenied\"");
    }
}
