//! Error types for port operations.

use spellbook_domain::ErrorKind;
use spellbook_shared::ErrorCode;

/// Repository operation errors with context for debugging.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Document not found - includes entity type and ID for actionable error messages.
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Store operation failed - includes operation name for tracing.
    #[error("Database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Document exists but is malformed beyond repair.
    #[error("Corrupted {entity_type} {id}: {message}")]
    Corrupted {
        entity_type: &'static str,
        id: String,
        message: String,
    },

    /// Business constraint violated.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl RepoError {
    /// Create a NotFound error with entity type and ID context.
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Create a Database error with operation context.
    pub fn database(operation: &'static str, message: impl ToString) -> Self {
        Self::Database {
            operation,
            message: message.to_string(),
        }
    }

    /// Create a Serialization error.
    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }

    /// Create a Corrupted error.
    pub fn corrupted(entity_type: &'static str, id: impl ToString, message: impl ToString) -> Self {
        Self::Corrupted {
            entity_type,
            id: id.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a ConstraintViolation error.
    pub fn constraint(message: impl ToString) -> Self {
        Self::ConstraintViolation(message.to_string())
    }

    /// Check if this is a NotFound error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_corrupted(&self) -> bool {
        matches!(self, Self::Corrupted { .. })
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Corrupted { .. } => ErrorKind::Corruption,
            Self::ConstraintViolation(_) => ErrorKind::Invalid,
            Self::Database { .. } | Self::Serialization(_) => ErrorKind::Internal,
        }
    }
}

/// Errors from asking a privileged participant to act on our behalf.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DelegationError {
    /// Nobody able to answer, or no answer in time.
    #[error("Delegated operation unavailable: {0}")]
    Unavailable(String),

    /// The privileged side answered with an error.
    #[error("Delegated operation rejected ({code:?}): {message}")]
    Rejected { code: ErrorCode, message: String },

    /// The answer could not be delivered or decoded.
    #[error("Delegation transport error: {0}")]
    Transport(String),
}

impl DelegationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::Rejected { code, .. } => ErrorKind::from(*code),
            Self::Transport(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_errors_map_onto_kinds() {
        assert_eq!(RepoError::not_found("Actor", "a").kind(), ErrorKind::NotFound);
        assert_eq!(
            RepoError::corrupted("SpellList", "l", "spells is not a sequence").kind(),
            ErrorKind::Corruption
        );
        assert_eq!(RepoError::database("settings", "locked").kind(), ErrorKind::Internal);
    }

    #[test]
    fn rejected_delegation_keeps_remote_kind() {
        let err = DelegationError::Rejected {
            code: ErrorCode::Forbidden,
            message: "nope".into(),
        };
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(
            DelegationError::Unavailable("no GM".into()).kind(),
            ErrorKind::Unavailable
        );
    }
}
