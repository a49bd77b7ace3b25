//! External collaborator ports (delegation, events, notifications).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use spellbook_domain::{DomainEvent, UserId};
use spellbook_shared::{QueryEnvelope, ResponseResult};

use super::error::DelegationError;

// =============================================================================
// Privilege Delegation
// =============================================================================

/// RPC-style query to a privileged participant.
///
/// At-most-once from the caller's side: a timed out query is not retried.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DelegationPort: Send + Sync {
    async fn delegate(
        &self,
        envelope: QueryEnvelope,
        timeout: Duration,
    ) -> Result<ResponseResult, DelegationError>;
}

/// Unwrap a delegated answer into its data payload.
pub fn response_data(result: ResponseResult) -> Result<Option<serde_json::Value>, DelegationError> {
    match result {
        ResponseResult::Success { data } => Ok(data),
        ResponseResult::Error { code, message } => Err(DelegationError::Rejected { code, message }),
        ResponseResult::Unknown => Err(DelegationError::Transport(
            "unrecognized response status".to_string(),
        )),
    }
}

// =============================================================================
// Domain Events
// =============================================================================

#[cfg_attr(test, mockall::automock)]
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: DomainEvent);
}

// =============================================================================
// Notifications
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Audience {
    User { user_id: UserId },
    Gms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub audience: Audience,
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn gms(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            audience: Audience::Gms,
            level,
            message: message.into(),
        }
    }
}

/// User-visible messages. Rendering and localization belong to the host.
#[cfg_attr(test, mockall::automock)]
pub trait NotificationPort: Send + Sync {
    fn notify(&self, notification: Notification);
}
