//! Domain Events
//!
//! Coarse-grained events representing significant state changes. Use cases
//! publish them after the owning document write has been confirmed; the
//! engine's session cache and host notifications subscribe to them.

use serde::{Deserialize, Serialize};

use crate::entities::{PreparationDiff, SpellListKindTag};
use crate::ids::{ActorId, SpellListId, UserId};
use crate::swap::{SwapKind, SwapStatus, SwapTrigger};
use crate::value_objects::ClassIdentifier;

/// What happened to a spell list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListChange {
    Created,
    SpellsChanged,
    Renamed,
    Restored,
    Deleted,
}

/// Domain event for significant state changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    // Preparation
    #[serde(rename_all = "camelCase")]
    PreparationCommitted {
        actor_id: ActorId,
        class: ClassIdentifier,
        diff: PreparationDiff,
        /// Swap rule violations let through by a lenient enforcement setting.
        warnings: Vec<String>,
    },

    // Swap windows
    #[serde(rename_all = "camelCase")]
    SwapWindowOpened {
        actor_id: ActorId,
        class: ClassIdentifier,
        kind: SwapKind,
        trigger: SwapTrigger,
    },
    #[serde(rename_all = "camelCase")]
    SwapWindowCancelled {
        actor_id: ActorId,
        class: ClassIdentifier,
        kind: SwapKind,
        from: SwapStatus,
    },

    // Curation
    #[serde(rename_all = "camelCase")]
    SpellListChanged {
        list_id: SpellListId,
        kind: SpellListKindTag,
        change: ListChange,
    },
    #[serde(rename_all = "camelCase")]
    RegistryChanged { list_id: SpellListId, enabled: bool },
    #[serde(rename_all = "camelCase")]
    VisibilityChanged { list_id: SpellListId, hidden: bool },

    // Party
    #[serde(rename_all = "camelCase")]
    FocusChanged {
        group_id: ActorId,
        user_id: Option<UserId>,
        member_id: Option<ActorId>,
        focus: Option<String>,
    },
}

impl DomainEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PreparationCommitted { .. } => "preparation_committed",
            Self::SwapWindowOpened { .. } => "swap_window_opened",
            Self::SwapWindowCancelled { .. } => "swap_window_cancelled",
            Self::SpellListChanged { .. } => "spell_list_changed",
            Self::RegistryChanged { .. } => "registry_changed",
            Self::VisibilityChanged { .. } => "visibility_changed",
            Self::FocusChanged { .. } => "focus_changed",
        }
    }

    pub fn actor_id(&self) -> Option<&ActorId> {
        match self {
            Self::PreparationCommitted { actor_id, .. }
            | Self::SwapWindowOpened { actor_id, .. }
            | Self::SwapWindowCancelled { actor_id, .. } => Some(actor_id),
            Self::FocusChanged { group_id, .. } => Some(group_id),
            Self::SpellListChanged { .. }
            | Self::RegistryChanged { .. }
            | Self::VisibilityChanged { .. } => None,
        }
    }

    pub fn list_id(&self) -> Option<&SpellListId> {
        match self {
            Self::SpellListChanged { list_id, .. }
            | Self::RegistryChanged { list_id, .. }
            | Self::VisibilityChanged { list_id, .. } => Some(list_id),
            _ => None,
        }
    }
}
