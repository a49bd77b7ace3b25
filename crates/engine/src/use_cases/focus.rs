//! Party focus on group actors.
//!
//! A group actor records which focus each user picked and which focus each
//! member actor carries. Players rarely own the group, so their writes are
//! forwarded to a GM; the GM side re-checks the requester before applying.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use spellbook_domain::{
    Actor, ActorId, DomainError, DomainEvent, ErrorKind, FocusOption, Participant, UserId,
};
use spellbook_shared::{DelegatedQuery, FocusRequest, QueryEnvelope};

use crate::entities::{Settings, SettingsError};
use crate::infrastructure::locks::KeyedLocks;
use crate::infrastructure::ports::{
    response_data, ActorRepo, DelegationError, DelegationPort, EventPublisher, RepoError,
};

#[derive(Debug, thiserror::Error)]
pub enum FocusError {
    #[error("Actor not found: {0}")]
    ActorNotFound(ActorId),
    #[error("Actor {0} is not a group")]
    NotAGroup(ActorId),
    #[error("Unknown focus option '{0}'")]
    UnknownFocus(String),
    #[error("User {user_id} may not change focus for {target}")]
    PermissionDenied { user_id: UserId, target: String },
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Delegation(#[from] DelegationError),
}

impl FocusError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ActorNotFound(_) => ErrorKind::NotFound,
            Self::NotAGroup(_) | Self::UnknownFocus(_) => ErrorKind::Invalid,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::Domain(e) => e.kind(),
            Self::Settings(e) => e.kind(),
            Self::Repo(e) => e.kind(),
            Self::Delegation(e) => e.kind(),
        }
    }
}

/// A focus id with its display name, when the option still exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusAssignment {
    pub focus_id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusSummary {
    pub group_id: ActorId,
    pub options: Vec<FocusOption>,
    pub by_user: BTreeMap<UserId, FocusAssignment>,
    pub by_member: BTreeMap<ActorId, FocusAssignment>,
}

enum Target {
    User(UserId),
    Member(ActorId),
}

pub struct PartyFocus {
    actors: Arc<dyn ActorRepo>,
    settings: Arc<Settings>,
    delegation: Arc<dyn DelegationPort>,
    events: Arc<dyn EventPublisher>,
    timeout: Duration,
    locks: Arc<KeyedLocks<ActorId>>,
}

impl PartyFocus {
    pub fn new(
        actors: Arc<dyn ActorRepo>,
        settings: Arc<Settings>,
        delegation: Arc<dyn DelegationPort>,
        events: Arc<dyn EventPublisher>,
        timeout: Duration,
        locks: Arc<KeyedLocks<ActorId>>,
    ) -> Self {
        Self {
            actors,
            settings,
            delegation,
            events,
            timeout,
            locks,
        }
    }

    /// Set or clear a user's focus. Players may only set their own.
    pub async fn set_user_focus(
        &self,
        participant: &Participant,
        group_id: &ActorId,
        user_id: &UserId,
        focus: Option<String>,
    ) -> Result<(), FocusError> {
        if !participant.is_gm() && participant.user_id() != user_id {
            return Err(FocusError::PermissionDenied {
                user_id: participant.user_id().clone(),
                target: user_id.to_string(),
            });
        }
        let focus = self.validate_focus(focus).await?;
        let group = self.require_group(group_id).await?;
        if group.can_write(participant) {
            return self.apply(group_id, Target::User(user_id.clone()), focus).await;
        }
        let request = FocusRequest {
            group_id: group_id.to_string(),
            target_id: user_id.to_string(),
            focus_id: focus,
        };
        self.delegate(participant, DelegatedQuery::SetUserFocus { request }).await
    }

    /// Set or clear a member actor's focus. Needs GM or ownership of the member.
    pub async fn set_actor_focus(
        &self,
        participant: &Participant,
        group_id: &ActorId,
        member_id: &ActorId,
        focus: Option<String>,
    ) -> Result<(), FocusError> {
        let member = self.require_actor(member_id).await?;
        if !member.can_write(participant) {
            return Err(FocusError::PermissionDenied {
                user_id: participant.user_id().clone(),
                target: member_id.to_string(),
            });
        }
        let focus = self.validate_focus(focus).await?;
        let group = self.require_group(group_id).await?;
        if group.can_write(participant) {
            return self.apply(group_id, Target::Member(member_id.clone()), focus).await;
        }
        let request = FocusRequest {
            group_id: group_id.to_string(),
            target_id: member_id.to_string(),
            focus_id: focus,
        };
        self.delegate(participant, DelegatedQuery::SetActorFocus { request }).await
    }

    /// Apply a user focus forwarded by `requester`.
    pub async fn apply_delegated_user_focus(
        &self,
        requester: &UserId,
        request: FocusRequest,
    ) -> Result<(), FocusError> {
        let group_id = ActorId::new(request.group_id)?;
        let user_id = UserId::new(request.target_id)?;
        if &user_id != requester {
            return Err(FocusError::PermissionDenied {
                user_id: requester.clone(),
                target: user_id.to_string(),
            });
        }
        let focus = self.validate_focus(request.focus_id).await?;
        self.require_group(&group_id).await?;
        self.apply(&group_id, Target::User(user_id), focus).await
    }

    /// Apply a member focus forwarded by `requester`.
    pub async fn apply_delegated_actor_focus(
        &self,
        requester: &UserId,
        request: FocusRequest,
    ) -> Result<(), FocusError> {
        let group_id = ActorId::new(request.group_id)?;
        let member_id = ActorId::new(request.target_id)?;
        let member = self.require_actor(&member_id).await?;
        if !member.can_write(&Participant::player(requester.clone())) {
            return Err(FocusError::PermissionDenied {
                user_id: requester.clone(),
                target: member_id.to_string(),
            });
        }
        let focus = self.validate_focus(request.focus_id).await?;
        self.require_group(&group_id).await?;
        self.apply(&group_id, Target::Member(member_id), focus).await
    }

    pub async fn summary(&self, group_id: &ActorId) -> Result<FocusSummary, FocusError> {
        let group = self.require_group(group_id).await?;
        let options = self.settings.get().await?.focus_options;
        let assign = |focus_id: &String| FocusAssignment {
            focus_id: focus_id.clone(),
            name: options
                .iter()
                .find(|o| &o.id == focus_id)
                .map(|o| o.name.clone()),
        };
        let by_user = group
            .flags
            .user_focus
            .iter()
            .map(|(user, focus)| (user.clone(), assign(focus)))
            .collect();
        let by_member = group
            .flags
            .actor_focus
            .iter()
            .map(|(member, focus)| (member.clone(), assign(focus)))
            .collect();
        Ok(FocusSummary {
            group_id: group_id.clone(),
            options: options.clone(),
            by_user,
            by_member,
        })
    }

    async fn apply(
        &self,
        group_id: &ActorId,
        target: Target,
        focus: Option<String>,
    ) -> Result<(), FocusError> {
        let _guard = self.locks.lock(group_id).await;
        let mut group = self.require_group(group_id).await?;
        let changed = match &target {
            Target::User(user) => set_entry(&mut group.flags.user_focus, user, focus.clone()),
            Target::Member(member) => {
                set_entry(&mut group.flags.actor_focus, member, focus.clone())
            }
        };
        if !changed {
            return Ok(());
        }
        self.actors.save(&group).await?;

        let (user_id, member_id) = match target {
            Target::User(user) => (Some(user), None),
            Target::Member(member) => (None, Some(member)),
        };
        tracing::info!(group_id = %group_id, ?user_id, ?member_id, ?focus, "Party focus changed");
        self.events.publish(DomainEvent::FocusChanged {
            group_id: group_id.clone(),
            user_id,
            member_id,
            focus,
        });
        Ok(())
    }

    async fn delegate(
        &self,
        participant: &Participant,
        query: DelegatedQuery,
    ) -> Result<(), FocusError> {
        let query_type = query.query_type();
        tracing::debug!(user_id = %participant.user_id(), query_type, "Delegating focus change");
        let envelope = QueryEnvelope::new(participant.user_id().to_string(), query);
        let result = self.delegation.delegate(envelope, self.timeout).await;
        if let Err(e) = &result {
            tracing::warn!(query_type, error = %e, "Focus change not delegated");
        }
        response_data(result?)?;
        Ok(())
    }

    /// Blank ids clear the focus; anything else must be a configured option.
    async fn validate_focus(&self, focus: Option<String>) -> Result<Option<String>, FocusError> {
        let Some(focus) = focus.map(|f| f.trim().to_string()).filter(|f| !f.is_empty()) else {
            return Ok(None);
        };
        if !self.settings.get().await?.has_focus(&focus) {
            return Err(FocusError::UnknownFocus(focus));
        }
        Ok(Some(focus))
    }

    async fn require_actor(&self, id: &ActorId) -> Result<Actor, FocusError> {
        self.actors
            .get(id)
            .await?
            .ok_or_else(|| FocusError::ActorNotFound(id.clone()))
    }

    async fn require_group(&self, id: &ActorId) -> Result<Actor, FocusError> {
        let actor = self.require_actor(id).await?;
        if !actor.is_group() {
            return Err(FocusError::NotAGroup(id.clone()));
        }
        Ok(actor)
    }
}

fn set_entry<K: Ord + Clone>(
    map: &mut BTreeMap<K, String>,
    key: &K,
    focus: Option<String>,
) -> bool {
    match focus {
        Some(focus) => map.insert(key.clone(), focus.clone()).as_ref() != Some(&focus),
        None => map.remove(key).is_some(),
    }
}
