//! Delegated query envelopes

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::requests::{CurationRequest, FocusRequest};

/// Who should answer a delegated query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetRole {
    /// Any connected GM.
    Gm,
}

/// Operations a non-privileged participant can ask a GM to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "queryType", rename_all = "camelCase")]
pub enum DelegatedQuery {
    SetUserFocus {
        #[serde(flatten)]
        request: FocusRequest,
    },
    SetActorFocus {
        #[serde(flatten)]
        request: FocusRequest,
    },
    Curation {
        request: CurationRequest,
    },
}

impl DelegatedQuery {
    pub fn query_type(&self) -> &'static str {
        match self {
            DelegatedQuery::SetUserFocus { .. } => "setUserFocus",
            DelegatedQuery::SetActorFocus { .. } => "setActorFocus",
            DelegatedQuery::Curation { .. } => "curation",
        }
    }
}

/// A query in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEnvelope {
    pub query_id: Uuid,
    pub target: TargetRole,
    /// User id of the requesting participant.
    pub requested_by: String,
    pub query: DelegatedQuery,
}

impl QueryEnvelope {
    pub fn new(requested_by: impl Into<String>, query: DelegatedQuery) -> Self {
        Self {
            query_id: Uuid::new_v4(),
            target: TargetRole::Gm,
            requested_by: requested_by.into(),
            query,
        }
    }
}
