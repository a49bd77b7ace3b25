//! Curation entry point for any participant.
//!
//! GMs run requests locally. Everyone else forwards them to a connected GM and
//! waits for the answer; nothing is applied locally on that path.

use std::sync::Arc;
use std::time::Duration;

use spellbook_domain::Participant;
use spellbook_shared::{CurationRequest, DelegatedQuery, QueryEnvelope};

use super::{Curation, CurationError, CurationOutcome};
use crate::infrastructure::ports::{response_data, DelegationPort};

pub struct CurationGateway {
    curation: Arc<Curation>,
    delegation: Arc<dyn DelegationPort>,
    timeout: Duration,
}

impl CurationGateway {
    pub fn new(
        curation: Arc<Curation>,
        delegation: Arc<dyn DelegationPort>,
        timeout: Duration,
    ) -> Self {
        Self {
            curation,
            delegation,
            timeout,
        }
    }

    pub async fn execute(
        &self,
        participant: &Participant,
        request: CurationRequest,
    ) -> Result<CurationOutcome, CurationError> {
        if participant.is_gm() {
            return self.curation.execute(request).await;
        }

        let name = request.name();
        tracing::debug!(
            user_id = %participant.user_id(),
            request = name,
            "Delegating curation request"
        );
        let envelope = QueryEnvelope::new(
            participant.user_id().to_string(),
            DelegatedQuery::Curation { request },
        );
        let data = response_data(self.delegation.delegate(envelope, self.timeout).await?)?
            .ok_or_else(|| CurationError::Decode(format!("{} answered without data", name)))?;
        serde_json::from_value(data).map_err(|e| CurationError::Decode(e.to_string()))
    }
}
