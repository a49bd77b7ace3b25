//! Privileged side of delegated queries.
//!
//! A GM session registers on the delegation bus and answers queries forwarded
//! by players. Every query is re-validated here; the requester's own checks
//! are not trusted.

use std::sync::Arc;

use spellbook_domain::{ErrorKind, UserId};
use spellbook_shared::{DelegatedQuery, ErrorCode, QueryEnvelope, ResponseResult};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::infrastructure::delegation::DelegatedCall;
use crate::use_cases::{Curation, PartyFocus};

pub struct PrivilegedQueryHandler {
    curation: Arc<Curation>,
    focus: Arc<PartyFocus>,
}

impl PrivilegedQueryHandler {
    pub fn new(curation: Arc<Curation>, focus: Arc<PartyFocus>) -> Self {
        Self { curation, focus }
    }

    pub async fn handle(&self, envelope: QueryEnvelope) -> ResponseResult {
        let query_type = envelope.query.query_type();
        let query_id = envelope.query_id;
        let requester = match UserId::new(envelope.requested_by) {
            Ok(user) => user,
            Err(e) => return ResponseResult::error(ErrorCode::Invalid, e.to_string()),
        };
        tracing::debug!(query_type, %query_id, requester = %requester, "Handling delegated query");

        match envelope.query {
            DelegatedQuery::SetUserFocus { request } => {
                match self.focus.apply_delegated_user_focus(&requester, request).await {
                    Ok(()) => ResponseResult::success_empty(),
                    Err(e) => error_result(query_type, e.kind(), &e),
                }
            }
            DelegatedQuery::SetActorFocus { request } => {
                match self.focus.apply_delegated_actor_focus(&requester, request).await {
                    Ok(()) => ResponseResult::success_empty(),
                    Err(e) => error_result(query_type, e.kind(), &e),
                }
            }
            DelegatedQuery::Curation { request } => match self.curation.execute(request).await {
                Ok(outcome) => ResponseResult::success(outcome),
                Err(e) => error_result(query_type, e.kind(), &e),
            },
        }
    }
}

/// Internal failures are logged in full and answered generically.
fn error_result(
    query_type: &str,
    kind: ErrorKind,
    error: &dyn std::fmt::Display,
) -> ResponseResult {
    if kind == ErrorKind::Internal {
        tracing::error!(query_type, error = %error, "Delegated query failed");
        return ResponseResult::error(
            ErrorCode::from(kind),
            format!("An error occurred while handling {}", query_type),
        );
    }
    tracing::info!(query_type, ?kind, error = %error, "Delegated query rejected");
    ResponseResult::error(ErrorCode::from(kind), error.to_string())
}

/// Answer delegated calls until cancelled or the bus drops the channel.
pub async fn serve_delegated_queries(
    mut calls: mpsc::Receiver<DelegatedCall>,
    handler: Arc<PrivilegedQueryHandler>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Delegated query responder stopping");
                break;
            }
            call = calls.recv() => {
                let Some(call) = call else {
                    tracing::info!("Delegation bus closed the responder channel");
                    break;
                };
                let query_id = call.envelope.query_id;
                if call.is_abandoned() {
                    tracing::warn!(%query_id, "Skipping delegated query the requester gave up on");
                    continue;
                }
                let result = handler.handle(call.envelope).await;
                if call.reply.send(result).is_err() {
                    tracing::warn!(%query_id, "Requester stopped waiting for the answer");
                }
            }
        }
    }
}
