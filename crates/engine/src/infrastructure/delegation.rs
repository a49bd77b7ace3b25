//! In-process delegation bus.
//!
//! Privileged participants register a responder channel; delegated queries
//! are routed to one of them and answered through a oneshot reply. With no
//! responder registered, or no answer before the timeout, the query fails as
//! unavailable and nothing is retried.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use spellbook_domain::UserId;
use spellbook_shared::{QueryEnvelope, ResponseResult};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::infrastructure::ports::{DelegationError, DelegationPort};

const RESPONDER_QUEUE: usize = 32;

/// A query waiting for a privileged answer.
#[derive(Debug)]
pub struct DelegatedCall {
    pub envelope: QueryEnvelope,
    pub reply: oneshot::Sender<ResponseResult>,
    /// The requester stops waiting at this instant.
    pub deadline: Instant,
}

impl DelegatedCall {
    /// The requester already gave up; running the query now would change
    /// state after it was told the operation failed.
    pub fn is_abandoned(&self) -> bool {
        self.reply.is_closed() || Instant::now() >= self.deadline
    }
}

#[derive(Default)]
pub struct DelegationBus {
    responders: DashMap<UserId, mpsc::Sender<DelegatedCall>>,
}

impl DelegationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a privileged participant. Replaces any earlier registration.
    pub fn register(&self, gm: UserId) -> mpsc::Receiver<DelegatedCall> {
        let (tx, rx) = mpsc::channel(RESPONDER_QUEUE);
        tracing::info!(user_id = %gm, "Delegation responder registered");
        self.responders.insert(gm, tx);
        rx
    }

    pub fn unregister(&self, gm: &UserId) -> bool {
        let removed = self.responders.remove(gm).is_some();
        if removed {
            tracing::info!(user_id = %gm, "Delegation responder unregistered");
        }
        removed
    }

    pub fn responder_count(&self) -> usize {
        self.responders.len()
    }

    /// Lowest user id wins so routing is stable across calls.
    fn pick_responder(&self) -> Option<(UserId, mpsc::Sender<DelegatedCall>)> {
        self.responders
            .iter()
            .min_by(|a, b| a.key().cmp(b.key()))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
    }
}

#[async_trait]
impl DelegationPort for DelegationBus {
    async fn delegate(
        &self,
        envelope: QueryEnvelope,
        timeout: Duration,
    ) -> Result<ResponseResult, DelegationError> {
        let query_type = envelope.query.query_type();
        let query_id = envelope.query_id;
        let Some((gm, tx)) = self.pick_responder() else {
            tracing::warn!(query_type, %query_id, "No privileged participant online");
            return Err(DelegationError::Unavailable(
                "no privileged participant is online".to_string(),
            ));
        };

        let deadline = Instant::now() + timeout;
        let (reply, answer) = oneshot::channel();
        let call = DelegatedCall {
            envelope,
            reply,
            deadline,
        };
        if tx.send(call).await.is_err() {
            self.unregister(&gm);
            return Err(DelegationError::Unavailable(format!(
                "privileged participant {} disconnected",
                gm
            )));
        }

        match tokio::time::timeout_at(deadline, answer).await {
            Ok(Ok(result)) => {
                tracing::debug!(query_type, %query_id, responder = %gm, "Delegated query answered");
                Ok(result)
            }
            Ok(Err(_)) => Err(DelegationError::Transport(format!(
                "responder {} dropped query {}",
                gm, query_id
            ))),
            Err(_) => {
                tracing::warn!(query_type, %query_id, ?timeout, "Delegated query timed out");
                Err(DelegationError::Unavailable(format!(
                    "no answer within {} ms",
                    timeout.as_millis()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spellbook_shared::{DelegatedQuery, FocusRequest};

    fn envelope() -> QueryEnvelope {
        QueryEnvelope::new(
            "player-1",
            DelegatedQuery::SetUserFocus {
                request: FocusRequest {
                    group_id: "Actor.party".into(),
                    target_id: "player-1".into(),
                    focus_id: Some("healing".into()),
                },
            },
        )
    }

    #[tokio::test]
    async fn no_responder_is_unavailable() {
        let bus = DelegationBus::new();
        let err = bus
            .delegate(envelope(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, DelegationError::Unavailable(_)));
    }

    #[tokio::test]
    async fn registered_responder_answers() {
        let bus = DelegationBus::new();
        let mut rx = bus.register(UserId::new("gm").unwrap());
        tokio::spawn(async move {
            if let Some(call) = rx.recv().await {
                let _ = call.reply.send(ResponseResult::success_empty());
            }
        });

        let result = bus.delegate(envelope(), Duration::from_secs(1)).await.unwrap();
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn silent_responder_times_out() {
        let bus = DelegationBus::new();
        let _rx = bus.register(UserId::new("gm").unwrap());
        let err = bus
            .delegate(envelope(), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, DelegationError::Unavailable(_)));
    }

    #[tokio::test]
    async fn timed_out_calls_are_marked_abandoned() {
        let bus = DelegationBus::new();
        let mut rx = bus.register(UserId::new("gm").unwrap());
        let err = bus
            .delegate(envelope(), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, DelegationError::Unavailable(_)));

        let call = rx.recv().await.unwrap();
        assert!(call.is_abandoned());
    }

    #[tokio::test]
    async fn closed_responder_is_dropped() {
        let bus = DelegationBus::new();
        drop(bus.register(UserId::new("gm").unwrap()));
        let err = bus
            .delegate(envelope(), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, DelegationError::Unavailable(_)));
        assert_eq!(bus.responder_count(), 0);
    }
}
