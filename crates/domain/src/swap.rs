//! Cantrip and spell swap windows
//!
//! Each (actor, class, kind) carries one [`SwapTracking`] record. A rule
//! qualifying trigger (long rest, level-up) opens a window with a snapshot of
//! the set at that moment; commits are then judged against the snapshot by
//! [`evaluate`].
//!
//! # State machine
//!
//! ```text
//! Closed --trigger--> Open --unlearn--> Unlearned --learn--> Completed
//!                       \---learn----> Learned ---unlearn--/
//! Open | Unlearned | Learned --cancel--> Closed
//! ```
//!
//! `Completed` is terminal until the next trigger instance.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::{HostEventId, SpellId};

/// Event that can open a swap window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SwapTrigger {
    LongRest,
    LevelUp,
}

impl std::fmt::Display for SwapTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwapTrigger::LongRest => write!(f, "longRest"),
            SwapTrigger::LevelUp => write!(f, "levelUp"),
        }
    }
}

/// Cantrips and leveled spells are tracked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SwapKind {
    Cantrip,
    Spell,
}

impl SwapKind {
    pub const ALL: [SwapKind; 2] = [SwapKind::Cantrip, SwapKind::Spell];
}

impl std::fmt::Display for SwapKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwapKind::Cantrip => write!(f, "cantrip"),
            SwapKind::Spell => write!(f, "spell"),
        }
    }
}

/// How an open window judges commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WindowMode {
    /// One unlearn, paired with a learn.
    #[default]
    Swap,
    /// Prepared casters after a long rest: any set within the cap.
    Reprepare,
}

// ============================================================================
// State
// ============================================================================

/// The five swap states. Only open states carry a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SwapState {
    #[default]
    Closed,
    Open {
        snapshot: BTreeSet<SpellId>,
    },
    Unlearned {
        snapshot: BTreeSet<SpellId>,
        unlearned: SpellId,
    },
    Learned {
        snapshot: BTreeSet<SpellId>,
        learned: SpellId,
    },
    Completed {
        snapshot: BTreeSet<SpellId>,
        unlearned: SpellId,
        learned: SpellId,
    },
}

/// Fieldless mirror of [`SwapState`] for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SwapStatus {
    Closed,
    Open,
    Unlearned,
    Learned,
    Completed,
}

impl SwapState {
    pub fn status(&self) -> SwapStatus {
        match self {
            SwapState::Closed => SwapStatus::Closed,
            SwapState::Open { .. } => SwapStatus::Open,
            SwapState::Unlearned { .. } => SwapStatus::Unlearned,
            SwapState::Learned { .. } => SwapStatus::Learned,
            SwapState::Completed { .. } => SwapStatus::Completed,
        }
    }

    pub fn snapshot(&self) -> Option<&BTreeSet<SpellId>> {
        match self {
            SwapState::Closed => None,
            SwapState::Open { snapshot }
            | SwapState::Unlearned { snapshot, .. }
            | SwapState::Learned { snapshot, .. }
            | SwapState::Completed { snapshot, .. } => Some(snapshot),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, SwapState::Closed)
    }

    /// Open, unlearned or learned.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            SwapState::Open { .. } | SwapState::Unlearned { .. } | SwapState::Learned { .. }
        )
    }

    /// Internal consistency of a stored state.
    pub fn is_consistent(&self) -> bool {
        match self {
            SwapState::Closed | SwapState::Open { .. } => true,
            SwapState::Unlearned { snapshot, unlearned } => snapshot.contains(unlearned),
            SwapState::Learned { snapshot, learned } => !snapshot.contains(learned),
            SwapState::Completed {
                snapshot,
                unlearned,
                learned,
            } => snapshot.contains(unlearned) && !snapshot.contains(learned),
        }
    }
}

// ============================================================================
// Tracking record
// ============================================================================

/// Persisted window for one (actor, class, kind).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapTracking {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<SwapTrigger>,
    #[serde(default)]
    pub mode: WindowMode,
    /// Trigger instance that opened the window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<HostEventId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub state: SwapState,
}

/// Outcome of firing a trigger at a tracking record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    Opened,
    /// A new trigger instance replaced a previous window.
    Replaced { previous: SwapStatus },
    /// Same trigger instance seen again.
    AlreadyOpen,
}

impl SwapTracking {
    pub fn status(&self) -> SwapStatus {
        self.state.status()
    }

    pub fn is_open_for(&self, event_id: &HostEventId) -> bool {
        !self.state.is_closed() && self.event_id.as_ref() == Some(event_id)
    }

    /// Open (or reopen) a window for a trigger instance.
    ///
    /// Repeating the same `event_id` is a no-op whatever the current state.
    pub fn open(
        &mut self,
        trigger: SwapTrigger,
        mode: WindowMode,
        event_id: HostEventId,
        snapshot: BTreeSet<SpellId>,
        now: DateTime<Utc>,
    ) -> OpenOutcome {
        if self.event_id.as_ref() == Some(&event_id) && !self.state.is_closed() {
            return OpenOutcome::AlreadyOpen;
        }
        let previous = self.state.status();
        *self = SwapTracking {
            trigger: Some(trigger),
            mode,
            event_id: Some(event_id),
            opened_at: Some(now),
            state: SwapState::Open { snapshot },
        };
        if previous == SwapStatus::Closed {
            OpenOutcome::Opened
        } else {
            OpenOutcome::Replaced { previous }
        }
    }

    /// Close a pending window. Completed and closed windows cannot be cancelled.
    pub fn cancel(&mut self) -> Result<SwapStatus, DomainError> {
        let status = self.state.status();
        if !self.state.is_pending() {
            return Err(DomainError::invalid_state_transition(format!(
                "Cannot cancel a swap window in state {:?}",
                status
            )));
        }
        *self = SwapTracking::default();
        Ok(status)
    }

    /// Reset to closed. Used when the stored record is inconsistent.
    pub fn reset(&mut self) {
        *self = SwapTracking::default();
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Why a requested set is not allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapViolation {
    /// More spells than the cap for this kind.
    CapExceeded { requested: usize, max: usize },
    /// Removal while no window is open.
    UnlearnWithoutWindow { unlearned: BTreeSet<SpellId> },
    /// More than one removal inside a swap window.
    TooManyUnlearned { unlearned: BTreeSet<SpellId> },
    /// More than one addition inside a swap window.
    TooManyLearned { learned: BTreeSet<SpellId> },
    /// A completed swap was changed.
    CompletedSwapChanged,
}

impl SwapViolation {
    /// Cap violations are rejected whatever the enforcement setting.
    pub fn is_cap(&self) -> bool {
        matches!(self, SwapViolation::CapExceeded { .. })
    }
}

impl std::fmt::Display for SwapViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn join(ids: &BTreeSet<SpellId>) -> String {
            ids.iter().map(SpellId::as_str).collect::<Vec<_>>().join(", ")
        }
        match self {
            SwapViolation::CapExceeded { requested, max } => {
                write!(f, "{} selected but only {} allowed", requested, max)
            }
            SwapViolation::UnlearnWithoutWindow { unlearned } => {
                write!(f, "no swap window is open to unlearn {}", join(unlearned))
            }
            SwapViolation::TooManyUnlearned { unlearned } => {
                write!(f, "only one spell may be swapped, got {}", join(unlearned))
            }
            SwapViolation::TooManyLearned { learned } => {
                write!(f, "only one spell may be learned, got {}", join(learned))
            }
            SwapViolation::CompletedSwapChanged => {
                write!(f, "the swap for this window is already complete")
            }
        }
    }
}

/// Accepted change for one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOutcome {
    pub unlearned: BTreeSet<SpellId>,
    pub learned: BTreeSet<SpellId>,
    pub next: SwapState,
}

/// Judge a requested set for one kind against its tracking record.
///
/// `persisted` is the current set, used as baseline while no window is open.
/// `requested` and `persisted` must contain only spells of the evaluated kind.
pub fn evaluate(
    tracking: &SwapTracking,
    persisted: &BTreeSet<SpellId>,
    requested: &BTreeSet<SpellId>,
    cap: usize,
) -> Result<SwapOutcome, SwapViolation> {
    let baseline = tracking.state.snapshot().unwrap_or(persisted);
    let unlearned: BTreeSet<SpellId> = baseline.difference(requested).cloned().collect();
    let learned: BTreeSet<SpellId> = requested.difference(baseline).cloned().collect();

    // Growth is capped; shrinking an already over-cap set is allowed.
    if requested.len() > cap && requested.len() > persisted.len() {
        return Err(SwapViolation::CapExceeded {
            requested: requested.len(),
            max: cap,
        });
    }

    let next = match &tracking.state {
        SwapState::Closed => {
            if !unlearned.is_empty() {
                return Err(SwapViolation::UnlearnWithoutWindow { unlearned });
            }
            SwapState::Closed
        }
        SwapState::Open { snapshot } if tracking.mode == WindowMode::Reprepare => SwapState::Open {
            snapshot: snapshot.clone(),
        },
        SwapState::Completed {
            snapshot,
            unlearned: done_out,
            learned: done_in,
        } => {
            let keeps_swap = unlearned.len() == 1
                && unlearned.contains(done_out)
                && learned.len() == 1
                && learned.contains(done_in);
            if !keeps_swap {
                return Err(SwapViolation::CompletedSwapChanged);
            }
            SwapState::Completed {
                snapshot: snapshot.clone(),
                unlearned: done_out.clone(),
                learned: done_in.clone(),
            }
        }
        SwapState::Open { snapshot }
        | SwapState::Unlearned { snapshot, .. }
        | SwapState::Learned { snapshot, .. } => {
            if unlearned.len() > 1 {
                return Err(SwapViolation::TooManyUnlearned { unlearned });
            }
            if learned.len() > 1 {
                return Err(SwapViolation::TooManyLearned { learned });
            }
            next_swap_state(snapshot, &unlearned, &learned)
        }
    };

    Ok(SwapOutcome {
        unlearned,
        learned,
        next,
    })
}

/// State after a valid swap-mode commit: at most one unlearn and one learn.
fn next_swap_state(
    snapshot: &BTreeSet<SpellId>,
    unlearned: &BTreeSet<SpellId>,
    learned: &BTreeSet<SpellId>,
) -> SwapState {
    let snapshot = snapshot.clone();
    let learn = learned.iter().next().cloned();
    let unlearn = unlearned.iter().next().cloned();

    match (unlearn, learn) {
        (None, None) => SwapState::Open { snapshot },
        (Some(unlearned), None) => SwapState::Unlearned { snapshot, unlearned },
        (None, Some(learned)) => SwapState::Learned { snapshot, learned },
        (Some(unlearned), Some(learned)) => SwapState::Completed {
            snapshot,
            unlearned,
            learned,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ids(ids: &[&str]) -> BTreeSet<SpellId> {
        ids.iter().map(|id| SpellId::new(*id).unwrap()).collect()
    }

    fn id(id: &str) -> SpellId {
        SpellId::new(id).unwrap()
    }

    fn event(id: &str) -> HostEventId {
        HostEventId::new(id).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn open_window(snapshot: &[&str], mode: WindowMode) -> SwapTracking {
        let mut tracking = SwapTracking::default();
        tracking.open(SwapTrigger::LongRest, mode, event("rest-1"), ids(snapshot), now());
        tracking
    }

    #[test]
    fn one_in_one_out_completes_the_swap() {
        let tracking = open_window(&["c1", "c2", "c3"], WindowMode::Swap);
        let outcome = evaluate(
            &tracking,
            &ids(&["c1", "c2", "c3"]),
            &ids(&["c1", "c2", "c4"]),
            3,
        )
        .unwrap();
        assert_eq!(outcome.unlearned, ids(&["c3"]));
        assert_eq!(outcome.learned, ids(&["c4"]));
        assert_eq!(outcome.next.status(), SwapStatus::Completed);
    }

    #[test]
    fn two_out_is_rejected() {
        let tracking = open_window(&["c1", "c2", "c3"], WindowMode::Swap);
        let result = evaluate(
            &tracking,
            &ids(&["c1", "c2", "c3"]),
            &ids(&["c1", "c4", "c5"]),
            3,
        );
        assert_eq!(
            result,
            Err(SwapViolation::TooManyUnlearned {
                unlearned: ids(&["c2", "c3"])
            })
        );
    }

    #[test]
    fn one_out_two_in_is_rejected_even_with_free_capacity() {
        let tracking = open_window(&["c1", "c2", "c3"], WindowMode::Swap);
        let result = evaluate(
            &tracking,
            &ids(&["c1", "c2", "c3"]),
            &ids(&["c1", "c2", "c4", "c5"]),
            4,
        );
        assert_eq!(
            result,
            Err(SwapViolation::TooManyLearned {
                learned: ids(&["c4", "c5"])
            })
        );

        let completed = SwapTracking {
            state: SwapState::Completed {
                snapshot: ids(&["c1", "c2", "c3"]),
                unlearned: id("c3"),
                learned: id("c4"),
            },
            ..tracking
        };
        let extra = evaluate(
            &completed,
            &ids(&["c1", "c2", "c4"]),
            &ids(&["c1", "c2", "c4", "c5"]),
            4,
        );
        assert_eq!(extra, Err(SwapViolation::CompletedSwapChanged));
    }

    #[test]
    fn partial_progress_moves_through_intermediate_states() {
        let mut tracking = open_window(&["c1", "c2", "c3"], WindowMode::Swap);

        let outcome =
            evaluate(&tracking, &ids(&["c1", "c2", "c3"]), &ids(&["c1", "c2"]), 3).unwrap();
        assert_eq!(
            outcome.next,
            SwapState::Unlearned {
                snapshot: ids(&["c1", "c2", "c3"]),
                unlearned: id("c3")
            }
        );
        tracking.state = outcome.next;

        let outcome =
            evaluate(&tracking, &ids(&["c1", "c2"]), &ids(&["c1", "c2", "c5"]), 3).unwrap();
        assert_eq!(outcome.next.status(), SwapStatus::Completed);
    }

    #[test]
    fn undoing_a_pending_unlearn_returns_to_open() {
        let mut tracking = open_window(&["c1", "c2"], WindowMode::Swap);
        tracking.state = SwapState::Unlearned {
            snapshot: ids(&["c1", "c2"]),
            unlearned: id("c2"),
        };
        let outcome = evaluate(&tracking, &ids(&["c1"]), &ids(&["c1", "c2"]), 2).unwrap();
        assert_eq!(outcome.next.status(), SwapStatus::Open);
    }

    #[test]
    fn closed_window_only_allows_fills() {
        let tracking = SwapTracking::default();
        let ok = evaluate(&tracking, &ids(&["c1"]), &ids(&["c1", "c2"]), 3).unwrap();
        assert_eq!(ok.next, SwapState::Closed);
        assert_eq!(ok.learned, ids(&["c2"]));

        let err = evaluate(&tracking, &ids(&["c1", "c2"]), &ids(&["c1", "c3"]), 3).unwrap_err();
        assert!(matches!(err, SwapViolation::UnlearnWithoutWindow { .. }));
        assert!(!err.is_cap());
    }

    #[test]
    fn cap_applies_in_every_mode() {
        let tracking = open_window(&["s1"], WindowMode::Reprepare);
        let err = evaluate(&tracking, &ids(&["s1"]), &ids(&["s2", "s3"]), 1).unwrap_err();
        assert!(err.is_cap());
    }

    #[test]
    fn reprepare_accepts_any_set_and_stays_open() {
        let tracking = open_window(&["s1", "s2", "s3"], WindowMode::Reprepare);
        let outcome = evaluate(
            &tracking,
            &ids(&["s1", "s2", "s3"]),
            &ids(&["s4", "s5", "s6"]),
            3,
        )
        .unwrap();
        assert_eq!(outcome.next.status(), SwapStatus::Open);
        assert_eq!(outcome.unlearned.len(), 3);
    }

    #[test]
    fn completed_swap_must_be_kept() {
        let mut tracking = open_window(&["c1", "c2", "c3"], WindowMode::Swap);
        tracking.state = SwapState::Completed {
            snapshot: ids(&["c1", "c2", "c3"]),
            unlearned: id("c3"),
            learned: id("c4"),
        };
        let same = evaluate(&tracking, &ids(&["c1", "c2", "c4"]), &ids(&["c1", "c2", "c4"]), 3);
        assert!(same.is_ok());
        let changed = evaluate(&tracking, &ids(&["c1", "c2", "c4"]), &ids(&["c1", "c3", "c4"]), 3);
        assert_eq!(changed, Err(SwapViolation::CompletedSwapChanged));
    }

    #[test]
    fn reopening_same_trigger_instance_is_noop() {
        let mut tracking = open_window(&["c1"], WindowMode::Swap);
        tracking.state = SwapState::Completed {
            snapshot: ids(&["c1"]),
            unlearned: id("c1"),
            learned: id("c2"),
        };
        let outcome = tracking.open(
            SwapTrigger::LongRest,
            WindowMode::Swap,
            event("rest-1"),
            ids(&["c2"]),
            now(),
        );
        assert_eq!(outcome, OpenOutcome::AlreadyOpen);
        assert_eq!(tracking.status(), SwapStatus::Completed);

        let outcome = tracking.open(
            SwapTrigger::LongRest,
            WindowMode::Swap,
            event("rest-2"),
            ids(&["c2"]),
            now(),
        );
        assert_eq!(
            outcome,
            OpenOutcome::Replaced {
                previous: SwapStatus::Completed
            }
        );
        assert_eq!(tracking.state.snapshot(), Some(&ids(&["c2"])));
    }

    #[test]
    fn cancel_only_from_pending_states() {
        let mut tracking = open_window(&["c1"], WindowMode::Swap);
        assert_eq!(tracking.cancel().unwrap(), SwapStatus::Open);
        assert!(tracking.state.is_closed());
        assert!(tracking.event_id.is_none());
        assert!(tracking.cancel().is_err());
    }

    #[test]
    fn inconsistent_states_are_detected() {
        let state = SwapState::Unlearned {
            snapshot: ids(&["c1"]),
            unlearned: id("c9"),
        };
        assert!(!state.is_consistent());
    }

    #[test]
    fn tracking_serializes_flat() {
        let tracking = open_window(&["c1"], WindowMode::Swap);
        let value = serde_json::to_value(&tracking).unwrap();
        assert_eq!(value["state"], "open");
        assert_eq!(value["trigger"], "longRest");
        assert_eq!(value["snapshot"], serde_json::json!(["c1"]));
        let back: SwapTracking = serde_json::from_value(value).unwrap();
        assert_eq!(back, tracking);

        let closed = serde_json::to_value(SwapTracking::default()).unwrap();
        assert_eq!(closed, serde_json::json!({"mode": "swap", "state": "closed"}));
    }
}
