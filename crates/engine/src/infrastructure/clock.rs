//! Clock and random implementations.

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

use crate::infrastructure::ports::{ClockPort, RandomPort};

const DOCUMENT_ID_LENGTH: usize = 16;

/// System clock - uses real time.
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// System random - uses real randomness.
pub struct SystemRandom;

impl SystemRandom {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomPort for SystemRandom {
    fn document_id(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(DOCUMENT_ID_LENGTH)
            .map(char::from)
            .collect()
    }

    fn gen_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Fixed clock for testing.
#[cfg(test)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Sequential ids for testing: `id00000000000001`, `id00000000000002`, ...
#[cfg(test)]
#[derive(Default)]
pub struct SequentialRandom(std::sync::atomic::AtomicU64);

#[cfg(test)]
impl RandomPort for SequentialRandom {
    fn document_id(&self) -> String {
        let n = self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
        format!("id{:014}", n)
    }

    fn gen_uuid(&self) -> Uuid {
        let n = self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
        Uuid::from_u128(u128::from(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_ids_are_alphanumeric() {
        let id = SystemRandom::new().document_id();
        assert_eq!(id.len(), DOCUMENT_ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn sequential_ids_are_distinct() {
        let random = SequentialRandom::default();
        assert_eq!(random.document_id(), "id00000000000001");
        assert_eq!(random.document_id(), "id00000000000002");
    }
}
