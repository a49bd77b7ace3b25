//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Document access (host store, in-memory store, SQLite settings)
//! - Privilege delegation (ask a GM to write on our behalf)
//! - Domain events and user notifications
//! - Clock/Random (for testing)

mod error;
mod external;
mod repos;
mod testing;

// =============================================================================
// Repository Ports
// =============================================================================
pub use repos::{
    ActorRepo, PackRepo, SettingsRepo, SpellListRepo, SpellRepo, UsageEventRepo, UserDataRepo,
};

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{
    response_data, Audience, DelegationPort, EventPublisher, Notification, NotificationLevel,
    NotificationPort,
};

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use repos::{
    MockActorRepo, MockPackRepo, MockSettingsRepo, MockSpellListRepo, MockSpellRepo,
    MockUsageEventRepo, MockUserDataRepo,
};

#[cfg(test)]
pub use external::{MockDelegationPort, MockEventPublisher, MockNotificationPort};

#[cfg(test)]
pub use testing::MockClockPort;

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::{ClockPort, RandomPort};

// =============================================================================
// Error Types
// =============================================================================
pub use error::{DelegationError, RepoError};
