//! Use cases - User story orchestration.
//!
//! Each module contains use cases for a specific area.
//! Use cases orchestrate across entity modules and ports to fulfill user stories.

pub mod analytics;
pub mod curation;
pub mod focus;
pub mod migration;
pub mod preparation;
pub mod registry;
pub mod resolver;
pub mod rules;
pub mod spellbook;
pub mod swap;

// Re-export main types
pub use analytics::{Analytics, AnalyticsError};
pub use curation::{Curation, CurationError, CurationGateway, CurationOutcome};
pub use focus::{FocusError, FocusSummary, PartyFocus};
pub use migration::{Migration, MigrationError, MigrationReport};
pub use preparation::{CommitOutcome, Preparation, PreparationError, PreparationView};
pub use registry::{RegisteredPool, Registry, RegistryError};
pub use resolver::{PoolSource, Resolution, SpellListResolver};
pub use rules::RuleResolver;
pub use spellbook::{LearnCost, LearnOutcome, PersonalSpellbooks, SpellbookError};
pub use swap::{
    repair_tracking, OpenedWindow, RestOutcome, SwapError, SwapWindowStatus, SwapWindows,
};
