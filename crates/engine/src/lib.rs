//! Spellbook Engine library.
//!
//! Server-side logic for spell list resolution, preparation, swap windows,
//! personal spellbooks and list curation.
//!
//! ## Structure
//!
//! - `entities/` - Entity modules wrapping domain operations
//! - `use_cases/` - User story orchestration across entities
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `api/` - Host hook and delegated query entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod entities;
pub mod infrastructure;
pub mod use_cases;

/// Shared in-memory world for unit and scenario tests.
#[cfg(test)]
pub mod test_fixtures;

/// End-to-end scenarios driven through the host hooks.
#[cfg(test)]
mod e2e_tests;

pub use app::App;
