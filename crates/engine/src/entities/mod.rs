//! Entity modules - Domain capability encapsulation.
//!
//! Each module wraps repository ports and provides the building blocks for use cases.

pub mod catalog;
pub mod settings;

pub use catalog::Catalog;
pub use settings::{Settings, SettingsError};
