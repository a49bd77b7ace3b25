//! Value objects - Immutable objects defined by their attributes

mod class_identifier;
mod comparison;
mod names;
mod rules;
pub mod settings;

pub use class_identifier::ClassIdentifier;

pub use comparison::{ComparisonSet, ComparisonToggle};

// Validated names
pub use names::ListName;

// Per-class rules and policies
pub use rules::{ClassRules, RitualCasting, RuleSet, RulesVersion, SwapPolicy};

// Module settings
pub use settings::{
    EnforcementBehavior, FocusOption, ModuleSettings, RegistryEntry, SwapMergeStrategy,
    MIN_COMPARISON_MAX,
};
