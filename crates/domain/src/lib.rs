//! Spellbook domain
//!
//! Pure types and rules for spell lists, preparation, and swap windows. No
//! I/O lives here; persistence and delegation are engine ports.

extern crate self as spellbook_domain;

pub mod entities;
pub mod error;
pub mod events;
pub mod game_systems;
pub mod ids;
pub mod swap;
pub mod value_objects;

// Re-export all entities (explicit list in entities/mod.rs)
pub use entities::{
    Actor, ActorClass, ActorKind, ActorSpell, BulkEdit, CastContext, ClassSwapTracking,
    FeatureEffect, FeatureGrant, ListFolder, ListGroup, Pack, PackDocumentType, Participant,
    PreparationCaps, PreparationDiff, PreparationMode, PreparationState, Spell, SpellLevel,
    SpellList, SpellListDiff, SpellListFlags, SpellListHeader, SpellListKind, SpellListKindTag,
    SpellListMeta, SpellbookFlags, SpellbookLedger, UsageEvent, UsageStats, UserSpellData,
    MIN_MERGE_SOURCES,
};

pub use error::{DomainError, ErrorKind};
pub use events::{DomainEvent, ListChange};

// Re-export game system traits and types
pub use game_systems::{
    free_spellbook_learns, CasterType, Dnd5eSystem, SpellcastingSystem, DEFAULT_STARTING_SPELLS,
};

// Re-export ID types
pub use ids::{ActorId, HostEventId, PackId, QueryId, SpellId, SpellListId, UsageEventId, UserId};

pub use swap::{
    evaluate as evaluate_swap, OpenOutcome, SwapKind, SwapOutcome, SwapState, SwapStatus,
    SwapTracking, SwapTrigger, SwapViolation, WindowMode,
};

pub use value_objects::{
    ClassIdentifier, ClassRules, ComparisonSet, ComparisonToggle, EnforcementBehavior,
    FocusOption, ListName, ModuleSettings, RegistryEntry, RitualCasting, RuleSet, RulesVersion,
    SwapMergeStrategy, SwapPolicy, MIN_COMPARISON_MAX,
};
