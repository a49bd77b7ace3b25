//! Domain entities - Core business objects with identity

mod actor;
mod pack;
mod participant;
mod preparation;
mod spell;
mod spell_list;
mod usage;

pub use actor::{
    Actor, ActorClass, ActorKind, ActorSpell, ClassSwapTracking, FeatureEffect, FeatureGrant,
    PreparationMode, SpellbookFlags, SpellbookLedger,
};
pub use pack::{Pack, PackDocumentType};
pub use participant::Participant;
pub use preparation::{PreparationCaps, PreparationDiff, PreparationState};
pub use spell::{Spell, SpellLevel};
pub use spell_list::{
    BulkEdit, ListFolder, ListGroup, SpellList, SpellListDiff, SpellListFlags, SpellListHeader,
    SpellListKind, SpellListKindTag, SpellListMeta, MIN_MERGE_SOURCES,
};
pub use usage::{CastContext, UsageEvent, UsageStats, UserSpellData};
