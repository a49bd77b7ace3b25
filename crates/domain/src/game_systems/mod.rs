//! Game system implementations.
//!
//! Each system implements the spellcasting tables defined in `traits.rs`.
//!
//! # Supported Systems
//!
//! - D&D 5th Edition (`dnd5e`), 2014 and 2024 rules

mod dnd5e;
mod traits;

pub use dnd5e::{free_spellbook_learns, Dnd5eSystem, DEFAULT_STARTING_SPELLS, SPELLS_PER_LEVEL};
pub use traits::{CasterType, SpellcastingSystem};
