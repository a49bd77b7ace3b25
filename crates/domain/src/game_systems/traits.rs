//! Game system traits for spellcasting mechanics.
//!
//! The preparation engine only depends on these traits, so a different rules
//! system can supply its own tables.

use std::collections::BTreeMap;

use crate::value_objects::{ClassIdentifier, RuleSet, RulesVersion};

/// Spellcasting tables for one game system.
pub trait SpellcastingSystem: Send + Sync {
    /// Unique identifier for this system (e.g., "dnd5e").
    fn system_id(&self) -> &str;

    /// Get the caster type for a class (if it has spellcasting).
    fn caster_type(&self, class: &ClassIdentifier) -> Option<CasterType>;

    /// Whether this class prepares spells from its full list each day.
    fn uses_spell_preparation(&self, class: &ClassIdentifier, version: RulesVersion) -> bool;

    /// System-derived preparation cap before rule bonuses.
    fn max_prepared_base(
        &self,
        class: &ClassIdentifier,
        level: u8,
        ability_mod: i32,
        version: RulesVersion,
    ) -> u32;

    /// Cantrip cap for a class at a given level.
    fn cantrips_known(&self, class: &ClassIdentifier, level: u8, version: RulesVersion) -> u32;

    /// Spell slots by spell level.
    fn spell_slots(&self, class: &ClassIdentifier, level: u8) -> BTreeMap<u8, u8>;

    /// Highest spell level with at least one slot; 0 for none.
    fn max_spell_level(&self, class: &ClassIdentifier, level: u8) -> u8 {
        self.spell_slots(class, level)
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(spell_level, _)| spell_level)
            .max()
            .unwrap_or(0)
    }

    /// Default rules for a class before per-actor overrides.
    fn class_defaults(&self, class: &ClassIdentifier, version: RulesVersion) -> RuleSet;
}

/// Type of spellcaster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasterType {
    /// Full caster (Wizard, Cleric, Druid, Sorcerer, Bard)
    Full,
    /// Half caster (Paladin, Ranger, Artificer)
    Half,
    /// Third caster (Eldritch Knight, Arcane Trickster)
    Third,
    /// Pact magic (Warlock)
    Pact,
}

impl CasterType {
    /// Get the caster level for multiclassing calculations.
    pub fn effective_caster_levels(&self, class_level: u8) -> u8 {
        match self {
            CasterType::Full => class_level,
            CasterType::Half => class_level / 2,
            CasterType::Third => class_level / 3,
            CasterType::Pact => 0, // Warlock doesn't contribute to multiclass slots
        }
    }
}
