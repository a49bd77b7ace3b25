//! D&D 5th Edition spellcasting tables.
//!
//! Covers both the 2014 (legacy) and 2024 (modern) class rules.

use std::collections::BTreeMap;

use super::traits::{CasterType, SpellcastingSystem};
use crate::value_objects::{ClassIdentifier, RitualCasting, RuleSet, RulesVersion, SwapPolicy};

/// Default personal spellbook size at first level.
pub const DEFAULT_STARTING_SPELLS: u32 = 6;

/// Free spellbook learns gained per level after the first.
pub const SPELLS_PER_LEVEL: u32 = 2;

/// D&D 5th Edition game system.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dnd5eSystem;

impl Dnd5eSystem {
    /// Create a new D&D 5e system instance.
    pub fn new() -> Self {
        Self
    }
}

fn is_known_caster(class: &str) -> bool {
    matches!(
        class,
        "bard" | "sorcerer" | "warlock" | "ranger" | "eldritch-knight" | "arcane-trickster"
    )
}

fn is_prepared_caster(class: &str) -> bool {
    matches!(class, "cleric" | "druid" | "paladin" | "wizard" | "artificer")
}

fn has_cantrips(class: &str) -> bool {
    !matches!(class, "paladin" | "ranger")
}

impl SpellcastingSystem for Dnd5eSystem {
    fn system_id(&self) -> &str {
        "dnd5e"
    }

    fn caster_type(&self, class: &ClassIdentifier) -> Option<CasterType> {
        match class.as_str() {
            "wizard" | "cleric" | "druid" | "sorcerer" | "bard" => Some(CasterType::Full),
            "paladin" | "ranger" | "artificer" => Some(CasterType::Half),
            "warlock" => Some(CasterType::Pact),
            "eldritch-knight" | "arcane-trickster" => Some(CasterType::Third),
            _ => None,
        }
    }

    fn uses_spell_preparation(&self, class: &ClassIdentifier, _version: RulesVersion) -> bool {
        // Every 2024 caster prepares, but only these re-prepare freely.
        is_prepared_caster(class.as_str())
    }

    fn max_prepared_base(
        &self,
        class: &ClassIdentifier,
        level: u8,
        ability_mod: i32,
        version: RulesVersion,
    ) -> u32 {
        let class = class.as_str();
        if level == 0 {
            return 0;
        }
        if is_known_caster(class) {
            return u32::from(table_value(known_table(class, version), level));
        }
        let level_i = i32::from(level);
        let computed = match (version, class) {
            (RulesVersion::Modern, "wizard") => {
                return u32::from(table_value(MODERN_WIZARD_PREPARED, level))
            }
            (RulesVersion::Modern, "cleric" | "druid") => {
                return u32::from(table_value(MODERN_FULL_PREPARED, level))
            }
            (RulesVersion::Modern, "paladin") => {
                return u32::from(table_value(MODERN_HALF_PREPARED, level))
            }
            (_, "wizard" | "cleric" | "druid") => (level_i + ability_mod).max(1),
            (_, "paladin") if level < 2 => return 0,
            (_, "paladin") => (level_i / 2 + ability_mod).max(1),
            (_, "artificer") => ((level_i + 1) / 2 + ability_mod).max(1),
            _ => 0,
        };
        computed.max(0) as u32
    }

    fn cantrips_known(&self, class: &ClassIdentifier, level: u8, _version: RulesVersion) -> u32 {
        let tiers: [u32; 3] = match class.as_str() {
            "wizard" | "cleric" => [3, 4, 5],
            "sorcerer" => [4, 5, 6],
            "druid" | "bard" | "warlock" => [2, 3, 4],
            "artificer" => return match level {
                1..=9 => 2,
                10..=13 => 3,
                14..=20 => 4,
                _ => 0,
            },
            "eldritch-knight" | "arcane-trickster" => return match level {
                3..=9 => 2,
                10..=20 => 3,
                _ => 0,
            },
            _ => return 0,
        };
        match level {
            1..=3 => tiers[0],
            4..=9 => tiers[1],
            10..=20 => tiers[2],
            _ => 0,
        }
    }

    fn spell_slots(&self, class: &ClassIdentifier, level: u8) -> BTreeMap<u8, u8> {
        match (self.caster_type(class), class.as_str()) {
            (Some(CasterType::Full), _) => slots_from(FULL_CASTER_SLOTS, level),
            (Some(CasterType::Half), "artificer") => slots_from(HALF_CASTER_SLOTS, level.max(2)),
            (Some(CasterType::Half), _) => slots_from(HALF_CASTER_SLOTS, level),
            (Some(CasterType::Third), _) => slots_from(THIRD_CASTER_SLOTS, level),
            (Some(CasterType::Pact), _) => warlock_slots(level),
            (None, _) => BTreeMap::new(),
        }
    }

    fn class_defaults(&self, class: &ClassIdentifier, version: RulesVersion) -> RuleSet {
        let id = class.as_str();
        if self.caster_type(class).is_none() {
            return RuleSet::default();
        }

        let cantrip_swapping = match (version, id) {
            (RulesVersion::Legacy, _) => SwapPolicy::None,
            (RulesVersion::Modern, _) if !has_cantrips(id) => SwapPolicy::None,
            (RulesVersion::Modern, "wizard") => SwapPolicy::LongRest,
            (RulesVersion::Modern, _) => SwapPolicy::LevelUp,
        };
        let spell_swapping = if is_prepared_caster(id) {
            SwapPolicy::LongRest
        } else if is_known_caster(id) {
            SwapPolicy::LevelUp
        } else {
            SwapPolicy::None
        };
        let ritual_casting = match id {
            "wizard" => RitualCasting::Always,
            "cleric" | "druid" | "bard" | "artificer" => RitualCasting::PreparedOnly,
            _ => RitualCasting::None,
        };
        let wizard = id == "wizard";

        RuleSet {
            cantrip_swapping,
            spell_swapping,
            ritual_casting,
            force_wizard_mode: wizard,
            show_cantrips: has_cantrips(id),
            starting_spell_count: wizard.then_some(DEFAULT_STARTING_SPELLS),
            ..RuleSet::default()
        }
    }
}

/// Free spellbook learns available at a class level.
pub fn free_spellbook_learns(starting: u32, level: u8) -> u32 {
    starting + SPELLS_PER_LEVEL * u32::from(level.saturating_sub(1))
}

fn table_value(table: &[u8], level: u8) -> u8 {
    table
        .get(usize::from(level))
        .or_else(|| table.last())
        .copied()
        .unwrap_or(0)
}

fn known_table(class: &str, version: RulesVersion) -> &'static [u8] {
    match (version, class) {
        (RulesVersion::Modern, "sorcerer") => MODERN_SORCERER_PREPARED,
        (RulesVersion::Modern, "bard") => MODERN_FULL_PREPARED,
        (RulesVersion::Modern, "ranger") => MODERN_HALF_PREPARED,
        (_, "sorcerer") => SORCERER_SPELLS_KNOWN,
        (_, "bard") => BARD_SPELLS_KNOWN,
        (_, "ranger") => RANGER_SPELLS_KNOWN,
        (_, "warlock") => WARLOCK_SPELLS_KNOWN,
        _ => THIRD_CASTER_SPELLS_KNOWN,
    }
}

fn slots_from(table: &[&[u8]], level: u8) -> BTreeMap<u8, u8> {
    table
        .get(usize::from(level))
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(i, &count)| ((i + 1) as u8, count))
                .collect()
        })
        .unwrap_or_default()
}

fn warlock_slots(level: u8) -> BTreeMap<u8, u8> {
    // Pact magic - fewer slots but higher level
    let (count, slot_level) = match level {
        1 => (1, 1),
        2 => (2, 1),
        3..=4 => (2, 2),
        5..=6 => (2, 3),
        7..=8 => (2, 4),
        9..=10 => (2, 5),
        11..=16 => (3, 5),
        17..=20 => (4, 5),
        _ => (0, 0),
    };
    let mut slots = BTreeMap::new();
    if count > 0 {
        slots.insert(slot_level, count);
    }
    slots
}

// Slot tables, indexed by class level (index 0 unused)
const FULL_CASTER_SLOTS: &[&[u8]] = &[
    &[],
    &[2],
    &[3],
    &[4, 2],
    &[4, 3],
    &[4, 3, 2],
    &[4, 3, 3],
    &[4, 3, 3, 1],
    &[4, 3, 3, 2],
    &[4, 3, 3, 3, 1],
    &[4, 3, 3, 3, 2],
    &[4, 3, 3, 3, 2, 1],
    &[4, 3, 3, 3, 2, 1],
    &[4, 3, 3, 3, 2, 1, 1],
    &[4, 3, 3, 3, 2, 1, 1],
    &[4, 3, 3, 3, 2, 1, 1, 1],
    &[4, 3, 3, 3, 2, 1, 1, 1],
    &[4, 3, 3, 3, 2, 1, 1, 1, 1],
    &[4, 3, 3, 3, 3, 1, 1, 1, 1],
    &[4, 3, 3, 3, 3, 2, 1, 1, 1],
    &[4, 3, 3, 3, 3, 2, 2, 1, 1],
];

const HALF_CASTER_SLOTS: &[&[u8]] = &[
    &[],
    &[],
    &[2],
    &[3],
    &[3],
    &[4, 2],
    &[4, 2],
    &[4, 3],
    &[4, 3],
    &[4, 3, 2],
    &[4, 3, 2],
    &[4, 3, 3],
    &[4, 3, 3],
    &[4, 3, 3, 1],
    &[4, 3, 3, 1],
    &[4, 3, 3, 2],
    &[4, 3, 3, 2],
    &[4, 3, 3, 3, 1],
    &[4, 3, 3, 3, 1],
    &[4, 3, 3, 3, 2],
    &[4, 3, 3, 3, 2],
];

const THIRD_CASTER_SLOTS: &[&[u8]] = &[
    &[],
    &[],
    &[],
    &[2],
    &[3],
    &[3],
    &[3],
    &[4, 2],
    &[4, 2],
    &[4, 2],
    &[4, 3],
    &[4, 3],
    &[4, 3],
    &[4, 3, 2],
    &[4, 3, 2],
    &[4, 3, 2],
    &[4, 3, 3],
    &[4, 3, 3],
    &[4, 3, 3],
    &[4, 3, 3, 1],
    &[4, 3, 3, 1],
];

// Spells known / prepared tables (index 0 unused)
const SORCERER_SPELLS_KNOWN: &[u8] = &[
    0, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 12, 13, 13, 14, 14, 15, 15, 15, 15,
];

const BARD_SPELLS_KNOWN: &[u8] = &[
    0, 4, 5, 6, 7, 8, 9, 10, 11, 12, 14, 15, 15, 16, 18, 19, 19, 20, 22, 22, 22,
];

const RANGER_SPELLS_KNOWN: &[u8] = &[
    0, 0, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11,
];

const WARLOCK_SPELLS_KNOWN: &[u8] = &[
    0, 2, 3, 4, 5, 6, 7, 8, 9, 10, 10, 11, 11, 12, 12, 13, 13, 14, 14, 15, 15,
];

const THIRD_CASTER_SPELLS_KNOWN: &[u8] = &[
    0, 0, 0, 3, 4, 4, 4, 5, 6, 6, 7, 8, 8, 9, 10, 10, 11, 11, 11, 12, 13,
];

const MODERN_FULL_PREPARED: &[u8] = &[
    0, 4, 5, 6, 7, 9, 10, 11, 12, 14, 15, 16, 16, 17, 17, 18, 18, 19, 20, 21, 22,
];

const MODERN_WIZARD_PREPARED: &[u8] = &[
    0, 4, 5, 6, 7, 9, 10, 11, 12, 14, 15, 16, 16, 17, 18, 19, 21, 22, 23, 24, 25,
];

const MODERN_SORCERER_PREPARED: &[u8] = &[
    0, 2, 4, 6, 7, 9, 10, 11, 12, 14, 15, 16, 16, 17, 17, 18, 18, 19, 20, 21, 22,
];

const MODERN_HALF_PREPARED: &[u8] = &[
    0, 2, 3, 4, 5, 6, 6, 7, 7, 9, 9, 10, 10, 11, 11, 12, 12, 14, 14, 15, 15,
];
