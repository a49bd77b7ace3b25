//! Spell documents.
//!
//! The engine only reads the handful of fields that drive preparation:
//! level (cantrip vs leveled), ritual tag and name for ordering.

use serde::{Deserialize, Serialize};

use crate::ids::SpellId;

/// A spell document as stored by the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Spell {
    /// Unique identifier for this spell
    pub id: SpellId,
    /// Display name of the spell
    pub name: String,
    /// Spell level (cantrip = 0)
    pub level: SpellLevel,
    /// School of magic (e.g., "evocation", "necromancy")
    #[serde(default)]
    pub school: Option<String>,
    /// Whether this spell can be cast as a ritual
    #[serde(default)]
    pub ritual: bool,
    /// Whether this spell requires concentration
    #[serde(default)]
    pub concentration: bool,
    /// Source book reference (e.g., "PHB p.211")
    #[serde(default)]
    pub source: Option<String>,
}

impl Spell {
    pub fn new(id: SpellId, name: impl Into<String>, level: impl Into<SpellLevel>) -> Self {
        Self {
            id,
            name: name.into(),
            level: level.into(),
            school: None,
            ritual: false,
            concentration: false,
            source: None,
        }
    }

    pub fn with_ritual(mut self, ritual: bool) -> Self {
        self.ritual = ritual;
        self
    }

    pub fn with_school(mut self, school: impl Into<String>) -> Self {
        self.school = Some(school.into());
        self
    }

    pub fn is_cantrip(&self) -> bool {
        self.level.is_cantrip()
    }
}

/// Spell level representation.
///
/// Stored as a plain number (0 = cantrip) to match host documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum SpellLevel {
    /// Cantrip (level 0 spell, can be cast at will)
    Cantrip,
    /// Leveled spell (1-9)
    Level(u8),
}

impl SpellLevel {
    /// Convert to numeric level (cantrip = 0).
    pub fn as_number(&self) -> u8 {
        match self {
            SpellLevel::Cantrip => 0,
            SpellLevel::Level(n) => *n,
        }
    }

    /// Check if this is a cantrip.
    pub fn is_cantrip(&self) -> bool {
        matches!(self, SpellLevel::Cantrip)
    }
}

impl From<u8> for SpellLevel {
    fn from(level: u8) -> Self {
        if level == 0 {
            SpellLevel::Cantrip
        } else {
            SpellLevel::Level(level)
        }
    }
}

impl From<SpellLevel> for u8 {
    fn from(level: SpellLevel) -> u8 {
        level.as_number()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spell_level_conversion() {
        assert_eq!(SpellLevel::from(0), SpellLevel::Cantrip);
        assert_eq!(SpellLevel::from(1), SpellLevel::Level(1));
        assert_eq!(SpellLevel::from(9), SpellLevel::Level(9));
    }

    #[test]
    fn spell_level_as_number() {
        assert_eq!(SpellLevel::Cantrip.as_number(), 0);
        assert_eq!(SpellLevel::Level(3).as_number(), 3);
    }

    #[test]
    fn spell_level_orders_cantrips_first() {
        assert!(SpellLevel::Cantrip < SpellLevel::Level(1));
        assert!(SpellLevel::Level(2) < SpellLevel::Level(3));
    }

    #[test]
    fn spell_reads_host_shape() {
        let json = r#"{
            "id": "Compendium.dnd5e.spells.Item.detect-magic",
            "name": "Detect Magic",
            "level": 1,
            "ritual": true
        }"#;
        let spell: Spell = serde_json::from_str(json).unwrap();
        assert_eq!(spell.level, SpellLevel::Level(1));
        assert!(spell.ritual);
        assert!(!spell.is_cantrip());
        assert_eq!(serde_json::to_value(&spell).unwrap()["level"], 1);
    }
}
