//! Per-class spellcasting rules
//!
//! Classes store a sparse [`ClassRules`] override in actor flags. The rule
//! resolver overlays it on class defaults to produce the effective [`RuleSet`].

use serde::{Deserialize, Deserializer, Serialize};

use crate::ids::SpellListId;
use crate::swap::{SwapKind, SwapTrigger};

// ============================================================================
// Policies
// ============================================================================

/// When a swap window opens for a kind of spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SwapPolicy {
    #[default]
    None,
    LongRest,
    LevelUp,
}

impl SwapPolicy {
    /// Whether this policy opens a window for the trigger.
    pub fn opens_on(self, trigger: SwapTrigger) -> bool {
        matches!(
            (self, trigger),
            (SwapPolicy::LongRest, SwapTrigger::LongRest)
                | (SwapPolicy::LevelUp, SwapTrigger::LevelUp)
        )
    }
}

impl std::fmt::Display for SwapPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwapPolicy::None => write!(f, "none"),
            SwapPolicy::LongRest => write!(f, "longRest"),
            SwapPolicy::LevelUp => write!(f, "levelUp"),
        }
    }
}

/// Ritual eligibility policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RitualCasting {
    /// Any ritual in the class pool may be cast as a ritual.
    Always,
    /// Only rituals already prepared (or always prepared).
    #[default]
    PreparedOnly,
    None,
}

/// Which edition's class defaults apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RulesVersion {
    /// 2014 rules.
    #[default]
    Legacy,
    /// 2024 rules.
    Modern,
}

// ============================================================================
// Stored overrides
// ============================================================================

/// Sparse per-class rule overrides persisted in actor flags.
///
/// Every field is optional; unset fields fall through to the class defaults.
/// Older documents stored a single `customSpellList` string - it is read as a
/// one-element sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassRules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cantrip_swapping: Option<SwapPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spell_swapping: Option<SwapPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preparation_bonus: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ritual_casting: Option<RitualCasting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_wizard_mode: Option<bool>,
    #[serde(
        alias = "customSpellList",
        deserialize_with = "deserialize_list_ids",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub custom_spell_list_ids: Vec<SpellListId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_cantrips: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_spell_count: Option<u32>,
}

impl ClassRules {
    pub fn is_empty(&self) -> bool {
        *self == ClassRules::default()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListIdsRepr {
    One(String),
    Many(Vec<String>),
}

/// Accepts `null`, `""`, `"id"` or `["a", "b"]`; blank entries are dropped.
fn deserialize_list_ids<'de, D>(deserializer: D) -> Result<Vec<SpellListId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<ListIdsRepr> = Option::deserialize(deserializer)?;
    let strings = match raw {
        None => Vec::new(),
        Some(ListIdsRepr::One(s)) => vec![s],
        Some(ListIdsRepr::Many(v)) => v,
    };
    let mut ids = Vec::with_capacity(strings.len());
    for s in strings {
        if s.trim().is_empty() {
            continue;
        }
        let id = SpellListId::new(s).map_err(serde::de::Error::custom)?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

// ============================================================================
// Effective rules
// ============================================================================

/// Effective rules for one class after defaults and overrides are applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    pub cantrip_swapping: SwapPolicy,
    pub spell_swapping: SwapPolicy,
    pub preparation_bonus: i32,
    pub ritual_casting: RitualCasting,
    pub force_wizard_mode: bool,
    pub custom_spell_list_ids: Vec<SpellListId>,
    pub show_cantrips: bool,
    pub starting_spell_count: Option<u32>,
}

impl Default for RuleSet {
    /// Generic defaults for classes the rules tables do not know.
    fn default() -> Self {
        Self {
            cantrip_swapping: SwapPolicy::None,
            spell_swapping: SwapPolicy::None,
            preparation_bonus: 0,
            ritual_casting: RitualCasting::None,
            force_wizard_mode: false,
            custom_spell_list_ids: Vec::new(),
            show_cantrips: true,
            starting_spell_count: None,
        }
    }
}

impl RuleSet {
    /// Overlay stored overrides.
    pub fn with_overrides(mut self, stored: &ClassRules) -> Self {
        if let Some(policy) = stored.cantrip_swapping {
            self.cantrip_swapping = policy;
        }
        if let Some(policy) = stored.spell_swapping {
            self.spell_swapping = policy;
        }
        if let Some(bonus) = stored.preparation_bonus {
            self.preparation_bonus = bonus;
        }
        if let Some(ritual) = stored.ritual_casting {
            self.ritual_casting = ritual;
        }
        if let Some(force) = stored.force_wizard_mode {
            self.force_wizard_mode = force;
        }
        if !stored.custom_spell_list_ids.is_empty() {
            self.custom_spell_list_ids = stored.custom_spell_list_ids.clone();
        }
        if let Some(show) = stored.show_cantrips {
            self.show_cantrips = show;
        }
        if stored.starting_spell_count.is_some() {
            self.starting_spell_count = stored.starting_spell_count;
        }
        self
    }

    /// `maxPreparedBase + preparationBonus`, clamped at zero.
    pub fn max_prepared(&self, max_prepared_base: u32) -> u32 {
        let total = i64::from(max_prepared_base) + i64::from(self.preparation_bonus);
        total.clamp(0, i64::from(u32::MAX)) as u32
    }

    pub fn swap_policy(&self, kind: SwapKind) -> SwapPolicy {
        match kind {
            SwapKind::Cantrip => self.cantrip_swapping,
            SwapKind::Spell => self.spell_swapping,
        }
    }

    pub fn has_custom_lists(&self) -> bool {
        !self.custom_spell_list_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_scalar_custom_list_becomes_sequence() {
        let json = r#"{"customSpellList": "JournalEntry.abc"}"#;
        let rules: ClassRules = serde_json::from_str(json).unwrap();
        assert_eq!(
            rules.custom_spell_list_ids,
            vec![SpellListId::new("JournalEntry.abc").unwrap()]
        );
    }

    #[test]
    fn empty_or_null_custom_list_means_no_override() {
        let rules: ClassRules = serde_json::from_str(r#"{"customSpellList": ""}"#).unwrap();
        assert!(rules.custom_spell_list_ids.is_empty());
        let rules: ClassRules = serde_json::from_str(r#"{"customSpellListIds": null}"#).unwrap();
        assert!(rules.custom_spell_list_ids.is_empty());
        let rules: ClassRules = serde_json::from_str(r#"{"customSpellListIds": []}"#).unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn normalized_rules_serialize_as_sequence() {
        let rules: ClassRules =
            serde_json::from_str(r#"{"customSpellList": "a", "preparationBonus": 2}"#).unwrap();
        let value = serde_json::to_value(&rules).unwrap();
        assert_eq!(value["customSpellListIds"], serde_json::json!(["a"]));
        assert!(value.get("customSpellList").is_none());
    }

    #[test]
    fn overrides_replace_only_set_fields() {
        let stored = ClassRules {
            spell_swapping: Some(SwapPolicy::LevelUp),
            preparation_bonus: Some(1),
            ..Default::default()
        };
        let rules = RuleSet {
            cantrip_swapping: SwapPolicy::LongRest,
            ..Default::default()
        }
        .with_overrides(&stored);
        assert_eq!(rules.cantrip_swapping, SwapPolicy::LongRest);
        assert_eq!(rules.spell_swapping, SwapPolicy::LevelUp);
        assert_eq!(rules.preparation_bonus, 1);
    }

    #[test]
    fn max_prepared_clamps_at_zero() {
        let rules = RuleSet {
            preparation_bonus: -10,
            ..Default::default()
        };
        assert_eq!(rules.max_prepared(4), 0);
        let rules = RuleSet {
            preparation_bonus: 2,
            ..Default::default()
        };
        assert_eq!(rules.max_prepared(4), 6);
    }

    #[test]
    fn policy_matches_trigger() {
        assert!(SwapPolicy::LongRest.opens_on(SwapTrigger::LongRest));
        assert!(!SwapPolicy::LongRest.opens_on(SwapTrigger::LevelUp));
        assert!(!SwapPolicy::None.opens_on(SwapTrigger::LongRest));
    }
}
