//! World-level module settings.
//!
//! Persisted as a single blob; every registry or hidden-list write is a
//! read-modify-write of this struct.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::SpellListId;
use crate::value_objects::RulesVersion;

/// Smallest legal value for `spell_comparison_max`.
pub const MIN_COMPARISON_MAX: u8 = 2;

fn default_comparison_max() -> u8 {
    3
}

fn default_focus_options() -> Vec<FocusOption> {
    [
        ("damage", "Damage"),
        ("healing", "Healing"),
        ("control", "Control"),
        ("support", "Support"),
        ("utility", "Utility"),
    ]
    .into_iter()
    .map(|(id, name)| FocusOption {
        id: id.to_string(),
        name: name.to_string(),
    })
    .collect()
}

/// How strictly swap rules are applied on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnforcementBehavior {
    /// Violations are rejected.
    #[default]
    Enforced,
    /// Violations are committed and reported to the GM.
    NotifyGm,
    /// Violations are committed silently.
    Unenforced,
}

/// How per-class swap policies combine into the actor-level prompt decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SwapMergeStrategy {
    /// Any class allowing a swap surfaces the prompt.
    #[default]
    MostPermissive,
    /// Every spellcasting class must allow the swap.
    LeastPermissive,
}

/// A party role a player can pick for their character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusOption {
    pub id: String,
    pub name: String,
}

/// One registry row as exposed to external consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    pub list_id: SpellListId,
    pub enabled: bool,
}

/// Module settings recognised by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModuleSettings {
    pub rules_version: RulesVersion,
    pub enforcement_behavior: EnforcementBehavior,
    pub swap_merge_strategy: SwapMergeStrategy,
    /// Lists excluded from catalog views.
    pub hidden_spell_lists: BTreeSet<SpellListId>,
    /// External visibility of lists.
    pub registry: BTreeMap<SpellListId, bool>,
    #[serde(default = "default_comparison_max")]
    pub spell_comparison_max: u8,
    pub suppress_migration_warnings: bool,
    pub disable_long_rest_swap_prompt: bool,
    #[serde(default = "default_focus_options")]
    pub focus_options: Vec<FocusOption>,
}

impl Default for ModuleSettings {
    fn default() -> Self {
        Self {
            rules_version: RulesVersion::default(),
            enforcement_behavior: EnforcementBehavior::default(),
            swap_merge_strategy: SwapMergeStrategy::default(),
            hidden_spell_lists: BTreeSet::new(),
            registry: BTreeMap::new(),
            spell_comparison_max: default_comparison_max(),
            suppress_migration_warnings: false,
            disable_long_rest_swap_prompt: false,
            focus_options: default_focus_options(),
        }
    }
}

impl ModuleSettings {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.spell_comparison_max < MIN_COMPARISON_MAX {
            return Err(DomainError::validation(format!(
                "spellComparisonMax must be at least {}",
                MIN_COMPARISON_MAX
            )));
        }
        let mut seen = BTreeSet::new();
        for option in &self.focus_options {
            if option.id.trim().is_empty() {
                return Err(DomainError::validation("Focus option id cannot be empty"));
            }
            if !seen.insert(option.id.as_str()) {
                return Err(DomainError::validation(format!(
                    "Duplicate focus option '{}'",
                    option.id
                )));
            }
        }
        Ok(())
    }

    pub fn is_hidden(&self, id: &SpellListId) -> bool {
        self.hidden_spell_lists.contains(id)
    }

    pub fn is_registered(&self, id: &SpellListId) -> bool {
        self.registry.get(id).copied().unwrap_or(false)
    }

    /// Registry rows in id order.
    pub fn registry_entries(&self) -> Vec<RegistryEntry> {
        self.registry
            .iter()
            .map(|(list_id, enabled)| RegistryEntry {
                list_id: list_id.clone(),
                enabled: *enabled,
            })
            .collect()
    }

    pub fn has_focus(&self, focus_id: &str) -> bool {
        self.focus_options.iter().any(|o| o.id == focus_id)
    }

    /// Drop every reference to a list. Returns whether anything changed.
    pub fn forget_list(&mut self, id: &SpellListId) -> bool {
        let hidden = self.hidden_spell_lists.remove(id);
        let registered = self.registry.remove(id).is_some();
        hidden || registered
    }
}
