//! Effective class rules.
//!
//! System defaults for the class, then the actor's stored overrides, then
//! features on the actor that adjust spellcasting.

use std::sync::Arc;

use spellbook_domain::{
    Actor, ActorClass, ClassIdentifier, FeatureEffect, ModuleSettings, PreparationCaps,
    RitualCasting, RuleSet, RulesVersion, SpellcastingSystem, SwapKind, SwapMergeStrategy,
    SwapPolicy,
};

pub struct RuleResolver {
    system: Arc<dyn SpellcastingSystem>,
}

impl RuleResolver {
    pub fn new(system: Arc<dyn SpellcastingSystem>) -> Self {
        Self { system }
    }

    pub fn system(&self) -> &dyn SpellcastingSystem {
        self.system.as_ref()
    }

    /// Whether the class casts at all, by the tables or by explicit rules.
    pub fn is_spellcaster(&self, actor: &Actor, class: &ClassIdentifier) -> bool {
        self.system.caster_type(class).is_some()
            || actor.class_rules(class).map_or(false, |r| !r.is_empty())
            || actor.spellbook_id(class).is_some()
    }

    pub fn for_class(
        &self,
        actor: &Actor,
        class: &ClassIdentifier,
        settings: &ModuleSettings,
    ) -> RuleSet {
        let mut rules = self.system.class_defaults(class, settings.rules_version);
        if let Some(stored) = actor.class_rules(class) {
            rules = rules.with_overrides(stored);
        }
        for feature in actor.features_for(class) {
            match &feature.effect {
                FeatureEffect::PreparationBonus { amount } => {
                    rules.preparation_bonus = rules.preparation_bonus.saturating_add(*amount);
                }
                FeatureEffect::RitualCasting { policy } => {
                    rules.ritual_casting = more_permissive_ritual(rules.ritual_casting, *policy);
                }
                FeatureEffect::PersonalSpellbook => rules.force_wizard_mode = true,
            }
        }
        rules
    }

    pub fn caps(
        &self,
        class: &ActorClass,
        rules: &RuleSet,
        version: RulesVersion,
    ) -> PreparationCaps {
        let id = &class.identifier;
        let base = self
            .system
            .max_prepared_base(id, class.levels, class.ability_mod, version);
        let max_cantrips = if rules.show_cantrips {
            self.system.cantrips_known(id, class.levels, version)
        } else {
            0
        };
        PreparationCaps {
            max_prepared: rules.max_prepared(base),
            max_prepared_base: base,
            max_cantrips,
            max_spell_level: self.system.max_spell_level(id, class.levels),
        }
    }

    /// Whether leveled spells are re-chosen freely after a long rest.
    pub fn reprepares(&self, class: &ClassIdentifier, version: RulesVersion) -> bool {
        self.system.uses_spell_preparation(class, version)
    }

    /// One swap policy for the whole actor, merged across casting classes.
    ///
    /// Only drives whether a prompt is shown; windows themselves are opened
    /// per class from that class's own policy.
    pub fn merged_policy(
        &self,
        actor: &Actor,
        settings: &ModuleSettings,
        kind: SwapKind,
    ) -> SwapPolicy {
        let policies = actor
            .classes
            .iter()
            .filter(|c| self.is_spellcaster(actor, &c.identifier))
            .map(|c| self.for_class(actor, &c.identifier, settings).swap_policy(kind));
        let merged = match settings.swap_merge_strategy {
            SwapMergeStrategy::MostPermissive => policies.max_by_key(|p| permissiveness(*p)),
            SwapMergeStrategy::LeastPermissive => policies.min_by_key(|p| permissiveness(*p)),
        };
        merged.unwrap_or(SwapPolicy::None)
    }

    /// Whether a finished long rest should prompt the owners to swap.
    pub fn prompts_after_long_rest(&self, actor: &Actor, settings: &ModuleSettings) -> bool {
        !settings.disable_long_rest_swap_prompt
            && SwapKind::ALL
                .iter()
                .any(|kind| self.merged_policy(actor, settings, *kind) == SwapPolicy::LongRest)
    }
}

/// Long rests come round more often than level-ups.
fn permissiveness(policy: SwapPolicy) -> u8 {
    match policy {
        SwapPolicy::None => 0,
        SwapPolicy::LevelUp => 1,
        SwapPolicy::LongRest => 2,
    }
}

fn more_permissive_ritual(a: RitualCasting, b: RitualCasting) -> RitualCasting {
    fn rank(r: RitualCasting) -> u8 {
        match r {
            RitualCasting::None => 0,
            RitualCasting::PreparedOnly => 1,
            RitualCasting::Always => 2,
        }
    }
    if rank(b) > rank(a) {
        b
    } else {
        a
    }
}
