//! Actor documents as seen by the spellbook
//!
//! Only the parts of an actor that drive preparation are modelled: classes,
//! owned spell items, spellcasting features, and the module flag namespace.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::entities::participant::Participant;
use crate::entities::spell::SpellLevel;
use crate::ids::{ActorId, PackId, SpellId, SpellListId, UserId};
use crate::swap::{SwapKind, SwapTracking};
use crate::value_objects::{ClassIdentifier, ClassRules, RitualCasting};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActorKind {
    #[default]
    Character,
    Group,
}

/// One class on an actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorClass {
    pub identifier: ClassIdentifier,
    pub name: String,
    pub levels: u8,
    /// Pack the class item came from; hint for list resolution.
    #[serde(default)]
    pub source_pack: Option<PackId>,
    #[serde(default)]
    pub subclass: Option<ClassIdentifier>,
    /// Spellcasting ability modifier.
    #[serde(default)]
    pub ability_mod: i32,
}

/// How a spell item is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PreparationMode {
    #[default]
    Prepared,
    /// Always prepared through a class or subclass feature.
    Always,
    Innate,
    AtWill,
    Pact,
    Ritual,
}

/// A spell item owned by an actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorSpell {
    pub spell_id: SpellId,
    #[serde(default)]
    pub source_class: Option<ClassIdentifier>,
    pub level: SpellLevel,
    #[serde(default)]
    pub mode: PreparationMode,
    #[serde(default)]
    pub prepared: bool,
    #[serde(default)]
    pub ritual: bool,
    /// Feature or item that granted this spell; such spells are read-only.
    #[serde(default)]
    pub granted_by: Option<String>,
}

impl ActorSpell {
    pub fn new(spell_id: SpellId, class: ClassIdentifier, level: impl Into<SpellLevel>) -> Self {
        Self {
            spell_id,
            source_class: Some(class),
            level: level.into(),
            mode: PreparationMode::Prepared,
            prepared: true,
            ritual: false,
            granted_by: None,
        }
    }

    pub fn is_granted(&self) -> bool {
        self.granted_by.is_some()
    }

    pub fn is_always_prepared(&self) -> bool {
        !self.is_granted() && self.mode == PreparationMode::Always
    }

    /// User-controlled and currently selected.
    pub fn is_user_prepared(&self) -> bool {
        !self.is_granted() && self.mode == PreparationMode::Prepared && self.prepared
    }

    pub fn belongs_to(&self, class: &ClassIdentifier) -> bool {
        self.source_class.as_ref() == Some(class)
    }

    pub fn kind(&self) -> SwapKind {
        if self.level.is_cantrip() {
            SwapKind::Cantrip
        } else {
            SwapKind::Spell
        }
    }
}

/// Spellcasting effect of an actor feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FeatureEffect {
    PreparationBonus { amount: i32 },
    RitualCasting { policy: RitualCasting },
    /// The class keeps a personal spellbook.
    PersonalSpellbook,
}

/// A feature on the actor that adjusts spellcasting for one or all classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureGrant {
    pub name: String,
    /// `None` applies to every class.
    #[serde(default)]
    pub class: Option<ClassIdentifier>,
    pub effect: FeatureEffect,
}

impl FeatureGrant {
    pub fn applies_to(&self, class: &ClassIdentifier) -> bool {
        self.class.as_ref().map_or(true, |c| c == class)
    }
}

/// Swap windows for one class.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassSwapTracking {
    pub cantrip: SwapTracking,
    pub spell: SwapTracking,
}

impl ClassSwapTracking {
    pub fn get(&self, kind: SwapKind) -> &SwapTracking {
        match kind {
            SwapKind::Cantrip => &self.cantrip,
            SwapKind::Spell => &self.spell,
        }
    }

    pub fn get_mut(&mut self, kind: SwapKind) -> &mut SwapTracking {
        match kind {
            SwapKind::Cantrip => &mut self.cantrip,
            SwapKind::Spell => &mut self.spell,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.cantrip.state.is_closed() && self.spell.state.is_closed()
    }
}

/// Free and copied learns into a personal spellbook.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpellbookLedger {
    pub free: BTreeSet<SpellId>,
    pub copied: BTreeSet<SpellId>,
}

impl SpellbookLedger {
    pub fn contains(&self, spell: &SpellId) -> bool {
        self.free.contains(spell) || self.copied.contains(spell)
    }
}

/// The module's flag namespace on an actor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpellbookFlags {
    pub class_rules: BTreeMap<ClassIdentifier, ClassRules>,
    pub swap_tracking: BTreeMap<ClassIdentifier, ClassSwapTracking>,
    pub long_rest_completed: bool,
    /// Class levels seen at the last actor update.
    pub previous_levels: BTreeMap<ClassIdentifier, u8>,
    /// Personal spellbook list per class.
    pub spellbooks: BTreeMap<ClassIdentifier, SpellListId>,
    pub spellbook_ledger: BTreeMap<ClassIdentifier, SpellbookLedger>,
    /// Group actors only: focus chosen by each user.
    pub user_focus: BTreeMap<UserId, String>,
    /// Group actors only: focus assigned to each member.
    pub actor_focus: BTreeMap<ActorId, String>,
}

/// An actor document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    #[serde(default)]
    pub kind: ActorKind,
    /// Users with owner permission.
    #[serde(default)]
    pub owners: BTreeSet<UserId>,
    #[serde(default)]
    pub classes: Vec<ActorClass>,
    #[serde(default)]
    pub spells: Vec<ActorSpell>,
    #[serde(default)]
    pub features: Vec<FeatureGrant>,
    #[serde(default)]
    pub flags: SpellbookFlags,
}

impl Actor {
    pub fn new(id: ActorId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: ActorKind::Character,
            owners: BTreeSet::new(),
            classes: Vec::new(),
            spells: Vec::new(),
            features: Vec::new(),
            flags: SpellbookFlags::default(),
        }
    }

    pub fn group(id: ActorId, name: impl Into<String>) -> Self {
        Self {
            kind: ActorKind::Group,
            ..Self::new(id, name)
        }
    }

    pub fn with_owner(mut self, user: UserId) -> Self {
        self.owners.insert(user);
        self
    }

    pub fn with_class(mut self, class: ActorClass) -> Self {
        self.classes.push(class);
        self
    }

    pub fn with_spell(mut self, spell: ActorSpell) -> Self {
        self.spells.push(spell);
        self
    }

    pub fn is_group(&self) -> bool {
        self.kind == ActorKind::Group
    }

    pub fn class(&self, identifier: &ClassIdentifier) -> Option<&ActorClass> {
        self.classes.iter().find(|c| &c.identifier == identifier)
    }

    pub fn total_level(&self) -> u32 {
        self.classes.iter().map(|c| u32::from(c.levels)).sum()
    }

    pub fn can_write(&self, participant: &Participant) -> bool {
        participant.is_gm() || self.owners.contains(participant.user_id())
    }

    pub fn spells_for<'a>(
        &'a self,
        class: &'a ClassIdentifier,
    ) -> impl Iterator<Item = &'a ActorSpell> + 'a {
        self.spells.iter().filter(move |s| s.belongs_to(class))
    }

    pub fn features_for<'a>(
        &'a self,
        class: &'a ClassIdentifier,
    ) -> impl Iterator<Item = &'a FeatureGrant> + 'a {
        self.features.iter().filter(move |f| f.applies_to(class))
    }

    pub fn class_rules(&self, class: &ClassIdentifier) -> Option<&ClassRules> {
        self.flags.class_rules.get(class)
    }

    pub fn swap_tracking(&self, class: &ClassIdentifier) -> Option<&ClassSwapTracking> {
        self.flags.swap_tracking.get(class)
    }

    pub fn swap_tracking_mut(&mut self, class: &ClassIdentifier) -> &mut ClassSwapTracking {
        self.flags.swap_tracking.entry(class.clone()).or_default()
    }

    pub fn spellbook_id(&self, class: &ClassIdentifier) -> Option<&SpellListId> {
        self.flags.spellbooks.get(class)
    }

    /// Classes whose level went up since the last recorded levels.
    ///
    /// A class with no recorded level is treated as new, not levelled.
    pub fn levelled_classes(&self) -> Vec<(ClassIdentifier, u8, u8)> {
        self.classes
            .iter()
            .filter_map(|c| {
                let previous = *self.flags.previous_levels.get(&c.identifier)?;
                (c.levels > previous).then(|| (c.identifier.clone(), previous, c.levels))
            })
            .collect()
    }

    /// Record current class levels. Returns whether anything changed.
    pub fn record_levels(&mut self) -> bool {
        let current: BTreeMap<ClassIdentifier, u8> = self
            .classes
            .iter()
            .map(|c| (c.identifier.clone(), c.levels))
            .collect();
        if current == self.flags.previous_levels {
            return false;
        }
        self.flags.previous_levels = current;
        true
    }

    /// Replace the user-controlled selection for a class.
    ///
    /// Granted and always-prepared items are untouched. Selected spells with no
    /// item are added; deselected items are kept unprepared.
    pub fn set_prepared(
        &mut self,
        class: &ClassIdentifier,
        selected: &BTreeSet<SpellId>,
        levels: &BTreeMap<SpellId, SpellLevel>,
    ) {
        let mut seen = BTreeSet::new();
        for spell in self.spells.iter_mut().filter(|s| s.belongs_to(class)) {
            if spell.is_granted() || spell.mode != PreparationMode::Prepared {
                continue;
            }
            spell.prepared = selected.contains(&spell.spell_id);
            seen.insert(spell.spell_id.clone());
        }
        for id in selected.difference(&seen) {
            let level = levels.get(id).copied().unwrap_or(SpellLevel::Level(1));
            self.spells
                .push(ActorSpell::new(id.clone(), class.clone(), level));
        }
    }
}
