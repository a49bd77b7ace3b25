//! Preparation state for one (actor, class)
//!
//! Materialized on demand from the actor's spell items; never stored as-is.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::entities::spell::SpellLevel;
use crate::ids::SpellId;
use crate::swap::SwapKind;
use crate::value_objects::ClassIdentifier;

/// Caps computed from class tables and rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparationCaps {
    pub max_prepared: u32,
    pub max_prepared_base: u32,
    pub max_cantrips: u32,
    /// Highest spell level the class can prepare; 0 means cantrips only.
    pub max_spell_level: u8,
}

impl PreparationCaps {
    pub fn cap_for(&self, kind: SwapKind) -> u32 {
        match kind {
            SwapKind::Cantrip => self.max_cantrips,
            SwapKind::Spell => self.max_prepared,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparationState {
    pub class: ClassIdentifier,
    /// User-selected cantrips and leveled spells.
    pub prepared: BTreeSet<SpellId>,
    pub always_prepared: BTreeSet<SpellId>,
    /// From features or items; read-only and disjoint from `prepared`.
    pub granted: BTreeSet<SpellId>,
    /// Castable only as rituals under the class policy.
    pub ritual_only: BTreeSet<SpellId>,
    pub caps: PreparationCaps,
    /// Levels of every spell referenced above.
    pub levels: BTreeMap<SpellId, SpellLevel>,
}

impl PreparationState {
    pub fn new(class: ClassIdentifier, caps: PreparationCaps) -> Self {
        Self {
            class,
            prepared: BTreeSet::new(),
            always_prepared: BTreeSet::new(),
            granted: BTreeSet::new(),
            ritual_only: BTreeSet::new(),
            caps,
            levels: BTreeMap::new(),
        }
    }

    pub fn level_of(&self, spell: &SpellId) -> Option<SpellLevel> {
        self.levels.get(spell).copied()
    }

    fn of_kind<'a>(
        &'a self,
        set: &'a BTreeSet<SpellId>,
        kind: SwapKind,
    ) -> impl Iterator<Item = &'a SpellId> + 'a {
        set.iter().filter(move |id| {
            let cantrip = self.level_of(id).map_or(false, |l| l.is_cantrip());
            cantrip == (kind == SwapKind::Cantrip)
        })
    }

    /// Prepared spells of one kind.
    pub fn prepared_of(&self, kind: SwapKind) -> BTreeSet<SpellId> {
        self.of_kind(&self.prepared, kind).cloned().collect()
    }

    /// Prepared plus always-prepared spells of one kind.
    pub fn known_of(&self, kind: SwapKind) -> BTreeSet<SpellId> {
        self.of_kind(&self.prepared, kind)
            .chain(self.of_kind(&self.always_prepared, kind))
            .cloned()
            .collect()
    }

    pub fn cantrip_count(&self) -> usize {
        self.of_kind(&self.prepared, SwapKind::Cantrip).count()
    }

    pub fn leveled_count(&self) -> usize {
        self.of_kind(&self.prepared, SwapKind::Spell).count()
    }

    pub fn is_castable(&self, spell: &SpellId) -> bool {
        self.prepared.contains(spell)
            || self.always_prepared.contains(spell)
            || self.granted.contains(spell)
    }

    /// Whether the state satisfies its caps and the granted/prepared split.
    pub fn is_within_caps(&self) -> bool {
        self.prepared.is_disjoint(&self.granted)
            && self.leveled_count() <= self.caps.max_prepared as usize
            && self.cantrip_count() <= self.caps.max_cantrips as usize
    }
}

/// Change committed for one class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparationDiff {
    pub added: BTreeSet<SpellId>,
    pub removed: BTreeSet<SpellId>,
}

impl PreparationDiff {
    pub fn between(before: &BTreeSet<SpellId>, after: &BTreeSet<SpellId>) -> Self {
        Self {
            added: after.difference(before).cloned().collect(),
            removed: before.difference(after).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
