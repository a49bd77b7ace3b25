//! Bounded spell comparison selection.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::SpellId;
use crate::value_objects::settings::MIN_COMPARISON_MAX;

/// Spells picked for side-by-side comparison.
///
/// Iteration order is insertion order; shrinking the capacity drops the
/// newest picks first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonSet {
    max_size: usize,
    spells: Vec<SpellId>,
}

/// Result of toggling a spell in the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonToggle {
    Added,
    Removed,
}

impl ComparisonSet {
    pub fn new(max_size: u8) -> Result<Self, DomainError> {
        if max_size < MIN_COMPARISON_MAX {
            return Err(DomainError::validation(format!(
                "Comparison must allow at least {} spells",
                MIN_COMPARISON_MAX
            )));
        }
        Ok(Self {
            max_size: usize::from(max_size),
            spells: Vec::new(),
        })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.spells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }

    pub fn as_slice(&self) -> &[SpellId] {
        &self.spells
    }

    pub fn contains(&self, spell: &SpellId) -> bool {
        self.spells.contains(spell)
    }

    /// Add if absent, remove if present.
    pub fn toggle(&mut self, spell: SpellId) -> Result<ComparisonToggle, DomainError> {
        if let Some(index) = self.spells.iter().position(|s| *s == spell) {
            self.spells.remove(index);
            return Ok(ComparisonToggle::Removed);
        }
        if self.spells.len() >= self.max_size {
            return Err(DomainError::capacity_exceeded(
                "spell comparison",
                self.spells.len() + 1,
                self.max_size,
            ));
        }
        self.spells.push(spell);
        Ok(ComparisonToggle::Added)
    }

    pub fn clear(&mut self) {
        self.spells.clear();
    }

    pub fn set_max_size(&mut self, max_size: u8) -> Result<(), DomainError> {
        if max_size < MIN_COMPARISON_MAX {
            return Err(DomainError::validation(format!(
                "Comparison must allow at least {} spells",
                MIN_COMPARISON_MAX
            )));
        }
        self.max_size = usize::from(max_size);
        self.spells.truncate(self.max_size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spell(id: &str) -> SpellId {
        SpellId::new(id).unwrap()
    }

    #[test]
    fn toggle_adds_then_removes() {
        let mut set = ComparisonSet::new(3).unwrap();
        assert_eq!(set.toggle(spell("fireball")).unwrap(), ComparisonToggle::Added);
        assert!(set.contains(&spell("fireball")));
        assert_eq!(set.toggle(spell("fireball")).unwrap(), ComparisonToggle::Removed);
        assert!(set.is_empty());
    }

    #[test]
    fn capacity_is_enforced() {
        let mut set = ComparisonSet::new(2).unwrap();
        set.toggle(spell("a")).unwrap();
        set.toggle(spell("b")).unwrap();
        assert!(matches!(
            set.toggle(spell("c")),
            Err(DomainError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn shrinking_drops_newest() {
        let mut set = ComparisonSet::new(4).unwrap();
        for id in ["a", "b", "c", "d"] {
            set.toggle(spell(id)).unwrap();
        }
        set.set_max_size(2).unwrap();
        assert_eq!(set.as_slice(), &[spell("a"), spell("b")]);
    }

    #[test]
    fn minimum_capacity_is_two() {
        assert!(ComparisonSet::new(1).is_err());
    }
}
