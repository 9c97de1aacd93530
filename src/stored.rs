use std::collections::HashSet;

use crate::concept::Concept;
use crate::types::Position;

/// The persisted form of a concept inside a bank.
///
/// Holds the active trait positions as an unordered unique set, tuned for
/// fast membership tests and in-place replacement. Owned exclusively by
/// `Bank::storage`; never removed individually, only wholesale via
/// `Bank::clear`.
#[derive(Debug, Clone, Default)]
pub struct StoredConcept {
    positions: HashSet<Position>,
}

impl StoredConcept {
    /// Copy a concept's traits into a new stored set.
    pub fn new(concept: &Concept) -> Self {
        let mut stored = Self::default();
        stored.fill(concept);
        stored
    }

    /// Insert-union the concept's traits into the set. Does NOT clear
    /// first — replacement callers clear before filling.
    pub fn fill(&mut self, concept: &Concept) {
        self.positions.extend(concept.data().iter().copied());
    }

    /// Empty the set.
    pub fn clear(&mut self) {
        self.positions.clear();
    }

    /// Whether the given trait is active.
    pub fn contains(&self, position: Position) -> bool {
        self.positions.contains(&position)
    }

    /// Iterate the active traits in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = Position> + '_ {
        self.positions.iter().copied()
    }

    /// Number of active traits.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the set holds no traits.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Convert back to a transient concept. Lossless as a set; the
    /// resulting data is sorted like every constructed concept.
    pub fn to_concept(&self) -> Concept {
        Concept::from_positions(self.positions.iter().copied().collect())
    }
}
