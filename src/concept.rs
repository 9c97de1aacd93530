use serde::{Deserialize, Serialize};

use crate::types::Position;

/// A transient sparse pattern — the set of active trait positions of one
/// input, before storage.
///
/// A concept is semantically a set: `data` is always sorted ascending and
/// duplicate-free, whichever constructor produced it. Queries that merge
/// against stored trait unions rely on that ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    data: Vec<Position>,
}

impl Concept {
    /// Build a concept from an explicit position list.
    ///
    /// The list is sorted and deduplicated; positions are NOT bounds
    /// checked here — the bank validates against its width on use.
    pub fn from_positions(mut positions: Vec<Position>) -> Self {
        positions.sort_unstable();
        positions.dedup();
        Self { data: positions }
    }

    /// Build a concept from a dense bit vector: every set bit's index
    /// becomes an active trait. The bit vector's length is the width.
    pub fn from_dense_bits(bits: &[bool]) -> Self {
        let data = bits
            .iter()
            .enumerate()
            .filter_map(|(i, &set)| set.then_some(i as Position))
            .collect();
        Self { data }
    }

    /// Build a concept from the `amount` highest-scoring indices of a
    /// scored array.
    ///
    /// Ties are broken by ascending index. Selection stops early at the
    /// first selected score of exactly 0.0, so the result holds at most
    /// `amount` traits and never a zero-scored one.
    pub fn top_k(scores: &[f64], amount: usize) -> Self {
        let mut idx: Vec<Position> = (0..scores.len() as Position).collect();
        idx.sort_unstable_by(|&a, &b| {
            scores[b as usize]
                .total_cmp(&scores[a as usize])
                .then(a.cmp(&b))
        });

        let mut data = Vec::with_capacity(amount.min(idx.len()));
        for &i in idx.iter().take(amount) {
            if scores[i as usize] == 0.0 {
                break;
            }
            data.push(i);
        }

        data.sort_unstable();
        Self { data }
    }

    /// The active trait positions, sorted ascending.
    pub fn data(&self) -> &[Position] {
        &self.data
    }

    /// Number of active traits.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the concept has no active traits.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_positions_sorts_and_dedups() {
        let c = Concept::from_positions(vec![5, 1, 3, 1, 5]);
        assert_eq!(c.data(), &[1, 3, 5]);
    }

    #[test]
    fn from_dense_bits_extracts_set_indices() {
        let bits = [false, true, false, true, false, true, false, false];
        let c = Concept::from_dense_bits(&bits);
        assert_eq!(c.data(), &[1, 3, 5]);
    }

    #[test]
    fn from_dense_bits_empty() {
        let c = Concept::from_dense_bits(&[false; 8]);
        assert!(c.is_empty());
    }

    #[test]
    fn top_k_selects_highest() {
        let scores = [0.1, 0.9, 0.5, 0.7, 0.2];
        let c = Concept::top_k(&scores, 3);
        // Highest three are indices 1, 3, 2
        assert_eq!(c.data(), &[1, 2, 3]);
    }

    #[test]
    fn top_k_truncates_at_zero_score() {
        // Only two non-zero scores: asking for four must stop at two.
        let scores = [0.0, 0.8, 0.0, 0.3, 0.0];
        let c = Concept::top_k(&scores, 4);
        assert_eq!(c.data(), &[1, 3]);
    }

    #[test]
    fn top_k_all_zero_gives_empty() {
        let c = Concept::top_k(&[0.0; 6], 3);
        assert!(c.is_empty());
    }

    #[test]
    fn top_k_ties_break_by_ascending_index() {
        let scores = [0.5, 0.5, 0.5, 0.5];
        let c = Concept::top_k(&scores, 2);
        assert_eq!(c.data(), &[0, 1]);
    }

    #[test]
    fn top_k_amount_larger_than_width() {
        let scores = [0.2, 0.4];
        let c = Concept::top_k(&scores, 10);
        assert_eq!(c.data(), &[0, 1]);
    }
}
