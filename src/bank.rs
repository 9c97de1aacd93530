use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::concept::Concept;
use crate::error::{Result, SdrError};
use crate::stored::StoredConcept;
use crate::types::{Position, Width, UNION_DENSE_WIDTH_LIMIT};

/// What a query runs against: an already-stored concept named by its
/// storage id, or an ad-hoc pattern that was never inserted.
#[derive(Debug, Clone)]
pub enum Cue {
    Id(Position),
    Pattern(Concept),
}

impl From<Position> for Cue {
    fn from(id: Position) -> Self {
        Cue::Id(id)
    }
}

impl From<Concept> for Cue {
    fn from(concept: Concept) -> Self {
        Cue::Pattern(concept)
    }
}

impl From<&Concept> for Cue {
    fn from(concept: &Concept) -> Self {
        Cue::Pattern(concept.clone())
    }
}

/// The union of several stored concepts' traits, in the representation
/// picked by the bank's width.
enum UnionSet {
    /// One flag per trait position. Cheap while width is small.
    Dense(Vec<bool>),
    /// Sorted trait list, intersected by a two-pointer merge.
    Sparse(Vec<Position>),
}

impl UnionSet {
    /// Count how many of `traits` (sorted ascending) fall in the union.
    fn intersect_count(&self, traits: &[Position]) -> usize {
        match self {
            UnionSet::Dense(flags) => traits
                .iter()
                .filter(|&&p| flags[p as usize])
                .count(),
            UnionSet::Sparse(sorted) => {
                let mut result = 0;
                let mut it = sorted.iter().peekable();
                for &p in traits {
                    while it.next_if(|&&u| u < p).is_some() {}
                    if it.next_if(|&&u| u == p).is_some() {
                        result += 1;
                    }
                }
                result
            }
        }
    }

    /// Sum `weights[p]` over the traits (sorted ascending) in the union.
    fn intersect_weight(&self, traits: &[Position], weights: &[f64]) -> f64 {
        match self {
            UnionSet::Dense(flags) => traits
                .iter()
                .filter(|&&p| flags[p as usize])
                .map(|&p| weights[p as usize])
                .sum(),
            UnionSet::Sparse(sorted) => {
                let mut result = 0.0;
                let mut it = sorted.iter().peekable();
                for &p in traits {
                    while it.next_if(|&&u| u < p).is_some() {}
                    if it.next_if(|&&u| u == p).is_some() {
                        result += weights[p as usize];
                    }
                }
                result
            }
        }
    }
}

/// A sparse-distributed-representation memory bank.
///
/// The bank keeps two views of the same data: `storage`, an append-only
/// list of stored concepts indexed by storage id, and `bitmap`, the
/// inverted index mapping each trait position to the set of storage ids
/// that carry it. Every mutation keeps the two in exact correspondence:
/// `p ∈ storage[s] ⇔ s ∈ bitmap[p]`.
///
/// Queries take `&self` and are safe to run concurrently; mutations take
/// `&mut self`, so writer exclusion is enforced by the borrow checker.
/// The async ranking variants share the bank through an `Arc` and run on
/// independent threads over the read-only state.
pub struct Bank {
    /// Size of the trait universe. Fixed until `resize`.
    width: Width,
    /// Inverted index: trait position → storage ids carrying it.
    bitmap: Vec<HashSet<Position>>,
    /// Every concept ever inserted since the last clear/resize.
    storage: Vec<StoredConcept>,
}

impl Bank {
    /// Create an empty bank over a trait universe of the given width.
    pub fn new(width: Width) -> Self {
        Self {
            width,
            bitmap: vec![HashSet::new(); width as usize],
            storage: Vec::new(),
        }
    }

    /// Size of the trait universe.
    pub fn width(&self) -> Width {
        self.width
    }

    /// Number of concepts inserted since the last clear/resize.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Whether the bank stores no concepts.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Get a stored concept by id.
    pub fn get(&self, id: Position) -> Option<&StoredConcept> {
        self.storage.get(id as usize)
    }

    /// Iterate all stored concepts in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &StoredConcept> {
        self.storage.iter()
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Insert a concept, returning its storage id.
    ///
    /// Ids are assigned sequentially from 0 and never reused. Every trait
    /// must be `< width`; a rejected insert leaves the bank untouched.
    pub fn insert(&mut self, concept: &Concept) -> Result<Position> {
        self.check_traits(concept.data())?;

        self.storage.push(StoredConcept::new(concept));
        let id = (self.storage.len() - 1) as Position;

        for &p in concept.data() {
            self.bitmap[p as usize].insert(id);
        }

        Ok(id)
    }

    /// Replace the traits of the concept stored at `id` in place.
    ///
    /// The id stays stable; the bitmap is rewritten to match. Validation
    /// happens before any state change.
    pub fn update(&mut self, id: Position, concept: &Concept) -> Result<()> {
        self.check_id(id)?;
        self.check_traits(concept.data())?;

        let stored = &mut self.storage[id as usize];
        for p in stored.iter() {
            self.bitmap[p as usize].remove(&id);
        }

        stored.clear();
        stored.fill(concept);

        for &p in concept.data() {
            self.bitmap[p as usize].insert(id);
        }

        Ok(())
    }

    /// Remove every stored concept. Width is unchanged; storage ids
    /// restart from 0 on the next insert.
    pub fn clear(&mut self) {
        self.storage.clear();
        for postings in &mut self.bitmap {
            postings.clear();
        }
        log::debug!("bank cleared (width {})", self.width);
    }

    /// Change the trait universe width. Clears all stored data first —
    /// concepts do not survive a resize.
    pub fn resize(&mut self, new_width: Width) {
        self.storage.clear();
        self.bitmap = vec![HashSet::new(); new_width as usize];
        self.width = new_width;
        log::debug!("bank resized to width {new_width}, storage discarded");
    }

    // -----------------------------------------------------------------------
    // Similarity
    // -----------------------------------------------------------------------

    /// Number of traits shared between the cue and the concept stored at
    /// `b`, counted by bitmap membership. Cost is proportional to the
    /// cue's trait count, not `b`'s.
    pub fn similarity(&self, cue: &Cue, b: Position) -> Result<usize> {
        self.check_id(b)?;
        let traits = self.cue_traits(cue)?;

        Ok(traits
            .iter()
            .filter(|&&p| self.bitmap[p as usize].contains(&b))
            .count())
    }

    /// As `similarity`, but each shared trait contributes `weights[p]`
    /// instead of 1. `weights` must have exactly `width` entries.
    pub fn weighted_similarity(&self, cue: &Cue, b: Position, weights: &[f64]) -> Result<f64> {
        self.check_id(b)?;
        self.check_weights(weights)?;
        let traits = self.cue_traits(cue)?;

        Ok(traits
            .iter()
            .filter(|&&p| self.bitmap[p as usize].contains(&b))
            .map(|&p| weights[p as usize])
            .sum())
    }

    /// Similarity between the cue and the OR of the stored concepts named
    /// in `ids`: how many of the cue's traits fall in that union.
    pub fn union_similarity(&self, cue: &Cue, ids: &[Position]) -> Result<usize> {
        let traits = self.cue_traits(cue)?;
        let union = self.union_of(ids)?;
        Ok(union.intersect_count(&traits))
    }

    /// As `union_similarity`, but traits found in the union contribute
    /// `weights[p]` instead of 1.
    pub fn weighted_union_similarity(
        &self,
        cue: &Cue,
        ids: &[Position],
        weights: &[f64],
    ) -> Result<f64> {
        self.check_weights(weights)?;
        let traits = self.cue_traits(cue)?;
        let union = self.union_of(ids)?;
        Ok(union.intersect_weight(&traits, weights))
    }

    // -----------------------------------------------------------------------
    // Ranking
    // -----------------------------------------------------------------------

    /// The `amount` stored concepts sharing the most traits with the cue,
    /// as `(id, shared_count)` pairs in descending count order, ties
    /// broken by ascending id. Returns at most `len()` entries.
    ///
    /// An id cue never ranks itself: its own counter is zeroed before the
    /// sort. A pattern cue ranks every stored concept.
    pub fn closest(&self, cue: &Cue, amount: usize) -> Result<Vec<(Position, usize)>> {
        let traits = self.cue_traits(cue)?;

        // Inverted-index fan-out: cost is the postings touched.
        let mut counts = vec![0usize; self.storage.len()];
        for &p in traits.iter() {
            for &id in &self.bitmap[p as usize] {
                counts[id as usize] += 1;
            }
        }

        if let Cue::Id(id) = cue {
            counts[*id as usize] = 0;
        }

        let take = amount.min(counts.len());
        let mut idx: Vec<Position> = (0..counts.len() as Position).collect();
        idx.sort_unstable_by(|&a, &b| {
            counts[b as usize]
                .cmp(&counts[a as usize])
                .then(a.cmp(&b))
        });
        idx.truncate(take);

        Ok(idx
            .into_iter()
            .map(|id| (id, counts[id as usize]))
            .collect())
    }

    /// As `closest`, but each shared trait contributes `weights[p]`,
    /// ranking by the accumulated score.
    pub fn weighted_closest(
        &self,
        cue: &Cue,
        amount: usize,
        weights: &[f64],
    ) -> Result<Vec<(Position, f64)>> {
        self.check_weights(weights)?;
        let traits = self.cue_traits(cue)?;

        let mut scores = vec![0.0f64; self.storage.len()];
        for &p in traits.iter() {
            for &id in &self.bitmap[p as usize] {
                scores[id as usize] += weights[p as usize];
            }
        }

        if let Cue::Id(id) = cue {
            scores[*id as usize] = 0.0;
        }

        let take = amount.min(scores.len());
        let mut idx: Vec<Position> = (0..scores.len() as Position).collect();
        idx.sort_unstable_by(|&a, &b| {
            scores[b as usize]
                .total_cmp(&scores[a as usize])
                .then(a.cmp(&b))
        });
        idx.truncate(take);

        Ok(idx
            .into_iter()
            .map(|id| (id, scores[id as usize]))
            .collect())
    }

    /// Run `closest` on an independent thread over the shared bank,
    /// returning the handle to join on. Fan out many of these against one
    /// `Arc<Bank>` — read-only state, nothing shared mutably.
    pub fn async_closest(
        self: &Arc<Self>,
        cue: Cue,
        amount: usize,
    ) -> JoinHandle<Result<Vec<(Position, usize)>>> {
        let bank = Arc::clone(self);
        thread::spawn(move || bank.closest(&cue, amount))
    }

    /// Run `weighted_closest` on an independent thread over the shared
    /// bank, returning the handle to join on.
    pub fn async_weighted_closest(
        self: &Arc<Self>,
        cue: Cue,
        amount: usize,
        weights: Vec<f64>,
    ) -> JoinHandle<Result<Vec<(Position, f64)>>> {
        let bank = Arc::clone(self);
        thread::spawn(move || bank.weighted_closest(&cue, amount, &weights))
    }

    // -----------------------------------------------------------------------
    // Matching
    // -----------------------------------------------------------------------

    /// Ids of every stored concept carrying ALL of the query's traits
    /// (superset match), sorted ascending. An empty query matches nothing.
    ///
    /// Candidates come from the query trait with the shortest posting
    /// list, then verify against the remaining lists.
    pub fn matching(&self, concept: &Concept) -> Result<Vec<Position>> {
        self.check_traits(concept.data())?;

        let mut traits: Vec<Position> = concept.data().to_vec();
        traits.sort_unstable_by_key(|&p| self.bitmap[p as usize].len());

        let Some((&first, rest)) = traits.split_first() else {
            return Ok(Vec::new());
        };

        let mut result: Vec<Position> = self.bitmap[first as usize]
            .iter()
            .copied()
            .filter(|&id| rest.iter().all(|&m| self.bitmap[m as usize].contains(&id)))
            .collect();
        result.sort_unstable();
        Ok(result)
    }

    /// Ids of every stored concept sharing at least `amount` of the
    /// query's traits, sorted ascending. Candidates are concepts sharing
    /// at least one query trait, so a zero threshold still only returns
    /// concepts that overlap the query at all.
    pub fn matching_threshold(&self, concept: &Concept, amount: usize) -> Result<Vec<Position>> {
        self.check_traits(concept.data())?;

        let mut counts = vec![0usize; self.storage.len()];
        for &p in concept.data() {
            for &id in &self.bitmap[p as usize] {
                counts[id as usize] += 1;
            }
        }

        Ok(counts
            .iter()
            .enumerate()
            .filter(|&(_, &n)| n > 0 && n >= amount)
            .map(|(id, _)| id as Position)
            .collect())
    }

    /// Threshold matching with a weighted score: ids of every stored
    /// concept whose satisfied query traits sum to at least `amount`
    /// under `weights`, sorted ascending.
    pub fn weighted_matching(
        &self,
        concept: &Concept,
        amount: f64,
        weights: &[f64],
    ) -> Result<Vec<Position>> {
        self.check_traits(concept.data())?;
        self.check_weights(weights)?;

        let mut counts = vec![0usize; self.storage.len()];
        let mut scores = vec![0.0f64; self.storage.len()];
        for &p in concept.data() {
            for &id in &self.bitmap[p as usize] {
                counts[id as usize] += 1;
                scores[id as usize] += weights[p as usize];
            }
        }

        Ok(scores
            .iter()
            .enumerate()
            .filter(|&(id, &score)| counts[id] > 0 && score >= amount)
            .map(|(id, _)| id as Position)
            .collect())
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    /// Resolve a cue to its sorted trait list: borrowed from a pattern
    /// (sorted by construction), or collected and sorted from storage.
    fn cue_traits<'a>(&'a self, cue: &'a Cue) -> Result<Cow<'a, [Position]>> {
        match cue {
            Cue::Id(id) => {
                self.check_id(*id)?;
                let mut traits: Vec<Position> = self.storage[*id as usize].iter().collect();
                traits.sort_unstable();
                Ok(Cow::Owned(traits))
            }
            Cue::Pattern(concept) => {
                self.check_traits(concept.data())?;
                Ok(Cow::Borrowed(concept.data()))
            }
        }
    }

    /// Union of the named stored concepts' traits, dense or sparse
    /// depending on width.
    fn union_of(&self, ids: &[Position]) -> Result<UnionSet> {
        for &id in ids {
            self.check_id(id)?;
        }

        if self.width < UNION_DENSE_WIDTH_LIMIT {
            let mut flags = vec![false; self.width as usize];
            for &id in ids {
                for p in self.storage[id as usize].iter() {
                    flags[p as usize] = true;
                }
            }
            Ok(UnionSet::Dense(flags))
        } else {
            let mut set: HashSet<Position> = HashSet::new();
            for &id in ids {
                set.extend(self.storage[id as usize].iter());
            }
            let mut sorted: Vec<Position> = set.into_iter().collect();
            sorted.sort_unstable();
            Ok(UnionSet::Sparse(sorted))
        }
    }

    fn check_traits(&self, traits: &[Position]) -> Result<()> {
        for &p in traits {
            if p >= self.width {
                return Err(SdrError::InvalidTrait {
                    position: p,
                    width: self.width,
                });
            }
        }
        Ok(())
    }

    fn check_id(&self, id: Position) -> Result<()> {
        if (id as usize) < self.storage.len() {
            Ok(())
        } else {
            Err(SdrError::InvalidConceptId {
                id,
                storage_size: self.storage.len(),
            })
        }
    }

    fn check_weights(&self, weights: &[f64]) -> Result<()> {
        if weights.len() == self.width as usize {
            Ok(())
        } else {
            Err(SdrError::WidthMismatch {
                expected: self.width,
                got: weights.len() as Width,
            })
        }
    }
}
