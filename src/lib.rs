//! Sparse-distributed-representation memory.
//!
//! Sdrbank-rs stores concepts as sparse sets of active trait positions
//! over a fixed-width universe and answers similarity, nearest-neighbor,
//! and trait-matching queries through an inverted index (trait → storage
//! ids). Banks persist to a compact binary `.sdr` format and run
//! read-only queries concurrently over shared state.

pub mod bank;
pub mod codec;
pub mod concept;
pub mod error;
pub mod stored;
pub mod types;

pub use bank::{Bank, Cue};
pub use codec::{load_from_file, save_to_file};
pub use concept::Concept;
pub use error::{Result, SdrError};
pub use stored::StoredConcept;
pub use types::{Position, Reply, Width};
