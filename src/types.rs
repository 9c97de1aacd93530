use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Core aliases
// ---------------------------------------------------------------------------

/// A position plays two roles: a trait index in `[0, width)`, and a
/// concept's storage id (assigned sequentially on insert, never reused).
/// Both roles share one integer type because the binary format stores
/// both as u32 and the bitmap maps one role onto the other.
pub type Position = u32;

/// The size of a bank's trait universe.
pub type Width = u32;

// ---------------------------------------------------------------------------
// Binary format constants (.sdr v1)
// ---------------------------------------------------------------------------

/// Magic prefix of a `.sdr` file.
pub const FILE_PREFIX: u32 = 0x5D;

/// Current `.sdr` format version.
pub const FILE_VERSION: u32 = 0x01;

/// Below this width, union similarity builds the union as a dense bit
/// vector; at or above it, a hash set with a sorted merge intersection.
pub const UNION_DENSE_WIDTH_LIMIT: Width = 65536;

// ---------------------------------------------------------------------------
// Reply — tagged result container for the protocol boundary
// ---------------------------------------------------------------------------

/// A query result marshalled back through the text-protocol layer.
///
/// The protocol layer is external to this crate; it formats one `Reply`
/// per command response. Exhaustive matching here replaces the
/// runtime-tagged union the wire layer would otherwise need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reply {
    None,
    Bool(bool),
    Count(u64),
    Text(String),
    List(Vec<u64>),
    Pairs(Vec<(u64, u64)>),
}

impl Reply {
    /// Build a `Pairs` reply from a `closest` result.
    pub fn from_ranking(ranking: &[(Position, usize)]) -> Self {
        Reply::Pairs(
            ranking
                .iter()
                .map(|&(id, count)| (u64::from(id), count as u64))
                .collect(),
        )
    }

    /// Build a `List` reply from a `matching` result.
    pub fn from_ids(ids: &[Position]) -> Self {
        Reply::List(ids.iter().map(|&id| u64::from(id)).collect())
    }
}

impl std::fmt::Display for Reply {
    /// Render the reply as one line of protocol text.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reply::None => write!(f, "none"),
            Reply::Bool(b) => write!(f, "{b}"),
            Reply::Count(n) => write!(f, "{n}"),
            Reply::Text(s) => write!(f, "{s}"),
            Reply::List(ids) => {
                let mut first = true;
                for id in ids {
                    if !first {
                        write!(f, " ")?;
                    }
                    write!(f, "{id}")?;
                    first = false;
                }
                Ok(())
            }
            Reply::Pairs(pairs) => {
                let mut first = true;
                for (id, score) in pairs {
                    if !first {
                        write!(f, " ")?;
                    }
                    write!(f, "{id}:{score}")?;
                    first = false;
                }
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
