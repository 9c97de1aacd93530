//! Binary `.sdr` v1 format codec.
//!
//! Every field is a `u32` little-endian, in this order:
//! ```text
//! [0..4]   Prefix: 0x5D
//! [4..8]   Version: 0x01
//! [8..12]  Width
//! [12..16] Storage count
//! ```
//! Followed by each stored concept in insertion order:
//! `trait_count`, then `trait_count` trait positions (set order).
//!
//! Loading validates the whole buffer before touching the bank: a bad
//! prefix, version, width, or truncated body leaves the prior state
//! intact.

use std::path::Path;

use crate::bank::Bank;
use crate::concept::Concept;
use crate::error::{Result, SdrError};
use crate::types::{Position, FILE_PREFIX, FILE_VERSION};

const HEADER_SIZE: usize = 16;

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Encode a bank's full state into the binary `.sdr` v1 format.
pub fn encode(bank: &Bank) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + 4 * bank.len());

    write_u32(&mut buf, FILE_PREFIX);
    write_u32(&mut buf, FILE_VERSION);
    write_u32(&mut buf, bank.width());
    write_u32(&mut buf, bank.len() as u32);

    for stored in bank.iter() {
        write_u32(&mut buf, stored.len() as u32);
        for p in stored.iter() {
            write_u32(&mut buf, p);
        }
    }

    buf
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Decode a `.sdr` v1 buffer and replace the bank's contents with it.
///
/// The stored width must equal the bank's current width — resize first if
/// it does not. Returns the number of concepts loaded. On any error the
/// bank keeps its prior state.
pub fn decode_into(bank: &mut Bank, data: &[u8]) -> Result<usize> {
    if data.len() < HEADER_SIZE {
        return Err(SdrError::Codec("data too short for header".into()));
    }

    let mut pos = 0;

    let prefix = read_u32(data, &mut pos)?;
    if prefix != FILE_PREFIX {
        return Err(SdrError::Codec(format!(
            "bad prefix: expected {FILE_PREFIX:#04x}, got {prefix:#04x}"
        )));
    }

    let version = read_u32(data, &mut pos)?;
    if version != FILE_VERSION {
        return Err(SdrError::Codec(format!("unsupported version: {version}")));
    }

    let width = read_u32(data, &mut pos)?;
    if width != bank.width() {
        return Err(SdrError::WidthMismatch {
            expected: bank.width(),
            got: width,
        });
    }

    let count = read_u32(data, &mut pos)? as usize;

    // Stage everything before mutating the bank, so a truncated or
    // corrupt body cannot leave it half loaded. Capacity is capped by
    // the bytes actually present so a corrupt count cannot over-allocate.
    let mut concepts = Vec::with_capacity(count.min(data.len() / 4));
    for _ in 0..count {
        let trait_count = read_u32(data, &mut pos)? as usize;
        let mut positions = Vec::with_capacity(trait_count);
        for _ in 0..trait_count {
            let p = read_u32(data, &mut pos)?;
            if p >= width {
                return Err(SdrError::Codec(format!(
                    "stored trait {p} exceeds width {width}"
                )));
            }
            positions.push(p);
        }
        concepts.push(Concept::from_positions(positions));
    }

    bank.clear();
    for concept in &concepts {
        bank.insert(concept)?;
    }

    log::debug!("loaded {count} concepts at width {width}");
    Ok(count)
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

/// Save a bank to disk atomically (temp file + rename). The `.sdr`
/// extension is conventional.
pub fn save_to_file(bank: &Bank, path: &Path) -> Result<()> {
    let data = encode(bank);
    let temp = path.with_extension("sdr.tmp");

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(&temp, &data)?;
    std::fs::rename(&temp, path)?;
    Ok(())
}

/// Load a bank's contents from a `.sdr` file, returning the number of
/// concepts loaded. The bank's prior state survives any failure.
pub fn load_from_file(bank: &mut Bank, path: &Path) -> Result<usize> {
    let data = std::fs::read(path)?;
    let count = decode_into(bank, &data);
    if count.is_err() {
        log::warn!("rejected .sdr file {}", path.display());
    }
    count
}

// ---------------------------------------------------------------------------
// Primitive read/write helpers (little-endian)
// ---------------------------------------------------------------------------

fn write_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn read_u32(data: &[u8], pos: &mut usize) -> Result<u32> {
    let end = *pos + 4;
    if end > data.len() {
        return Err(SdrError::Codec("truncated: field extends past end".into()));
    }
    let v = u32::from_le_bytes([data[*pos], data[*pos + 1], data[*pos + 2], data[*pos + 3]]);
    *pos = end;
    Ok(v)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn concept(positions: &[Position]) -> Concept {
        Concept::from_positions(positions.to_vec())
    }

    fn make_bank() -> Bank {
        let mut bank = Bank::new(16);
        bank.insert(&concept(&[])).unwrap();
        bank.insert(&concept(&[1, 3, 5])).unwrap();
        bank.insert(&concept(&[2, 3, 15])).unwrap();
        bank
    }

    #[test]
    fn header_layout() {
        let data = encode(&make_bank());
        assert_eq!(&data[0..4], &0x5Du32.to_le_bytes());
        assert_eq!(&data[4..8], &0x01u32.to_le_bytes());
        assert_eq!(&data[8..12], &16u32.to_le_bytes());
        assert_eq!(&data[12..16], &3u32.to_le_bytes());
    }

    #[test]
    fn encode_decode_round_trip() {
        let original = make_bank();
        let data = encode(&original);

        let mut restored = Bank::new(16);
        let count = decode_into(&mut restored, &data).unwrap();

        assert_eq!(count, 3);
        assert_eq!(restored.width(), original.width());
        assert_eq!(restored.len(), original.len());
        for (a, b) in original.iter().zip(restored.iter()) {
            assert_eq!(a.to_concept(), b.to_concept());
        }
    }

    #[test]
    fn decode_replaces_prior_contents() {
        let data = encode(&make_bank());
        let mut bank = Bank::new(16);
        bank.insert(&concept(&[9, 10])).unwrap();

        decode_into(&mut bank, &data).unwrap();
        assert_eq!(bank.len(), 3);
        assert_eq!(bank.get(0).unwrap().len(), 0);
    }

    #[test]
    fn bad_prefix_rejected() {
        let mut data = encode(&make_bank());
        data[0] = 0xFF;
        let mut bank = Bank::new(16);
        assert!(matches!(
            decode_into(&mut bank, &data),
            Err(SdrError::Codec(_))
        ));
    }

    #[test]
    fn bad_version_rejected() {
        let mut data = encode(&make_bank());
        data[4] = 0x7F;
        let mut bank = Bank::new(16);
        assert!(matches!(
            decode_into(&mut bank, &data),
            Err(SdrError::Codec(_))
        ));
    }

    #[test]
    fn width_mismatch_leaves_bank_untouched() {
        let data = encode(&make_bank()); // width 16
        let mut bank = Bank::new(8);
        let id = bank.insert(&concept(&[7])).unwrap();

        let err = decode_into(&mut bank, &data).unwrap_err();
        assert!(matches!(err, SdrError::WidthMismatch { expected: 8, got: 16 }));
        assert_eq!(bank.len(), 1);
        assert!(bank.get(id).unwrap().contains(7));
    }

    #[test]
    fn truncated_body_leaves_bank_untouched() {
        let data = encode(&make_bank());
        let truncated = &data[..data.len() - 3];

        let mut bank = Bank::new(16);
        bank.insert(&concept(&[4])).unwrap();

        assert!(decode_into(&mut bank, truncated).is_err());
        assert_eq!(bank.len(), 1);
        assert!(bank.get(0).unwrap().contains(4));
    }

    #[test]
    fn out_of_range_trait_rejected() {
        // Hand-build a file claiming width 4 with a trait at 9.
        let mut data = Vec::new();
        write_u32(&mut data, FILE_PREFIX);
        write_u32(&mut data, FILE_VERSION);
        write_u32(&mut data, 4);
        write_u32(&mut data, 1);
        write_u32(&mut data, 1);
        write_u32(&mut data, 9);

        let mut bank = Bank::new(4);
        assert!(matches!(
            decode_into(&mut bank, &data),
            Err(SdrError::Codec(_))
        ));
        assert!(bank.is_empty());
    }

    #[test]
    fn empty_bank_round_trip() {
        let original = Bank::new(32);
        let data = encode(&original);
        let mut restored = Bank::new(32);
        assert_eq!(decode_into(&mut restored, &data).unwrap(), 0);
        assert!(restored.is_empty());
    }

    #[test]
    fn file_round_trip() {
        let bank = make_bank();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sdr");

        save_to_file(&bank, &path).unwrap();

        let mut restored = Bank::new(16);
        let count = load_from_file(&mut restored, &path).unwrap();
        assert_eq!(count, 3);
        for (a, b) in bank.iter().zip(restored.iter()) {
            assert_eq!(a.to_concept(), b.to_concept());
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut bank = Bank::new(4);
        let err = load_from_file(&mut bank, Path::new("/nonexistent/x.sdr")).unwrap_err();
        assert!(matches!(err, SdrError::Io(_)));
    }
}
