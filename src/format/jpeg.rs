//! JPEG-in-TIFF stream preparation.
//!
//! TIFF writers using Compression = 7 may store each strip or tile as an
//! abbreviated JPEG stream: SOI, scan data and EOI, with the quantization and
//! Huffman tables kept once in the `JPEGTables` tag. A decoder needs a full
//! interchange stream, obtained by splicing the tables in front of the scan:
//!
//! ```text
//! tables: SOI DQT DHT ... EOI
//! chunk:  SOI SOS ... EOI
//! merged: SOI DQT DHT ... SOS ... EOI
//! ```

use bytes::{Bytes, BytesMut};

/// Start Of Image marker
pub const SOI: [u8; 2] = [0xFF, 0xD8];

/// End Of Image marker
pub const EOI: [u8; 2] = [0xFF, 0xD9];

/// Define Huffman Table marker
pub const DHT: [u8; 2] = [0xFF, 0xC4];

/// Define Quantization Table marker
pub const DQT: [u8; 2] = [0xFF, 0xDB];

/// Start Of Scan marker
pub const SOS: [u8; 2] = [0xFF, 0xDA];

// =============================================================================
// Stream inspection
// =============================================================================

/// Whether `data` reaches its scan (SOS) without defining any tables.
pub fn is_abbreviated_stream(data: &[u8]) -> bool {
    if data.len() < 4 || data[0..2] != SOI {
        return false;
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }

        let marker = [data[pos], data[pos + 1]];
        if marker == DQT || marker == DHT {
            return false;
        }
        if marker == SOS {
            return true;
        }

        // Segments other than SOI/EOI/stuffing carry a big-endian length.
        let has_length = !matches!(marker[1], 0x00 | 0xD8 | 0xD9);
        if has_length && pos + 3 < data.len() {
            let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
            pos += 2 + length;
        } else {
            pos += 2;
        }
    }

    false
}

/// Whether `data` is an SOI-led stream that defines its own quantization tables.
pub fn has_own_tables(data: &[u8]) -> bool {
    data.len() >= 4 && data[0..2] == SOI && data[2..].windows(2).any(|w| w == DQT)
}

// =============================================================================
// Merging
// =============================================================================

/// Splice `tables` (SOI ... EOI) in front of an abbreviated `chunk` (SOI ... EOI).
///
/// The trailing EOI of the tables and the leading SOI of the chunk are dropped,
/// so the result carries exactly one of each.
pub fn merge_tables(tables: &[u8], chunk: &[u8]) -> Bytes {
    if tables.is_empty() {
        return Bytes::copy_from_slice(chunk);
    }
    if chunk.is_empty() {
        return Bytes::new();
    }

    let tables = tables.strip_suffix(&EOI).unwrap_or(tables);
    let chunk = chunk.strip_prefix(&SOI).unwrap_or(chunk);

    let mut merged = BytesMut::with_capacity(tables.len() + chunk.len());
    merged.extend_from_slice(tables);
    merged.extend_from_slice(chunk);
    merged.freeze()
}

/// A decodable stream for one strip or tile.
///
/// Chunks that define their own tables, or that have no `JPEGTables` to draw
/// from, are returned unchanged.
pub fn prepare_chunk_jpeg(tables: Option<&[u8]>, chunk: &[u8]) -> Bytes {
    match tables {
        Some(tables) if !has_own_tables(chunk) && is_abbreviated_stream(chunk) => {
            merge_tables(tables, chunk)
        }
        _ => Bytes::copy_from_slice(chunk),
    }
}
