//! Format detection for image sources.
//!
//! Detection looks only at magic bytes. Supported containers:
//!
//! - **TIFF / BigTIFF**: `II*\0`, `MM\0*` (version 42) or version 43
//! - **JPEG**: `FF D8 FF`
//! - **PNG**: the 8-byte PNG signature
//!
//! Anything else is reported as `FormatError::UnsupportedFormat`.

use crate::error::FormatError;
use crate::io::RangeReader;

use super::tiff::{ByteOrder, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};

// =============================================================================
// SourceFormat
// =============================================================================

/// Detected container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Classic TIFF (32-bit offsets)
    Tiff,

    /// BigTIFF (64-bit offsets)
    BigTiff,

    /// JPEG/JFIF stream
    Jpeg,

    /// PNG image
    Png,
}

impl SourceFormat {
    /// Get a human-readable name for the format.
    pub const fn name(&self) -> &'static str {
        match self {
            SourceFormat::Tiff => "TIFF",
            SourceFormat::BigTiff => "BigTIFF",
            SourceFormat::Jpeg => "JPEG",
            SourceFormat::Png => "PNG",
        }
    }

    /// Whether the format is read by the TIFF decoder.
    pub const fn is_tiff(&self) -> bool {
        matches!(self, SourceFormat::Tiff | SourceFormat::BigTiff)
    }
}

// =============================================================================
// Format Detection
// =============================================================================

/// Number of leading bytes examined for detection.
const DETECTION_BYTES: usize = BIGTIFF_HEADER_SIZE;

const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Detect the container format of a source.
///
/// # Errors
/// * `FormatError::UnsupportedFormat` - No known signature matched
/// * `FormatError::Io` - The leading bytes could not be read
pub fn detect_format<R: RangeReader>(reader: &R) -> Result<SourceFormat, FormatError> {
    let len = (reader.size() as usize).min(DETECTION_BYTES);
    let bytes = reader.read_exact_at(0, len)?;

    detect_format_from_bytes(&bytes).ok_or_else(|| FormatError::UnsupportedFormat {
        reason: format!("{}: unrecognized file signature", reader.identifier()),
    })
}

/// Detect the container format from leading bytes.
pub fn detect_format_from_bytes(bytes: &[u8]) -> Option<SourceFormat> {
    if is_tiff_header(bytes) {
        let byte_order = if bytes[0] == 0x49 {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        };
        return match byte_order.read_u16(&bytes[2..4]) {
            43 => Some(SourceFormat::BigTiff),
            _ => Some(SourceFormat::Tiff),
        };
    }

    if bytes.starts_with(&JPEG_MAGIC) {
        return Some(SourceFormat::Jpeg);
    }

    if bytes.starts_with(&PNG_MAGIC) {
        return Some(SourceFormat::Png);
    }

    None
}

/// Check if bytes represent a valid TIFF header.
///
/// This is a quick check that can be used before attempting full parsing.
pub fn is_tiff_header(bytes: &[u8]) -> bool {
    if bytes.len() < TIFF_HEADER_SIZE {
        return false;
    }

    let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
    if magic != 0x4949 && magic != 0x4D4D {
        return false;
    }

    let byte_order = if magic == 0x4949 {
        ByteOrder::LittleEndian
    } else {
        ByteOrder::BigEndian
    };

    let version = byte_order.read_u16(&bytes[2..4]);
    version == 42 || version == 43
}

// =============================================================================
// Tests
// =============================================================================
