//! TIFF parser for multi-page scientific images.
//!
//! This module handles parsing of TIFF and BigTIFF files: the header, the
//! IFD chain, tag values, and strip/tile decompression.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian, MM = big-endian)
//!   in the header. All multi-byte values must be read respecting this order.
//!
//! - **Classic TIFF vs BigTIFF**: Classic TIFF uses 32-bit offsets (max 4GB files),
//!   while BigTIFF uses 64-bit offsets. The parser handles both transparently.
//!
//! - **IFD (Image File Directory)**: Contains metadata and pointers to image data.
//!   A multi-page file has one IFD per plane; consecutive pages with the same
//!   geometry form one series.
//!
//! - **Inline vs offset values**: Small values are stored inline in the IFD entry,
//!   larger values are stored at an offset pointed to by the entry.

mod compression;
mod directory;
mod parser;
mod tags;
mod validation;
mod values;

pub use compression::{lzw_decode, undo_horizontal_predictor, unpack_bits};
pub use directory::{ChunkLayout, ImageDirectory, TiffDirectory};
pub use parser::{ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use tags::{Compression, FieldType, Photometric, SampleFormat, TiffTag};
pub use validation::{validate_image, validate_image_strict, ValidationError, ValidationResult};
pub use values::{parse_f64_array, parse_u32_array, parse_u64_array, ValueReader};
