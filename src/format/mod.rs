//! Container formats and their plane readers.
//!
//! # Format Detection
//!
//! Use [`detect::detect_format`] to identify a file from its leading bytes.
//! Supported formats:
//!
//! - **TIFF / BigTIFF**: multi-page stacks, ImageJ hyperstacks, Aperio pages
//! - **JPEG / PNG**: single-plane images

pub mod description;
pub mod detect;
pub mod jpeg;
pub mod raster;
pub mod tiff;
pub mod tiff_reader;

pub use detect::{detect_format, detect_format_from_bytes, is_tiff_header, SourceFormat};
pub use raster::RasterReader;
pub use tiff_reader::TiffReader;
