//! FormatReader trait for format-agnostic plane access.
//!
//! This module defines the `FormatReader` trait, which provides a unified
//! interface for reading planes from multi-series images regardless of their
//! underlying format or of the decorator layers wrapped around them.
//!
//! # Usage
//!
//! The trait is implemented by the base decoders:
//! - [`crate::format::TiffReader`] for TIFF and BigTIFF files
//! - [`crate::format::RasterReader`] for JPEG and PNG files
//! - [`super::MemoryReader`] for planes already held in memory
//!
//! and by every decorator in [`crate::reader`], so a chain of layers is
//! itself a `FormatReader`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ReaderError;

use super::dimension::{DimensionOrder, PlaneExtents};
use super::plane::DecodedPlane;

// =============================================================================
// Pixel Type
// =============================================================================

/// Pixel type of a series, ordered by sample width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float,
    Double,
}

impl PixelType {
    pub const fn name(self) -> &'static str {
        match self {
            PixelType::Int8 => "int8",
            PixelType::Uint8 => "uint8",
            PixelType::Int16 => "int16",
            PixelType::Uint16 => "uint16",
            PixelType::Int32 => "int32",
            PixelType::Uint32 => "uint32",
            PixelType::Float => "float",
            PixelType::Double => "double",
        }
    }

    pub const fn bytes_per_sample(self) -> usize {
        match self {
            PixelType::Int8 | PixelType::Uint8 => 1,
            PixelType::Int16 | PixelType::Uint16 => 2,
            PixelType::Int32 | PixelType::Uint32 | PixelType::Float => 4,
            PixelType::Double => 8,
        }
    }

    /// Whether samples are at least 16 bits wide.
    pub fn is_wide(self) -> bool {
        self >= PixelType::Int16
    }
}

impl std::fmt::Display for PixelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Series Metadata
// =============================================================================

/// Physical pixel size in microns along each axis, when known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalSizes {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

/// Core metadata of one series as reported by a reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesCore {
    pub size_x: usize,
    pub size_y: usize,
    pub size_z: usize,
    /// Total channel count, including channels interleaved within planes
    pub size_c: usize,
    pub size_t: usize,

    /// Number of planes returned by `open_plane`
    pub image_count: usize,

    pub pixel_type: PixelType,

    /// Channels interleaved in each returned plane (1 for grayscale planes)
    pub rgb_channel_count: usize,

    pub interleaved: bool,
    pub little_endian: bool,
    pub dimension_order: DimensionOrder,

    /// Whether Z/C/T assignment is known rather than guessed
    pub order_certain: bool,

    pub name: Option<String>,
    pub physical: PhysicalSizes,
}

impl SeriesCore {
    /// Single-plane grayscale series of the given size and type.
    pub fn single_plane(size_x: usize, size_y: usize, pixel_type: PixelType) -> Self {
        SeriesCore {
            size_x,
            size_y,
            size_z: 1,
            size_c: 1,
            size_t: 1,
            image_count: 1,
            pixel_type,
            rgb_channel_count: 1,
            interleaved: false,
            little_endian: true,
            dimension_order: DimensionOrder::XYZCT,
            order_certain: true,
            name: None,
            physical: PhysicalSizes::default(),
        }
    }

    pub fn is_rgb(&self) -> bool {
        self.rgb_channel_count > 1
    }

    /// Number of planes along C.
    pub fn effective_size_c(&self) -> usize {
        (self.size_c / self.rgb_channel_count.max(1)).max(1)
    }

    pub fn extents(&self) -> PlaneExtents {
        PlaneExtents {
            size_z: self.size_z,
            size_c: self.effective_size_c(),
            size_t: self.size_t,
        }
    }

    /// Plane index of `(z, c, t)` in this series' dimension order.
    pub fn index(&self, z: usize, c: usize, t: usize) -> Result<usize, ReaderError> {
        self.dimension_order
            .index(self.extents(), z, c, t)
            .ok_or(ReaderError::InvalidCoordinates { z, c, t })
    }

    /// `(z, c, t)` of a plane index in this series' dimension order.
    pub fn coords(&self, no: usize) -> Result<(usize, usize, usize), ReaderError> {
        self.dimension_order
            .coords(self.extents(), no)
            .ok_or(ReaderError::PlaneOutOfRange {
                plane: no,
                count: self.image_count,
            })
    }

    pub fn check_plane(&self, no: usize) -> Result<(), ReaderError> {
        if no >= self.image_count {
            return Err(ReaderError::PlaneOutOfRange {
                plane: no,
                count: self.image_count,
            });
        }
        Ok(())
    }
}

// =============================================================================
// FormatReader Trait
// =============================================================================

/// Plane-indexed random access to a multi-series image.
///
/// Readers keep a current series; every per-series query and `open_plane`
/// refer to it. Decorators forward to an inner reader and may present a
/// different series shape (for example one plane per channel).
pub trait FormatReader: Send {
    /// Number of series in the source.
    fn series_count(&self) -> usize;

    /// Select the current series.
    ///
    /// # Errors
    /// * `ReaderError::SeriesOutOfRange` - `series >= series_count()`
    fn set_series(&mut self, series: usize) -> Result<(), ReaderError>;

    /// Index of the current series.
    fn series(&self) -> usize;

    /// Core metadata of the current series.
    fn core(&self) -> SeriesCore;

    /// Decode plane `no` of the current series.
    ///
    /// # Errors
    /// * `ReaderError::PlaneOutOfRange` - `no >= core().image_count`
    /// * `ReaderError::Format` - The underlying data could not be decoded
    fn open_plane(&mut self, no: usize) -> Result<DecodedPlane, ReaderError>;

    /// Known global `(min, max)` of channel `c` in the current series.
    fn channel_min_max(&self, c: usize) -> Option<(f64, f64)>;

    /// Decoder-native metadata entries.
    fn metadata(&self) -> BTreeMap<String, String>;

    /// Return palette indices instead of expanding them through the color table.
    fn set_ignore_color_table(&mut self, ignore: bool);

    /// Release the underlying source.
    fn close(&mut self) -> Result<(), ReaderError>;

    /// Identifier of the source (usually its path).
    fn identifier(&self) -> &str;

    /// Plane index of `(z, c, t)` in the current series.
    fn index(&self, z: usize, c: usize, t: usize) -> Result<usize, ReaderError> {
        self.core().index(z, c, t)
    }

    /// Checked series switch shared by implementations.
    fn check_series(&self, series: usize) -> Result<(), ReaderError> {
        let count = self.series_count();
        if series >= count {
            return Err(ReaderError::SeriesOutOfRange { series, count });
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_type_ordering() {
        assert!(PixelType::Int8 < PixelType::Uint8);
        assert!(PixelType::Uint8 < PixelType::Int16);
        assert!(PixelType::Uint32 < PixelType::Float);
        assert!(!PixelType::Uint8.is_wide());
        assert!(PixelType::Int16.is_wide());
        assert!(PixelType::Double.is_wide());
    }

    #[test]
    fn test_pixel_type_serde_names() {
        let json = serde_json::to_string(&PixelType::Uint16).unwrap();
        assert_eq!(json, "\"uint16\"");
        assert_eq!(PixelType::Float.to_string(), "float");
    }

    #[test]
    fn test_effective_size_c() {
        let mut core = SeriesCore::single_plane(4, 4, PixelType::Uint8);
        core.size_c = 3;
        core.rgb_channel_count = 3;
        assert!(core.is_rgb());
        assert_eq!(core.effective_size_c(), 1);

        core.size_c = 6;
        assert_eq!(core.effective_size_c(), 2);
    }

    #[test]
    fn test_core_index_and_coords() {
        let mut core = SeriesCore::single_plane(4, 4, PixelType::Uint8);
        core.size_z = 2;
        core.size_c = 3;
        core.image_count = 6;

        assert_eq!(core.index(1, 2, 0).unwrap(), 5);
        assert_eq!(core.coords(3).unwrap(), (1, 1, 0));
        assert!(matches!(
            core.index(0, 3, 0),
            Err(ReaderError::InvalidCoordinates { z: 0, c: 3, t: 0 })
        ));
        assert!(matches!(
            core.coords(6),
            Err(ReaderError::PlaneOutOfRange { plane: 6, count: 6 })
        ));
    }

    #[test]
    fn test_check_plane() {
        let core = SeriesCore::single_plane(1, 1, PixelType::Uint8);
        assert!(core.check_plane(0).is_ok());
        assert!(core.check_plane(1).is_err());
    }
}
