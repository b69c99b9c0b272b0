//! Supported-layout validation for TIFF pages.
//!
//! Pages outside the supported subset are rejected when the file is opened,
//! before any plane is decoded.
//!
//! # Supported Subset
//!
//! - **Organization**: strips or tiles, chunky or planar
//! - **Compression**: none, LZW, PackBits, JPEG
//! - **Samples**: 8/16/32-bit integers, 32/64-bit floats
//! - **Palette**: 8 or 16-bit indices with a complete ColorMap

use crate::error::TiffError;

use super::directory::ImageDirectory;
use super::tags::{Compression, Photometric, SampleFormat};

// =============================================================================
// Validation Result
// =============================================================================

/// Result of validating a TIFF page.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the page can be decoded
    pub is_valid: bool,

    /// List of validation errors (empty if valid)
    pub errors: Vec<ValidationError>,

    /// List of validation warnings (non-fatal issues)
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Create a successful validation result.
    pub fn ok() -> Self {
        ValidationResult {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error to the result.
    pub fn add_error(&mut self, error: ValidationError) {
        self.is_valid = false;
        self.errors.push(error);
    }

    /// Add a warning to the result.
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Convert to a TiffError if invalid.
    ///
    /// Returns the first error as a TiffError, or Ok(()) if valid.
    pub fn into_result(self) -> Result<(), TiffError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }
}

/// A specific validation error.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Unsupported compression scheme
    UnsupportedCompression {
        ifd_index: usize,
        compression: u16,
        compression_name: String,
    },

    /// Bit depth / sample format combination without a pixel type
    UnsupportedSampleType {
        ifd_index: usize,
        bits_per_sample: u16,
        sample_format: SampleFormat,
    },

    /// Palette page without a usable ColorMap
    MissingColorMap { ifd_index: usize },

    /// Strip or tile arrays do not cover the image
    ChunkCountMismatch {
        ifd_index: usize,
        expected: usize,
        offsets: usize,
        byte_counts: usize,
    },

    /// Zero-sized page
    EmptyImage { ifd_index: usize },
}

impl From<ValidationError> for TiffError {
    fn from(error: ValidationError) -> Self {
        match error {
            ValidationError::UnsupportedCompression {
                compression_name, ..
            } => TiffError::UnsupportedCompression(compression_name),
            ValidationError::UnsupportedSampleType {
                ifd_index,
                bits_per_sample,
                sample_format,
            } => TiffError::UnsupportedLayout(format!(
                "IFD {}: {}-bit {:?} samples",
                ifd_index, bits_per_sample, sample_format
            )),
            ValidationError::MissingColorMap { .. } => TiffError::MissingTag("ColorMap"),
            ValidationError::ChunkCountMismatch {
                ifd_index,
                expected,
                offsets,
                byte_counts,
            } => TiffError::InvalidTagValue {
                tag: "StripOffsets/TileOffsets",
                message: format!(
                    "IFD {}: expected {} chunks, found {} offsets and {} byte counts",
                    ifd_index, expected, offsets, byte_counts
                ),
            },
            ValidationError::EmptyImage { ifd_index } => TiffError::InvalidTagValue {
                tag: "ImageWidth/ImageLength",
                message: format!("IFD {} has zero width or height", ifd_index),
            },
        }
    }
}

// =============================================================================
// Page Validation
// =============================================================================

/// Validate a single page for decoding.
///
/// Returns a ValidationResult that may contain errors or warnings.
pub fn validate_image(image: &ImageDirectory) -> ValidationResult {
    let mut result = ValidationResult::ok();
    let ifd_index = image.ifd_index;

    if image.width == 0 || image.height == 0 {
        result.add_error(ValidationError::EmptyImage { ifd_index });
    }

    match Compression::from_u16(image.compression) {
        Some(compression) if compression.is_supported() => {}
        Some(compression) => result.add_error(ValidationError::UnsupportedCompression {
            ifd_index,
            compression: image.compression,
            compression_name: compression.name().to_string(),
        }),
        None => result.add_error(ValidationError::UnsupportedCompression {
            ifd_index,
            compression: image.compression,
            compression_name: format!("Unknown ({})", image.compression),
        }),
    }

    let sample_ok = matches!(
        (image.sample_format, image.bits_per_sample),
        (SampleFormat::Unsigned | SampleFormat::Signed, 8 | 16 | 32) | (SampleFormat::Float, 32 | 64)
    );
    if !sample_ok {
        result.add_error(ValidationError::UnsupportedSampleType {
            ifd_index,
            bits_per_sample: image.bits_per_sample,
            sample_format: image.sample_format,
        });
    }

    if image.photometric == Photometric::Palette {
        let needed = 3usize << image.bits_per_sample.min(16);
        let complete = image
            .color_map
            .as_ref()
            .is_some_and(|map| map.len() >= needed);
        if !complete {
            result.add_error(ValidationError::MissingColorMap { ifd_index });
        }
    }

    let planes = if image.planar {
        image.samples_per_pixel as usize
    } else {
        1
    };
    let expected = image.chunks_per_plane() * planes;
    let offsets = image.chunk_offsets.len();
    let byte_counts = image.chunk_byte_counts.len();
    if offsets < expected || byte_counts < expected {
        result.add_error(ValidationError::ChunkCountMismatch {
            ifd_index,
            expected,
            offsets,
            byte_counts,
        });
    }

    if image.predictor != 1 && image.predictor != 2 {
        result.add_warning(format!(
            "IFD {}: predictor {} ignored",
            ifd_index, image.predictor
        ));
    }

    result
}

/// Validate a page and convert the first problem into a `TiffError`.
pub fn validate_image_strict(image: &ImageDirectory) -> Result<(), TiffError> {
    validate_image(image).into_result()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::tiff::directory::ChunkLayout;

    fn make_image() -> ImageDirectory {
        ImageDirectory {
            ifd_index: 0,
            width: 64,
            height: 64,
            bits_per_sample: 8,
            samples_per_pixel: 1,
            sample_format: SampleFormat::Unsigned,
            compression: 1,
            photometric: Photometric::BlackIsZero,
            planar: false,
            predictor: 1,
            layout: ChunkLayout::Strips { rows_per_strip: 16 },
            chunk_offsets: vec![100, 200, 300, 400],
            chunk_byte_counts: vec![1024; 4],
            jpeg_tables: None,
            color_map: None,
            description: None,
            page_name: None,
            software: None,
            date_time: None,
            x_resolution: None,
            y_resolution: None,
            resolution_unit: 2,
            min_sample_value: None,
            max_sample_value: None,
            reduced_resolution: false,
        }
    }

    #[test]
    fn test_validate_plain_strips() {
        let result = validate_image(&make_image());
        assert!(result.is_valid);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_validate_unsupported_compression() {
        let mut image = make_image();
        image.compression = 8; // Deflate

        let result = validate_image(&image);
        assert!(!result.is_valid);
        assert!(matches!(
            result.errors[0],
            ValidationError::UnsupportedCompression { compression: 8, .. }
        ));
        assert!(matches!(
            result.into_result(),
            Err(TiffError::UnsupportedCompression(_))
        ));
    }

    #[test]
    fn test_validate_unknown_compression() {
        let mut image = make_image();
        image.compression = 9999;

        let err = validate_image_strict(&image).unwrap_err();
        assert!(err.to_string().contains("Unknown (9999)"));
    }

    #[test]
    fn test_validate_bilevel_rejected() {
        let mut image = make_image();
        image.bits_per_sample = 1;

        let result = validate_image(&image);
        assert!(matches!(
            result.errors[0],
            ValidationError::UnsupportedSampleType { bits_per_sample: 1, .. }
        ));
    }

    #[test]
    fn test_validate_float16_rejected() {
        let mut image = make_image();
        image.bits_per_sample = 16;
        image.sample_format = SampleFormat::Float;

        assert!(!validate_image(&image).is_valid);
    }

    #[test]
    fn test_validate_palette_needs_color_map() {
        let mut image = make_image();
        image.photometric = Photometric::Palette;
        assert!(matches!(
            validate_image_strict(&image),
            Err(TiffError::MissingTag("ColorMap"))
        ));

        image.color_map = Some(vec![0; 3 * 256]);
        assert!(validate_image(&image).is_valid);
    }

    #[test]
    fn test_validate_chunk_count_mismatch() {
        let mut image = make_image();
        image.chunk_offsets.truncate(2);

        let result = validate_image(&image);
        assert_eq!(
            result.errors,
            vec![ValidationError::ChunkCountMismatch {
                ifd_index: 0,
                expected: 4,
                offsets: 2,
                byte_counts: 4,
            }]
        );
    }

    #[test]
    fn test_validate_planar_needs_chunks_per_sample() {
        let mut image = make_image();
        image.samples_per_pixel = 3;
        image.planar = true;

        let result = validate_image(&image);
        assert!(!result.is_valid);

        image.chunk_offsets = vec![0; 12];
        image.chunk_byte_counts = vec![0; 12];
        assert!(validate_image(&image).is_valid);
    }

    #[test]
    fn test_validate_unknown_predictor_warns() {
        let mut image = make_image();
        image.predictor = 3;

        let result = validate_image(&image);
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
    }
}
