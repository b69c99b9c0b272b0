//! Single-image JPEG and PNG reader.
//!
//! The whole file is decoded once at open time; the reader then exposes a
//! one-series, one-plane image. Alpha channels are dropped.

use std::collections::BTreeMap;

use image::{DynamicImage, ImageFormat};
use tracing::debug;

use crate::error::{FormatError, ReaderError};
use crate::io::RangeReader;
use crate::reader::{DecodedPlane, FormatReader, PixelType, Samples, SeriesCore};

use super::detect::SourceFormat;

/// `FormatReader` over a JPEG or PNG image.
#[derive(Debug)]
pub struct RasterReader {
    identifier: String,
    format: SourceFormat,
    core: SeriesCore,
    plane: Option<DecodedPlane>,
}

impl RasterReader {
    /// Decode the full image behind `reader`.
    ///
    /// # Errors
    /// * `FormatError::UnsupportedFormat` - `format` is not a raster format
    /// * `FormatError::Codec` - The image data cannot be decoded
    pub fn open<R: RangeReader>(reader: &R, format: SourceFormat) -> Result<Self, FormatError> {
        let image_format = match format {
            SourceFormat::Jpeg => ImageFormat::Jpeg,
            SourceFormat::Png => ImageFormat::Png,
            other => {
                return Err(FormatError::UnsupportedFormat {
                    reason: format!("{} is not a raster format", other.name()),
                })
            }
        };

        let data = reader.read_all()?;
        let decoded = image::load_from_memory_with_format(&data, image_format)
            .map_err(|e| FormatError::Codec(format!("{}: {}", reader.identifier(), e)))?;

        let plane = plane_from_image(decoded);
        let pixel_type = match plane.samples {
            Samples::UShort(_) => PixelType::Uint16,
            Samples::Float(_) => PixelType::Float,
            _ => PixelType::Uint8,
        };

        let mut core = SeriesCore::single_plane(plane.width, plane.height, pixel_type);
        core.size_c = plane.bands;
        core.rgb_channel_count = plane.bands;
        core.interleaved = plane.bands > 1;

        debug!(
            identifier = reader.identifier(),
            format = format.name(),
            width = plane.width,
            height = plane.height,
            bands = plane.bands,
            "Decoded raster image"
        );

        Ok(RasterReader {
            identifier: reader.identifier().to_string(),
            format,
            core,
            plane: Some(plane),
        })
    }
}

/// Convert a decoded image to a plane of 1 or 3 bands.
fn plane_from_image(image: DynamicImage) -> DecodedPlane {
    let width = image.width() as usize;
    let height = image.height() as usize;

    let (bands, samples) = match image {
        DynamicImage::ImageLuma8(buf) => (1, Samples::Byte(buf.into_raw())),
        DynamicImage::ImageLumaA8(_) => (1, Samples::Byte(image.to_luma8().into_raw())),
        DynamicImage::ImageLuma16(buf) => (1, Samples::UShort(buf.into_raw())),
        DynamicImage::ImageLumaA16(_) => (1, Samples::UShort(image.to_luma16().into_raw())),
        DynamicImage::ImageRgb16(buf) => (3, Samples::UShort(buf.into_raw())),
        DynamicImage::ImageRgba16(_) => (3, Samples::UShort(image.to_rgb16().into_raw())),
        DynamicImage::ImageRgb32F(buf) => (3, Samples::Float(buf.into_raw())),
        DynamicImage::ImageRgba32F(_) => (3, Samples::Float(image.to_rgb32f().into_raw())),
        _ => (3, Samples::Byte(image.to_rgb8().into_raw())),
    };

    DecodedPlane::new(width, height, bands, samples)
}

impl FormatReader for RasterReader {
    fn series_count(&self) -> usize {
        1
    }

    fn set_series(&mut self, series: usize) -> Result<(), ReaderError> {
        self.check_series(series)
    }

    fn series(&self) -> usize {
        0
    }

    fn core(&self) -> SeriesCore {
        self.core.clone()
    }

    fn open_plane(&mut self, no: usize) -> Result<DecodedPlane, ReaderError> {
        self.core.check_plane(no)?;
        self.plane.clone().ok_or(ReaderError::Closed)
    }

    fn channel_min_max(&self, _c: usize) -> Option<(f64, f64)> {
        None
    }

    fn metadata(&self) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        metadata.insert("Format".to_string(), self.format.name().to_string());
        metadata.insert("ImageWidth".to_string(), self.core.size_x.to_string());
        metadata.insert("ImageLength".to_string(), self.core.size_y.to_string());
        metadata.insert("PixelType".to_string(), self.core.pixel_type.to_string());
        metadata
    }

    fn set_ignore_color_table(&mut self, _ignore: bool) {}

    fn close(&mut self) -> Result<(), ReaderError> {
        self.plane = None;
        Ok(())
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
