//! Multi-page TIFF reader.
//!
//! Pages are grouped into series: consecutive pages that share geometry form
//! one Z stack, unless the first page carries an ImageJ hyperstack description
//! that accounts for every page, in which case C/Z/T come from it.
//!
//! Planes are decoded from strips or tiles, chunky or planar, with no
//! compression, PackBits, LZW (optionally with horizontal predictor) or JPEG.
//! Palette pages expand through their ColorMap to 8-bit RGB unless color
//! tables are ignored.

use std::collections::BTreeMap;

use image::ImageFormat;
use tracing::{debug, warn};

use crate::error::{FormatError, ReaderError, TiffError};
use crate::io::RangeReader;
use crate::reader::{
    DecodedPlane, DimensionOrder, FormatReader, PhysicalSizes, PixelType, Samples, SeriesCore,
};

use super::description::{AperioDescription, ImageJDescription};
use super::jpeg::prepare_chunk_jpeg;
use super::tiff::{
    lzw_decode, undo_horizontal_predictor, unpack_bits, validate_image, ByteOrder, ChunkLayout,
    Compression, ImageDirectory, Photometric, SampleFormat, TiffDirectory,
};

/// Microns per centimeter (ResolutionUnit = 3)
const MICRONS_PER_CM: f64 = 10_000.0;

/// Microns per inch (ResolutionUnit = 2)
const MICRONS_PER_INCH: f64 = 25_400.0;

// =============================================================================
// Series layout
// =============================================================================

/// Pages and dimensional layout of one series.
#[derive(Debug, Clone)]
struct TiffSeries {
    /// Indices into `TiffDirectory::images`, in plane order
    pages: Vec<usize>,

    /// Planes along C (before any sample interleaving)
    planes_c: usize,
    size_z: usize,
    size_t: usize,

    dimension_order: DimensionOrder,
    order_certain: bool,
    physical: PhysicalSizes,
}

// =============================================================================
// TiffReader
// =============================================================================

/// `FormatReader` over a (Big)TIFF file.
pub struct TiffReader<R> {
    /// Byte source; `None` once closed
    reader: Option<R>,
    identifier: String,
    directory: TiffDirectory,
    series: Vec<TiffSeries>,
    current: usize,
    ignore_color_table: bool,
    metadata: BTreeMap<String, String>,
}

impl<R: RangeReader> TiffReader<R> {
    /// Parse the page chain and lay pages out as series.
    ///
    /// # Errors
    /// * `FormatError::Tiff` - Malformed structure, or a page that cannot be
    ///   decoded (unsupported compression or sample type, missing ColorMap)
    pub fn open(reader: R) -> Result<Self, FormatError> {
        let directory = TiffDirectory::parse(&reader)?;

        for image in &directory.images {
            let validation = validate_image(image);
            for warning in &validation.warnings {
                warn!(identifier = reader.identifier(), "{}", warning);
            }
            validation.into_result()?;
        }

        let series = layout_series(&directory.images);
        let metadata = collect_metadata(&directory);
        let identifier = reader.identifier().to_string();

        debug!(
            identifier = %identifier,
            pages = directory.images.len(),
            series = series.len(),
            bigtiff = directory.header.is_bigtiff,
            "Opened TIFF"
        );

        Ok(TiffReader {
            reader: Some(reader),
            identifier,
            directory,
            series,
            current: 0,
            ignore_color_table: false,
            metadata,
        })
    }

    fn current_series(&self) -> Result<&TiffSeries, ReaderError> {
        self.series
            .get(self.current)
            .ok_or(ReaderError::SeriesOutOfRange {
                series: self.current,
                count: self.series.len(),
            })
    }

    fn first_image(&self, series: &TiffSeries) -> Option<&ImageDirectory> {
        series
            .pages
            .first()
            .and_then(|page| self.directory.images.get(*page))
    }

    fn expands_palette(&self, image: &ImageDirectory) -> bool {
        image.photometric == Photometric::Palette && !self.ignore_color_table
    }

    fn byte_order(&self) -> ByteOrder {
        self.directory.header.byte_order
    }

    /// Decode one page into a plane.
    fn decode_page(&self, reader: &R, image: &ImageDirectory) -> Result<DecodedPlane, ReaderError> {
        let width = image.width as usize;
        let height = image.height as usize;
        let spp = image.samples_per_pixel as usize;
        let bps = image.bytes_per_sample();

        let raw = if image.planar && spp > 1 {
            self.decode_planar(reader, image)?
        } else {
            self.decode_samples(reader, image, 0, spp)?
        };

        let required = width * height * spp * bps;
        if raw.len() < required {
            return Err(ReaderError::TruncatedPlane {
                expected: width * height * spp,
                actual: raw.len() / bps.max(1),
            });
        }

        let pixel_type = pixel_type_of(image)?;
        let mut samples = samples_from_bytes(&raw, pixel_type, self.byte_order());
        if image.photometric == Photometric::WhiteIsZero {
            invert(&mut samples);
        }

        if self.expands_palette(image) {
            let color_map = image.color_map.as_deref().unwrap_or_default();
            let rgb = expand_palette(&samples, color_map, width * height);
            return Ok(DecodedPlane::new(width, height, 3, Samples::Byte(rgb)));
        }

        Ok(DecodedPlane::new(width, height, spp, samples))
    }

    /// Decode each sample plane separately and interleave them.
    fn decode_planar(&self, reader: &R, image: &ImageDirectory) -> Result<Vec<u8>, TiffError> {
        let spp = image.samples_per_pixel as usize;
        let bps = image.bytes_per_sample();
        let plane_bytes = image.width as usize * image.height as usize * bps;
        let chunks = image.chunks_per_plane();

        let mut out = vec![0u8; plane_bytes * spp];
        for s in 0..spp {
            let plane = self.decode_samples(reader, image, s * chunks, 1)?;
            if plane.len() < plane_bytes {
                return Err(TiffError::Decompression(format!(
                    "sample plane {} of IFD {} holds {} bytes, expected {}",
                    s,
                    image.ifd_index,
                    plane.len(),
                    plane_bytes
                )));
            }
            for (p, sample) in plane[..plane_bytes].chunks_exact(bps).enumerate() {
                let dst = (p * spp + s) * bps;
                out[dst..dst + bps].copy_from_slice(sample);
            }
        }
        Ok(out)
    }

    /// Decode the chunks of one sample plane (or all samples for chunky data)
    /// into row-major bytes.
    ///
    /// Strip data is returned as stored, so the buffer may hold more rows than
    /// the image when the last strip is full height.
    fn decode_samples(
        &self,
        reader: &R,
        image: &ImageDirectory,
        first_chunk: usize,
        samples_per_pixel: usize,
    ) -> Result<Vec<u8>, TiffError> {
        let width = image.width as usize;
        let height = image.height as usize;
        let pixel_bytes = samples_per_pixel * image.bytes_per_sample();
        let row_bytes = width * pixel_bytes;

        match image.layout {
            ChunkLayout::Strips { rows_per_strip } => {
                let strip_bytes = rows_per_strip as usize * row_bytes;
                let mut out = Vec::with_capacity(row_bytes * height);
                for i in 0..image.chunks_per_plane() {
                    let chunk = self.read_chunk(
                        reader,
                        image,
                        first_chunk + i,
                        strip_bytes,
                        width,
                        samples_per_pixel,
                    )?;
                    out.extend_from_slice(&chunk);
                }
                Ok(out)
            }
            ChunkLayout::Tiles {
                tile_width,
                tile_height,
            } => {
                let (tw, th) = (tile_width as usize, tile_height as usize);
                let tile_row_bytes = tw * pixel_bytes;
                let (rows, cols) = image.chunk_grid();
                let mut out = vec![0u8; row_bytes * height];

                for ty in 0..rows {
                    for tx in 0..cols {
                        let index = first_chunk + ty * cols + tx;
                        let tile = self.read_chunk(
                            reader,
                            image,
                            index,
                            tile_row_bytes * th,
                            tw,
                            samples_per_pixel,
                        )?;

                        let x0 = tx * tw;
                        let span = tw.min(width - x0) * pixel_bytes;
                        for r in 0..th {
                            let y = ty * th + r;
                            if y >= height {
                                break;
                            }
                            let src = r * tile_row_bytes;
                            if src + span > tile.len() {
                                return Err(TiffError::Decompression(format!(
                                    "tile {} of IFD {} holds {} bytes, expected {}",
                                    index,
                                    image.ifd_index,
                                    tile.len(),
                                    tile_row_bytes * th
                                )));
                            }
                            let dst = y * row_bytes + x0 * pixel_bytes;
                            out[dst..dst + span].copy_from_slice(&tile[src..src + span]);
                        }
                    }
                }
                Ok(out)
            }
        }
    }

    /// Read and decompress one strip or tile.
    fn read_chunk(
        &self,
        reader: &R,
        image: &ImageDirectory,
        index: usize,
        expected_len: usize,
        chunk_width: usize,
        samples_per_pixel: usize,
    ) -> Result<Vec<u8>, TiffError> {
        let (offset, byte_count) = image
            .chunk_offsets
            .get(index)
            .zip(image.chunk_byte_counts.get(index))
            .ok_or(TiffError::MissingTag("StripOffsets/TileOffsets"))?;
        let data = reader.read_exact_at(*offset, *byte_count as usize)?;

        let mut out = match Compression::from_u16(image.compression) {
            Some(Compression::None) => data.to_vec(),
            Some(Compression::Lzw) => lzw_decode(&data, expected_len)?,
            Some(Compression::PackBits) => unpack_bits(&data, expected_len)?,
            Some(Compression::Jpeg) => {
                return decode_jpeg(image, &data, samples_per_pixel);
            }
            _ => {
                return Err(TiffError::UnsupportedCompression(format!(
                    "compression {} in IFD {}",
                    image.compression, image.ifd_index
                )))
            }
        };

        if image.predictor == 2 {
            undo_horizontal_predictor(
                &mut out,
                chunk_width * samples_per_pixel,
                samples_per_pixel,
                image.bytes_per_sample(),
                self.byte_order(),
            )?;
        }

        Ok(out)
    }
}

impl<R: RangeReader> FormatReader for TiffReader<R> {
    fn series_count(&self) -> usize {
        self.series.len()
    }

    fn set_series(&mut self, series: usize) -> Result<(), ReaderError> {
        self.check_series(series)?;
        self.current = series;
        Ok(())
    }

    fn series(&self) -> usize {
        self.current
    }

    fn core(&self) -> SeriesCore {
        let Some((series, image)) = self
            .series
            .get(self.current)
            .and_then(|s| self.first_image(s).map(|image| (s, image)))
        else {
            return SeriesCore::single_plane(0, 0, PixelType::Uint8);
        };

        let (pixel_type, bands) = if self.expands_palette(image) {
            (PixelType::Uint8, 3)
        } else {
            (
                pixel_type_of(image).unwrap_or(PixelType::Uint8),
                image.samples_per_pixel.max(1) as usize,
            )
        };

        SeriesCore {
            size_x: image.width as usize,
            size_y: image.height as usize,
            size_z: series.size_z,
            size_c: series.planes_c * bands,
            size_t: series.size_t,
            image_count: series.pages.len(),
            pixel_type,
            rgb_channel_count: bands,
            interleaved: bands > 1,
            little_endian: self.byte_order() == ByteOrder::LittleEndian,
            dimension_order: series.dimension_order,
            order_certain: series.order_certain,
            name: image.page_name.clone(),
            physical: series.physical,
        }
    }

    fn open_plane(&mut self, no: usize) -> Result<DecodedPlane, ReaderError> {
        let reader = self.reader.as_ref().ok_or(ReaderError::Closed)?;
        let series = self.current_series()?;
        let page = *series.pages.get(no).ok_or(ReaderError::PlaneOutOfRange {
            plane: no,
            count: series.pages.len(),
        })?;
        let image = self
            .directory
            .images
            .get(page)
            .ok_or(ReaderError::PlaneOutOfRange {
                plane: no,
                count: series.pages.len(),
            })?;

        self.decode_page(reader, image)
    }

    fn channel_min_max(&self, c: usize) -> Option<(f64, f64)> {
        let series = self.series.get(self.current)?;
        let image = self.first_image(series)?;
        if self.expands_palette(image) {
            return None;
        }
        let spp = image.samples_per_pixel.max(1) as usize;
        let pick = |values: &Vec<f64>| -> Option<f64> {
            match values.len() {
                0 => None,
                1 => values.first().copied(),
                _ => values.get(c % spp).copied(),
            }
        };
        let min = image.min_sample_value.as_ref().and_then(pick)?;
        let max = image.max_sample_value.as_ref().and_then(pick)?;
        Some((min, max))
    }

    fn metadata(&self) -> BTreeMap<String, String> {
        self.metadata.clone()
    }

    fn set_ignore_color_table(&mut self, ignore: bool) {
        self.ignore_color_table = ignore;
    }

    fn close(&mut self) -> Result<(), ReaderError> {
        if self.reader.take().is_some() {
            debug!(identifier = %self.identifier, "Closed TIFF");
        }
        Ok(())
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

// =============================================================================
// Series layout
// =============================================================================

fn layout_series(images: &[ImageDirectory]) -> Vec<TiffSeries> {
    let Some(first) = images.first() else {
        return Vec::new();
    };
    let description = first.description.as_deref().unwrap_or_default();
    let aperio = AperioDescription::parse(description);
    let imagej = ImageJDescription::parse(description);

    if let Some(imagej) = &imagej {
        if let Some(series) = imagej_series(images, imagej, aperio.as_ref()) {
            return vec![series];
        }
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (i, image) in images.iter().enumerate() {
        match groups.last_mut() {
            Some(group) if images[group[0]].same_geometry(image) => group.push(i),
            _ => groups.push(vec![i]),
        }
    }

    groups
        .into_iter()
        .map(|pages| {
            let image = &images[pages[0]];
            let physical = physical_sizes(image, aperio.as_ref(), imagej.as_ref());
            TiffSeries {
                planes_c: 1,
                size_z: pages.len(),
                size_t: 1,
                dimension_order: DimensionOrder::XYZCT,
                order_certain: pages.len() == 1,
                physical,
                pages,
            }
        })
        .collect()
}

/// Single hyperstack series when the ImageJ counts account for every page.
fn imagej_series(
    images: &[ImageDirectory],
    imagej: &ImageJDescription,
    aperio: Option<&AperioDescription>,
) -> Option<TiffSeries> {
    let first = images.first()?;
    if !images.iter().all(|image| first.same_geometry(image)) {
        return None;
    }

    let channels = imagej.channels.unwrap_or(1);
    let slices = imagej.slices.unwrap_or(1);
    let frames = imagej.frames.unwrap_or(1);
    let planes = channels * slices * frames;

    let (size_z, size_t) = if planes == images.len() {
        (slices, frames)
    } else if channels == 1 && imagej.slices.is_none() && imagej.frames.is_none() {
        (images.len(), 1)
    } else {
        debug!(
            pages = images.len(),
            channels, slices, frames, "ImageJ layout does not match page count"
        );
        return None;
    };
    if imagej.images.is_some_and(|n| n != images.len()) {
        return None;
    }

    Some(TiffSeries {
        pages: (0..images.len()).collect(),
        planes_c: channels,
        size_z,
        size_t,
        dimension_order: DimensionOrder::XYCZT,
        order_certain: true,
        physical: physical_sizes(first, aperio, Some(imagej)),
    })
}

fn physical_sizes(
    image: &ImageDirectory,
    aperio: Option<&AperioDescription>,
    imagej: Option<&ImageJDescription>,
) -> PhysicalSizes {
    let micron = imagej.is_some_and(ImageJDescription::is_micron);
    let from_resolution = |resolution: Option<f64>| -> Option<f64> {
        let resolution = resolution.filter(|r| r.is_finite() && *r > 0.0)?;
        match image.resolution_unit {
            3 => Some(MICRONS_PER_CM / resolution),
            2 if !micron => Some(MICRONS_PER_INCH / resolution),
            1 | 2 if micron => Some(1.0 / resolution),
            _ => None,
        }
    };

    let mpp = aperio.and_then(|a| a.mpp);
    PhysicalSizes {
        x: mpp.or_else(|| from_resolution(image.x_resolution)),
        y: mpp.or_else(|| from_resolution(image.y_resolution)),
        z: imagej.filter(|_| micron).and_then(|ij| ij.spacing),
    }
}

fn collect_metadata(directory: &TiffDirectory) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    metadata.insert(
        "NumberOfIFDs".to_string(),
        directory.images.len().to_string(),
    );
    metadata.insert(
        "BigTIFF".to_string(),
        directory.header.is_bigtiff.to_string(),
    );

    let Some(first) = directory.images.first() else {
        return metadata;
    };

    let compression = Compression::from_u16(first.compression)
        .map(|c| c.name().to_string())
        .unwrap_or_else(|| first.compression.to_string());
    let entries = [
        ("ImageWidth", Some(first.width.to_string())),
        ("ImageLength", Some(first.height.to_string())),
        ("BitsPerSample", Some(first.bits_per_sample.to_string())),
        ("SamplesPerPixel", Some(first.samples_per_pixel.to_string())),
        ("Compression", Some(compression)),
        (
            "PhotometricInterpretation",
            Some(first.photometric.name().to_string()),
        ),
        ("ResolutionUnit", Some(first.resolution_unit.to_string())),
        ("XResolution", first.x_resolution.map(|v| v.to_string())),
        ("YResolution", first.y_resolution.map(|v| v.to_string())),
        ("Software", first.software.clone()),
        ("DateTime", first.date_time.clone()),
        ("PageName", first.page_name.clone()),
    ];
    for (key, value) in entries {
        if let Some(value) = value {
            metadata.insert(key.to_string(), value);
        }
    }

    let description = first.description.as_deref().unwrap_or_default();
    if let Some(aperio) = AperioDescription::parse(description) {
        metadata.extend(aperio.properties);
    } else if let Some(imagej) = ImageJDescription::parse(description) {
        metadata.extend(imagej.properties);
    } else if !description.is_empty() {
        metadata.insert("ImageDescription".to_string(), description.to_string());
    }

    metadata
}

// =============================================================================
// Sample conversion
// =============================================================================

fn pixel_type_of(image: &ImageDirectory) -> Result<PixelType, TiffError> {
    match (image.sample_format, image.bits_per_sample) {
        (SampleFormat::Unsigned, 8) => Ok(PixelType::Uint8),
        (SampleFormat::Unsigned, 16) => Ok(PixelType::Uint16),
        (SampleFormat::Unsigned, 32) => Ok(PixelType::Uint32),
        (SampleFormat::Signed, 8) => Ok(PixelType::Int8),
        (SampleFormat::Signed, 16) => Ok(PixelType::Int16),
        (SampleFormat::Signed, 32) => Ok(PixelType::Int32),
        (SampleFormat::Float, 32) => Ok(PixelType::Float),
        (SampleFormat::Float, 64) => Ok(PixelType::Double),
        (format, bits) => Err(TiffError::InvalidTagValue {
            tag: "BitsPerSample",
            message: format!("{} bits with sample format {:?}", bits, format),
        }),
    }
}

/// Convert raw file-order bytes to typed samples.
fn samples_from_bytes(raw: &[u8], pixel_type: PixelType, order: ByteOrder) -> Samples {
    match pixel_type {
        PixelType::Uint8 => Samples::Byte(raw.to_vec()),
        PixelType::Int8 => Samples::Other(raw.iter().map(|b| *b as i8 as f64).collect()),
        PixelType::Uint16 => Samples::UShort(raw.chunks_exact(2).map(|b| order.read_u16(b)).collect()),
        PixelType::Int16 => Samples::Other(
            raw.chunks_exact(2)
                .map(|b| order.read_u16(b) as i16 as f64)
                .collect(),
        ),
        PixelType::Uint32 => Samples::Other(
            raw.chunks_exact(4)
                .map(|b| order.read_u32(b) as f64)
                .collect(),
        ),
        PixelType::Int32 => Samples::Other(
            raw.chunks_exact(4)
                .map(|b| order.read_u32(b) as i32 as f64)
                .collect(),
        ),
        PixelType::Float => Samples::Float(
            raw.chunks_exact(4)
                .map(|b| f32::from_bits(order.read_u32(b)))
                .collect(),
        ),
        PixelType::Double => Samples::Other(
            raw.chunks_exact(8)
                .map(|b| f64::from_bits(order.read_u64(b)))
                .collect(),
        ),
    }
}

/// WhiteIsZero: flip unsigned integer samples so larger means brighter.
fn invert(samples: &mut Samples) {
    match samples {
        Samples::Byte(v) => v.iter_mut().for_each(|s| *s = u8::MAX - *s),
        Samples::UShort(v) => v.iter_mut().for_each(|s| *s = u16::MAX - *s),
        Samples::Float(_) | Samples::Other(_) => {}
    }
}

/// Map palette indices to 8-bit RGB through a TIFF ColorMap.
fn expand_palette(indices: &Samples, color_map: &[u16], pixels: usize) -> Vec<u8> {
    let entries = color_map.len() / 3;
    let mut rgb = Vec::with_capacity(pixels * 3);
    for i in 0..pixels {
        let index = indices.get_f64(i).unwrap_or(0.0) as usize;
        for channel in 0..3 {
            let value = if index < entries {
                color_map[channel * entries + index] >> 8
            } else {
                0
            };
            rgb.push(value as u8);
        }
    }
    rgb
}

fn decode_jpeg(
    image: &ImageDirectory,
    data: &[u8],
    samples_per_pixel: usize,
) -> Result<Vec<u8>, TiffError> {
    let stream = prepare_chunk_jpeg(image.jpeg_tables.as_deref(), data);
    let decoded = image::load_from_memory_with_format(&stream, ImageFormat::Jpeg)
        .map_err(|e| TiffError::Decompression(format!("JPEG in IFD {}: {}", image.ifd_index, e)))?;

    Ok(if samples_per_pixel == 1 {
        decoded.to_luma8().into_raw()
    } else {
        decoded.to_rgb8().into_raw()
    })
}
