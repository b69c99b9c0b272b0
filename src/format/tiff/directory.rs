//! TIFF directory walk and per-image layout.
//!
//! Every IFD in the chain describes one image (page). This module follows the
//! next-IFD chain, resolves all tags the plane decoder needs into an
//! [`ImageDirectory`], and leaves grouping of pages into series to the reader.

use bytes::Bytes;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{Ifd, TiffHeader, BIGTIFF_HEADER_SIZE};
use super::tags::{Photometric, SampleFormat, TiffTag};
use super::values::ValueReader;

// =============================================================================
// Constants
// =============================================================================

/// Maximum number of IFDs to parse (safety limit against cyclic chains)
const MAX_IFDS: usize = 100_000;

/// ResolutionUnit value when the tag is absent (inch)
const DEFAULT_RESOLUTION_UNIT: u16 = 2;

// =============================================================================
// ChunkLayout
// =============================================================================

/// How pixel data of one image is split into independently stored chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkLayout {
    /// Full-width strips of `rows_per_strip` rows
    Strips { rows_per_strip: u32 },

    /// Rectangular tiles
    Tiles { tile_width: u32, tile_height: u32 },
}

// =============================================================================
// ImageDirectory
// =============================================================================

/// One TIFF page with every tag resolved.
#[derive(Debug, Clone)]
pub struct ImageDirectory {
    /// Position of this IFD in the chain
    pub ifd_index: usize,

    pub width: u32,
    pub height: u32,

    /// Bits per sample (all samples share one depth)
    pub bits_per_sample: u16,

    pub samples_per_pixel: u16,
    pub sample_format: SampleFormat,

    /// Raw Compression tag value
    pub compression: u16,

    pub photometric: Photometric,

    /// PlanarConfiguration = 2 (one chunk set per sample)
    pub planar: bool,

    /// Raw Predictor tag value (1 = none, 2 = horizontal)
    pub predictor: u16,

    pub layout: ChunkLayout,

    /// Byte offset of each strip or tile
    pub chunk_offsets: Vec<u64>,

    /// Byte count of each strip or tile
    pub chunk_byte_counts: Vec<u64>,

    pub jpeg_tables: Option<Bytes>,

    /// ColorMap: red, green and blue tables of `2^bits` entries each
    pub color_map: Option<Vec<u16>>,

    pub description: Option<String>,
    pub page_name: Option<String>,
    pub software: Option<String>,
    pub date_time: Option<String>,

    /// Pixels per resolution unit
    pub x_resolution: Option<f64>,
    pub y_resolution: Option<f64>,
    pub resolution_unit: u16,

    /// Per-sample MinSampleValue / MaxSampleValue
    pub min_sample_value: Option<Vec<f64>>,
    pub max_sample_value: Option<Vec<f64>>,

    /// NewSubfileType bit 0 (reduced resolution version of another page)
    pub reduced_resolution: bool,
}

impl ImageDirectory {
    /// Resolve the tags of a parsed IFD.
    ///
    /// # Errors
    /// * `TiffError::MissingTag` - Width, height or chunk location tags absent
    /// * `TiffError::InvalidTagValue` - Mixed sample depths, unknown sample format
    pub fn load<R: RangeReader>(
        reader: &R,
        header: &TiffHeader,
        ifd: &Ifd,
        ifd_index: usize,
    ) -> Result<Self, TiffError> {
        let values = ValueReader::new(reader, header);
        let byte_order = header.byte_order;

        let width = ifd
            .image_width(byte_order)
            .ok_or(TiffError::MissingTag("ImageWidth"))?;
        let height = ifd
            .image_height(byte_order)
            .ok_or(TiffError::MissingTag("ImageLength"))?;

        let u32_or = |tag: TiffTag, default: u32| -> Result<u32, TiffError> {
            match ifd.get_entry_by_tag(tag) {
                Some(entry) => values.read_u32(entry),
                None => Ok(default),
            }
        };
        let string_of = |tag: TiffTag| -> Result<Option<String>, TiffError> {
            ifd.get_entry_by_tag(tag)
                .map(|entry| values.read_string(entry))
                .transpose()
        };
        let f64s_of = |tag: TiffTag| -> Result<Option<Vec<f64>>, TiffError> {
            ifd.get_entry_by_tag(tag)
                .map(|entry| values.read_f64_array(entry))
                .transpose()
        };

        let samples_per_pixel = u32_or(TiffTag::SamplesPerPixel, 1)?.max(1) as u16;

        let bits_per_sample = match ifd.get_entry_by_tag(TiffTag::BitsPerSample) {
            Some(entry) => {
                let bits = values.read_u16_array(entry)?;
                let first = bits.first().copied().unwrap_or(1);
                if bits.iter().any(|b| *b != first) {
                    return Err(TiffError::InvalidTagValue {
                        tag: "BitsPerSample",
                        message: format!("mixed sample depths {:?}", bits),
                    });
                }
                first
            }
            None => 1,
        };

        let sample_format_raw = u32_or(TiffTag::SampleFormat, 1)? as u16;
        let sample_format =
            SampleFormat::from_u16(sample_format_raw).ok_or(TiffError::InvalidTagValue {
                tag: "SampleFormat",
                message: format!("unknown value {}", sample_format_raw),
            })?;

        let compression = u32_or(TiffTag::Compression, 1)? as u16;
        let photometric_default = if samples_per_pixel >= 3 { 2 } else { 1 };
        let photometric =
            Photometric::from_u16(u32_or(TiffTag::PhotometricInterpretation, photometric_default)? as u16);
        let planar = u32_or(TiffTag::PlanarConfiguration, 1)? == 2;
        let predictor = u32_or(TiffTag::Predictor, 1)? as u16;

        let (layout, offsets_tag, counts_tag, offsets_name, counts_name) = if ifd.is_tiled() {
            let tile_width = ifd
                .tile_width(byte_order)
                .ok_or(TiffError::MissingTag("TileWidth"))?;
            let tile_height = ifd
                .tile_height(byte_order)
                .ok_or(TiffError::MissingTag("TileLength"))?;
            (
                ChunkLayout::Tiles {
                    tile_width,
                    tile_height,
                },
                TiffTag::TileOffsets,
                TiffTag::TileByteCounts,
                "TileOffsets",
                "TileByteCounts",
            )
        } else {
            let rows_per_strip = u32_or(TiffTag::RowsPerStrip, height)?.clamp(1, height.max(1));
            (
                ChunkLayout::Strips { rows_per_strip },
                TiffTag::StripOffsets,
                TiffTag::StripByteCounts,
                "StripOffsets",
                "StripByteCounts",
            )
        };

        let chunk_offsets = ifd
            .get_entry_by_tag(offsets_tag)
            .map(|entry| values.read_u64_array(entry))
            .transpose()?
            .ok_or(TiffError::MissingTag(offsets_name))?;
        let chunk_byte_counts = ifd
            .get_entry_by_tag(counts_tag)
            .map(|entry| values.read_u64_array(entry))
            .transpose()?
            .ok_or(TiffError::MissingTag(counts_name))?;

        let jpeg_tables = ifd
            .get_entry_by_tag(TiffTag::JpegTables)
            .map(|entry| values.read_raw_bytes(entry))
            .transpose()?;
        let color_map = ifd
            .get_entry_by_tag(TiffTag::ColorMap)
            .map(|entry| values.read_u16_array(entry))
            .transpose()?;

        let x_resolution = f64s_of(TiffTag::XResolution)?.and_then(|v| v.first().copied());
        let y_resolution = f64s_of(TiffTag::YResolution)?.and_then(|v| v.first().copied());

        Ok(ImageDirectory {
            ifd_index,
            width,
            height,
            bits_per_sample,
            samples_per_pixel,
            sample_format,
            compression,
            photometric,
            planar,
            predictor,
            layout,
            chunk_offsets,
            chunk_byte_counts,
            jpeg_tables,
            color_map,
            description: string_of(TiffTag::ImageDescription)?,
            page_name: string_of(TiffTag::PageName)?,
            software: string_of(TiffTag::Software)?,
            date_time: string_of(TiffTag::DateTime)?,
            x_resolution,
            y_resolution,
            resolution_unit: u32_or(TiffTag::ResolutionUnit, DEFAULT_RESOLUTION_UNIT as u32)? as u16,
            min_sample_value: f64s_of(TiffTag::MinSampleValue)?,
            max_sample_value: f64s_of(TiffTag::MaxSampleValue)?,
            reduced_resolution: u32_or(TiffTag::NewSubfileType, 0)? & 1 == 1,
        })
    }

    /// Bytes per sample, rounded up to whole bytes.
    pub fn bytes_per_sample(&self) -> usize {
        (self.bits_per_sample as usize).div_ceil(8)
    }

    /// Number of chunk rows and columns covering the image.
    pub fn chunk_grid(&self) -> (usize, usize) {
        match self.layout {
            ChunkLayout::Strips { rows_per_strip } => {
                ((self.height as usize).div_ceil(rows_per_strip as usize), 1)
            }
            ChunkLayout::Tiles {
                tile_width,
                tile_height,
            } => (
                (self.height as usize).div_ceil(tile_height.max(1) as usize),
                (self.width as usize).div_ceil(tile_width.max(1) as usize),
            ),
        }
    }

    /// Chunks per sample plane (all chunks for chunky data).
    pub fn chunks_per_plane(&self) -> usize {
        let (rows, cols) = self.chunk_grid();
        rows * cols
    }

    /// Whether two pages can be stacked into one series.
    pub fn same_geometry(&self, other: &ImageDirectory) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.samples_per_pixel == other.samples_per_pixel
            && self.bits_per_sample == other.bits_per_sample
            && self.sample_format == other.sample_format
            && self.photometric == other.photometric
    }
}

// =============================================================================
// TiffDirectory
// =============================================================================

/// All pages of a TIFF file in chain order.
#[derive(Debug, Clone)]
pub struct TiffDirectory {
    pub header: TiffHeader,
    pub images: Vec<ImageDirectory>,
}

impl TiffDirectory {
    /// Parse the header and every IFD of a TIFF file.
    pub fn parse<R: RangeReader>(reader: &R) -> Result<Self, TiffError> {
        let header_len = (reader.size() as usize).min(BIGTIFF_HEADER_SIZE);
        let header_bytes = reader.read_exact_at(0, header_len)?;
        let header = TiffHeader::parse(&header_bytes, reader.size())?;

        let ifds = Self::parse_all_ifds(reader, &header)?;

        let images = ifds
            .iter()
            .enumerate()
            .map(|(index, ifd)| ImageDirectory::load(reader, &header, ifd, index))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TiffDirectory { header, images })
    }

    /// Parse all IFDs in the file following the next-IFD chain.
    fn parse_all_ifds<R: RangeReader>(
        reader: &R,
        header: &TiffHeader,
    ) -> Result<Vec<Ifd>, TiffError> {
        let mut ifds = Vec::new();
        let mut offset = header.first_ifd_offset;
        let mut visited = std::collections::HashSet::new();

        while offset != 0 && ifds.len() < MAX_IFDS {
            if offset >= reader.size() || !visited.insert(offset) {
                return Err(TiffError::InvalidIfdOffset(offset));
            }

            // First, read just enough to get the entry count
            let count_size = header.ifd_count_size();
            let count_bytes = reader.read_exact_at(offset, count_size)?;

            let entry_count = if header.is_bigtiff {
                header.byte_order.read_u64(&count_bytes)
            } else {
                header.byte_order.read_u16(&count_bytes) as u64
            };

            // Now read the full IFD
            let ifd_size = Ifd::calculate_size(entry_count, header);
            let ifd_bytes = reader.read_exact_at(offset, ifd_size)?;
            let ifd = Ifd::parse(&ifd_bytes, header)?;

            offset = ifd.next_ifd_offset;
            ifds.push(ifd);
        }

        Ok(ifds)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryRangeReader;

    /// Little-endian classic TIFF with the given (tag, type, count, value) entries
    /// in a single IFD at offset 8, followed by `extra` data.
    fn build_tiff(entries: &[(u16, u16, u32, u32)], extra: &[u8]) -> Vec<u8> {
        let mut out = vec![0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00];
        out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for &(tag, field_type, count, value) in entries {
            out.extend_from_slice(&tag.to_le_bytes());
            out.extend_from_slice(&field_type.to_le_bytes());
            out.extend_from_slice(&count.to_le_bytes());
            if field_type == 3 && count == 1 {
                out.extend_from_slice(&(value as u16).to_le_bytes());
                out.extend_from_slice(&[0, 0]);
            } else {
                out.extend_from_slice(&value.to_le_bytes());
            }
        }
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(extra);
        out
    }

    fn ifd_end(entry_count: usize) -> u32 {
        (8 + 2 + entry_count * 12 + 4) as u32
    }

    #[test]
    fn test_parse_stripped_gray_image() {
        let n = 7;
        let data_offset = ifd_end(n);
        let bytes = build_tiff(
            &[
                (256, 3, 1, 4),
                (257, 3, 1, 2),
                (258, 3, 1, 8),
                (259, 3, 1, 1),
                (273, 4, 1, data_offset),
                (278, 3, 1, 2),
                (279, 4, 1, 8),
            ],
            &[0u8; 8],
        );
        let reader = MemoryRangeReader::new(bytes, "gray.tif");

        let dir = TiffDirectory::parse(&reader).unwrap();
        assert_eq!(dir.images.len(), 1);

        let image = &dir.images[0];
        assert_eq!((image.width, image.height), (4, 2));
        assert_eq!(image.bits_per_sample, 8);
        assert_eq!(image.samples_per_pixel, 1);
        assert_eq!(image.photometric, Photometric::BlackIsZero);
        assert_eq!(image.sample_format, SampleFormat::Unsigned);
        assert_eq!(image.layout, ChunkLayout::Strips { rows_per_strip: 2 });
        assert_eq!(image.chunk_offsets, vec![data_offset as u64]);
        assert_eq!(image.chunk_byte_counts, vec![8]);
        assert_eq!(image.resolution_unit, 2);
        assert!(image.description.is_none());
        assert_eq!(image.chunk_grid(), (1, 1));
    }

    #[test]
    fn test_missing_strip_offsets() {
        let bytes = build_tiff(&[(256, 3, 1, 4), (257, 3, 1, 2), (279, 4, 1, 8)], &[]);
        let reader = MemoryRangeReader::new(bytes, "broken.tif");

        let result = TiffDirectory::parse(&reader);
        assert!(matches!(result, Err(TiffError::MissingTag("StripOffsets"))));
    }

    #[test]
    fn test_missing_width() {
        let bytes = build_tiff(&[(257, 3, 1, 2), (273, 4, 1, 0), (279, 4, 1, 0)], &[]);
        let reader = MemoryRangeReader::new(bytes, "broken.tif");

        let result = TiffDirectory::parse(&reader);
        assert!(matches!(result, Err(TiffError::MissingTag("ImageWidth"))));
    }

    #[test]
    fn test_self_referencing_ifd_chain() {
        let mut bytes = build_tiff(&[(256, 3, 1, 1), (257, 3, 1, 1), (273, 4, 1, 0), (279, 4, 1, 1)], &[]);
        // Point the next-IFD offset back at the first IFD
        let next = bytes.len() - 4;
        bytes[next..].copy_from_slice(&8u32.to_le_bytes());
        let reader = MemoryRangeReader::new(bytes, "loop.tif");

        let result = TiffDirectory::parse(&reader);
        assert!(matches!(result, Err(TiffError::InvalidIfdOffset(8))));
    }

    #[test]
    fn test_tiled_chunk_grid() {
        let bytes = build_tiff(
            &[
                (256, 3, 1, 100),
                (257, 3, 1, 40),
                (322, 3, 1, 32),
                (323, 3, 1, 32),
                (324, 4, 1, 0),
                (325, 4, 1, 0),
            ],
            &[],
        );
        let reader = MemoryRangeReader::new(bytes, "tiled.tif");

        let dir = TiffDirectory::parse(&reader).unwrap();
        let image = &dir.images[0];
        assert_eq!(
            image.layout,
            ChunkLayout::Tiles {
                tile_width: 32,
                tile_height: 32
            }
        );
        assert_eq!(image.chunk_grid(), (2, 4));
        assert_eq!(image.chunks_per_plane(), 8);
    }

    #[test]
    fn test_same_geometry() {
        let bytes = build_tiff(&[(256, 3, 1, 4), (257, 3, 1, 2), (273, 4, 1, 0), (279, 4, 1, 0)], &[]);
        let reader = MemoryRangeReader::new(bytes, "a.tif");
        let dir = TiffDirectory::parse(&reader).unwrap();

        let a = dir.images[0].clone();
        let mut b = a.clone();
        assert!(a.same_geometry(&b));

        b.bits_per_sample = 16;
        assert!(!a.same_geometry(&b));
    }
}
