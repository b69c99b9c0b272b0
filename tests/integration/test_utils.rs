//! Test utilities for integration tests.
//!
//! This module provides a TIFF writer for building multi-page test files in
//! either byte order and in BigTIFF layout, temporary directories, and
//! recording implementations of the import collaborators.

use std::fs;
use std::path::{Path, PathBuf};

use stack_importer::frontend::{OptionOverrides, ScriptedPrompt, SeriesChoice};
use stack_importer::{
    CollectingDisplay, Collaborators, ErrorReporter, FileSource, ImportError, ImportOutcome,
    Importer, MemoryPreferences, MetadataDisplay, MetadataTable, Preferences, Prompt, StatusSink,
};

// =============================================================================
// TIFF File Builders
// =============================================================================

#[derive(Clone, Copy, Debug)]
pub enum ByteOrderType {
    LittleEndian,
    BigEndian,
}

/// Sample buffer of one page, encoded in the file byte order at build time.
#[derive(Clone, Debug)]
pub enum PagePixels {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
}

impl PagePixels {
    fn bits(&self) -> u16 {
        match self {
            PagePixels::U8(_) => 8,
            PagePixels::U16(_) => 16,
            PagePixels::F32(_) => 32,
        }
    }

    fn sample_format(&self) -> u16 {
        match self {
            PagePixels::F32(_) => 3,
            _ => 1,
        }
    }

    fn encode(&self, order: ByteOrderType) -> Vec<u8> {
        match self {
            PagePixels::U8(v) => v.clone(),
            PagePixels::U16(v) => v.iter().flat_map(|s| u16_bytes(*s, order)).collect(),
            PagePixels::F32(v) => v
                .iter()
                .flat_map(|s| u32_bytes(s.to_bits(), order))
                .collect(),
        }
    }
}

/// One uncompressed, chunky, strip-organized page.
#[derive(Clone, Debug)]
pub struct PageBuilder {
    width: u32,
    height: u32,
    samples_per_pixel: u16,
    photometric: u16,
    pixels: PagePixels,
    rows_per_strip: u32,
    description: Option<String>,
    color_map: Option<Vec<u16>>,
    resolution: Option<(u32, u16)>,
}

impl PageBuilder {
    fn new(width: u32, height: u32, samples_per_pixel: u16, photometric: u16, pixels: PagePixels) -> Self {
        Self {
            width,
            height,
            samples_per_pixel,
            photometric,
            pixels,
            rows_per_strip: height,
            description: None,
            color_map: None,
            resolution: None,
        }
    }

    pub fn gray8(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self::new(width, height, 1, 1, PagePixels::U8(pixels))
    }

    pub fn gray16(width: u32, height: u32, pixels: Vec<u16>) -> Self {
        Self::new(width, height, 1, 1, PagePixels::U16(pixels))
    }

    pub fn float32(width: u32, height: u32, pixels: Vec<f32>) -> Self {
        Self::new(width, height, 1, 1, PagePixels::F32(pixels))
    }

    /// Interleaved 8-bit RGB.
    pub fn rgb8(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self::new(width, height, 3, 2, PagePixels::U8(pixels))
    }

    /// 8-bit palette page; `color_map` holds 3 x 256 entries.
    pub fn palette8(width: u32, height: u32, indices: Vec<u8>, color_map: Vec<u16>) -> Self {
        let mut page = Self::new(width, height, 1, 3, PagePixels::U8(indices));
        page.color_map = Some(color_map);
        page
    }

    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn with_rows_per_strip(mut self, rows: u32) -> Self {
        self.rows_per_strip = rows.max(1);
        self
    }

    /// Pixels per unit in X and Y with a ResolutionUnit (1 none, 2 inch, 3 cm).
    pub fn with_resolution(mut self, pixels_per_unit: u32, unit: u16) -> Self {
        self.resolution = Some((pixels_per_unit, unit));
        self
    }

    fn strips(&self, order: ByteOrderType) -> Vec<Vec<u8>> {
        let bytes = self.pixels.encode(order);
        let row = (self.width as usize * self.samples_per_pixel as usize * self.pixels.bits() as usize / 8).max(1);
        bytes
            .chunks(row * self.rows_per_strip as usize)
            .map(|c| c.to_vec())
            .collect()
    }
}

/// Tag value of a known TIFF field type.
enum TagValue {
    Ascii(Vec<u8>),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<(u32, u32)>),
}

impl TagValue {
    fn field_type(&self) -> u16 {
        match self {
            TagValue::Ascii(_) => 2,
            TagValue::Short(_) => 3,
            TagValue::Long(_) => 4,
            TagValue::Rational(_) => 5,
        }
    }

    fn count(&self) -> u64 {
        match self {
            TagValue::Ascii(v) => v.len() as u64,
            TagValue::Short(v) => v.len() as u64,
            TagValue::Long(v) => v.len() as u64,
            TagValue::Rational(v) => v.len() as u64,
        }
    }

    fn encode(&self, order: ByteOrderType) -> Vec<u8> {
        match self {
            TagValue::Ascii(v) => v.clone(),
            TagValue::Short(v) => v.iter().flat_map(|s| u16_bytes(*s, order)).collect(),
            TagValue::Long(v) => v.iter().flat_map(|s| u32_bytes(*s, order)).collect(),
            TagValue::Rational(v) => v
                .iter()
                .flat_map(|(n, d)| {
                    let mut b = u32_bytes(*n, order).to_vec();
                    b.extend_from_slice(&u32_bytes(*d, order));
                    b
                })
                .collect(),
        }
    }
}

/// Builder for creating multi-page test TIFF files.
pub struct TiffBuilder {
    byte_order: ByteOrderType,
    is_bigtiff: bool,
    pages: Vec<PageBuilder>,
}

impl TiffBuilder {
    pub fn new() -> Self {
        Self {
            byte_order: ByteOrderType::LittleEndian,
            is_bigtiff: false,
            pages: Vec::new(),
        }
    }

    pub fn with_byte_order(mut self, order: ByteOrderType) -> Self {
        self.byte_order = order;
        self
    }

    pub fn with_bigtiff(mut self, is_bigtiff: bool) -> Self {
        self.is_bigtiff = is_bigtiff;
        self
    }

    pub fn add_page(mut self, page: PageBuilder) -> Self {
        self.pages.push(page);
        self
    }

    /// Serialize the file. Pixel data and out-of-line values precede each IFD.
    pub fn build(self) -> Vec<u8> {
        let order = self.byte_order;
        let (offset_size, inline_size) = if self.is_bigtiff { (8, 8) } else { (4, 4) };

        let mut data = match order {
            ByteOrderType::LittleEndian => vec![b'I', b'I'],
            ByteOrderType::BigEndian => vec![b'M', b'M'],
        };
        if self.is_bigtiff {
            data.extend_from_slice(&u16_bytes(43, order));
            data.extend_from_slice(&u16_bytes(8, order));
            data.extend_from_slice(&u16_bytes(0, order));
        } else {
            data.extend_from_slice(&u16_bytes(42, order));
        }
        let mut link = data.len();
        data.resize(data.len() + offset_size, 0);

        for page in &self.pages {
            let strips = page.strips(order);
            let mut strip_offsets = Vec::with_capacity(strips.len());
            for strip in &strips {
                strip_offsets.push(data.len() as u32);
                data.extend_from_slice(strip);
            }

            let spp = page.samples_per_pixel as usize;
            let mut entries: Vec<(u16, TagValue)> = vec![
                (256, TagValue::Long(vec![page.width])),
                (257, TagValue::Long(vec![page.height])),
                (258, TagValue::Short(vec![page.pixels.bits(); spp])),
                (259, TagValue::Short(vec![1])),
                (262, TagValue::Short(vec![page.photometric])),
                (273, TagValue::Long(strip_offsets)),
                (277, TagValue::Short(vec![page.samples_per_pixel])),
                (278, TagValue::Long(vec![page.rows_per_strip])),
                (
                    279,
                    TagValue::Long(strips.iter().map(|s| s.len() as u32).collect()),
                ),
                (339, TagValue::Short(vec![page.pixels.sample_format(); spp])),
            ];
            if let Some(text) = &page.description {
                let mut bytes = text.as_bytes().to_vec();
                bytes.push(0);
                entries.push((270, TagValue::Ascii(bytes)));
            }
            if let Some((pixels_per_unit, unit)) = page.resolution {
                entries.push((282, TagValue::Rational(vec![(pixels_per_unit, 1)])));
                entries.push((283, TagValue::Rational(vec![(pixels_per_unit, 1)])));
                entries.push((296, TagValue::Short(vec![unit])));
            }
            if let Some(map) = &page.color_map {
                entries.push((320, TagValue::Short(map.clone())));
            }
            entries.sort_by_key(|(tag, _)| *tag);

            let mut fields = Vec::with_capacity(entries.len());
            for (tag, value) in &entries {
                let bytes = value.encode(order);
                if bytes.len() <= inline_size {
                    let mut inline = bytes;
                    inline.resize(inline_size, 0);
                    fields.push((*tag, value.field_type(), value.count(), inline));
                } else {
                    if data.len() % 2 == 1 {
                        data.push(0);
                    }
                    let offset = offset_bytes(data.len() as u64, self.is_bigtiff, order);
                    data.extend_from_slice(&bytes);
                    fields.push((*tag, value.field_type(), value.count(), offset));
                }
            }
            if data.len() % 2 == 1 {
                data.push(0);
            }

            let ifd_offset = offset_bytes(data.len() as u64, self.is_bigtiff, order);
            data[link..link + offset_size].copy_from_slice(&ifd_offset);

            if self.is_bigtiff {
                data.extend_from_slice(&u64_bytes(fields.len() as u64, order));
            } else {
                data.extend_from_slice(&u16_bytes(fields.len() as u16, order));
            }
            for (tag, field_type, count, value) in fields {
                data.extend_from_slice(&u16_bytes(tag, order));
                data.extend_from_slice(&u16_bytes(field_type, order));
                if self.is_bigtiff {
                    data.extend_from_slice(&u64_bytes(count, order));
                } else {
                    data.extend_from_slice(&u32_bytes(count as u32, order));
                }
                data.extend_from_slice(&value);
            }
            link = data.len();
            data.resize(data.len() + offset_size, 0);
        }

        data
    }
}

impl Default for TiffBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn u16_bytes(value: u16, order: ByteOrderType) -> [u8; 2] {
    match order {
        ByteOrderType::LittleEndian => value.to_le_bytes(),
        ByteOrderType::BigEndian => value.to_be_bytes(),
    }
}

fn u32_bytes(value: u32, order: ByteOrderType) -> [u8; 4] {
    match order {
        ByteOrderType::LittleEndian => value.to_le_bytes(),
        ByteOrderType::BigEndian => value.to_be_bytes(),
    }
}

fn u64_bytes(value: u64, order: ByteOrderType) -> [u8; 8] {
    match order {
        ByteOrderType::LittleEndian => value.to_le_bytes(),
        ByteOrderType::BigEndian => value.to_be_bytes(),
    }
}

fn offset_bytes(offset: u64, is_bigtiff: bool, order: ByteOrderType) -> Vec<u8> {
    if is_bigtiff {
        u64_bytes(offset, order).to_vec()
    } else {
        u32_bytes(offset as u32, order).to_vec()
    }
}

/// A little-endian file of 8-bit pages, page `i` filled with `fill(i)`.
pub fn gray8_stack(width: u32, height: u32, pages: usize, fill: impl Fn(usize) -> u8) -> Vec<u8> {
    (0..pages)
        .fold(TiffBuilder::new(), |builder, i| {
            builder.add_page(PageBuilder::gray8(
                width,
                height,
                vec![fill(i); (width * height) as usize],
            ))
        })
        .build()
}

/// An ImageJ hyperstack description for `channels` x `slices` x `frames`.
pub fn imagej_description(channels: usize, slices: usize, frames: usize) -> String {
    format!(
        "ImageJ=1.54f\nimages={}\nchannels={}\nslices={}\nframes={}\nhyperstack=true\n",
        channels * slices * frames,
        channels,
        slices,
        frames
    )
}

/// Encode a PNG in memory.
pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| image::Rgb([x as u8 * 10, y as u8 * 10, 128]));
    let mut buf = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

// =============================================================================
// Temporary Directories
// =============================================================================

/// A scratch directory for test files, removed on drop.
pub struct TempDir {
    dir: tempfile::TempDir,
}

impl TempDir {
    pub fn new(name: &str) -> Self {
        let dir = tempfile::Builder::new()
            .prefix(&format!("stack-importer-{}-", name))
            .tempdir()
            .unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `bytes` to `name` inside the directory.
    pub fn write(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }
}

// =============================================================================
// Recording Collaborators
// =============================================================================

#[derive(Default)]
pub struct RecordingStatus {
    pub texts: Vec<String>,
    pub last_progress: Option<f64>,
}

impl StatusSink for RecordingStatus {
    fn status(&mut self, text: &str) {
        self.texts.push(text.to_string());
    }

    fn progress(&mut self, fraction: f64) {
        self.last_progress = Some(fraction);
    }
}

#[derive(Default)]
pub struct RecordingMetadata {
    pub tables: Vec<(String, MetadataTable)>,
}

impl MetadataDisplay for RecordingMetadata {
    fn show_metadata(&mut self, title: &str, table: &MetadataTable) {
        self.tables.push((title.to_string(), table.clone()));
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    pub reports: Vec<(String, String)>,
}

impl ErrorReporter for RecordingReporter {
    fn report(&mut self, title: &str, message: &str) {
        self.reports.push((title.to_string(), message.to_string()));
    }
}

/// Owns one set of collaborators for an import call against real files.
#[derive(Default)]
pub struct Harness {
    pub display: CollectingDisplay,
    pub metadata: RecordingMetadata,
    pub preferences: MemoryPreferences,
    pub status: RecordingStatus,
    pub errors: RecordingReporter,
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import `path` from disk with the given prompt.
    pub fn run<P: Prompt>(&mut self, prompt: &mut P, path: &Path) -> Result<ImportOutcome, ImportError> {
        let importer = Importer::new(FileSource::default());
        let mut io = Collaborators {
            prompt,
            display: &mut self.display,
            metadata: &mut self.metadata,
            preferences: &mut self.preferences,
            status: &mut self.status,
            errors: &mut self.errors,
        };
        importer.run(path, &mut io)
    }

    /// Import `path` with external preferences and a quiet flag.
    pub fn run_with<P: Prompt, S: Preferences>(
        &mut self,
        prompt: &mut P,
        preferences: &mut S,
        path: &Path,
        quiet: bool,
    ) -> Result<ImportOutcome, ImportError> {
        let importer = Importer::new(FileSource::default()).quiet(quiet);
        let mut io = Collaborators {
            prompt,
            display: &mut self.display,
            metadata: &mut self.metadata,
            preferences,
            status: &mut self.status,
            errors: &mut self.errors,
        };
        importer.run(path, &mut io)
    }
}

/// A scripted prompt that only overrides the given flags.
pub fn prompt_with(configure: impl FnOnce(&mut OptionOverrides)) -> ScriptedPrompt {
    let mut overrides = OptionOverrides::default();
    configure(&mut overrides);
    ScriptedPrompt::new(overrides, SeriesChoice::Default, Vec::new())
}
