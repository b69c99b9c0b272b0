//! In-memory reader over planes that are already decoded.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{FormatError, ReaderError};

use super::format_reader::{FormatReader, SeriesCore};
use super::plane::DecodedPlane;
use super::registry::SourceOpener;
use super::stitcher::FilePattern;

/// One series held in memory.
#[derive(Debug, Clone)]
pub struct MemorySeries {
    pub core: SeriesCore,
    pub planes: Vec<DecodedPlane>,
    pub min_max: BTreeMap<usize, (f64, f64)>,
}

impl MemorySeries {
    pub fn new(core: SeriesCore, planes: Vec<DecodedPlane>) -> Self {
        Self {
            core,
            planes,
            min_max: BTreeMap::new(),
        }
    }

    /// Record a known global range for channel `c`.
    pub fn with_min_max(mut self, c: usize, min: f64, max: f64) -> Self {
        self.min_max.insert(c, (min, max));
        self
    }
}

/// `FormatReader` over series held in memory.
#[derive(Debug)]
pub struct MemoryReader {
    identifier: String,
    series: Vec<MemorySeries>,
    current: usize,
    metadata: BTreeMap<String, String>,
    ignore_color_table: bool,
    closes: Arc<AtomicUsize>,
}

impl MemoryReader {
    pub fn new(identifier: impl Into<String>, series: Vec<MemorySeries>) -> Self {
        Self {
            identifier: identifier.into(),
            series,
            current: 0,
            metadata: BTreeMap::new(),
            ignore_color_table: false,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Shared counter of `close` calls, observable after the reader is consumed.
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }

    /// Count `close` calls on an existing counter, shared across readers.
    pub fn with_close_counter(mut self, closes: Arc<AtomicUsize>) -> Self {
        self.closes = closes;
        self
    }

    pub fn ignores_color_table(&self) -> bool {
        self.ignore_color_table
    }

    fn current_series(&self) -> Result<&MemorySeries, ReaderError> {
        self.series
            .get(self.current)
            .ok_or(ReaderError::SeriesOutOfRange {
                series: self.current,
                count: self.series.len(),
            })
    }
}

impl FormatReader for MemoryReader {
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
        match self.series.get(self.current) {
            Some(series) => series.core.clone(),
            None => SeriesCore::single_plane(0, 0, super::PixelType::Uint8),
        }
    }

    fn open_plane(&mut self, no: usize) -> Result<DecodedPlane, ReaderError> {
        let series = self.current_series()?;
        series.core.check_plane(no)?;
        series
            .planes
            .get(no)
            .cloned()
            .ok_or(ReaderError::PlaneOutOfRange {
                plane: no,
                count: series.planes.len(),
            })
    }

    fn channel_min_max(&self, c: usize) -> Option<(f64, f64)> {
        self.series.get(self.current)?.min_max.get(&c).copied()
    }

    fn metadata(&self) -> BTreeMap<String, String> {
        self.metadata.clone()
    }

    fn set_ignore_color_table(&mut self, ignore: bool) {
        self.ignore_color_table = ignore;
    }

    fn close(&mut self) -> Result<(), ReaderError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

// =============================================================================
// MemorySource
// =============================================================================

/// `SourceOpener` over named in-memory files.
///
/// Every reader it opens shares one close counter. Siblings follow the same
/// digit-run naming rule as files on disk.
#[derive(Debug, Default)]
pub struct MemorySource {
    files: BTreeMap<PathBuf, Vec<MemorySeries>>,
    metadata: BTreeMap<String, String>,
    closes: Arc<AtomicUsize>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `series` under `path`.
    pub fn with_file(mut self, path: impl Into<PathBuf>, series: Vec<MemorySeries>) -> Self {
        self.files.insert(path.into(), series);
        self
    }

    /// Metadata entry reported by every opened reader.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Total `close` calls across all opened readers.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl SourceOpener for MemorySource {
    type Reader = MemoryReader;

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn open(&self, path: &Path) -> Result<MemoryReader, FormatError> {
        let series = self
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| FormatError::UnsupportedFormat {
                reason: format!("no in-memory file named {}", path.display()),
            })?;

        let mut reader = MemoryReader::new(path.display().to_string(), series)
            .with_close_counter(Arc::clone(&self.closes));
        reader.metadata = self.metadata.clone();
        Ok(reader)
    }

    fn siblings(&self, path: &Path) -> Result<Vec<PathBuf>, ReaderError> {
        let Some(pattern) = FilePattern::from_path(path) else {
            return Ok(vec![path.to_path_buf()]);
        };
        let directory = path.parent();
        Ok(pattern.select(
            self.files
                .keys()
                .filter(|candidate| candidate.parent() == directory)
                .cloned(),
        ))
    }
}
