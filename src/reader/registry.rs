//! Opening files as format readers.
//!
//! [`SourceOpener`] is the seam between the import pipeline and the file
//! system: it answers whether a path exists, opens it as a [`FormatReader`],
//! and lists the sibling files that belong to the same multi-file source.
//! [`FileSource`] is the production implementation: it detects the format from
//! the leading bytes and reads through a [`BlockCache`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{FormatError, ReaderError};
use crate::format::{detect_format, RasterReader, SourceFormat, TiffReader};
use crate::io::{
    BlockCache, FileRangeReader, RangeReader, DEFAULT_BLOCK_CACHE_CAPACITY, DEFAULT_BLOCK_SIZE,
};

use super::format_reader::{FormatReader, SeriesCore};
use super::plane::DecodedPlane;
use super::stitcher::FilePattern;

// =============================================================================
// SourceOpener Trait
// =============================================================================

/// Opens paths as format readers.
pub trait SourceOpener {
    /// The reader type produced for every path.
    type Reader: FormatReader;

    /// Whether `path` names an existing source.
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Open `path` with format detection.
    ///
    /// # Errors
    /// * `FormatError::UnsupportedFormat` - No reader recognizes the file
    /// * `FormatError::Io` - The file cannot be read
    fn open(&self, path: &Path) -> Result<Self::Reader, FormatError>;

    /// All files of the multi-file source `path` belongs to, in stitch order.
    ///
    /// Defaults to the files in the same directory whose names differ from
    /// `path` only in the last run of digits.
    fn siblings(&self, path: &Path) -> Result<Vec<PathBuf>, ReaderError> {
        match FilePattern::from_path(path) {
            Some(pattern) => pattern.list(),
            None => Ok(vec![path.to_path_buf()]),
        }
    }
}

// =============================================================================
// FileSource
// =============================================================================

/// Local files read through a block cache.
#[derive(Debug, Clone)]
pub struct FileSource {
    block_size: usize,
    block_cache_capacity: usize,
}

impl FileSource {
    pub fn new(block_size: usize, block_cache_capacity: usize) -> Self {
        Self {
            block_size: block_size.max(1),
            block_cache_capacity: block_cache_capacity.max(1),
        }
    }
}

impl Default for FileSource {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE, DEFAULT_BLOCK_CACHE_CAPACITY)
    }
}

impl SourceOpener for FileSource {
    type Reader = BaseReader;

    fn open(&self, path: &Path) -> Result<BaseReader, FormatError> {
        let file = FileRangeReader::open(path)?;
        let reader = BlockCache::with_capacity(file, self.block_size, self.block_cache_capacity);
        let format = detect_format(&reader)?;

        debug!(
            path = %path.display(),
            format = format.name(),
            size = reader.size(),
            "Detected source format"
        );

        match format {
            SourceFormat::Tiff | SourceFormat::BigTiff => {
                Ok(BaseReader::Tiff(TiffReader::open(reader)?))
            }
            SourceFormat::Jpeg | SourceFormat::Png => {
                Ok(BaseReader::Raster(RasterReader::open(&reader, format)?))
            }
        }
    }
}

// =============================================================================
// BaseReader
// =============================================================================

/// Format reader chosen by detection.
///
/// An enum rather than a trait object, so decorators stay monomorphic.
pub enum BaseReader {
    Tiff(TiffReader<BlockCache<FileRangeReader>>),
    Raster(RasterReader),
}

impl BaseReader {
    /// Detected container format name.
    pub fn format_name(&self) -> &'static str {
        match self {
            BaseReader::Tiff(_) => "TIFF",
            BaseReader::Raster(_) => "Raster",
        }
    }
}

impl FormatReader for BaseReader {
    fn series_count(&self) -> usize {
        match self {
            BaseReader::Tiff(r) => r.series_count(),
            BaseReader::Raster(r) => r.series_count(),
        }
    }

    fn set_series(&mut self, series: usize) -> Result<(), ReaderError> {
        match self {
            BaseReader::Tiff(r) => r.set_series(series),
            BaseReader::Raster(r) => r.set_series(series),
        }
    }

    fn series(&self) -> usize {
        match self {
            BaseReader::Tiff(r) => r.series(),
            BaseReader::Raster(r) => r.series(),
        }
    }

    fn core(&self) -> SeriesCore {
        match self {
            BaseReader::Tiff(r) => r.core(),
            BaseReader::Raster(r) => r.core(),
        }
    }

    fn open_plane(&mut self, no: usize) -> Result<DecodedPlane, ReaderError> {
        match self {
            BaseReader::Tiff(r) => r.open_plane(no),
            BaseReader::Raster(r) => r.open_plane(no),
        }
    }

    fn channel_min_max(&self, c: usize) -> Option<(f64, f64)> {
        match self {
            BaseReader::Tiff(r) => r.channel_min_max(c),
            BaseReader::Raster(r) => r.channel_min_max(c),
        }
    }

    fn metadata(&self) -> BTreeMap<String, String> {
        match self {
            BaseReader::Tiff(r) => r.metadata(),
            BaseReader::Raster(r) => r.metadata(),
        }
    }

    fn set_ignore_color_table(&mut self, ignore: bool) {
        match self {
            BaseReader::Tiff(r) => r.set_ignore_color_table(ignore),
            BaseReader::Raster(r) => r.set_ignore_color_table(ignore),
        }
    }

    fn close(&mut self) -> Result<(), ReaderError> {
        match self {
            BaseReader::Tiff(r) => r.close(),
            BaseReader::Raster(r) => r.close(),
        }
    }

    fn identifier(&self) -> &str {
        match self {
            BaseReader::Tiff(r) => r.identifier(),
            BaseReader::Raster(r) => r.identifier(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_unrecognized_file_is_unsupported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"just some text, not an image").unwrap();

        let result = FileSource::default().open(&path);
        assert!(matches!(result, Err(FormatError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.tif");

        let source = FileSource::default();
        assert!(!source.exists(&path));
        assert!(matches!(source.open(&path), Err(FormatError::Io(_))));
    }

    #[test]
    fn test_siblings_without_digits_is_single_file() {
        let path = PathBuf::from("/data/stack.tif");
        let siblings = FileSource::default().siblings(&path).unwrap();
        assert_eq!(siblings, vec![path]);
    }

    #[test]
    fn test_siblings_follow_number_order() {
        let dir = tempdir().unwrap();
        for name in ["t10.tif", "t2.tif", "t1.tif", "other.tif"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let siblings = FileSource::default().siblings(&dir.path().join("t2.tif")).unwrap();
        let names: Vec<_> = siblings
            .iter()
            .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
            .collect();
        assert_eq!(names, vec!["t1.tif", "t2.tif", "t10.tif"]);
    }
}
