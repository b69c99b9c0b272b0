//! Multi-file stitching along T.
//!
//! Files whose names differ only in their last run of digits (for example
//! `cell_t001.tif`, `cell_t002.tif`, ...) are read as one source: every file
//! contributes its planes as additional time points, in numeric order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ReaderError;

use super::format_reader::{FormatReader, SeriesCore};
use super::plane::DecodedPlane;

// =============================================================================
// FilePattern
// =============================================================================

/// Name pattern derived from the last digit run of a file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePattern {
    directory: PathBuf,
    prefix: String,
    suffix: String,
}

impl FilePattern {
    /// Build the pattern for `path`, or `None` when the name has no digits.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let bytes = name.as_bytes();

        let end = bytes.iter().rposition(|b| b.is_ascii_digit())? + 1;
        let start = bytes[..end]
            .iter()
            .rposition(|b| !b.is_ascii_digit())
            .map_or(0, |i| i + 1);

        Some(FilePattern {
            directory: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            prefix: name[..start].to_string(),
            suffix: name[end..].to_string(),
        })
    }

    /// Numeric value of the varying digits when `name` fits the pattern.
    pub fn number_of(&self, name: &str) -> Option<u64> {
        let digits = name
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// Order candidate paths that fit the pattern by their number.
    pub fn select(&self, candidates: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
        let mut matched: Vec<(u64, PathBuf)> = candidates
            .into_iter()
            .filter_map(|path| {
                let number = self.number_of(path.file_name()?.to_str()?)?;
                Some((number, path))
            })
            .collect();
        matched.sort();
        matched.into_iter().map(|(_, path)| path).collect()
    }

    /// Files in the pattern's directory that fit it, in numeric order.
    pub fn list(&self) -> Result<Vec<PathBuf>, ReaderError> {
        let directory = if self.directory.as_os_str().is_empty() {
            Path::new(".")
        } else {
            self.directory.as_path()
        };

        let entries = std::fs::read_dir(directory).map_err(|e| {
            ReaderError::IncompatibleFiles(format!("cannot list {}: {}", directory.display(), e))
        })?;

        let candidates = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| self.directory.join(entry.file_name()));

        Ok(self.select(candidates))
    }
}

// =============================================================================
// FileStitcher
// =============================================================================

/// Concatenates equally shaped readers along T.
pub struct FileStitcher<R> {
    readers: Vec<R>,
}

impl<R: FormatReader> FileStitcher<R> {
    /// Stitch `readers` in the given order.
    ///
    /// Every reader is closed when stitching fails.
    ///
    /// # Errors
    /// * `ReaderError::IncompatibleFiles` - No readers, or the readers
    ///   disagree on series count or on any series' X/Y/Z/C, pixel type or
    ///   channel interleaving
    pub fn new(mut readers: Vec<R>) -> Result<Self, ReaderError> {
        match check_compatible(&mut readers) {
            Ok(series_count) => {
                debug!(files = readers.len(), series = series_count, "Stitched files");
                Ok(Self { readers })
            }
            Err(e) => {
                for reader in readers.iter_mut() {
                    if let Err(close_err) = reader.close() {
                        warn!(identifier = reader.identifier(), error = %close_err, "Close failed");
                    }
                }
                Err(e)
            }
        }
    }

    pub fn file_count(&self) -> usize {
        self.readers.len()
    }
}

/// Series count shared by all readers; leaves every reader on series 0.
fn check_compatible<R: FormatReader>(readers: &mut [R]) -> Result<usize, ReaderError> {
    let series_count = match readers.first() {
        Some(first) => first.series_count(),
        None => {
            return Err(ReaderError::IncompatibleFiles(
                "no files to stitch".to_string(),
            ))
        }
    };

    for reader in readers.iter() {
        if reader.series_count() != series_count {
            return Err(ReaderError::IncompatibleFiles(format!(
                "{} has {} series, expected {}",
                reader.identifier(),
                reader.series_count(),
                series_count
            )));
        }
    }

    for series in 0..series_count {
        let mut expected: Option<SeriesCore> = None;
        for reader in readers.iter_mut() {
            reader.set_series(series)?;
            let core = reader.core();
            match &expected {
                None => expected = Some(core),
                Some(first) if compatible(first, &core) => {}
                Some(first) => {
                    return Err(ReaderError::IncompatibleFiles(format!(
                        "{} series {} is {}x{}x{}x{} {}, expected {}x{}x{}x{} {}",
                        reader.identifier(),
                        series,
                        core.size_x,
                        core.size_y,
                        core.size_z,
                        core.size_c,
                        core.pixel_type,
                        first.size_x,
                        first.size_y,
                        first.size_z,
                        first.size_c,
                        first.pixel_type
                    )))
                }
            }
        }
    }

    for reader in readers.iter_mut() {
        reader.set_series(0)?;
    }
    Ok(series_count)
}

fn compatible(a: &SeriesCore, b: &SeriesCore) -> bool {
    a.size_x == b.size_x
        && a.size_y == b.size_y
        && a.size_z == b.size_z
        && a.size_c == b.size_c
        && a.size_t == b.size_t
        && a.pixel_type == b.pixel_type
        && a.rgb_channel_count == b.rgb_channel_count
        && a.image_count == b.image_count
}

impl<R: FormatReader> FormatReader for FileStitcher<R> {
    fn series_count(&self) -> usize {
        self.readers.first().map_or(0, |r| r.series_count())
    }

    fn set_series(&mut self, series: usize) -> Result<(), ReaderError> {
        self.check_series(series)?;
        for reader in self.readers.iter_mut() {
            reader.set_series(series)?;
        }
        Ok(())
    }

    fn series(&self) -> usize {
        self.readers.first().map_or(0, |r| r.series())
    }

    fn core(&self) -> SeriesCore {
        let files = self.readers.len();
        match self.readers.first() {
            Some(first) => {
                let mut core = first.core();
                core.size_t *= files;
                core.image_count *= files;
                core
            }
            None => SeriesCore::single_plane(0, 0, super::PixelType::Uint8),
        }
    }

    fn open_plane(&mut self, no: usize) -> Result<DecodedPlane, ReaderError> {
        let stitched = self.core();
        stitched.check_plane(no)?;
        let (z, c, t) = stitched.coords(no)?;

        let per_file_t = (stitched.size_t / self.readers.len().max(1)).max(1);
        let file = t / per_file_t;
        let reader = self
            .readers
            .get_mut(file)
            .ok_or(ReaderError::PlaneOutOfRange {
                plane: no,
                count: stitched.image_count,
            })?;

        let index = reader.index(z, c, t % per_file_t)?;
        reader.open_plane(index)
    }

    /// Union of the per-file ranges; unknown if any file lacks one.
    fn channel_min_max(&self, c: usize) -> Option<(f64, f64)> {
        self.readers.iter().try_fold(None, |acc: Option<(f64, f64)>, reader| {
            let (min, max) = reader.channel_min_max(c)?;
            Some(Some(match acc {
                Some((lo, hi)) => (lo.min(min), hi.max(max)),
                None => (min, max),
            }))
        })?
    }

    fn metadata(&self) -> BTreeMap<String, String> {
        self.readers
            .first()
            .map(|r| r.metadata())
            .unwrap_or_default()
    }

    fn set_ignore_color_table(&mut self, ignore: bool) {
        for reader in self.readers.iter_mut() {
            reader.set_ignore_color_table(ignore);
        }
    }

    /// Close every file; the first failure is returned after all were tried.
    fn close(&mut self) -> Result<(), ReaderError> {
        let mut first_error = None;
        for reader in self.readers.iter_mut() {
            if let Err(e) = reader.close() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn identifier(&self) -> &str {
        self.readers.first().map_or("", |r| r.identifier())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{MemoryReader, MemorySeries, PixelType, Samples};
    use std::sync::atomic::Ordering;

    // -------------------------------------------------------------------------
    // FilePattern
    // -------------------------------------------------------------------------

    #[test]
    fn test_pattern_uses_last_digit_run() {
        let pattern = FilePattern::from_path(Path::new("/data/exp2_t010.tif")).unwrap();
        assert_eq!(pattern.number_of("exp2_t010.tif"), Some(10));
        assert_eq!(pattern.number_of("exp2_t7.tif"), Some(7));
        assert_eq!(pattern.number_of("exp3_t010.tif"), None);
        assert_eq!(pattern.number_of("exp2_t.tif"), None);
        assert_eq!(pattern.number_of("exp2_t01a.tif"), None);
    }

    #[test]
    fn test_pattern_without_digits() {
        assert!(FilePattern::from_path(Path::new("/data/cells.tif")).is_none());
    }

    #[test]
    fn test_select_orders_numerically() {
        let pattern = FilePattern::from_path(Path::new("/d/img_1.png")).unwrap();
        let picked = pattern.select(vec![
            PathBuf::from("/d/img_10.png"),
            PathBuf::from("/d/img_2.png"),
            PathBuf::from("/d/other_3.png"),
            PathBuf::from("/d/img_1.png"),
        ]);
        assert_eq!(
            picked,
            vec![
                PathBuf::from("/d/img_1.png"),
                PathBuf::from("/d/img_2.png"),
                PathBuf::from("/d/img_10.png"),
            ]
        );
    }

    #[test]
    fn test_list_reads_directory() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["s_3.raw", "s_1.raw", "s_2.txt", "t_1.raw"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let pattern = FilePattern::from_path(&dir.path().join("s_1.raw")).unwrap();
        let listed = pattern.list().unwrap();

        assert_eq!(listed, vec![dir.path().join("s_1.raw"), dir.path().join("s_3.raw")]);
    }

    // -------------------------------------------------------------------------
    // FileStitcher
    // -------------------------------------------------------------------------

    /// Z-stack of `z` 1x1 byte planes, values `base + z`.
    fn z_stack(name: &str, z: usize, base: u8) -> MemoryReader {
        let mut core = SeriesCore::single_plane(1, 1, PixelType::Uint8);
        core.size_z = z;
        core.image_count = z;
        let planes = (0..z)
            .map(|i| DecodedPlane::new(1, 1, 1, Samples::Byte(vec![base + i as u8])))
            .collect();
        MemoryReader::new(name, vec![MemorySeries::new(core, planes)])
    }

    #[test]
    fn test_stitch_concatenates_along_t() {
        let mut stitcher =
            FileStitcher::new(vec![z_stack("a1", 2, 0), z_stack("a2", 2, 100)]).unwrap();

        let core = stitcher.core();
        assert_eq!(core.size_t, 2);
        assert_eq!(core.image_count, 4);

        // XYZCT: plane 2 is z=0, t=1 which lives in the second file
        assert_eq!(stitcher.open_plane(2).unwrap().samples, Samples::Byte(vec![100]));
        assert_eq!(stitcher.open_plane(1).unwrap().samples, Samples::Byte(vec![1]));
        assert!(stitcher.open_plane(4).is_err());
    }

    #[test]
    fn test_stitch_rejects_mismatched_files() {
        let result = FileStitcher::new(vec![z_stack("a1", 2, 0), z_stack("a2", 3, 0)]);
        assert!(matches!(result, Err(ReaderError::IncompatibleFiles(_))));

        let result = FileStitcher::<MemoryReader>::new(Vec::new());
        assert!(matches!(result, Err(ReaderError::IncompatibleFiles(_))));
    }

    #[test]
    fn test_failed_stitch_closes_readers() {
        let a = z_stack("a1", 2, 0);
        let b = z_stack("a2", 3, 0);
        let (ca, cb) = (a.close_counter(), b.close_counter());

        assert!(FileStitcher::new(vec![a, b]).is_err());
        assert_eq!(ca.load(Ordering::SeqCst), 1);
        assert_eq!(cb.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stitch_min_max_union() {
        let a = MemoryReader::new("a", vec![MemorySeries::new(
            SeriesCore::single_plane(1, 1, PixelType::Uint8),
            vec![DecodedPlane::new(1, 1, 1, Samples::Byte(vec![0]))],
        )
        .with_min_max(0, 5.0, 9.0)]);
        let b = MemoryReader::new("b", vec![MemorySeries::new(
            SeriesCore::single_plane(1, 1, PixelType::Uint8),
            vec![DecodedPlane::new(1, 1, 1, Samples::Byte(vec![0]))],
        )
        .with_min_max(0, 2.0, 7.0)]);

        let stitcher = FileStitcher::new(vec![a, b]).unwrap();
        assert_eq!(stitcher.channel_min_max(0), Some((2.0, 9.0)));
        assert_eq!(stitcher.channel_min_max(1), None);
    }

    #[test]
    fn test_stitch_closes_every_file() {
        let a = z_stack("a", 1, 0);
        let b = z_stack("b", 1, 0);
        let (ca, cb) = (a.close_counter(), b.close_counter());

        let mut stitcher = FileStitcher::new(vec![a, b]).unwrap();
        stitcher.close().unwrap();

        assert_eq!(ca.load(Ordering::SeqCst), 1);
        assert_eq!(cb.load(Ordering::SeqCst), 1);
    }
}
