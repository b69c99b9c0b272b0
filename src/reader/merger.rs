//! Channel merging: all channels of a (Z, T) position as one plane.

use std::collections::BTreeMap;

use crate::error::ReaderError;

use super::format_reader::{FormatReader, SeriesCore};
use super::plane::DecodedPlane;

/// Most channels that can be merged into one interleaved plane.
pub const MAX_MERGED_CHANNELS: usize = 4;

/// Presents the 2 to 4 grayscale channels of a series as one interleaved plane.
///
/// Series that are already RGB, single-channel or have more than
/// [`MAX_MERGED_CHANNELS`] channels pass through unchanged.
pub struct ChannelMerger<R> {
    inner: R,
}

impl<R: FormatReader> ChannelMerger<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn can_merge(core: &SeriesCore) -> bool {
        !core.is_rgb() && core.size_c > 1 && core.size_c <= MAX_MERGED_CHANNELS
    }
}

impl<R: FormatReader> FormatReader for ChannelMerger<R> {
    fn series_count(&self) -> usize {
        self.inner.series_count()
    }

    fn set_series(&mut self, series: usize) -> Result<(), ReaderError> {
        self.inner.set_series(series)
    }

    fn series(&self) -> usize {
        self.inner.series()
    }

    fn core(&self) -> SeriesCore {
        let mut core = self.inner.core();
        if Self::can_merge(&core) {
            core.image_count = core.size_z * core.size_t;
            core.rgb_channel_count = core.size_c;
            core.interleaved = true;
        }
        core
    }

    fn open_plane(&mut self, no: usize) -> Result<DecodedPlane, ReaderError> {
        let source = self.inner.core();
        if !Self::can_merge(&source) {
            return self.inner.open_plane(no);
        }

        let merged = self.core();
        merged.check_plane(no)?;
        let (z, _, t) = merged.coords(no)?;

        let channels = (0..source.size_c)
            .map(|c| {
                let index = source.index(z, c, t)?;
                self.inner.open_plane(index)
            })
            .collect::<Result<Vec<_>, _>>()?;

        DecodedPlane::interleave(&channels)
    }

    fn channel_min_max(&self, c: usize) -> Option<(f64, f64)> {
        self.inner.channel_min_max(c)
    }

    fn metadata(&self) -> BTreeMap<String, String> {
        self.inner.metadata()
    }

    fn set_ignore_color_table(&mut self, ignore: bool) {
        self.inner.set_ignore_color_table(ignore);
    }

    fn close(&mut self) -> Result<(), ReaderError> {
        self.inner.close()
    }

    fn identifier(&self) -> &str {
        self.inner.identifier()
    }
}
