//! Channel separation: one plane per channel.

use std::collections::BTreeMap;

use crate::error::ReaderError;

use super::format_reader::{FormatReader, SeriesCore};
use super::plane::DecodedPlane;

/// Presents every band of an RGB series as its own grayscale plane.
///
/// Non-RGB series pass through unchanged. The most recently decoded source
/// plane is cached, so reading the bands of one pixel plane in sequence
/// decodes it once.
pub struct ChannelSeparator<R> {
    inner: R,
    /// (series, source plane index, decoded plane)
    last: Option<(usize, usize, DecodedPlane)>,
}

impl<R: FormatReader> ChannelSeparator<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, last: None }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Source plane index and band for a separated plane index.
    fn source_of(&self, no: usize) -> Result<(usize, usize), ReaderError> {
        let source = self.inner.core();
        let separated = self.core();
        separated.check_plane(no)?;

        let bands = source.rgb_channel_count;
        let (z, c, t) = separated.coords(no)?;
        let source_no = source.index(z, c / bands, t)?;
        Ok((source_no, c % bands))
    }
}

impl<R: FormatReader> FormatReader for ChannelSeparator<R> {
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
        if core.is_rgb() {
            core.image_count *= core.rgb_channel_count;
            core.rgb_channel_count = 1;
            core.interleaved = false;
        }
        core
    }

    fn open_plane(&mut self, no: usize) -> Result<DecodedPlane, ReaderError> {
        if !self.inner.core().is_rgb() {
            return self.inner.open_plane(no);
        }

        let (source_no, band) = self.source_of(no)?;
        let series = self.inner.series();

        let cached = matches!(&self.last, Some((s, n, _)) if *s == series && *n == source_no);
        if !cached {
            let plane = self.inner.open_plane(source_no)?;
            self.last = Some((series, source_no, plane));
        }

        match &self.last {
            Some((_, _, plane)) => plane.band(band),
            None => Err(ReaderError::PlaneOutOfRange {
                plane: no,
                count: self.core().image_count,
            }),
        }
    }

    fn channel_min_max(&self, c: usize) -> Option<(f64, f64)> {
        self.inner.channel_min_max(c)
    }

    fn metadata(&self) -> BTreeMap<String, String> {
        self.inner.metadata()
    }

    fn set_ignore_color_table(&mut self, ignore: bool) {
        self.last = None;
        self.inner.set_ignore_color_table(ignore);
    }

    fn close(&mut self) -> Result<(), ReaderError> {
        self.last = None;
        self.inner.close()
    }

    fn identifier(&self) -> &str {
        self.inner.identifier()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{MemoryReader, MemorySeries, PixelType, Samples};

    /// One RGB series with `planes` Z planes of 2x1 pixels.
    fn rgb_reader(planes: usize) -> MemoryReader {
        let mut core = SeriesCore::single_plane(2, 1, PixelType::Uint8);
        core.size_c = 3;
        core.rgb_channel_count = 3;
        core.interleaved = true;
        core.size_z = planes;
        core.image_count = planes;
        let planes = (0..planes as u8)
            .map(|z| {
                let base = z * 10;
                DecodedPlane::new(
                    2,
                    1,
                    3,
                    Samples::Byte(vec![base, base + 1, base + 2, base + 3, base + 4, base + 5]),
                )
            })
            .collect();
        MemoryReader::new("rgb", vec![MemorySeries::new(core, planes)])
    }

    #[test]
    fn test_separated_core() {
        let separator = ChannelSeparator::new(rgb_reader(2));
        let core = separator.core();
        assert_eq!(core.image_count, 6);
        assert_eq!(core.rgb_channel_count, 1);
        assert_eq!(core.size_c, 3);
        assert!(!core.is_rgb());
    }

    #[test]
    fn test_separated_planes_follow_dimension_order() {
        let mut separator = ChannelSeparator::new(rgb_reader(2));

        // XYZCT: plane 1 is z=1, c=0
        assert_eq!(separator.open_plane(1).unwrap().samples, Samples::Byte(vec![10, 13]));
        // plane 2 is z=0, c=1
        assert_eq!(separator.open_plane(2).unwrap().samples, Samples::Byte(vec![1, 4]));
        // plane 5 is z=1, c=2
        assert_eq!(separator.open_plane(5).unwrap().samples, Samples::Byte(vec![12, 15]));
    }

    #[test]
    fn test_out_of_range_plane() {
        let mut separator = ChannelSeparator::new(rgb_reader(1));
        assert!(matches!(
            separator.open_plane(3),
            Err(ReaderError::PlaneOutOfRange { plane: 3, count: 3 })
        ));
    }

    #[test]
    fn test_gray_series_passes_through() {
        let core = SeriesCore::single_plane(1, 1, PixelType::Uint16);
        let plane = DecodedPlane::new(1, 1, 1, Samples::UShort(vec![7]));
        let reader = MemoryReader::new("gray", vec![MemorySeries::new(core.clone(), vec![plane])]);
        let mut separator = ChannelSeparator::new(reader);

        assert_eq!(separator.core(), core);
        assert_eq!(separator.open_plane(0).unwrap().samples, Samples::UShort(vec![7]));
    }
}
