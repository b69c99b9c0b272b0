//! Decoder chain: a base reader wrapped in the decorators an import asks for.
//!
//! Layers, innermost first:
//!
//! 1. [`ChannelMerger`] when merging channels, otherwise [`ChannelSeparator`]
//! 2. [`FileStitcher`] over every similarly named file, when stitching
//! 3. A second [`ChannelSeparator`] when some series holds wide RGB samples
//!    with no known channel range; every RGB series it splits is flagged for
//!    deferred RGB reconstruction
//!
//! The chain owns every reader it wraps and closes them exactly once, either
//! through [`DecoderChain::close`] or when dropped.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::ReaderError;

use super::format_reader::{FormatReader, SeriesCore};
use super::merger::ChannelMerger;
use super::plane::DecodedPlane;
use super::registry::SourceOpener;
use super::separator::ChannelSeparator;
use super::stitcher::FileStitcher;

// =============================================================================
// ChainOptions
// =============================================================================

/// Flags that decide which decorators are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainOptions {
    pub merge_channels: bool,
    pub ignore_color_tables: bool,
    pub stitch_files: bool,
}

// =============================================================================
// Layer
// =============================================================================

/// One level of the decorator stack.
pub enum Layer<R> {
    Base(R),
    Separated(Box<ChannelSeparator<Layer<R>>>),
    Merged(Box<ChannelMerger<Layer<R>>>),
    Stitched(Box<FileStitcher<Layer<R>>>),
}

impl<R: FormatReader> Layer<R> {
    /// Innermost decorator over a freshly opened base reader.
    fn over_base(base: R, merge_channels: bool) -> Self {
        if merge_channels {
            Layer::Merged(Box::new(ChannelMerger::new(Layer::Base(base))))
        } else {
            Layer::Separated(Box::new(ChannelSeparator::new(Layer::Base(base))))
        }
    }

    /// Layer structure, outermost first, e.g. `Separated(Stitched(Merged(Base)))`.
    pub fn describe(&self) -> String {
        match self {
            Layer::Base(_) => "Base".to_string(),
            Layer::Separated(r) => format!("Separated({})", r.inner().describe()),
            Layer::Merged(r) => format!("Merged({})", r.inner().describe()),
            Layer::Stitched(r) => format!("Stitched(x{})", r.file_count()),
        }
    }

    fn as_reader(&self) -> &dyn FormatReader {
        match self {
            Layer::Base(r) => r,
            Layer::Separated(r) => r.as_ref(),
            Layer::Merged(r) => r.as_ref(),
            Layer::Stitched(r) => r.as_ref(),
        }
    }

    fn as_reader_mut(&mut self) -> &mut dyn FormatReader {
        match self {
            Layer::Base(r) => r,
            Layer::Separated(r) => r.as_mut(),
            Layer::Merged(r) => r.as_mut(),
            Layer::Stitched(r) => r.as_mut(),
        }
    }
}

impl<R: FormatReader> FormatReader for Layer<R> {
    fn series_count(&self) -> usize {
        self.as_reader().series_count()
    }

    fn set_series(&mut self, series: usize) -> Result<(), ReaderError> {
        self.as_reader_mut().set_series(series)
    }

    fn series(&self) -> usize {
        self.as_reader().series()
    }

    fn core(&self) -> SeriesCore {
        self.as_reader().core()
    }

    fn open_plane(&mut self, no: usize) -> Result<DecodedPlane, ReaderError> {
        self.as_reader_mut().open_plane(no)
    }

    fn channel_min_max(&self, c: usize) -> Option<(f64, f64)> {
        self.as_reader().channel_min_max(c)
    }

    fn metadata(&self) -> BTreeMap<String, String> {
        self.as_reader().metadata()
    }

    fn set_ignore_color_table(&mut self, ignore: bool) {
        self.as_reader_mut().set_ignore_color_table(ignore);
    }

    fn close(&mut self) -> Result<(), ReaderError> {
        self.as_reader_mut().close()
    }

    fn identifier(&self) -> &str {
        self.as_reader().identifier()
    }
}

// =============================================================================
// DecoderChain
// =============================================================================

/// The decorated reader of one import call.
pub struct DecoderChain<R: FormatReader> {
    reader: Layer<R>,
    deferred_rgb: Vec<bool>,
    closed: bool,
}

impl<R: FormatReader> DecoderChain<R> {
    /// Wrap `base` (already opened from `path`) according to `options`.
    ///
    /// Sibling files are opened through `opener`. On failure every reader
    /// opened so far, `base` included, is closed.
    ///
    /// # Errors
    /// Any `ReaderError` from opening siblings, stitching or series queries.
    pub fn build<O>(
        opener: &O,
        base: R,
        path: &Path,
        options: ChainOptions,
    ) -> Result<Self, ReaderError>
    where
        O: SourceOpener<Reader = R>,
    {
        let mut reader = Layer::over_base(base, options.merge_channels);
        if options.stitch_files {
            reader = stitch(opener, reader, path, options.merge_channels)?;
        }
        reader.set_ignore_color_table(options.ignore_color_tables);

        let mut deferred_rgb = vec![false; reader.series_count()];
        if !options.ignore_color_tables {
            let colors = match survey_rgb(&mut reader) {
                Ok(colors) => colors,
                Err(e) => {
                    close_quietly(&mut reader);
                    return Err(e);
                }
            };
            if colors.iter().any(|c| c.unranged) {
                // The outer separator splits every RGB series, not only the
                // unranged ones, so all of them are recombined.
                deferred_rgb = colors.iter().map(|c| c.rgb).collect();
                reader = Layer::Separated(Box::new(ChannelSeparator::new(reader)));
            }
        }

        let mut chain = DecoderChain {
            reader,
            deferred_rgb,
            closed: false,
        };
        chain.reader.set_series(0)?;

        debug!(
            identifier = chain.reader.identifier(),
            layers = %chain.reader.describe(),
            series = chain.reader.series_count(),
            "Built decoder chain"
        );
        Ok(chain)
    }

    pub fn reader(&self) -> &Layer<R> {
        &self.reader
    }

    pub fn reader_mut(&mut self) -> &mut Layer<R> {
        &mut self.reader
    }

    /// Whether `series` decodes separated channels to be recombined as RGB.
    pub fn deferred_rgb(&self, series: usize) -> bool {
        self.deferred_rgb.get(series).copied().unwrap_or(false)
    }

    /// Close every wrapped reader.
    pub fn close(mut self) -> Result<(), ReaderError> {
        self.closed = true;
        self.reader.close()
    }
}

impl<R: FormatReader> Drop for DecoderChain<R> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.reader.close() {
            warn!(identifier = self.reader.identifier(), error = %e, "Closing decoder chain failed");
        }
    }
}

/// Whether the current series holds wide RGB samples without a known range
/// for every channel.
pub fn lacks_rgb_range<F: FormatReader + ?Sized>(reader: &F, core: &SeriesCore) -> bool {
    core.is_rgb()
        && core.pixel_type.is_wide()
        && (0..core.size_c).any(|c| reader.channel_min_max(c).is_none())
}

/// Color layout of one series below the deferred-RGB separator.
#[derive(Debug, Clone, Copy)]
struct SeriesColor {
    rgb: bool,
    unranged: bool,
}

fn survey_rgb<R: FormatReader>(reader: &mut Layer<R>) -> Result<Vec<SeriesColor>, ReaderError> {
    let mut colors = Vec::with_capacity(reader.series_count());
    for series in 0..reader.series_count() {
        reader.set_series(series)?;
        let core = reader.core();
        let unranged = lacks_rgb_range(reader, &core);
        if unranged {
            debug!(series, pixel_type = %core.pixel_type, "Deferring RGB reconstruction");
        }
        colors.push(SeriesColor {
            rgb: core.is_rgb(),
            unranged,
        });
    }
    Ok(colors)
}

/// Stitch `own` (opened from `path`) with its sibling files.
fn stitch<O, R>(
    opener: &O,
    own: Layer<R>,
    path: &Path,
    merge_channels: bool,
) -> Result<Layer<R>, ReaderError>
where
    O: SourceOpener<Reader = R>,
    R: FormatReader,
{
    let mut own = Some(own);
    let mut siblings = match opener.siblings(path) {
        Ok(siblings) => siblings,
        Err(e) => {
            own.iter_mut().for_each(close_quietly);
            return Err(e);
        }
    };
    if !siblings.iter().any(|s| s == path) {
        siblings = vec![path.to_path_buf()];
    }

    let mut readers = Vec::with_capacity(siblings.len());
    for sibling in &siblings {
        let reused = if sibling == path { own.take() } else { None };
        let layer = match reused {
            Some(layer) => Ok(layer),
            None => opener
                .open(sibling)
                .map(|base| Layer::over_base(base, merge_channels))
                .map_err(ReaderError::from),
        };
        match layer {
            Ok(layer) => readers.push(layer),
            Err(e) => {
                readers.iter_mut().for_each(close_quietly);
                own.iter_mut().for_each(close_quietly);
                return Err(e);
            }
        }
    }

    Ok(Layer::Stitched(Box::new(FileStitcher::new(readers)?)))
}

fn close_quietly<F: FormatReader + ?Sized>(reader: &mut F) {
    if let Err(e) = reader.close() {
        warn!(identifier = reader.identifier(), error = %e, "Close failed");
    }
}
