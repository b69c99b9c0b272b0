//! Import orchestration.
//!
//! One [`Importer::run`] call takes a source path through the whole pipeline:
//!
//! 1. Check the source exists and open it with format detection
//! 2. Ask for the import flags, seeded from the persisted preferences
//! 3. Build the decoder chain and describe every series
//! 4. Ask which series and plane ranges to import
//! 5. Decode, assemble, split, calibrate and recombine each series, handing
//!    the products to the display in series order
//! 6. Close the chain and, on success, persist the flags
//!
//! The chain is closed exactly once whichever way the call ends.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::error::{FormatError, ImportError, ReaderError};
use crate::reader::{DecoderChain, FormatReader, SourceOpener};
use crate::stack::{
    merge_grouped, CalibrationRecord, ChannelSplitter, PlaneDecoder, SplitMode,
    StackAssembler, TypedStack,
};

use super::collaborators::{Display, ErrorReporter, MetadataDisplay, Preferences, Prompt, StatusSink};
use super::metadata::MetadataTable;
use super::options::ImportOptions;
use super::product::{describe_product, ImageProduct};
use super::selection::{default_inclusion, needs_ranges, resolve_selections, PlaneSelection};
use super::series::{describe_series, SeriesDescriptor};

/// Title of user-facing error reports.
pub const ERROR_TITLE: &str = "Stack Importer";

/// Minimum time between plane status updates.
pub const STATUS_INTERVAL: Duration = Duration::from_millis(100);

// =============================================================================
// Public Types
// =============================================================================

/// How an import call ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// `products` images from `series` series were displayed.
    Completed { products: usize, series: usize },
    /// The user canceled at a prompt; nothing was decoded.
    Canceled,
}

/// The collaborators one import call drives.
pub struct Collaborators<'a> {
    pub prompt: &'a mut dyn Prompt,
    pub display: &'a mut dyn Display,
    pub metadata: &'a mut dyn MetadataDisplay,
    pub preferences: &'a mut dyn Preferences,
    pub status: &'a mut dyn StatusSink,
    pub errors: &'a mut dyn ErrorReporter,
}

/// Imports sources opened through `O`.
#[derive(Debug, Clone)]
pub struct Importer<O> {
    opener: O,
    quiet: bool,
}

/// Per-call values shared by every series.
struct CallContext<'s> {
    source: &'s str,
    file_name: &'s str,
    series_count: usize,
    options: &'s ImportOptions,
}

// =============================================================================
// Importer
// =============================================================================

impl<O: SourceOpener> Importer<O> {
    pub fn new(opener: O) -> Self {
        Self {
            opener,
            quiet: false,
        }
    }

    /// In quiet mode failures are only logged, never reported to the user.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Import `path`.
    ///
    /// Products are handed to `io.display` as each series completes, so a
    /// failure in a later series leaves earlier products displayed.
    ///
    /// # Errors
    /// * `ImportError::MissingSource` - `path` does not exist
    /// * `ImportError::UnsupportedFormat` - No reader recognizes the file
    /// * `ImportError::DecodeFailure` - Anything failed after the file was opened
    pub fn run(&self, path: &Path, io: &mut Collaborators<'_>) -> Result<ImportOutcome, ImportError> {
        let result = self.import(path, io);

        if let Err(err) = &result {
            error!(path = %path.display(), error = %err, "Import failed");
            io.status.status("");
            if !self.quiet {
                io.errors.report(ERROR_TITLE, &err.user_message());
            }
        }
        result
    }

    fn import(&self, path: &Path, io: &mut Collaborators<'_>) -> Result<ImportOutcome, ImportError> {
        let source = path.display().to_string();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.clone());

        if !self.opener.exists(path) {
            return Err(ImportError::MissingSource(path.to_path_buf()));
        }

        io.status.status(&format!("Identifying {}", file_name));
        let mut base = self.opener.open(path).map_err(open_error)?;

        let defaults = ImportOptions::load(&*io.preferences);
        io.status.status("");
        let Some(options) = io.prompt.choose_options(&defaults) else {
            if let Err(e) = base.close() {
                warn!(path = %source, error = %e, "Closing reader failed");
            }
            info!(path = %source, "Import canceled");
            return Ok(ImportOutcome::Canceled);
        };

        io.status.status(&format!("Analyzing {}", file_name));
        let mut chain = DecoderChain::build(&self.opener, base, path, options.chain_options())?;

        let context = CallContext {
            source: &source,
            file_name: &file_name,
            series_count: chain.reader().series_count(),
            options: &options,
        };
        let result = read_chain(&mut chain, &context, io);
        let closed = chain.close();
        let outcome = result?;
        closed?;

        match outcome {
            ImportOutcome::Completed { products, series } => {
                options.store(&mut *io.preferences);
                if let Err(e) = io.preferences.save() {
                    warn!(error = %e, "Saving preferences failed");
                }
                info!(path = %source, series, products, "Import complete");
            }
            ImportOutcome::Canceled => info!(path = %source, "Import canceled"),
        }
        Ok(outcome)
    }
}

fn open_error(err: FormatError) -> ImportError {
    match err {
        FormatError::UnsupportedFormat { reason } => ImportError::UnsupportedFormat(reason),
        other => ReaderError::Format(other).into(),
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Describe, select and import every chosen series.
fn read_chain<R: FormatReader>(
    chain: &mut DecoderChain<R>,
    context: &CallContext<'_>,
    io: &mut Collaborators<'_>,
) -> Result<ImportOutcome, ImportError> {
    let descriptors = describe_series(chain.reader_mut())?;

    let mut include = default_inclusion(descriptors.len());
    if descriptors.len() > 1 {
        io.status.status("");
        let Some(mut chosen) = io.prompt.choose_series(&descriptors, &include) else {
            return Ok(ImportOutcome::Canceled);
        };
        chosen.resize(descriptors.len(), false);
        include = chosen;
    }

    let mut raw = vec![None; descriptors.len()];
    if context.options.specify_ranges && needs_ranges(&descriptors, &include) {
        io.status.status("");
        let Some(chosen) = io.prompt.choose_ranges(&descriptors, &include) else {
            return Ok(ImportOutcome::Canceled);
        };
        raw = chosen;
    }
    let selections = resolve_selections(&descriptors, &include, &raw);

    if context.options.show_metadata {
        if let Some(first) = include.iter().position(|included| *included) {
            io.status.status("Populating metadata");
            chain.reader_mut().set_series(first)?;
            let table = MetadataTable::from_reader(chain.reader());
            io.metadata
                .show_metadata(&format!("{} Metadata", context.source), &table);
        }
    }

    io.status.status(&format!("Reading {}", context.file_name));
    let mut products = 0;
    let mut series = 0;
    for descriptor in &descriptors {
        if !include[descriptor.index] || descriptor.plane_count == 0 {
            continue;
        }
        products += read_series(chain, descriptor, &selections[descriptor.index], context, io)?;
        series += 1;
    }

    Ok(ImportOutcome::Completed { products, series })
}

/// Decode one series and display its products; returns how many were shown.
fn read_series<R: FormatReader>(
    chain: &mut DecoderChain<R>,
    descriptor: &SeriesDescriptor,
    selection: &PlaneSelection,
    context: &CallContext<'_>,
    io: &mut Collaborators<'_>,
) -> Result<usize, ImportError> {
    let index = descriptor.index;
    let options = context.options;

    chain.reader_mut().set_series(index)?;
    let core = chain.reader().core();
    let image_name = match &descriptor.name {
        Some(name) => format!("{} - {}", context.file_name, name),
        None => context.file_name.to_string(),
    };

    let total = selection.plane_count();
    let started = Instant::now();
    let mut throttle = StatusThrottle::new(started);
    let mut decoder = PlaneDecoder::new(chain.deferred_rgb(index));
    let mut assembler = StackAssembler::new(image_name.as_str());

    for (q, no) in selection.planes().enumerate() {
        if throttle.ready(Instant::now()) {
            io.status
                .status(&reading_status(context.series_count, index, no, selection.end));
        }
        io.status.progress(q as f64 / total as f64);

        let plane = decoder.decode(chain.reader_mut(), &core, no)?;
        assembler.add(no, plane)?;
    }

    io.status.status("Creating image");
    io.status.progress(1.0);

    let calibration = CalibrationRecord::from_physical(&core.physical);
    let description = describe_product(context.source, index, &core, &chain.reader().metadata());
    let product = |title: String, stack: TypedStack| ImageProduct {
        title,
        stack,
        calibration: calibration.clone(),
        description: description.clone(),
    };

    let mut products = Vec::new();
    for stack in assembler.finish() {
        // Planes that reached the stack still interleaved are already color.
        let rebuild = decoder.deferred_rgb() && !matches!(stack, TypedStack::Rgb(_));
        if options.splits_channels() {
            let mode = if options.specify_ranges && descriptor.plane_count > 1 {
                SplitMode::Range {
                    begin: selection.begin,
                    end: selection.end,
                }
            } else {
                SplitMode::Regular
            };
            let channels = ChannelSplitter::new(mode, options.colorize).split(&stack, &core)?;
            for (c, sub) in channels.into_iter().enumerate() {
                products.push(product(format!("{} - Ch{}", image_name, c + 1), sub));
            }
        } else if rebuild {
            products.push(product(image_name.clone(), merge_grouped(&stack, core.size_c)?));
        } else {
            products.push(product(image_name.clone(), stack));
        }
    }

    let count = products.len();
    for product in products {
        io.display.show(product);
    }

    let elapsed = started.elapsed();
    io.status.status(&finished_status(elapsed, total));
    debug!(
        series = index,
        planes = total,
        products = count,
        deferred_rgb = decoder.deferred_rgb(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Imported series"
    );
    Ok(count)
}

// =============================================================================
// Status Text
// =============================================================================

/// Lets a status update through at most once per [`STATUS_INTERVAL`].
#[derive(Debug, Clone, Copy)]
struct StatusThrottle {
    last: Instant,
}

impl StatusThrottle {
    fn new(start: Instant) -> Self {
        Self { last: start }
    }

    fn ready(&mut self, now: Instant) -> bool {
        if now.duration_since(self.last) >= STATUS_INTERVAL {
            self.last = now;
            return true;
        }
        false
    }
}

fn reading_status(series_count: usize, series: usize, plane: usize, end: usize) -> String {
    let series_part = if series_count > 1 {
        format!("series {}, ", series + 1)
    } else {
        String::new()
    };
    format!("Reading {}plane {}/{}", series_part, plane + 1, end + 1)
}

fn finished_status(elapsed: Duration, planes: usize) -> String {
    let seconds = elapsed.as_secs_f64();
    if planes > 1 {
        let average = elapsed.as_millis() / planes as u128;
        format!("Imported in {:.3} seconds ({} ms per plane)", seconds, average)
    } else {
        format!("Imported in {:.3} seconds", seconds)
    }
}
