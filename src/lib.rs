//! # Stack Importer
//!
//! Imports multi-dimensional scientific image files (multi-page TIFF, ImageJ
//! hyperstacks, BigTIFF, JPEG, PNG) into typed, channel-organized plane
//! stacks.
//!
//! ## Features
//!
//! - **Range-based reads**: TIFF planes are read through a block cache, so only
//!   the strips or tiles of requested planes are touched
//! - **Decoder chain**: channel separation, RGB merging and multi-file
//!   stitching compose around any format reader
//! - **Typed stacks**: 8-bit, 16-bit, 32-bit float and packed RGB stacks with
//!   channel splitting, colorization and calibration
//! - **Pluggable front end**: prompts, display, preferences and status are
//!   traits, so the pipeline runs headless, in tests or behind a UI
//!
//! ## Architecture
//!
//! - [`io`] - Range readers and block caching
//! - [`mod@format`] - TIFF parsing, raster decoding and format detection
//! - [`reader`] - Plane-indexed readers, decorators and the decoder chain
//! - [`stack`] - Plane decoding, stack assembly, splitting and RGB merging
//! - [`import`] - The import pipeline and its collaborator traits
//! - [`frontend`] - Command-line collaborators
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use stack_importer::{
//!     AcceptDefaults, CollectingDisplay, Collaborators, FileSource, Importer, MemoryPreferences,
//!     NoStatus,
//! };
//! use stack_importer::frontend::{PrintMetadata, StderrReporter};
//!
//! let importer = Importer::new(FileSource::default());
//! let mut display = CollectingDisplay::default();
//! let mut io = Collaborators {
//!     prompt: &mut AcceptDefaults,
//!     display: &mut display,
//!     metadata: &mut PrintMetadata::stdout(),
//!     preferences: &mut MemoryPreferences::default(),
//!     status: &mut NoStatus,
//!     errors: &mut StderrReporter,
//! };
//!
//! let outcome = importer.run(Path::new("cells.tif"), &mut io);
//! println!("{:?}, {} images", outcome, display.products.len());
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod frontend;
pub mod import;
pub mod io;
pub mod reader;
pub mod stack;

// Re-export commonly used types
pub use config::{Cli, Command, ImportConfig, InfoConfig, ReadConfig};
pub use error::{
    DecodeError, ExportError, FormatError, ImportError, IoError, PreferencesError, ReaderError,
    StackError, TiffError,
};
pub use format::{detect_format, RasterReader, SourceFormat, TiffReader};
pub use import::{
    describe_series, AcceptDefaults, CollectingDisplay, Collaborators, Display, ErrorReporter,
    ImageProduct, ImportOptions, ImportOutcome, Importer, JsonPreferences, MemoryPreferences,
    MetadataDisplay, MetadataTable, NoStatus, PlaneSelection, Preferences, Prompt, RawRange,
    SeriesDescriptor, StatusSink,
};
pub use io::{BlockCache, FileRangeReader, MemoryRangeReader, RangeReader};
pub use reader::{
    BaseReader, ChainOptions, DecoderChain, DimensionOrder, FileSource, FormatReader, PixelType,
    SeriesCore, SourceOpener,
};
pub use stack::{CalibrationRecord, ColorTable, TypedStack};
