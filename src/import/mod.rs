//! The import pipeline and the collaborators it drives.
//!
//! [`Importer::run`] opens a source, asks a [`Prompt`] for options, series and
//! plane ranges, decodes the selection and hands [`ImageProduct`]s to a
//! [`Display`].

mod collaborators;
mod importer;
mod metadata;
mod options;
mod preferences;
mod product;
mod selection;
mod series;

pub use collaborators::{
    AcceptDefaults, CollectingDisplay, Display, ErrorReporter, MemoryPreferences, MetadataDisplay,
    NoStatus, Preferences, Prompt, StatusSink,
};
pub use importer::{Collaborators, ImportOutcome, Importer, ERROR_TITLE, STATUS_INTERVAL};
pub use metadata::MetadataTable;
pub use options::{
    ImportOptions, COLORIZE_KEY, IGNORE_COLOR_TABLES_KEY, MERGE_CHANNELS_KEY, SHOW_METADATA_KEY,
    SPECIFY_RANGES_KEY, SPLIT_WINDOWS_KEY, STITCH_FILES_KEY,
};
pub use preferences::JsonPreferences;
pub use product::{describe_product, ImageProduct};
pub use selection::{default_inclusion, needs_ranges, resolve_selections, PlaneSelection, RawRange};
pub use series::{describe_series, SeriesDescriptor};
