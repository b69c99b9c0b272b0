//! The seven import flags and their persisted defaults.

use crate::reader::ChainOptions;

use super::collaborators::Preferences;

pub const MERGE_CHANNELS_KEY: &str = "mergeChannels";
pub const IGNORE_COLOR_TABLES_KEY: &str = "ignoreColorTables";
pub const COLORIZE_KEY: &str = "colorize";
pub const SPLIT_WINDOWS_KEY: &str = "splitWindows";
pub const SHOW_METADATA_KEY: &str = "showMetadata";
pub const STITCH_FILES_KEY: &str = "stitchFiles";
pub const SPECIFY_RANGES_KEY: &str = "specifyRanges";

/// User-selected flags for one import call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    /// Merge separate channel planes into RGB planes.
    pub merge_channels: bool,
    /// Decode palette images as their raw indices.
    pub ignore_color_tables: bool,
    /// Tint split channels 0..=2 red, green and blue.
    pub colorize: bool,
    /// Produce one image per channel.
    pub split_windows: bool,
    /// Hand the metadata table to the metadata display.
    pub show_metadata: bool,
    /// Treat similarly numbered files as one source.
    pub stitch_files: bool,
    /// Ask for a plane range per series.
    pub specify_ranges: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            merge_channels: false,
            ignore_color_tables: false,
            colorize: false,
            split_windows: true,
            show_metadata: false,
            stitch_files: false,
            specify_ranges: false,
        }
    }
}

impl ImportOptions {
    /// Read every flag from `preferences`, falling back to the defaults.
    pub fn load(preferences: &dyn Preferences) -> Self {
        let d = Self::default();
        Self {
            merge_channels: preferences.get_bool(MERGE_CHANNELS_KEY, d.merge_channels),
            ignore_color_tables: preferences
                .get_bool(IGNORE_COLOR_TABLES_KEY, d.ignore_color_tables),
            colorize: preferences.get_bool(COLORIZE_KEY, d.colorize),
            split_windows: preferences.get_bool(SPLIT_WINDOWS_KEY, d.split_windows),
            show_metadata: preferences.get_bool(SHOW_METADATA_KEY, d.show_metadata),
            stitch_files: preferences.get_bool(STITCH_FILES_KEY, d.stitch_files),
            specify_ranges: preferences.get_bool(SPECIFY_RANGES_KEY, d.specify_ranges),
        }
    }

    /// Write every flag to `preferences`.
    pub fn store(&self, preferences: &mut dyn Preferences) {
        preferences.set_bool(MERGE_CHANNELS_KEY, self.merge_channels);
        preferences.set_bool(IGNORE_COLOR_TABLES_KEY, self.ignore_color_tables);
        preferences.set_bool(COLORIZE_KEY, self.colorize);
        preferences.set_bool(SPLIT_WINDOWS_KEY, self.split_windows);
        preferences.set_bool(SHOW_METADATA_KEY, self.show_metadata);
        preferences.set_bool(STITCH_FILES_KEY, self.stitch_files);
        preferences.set_bool(SPECIFY_RANGES_KEY, self.specify_ranges);
    }

    /// Whether assembled stacks are split into one image per channel.
    pub fn splits_channels(&self) -> bool {
        !self.merge_channels && self.split_windows
    }

    /// The flags that shape the decoder chain.
    pub fn chain_options(&self) -> ChainOptions {
        ChainOptions {
            merge_channels: self.merge_channels,
            ignore_color_tables: self.ignore_color_tables,
            stitch_files: self.stitch_files,
        }
    }
}
