//! Command-line configuration for `stack-import`.
//!
//! Arguments are parsed with clap. Most options can also be set through
//! environment variables with the `STACK_IMPORT_` prefix:
//!
//! - `STACK_IMPORT_PREFS` - Preferences file (default: `.stack-import.json`)
//! - `STACK_IMPORT_OUTPUT` - Directory receiving exported PNG slices
//! - `STACK_IMPORT_BLOCK_SIZE` - Block size for file reads (default: 256KB)
//! - `STACK_IMPORT_CACHE_BLOCKS` - Cached blocks per file (default: 100)
//! - `STACK_IMPORT_MERGE_CHANNELS`, `STACK_IMPORT_IGNORE_COLOR_TABLES`,
//!   `STACK_IMPORT_COLORIZE`, `STACK_IMPORT_SPLIT_WINDOWS`,
//!   `STACK_IMPORT_SHOW_METADATA`, `STACK_IMPORT_STITCH_FILES`,
//!   `STACK_IMPORT_SPECIFY_RANGES` - Import flag overrides
//!
//! Import flags that are not given fall back to the preferences file.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::frontend::{OptionOverrides, ScriptedPrompt, SeriesChoice};
use crate::import::RawRange;
use crate::io::{DEFAULT_BLOCK_CACHE_CAPACITY, DEFAULT_BLOCK_SIZE};

// =============================================================================
// Default Values
// =============================================================================

/// Default preferences file, relative to the working directory.
pub const DEFAULT_PREFS_FILE: &str = ".stack-import.json";

/// Smallest accepted block size.
pub const MIN_BLOCK_SIZE: usize = 1024;

/// Largest accepted block size.
pub const MAX_BLOCK_SIZE: usize = 16 * 1024 * 1024;

// =============================================================================
// CLI Arguments
// =============================================================================

/// stack-import - Import multi-dimensional image files as plane stacks.
#[derive(Parser, Debug, Clone)]
#[command(name = "stack-import")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Import a file and export its stacks.
    Import(ImportConfig),
    /// Describe the series and metadata of a file.
    Info(InfoConfig),
}

/// Options shared by every subcommand that reads files.
#[derive(Args, Debug, Clone)]
pub struct ReadConfig {
    /// Block size in bytes for file reads.
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE, env = "STACK_IMPORT_BLOCK_SIZE")]
    pub block_size: usize,

    /// Maximum number of blocks cached per file.
    #[arg(long, default_value_t = DEFAULT_BLOCK_CACHE_CAPACITY, env = "STACK_IMPORT_CACHE_BLOCKS")]
    pub cache_blocks: usize,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ReadConfig {
    /// Validate the read options and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.block_size < MIN_BLOCK_SIZE || self.block_size > MAX_BLOCK_SIZE {
            return Err("block_size must be between 1KB and 16MB".to_string());
        }
        if self.cache_blocks == 0 {
            return Err("cache_blocks must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Arguments of `stack-import import`.
#[derive(Args, Debug, Clone)]
pub struct ImportConfig {
    /// File to import.
    pub path: PathBuf,

    // =========================================================================
    // Import Flags
    // =========================================================================
    /// Merge channels into RGB planes.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", env = "STACK_IMPORT_MERGE_CHANNELS")]
    pub merge_channels: Option<bool>,

    /// Decode palette images as raw indices.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", env = "STACK_IMPORT_IGNORE_COLOR_TABLES")]
    pub ignore_color_tables: Option<bool>,

    /// Tint split channels red, green and blue.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", env = "STACK_IMPORT_COLORIZE")]
    pub colorize: Option<bool>,

    /// Produce one image per channel.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", env = "STACK_IMPORT_SPLIT_WINDOWS")]
    pub split_windows: Option<bool>,

    /// Print the metadata table.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", env = "STACK_IMPORT_SHOW_METADATA")]
    pub show_metadata: Option<bool>,

    /// Stitch files with similar names into one source.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", env = "STACK_IMPORT_STITCH_FILES")]
    pub stitch_files: Option<bool>,

    /// Import a plane range per series; implied by --range.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", env = "STACK_IMPORT_SPECIFY_RANGES")]
    pub specify_ranges: Option<bool>,

    // =========================================================================
    // Selection
    // =========================================================================
    /// 1-based series to import (comma-separated); defaults to the first.
    #[arg(long, value_delimiter = ',', conflicts_with = "all_series")]
    pub series: Vec<usize>,

    /// Import every series.
    #[arg(long, default_value_t = false)]
    pub all_series: bool,

    /// Plane range as `series:begin:end[:step]`, all 1-based; repeatable.
    #[arg(long = "range")]
    pub ranges: Vec<String>,

    // =========================================================================
    // Output
    // =========================================================================
    /// Directory receiving one PNG per exported slice.
    #[arg(short, long, env = "STACK_IMPORT_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Preferences file holding the default import flags.
    #[arg(long, default_value = DEFAULT_PREFS_FILE, env = "STACK_IMPORT_PREFS")]
    pub prefs: PathBuf,

    /// Log failures without printing a user-facing message.
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    #[command(flatten)]
    pub read: ReadConfig,
}

impl ImportConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.read.validate()?;

        if self.series.contains(&0) {
            return Err("series numbers start at 1".to_string());
        }
        self.parse_ranges()?;
        Ok(())
    }

    /// Parse every `--range` argument into a 0-based series index and a raw
    /// 1-based plane range.
    pub fn parse_ranges(&self) -> Result<Vec<(usize, RawRange)>, String> {
        self.ranges.iter().map(|spec| parse_range(spec)).collect()
    }

    /// The flag overrides given on the command line.
    pub fn overrides(&self) -> OptionOverrides {
        OptionOverrides {
            merge_channels: self.merge_channels,
            ignore_color_tables: self.ignore_color_tables,
            colorize: self.colorize,
            split_windows: self.split_windows,
            show_metadata: self.show_metadata,
            stitch_files: self.stitch_files,
            specify_ranges: if self.ranges.is_empty() {
                self.specify_ranges
            } else {
                Some(true)
            },
        }
    }

    /// Build the scripted prompt answering for this invocation.
    pub fn prompt(&self) -> Result<ScriptedPrompt, String> {
        let series = if self.all_series {
            SeriesChoice::All
        } else if self.series.is_empty() {
            SeriesChoice::Default
        } else {
            SeriesChoice::List(self.series.iter().map(|n| n - 1).collect())
        };
        Ok(ScriptedPrompt::new(self.overrides(), series, self.parse_ranges()?))
    }
}

/// Parse `series:begin:end[:step]`.
fn parse_range(spec: &str) -> Result<(usize, RawRange), String> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 3 && parts.len() != 4 {
        return Err(format!(
            "invalid range '{}': expected series:begin:end[:step]",
            spec
        ));
    }

    let number = |s: &str| {
        s.trim()
            .parse::<i64>()
            .map_err(|_| format!("invalid range '{}': '{}' is not a number", spec, s))
    };

    let series = number(parts[0])?;
    if series < 1 {
        return Err(format!("invalid range '{}': series numbers start at 1", spec));
    }
    let step = match parts.get(3) {
        Some(s) => number(s)?,
        None => 1,
    };

    Ok((
        series as usize - 1,
        RawRange {
            begin: number(parts[1])?,
            end: number(parts[2])?,
            step,
        },
    ))
}

/// Arguments of `stack-import info`.
#[derive(Args, Debug, Clone)]
pub struct InfoConfig {
    /// File to describe.
    pub path: PathBuf,

    /// Print JSON instead of text.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[command(flatten)]
    pub read: ReadConfig,
}

impl InfoConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.read.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
