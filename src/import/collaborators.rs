//! Interfaces the import pipeline drives, and the simple in-process
//! implementations of them.
//!
//! The pipeline never prompts, displays or persists anything itself. Each of
//! those concerns is a trait so that a command-line front end, a test or an
//! embedding application can supply its own.

use std::collections::BTreeMap;

use crate::error::PreferencesError;

use super::metadata::MetadataTable;
use super::options::ImportOptions;
use super::product::ImageProduct;
use super::selection::RawRange;
use super::series::SeriesDescriptor;

// =============================================================================
// Traits
// =============================================================================

/// Interactive choices. Returning `None` cancels the import.
pub trait Prompt {
    /// Confirm or change the import flags.
    fn choose_options(&mut self, defaults: &ImportOptions) -> Option<ImportOptions>;

    /// Choose which series to import; only asked when there are several.
    fn choose_series(&mut self, series: &[SeriesDescriptor], defaults: &[bool]) -> Option<Vec<bool>>;

    /// Raw 1-based plane ranges, one entry per series; entries for series
    /// that are not included are ignored.
    fn choose_ranges(
        &mut self,
        series: &[SeriesDescriptor],
        include: &[bool],
    ) -> Option<Vec<Option<RawRange>>>;
}

/// Receives finished images in series order.
pub trait Display {
    fn show(&mut self, product: ImageProduct);
}

/// Receives the metadata table.
pub trait MetadataDisplay {
    fn show_metadata(&mut self, title: &str, table: &MetadataTable);
}

/// Persisted boolean defaults.
pub trait Preferences {
    fn get_bool(&self, key: &str, default: bool) -> bool;

    fn set_bool(&mut self, key: &str, value: bool);

    /// Persist pending changes.
    ///
    /// # Errors
    /// * `PreferencesError::Io` - The backing store cannot be written
    fn save(&mut self) -> Result<(), PreferencesError> {
        Ok(())
    }
}

/// Advisory status text and progress.
pub trait StatusSink {
    fn status(&mut self, text: &str);

    /// Progress of the current series in `0.0..=1.0`.
    fn progress(&mut self, fraction: f64);
}

/// User-facing error messages.
pub trait ErrorReporter {
    fn report(&mut self, title: &str, message: &str);
}

// =============================================================================
// In-process implementations
// =============================================================================

/// Prompt that accepts every default and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptDefaults;

impl Prompt for AcceptDefaults {
    fn choose_options(&mut self, defaults: &ImportOptions) -> Option<ImportOptions> {
        Some(*defaults)
    }

    fn choose_series(&mut self, _series: &[SeriesDescriptor], defaults: &[bool]) -> Option<Vec<bool>> {
        Some(defaults.to_vec())
    }

    fn choose_ranges(
        &mut self,
        series: &[SeriesDescriptor],
        _include: &[bool],
    ) -> Option<Vec<Option<RawRange>>> {
        Some(vec![None; series.len()])
    }
}

/// Display that keeps every product.
#[derive(Debug, Default)]
pub struct CollectingDisplay {
    pub products: Vec<ImageProduct>,
}

impl Display for CollectingDisplay {
    fn show(&mut self, product: ImageProduct) {
        self.products.push(product);
    }
}

/// Preferences held in memory only.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    values: BTreeMap<String, bool>,
}

impl MemoryPreferences {
    pub fn get(&self, key: &str) -> Option<bool> {
        self.values.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Preferences for MemoryPreferences {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).unwrap_or(default)
    }

    fn set_bool(&mut self, key: &str, value: bool) {
        self.values.insert(key.to_string(), value);
    }
}

/// Status sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStatus;

impl StatusSink for NoStatus {
    fn status(&mut self, _text: &str) {}

    fn progress(&mut self, _fraction: f64) {}
}
