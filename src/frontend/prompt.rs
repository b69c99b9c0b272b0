//! Non-interactive prompt answering from command-line arguments.

use tracing::{debug, warn};

use crate::import::{ImportOptions, Prompt, RawRange, SeriesDescriptor};

/// Import flags given explicitly; `None` keeps the persisted default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptionOverrides {
    pub merge_channels: Option<bool>,
    pub ignore_color_tables: Option<bool>,
    pub colorize: Option<bool>,
    pub split_windows: Option<bool>,
    pub show_metadata: Option<bool>,
    pub stitch_files: Option<bool>,
    pub specify_ranges: Option<bool>,
}

impl OptionOverrides {
    pub fn apply(&self, defaults: &ImportOptions) -> ImportOptions {
        ImportOptions {
            merge_channels: self.merge_channels.unwrap_or(defaults.merge_channels),
            ignore_color_tables: self
                .ignore_color_tables
                .unwrap_or(defaults.ignore_color_tables),
            colorize: self.colorize.unwrap_or(defaults.colorize),
            split_windows: self.split_windows.unwrap_or(defaults.split_windows),
            show_metadata: self.show_metadata.unwrap_or(defaults.show_metadata),
            stitch_files: self.stitch_files.unwrap_or(defaults.stitch_files),
            specify_ranges: self.specify_ranges.unwrap_or(defaults.specify_ranges),
        }
    }
}

/// Which series to include.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesChoice {
    /// Keep the importer's default inclusion.
    Default,
    All,
    /// 0-based series indices.
    List(Vec<usize>),
}

/// A [`Prompt`] whose answers are fixed up front. It never cancels.
#[derive(Debug, Clone)]
pub struct ScriptedPrompt {
    overrides: OptionOverrides,
    series: SeriesChoice,
    ranges: Vec<(usize, RawRange)>,
}

impl ScriptedPrompt {
    /// `ranges` pairs a 0-based series index with a raw 1-based range; a later
    /// entry for the same series wins.
    pub fn new(overrides: OptionOverrides, series: SeriesChoice, ranges: Vec<(usize, RawRange)>) -> Self {
        Self {
            overrides,
            series,
            ranges,
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn choose_options(&mut self, defaults: &ImportOptions) -> Option<ImportOptions> {
        let options = self.overrides.apply(defaults);
        debug!(?options, "Resolved import options");
        Some(options)
    }

    fn choose_series(&mut self, series: &[SeriesDescriptor], defaults: &[bool]) -> Option<Vec<bool>> {
        let include = match &self.series {
            SeriesChoice::Default => return Some(defaults.to_vec()),
            SeriesChoice::All => vec![true; series.len()],
            SeriesChoice::List(indices) => {
                let mut include = vec![false; series.len()];
                for &index in indices {
                    match include.get_mut(index) {
                        Some(slot) => *slot = true,
                        None => warn!(
                            series = index + 1,
                            count = series.len(),
                            "Ignoring series that does not exist"
                        ),
                    }
                }
                include
            }
        };

        if include.iter().any(|&i| i) {
            Some(include)
        } else {
            warn!("No requested series exists, importing the default selection");
            Some(defaults.to_vec())
        }
    }

    fn choose_ranges(
        &mut self,
        series: &[SeriesDescriptor],
        _include: &[bool],
    ) -> Option<Vec<Option<RawRange>>> {
        let mut ranges = vec![None; series.len()];
        for &(index, range) in &self.ranges {
            match ranges.get_mut(index) {
                Some(slot) => *slot = Some(range),
                None => warn!(series = index + 1, "Ignoring range for a series that does not exist"),
            }
        }
        Some(ranges)
    }
}
