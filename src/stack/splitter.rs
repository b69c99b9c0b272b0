//! Splitting an assembled series stack into one stack per channel.
//!
//! Two addressing modes exist. Regular mode walks every `(z, t)` pair of the
//! series and picks the plane the dimension order assigns to each channel.
//! Range mode is used when the user narrowed the plane range: slices are
//! picked arithmetically from the range bounds, and candidates past the end
//! of the stack are skipped.

use tracing::debug;

use crate::error::DecodeError;
use crate::reader::SeriesCore;

use super::typed::{ColorTable, TypedStack};

/// How slices are addressed when splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    /// The full series was decoded.
    Regular,
    /// Only planes `begin..=end` (0-based) were decoded.
    Range { begin: usize, end: usize },
}

/// Splits stacks per channel, optionally tinting channels 0..=2.
#[derive(Debug, Clone, Copy)]
pub struct ChannelSplitter {
    mode: SplitMode,
    colorize: bool,
}

impl ChannelSplitter {
    pub fn new(mode: SplitMode, colorize: bool) -> Self {
        Self { mode, colorize }
    }

    /// One stack per channel of `core`, in channel order.
    ///
    /// # Errors
    /// * `ReaderError::InvalidCoordinates` - Regular mode addressed an invalid plane
    /// * `StackError::SliceOutOfRange` - Regular mode addressed a plane that
    ///   was not assembled
    pub fn split(&self, stack: &TypedStack, core: &SeriesCore) -> Result<Vec<TypedStack>, DecodeError> {
        let channels = core.size_c.max(1);

        let selections = match self.mode {
            SplitMode::Regular => regular_slices(core, channels)?,
            SplitMode::Range { begin, end } => {
                let step = if core.size_c > 1 {
                    core.index(0, 1, 0)?.saturating_sub(core.index(0, 0, 0)?)
                } else {
                    1
                };
                range_slices(begin, end, step, channels, stack.len())
            }
        };

        debug!(
            mode = ?self.mode,
            channels,
            slices = stack.len(),
            "Splitting stack by channel"
        );

        let mut out = Vec::with_capacity(channels);
        for (channel, numbers) in selections.iter().enumerate() {
            let mut sub = stack.select(numbers)?;
            if self.colorize {
                if let Some(table) = ColorTable::primary(channel) {
                    sub.set_color_table(Some(table));
                }
            }
            out.push(sub);
        }
        Ok(out)
    }
}

/// 1-based slice numbers per channel, every z before every t.
fn regular_slices(core: &SeriesCore, channels: usize) -> Result<Vec<Vec<usize>>, DecodeError> {
    let mut selections = Vec::with_capacity(channels);
    for c in 0..channels {
        let mut numbers = Vec::with_capacity(core.size_z * core.size_t);
        for z in 0..core.size_z {
            for t in 0..core.size_t {
                numbers.push(core.index(z, c, t)? + 1);
            }
        }
        selections.push(numbers);
    }
    Ok(selections)
}

/// 1-based slice numbers per channel for a stack built from planes
/// `begin..=end`, keeping only candidates inside a stack of `len` slices.
fn range_slices(begin: usize, end: usize, step: usize, channels: usize, len: usize) -> Vec<Vec<usize>> {
    let stride = ((end.saturating_sub(begin) + 1) / len.max(1)).max(1);

    (0..channels)
        .map(|c| {
            (begin..=end)
                .step_by(stride)
                .map(|j| c * step + (j - begin) * channels + 1)
                .filter(|&s| s - 1 < len)
                .collect()
        })
        .collect()
}
