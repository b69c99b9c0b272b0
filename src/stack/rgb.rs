//! Rebuilding true-color stacks from separately decoded channels.
//!
//! When a wide RGB series is decoded channel by channel and not split into
//! windows, its stack holds gray planes that are recombined here once the
//! series is assembled. Every source slice is reduced to bytes first, then
//! channels 0, 1 and 2 become red, green and blue. Channels past the third
//! are dropped and missing ones stay black.

use crate::error::StackError;

use super::typed::{pack_rgb, Stack, TypedStack};

/// Merge every group of `channels` consecutive slices into one color slice.
///
/// Each color slice takes the label of the first slice of its group.
///
/// # Errors
/// * `StackError::SliceOutOfRange` - The stack length is not a multiple of `channels`
pub fn merge_grouped(stack: &TypedStack, channels: usize) -> Result<TypedStack, StackError> {
    let channels = channels.max(1);
    let len = stack.len();
    let mut merged = Stack::new(stack.width(), stack.height());

    for first in (1..=len).step_by(channels) {
        let last = first + channels - 1;
        if last > len {
            return Err(StackError::SliceOutOfRange { slice: last, len });
        }

        let mut bands: Vec<Vec<u8>> = Vec::with_capacity(3);
        for offset in 0..channels.min(3) {
            bands.push(stack.byte_slice(first + offset)?);
        }

        let label = stack.label(first)?.to_string();
        merged.add_slice(label, pack_bands(&bands, stack.width() * stack.height()))?;
    }

    Ok(TypedStack::Rgb(merged))
}

fn pack_bands(bands: &[Vec<u8>], area: usize) -> Vec<u32> {
    let at = |band: usize, p: usize| {
        bands
            .get(band)
            .and_then(|b| b.get(p))
            .copied()
            .unwrap_or(0)
    };
    (0..area).map(|p| pack_rgb(at(0, p), at(1, p), at(2, p))).collect()
}
