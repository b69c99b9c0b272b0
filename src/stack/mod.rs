//! Stacks assembled from decoded planes.
//!
//! - [`PlaneDecoder`] - one reader plane to a typed pixel buffer
//! - [`StackAssembler`] - buffers of one series to typed stacks
//! - [`ChannelSplitter`] - one stack per channel
//! - [`merge_grouped`] - color reconstruction
//! - [`CalibrationRecord`] - physical pixel sizes

mod assembler;
mod calibration;
mod decode;
mod rgb;
mod splitter;
mod typed;

pub use assembler::StackAssembler;
pub use calibration::{CalibrationRecord, CALIBRATION_UNIT};
pub use decode::{autoscale, extract, pad_plane, ExtractedPlane, PlaneDecoder, PlanePixels};
pub use rgb::merge_grouped;
pub use splitter::{ChannelSplitter, SplitMode};
pub(crate) use typed::{scale_linear, value_range};
pub use typed::{
    float_to_byte, float_to_short, pack_rgb, rgb_to_byte, short_to_byte, unpack_rgb, ColorTable,
    Slice, Stack, TypedStack,
};
