//! Plane-indexed readers and the decorators composed around them.
//!
//! - [`FormatReader`] - the capability every reader implements
//! - [`ChannelSeparator`], [`ChannelMerger`], [`FileStitcher`] - decorators
//! - [`DecoderChain`] - a base reader wrapped for one import call
//! - [`SourceOpener`] / [`FileSource`] - opening files with format detection

mod chain;
mod dimension;
mod format_reader;
mod memory;
mod merger;
mod plane;
mod registry;
mod separator;
mod stitcher;

pub use chain::{lacks_rgb_range, ChainOptions, DecoderChain, Layer};
pub use dimension::{DimensionOrder, PlaneExtents};
pub use format_reader::{FormatReader, PhysicalSizes, PixelType, SeriesCore};
pub use memory::{MemoryReader, MemorySeries, MemorySource};
pub use merger::{ChannelMerger, MAX_MERGED_CHANNELS};
pub use plane::{DecodedPlane, SampleKind, Samples};
pub use registry::{BaseReader, FileSource, SourceOpener};
pub use separator::ChannelSeparator;
pub use stitcher::{FilePattern, FileStitcher};
