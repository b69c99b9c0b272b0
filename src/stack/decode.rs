//! Turning decoded reader planes into stack-ready pixel buffers.
//!
//! # Policy
//!
//! For every plane of a series the decoder:
//!
//! 1. Pads planes smaller than the series' nominal size onto a zeroed canvas
//! 2. For wide RGB series, autoscales to bytes when the channel range is
//!    known, or raises the deferred-RGB flag when it is not
//! 3. Extracts single-band byte, 16-bit and float planes as typed buffers,
//!    cut to exactly width x height samples
//! 4. Renders everything else as packed RGB

use tracing::debug;

use crate::error::ReaderError;
use crate::reader::{DecodedPlane, FormatReader, Samples, SeriesCore};

use super::typed::{pack_rgb, scale_linear, value_range};

// =============================================================================
// Extracted Planes
// =============================================================================

/// Pixel buffer of one extracted plane.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanePixels {
    Byte(Vec<u8>),
    Short(Vec<u16>),
    Float(Vec<f32>),
    Rgb(Vec<u32>),
}

impl PlanePixels {
    pub fn len(&self) -> usize {
        match self {
            PlanePixels::Byte(v) => v.len(),
            PlanePixels::Short(v) => v.len(),
            PlanePixels::Float(v) => v.len(),
            PlanePixels::Rgb(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A plane ready to be appended to a stack.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPlane {
    pub width: usize,
    pub height: usize,
    pub pixels: PlanePixels,
}

// =============================================================================
// PlaneDecoder
// =============================================================================

/// Decodes the planes of one series, tracking its deferred-RGB flag.
#[derive(Debug, Clone, Default)]
pub struct PlaneDecoder {
    deferred_rgb: bool,
}

impl PlaneDecoder {
    /// Create a decoder; `deferred_rgb` is the flag raised while building the
    /// chain for this series.
    pub fn new(deferred_rgb: bool) -> Self {
        Self { deferred_rgb }
    }

    /// Whether the series' planes must be recombined into color after assembly.
    pub fn deferred_rgb(&self) -> bool {
        self.deferred_rgb
    }

    /// Decode plane `no` of the current series of `reader`.
    ///
    /// `core` must describe that series.
    ///
    /// # Errors
    /// Propagates reader failures for the plane.
    pub fn decode<F: FormatReader + ?Sized>(
        &mut self,
        reader: &mut F,
        core: &SeriesCore,
        no: usize,
    ) -> Result<ExtractedPlane, ReaderError> {
        let mut plane = reader.open_plane(no)?;

        if plane.width < core.size_x || plane.height < core.size_y {
            plane = pad_plane(&plane, core.size_x, core.size_y);
        }

        if !self.deferred_rgb && core.is_rgb() && core.pixel_type.is_wide() {
            match rgb_range(&*reader, core, no)? {
                Some((min, max)) => plane = autoscale(&plane, min, max),
                None => {
                    debug!(
                        identifier = reader.identifier(),
                        plane = no,
                        "No channel range for wide RGB data, deferring color merge"
                    );
                    self.deferred_rgb = true;
                }
            }
        }

        Ok(extract(plane))
    }
}

/// Combined min/max of the channels making up RGB plane `no`.
fn rgb_range<F: FormatReader + ?Sized>(
    reader: &F,
    core: &SeriesCore,
    no: usize,
) -> Result<Option<(f64, f64)>, ReaderError> {
    let (_, c, _) = core.coords(no)?;
    let bands = core.rgb_channel_count;

    let mut range: Option<(f64, f64)> = None;
    for channel in c * bands..(c + 1) * bands {
        let Some((lo, hi)) = reader.channel_min_max(channel) else {
            return Ok(None);
        };
        range = Some(match range {
            None => (lo, hi),
            Some((min, max)) => (min.min(lo), max.max(hi)),
        });
    }
    Ok(range)
}

// =============================================================================
// Plane Transforms
// =============================================================================

/// Place `plane` at the origin of a zeroed canvas at least `width` x `height`.
pub fn pad_plane(plane: &DecodedPlane, width: usize, height: usize) -> DecodedPlane {
    let width = width.max(plane.width);
    let height = height.max(plane.height);
    let bands = plane.bands;

    let mut canvas = Samples::zeroed(plane.kind(), width * height * bands);
    let row_len = plane.width * bands;
    for row in 0..plane.height {
        plane
            .samples
            .copy_span(row * row_len, &mut canvas, row * width * bands, row_len);
    }

    DecodedPlane::new(width, height, bands, canvas)
}

/// Map every sample linearly from `[min, max]` to 0..255.
pub fn autoscale(plane: &DecodedPlane, min: f64, max: f64) -> DecodedPlane {
    let bytes = (0..plane.samples.len())
        .filter_map(|i| plane.samples.get_f64(i))
        .map(|v| scale_linear(v, min, max, 255.0) as u8)
        .collect();
    DecodedPlane::new(plane.width, plane.height, plane.bands, Samples::Byte(bytes))
}

/// Extract the stack buffer for `plane`.
///
/// Single-band byte, 16-bit and float planes keep their kind; anything else
/// is rendered as packed RGB. Buffers longer than width x height are cut to
/// their first width x height samples.
pub fn extract(plane: DecodedPlane) -> ExtractedPlane {
    let area = plane.pixel_count();
    let (width, height) = (plane.width, plane.height);

    let pixels = if plane.bands == 1 {
        match plane.samples {
            Samples::Byte(mut v) => {
                v.truncate(area);
                PlanePixels::Byte(v)
            }
            Samples::UShort(mut v) => {
                v.truncate(area);
                PlanePixels::Short(v)
            }
            Samples::Float(mut v) => {
                v.truncate(area);
                PlanePixels::Float(v)
            }
            other => PlanePixels::Rgb(render_rgb(&other, 1, area)),
        }
    } else {
        PlanePixels::Rgb(render_rgb(&plane.samples, plane.bands, area))
    };

    ExtractedPlane {
        width,
        height,
        pixels,
    }
}

/// Packed RGB rendering of `area` pixels of `bands` interleaved samples.
///
/// One band renders as gray; otherwise bands 0, 1 and 2 become red, green
/// and blue, with a missing blue band left at zero.
fn render_rgb(samples: &Samples, bands: usize, area: usize) -> Vec<u32> {
    let bytes = display_bytes(samples);
    let at = |i: usize| bytes.get(i).copied().unwrap_or(0);

    (0..area)
        .map(|p| {
            let base = p * bands;
            if bands == 1 {
                let g = at(base);
                pack_rgb(g, g, g)
            } else {
                let b = if bands > 2 { at(base + 2) } else { 0 };
                pack_rgb(at(base), at(base + 1), b)
            }
        })
        .collect()
}

/// Samples reduced to display bytes.
///
/// 16-bit samples keep their high byte; float and other samples are scaled
/// over the plane's range.
fn display_bytes(samples: &Samples) -> Vec<u8> {
    match samples {
        Samples::Byte(v) => v.clone(),
        Samples::UShort(v) => v.iter().map(|&s| (s >> 8) as u8).collect(),
        Samples::Float(v) => scaled_bytes(v.iter().map(|&s| s as f64)),
        Samples::Other(v) => scaled_bytes(v.iter().copied()),
    }
}

fn scaled_bytes<I: Iterator<Item = f64> + Clone>(values: I) -> Vec<u8> {
    let (min, max) = value_range(values.clone()).unwrap_or((0.0, 0.0));
    values
        .map(|v| scale_linear(v, min, max, 255.0) as u8)
        .collect()
}
