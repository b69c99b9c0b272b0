//! Which series and planes an import call decodes.

use super::series::SeriesDescriptor;

/// Plane range as entered by the user: 1-based and unchecked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRange {
    pub begin: i64,
    pub end: i64,
    pub step: i64,
}

/// Clamped 0-based inclusive plane range of one series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneSelection {
    pub series: usize,
    pub begin: usize,
    pub end: usize,
    pub step: usize,
}

impl PlaneSelection {
    /// Every plane of a series with `plane_count` planes.
    pub fn full(series: usize, plane_count: usize) -> Self {
        Self {
            series,
            begin: 0,
            end: plane_count.saturating_sub(1),
            step: 1,
        }
    }

    /// Clamp `raw` to a series with `plane_count` planes.
    ///
    /// `begin` lands in `0..plane_count`, `end` in `begin..plane_count` and
    /// `step` is at least 1.
    pub fn clamp(series: usize, raw: RawRange, plane_count: usize) -> Self {
        let last = plane_count.saturating_sub(1) as i64;
        let begin = raw.begin.saturating_sub(1).clamp(0, last);
        let end = raw.end.saturating_sub(1).clamp(begin, last);
        Self {
            series,
            begin: begin as usize,
            end: end as usize,
            step: raw.step.max(1) as usize,
        }
    }

    /// 0-based plane numbers to decode.
    pub fn planes(&self) -> impl Iterator<Item = usize> {
        (self.begin..=self.end).step_by(self.step.max(1))
    }

    /// Number of planes to decode.
    pub fn plane_count(&self) -> usize {
        (self.end - self.begin) / self.step.max(1) + 1
    }
}

/// Default inclusion: series 0 only.
pub fn default_inclusion(series_count: usize) -> Vec<bool> {
    (0..series_count).map(|i| i == 0).collect()
}

/// Whether a range prompt is needed for `include`.
pub fn needs_ranges(descriptors: &[SeriesDescriptor], include: &[bool]) -> bool {
    descriptors
        .iter()
        .zip(include)
        .any(|(d, included)| *included && d.plane_count > 1)
}

/// One selection per descriptor, clamping `raw` entries for included series
/// with more than one plane and using the full range everywhere else.
pub fn resolve_selections(
    descriptors: &[SeriesDescriptor],
    include: &[bool],
    raw: &[Option<RawRange>],
) -> Vec<PlaneSelection> {
    descriptors
        .iter()
        .map(|d| {
            let included = include.get(d.index).copied().unwrap_or(false);
            match raw.get(d.index).copied().flatten() {
                Some(range) if included && d.plane_count > 1 => {
                    PlaneSelection::clamp(d.index, range, d.plane_count)
                }
                _ => PlaneSelection::full(d.index, d.plane_count),
            }
        })
        .collect()
}
