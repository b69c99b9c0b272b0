//! Physical pixel calibration attached to image products.

use serde::Serialize;

use crate::reader::PhysicalSizes;

/// Unit every calibration record is expressed in.
pub const CALIBRATION_UNIT: &str = "micron";

/// Physical size of one pixel; absent dimensions stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationRecord {
    pub pixel_width: Option<f64>,
    pub pixel_height: Option<f64>,
    pub pixel_depth: Option<f64>,
    pub unit: String,
}

impl CalibrationRecord {
    /// Record for `sizes`, or `None` when no dimension is known.
    ///
    /// NaN sizes count as absent.
    pub fn from_physical(sizes: &PhysicalSizes) -> Option<Self> {
        let known = |v: Option<f64>| v.filter(|v| !v.is_nan());
        let record = CalibrationRecord {
            pixel_width: known(sizes.x),
            pixel_height: known(sizes.y),
            pixel_depth: known(sizes.z),
            unit: CALIBRATION_UNIT.to_string(),
        };

        if record.pixel_width.is_none()
            && record.pixel_height.is_none()
            && record.pixel_depth.is_none()
        {
            return None;
        }
        Some(record)
    }
}
