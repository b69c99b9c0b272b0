//! Finished images handed to the display.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::reader::SeriesCore;
use crate::stack::{CalibrationRecord, TypedStack};

/// One displayable image: a titled stack with its calibration and a JSON
/// description of the series it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageProduct {
    pub title: String,
    pub stack: TypedStack,
    pub calibration: Option<CalibrationRecord>,
    pub description: Value,
}

/// JSON description of series `series` of `source`.
pub fn describe_product(
    source: &str,
    series: usize,
    core: &SeriesCore,
    metadata: &BTreeMap<String, String>,
) -> Value {
    json!({
        "source": source,
        "series": series,
        "name": core.name,
        "sizeX": core.size_x,
        "sizeY": core.size_y,
        "sizeZ": core.size_z,
        "sizeC": core.size_c,
        "sizeT": core.size_t,
        "pixelType": core.pixel_type,
        "dimensionOrder": core.dimension_order.name(),
        "physicalSizes": core.physical,
        "metadata": metadata,
    })
}
