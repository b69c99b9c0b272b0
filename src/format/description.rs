//! Parsers for the metadata that writers embed in the TIFF ImageDescription.
//!
//! Two dialects matter for stack import:
//!
//! - **Aperio**: a pipe-separated string with `key = value` pairs, carrying
//!   the pixel size as `MPP` (microns per pixel).
//! - **ImageJ**: newline-separated `key=value` lines starting with
//!   `ImageJ=<version>`, carrying the hyperstack layout (`channels`,
//!   `slices`, `frames`), the Z spacing and the spatial unit.

use std::collections::BTreeMap;

// =============================================================================
// Aperio
// =============================================================================

/// Parsed Aperio ImageDescription.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AperioDescription {
    /// Microns per pixel
    pub mpp: Option<f64>,

    /// Objective magnification (e.g., 20, 40)
    pub magnification: Option<f64>,

    /// All key-value pairs
    pub properties: BTreeMap<String, String>,
}

impl AperioDescription {
    /// Parse an Aperio description, `None` when the "Aperio" marker is absent.
    ///
    /// Format:
    /// ```text
    /// Aperio Image Library vXX.X.X
    /// width x height (tile dimensions) JPEG/RGB Q=70|AppMag = 20|MPP = 0.5|...
    /// ```
    pub fn parse(description: &str) -> Option<Self> {
        if !description.contains("Aperio") {
            return None;
        }

        let mut parsed = AperioDescription::default();

        for part in description.split('|') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            parsed.properties.insert(key.to_string(), value.to_string());

            match key {
                "MPP" => parsed.mpp = value.parse::<f64>().ok().filter(|v| *v > 0.0),
                "AppMag" => parsed.magnification = value.parse::<f64>().ok(),
                _ => {}
            }
        }

        Some(parsed)
    }
}

// =============================================================================
// ImageJ
// =============================================================================

/// Parsed ImageJ ImageDescription.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageJDescription {
    /// Total number of images (planes) in the file
    pub images: Option<usize>,

    pub channels: Option<usize>,

    pub slices: Option<usize>,

    pub frames: Option<usize>,

    /// Z step in `unit`
    pub spacing: Option<f64>,

    /// Spatial unit, normalized to "micron" when it denotes micrometers
    pub unit: Option<String>,

    /// Display range minimum written by ImageJ
    pub min: Option<f64>,

    /// Display range maximum written by ImageJ
    pub max: Option<f64>,

    /// All key-value pairs
    pub properties: BTreeMap<String, String>,
}

impl ImageJDescription {
    /// Parse an ImageJ description, `None` unless it starts with `ImageJ=`.
    pub fn parse(description: &str) -> Option<Self> {
        if !description.trim_start().starts_with("ImageJ=") {
            return None;
        }

        let mut parsed = ImageJDescription::default();

        for line in description.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            parsed.properties.insert(key.to_string(), value.to_string());

            match key {
                "images" => parsed.images = parse_count(value),
                "channels" => parsed.channels = parse_count(value),
                "slices" => parsed.slices = parse_count(value),
                "frames" => parsed.frames = parse_count(value),
                "spacing" => parsed.spacing = value.parse::<f64>().ok().filter(|v| *v > 0.0),
                "unit" => parsed.unit = Some(normalize_unit(value)),
                "min" => parsed.min = value.parse::<f64>().ok(),
                "max" => parsed.max = value.parse::<f64>().ok(),
                _ => {}
            }
        }

        Some(parsed)
    }

    /// Whether the spatial unit is micrometers.
    pub fn is_micron(&self) -> bool {
        self.unit.as_deref() == Some("micron")
    }
}

fn parse_count(value: &str) -> Option<usize> {
    value.parse::<usize>().ok().filter(|v| *v > 0)
}

fn normalize_unit(value: &str) -> String {
    match value {
        "micron" | "microns" | "um" | "\u{00B5}m" | "\\u00B5m" => "micron".to_string(),
        other => other.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
