//! Per-series summaries shown before decoding.

use serde::Serialize;

use crate::error::ReaderError;
use crate::reader::{FormatReader, SeriesCore};

/// Dimensions and plane count of one series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesDescriptor {
    pub index: usize,
    pub size_x: usize,
    pub size_y: usize,
    pub size_z: usize,
    pub size_c: usize,
    pub size_t: usize,
    pub plane_count: usize,
    pub order_certain: bool,
    pub name: Option<String>,
}

impl SeriesDescriptor {
    pub fn from_core(index: usize, core: &SeriesCore) -> Self {
        Self {
            index,
            size_x: core.size_x,
            size_y: core.size_y,
            size_z: core.size_z,
            size_c: core.size_c,
            size_t: core.size_t,
            plane_count: core.image_count,
            order_certain: core.order_certain,
            name: core.name.clone().filter(|n| !n.is_empty()),
        }
    }

    /// Non-unit C, Z and T sizes such as `"3C x 5Z"`.
    ///
    /// Empty when the dimension order is uncertain or every size is 1.
    pub fn summary(&self) -> String {
        if !self.order_certain {
            return String::new();
        }
        [(self.size_c, 'C'), (self.size_z, 'Z'), (self.size_t, 'T')]
            .iter()
            .filter(|(size, _)| *size > 1)
            .map(|(size, letter)| format!("{}{}", size, letter))
            .collect::<Vec<_>>()
            .join(" x ")
    }

    /// Label used when offering the series for selection, e.g.
    /// `"Series_2 - label: 640 x 480; 15 planes (3C x 5Z)"`.
    pub fn label(&self) -> String {
        let mut label = format!("Series_{} - ", self.index + 1);
        if let Some(name) = &self.name {
            label.push_str(name);
            label.push_str(": ");
        }
        label.push_str(&format!(
            "{} x {}; {} planes",
            self.size_x, self.size_y, self.plane_count
        ));
        if self.order_certain {
            label.push_str(&format!(" ({})", self.summary()));
        }
        label
    }
}

/// Descriptors for every series of `reader`, leaving series 0 selected.
///
/// # Errors
/// Propagates `set_series` failures.
pub fn describe_series<F: FormatReader + ?Sized>(
    reader: &mut F,
) -> Result<Vec<SeriesDescriptor>, ReaderError> {
    let count = reader.series_count();
    let mut descriptors = Vec::with_capacity(count);
    for index in 0..count {
        reader.set_series(index)?;
        descriptors.push(SeriesDescriptor::from_core(index, &reader.core()));
    }
    if count > 0 {
        reader.set_series(0)?;
    }
    Ok(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{MemoryReader, MemorySeries, PixelType};

    fn descriptor(c: usize, z: usize, t: usize, certain: bool) -> SeriesDescriptor {
        SeriesDescriptor {
            index: 1,
            size_x: 640,
            size_y: 480,
            size_z: z,
            size_c: c,
            size_t: t,
            plane_count: c * z * t,
            order_certain: certain,
            name: None,
        }
    }

    #[test]
    fn test_summary_orders_c_z_t() {
        assert_eq!(descriptor(3, 5, 1, true).summary(), "3C x 5Z");
        assert_eq!(descriptor(1, 1, 4, true).summary(), "4T");
        assert_eq!(descriptor(2, 3, 4, true).summary(), "2C x 3Z x 4T");
        assert_eq!(descriptor(1, 1, 1, true).summary(), "");
        assert_eq!(descriptor(3, 5, 1, false).summary(), "");
    }

    #[test]
    fn test_label() {
        let mut d = descriptor(3, 5, 1, true);
        assert_eq!(d.label(), "Series_2 - 640 x 480; 15 planes (3C x 5Z)");

        d.name = Some("label".to_string());
        d.order_certain = false;
        assert_eq!(d.label(), "Series_2 - label: 640 x 480; 15 planes");
    }

    #[test]
    fn test_describe_every_series() {
        let mut small = SeriesCore::single_plane(4, 4, PixelType::Uint8);
        small.name = Some(String::new());
        let mut stack = SeriesCore::single_plane(8, 8, PixelType::Uint16);
        stack.size_z = 3;
        stack.image_count = 3;
        stack.name = Some("stack".to_string());

        let mut reader = MemoryReader::new(
            "mem",
            vec![
                MemorySeries::new(small, Vec::new()),
                MemorySeries::new(stack, Vec::new()),
            ],
        );
        let descriptors = describe_series(&mut reader).unwrap();

        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].index, 0);
        assert_eq!(descriptors[0].name, None);
        assert_eq!(descriptors[1].plane_count, 3);
        assert_eq!(descriptors[1].name.as_deref(), Some("stack"));
        assert_eq!(reader.series(), 0);
    }
}
