//! Key/value metadata table of a series.

use serde::Serialize;

use crate::reader::FormatReader;

/// Ordered key/value entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataTable {
    entries: Vec<(String, String)>,
}

impl MetadataTable {
    /// Standard dimensional fields of the current series of `reader`,
    /// followed by the reader's own entries in key order.
    pub fn from_reader<F: FormatReader + ?Sized>(reader: &F) -> Self {
        let core = reader.core();
        let mut table = MetadataTable::default();

        table.push("SizeX", core.size_x);
        table.push("SizeY", core.size_y);
        table.push("SizeZ", core.size_z);
        table.push("SizeT", core.size_t);
        table.push("SizeC", core.size_c);
        table.push("IsRGB", core.is_rgb());
        table.push("PixelType", core.pixel_type);
        table.push("LittleEndian", core.little_endian);
        table.push("DimensionOrder", core.dimension_order);
        table.push("IsInterleaved", core.interleaved);

        for (key, value) in reader.metadata() {
            table.entries.push((key, value));
        }
        table
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) {
        self.entries.push((key.into(), value.to_string()));
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{MemoryReader, MemorySeries, PixelType, SeriesCore};

    #[test]
    fn test_standard_fields_then_native_entries() {
        let mut core = SeriesCore::single_plane(32, 16, PixelType::Uint16);
        core.size_c = 3;
        core.rgb_channel_count = 3;
        core.interleaved = true;
        let reader = MemoryReader::new("mem", vec![MemorySeries::new(core, Vec::new())])
            .with_metadata("Software", "scope")
            .with_metadata("Artist", "lab");

        let table = MetadataTable::from_reader(&reader);
        let keys: Vec<_> = table.entries().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "SizeX",
                "SizeY",
                "SizeZ",
                "SizeT",
                "SizeC",
                "IsRGB",
                "PixelType",
                "LittleEndian",
                "DimensionOrder",
                "IsInterleaved",
                "Artist",
                "Software",
            ]
        );
        assert_eq!(table.get("SizeX"), Some("32"));
        assert_eq!(table.get("IsRGB"), Some("true"));
        assert_eq!(table.get("PixelType"), Some("uint16"));
        assert_eq!(table.get("DimensionOrder"), Some("XYZCT"));
    }
}
