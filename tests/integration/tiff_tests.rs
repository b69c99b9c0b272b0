//! Container-level tests: byte orders, BigTIFF, sample types, palettes and
//! ImageJ hyperstacks read through the TIFF reader and format detection.

use stack_importer::format::{detect_format, SourceFormat, TiffReader};
use stack_importer::io::MemoryRangeReader;
use stack_importer::reader::{DimensionOrder, FormatReader, PixelType, Samples};

use super::test_utils::{imagej_description, ByteOrderType, PageBuilder, TiffBuilder};

fn open(bytes: Vec<u8>) -> TiffReader<MemoryRangeReader> {
    TiffReader::open(MemoryRangeReader::new(bytes, "test.tif")).unwrap()
}

// =============================================================================
// Detection
// =============================================================================

#[test]
fn test_detects_classic_and_bigtiff() {
    let classic = TiffBuilder::new()
        .add_page(PageBuilder::gray8(1, 1, vec![0]))
        .build();
    let big = TiffBuilder::new()
        .with_bigtiff(true)
        .with_byte_order(ByteOrderType::BigEndian)
        .add_page(PageBuilder::gray8(1, 1, vec![0]))
        .build();

    assert_eq!(
        detect_format(&MemoryRangeReader::new(classic, "a.tif")).unwrap(),
        SourceFormat::Tiff
    );
    assert_eq!(
        detect_format(&MemoryRangeReader::new(big, "b.tif")).unwrap(),
        SourceFormat::BigTiff
    );
}

#[test]
fn test_text_is_not_detected() {
    let reader = MemoryRangeReader::new(b"plain text, no image here".to_vec(), "notes.txt");
    assert!(detect_format(&reader).is_err());
}

// =============================================================================
// Byte orders and layouts
// =============================================================================

#[test]
fn test_big_endian_uint16_stack() {
    let bytes = TiffBuilder::new()
        .with_byte_order(ByteOrderType::BigEndian)
        .add_page(PageBuilder::gray16(2, 1, vec![1000, 2000]))
        .add_page(PageBuilder::gray16(2, 1, vec![3000, 4000]))
        .build();
    let mut reader = open(bytes);

    let core = reader.core();
    assert_eq!(core.pixel_type, PixelType::Uint16);
    assert_eq!((core.size_x, core.size_y, core.size_z), (2, 1, 2));
    assert_eq!(
        reader.open_plane(1).unwrap().samples,
        Samples::UShort(vec![3000, 4000])
    );
}

#[test]
fn test_bigtiff_float_page() {
    let bytes = TiffBuilder::new()
        .with_bigtiff(true)
        .add_page(PageBuilder::float32(3, 1, vec![-1.5, 0.0, 2.25]))
        .build();
    let mut reader = open(bytes);

    assert_eq!(reader.core().pixel_type, PixelType::Float);
    assert_eq!(
        reader.open_plane(0).unwrap().samples,
        Samples::Float(vec![-1.5, 0.0, 2.25])
    );
}

#[test]
fn test_big_endian_bigtiff_with_row_strips() {
    let pixels: Vec<u8> = (0..16).collect();
    let bytes = TiffBuilder::new()
        .with_bigtiff(true)
        .with_byte_order(ByteOrderType::BigEndian)
        .add_page(PageBuilder::gray8(4, 4, pixels.clone()).with_rows_per_strip(1))
        .build();
    let mut reader = open(bytes);

    assert_eq!(reader.open_plane(0).unwrap().samples, Samples::Byte(pixels));
}

#[test]
fn test_rgb_page_is_one_interleaved_plane() {
    let bytes = TiffBuilder::new()
        .add_page(PageBuilder::rgb8(2, 1, vec![10, 20, 30, 40, 50, 60]))
        .build();
    let mut reader = open(bytes);

    let core = reader.core();
    assert_eq!(core.rgb_channel_count, 3);
    assert_eq!(core.image_count, 1);
    assert!(core.is_rgb());
    assert_eq!(
        reader.open_plane(0).unwrap().samples,
        Samples::Byte(vec![10, 20, 30, 40, 50, 60])
    );
}

#[test]
fn test_palette_expands_unless_ignored() {
    let mut map = vec![0u16; 768];
    map[2] = 0xFFFF; // red of index 2
    map[512 + 2] = 0x8000; // blue of index 2
    let bytes = TiffBuilder::new()
        .with_byte_order(ByteOrderType::BigEndian)
        .add_page(PageBuilder::palette8(2, 1, vec![0, 2], map))
        .build();
    let mut reader = open(bytes);

    assert_eq!(
        reader.open_plane(0).unwrap().samples,
        Samples::Byte(vec![0, 0, 0, 255, 0, 128])
    );

    reader.set_ignore_color_table(true);
    assert_eq!(reader.open_plane(0).unwrap().samples, Samples::Byte(vec![0, 2]));
}

// =============================================================================
// Series layout
// =============================================================================

#[test]
fn test_imagej_hyperstack_dimensions() {
    let mut builder = TiffBuilder::new();
    for i in 0..6u8 {
        let mut page = PageBuilder::gray8(1, 1, vec![i]);
        if i == 0 {
            page = page.with_description(imagej_description(2, 3, 1));
        }
        builder = builder.add_page(page);
    }
    let mut reader = open(builder.build());

    let core = reader.core();
    assert_eq!((core.size_c, core.size_z, core.size_t), (2, 3, 1));
    assert_eq!(core.dimension_order, DimensionOrder::XYCZT);
    assert!(core.order_certain);

    // c=1, z=2 is plane 5 in XYCZT order.
    let no = reader.index(2, 1, 0).unwrap();
    assert_eq!(no, 5);
    assert_eq!(reader.open_plane(no).unwrap().samples, Samples::Byte(vec![5]));
}

#[test]
fn test_plain_stack_order_is_uncertain() {
    let bytes = TiffBuilder::new()
        .add_page(PageBuilder::gray8(1, 1, vec![1]))
        .add_page(PageBuilder::gray8(1, 1, vec![2]))
        .build();
    let reader = open(bytes);

    let core = reader.core();
    assert_eq!(core.size_z, 2);
    assert!(!core.order_certain);
}

#[test]
fn test_geometry_change_splits_series() {
    let bytes = TiffBuilder::new()
        .add_page(PageBuilder::gray8(2, 2, vec![0; 4]))
        .add_page(PageBuilder::gray8(1, 1, vec![7]))
        .build();
    let mut reader = open(bytes);

    assert_eq!(reader.series_count(), 2);
    reader.set_series(1).unwrap();
    assert_eq!(reader.open_plane(0).unwrap().samples, Samples::Byte(vec![7]));
}

#[test]
fn test_resolution_in_centimeters_is_microns() {
    let bytes = TiffBuilder::new()
        .add_page(PageBuilder::gray8(1, 1, vec![0]).with_resolution(20_000, 3))
        .build();
    let reader = open(bytes);

    let physical = reader.core().physical;
    assert_eq!(physical.x, Some(0.5));
    assert_eq!(physical.y, Some(0.5));
}
