//! End-to-end imports of files on disk through `FileSource`.

use stack_importer::frontend::{OptionOverrides, ScriptedPrompt, SeriesChoice, StackExporter};
use stack_importer::import::{COLORIZE_KEY, ERROR_TITLE};
use stack_importer::stack::{pack_rgb, ColorTable, TypedStack};
use stack_importer::{
    Collaborators, FileSource, ImportError, ImportOutcome, Importer, JsonPreferences,
    MemoryPreferences, Preferences, RawRange,
};

use super::test_utils::{
    create_test_png, gray8_stack, imagej_description, prompt_with, Harness, PageBuilder,
    RecordingMetadata, RecordingReporter, RecordingStatus, TempDir, TiffBuilder,
};

/// A hyperstack of 1x1 8-bit planes whose value is the plane index.
fn hyperstack(channels: usize, slices: usize) -> TiffBuilder {
    let mut builder = TiffBuilder::new();
    for i in 0..channels * slices {
        let mut page = PageBuilder::gray8(1, 1, vec![i as u8 * 10]);
        if i == 0 {
            page = page.with_description(imagej_description(channels, slices, 1));
        }
        builder = builder.add_page(page);
    }
    builder
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_missing_file_is_reported() {
    let dir = TempDir::new("missing");
    let mut harness = Harness::new();

    let result = harness.run(&mut prompt_with(|_| {}), &dir.path().join("absent.tif"));
    assert!(matches!(result, Err(ImportError::MissingSource(_))));
    assert_eq!(harness.errors.reports.len(), 1);
    assert_eq!(harness.errors.reports[0].0, ERROR_TITLE);
    assert!(harness.errors.reports[0].1.contains("does not exist"));
    assert!(harness.preferences.is_empty());
}

#[test]
fn test_quiet_failure_is_only_returned() {
    let dir = TempDir::new("quiet");
    let mut harness = Harness::new();
    let mut preferences = MemoryPreferences::default();

    let result = harness.run_with(
        &mut prompt_with(|_| {}),
        &mut preferences,
        &dir.path().join("absent.tif"),
        true,
    );
    assert!(result.is_err());
    assert!(harness.errors.reports.is_empty());
}

#[test]
fn test_unrecognized_file_is_unsupported() {
    let dir = TempDir::new("unsupported");
    let path = dir.write("notes.tif", b"this is not an image at all");
    let mut harness = Harness::new();

    let result = harness.run(&mut prompt_with(|_| {}), &path);
    assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    assert!(harness.errors.reports[0]
        .1
        .starts_with("Sorry, there was a problem reading the file:\n"));
}

// =============================================================================
// Plain stacks
// =============================================================================

#[test]
fn test_plain_stack_imports_one_byte_stack() {
    let dir = TempDir::new("plain");
    let path = dir.write("stack.tif", &gray8_stack(2, 2, 3, |i| i as u8 * 10));
    let mut harness = Harness::new();

    let outcome = harness.run(&mut prompt_with(|_| {}), &path).unwrap();
    assert_eq!(outcome, ImportOutcome::Completed { products: 1, series: 1 });

    let product = &harness.display.products[0];
    assert_eq!(product.title, "stack.tif - Ch1");
    assert_eq!(
        product.stack.labels(),
        vec!["stack.tif:1", "stack.tif:2", "stack.tif:3"]
    );
    match &product.stack {
        TypedStack::Byte(stack) => {
            assert_eq!(stack.slice(3).unwrap().pixels, vec![20; 4]);
        }
        other => panic!("expected 8-bit stack, got {}", other.kind_name()),
    }
    assert!(product.calibration.is_none());
    assert_eq!(product.description["source"], path.display().to_string());

    let texts = &harness.status.texts;
    assert_eq!(texts[0], "Identifying stack.tif");
    assert!(texts.contains(&"Analyzing stack.tif".to_string()));
    assert!(texts.contains(&"Reading stack.tif".to_string()));
    assert!(texts.contains(&"Creating image".to_string()));
    assert!(texts.last().unwrap().starts_with("Imported in"));
    assert_eq!(harness.status.last_progress, Some(1.0));
    assert_eq!(harness.preferences.len(), 7);
}

#[test]
fn test_sample_kinds_map_to_stack_kinds() {
    let dir = TempDir::new("kinds");
    let short = dir.write(
        "short.tif",
        &TiffBuilder::new()
            .add_page(PageBuilder::gray16(2, 1, vec![0, 4000]))
            .build(),
    );
    let float = dir.write(
        "float.tif",
        &TiffBuilder::new()
            .add_page(PageBuilder::float32(2, 1, vec![0.5, -0.5]))
            .build(),
    );

    let mut harness = Harness::new();
    harness.run(&mut prompt_with(|_| {}), &short).unwrap();
    harness.run(&mut prompt_with(|_| {}), &float).unwrap();

    let kinds: Vec<_> = harness
        .display
        .products
        .iter()
        .map(|p| p.stack.kind_name())
        .collect();
    assert_eq!(kinds, vec!["16-bit", "32-bit"]);
}

#[test]
fn test_range_selection_with_step() {
    let dir = TempDir::new("range");
    let path = dir.write("z.tif", &gray8_stack(1, 1, 6, |i| i as u8));
    let overrides = OptionOverrides {
        split_windows: Some(false),
        specify_ranges: Some(true),
        ..OptionOverrides::default()
    };
    let range = RawRange {
        begin: 2,
        end: 6,
        step: 2,
    };
    let mut prompt = ScriptedPrompt::new(overrides, SeriesChoice::Default, vec![(0, range)]);
    let mut harness = Harness::new();

    harness.run(&mut prompt, &path).unwrap();
    let product = &harness.display.products[0];
    assert_eq!(product.title, "z.tif");
    assert_eq!(product.stack.labels(), vec!["z.tif:2", "z.tif:4", "z.tif:6"]);
}

#[test]
fn test_all_series_are_imported_in_order() {
    let dir = TempDir::new("series");
    let bytes = TiffBuilder::new()
        .add_page(PageBuilder::gray8(2, 2, vec![1; 4]))
        .add_page(PageBuilder::gray8(1, 1, vec![2]))
        .add_page(PageBuilder::gray8(1, 1, vec![3]))
        .build();
    let path = dir.write("multi.tif", &bytes);
    let overrides = OptionOverrides {
        split_windows: Some(false),
        ..OptionOverrides::default()
    };

    let mut harness = Harness::new();
    let mut default = ScriptedPrompt::new(overrides, SeriesChoice::Default, Vec::new());
    let outcome = harness.run(&mut default, &path).unwrap();
    assert_eq!(outcome, ImportOutcome::Completed { products: 1, series: 1 });

    let mut harness = Harness::new();
    let mut all = ScriptedPrompt::new(overrides, SeriesChoice::All, Vec::new());
    let outcome = harness.run(&mut all, &path).unwrap();
    assert_eq!(outcome, ImportOutcome::Completed { products: 2, series: 2 });

    let sizes: Vec<_> = harness
        .display
        .products
        .iter()
        .map(|p| (p.stack.width(), p.stack.len()))
        .collect();
    assert_eq!(sizes, vec![(2, 1), (1, 2)]);
}

// =============================================================================
// Channels
// =============================================================================

#[test]
fn test_hyperstack_split_and_colorize() {
    let dir = TempDir::new("split");
    let path = dir.write("hyper.tif", &hyperstack(2, 3).build());
    let mut harness = Harness::new();

    let outcome = harness
        .run(&mut prompt_with(|o| o.colorize = Some(true)), &path)
        .unwrap();
    assert_eq!(outcome, ImportOutcome::Completed { products: 2, series: 1 });

    let products = &harness.display.products;
    assert_eq!(products[0].title, "hyper.tif - Ch1");
    assert_eq!(products[1].title, "hyper.tif - Ch2");
    assert_eq!(
        products[1].stack.labels(),
        vec!["hyper.tif:2", "hyper.tif:4", "hyper.tif:6"]
    );
    for (c, product) in products.iter().enumerate() {
        assert_eq!(product.stack.len(), 3);
        assert_eq!(product.stack.color_table(), ColorTable::primary(c).as_ref());
    }
}

#[test]
fn test_unsplit_hyperstack_keeps_plane_order() {
    let dir = TempDir::new("unsplit");
    let path = dir.write("hyper.tif", &hyperstack(2, 2).build());
    let mut harness = Harness::new();

    harness
        .run(&mut prompt_with(|o| o.split_windows = Some(false)), &path)
        .unwrap();
    let product = &harness.display.products[0];
    assert_eq!(product.title, "hyper.tif");
    assert_eq!(product.stack.len(), 4);
    assert!(product.stack.color_table().is_none());
}

#[test]
fn test_merge_channels_builds_rgb_planes() {
    let dir = TempDir::new("merge");
    let path = dir.write("merge.tif", &hyperstack(3, 2).build());
    let mut harness = Harness::new();

    harness
        .run(&mut prompt_with(|o| o.merge_channels = Some(true)), &path)
        .unwrap();
    assert_eq!(harness.display.products.len(), 1);

    let product = &harness.display.products[0];
    assert_eq!(product.title, "merge.tif");
    match &product.stack {
        TypedStack::Rgb(stack) => {
            assert_eq!(stack.len(), 2);
            assert_eq!(stack.slice(1).unwrap().pixels, vec![pack_rgb(0, 10, 20)]);
            assert_eq!(stack.slice(2).unwrap().pixels, vec![pack_rgb(30, 40, 50)]);
        }
        other => panic!("expected RGB stack, got {}", other.kind_name()),
    }
}

#[test]
fn test_png_imports_as_rgb() {
    let dir = TempDir::new("png");
    let path = dir.write("photo.png", &create_test_png(4, 3));
    let mut harness = Harness::new();

    harness
        .run(&mut prompt_with(|o| o.split_windows = Some(false)), &path)
        .unwrap();
    let product = &harness.display.products[0];
    assert_eq!(product.title, "photo.png");
    assert_eq!(product.stack.kind_name(), "RGB");
    assert_eq!((product.stack.width(), product.stack.height()), (4, 3));
}

// =============================================================================
// Calibration and metadata
// =============================================================================

#[test]
fn test_calibration_from_imagej_units() {
    let dir = TempDir::new("calibration");
    let page = PageBuilder::gray8(1, 1, vec![0])
        .with_description("ImageJ=1.54f\nimages=2\nslices=2\nunit=micron\nspacing=0.5\n")
        .with_resolution(4, 1);
    let bytes = TiffBuilder::new()
        .add_page(page)
        .add_page(PageBuilder::gray8(1, 1, vec![1]))
        .build();
    let path = dir.write("cal.tif", &bytes);
    let mut harness = Harness::new();

    harness.run(&mut prompt_with(|_| {}), &path).unwrap();
    let calibration = harness.display.products[0].calibration.as_ref().unwrap();
    assert_eq!(calibration.pixel_width, Some(0.25));
    assert_eq!(calibration.pixel_height, Some(0.25));
    assert_eq!(calibration.pixel_depth, Some(0.5));
    assert_eq!(calibration.unit, "micron");
}

#[test]
fn test_metadata_table_is_shown() {
    let dir = TempDir::new("metadata");
    let path = dir.write("meta.tif", &gray8_stack(3, 2, 2, |_| 0));
    let mut harness = Harness::new();

    harness
        .run(&mut prompt_with(|o| o.show_metadata = Some(true)), &path)
        .unwrap();
    let (title, table) = &harness.metadata.tables[0];
    assert_eq!(title, &format!("{} Metadata", path.display()));
    assert_eq!(table.get("SizeX"), Some("3"));
    assert_eq!(table.get("SizeZ"), Some("2"));
    assert!(harness.status.texts.contains(&"Populating metadata".to_string()));
}

// =============================================================================
// Preferences and export
// =============================================================================

#[test]
fn test_preferences_written_only_after_success() {
    let dir = TempDir::new("prefs");
    let prefs_path = dir.path().join("prefs").join("import.json");
    let mut preferences = JsonPreferences::load(&prefs_path).unwrap();
    let mut prompt = prompt_with(|o| o.colorize = Some(true));
    let mut harness = Harness::new();

    let failed = harness.run_with(&mut prompt, &mut preferences, &dir.path().join("absent.tif"), true);
    assert!(failed.is_err());
    assert!(!prefs_path.exists());

    let path = dir.write("ok.tif", &gray8_stack(1, 1, 1, |_| 0));
    harness
        .run_with(&mut prompt, &mut preferences, &path, false)
        .unwrap();
    assert!(prefs_path.exists());

    let reloaded = JsonPreferences::load(&prefs_path).unwrap();
    assert!(reloaded.get_bool(COLORIZE_KEY, false));
}

#[test]
fn test_exporter_writes_png_slices() {
    let dir = TempDir::new("export");
    let path = dir.write("stack.tif", &gray8_stack(2, 2, 2, |i| i as u8));
    let output = dir.path().join("out");

    let mut display = StackExporter::new(Some(output.clone()));
    let mut prompt = prompt_with(|_| {});
    let mut metadata = RecordingMetadata::default();
    let mut preferences = MemoryPreferences::default();
    let mut status = RecordingStatus::default();
    let mut errors = RecordingReporter::default();
    let mut io = Collaborators {
        prompt: &mut prompt,
        display: &mut display,
        metadata: &mut metadata,
        preferences: &mut preferences,
        status: &mut status,
        errors: &mut errors,
    };

    Importer::new(FileSource::default()).run(&path, &mut io).unwrap();
    assert_eq!((display.shown(), display.written(), display.failures()), (1, 2, 0));
    assert!(output.join("stack.tif_-_Ch1-001.png").exists());
    assert!(output.join("stack.tif_-_Ch1-002.png").exists());
}
