//! Multi-file sources: numbered files stitched along T.

use stack_importer::reader::{ChainOptions, DecoderChain, FormatReader, Samples};
use stack_importer::{FileSource, ImportError, SourceOpener, TypedStack};

use super::test_utils::{gray8_stack, prompt_with, Harness, TempDir};

/// Files `t1.tif`..`t<n>.tif`, each a 2-page stack filled with `10 * file + page`.
fn numbered_files(dir: &TempDir, files: usize) {
    for f in 1..=files {
        dir.write(
            &format!("t{}.tif", f),
            &gray8_stack(1, 1, 2, |page| (10 * f + page) as u8),
        );
    }
}

#[test]
fn test_stitched_chain_concatenates_along_t() {
    let dir = TempDir::new("stitch-chain");
    numbered_files(&dir, 3);
    dir.write("unrelated.tif", &gray8_stack(1, 1, 1, |_| 0));

    let source = FileSource::default();
    let path = dir.path().join("t2.tif");
    let base = source.open(&path).unwrap();
    let options = ChainOptions {
        stitch_files: true,
        ..ChainOptions::default()
    };
    let mut chain = DecoderChain::build(&source, base, &path, options).unwrap();

    let core = chain.reader().core();
    assert_eq!((core.size_z, core.size_t, core.image_count), (2, 3, 6));

    // Plane 4 is z=0 of the third file.
    assert_eq!(
        chain.reader_mut().open_plane(4).unwrap().samples,
        Samples::Byte(vec![30])
    );
    chain.close().unwrap();
}

#[test]
fn test_import_with_and_without_stitching() {
    let dir = TempDir::new("stitch-import");
    numbered_files(&dir, 2);
    let path = dir.path().join("t1.tif");

    let mut harness = Harness::new();
    harness.run(&mut prompt_with(|_| {}), &path).unwrap();
    assert_eq!(harness.display.products[0].stack.len(), 2);

    let mut harness = Harness::new();
    harness
        .run(
            &mut prompt_with(|o| {
                o.stitch_files = Some(true);
                o.split_windows = Some(false);
            }),
            &path,
        )
        .unwrap();
    let product = &harness.display.products[0];
    assert_eq!(product.stack.len(), 4);
    match &product.stack {
        TypedStack::Byte(stack) => {
            let values: Vec<u8> = stack.slices().iter().map(|s| s.pixels[0]).collect();
            assert_eq!(values, vec![10, 11, 20, 21]);
        }
        other => panic!("expected 8-bit stack, got {}", other.kind_name()),
    }
}

#[test]
fn test_incompatible_sibling_fails_import() {
    let dir = TempDir::new("stitch-mismatch");
    dir.write("t1.tif", &gray8_stack(1, 1, 2, |_| 0));
    dir.write("t2.tif", &gray8_stack(2, 2, 2, |_| 0));
    let mut harness = Harness::new();

    let result = harness.run(
        &mut prompt_with(|o| o.stitch_files = Some(true)),
        &dir.path().join("t1.tif"),
    );
    assert!(matches!(result, Err(ImportError::DecodeFailure(_))));
    assert!(harness.display.products.is_empty());
}
