//! Display that writes every slice of every product as a PNG file.

use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Luma, RgbImage};
use tracing::{debug, error, info};

use crate::error::ExportError;
use crate::import::{Display, ImageProduct};
use crate::stack::{
    float_to_byte, scale_linear, short_to_byte, unpack_rgb, value_range, ColorTable, Slice,
    TypedStack,
};

/// Logs each product and, when an output directory is set, exports it.
///
/// Failures are logged and counted; they never abort the import.
#[derive(Debug, Default)]
pub struct StackExporter {
    output: Option<PathBuf>,
    shown: usize,
    written: usize,
    failures: usize,
}

impl StackExporter {
    pub fn new(output: Option<PathBuf>) -> Self {
        Self {
            output,
            ..Self::default()
        }
    }

    /// Products received so far.
    pub fn shown(&self) -> usize {
        self.shown
    }

    /// PNG files written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Products that could not be exported.
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Write one PNG per slice of `product` into `dir`.
    ///
    /// Files are named after the product title and the 1-based slice number.
    ///
    /// # Errors
    /// * `ExportError::Buffer` - A slice does not fill the stack geometry
    /// * `ExportError::Write` - The directory or a file cannot be written
    pub fn export(product: &ImageProduct, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
        fs::create_dir_all(dir).map_err(|e| ExportError::Write {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;

        let stem = file_stem(&product.title);
        let mut paths = Vec::with_capacity(product.stack.len());
        for (i, image) in slice_images(&product.stack)?.into_iter().enumerate() {
            let path = dir.join(format!("{}-{:03}.png", stem, i + 1));
            image
                .save_with_format(&path, ImageFormat::Png)
                .map_err(|e| ExportError::Write {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
            debug!(path = %path.display(), "Wrote slice");
            paths.push(path);
        }
        Ok(paths)
    }
}

impl Display for StackExporter {
    fn show(&mut self, product: ImageProduct) {
        self.shown += 1;
        info!(
            title = %product.title,
            kind = product.stack.kind_name(),
            width = product.stack.width(),
            height = product.stack.height(),
            slices = product.stack.len(),
            calibrated = product.calibration.is_some(),
            "Image ready"
        );

        let Some(dir) = &self.output else {
            return;
        };
        match Self::export(&product, dir) {
            Ok(paths) => self.written += paths.len(),
            Err(e) => {
                error!(title = %product.title, error = %e, "Export failed");
                self.failures += 1;
            }
        }
    }
}

/// Title reduced to characters safe in a file name.
fn file_stem(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        "image".to_string()
    } else {
        stem.to_string()
    }
}

// =============================================================================
// Slice rendering
// =============================================================================

/// Render every slice of `stack`.
///
/// Byte, short and float slices with a color table are rendered as RGB
/// through the table. Other short and float slices become 16-bit gray, floats
/// scaled over the range of the whole stack.
fn slice_images(stack: &TypedStack) -> Result<Vec<DynamicImage>, ExportError> {
    let (w, h) = (stack.width(), stack.height());
    let table = stack.color_table();

    match stack {
        TypedStack::Byte(s) => s
            .slices()
            .iter()
            .map(|slice| match table {
                Some(table) => tinted(slice, table, &slice.pixels, w, h),
                None => fit(slice, w, h, GrayImage::from_raw(w as u32, h as u32, slice.pixels.clone()))
                    .map(DynamicImage::ImageLuma8),
            })
            .collect(),
        TypedStack::Short(s) => s
            .slices()
            .iter()
            .map(|slice| match table {
                Some(table) => tinted(slice, table, &short_to_byte(&slice.pixels), w, h),
                None => gray16(slice, slice.pixels.clone(), w, h),
            })
            .collect(),
        TypedStack::Float(s) => {
            let (min, max) = value_range(
                s.slices()
                    .iter()
                    .flat_map(|slice| slice.pixels.iter().map(|&p| f64::from(p))),
            )
            .unwrap_or((0.0, 0.0));
            s.slices()
                .iter()
                .map(|slice| match table {
                    Some(table) => tinted(slice, table, &float_to_byte(&slice.pixels), w, h),
                    None => {
                        let levels = slice
                            .pixels
                            .iter()
                            .map(|&p| scale_linear(f64::from(p), min, max, 65535.0) as u16)
                            .collect();
                        gray16(slice, levels, w, h)
                    }
                })
                .collect()
        }
        TypedStack::Rgb(s) => s
            .slices()
            .iter()
            .map(|slice| {
                let bytes = slice
                    .pixels
                    .iter()
                    .flat_map(|&p| {
                        let (r, g, b) = unpack_rgb(p);
                        [r, g, b]
                    })
                    .collect();
                fit(slice, w, h, RgbImage::from_raw(w as u32, h as u32, bytes)).map(DynamicImage::ImageRgb8)
            })
            .collect(),
    }
}

fn tinted<T>(slice: &Slice<T>, table: &ColorTable, levels: &[u8], w: usize, h: usize) -> Result<DynamicImage, ExportError> {
    let bytes = levels
        .iter()
        .flat_map(|&v| {
            let (r, g, b) = table.lookup(v);
            [r, g, b]
        })
        .collect();
    fit(slice, w, h, RgbImage::from_raw(w as u32, h as u32, bytes)).map(DynamicImage::ImageRgb8)
}

fn gray16<T>(slice: &Slice<T>, pixels: Vec<u16>, w: usize, h: usize) -> Result<DynamicImage, ExportError> {
    let buffer = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels);
    fit(slice, w, h, buffer).map(DynamicImage::ImageLuma16)
}

fn fit<T, I>(slice: &Slice<T>, width: usize, height: usize, image: Option<I>) -> Result<I, ExportError> {
    image.ok_or_else(|| ExportError::Buffer {
        label: slice.label.clone(),
        width,
        height,
    })
}
