//! Labelled slice stacks of one sample kind.
//!
//! A [`Stack`] holds equally sized slices addressed by 1-based slice
//! numbers. [`TypedStack`] is the tagged union over the four kinds a decoded
//! series can be assembled into; the `Rgb` kind stores packed `0x00RRGGBB`
//! pixels and is what planes without a dedicated kind are rendered into.

use crate::error::StackError;

// =============================================================================
// Color Tables
// =============================================================================

/// 256-entry lookup table mapping gray levels to display colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    pub red: [u8; 256],
    pub green: [u8; 256],
    pub blue: [u8; 256],
}

impl ColorTable {
    /// Pure red, green or blue ramp for channel 0, 1 or 2.
    ///
    /// Returns `None` for any other channel.
    pub fn primary(channel: usize) -> Option<Self> {
        if channel > 2 {
            return None;
        }
        let mut table = ColorTable {
            red: [0; 256],
            green: [0; 256],
            blue: [0; 256],
        };
        let ramp = match channel {
            0 => &mut table.red,
            1 => &mut table.green,
            _ => &mut table.blue,
        };
        for (level, entry) in ramp.iter_mut().enumerate() {
            *entry = level as u8;
        }
        Some(table)
    }

    /// Display color of `level` as `(r, g, b)`.
    pub fn lookup(&self, level: u8) -> (u8, u8, u8) {
        let i = level as usize;
        (self.red[i], self.green[i], self.blue[i])
    }
}

// =============================================================================
// Stack
// =============================================================================

/// One labelled slice.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice<T> {
    pub label: String,
    pub pixels: Vec<T>,
}

/// Ordered slices of a fixed width and height.
#[derive(Debug, Clone, PartialEq)]
pub struct Stack<T> {
    width: usize,
    height: usize,
    slices: Vec<Slice<T>>,
    color_table: Option<ColorTable>,
}

impl<T: Clone> Stack<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            slices: Vec::new(),
            color_table: None,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn slices(&self) -> &[Slice<T>] {
        &self.slices
    }

    pub fn color_table(&self) -> Option<&ColorTable> {
        self.color_table.as_ref()
    }

    pub fn set_color_table(&mut self, table: Option<ColorTable>) {
        self.color_table = table;
    }

    /// Verify that a `width` x `height` slice fits this stack.
    ///
    /// # Errors
    /// * `StackError::DimensionMismatch` - The geometry differs
    pub fn check_size(&self, width: usize, height: usize) -> Result<(), StackError> {
        if width != self.width || height != self.height {
            return Err(StackError::DimensionMismatch {
                width: self.width,
                height: self.height,
                actual_width: width,
                actual_height: height,
            });
        }
        Ok(())
    }

    /// Append a slice.
    ///
    /// # Errors
    /// * `StackError::SampleCount` - `pixels` is not exactly width x height long
    pub fn add_slice(&mut self, label: impl Into<String>, pixels: Vec<T>) -> Result<(), StackError> {
        let expected = self.width * self.height;
        if pixels.len() != expected {
            return Err(StackError::SampleCount {
                expected,
                actual: pixels.len(),
            });
        }
        self.slices.push(Slice {
            label: label.into(),
            pixels,
        });
        Ok(())
    }

    /// Slice number `n`, counted from 1.
    ///
    /// # Errors
    /// * `StackError::SliceOutOfRange` - `n` is 0 or past the last slice
    pub fn slice(&self, n: usize) -> Result<&Slice<T>, StackError> {
        n.checked_sub(1)
            .and_then(|i| self.slices.get(i))
            .ok_or(StackError::SliceOutOfRange {
                slice: n,
                len: self.slices.len(),
            })
    }

    /// New stack holding copies of the given 1-based slices, in order.
    fn select(&self, numbers: &[usize]) -> Result<Stack<T>, StackError> {
        let mut out = Stack::new(self.width, self.height);
        for &n in numbers {
            out.slices.push(self.slice(n)?.clone());
        }
        Ok(out)
    }
}

// =============================================================================
// TypedStack
// =============================================================================

/// A stack of one of the four assembled sample kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedStack {
    Byte(Stack<u8>),
    Short(Stack<u16>),
    Float(Stack<f32>),
    Rgb(Stack<u32>),
}

macro_rules! each_stack {
    ($value:expr, $stack:ident => $body:expr) => {
        match $value {
            TypedStack::Byte($stack) => $body,
            TypedStack::Short($stack) => $body,
            TypedStack::Float($stack) => $body,
            TypedStack::Rgb($stack) => $body,
        }
    };
}

impl TypedStack {
    /// Short name of the sample kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            TypedStack::Byte(_) => "8-bit",
            TypedStack::Short(_) => "16-bit",
            TypedStack::Float(_) => "32-bit",
            TypedStack::Rgb(_) => "RGB",
        }
    }

    pub fn len(&self) -> usize {
        each_stack!(self, s => s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn width(&self) -> usize {
        each_stack!(self, s => s.width())
    }

    pub fn height(&self) -> usize {
        each_stack!(self, s => s.height())
    }

    /// Label of 1-based slice `n`.
    pub fn label(&self, n: usize) -> Result<&str, StackError> {
        each_stack!(self, s => s.slice(n).map(|slice| slice.label.as_str()))
    }

    /// All slice labels in order.
    pub fn labels(&self) -> Vec<&str> {
        each_stack!(self, s => s.slices().iter().map(|slice| slice.label.as_str()).collect())
    }

    pub fn color_table(&self) -> Option<&ColorTable> {
        each_stack!(self, s => s.color_table())
    }

    pub fn set_color_table(&mut self, table: Option<ColorTable>) {
        each_stack!(self, s => s.set_color_table(table))
    }

    /// Sub-stack of the given 1-based slices, in the given order.
    ///
    /// # Errors
    /// * `StackError::SliceOutOfRange` - A slice number is outside the stack
    pub fn select(&self, numbers: &[usize]) -> Result<TypedStack, StackError> {
        Ok(match self {
            TypedStack::Byte(s) => TypedStack::Byte(s.select(numbers)?),
            TypedStack::Short(s) => TypedStack::Short(s.select(numbers)?),
            TypedStack::Float(s) => TypedStack::Float(s.select(numbers)?),
            TypedStack::Rgb(s) => TypedStack::Rgb(s.select(numbers)?),
        })
    }

    /// Slice `n` converted to 8-bit gray.
    ///
    /// Byte slices are copied; 16-bit and float slices are scaled from their
    /// own minimum and maximum to 0..255; RGB slices become `(r + g + b) / 3`.
    ///
    /// # Errors
    /// * `StackError::SliceOutOfRange` - `n` is outside the stack
    pub fn byte_slice(&self, n: usize) -> Result<Vec<u8>, StackError> {
        Ok(match self {
            TypedStack::Byte(s) => s.slice(n)?.pixels.clone(),
            TypedStack::Short(s) => short_to_byte(&s.slice(n)?.pixels),
            TypedStack::Float(s) => float_to_byte(&s.slice(n)?.pixels),
            TypedStack::Rgb(s) => rgb_to_byte(&s.slice(n)?.pixels),
        })
    }
}

// =============================================================================
// Sample Conversion
// =============================================================================

/// Minimum and maximum of the finite values, if any.
pub(crate) fn value_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |range, v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Map `value` linearly from `[min, max]` to `[0, top]`, rounded and clamped.
///
/// A degenerate range maps everything to 0.
pub(crate) fn scale_linear(value: f64, min: f64, max: f64, top: f64) -> f64 {
    if max <= min {
        return 0.0;
    }
    ((value - min) / (max - min) * top).round().clamp(0.0, top)
}

fn scale_all<T: Copy + Into<f64>>(pixels: &[T], top: f64) -> Vec<f64> {
    let (min, max) = value_range(pixels.iter().map(|&p| p.into())).unwrap_or((0.0, 0.0));
    pixels
        .iter()
        .map(|&p| scale_linear(p.into(), min, max, top))
        .collect()
}

pub fn short_to_byte(pixels: &[u16]) -> Vec<u8> {
    scale_all(pixels, 255.0).into_iter().map(|v| v as u8).collect()
}

pub fn float_to_byte(pixels: &[f32]) -> Vec<u8> {
    scale_all(pixels, 255.0).into_iter().map(|v| v as u8).collect()
}

pub fn float_to_short(pixels: &[f32]) -> Vec<u16> {
    scale_all(pixels, 65535.0).into_iter().map(|v| v as u16).collect()
}

pub fn rgb_to_byte(pixels: &[u32]) -> Vec<u8> {
    pixels
        .iter()
        .map(|&p| {
            let (r, g, b) = unpack_rgb(p);
            ((r as u16 + g as u16 + b as u16) / 3) as u8
        })
        .collect()
}

pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    (r as u32) << 16 | (g as u32) << 8 | b as u32
}

pub fn unpack_rgb(pixel: u32) -> (u8, u8, u8) {
    ((pixel >> 16) as u8, (pixel >> 8) as u8, pixel as u8)
}
