//! Accumulating the extracted planes of one series into typed stacks.

use crate::error::StackError;

use super::decode::{ExtractedPlane, PlanePixels};
use super::typed::{float_to_byte, float_to_short, Stack, TypedStack};

/// Collects the planes of one series into byte, 16-bit, float and RGB stacks.
///
/// Each stack is created by the first plane of its kind. A float plane
/// arriving while a byte stack exists is scaled into the byte stack instead,
/// or into the 16-bit stack when only that one exists; either way the float
/// stack is abandoned.
#[derive(Debug)]
pub struct StackAssembler {
    image_name: String,
    byte: Option<Stack<u8>>,
    short: Option<Stack<u16>>,
    float: Option<Stack<f32>>,
    rgb: Option<Stack<u32>>,
}

impl StackAssembler {
    pub fn new(image_name: impl Into<String>) -> Self {
        Self {
            image_name: image_name.into(),
            byte: None,
            short: None,
            float: None,
            rgb: None,
        }
    }

    /// Append plane `no` (0-based), labelled `"<image name>:<no + 1>"`.
    ///
    /// # Errors
    /// * `StackError::DimensionMismatch` - The plane differs in size from its stack
    /// * `StackError::SampleCount` - The buffer does not cover the plane
    pub fn add(&mut self, no: usize, plane: ExtractedPlane) -> Result<(), StackError> {
        let label = format!("{}:{}", self.image_name, no + 1);
        let (width, height) = (plane.width, plane.height);

        match plane.pixels {
            PlanePixels::Byte(pixels) => append(&mut self.byte, width, height, label, pixels),
            PlanePixels::Short(pixels) => append(&mut self.short, width, height, label, pixels),
            PlanePixels::Rgb(pixels) => append(&mut self.rgb, width, height, label, pixels),
            PlanePixels::Float(pixels) => {
                if self.byte.is_some() {
                    self.float = None;
                    append(&mut self.byte, width, height, label, float_to_byte(&pixels))
                } else if self.short.is_some() {
                    self.float = None;
                    append(&mut self.short, width, height, label, float_to_short(&pixels))
                } else {
                    append(&mut self.float, width, height, label, pixels)
                }
            }
        }
    }

    /// The non-empty stacks, in byte, 16-bit, float, RGB order.
    pub fn finish(self) -> Vec<TypedStack> {
        let stacks = [
            self.byte.map(TypedStack::Byte),
            self.short.map(TypedStack::Short),
            self.float.map(TypedStack::Float),
            self.rgb.map(TypedStack::Rgb),
        ];
        stacks
            .into_iter()
            .flatten()
            .filter(|stack| !stack.is_empty())
            .collect()
    }
}

fn append<T: Clone>(
    slot: &mut Option<Stack<T>>,
    width: usize,
    height: usize,
    label: String,
    pixels: Vec<T>,
) -> Result<(), StackError> {
    let stack = slot.get_or_insert_with(|| Stack::new(width, height));
    stack.check_size(width, height)?;
    stack.add_slice(label, pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane(pixels: PlanePixels) -> ExtractedPlane {
        ExtractedPlane {
            width: 2,
            height: 1,
            pixels,
        }
    }

    #[test]
    fn test_labels_use_one_based_plane_numbers() {
        let mut assembler = StackAssembler::new("cells.tif");
        assembler.add(0, plane(PlanePixels::Byte(vec![1, 2]))).unwrap();
        assembler.add(4, plane(PlanePixels::Byte(vec![3, 4]))).unwrap();

        let stacks = assembler.finish();
        assert_eq!(stacks.len(), 1);
        assert_eq!(stacks[0].labels(), vec!["cells.tif:1", "cells.tif:5"]);
    }

    #[test]
    fn test_float_joins_existing_byte_stack() {
        let mut assembler = StackAssembler::new("x");
        assembler.add(0, plane(PlanePixels::Float(vec![0.0, 1.0]))).unwrap();
        assembler.add(1, plane(PlanePixels::Byte(vec![7, 7]))).unwrap();
        assembler.add(2, plane(PlanePixels::Float(vec![2.0, 4.0]))).unwrap();

        let stacks = assembler.finish();
        assert_eq!(stacks.len(), 1);
        match &stacks[0] {
            TypedStack::Byte(stack) => {
                assert_eq!(stack.len(), 2);
                assert_eq!(stack.slice(2).unwrap().pixels, vec![0, 255]);
            }
            other => panic!("expected byte stack, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_float_joins_short_stack_without_byte_stack() {
        let mut assembler = StackAssembler::new("x");
        assembler.add(0, plane(PlanePixels::Short(vec![1, 2]))).unwrap();
        assembler.add(1, plane(PlanePixels::Float(vec![0.0, 1.0]))).unwrap();

        let stacks = assembler.finish();
        assert_eq!(stacks.len(), 1);
        assert!(matches!(&stacks[0], TypedStack::Short(s) if s.len() == 2));
    }

    #[test]
    fn test_float_stack_without_integer_stacks() {
        let mut assembler = StackAssembler::new("x");
        assembler.add(0, plane(PlanePixels::Float(vec![0.5, 1.5]))).unwrap();
        assembler.add(1, plane(PlanePixels::Rgb(vec![0, 0xFFFFFF]))).unwrap();

        let kinds: Vec<_> = assembler.finish().iter().map(TypedStack::kind_name).collect();
        assert_eq!(kinds, vec!["32-bit", "RGB"]);
    }

    #[test]
    fn test_size_change_is_rejected() {
        let mut assembler = StackAssembler::new("x");
        assembler.add(0, plane(PlanePixels::Byte(vec![1, 2]))).unwrap();
        let other = ExtractedPlane {
            width: 1,
            height: 2,
            pixels: PlanePixels::Byte(vec![1, 2]),
        };
        assert!(matches!(
            assembler.add(1, other),
            Err(StackError::DimensionMismatch { .. })
        ));
    }
}
