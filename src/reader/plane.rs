//! Decoded plane buffers.

use crate::error::ReaderError;

// =============================================================================
// Samples
// =============================================================================

/// Sample kind of a decoded plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Byte,
    UShort,
    Float,
    Other,
}

/// Band-interleaved sample buffer.
///
/// Unsigned 8-bit and 16-bit data and 32-bit floats keep their native kind;
/// every other pixel type (signed integers, 32-bit integers, doubles) is
/// widened to `Other`.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    Byte(Vec<u8>),
    UShort(Vec<u16>),
    Float(Vec<f32>),
    Other(Vec<f64>),
}

impl Samples {
    pub fn kind(&self) -> SampleKind {
        match self {
            Samples::Byte(_) => SampleKind::Byte,
            Samples::UShort(_) => SampleKind::UShort,
            Samples::Float(_) => SampleKind::Float,
            Samples::Other(_) => SampleKind::Other,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Samples::Byte(v) => v.len(),
            Samples::UShort(v) => v.len(),
            Samples::Float(v) => v.len(),
            Samples::Other(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at `i` widened to f64.
    pub fn get_f64(&self, i: usize) -> Option<f64> {
        match self {
            Samples::Byte(v) => v.get(i).map(|s| *s as f64),
            Samples::UShort(v) => v.get(i).map(|s| *s as f64),
            Samples::Float(v) => v.get(i).map(|s| *s as f64),
            Samples::Other(v) => v.get(i).copied(),
        }
    }

    /// An all-zero buffer of the same kind.
    pub fn zeroed(kind: SampleKind, len: usize) -> Samples {
        match kind {
            SampleKind::Byte => Samples::Byte(vec![0; len]),
            SampleKind::UShort => Samples::UShort(vec![0; len]),
            SampleKind::Float => Samples::Float(vec![0.0; len]),
            SampleKind::Other => Samples::Other(vec![0.0; len]),
        }
    }

    /// Every `stride`-th sample starting at `offset`.
    fn strided(&self, offset: usize, stride: usize) -> Samples {
        fn pick<T: Copy>(v: &[T], offset: usize, stride: usize) -> Vec<T> {
            v.iter().skip(offset).step_by(stride.max(1)).copied().collect()
        }
        match self {
            Samples::Byte(v) => Samples::Byte(pick(v, offset, stride)),
            Samples::UShort(v) => Samples::UShort(pick(v, offset, stride)),
            Samples::Float(v) => Samples::Float(pick(v, offset, stride)),
            Samples::Other(v) => Samples::Other(pick(v, offset, stride)),
        }
    }

    /// Copy `len` samples starting at `from` into `dest` at `to`.
    ///
    /// Both buffers must share a kind; out-of-range spans are clipped.
    pub fn copy_span(&self, from: usize, dest: &mut Samples, to: usize, len: usize) {
        fn copy<T: Copy>(src: &[T], from: usize, dst: &mut [T], to: usize, len: usize) {
            let from = from.min(src.len());
            let to = to.min(dst.len());
            let len = len
                .min(src.len().saturating_sub(from))
                .min(dst.len().saturating_sub(to));
            dst[to..to + len].copy_from_slice(&src[from..from + len]);
        }
        match (self, dest) {
            (Samples::Byte(s), Samples::Byte(d)) => copy(s, from, d, to, len),
            (Samples::UShort(s), Samples::UShort(d)) => copy(s, from, d, to, len),
            (Samples::Float(s), Samples::Float(d)) => copy(s, from, d, to, len),
            (Samples::Other(s), Samples::Other(d)) => copy(s, from, d, to, len),
            _ => {}
        }
    }
}

// =============================================================================
// DecodedPlane
// =============================================================================

/// One decoded plane: `width x height` pixels of `bands` interleaved samples.
///
/// The buffer may hold more samples than `width * height * bands` when the
/// decoder returns whole strips; consumers only read the leading samples.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPlane {
    pub width: usize,
    pub height: usize,
    pub bands: usize,
    pub samples: Samples,
}

impl DecodedPlane {
    pub fn new(width: usize, height: usize, bands: usize, samples: Samples) -> Self {
        Self {
            width,
            height,
            bands: bands.max(1),
            samples,
        }
    }

    pub fn kind(&self) -> SampleKind {
        self.samples.kind()
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Extract one band as a single-band plane.
    pub fn band(&self, band: usize) -> Result<DecodedPlane, ReaderError> {
        if band >= self.bands {
            return Err(ReaderError::PlaneMismatch(format!(
                "band {} requested from a {}-band plane",
                band, self.bands
            )));
        }
        if self.bands == 1 {
            return Ok(self.clone());
        }
        Ok(DecodedPlane::new(
            self.width,
            self.height,
            1,
            self.samples.strided(band, self.bands),
        ))
    }

    /// Interleave single-band planes of one geometry and kind into one plane.
    ///
    /// # Errors
    /// * `ReaderError::PlaneMismatch` - Empty input, or planes disagree on
    ///   size, band count or sample kind
    pub fn interleave(planes: &[DecodedPlane]) -> Result<DecodedPlane, ReaderError> {
        let first = planes
            .first()
            .ok_or_else(|| ReaderError::PlaneMismatch("no planes to interleave".to_string()))?;

        for plane in planes {
            if plane.width != first.width
                || plane.height != first.height
                || plane.bands != 1
                || plane.kind() != first.kind()
            {
                return Err(ReaderError::PlaneMismatch(format!(
                    "cannot interleave {}x{}x{} {:?} with {}x{}x{} {:?}",
                    first.width,
                    first.height,
                    first.bands,
                    first.kind(),
                    plane.width,
                    plane.height,
                    plane.bands,
                    plane.kind()
                )));
            }
        }

        let bands = planes.len();
        let pixels = first.pixel_count();
        let mut out = Samples::zeroed(first.kind(), pixels * bands);
        for (b, plane) in planes.iter().enumerate() {
            for p in 0..pixels {
                plane.samples.copy_span(p, &mut out, p * bands + b, 1);
            }
        }

        Ok(DecodedPlane::new(first.width, first.height, bands, out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_extraction() {
        let plane = DecodedPlane::new(2, 1, 3, Samples::Byte(vec![1, 2, 3, 4, 5, 6]));
        assert_eq!(plane.band(0).unwrap().samples, Samples::Byte(vec![1, 4]));
        assert_eq!(plane.band(2).unwrap().samples, Samples::Byte(vec![3, 6]));
        assert!(matches!(plane.band(3), Err(ReaderError::PlaneMismatch(_))));
    }

    #[test]
    fn test_interleave() {
        let r = DecodedPlane::new(2, 1, 1, Samples::UShort(vec![10, 11]));
        let g = DecodedPlane::new(2, 1, 1, Samples::UShort(vec![20, 21]));
        let merged = DecodedPlane::interleave(&[r, g]).unwrap();

        assert_eq!(merged.bands, 2);
        assert_eq!(merged.samples, Samples::UShort(vec![10, 20, 11, 21]));
    }

    #[test]
    fn test_interleave_rejects_mixed_kinds() {
        let a = DecodedPlane::new(1, 1, 1, Samples::Byte(vec![1]));
        let b = DecodedPlane::new(1, 1, 1, Samples::Float(vec![1.0]));
        assert!(matches!(
            DecodedPlane::interleave(&[a, b]),
            Err(ReaderError::PlaneMismatch(_))
        ));
        assert!(DecodedPlane::interleave(&[]).is_err());
    }

    #[test]
    fn test_copy_span_clips() {
        let src = Samples::Byte(vec![1, 2, 3]);
        let mut dst = Samples::zeroed(SampleKind::Byte, 4);
        src.copy_span(1, &mut dst, 2, 10);
        assert_eq!(dst, Samples::Byte(vec![0, 0, 2, 3]));

        src.copy_span(5, &mut dst, 0, 2);
        src.copy_span(0, &mut dst, 9, 2);
        assert_eq!(dst, Samples::Byte(vec![0, 0, 2, 3]));
    }
}
