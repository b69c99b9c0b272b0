//! Strip and tile decompression for the lossless TIFF codecs.
//!
//! JPEG-compressed chunks go through [`crate::format::jpeg`] instead.

use weezl::decode::Decoder;
use weezl::{BitOrder, LzwStatus};

use crate::error::TiffError;

use super::parser::ByteOrder;

// =============================================================================
// PackBits
// =============================================================================

/// Decode a PackBits run-length encoded chunk.
///
/// Header byte `n`: `0..=127` copies the next `n + 1` bytes literally,
/// `-127..=-1` repeats the next byte `1 - n` times, `-128` is a no-op.
pub fn unpack_bits(data: &[u8], expected_len: usize) -> Result<Vec<u8>, TiffError> {
    let mut out = Vec::with_capacity(expected_len);
    let mut pos = 0;

    while pos < data.len() && out.len() < expected_len {
        let header = data[pos] as i8;
        pos += 1;

        match header {
            0..=127 => {
                let count = header as usize + 1;
                let end = pos + count;
                if end > data.len() {
                    return Err(TiffError::Decompression(format!(
                        "PackBits literal run of {} bytes overruns input at {}",
                        count, pos
                    )));
                }
                out.extend_from_slice(&data[pos..end]);
                pos = end;
            }
            -128 => {}
            _ => {
                let count = (1 - header as isize) as usize;
                let value = *data.get(pos).ok_or_else(|| {
                    TiffError::Decompression("PackBits repeat run missing its value".to_string())
                })?;
                pos += 1;
                out.extend(std::iter::repeat(value).take(count));
            }
        }
    }

    Ok(out)
}

// =============================================================================
// LZW
// =============================================================================

/// Decode a TIFF LZW chunk (MSB-first codes, early code-width change).
///
/// Decoding stops at the end-of-information code, at the end of the input or
/// once `expected_len` bytes are produced, whichever comes first.
pub fn lzw_decode(data: &[u8], expected_len: usize) -> Result<Vec<u8>, TiffError> {
    let mut decoder = Decoder::with_tiff_size_switch(BitOrder::Msb, 8);
    let mut out = vec![0u8; expected_len];
    let (mut read, mut written) = (0, 0);

    while written < expected_len {
        let result = decoder.decode_bytes(&data[read..], &mut out[written..]);
        read += result.consumed_in;
        written += result.consumed_out;
        match result.status {
            Ok(LzwStatus::Ok) => {}
            Ok(LzwStatus::Done | LzwStatus::NoProgress) => break,
            Err(e) => {
                return Err(TiffError::Decompression(format!(
                    "LZW stream invalid after {} input bytes: {}",
                    read, e
                )))
            }
        }
    }

    out.truncate(written);
    Ok(out)
}

// =============================================================================
// Predictor
// =============================================================================

/// Undo horizontal differencing (Predictor = 2) in place.
///
/// # Arguments
/// * `data` - Decompressed chunk, row-major
/// * `row_samples` - Samples per row (width * samples per pixel for chunky data)
/// * `samples_per_pixel` - Distance in samples between predicted values
/// * `bytes_per_sample` - 1, 2, 4 or 8
pub fn undo_horizontal_predictor(
    data: &mut [u8],
    row_samples: usize,
    samples_per_pixel: usize,
    bytes_per_sample: usize,
    byte_order: ByteOrder,
) -> Result<(), TiffError> {
    let row_bytes = row_samples * bytes_per_sample;
    if row_bytes == 0 {
        return Ok(());
    }

    for row in data.chunks_mut(row_bytes) {
        let samples = row.len() / bytes_per_sample;
        for i in samples_per_pixel..samples {
            let cur = i * bytes_per_sample;
            let prev = (i - samples_per_pixel) * bytes_per_sample;
            match bytes_per_sample {
                1 => row[cur] = row[cur].wrapping_add(row[prev]),
                2 => {
                    let v = byte_order
                        .read_u16(&row[cur..])
                        .wrapping_add(byte_order.read_u16(&row[prev..]));
                    row[cur..cur + 2].copy_from_slice(&byte_order.u16_bytes(v));
                }
                4 => {
                    let v = byte_order
                        .read_u32(&row[cur..])
                        .wrapping_add(byte_order.read_u32(&row[prev..]));
                    row[cur..cur + 4].copy_from_slice(&byte_order.u32_bytes(v));
                }
                8 => {
                    let v = byte_order
                        .read_u64(&row[cur..])
                        .wrapping_add(byte_order.read_u64(&row[prev..]));
                    row[cur..cur + 8].copy_from_slice(&byte_order.u64_bytes(v));
                }
                other => {
                    return Err(TiffError::UnsupportedLayout(format!(
                        "horizontal predictor with {}-byte samples",
                        other
                    )))
                }
            }
        }
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
