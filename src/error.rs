use std::path::PathBuf;

use thiserror::Error;

/// I/O errors that can occur when reading from a byte source
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Error from the operating system while opening or reading a file
    #[error("Read error: {0}")]
    Read(String),

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// File not found
    #[error("File not found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for IoError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => IoError::NotFound(err.to_string()),
            _ => IoError::Read(err.to_string()),
        }
    }
}

/// Errors related to format detection and container decoding
#[derive(Debug, Clone, Error)]
pub enum FormatError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// TIFF parsing error
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),

    /// File format is not supported by any decoder
    #[error("Unsupported format: {reason}")]
    UnsupportedFormat { reason: String },

    /// Error reported by the raster codec (JPEG/PNG)
    #[error("Image codec error: {0}")]
    Codec(String),
}

/// Errors that can occur when parsing or decoding TIFF files
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside file or to invalid location)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// Required tag is missing from IFD
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    /// Tag has unexpected type or count
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// Unsupported compression scheme
    #[error("Unsupported compression: {0}")]
    UnsupportedCompression(String),

    /// Unsupported sample layout (bit depth, sample format, photometric)
    #[error("Unsupported sample layout: {0}")]
    UnsupportedLayout(String),

    /// Compressed strip or tile data could not be decoded
    #[error("Decompression failed: {0}")]
    Decompression(String),

    /// Unknown field type in IFD entry
    #[error("Unknown field type: {0}")]
    UnknownFieldType(u16),
}

/// Errors raised by format readers and the decorator layers around them
#[derive(Debug, Clone, Error)]
pub enum ReaderError {
    /// Error from the underlying container decoder
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Series index is outside `0..series_count`
    #[error("Series {series} out of range (source has {count} series)")]
    SeriesOutOfRange { series: usize, count: usize },

    /// Plane index is outside `0..image_count`
    #[error("Plane {plane} out of range (series has {count} planes)")]
    PlaneOutOfRange { plane: usize, count: usize },

    /// Z/C/T coordinates outside the series extents
    #[error("Invalid plane coordinates: z={z}, c={c}, t={t}")]
    InvalidCoordinates { z: usize, c: usize, t: usize },

    /// Decoded sample buffer is shorter than the plane geometry requires
    #[error("Truncated plane: expected at least {expected} samples, got {actual}")]
    TruncatedPlane { expected: usize, actual: usize },

    /// Planes that must be combined do not share geometry or sample kind
    #[error("Plane mismatch: {0}")]
    PlaneMismatch(String),

    /// Files that must be stitched do not share dimensions
    #[error("Incompatible files: {0}")]
    IncompatibleFiles(String),

    /// Reader used after it was closed
    #[error("Reader is closed")]
    Closed,
}

impl From<IoError> for ReaderError {
    fn from(err: IoError) -> Self {
        ReaderError::Format(FormatError::Io(err))
    }
}

impl From<TiffError> for ReaderError {
    fn from(err: TiffError) -> Self {
        ReaderError::Format(FormatError::Tiff(err))
    }
}

/// Errors raised while assembling, splitting or recombining stacks
#[derive(Debug, Clone, Error)]
pub enum StackError {
    /// Slice geometry differs from the stack geometry
    #[error("Slice is {actual_width}x{actual_height}, stack is {width}x{height}")]
    DimensionMismatch {
        width: usize,
        height: usize,
        actual_width: usize,
        actual_height: usize,
    },

    /// Pixel buffer length does not match the slice geometry
    #[error("Slice has {actual} samples, expected {expected}")]
    SampleCount { expected: usize, actual: usize },

    /// 1-based slice number outside the stack
    #[error("Slice {slice} out of range (stack has {len} slices)")]
    SliceOutOfRange { slice: usize, len: usize },
}

/// Any failure after a decoder was resolved
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error(transparent)]
    Stack(#[from] StackError),
}

/// Terminal failures of one import call
#[derive(Debug, Clone, Error)]
pub enum ImportError {
    /// The chosen source does not reference an existing input
    #[error("The specified file ({}) does not exist.", .0.display())]
    MissingSource(PathBuf),

    /// No decoder could be resolved for the source
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Chain construction, metadata, decode, assembly or reconstruction failed
    #[error("Decode failure: {0}")]
    DecodeFailure(#[from] DecodeError),
}

impl From<ReaderError> for ImportError {
    fn from(err: ReaderError) -> Self {
        ImportError::DecodeFailure(DecodeError::Reader(err))
    }
}

impl From<StackError> for ImportError {
    fn from(err: StackError) -> Self {
        ImportError::DecodeFailure(DecodeError::Stack(err))
    }
}

impl ImportError {
    /// Message shown to interactive users: a fixed prefix plus the detail text.
    pub fn user_message(&self) -> String {
        match self {
            ImportError::MissingSource(_) => self.to_string(),
            ImportError::UnsupportedFormat(detail) => {
                format!("Sorry, there was a problem reading the file:\n{}", detail)
            }
            ImportError::DecodeFailure(err) => {
                format!("Sorry, there was a problem reading the data:\n{}", err)
            }
        }
    }
}

/// Errors from the preferences store
#[derive(Debug, Clone, Error)]
pub enum PreferencesError {
    #[error("Preferences I/O error: {0}")]
    Io(String),

    #[error("Malformed preferences file: {0}")]
    Parse(String),
}

/// Errors writing exported slices
#[derive(Debug, Clone, Error)]
pub enum ExportError {
    /// Pixel buffer does not fill the slice geometry
    #[error("Slice '{label}' does not fill {width}x{height}")]
    Buffer {
        label: String,
        width: usize,
        height: usize,
    },

    /// Encoding or writing the image file failed
    #[error("Cannot write {}: {message}", .path.display())]
    Write { path: PathBuf, message: String },
}
