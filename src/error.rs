/// Everything that can make a segmentation pass fail.
///
/// The algorithm itself cannot fail once the input is ingested. All variants come either from
/// malformed input, from the host or from a fault caught at the outermost boundary
/// (`driver::run_filter()`).
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    #[error("invalid geometry {width}x{height}, both dimensions must be positive")]
    InvalidGeometry { width: i64, height: i64 },
    #[error("unsupported pixel size of {0} bytes (expected 3 or 4)")]
    UnsupportedPixelSize(usize),
    #[error("row stride {stride} is smaller than one row of pixels ({min} bytes)")]
    RowStrideTooSmall { stride: usize, min: usize },
    #[error("source buffer holds {actual} bytes, but {needed} are needed")]
    BufferTooSmall { needed: usize, actual: usize },
    #[error("dimension mismatch")]
    DimensionMismatch,
    #[error("failed to acquire host resource: {0}")]
    ResourceAcquisition(String),
    #[error("unexpected fault while processing: {0}")]
    Fault(String),
}

pub type Result<T> = std::result::Result<T, Error>;
