// Driver and framebuffer errors.
// No std here, so plain enums with hand-written Display impls.

use core::fmt;

/// A construction or call-time argument the panel cannot honour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Canvas width must be a whole number of bytes.
    Width { columns: u16 },
    /// Segment height must divide the panel height with no remainder.
    SegmentHeight { rows: u16, segment_rows: u16 },
    /// Segment index past the last segment.
    SegmentIndex { index: u16, count: u16 },
    /// Row range is empty or reaches past the last panel row.
    RowRange { start: u16, end: u16, rows: u16 },
    /// Pixel data shorter than the rows it has to cover.
    SourceLength { needed: usize, len: usize },
    /// An old-image companion buffer only works for an unsegmented canvas.
    DualBufferSegmented { segments: u16 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Width { columns } => {
                write!(f, "width {} is not a multiple of 8", columns)
            }
            ConfigError::SegmentHeight { rows, segment_rows } => write!(
                f,
                "segment height {} does not divide {} rows",
                segment_rows, rows
            ),
            ConfigError::SegmentIndex { index, count } => {
                write!(f, "segment {} out of range (count {})", index, count)
            }
            ConfigError::RowRange { start, end, rows } => {
                write!(f, "row range {}..{} outside panel of {} rows", start, end, rows)
            }
            ConfigError::SourceLength { needed, len } => {
                write!(f, "pixel source holds {} bytes, needs {}", len, needed)
            }
            ConfigError::DualBufferSegmented { segments } => write!(
                f,
                "dual-buffer compensation needs 1 segment, got {}",
                segments
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    InvalidConfiguration(ConfigError),
    /// BUSY never dropped within the poll bound. The panel is left in an
    /// indeterminate state; `power_off` must still be called.
    DeviceTimeout,
    /// Direct pixel write outside the full canvas.
    OutOfBoundsPixel { x: i32, y: i32 },
    NotPowered,
    AlreadyPowered,
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::InvalidConfiguration(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfiguration(e) => write!(f, "invalid configuration: {}", e),
            Error::DeviceTimeout => write!(f, "timed out waiting for BUSY"),
            Error::OutOfBoundsPixel { x, y } => write!(f, "pixel ({}, {}) outside canvas", x, y),
            Error::NotPowered => write!(f, "panel is not powered"),
            Error::AlreadyPowered => write!(f, "panel is already powered"),
        }
    }
}

impl core::error::Error for Error {}
impl core::error::Error for ConfigError {}
