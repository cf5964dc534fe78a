use thiserror::Error;

/// Result type alias for H17 image operations
pub type Result<T> = std::result::Result<T, H17Error>;

/// Errors that can occur when working with H17 images and capture devices
#[derive(Debug, Error)]
pub enum H17Error {
    /// I/O error occurred while reading or writing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or unrecognized image file
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Parse error at specific offset
    #[error("Parse error at offset {offset}: {message}")]
    ParseError {
        /// Byte offset where error occurred
        offset: usize,
        /// Error message
        message: String,
    },

    /// A block or sub-block declares more bytes than remain in its container
    #[error("Size mismatch at offset {offset}: declared {declared} bytes, {available} available")]
    SizeMismatch {
        /// Byte offset of the length field
        offset: usize,
        /// Declared payload length
        declared: usize,
        /// Bytes actually remaining
        available: usize,
    },

    /// A block flagged mandatory has a type this library does not understand
    #[error("Unknown mandatory block type 0x{block_type:02X}")]
    UnknownMandatoryBlock {
        /// Raw block type byte
        block_type: u8,
    },

    /// A back-patched length does not fit its field
    #[error("Length {length} does not fit in {field} length field")]
    LengthOverflow {
        /// Name of the field width
        field: &'static str,
        /// Length that was measured
        length: u64,
    },

    /// The requested bit encoding is not supported
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// The image lacks a block the operation requires
    #[error("Missing block: {0}")]
    MissingBlock(String),

    /// Invalid track number specified
    #[error("Invalid track {track} on side {side}")]
    InvalidTrack {
        /// Side number
        side: u8,
        /// Track number
        track: u8,
    },

    /// Invalid sector number specified
    #[error("Invalid sector: {sector} on track {track}, side {side}")]
    InvalidSector {
        /// Side number
        side: u8,
        /// Track number
        track: u8,
        /// Sector number
        sector: u8,
    },

    /// A capture configuration value is out of range
    #[error("Invalid capture configuration: {0}")]
    InvalidConfig(String),

    /// The capture device failed an operation that cannot be retried
    #[error("Device {operation} failed with status {code}")]
    Device {
        /// Operation that failed (seek, recalibrate, ...)
        operation: &'static str,
        /// Device status code
        code: i32,
    },
}

impl H17Error {
    /// Create a parse error with context
    pub fn parse<S: Into<String>>(offset: usize, message: S) -> Self {
        H17Error::ParseError {
            offset,
            message: message.into(),
        }
    }

    /// Create an invalid format error
    pub fn invalid_format<S: Into<String>>(message: S) -> Self {
        H17Error::InvalidFormat(message.into())
    }

    /// Create a missing block error
    pub fn missing_block<S: Into<String>>(message: S) -> Self {
        H17Error::MissingBlock(message.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        H17Error::InvalidConfig(message.into())
    }

    /// Create a device failure error
    pub fn device(operation: &'static str, code: i32) -> Self {
        H17Error::Device { operation, code }
    }
}
