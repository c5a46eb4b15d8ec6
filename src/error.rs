//! Error types for buffer construction and access.

use thiserror::Error;

/// Result type for flatbuf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for flatbuf operations.
///
/// Every variant is a synchronous precondition or input-contract failure.
/// None of them is transient, so nothing in the crate retries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A load or store touched bytes outside the addressable region.
    #[error("access of {size} bytes at offset {offset} is out of range (capacity {capacity})")]
    OutOfRange {
        offset: usize,
        size: usize,
        capacity: usize,
    },

    /// A reference to content that has not been written yet.
    #[error("invalid offset: target {target} is ahead of the write cursor {current}")]
    InvalidOffset { target: usize, current: usize },

    /// A vtable slot outside the object's declared field count.
    #[error("invalid field index {index} for object with {field_count} fields")]
    InvalidField { index: usize, field_count: usize },

    /// Growing the buffer would pass the format's size ceiling.
    #[error("buffer capacity exceeded: needed {needed} bytes, maximum is {max}")]
    CapacityExceeded { needed: usize, max: usize },

    /// A field checked with `Builder::required` was never written.
    #[error("required field {index} is missing")]
    MissingRequiredField { index: usize },

    /// Nested construction, or a struct written away from the cursor.
    #[error("structure violation: {0}")]
    StructureViolation(&'static str),

    /// The buffer's own offsets point outside of it, or its identifier is wrong.
    #[error("malformed buffer: {0}")]
    MalformedBuffer(String),

    /// Element index or bulk copy range outside a vector or slice.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// String bytes are not valid UTF-8.
    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// File identifiers are exactly four bytes.
    #[error("file identifier must be 4 bytes, got {0}")]
    InvalidIdentifier(usize),
}

impl Error {
    /// Creates an out of range error.
    pub fn out_of_range(offset: usize, size: usize, capacity: usize) -> Self {
        Self::OutOfRange {
            offset,
            size,
            capacity,
        }
    }

    /// Creates an index out of range error.
    pub fn index_out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }

    /// Creates a malformed buffer error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedBuffer(msg.into())
    }
}
