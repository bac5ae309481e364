//! Error types for the license key codec.

use thiserror::Error;

/// Errors raised while encoding or decoding a license key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A field the reader does not know sits in a must-understand range.
    #[error("unknown critical field {0}")]
    UnknownCriticalField(u8),

    /// The same field index appeared twice in one payload.
    #[error("duplicate field {0}")]
    DuplicateField(u8),

    /// The byte stream ended before the End marker.
    #[error("license key payload is truncated")]
    Truncated,

    /// Bytes were found after the End marker.
    #[error("unexpected {0} trailing bytes after end marker")]
    TrailingBytes(usize),

    /// A length-prefixed field declared a length its type cannot have.
    #[error("field {index} declares length {declared}, expected {expected}")]
    InvalidLength {
        /// Field index.
        index: u8,
        /// Length found on the wire.
        declared: usize,
        /// Length the value encoding requires.
        expected: usize,
    },

    /// The key text contains a character outside the key alphabet.
    #[error("invalid character {0:?} in license key")]
    InvalidAlphabet(char),

    /// A string field is not valid UTF-8.
    #[error("field {0} is not valid UTF-8")]
    InvalidUtf8(u8),

    /// A field value is outside the domain of its wire encoding.
    #[error("invalid value for field {index}: {reason}")]
    InvalidValue {
        /// Field index.
        index: u8,
        /// What was wrong.
        reason: String,
    },

    /// The value type does not match the type assigned to the index.
    #[error("field {index} expects {expected}, got {actual}")]
    TypeMismatch {
        /// Field index.
        index: u8,
        /// Type assigned to the index.
        expected: &'static str,
        /// Type of the offered value.
        actual: &'static str,
    },

    /// A string or buffer exceeds the single-byte length prefix.
    #[error("field {index} is {len} bytes long, the limit is {max}")]
    ValueTooLong {
        /// Field index.
        index: u8,
        /// Actual byte length.
        len: usize,
        /// Maximum byte length.
        max: usize,
    },

    /// The key text has no `<version>-` prefix.
    #[error("license key has no format version prefix")]
    MissingVersion,

    /// The key format version is not one this reader supports.
    #[error("unsupported license key format version {0}")]
    UnsupportedVersion(String),

    /// The key requires a newer reader.
    #[error("license key requires reader version {required}, this reader is version {supported}")]
    ReaderTooOld {
        /// Reader version named by the key.
        required: i16,
        /// Version of this reader.
        supported: i16,
    },
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
