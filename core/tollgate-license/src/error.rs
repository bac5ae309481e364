//! Error types for the licensing module.

use thiserror::Error;
use tollgate_codec::CodecError;

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The license string is empty or whitespace.
    #[error("license key is empty")]
    Empty,

    /// The license string is a URL; license servers are not supported.
    #[error("license server not supported")]
    LicenseServerNotSupported,

    /// The key could not be decoded.
    #[error("invalid license key format: {0}")]
    InvalidKeyFormat(String),

    /// The key has no signature.
    #[error("license key is not signed")]
    MissingSignature,

    /// The key names a signing key this build does not know.
    #[error("license key is signed with unknown key {0}")]
    UnknownSignatureKey(u8),

    /// Ed25519 signature verification failed.
    #[error("license key signature invalid")]
    InvalidSignature,

    /// A public key in the key ring is malformed.
    #[error("public key {0} is malformed")]
    InvalidPublicKey(u8),

    /// The license id is on the revocation list.
    #[error("license {0} has been revoked")]
    Revoked(i32),

    /// A field required for this view is absent.
    #[error("license key has no {0}")]
    MissingField(&'static str),

    /// A field holds a value this build does not understand.
    #[error("invalid license payload: {0}")]
    InvalidPayload(String),

    /// File-system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Named mutex could not be acquired.
    #[error("lock error: {0}")]
    Lock(String),
}

impl From<CodecError> for LicenseError {
    fn from(err: CodecError) -> Self {
        Self::InvalidKeyFormat(err.to_string())
    }
}

impl LicenseError {
    /// Returns true for I/O failures caused by another process holding the file.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io(err) => crate::fs::is_transient_io_error(err),
            _ => false,
        }
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
