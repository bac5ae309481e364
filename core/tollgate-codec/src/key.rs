//! License key string framing: `<version>-<payload>`.
//!
//! The version selects how a reader interprets the payload. Version 1 keys
//! predate key rotation and carry no SignatureKeyId; version 2 keys name
//! their signing key. Readers accept every version up to their own.

use std::fmt;

use crate::alphabet;
use crate::codec::DecodedPayload;
use crate::error::{CodecError, CodecResult};
use crate::index::FieldIndex;
use crate::payload::LicenseKeyPayload;

/// Field-semantics revision implemented by this reader.
pub const READER_VERSION: i16 = 2;

/// License key format versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyFormatVersion {
    /// Original layout, signed by the single pre-rotation key.
    V1,
    /// Adds SignatureKeyId for key rotation.
    V2,
}

impl KeyFormatVersion {
    /// Version written by new keys.
    pub const CURRENT: Self = Self::V2;

    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }

    /// Parses the decimal version prefix.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnsupportedVersion`] for anything but a known version.
    pub fn parse(text: &str) -> CodecResult<Self> {
        match text.trim() {
            "1" => Ok(Self::V1),
            "2" => Ok(Self::V2),
            other => Err(CodecError::UnsupportedVersion(other.to_string())),
        }
    }

    /// Returns true if keys of this version name their signing key.
    #[must_use]
    pub const fn has_signature_key_id(self) -> bool {
        matches!(self, Self::V2)
    }
}

impl fmt::Display for KeyFormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// A decoded license key with the raw bytes needed for signature checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedKey {
    version: KeyFormatVersion,
    bytes: Vec<u8>,
    decoded: DecodedPayload,
}

impl DecodedKey {
    #[must_use]
    pub fn version(&self) -> KeyFormatVersion {
        self.version
    }

    #[must_use]
    pub fn payload(&self) -> &LicenseKeyPayload {
        &self.decoded.payload
    }

    /// Returns the payload bytes covered by the signature.
    ///
    /// None if the key has no signature, or if fields follow the signature
    /// (those fields would not be covered, so the key cannot be trusted).
    #[must_use]
    pub fn signed_bytes(&self) -> Option<&[u8]> {
        if self.decoded.fields_after_signature {
            return None;
        }
        self.decoded.signature_offset.map(|offset| &self.bytes[..offset])
    }

    /// Returns true if the key has a Signature field with fields after it.
    #[must_use]
    pub fn has_fields_after_signature(&self) -> bool {
        self.decoded.fields_after_signature
    }
}

/// Decodes a key string.
///
/// # Errors
///
/// Fails on a missing or unsupported version prefix, characters outside the
/// key alphabet, any payload decoding error, or a key that requires a newer
/// reader.
pub fn decode_key(text: &str) -> CodecResult<DecodedKey> {
    let (version, body) = text.trim().split_once('-').ok_or(CodecError::MissingVersion)?;
    let version = KeyFormatVersion::parse(version)?;
    let bytes = alphabet::decode(body)?;
    let decoded = LicenseKeyPayload::decode(&bytes)?;

    if let Some(required) = decoded
        .payload
        .get_i16(FieldIndex::MIN_REQUIRED_READER_VERSION)
    {
        if required > READER_VERSION {
            return Err(CodecError::ReaderTooOld {
                required,
                supported: READER_VERSION,
            });
        }
    }

    Ok(DecodedKey {
        version,
        bytes,
        decoded,
    })
}

/// Encodes a payload as a key string of the given version.
///
/// # Errors
///
/// Fails if a field value does not fit its wire encoding.
pub fn encode_key(version: KeyFormatVersion, payload: &LicenseKeyPayload) -> CodecResult<String> {
    let bytes = payload.encode()?;
    Ok(format!("{version}-{}", alphabet::encode(&bytes)))
}

/// Formats a key for display, splitting the payload into dash-separated groups.
///
/// The result decodes to the same key.
#[must_use]
pub fn format_grouped(key: &str, group_len: usize) -> String {
    let Some((version, body)) = key.trim().split_once('-') else {
        return key.trim().to_string();
    };
    if group_len == 0 {
        return format!("{version}-{body}");
    }
    let symbols: Vec<char> = body.chars().filter(|c| *c != '-' && !c.is_whitespace()).collect();
    let groups: Vec<String> = symbols
        .chunks(group_len)
        .map(|chunk| chunk.iter().collect())
        .collect();
    format!("{version}-{}", groups.join("-"))
}
