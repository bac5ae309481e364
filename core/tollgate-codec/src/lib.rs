//! Binary codec for Tollgate license keys.
//!
//! A key is a sequence of typed fields, each tagged with a one-byte index,
//! closed by an End marker and written as `<version>-<base32 payload>`.
//!
//! # Compatibility
//!
//! - **Must-understand fields** (indices 1–128, 254, 255): a reader that does
//!   not know one rejects the key.
//! - **Skippable fields** (129–253): carry a length byte, so old readers step
//!   over them.
//! - **Fixed legacy layout** (1–21): no length byte; width comes from the type.
//!
//! New fields are added in the 22–253 ranges so keys stay readable by older
//! readers wherever that is safe.

mod alphabet;
mod codec;
mod error;
mod field;
mod index;
mod key;
mod payload;

pub use alphabet::{decode as decode_text, encode as encode_text, KEY_ALPHABET};
pub use codec::{decode_payload, write_field, DecodedPayload};
pub use error::{CodecError, CodecResult};
pub use field::{date_epoch, max_date, FieldType, LicenseField};
pub use index::FieldIndex;
pub use key::{decode_key, encode_key, format_grouped, DecodedKey, KeyFormatVersion, READER_VERSION};
pub use payload::LicenseKeyPayload;
