//! Field-level byte codec.
//!
//! A payload is a run of `index [length] value` records closed by the End
//! index. Fixed-layout indices carry no length byte; the reader derives the
//! width from the value type. Unknown skippable fields are stepped over using
//! their length byte.

use std::collections::BTreeMap;

use chrono::DateTime;
use uuid::Uuid;

use crate::error::{CodecError, CodecResult};
use crate::field::{date_to_days, days_to_date, FieldType, LicenseField};
use crate::index::FieldIndex;
use crate::payload::LicenseKeyPayload;

/// Extra bytes following the first byte of a legacy 4-byte Bool.
const LEGACY_BOOL_PADDING: usize = 3;

/// Result of decoding a payload, with the layout facts signature checks need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    /// The decoded fields.
    pub payload: LicenseKeyPayload,
    /// Byte offset of the Signature field's index byte, if present.
    pub signature_offset: Option<usize>,
    /// True if any field (known or skipped) follows the Signature field.
    pub fields_after_signature: bool,
}

/// Decodes a complete payload, up to and including the End marker.
///
/// # Errors
///
/// Fails on unknown must-understand fields, duplicate indices, truncated
/// input, invalid lengths or values, and bytes trailing the End marker.
pub fn decode_payload(bytes: &[u8]) -> CodecResult<DecodedPayload> {
    let mut reader = FieldReader::new(bytes);
    let mut fields = BTreeMap::new();
    let mut signature_offset = None;
    let mut fields_after_signature = false;

    loop {
        let start = reader.pos;
        let index = FieldIndex::new(reader.read_u8()?);
        if index == FieldIndex::END {
            break;
        }
        if signature_offset.is_some() {
            fields_after_signature = true;
        }

        let Some(value_type) = index.value_type() else {
            if index.must_understand() {
                return Err(CodecError::UnknownCriticalField(index.value()));
            }
            let len = usize::from(reader.read_u8()?);
            reader.take(len)?;
            continue;
        };

        let value = if index.is_length_prefixed() {
            read_prefixed(&mut reader, index, value_type)?
        } else {
            reader.read_value(index, value_type, true)?
        };

        if index == FieldIndex::SIGNATURE {
            signature_offset = Some(start);
        }
        if fields.insert(index, value).is_some() {
            return Err(CodecError::DuplicateField(index.value()));
        }
    }

    if reader.remaining() > 0 {
        return Err(CodecError::TrailingBytes(reader.remaining()));
    }

    Ok(DecodedPayload {
        payload: LicenseKeyPayload::from_fields(fields),
        signature_offset,
        fields_after_signature,
    })
}

fn read_prefixed(
    reader: &mut FieldReader<'_>,
    index: FieldIndex,
    value_type: FieldType,
) -> CodecResult<LicenseField> {
    let declared = usize::from(reader.read_u8()?);
    let body = reader.take(declared)?;

    let expected = match value_type.fixed_size() {
        Some(size) => size,
        None => 1 + usize::from(*body.first().ok_or(CodecError::Truncated)?),
    };
    if declared != expected {
        return Err(CodecError::InvalidLength {
            index: index.value(),
            declared,
            expected,
        });
    }

    FieldReader::new(body).read_value(index, value_type, false)
}

/// Appends one field record to `out`.
///
/// # Errors
///
/// Fails if the index is unknown or End, if the value type does not match
/// the index, or if the value does not fit its wire encoding.
pub fn write_field(out: &mut Vec<u8>, index: FieldIndex, value: &LicenseField) -> CodecResult<()> {
    let Some(expected) = index.value_type() else {
        return Err(CodecError::InvalidValue {
            index: index.value(),
            reason: "index has no value type".to_string(),
        });
    };
    if expected != value.field_type() {
        return Err(CodecError::TypeMismatch {
            index: index.value(),
            expected: expected.name(),
            actual: value.field_type().name(),
        });
    }

    let prefixed = index.is_length_prefixed();
    let body = encode_value(index, value, prefixed)?;

    out.push(index.value());
    if prefixed {
        // encode_value already bounded the body to one length byte.
        out.push(body.len() as u8);
    }
    out.extend_from_slice(&body);
    Ok(())
}

fn encode_value(index: FieldIndex, value: &LicenseField, prefixed: bool) -> CodecResult<Vec<u8>> {
    let max_len = if prefixed { 254 } else { 255 };
    let bytes = match value {
        LicenseField::Bool(v) => vec![u8::from(*v)],
        LicenseField::Byte(v) => vec![*v],
        LicenseField::Int16(v) => v.to_le_bytes().to_vec(),
        LicenseField::Int32(v) => v.to_le_bytes().to_vec(),
        LicenseField::Int64(v) => v.to_le_bytes().to_vec(),
        LicenseField::Guid(v) => v.as_bytes().to_vec(),
        LicenseField::Date(v) => {
            let days = date_to_days(*v).ok_or_else(|| CodecError::InvalidValue {
                index: index.value(),
                reason: format!("date {v} is outside the representable range"),
            })?;
            days.to_le_bytes().to_vec()
        }
        LicenseField::DateTime(v) => v.timestamp_millis().to_le_bytes().to_vec(),
        LicenseField::String(v) => length_prefixed(index, v.as_bytes(), max_len)?,
        LicenseField::ByteBuffer(v) => length_prefixed(index, v, max_len)?,
    };
    Ok(bytes)
}

fn length_prefixed(index: FieldIndex, data: &[u8], max_len: usize) -> CodecResult<Vec<u8>> {
    if data.len() > max_len {
        return Err(CodecError::ValueTooLong {
            index: index.value(),
            len: data.len(),
            max: max_len,
        });
    }
    let mut bytes = Vec::with_capacity(data.len() + 1);
    bytes.push(data.len() as u8);
    bytes.extend_from_slice(data);
    Ok(bytes)
}

/// Cursor over a payload byte slice.
struct FieldReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    /// Set once a legacy 4-byte Bool has been seen; later Bools use that width.
    legacy_bool: bool,
}

impl<'a> FieldReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            legacy_bool: false,
        }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn take(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(CodecError::Truncated);
        }
        let bytes = self.bytes;
        let slice = &bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.take(N)?);
        Ok(array)
    }

    fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_value(
        &mut self,
        index: FieldIndex,
        value_type: FieldType,
        allow_legacy_bool: bool,
    ) -> CodecResult<LicenseField> {
        let value = match value_type {
            FieldType::Bool => LicenseField::Bool(self.read_bool(index, allow_legacy_bool)?),
            FieldType::Byte => LicenseField::Byte(self.read_u8()?),
            FieldType::Int16 => LicenseField::Int16(i16::from_le_bytes(self.take_array()?)),
            FieldType::Int32 => LicenseField::Int32(i32::from_le_bytes(self.take_array()?)),
            FieldType::Int64 => LicenseField::Int64(i64::from_le_bytes(self.take_array()?)),
            FieldType::Guid => LicenseField::Guid(Uuid::from_bytes(self.take_array()?)),
            FieldType::Date => LicenseField::Date(days_to_date(u16::from_le_bytes(self.take_array()?))),
            FieldType::DateTime => {
                let millis = i64::from_le_bytes(self.take_array()?);
                let value = DateTime::from_timestamp_millis(millis).ok_or_else(|| {
                    CodecError::InvalidValue {
                        index: index.value(),
                        reason: format!("timestamp {millis} is out of range"),
                    }
                })?;
                LicenseField::DateTime(value)
            }
            FieldType::String => {
                let len = usize::from(self.read_u8()?);
                let bytes = self.take(len)?;
                let text = std::str::from_utf8(bytes)
                    .map_err(|_| CodecError::InvalidUtf8(index.value()))?;
                LicenseField::String(text.to_string())
            }
            FieldType::ByteBuffer => {
                let len = usize::from(self.read_u8()?);
                LicenseField::ByteBuffer(self.take(len)?.to_vec())
            }
        };
        Ok(value)
    }

    /// Reads a Bool, tolerating the legacy 4-byte form some old writers produced.
    ///
    /// No field index is zero, so a zero byte right after the value can only
    /// be legacy padding.
    fn read_bool(&mut self, index: FieldIndex, allow_legacy: bool) -> CodecResult<bool> {
        let value = self.read_u8()?;
        if allow_legacy {
            if self.legacy_bool {
                self.take(LEGACY_BOOL_PADDING)?;
            } else if self.peek() == Some(0) {
                self.take(LEGACY_BOOL_PADDING)?;
                self.legacy_bool = true;
            }
        }
        match value {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidValue {
                index: index.value(),
                reason: format!("{other} is not a boolean"),
            }),
        }
    }
}
