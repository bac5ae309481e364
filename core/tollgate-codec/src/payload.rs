//! The ordered field set carried by a license key.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::codec::{decode_payload, write_field, DecodedPayload};
use crate::error::{CodecError, CodecResult};
use crate::field::LicenseField;
use crate::index::FieldIndex;

/// Fields of a license key, unique by index.
///
/// Two payloads are equal when they hold the same values under the same
/// indices; this is what license de-duplication keys on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LicenseKeyPayload {
    fields: BTreeMap<FieldIndex, LicenseField>,
}

impl LicenseKeyPayload {
    /// Creates an empty payload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_fields(fields: BTreeMap<FieldIndex, LicenseField>) -> Self {
        Self { fields }
    }

    /// Decodes a payload from raw bytes.
    ///
    /// # Errors
    ///
    /// See [`decode_payload`].
    pub fn decode(bytes: &[u8]) -> CodecResult<DecodedPayload> {
        decode_payload(bytes)
    }

    /// Sets a field, replacing any previous value under the same index.
    ///
    /// # Errors
    ///
    /// Fails if the index is unknown to this writer or the value has the wrong type.
    pub fn set(&mut self, index: FieldIndex, value: LicenseField) -> CodecResult<()> {
        match index.value_type() {
            Some(expected) if expected == value.field_type() => {
                self.fields.insert(index, value);
                Ok(())
            }
            Some(expected) => Err(CodecError::TypeMismatch {
                index: index.value(),
                expected: expected.name(),
                actual: value.field_type().name(),
            }),
            None => Err(CodecError::InvalidValue {
                index: index.value(),
                reason: "index has no value type".to_string(),
            }),
        }
    }

    /// Builder form of [`set`](Self::set).
    ///
    /// # Errors
    ///
    /// See [`set`](Self::set).
    pub fn with(mut self, index: FieldIndex, value: LicenseField) -> CodecResult<Self> {
        self.set(index, value)?;
        Ok(self)
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, index: FieldIndex) -> Option<LicenseField> {
        self.fields.remove(&index)
    }

    /// Returns the field stored under `index`.
    #[must_use]
    pub fn get(&self, index: FieldIndex) -> Option<&LicenseField> {
        self.fields.get(&index)
    }

    #[must_use]
    pub fn contains(&self, index: FieldIndex) -> bool {
        self.fields.contains_key(&index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in index order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldIndex, &LicenseField)> {
        self.fields.iter().map(|(index, value)| (*index, value))
    }

    #[must_use]
    pub fn get_bool(&self, index: FieldIndex) -> Option<bool> {
        match self.get(index)? {
            LicenseField::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_byte(&self, index: FieldIndex) -> Option<u8> {
        match self.get(index)? {
            LicenseField::Byte(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_bytes(&self, index: FieldIndex) -> Option<&[u8]> {
        match self.get(index)? {
            LicenseField::ByteBuffer(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_date(&self, index: FieldIndex) -> Option<NaiveDate> {
        match self.get(index)? {
            LicenseField::Date(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_date_time(&self, index: FieldIndex) -> Option<DateTime<Utc>> {
        match self.get(index)? {
            LicenseField::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_guid(&self, index: FieldIndex) -> Option<Uuid> {
        match self.get(index)? {
            LicenseField::Guid(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_i16(&self, index: FieldIndex) -> Option<i16> {
        match self.get(index)? {
            LicenseField::Int16(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_i32(&self, index: FieldIndex) -> Option<i32> {
        match self.get(index)? {
            LicenseField::Int32(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_i64(&self, index: FieldIndex) -> Option<i64> {
        match self.get(index)? {
            LicenseField::Int64(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_str(&self, index: FieldIndex) -> Option<&str> {
        match self.get(index)? {
            LicenseField::String(v) => Some(v),
            _ => None,
        }
    }

    /// Encodes every field except the Signature, without the End marker.
    ///
    /// These are exactly the bytes a signature covers.
    ///
    /// # Errors
    ///
    /// Fails if a value does not fit its wire encoding.
    pub fn encode_signable(&self) -> CodecResult<Vec<u8>> {
        let mut out = Vec::new();
        for (index, value) in &self.fields {
            if *index != FieldIndex::SIGNATURE {
                write_field(&mut out, *index, value)?;
            }
        }
        Ok(out)
    }

    /// Encodes the complete payload: fields in index order, the Signature
    /// last, then End.
    ///
    /// # Errors
    ///
    /// Fails if a value does not fit its wire encoding.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut out = self.encode_signable()?;
        if let Some(signature) = self.fields.get(&FieldIndex::SIGNATURE) {
            write_field(&mut out, FieldIndex::SIGNATURE, signature)?;
        }
        out.push(FieldIndex::END.value());
        Ok(out)
    }
}
