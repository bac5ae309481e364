//! Typed license field values.

use chrono::{DateTime, Days, NaiveDate, Utc};
use uuid::Uuid;

/// Value types a license field can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bool,
    Byte,
    ByteBuffer,
    Date,
    DateTime,
    Guid,
    Int16,
    Int32,
    Int64,
    String,
}

impl FieldType {
    /// Returns the wire size of fixed-width types, or None for self-describing ones.
    #[must_use]
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            Self::Bool | Self::Byte => Some(1),
            Self::Date | Self::Int16 => Some(2),
            Self::Int32 => Some(4),
            Self::DateTime | Self::Int64 => Some(8),
            Self::Guid => Some(16),
            Self::ByteBuffer | Self::String => None,
        }
    }

    /// Returns the type name used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "Bool",
            Self::Byte => "Byte",
            Self::ByteBuffer => "ByteBuffer",
            Self::Date => "Date",
            Self::DateTime => "DateTime",
            Self::Guid => "Guid",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::String => "String",
        }
    }
}

/// A single typed value stored under a field index.
///
/// `Date` is day-precision. `DateTime` is stored with millisecond precision;
/// sub-millisecond parts are dropped on encode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LicenseField {
    Bool(bool),
    Byte(u8),
    ByteBuffer(Vec<u8>),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Guid(Uuid),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    String(String),
}

impl LicenseField {
    /// Returns the value type of this field.
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        match self {
            Self::Bool(_) => FieldType::Bool,
            Self::Byte(_) => FieldType::Byte,
            Self::ByteBuffer(_) => FieldType::ByteBuffer,
            Self::Date(_) => FieldType::Date,
            Self::DateTime(_) => FieldType::DateTime,
            Self::Guid(_) => FieldType::Guid,
            Self::Int16(_) => FieldType::Int16,
            Self::Int32(_) => FieldType::Int32,
            Self::Int64(_) => FieldType::Int64,
            Self::String(_) => FieldType::String,
        }
    }
}

/// First day representable by a `Date` field.
#[must_use]
pub fn date_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default()
}

/// Last day representable by a `Date` field.
#[must_use]
pub fn max_date() -> NaiveDate {
    date_epoch()
        .checked_add_days(Days::new(u64::from(u16::MAX)))
        .unwrap_or(NaiveDate::MAX)
}

/// Converts a date to its day count since [`date_epoch`].
pub(crate) fn date_to_days(date: NaiveDate) -> Option<u16> {
    let days = date.signed_duration_since(date_epoch()).num_days();
    u16::try_from(days).ok()
}

/// Converts a day count since [`date_epoch`] back to a date.
pub(crate) fn days_to_date(days: u16) -> NaiveDate {
    date_epoch()
        .checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_bounds() {
        assert_eq!(date_to_days(date_epoch()), Some(0));
        assert_eq!(date_to_days(max_date()), Some(u16::MAX));
        assert_eq!(date_to_days(date_epoch().pred_opt().unwrap()), None);
        assert_eq!(days_to_date(0), date_epoch());
    }

    #[test]
    fn fixed_sizes() {
        assert_eq!(FieldType::Guid.fixed_size(), Some(16));
        assert_eq!(FieldType::String.fixed_size(), None);
        assert_eq!(LicenseField::Int64(7).field_type(), FieldType::Int64);
    }
}
