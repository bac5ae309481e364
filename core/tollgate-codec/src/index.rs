//! Field indices and the table that assigns each known index its value type.
//!
//! Compatibility attributes are a pure function of the numeric index:
//!
//! | Range   | Must-understand | Length-prefixed |
//! |---------|-----------------|-----------------|
//! | 1–21    | yes             | no              |
//! | 22–128  | yes             | yes             |
//! | 129–253 | no              | yes             |
//! | 254–255 | yes             | no              |

use std::fmt;

use crate::field::FieldType;

/// Last index of the fixed legacy layout.
const LAST_LEGACY_INDEX: u8 = 21;

/// Last index of the length-prefixed must-understand range.
const LAST_CRITICAL_INDEX: u8 = 128;

/// Last index of the skippable range.
const LAST_SKIPPABLE_INDEX: u8 = 253;

/// Names the meaning of a field inside a license key payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldIndex(u8);

impl FieldIndex {
    pub const PRODUCT: Self = Self(1);
    pub const LICENSE_TYPE: Self = Self(2);
    pub const LICENSE_ID: Self = Self(3);
    pub const LICENSE_GUID: Self = Self(4);
    pub const VALID_FROM: Self = Self(5);
    pub const VALID_TO: Self = Self(6);
    pub const LICENSEE: Self = Self(7);
    pub const USER_COUNT: Self = Self(8);
    pub const FEATURES: Self = Self(9);
    pub const NAMESPACE_RESTRICTION: Self = Self(10);
    pub const SUBSCRIPTION_END_DATE: Self = Self(11);
    pub const AUDITABLE: Self = Self(12);
    pub const ALLOW_INHERITANCE: Self = Self(13);
    pub const PUBLIC_KEY_TOKEN: Self = Self(14);
    pub const SIGNATURE_KEY_ID: Self = Self(15);
    pub const SIGNATURE: Self = Self(16);
    pub const DESCRIPTION: Self = Self(22);
    pub const ISSUED_AT: Self = Self(23);
    pub const LICENSEE_EMAIL: Self = Self(24);
    pub const COMMENT: Self = Self(130);
    pub const MIN_REQUIRED_READER_VERSION: Self = Self(254);
    pub const END: Self = Self(255);

    /// Wraps a raw index byte.
    #[must_use]
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// Returns the raw index byte.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Returns true if a reader that does not know this index must reject the key.
    #[must_use]
    pub const fn must_understand(self) -> bool {
        !(self.0 > LAST_CRITICAL_INDEX && self.0 <= LAST_SKIPPABLE_INDEX)
    }

    /// Returns true if the value is preceded by a length byte on the wire.
    #[must_use]
    pub const fn is_length_prefixed(self) -> bool {
        self.0 > LAST_LEGACY_INDEX && self.0 <= LAST_SKIPPABLE_INDEX
    }

    /// Returns the value type this reader assigns to the index, if it knows it.
    #[must_use]
    pub fn value_type(self) -> Option<FieldType> {
        lookup(self).map(|entry| entry.1)
    }

    /// Returns the field name, if the index is known.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        lookup(self).map(|entry| entry.2)
    }
}

impl fmt::Display for FieldIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}({})", self.0),
            None => write!(f, "field({})", self.0),
        }
    }
}

/// Dispatch table for every index this reader understands.
const FIELD_TABLE: &[(FieldIndex, FieldType, &str)] = &[
    (FieldIndex::PRODUCT, FieldType::Int16, "Product"),
    (FieldIndex::LICENSE_TYPE, FieldType::Byte, "LicenseType"),
    (FieldIndex::LICENSE_ID, FieldType::Int32, "LicenseId"),
    (FieldIndex::LICENSE_GUID, FieldType::Guid, "LicenseGuid"),
    (FieldIndex::VALID_FROM, FieldType::Date, "ValidFrom"),
    (FieldIndex::VALID_TO, FieldType::Date, "ValidTo"),
    (FieldIndex::LICENSEE, FieldType::String, "Licensee"),
    (FieldIndex::USER_COUNT, FieldType::Int16, "UserCount"),
    (FieldIndex::FEATURES, FieldType::Int64, "Features"),
    (FieldIndex::NAMESPACE_RESTRICTION, FieldType::String, "NamespaceRestriction"),
    (FieldIndex::SUBSCRIPTION_END_DATE, FieldType::Date, "SubscriptionEndDate"),
    (FieldIndex::AUDITABLE, FieldType::Bool, "Auditable"),
    (FieldIndex::ALLOW_INHERITANCE, FieldType::Bool, "AllowInheritance"),
    (FieldIndex::PUBLIC_KEY_TOKEN, FieldType::ByteBuffer, "PublicKeyToken"),
    (FieldIndex::SIGNATURE_KEY_ID, FieldType::Byte, "SignatureKeyId"),
    (FieldIndex::SIGNATURE, FieldType::ByteBuffer, "Signature"),
    (FieldIndex::DESCRIPTION, FieldType::String, "Description"),
    (FieldIndex::ISSUED_AT, FieldType::DateTime, "IssuedAt"),
    (FieldIndex::LICENSEE_EMAIL, FieldType::String, "LicenseeEmail"),
    (FieldIndex::COMMENT, FieldType::String, "Comment"),
    (FieldIndex::MIN_REQUIRED_READER_VERSION, FieldType::Int16, "MinRequiredReaderVersion"),
];

fn lookup(index: FieldIndex) -> Option<&'static (FieldIndex, FieldType, &'static str)> {
    FIELD_TABLE.iter().find(|entry| entry.0 == index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_attributes() {
        for raw in 1..=21u8 {
            let index = FieldIndex::new(raw);
            assert!(index.must_understand());
            assert!(!index.is_length_prefixed());
        }
        for raw in 22..=128u8 {
            let index = FieldIndex::new(raw);
            assert!(index.must_understand());
            assert!(index.is_length_prefixed());
        }
        for raw in 129..=253u8 {
            let index = FieldIndex::new(raw);
            assert!(!index.must_understand());
            assert!(index.is_length_prefixed());
        }
        for raw in [254u8, 255] {
            let index = FieldIndex::new(raw);
            assert!(index.must_understand());
            assert!(!index.is_length_prefixed());
        }
    }

    #[test]
    fn table_entries_are_unique() {
        for (i, a) in FIELD_TABLE.iter().enumerate() {
            for b in &FIELD_TABLE[i + 1..] {
                assert_ne!(a.0, b.0, "{} listed twice", a.2);
            }
        }
    }

    #[test]
    fn end_has_no_value_type() {
        assert!(FieldIndex::END.value_type().is_none());
    }

    #[test]
    fn display_uses_name() {
        assert_eq!(FieldIndex::LICENSEE.to_string(), "Licensee(7)");
        assert_eq!(FieldIndex::new(200).to_string(), "field(200)");
    }
}
