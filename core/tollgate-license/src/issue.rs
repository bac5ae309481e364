//! Building license payloads from typed values.

use chrono::{DateTime, NaiveDate, Utc};
use tollgate_codec::{FieldIndex, LicenseField, LicenseKeyPayload};
use uuid::Uuid;

use crate::error::LicenseResult;
use crate::types::{LicenseType, LicensedFeatures};

/// Typed builder for a [`LicenseKeyPayload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseKeyBuilder {
    license_type: LicenseType,
    product: Option<i16>,
    license_id: Option<i32>,
    license_guid: Option<Uuid>,
    valid_from: Option<NaiveDate>,
    valid_to: Option<NaiveDate>,
    subscription_end_date: Option<NaiveDate>,
    licensee: Option<String>,
    licensee_email: Option<String>,
    description: Option<String>,
    user_count: Option<i16>,
    features: Option<LicensedFeatures>,
    namespace_restriction: Option<String>,
    issued_at: Option<DateTime<Utc>>,
    comment: Option<String>,
    min_reader_version: Option<i16>,
}

impl LicenseKeyBuilder {
    #[must_use]
    pub fn new(license_type: LicenseType) -> Self {
        Self {
            license_type,
            product: None,
            license_id: None,
            license_guid: None,
            valid_from: None,
            valid_to: None,
            subscription_end_date: None,
            licensee: None,
            licensee_email: None,
            description: None,
            user_count: None,
            features: None,
            namespace_restriction: None,
            issued_at: None,
            comment: None,
            min_reader_version: None,
        }
    }

    #[must_use]
    pub fn product(mut self, product: i16) -> Self {
        self.product = Some(product);
        self
    }

    #[must_use]
    pub fn license_id(mut self, id: i32) -> Self {
        self.license_id = Some(id);
        self
    }

    #[must_use]
    pub fn license_guid(mut self, guid: Uuid) -> Self {
        self.license_guid = Some(guid);
        self
    }

    #[must_use]
    pub fn valid_from(mut self, date: NaiveDate) -> Self {
        self.valid_from = Some(date);
        self
    }

    #[must_use]
    pub fn valid_to(mut self, date: NaiveDate) -> Self {
        self.valid_to = Some(date);
        self
    }

    #[must_use]
    pub fn subscription_end_date(mut self, date: NaiveDate) -> Self {
        self.subscription_end_date = Some(date);
        self
    }

    #[must_use]
    pub fn licensee(mut self, licensee: impl Into<String>) -> Self {
        self.licensee = Some(licensee.into());
        self
    }

    #[must_use]
    pub fn licensee_email(mut self, email: impl Into<String>) -> Self {
        self.licensee_email = Some(email.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn user_count(mut self, count: i16) -> Self {
        self.user_count = Some(count);
        self
    }

    #[must_use]
    pub fn features(mut self, features: LicensedFeatures) -> Self {
        self.features = Some(features);
        self
    }

    #[must_use]
    pub fn namespace_restriction(mut self, namespace: impl Into<String>) -> Self {
        self.namespace_restriction = Some(namespace.into());
        self
    }

    #[must_use]
    pub fn issued_at(mut self, at: DateTime<Utc>) -> Self {
        self.issued_at = Some(at);
        self
    }

    /// Free-form note in a skippable field; older readers ignore it.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    #[must_use]
    pub fn min_reader_version(mut self, version: i16) -> Self {
        self.min_reader_version = Some(version);
        self
    }

    /// Builds the unsigned payload.
    ///
    /// # Errors
    ///
    /// Fails only if the field table and builder disagree on a type.
    pub fn build(&self) -> LicenseResult<LicenseKeyPayload> {
        let mut payload = LicenseKeyPayload::new();
        payload.set(FieldIndex::LICENSE_TYPE, LicenseField::Byte(self.license_type.code()))?;

        let optional = [
            (FieldIndex::PRODUCT, self.product.map(LicenseField::Int16)),
            (FieldIndex::LICENSE_ID, self.license_id.map(LicenseField::Int32)),
            (FieldIndex::LICENSE_GUID, self.license_guid.map(LicenseField::Guid)),
            (FieldIndex::VALID_FROM, self.valid_from.map(LicenseField::Date)),
            (FieldIndex::VALID_TO, self.valid_to.map(LicenseField::Date)),
            (
                FieldIndex::SUBSCRIPTION_END_DATE,
                self.subscription_end_date.map(LicenseField::Date),
            ),
            (FieldIndex::LICENSEE, self.licensee.clone().map(LicenseField::String)),
            (
                FieldIndex::LICENSEE_EMAIL,
                self.licensee_email.clone().map(LicenseField::String),
            ),
            (FieldIndex::DESCRIPTION, self.description.clone().map(LicenseField::String)),
            (FieldIndex::USER_COUNT, self.user_count.map(LicenseField::Int16)),
            (
                FieldIndex::FEATURES,
                self.features.map(|f| LicenseField::Int64(f.bits() as i64)),
            ),
            (
                FieldIndex::NAMESPACE_RESTRICTION,
                self.namespace_restriction.clone().map(LicenseField::String),
            ),
            (FieldIndex::ISSUED_AT, self.issued_at.map(LicenseField::DateTime)),
            (FieldIndex::COMMENT, self.comment.clone().map(LicenseField::String)),
            (
                FieldIndex::MIN_REQUIRED_READER_VERSION,
                self.min_reader_version.map(LicenseField::Int16),
            ),
        ];
        for (index, value) in optional {
            if let Some(value) = value {
                payload.set(index, value)?;
            }
        }
        Ok(payload)
    }
}
