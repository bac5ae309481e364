//! Derived views of a license: registration data for display and storage,
//! consumption data for runtime feature checks.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{LicenseType, LicensedFeatures};

/// What `list`/`show` style surfaces display about a license.
///
/// Available for any structurally valid key, signed or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRegistrationData {
    pub license_key: String,
    pub license_id: Option<i32>,
    pub license_guid: Option<Uuid>,
    pub license_type: LicenseType,
    pub description: String,
    pub licensee: Option<String>,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
    /// True when the license has no end date.
    pub perpetual: bool,
    pub subscription_end_date: Option<NaiveDate>,
}

impl LicenseRegistrationData {
    /// Returns true if the license ended before `today`.
    #[must_use]
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.valid_to.is_some_and(|valid_to| valid_to < today)
    }

    /// Returns true if `today` lies inside the validity window.
    #[must_use]
    pub fn is_valid_on(&self, today: NaiveDate) -> bool {
        within(self.valid_from, self.valid_to, today)
    }
}

/// What runtime feature checks need; only produced for trusted keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseConsumptionData {
    pub license_id: Option<i32>,
    pub license_type: LicenseType,
    pub features: LicensedFeatures,
    /// Consumers outside this namespace tree get nothing from the license.
    pub namespace_restriction: Option<String>,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
}

impl LicenseConsumptionData {
    #[must_use]
    pub fn is_valid_on(&self, today: NaiveDate) -> bool {
        within(self.valid_from, self.valid_to, today)
    }

    /// Returns true if code in `consumer_namespace` may use this license.
    #[must_use]
    pub fn allows_namespace(&self, consumer_namespace: &str) -> bool {
        match &self.namespace_restriction {
            None => true,
            Some(restriction) => namespace_matches(restriction, consumer_namespace),
        }
    }

    /// Returns true if this license alone satisfies the request.
    #[must_use]
    pub fn grants(&self, required: LicensedFeatures, consumer_namespace: &str, today: NaiveDate) -> bool {
        self.features.contains(required)
            && self.allows_namespace(consumer_namespace)
            && self.is_valid_on(today)
    }
}

/// `consumer` equals `restriction` or is nested under it (`A.B` is under `A`, `AB` is not).
#[must_use]
pub fn namespace_matches(restriction: &str, consumer: &str) -> bool {
    match consumer.strip_prefix(restriction) {
        Some("") => true,
        Some(rest) => rest.starts_with('.'),
        None => false,
    }
}

fn within(from: Option<NaiveDate>, to: Option<NaiveDate>, today: NaiveDate) -> bool {
    from.is_none_or(|from| from <= today) && to.is_none_or(|to| today <= to)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn namespace_nesting() {
        assert!(namespace_matches("Acme", "Acme"));
        assert!(namespace_matches("Acme", "Acme.Billing"));
        assert!(namespace_matches("Acme.Billing", "Acme.Billing.Core"));
        assert!(!namespace_matches("Acme", "AcmeCorp"));
        assert!(!namespace_matches("Acme.Billing", "Acme"));
        assert!(!namespace_matches("Acme", "Other.Acme"));
    }

    #[test]
    fn validity_window_is_inclusive() {
        let data = LicenseConsumptionData {
            license_id: None,
            license_type: LicenseType::Personal,
            features: LicensedFeatures::ALL,
            namespace_restriction: None,
            valid_from: Some(date(2026, 1, 1)),
            valid_to: Some(date(2026, 1, 31)),
        };
        assert!(!data.is_valid_on(date(2025, 12, 31)));
        assert!(data.is_valid_on(date(2026, 1, 1)));
        assert!(data.is_valid_on(date(2026, 1, 31)));
        assert!(!data.is_valid_on(date(2026, 2, 1)));
    }

    #[test]
    fn grants_requires_all_conditions() {
        let data = LicenseConsumptionData {
            license_id: Some(1),
            license_type: LicenseType::OpenSource,
            features: LicensedFeatures::CORE,
            namespace_restriction: Some("Acme".into()),
            valid_from: None,
            valid_to: None,
        };
        let today = date(2026, 6, 1);
        assert!(data.grants(LicensedFeatures::CORE, "Acme.Tools", today));
        assert!(!data.grants(LicensedFeatures::CORE, "Other", today));
        assert!(!data.grants(LicensedFeatures::DEBUGGER, "Acme", today));
    }
}
