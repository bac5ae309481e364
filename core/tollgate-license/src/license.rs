//! Parsed licenses and the factory that creates them from key strings.
//!
//! Creating a license never fails on a malformed key: anything that is not
//! empty and not a URL becomes a [`License`]. A key that does not decode
//! yields a license whose projections both fail, so callers decide whether
//! and how to report it.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tollgate_codec::{decode_key, encode_key, DecodedKey, FieldIndex, KeyFormatVersion, LicenseKeyPayload};
use tracing::debug;
use url::Url;

use crate::data::{LicenseConsumptionData, LicenseRegistrationData};
use crate::error::{LicenseError, LicenseResult};
use crate::trust::TrustPolicy;
use crate::types::{LicenseType, LicensedFeatures};

/// Where a license came from, which decides whether it needs a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Origin {
    /// Supplied as text from outside the process.
    KeyString,
    /// Built in-process (unattended default); never crossed a trust boundary.
    InProcess,
}

/// An immutable license built from a key string.
///
/// Equality and hashing follow the decoded payload and the origin, so the
/// same license written with different grouping or case compares equal,
/// while an external copy of an in-process license does not. Keys that do
/// not decode compare by their text.
#[derive(Clone)]
pub struct License {
    key: String,
    decoded: Result<Arc<DecodedKey>, String>,
    trust: Arc<TrustPolicy>,
    origin: Origin,
}

impl License {
    /// Returns the key text (trimmed).
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns true if the key decoded.
    #[must_use]
    pub fn is_structurally_valid(&self) -> bool {
        self.decoded.is_ok()
    }

    /// Returns the decoding error for keys that did not decode.
    #[must_use]
    pub fn decode_error(&self) -> Option<&str> {
        self.decoded.as_ref().err().map(String::as_str)
    }

    /// Returns the decoded payload. Nothing here is verified.
    #[must_use]
    pub fn payload(&self) -> Option<&LicenseKeyPayload> {
        self.decoded.as_ref().ok().map(|key| key.payload())
    }

    #[must_use]
    pub fn format_version(&self) -> Option<KeyFormatVersion> {
        self.decoded.as_ref().ok().map(|key| key.version())
    }

    /// Returns the declared namespace restriction without verifying the key.
    ///
    /// Used to order candidates; grants always go through
    /// [`try_get_consumption_data`](Self::try_get_consumption_data).
    #[must_use]
    pub fn namespace_restriction(&self) -> Option<&str> {
        self.payload()?
            .get_str(FieldIndex::NAMESPACE_RESTRICTION)
            .filter(|ns| !ns.is_empty())
    }

    #[must_use]
    pub fn license_id(&self) -> Option<i32> {
        self.payload()?.get_i32(FieldIndex::LICENSE_ID)
    }

    #[must_use]
    pub fn licensee(&self) -> Option<&str> {
        self.payload()?.get_str(FieldIndex::LICENSEE)
    }

    #[must_use]
    pub fn valid_to(&self) -> Option<chrono::NaiveDate> {
        self.payload()?.get_date(FieldIndex::VALID_TO)
    }

    fn decoded(&self) -> LicenseResult<&DecodedKey> {
        self.decoded
            .as_deref()
            .map_err(|message| LicenseError::InvalidKeyFormat(message.clone()))
    }

    /// Returns the display view. Does not check the signature.
    ///
    /// A missing or unrecognised license type shows as
    /// [`LicenseType::Unknown`].
    ///
    /// # Errors
    ///
    /// Fails if the key did not decode.
    pub fn try_get_registration_data(&self) -> LicenseResult<LicenseRegistrationData> {
        let payload = self.decoded()?.payload();
        let license_type = license_type_of(payload).unwrap_or_else(|e| {
            debug!(key = %self.key, error = %e, "License type not recognised");
            LicenseType::Unknown
        });
        let valid_to = payload.get_date(FieldIndex::VALID_TO);
        let licensee = payload.get_str(FieldIndex::LICENSEE).map(str::to_string);
        let description = payload
            .get_str(FieldIndex::DESCRIPTION)
            .map(str::to_string)
            .unwrap_or_else(|| default_description(license_type, licensee.as_deref()));

        Ok(LicenseRegistrationData {
            license_key: self.key.clone(),
            license_id: payload.get_i32(FieldIndex::LICENSE_ID),
            license_guid: payload.get_guid(FieldIndex::LICENSE_GUID),
            license_type,
            description,
            licensee,
            valid_from: payload.get_date(FieldIndex::VALID_FROM),
            valid_to,
            perpetual: valid_to.is_none(),
            subscription_end_date: payload.get_date(FieldIndex::SUBSCRIPTION_END_DATE),
        })
    }

    /// Returns the runtime view, after checking signature and revocation.
    ///
    /// # Errors
    ///
    /// Fails if the key did not decode, is unsigned or badly signed, names an
    /// unknown key, is revoked, or has no valid license type.
    pub fn try_get_consumption_data(&self) -> LicenseResult<LicenseConsumptionData> {
        let key = self.decoded()?;
        if self.origin == Origin::KeyString {
            self.trust.verify_signature(key)?;
        }

        let payload = key.payload();
        let license_id = payload.get_i32(FieldIndex::LICENSE_ID);
        if let Some(id) = license_id.filter(|id| self.trust.is_revoked(*id)) {
            return Err(LicenseError::Revoked(id));
        }

        let license_type = license_type_of(payload)?;
        let features = payload
            .get_i64(FieldIndex::FEATURES)
            .map(|bits| LicensedFeatures(bits as u64))
            .unwrap_or_else(|| license_type.default_features());

        Ok(LicenseConsumptionData {
            license_id,
            license_type,
            features,
            namespace_restriction: self.namespace_restriction().map(str::to_string),
            valid_from: payload.get_date(FieldIndex::VALID_FROM),
            valid_to: payload.get_date(FieldIndex::VALID_TO),
        })
    }
}

fn license_type_of(payload: &LicenseKeyPayload) -> LicenseResult<LicenseType> {
    let code = payload
        .get_byte(FieldIndex::LICENSE_TYPE)
        .ok_or(LicenseError::MissingField("license type"))?;
    LicenseType::from_code(code)
        .ok_or_else(|| LicenseError::InvalidPayload(format!("unknown license type {code}")))
}

fn default_description(license_type: LicenseType, licensee: Option<&str>) -> String {
    match licensee {
        Some(licensee) => format!("{license_type} License for {licensee}"),
        None => format!("{license_type} License"),
    }
}

impl PartialEq for License {
    fn eq(&self, other: &Self) -> bool {
        if self.origin != other.origin {
            return false;
        }
        match (&self.decoded, &other.decoded) {
            (Ok(a), Ok(b)) => a.payload() == b.payload(),
            (Err(_), Err(_)) => self.key == other.key,
            _ => false,
        }
    }
}

impl Eq for License {}

impl Hash for License {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.origin.hash(state);
        match &self.decoded {
            Ok(key) => key.payload().hash(state),
            Err(_) => self.key.hash(state),
        }
    }
}

impl fmt::Debug for License {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("License")
            .field("key", &self.key)
            .field("valid", &self.decoded.is_ok())
            .field("origin", &self.origin)
            .finish()
    }
}

/// Creates [`License`] instances that share one trust policy.
#[derive(Debug, Clone, Default)]
pub struct LicenseFactory {
    trust: Arc<TrustPolicy>,
}

impl LicenseFactory {
    #[must_use]
    pub fn new(trust: TrustPolicy) -> Self {
        Self {
            trust: Arc::new(trust),
        }
    }

    #[must_use]
    pub fn trust(&self) -> &TrustPolicy {
        &self.trust
    }

    /// A factory with the same policy that also verifies keys signed with
    /// `public_key` under `key_id`.
    #[must_use]
    pub fn trusting(&self, key_id: u8, public_key: [u8; 32]) -> Self {
        Self::new(self.trust.as_ref().clone().with_key(key_id, public_key))
    }

    /// Creates a license from key text.
    ///
    /// Malformed keys still produce a license; see the module docs.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Empty`] for blank input and
    /// [`LicenseError::LicenseServerNotSupported`] for URLs.
    pub fn try_create(&self, key: &str) -> LicenseResult<License> {
        let key = key.trim();
        if key.is_empty() {
            return Err(LicenseError::Empty);
        }
        if is_license_server_url(key) {
            return Err(LicenseError::LicenseServerNotSupported);
        }

        let decoded = decode_key(key).map(Arc::new).map_err(|e| {
            debug!(error = %e, "License key did not decode");
            e.to_string()
        });

        Ok(License {
            key: key.to_string(),
            decoded,
            trust: Arc::clone(&self.trust),
            origin: Origin::KeyString,
        })
    }

    /// Creates a license built inside this process; it needs no signature.
    ///
    /// # Errors
    ///
    /// Fails if the payload does not encode.
    pub fn create_in_process(&self, payload: &LicenseKeyPayload) -> LicenseResult<License> {
        let key = encode_key(KeyFormatVersion::CURRENT, payload)?;
        let decoded = decode_key(&key)?;
        Ok(License {
            key,
            decoded: Ok(Arc::new(decoded)),
            trust: Arc::clone(&self.trust),
            origin: Origin::InProcess,
        })
    }
}

fn is_license_server_url(key: &str) -> bool {
    Url::parse(key).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_detection() {
        assert!(is_license_server_url("https://licensing.example.com/lease"));
        assert!(is_license_server_url("http://localhost:8080"));
        assert!(!is_license_server_url("2-ABCDEFG"));
        assert!(!is_license_server_url("SomeInvalidLicenseString"));
    }

    #[test]
    fn invalid_licenses_compare_by_text() {
        let factory = LicenseFactory::default();
        let a = factory.try_create("garbage").unwrap();
        let b = factory.try_create(" garbage ").unwrap();
        let c = factory.try_create("other").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
