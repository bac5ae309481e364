//! Signature verification, signing keys and revocation.
//!
//! Keys are Ed25519. Every V2 license names the key that signed it
//! (SignatureKeyId), so keys rotate by adding a new id to the [`KeyRing`]
//! while old ids stay to verify licenses already issued. V1 licenses predate
//! rotation and are always checked against key id 0.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use tollgate_codec::{encode_key, DecodedKey, FieldIndex, KeyFormatVersion, LicenseField, LicenseKeyPayload};

use crate::error::{LicenseError, LicenseResult};

/// Key id of the original production key.
pub const PRODUCTION_KEY_ID: u8 = 0;

/// Embedded Ed25519 public key for production license verification (32 bytes).
const PRODUCTION_PUBLIC_KEY: [u8; 32] = [
    78, 251, 43, 221, 113, 43, 187, 0, 182, 218, 247, 209, 13, 236, 196, 220,
    110, 118, 127, 211, 208, 185, 196, 37, 126, 40, 117, 242, 47, 99, 95, 202,
];

/// License ids that must no longer be honoured.
pub const REVOKED_LICENSE_IDS: &[i32] = &[1_000_481, 1_002_207, 1_004_913, 1_011_350];

/// Public keys by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRing {
    keys: BTreeMap<u8, [u8; 32]>,
}

impl KeyRing {
    /// An empty ring.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The ring compiled into this build.
    #[must_use]
    pub fn embedded() -> Self {
        Self::new().with_key(PRODUCTION_KEY_ID, PRODUCTION_PUBLIC_KEY)
    }

    #[must_use]
    pub fn with_key(mut self, key_id: u8, public_key: [u8; 32]) -> Self {
        self.insert(key_id, public_key);
        self
    }

    pub fn insert(&mut self, key_id: u8, public_key: [u8; 32]) {
        self.keys.insert(key_id, public_key);
    }

    #[must_use]
    pub fn contains(&self, key_id: u8) -> bool {
        self.keys.contains_key(&key_id)
    }

    /// Malformed key bytes surface here as [`LicenseError::InvalidPublicKey`],
    /// not at ring construction.
    fn verifying_key(&self, key_id: u8) -> LicenseResult<VerifyingKey> {
        let bytes = self
            .keys
            .get(&key_id)
            .ok_or(LicenseError::UnknownSignatureKey(key_id))?;
        VerifyingKey::from_bytes(bytes).map_err(|_| LicenseError::InvalidPublicKey(key_id))
    }
}

/// Trust decisions: which keys verify licenses and which licenses are revoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustPolicy {
    key_ring: KeyRing,
    revoked: BTreeSet<i32>,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self::new(KeyRing::embedded())
    }
}

impl TrustPolicy {
    /// A policy using `key_ring` and the built-in revocation list.
    #[must_use]
    pub fn new(key_ring: KeyRing) -> Self {
        Self {
            key_ring,
            revoked: REVOKED_LICENSE_IDS.iter().copied().collect(),
        }
    }

    /// Adds ids to the revocation list.
    #[must_use]
    pub fn with_revoked(mut self, ids: impl IntoIterator<Item = i32>) -> Self {
        self.revoked.extend(ids);
        self
    }

    /// Adds a verification key to the ring.
    #[must_use]
    pub fn with_key(mut self, key_id: u8, public_key: [u8; 32]) -> Self {
        self.key_ring.insert(key_id, public_key);
        self
    }

    #[must_use]
    pub fn key_ring(&self) -> &KeyRing {
        &self.key_ring
    }

    #[must_use]
    pub fn is_revoked(&self, license_id: i32) -> bool {
        self.revoked.contains(&license_id)
    }

    /// Verifies the key's signature against the ring.
    ///
    /// # Errors
    ///
    /// Returns a trust error: missing signature or key id, unknown or
    /// malformed key, fields outside the signed range, or a bad signature.
    pub fn verify_signature(&self, key: &DecodedKey) -> LicenseResult<()> {
        let payload = key.payload();
        let signature = payload
            .get_bytes(FieldIndex::SIGNATURE)
            .ok_or(LicenseError::MissingSignature)?;
        let key_id = if key.version().has_signature_key_id() {
            payload
                .get_byte(FieldIndex::SIGNATURE_KEY_ID)
                .ok_or(LicenseError::MissingField("signature key id"))?
        } else {
            PRODUCTION_KEY_ID
        };
        let message = key.signed_bytes().ok_or(LicenseError::InvalidSignature)?;

        let verifying_key = self.key_ring.verifying_key(key_id)?;
        let signature = Signature::from_slice(signature).map_err(|_| LicenseError::InvalidSignature)?;
        verifying_key
            .verify(message, &signature)
            .map_err(|_| LicenseError::InvalidSignature)
    }
}

/// A signing key with the id licenses will name.
#[derive(Clone)]
pub struct IssuerKey {
    key_id: u8,
    signing_key: SigningKey,
}

impl fmt::Debug for IssuerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuerKey")
            .field("key_id", &self.key_id)
            .field("public_key", &hex::encode(self.public_key()))
            .finish_non_exhaustive()
    }
}

impl IssuerKey {
    /// Creates an issuer from a raw 32-byte secret.
    #[must_use]
    pub fn from_bytes(key_id: u8, secret: &[u8; 32]) -> Self {
        Self {
            key_id,
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    /// Generates a new random issuer key.
    #[must_use]
    pub fn generate(key_id: u8) -> Self {
        Self {
            key_id,
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    #[must_use]
    pub fn key_id(&self) -> u8 {
        self.key_id
    }

    /// Returns the raw 32-byte public key, for adding to a [`KeyRing`].
    #[must_use]
    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Signs `payload` and encodes it as a current-version key string.
    ///
    /// # Errors
    ///
    /// Fails if a field does not fit its wire encoding.
    pub fn issue(&self, payload: LicenseKeyPayload) -> LicenseResult<String> {
        self.issue_with_version(KeyFormatVersion::CURRENT, payload)
    }

    /// Signs `payload` as a key of the given format version.
    ///
    /// # Errors
    ///
    /// Fails if a field does not fit its wire encoding.
    pub fn issue_with_version(
        &self,
        version: KeyFormatVersion,
        mut payload: LicenseKeyPayload,
    ) -> LicenseResult<String> {
        payload.remove(FieldIndex::SIGNATURE);
        if version.has_signature_key_id() {
            payload.set(FieldIndex::SIGNATURE_KEY_ID, LicenseField::Byte(self.key_id))?;
        } else {
            payload.remove(FieldIndex::SIGNATURE_KEY_ID);
        }

        let message = payload.encode_signable()?;
        let signature = self.signing_key.sign(&message);
        payload.set(
            FieldIndex::SIGNATURE,
            LicenseField::ByteBuffer(signature.to_bytes().to_vec()),
        )?;
        Ok(encode_key(version, &payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_codec::decode_key;

    fn payload() -> LicenseKeyPayload {
        LicenseKeyPayload::new()
            .with(FieldIndex::LICENSE_ID, LicenseField::Int32(77))
            .unwrap()
    }

    #[test]
    fn embedded_key_is_well_formed() {
        assert!(KeyRing::embedded().verifying_key(PRODUCTION_KEY_ID).is_ok());
    }

    #[test]
    fn issued_key_verifies() {
        let issuer = IssuerKey::generate(3);
        let policy = TrustPolicy::new(KeyRing::new().with_key(3, issuer.public_key()));
        let key = decode_key(&issuer.issue(payload()).unwrap()).unwrap();
        policy.verify_signature(&key).unwrap();
    }

    #[test]
    fn unknown_key_id() {
        let issuer = IssuerKey::generate(9);
        let key = decode_key(&issuer.issue(payload()).unwrap()).unwrap();
        assert!(matches!(
            TrustPolicy::default().verify_signature(&key),
            Err(LicenseError::UnknownSignatureKey(9))
        ));
    }

    #[test]
    fn rotated_ring_keeps_old_keys() {
        let old = IssuerKey::generate(0);
        let new = IssuerKey::generate(1);
        let ring = KeyRing::new()
            .with_key(0, old.public_key())
            .with_key(1, new.public_key());
        let policy = TrustPolicy::new(ring);
        for issuer in [&old, &new] {
            let key = decode_key(&issuer.issue(payload()).unwrap()).unwrap();
            assert!(policy.verify_signature(&key).is_ok());
        }
    }

    #[test]
    fn malformed_public_key_is_typed_error() {
        // Not a valid curve point encoding.
        let mut bad = [0xFFu8; 32];
        bad[31] = 0x7F;
        let issuer = IssuerKey::generate(4);
        let policy = TrustPolicy::new(KeyRing::new().with_key(4, bad));
        let key = decode_key(&issuer.issue(payload()).unwrap()).unwrap();
        assert!(policy.verify_signature(&key).is_err());
    }

    #[test]
    fn debug_hides_secret() {
        let issuer = IssuerKey::from_bytes(2, &[7u8; 32]);
        let debug = format!("{issuer:?}");
        assert!(debug.contains("key_id: 2"));
        assert!(!debug.contains("signing_key"));
    }
}
