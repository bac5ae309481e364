//! Self-service evaluation licenses.
//!
//! A user may register one evaluation license per window: the license runs
//! for the evaluation period, then a cooldown must pass before the next one.
//! Eligibility is read from an evaluation record kept apart from the
//! user-visible license store, so deleting a key from the store does not
//! reset the window.
//!
//! Several processes may register at once. The store read-modify-write runs
//! under a named mutex derived from the store path and is retried while
//! another process holds the file.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::LicensingContext;
use crate::data::LicenseRegistrationData;
use crate::error::{LicenseError, LicenseResult};
use crate::issue::LicenseKeyBuilder;
use crate::lock::NamedMutex;
use crate::trust::IssuerKey;
use crate::types::{LicenseType, LicensedFeatures};

/// Persisted evaluation history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRecord {
    /// The most recently registered evaluation license.
    pub license_key: Option<String>,
}

/// Whether a new evaluation license may be registered today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    /// An evaluation license is still running.
    WithinEvaluation { valid_to: NaiveDate },
    /// The last evaluation ended too recently.
    WithinCooldown { eligible_after: NaiveDate },
    /// The evaluation record cannot be trusted; registration is refused.
    Blocked { reason: String },
}

impl Eligibility {
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }

    /// Human-readable explanation for an ineligible user.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Eligible => None,
            Self::WithinEvaluation { valid_to } => Some(format!(
                "an evaluation license is active until {valid_to}"
            )),
            Self::WithinCooldown { eligible_after } => {
                Some(format!("try again after {eligible_after}"))
            }
            Self::Blocked { reason } => Some(reason.clone()),
        }
    }
}

impl fmt::Display for Eligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            Some(reason) => f.write_str(&reason),
            None => f.write_str("eligible"),
        }
    }
}

/// Result of a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// A new evaluation license was added to the store.
    Registered(String),
    /// A valid evaluation license was already in the store; nothing was written.
    AlreadyRegistered(String),
    Ineligible(Eligibility),
}

impl RegistrationOutcome {
    /// Returns true if a usable evaluation license is registered.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        !matches!(self, Self::Ineligible(_))
    }

    /// Key of the registered license, if any.
    #[must_use]
    pub fn license_key(&self) -> Option<&str> {
        match self {
            Self::Registered(key) | Self::AlreadyRegistered(key) => Some(key),
            Self::Ineligible(_) => None,
        }
    }
}

/// Registers evaluation licenses signed by `issuer`.
///
/// With [`new`](Self::new) the issuer's public key must already be in the
/// factory's key ring for the licenses to be consumable;
/// [`trusting_issuer`](Self::trusting_issuer) adds it.
#[derive(Debug, Clone)]
pub struct EvaluationRegistrar {
    context: LicensingContext,
    issuer: IssuerKey,
}

impl EvaluationRegistrar {
    #[must_use]
    pub fn new(context: LicensingContext, issuer: IssuerKey) -> Self {
        Self { context, issuer }
    }

    /// A registrar whose context also trusts `issuer`. Pass
    /// [`context`](Self::context) to the consumption manager so registered
    /// licenses verify.
    #[must_use]
    pub fn trusting_issuer(context: LicensingContext, issuer: IssuerKey) -> Self {
        let context = context.with_trusted_issuer(&issuer);
        Self { context, issuer }
    }

    #[must_use]
    pub fn context(&self) -> &LicensingContext {
        &self.context
    }

    /// Reads the evaluation record and decides eligibility for today.
    ///
    /// A missing record means the user never evaluated. A record that cannot
    /// be read or does not hold a dated evaluation license blocks
    /// registration.
    #[must_use]
    pub fn eligibility(&self) -> Eligibility {
        let options = self.context.options();
        let path = &options.evaluation_record_path;
        let fs = self.context.file_system();
        if !fs.exists(path) {
            return Eligibility::Eligible;
        }

        let text = match self
            .context
            .retry_policy()
            .run("read evaluation record", || Ok(fs.read_to_string(path)?))
        {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read evaluation record");
                return blocked("the evaluation record cannot be read");
            }
        };

        let record: EvaluationRecord = match serde_json::from_str(&text) {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Evaluation record is malformed");
                return blocked("the evaluation record is malformed");
            }
        };

        let Some(key) = record.license_key.as_deref() else {
            return blocked("the evaluation record holds no license");
        };
        let data = match self
            .context
            .factory()
            .try_create(key)
            .and_then(|license| license.try_get_registration_data())
        {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "Evaluation record holds an unreadable license");
                return blocked("the evaluation record holds an invalid license");
            }
        };
        if data.license_type != LicenseType::Evaluation {
            return blocked("the evaluation record holds a non-evaluation license");
        }
        let Some(valid_to) = data.valid_to else {
            return blocked("the evaluation record holds an undated license");
        };

        let today = self.context.clock().today();
        if today <= valid_to {
            return Eligibility::WithinEvaluation { valid_to };
        }
        match valid_to.checked_add_days(options.no_evaluation_period()) {
            Some(eligible_after) if today <= eligible_after => {
                Eligibility::WithinCooldown { eligible_after }
            }
            Some(_) => Eligibility::Eligible,
            None => blocked("the evaluation record is dated beyond the calendar"),
        }
    }

    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.eligibility().is_eligible()
    }

    /// Registers an evaluation license if the user is eligible.
    ///
    /// Ineligibility is a normal outcome, not an error. While an evaluation
    /// is running, a repeated call reports the registered license.
    ///
    /// # Errors
    ///
    /// Fails if the license cannot be issued, the mutex cannot be taken, or
    /// the store cannot be read or written within the retry budget.
    pub fn register(&self) -> LicenseResult<RegistrationOutcome> {
        let eligibility = self.eligibility();
        match eligibility {
            Eligibility::Eligible => {}
            Eligibility::WithinEvaluation { .. } => {
                return self.find_registered().map(|found| match found {
                    Some(key) => RegistrationOutcome::AlreadyRegistered(key),
                    None => RegistrationOutcome::Ineligible(eligibility),
                });
            }
            _ => return Ok(RegistrationOutcome::Ineligible(eligibility)),
        }

        let key = self.issue_license()?;
        let outcome = self.store_license(&key)?;
        if let Some(registered) = outcome.license_key() {
            self.write_record(registered);
        }
        Ok(outcome)
    }

    /// Registers an evaluation license, reporting only whether one is now
    /// registered. Failures are logged.
    pub fn try_register_license(&self) -> bool {
        match self.register() {
            Ok(RegistrationOutcome::Registered(key)) => {
                info!(key = %key, "Evaluation license registered");
                true
            }
            Ok(RegistrationOutcome::AlreadyRegistered(key)) => {
                info!(key = %key, "Evaluation license already registered");
                true
            }
            Ok(RegistrationOutcome::Ineligible(eligibility)) => {
                info!(reason = %eligibility, "Not eligible for an evaluation license");
                false
            }
            Err(e) => {
                warn!(error = %e, "Evaluation license registration failed");
                false
            }
        }
    }

    fn issue_license(&self) -> LicenseResult<String> {
        let clock = self.context.clock();
        let today = clock.today();
        let valid_to = today
            .checked_add_days(self.context.options().evaluation_period())
            .ok_or_else(|| LicenseError::InvalidPayload("evaluation period out of range".into()))?;
        let payload = LicenseKeyBuilder::new(LicenseType::Evaluation)
            .license_guid(Uuid::new_v4())
            .valid_from(today)
            .valid_to(valid_to)
            .features(LicensedFeatures::ALL)
            .issued_at(clock.now())
            .description("Evaluation License")
            .build()?;
        self.issuer.issue(payload)
    }

    /// Adds `key` to the store unless a valid evaluation license beat us to it.
    fn store_license(&self, key: &str) -> LicenseResult<RegistrationOutcome> {
        let options = self.context.options();
        let store = self.context.license_store();
        let today = self.context.clock().today();

        let mut mutex = NamedMutex::for_file(&options.lock_dir, &options.license_store_path)?;
        let _guard = mutex.lock()?;
        self.context.retry_policy().run("register evaluation license", || {
            let mut configuration = store.load()?;
            if let Some(existing) = configuration
                .all_license_keys()
                .into_iter()
                .find(|existing| self.is_active_evaluation(existing, today))
            {
                debug!(key = %existing, "Evaluation license registered concurrently");
                return Ok(RegistrationOutcome::AlreadyRegistered(existing));
            }
            configuration.add_license(key);
            store.save(&configuration)?;
            Ok(RegistrationOutcome::Registered(key.to_string()))
        })
    }

    fn find_registered(&self) -> LicenseResult<Option<String>> {
        let options = self.context.options();
        let store = self.context.license_store();
        let today = self.context.clock().today();

        let mut mutex = NamedMutex::for_file(&options.lock_dir, &options.license_store_path)?;
        let _guard = mutex.lock()?;
        let configuration = self
            .context
            .retry_policy()
            .run("read license store", || store.load())?;
        Ok(configuration
            .all_license_keys()
            .into_iter()
            .find(|key| self.is_active_evaluation(key, today)))
    }

    fn is_active_evaluation(&self, key: &str, today: NaiveDate) -> bool {
        self.context
            .factory()
            .try_create(key)
            .and_then(|license| license.try_get_registration_data())
            .is_ok_and(|data: LicenseRegistrationData| {
                data.license_type == LicenseType::Evaluation && data.is_valid_on(today)
            })
    }

    /// Overwrites the evaluation record. Failure leaves the store untouched.
    fn write_record(&self, key: &str) {
        let path = &self.context.options().evaluation_record_path;
        let fs = self.context.file_system();
        let record = EvaluationRecord {
            license_key: Some(key.to_string()),
        };
        let result = serde_json::to_string_pretty(&record)
            .map_err(LicenseError::from)
            .and_then(|json| {
                self.context.retry_policy().run("write evaluation record", || {
                    if let Some(parent) = path.parent() {
                        fs.create_dir_all(parent)?;
                    }
                    fs.write(path, &json)?;
                    Ok(())
                })
            });
        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "Cannot write evaluation record");
        }
    }
}

fn blocked(reason: &str) -> Eligibility {
    Eligibility::Blocked {
        reason: reason.to_string(),
    }
}
