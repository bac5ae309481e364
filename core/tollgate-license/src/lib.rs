//! Licensing for Tollgate.
//!
//! This module handles:
//! - Creating licenses from key strings and checking their Ed25519 signatures
//! - Registration data (display) and consumption data (feature checks)
//! - Deciding whether a feature may be used in a namespace across all license sources
//! - Self-service evaluation licenses with a cooldown between evaluations
//!
//! # Design Principles
//!
//! - **Soft failures**: bad input never panics; malformed keys still produce a
//!   [`License`] whose projections fail
//! - **Explicit dependencies**: clock, file system and factory travel in a
//!   [`LicensingContext`]; there are no globals
//! - **Cross-process safety**: the license store is only rewritten under a
//!   [`NamedMutex`], with bounded retry on file contention
//!
//! # License Key Format
//!
//! Keys are formatted as `<version>-<base32 payload>`; see `tollgate_codec`.
//! The payload ends with an Ed25519 signature over the bytes before it.

mod clock;
mod configuration;
mod consumption;
mod context;
mod data;
mod error;
mod evaluation;
mod fs;
mod issue;
mod license;
mod lock;
mod options;
mod retry;
mod source;
mod trust;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use configuration::{LicensingConfiguration, LicensingConfigurationStore};
pub use consumption::{ConsumptionDecision, ConsumptionManager};
pub use context::LicensingContext;
pub use data::{namespace_matches, LicenseConsumptionData, LicenseRegistrationData};
pub use error::{LicenseError, LicenseResult};
pub use evaluation::{Eligibility, EvaluationRecord, EvaluationRegistrar, RegistrationOutcome};
pub use fs::{is_transient_io_error, FileSystem, LocalFileSystem};
pub use issue::LicenseKeyBuilder;
pub use license::{License, LicenseFactory};
pub use lock::{NamedMutex, NamedMutexGuard};
pub use options::{
    LicensingOptions, DEFAULT_EVALUATION_PERIOD_DAYS, DEFAULT_NO_EVALUATION_PERIOD_DAYS,
};
pub use retry::{busy_error, RetryPolicy};
pub use source::{
    is_unattended_environment, ConfigurationLicenseSource, ExplicitLicenseSource, LicenseSource,
    UnattendedLicenseSource, UNATTENDED_ENVIRONMENT_VARIABLES,
};
pub use trust::{IssuerKey, KeyRing, TrustPolicy, PRODUCTION_KEY_ID, REVOKED_LICENSE_IDS};
pub use types::{LicenseType, LicensedFeatures};
