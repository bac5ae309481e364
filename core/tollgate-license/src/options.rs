//! Licensing settings: file locations, evaluation windows and I/O retry policy.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LicenseResult;
use crate::retry::RetryPolicy;

/// Application directory name under the platform config/data roots.
const APP_DIR: &str = "tollgate";

/// Length of an evaluation license, in days.
pub const DEFAULT_EVALUATION_PERIOD_DAYS: u32 = 45;

/// Days after an evaluation ends before another may start.
pub const DEFAULT_NO_EVALUATION_PERIOD_DAYS: u32 = 120;

/// Settings for the licensing components. Missing JSON keys take defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LicensingOptions {
    /// User-visible licensing configuration (registered license keys).
    pub license_store_path: PathBuf,
    /// Evaluation record, kept apart from the user-visible store.
    pub evaluation_record_path: PathBuf,
    /// Directory holding named-mutex lock files.
    pub lock_dir: PathBuf,
    pub evaluation_period_days: u32,
    pub no_evaluation_period_days: u32,
    /// Total attempts for a contended store read-modify-write.
    pub io_retry_attempts: u32,
    /// Fixed delay between attempts.
    pub io_retry_delay_ms: u64,
}

impl Default for LicensingOptions {
    fn default() -> Self {
        let config_dir = dirs::config_dir().unwrap_or_else(std::env::temp_dir);
        let data_dir = dirs::data_local_dir().unwrap_or_else(std::env::temp_dir);
        Self {
            license_store_path: config_dir.join(APP_DIR).join("licensing.json"),
            evaluation_record_path: data_dir.join(APP_DIR).join("evaluation.json"),
            lock_dir: std::env::temp_dir().join("tollgate-locks"),
            evaluation_period_days: DEFAULT_EVALUATION_PERIOD_DAYS,
            no_evaluation_period_days: DEFAULT_NO_EVALUATION_PERIOD_DAYS,
            io_retry_attempts: 10,
            io_retry_delay_ms: 100,
        }
    }
}

impl LicensingOptions {
    /// Places every file under one directory. Used by tests and portable installs.
    #[must_use]
    pub fn in_directory(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            license_store_path: dir.join("licensing.json"),
            evaluation_record_path: dir.join("evaluation.json"),
            lock_dir: dir.join("locks"),
            ..Self::default()
        }
    }

    /// Parses options from JSON, filling omitted keys with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> LicenseResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.io_retry_attempts.max(1),
            delay: Duration::from_millis(self.io_retry_delay_ms),
        }
    }

    #[must_use]
    pub fn evaluation_period(&self) -> chrono::Days {
        chrono::Days::new(u64::from(self.evaluation_period_days))
    }

    #[must_use]
    pub fn no_evaluation_period(&self) -> chrono::Days {
        chrono::Days::new(u64::from(self.no_evaluation_period_days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let options = LicensingOptions::from_json(r#"{"evaluationPeriodDays": 30}"#).unwrap();
        assert_eq!(options.evaluation_period_days, 30);
        assert_eq!(options.no_evaluation_period_days, DEFAULT_NO_EVALUATION_PERIOD_DAYS);
    }

    #[test]
    fn retry_policy_has_at_least_one_attempt() {
        let options = LicensingOptions {
            io_retry_attempts: 0,
            ..LicensingOptions::default()
        };
        assert_eq!(options.retry_policy().attempts, 1);
    }

    #[test]
    fn in_directory_layout() {
        let options = LicensingOptions::in_directory("/tmp/x");
        assert_eq!(options.license_store_path, PathBuf::from("/tmp/x/licensing.json"));
        assert_eq!(options.lock_dir, PathBuf::from("/tmp/x/locks"));
    }
}
