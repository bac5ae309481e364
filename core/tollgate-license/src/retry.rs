//! Bounded retry for file operations that lose a race with another process.
//!
//! Only transient contention errors are retried (see
//! [`LicenseError::is_transient`]); everything else is returned at once.

use std::time::Duration;

use tracing::warn;

use crate::error::{LicenseError, LicenseResult};

/// Attempt cap and fixed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// Runs `op` until it succeeds, fails non-transiently, or attempts run out.
    ///
    /// # Errors
    ///
    /// Returns the last error once attempts are exhausted, or the first
    /// non-transient error.
    pub fn run<T, F>(&self, operation: &str, mut op: F) -> LicenseResult<T>
    where
        F: FnMut() -> LicenseResult<T>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < attempts => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts = attempts,
                        "File is busy, retrying in {:?}: {}",
                        self.delay,
                        err
                    );
                    std::thread::sleep(self.delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay: Duration::from_millis(100),
        }
    }
}

/// Shorthand for an I/O contention error, mostly for test doubles.
#[must_use]
pub fn busy_error(message: &str) -> LicenseError {
    LicenseError::Io(std::io::Error::new(std::io::ErrorKind::ResourceBusy, message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn quick(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn retries_until_success() {
        let calls = Cell::new(0);
        let result = quick(5).run("test", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(busy_error("busy"))
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn exhausts_attempts() {
        let calls = Cell::new(0);
        let result: LicenseResult<()> = quick(4).run("test", || {
            calls.set(calls.get() + 1);
            Err(busy_error("busy"))
        });
        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn does_not_retry_permanent_errors() {
        let calls = Cell::new(0);
        let result: LicenseResult<()> = quick(4).run("test", || {
            calls.set(calls.get() + 1);
            Err(LicenseError::MissingField("license type"))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
