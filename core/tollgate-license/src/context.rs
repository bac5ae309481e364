//! Explicit dependencies shared by licensing components.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::configuration::LicensingConfigurationStore;
use crate::fs::{FileSystem, LocalFileSystem};
use crate::license::LicenseFactory;
use crate::options::LicensingOptions;
use crate::retry::RetryPolicy;
use crate::trust::IssuerKey;

/// Clock, file system, license factory and options, passed to every
/// component that needs them.
#[derive(Debug, Clone)]
pub struct LicensingContext {
    clock: Arc<dyn Clock>,
    fs: Arc<dyn FileSystem>,
    factory: LicenseFactory,
    options: LicensingOptions,
}

impl LicensingContext {
    /// A context backed by the system clock and local disk.
    #[must_use]
    pub fn new(options: LicensingOptions) -> Self {
        Self {
            clock: Arc::new(SystemClock),
            fs: Arc::new(LocalFileSystem),
            factory: LicenseFactory::default(),
            options,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    #[must_use]
    pub fn with_factory(mut self, factory: LicenseFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Trusts licenses signed by `issuer`, e.g. self-issued evaluations.
    #[must_use]
    pub fn with_trusted_issuer(mut self, issuer: &IssuerKey) -> Self {
        self.factory = self.factory.trusting(issuer.key_id(), issuer.public_key());
        self
    }

    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    #[must_use]
    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    #[must_use]
    pub fn factory(&self) -> &LicenseFactory {
        &self.factory
    }

    #[must_use]
    pub fn options(&self) -> &LicensingOptions {
        &self.options
    }

    /// The user-visible license store.
    #[must_use]
    pub fn license_store(&self) -> LicensingConfigurationStore {
        LicensingConfigurationStore::new(Arc::clone(&self.fs), &self.options.license_store_path)
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.options.retry_policy()
    }
}

impl Default for LicensingContext {
    fn default() -> Self {
        Self::new(LicensingOptions::default())
    }
}
