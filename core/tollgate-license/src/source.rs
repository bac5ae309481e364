//! License sources: where candidate licenses come from.

use tracing::{debug, warn};

use crate::configuration::LicensingConfigurationStore;
use crate::context::LicensingContext;
use crate::issue::LicenseKeyBuilder;
use crate::license::{License, LicenseFactory};
use crate::retry::RetryPolicy;
use crate::types::{LicenseType, LicensedFeatures};

/// Environment variables set by common CI systems and build agents.
pub const UNATTENDED_ENVIRONMENT_VARIABLES: &[&str] = &[
    "CI",
    "TF_BUILD",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "JENKINS_URL",
    "TEAMCITY_VERSION",
    "BUILDKITE",
    "CIRCLECI",
    "APPVEYOR",
    "TRAVIS",
];

/// A provider of zero or more licenses.
///
/// `licenses` is called at most once per consumption query and may be
/// consumed only partially.
pub trait LicenseSource: Send + Sync {
    /// Identifies the source in traces.
    fn id(&self) -> &str;

    /// Lazily yields this source's licenses.
    fn licenses(&self) -> Box<dyn Iterator<Item = License> + '_>;
}

/// Licenses given as key strings (command line, environment, host API).
pub struct ExplicitLicenseSource {
    id: String,
    factory: LicenseFactory,
    keys: Vec<String>,
}

impl ExplicitLicenseSource {
    pub fn new(id: impl Into<String>, factory: LicenseFactory, keys: Vec<String>) -> Self {
        Self {
            id: id.into(),
            factory,
            keys,
        }
    }
}

impl LicenseSource for ExplicitLicenseSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn licenses(&self) -> Box<dyn Iterator<Item = License> + '_> {
        Box::new(
            self.keys
                .iter()
                .filter_map(move |key| create_or_warn(&self.factory, &self.id, key)),
        )
    }
}

/// Licenses the user registered in the licensing configuration file.
pub struct ConfigurationLicenseSource {
    factory: LicenseFactory,
    store: LicensingConfigurationStore,
    retry: RetryPolicy,
}

impl ConfigurationLicenseSource {
    pub const ID: &'static str = "configuration";

    #[must_use]
    pub fn new(context: &LicensingContext) -> Self {
        Self {
            factory: context.factory().clone(),
            store: context.license_store(),
            retry: context.retry_policy(),
        }
    }
}

impl LicenseSource for ConfigurationLicenseSource {
    fn id(&self) -> &str {
        Self::ID
    }

    fn licenses(&self) -> Box<dyn Iterator<Item = License> + '_> {
        let configuration = match self.retry.run("read license store", || self.store.load()) {
            Ok(configuration) => configuration,
            Err(e) => {
                warn!(path = %self.store.path().display(), error = %e, "Cannot read license store");
                return Box::new(std::iter::empty());
            }
        };
        Box::new(
            configuration
                .all_license_keys()
                .into_iter()
                .filter_map(move |key| create_or_warn(&self.factory, Self::ID, &key)),
        )
    }
}

/// A default license for build servers, where nobody can register one.
pub struct UnattendedLicenseSource {
    factory: LicenseFactory,
    enabled: bool,
}

impl UnattendedLicenseSource {
    pub const ID: &'static str = "unattended";

    #[must_use]
    pub fn new(factory: LicenseFactory, enabled: bool) -> Self {
        Self { factory, enabled }
    }

    /// Enabled when the process environment looks like a CI agent.
    #[must_use]
    pub fn from_environment(factory: LicenseFactory) -> Self {
        let enabled = is_unattended_environment(|name| std::env::var_os(name).is_some());
        Self::new(factory, enabled)
    }
}

impl LicenseSource for UnattendedLicenseSource {
    fn id(&self) -> &str {
        Self::ID
    }

    fn licenses(&self) -> Box<dyn Iterator<Item = License> + '_> {
        if !self.enabled {
            return Box::new(std::iter::empty());
        }
        let license = LicenseKeyBuilder::new(LicenseType::Unattended)
            .features(LicensedFeatures::ALL)
            .description("Unattended build license")
            .build()
            .and_then(|payload| self.factory.create_in_process(&payload));
        match license {
            Ok(license) => Box::new(std::iter::once(license)),
            Err(e) => {
                warn!(error = %e, "Cannot create unattended license");
                Box::new(std::iter::empty())
            }
        }
    }
}

/// Returns true if any CI marker variable is set, according to `is_set`.
pub fn is_unattended_environment(is_set: impl Fn(&str) -> bool) -> bool {
    UNATTENDED_ENVIRONMENT_VARIABLES.iter().any(|name| is_set(name))
}

fn create_or_warn(factory: &LicenseFactory, source: &str, key: &str) -> Option<License> {
    match factory.try_create(key) {
        Ok(license) => {
            debug!(source, key = license.key(), "License loaded");
            Some(license)
        }
        Err(e) => {
            warn!(source, error = %e, "Ignoring license entry");
            None
        }
    }
}
