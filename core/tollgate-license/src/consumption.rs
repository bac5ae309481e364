//! Answers "may feature X be used in namespace Y" across all license sources.
//!
//! Sources are pulled in registration order, each at most once and only
//! until the request is granted. Every distinct license is asked for its
//! consumption data at most once per query. Within each pulled source,
//! unrestricted licenses are tried before namespace-restricted ones, so a
//! scoped grant is only relied on when no unrestricted license so far covers
//! the request.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::clock::Clock;
use crate::context::LicensingContext;
use crate::license::License;
use crate::source::{ConfigurationLicenseSource, LicenseSource, UnattendedLicenseSource};
use crate::types::LicensedFeatures;

/// Outcome of a consumption query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumptionDecision {
    pub granted: bool,
    /// Key of the license that granted the request.
    pub granted_by: Option<String>,
    /// Keys of every license asked for consumption data, in order.
    pub evaluated: Vec<String>,
}

/// Resolves feature requests against an ordered list of license sources.
pub struct ConsumptionManager {
    sources: Vec<Box<dyn LicenseSource>>,
    clock: Arc<dyn Clock>,
}

impl ConsumptionManager {
    /// A manager with no sources.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            sources: Vec::new(),
            clock,
        }
    }

    /// The standard setup: registered licenses, then the build-server default.
    #[must_use]
    pub fn for_context(context: &LicensingContext) -> Self {
        Self::new(Arc::clone(context.clock()))
            .with_source(ConfigurationLicenseSource::new(context))
            .with_source(UnattendedLicenseSource::from_environment(context.factory().clone()))
    }

    #[must_use]
    pub fn with_source(mut self, source: impl LicenseSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Returns true if some license grants `required` to `consumer_namespace`.
    #[must_use]
    pub fn can_consume_features(&self, required: LicensedFeatures, consumer_namespace: &str) -> bool {
        self.evaluate(required, consumer_namespace).granted
    }

    /// Runs a consumption query and reports which licenses were consulted.
    #[must_use]
    pub fn evaluate(&self, required: LicensedFeatures, consumer_namespace: &str) -> ConsumptionDecision {
        let today = self.clock.today();
        let mut seen: HashSet<License> = HashSet::new();
        let mut evaluated = Vec::new();

        let try_license = |license: &License, evaluated: &mut Vec<String>| -> bool {
            evaluated.push(license.key().to_string());
            match license.try_get_consumption_data() {
                Ok(data) if data.grants(required, consumer_namespace, today) => true,
                Ok(data) => {
                    debug!(
                        key = license.key(),
                        features = data.features.bits(),
                        namespace = data.namespace_restriction.as_deref(),
                        "License does not grant the request"
                    );
                    false
                }
                Err(e) => {
                    debug!(key = license.key(), error = %e, "License cannot be consumed");
                    false
                }
            }
        };

        for source in &self.sources {
            debug!(source = source.id(), "Pulling licenses");
            let (restricted, unrestricted): (Vec<License>, Vec<License>) = source
                .licenses()
                .filter(|license| {
                    let fresh = seen.insert(license.clone());
                    if !fresh {
                        debug!(source = source.id(), key = license.key(), "Skipping duplicate license");
                    }
                    fresh
                })
                .partition(|license| license.namespace_restriction().is_some());

            for license in unrestricted.iter().chain(&restricted) {
                if try_license(license, &mut evaluated) {
                    return granted(license, evaluated, required, consumer_namespace);
                }
            }
        }

        debug!(
            features = required.bits(),
            namespace = consumer_namespace,
            evaluated = evaluated.len(),
            "No license grants the request"
        );
        ConsumptionDecision {
            granted: false,
            granted_by: None,
            evaluated,
        }
    }
}

fn granted(
    license: &License,
    evaluated: Vec<String>,
    required: LicensedFeatures,
    consumer_namespace: &str,
) -> ConsumptionDecision {
    debug!(
        key = license.key(),
        features = required.bits(),
        namespace = consumer_namespace,
        "License grants the request"
    );
    ConsumptionDecision {
        granted: true,
        granted_by: Some(license.key().to_string()),
        evaluated,
    }
}
