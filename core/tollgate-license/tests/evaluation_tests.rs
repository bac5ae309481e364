mod common;

use std::sync::Arc;
use std::thread;

use chrono::Duration;
use common::{init_tracing, manual_clock, test_context, test_issuer, MemoryFileSystem};
use pretty_assertions::assert_eq;
use tollgate_license::{
    Clock, ConfigurationLicenseSource, ConsumptionManager, Eligibility, EvaluationRecord,
    EvaluationRegistrar, IssuerKey, LicenseFactory, LicenseType, LicensedFeatures,
    LicensingConfiguration, LicensingContext, LocalFileSystem, ManualClock, RegistrationOutcome, DEFAULT_EVALUATION_PERIOD_DAYS,
    DEFAULT_NO_EVALUATION_PERIOD_DAYS,
};

fn registrar(context: &LicensingContext) -> EvaluationRegistrar {
    EvaluationRegistrar::new(context.clone(), test_issuer())
}

fn stored_keys(context: &LicensingContext) -> Vec<String> {
    context.license_store().load().unwrap().all_license_keys()
}

fn evaluation_keys(context: &LicensingContext) -> Vec<String> {
    stored_keys(context)
        .into_iter()
        .filter(|key| {
            context
                .factory()
                .try_create(key)
                .and_then(|license| license.try_get_registration_data())
                .is_ok_and(|data| data.license_type == LicenseType::Evaluation)
        })
        .collect()
}

fn days(n: u32) -> Duration {
    Duration::days(i64::from(n))
}

struct Fixture {
    _dir: tempfile::TempDir,
    clock: Arc<ManualClock>,
    fs: Arc<MemoryFileSystem>,
    context: LicensingContext,
}

fn fixture() -> Fixture {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let clock = manual_clock();
    let fs = MemoryFileSystem::new();
    let context = test_context(dir.path(), &clock, fs.clone());
    Fixture {
        _dir: dir,
        clock,
        fs,
        context,
    }
}

#[test]
fn first_registration_succeeds() {
    let f = fixture();
    let registrar = registrar(&f.context);
    assert_eq!(registrar.eligibility(), Eligibility::Eligible);
    assert!(registrar.try_register_license());

    let keys = evaluation_keys(&f.context);
    assert_eq!(keys.len(), 1);

    let data = f
        .context
        .factory()
        .try_create(&keys[0])
        .unwrap()
        .try_get_registration_data()
        .unwrap();
    let today = f.clock.today();
    assert_eq!(data.valid_from, Some(today));
    assert_eq!(data.valid_to, Some(today + days(DEFAULT_EVALUATION_PERIOD_DAYS)));

    let record: EvaluationRecord = serde_json::from_str(
        &f.fs
            .contents(&f.context.options().evaluation_record_path)
            .unwrap(),
    )
    .unwrap();
    assert_eq!(record.license_key.as_deref(), Some(keys[0].as_str()));
}

#[test]
fn registered_license_is_consumable() {
    let f = fixture();
    assert!(registrar(&f.context).try_register_license());

    let manager = ConsumptionManager::new(Arc::clone(&f.clock) as Arc<dyn Clock>)
        .with_source(ConfigurationLicenseSource::new(&f.context));
    assert!(manager.can_consume_features(LicensedFeatures::ALL, "Acme"));
}

#[test]
fn trusting_registrar_makes_its_licenses_consumable() {
    let f = fixture();
    let context = f.context.clone().with_factory(LicenseFactory::default());
    let registrar = EvaluationRegistrar::trusting_issuer(context.clone(), IssuerKey::generate(5));
    assert!(registrar.try_register_license());

    let consumable = |context: &LicensingContext| {
        ConsumptionManager::new(Arc::clone(&f.clock) as Arc<dyn Clock>)
            .with_source(ConfigurationLicenseSource::new(context))
            .can_consume_features(LicensedFeatures::ALL, "Acme")
    };
    assert!(consumable(registrar.context()));
    assert!(!consumable(&context));
}

#[test]
fn retry_during_evaluation_is_idempotent() {
    let f = fixture();
    let registrar = registrar(&f.context);
    assert!(registrar.try_register_license());
    let first = evaluation_keys(&f.context);

    assert!(matches!(
        registrar.eligibility(),
        Eligibility::WithinEvaluation { .. }
    ));
    assert!(!registrar.is_eligible());
    let outcome = registrar.register().unwrap();
    assert_eq!(outcome, RegistrationOutcome::AlreadyRegistered(first[0].clone()));
    assert!(registrar.try_register_license());
    assert_eq!(evaluation_keys(&f.context), first);
}

#[test]
fn cooldown_blocks_registration() {
    let f = fixture();
    let registrar = registrar(&f.context);
    assert!(registrar.try_register_license());

    f.clock.advance(days(
        DEFAULT_EVALUATION_PERIOD_DAYS + DEFAULT_NO_EVALUATION_PERIOD_DAYS / 2,
    ));
    let eligibility = registrar.eligibility();
    assert!(matches!(eligibility, Eligibility::WithinCooldown { .. }));
    assert!(eligibility.reason().unwrap().starts_with("try again after "));
    assert!(!registrar.try_register_license());
    assert_eq!(evaluation_keys(&f.context).len(), 1);
}

#[test]
fn registration_reopens_after_cooldown() {
    let f = fixture();
    let registrar = registrar(&f.context);
    assert!(registrar.try_register_license());
    let first_valid_to = f.clock.today() + days(DEFAULT_EVALUATION_PERIOD_DAYS);

    f.clock.advance(days(
        DEFAULT_EVALUATION_PERIOD_DAYS + DEFAULT_NO_EVALUATION_PERIOD_DAYS,
    ));
    assert!(!registrar.is_eligible());

    f.clock.advance(days(1));
    assert!(registrar.is_eligible());
    assert!(matches!(
        registrar.register().unwrap(),
        RegistrationOutcome::Registered(_)
    ));

    let keys = evaluation_keys(&f.context);
    assert_eq!(keys.len(), 2);
    let second = f
        .context
        .factory()
        .try_create(&keys[1])
        .unwrap()
        .try_get_registration_data()
        .unwrap();
    assert!(second.valid_to.unwrap() > first_valid_to);
}

#[test]
fn busy_store_is_retried_and_written_once() {
    let f = fixture();
    let store_path = f.context.options().license_store_path.clone();
    f.fs.block_writes(&store_path, 3);

    assert!(registrar(&f.context).try_register_license());
    assert_eq!(evaluation_keys(&f.context).len(), 1);
    // One store write plus one record write.
    assert_eq!(f.fs.write_count(), 2);
}

#[test]
fn store_that_stays_busy_fails_registration() {
    let f = fixture();
    let store_path = f.context.options().license_store_path.clone();
    f.fs.block_writes(&store_path, 1_000);

    let registrar = registrar(&f.context);
    let err = registrar.register().unwrap_err();
    assert!(err.is_transient());
    assert!(!registrar.try_register_license());
    assert!(f.fs.contents(&store_path).is_none());
}

#[test]
fn record_write_failure_keeps_license() {
    let f = fixture();
    let record_path = f.context.options().evaluation_record_path.clone();
    f.fs.fail_writes(&record_path);

    assert!(registrar(&f.context).try_register_license());
    assert_eq!(evaluation_keys(&f.context).len(), 1);
    assert!(f.fs.contents(&record_path).is_none());
}

#[test]
fn existing_store_entries_are_kept() {
    let f = fixture();
    let mut configuration = LicensingConfiguration::default();
    configuration.add_license("2-SOMEOTHERKEY");
    f.context.license_store().save(&configuration).unwrap();

    assert!(registrar(&f.context).try_register_license());
    let keys = stored_keys(&f.context);
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0], "2-SOMEOTHERKEY");
}

#[test]
fn malformed_record_blocks_registration() {
    let f = fixture();
    let record_path = f.context.options().evaluation_record_path.clone();
    let registrar = registrar(&f.context);

    for contents in [
        "not json",
        "{}",
        r#"{"licenseKey":"SomeInvalidLicenseString"}"#,
    ] {
        f.fs.put(&record_path, contents);
        assert!(
            matches!(registrar.eligibility(), Eligibility::Blocked { .. }),
            "record {contents:?} should block"
        );
        assert!(!registrar.try_register_license());
    }
    assert!(stored_keys(&f.context).is_empty());
}

#[test]
fn record_with_wrong_license_type_blocks_registration() {
    let f = fixture();
    let key = common::sign(tollgate_license::LicenseKeyBuilder::new(
        LicenseType::Professional,
    ));
    f.fs.put(
        &f.context.options().evaluation_record_path,
        &format!(r#"{{"licenseKey":"{key}"}}"#),
    );
    assert!(matches!(
        registrar(&f.context).eligibility(),
        Eligibility::Blocked { .. }
    ));
}

#[test]
fn concurrent_registrations_write_one_license() {
    let dir = tempfile::tempdir().unwrap();
    let clock = manual_clock();
    let context = test_context(dir.path(), &clock, Arc::new(LocalFileSystem));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registrar = registrar(&context);
            thread::spawn(move || registrar.try_register_license())
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }

    assert_eq!(evaluation_keys(&context).len(), 1);
    assert!(context.options().evaluation_record_path.exists());
}
