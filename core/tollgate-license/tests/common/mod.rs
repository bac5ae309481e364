//! Shared test helpers for license tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use tollgate_license::{
    Clock, FileSystem, IssuerKey, KeyRing, License, LicenseFactory, LicenseKeyBuilder,
    LicenseSource, LicensingContext, LicensingOptions, ManualClock, TrustPolicy,
};

/// Key id the test issuer signs with.
pub const TEST_KEY_ID: u8 = 1;

/// Returns a deterministic issuer from a fixed seed.
pub fn test_issuer() -> IssuerKey {
    let seed: [u8; 32] = [
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        25, 26, 27, 28, 29, 30, 31, 32,
    ];
    IssuerKey::from_bytes(TEST_KEY_ID, &seed)
}

/// A trust policy that knows only the test issuer (plus the built-in revocations).
pub fn test_trust() -> TrustPolicy {
    TrustPolicy::new(KeyRing::new().with_key(TEST_KEY_ID, test_issuer().public_key()))
}

pub fn test_factory() -> LicenseFactory {
    LicenseFactory::new(test_trust())
}

/// Signs a builder's payload with the test issuer.
pub fn sign(builder: LicenseKeyBuilder) -> String {
    test_issuer()
        .issue(builder.build().unwrap())
        .unwrap()
}

pub fn license(key: &str) -> License {
    test_factory().try_create(key).unwrap()
}

/// 2026-03-02 09:30 UTC.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap()
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(t0()))
}

/// A context over `dir` with a manual clock, the test factory and fast retries.
pub fn test_context(
    dir: &Path,
    clock: &Arc<ManualClock>,
    fs: Arc<dyn FileSystem>,
) -> LicensingContext {
    let mut options = LicensingOptions::in_directory(dir);
    options.io_retry_delay_ms = 1;
    LicensingContext::new(options)
        .with_clock(Arc::clone(clock) as Arc<dyn Clock>)
        .with_file_system(fs)
        .with_factory(test_factory())
}

/// In-memory file system that can refuse a number of writes as "busy".
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<HashMap<PathBuf, String>>,
    blocked_writes: Mutex<HashMap<PathBuf, usize>>,
    failing: Mutex<Vec<PathBuf>>,
    writes: AtomicUsize,
}

impl MemoryFileSystem {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The next `count` writes to `path` fail with `ResourceBusy`.
    pub fn block_writes(&self, path: &Path, count: usize) {
        self.blocked_writes
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), count);
    }

    /// Every write to `path` fails with `PermissionDenied`.
    pub fn fail_writes(&self, path: &Path) {
        self.failing.lock().unwrap().push(path.to_path_buf());
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn contents(&self, path: &Path) -> Option<String> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn put(&self, path: &Path, contents: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), contents.to_string());
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        if self.failing.lock().unwrap().iter().any(|p| p == path) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        if let Some(remaining) = self.blocked_writes.lock().unwrap().get_mut(path) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(io::Error::new(io::ErrorKind::ResourceBusy, "file is locked"));
            }
        }
        self.put(path, contents);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}

/// A source over fixed keys that counts how often it is pulled.
pub struct CountingSource {
    id: String,
    keys: Vec<String>,
    pulls: Arc<AtomicUsize>,
}

impl CountingSource {
    pub fn new(id: &str, keys: Vec<String>) -> (Self, Arc<AtomicUsize>) {
        let pulls = Arc::new(AtomicUsize::new(0));
        let source = Self {
            id: id.to_string(),
            keys,
            pulls: Arc::clone(&pulls),
        };
        (source, pulls)
    }
}

impl LicenseSource for CountingSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn licenses(&self) -> Box<dyn Iterator<Item = License> + '_> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        Box::new(self.keys.iter().map(|key| license(key)))
    }
}

/// Routes `tracing` output to the test harness when `RUST_LOG` is set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
