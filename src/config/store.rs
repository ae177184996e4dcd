//! Persisted detector tunables.
//!
//! Two integers survive process restarts: the silence timeout and the
//! activation threshold. Reads are lock-free atomics so the capture loop can
//! snapshot them per buffer; writes clamp, update the atomics, and rewrite
//! the JSON file. A write landing between two buffers never disturbs an
//! in-flight segment: the detector only ever sees whole snapshots.

use super::defaults::{
    ACTIVATION_DB_RANGE, DEFAULT_ACTIVATION_DB, DEFAULT_MIN_SILENCE_SECS, MIN_SILENCE_SECS_RANGE,
};
use super::DetectorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Serialize, Deserialize)]
struct PersistedSettings {
    min_silence_secs: u64,
    activation_db: i64,
}

/// Live handle over the persisted tunables.
pub struct SettingsStore {
    path: PathBuf,
    min_silence_secs: AtomicU64,
    activation_db: AtomicI64,
}

impl SettingsStore {
    /// Load settings from `path`. A missing file yields the documented
    /// defaults; a corrupt file is logged and replaced by defaults;
    /// out-of-range values are clamped rather than rejected.
    pub fn load(path: PathBuf) -> Self {
        let persisted = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<PersistedSettings>(&raw) {
                Ok(persisted) => Some(persisted),
                Err(err) => {
                    warn!(path = %path.display(), %err, "corrupt settings file, using defaults");
                    None
                }
            },
            Err(_) => None,
        };
        let (secs, db) = match persisted {
            Some(p) => (
                clamp_u64(p.min_silence_secs, &MIN_SILENCE_SECS_RANGE, "min_silence_secs"),
                clamp_i64(p.activation_db, &ACTIVATION_DB_RANGE, "activation_db"),
            ),
            None => (DEFAULT_MIN_SILENCE_SECS, DEFAULT_ACTIVATION_DB),
        };
        Self {
            path,
            min_silence_secs: AtomicU64::new(secs),
            activation_db: AtomicI64::new(db),
        }
    }

    pub fn min_silence_secs(&self) -> u64 {
        self.min_silence_secs.load(Ordering::Relaxed)
    }

    pub fn activation_db(&self) -> i64 {
        self.activation_db.load(Ordering::Relaxed)
    }

    pub fn set_min_silence_secs(&self, secs: u64) {
        let clamped = clamp_u64(secs, &MIN_SILENCE_SECS_RANGE, "min_silence_secs");
        self.min_silence_secs.store(clamped, Ordering::Relaxed);
        self.persist();
    }

    pub fn set_activation_db(&self, db: i64) {
        let clamped = clamp_i64(db, &ACTIVATION_DB_RANGE, "activation_db");
        self.activation_db.store(clamped, Ordering::Relaxed);
        self.persist();
    }

    /// Snapshot for one classification step.
    pub fn snapshot(&self) -> DetectorConfig {
        DetectorConfig {
            activation_threshold_db: self.activation_db() as f64,
            silence_timeout: Duration::from_secs(self.min_silence_secs()),
        }
    }

    fn persist(&self) {
        let persisted = PersistedSettings {
            min_silence_secs: self.min_silence_secs(),
            activation_db: self.activation_db(),
        };
        let write = || -> anyhow::Result<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let json = serde_json::to_string_pretty(&persisted)?;
            fs::write(&self.path, json)?;
            Ok(())
        };
        if let Err(err) = write() {
            warn!(path = %self.path.display(), %err, "failed to persist settings");
        }
    }
}

fn clamp_u64(value: u64, range: &std::ops::RangeInclusive<u64>, label: &str) -> u64 {
    let clamped = value.clamp(*range.start(), *range.end());
    if clamped != value {
        warn!(label, value, clamped, "settings value out of range, clamped");
    }
    clamped
}

fn clamp_i64(value: i64, range: &std::ops::RangeInclusive<i64>, label: &str) -> i64 {
    let clamped = value.clamp(*range.start(), *range.end());
    if clamped != value {
        warn!(label, value, clamped, "settings value out of range, clamped");
    }
    clamped
}
