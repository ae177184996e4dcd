//! Documented defaults and valid ranges for the recorder's tunables.

use std::ops::RangeInclusive;
use std::path::PathBuf;

/// Continued silence required before an open segment closes (seconds).
pub const DEFAULT_MIN_SILENCE_SECS: u64 = 10;
pub const MIN_SILENCE_SECS_RANGE: RangeInclusive<u64> = 5..=30;

/// Loudness above which the detector considers audio "active" (dB-like units).
pub const DEFAULT_ACTIVATION_DB: i64 = 50;
pub const ACTIVATION_DB_RANGE: RangeInclusive<i64> = 45..=80;

/// Buffer channel capacity between the stream callback and the capture loop.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;
pub const CHANNEL_CAPACITY_RANGE: RangeInclusive<usize> = 8..=1024;

pub const SETTINGS_FILE_NAME: &str = "settings.json";

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("soundtrap")
}

/// Where recordings land unless `--save-dir` says otherwise.
pub fn default_save_dir() -> PathBuf {
    data_dir().join("recordings")
}

/// Where the persisted tunables live unless `--settings-file` says otherwise.
pub fn default_settings_path() -> PathBuf {
    data_dir().join(SETTINGS_FILE_NAME)
}
