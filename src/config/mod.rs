//! Command-line parsing, validation, and the persisted settings store.

mod defaults;
mod store;
#[cfg(test)]
mod tests;

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

pub use defaults::{
    default_save_dir, default_settings_path, ACTIVATION_DB_RANGE, CHANNEL_CAPACITY_RANGE,
    DEFAULT_ACTIVATION_DB, DEFAULT_CHANNEL_CAPACITY, DEFAULT_MIN_SILENCE_SECS,
    MIN_SILENCE_SECS_RANGE, SETTINGS_FILE_NAME,
};
pub use store::SettingsStore;

/// CLI options for the soundtrap recorder.
#[derive(Debug, Parser, Clone)]
#[command(about = "Voice-activated audio recorder", author, version)]
pub struct AppConfig {
    /// Preferred audio input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Directory recordings are stored in
    #[arg(long = "save-dir")]
    pub save_dir: Option<PathBuf>,

    /// Print stored recordings and exit
    #[arg(long = "list-recordings", default_value_t = false)]
    pub list_recordings: bool,

    /// Settings file holding the persisted tunables
    #[arg(long = "settings-file")]
    pub settings_file: Option<PathBuf>,

    /// Activation threshold override (dB-like units, 45-80)
    #[arg(long = "activation-db")]
    pub activation_db: Option<i64>,

    /// Silence timeout override (seconds, 5-30)
    #[arg(long = "min-silence-secs")]
    pub min_silence_secs: Option<u64>,

    /// Buffer channel capacity between the stream callback and the capture loop
    #[arg(long = "channel-capacity", default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "SOUNDTRAP_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "SOUNDTRAP_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,
}

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check structural options and clamp the detector tunables into their
    /// documented ranges. Out-of-range tunables are usable after clamping,
    /// so they warn instead of failing.
    pub fn validate(&mut self) -> Result<()> {
        if !CHANNEL_CAPACITY_RANGE.contains(&self.channel_capacity) {
            bail!(
                "--channel-capacity must be between {} and {}, got {}",
                CHANNEL_CAPACITY_RANGE.start(),
                CHANNEL_CAPACITY_RANGE.end(),
                self.channel_capacity
            );
        }
        if let Some(db) = self.activation_db {
            let clamped = db.clamp(*ACTIVATION_DB_RANGE.start(), *ACTIVATION_DB_RANGE.end());
            if clamped != db {
                warn!(requested = db, clamped, "--activation-db out of range, clamped");
                self.activation_db = Some(clamped);
            }
        }
        if let Some(secs) = self.min_silence_secs {
            let clamped = secs.clamp(
                *MIN_SILENCE_SECS_RANGE.start(),
                *MIN_SILENCE_SECS_RANGE.end(),
            );
            if clamped != secs {
                warn!(
                    requested = secs,
                    clamped, "--min-silence-secs out of range, clamped"
                );
                self.min_silence_secs = Some(clamped);
            }
        }
        Ok(())
    }

    pub fn save_dir(&self) -> PathBuf {
        self.save_dir.clone().unwrap_or_else(default_save_dir)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.settings_file
            .clone()
            .unwrap_or_else(default_settings_path)
    }
}

/// Immutable snapshot of the detector tunables, read fresh at every
/// classification step and at each timer arm. An in-flight silence timer
/// keeps the duration it was armed with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    pub activation_threshold_db: f64,
    pub silence_timeout: Duration,
}
