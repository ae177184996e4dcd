//! Loudness measurement for raw PCM16 buffers.
//!
//! The score is a relative power metric, not calibrated SPL: mean of squared
//! sample values normalized by the buffer's byte length, on a `10 * log10`
//! scale. It lines up with the 45-80 "dB" activation range the settings
//! store exposes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Substituted when a buffer carries zero power, so threshold comparisons
/// never see NaN or negative infinity.
pub const SILENCE_FLOOR_DB: f64 = -100.0;

/// Loudness of one PCM16 buffer.
pub fn pcm_power_db(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return SILENCE_FLOOR_DB;
    }
    let sum: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    // Normalized by byte length (two bytes per sample), which is what the
    // activation-threshold scale was tuned against.
    let mean_square = sum / (samples.len() as f64 * 2.0);
    if mean_square <= 0.0 {
        return SILENCE_FLOOR_DB;
    }
    10.0 * mean_square.log10()
}

/// Lock-free latest-value cell for live loudness telemetry.
///
/// The capture thread stores a reading per buffer; observers poll at their
/// own pace. Intermediate readings may be missed by a slow observer, the
/// most recent one never is.
#[derive(Clone, Debug)]
pub struct LiveMeter {
    level_bits: Arc<AtomicU64>,
}

impl LiveMeter {
    pub fn new() -> Self {
        Self {
            level_bits: Arc::new(AtomicU64::new(SILENCE_FLOOR_DB.to_bits())),
        }
    }

    pub fn set_db(&self, db: f64) {
        self.level_bits.store(db.to_bits(), Ordering::Relaxed);
    }

    pub fn level_db(&self) -> f64 {
        f64::from_bits(self.level_bits.load(Ordering::Relaxed))
    }
}

impl Default for LiveMeter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_meter_defaults_to_floor() {
        let meter = LiveMeter::new();
        assert_eq!(meter.level_db(), SILENCE_FLOOR_DB);
    }

    #[test]
    fn live_meter_keeps_latest_reading() {
        let meter = LiveMeter::new();
        meter.set_db(52.0);
        meter.set_db(61.5);
        assert_eq!(meter.level_db(), 61.5);
    }

    #[test]
    fn all_zero_buffer_hits_the_floor() {
        let db = pcm_power_db(&[0i16; 1024]);
        assert_eq!(db, SILENCE_FLOOR_DB);
        assert!(db.is_finite());
    }

    #[test]
    fn empty_buffer_hits_the_floor() {
        assert_eq!(pcm_power_db(&[]), SILENCE_FLOOR_DB);
    }

    #[test]
    fn louder_buffers_score_higher() {
        let quiet = vec![100i16; 512];
        let loud = vec![10_000i16; 512];
        assert!(pcm_power_db(&loud) > pcm_power_db(&quiet));
    }

    #[test]
    fn full_scale_tone_lands_in_the_expected_range() {
        // Full-scale square wave: mean square = 32767^2 / 2 -> ~87 dB on this scale.
        let buf: Vec<i16> = (0..640)
            .map(|i| if i % 2 == 0 { 32_767 } else { -32_767 })
            .collect();
        let db = pcm_power_db(&buf);
        assert!((86.0..89.0).contains(&db), "got {db}");
    }
}
