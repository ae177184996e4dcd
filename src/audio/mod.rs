//! Audio capture and voice-activity segmentation pipeline.
//!
//! Microphone audio is normalized to 16 kHz mono PCM16, metered per buffer,
//! and segmented into timestamp-named recordings whenever loudness crosses
//! the activation threshold, closing after the configured span of silence.

/// Capture sample rate (Hz). Buffers are mono PCM16 at this rate throughout.
pub const TARGET_RATE: u32 = 16_000;

mod capture;
mod detector;
mod meter;
mod source;
mod timer;
mod writer;

pub use capture::{start_capture, CaptureHandle};
pub use detector::DetectorState;
pub use meter::{pcm_power_db, LiveMeter, SILENCE_FLOOR_DB};
pub use source::Microphone;
pub use writer::{ClosedSegment, SegmentStore, SegmentWriter, SEGMENT_EXTENSION};
