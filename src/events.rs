//! Telemetry surface between the capture engine and its observers.
//!
//! Lifecycle events travel over an unbounded channel so the capture thread
//! never blocks on a slow subscriber and segment events are never dropped.
//! Per-buffer loudness goes through the lossy [`LiveMeter`] instead: the
//! latest reading is always visible, intermediate ones may be skipped.

use crate::audio::{ClosedSegment, LiveMeter};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::PathBuf;

/// Events emitted by the capture engine, in classification order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    /// The capture loop is running and reading audio.
    CaptureStarted,
    /// Loudness crossed the activation threshold; a segment file is open.
    SegmentStarted { path: PathBuf },
    /// A segment finished (silence timeout, or capture stop with a segment
    /// open). Carries the final file summary.
    SegmentCompleted(ClosedSegment),
    /// The capture loop exited after a stop request. Carries how many
    /// buffers the stream callback dropped because the loop fell behind.
    CaptureStopped { dropped_buffers: usize },
    /// The capture loop could not start or lost its audio stream.
    CaptureFailed(String),
}

/// Producer half handed to the capture engine.
#[derive(Clone)]
pub struct EventSink {
    tx: Sender<RecorderEvent>,
    meter: LiveMeter,
}

impl EventSink {
    pub fn emit(&self, event: RecorderEvent) {
        let _ = self.tx.send(event);
    }

    pub fn loudness(&self, db: f64) {
        self.meter.set_db(db);
    }

    pub fn meter(&self) -> &LiveMeter {
        &self.meter
    }
}

/// Create the telemetry pair: a sink for the engine and a receiver for the
/// observer (UI layer, CLI, tests).
pub fn event_channel(meter: LiveMeter) -> (EventSink, Receiver<RecorderEvent>) {
    let (tx, rx) = unbounded();
    (EventSink { tx, meter }, rx)
}
