//! Voice-activity segmentation state machine.
//!
//! Consumes (buffer, loudness) pairs in strict arrival order on the capture
//! thread and drives the segment writer and silence timer. Timer firings
//! re-enter through the pipeline channel stamped with a generation number;
//! a firing that was already queued when the timer was cancelled carries a
//! stale generation and is discarded, so cancel-vs-fire resolves at a single
//! point on the capture thread.

use super::capture::PipelineEvent;
use super::timer::SilenceTimer;
use super::writer::{SegmentStore, SegmentWriter};
use crate::config::DetectorConfig;
use crate::events::{EventSink, RecorderEvent};
use crossbeam_channel::Sender;
use std::time::Duration;
use tracing::{debug, warn};

/// Exactly one segment is open iff the state is not `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Idle,
    Recording,
    /// A silence timer is armed; the segment closes when it fires unless a
    /// loud buffer cancels it first.
    RecordingPendingClose,
}

pub(crate) struct ActivityDetector {
    state: DetectorState,
    writer: Option<SegmentWriter>,
    timer: Option<SilenceTimer>,
    timer_generation: u64,
    store: SegmentStore,
    events: EventSink,
    timer_tx: Sender<PipelineEvent>,
}

impl ActivityDetector {
    pub(crate) fn new(
        store: SegmentStore,
        events: EventSink,
        timer_tx: Sender<PipelineEvent>,
    ) -> Self {
        Self {
            state: DetectorState::Idle,
            writer: None,
            timer: None,
            timer_generation: 0,
            store,
            events,
            timer_tx,
        }
    }

    /// Classify one buffer. While a segment is open the buffer is appended
    /// before the transition is evaluated: silence is still audio and stays
    /// in the file until it closes.
    pub(crate) fn on_buffer(&mut self, buffer: &[i16], db: f64, cfg: DetectorConfig) {
        match self.state {
            DetectorState::Idle => {
                if db > cfg.activation_threshold_db {
                    self.open_segment(buffer);
                }
            }
            DetectorState::Recording => {
                self.append(buffer);
                if db <= cfg.activation_threshold_db {
                    self.arm_timer(cfg.silence_timeout);
                    self.state = DetectorState::RecordingPendingClose;
                }
            }
            DetectorState::RecordingPendingClose => {
                self.append(buffer);
                if db > cfg.activation_threshold_db {
                    self.cancel_timer();
                    self.state = DetectorState::Recording;
                }
                // Continued silence leaves the armed timer running with the
                // duration it was armed with.
            }
        }
    }

    /// A silence timer fired. Stale firings (cancelled or superseded timers)
    /// are ignored.
    pub(crate) fn on_silence_elapsed(&mut self, generation: u64) {
        if self.state != DetectorState::RecordingPendingClose
            || generation != self.timer_generation
        {
            debug!(generation, "stale silence timer firing ignored");
            return;
        }
        self.timer = None;
        self.close_segment();
        self.state = DetectorState::Idle;
    }

    /// Stop requested: cancel any timer and close an open segment as a
    /// completed (possibly short) recording.
    pub(crate) fn finish(&mut self) {
        self.cancel_timer();
        if self.writer.is_some() {
            self.close_segment();
        }
        self.state = DetectorState::Idle;
    }

    fn open_segment(&mut self, buffer: &[i16]) {
        debug_assert!(self.writer.is_none(), "segment already open while idle");
        debug_assert!(self.timer.is_none(), "silence timer live while idle");
        match self.store.open_segment() {
            Ok(mut writer) => {
                // The buffer that crossed the threshold belongs to the segment.
                writer.append(buffer);
                self.events.emit(RecorderEvent::SegmentStarted {
                    path: writer.path().to_path_buf(),
                });
                self.writer = Some(writer);
                self.state = DetectorState::Recording;
            }
            Err(err) => {
                // Stay idle; the next loud buffer retries.
                warn!(err = %format!("{err:#}"), "failed to open segment");
            }
        }
    }

    fn append(&mut self, buffer: &[i16]) {
        if let Some(writer) = self.writer.as_mut() {
            writer.append(buffer);
        }
    }

    fn close_segment(&mut self) {
        let Some(writer) = self.writer.take() else {
            return;
        };
        let closed = writer.close();
        self.events.emit(RecorderEvent::SegmentCompleted(closed));
    }

    fn arm_timer(&mut self, timeout: Duration) {
        debug_assert!(self.timer.is_none(), "arming while a silence timer is live");
        self.timer_generation += 1;
        let generation = self.timer_generation;
        let tx = self.timer_tx.clone();
        self.timer = Some(SilenceTimer::arm(timeout, move || {
            let _ = tx.send(PipelineEvent::SilenceElapsed { generation });
        }));
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
            // A firing already queued for this generation is discarded on
            // arrival.
            self.timer_generation += 1;
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> DetectorState {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn segment_open(&self) -> bool {
        self.writer.is_some()
    }

    #[cfg(test)]
    pub(crate) fn timer_live(&self) -> bool {
        self.timer.is_some()
    }

    #[cfg(test)]
    pub(crate) fn current_generation(&self) -> u64 {
        self.timer_generation
    }
}
