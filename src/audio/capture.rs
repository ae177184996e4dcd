//! The capture loop.
//!
//! One dedicated thread owns the input stream and is the single source of
//! truth for ordering: buffers are metered, classified, and appended strictly
//! in arrival order, and silence-timer firings join the same queue. The
//! device sets the cadence; the only timeout here bounds stop-flag latency.

use super::detector::ActivityDetector;
use super::meter::{pcm_power_db, SILENCE_FLOOR_DB};
use super::source::Microphone;
use super::writer::SegmentStore;
use crate::config::SettingsStore;
use crate::events::{EventSink, RecorderEvent};
use cpal::traits::StreamTrait;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// What flows through the pipeline channel into the capture thread.
pub(crate) enum PipelineEvent {
    /// One fixed-length 16 kHz mono PCM16 buffer from the stream callback.
    Buffer(Vec<i16>),
    /// A silence timer reached its deadline. Matched against the detector's
    /// current generation; stale firings are dropped.
    SilenceElapsed { generation: u64 },
}

/// Handle to a running capture loop. Stopping (or dropping) it stops the
/// audio source, cancels any pending silence timer, and closes an open
/// segment as a completed recording, so a fresh start leaks nothing.
pub struct CaptureHandle {
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawn the capture thread and start recording.
///
/// Device selection errors surface synchronously from [`Microphone::open`];
/// stream construction happens on the capture thread (cpal streams are not
/// `Send`) and failures there arrive as [`RecorderEvent::CaptureFailed`].
pub fn start_capture(
    mic: Microphone,
    settings: Arc<SettingsStore>,
    store: SegmentStore,
    events: EventSink,
    channel_capacity: usize,
) -> CaptureHandle {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let flag = stop_flag.clone();
    let handle = thread::spawn(move || {
        let (tx, rx) = bounded::<PipelineEvent>(channel_capacity.max(1));
        let stream = match mic.open_stream(tx.clone()) {
            Ok(stream) => stream,
            Err(err) => {
                events.emit(RecorderEvent::CaptureFailed(format!("{err:#}")));
                return;
            }
        };
        events.emit(RecorderEvent::CaptureStarted);

        let mut detector = ActivityDetector::new(store, events.clone(), tx);
        run_pipeline(&rx, &mut detector, &settings, &events, &flag);

        if let Err(err) = stream.pause() {
            debug!(%err, "failed to pause audio stream");
        }
        drop(stream);

        detector.finish();
        events.loudness(SILENCE_FLOOR_DB);
        events.emit(RecorderEvent::CaptureStopped {
            dropped_buffers: mic.dropped_buffers(),
        });
    });
    CaptureHandle {
        stop_flag,
        handle: Some(handle),
    }
}

/// Drain pipeline events until the stop flag is raised. Split out from
/// [`start_capture`] so the ordering rules can be exercised without a
/// physical microphone.
pub(crate) fn run_pipeline(
    rx: &Receiver<PipelineEvent>,
    detector: &mut ActivityDetector,
    settings: &SettingsStore,
    events: &EventSink,
    stop_flag: &AtomicBool,
) {
    while !stop_flag.load(Ordering::Relaxed) {
        match rx.recv_timeout(STOP_POLL_INTERVAL) {
            Ok(PipelineEvent::Buffer(buffer)) => {
                let db = pcm_power_db(&buffer);
                events.loudness(db);
                detector.on_buffer(&buffer, db, settings.snapshot());
            }
            Ok(PipelineEvent::SilenceElapsed { generation }) => {
                detector.on_silence_elapsed(generation);
            }
            // Transient gap in the stream: skip, never tear down state.
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                events.emit(RecorderEvent::CaptureFailed(
                    "audio stream disconnected".to_string(),
                ));
                break;
            }
        }
    }
}
