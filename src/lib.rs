//! Voice-activity-triggered audio recorder engine.
//!
//! The [`audio`] module captures microphone audio, scores each buffer's
//! loudness, and segments the stream into discrete recordings at activity
//! boundaries. [`config`] holds the CLI surface and the persisted tunables;
//! [`events`] is the telemetry seam observers consume.

pub mod audio;
pub mod config;
pub mod events;
mod telemetry;

pub use events::{event_channel, EventSink, RecorderEvent};
pub use telemetry::init_tracing;
