//! CLI front end: start the capture engine, report segments and live
//! loudness, stop on Enter.

use anyhow::Result;
use crossbeam_channel::RecvTimeoutError;
use soundtrap::audio::{start_capture, LiveMeter, Microphone, SegmentStore};
use soundtrap::config::{AppConfig, SettingsStore};
use soundtrap::{event_channel, init_tracing, RecorderEvent};
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    init_tracing(&config);

    if config.list_input_devices {
        return list_input_devices();
    }

    let store = SegmentStore::new(config.save_dir())?;
    if config.list_recordings {
        for path in store.list()? {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let settings = Arc::new(SettingsStore::load(config.settings_path()));
    if let Some(db) = config.activation_db {
        settings.set_activation_db(db);
    }
    if let Some(secs) = config.min_silence_secs {
        settings.set_min_silence_secs(secs);
    }

    let mic = Microphone::open(config.input_device.as_deref())?;
    println!(
        "Listening on '{}', saving to {} (threshold {} dB, silence timeout {} s).",
        mic.device_name(),
        store.dir().display(),
        settings.activation_db(),
        settings.min_silence_secs()
    );
    println!("Press Enter to stop.");

    let meter = LiveMeter::new();
    let (sink, events) = event_channel(meter.clone());
    let handle = start_capture(mic, settings, store, sink, config.channel_capacity);

    let printer = thread::spawn(move || loop {
        match events.recv_timeout(Duration::from_secs(1)) {
            Ok(RecorderEvent::CaptureStarted) => println!("capture started"),
            Ok(RecorderEvent::SegmentStarted { path }) => {
                println!("recording {}", path.display());
            }
            Ok(RecorderEvent::SegmentCompleted(segment)) => println!(
                "saved {} ({} bytes{})",
                segment.path.display(),
                segment.bytes,
                if segment.partial { ", partial" } else { "" }
            ),
            Ok(RecorderEvent::CaptureStopped { dropped_buffers }) => {
                if dropped_buffers > 0 {
                    println!("capture stopped, {dropped_buffers} buffers dropped");
                } else {
                    println!("capture stopped");
                }
            }
            Ok(RecorderEvent::CaptureFailed(reason)) => {
                eprintln!("capture failed: {reason}");
            }
            Err(RecvTimeoutError::Timeout) => {
                println!("level {:6.1} dB", meter.level_db());
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    });

    let mut line = String::new();
    let _ = io::stdin().read_line(&mut line);
    handle.stop();
    let _ = printer.join();
    Ok(())
}

fn list_input_devices() -> Result<()> {
    match Microphone::list_devices() {
        Ok(names) if names.is_empty() => println!("No audio input devices detected."),
        Ok(names) => {
            println!("Detected audio input devices:");
            for name in names {
                println!("  {name}");
            }
        }
        Err(err) => println!("Failed to list audio input devices: {err:#}"),
    }
    Ok(())
}
