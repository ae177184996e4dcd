//! System microphone input via cpal.
//!
//! The device runs at its native format and rate; the stream callback
//! downmixes interleaved channels to mono, resamples to 16 kHz when the
//! rates differ, quantizes to PCM16, and slices the result into fixed-length
//! buffers sized from the device-reported minimum buffer size. Buffers cross
//! into the capture thread over a bounded channel; when it is full the
//! buffer is dropped and counted rather than stalling the audio callback.

use super::capture::PipelineEvent;
use super::TARGET_RATE;
use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig, SupportedBufferSize};
use crossbeam_channel::{Sender, TrySendError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Floor for the derived buffer length: 10 ms at 16 kHz.
const MIN_BUFFER_SAMPLES: usize = 160;
/// Used when the backend does not report a minimum buffer size: 64 ms.
const FALLBACK_BUFFER_SAMPLES: usize = 1_024;

/// Audio input device wrapper. `cpal::Device` is `Send`, so a `Microphone`
/// can be opened on the caller's thread (surfacing device errors there) and
/// moved into the capture thread where the non-`Send` stream gets built.
pub struct Microphone {
    device: cpal::Device,
    config: StreamConfig,
    format: SampleFormat,
    buffer_samples: usize,
    dropped: Arc<AtomicUsize>,
}

impl Microphone {
    /// List microphone names so the CLI can expose a selector.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices().context("no input devices available")?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Open a microphone, optionally forcing a specific device by name.
    pub fn open(preferred_device: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();
        let device = match preferred_device {
            Some(name) => {
                let mut devices = host.input_devices().context("no input devices available")?;
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| anyhow!("input device '{name}' not found"))?
            }
            None => host
                .default_input_device()
                .context("no default input device available")?,
        };
        let default_config = device
            .default_input_config()
            .context("failed to query default input config")?;
        let format = default_config.sample_format();
        let buffer_samples = derive_buffer_samples(
            default_config.buffer_size(),
            default_config.sample_rate().0,
        );
        let config: StreamConfig = default_config.into();
        debug!(
            ?format,
            device_rate = config.sample_rate.0,
            channels = config.channels,
            buffer_samples,
            "microphone opened"
        );
        Ok(Self {
            device,
            config,
            format,
            buffer_samples,
            dropped: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn device_name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "unknown input device".to_string())
    }

    /// Buffers dropped because the capture thread fell behind.
    pub fn dropped_buffers(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Build and start the input stream, feeding `sink`. Must be called on
    /// the thread that will own the stream; the returned stream stops when
    /// dropped.
    pub(crate) fn open_stream(&self, sink: Sender<PipelineEvent>) -> Result<cpal::Stream> {
        let channels = usize::from(self.config.channels.max(1));
        let device_rate = self.config.sample_rate.0;
        let slicer = Arc::new(Mutex::new(BufferSlicer::new(
            self.buffer_samples,
            device_rate,
            sink,
            self.dropped.clone(),
        )));

        // Keep the error callback quiet; read gaps are absorbed by the loop.
        let err_fn = |err| debug!(%err, "audio stream error");
        let stream = match self.format {
            SampleFormat::F32 => {
                let slicer = slicer.clone();
                let dropped = self.dropped.clone();
                self.device.build_input_stream(
                    &self.config,
                    move |data: &[f32], _| {
                        if let Ok(mut slicer) = slicer.try_lock() {
                            slicer.push(data, channels, |sample| sample);
                        } else {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    err_fn,
                    None,
                )?
            }
            SampleFormat::I16 => {
                let slicer = slicer.clone();
                let dropped = self.dropped.clone();
                self.device.build_input_stream(
                    &self.config,
                    move |data: &[i16], _| {
                        if let Ok(mut slicer) = slicer.try_lock() {
                            slicer.push(data, channels, |sample| sample as f32 / 32_768.0);
                        } else {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    err_fn,
                    None,
                )?
            }
            SampleFormat::U16 => {
                let slicer = slicer.clone();
                let dropped = self.dropped.clone();
                self.device.build_input_stream(
                    &self.config,
                    move |data: &[u16], _| {
                        if let Ok(mut slicer) = slicer.try_lock() {
                            slicer.push(data, channels, |sample| {
                                (sample as f32 - 32_768.0) / 32_768.0
                            });
                        } else {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    err_fn,
                    None,
                )?
            }
            other => return Err(anyhow!("unsupported sample format: {other:?}")),
        };
        stream.play().context("failed to start audio stream")?;
        Ok(stream)
    }
}

/// The buffer length the platform reports for this device, scaled to the
/// 16 kHz target domain.
pub(super) fn derive_buffer_samples(buffer_size: &SupportedBufferSize, device_rate: u32) -> usize {
    let device_rate = device_rate.max(1);
    match buffer_size {
        SupportedBufferSize::Range { min, .. } => {
            let scaled = (u64::from(*min) * u64::from(TARGET_RATE)) / u64::from(device_rate);
            (scaled as usize).max(MIN_BUFFER_SAMPLES)
        }
        SupportedBufferSize::Unknown => FALLBACK_BUFFER_SAMPLES,
    }
}

/// Downmix interleaved multi-channel input to mono while applying the
/// format converter, averaging each frame.
pub(super) fn downmix_to_mono<T, F>(buf: &mut Vec<f32>, data: &[T], channels: usize, mut convert: F)
where
    T: Copy,
    F: FnMut(T) -> f32,
{
    if channels <= 1 {
        buf.extend(data.iter().copied().map(&mut convert));
        return;
    }
    let mut acc = 0.0f32;
    let mut count = 0usize;
    for sample in data.iter().copied() {
        acc += convert(sample);
        count += 1;
        if count == channels {
            buf.push(acc / channels as f32);
            acc = 0.0;
            count = 0;
        }
    }
    if count > 0 {
        buf.push(acc / count as f32);
    }
}

/// Linear resampler that carries its fractional position and the previous
/// chunk's last sample across calls, so chunked callback input produces a
/// continuous output stream.
pub(super) struct LinearResampler {
    step: f64,
    pos: f64,
    prev: f32,
}

impl LinearResampler {
    pub(super) fn new(device_rate: u32) -> Self {
        Self {
            step: f64::from(device_rate.max(1)) / f64::from(TARGET_RATE),
            pos: 0.0,
            prev: 0.0,
        }
    }

    /// `pos` runs over an axis where -1.0 is the last sample of the previous
    /// chunk and 0.0 is `input[0]`.
    pub(super) fn process(&mut self, input: &[f32], out: &mut Vec<f32>) {
        if input.is_empty() {
            return;
        }
        let mut pos = self.pos;
        while pos < input.len() as f64 - 1.0 {
            let (a, b, frac) = if pos < 0.0 {
                (self.prev, input[0], pos + 1.0)
            } else {
                let idx = pos as usize;
                (input[idx], input[idx + 1], pos - idx as f64)
            };
            out.push(a + (b - a) * frac as f32);
            pos += self.step;
        }
        self.pos = pos - input.len() as f64;
        self.prev = input[input.len() - 1];
    }
}

fn quantize(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32_767.0).round() as i16
}

/// Accumulates converted samples and emits fixed-length PCM16 buffers.
pub(super) struct BufferSlicer {
    buffer_samples: usize,
    pending: Vec<i16>,
    mono: Vec<f32>,
    resampled: Vec<f32>,
    resampler: Option<LinearResampler>,
    sender: Sender<PipelineEvent>,
    dropped: Arc<AtomicUsize>,
}

impl BufferSlicer {
    pub(super) fn new(
        buffer_samples: usize,
        device_rate: u32,
        sender: Sender<PipelineEvent>,
        dropped: Arc<AtomicUsize>,
    ) -> Self {
        let resampler = (device_rate != TARGET_RATE).then(|| LinearResampler::new(device_rate));
        Self {
            buffer_samples: buffer_samples.max(1),
            pending: Vec::with_capacity(buffer_samples),
            mono: Vec::new(),
            resampled: Vec::new(),
            resampler,
            sender,
            dropped,
        }
    }

    pub(super) fn push<T, F>(&mut self, data: &[T], channels: usize, convert: F)
    where
        T: Copy,
        F: FnMut(T) -> f32,
    {
        self.mono.clear();
        downmix_to_mono(&mut self.mono, data, channels, convert);
        if let Some(resampler) = self.resampler.as_mut() {
            self.resampled.clear();
            resampler.process(&self.mono, &mut self.resampled);
            self.pending.extend(self.resampled.iter().map(|&s| quantize(s)));
        } else {
            self.pending.extend(self.mono.iter().map(|&s| quantize(s)));
        }

        while self.pending.len() >= self.buffer_samples {
            let buffer: Vec<i16> = self.pending.drain(..self.buffer_samples).collect();
            if let Err(err) = self.sender.try_send(PipelineEvent::Buffer(buffer)) {
                match err {
                    TrySendError::Full(_) => {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    TrySendError::Disconnected(_) => break,
                }
            }
        }
    }
}
