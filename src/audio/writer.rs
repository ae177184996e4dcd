//! Segment files: creation, append, close, and the save-directory surface.
//!
//! A segment is one contiguous recording stored as raw 16 kHz mono PCM16,
//! named by its creation timestamp. The writer owns the handle while the
//! segment is open; closing hands back a [`ClosedSegment`] summary and the
//! in-memory handle is gone for good.

use anyhow::{bail, Context, Result};
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File extension for stored segments (raw PCM, no container).
pub const SEGMENT_EXTENSION: &str = "pcm";

/// Summary of a finished recording. `partial` is set when any append or the
/// final flush failed, so consumers know the file may be missing bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedSegment {
    pub path: PathBuf,
    pub bytes: u64,
    pub partial: bool,
}

/// Writer for exactly one open segment.
pub struct SegmentWriter {
    path: PathBuf,
    file: BufWriter<File>,
    bytes: u64,
    append_errors: u64,
}

impl SegmentWriter {
    fn create(dir: &Path) -> Result<Self> {
        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        let mut path = dir.join(format!("{stamp}.{SEGMENT_EXTENSION}"));
        let mut suffix = 2u32;
        // A closed segment is never reopened or truncated: when two segments
        // land in the same wall-clock second, the later one takes a counter
        // suffix. `create_new` makes the existence check and the create one
        // atomic step.
        let file = loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => break file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    path = dir.join(format!("{stamp}_{suffix}.{SEGMENT_EXTENSION}"));
                    suffix += 1;
                }
                Err(err) => {
                    return Err(err).with_context(|| {
                        format!("failed to create segment file '{}'", path.display())
                    });
                }
            }
        };
        debug!(path = %path.display(), "segment opened");
        Ok(Self {
            path,
            file: BufWriter::new(file),
            bytes: 0,
            append_errors: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one buffer as little-endian PCM16 bytes.
    ///
    /// On failure the segment stays logically open and the buffer is dropped;
    /// the loss is recorded and surfaces as `partial` on close.
    pub fn append(&mut self, samples: &[i16]) {
        let mut bytes = Vec::with_capacity(samples.len() * 2);
        for sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        match self.file.write_all(&bytes) {
            Ok(()) => self.bytes += bytes.len() as u64,
            Err(err) => {
                self.append_errors += 1;
                warn!(path = %self.path.display(), %err, "segment append failed, buffer dropped");
            }
        }
    }

    /// Flush and release the handle. Flush failures mark the segment partial
    /// rather than keeping it open; the state machine must not stall on a
    /// file error.
    pub fn close(mut self) -> ClosedSegment {
        let mut partial = self.append_errors > 0;
        if let Err(err) = self.file.flush() {
            warn!(path = %self.path.display(), %err, "segment flush failed on close");
            partial = true;
        }
        debug!(path = %self.path.display(), bytes = self.bytes, partial, "segment closed");
        ClosedSegment {
            path: self.path,
            bytes: self.bytes,
            partial,
        }
    }
}

/// The directory segments are stored in: creation, enumeration, deletion.
#[derive(Debug, Clone)]
pub struct SegmentStore {
    dir: PathBuf,
}

impl SegmentStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create save directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn open_segment(&self) -> Result<SegmentWriter> {
        SegmentWriter::create(&self.dir)
    }

    /// Stored segments, sorted by name (which sorts by creation time).
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read save directory '{}'", self.dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(SEGMENT_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Delete one stored segment. Refuses paths outside the save directory.
    pub fn delete(&self, path: &Path) -> Result<()> {
        if path.parent() != Some(self.dir.as_path()) {
            bail!(
                "refusing to delete '{}': not in save directory '{}'",
                path.display(),
                self.dir.display()
            );
        }
        fs::remove_file(path)
            .with_context(|| format!("failed to delete segment '{}'", path.display()))
    }
}
