use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::surface::Surface;

/// Output container of an encoding session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    /// WebM with VP9 video and Opus audio.
    #[default]
    Webm,
    /// Fragmented MP4 with H.264 video and AAC audio.
    Mp4,
}

impl ContainerFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Webm => "webm",
            Self::Mp4 => "mp4",
        }
    }

    /// MIME type of the container.
    pub fn media_type(self) -> &'static str {
        match self {
            Self::Webm => "video/webm",
            Self::Mp4 => "video/mp4",
        }
    }
}

/// Configuration provided to an [`EncodingSession`] at start.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Output canvas.
    pub canvas: Canvas,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Frames the pacer intends to push.
    pub total_frames: u64,
    /// File stem of the artifact, already sanitized.
    pub file_stem: String,
    /// Optional raw PCM audio file input.
    pub audio: Option<AudioInputConfig>,
}

/// Raw PCM audio input for sessions that mux audio.
#[derive(Debug, Clone)]
pub struct AudioInputConfig {
    /// Path to interleaved `f32le` PCM data.
    pub path: PathBuf,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
}

/// Where the encoded bytes of an artifact live.
#[derive(Debug, Clone)]
pub enum ArtifactData {
    /// Written to a file on disk.
    File(PathBuf),
    /// Held in memory.
    Memory(Arc<Vec<u8>>),
}

/// The encoded result of a generation run.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Deterministic download name, `<stem>.<ext>`.
    pub file_name: String,
    /// MIME type.
    pub media_type: String,
    /// Encoded bytes, or where to find them.
    pub data: ArtifactData,
    /// Size of the encoded bytes.
    pub byte_len: u64,
    /// Number of incremental chunks emitted while encoding.
    pub chunk_count: u64,
    /// Frames pushed.
    pub frames: u64,
    /// `frames / fps`.
    pub duration_secs: f64,
    /// Whether an audio track was muxed.
    pub has_audio: bool,
}

impl Artifact {
    /// Delete the encoded bytes when they live on disk.
    pub fn discard(&self) -> ReelResult<()> {
        if let ArtifactData::File(path) = &self.data
            && path.exists()
        {
            std::fs::remove_file(path).map_err(|e| {
                ReelError::encoding(format!(
                    "failed to remove artifact '{}': {e}",
                    path.display()
                ))
            })?;
        }
        Ok(())
    }
}

/// Capture/encode lifecycle driven by the frame pacer.
///
/// `start` and `stop` are each called once per run. `push_frame` receives the surface in strictly
/// increasing frame order. `abort` releases resources and discards partial output after a failed
/// run; it is never followed by `stop`.
pub trait EncodingSession: Send {
    /// Called once before any frame is pushed.
    fn start(&mut self, cfg: SessionConfig) -> ReelResult<()>;
    /// Capture the current surface content as frame `idx`.
    fn push_frame(&mut self, idx: FrameIndex, surface: &Surface) -> ReelResult<()>;
    /// Finalize and return the artifact. A second call is an error.
    fn stop(&mut self) -> ReelResult<Artifact>;
    /// Tear down without producing an artifact.
    fn abort(&mut self);
}

/// In-memory session for tests and dry runs.
///
/// Records an xxh3 digest per frame instead of the pixels, plus the last frame in full.
#[derive(Debug, Default)]
pub struct InMemorySession {
    cfg: Option<SessionConfig>,
    format: ContainerFormat,
    digests: Vec<u64>,
    last_frame: Option<Vec<u8>>,
    start_calls: u32,
    stop_calls: u32,
    abort_calls: u32,
    stopped: bool,
    /// Fail with an encoding error when this frame index is pushed.
    pub fail_on_frame: Option<u64>,
}

impl InMemorySession {
    /// Create a new in-memory session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Container reported in the artifact name and media type.
    pub fn with_format(mut self, format: ContainerFormat) -> Self {
        self.format = format;
        self
    }

    /// Configuration captured in `start`, if any.
    pub fn config(&self) -> Option<&SessionConfig> {
        self.cfg.as_ref()
    }

    /// Per-frame xxh3 digests in push order.
    pub fn frame_digests(&self) -> &[u64] {
        &self.digests
    }

    /// Pixels of the most recent frame.
    pub fn last_frame(&self) -> Option<&[u8]> {
        self.last_frame.as_deref()
    }

    /// Number of `start` calls.
    pub fn start_calls(&self) -> u32 {
        self.start_calls
    }

    /// Number of `stop` calls.
    pub fn stop_calls(&self) -> u32 {
        self.stop_calls
    }

    /// Number of `abort` calls.
    pub fn abort_calls(&self) -> u32 {
        self.abort_calls
    }
}

impl EncodingSession for InMemorySession {
    fn start(&mut self, cfg: SessionConfig) -> ReelResult<()> {
        self.start_calls += 1;
        if self.cfg.is_some() {
            return Err(ReelError::encoding("session already started"));
        }
        self.cfg = Some(cfg);
        self.digests.clear();
        self.last_frame = None;
        self.stopped = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, surface: &Surface) -> ReelResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ReelError::encoding("session not started"))?;
        if self.stopped {
            return Err(ReelError::encoding("session already stopped"));
        }
        if idx.0 != self.digests.len() as u64 {
            return Err(ReelError::encoding(format!(
                "out-of-order frame {} (expected {})",
                idx.0,
                self.digests.len()
            )));
        }
        if surface.canvas() != cfg.canvas {
            return Err(ReelError::encoding("surface size does not match session"));
        }
        if self.fail_on_frame == Some(idx.0) {
            return Err(ReelError::encoding(format!("injected failure at frame {}", idx.0)));
        }
        let data = surface.data();
        self.digests.push(xxhash_rust::xxh3::xxh3_64(data));
        match &mut self.last_frame {
            Some(buf) => buf.copy_from_slice(data),
            None => self.last_frame = Some(data.to_vec()),
        }
        Ok(())
    }

    fn stop(&mut self) -> ReelResult<Artifact> {
        self.stop_calls += 1;
        if self.stopped {
            return Err(ReelError::encoding("session already stopped"));
        }
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ReelError::encoding("session not started"))?;
        self.stopped = true;

        let bytes: Vec<u8> = self.digests.iter().flat_map(|d| d.to_le_bytes()).collect();
        let frames = self.digests.len() as u64;
        let per_chunk = cfg.fps.secs_to_frames_round(1.0).max(1);
        Ok(Artifact {
            file_name: format!("{}.{}", cfg.file_stem, self.format.extension()),
            media_type: self.format.media_type().to_owned(),
            byte_len: bytes.len() as u64,
            data: ArtifactData::Memory(Arc::new(bytes)),
            chunk_count: frames.div_ceil(per_chunk),
            frames,
            duration_secs: cfg.fps.frames_to_secs(frames),
            has_audio: cfg.audio.is_some(),
        })
    }

    fn abort(&mut self) {
        self.abort_calls += 1;
        self.stopped = true;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
