//! Fitting an independent audio resource to the planned video length.
//!
//! The source is decoded once, rendered into a track of exactly the video's length (looped or
//! faded out), and written to a scratch file the encoder muxes. The scratch file and the decoded
//! source live until [`AudioCleanup`] runs.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Context as _;
use serde::Serialize;

use crate::assets::media::{AudioPcm, MIX_SAMPLE_RATE, decode_audio_f32_stereo};
use crate::audio::mix::{FADE_OUT_SECS, frame_to_sample, render_track, write_f32le_file};
use crate::encode::sink::AudioInputConfig;
use crate::foundation::core::Fps;
use crate::foundation::error::{ReelError, ReelResult};

/// How the audio source is fitted to the video.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioMode {
    /// No audio track.
    None,
    /// Source shorter than the video: repeat it without gaps.
    Loop,
    /// Source at least as long as the video: play once and fade to silence at the end.
    FadeOut,
}

/// Audio fitting decision for one run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AudioPlan {
    /// Fitting mode.
    pub mode: AudioMode,
    /// When the fade starts, for [`AudioMode::FadeOut`].
    pub fade_start_secs: Option<f64>,
}

impl AudioPlan {
    /// Plan without audio.
    pub fn none() -> Self {
        Self {
            mode: AudioMode::None,
            fade_start_secs: None,
        }
    }

    /// Compare the source length with the video length.
    ///
    /// Sources at least as long as the video fade out over the final second; shorter ones loop.
    pub fn decide(audio_secs: f64, total_secs: f64) -> Self {
        if audio_secs >= total_secs {
            Self {
                mode: AudioMode::FadeOut,
                fade_start_secs: Some((total_secs - FADE_OUT_SECS).max(0.0)),
            }
        } else {
            Self {
                mode: AudioMode::Loop,
                fade_start_secs: None,
            }
        }
    }
}

/// Raw audio bytes supplied next to the story graph.
#[derive(Clone, Debug)]
pub struct AudioResource {
    bytes: Arc<Vec<u8>>,
    media_type: Option<String>,
}

impl AudioResource {
    /// Wrap encoded audio bytes.
    pub fn new(bytes: impl Into<Vec<u8>>, media_type: Option<String>) -> Self {
        Self {
            bytes: Arc::new(bytes.into()),
            media_type,
        }
    }

    /// Read an audio file, guessing its media type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read audio file '{}'", path.display()))?;
        let media_type = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(media_type_for_extension)
            .map(str::to_owned);
        Ok(Self::new(bytes, media_type))
    }

    /// Encoded bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared media type.
    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }
}

fn media_type_for_extension(ext: &str) -> Option<&'static str> {
    Some(match ext.to_ascii_lowercase().as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" | "oga" => "audio/ogg",
        "opus" => "audio/opus",
        "m4a" | "aac" => "audio/aac",
        "flac" => "audio/flac",
        "webm" => "audio/webm",
        _ => return None,
    })
}

/// Routing state shared by the track and its cleanup: master gain plus the decoded source.
#[derive(Debug)]
pub struct MixGraph {
    plan: AudioPlan,
    master_gain: AtomicU32,
    source: Mutex<Option<Arc<AudioPcm>>>,
}

impl MixGraph {
    fn new(plan: AudioPlan, source: AudioPcm) -> Self {
        Self {
            plan,
            master_gain: AtomicU32::new(1.0f32.to_bits()),
            source: Mutex::new(Some(Arc::new(source))),
        }
    }

    /// Current master gain.
    pub fn master_gain(&self) -> f32 {
        f32::from_bits(self.master_gain.load(Ordering::SeqCst))
    }

    fn silence(&self) {
        self.master_gain.store(0.0f32.to_bits(), Ordering::SeqCst);
    }

    fn source(&self) -> Option<Arc<AudioPcm>> {
        match self.source.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn release_source(&self) {
        match self.source.lock() {
            Ok(mut g) => *g = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    /// Whether the decoded source was released.
    pub fn is_released(&self) -> bool {
        self.source().is_none()
    }

    /// Render `total_samples` stereo frames through the graph; silent once cleaned up.
    pub fn render(&self, total_samples: u64) -> Vec<f32> {
        match self.source() {
            Some(pcm) => render_track(&pcm, &self.plan, total_samples, self.master_gain()),
            None => vec![0.0; total_samples as usize * 2],
        }
    }
}

/// The mixed track handed to the encoder.
#[derive(Clone, Debug)]
pub struct AudioTrack {
    /// Raw interleaved `f32le` file.
    pub path: PathBuf,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Sample frames in the file.
    pub samples: u64,
    graph: Arc<MixGraph>,
}

impl AudioTrack {
    /// Encoder input description.
    pub fn input_config(&self) -> AudioInputConfig {
        AudioInputConfig {
            path: self.path.clone(),
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    /// Routing graph behind the track.
    pub fn graph(&self) -> &MixGraph {
        &self.graph
    }
}

/// Releases audio resources exactly once: silence the mix, release the source, delete the file.
///
/// Consumed by [`AudioCleanup::run`]; dropping it unrun performs the same steps.
#[derive(Debug)]
pub struct AudioCleanup {
    graph: Arc<MixGraph>,
    file: Option<tempfile::TempPath>,
    done: bool,
}

impl AudioCleanup {
    /// Run the cleanup.
    pub fn run(mut self) -> ReelResult<()> {
        self.release()
    }

    fn release(&mut self) -> ReelResult<()> {
        if self.done {
            return Ok(());
        }
        self.done = true;
        self.graph.silence();
        self.graph.release_source();
        if let Some(file) = self.file.take() {
            file.close()
                .context("failed to remove audio scratch file")?;
        }
        tracing::debug!("audio resources released");
        Ok(())
    }
}

impl Drop for AudioCleanup {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!("audio cleanup failed: {e}");
        }
    }
}

/// Everything [`AudioSynchronizer::prepare`] produces.
#[derive(Debug)]
pub struct PreparedAudio {
    /// Track to mux.
    pub track: AudioTrack,
    /// Fitting decision.
    pub plan: AudioPlan,
    /// Release handle, to run after the encoding session finalizes.
    pub cleanup: AudioCleanup,
}

/// Turns encoded audio bytes (with an optional media type) into PCM at the given sample rate.
pub type AudioDecodeFn = fn(&[u8], Option<&str>, u32) -> ReelResult<AudioPcm>;

/// Decodes an audio resource and fits it to the planned video.
#[derive(Clone, Debug)]
pub struct AudioSynchronizer {
    sample_rate: u32,
    scratch_dir: Option<PathBuf>,
    decode: AudioDecodeFn,
}

impl Default for AudioSynchronizer {
    fn default() -> Self {
        Self {
            sample_rate: MIX_SAMPLE_RATE,
            scratch_dir: None,
            decode: decode_audio_f32_stereo,
        }
    }
}

impl AudioSynchronizer {
    /// Synchronizer writing scratch files to the system temp dir.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write scratch files under `dir` instead.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Decode resources with `decode` instead of the system ffmpeg.
    pub fn with_decoder(mut self, decode: AudioDecodeFn) -> Self {
        self.decode = decode;
        self
    }

    /// Decode `resource` (with ffmpeg unless [`AudioSynchronizer::with_decoder`] replaced it) and
    /// fit it to `total_frames` at `fps`.
    ///
    /// Any failure is reported as [`ReelError::AudioSetup`].
    #[tracing::instrument(skip(self, resource), fields(media_type = resource.media_type()))]
    pub fn prepare(
        &self,
        resource: &AudioResource,
        total_frames: u64,
        fps: Fps,
    ) -> ReelResult<PreparedAudio> {
        let pcm = (self.decode)(resource.bytes(), resource.media_type(), self.sample_rate)
            .map_err(as_audio_setup)?;
        self.prepare_pcm(pcm, total_frames, fps)
    }

    /// Fit already-decoded PCM to `total_frames` at `fps`.
    pub fn prepare_pcm(
        &self,
        pcm: AudioPcm,
        total_frames: u64,
        fps: Fps,
    ) -> ReelResult<PreparedAudio> {
        self.fit(pcm, total_frames, fps).map_err(as_audio_setup)
    }

    fn fit(&self, pcm: AudioPcm, total_frames: u64, fps: Fps) -> ReelResult<PreparedAudio> {
        if pcm.frames() == 0 || pcm.channels == 0 {
            return Err(ReelError::audio_setup("audio source has no samples"));
        }
        if pcm.sample_rate != self.sample_rate {
            return Err(ReelError::audio_setup(format!(
                "audio source is {} Hz, expected {} Hz",
                pcm.sample_rate, self.sample_rate
            )));
        }

        let total_secs = fps.frames_to_secs(total_frames);
        let plan = AudioPlan::decide(pcm.duration_secs(), total_secs);
        let samples = frame_to_sample(total_frames, fps, self.sample_rate);
        tracing::debug!(
            audio_secs = pcm.duration_secs(),
            total_secs,
            mode = ?plan.mode,
            samples,
            "audio plan decided"
        );

        let graph = Arc::new(MixGraph::new(plan, pcm));
        let mixed = graph.render(samples);

        let mut builder = tempfile::Builder::new();
        builder.prefix("storyreel-audio-").suffix(".f32le");
        let file = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .context("failed to create audio scratch file")?
        .into_temp_path();
        write_f32le_file(&mixed, &file)?;

        let track = AudioTrack {
            path: file.to_path_buf(),
            sample_rate: self.sample_rate,
            channels: 2,
            samples,
            graph: Arc::clone(&graph),
        };
        Ok(PreparedAudio {
            track,
            plan,
            cleanup: AudioCleanup {
                graph,
                file: Some(file),
                done: false,
            },
        })
    }
}

fn as_audio_setup(e: ReelError) -> ReelError {
    match e {
        ReelError::AudioSetup(_) => e,
        other => ReelError::audio_setup(other.to_string()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/sync.rs"]
mod tests;
