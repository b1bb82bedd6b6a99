use std::io::Write as _;
use std::process::{Command, Stdio};

use crate::foundation::error::{ReelError, ReelResult};

/// Sample rate every audio source is resampled to before mixing.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

/// Interleaved stereo PCM decoded from an audio resource.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioPcm {
    /// Samples per second per channel.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Interleaved `f32` samples.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.interleaved_f32.len() / usize::from(self.channels)
        }
    }

    /// Playback length in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / f64::from(self.sample_rate)
        }
    }
}

/// Decode an in-memory audio resource to stereo `f32` PCM at `sample_rate` with system ffmpeg.
///
/// The bytes are streamed through ffmpeg's stdin from a writer thread while stdout is collected.
/// `media_type` is only used for diagnostics; ffmpeg probes the container itself.
pub fn decode_audio_f32_stereo(
    bytes: &[u8],
    media_type: Option<&str>,
    sample_rate: u32,
) -> ReelResult<AudioPcm> {
    if bytes.is_empty() {
        return Err(ReelError::audio_setup("audio resource is empty"));
    }

    let mut child = Command::new("ffmpeg")
        .args(["-hide_banner", "-v", "error", "-i", "pipe:0"])
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ReelError::audio_setup(format!("failed to run ffmpeg for audio decode: {e}")))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| ReelError::audio_setup("ffmpeg stdin not available"))?;
    let input = bytes.to_vec();
    // ffmpeg may stop reading early (e.g. on a bad header), so a broken pipe is not an error here.
    let writer = std::thread::spawn(move || {
        let _ = stdin.write_all(&input);
    });

    let out = child
        .wait_with_output()
        .map_err(|e| ReelError::audio_setup(format!("failed to wait for ffmpeg: {e}")))?;
    let _ = writer.join();

    if !out.status.success() {
        return Err(ReelError::audio_setup(format!(
            "ffmpeg audio decode failed ({}): {}",
            media_type.unwrap_or("unknown media type"),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let interleaved_f32 = f32le_to_samples(&out.stdout)?;
    if interleaved_f32.is_empty() {
        return Err(ReelError::audio_setup("audio resource contains no samples"));
    }

    Ok(AudioPcm {
        sample_rate,
        channels: 2,
        interleaved_f32,
    })
}

pub(crate) fn f32le_to_samples(bytes: &[u8]) -> ReelResult<Vec<f32>> {
    if !bytes.len().is_multiple_of(4) {
        return Err(ReelError::audio_setup(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/media.rs"]
mod tests;
