use std::path::Path;

use crate::assets::media::AudioPcm;
use crate::audio::sync::{AudioMode, AudioPlan};
use crate::foundation::core::Fps;
use crate::foundation::error::{ReelError, ReelResult};

/// Length of the fade-to-silence ramp.
pub const FADE_OUT_SECS: f64 = 1.0;

/// Gain of the planned track at `t_secs` from the start of the video.
///
/// Fading plans hold full gain until `fade_start_secs`, ramp linearly to zero over
/// [`FADE_OUT_SECS`] and stay silent afterwards.
pub fn plan_gain(plan: &AudioPlan, t_secs: f64) -> f32 {
    match plan.mode {
        AudioMode::None => 0.0,
        AudioMode::Loop => 1.0,
        AudioMode::FadeOut => {
            let start = plan.fade_start_secs.unwrap_or(0.0);
            let rem = FADE_OUT_SECS - (t_secs - start).max(0.0);
            (rem / FADE_OUT_SECS).clamp(0.0, 1.0) as f32
        }
    }
}

/// Render `total_samples` stereo sample frames of `pcm` following `plan`, scaled by `master_gain`.
///
/// Looping plans wrap the source seamlessly; fading plans play it once and pad with silence.
pub(crate) fn render_track(
    pcm: &AudioPcm,
    plan: &AudioPlan,
    total_samples: u64,
    master_gain: f32,
) -> Vec<f32> {
    let frames = total_samples as usize;
    let mut out = vec![0.0f32; frames * 2];
    let src_frames = pcm.frames();
    let src_ch = usize::from(pcm.channels);
    if src_frames == 0 || plan.mode == AudioMode::None || master_gain <= 0.0 {
        return out;
    }

    let rate = f64::from(pcm.sample_rate.max(1));
    for (i, dst) in out.chunks_exact_mut(2).enumerate() {
        let src_frame = match plan.mode {
            AudioMode::Loop => i % src_frames,
            _ if i < src_frames => i,
            _ => break,
        };
        let gain = plan_gain(plan, i as f64 / rate) * master_gain;
        let base = src_frame * src_ch;
        let l = pcm.interleaved_f32[base];
        let r = if src_ch > 1 {
            pcm.interleaved_f32[base + 1]
        } else {
            l
        };
        dst[0] = (l * gain).clamp(-1.0, 1.0);
        dst[1] = (r * gain).clamp(-1.0, 1.0);
    }
    out
}

/// Write interleaved `f32` PCM samples to raw little-endian `.f32le` file.
pub(crate) fn write_f32le_file(samples_interleaved: &[f32], out_path: &Path) -> ReelResult<()> {
    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        ReelError::audio_setup(format!(
            "failed to write mixed audio file '{}': {e}",
            out_path.display()
        ))
    })
}

/// Convert a frame count to the nearest sample index at `sample_rate`.
pub fn frame_to_sample(frames: u64, fps: Fps, sample_rate: u32) -> u64 {
    let num = u128::from(frames) * u128::from(sample_rate) * u128::from(fps.den);
    let den = u128::from(fps.num);
    ((num + (den / 2)) / den) as u64
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
