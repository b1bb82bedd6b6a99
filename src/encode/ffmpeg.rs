use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use crate::encode::sink::{
    Artifact, ArtifactData, ContainerFormat, EncodingSession, SessionConfig,
};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::surface::Surface;

/// Bytes read from ffmpeg's stdout per emitted chunk.
const CHUNK_BYTES: usize = 256 * 1024;

/// Options for [`FfmpegSession`].
#[derive(Clone, Debug)]
pub struct FfmpegSessionOpts {
    /// Directory the artifact is written into as `<stem>.<ext>`.
    pub out_dir: PathBuf,
    /// Output container.
    pub format: ContainerFormat,
    /// Overwrite an existing artifact with the same name.
    pub overwrite: bool,
    /// Background color used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl FfmpegSessionOpts {
    /// Create options writing into `out_dir`.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            format: ContainerFormat::default(),
            overwrite: true,
            bg_rgba: [0, 0, 0, 255],
        }
    }
}

struct ChunkStats {
    bytes: u64,
    chunks: u64,
}

struct Running {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout_drain: JoinHandle<std::io::Result<ChunkStats>>,
    stderr_drain: JoinHandle<std::io::Result<Vec<u8>>>,
    out_path: PathBuf,
    file_name: String,
    cfg: SessionConfig,
    frames: u64,
    last_idx: Option<FrameIndex>,
}

/// Session that spawns the system `ffmpeg`, streams flattened RGBA frames to stdin and copies the
/// encoded container from stdout into the artifact file chunk by chunk.
pub struct FfmpegSession {
    opts: FfmpegSessionOpts,
    running: Option<Running>,
    scratch: Vec<u8>,
    stopped: bool,
}

impl FfmpegSession {
    /// Create a new session.
    pub fn new(opts: FfmpegSessionOpts) -> Self {
        Self {
            opts,
            running: None,
            scratch: Vec::new(),
            stopped: false,
        }
    }

    fn build_command(&self, cfg: &SessionConfig) -> ReelResult<Command> {
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Input: raw RGBA8 frames, already flattened to opaque in push_frame.
        cmd.args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.canvas.width, cfg.canvas.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0"]);

        if let Some(audio) = cfg.audio.as_ref() {
            if audio.sample_rate == 0 || audio.channels == 0 {
                return Err(ReelError::validation(
                    "audio sample_rate and channels must be non-zero when audio is enabled",
                ));
            }
            cmd.args([
                "-f",
                "f32le",
                "-ar",
                &audio.sample_rate.to_string(),
                "-ac",
                &audio.channels.to_string(),
                "-i",
            ])
            .arg(&audio.path);
        }

        match self.opts.format {
            ContainerFormat::Webm => {
                cmd.args([
                    "-c:v",
                    "libvpx-vp9",
                    "-b:v",
                    "8M",
                    "-pix_fmt",
                    "yuv420p",
                    "-deadline",
                    "realtime",
                    "-cpu-used",
                    "8",
                ]);
                if cfg.audio.is_some() {
                    cmd.args(["-c:a", "libopus", "-b:a", "128k", "-shortest"]);
                } else {
                    cmd.arg("-an");
                }
                cmd.args(["-f", "webm"]);
            }
            ContainerFormat::Mp4 => {
                cmd.args(["-c:v", "libx264", "-pix_fmt", "yuv420p"]);
                if cfg.audio.is_some() {
                    cmd.args(["-c:a", "aac", "-shortest"]);
                } else {
                    cmd.arg("-an");
                }
                // Fragmented output can be streamed through a pipe.
                cmd.args(["-movflags", "frag_keyframe+empty_moov", "-f", "mp4"]);
            }
        }
        cmd.arg("pipe:1");
        Ok(cmd)
    }
}

impl EncodingSession for FfmpegSession {
    fn start(&mut self, cfg: SessionConfig) -> ReelResult<()> {
        if self.running.is_some() || self.stopped {
            return Err(ReelError::encoding("ffmpeg session already started"));
        }
        cfg.canvas.validate()?;

        let file_name = format!("{}.{}", cfg.file_stem, self.opts.format.extension());
        let out_path = self.opts.out_dir.join(&file_name);
        ensure_parent_dir(&out_path)?;
        if !self.opts.overwrite && out_path.exists() {
            return Err(ReelError::validation(format!(
                "output file '{}' already exists",
                out_path.display()
            )));
        }

        let mut cmd = self.build_command(&cfg)?;
        if !is_ffmpeg_on_path() {
            return Err(ReelError::encoding(
                "ffmpeg is required for encoding, but was not found on PATH",
            ));
        }

        let mut out_file = std::fs::File::create(&out_path).map_err(|e| {
            ReelError::encoding(format!(
                "failed to create output file '{}': {e}",
                out_path.display()
            ))
        })?;
        let partial = PartialOutput::new(out_path.clone());

        let mut child = cmd.spawn().map_err(|e| {
            ReelError::encoding(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let (Some(stdin), Some(mut stdout), Some(mut stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ReelError::encoding("failed to open ffmpeg pipes (unexpected)"));
        };

        let stdout_drain = std::thread::spawn(move || -> std::io::Result<ChunkStats> {
            let mut buf = vec![0u8; CHUNK_BYTES];
            let mut stats = ChunkStats {
                bytes: 0,
                chunks: 0,
            };
            loop {
                let n = stdout.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                out_file.write_all(&buf[..n])?;
                stats.bytes += n as u64;
                stats.chunks += 1;
            }
            out_file.flush()?;
            Ok(stats)
        });
        let stderr_drain = std::thread::spawn(move || -> std::io::Result<Vec<u8>> {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        partial.keep();
        tracing::debug!(path = %out_path.display(), format = ?self.opts.format, "ffmpeg session started");
        self.scratch = vec![0u8; cfg.canvas.rgba8_len()];
        self.running = Some(Running {
            child,
            stdin: Some(stdin),
            stdout_drain,
            stderr_drain,
            out_path,
            file_name,
            cfg,
            frames: 0,
            last_idx: None,
        });
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, surface: &Surface) -> ReelResult<()> {
        let running = self
            .running
            .as_mut()
            .ok_or_else(|| ReelError::encoding("ffmpeg session not started"))?;
        if let Some(last) = running.last_idx
            && idx.0 <= last.0
        {
            return Err(ReelError::encoding(
                "ffmpeg session received out-of-order frame index",
            ));
        }
        if surface.canvas() != running.cfg.canvas {
            return Err(ReelError::encoding("surface size does not match session"));
        }

        flatten_premul_over_bg_to_opaque_rgba8(&mut self.scratch, surface.data(), self.opts.bg_rgba)?;

        let Some(stdin) = running.stdin.as_mut() else {
            return Err(ReelError::encoding("ffmpeg session is already finalized"));
        };
        stdin.write_all(&self.scratch).map_err(|e| {
            ReelError::encoding(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        running.last_idx = Some(idx);
        running.frames += 1;
        Ok(())
    }

    fn stop(&mut self) -> ReelResult<Artifact> {
        let Some(mut running) = self.running.take() else {
            return Err(ReelError::encoding(if self.stopped {
                "ffmpeg session already stopped"
            } else {
                "ffmpeg session not started"
            }));
        };
        self.stopped = true;
        let partial = PartialOutput::new(running.out_path.clone());

        drop(running.stdin.take());
        let status = running.child.wait().map_err(|e| {
            ReelError::encoding(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let copied = running
            .stdout_drain
            .join()
            .map_err(|_| ReelError::encoding("ffmpeg stdout drain thread panicked"))?;
        let stderr_bytes = running
            .stderr_drain
            .join()
            .map_err(|_| ReelError::encoding("ffmpeg stderr drain thread panicked"))?
            .map_err(|e| ReelError::encoding(format!("ffmpeg stderr read failed: {e}")))?;

        let stats = match (status.success(), copied) {
            (true, Ok(stats)) => stats,
            (false, _) => {
                return Err(ReelError::encoding(format!(
                    "ffmpeg exited with status {}: {}",
                    status,
                    String::from_utf8_lossy(&stderr_bytes).trim()
                )));
            }
            (true, Err(e)) => {
                return Err(ReelError::encoding(format!("ffmpeg output copy failed: {e}")));
            }
        };

        partial.keep();
        let cfg = &running.cfg;
        tracing::debug!(
            path = %running.out_path.display(),
            bytes = stats.bytes,
            chunks = stats.chunks,
            frames = running.frames,
            "ffmpeg session finalized"
        );
        Ok(Artifact {
            file_name: running.file_name.clone(),
            media_type: self.opts.format.media_type().to_owned(),
            data: ArtifactData::File(running.out_path.clone()),
            byte_len: stats.bytes,
            chunk_count: stats.chunks,
            frames: running.frames,
            duration_secs: cfg.fps.frames_to_secs(running.frames),
            has_audio: cfg.audio.is_some(),
        })
    }

    fn abort(&mut self) {
        self.stopped = true;
        let Some(mut running) = self.running.take() else {
            return;
        };
        drop(running.stdin.take());
        if let Err(e) = running.child.kill() {
            tracing::debug!("ffmpeg kill failed: {e}");
        }
        let _ = running.child.wait();
        let _ = running.stdout_drain.join();
        let _ = running.stderr_drain.join();
        if let Err(e) = std::fs::remove_file(&running.out_path) {
            tracing::debug!(path = %running.out_path.display(), "partial output not removed: {e}");
        }
    }
}

impl Drop for FfmpegSession {
    fn drop(&mut self) {
        if self.running.is_some() {
            self.abort();
        }
    }
}

/// Artifact file that is removed on drop unless [`PartialOutput::keep`] is called.
struct PartialOutput {
    path: PathBuf,
    armed: bool,
}

impl PartialOutput {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for PartialOutput {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::debug!(path = %self.path.display(), "partial output not removed: {e}");
        }
    }
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // For rawvideo input, `-r` before `-i` sets the input framerate as `num/den`.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

pub(crate) fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> ReelResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(ReelError::validation(
            "flatten_premul_over_bg_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg = [
        u16::from(bg_rgba[0]),
        u16::from(bg_rgba[1]),
        u16::from(bg_rgba[2]),
    ];
    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255u16 - a;
        for c in 0..3 {
            d[c] = (u16::from(s[c]) + mul_div255_u16(bg[c], inv)).min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
