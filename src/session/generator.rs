use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::assets::decode::preload_stories;
use crate::audio::sync::{AudioPlan, AudioResource, AudioSynchronizer, PreparedAudio};
use crate::encode::sink::{Artifact, EncodingSession, SessionConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{ReelError, ReelResult};
use crate::pace::clock::FrameClock;
use crate::pace::pacer::{FramePacer, PacerIo};
use crate::render::frame::FrameRenderer;
use crate::render::surface::{FrameRGBA, Surface};
use crate::render::text::{CaptionFonts, FontChoice};
use crate::scene::model::{Story, has_renderable_scenes};
use crate::scene::project::artifact_stem;
use crate::session::hooks::{CancelToken, EditingHooks, StatusSink};
use crate::session::options::GenerateOptions;
use crate::timeline::plan::{Schedule, ScheduleSummary, plan};

const STATUS_PREPARING: &str = "Preparing to generate video...";
const STATUS_COMPLETE: &str = "Video generation complete!";

/// Collaborators the caller lends to one [`Generator::generate`] run.
pub struct GenerateIo<'a> {
    /// Editing affordances locked for the duration of the run.
    pub hooks: &'a mut dyn EditingHooks,
    /// Receives progress and exactly one terminal status line.
    pub status: &'a mut dyn StatusSink,
    /// Capture/encode backend.
    pub encoder: &'a mut dyn EncodingSession,
    /// Time source for real-time pacing.
    pub clock: &'a mut dyn FrameClock,
    /// Cooperative cancellation, checked at every frame boundary.
    pub cancel: &'a CancelToken,
}

/// Outcome of a successful run.
#[derive(Debug)]
pub struct GenerationReport {
    /// The encoded video.
    pub artifact: Artifact,
    /// Frames the schedule held.
    pub total_frames: u64,
    /// Frames pushed to the encoder.
    pub frames_pushed: u64,
    /// Frames whose images were not drawable.
    pub frames_skipped: u64,
    /// How the audio track was fitted, when one was muxed.
    pub audio: Option<AudioPlan>,
    /// Caption typeface in use, `None` when no font was available.
    pub font: Option<FontChoice>,
}

/// Turns stories into a video, one run at a time.
///
/// Clones share the same in-flight flag, so a second run started through any clone while one is
/// active is rejected with [`ReelError::Busy`]. The flag is scoped to a generator and its clones:
/// independently constructed generators do not block each other. An application that needs one
/// run per process keeps a single generator and hands out clones.
#[derive(Clone, Debug, Default)]
pub struct Generator {
    active: Arc<AtomicBool>,
    fonts: CaptionFonts,
    audio: AudioSynchronizer,
}

struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct EditingGuard<'a>(&'a mut dyn EditingHooks);

impl<'a> EditingGuard<'a> {
    fn lock(hooks: &'a mut dyn EditingHooks) -> Self {
        hooks.disable_editing();
        Self(hooks)
    }
}

impl Drop for EditingGuard<'_> {
    fn drop(&mut self) {
        self.0.enable_editing();
    }
}

impl Generator {
    /// Generator drawing captions with `fonts`.
    pub fn new(fonts: CaptionFonts) -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
            fonts,
            audio: AudioSynchronizer::new(),
        }
    }

    /// Replace the audio synchronizer (e.g. to move scratch files).
    pub fn with_audio_synchronizer(mut self, audio: AudioSynchronizer) -> Self {
        self.audio = audio;
        self
    }

    /// `true` while a run is in flight.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Render `stories` into a video.
    ///
    /// Emits exactly one terminal status line: the completion message, or the generic message of
    /// the returned error. Audio problems are reported as a warning and the run continues without
    /// sound. A cancelled run discards its artifact and returns [`ReelError::Cancelled`].
    pub fn generate(
        &self,
        stories: &[Story],
        audio: Option<&AudioResource>,
        opts: &GenerateOptions,
        io: GenerateIo<'_>,
    ) -> ReelResult<GenerationReport> {
        let GenerateIo {
            hooks,
            status,
            encoder,
            clock,
            cancel,
        } = io;

        let res = match self.acquire() {
            Some(_active) => self.run(stories, audio, opts, hooks, &mut *status, encoder, clock, cancel),
            None => Err(ReelError::Busy),
        };

        match &res {
            Ok(report) => {
                tracing::info!(
                    file = %report.artifact.file_name,
                    frames = report.frames_pushed,
                    bytes = report.artifact.byte_len,
                    "video generation complete"
                );
                status.status(STATUS_COMPLETE);
            }
            Err(e @ (ReelError::Busy | ReelError::Cancelled | ReelError::EmptyInput(_))) => {
                tracing::info!("{e}");
                status.status(e.user_message());
            }
            Err(e) => {
                tracing::error!("video generation failed: {e}");
                status.status(e.user_message());
            }
        }
        res
    }

    /// Plan `stories` without rendering, for inspection.
    pub fn plan_summary(
        &self,
        stories: &[Story],
        opts: &GenerateOptions,
    ) -> ReelResult<ScheduleSummary> {
        Ok(self.schedule(stories, opts)?.summary())
    }

    /// Render the single scheduled frame `frame`.
    pub fn preview_frame(
        &self,
        stories: &[Story],
        opts: &GenerateOptions,
        frame: FrameIndex,
    ) -> ReelResult<FrameRGBA> {
        let schedule = self.schedule(stories, opts)?;
        let instr = schedule.instruction_at(frame).ok_or_else(|| {
            ReelError::validation(format!(
                "frame {} is outside the schedule (0..{})",
                frame.0,
                schedule.total_frames()
            ))
        })?;
        let mut renderer =
            FrameRenderer::new(opts.canvas, opts.caption.clone(), &self.fonts, opts.font_choice())?;
        let mut surface = Surface::new(opts.canvas)?;
        renderer.render(&mut surface, &instr)?;
        Ok(surface.snapshot())
    }

    fn schedule(&self, stories: &[Story], opts: &GenerateOptions) -> ReelResult<Schedule> {
        if !has_renderable_scenes(stories) {
            return Err(ReelError::empty_input("no story holds a scene"));
        }
        opts.validate()?;
        let prepared = preload_stories(stories)?;
        plan(&prepared, opts.fps()?, opts.transition_secs)
    }

    fn acquire(&self) -> Option<ActiveGuard> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ActiveGuard(Arc::clone(&self.active)))
    }

    #[allow(clippy::too_many_arguments)]
    #[tracing::instrument(skip_all, fields(stories = stories.len(), title = %opts.title))]
    fn run(
        &self,
        stories: &[Story],
        audio: Option<&AudioResource>,
        opts: &GenerateOptions,
        hooks: &mut dyn EditingHooks,
        status: &mut dyn StatusSink,
        encoder: &mut dyn EncodingSession,
        clock: &mut dyn FrameClock,
        cancel: &CancelToken,
    ) -> ReelResult<GenerationReport> {
        if !has_renderable_scenes(stories) {
            return Err(ReelError::empty_input("no story holds a scene"));
        }
        opts.validate()?;

        status.status(STATUS_PREPARING);
        let _editing = EditingGuard::lock(hooks);

        let prepared = preload_stories(stories)?;
        let fps = opts.fps()?;
        let schedule = plan(&prepared, fps, opts.transition_secs)?;
        tracing::debug!(
            total_frames = schedule.total_frames(),
            runs = schedule.runs().len(),
            "timeline planned"
        );

        let prepared_audio = audio.and_then(|res| {
            match self.audio.prepare(res, schedule.total_frames(), fps) {
                Ok(pa) => Some(pa),
                Err(e) => {
                    tracing::warn!("continuing without audio: {e}");
                    status.status(e.user_message());
                    None
                }
            }
        });
        let audio_plan = prepared_audio.as_ref().map(|pa| pa.plan);

        let mut renderer =
            FrameRenderer::new(opts.canvas, opts.caption.clone(), &self.fonts, opts.font_choice())?;
        let mut surface = Surface::new(opts.canvas)?;
        let cfg = SessionConfig {
            canvas: opts.canvas,
            fps,
            total_frames: schedule.total_frames(),
            file_stem: artifact_stem(&opts.title),
            audio: prepared_audio.as_ref().map(|pa| pa.track.input_config()),
        };

        let driven = FramePacer::new(opts.pacing, opts.progress_every_frames).drive(
            &schedule,
            &mut renderer,
            &mut surface,
            encoder,
            cfg,
            PacerIo {
                status,
                clock,
                cancel,
            },
        );
        release_audio(prepared_audio);
        let outcome = driven?;

        if outcome.cancelled {
            if let Err(e) = outcome.artifact.discard() {
                tracing::warn!("failed to discard cancelled artifact: {e}");
            }
            return Err(ReelError::Cancelled);
        }

        Ok(GenerationReport {
            artifact: outcome.artifact,
            total_frames: schedule.total_frames(),
            frames_pushed: outcome.frames_pushed,
            frames_skipped: outcome.frames_skipped,
            audio: audio_plan,
            font: renderer.font_choice(),
        })
    }
}

fn release_audio(audio: Option<PreparedAudio>) {
    if let Some(pa) = audio
        && let Err(e) = pa.cleanup.run()
    {
        tracing::warn!("audio cleanup failed: {e}");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/generator.rs"]
mod tests;
