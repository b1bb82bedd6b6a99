use crate::encode::sink::{Artifact, EncodingSession, SessionConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{ReelError, ReelResult};
use crate::pace::clock::{FrameClock, FrameTicker};
use crate::render::frame::{FrameOutcome, FrameRenderer};
use crate::render::surface::Surface;
use crate::session::hooks::{CancelToken, StatusSink};
use crate::session::options::Pacing;
use crate::timeline::plan::Schedule;

/// What happened during [`FramePacer::drive`].
#[derive(Debug)]
pub struct PacerOutcome {
    /// Artifact returned by the session's `stop`.
    pub artifact: Artifact,
    /// Frames pushed to the session.
    pub frames_pushed: u64,
    /// Frames whose instruction was skipped by the renderer.
    pub frames_skipped: u64,
    /// Whether the run ended early on the cancel token.
    pub cancelled: bool,
}

/// Collaborators borrowed for one drive.
pub struct PacerIo<'a> {
    /// Status sink receiving throttled progress.
    pub status: &'a mut dyn StatusSink,
    /// Time source.
    pub clock: &'a mut dyn FrameClock,
    /// Checked before every frame.
    pub cancel: &'a CancelToken,
}

/// Walks a schedule frame by frame: render, capture, wait.
#[derive(Clone, Debug)]
pub struct FramePacer {
    pacing: Pacing,
    progress_every_frames: u64,
}

impl FramePacer {
    /// Pacer reporting progress every `progress_every_frames` frames.
    pub fn new(pacing: Pacing, progress_every_frames: u64) -> Self {
        Self {
            pacing,
            progress_every_frames: progress_every_frames.max(1),
        }
    }

    /// Drive `schedule` to completion or cancellation.
    ///
    /// The session is started once. On success or cancellation it is stopped once and the
    /// artifact returned; on any error it is aborted once instead and the error propagated.
    #[tracing::instrument(skip_all, fields(total_frames = schedule.total_frames()))]
    pub fn drive(
        &self,
        schedule: &Schedule,
        renderer: &mut FrameRenderer,
        surface: &mut Surface,
        session: &mut dyn EncodingSession,
        cfg: SessionConfig,
        io: PacerIo<'_>,
    ) -> ReelResult<PacerOutcome> {
        if surface.canvas() != cfg.canvas || renderer.canvas() != cfg.canvas {
            return Err(ReelError::validation(
                "surface, renderer and session canvas must match",
            ));
        }
        if let Err(e) = session.start(cfg) {
            session.abort();
            return Err(e);
        }

        match self.run_frames(schedule, renderer, surface, session, io) {
            Ok((pushed, skipped, cancelled)) => {
                let artifact = session.stop()?;
                Ok(PacerOutcome {
                    artifact,
                    frames_pushed: pushed,
                    frames_skipped: skipped,
                    cancelled,
                })
            }
            Err(e) => {
                tracing::error!("frame production failed: {e}");
                session.abort();
                Err(e)
            }
        }
    }

    fn run_frames(
        &self,
        schedule: &Schedule,
        renderer: &mut FrameRenderer,
        surface: &mut Surface,
        session: &mut dyn EncodingSession,
        io: PacerIo<'_>,
    ) -> ReelResult<(u64, u64, bool)> {
        let total = schedule.total_frames();
        let mut ticker = FrameTicker::new(schedule.fps());
        let mut pushed = 0u64;
        let mut skipped = 0u64;

        for instr in schedule.instructions() {
            if io.cancel.is_cancelled() {
                tracing::info!(frame = pushed, total, "generation cancelled");
                return Ok((pushed, skipped, true));
            }
            if self.pacing == Pacing::Realtime {
                let late = ticker.wait_next(io.clock);
                if late > schedule.fps().frame_interval() {
                    tracing::trace!(frame = pushed, late_ms = late.as_millis() as u64, "frame behind schedule");
                }
            }

            if renderer.render(surface, &instr)? == FrameOutcome::Skipped {
                skipped += 1;
            }
            session.push_frame(FrameIndex(pushed), surface)?;
            pushed += 1;

            if pushed % self.progress_every_frames == 0 && pushed < total {
                io.status.progress(progress_percent(pushed, total));
            }
        }
        Ok((pushed, skipped, false))
    }
}

/// `round(done / total * 100)`, capped at 100.
pub fn progress_percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (done as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/pace/pacer.rs"]
mod tests;
