//! Timeline planning: stories and captions become frame-counted runs.
//!
//! A [`Schedule`] is a list of [`Run`]s laid end to end. Each run expands lazily into one
//! [`RenderInstruction`] per frame, so a schedule for a long video stays small.

use std::sync::Arc;

use serde::Serialize;

use crate::assets::decode::{ImageHandle, PreparedStory};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};
use crate::timeline::duration::{segment_caption, segment_duration_secs};

/// Drawing parameters for exactly one output frame.
#[derive(Clone, Debug)]
pub struct RenderInstruction {
    /// Image drawn first, at opacity `alpha`.
    pub primary_image: ImageHandle,
    /// Caption drawn over the primary image (may be empty).
    pub primary_text: Arc<str>,
    /// Image drawn second, at opacity `1 - alpha`, during cross-fades.
    pub secondary_image: Option<ImageHandle>,
    /// Caption drawn over the secondary image during cross-fades.
    pub secondary_text: Option<Arc<str>>,
    /// Blend factor in `[0, 1]`; `1` for steady frames.
    pub alpha: f32,
}

impl RenderInstruction {
    /// `true` when this frame blends two sources.
    pub fn is_cross_fade(&self) -> bool {
        self.secondary_image.is_some()
    }
}

/// What a run shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    /// One segment of a scene's caption over its image.
    Steady,
    /// Two consecutive caption segments of one scene cross-fading over the same image.
    CaptionFade,
    /// The last scene of a story cross-fading into the first scene of the next one.
    SceneFade,
}

/// An image with the caption drawn over it.
#[derive(Clone, Debug)]
pub struct Layer {
    /// Image handle.
    pub image: ImageHandle,
    /// Caption text.
    pub text: Arc<str>,
}

/// A contiguous span of frames sharing one kind of instruction.
#[derive(Clone, Debug)]
pub struct Run {
    /// Kind of frames in this run.
    pub kind: RunKind,
    /// Story the run belongs to (the outgoing story for scene fades).
    pub story: usize,
    /// Scene within `story` (the outgoing scene for fades).
    pub scene: usize,
    /// First output frame of the run.
    pub start_frame: u64,
    /// Number of frames, rounded on its own.
    pub frame_count: u64,
    /// Steady layer, or the incoming side of a fade.
    pub layer: Layer,
    /// Outgoing side of a fade.
    pub outgoing: Option<Layer>,
}

impl Run {
    /// Blend factor for the frame at `offset` within the run.
    ///
    /// Fades rise linearly as `offset / frame_count`, so the first frame is `0` and the last is
    /// just below `1`.
    pub fn alpha_at(&self, offset: u64) -> f32 {
        match self.kind {
            RunKind::Steady => 1.0,
            RunKind::CaptionFade | RunKind::SceneFade => {
                if self.frame_count == 0 {
                    return 1.0;
                }
                (offset.min(self.frame_count) as f64 / self.frame_count as f64) as f32
            }
        }
    }

    /// Instruction for the frame at `offset` within the run.
    pub fn instruction(&self, offset: u64) -> RenderInstruction {
        RenderInstruction {
            primary_image: Arc::clone(&self.layer.image),
            primary_text: Arc::clone(&self.layer.text),
            secondary_image: self.outgoing.as_ref().map(|l| Arc::clone(&l.image)),
            secondary_text: self.outgoing.as_ref().map(|l| Arc::clone(&l.text)),
            alpha: self.alpha_at(offset),
        }
    }

    fn end_frame(&self) -> u64 {
        self.start_frame + self.frame_count
    }
}

/// Frame-counted plan for one generation run.
#[derive(Clone, Debug)]
pub struct Schedule {
    runs: Vec<Run>,
    total_frames: u64,
    fps: Fps,
    transition_frames: u64,
}

/// Serializable overview of a schedule, as printed by `storyreel plan`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScheduleSummary {
    /// Frames per second as `num/den`.
    pub fps: Fps,
    /// Total output frames.
    pub total_frames: u64,
    /// `total_frames / fps`.
    pub total_duration_secs: f64,
    /// Frames per cross-fade.
    pub transition_frames: u64,
    /// One entry per run.
    pub runs: Vec<RunSummary>,
}

/// Serializable overview of a single run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunSummary {
    /// Run kind.
    pub kind: RunKind,
    /// Story index.
    pub story: usize,
    /// Scene index.
    pub scene: usize,
    /// First frame.
    pub start_frame: u64,
    /// Frame count.
    pub frame_count: u64,
    /// Caption shown (incoming side for fades).
    pub text: String,
}

impl Schedule {
    /// Runs in playback order.
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Total number of output frames; equals the sum of all run frame counts.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// `total_frames / fps`, in seconds.
    pub fn total_duration_secs(&self) -> f64 {
        self.fps.frames_to_secs(self.total_frames)
    }

    /// Output frame rate.
    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Frames per cross-fade run.
    pub fn transition_frames(&self) -> u64 {
        self.transition_frames
    }

    /// Instruction for one output frame, or `None` past the end.
    pub fn instruction_at(&self, frame: FrameIndex) -> Option<RenderInstruction> {
        let f = frame.0;
        if f >= self.total_frames {
            return None;
        }
        let idx = self.runs.partition_point(|r| r.end_frame() <= f);
        let run = self.runs.get(idx)?;
        Some(run.instruction(f - run.start_frame))
    }

    /// One instruction per output frame, in order.
    pub fn instructions(&self) -> impl Iterator<Item = RenderInstruction> + '_ {
        self.runs
            .iter()
            .flat_map(|run| (0..run.frame_count).map(move |off| run.instruction(off)))
    }

    /// Serializable overview of the schedule.
    pub fn summary(&self) -> ScheduleSummary {
        ScheduleSummary {
            fps: self.fps,
            total_frames: self.total_frames,
            total_duration_secs: self.total_duration_secs(),
            transition_frames: self.transition_frames,
            runs: self
                .runs
                .iter()
                .map(|r| RunSummary {
                    kind: r.kind,
                    story: r.story,
                    scene: r.scene,
                    start_frame: r.start_frame,
                    frame_count: r.frame_count,
                    text: r.layer.text.to_string(),
                })
                .collect(),
        }
    }
}

struct Builder {
    runs: Vec<Run>,
    cursor: u64,
}

impl Builder {
    fn push(
        &mut self,
        kind: RunKind,
        (story, scene): (usize, usize),
        frame_count: u64,
        layer: Layer,
        outgoing: Option<Layer>,
    ) {
        if frame_count == 0 {
            return;
        }
        self.runs.push(Run {
            kind,
            story,
            scene,
            start_frame: self.cursor,
            frame_count,
            layer,
            outgoing,
        });
        self.cursor += frame_count;
    }
}

/// Build the schedule for `stories`.
///
/// Each caption segment becomes a steady run of `round(duration * fps)` frames. Consecutive
/// segments of one scene are joined by a caption fade and scenes of one story cut. When two
/// adjacent stories both hold scenes, the last scene of the first fades into the first scene of
/// the second with captions cleared. Fades last `round(transition_secs * fps)` frames and are
/// dropped when that is zero.
#[tracing::instrument(skip(stories), fields(stories = stories.len()))]
pub fn plan(stories: &[PreparedStory], fps: Fps, transition_secs: f64) -> ReelResult<Schedule> {
    if stories.is_empty() {
        return Err(ReelError::empty_input("no stories"));
    }
    if stories.iter().all(|s| s.scenes.is_empty()) {
        return Err(ReelError::empty_input("no story has a scene"));
    }
    if !transition_secs.is_finite() || transition_secs < 0.0 {
        return Err(ReelError::validation(
            "transition duration must be finite and non-negative",
        ));
    }
    for story in stories {
        for scene in &story.scenes {
            if !scene.image.is_ready() {
                return Err(ReelError::image_decode(format!(
                    "story '{}' scene '{}' image is not ready",
                    story.id, scene.id
                )));
            }
        }
    }

    let transition_frames = fps.secs_to_frames_round(transition_secs);
    let empty: Arc<str> = Arc::from("");
    let mut b = Builder {
        runs: Vec::new(),
        cursor: 0,
    };

    for (si, story) in stories.iter().enumerate() {
        for (ci, scene) in story.scenes.iter().enumerate() {
            let segments = segment_caption(&scene.caption);
            let mut prev: Option<Layer> = None;
            for segment in segments {
                let layer = Layer {
                    image: Arc::clone(&scene.image),
                    text: Arc::from(segment),
                };
                if let Some(outgoing) = prev.take() {
                    b.push(
                        RunKind::CaptionFade,
                        (si, ci),
                        transition_frames,
                        layer.clone(),
                        Some(outgoing),
                    );
                }
                let frames = fps.secs_to_frames_round(f64::from(segment_duration_secs(segment)));
                b.push(RunKind::Steady, (si, ci), frames, layer.clone(), None);
                prev = Some(layer);
            }
        }

        let Some(last) = story.scenes.last() else {
            continue;
        };
        let Some(first_next) = stories.get(si + 1).and_then(|n| n.scenes.first()) else {
            continue;
        };
        b.push(
            RunKind::SceneFade,
            (si, story.scenes.len() - 1),
            transition_frames,
            Layer {
                image: Arc::clone(&first_next.image),
                text: Arc::clone(&empty),
            },
            Some(Layer {
                image: Arc::clone(&last.image),
                text: Arc::clone(&empty),
            }),
        );
    }

    let total_frames = b.cursor;
    tracing::debug!(
        runs = b.runs.len(),
        total_frames,
        transition_frames,
        "schedule planned"
    );
    Ok(Schedule {
        runs: b.runs,
        total_frames,
        fps,
        transition_frames,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/plan.rs"]
mod tests;
