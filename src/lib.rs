//! storyreel compiles illustrated stories into captioned, cross-faded videos.
//!
//! A run goes through a fixed set of stages:
//!
//! - decode every scene image ([`preload_stories`])
//! - plan a frame-exact [`Schedule`] from the captions ([`plan`])
//! - draw one [`RenderInstruction`] per frame with a [`FrameRenderer`]
//! - pace frames into an [`EncodingSession`] ([`FramePacer`])
//! - fit an optional soundtrack to the video length ([`AudioSynchronizer`])
//!
//! [`Generator::generate`] wires the stages together, allows one run at a time and reports
//! progress through a [`StatusSink`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod foundation;

pub(crate) mod audio;
/// Encoding sessions.
pub mod encode;
pub(crate) mod pace;
pub(crate) mod render;
/// Boundary scene model and project files.
pub mod scene;
/// Generation sessions.
pub mod session;
pub(crate) mod timeline;

pub use crate::foundation::core::{Affine, Canvas, Fps, FrameIndex, Rect, Vec2};
pub use crate::foundation::error::{ReelError, ReelResult};

pub use crate::assets::decode::{
    ImageHandle, PreparedImage, PreparedScene, PreparedStory, decode_image, preload_stories,
};
pub use crate::assets::media::{AudioPcm, MIX_SAMPLE_RATE, decode_audio_f32_stereo};
pub use crate::audio::mix::{FADE_OUT_SECS, frame_to_sample, plan_gain};
pub use crate::audio::sync::{
    AudioCleanup, AudioDecodeFn, AudioMode, AudioPlan, AudioResource, AudioSynchronizer,
    AudioTrack, MixGraph, PreparedAudio,
};
pub use crate::encode::ffmpeg::{FfmpegSession, FfmpegSessionOpts, is_ffmpeg_on_path};
pub use crate::encode::sink::{
    Artifact, ArtifactData, AudioInputConfig, ContainerFormat, EncodingSession, InMemorySession,
    SessionConfig,
};
pub use crate::pace::clock::{FrameClock, FrameTicker, SystemClock, VirtualClock};
pub use crate::pace::pacer::{FramePacer, PacerIo, PacerOutcome, progress_percent};
pub use crate::render::caption::{
    CaptionLayout, CaptionStyle, FixedAdvance, TextMeasure, layout_caption, wrap_words,
};
pub use crate::render::frame::{FrameOutcome, FrameRenderer, cover_transform};
pub use crate::render::surface::{FrameRGBA, Surface};
pub use crate::render::text::{CaptionFonts, FontChoice};
pub use crate::scene::model::{ImageSource, Scene, Story, TransitionStyle};
pub use crate::scene::project::{Project, artifact_stem};
pub use crate::session::generator::{GenerateIo, GenerationReport, Generator};
pub use crate::session::hooks::{
    CancelToken, EditingHooks, NoopHooks, RecordingStatus, StatusSink, TracingStatus,
};
pub use crate::session::options::{AppConfig, FontPaths, GenerateOptions, LoggingConfig, Pacing};
pub use crate::timeline::duration::{
    segment_caption, segment_duration_secs, split_sentences, word_count,
};
pub use crate::timeline::plan::{
    Layer, RenderInstruction, Run, RunKind, RunSummary, Schedule, ScheduleSummary, plan,
};
