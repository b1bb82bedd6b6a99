use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::assets::decode::{PreparedImage, PreparedScene, PreparedStory};
use crate::encode::sink::InMemorySession;
use crate::foundation::core::{Canvas, Fps};
use crate::pace::clock::VirtualClock;
use crate::render::caption::CaptionStyle;
use crate::render::text::{CaptionFonts, FontChoice};
use crate::session::hooks::RecordingStatus;
use crate::timeline::plan::plan;

fn canvas() -> Canvas {
    Canvas::new(16, 16).unwrap()
}

fn schedule(captions: &[&str]) -> Schedule {
    let scenes = captions
        .iter()
        .enumerate()
        .map(|(i, c)| PreparedScene {
            id: format!("scene-{i}"),
            image: Arc::new(PreparedImage::from_rgba8(2, 2, vec![200; 16]).unwrap()),
            caption: Arc::from(*c),
            duration_secs: 3,
        })
        .collect();
    let story = PreparedStory {
        id: "s".to_owned(),
        transition: Default::default(),
        scenes,
    };
    plan(&[story], Fps::whole(30).unwrap(), 0.5).unwrap()
}

fn renderer() -> FrameRenderer {
    let style = CaptionStyle {
        font_size_px: 2.0,
        line_height_px: 2.0,
        min_band_height_px: 4.0,
        vertical_padding_px: 1.0,
        ..CaptionStyle::default()
    };
    FrameRenderer::new(canvas(), style, &CaptionFonts::default(), FontChoice::Neutral).unwrap()
}

fn config(total_frames: u64) -> SessionConfig {
    SessionConfig {
        canvas: canvas(),
        fps: Fps::whole(30).unwrap(),
        total_frames,
        file_stem: "reel".to_owned(),
        audio: None,
    }
}

struct CancelAfterProgress {
    token: CancelToken,
    seen: Vec<String>,
}

impl StatusSink for CancelAfterProgress {
    fn status(&mut self, message: &str) {
        self.seen.push(message.to_owned());
        self.token.cancel();
    }
}

#[test]
fn realtime_run_pushes_every_frame_and_sleeps_between_them() {
    let sched = schedule(&["Hello."]);
    assert_eq!(sched.total_frames(), 90);
    let mut r = renderer();
    let mut surface = Surface::new(canvas()).unwrap();
    let mut session = InMemorySession::new();
    let mut status = RecordingStatus::default();
    let mut clock = VirtualClock::new();
    let cancel = CancelToken::new();

    let out = FramePacer::new(Pacing::Realtime, 30)
        .drive(
            &sched,
            &mut r,
            &mut surface,
            &mut session,
            config(90),
            PacerIo {
                status: &mut status,
                clock: &mut clock,
                cancel: &cancel,
            },
        )
        .unwrap();

    assert_eq!(out.frames_pushed, 90);
    assert_eq!(out.frames_skipped, 0);
    assert!(!out.cancelled);
    assert_eq!(out.artifact.frames, 90);
    assert_eq!(session.start_calls(), 1);
    assert_eq!(session.stop_calls(), 1);
    assert_eq!(session.abort_calls(), 0);
    assert_eq!(clock.sleeps(), 89);
    assert_eq!(clock.now(), Duration::from_nanos(89 * 1_000_000_000 / 30));
    assert_eq!(status.messages, vec!["Progress: 33%", "Progress: 67%"]);
}

#[test]
fn unpaced_run_never_sleeps() {
    let sched = schedule(&["Hi."]);
    let mut r = renderer();
    let mut surface = Surface::new(canvas()).unwrap();
    let mut session = InMemorySession::new();
    let mut clock = VirtualClock::new();
    let cancel = CancelToken::new();
    let mut status = RecordingStatus::default();

    FramePacer::new(Pacing::Unpaced, 30)
        .drive(
            &sched,
            &mut r,
            &mut surface,
            &mut session,
            config(90),
            PacerIo {
                status: &mut status,
                clock: &mut clock,
                cancel: &cancel,
            },
        )
        .unwrap();
    assert_eq!(clock.sleeps(), 0);
    assert_eq!(session.frame_digests().len(), 90);
}

#[test]
fn cancellation_stops_the_session_once_at_a_frame_boundary() {
    let sched = schedule(&["One.", "Two."]);
    let mut r = renderer();
    let mut surface = Surface::new(canvas()).unwrap();
    let mut session = InMemorySession::new();
    let mut clock = VirtualClock::new();
    let token = CancelToken::new();
    let mut status = CancelAfterProgress {
        token: token.clone(),
        seen: Vec::new(),
    };

    let out = FramePacer::new(Pacing::Unpaced, 30)
        .drive(
            &sched,
            &mut r,
            &mut surface,
            &mut session,
            config(sched.total_frames()),
            PacerIo {
                status: &mut status,
                clock: &mut clock,
                cancel: &token,
            },
        )
        .unwrap();

    assert!(out.cancelled);
    assert_eq!(out.frames_pushed, 30);
    assert_eq!(session.stop_calls(), 1);
    assert_eq!(session.abort_calls(), 0);
    assert_eq!(status.seen.len(), 1);
}

#[test]
fn cancelled_before_the_first_frame_still_starts_and_stops() {
    let sched = schedule(&["x"]);
    let mut r = renderer();
    let mut surface = Surface::new(canvas()).unwrap();
    let mut session = InMemorySession::new();
    let mut clock = VirtualClock::new();
    let cancel = CancelToken::new();
    cancel.cancel();
    let mut status = RecordingStatus::default();

    let out = FramePacer::new(Pacing::Realtime, 30)
        .drive(
            &sched,
            &mut r,
            &mut surface,
            &mut session,
            config(90),
            PacerIo {
                status: &mut status,
                clock: &mut clock,
                cancel: &cancel,
            },
        )
        .unwrap();
    assert!(out.cancelled);
    assert_eq!(out.frames_pushed, 0);
    assert_eq!((session.start_calls(), session.stop_calls()), (1, 1));
}

#[test]
fn push_failure_aborts_instead_of_stopping() {
    let sched = schedule(&["x"]);
    let mut r = renderer();
    let mut surface = Surface::new(canvas()).unwrap();
    let mut session = InMemorySession::new();
    session.fail_on_frame = Some(5);
    let mut clock = VirtualClock::new();
    let cancel = CancelToken::new();
    let mut status = RecordingStatus::default();

    let err = FramePacer::new(Pacing::Unpaced, 30)
        .drive(
            &sched,
            &mut r,
            &mut surface,
            &mut session,
            config(90),
            PacerIo {
                status: &mut status,
                clock: &mut clock,
                cancel: &cancel,
            },
        )
        .unwrap_err();
    assert!(matches!(err, ReelError::Encoding(_)));
    assert_eq!(session.stop_calls(), 0);
    assert_eq!(session.abort_calls(), 1);
}

#[test]
fn mismatched_canvas_is_rejected_before_start() {
    let sched = schedule(&["x"]);
    let mut r = renderer();
    let mut surface = Surface::new(Canvas::new(8, 8).unwrap()).unwrap();
    let mut session = InMemorySession::new();
    let mut clock = VirtualClock::new();
    let cancel = CancelToken::new();
    let mut status = RecordingStatus::default();
    let err = FramePacer::new(Pacing::Unpaced, 30)
        .drive(
            &sched,
            &mut r,
            &mut surface,
            &mut session,
            config(90),
            PacerIo {
                status: &mut status,
                clock: &mut clock,
                cancel: &cancel,
            },
        )
        .unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
    assert_eq!(session.start_calls(), 0);
}

#[test]
fn progress_percent_rounds_and_caps() {
    assert_eq!(progress_percent(30, 90), 33);
    assert_eq!(progress_percent(60, 90), 67);
    assert_eq!(progress_percent(1, 200), 1);
    assert_eq!(progress_percent(5, 4), 100);
    assert_eq!(progress_percent(0, 0), 100);
}
