use super::*;
use crate::assets::decode::{PreparedImage, PreparedScene};

fn image() -> ImageHandle {
    Arc::new(PreparedImage::from_rgba8(2, 2, vec![255; 16]).unwrap())
}

fn scene(id: &str, caption: &str) -> PreparedScene {
    PreparedScene {
        id: id.to_owned(),
        image: image(),
        caption: Arc::from(caption),
        duration_secs: 3,
    }
}

fn story(id: &str, scenes: Vec<PreparedScene>) -> PreparedStory {
    PreparedStory {
        id: id.to_owned(),
        transition: Default::default(),
        scenes,
    }
}

fn fps30() -> Fps {
    Fps::whole(30).unwrap()
}

#[test]
fn two_story_example_totals_300_frames() {
    let stories = vec![
        story("s1", vec![scene("a", "Hello. World.")]),
        story("s2", vec![scene("b", "Bye.")]),
    ];
    let sched = plan(&stories, fps30(), 0.5).unwrap();
    assert_eq!(sched.total_frames(), 300);
    assert_eq!(sched.total_duration_secs(), 10.0);

    let shape: Vec<(RunKind, u64)> = sched
        .runs()
        .iter()
        .map(|r| (r.kind, r.frame_count))
        .collect();
    assert_eq!(
        shape,
        vec![
            (RunKind::Steady, 90),
            (RunKind::CaptionFade, 15),
            (RunKind::Steady, 90),
            (RunKind::SceneFade, 15),
            (RunKind::Steady, 90),
        ]
    );
    assert_eq!(&*sched.runs()[0].layer.text, "Hello.");
    assert_eq!(&*sched.runs()[2].layer.text, "World.");
}

#[test]
fn frame_counts_sum_to_total_and_are_contiguous() {
    let long = "one two three four five six seven eight nine ten. short one!";
    let stories = vec![
        story("s1", vec![scene("a", long), scene("b", "")]),
        story("empty", vec![]),
        story("s3", vec![scene("c", "x? y? z?")]),
    ];
    let sched = plan(&stories, Fps::new(30_000, 1001).unwrap(), 0.5).unwrap();
    let mut cursor = 0;
    for run in sched.runs() {
        assert_eq!(run.start_frame, cursor);
        assert!(run.frame_count > 0);
        cursor += run.frame_count;
    }
    assert_eq!(cursor, sched.total_frames());
    assert_eq!(sched.instructions().count() as u64, sched.total_frames());
    // The empty story between s1 and s3 means a hard cut: no scene fade at all.
    assert!(sched.runs().iter().all(|r| r.kind != RunKind::SceneFade));
}

#[test]
fn empty_caption_gets_one_three_second_run() {
    let sched = plan(&[story("s", vec![scene("a", "")])], fps30(), 0.5).unwrap();
    assert_eq!(sched.runs().len(), 1);
    assert_eq!(sched.runs()[0].kind, RunKind::Steady);
    assert_eq!(sched.runs()[0].frame_count, 90);
    assert_eq!(&*sched.runs()[0].layer.text, "");
}

#[test]
fn scenes_within_a_story_cut_without_fade() {
    let sched = plan(
        &[story("s", vec![scene("a", "One"), scene("b", "Two")])],
        fps30(),
        0.5,
    )
    .unwrap();
    let kinds: Vec<_> = sched.runs().iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![RunKind::Steady, RunKind::Steady]);
    assert_eq!(sched.total_frames(), 180);
}

#[test]
fn zero_transition_omits_fades() {
    let stories = vec![
        story("s1", vec![scene("a", "A. B.")]),
        story("s2", vec![scene("b", "C")]),
    ];
    let sched = plan(&stories, fps30(), 0.0).unwrap();
    assert!(sched.runs().iter().all(|r| r.kind == RunKind::Steady));
    assert_eq!(sched.total_frames(), 270);
}

#[test]
fn fade_alpha_is_monotonic_and_bounded() {
    let stories = vec![
        story("s1", vec![scene("a", "A. B.")]),
        story("s2", vec![scene("b", "C")]),
    ];
    let sched = plan(&stories, fps30(), 0.5).unwrap();
    for run in sched.runs().iter().filter(|r| r.kind != RunKind::Steady) {
        let alphas: Vec<f32> = (0..run.frame_count).map(|o| run.alpha_at(o)).collect();
        assert_eq!(alphas[0], 0.0);
        assert!(alphas.windows(2).all(|w| w[0] < w[1]));
        assert!(alphas.iter().all(|a| (0.0..1.0).contains(a)));
        let first = run.instruction(0);
        assert!(first.is_cross_fade());
    }
    let scene_fade = sched
        .runs()
        .iter()
        .find(|r| r.kind == RunKind::SceneFade)
        .unwrap();
    let instr = scene_fade.instruction(3);
    assert_eq!(&*instr.primary_text, "");
    assert_eq!(instr.secondary_text.as_deref(), Some(""));
    assert!(Arc::ptr_eq(&instr.primary_image, &stories[1].scenes[0].image));
    assert!(Arc::ptr_eq(
        instr.secondary_image.as_ref().unwrap(),
        &stories[0].scenes[0].image
    ));
}

#[test]
fn caption_fade_swaps_text_over_same_image() {
    let stories = vec![story("s", vec![scene("a", "First. Second.")])];
    let sched = plan(&stories, fps30(), 0.5).unwrap();
    let instr = sched.instruction_at(FrameIndex(90)).unwrap();
    assert_eq!(&*instr.primary_text, "Second.");
    assert_eq!(instr.secondary_text.as_deref(), Some("First."));
    assert_eq!(instr.alpha, 0.0);
    assert!(Arc::ptr_eq(
        &instr.primary_image,
        instr.secondary_image.as_ref().unwrap()
    ));

    let steady = sched.instruction_at(FrameIndex(89)).unwrap();
    assert_eq!(&*steady.primary_text, "First.");
    assert_eq!(steady.alpha, 1.0);
    assert!(sched.instruction_at(FrameIndex(sched.total_frames())).is_none());
}

#[test]
fn planning_is_deterministic() {
    let stories = vec![
        story("s1", vec![scene("a", "One. Two! Three?")]),
        story("s2", vec![scene("b", "Four")]),
    ];
    let a = plan(&stories, fps30(), 0.5).unwrap().summary();
    let b = plan(&stories, fps30(), 0.5).unwrap().summary();
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn empty_input_is_rejected() {
    let err = plan(&[], fps30(), 0.5).unwrap_err();
    assert!(matches!(err, ReelError::EmptyInput(_)));
    let err = plan(&[story("s", vec![])], fps30(), 0.5).unwrap_err();
    assert!(matches!(err, ReelError::EmptyInput(_)));
}

#[test]
fn unready_image_fails_planning() {
    let mut sc = scene("a", "x");
    sc.image = Arc::new(PreparedImage::unready(4, 4));
    let err = plan(&[story("s", vec![sc])], fps30(), 0.5).unwrap_err();
    assert!(matches!(err, ReelError::ImageDecode(_)));
}

#[test]
fn negative_transition_is_rejected() {
    let err = plan(&[story("s", vec![scene("a", "x")])], fps30(), -1.0).unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
}
