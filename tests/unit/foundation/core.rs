use super::*;

#[test]
fn fps_rejects_zero_parts() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
    assert_eq!(Fps::whole(30).unwrap(), Fps { num: 30, den: 1 });
}

#[test]
fn secs_to_frames_rounds_each_value_independently() {
    let fps = Fps::whole(30).unwrap();
    assert_eq!(fps.secs_to_frames_round(0.5), 15);
    assert_eq!(fps.secs_to_frames_round(3.0), 90);
    assert_eq!(fps.secs_to_frames_round(0.51), 15);
    assert_eq!(fps.secs_to_frames_round(-1.0), 0);

    let ntsc = Fps::new(30000, 1001).unwrap();
    assert_eq!(ntsc.secs_to_frames_round(1.0), 30);
}

#[test]
fn frame_interval_matches_rate() {
    let fps = Fps::whole(25).unwrap();
    assert_eq!(fps.frame_interval(), Duration::from_millis(40));
    assert!((fps.frames_to_secs(300) - 12.0).abs() < 1e-9);
}

#[test]
fn canvas_validation() {
    assert!(Canvas::new(720, 1280).is_ok());
    assert!(Canvas::new(0, 10).is_err());
    assert!(Canvas::new(721, 1280).is_err());
    assert!(Canvas::new(70_000, 2).is_err());
    assert_eq!(Canvas::default(), Canvas::PORTRAIT_720P);
    assert_eq!(Canvas::new(4, 2).unwrap().rgba8_len(), 32);
}
