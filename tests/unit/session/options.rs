use super::*;

#[test]
fn defaults_match_the_documented_values() {
    let o = GenerateOptions::default();
    assert_eq!(o.frame_rate, 30);
    assert_eq!(o.transition_secs, 0.5);
    assert_eq!(o.canvas, Canvas::new(720, 1280).unwrap());
    assert_eq!(o.format, ContainerFormat::Webm);
    assert_eq!(o.pacing, Pacing::Realtime);
    assert_eq!(o.progress_every_frames, 30);
    assert_eq!(o.font_choice(), FontChoice::Neutral);
    o.validate().unwrap();
}

#[test]
fn partial_json_fills_in_defaults() {
    let o: GenerateOptions =
        serde_json::from_str(r#"{"format":"mp4","pacing":"unpaced","use_decorative_font":true}"#)
            .unwrap();
    assert_eq!(o.format, ContainerFormat::Mp4);
    assert_eq!(o.pacing, Pacing::Unpaced);
    assert_eq!(o.font_choice(), FontChoice::Decorative);
    assert_eq!(o.frame_rate, 30);
    assert_eq!(o.caption, CaptionStyle::default());
}

#[test]
fn validate_rejects_bad_values() {
    let bad = [
        GenerateOptions {
            frame_rate: 0,
            ..Default::default()
        },
        GenerateOptions {
            transition_secs: -0.1,
            ..Default::default()
        },
        GenerateOptions {
            transition_secs: f64::NAN,
            ..Default::default()
        },
        GenerateOptions {
            canvas: Canvas {
                width: 721,
                height: 1280,
            },
            ..Default::default()
        },
        GenerateOptions {
            progress_every_frames: 0,
            ..Default::default()
        },
    ];
    for o in bad {
        assert!(
            matches!(o.validate(), Err(ReelError::Validation(_))),
            "{o:?}"
        );
    }
}

#[test]
fn zero_transition_is_allowed() {
    GenerateOptions {
        transition_secs: 0.0,
        ..Default::default()
    }
    .validate()
    .unwrap();
}

#[test]
fn app_config_loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storyreel.json");
    std::fs::write(
        &path,
        r#"{"generate":{"frame_rate":24},"output_dir":"out","logging":{"json":true}}"#,
    )
    .unwrap();
    let cfg = AppConfig::from_path(&path).unwrap();
    assert_eq!(cfg.generate.frame_rate, 24);
    assert_eq!(cfg.output_dir, PathBuf::from("out"));
    assert!(cfg.logging.json);
    assert_eq!(cfg.logging.level, "info");
    assert_eq!(cfg.fonts, FontPaths::default());
}

#[test]
fn app_config_rejects_invalid_generate_section() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, r#"{"generate":{"frame_rate":0}}"#).unwrap();
    assert!(matches!(
        AppConfig::from_path(&path),
        Err(ReelError::Validation(_))
    ));
    std::fs::write(&path, "not json").unwrap();
    let err = AppConfig::from_path(&path).unwrap_err();
    assert!(err.to_string().starts_with("validation error: invalid config"));
}

#[test]
fn missing_config_file_is_an_io_error() {
    let err = AppConfig::from_path(Path::new("/definitely/not/here.json")).unwrap_err();
    assert!(matches!(err, ReelError::Other(_)));
}
