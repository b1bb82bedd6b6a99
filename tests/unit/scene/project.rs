use super::*;

// 1x1 transparent PNG.
const PNG_B64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

fn project_json(duration: &str) -> String {
    format!(
        r#"{{
  "title": "My Trip: Day 1!",
  "stories": [
    {{
      "id": 1700000000000,
      "transition": "fade",
      "images": [
        {{ "id": "a", "text": "Hello. World.", "imageData": "data:image/png;base64,{PNG_B64}", "duration": {duration} }},
        {{ "id": "skipped", "text": "no image", "imageData": "" }}
      ]
    }},
    {{ "id": "s2", "images": [] }}
  ]
}}"#
    )
}

#[test]
fn loads_editor_shape() {
    let p = Project::from_json_str(&project_json("5")).unwrap();
    assert_eq!(p.title, "My Trip: Day 1!");
    assert_eq!(p.stories.len(), 2);

    let s1 = &p.stories[0];
    assert_eq!(s1.id, "1700000000000");
    assert_eq!(s1.transition, TransitionStyle::Fade);
    assert_eq!(s1.scenes.len(), 1, "scenes without image data are skipped");
    assert_eq!(s1.scenes[0].caption(), "Hello. World.");
    assert_eq!(s1.scenes[0].duration_secs(), 5);
    assert_eq!(s1.scenes[0].image.media_type(), Some("image/png"));
    assert!(s1.scenes[0].image.bytes().starts_with(&[0x89, b'P', b'N', b'G']));

    assert_eq!(p.stories[1].transition, TransitionStyle::Fade);
    assert!(p.stories[1].scenes.is_empty());
}

#[test]
fn duration_is_clamped_like_parse_int() {
    let cases = [
        ("\"12s\"", 12),
        ("0", 3),
        ("\"abc\"", 3),
        ("null", 3),
        ("7.9", 7),
        ("-3", 1),
        ("400", 60),
    ];
    for (raw, want) in cases {
        let p = Project::from_json_str(&project_json(raw)).unwrap();
        assert_eq!(p.stories[0].scenes[0].duration_secs(), want, "raw {raw}");
    }
}

#[test]
fn missing_title_or_stories_is_rejected() {
    let err = Project::from_json_str(r#"{"title": "", "stories": []}"#).unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
    let err = Project::from_json_str(r#"{"title": "x"}"#).unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
    let err = Project::from_json_str(r#"{"title": "x", "stories": {}}"#).unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
}

#[test]
fn invalid_base64_scene_is_skipped() {
    let json = r#"{"title": "t", "stories": [{"id": "s", "images": [
        {"id": "bad", "text": "", "imageData": "data:image/png;base64,@@@"},
        {"id": "raw", "text": "", "imageData": "AAEC"}
    ]}]}"#;
    let p = Project::from_json_str(json).unwrap();
    assert_eq!(p.stories[0].scenes.len(), 1);
    assert_eq!(p.stories[0].scenes[0].id, "raw");
    assert_eq!(p.stories[0].scenes[0].image.bytes(), &[0u8, 1, 2]);
    assert_eq!(p.stories[0].scenes[0].image.media_type(), None);
}

#[test]
fn save_then_load_preserves_stories() {
    let p = Project::from_json_str(&project_json("\"9\"")).unwrap();
    let json = p.to_json().unwrap();
    let back = Project::from_json_str(&json).unwrap();
    assert_eq!(back, p);
}

#[test]
fn artifact_stem_is_deterministic() {
    assert_eq!(artifact_stem("My Trip: Day 1!"), "my_trip__day_1_");
    assert_eq!(artifact_stem("ABC123"), "abc123");
    assert_eq!(artifact_stem(""), "video");
    assert_eq!(artifact_stem("Été"), "_t_");
}
