use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        ReelError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        ReelError::empty_input("x")
            .to_string()
            .contains("empty input:")
    );
    assert!(
        ReelError::image_decode("x")
            .to_string()
            .contains("image decode error:")
    );
    assert!(
        ReelError::audio_setup("x")
            .to_string()
            .contains("audio setup error:")
    );
    assert!(
        ReelError::encoding("x")
            .to_string()
            .contains("encoding error:")
    );
    assert!(
        ReelError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ReelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn user_message_never_leaks_detail() {
    let err = ReelError::encoding("ffmpeg exited with status 1: /secret/path");
    assert_eq!(err.user_message(), "Error generating video");
    assert!(!err.user_message().contains("secret"));
    assert_eq!(
        ReelError::Busy.user_message(),
        "Video generation already in progress..."
    );
    assert_eq!(
        ReelError::empty_input("no stories").user_message(),
        "Please add at least one story before generating video."
    );
}
