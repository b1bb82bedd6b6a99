/// Convenience result type used across storyreel.
pub type ReelResult<T> = Result<T, ReelError>;

/// Top-level error taxonomy used by the generation pipeline.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Invalid user-provided options or project data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Nothing to render: no stories, or no story holds a scene.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// A scene image could not be decoded into a drawable handle.
    #[error("image decode error: {0}")]
    ImageDecode(String),

    /// The audio track could not be decoded or mixed.
    ///
    /// The generator recovers from this locally and continues video-only.
    #[error("audio setup error: {0}")]
    AudioSetup(String),

    /// The capture/encode pipeline failed; partial output is discarded.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Errors when serializing or deserializing project data.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Another generation run is already active on this generator.
    #[error("generation already in progress")]
    Busy,

    /// The run was cancelled through its [`crate::CancelToken`].
    #[error("generation cancelled")]
    Cancelled,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReelError::EmptyInput`] value.
    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::EmptyInput(msg.into())
    }

    /// Build a [`ReelError::ImageDecode`] value.
    pub fn image_decode(msg: impl Into<String>) -> Self {
        Self::ImageDecode(msg.into())
    }

    /// Build a [`ReelError::AudioSetup`] value.
    pub fn audio_setup(msg: impl Into<String>) -> Self {
        Self::AudioSetup(msg.into())
    }

    /// Build a [`ReelError::Encoding`] value.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Build a [`ReelError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Terminal status line shown to the user for this error.
    ///
    /// Diagnostic detail stays in the log; the status sink only ever sees these strings.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Busy => "Video generation already in progress...",
            Self::EmptyInput(_) => "Please add at least one story before generating video.",
            Self::ImageDecode(_) => "Error loading images. Please check the story images.",
            Self::Cancelled => "Video generation cancelled.",
            Self::AudioSetup(_) => "Warning: Could not include audio in video.",
            Self::Validation(_) | Self::Encoding(_) | Self::Serde(_) | Self::Other(_) => {
                "Error generating video"
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
