use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Shortest on-screen duration a scene may carry, in whole seconds.
pub const MIN_SCENE_SECS: u32 = 1;
/// Longest on-screen duration a scene may carry, in whole seconds.
pub const MAX_SCENE_SECS: u32 = 60;
/// Duration used when none (or zero) is supplied.
pub const DEFAULT_SCENE_SECS: u32 = 3;
/// Caption length limit in characters.
pub const MAX_CAPTION_CHARS: usize = 500;

/// Clamp a raw scene duration into `[MIN_SCENE_SECS, MAX_SCENE_SECS]`.
///
/// A missing or zero value falls back to [`DEFAULT_SCENE_SECS`].
pub fn clamp_duration_secs(raw: Option<i64>) -> u32 {
    match raw {
        None | Some(0) => DEFAULT_SCENE_SECS,
        Some(v) => v.clamp(i64::from(MIN_SCENE_SECS), i64::from(MAX_SCENE_SECS)) as u32,
    }
}

fn truncate_caption(mut caption: String) -> String {
    if let Some((idx, _)) = caption.char_indices().nth(MAX_CAPTION_CHARS) {
        tracing::warn!(
            chars = caption.chars().count(),
            "caption exceeds {MAX_CAPTION_CHARS} characters, truncating"
        );
        caption.truncate(idx);
    }
    caption
}

/// Style of the transition played when leaving a story.
///
/// Only `fade` is produced today; the field stays an enumeration so project files can carry new
/// styles without a format change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionStyle {
    /// Linear cross-dissolve between the two scenes' images.
    #[default]
    Fade,
}

/// Encoded scene image as supplied by the editing layer.
///
/// Bytes are shared, so cloning a scene never copies image data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageSource {
    bytes: Arc<Vec<u8>>,
    media_type: Option<String>,
}

impl ImageSource {
    /// Wrap encoded image bytes (PNG, JPEG, GIF, WebP, ...).
    pub fn new(bytes: impl Into<Vec<u8>>, media_type: Option<String>) -> Self {
        Self {
            bytes: Arc::new(bytes.into()),
            media_type,
        }
    }

    /// Encoded bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared media type, if the source carried one.
    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }
}

/// One image with its caption, the atomic unit of a [`Story`].
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Stable identifier assigned by the editing layer.
    pub id: String,
    /// Encoded image.
    pub image: ImageSource,
    caption: String,
    duration_secs: u32,
}

impl Scene {
    /// Create a scene, truncating the caption and clamping the duration.
    pub fn new(
        id: impl Into<String>,
        image: ImageSource,
        caption: impl Into<String>,
        duration_secs: Option<i64>,
    ) -> Self {
        Self {
            id: id.into(),
            image,
            caption: truncate_caption(caption.into()),
            duration_secs: clamp_duration_secs(duration_secs),
        }
    }

    /// Caption text (possibly empty).
    pub fn caption(&self) -> &str {
        &self.caption
    }

    /// Replace the caption, truncating it to [`MAX_CAPTION_CHARS`].
    pub fn set_caption(&mut self, caption: impl Into<String>) {
        self.caption = truncate_caption(caption.into());
    }

    /// Configured duration in whole seconds, always within `[1, 60]`.
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    /// Replace the duration, clamping it like every other entry point.
    pub fn set_duration_secs(&mut self, raw: Option<i64>) {
        self.duration_secs = clamp_duration_secs(raw);
    }
}

/// Ordered collection of scenes rendered back to back.
#[derive(Clone, Debug, PartialEq)]
pub struct Story {
    /// Stable identifier assigned by the editing layer.
    pub id: String,
    /// Transition played into the next story.
    pub transition: TransitionStyle,
    /// Scenes in playback order.
    pub scenes: Vec<Scene>,
}

impl Story {
    /// Create an empty story with the default transition.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            transition: TransitionStyle::default(),
            scenes: Vec::new(),
        }
    }

    /// Builder-style scene append.
    pub fn with_scene(mut self, scene: Scene) -> Self {
        self.scenes.push(scene);
        self
    }
}

/// `true` when at least one story holds at least one scene.
pub fn has_renderable_scenes(stories: &[Story]) -> bool {
    stories.iter().any(|s| !s.scenes.is_empty())
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
