use std::sync::Arc;

use rayon::prelude::*;

use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::premultiply_rgba8_in_place;
use crate::scene::model::{Story, TransitionStyle};

/// A decoded scene image, ready to be used as a paint.
///
/// `paint` is `None` while the image is not drawable. The planner refuses to schedule such
/// images, and the renderer skips frames whose primary image is not ready.
#[derive(Clone)]
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    paint: Option<vello_cpu::Image>,
}

impl std::fmt::Debug for PreparedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Shared handle to a [`PreparedImage`].
pub type ImageHandle = Arc<PreparedImage>;

impl PreparedImage {
    /// Build a ready image from straight-alpha RGBA8 pixels.
    pub fn from_rgba8(width: u32, height: u32, mut rgba8: Vec<u8>) -> ReelResult<Self> {
        premultiply_rgba8_in_place(&mut rgba8);
        let pixmap = pixmap_from_premul_bytes(&rgba8, width, height)?;
        Ok(Self {
            width,
            height,
            paint: Some(vello_cpu::Image {
                image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
                sampler: vello_cpu::peniko::ImageSampler::default(),
            }),
        })
    }

    /// An image with known dimensions whose pixels never became drawable.
    pub fn unready(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            paint: None,
        }
    }

    /// Whether the image can be drawn.
    pub fn is_ready(&self) -> bool {
        self.paint.is_some() && self.width > 0 && self.height > 0
    }

    pub(crate) fn paint(&self) -> Option<&vello_cpu::Image> {
        self.paint.as_ref()
    }
}

/// Decode encoded image bytes (PNG, JPEG, GIF, WebP, ...) into a ready [`PreparedImage`].
pub fn decode_image(bytes: &[u8]) -> ReelResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| ReelError::image_decode(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    PreparedImage::from_rgba8(width, height, rgba.into_raw())
}

/// One scene with its image attached for the duration of a generation run.
#[derive(Clone, Debug)]
pub struct PreparedScene {
    /// Scene id, copied from the editing layer.
    pub id: String,
    /// Decoded image.
    pub image: ImageHandle,
    /// Caption text.
    pub caption: Arc<str>,
    /// Stored scene duration in seconds.
    pub duration_secs: u32,
}

/// A story snapshot whose scenes carry decoded images.
#[derive(Clone, Debug)]
pub struct PreparedStory {
    /// Story id.
    pub id: String,
    /// Transition style used when leaving this story.
    pub transition: TransitionStyle,
    /// Scenes in playback order.
    pub scenes: Vec<PreparedScene>,
}

/// Decode every scene image of `stories` before any frame is produced.
///
/// Decoding runs in parallel; the returned snapshot owns the handles and releases them when
/// dropped at the end of the run. The first failure aborts with [`ReelError::ImageDecode`].
#[tracing::instrument(skip(stories), fields(stories = stories.len()))]
pub fn preload_stories(stories: &[Story]) -> ReelResult<Vec<PreparedStory>> {
    stories
        .iter()
        .map(|story| {
            let scenes = story
                .scenes
                .par_iter()
                .map(|scene| {
                    let image = decode_image(scene.image.bytes()).map_err(|e| {
                        ReelError::image_decode(format!(
                            "story '{}' scene '{}': {e}",
                            story.id, scene.id
                        ))
                    })?;
                    tracing::debug!(
                        story = %story.id,
                        scene = %scene.id,
                        width = image.width,
                        height = image.height,
                        "scene image ready"
                    );
                    Ok(PreparedScene {
                        id: scene.id.clone(),
                        image: Arc::new(image),
                        caption: Arc::from(scene.caption()),
                        duration_secs: scene.duration_secs(),
                    })
                })
                .collect::<ReelResult<Vec<_>>>()?;
            Ok(PreparedStory {
                id: story.id.clone(),
                transition: story.transition,
                scenes,
            })
        })
        .collect()
}

pub(crate) fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> ReelResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| ReelError::image_decode("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| ReelError::image_decode("image height exceeds u16"))?;
    if w == 0 || h == 0 {
        return Err(ReelError::image_decode("image has zero size"));
    }
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(ReelError::image_decode("pixmap byte len mismatch"));
    }
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect::<Vec<_>>();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
