use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{ReelError, ReelResult};
use crate::render::caption::TextMeasure;

/// Which of the two caption typefaces to use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontChoice {
    /// Plain sans-serif face.
    #[default]
    Neutral,
    /// Playful, hand-written style face.
    Decorative,
}

impl FontChoice {
    /// Map the single "decorative font" flag onto a choice.
    pub fn from_flag(use_decorative: bool) -> Self {
        if use_decorative {
            Self::Decorative
        } else {
            Self::Neutral
        }
    }

    fn other(self) -> Self {
        match self {
            Self::Neutral => Self::Decorative,
            Self::Decorative => Self::Neutral,
        }
    }
}

const NEUTRAL_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

const DECORATIVE_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/msttcorefonts/Comic_Sans_MS.ttf",
    "/usr/share/fonts/truetype/msttcorefonts/comic.ttf",
    "/usr/share/fonts/truetype/comic-neue/ComicNeue-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Comic Sans MS.ttf",
    "C:\\Windows\\Fonts\\comic.ttf",
];

/// Font bytes for the two caption typefaces.
///
/// Either slot may be empty; [`CaptionFonts::select`] falls back to the other one.
#[derive(Clone, Debug, Default)]
pub struct CaptionFonts {
    neutral: Option<Arc<Vec<u8>>>,
    decorative: Option<Arc<Vec<u8>>>,
}

impl CaptionFonts {
    /// Wrap in-memory font files (TTF/OTF).
    pub fn from_bytes(neutral: Option<Vec<u8>>, decorative: Option<Vec<u8>>) -> Self {
        Self {
            neutral: neutral.map(Arc::new),
            decorative: decorative.map(Arc::new),
        }
    }

    /// Read font files from disk.
    pub fn from_paths(neutral: Option<&Path>, decorative: Option<&Path>) -> ReelResult<Self> {
        let read = |p: &Path| -> ReelResult<Vec<u8>> {
            Ok(std::fs::read(p)
                .with_context(|| format!("failed to read font file '{}'", p.display()))?)
        };
        Ok(Self::from_bytes(
            neutral.map(read).transpose()?,
            decorative.map(read).transpose()?,
        ))
    }

    /// Probe a few well-known system locations for each typeface.
    pub fn discover() -> Self {
        let probe = |candidates: &[&str]| {
            candidates.iter().find_map(|p| {
                let bytes = std::fs::read(p).ok()?;
                tracing::debug!(path = p, "found caption font");
                Some(bytes)
            })
        };
        Self::from_bytes(probe(NEUTRAL_CANDIDATES), probe(DECORATIVE_CANDIDATES))
    }

    /// Fill empty slots from `other`.
    pub fn or(mut self, other: CaptionFonts) -> Self {
        if self.neutral.is_none() {
            self.neutral = other.neutral;
        }
        if self.decorative.is_none() {
            self.decorative = other.decorative;
        }
        self
    }

    /// `true` when neither typeface is available.
    pub fn is_empty(&self) -> bool {
        self.neutral.is_none() && self.decorative.is_none()
    }

    fn slot(&self, choice: FontChoice) -> Option<&Arc<Vec<u8>>> {
        match choice {
            FontChoice::Neutral => self.neutral.as_ref(),
            FontChoice::Decorative => self.decorative.as_ref(),
        }
    }

    /// Font bytes for `choice`, falling back to the other typeface.
    pub fn select(&self, choice: FontChoice) -> Option<(FontChoice, Arc<Vec<u8>>)> {
        if let Some(b) = self.slot(choice) {
            return Some((choice, Arc::clone(b)));
        }
        let other = choice.other();
        self.slot(other).map(|b| (other, Arc::clone(b)))
    }
}

/// RGBA8 brush color used by Parley text layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

impl From<[u8; 4]> for TextBrushRgba8 {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self { r, g, b, a }
    }
}

/// A font registered with a [`TextLayoutEngine`], plus the matching glyph source for drawing.
#[derive(Clone)]
pub(crate) struct RegisteredFont {
    pub(crate) choice: FontChoice,
    family: String,
    pub(crate) data: vello_cpu::peniko::FontData,
}

/// Stateful helper for building Parley text layouts from raw font bytes.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Register font bytes once; later layouts refer to the font by family name.
    pub(crate) fn register(
        &mut self,
        choice: FontChoice,
        font_bytes: &[u8],
    ) -> ReelResult<RegisteredFont> {
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            ReelError::validation("no font families registered from font bytes")
        })?;

        let family = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| ReelError::validation("registered font family has no name"))?
            .to_string();

        Ok(RegisteredFont {
            choice,
            family,
            data: vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from(font_bytes.to_vec()),
                0,
            ),
        })
    }

    /// Shape a single unwrapped line of text.
    pub(crate) fn layout_line(
        &mut self,
        text: &str,
        font: &RegisteredFont,
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> ReelResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(ReelError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(font.family.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

/// Measures line widths by shaping them with the selected font.
pub(crate) struct ShapedMeasure<'a> {
    pub(crate) engine: &'a mut TextLayoutEngine,
    pub(crate) font: &'a RegisteredFont,
    pub(crate) size_px: f32,
}

impl TextMeasure for ShapedMeasure<'_> {
    fn measure(&mut self, text: &str) -> Option<f32> {
        if text.is_empty() {
            return Some(0.0);
        }
        self.engine
            .layout_line(text, self.font, self.size_px, TextBrushRgba8::default())
            .ok()
            .map(|layout| layout.width())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
