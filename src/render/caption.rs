use serde::{Deserialize, Serialize};

use crate::foundation::core::{Canvas, Rect};
use crate::foundation::error::{ReelError, ReelResult};

/// Caption band appearance, in canvas pixels or fractions of the canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionStyle {
    /// Font size in pixels.
    pub font_size_px: f32,
    /// Distance between consecutive baselines.
    pub line_height_px: f32,
    /// Lower bound on the band height.
    pub min_band_height_px: f32,
    /// Padding above the first line and below the last.
    pub vertical_padding_px: f32,
    /// Gap between the band and the bottom edge, as a fraction of canvas height.
    pub bottom_offset_frac: f32,
    /// Left text margin as a fraction of canvas width.
    pub left_margin_frac: f32,
    /// Right text margin as a fraction of canvas width.
    pub right_margin_frac: f32,
    /// Band fill, straight RGBA8.
    pub band_rgba: [u8; 4],
    /// Text fill, straight RGBA8.
    pub text_rgba: [u8; 4],
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_size_px: 32.0,
            line_height_px: 40.0,
            min_band_height_px: 150.0,
            vertical_padding_px: 40.0,
            bottom_offset_frac: 0.2,
            left_margin_frac: 0.10,
            right_margin_frac: 0.20,
            band_rgba: [0, 0, 0, 128],
            text_rgba: [255, 255, 255, 255],
        }
    }
}

impl CaptionStyle {
    pub(crate) fn validate(&self) -> ReelResult<()> {
        let px = [
            ("font_size_px", self.font_size_px),
            ("line_height_px", self.line_height_px),
        ];
        for (name, v) in px {
            if !v.is_finite() || v <= 0.0 {
                return Err(ReelError::validation(format!(
                    "caption {name} must be finite and > 0"
                )));
            }
        }
        let non_neg = [
            ("min_band_height_px", self.min_band_height_px),
            ("vertical_padding_px", self.vertical_padding_px),
        ];
        for (name, v) in non_neg {
            if !v.is_finite() || v < 0.0 {
                return Err(ReelError::validation(format!(
                    "caption {name} must be finite and >= 0"
                )));
            }
        }
        let fracs = [
            self.bottom_offset_frac,
            self.left_margin_frac,
            self.right_margin_frac,
        ];
        if fracs.iter().any(|f| !(0.0..1.0).contains(f)) {
            return Err(ReelError::validation(
                "caption fractions must lie in [0, 1)",
            ));
        }
        if self.left_margin_frac + self.right_margin_frac >= 1.0 {
            return Err(ReelError::validation(
                "caption margins leave no room for text",
            ));
        }
        Ok(())
    }

    /// Width available to a wrapped line on `canvas`.
    pub fn text_box_width(&self, canvas: Canvas) -> f32 {
        let w = canvas.width as f32;
        w - w * self.left_margin_frac - w * self.right_margin_frac
    }
}

/// Width of a single line of text in the caption font.
///
/// `None` means the text could not be measured; wrapping treats it as zero width.
pub trait TextMeasure {
    /// Measure the advance width of `text` in pixels.
    fn measure(&mut self, text: &str) -> Option<f32>;
}

/// Font-free measure assuming every character advances by a fixed amount.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedAdvance {
    /// Advance per character in pixels.
    pub advance_px: f32,
}

impl FixedAdvance {
    /// Rough average advance for a proportional face at `font_size_px`.
    pub fn for_font_size(font_size_px: f32) -> Self {
        Self {
            advance_px: font_size_px * 0.5,
        }
    }
}

impl TextMeasure for FixedAdvance {
    fn measure(&mut self, text: &str) -> Option<f32> {
        Some(text.chars().count() as f32 * self.advance_px)
    }
}

/// Greedy word wrap over whitespace-separated words.
///
/// Words are appended to the current line while the joined line measures within `max_width`.
/// A single word wider than `max_width` stays alone on its line. Blank text yields no lines.
pub fn wrap_words(text: &str, max_width: f32, measure: &mut impl TextMeasure) -> Vec<String> {
    let mut words = text.split_whitespace();
    let Some(first) = words.next() else {
        return Vec::new();
    };
    let mut lines = Vec::new();
    let mut current = first.to_owned();
    for word in words {
        let candidate = format!("{current} {word}");
        if measure.measure(&candidate).unwrap_or(0.0) > max_width {
            lines.push(std::mem::replace(&mut current, word.to_owned()));
        } else {
            current = candidate;
        }
    }
    lines.push(current);
    lines
}

/// Wrapped caption lines plus where to draw them.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptionLayout {
    /// Wrapped lines, top to bottom.
    pub lines: Vec<String>,
    /// Full-width band rectangle.
    pub band: Rect,
    /// Horizontal centre of the text box.
    pub center_x: f64,
    /// Baseline of the first line.
    pub first_baseline_y: f64,
    /// Distance between baselines.
    pub line_height: f64,
}

impl CaptionLayout {
    /// Baseline of line `i`.
    pub fn baseline_y(&self, i: usize) -> f64 {
        self.first_baseline_y + self.line_height * i as f64
    }
}

/// Wrap `text` and place the caption band, or `None` for blank captions.
pub fn layout_caption(
    text: &str,
    canvas: Canvas,
    style: &CaptionStyle,
    measure: &mut impl TextMeasure,
) -> Option<CaptionLayout> {
    if text.trim().is_empty() {
        return None;
    }
    let box_width = style.text_box_width(canvas);
    let lines = wrap_words(text, box_width, measure);

    let w = f64::from(canvas.width);
    let h = f64::from(canvas.height);
    let line_height = f64::from(style.line_height_px);
    let padding = f64::from(style.vertical_padding_px);
    let band_height = f64::from(style.min_band_height_px)
        .max(lines.len() as f64 * line_height + 2.0 * padding);
    let band_y = h - h * f64::from(style.bottom_offset_frac) - band_height;
    let left = w * f64::from(style.left_margin_frac);

    Some(CaptionLayout {
        band: Rect::new(0.0, band_y, w, band_y + band_height),
        center_x: left + f64::from(box_width) / 2.0,
        first_baseline_y: band_y + padding + line_height / 2.0,
        line_height,
        lines,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/caption.rs"]
mod tests;
