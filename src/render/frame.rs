use std::collections::HashMap;
use std::sync::Arc;

use crate::assets::decode::PreparedImage;
use crate::foundation::core::{Affine, Canvas};
use crate::foundation::error::ReelResult;
use crate::foundation::math::clamp_unit;
use crate::render::caption::{CaptionLayout, CaptionStyle, FixedAdvance, layout_caption};
use crate::render::surface::Surface;
use crate::render::text::{
    CaptionFonts, FontChoice, RegisteredFont, ShapedMeasure, TextBrushRgba8, TextLayoutEngine,
};
use crate::timeline::plan::RenderInstruction;

const CAPTION_CACHE_LIMIT: usize = 64;

/// Result of drawing one instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The surface now shows the instruction.
    Drawn,
    /// An image was not drawable; the surface still shows the previous frame.
    Skipped,
}

struct ShapedLine {
    layout: parley::Layout<TextBrushRgba8>,
    width: f32,
    baseline: f32,
}

struct CachedCaption {
    geometry: CaptionLayout,
    shaped: Vec<ShapedLine>,
}

/// Draws render instructions onto a [`Surface`].
///
/// Images are cover-fitted and centred. Captions sit in a translucent full-width band near the
/// bottom, wrapped against the selected font. Wrapped and shaped captions are cached per text.
pub struct FrameRenderer {
    canvas: Canvas,
    style: CaptionStyle,
    engine: TextLayoutEngine,
    font: Option<RegisteredFont>,
    captions: HashMap<Arc<str>, Arc<CachedCaption>>,
}

impl std::fmt::Debug for FrameRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRenderer")
            .field("canvas", &self.canvas)
            .field("font", &self.font_choice())
            .field("cached_captions", &self.captions.len())
            .finish()
    }
}

impl FrameRenderer {
    /// Create a renderer for `canvas` using the typeface picked by `choice`.
    ///
    /// When no typeface is available, captions fall back to approximate metrics and only the
    /// band is drawn.
    pub fn new(
        canvas: Canvas,
        style: CaptionStyle,
        fonts: &CaptionFonts,
        choice: FontChoice,
    ) -> ReelResult<Self> {
        canvas.validate()?;
        style.validate()?;
        let mut engine = TextLayoutEngine::new();
        let font = match fonts.select(choice) {
            Some((picked, bytes)) => {
                if picked != choice {
                    tracing::warn!(requested = ?choice, using = ?picked, "caption font unavailable, falling back");
                }
                Some(engine.register(picked, &bytes)?)
            }
            None => {
                tracing::warn!("no caption font available; captions render without glyphs");
                None
            }
        };
        Ok(Self {
            canvas,
            style,
            engine,
            font,
            captions: HashMap::new(),
        })
    }

    /// Typeface actually used for captions.
    pub fn font_choice(&self) -> Option<FontChoice> {
        self.font.as_ref().map(|f| f.choice)
    }

    /// Output canvas.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Draw one instruction: the primary layer weighted by `alpha`, the secondary by `1 - alpha`.
    ///
    /// A primary or secondary image that is not ready leaves the surface untouched and returns
    /// [`FrameOutcome::Skipped`].
    pub fn render(
        &mut self,
        surface: &mut Surface,
        instr: &RenderInstruction,
    ) -> ReelResult<FrameOutcome> {
        let secondary_unready = instr
            .secondary_image
            .as_ref()
            .is_some_and(|img| !img.is_ready());
        if !instr.primary_image.is_ready() || secondary_unready {
            tracing::warn!(
                primary_ready = instr.primary_image.is_ready(),
                secondary_unready,
                "image not ready at draw time, skipping frame"
            );
            return Ok(FrameOutcome::Skipped);
        }

        let alpha = clamp_unit(instr.alpha);
        let primary_caption = self.caption_for(&instr.primary_text)?;
        let secondary = match (&instr.secondary_image, &instr.secondary_text) {
            (Some(img), text) => {
                let caption = match text {
                    Some(t) => self.caption_for(t)?,
                    None => None,
                };
                Some((Arc::clone(img), caption))
            }
            (None, _) => None,
        };

        let canvas = self.canvas;
        let style = &self.style;
        let font = self.font.as_ref();
        surface.paint(|ctx| {
            // Outgoing side underneath at full strength keeps the frame opaque; the incoming side
            // on top at `alpha` leaves it a visible weight of `1 - alpha`.
            if let Some((img, caption)) = &secondary {
                draw_layer(ctx, canvas, style, font, img, caption.as_deref(), 1.0);
            }
            draw_layer(
                ctx,
                canvas,
                style,
                font,
                &instr.primary_image,
                primary_caption.as_deref(),
                alpha,
            );
            Ok(())
        })?;
        Ok(FrameOutcome::Drawn)
    }

    fn caption_for(&mut self, text: &Arc<str>) -> ReelResult<Option<Arc<CachedCaption>>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        if let Some(hit) = self.captions.get(text) {
            return Ok(Some(Arc::clone(hit)));
        }

        let brush = TextBrushRgba8::from(self.style.text_rgba);
        let size = self.style.font_size_px;
        let cached = match &self.font {
            Some(font) => {
                let mut measure = ShapedMeasure {
                    engine: &mut self.engine,
                    font,
                    size_px: size,
                };
                let Some(geometry) = layout_caption(text, self.canvas, &self.style, &mut measure)
                else {
                    return Ok(None);
                };
                let mut shaped = Vec::with_capacity(geometry.lines.len());
                for line in &geometry.lines {
                    let layout = self.engine.layout_line(line, font, size, brush)?;
                    let baseline = layout
                        .lines()
                        .next()
                        .map(|l| l.metrics().baseline)
                        .unwrap_or(size);
                    shaped.push(ShapedLine {
                        width: layout.width(),
                        baseline,
                        layout,
                    });
                }
                CachedCaption { geometry, shaped }
            }
            None => {
                let mut measure = FixedAdvance::for_font_size(size);
                let Some(geometry) = layout_caption(text, self.canvas, &self.style, &mut measure)
                else {
                    return Ok(None);
                };
                CachedCaption {
                    geometry,
                    shaped: Vec::new(),
                }
            }
        };

        if self.captions.len() >= CAPTION_CACHE_LIMIT {
            self.captions.clear();
        }
        let cached = Arc::new(cached);
        self.captions.insert(Arc::clone(text), Arc::clone(&cached));
        Ok(Some(cached))
    }
}

/// Scale and offset that cover `canvas` with an image, cropping the overflow evenly.
pub fn cover_transform(canvas: Canvas, image_width: u32, image_height: u32) -> Affine {
    let cw = f64::from(canvas.width);
    let ch = f64::from(canvas.height);
    let iw = f64::from(image_width.max(1));
    let ih = f64::from(image_height.max(1));
    let scale = (cw / iw).max(ch / ih);
    let dx = (cw - iw * scale) / 2.0;
    let dy = (ch - ih * scale) / 2.0;
    Affine::translate((dx, dy)) * Affine::scale(scale)
}

fn draw_layer(
    ctx: &mut vello_cpu::RenderContext,
    canvas: Canvas,
    style: &CaptionStyle,
    font: Option<&RegisteredFont>,
    image: &PreparedImage,
    caption: Option<&CachedCaption>,
    opacity: f32,
) {
    if opacity <= 0.0 {
        return;
    }
    let Some(paint) = image.paint() else {
        return;
    };
    if opacity < 1.0 {
        ctx.push_opacity_layer(opacity);
    }

    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(affine_to_cpu(cover_transform(
        canvas,
        image.width,
        image.height,
    )));
    ctx.set_paint(paint.clone());
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(image.width),
        f64::from(image.height),
    ));

    if let Some(caption) = caption {
        draw_caption(ctx, style, font, caption);
    }

    if opacity < 1.0 {
        ctx.pop_layer();
    }
}

fn draw_caption(
    ctx: &mut vello_cpu::RenderContext,
    style: &CaptionStyle,
    font: Option<&RegisteredFont>,
    caption: &CachedCaption,
) {
    let g = &caption.geometry;
    let [r, gr, b, a] = style.band_rgba;
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, gr, b, a));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        g.band.x0, g.band.y0, g.band.x1, g.band.y1,
    ));

    let Some(font) = font else {
        return;
    };
    for (i, line) in caption.shaped.iter().enumerate() {
        let x = g.center_x - f64::from(line.width) / 2.0;
        let y = g.baseline_y(i) - f64::from(line.baseline);
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((x, y)));
        for pline in line.layout.lines() {
            for item in pline.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font.data)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
