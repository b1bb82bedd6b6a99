use crate::encode::ffmpeg::flatten_premul_over_bg_to_opaque_rgba8;
use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};

/// A rendered frame as RGBA8 pixels.
///
/// Frames are **premultiplied alpha**; the flag makes this explicit at API boundaries.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Composite over an opaque `bg_rgba` and return straight, fully opaque RGBA8.
    ///
    /// This is what the ffmpeg session feeds to the encoder.
    pub fn to_opaque_rgba8(&self, bg_rgba: [u8; 4]) -> ReelResult<Vec<u8>> {
        if !self.premultiplied {
            return Err(ReelError::validation("expected a premultiplied frame"));
        }
        let mut out = vec![0u8; self.data.len()];
        flatten_premul_over_bg_to_opaque_rgba8(&mut out, &self.data, bg_rgba)?;
        Ok(out)
    }
}

/// The single drawing target of a generation run.
///
/// Owns the pixmap the encoder captures plus a reusable `vello_cpu` context. Between two
/// successful draws the pixels are left untouched, so a skipped frame repeats the previous one.
pub struct Surface {
    canvas: Canvas,
    pixmap: vello_cpu::Pixmap,
    ctx: vello_cpu::RenderContext,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface").field("canvas", &self.canvas).finish()
    }
}

impl Surface {
    /// Allocate a transparent surface for `canvas`.
    pub fn new(canvas: Canvas) -> ReelResult<Self> {
        canvas.validate()?;
        let w: u16 = canvas
            .width
            .try_into()
            .map_err(|_| ReelError::validation("surface width exceeds u16"))?;
        let h: u16 = canvas
            .height
            .try_into()
            .map_err(|_| ReelError::validation("surface height exceeds u16"))?;
        Ok(Self {
            canvas,
            pixmap: vello_cpu::Pixmap::new(w, h),
            ctx: vello_cpu::RenderContext::new(w, h),
        })
    }

    /// Surface dimensions.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Current pixels, premultiplied RGBA8.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data_as_u8_slice()
    }

    /// Copy the current pixels into an owned frame.
    pub fn snapshot(&self) -> FrameRGBA {
        FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data: self.data().to_vec(),
            premultiplied: true,
        }
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        self.pixmap.data_as_u8_slice_mut().fill(0);
    }

    /// Record draw commands with `f`, then replace the surface content with the result.
    ///
    /// The surface is only cleared and rasterized when `f` succeeds.
    pub(crate) fn paint(
        &mut self,
        f: impl FnOnce(&mut vello_cpu::RenderContext) -> ReelResult<()>,
    ) -> ReelResult<()> {
        self.ctx.reset();
        f(&mut self.ctx)?;
        self.ctx.flush();
        self.clear();
        self.ctx.render_to_pixmap(&mut self.pixmap);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
