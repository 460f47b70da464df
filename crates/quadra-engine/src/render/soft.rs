//! Pure-software backend.
//!
//! A thin [`Surface`] façade over [`raster::Canvas`]: every call rasterizes
//! immediately, with no batching at all. Useful where no GPU is available
//! (headless capture, CI) and as the reference implementation the batcher is
//! tested against — unbatched painting is the ordering ground truth.

use std::sync::Arc;

use anyhow::Result;

use crate::coords::{Rect, Viewport};
use crate::diag::{DiagSink, Diagnostic};
use crate::image::Bitmap;
use crate::paint::{Color, FillStyle};
use crate::raster::Canvas;
use crate::surface::Surface;

pub struct SoftRenderer {
    canvas: Canvas,
    diag: DiagSink,
}

impl SoftRenderer {
    pub fn new(width: u32, height: u32, diag: DiagSink) -> Result<Self> {
        Ok(Self {
            canvas: Canvas::new(width, height, diag.clone())?,
            diag,
        })
    }

    /// Premultiplied RGBA8 frame contents, row-major.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        self.canvas.pixels()
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.canvas.pixel(x, y)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.canvas.height()
    }
}

impl Surface for SoftRenderer {
    fn clear(&mut self, color: Color) {
        self.canvas.reset_state();
        self.canvas.clear_pixels(color);
    }

    fn draw_region(
        &mut self,
        image: &Bitmap,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        sx: f32,
        sy: f32,
        sw: f32,
        sh: f32,
    ) {
        self.canvas
            .draw_bitmap(image, Rect::new(x, y, w, h), Rect::new(sx, sy, sw, sh));
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        self.canvas.fill_rect(Rect::new(x, y, w, h), color);
    }

    fn save(&mut self) {
        self.canvas.save();
    }

    fn restore(&mut self) {
        self.canvas.restore();
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.canvas.scale(sx, sy);
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        self.canvas.translate(tx, ty);
    }

    fn clip_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.canvas.clip_rect(x, y, w, h);
    }

    fn begin_path(&mut self) {
        self.canvas.begin_path();
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.canvas.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.canvas.line_to(x, y);
    }

    fn close_path(&mut self) {
        self.canvas.close_path();
    }

    fn fill(&mut self) {
        self.canvas.fill();
    }

    fn stroke(&mut self) {
        self.canvas.stroke();
    }

    fn set_fill_style(&mut self, style: FillStyle) {
        self.canvas.set_fill_style(style);
    }

    fn set_stroke_style(&mut self, style: FillStyle) {
        self.canvas.set_stroke_style(style);
    }

    fn set_line_width(&mut self, width: f32) {
        self.canvas.set_line_width(width);
    }

    fn set_font(&mut self, font: Arc<fontdue::Font>, size: f32) {
        self.canvas.set_font(font, size);
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32) {
        self.canvas.fill_text(text, x, y);
    }

    fn update_resolution(&mut self, width: u32, height: u32) {
        if !Viewport::new(width, height).is_valid() {
            self.diag.report(Diagnostic::SurfaceResizeFailed {
                detail: format!("zero-area resolution {width}x{height}"),
            });
            return;
        }
        if let Err(err) = self.canvas.resize(width, height) {
            self.diag.report(Diagnostic::SurfaceResizeFailed {
                detail: format!("{err:#}"),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::CapturingDiagnostics;

    fn renderer(w: u32, h: u32) -> SoftRenderer {
        SoftRenderer::new(w, h, CapturingDiagnostics::new()).unwrap()
    }

    #[test]
    fn clear_fills_every_pixel() {
        let mut r = renderer(8, 8);
        r.clear(Color::from_rgba8(10, 20, 30, 255));
        assert_eq!(r.pixel(0, 0), [10, 20, 30, 255]);
        assert_eq!(r.pixel(7, 7), [10, 20, 30, 255]);
    }

    #[test]
    fn draw_whole_uses_image_extent() {
        let mut r = renderer(16, 16);
        let img = Bitmap::solid(4, 4, Color::from_rgba8(255, 0, 0, 255)).unwrap();
        r.clear(Color::TRANSPARENT);
        r.draw_whole(&img, 2.0, 2.0);
        assert_eq!(r.pixel(2, 2), [255, 0, 0, 255]);
        assert_eq!(r.pixel(5, 5), [255, 0, 0, 255]);
        assert_eq!(r.pixel(6, 6), [0, 0, 0, 0]);
    }

    #[test]
    fn update_resolution_reallocates_surface() {
        let mut r = renderer(8, 8);
        r.clear(Color::BLACK);
        r.update_resolution(16, 16);
        // Resize reallocates: transparent until the next clear.
        assert_eq!(r.width(), 16);
        assert_eq!(r.pixel(0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn zero_area_resolution_is_reported_not_applied() {
        let diag = CapturingDiagnostics::new();
        let mut r = SoftRenderer::new(8, 8, diag.clone()).unwrap();
        r.update_resolution(0, 16);
        assert_eq!(r.width(), 8);
        assert!(matches!(
            diag.events()[..],
            [Diagnostic::SurfaceResizeFailed { .. }]
        ));
    }
}
