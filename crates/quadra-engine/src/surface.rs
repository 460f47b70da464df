//! The abstract drawing surface consumed by all game and UI code.
//!
//! Both backends — the GPU quad batcher and the plain software raster —
//! implement this trait with visually identical output and ordering, so game
//! code written once runs against either.

use std::sync::Arc;

use crate::image::Bitmap;
use crate::paint::{Color, FillStyle};

/// Abstract 2D drawing surface.
///
/// Ordering guarantee: draw calls are visually equivalent to strict
/// call-order painting (painter's algorithm). Implementations may batch
/// internally but must preserve that equivalence.
///
/// Per frame, `clear` must be the first call; it resets the transform stack,
/// the clip stack and any internal batch state.
pub trait Surface {
    /// Resets transform/clip state and clears the frame buffer to `color`.
    fn clear(&mut self, color: Color);

    // ── image blits ───────────────────────────────────────────────────────
    //
    // The three draw_* operations form an explicit overload set: whole image
    // unscaled, whole image scaled to a destination extent, and a cropped
    // source sub-rectangle scaled to a destination extent.

    /// Blits the whole image, unscaled, with its top-left at `(x, y)`.
    fn draw_whole(&mut self, image: &Bitmap, x: f32, y: f32) {
        self.draw_scaled(image, x, y, image.width() as f32, image.height() as f32);
    }

    /// Blits the whole image scaled into `(x, y, w, h)`.
    fn draw_scaled(&mut self, image: &Bitmap, x: f32, y: f32, w: f32, h: f32) {
        self.draw_region(
            image,
            x,
            y,
            w,
            h,
            0.0,
            0.0,
            image.width() as f32,
            image.height() as f32,
        );
    }

    /// Blits the source sub-rectangle `(sx, sy, sw, sh)` (texel units) scaled
    /// into the destination `(x, y, w, h)`.
    #[allow(clippy::too_many_arguments)]
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
    );

    /// Solid axis-aligned fill. The fill color never bleeds onto other
    /// draws regardless of internal batching.
    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color);

    // ── transform & clip state ────────────────────────────────────────────

    /// Pushes a snapshot of the current transform and clip.
    fn save(&mut self);

    /// Pops back to the last snapshot; no-op when only the root state
    /// remains.
    fn restore(&mut self);

    fn scale(&mut self, sx: f32, sy: f32);

    fn translate(&mut self, tx: f32, ty: f32);

    /// Intersects the clip region with a rect in local coordinates.
    ///
    /// Limitation: only the transform's scale/translate components are
    /// honored; rotated transforms produce the transformed corners' bounding
    /// box (axis-aligned clipping only).
    fn clip_rect(&mut self, x: f32, y: f32, w: f32, h: f32);

    // ── vector path subset ────────────────────────────────────────────────

    fn begin_path(&mut self);
    fn move_to(&mut self, x: f32, y: f32);
    fn line_to(&mut self, x: f32, y: f32);
    fn close_path(&mut self);

    /// Fills the current path with the current fill style.
    fn fill(&mut self);

    /// Strokes the current path with the current stroke style and width.
    fn stroke(&mut self);

    fn set_fill_style(&mut self, style: FillStyle);
    fn set_stroke_style(&mut self, style: FillStyle);
    fn set_line_width(&mut self, width: f32);

    /// Registers the font used by `fill_text`. Without one, text draws
    /// nothing and reports a diagnostic.
    fn set_font(&mut self, font: Arc<fontdue::Font>, size: f32);

    /// Draws `text` with its baseline at `(x, y)` in the fill style's color.
    fn fill_text(&mut self, text: &str, x: f32, y: f32);

    // ── viewport ──────────────────────────────────────────────────────────

    /// Viewport resize in device pixels. Re-derives resolution-dependent
    /// state, including the path bridge's off-screen surface.
    fn update_resolution(&mut self, width: u32, height: u32);
}
