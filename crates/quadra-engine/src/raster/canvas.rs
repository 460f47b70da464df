use std::sync::Arc;

use anyhow::{Context, Result};
use tiny_skia::{
    FillRule, FilterQuality, GradientStop, IntSize, Mask, Paint, PathBuilder, Pattern, Pixmap,
    SpreadMode, Stroke, Transform,
};

use crate::coords::{Affine, Rect};
use crate::diag::{DiagSink, Diagnostic};
use crate::image::Bitmap;
use crate::paint::{Color, FillStyle};

use super::text;

/// CPU raster surface with canvas-style drawing state.
///
/// Coordinates are device pixels. The transform and clip mirror the owning
/// surface's semantics: `save`/`restore` snapshot both, the clip only ever
/// shrinks, and the clip transform honors scale/translate only (the same
/// documented axis-aligned limitation as the GPU scissor path).
pub struct Canvas {
    pixmap: Pixmap,
    transform: Affine,
    clip: Option<Rect>,
    mask: Option<Mask>,
    saves: Vec<(Affine, Option<Rect>)>,

    path: PathBuilder,
    has_subpath: bool,

    fill_style: FillStyle,
    stroke_style: FillStyle,
    line_width: f32,
    font: Option<(Arc<fontdue::Font>, f32)>,

    diag: DiagSink,
}

impl Canvas {
    pub fn new(width: u32, height: u32, diag: DiagSink) -> Result<Self> {
        let pixmap = Pixmap::new(width.max(1), height.max(1))
            .context("failed to allocate raster surface")?;
        Ok(Self {
            pixmap,
            transform: Affine::IDENTITY,
            clip: None,
            mask: None,
            saves: Vec::new(),
            path: PathBuilder::new(),
            has_subpath: false,
            fill_style: FillStyle::Solid(Color::BLACK),
            stroke_style: FillStyle::Solid(Color::BLACK),
            line_width: 1.0,
            font: None,
            diag,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Premultiplied RGBA8 pixel data, row-major.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// One premultiplied RGBA pixel, for assertions. Out of bounds reads as
    /// transparent.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width() || y >= self.height() {
            return [0; 4];
        }
        let i = ((y * self.width() + x) * 4) as usize;
        let d = self.pixmap.data();
        [d[i], d[i + 1], d[i + 2], d[i + 3]]
    }

    /// Reallocates the surface. Drawing state resets; pixels are lost.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.pixmap =
            Pixmap::new(width.max(1), height.max(1)).context("failed to resize raster surface")?;
        self.reset_state();
        Ok(())
    }

    /// Resets transform, clip and save stack to frame-start state.
    pub fn reset_state(&mut self) {
        self.transform = Affine::IDENTITY;
        self.clip = None;
        self.mask = None;
        self.saves.clear();
        self.path = PathBuilder::new();
        self.has_subpath = false;
    }

    /// Fills every pixel with `color` (transparent black erases).
    pub fn clear_pixels(&mut self, color: Color) {
        self.pixmap.fill(to_ts_color(color));
    }

    // ── transform & clip ──────────────────────────────────────────────────

    /// Replaces the transform wholesale (path-bridge synchronization).
    #[inline]
    pub fn set_transform(&mut self, transform: Affine) {
        self.transform = transform;
    }

    pub fn save(&mut self) {
        self.saves.push((self.transform, self.clip));
    }

    pub fn restore(&mut self) {
        if let Some((transform, clip)) = self.saves.pop() {
            self.transform = transform;
            self.clip = clip;
            self.rebuild_mask();
        }
    }

    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.transform.scale(sx, sy);
    }

    pub fn translate(&mut self, tx: f32, ty: f32) {
        self.transform.translate(tx, ty);
    }

    /// Intersects the clip with a rect given in local coordinates.
    pub fn clip_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let local = Rect::new(x, y, w, h);
        if !local.is_finite() || !self.transform.is_finite() {
            self.diag.report(Diagnostic::NonFiniteGeometry { op: "clip_rect" });
            return;
        }
        let device = self.transform.map_rect(local);
        self.clip = Some(match self.clip {
            None => device.intersect(Rect::new(
                0.0,
                0.0,
                self.width() as f32,
                self.height() as f32,
            )),
            Some(current) => current.intersect(device),
        });
        self.rebuild_mask();
    }

    fn rebuild_mask(&mut self) {
        let Some(clip) = self.clip else {
            self.mask = None;
            return;
        };
        let Some(mut mask) = Mask::new(self.width(), self.height()) else {
            self.mask = None;
            return;
        };
        // A zero-area clip leaves the mask fully empty, suppressing all
        // drawing rather than disabling clipping.
        if !clip.is_empty() {
            let mut pb = PathBuilder::new();
            pb.push_rect(
                tiny_skia::Rect::from_xywh(clip.x, clip.y, clip.w, clip.h)
                    .unwrap_or_else(|| tiny_skia::Rect::from_xywh(0.0, 0.0, 1.0, 1.0).unwrap()),
            );
            if let Some(path) = pb.finish() {
                mask.fill_path(&path, FillRule::Winding, false, Transform::identity());
            }
        }
        self.mask = Some(mask);
    }

    // ── styles ────────────────────────────────────────────────────────────

    #[inline]
    pub fn set_fill_style(&mut self, style: FillStyle) {
        self.fill_style = style;
    }

    #[inline]
    pub fn set_stroke_style(&mut self, style: FillStyle) {
        self.stroke_style = style;
    }

    #[inline]
    pub fn set_line_width(&mut self, width: f32) {
        if width.is_finite() && width > 0.0 {
            self.line_width = width;
        }
    }

    #[inline]
    pub fn set_font(&mut self, font: Arc<fontdue::Font>, size: f32) {
        self.font = Some((font, size.max(1.0)));
    }

    // ── path construction ─────────────────────────────────────────────────

    pub fn begin_path(&mut self) {
        self.path = PathBuilder::new();
        self.has_subpath = false;
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        if !(x.is_finite() && y.is_finite()) {
            self.diag.report(Diagnostic::NonFiniteGeometry { op: "move_to" });
            return;
        }
        self.path.move_to(x, y);
        self.has_subpath = true;
    }

    pub fn line_to(&mut self, x: f32, y: f32) {
        if !(x.is_finite() && y.is_finite()) {
            self.diag.report(Diagnostic::NonFiniteGeometry { op: "line_to" });
            return;
        }
        // A line with no open sub-path starts one, canvas-style.
        if self.has_subpath {
            self.path.line_to(x, y);
        } else {
            self.path.move_to(x, y);
            self.has_subpath = true;
        }
    }

    pub fn close_path(&mut self) {
        if self.has_subpath {
            self.path.close();
        }
    }

    // ── painting ──────────────────────────────────────────────────────────

    /// Fills the current path. Returns whether anything was rasterized
    /// (an empty path draws nothing, per the canvas contract).
    pub fn fill(&mut self) -> bool {
        if !self.has_subpath {
            return false;
        }
        let Some(path) = self.path.clone().finish() else {
            return false;
        };
        let paint = style_paint(&self.fill_style, true);
        self.pixmap.fill_path(
            &path,
            &paint,
            FillRule::Winding,
            to_ts_transform(self.transform),
            self.mask.as_ref(),
        );
        true
    }

    /// Strokes the current path with the current line width.
    pub fn stroke(&mut self) -> bool {
        if !self.has_subpath {
            return false;
        }
        let Some(path) = self.path.clone().finish() else {
            return false;
        };
        let paint = style_paint(&self.stroke_style, true);
        let stroke = Stroke {
            width: self.line_width,
            ..Stroke::default()
        };
        self.pixmap.stroke_path(
            &path,
            &paint,
            &stroke,
            to_ts_transform(self.transform),
            self.mask.as_ref(),
        );
        true
    }

    /// Solid rectangle fill in local coordinates. No anti-aliasing: rect
    /// fills must land on exact pixels for parity with the GPU backend.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let r = rect.normalized();
        if r.is_empty() {
            return;
        }
        let Some(ts_rect) = tiny_skia::Rect::from_xywh(r.x, r.y, r.w, r.h) else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_color(to_ts_color(color));
        paint.anti_alias = false;
        self.pixmap.fill_rect(
            ts_rect,
            &paint,
            to_ts_transform(self.transform),
            self.mask.as_ref(),
        );
    }

    /// Blits a sub-rectangle of `bitmap` into `dst` (both in local
    /// coordinates). Nearest-neighbor sampling, no anti-aliasing.
    pub fn draw_bitmap(&mut self, bitmap: &Bitmap, dst: Rect, src: Rect) {
        let dst = dst.normalized();
        let src = src.normalized();
        if dst.is_empty() || src.is_empty() {
            return;
        }
        let Some(size) = IntSize::from_wh(bitmap.width(), bitmap.height()) else {
            return;
        };
        let Some(src_pixmap) = Pixmap::from_vec(bitmap.premultiplied(), size) else {
            return;
        };
        let Some(ts_rect) = tiny_skia::Rect::from_xywh(dst.x, dst.y, dst.w, dst.h) else {
            return;
        };

        // Pattern local matrix: texel (src.x, src.y) lands on (dst.x, dst.y),
        // scaled by dst/src extents.
        let pattern_ts = Transform::from_translate(-src.x, -src.y)
            .post_scale(dst.w / src.w, dst.h / src.h)
            .post_translate(dst.x, dst.y);

        let paint = Paint {
            shader: Pattern::new(
                src_pixmap.as_ref(),
                SpreadMode::Pad,
                FilterQuality::Nearest,
                1.0,
                pattern_ts,
            ),
            anti_alias: false,
            ..Paint::default()
        };
        self.pixmap.fill_rect(
            ts_rect,
            &paint,
            to_ts_transform(self.transform),
            self.mask.as_ref(),
        );
    }

    /// Rasterizes `text` with the registered font, baseline at `(x, y)`,
    /// using the current fill style's color. Returns whether pixels were
    /// produced.
    pub fn fill_text(&mut self, content: &str, x: f32, y: f32) -> bool {
        let Some((font, size)) = self.font.clone() else {
            self.diag.report(Diagnostic::MissingFont);
            return false;
        };
        let color = match &self.fill_style {
            FillStyle::Solid(c) => *c,
            // Gradient text is out of scope for the bridge; use the first
            // stop as a solid approximation.
            FillStyle::LinearGradient(g) => {
                g.stops.first().map(|s| s.color).unwrap_or(Color::WHITE)
            }
        };
        text::fill_text(
            &mut self.pixmap,
            self.mask.as_ref(),
            to_ts_transform(self.transform),
            &font,
            size,
            content,
            x,
            y,
            color,
        )
    }
}

// ── tiny-skia conversions ─────────────────────────────────────────────────

fn to_ts_color(color: Color) -> tiny_skia::Color {
    let (r, g, b, a) = color.clamped().to_straight();
    tiny_skia::Color::from_rgba(r, g, b, a).unwrap_or(tiny_skia::Color::WHITE)
}

fn to_ts_transform(m: Affine) -> Transform {
    Transform::from_row(m.a, m.b, m.c, m.d, m.tx, m.ty)
}

/// Builds a tiny-skia paint from a fill style. Unusable gradients degrade to
/// a solid fill of their first stop (or white with no stops at all).
fn style_paint(style: &FillStyle, anti_alias: bool) -> Paint<'static> {
    let mut paint = Paint {
        anti_alias,
        ..Paint::default()
    };
    match style {
        FillStyle::Solid(color) => paint.set_color(to_ts_color(*color)),
        FillStyle::LinearGradient(gradient) => {
            if gradient.is_usable() {
                let mut ordered = gradient.stops.clone();
                ordered.sort_by(|a, b| a.t.total_cmp(&b.t));
                let stops: Vec<GradientStop> = ordered
                    .iter()
                    .map(|s| GradientStop::new(s.t.clamp(0.0, 1.0), to_ts_color(s.color)))
                    .collect();
                if let Some(shader) = tiny_skia::LinearGradient::new(
                    tiny_skia::Point::from_xy(gradient.start.x, gradient.start.y),
                    tiny_skia::Point::from_xy(gradient.end.x, gradient.end.y),
                    stops,
                    SpreadMode::Pad,
                    Transform::identity(),
                ) {
                    paint.shader = shader;
                    return paint;
                }
            }
            let fallback = gradient.stops.first().map(|s| s.color).unwrap_or(Color::WHITE);
            paint.set_color(to_ts_color(fallback));
        }
    }
    paint
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::CapturingDiagnostics;

    fn canvas(w: u32, h: u32) -> Canvas {
        Canvas::new(w, h, CapturingDiagnostics::new()).unwrap()
    }

    // ── rect & clip ───────────────────────────────────────────────────────

    #[test]
    fn fill_rect_writes_exact_pixels() {
        let mut c = canvas(8, 8);
        c.fill_rect(Rect::new(2.0, 2.0, 4.0, 4.0), Color::from_rgba8(255, 0, 0, 255));
        assert_eq!(c.pixel(2, 2), [255, 0, 0, 255]);
        assert_eq!(c.pixel(5, 5), [255, 0, 0, 255]);
        assert_eq!(c.pixel(1, 2), [0, 0, 0, 0]);
        assert_eq!(c.pixel(6, 2), [0, 0, 0, 0]);
    }

    #[test]
    fn clip_suppresses_outside_pixels() {
        let mut c = canvas(8, 8);
        c.clip_rect(0.0, 0.0, 4.0, 4.0);
        c.fill_rect(Rect::new(0.0, 0.0, 8.0, 8.0), Color::WHITE);
        assert_eq!(c.pixel(3, 3), [255, 255, 255, 255]);
        assert_eq!(c.pixel(4, 4), [0, 0, 0, 0]);
    }

    #[test]
    fn zero_area_clip_suppresses_everything() {
        let mut c = canvas(8, 8);
        c.clip_rect(0.0, 0.0, 4.0, 4.0);
        c.clip_rect(6.0, 6.0, 2.0, 2.0); // disjoint from the first clip
        c.fill_rect(Rect::new(0.0, 0.0, 8.0, 8.0), Color::WHITE);
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(c.pixel(x, y), [0; 4], "pixel ({x},{y}) escaped the empty clip");
            }
        }
    }

    #[test]
    fn restore_reopens_clip() {
        let mut c = canvas(8, 8);
        c.save();
        c.clip_rect(0.0, 0.0, 2.0, 2.0);
        c.restore();
        c.fill_rect(Rect::new(4.0, 4.0, 2.0, 2.0), Color::WHITE);
        assert_eq!(c.pixel(5, 5), [255, 255, 255, 255]);
    }

    // ── transform ─────────────────────────────────────────────────────────

    #[test]
    fn translate_moves_fill() {
        let mut c = canvas(8, 8);
        c.translate(4.0, 0.0);
        c.fill_rect(Rect::new(0.0, 0.0, 2.0, 2.0), Color::WHITE);
        assert_eq!(c.pixel(4, 0), [255, 255, 255, 255]);
        assert_eq!(c.pixel(0, 0), [0; 4]);
    }

    // ── paths ─────────────────────────────────────────────────────────────

    #[test]
    fn fill_without_subpath_is_noop() {
        let mut c = canvas(4, 4);
        c.begin_path();
        assert!(!c.fill());
        assert!(!c.stroke());
    }

    #[test]
    fn rect_path_fill_covers_interior() {
        let mut c = canvas(8, 8);
        c.begin_path();
        c.move_to(1.0, 1.0);
        c.line_to(7.0, 1.0);
        c.line_to(7.0, 7.0);
        c.line_to(1.0, 7.0);
        c.close_path();
        c.set_fill_style(FillStyle::Solid(Color::from_rgba8(0, 0, 255, 255)));
        assert!(c.fill());
        assert_eq!(c.pixel(4, 4), [0, 0, 255, 255]);
        assert_eq!(c.pixel(0, 0), [0; 4]);
    }

    #[test]
    fn line_to_without_subpath_starts_one() {
        let mut c = canvas(8, 8);
        c.begin_path();
        c.line_to(1.0, 1.0);
        c.line_to(7.0, 1.0);
        c.line_to(7.0, 7.0);
        c.close_path();
        assert!(c.fill());
    }

    // ── bitmaps ───────────────────────────────────────────────────────────

    #[test]
    fn bitmap_blit_unscaled() {
        let bmp = Bitmap::from_fn(2, 2, |x, y| {
            if (x + y) % 2 == 0 { [255, 0, 0, 255] } else { [0, 255, 0, 255] }
        })
        .unwrap();
        let mut c = canvas(4, 4);
        c.draw_bitmap(&bmp, Rect::new(1.0, 1.0, 2.0, 2.0), Rect::new(0.0, 0.0, 2.0, 2.0));
        assert_eq!(c.pixel(1, 1), [255, 0, 0, 255]);
        assert_eq!(c.pixel(2, 1), [0, 255, 0, 255]);
        assert_eq!(c.pixel(0, 0), [0; 4]);
    }

    #[test]
    fn bitmap_region_crops_source() {
        let bmp = Bitmap::from_fn(4, 1, |x, _| [x as u8 * 10, 0, 0, 255]).unwrap();
        let mut c = canvas(4, 4);
        // Draw only the third texel.
        c.draw_bitmap(&bmp, Rect::new(0.0, 0.0, 1.0, 1.0), Rect::new(2.0, 0.0, 1.0, 1.0));
        assert_eq!(c.pixel(0, 0), [20, 0, 0, 255]);
    }

    // ── text ──────────────────────────────────────────────────────────────

    #[test]
    fn fill_text_without_font_reports_diagnostic() {
        let diag = CapturingDiagnostics::new();
        let mut c = Canvas::new(8, 8, diag.clone()).unwrap();
        assert!(!c.fill_text("hi", 0.0, 6.0));
        assert_eq!(diag.events(), vec![Diagnostic::MissingFont]);
    }
}
