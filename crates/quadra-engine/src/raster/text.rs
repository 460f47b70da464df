//! Glyph rasterization onto the software surface.
//!
//! Each glyph's fontdue coverage bitmap becomes a small premultiplied pixmap
//! colored by the fill style, composited under the current transform and
//! clip. No shaping or kerning beyond fontdue's per-glyph metrics.

use tiny_skia::{FilterQuality, IntSize, Mask, Pixmap, PixmapPaint, Transform};

use crate::paint::Color;

/// Rasterizes `content` with baseline at `(x, y)`. Returns whether any pixel
/// was produced (whitespace-only strings still return true once a glyph
/// advance occurred, matching "text was drawn" semantics only when coverage
/// existed).
#[allow(clippy::too_many_arguments)]
pub(super) fn fill_text(
    pixmap: &mut Pixmap,
    mask: Option<&Mask>,
    transform: Transform,
    font: &fontdue::Font,
    size: f32,
    content: &str,
    x: f32,
    y: f32,
    color: Color,
) -> bool {
    let mut pen_x = x;
    let mut drew = false;

    for ch in content.chars() {
        if ch == '\n' || ch == '\r' {
            continue;
        }
        let (metrics, coverage) = font.rasterize(ch, size);

        if metrics.width > 0 && metrics.height > 0 {
            if let Some(glyph) = tint_coverage(&coverage, metrics.width, metrics.height, color) {
                let left = pen_x + metrics.xmin as f32;
                let top = y - (metrics.height as i32 + metrics.ymin) as f32;
                let paint = PixmapPaint {
                    quality: FilterQuality::Nearest,
                    ..PixmapPaint::default()
                };
                pixmap.draw_pixmap(
                    0,
                    0,
                    glyph.as_ref(),
                    &paint,
                    transform.pre_translate(left, top),
                    mask,
                );
                drew = true;
            }
        }
        pen_x += metrics.advance_width;
    }
    drew
}

/// Expands an 8-bit coverage bitmap into a premultiplied RGBA pixmap tinted
/// with `color`.
fn tint_coverage(coverage: &[u8], width: usize, height: usize, color: Color) -> Option<Pixmap> {
    let c = color.clamped();
    let mut data = Vec::with_capacity(width * height * 4);
    for &cov in coverage.iter().take(width * height) {
        let f = cov as f32 / 255.0;
        data.push((c.r * f * 255.0).round() as u8);
        data.push((c.g * f * 255.0).round() as u8);
        data.push((c.b * f * 255.0).round() as u8);
        data.push((c.a * f * 255.0).round() as u8);
    }
    Pixmap::from_vec(data, IntSize::from_wh(width as u32, height as u32)?)
}
