//! The quad-batching renderer core.
//!
//! [`BatchedSurface`] implements [`Surface`] on top of any [`BatchTarget`]
//! executor. All batching policy lives here: geometry is transformed on the
//! CPU at submission time, quads accumulate per texture, and the batch
//! flushes whenever correctness requires it — texture switch, capacity,
//! tint change (`fill_rect` bracketing), clip change, or a path-bridge
//! commit. Each flush hands the executor one draw call, in strict paint
//! order, which is what makes the batcher visually equivalent to
//! unbatched painting.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use crate::batch::{BatchConfig, BatchTarget, DrawCall, QuadBatch, ScissorRect, TextureId};
use crate::coords::{Affine, Rect, Vec2, Viewport};
use crate::diag::{DiagSink, Diagnostic};
use crate::image::Bitmap;
use crate::paint::{Color, FillStyle};
use crate::surface::Surface;

use super::bridge::PathBridge;

#[derive(Copy, Clone)]
struct CachedTexture {
    id: TextureId,
    width: u32,
    height: u32,
}

/// Clip state at flush time, after clamping to the viewport.
enum ScissorState {
    /// Draw with this scissor (`None` = unclipped).
    Pass(Option<ScissorRect>),
    /// The clip has zero area: the pending quads are dropped entirely.
    Suppressed,
}

/// Order-preserving quad batcher over an executor `T`.
///
/// Invariants:
/// - every quad in the pending batch shares one texture, one tint and one
///   clip state, so a single draw call renders it faithfully
/// - the clip only ever shrinks between `save`/`restore` pairs
/// - `tint` is [`Color::WHITE`] except inside `fill_rect`'s flush bracket
pub struct BatchedSurface<T: BatchTarget> {
    target: T,
    viewport: Viewport,

    transform: Affine,
    clip: Option<Rect>,
    saves: Vec<(Affine, Option<Rect>)>,
    tint: Color,

    batch: QuadBatch,
    /// Bitmap id → uploaded texture. Entries are never evicted; bitmaps are
    /// immutable so the upload stays valid for the bitmap's lifetime.
    textures: HashMap<u64, CachedTexture>,
    /// 1×1 white texture backing `fill_rect` (tinted solid quads).
    white: TextureId,

    bridge: PathBridge,
    warned_rotated_clip: bool,

    diag: DiagSink,
}

impl<T: BatchTarget> BatchedSurface<T> {
    pub fn new(
        mut target: T,
        viewport: Viewport,
        config: &BatchConfig,
        diag: DiagSink,
    ) -> Result<Self> {
        let white = target.create_texture(1, 1, &[255, 255, 255, 255]);
        Ok(Self {
            target,
            viewport,
            transform: Affine::IDENTITY,
            clip: None,
            saves: Vec::new(),
            tint: Color::WHITE,
            batch: QuadBatch::new(config),
            textures: HashMap::new(),
            white,
            bridge: PathBridge::new(viewport, diag.clone())?,
            warned_rotated_clip: false,
            diag,
        })
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[inline]
    pub fn target(&self) -> &T {
        &self.target
    }

    #[inline]
    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    /// Submits the pending batch as one draw call. Called automatically on
    /// every state change that would invalidate the batch, and by the frame
    /// loop before presenting.
    pub fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        match self.scissor_state() {
            ScissorState::Suppressed => {
                log::trace!(
                    "dropped {} quad(s) under an empty clip",
                    self.batch.quad_count()
                );
            }
            ScissorState::Pass(scissor) => {
                if let Some(texture) = self.batch.texture() {
                    self.target.draw(&DrawCall {
                        vertices: self.batch.vertices(),
                        quad_count: self.batch.quad_count() as u32,
                        texture,
                        tint: self.tint,
                        scissor,
                    });
                }
            }
        }
        self.batch.reset();
    }

    /// Converts the clip rect (device pixels, f32) into a scissor clamped to
    /// the viewport. Zero area after clamping suppresses the draw outright:
    /// the GPU disallows empty scissors, and an invisible batch needs no
    /// call at all.
    fn scissor_state(&self) -> ScissorState {
        let Some(clip) = self.clip else {
            return ScissorState::Pass(None);
        };
        let vw = self.viewport.width_f();
        let vh = self.viewport.height_f();
        let x0 = clip.x.clamp(0.0, vw).round() as u32;
        let y0 = clip.y.clamp(0.0, vh).round() as u32;
        let x1 = (clip.x + clip.w).clamp(0.0, vw).round() as u32;
        let y1 = (clip.y + clip.h).clamp(0.0, vh).round() as u32;
        let w = x1.saturating_sub(x0);
        let h = y1.saturating_sub(y0);
        if w == 0 || h == 0 {
            return ScissorState::Suppressed;
        }
        ScissorState::Pass(Some(ScissorRect { x: x0, y: y0, w, h }))
    }

    fn resolve_texture(&mut self, image: &Bitmap) -> CachedTexture {
        if let Some(cached) = self.textures.get(&image.id()) {
            return *cached;
        }
        let id = self
            .target
            .create_texture(image.width(), image.height(), &image.premultiplied());
        let cached = CachedTexture {
            id,
            width: image.width(),
            height: image.height(),
        };
        self.textures.insert(image.id(), cached);
        cached
    }

    /// Transforms a destination rect's corners and appends the quad,
    /// flushing first on texture switch or capacity. `src` is in texel
    /// units of a `tex_w`×`tex_h` texture.
    fn push_textured_quad(&mut self, texture: TextureId, tex_w: f32, tex_h: f32, dst: Rect, src: Rect) {
        let dst = dst.normalized();
        let src = src.normalized();
        if dst.is_empty() || src.is_empty() {
            return;
        }

        if self.batch.texture() != Some(texture) {
            self.flush();
            self.batch.bind_texture(texture);
        }
        if self.batch.is_full() {
            self.flush();
        }

        let corners = [
            self.transform.apply(Vec2::new(dst.x, dst.y)),
            self.transform.apply(Vec2::new(dst.x + dst.w, dst.y)),
            self.transform.apply(Vec2::new(dst.x + dst.w, dst.y + dst.h)),
            self.transform.apply(Vec2::new(dst.x, dst.y + dst.h)),
        ];
        let uv_min = Vec2::new(src.x / tex_w, src.y / tex_h);
        let uv_max = Vec2::new((src.x + src.w) / tex_w, (src.y + src.h) / tex_h);
        self.batch.push_quad(corners, uv_min, uv_max);
    }

    /// Composites the path bridge's surface as one full-viewport quad
    /// through the batch, then clears it. The current scissor applies to
    /// the composite, which is how clipping reaches path fills (the canvas
    /// itself rasterizes unclipped).
    fn commit_paths(&mut self) {
        if !self.bridge.dirty() {
            return;
        }
        self.flush();

        let w = self.bridge.canvas().width();
        let h = self.bridge.canvas().height();
        let texture = match self.bridge.texture() {
            Some(id) => {
                self.target
                    .write_texture(id, w, h, self.bridge.canvas().pixels());
                id
            }
            None => {
                let id = self
                    .target
                    .create_texture(w, h, self.bridge.canvas().pixels());
                self.bridge.set_texture(id);
                id
            }
        };

        // The canvas already holds device-space pixels; composite 1:1.
        let saved = self.transform;
        self.transform = Affine::IDENTITY;
        self.push_textured_quad(
            texture,
            w as f32,
            h as f32,
            Rect::new(0.0, 0.0, w as f32, h as f32),
            Rect::new(0.0, 0.0, w as f32, h as f32),
        );
        self.flush();
        self.transform = saved;

        self.bridge.finish_commit();
    }
}

impl<T: BatchTarget> Surface for BatchedSurface<T> {
    fn clear(&mut self, color: Color) {
        self.transform = Affine::IDENTITY;
        self.clip = None;
        self.saves.clear();
        self.tint = Color::WHITE;
        self.batch.reset();
        self.bridge.discard();
        self.target.clear_frame(color.clamped());
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
        let dst = Rect::new(x, y, w, h);
        let src = Rect::new(sx, sy, sw, sh);
        if !dst.is_finite() || !src.is_finite() || !self.transform.is_finite() {
            self.diag
                .report(Diagnostic::NonFiniteGeometry { op: "draw_region" });
            return;
        }
        let cached = self.resolve_texture(image);
        self.push_textured_quad(
            cached.id,
            cached.width as f32,
            cached.height as f32,
            dst,
            src,
        );
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        let dst = Rect::new(x, y, w, h);
        if !dst.is_finite() || !color.is_finite() || !self.transform.is_finite() {
            self.diag
                .report(Diagnostic::NonFiniteGeometry { op: "fill_rect" });
            return;
        }
        // Tint is a per-batch uniform, so a solid fill brackets itself with
        // flushes: whatever is pending draws with its own tint, the white
        // quad draws tinted, and the tint reverts before the next blit.
        self.flush();
        self.tint = color.clamped();
        self.push_textured_quad(self.white, 1.0, 1.0, dst, Rect::new(0.0, 0.0, 1.0, 1.0));
        self.flush();
        self.tint = Color::WHITE;
    }

    fn save(&mut self) {
        self.saves.push((self.transform, self.clip));
    }

    fn restore(&mut self) {
        if let Some((transform, clip)) = self.saves.pop() {
            // Restoring may widen the clip again, which changes the scissor
            // for anything already pending.
            if clip != self.clip {
                self.flush();
            }
            self.transform = transform;
            self.clip = clip;
        }
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        if !(sx.is_finite() && sy.is_finite()) {
            self.diag.report(Diagnostic::NonFiniteGeometry { op: "scale" });
            return;
        }
        self.transform.scale(sx, sy);
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        if !(tx.is_finite() && ty.is_finite()) {
            self.diag
                .report(Diagnostic::NonFiniteGeometry { op: "translate" });
            return;
        }
        self.transform.translate(tx, ty);
    }

    fn clip_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let local = Rect::new(x, y, w, h);
        if !local.is_finite() || !self.transform.is_finite() {
            self.diag
                .report(Diagnostic::NonFiniteGeometry { op: "clip_rect" });
            return;
        }
        if self.transform.has_rotation() && !self.warned_rotated_clip {
            self.diag.report(Diagnostic::RotatedClip);
            self.warned_rotated_clip = true;
        }
        // Pending quads belong to the previous clip.
        self.flush();
        let device = self.transform.map_rect(local);
        self.clip = Some(match self.clip {
            None => device.intersect(Rect::new(
                0.0,
                0.0,
                self.viewport.width_f(),
                self.viewport.height_f(),
            )),
            Some(current) => current.intersect(device),
        });
    }

    fn begin_path(&mut self) {
        // Anything drawn so far must land under the path's pixels.
        self.flush();
        self.bridge.begin(self.transform);
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.bridge.canvas_mut().move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.bridge.canvas_mut().line_to(x, y);
    }

    fn close_path(&mut self) {
        self.bridge.canvas_mut().close_path();
    }

    fn fill(&mut self) {
        self.bridge.canvas_mut().set_transform(self.transform);
        let drew = self.bridge.canvas_mut().fill();
        self.bridge.mark(drew);
        self.commit_paths();
    }

    fn stroke(&mut self) {
        self.bridge.canvas_mut().set_transform(self.transform);
        let drew = self.bridge.canvas_mut().stroke();
        self.bridge.mark(drew);
        self.commit_paths();
    }

    fn set_fill_style(&mut self, style: FillStyle) {
        self.bridge.canvas_mut().set_fill_style(style);
    }

    fn set_stroke_style(&mut self, style: FillStyle) {
        self.bridge.canvas_mut().set_stroke_style(style);
    }

    fn set_line_width(&mut self, width: f32) {
        self.bridge.canvas_mut().set_line_width(width);
    }

    fn set_font(&mut self, font: Arc<fontdue::Font>, size: f32) {
        self.bridge.canvas_mut().set_font(font, size);
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32) {
        self.flush();
        self.bridge.canvas_mut().set_transform(self.transform);
        let drew = self.bridge.canvas_mut().fill_text(text, x, y);
        self.bridge.mark(drew);
        self.commit_paths();
    }

    fn update_resolution(&mut self, width: u32, height: u32) {
        self.flush();
        let next = Viewport::new(width, height);
        if !next.is_valid() {
            self.diag.report(Diagnostic::SurfaceResizeFailed {
                detail: format!("zero-area resolution {width}x{height}"),
            });
            return;
        }
        self.viewport = next;
        self.target.resize(width, height);
        if let Err(err) = self.bridge.resize(self.viewport) {
            self.diag.report(Diagnostic::SurfaceResizeFailed {
                detail: format!("path surface: {err:#}"),
            });
        }
    }
}
