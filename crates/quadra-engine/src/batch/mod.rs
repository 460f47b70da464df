//! Quad batch buffer and the executor seam.
//!
//! The batcher accumulates CPU-pretransformed quads for exactly one texture
//! and hands complete batches to a [`BatchTarget`] as single draw calls. The
//! GPU executor implements the target on wgpu; tests implement it with a
//! recording or CPU-rasterizing target. Flush triggers (texture switch,
//! capacity, tint change, scissor change, bridge commit) live with the
//! surface in `render::batched` — this module only enforces capacity and the
//! one-texture-per-batch rule.

mod vertex;

pub use vertex::Vertex;

use crate::coords::Vec2;
use crate::paint::Color;

/// Opaque handle to a texture owned by a [`BatchTarget`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// Scissor rectangle in device pixels, already clamped to the viewport.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// One flushed batch: a vertex range plus the state it must be drawn with.
#[derive(Debug)]
pub struct DrawCall<'a> {
    /// Interleaved position+UV vertices, six per quad.
    pub vertices: &'a [Vertex],
    pub quad_count: u32,
    pub texture: TextureId,
    /// Premultiplied tint applied to every sample in the batch.
    pub tint: Color,
    /// `None` = no scissor (full viewport).
    pub scissor: Option<ScissorRect>,
}

/// Executor for batched draws. Implementations own all texture storage.
pub trait BatchTarget {
    /// Allocates a texture and uploads premultiplied RGBA8 pixels once.
    fn create_texture(&mut self, width: u32, height: u32, pixels: &[u8]) -> TextureId;

    /// Replaces the contents (and, if needed, the dimensions) of a texture.
    /// Used by the path bridge, which re-uploads its surface every commit.
    fn write_texture(&mut self, id: TextureId, width: u32, height: u32, pixels: &[u8]);

    /// Draws one flushed batch. Calls arrive in strict paint order.
    fn draw(&mut self, call: &DrawCall<'_>);

    /// Clears the frame buffer to `color`.
    fn clear_frame(&mut self, color: Color);

    /// Viewport resize in device pixels.
    fn resize(&mut self, width: u32, height: u32);
}

/// Batch sizing knobs.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum quads per flush. The vertex storage is preallocated to
    /// `max_quads * 6` and never grows; the surface flushes first whenever
    /// the next quad would overflow.
    pub max_quads: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_quads: 1024 }
    }
}

/// Accumulates transformed quads for a single texture.
///
/// Invariants:
/// - vertex writes never exceed the preallocated capacity
/// - every vertex in the buffer belongs to the one bound texture
#[derive(Debug)]
pub struct QuadBatch {
    vertices: Vec<Vertex>,
    quad_count: usize,
    max_quads: usize,
    texture: Option<TextureId>,
}

impl QuadBatch {
    pub fn new(config: &BatchConfig) -> Self {
        let max_quads = config.max_quads.max(1);
        Self {
            vertices: Vec::with_capacity(max_quads * 6),
            quad_count: 0,
            max_quads,
            texture: None,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.quad_count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.quad_count >= self.max_quads
    }

    #[inline]
    pub fn quad_count(&self) -> usize {
        self.quad_count
    }

    #[inline]
    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    /// Binds the texture for subsequent quads.
    ///
    /// # Panics
    /// Debug-asserts that the batch is empty: the caller must flush before a
    /// texture switch (the painter's-algorithm invariant).
    #[inline]
    pub fn bind_texture(&mut self, texture: TextureId) {
        debug_assert!(
            self.is_empty() || self.texture == Some(texture),
            "texture switch with pending quads; flush first"
        );
        self.texture = Some(texture);
    }

    /// Appends one quad as six vertices (two triangles sharing the TL-BR
    /// diagonal; no index buffer, so vertices 1 and 3 are duplicated).
    ///
    /// `corners` are the transformed positions in TL, TR, BR, BL order;
    /// `uv_min`/`uv_max` span the normalized source sub-rectangle.
    ///
    /// # Panics
    /// Debug-asserts that capacity remains; the caller flushes beforehand.
    pub fn push_quad(&mut self, corners: [Vec2; 4], uv_min: Vec2, uv_max: Vec2) {
        debug_assert!(!self.is_full(), "quad pushed into a full batch; flush first");
        debug_assert!(self.texture.is_some(), "quad pushed with no bound texture");

        let [tl, tr, br, bl] = corners;
        let uv_tr = Vec2::new(uv_max.x, uv_min.y);
        let uv_bl = Vec2::new(uv_min.x, uv_max.y);

        self.vertices.extend_from_slice(&[
            Vertex::new(tl, uv_min),
            Vertex::new(tr, uv_tr),
            Vertex::new(br, uv_max),
            Vertex::new(tl, uv_min),
            Vertex::new(br, uv_max),
            Vertex::new(bl, uv_bl),
        ]);
        self.quad_count += 1;
    }

    /// The accumulated vertex data for the pending batch.
    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Resets the write cursor and quad counter; keeps capacity and the
    /// bound texture (the next batch often reuses it).
    #[inline]
    pub fn reset(&mut self) {
        self.vertices.clear();
        self.quad_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(max_quads: usize) -> QuadBatch {
        QuadBatch::new(&BatchConfig { max_quads })
    }

    #[test]
    fn six_vertices_per_quad() {
        let mut b = batch(4);
        b.bind_texture(TextureId(1));
        b.push_quad(
            [
                Vec2::new(0.0, 0.0),
                Vec2::new(8.0, 0.0),
                Vec2::new(8.0, 8.0),
                Vec2::new(0.0, 8.0),
            ],
            Vec2::zero(),
            Vec2::new(1.0, 1.0),
        );
        assert_eq!(b.quad_count(), 1);
        assert_eq!(b.vertices().len(), 6);
        // Diagonal duplication: vertices 0/3 and 2/4 coincide.
        assert_eq!(b.vertices()[0], b.vertices()[3]);
        assert_eq!(b.vertices()[2], b.vertices()[4]);
    }

    #[test]
    fn fills_to_capacity() {
        let mut b = batch(2);
        b.bind_texture(TextureId(1));
        let corners = [Vec2::zero(); 4];
        b.push_quad(corners, Vec2::zero(), Vec2::new(1.0, 1.0));
        assert!(!b.is_full());
        b.push_quad(corners, Vec2::zero(), Vec2::new(1.0, 1.0));
        assert!(b.is_full());
    }

    #[test]
    fn reset_keeps_binding() {
        let mut b = batch(2);
        b.bind_texture(TextureId(7));
        b.push_quad([Vec2::zero(); 4], Vec2::zero(), Vec2::new(1.0, 1.0));
        b.reset();
        assert!(b.is_empty());
        assert_eq!(b.texture(), Some(TextureId(7)));
    }
}
