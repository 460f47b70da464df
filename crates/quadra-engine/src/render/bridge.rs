//! Vector path compatibility bridge.
//!
//! Arbitrary polygons, text and gradient fills are impractical to express as
//! GPU quads. Instead of a GPU vector rasterizer, path calls run verbatim on
//! a software raster surface sized to the viewport; committing uploads that
//! surface as a texture and composites it as one full-viewport quad through
//! the same batch pipeline, preserving paint order relative to surrounding
//! blits at the cost of a full-viewport upload per commit (acceptable: path
//! usage is rare — UI text, transition overlays).

use anyhow::Result;

use crate::batch::TextureId;
use crate::coords::{Affine, Viewport};
use crate::diag::DiagSink;
use crate::raster::Canvas;

/// The software path surface plus its commit bookkeeping.
///
/// Invariant: `dirty` is true iff the surface holds rasterized pixels not yet
/// composited into the batch. Commit clears both the pixels and the flag, so
/// double-compositing cannot occur.
pub(crate) struct PathBridge {
    canvas: Canvas,
    dirty: bool,
    /// Reserved texture re-uploaded on every commit, recreated on resize.
    texture: Option<TextureId>,
}

impl PathBridge {
    pub fn new(viewport: Viewport, diag: DiagSink) -> Result<Self> {
        Ok(Self {
            canvas: Canvas::new(viewport.width, viewport.height, diag)?,
            dirty: false,
            texture: None,
        })
    }

    /// Starts a new path: syncs the owning surface's transform onto the
    /// canvas and discards any in-progress sub-path. (The owning surface has
    /// already flushed its batch for ordering.)
    pub fn begin(&mut self, transform: Affine) {
        self.canvas.set_transform(transform);
        self.canvas.begin_path();
    }

    #[inline]
    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    #[inline]
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    #[inline]
    pub fn dirty(&self) -> bool {
        self.dirty
    }

    /// Records the outcome of a fill/stroke/text operation.
    #[inline]
    pub fn mark(&mut self, drew: bool) {
        self.dirty |= drew;
    }

    #[inline]
    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    #[inline]
    pub fn set_texture(&mut self, id: TextureId) {
        self.texture = Some(id);
    }

    /// Clears pixels and the dirty flag after a successful composite.
    pub fn finish_commit(&mut self) {
        self.canvas.clear_pixels(crate::paint::Color::TRANSPARENT);
        self.dirty = false;
    }

    /// Discards uncommitted edits (frame start).
    pub fn discard(&mut self) {
        if self.dirty {
            self.canvas.clear_pixels(crate::paint::Color::TRANSPARENT);
            self.dirty = false;
        }
        self.canvas.reset_state();
    }

    /// Resizes the off-screen surface; the reserved texture is recreated at
    /// the next commit with the new dimensions.
    pub fn resize(&mut self, viewport: Viewport) -> Result<()> {
        self.canvas.resize(viewport.width, viewport.height)?;
        self.dirty = false;
        self.texture = None;
        Ok(())
    }
}
