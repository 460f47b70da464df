//! Software 2D raster surface.
//!
//! Backs two consumers through one narrow interface:
//! - the software renderer backend draws everything here directly
//! - the GPU backend's path bridge rasterizes vector paths and text here,
//!   then composites the result through the quad batcher
//!
//! Rasterization is delegated to `tiny-skia`; glyphs are rasterized by
//! `fontdue` and blended as small premultiplied pixmaps.

mod canvas;
mod text;

pub use canvas::Canvas;
