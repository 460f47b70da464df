//! Geometry types shared by both renderer backends.
//!
//! Canonical coordinate space:
//! - Device pixels (the game's framebuffer resolution)
//! - Origin top-left
//! - +X right, +Y down
//!
//! The GPU backend converts to NDC in the vertex shader using a viewport
//! uniform; the software backend rasterizes in this space directly.

mod affine;
mod rect;
mod vec2;
mod viewport;

pub use affine::Affine;
pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
