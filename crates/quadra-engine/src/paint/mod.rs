//! Color and fill-style model shared between backends.
//!
//! Scope:
//! - color representation (premultiplied alpha)
//! - textual color spec parsing
//! - fill sources (solid, linear gradient)
//!
//! Geometry types remain in `coords`.

pub mod color;
pub mod gradient;
pub mod parse;

pub use color::Color;
pub use gradient::{ColorStop, LinearGradient};
pub use parse::parse_color;

/// Fill source for path operations.
///
/// Gradients are opaque caller-owned values; they carry no renderer state and
/// are interpreted by the software raster layer at fill/stroke time.
#[derive(Debug, Clone, PartialEq)]
pub enum FillStyle {
    Solid(Color),
    LinearGradient(LinearGradient),
}

impl FillStyle {
    #[inline]
    pub fn solid(color: Color) -> Self {
        FillStyle::Solid(color)
    }
}

impl From<Color> for FillStyle {
    fn from(color: Color) -> Self {
        FillStyle::Solid(color)
    }
}

impl From<LinearGradient> for FillStyle {
    fn from(gradient: LinearGradient) -> Self {
        FillStyle::LinearGradient(gradient)
    }
}
