//! Quadra engine crate.
//!
//! A 2D renderer for sprite-heavy games: an order-preserving GPU quad
//! batcher with a software vector-path bridge, plus a pure-software backend
//! behind the same drawing surface.

pub mod batch;
pub mod coords;
pub mod diag;
pub mod image;
pub mod logging;
pub mod paint;
pub mod raster;
pub mod render;
pub mod surface;
pub mod time;

pub use diag::{DiagSink, Diagnostic, Diagnostics, LogDiagnostics};
pub use image::Bitmap;
pub use paint::{parse_color, Color, ColorStop, FillStyle, LinearGradient};
pub use render::gpu::{GpuInit, GpuRenderer};
pub use render::soft::SoftRenderer;
pub use surface::Surface;
