//! Renderer backends.
//!
//! Two implementations of [`crate::surface::Surface`]:
//! - [`batched::BatchedSurface`] — the quad-batching renderer, generic over a
//!   [`crate::batch::BatchTarget`] executor; paired with
//!   [`gpu::WgpuTarget`] it becomes the GPU backend ([`gpu::GpuRenderer`]).
//! - [`soft::SoftRenderer`] — the plain immediate-mode software backend, also
//!   the unbatched reference for order-preservation tests.
//!
//! Convention (shared with the shader): CPU geometry is in device pixels,
//! top-left origin, +Y down; the vertex shader converts to NDC using a
//! viewport uniform.

pub mod batched;
pub(crate) mod bridge;
pub mod gpu;
pub mod soft;

#[cfg(test)]
pub(crate) mod testing;
