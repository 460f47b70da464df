use bytemuck::{Pod, Zeroable};

use crate::coords::Vec2;

/// One batched vertex: position already transformed into device pixels plus a
/// normalized texture coordinate. Interleaved layout, stride = 4 floats.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
}

impl Vertex {
    #[inline]
    pub fn new(pos: Vec2, uv: Vec2) -> Self {
        Self {
            pos: [pos.x, pos.y],
            uv: [uv.x, uv.y],
        }
    }

    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos (device px)
        1 => Float32x2  // uv  (normalized)
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}
