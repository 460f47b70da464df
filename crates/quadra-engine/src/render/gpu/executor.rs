//! wgpu executor for batched draws.
//!
//! One pipeline renders everything: pretransformed device-pixel quads,
//! nearest-neighbor sampling, premultiplied alpha blending. Because
//! `Queue::write_buffer` and `Queue::write_texture` land before the frame's
//! encoder executes, every draw call gets a fresh range of a per-frame
//! vertex arena and its own 256-byte uniform slot (viewport + tint, bound
//! with a dynamic offset), and a texture some recorded pass already samples
//! is never rewritten in place — reusing either within a frame would make
//! the last write win across all passes.

use std::collections::HashMap;

use crate::batch::{BatchTarget, DrawCall, TextureId, Vertex};
use crate::paint::Color;

use super::context::GpuFrame;

/// Dynamic-offset stride; matches wgpu's default
/// `min_uniform_buffer_offset_alignment`.
const UNIFORM_STRIDE: u64 = 256;
const INITIAL_UNIFORM_SLOTS: u32 = 64;
const INITIAL_ARENA_BYTES: u64 = 64 * 1024;

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct QuadUniforms {
    viewport: [f32; 2],
    _pad: [f32; 2], // 16-byte alignment
    tint: [f32; 4],
}

fn premul_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

struct GpuTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
    /// Set when a pass recorded this frame binds the texture.
    sampled_this_frame: bool,
}

/// Whether a `write_texture` may reuse the existing allocation. Queued
/// texture writes execute before the encoder, so rewriting a texture a
/// recorded pass samples would retroactively change that pass's pixels; it
/// gets a fresh allocation instead.
fn rewritable_in_place(size: (u32, u32), sampled_this_frame: bool, width: u32, height: u32) -> bool {
    size == (width, height) && !sampled_this_frame
}

/// Per-frame vertex storage. The cursor resets at frame start; a flush that
/// would overflow retires the buffer (passes already recorded keep it alive)
/// and continues in a larger one.
struct VertexArena {
    buffer: wgpu::Buffer,
    capacity: u64,
    cursor: u64,
}

struct UniformRing {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    slots: u32,
    used: u32,
}

pub struct WgpuTarget {
    device: wgpu::Device,
    queue: wgpu::Queue,

    pipeline: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    arena: VertexArena,
    uniforms: UniformRing,
    retired: Vec<wgpu::Buffer>,
    retired_textures: Vec<GpuTexture>,

    textures: HashMap<TextureId, GpuTexture>,
    next_texture_id: u64,

    size: (u32, u32),
    frame: Option<GpuFrame>,
    warned_no_frame: bool,
}

impl WgpuTarget {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("quadra quad shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/quad.wgsl").into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quadra uniform bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: uniform_min_binding_size(),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quadra texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("quadra quad pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            // Newer wgpu uses immediate constants; keep disabled.
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("quadra quad pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[Vertex::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),

            multiview_mask: None,
            cache: None,
        });

        // Pixel-art contract: nearest filtering, clamp to edge.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("quadra quad sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let arena = VertexArena {
            buffer: create_vertex_buffer(&device, INITIAL_ARENA_BYTES),
            capacity: INITIAL_ARENA_BYTES,
            cursor: 0,
        };
        let uniforms = create_uniform_ring(&device, &uniform_layout, INITIAL_UNIFORM_SLOTS);

        Self {
            device,
            queue,
            pipeline,
            uniform_layout,
            texture_layout,
            sampler,
            arena,
            uniforms,
            retired: Vec::new(),
            retired_textures: Vec::new(),
            textures: HashMap::new(),
            next_texture_id: 0,
            size: (width, height),
            frame: None,
            warned_no_frame: false,
        }
    }

    /// Adopts an acquired frame; all subsequent draws record into its
    /// encoder. Resets the per-frame allocators.
    pub fn begin_frame(&mut self, frame: GpuFrame) {
        self.frame = Some(frame);
        self.arena.cursor = 0;
        self.uniforms.used = 0;
        self.retired.clear();
        self.retired_textures.clear();
        for texture in self.textures.values_mut() {
            texture.sampled_this_frame = false;
        }
    }

    /// Releases the frame for submission.
    pub fn take_frame(&mut self) -> Option<GpuFrame> {
        self.frame.take()
    }

    fn ensure_arena_capacity(&mut self, bytes: u64) {
        if self.arena.cursor + bytes <= self.arena.capacity {
            return;
        }
        let new_capacity = (self.arena.cursor + bytes)
            .next_power_of_two()
            .max(INITIAL_ARENA_BYTES);
        log::debug!("vertex arena grows to {new_capacity} bytes");
        let buffer = create_vertex_buffer(&self.device, new_capacity);
        // Recorded passes still reference the old buffer; keep it until the
        // frame is submitted.
        self.retired
            .push(std::mem::replace(&mut self.arena.buffer, buffer));
        self.arena.capacity = new_capacity;
        self.arena.cursor = 0;
    }

    /// Writes one uniform slot (viewport + tint) and returns its dynamic
    /// offset.
    fn alloc_uniform_slot(&mut self, tint: Color) -> u32 {
        if self.uniforms.used == self.uniforms.slots {
            let slots = self.uniforms.slots * 2;
            log::debug!("uniform ring grows to {slots} slots");
            let ring = create_uniform_ring(&self.device, &self.uniform_layout, slots);
            self.retired
                .push(std::mem::replace(&mut self.uniforms.buffer, ring.buffer));
            self.uniforms.bind_group = ring.bind_group;
            self.uniforms.slots = ring.slots;
            self.uniforms.used = 0;
        }

        let offset = self.uniforms.used as u64 * UNIFORM_STRIDE;
        let u = QuadUniforms {
            viewport: [self.size.0.max(1) as f32, self.size.1.max(1) as f32],
            _pad: [0.0; 2],
            tint: tint.to_array(),
        };
        self.queue
            .write_buffer(&self.uniforms.buffer, offset, bytemuck::bytes_of(&u));
        self.uniforms.used += 1;
        offset as u32
    }

    fn make_texture(&self, width: u32, height: u32) -> GpuTexture {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("quadra image texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            // Non-sRGB: pixels are display-referred bytes, sampled as-is.
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("quadra image bind group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        GpuTexture {
            texture,
            bind_group,
            width,
            height,
            sampled_this_frame: false,
        }
    }

    fn upload(&self, texture: &wgpu::Texture, width: u32, height: u32, pixels: &[u8]) {
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn warn_no_frame(&mut self, what: &str) {
        if !self.warned_no_frame {
            log::warn!("{what} outside an active frame; ignored");
            self.warned_no_frame = true;
        }
    }
}

impl BatchTarget for WgpuTarget {
    fn create_texture(&mut self, width: u32, height: u32, pixels: &[u8]) -> TextureId {
        self.next_texture_id += 1;
        let id = TextureId(self.next_texture_id);
        let entry = self.make_texture(width, height);
        self.upload(&entry.texture, width, height, pixels);
        self.textures.insert(id, entry);
        id
    }

    fn write_texture(&mut self, id: TextureId, width: u32, height: u32, pixels: &[u8]) {
        let reusable = match self.textures.get(&id) {
            Some(t) => rewritable_in_place((t.width, t.height), t.sampled_this_frame, width, height),
            None => false,
        };
        if !reusable {
            let entry = self.make_texture(width, height);
            if let Some(old) = self.textures.insert(id, entry) {
                // Recorded passes still reference the old texture; keep it
                // until the frame is submitted.
                self.retired_textures.push(old);
            }
        }
        if let Some(entry) = self.textures.get(&id) {
            self.upload(&entry.texture, width, height, pixels);
        }
    }

    fn draw(&mut self, call: &DrawCall<'_>) {
        if self.frame.is_none() {
            self.warn_no_frame("draw");
            return;
        }

        // Buffer writes must be allocated before the pass borrows anything.
        let bytes: &[u8] = bytemuck::cast_slice(call.vertices);
        self.ensure_arena_capacity(bytes.len() as u64);
        let vtx_start = self.arena.cursor;
        self.queue.write_buffer(&self.arena.buffer, vtx_start, bytes);
        self.arena.cursor += bytes.len() as u64;

        let uniform_offset = self.alloc_uniform_slot(call.tint);
        let (vw, vh) = self.size;

        let Some(texture) = self.textures.get_mut(&call.texture) else {
            log::warn!("draw with unknown texture {:?}", call.texture);
            return;
        };
        texture.sampled_this_frame = true;
        let Some(frame) = self.frame.as_mut() else {
            return;
        };

        let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("quadra batch pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.uniforms.bind_group, &[uniform_offset]);
        rpass.set_bind_group(1, &texture.bind_group, &[]);
        rpass.set_vertex_buffer(
            0,
            self.arena
                .buffer
                .slice(vtx_start..vtx_start + bytes.len() as u64),
        );
        if let Some(s) = call.scissor {
            // Clamp once more against the live surface size: a resize can
            // land between batching and execution.
            let x = s.x.min(vw);
            let y = s.y.min(vh);
            let w = s.w.min(vw - x);
            let h = s.h.min(vh - y);
            if w == 0 || h == 0 {
                return;
            }
            rpass.set_scissor_rect(x, y, w, h);
        }
        rpass.draw(0..call.quad_count * 6, 0..1);
    }

    fn clear_frame(&mut self, color: Color) {
        let Some(frame) = self.frame.as_mut() else {
            self.warn_no_frame("clear");
            return;
        };
        let c = color.clamped();
        // An empty pass whose load op clears the attachment.
        let _ = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("quadra clear pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: c.r as f64,
                        g: c.g as f64,
                        b: c.b as f64,
                        a: c.a as f64,
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }
}

fn create_vertex_buffer(device: &wgpu::Device, capacity: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("quadra vertex arena"),
        size: capacity,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_uniform_ring(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    slots: u32,
) -> UniformRing {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("quadra uniform ring"),
        size: slots as u64 * UNIFORM_STRIDE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("quadra uniform bind group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: uniform_min_binding_size(),
            }),
        }],
    });
    UniformRing {
        buffer,
        bind_group,
        slots,
        used: 0,
    }
}

/// `QuadUniforms` is 32 bytes by construction, so the size is non-zero.
fn uniform_min_binding_size() -> Option<std::num::NonZeroU64> {
    std::num::NonZeroU64::new(std::mem::size_of::<QuadUniforms>() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two path commits in one frame rewrite the bridge texture between
    // recorded passes; a texture the first pass samples must get a fresh
    // allocation or both passes composite the second commit's pixels.
    #[test]
    fn sampled_texture_is_never_rewritten_in_place() {
        assert!(!rewritable_in_place((64, 64), true, 64, 64));
    }

    #[test]
    fn untouched_texture_is_rewritten_in_place() {
        assert!(rewritable_in_place((64, 64), false, 64, 64));
    }

    #[test]
    fn extent_change_forces_fresh_texture() {
        assert!(!rewritable_in_place((64, 64), false, 128, 64));
        assert!(!rewritable_in_place((64, 64), false, 64, 32));
    }
}
