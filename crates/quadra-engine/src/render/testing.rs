//! Headless executors for batcher tests.
//!
//! [`RecordingTarget`] captures draw calls verbatim for assertions on flush
//! behavior; [`RasterTarget`] actually rasterizes quads on the CPU with the
//! same sampling and blending rules as the GPU pipeline (nearest-neighbor,
//! premultiplied src-over, scissor), so batched output can be compared
//! pixel-for-pixel against the unbatched software reference.

use std::collections::HashMap;

use crate::batch::{BatchTarget, DrawCall, ScissorRect, TextureId, Vertex};
use crate::paint::Color;

// ── recording target ──────────────────────────────────────────────────────

pub(crate) struct RecordedCall {
    pub texture: TextureId,
    pub tint: Color,
    pub quad_count: u32,
    pub vertices: Vec<Vertex>,
    pub scissor: Option<ScissorRect>,
}

#[derive(Default)]
pub(crate) struct RecordingTarget {
    pub calls: Vec<RecordedCall>,
    pub textures_created: usize,
    pub texture_writes: usize,
    pub cleared: Option<Color>,
    pub size: (u32, u32),
    next_id: u64,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BatchTarget for RecordingTarget {
    fn create_texture(&mut self, _width: u32, _height: u32, _pixels: &[u8]) -> TextureId {
        self.textures_created += 1;
        self.next_id += 1;
        TextureId(self.next_id)
    }

    fn write_texture(&mut self, _id: TextureId, _width: u32, _height: u32, _pixels: &[u8]) {
        self.texture_writes += 1;
    }

    fn draw(&mut self, call: &DrawCall<'_>) {
        self.calls.push(RecordedCall {
            texture: call.texture,
            tint: call.tint,
            quad_count: call.quad_count,
            vertices: call.vertices.to_vec(),
            scissor: call.scissor,
        });
    }

    fn clear_frame(&mut self, color: Color) {
        self.cleared = Some(color);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }
}

// ── CPU rasterizing target ────────────────────────────────────────────────

struct TestTexture {
    width: u32,
    height: u32,
    /// Premultiplied RGBA8.
    pixels: Vec<u8>,
}

pub(crate) struct RasterTarget {
    width: u32,
    height: u32,
    /// Premultiplied RGBA8, row-major — the same layout `raster::Canvas`
    /// exposes, so frame buffers compare with `assert_eq!`.
    fb: Vec<u8>,
    textures: HashMap<TextureId, TestTexture>,
    next_id: u64,
}

impl RasterTarget {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fb: vec![0; (width * height * 4) as usize],
            textures: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn framebuffer(&self) -> &[u8] {
        &self.fb
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [self.fb[i], self.fb[i + 1], self.fb[i + 2], self.fb[i + 3]]
    }

    /// Rasterizes one axis-aligned quad. The batcher emits six vertices with
    /// TL at 0, BR at 2 and BL at 5, which is enough to reconstruct the
    /// destination and UV rectangles.
    fn blit_quad(&mut self, quad: &[Vertex], texture: TextureId, tint: Color, scissor: Option<ScissorRect>) {
        let Some(tex) = self.textures.get(&texture) else {
            return;
        };
        let tl = quad[0];
        let br = quad[2];
        let (dx0, dy0) = (tl.pos[0], tl.pos[1]);
        let (dx1, dy1) = (br.pos[0], br.pos[1]);
        if dx1 <= dx0 || dy1 <= dy0 {
            return;
        }
        let (u0, v0) = (tl.uv[0], tl.uv[1]);
        let (u1, v1) = (br.uv[0], br.uv[1]);

        let (sx0, sy0, sx1, sy1) = match scissor {
            Some(s) => (s.x, s.y, s.x + s.w, s.y + s.h),
            None => (0, 0, self.width, self.height),
        };
        let px0 = (dx0.round().max(0.0) as u32).max(sx0);
        let py0 = (dy0.round().max(0.0) as u32).max(sy0);
        let px1 = (dx1.round().max(0.0) as u32).min(sx1).min(self.width);
        let py1 = (dy1.round().max(0.0) as u32).min(sy1).min(self.height);

        let tint = tint.clamped();
        for py in py0..py1 {
            for px in px0..px1 {
                // Sample at the pixel center, nearest-neighbor.
                let fu = u0 + (px as f32 + 0.5 - dx0) / (dx1 - dx0) * (u1 - u0);
                let fv = v0 + (py as f32 + 0.5 - dy0) / (dy1 - dy0) * (v1 - v0);
                let tx = ((fu * tex.width as f32) as i64).clamp(0, tex.width as i64 - 1) as u32;
                let ty = ((fv * tex.height as f32) as i64).clamp(0, tex.height as i64 - 1) as u32;
                let ti = ((ty * tex.width + tx) * 4) as usize;

                let src = [
                    tex.pixels[ti] as f32 / 255.0 * tint.r,
                    tex.pixels[ti + 1] as f32 / 255.0 * tint.g,
                    tex.pixels[ti + 2] as f32 / 255.0 * tint.b,
                    tex.pixels[ti + 3] as f32 / 255.0 * tint.a,
                ];
                let fi = ((py * self.width + px) * 4) as usize;
                for c in 0..4 {
                    // Premultiplied src-over: dst = src + dst * (1 - src_a).
                    let s = (src[c] * 255.0).round();
                    let d = self.fb[fi + c] as f32;
                    self.fb[fi + c] = (s + d * (1.0 - src[3])).round().min(255.0) as u8;
                }
            }
        }
    }
}

impl BatchTarget for RasterTarget {
    fn create_texture(&mut self, width: u32, height: u32, pixels: &[u8]) -> TextureId {
        self.next_id += 1;
        let id = TextureId(self.next_id);
        self.textures.insert(
            id,
            TestTexture {
                width,
                height,
                pixels: pixels.to_vec(),
            },
        );
        id
    }

    fn write_texture(&mut self, id: TextureId, width: u32, height: u32, pixels: &[u8]) {
        self.textures.insert(
            id,
            TestTexture {
                width,
                height,
                pixels: pixels.to_vec(),
            },
        );
    }

    fn draw(&mut self, call: &DrawCall<'_>) {
        for quad in call.vertices.chunks_exact(6) {
            self.blit_quad(quad, call.texture, call.tint, call.scissor);
        }
    }

    fn clear_frame(&mut self, color: Color) {
        let c = color.clamped();
        let px = [
            (c.r * 255.0).round() as u8,
            (c.g * 255.0).round() as u8,
            (c.b * 255.0).round() as u8,
            (c.a * 255.0).round() as u8,
        ];
        for chunk in self.fb.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.fb = vec![0; (width * height * 4) as usize];
    }
}
