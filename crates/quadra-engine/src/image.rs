//! CPU-side raster images (sprite sheets, procedural textures).

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Result, ensure};

use crate::paint::Color;

static NEXT_BITMAP_ID: AtomicU64 = AtomicU64::new(1);

/// A CPU raster image: straight-alpha RGBA8 pixels plus a process-unique
/// identity.
///
/// The identity (not the pixel contents) is the texture-cache key: the GPU
/// backend uploads each `Bitmap` at most once and never evicts it, which is
/// acceptable because the set of distinct source images is small and fixed at
/// load time. Mutating pixels after the first draw therefore has no effect on
/// the GPU backend by design.
#[derive(Debug, Clone)]
pub struct Bitmap {
    id: u64,
    width: u32,
    height: u32,
    pixels: Vec<u8>, // straight-alpha RGBA8, row-major
}

impl Bitmap {
    /// Wraps existing straight-alpha RGBA8 pixel data.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        ensure!(width > 0 && height > 0, "bitmap must be at least 1x1");
        ensure!(
            pixels.len() == (width as usize) * (height as usize) * 4,
            "pixel buffer is {} bytes, expected {} for {width}x{height}",
            pixels.len(),
            (width as usize) * (height as usize) * 4,
        );
        Ok(Self {
            id: NEXT_BITMAP_ID.fetch_add(1, Ordering::Relaxed),
            width,
            height,
            pixels,
        })
    }

    /// A solid-color bitmap.
    pub fn solid(width: u32, height: u32, color: Color) -> Result<Self> {
        let (r, g, b, a) = color.to_straight();
        let px = [
            (r * 255.0).round() as u8,
            (g * 255.0).round() as u8,
            (b * 255.0).round() as u8,
            (a * 255.0).round() as u8,
        ];
        let mut pixels = Vec::with_capacity((width as usize) * (height as usize) * 4);
        for _ in 0..(width as usize) * (height as usize) {
            pixels.extend_from_slice(&px);
        }
        Self::from_rgba8(width, height, pixels)
    }

    /// Builds a bitmap from a per-pixel closure returning straight RGBA bytes.
    pub fn from_fn(
        width: u32,
        height: u32,
        mut f: impl FnMut(u32, u32) -> [u8; 4],
    ) -> Result<Self> {
        let mut pixels = Vec::with_capacity((width as usize) * (height as usize) * 4);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&f(x, y));
            }
        }
        Self::from_rgba8(width, height, pixels)
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Straight-alpha RGBA8 pixel data, row-major.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the pixel data with RGB premultiplied by alpha.
    ///
    /// Textures are stored premultiplied so one blend state serves sprites,
    /// solid fills and path-bridge composites alike.
    pub fn premultiplied(&self) -> Vec<u8> {
        let mut out = self.pixels.clone();
        for px in out.chunks_exact_mut(4) {
            let a = px[3] as u16;
            if a < 255 {
                px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
                px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
                px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
            }
        }
        out
    }
}
