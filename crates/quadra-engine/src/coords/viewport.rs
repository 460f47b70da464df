/// Drawable size in device pixels.
///
/// Both backends treat this as the coordinate basis: the GPU vertex shader
/// divides by it for NDC conversion, the scissor conversion clamps to it, and
/// the path bridge sizes its off-screen canvas to it.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    #[inline]
    pub fn width_f(self) -> f32 {
        self.width as f32
    }

    #[inline]
    pub fn height_f(self) -> f32 {
        self.height as f32
    }
}
