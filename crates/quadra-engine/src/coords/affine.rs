use super::{Rect, Vec2};

/// 2D affine transform; the third matrix row is implicitly `[0, 0, 1]`.
///
/// Point mapping:
/// ```text
/// x' = a*x + c*y + tx
/// y' = b*x + d*y + ty
/// ```
///
/// `scale` and `translate` compose in the *current local space* (standard
/// nested-coordinate-system semantics), so `translate(10, 0)` after
/// `scale(2, 1)` moves by 20 device pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Affine {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// Post-multiplies the linear part by a scale.
    #[inline]
    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.a *= sx;
        self.b *= sx;
        self.c *= sy;
        self.d *= sy;
    }

    /// Composes a translation expressed in the current local space.
    #[inline]
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.tx += self.a * dx + self.c * dy;
        self.ty += self.b * dx + self.d * dy;
    }

    /// Maps a point through the transform.
    #[inline]
    pub fn apply(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            self.a * p.x + self.c * p.y + self.tx,
            self.b * p.x + self.d * p.y + self.ty,
        )
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.a.is_finite()
            && self.b.is_finite()
            && self.c.is_finite()
            && self.d.is_finite()
            && self.tx.is_finite()
            && self.ty.is_finite()
    }

    /// True when the linear part contains rotation or shear.
    ///
    /// Clip rectangles are only correct for axis-aligned transforms; callers
    /// use this to surface the documented limitation.
    #[inline]
    pub fn has_rotation(&self) -> bool {
        self.b != 0.0 || self.c != 0.0
    }

    /// Maps an axis-aligned rectangle, assuming no rotation/shear.
    ///
    /// Both corners are transformed and re-normalized, which also handles
    /// negative scales. With rotation present the result is merely the
    /// transformed corners' bounding box.
    #[inline]
    pub fn map_rect(&self, r: Rect) -> Rect {
        Rect::from_corners(self.apply(r.min()), self.apply(r.max()))
    }
}

impl Default for Affine {
    fn default() -> Self {
        Affine::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── composition ───────────────────────────────────────────────────────

    #[test]
    fn translate_after_scale_is_in_local_space() {
        let mut m = Affine::IDENTITY;
        m.scale(2.0, 3.0);
        m.translate(10.0, 10.0);
        // Local (0,0) lands at the scaled translation.
        assert_eq!(m.apply(Vec2::zero()), Vec2::new(20.0, 30.0));
    }

    #[test]
    fn scale_after_translate_keeps_origin() {
        let mut m = Affine::IDENTITY;
        m.translate(5.0, 7.0);
        m.scale(2.0, 2.0);
        assert_eq!(m.apply(Vec2::zero()), Vec2::new(5.0, 7.0));
        assert_eq!(m.apply(Vec2::new(1.0, 1.0)), Vec2::new(7.0, 9.0));
    }

    #[test]
    fn identity_maps_points_unchanged() {
        let p = Vec2::new(3.25, -8.5);
        assert_eq!(Affine::IDENTITY.apply(p), p);
    }

    // ── map_rect ──────────────────────────────────────────────────────────

    #[test]
    fn map_rect_scales_and_translates() {
        let mut m = Affine::IDENTITY;
        m.translate(100.0, 0.0);
        m.scale(2.0, 1.0);
        let r = m.map_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(r, Rect::new(100.0, 0.0, 20.0, 10.0));
    }

    #[test]
    fn map_rect_normalizes_negative_scale() {
        let mut m = Affine::IDENTITY;
        m.scale(-1.0, 1.0);
        let r = m.map_rect(Rect::new(0.0, 0.0, 10.0, 5.0));
        assert_eq!(r, Rect::new(-10.0, 0.0, 10.0, 5.0));
    }

    #[test]
    fn rotation_detection() {
        let mut m = Affine::IDENTITY;
        assert!(!m.has_rotation());
        m.b = 0.5;
        assert!(m.has_rotation());
    }
}
