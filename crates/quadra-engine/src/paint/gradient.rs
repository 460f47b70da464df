use crate::coords::Vec2;

use super::Color;

/// A single gradient stop.
///
/// `t` is expected in `[0, 1]`; the raster layer clamps out-of-range stops at
/// shader build time.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ColorStop {
    pub t: f32,
    pub color: Color,
}

impl ColorStop {
    #[inline]
    pub const fn new(t: f32, color: Color) -> Self {
        Self { t, color }
    }
}

/// Linear gradient definition in device-pixel space.
///
/// This is a plain value owned by the caller until it is handed to a surface
/// via `set_fill_style`; the conventional create-then-`add_color_stop`
/// mutation pattern is modeled as ordinary data.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearGradient {
    pub start: Vec2,
    pub end: Vec2,
    pub stops: Vec<ColorStop>,
}

impl LinearGradient {
    /// Creates a gradient along the axis `(x0, y0)` → `(x1, y1)` with no stops.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            start: Vec2::new(x0, y0),
            end: Vec2::new(x1, y1),
            stops: Vec::new(),
        }
    }

    /// Appends a stop at position `t` along the gradient axis.
    pub fn add_color_stop(&mut self, t: f32, color: Color) {
        self.stops.push(ColorStop::new(t, color));
    }

    /// True when the definition can produce a usable shader:
    /// finite geometry, a non-degenerate axis and at least one stop.
    pub fn is_usable(&self) -> bool {
        self.start.is_finite()
            && self.end.is_finite()
            && (self.start.x != self.end.x || self.start.y != self.end.y)
            && !self.stops.is_empty()
            && self.stops.iter().all(|s| s.t.is_finite() && s.color.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_accumulate_in_insertion_order() {
        let mut g = LinearGradient::new(0.0, 0.0, 100.0, 0.0);
        g.add_color_stop(0.0, Color::BLACK);
        g.add_color_stop(1.0, Color::WHITE);
        assert_eq!(g.stops.len(), 2);
        assert_eq!(g.stops[0].t, 0.0);
        assert_eq!(g.stops[1].color, Color::WHITE);
    }

    #[test]
    fn degenerate_axis_is_not_usable() {
        let mut g = LinearGradient::new(5.0, 5.0, 5.0, 5.0);
        g.add_color_stop(0.0, Color::WHITE);
        assert!(!g.is_usable());
    }

    #[test]
    fn empty_stops_are_not_usable() {
        assert!(!LinearGradient::new(0.0, 0.0, 1.0, 0.0).is_usable());
    }
}
