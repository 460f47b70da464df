//! Textual color spec parsing.
//!
//! Accepted forms:
//! - `#rgb`, `#rrggbb`, `#rrggbbaa` (hex, case-insensitive)
//! - `rgb(r, g, b)` with byte components
//! - `rgba(r, g, b, a)` with byte components and a float alpha in `[0, 1]`
//! - a small set of named colors
//!
//! Unrecognized input falls back to opaque white; a color spec typo should
//! produce a visual glitch, never a crash mid-frame.

use super::Color;

/// Parses a color spec, falling back to opaque white on anything unrecognized.
pub fn parse_color(spec: &str) -> Color {
    match try_parse_color(spec) {
        Some(color) => color,
        None => {
            log::debug!("unrecognized color spec {spec:?}; using white");
            Color::WHITE
        }
    }
}

/// Parses a color spec, returning `None` on unrecognized input.
pub fn try_parse_color(spec: &str) -> Option<Color> {
    let s = spec.trim();

    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }

    let lower = s.to_ascii_lowercase();
    if let Some(args) = lower.strip_prefix("rgba(").and_then(|r| r.strip_suffix(')')) {
        return parse_rgba_args(args, true);
    }
    if let Some(args) = lower.strip_prefix("rgb(").and_then(|r| r.strip_suffix(')')) {
        return parse_rgba_args(args, false);
    }

    named(&lower)
}

fn parse_hex(hex: &str) -> Option<Color> {
    let nibble = |c: u8| -> Option<u8> {
        match c {
            b'0'..=b'9' => Some(c - b'0'),
            b'a'..=b'f' => Some(c - b'a' + 10),
            b'A'..=b'F' => Some(c - b'A' + 10),
            _ => None,
        }
    };
    let byte = |hi: u8, lo: u8| -> Option<u8> { Some(nibble(hi)? << 4 | nibble(lo)?) };

    let b = hex.as_bytes();
    match b.len() {
        // #rgb — each nibble doubled.
        3 => {
            let r = nibble(b[0])?;
            let g = nibble(b[1])?;
            let bl = nibble(b[2])?;
            Some(Color::from_rgba8(r << 4 | r, g << 4 | g, bl << 4 | bl, 255))
        }
        6 => Some(Color::from_rgba8(
            byte(b[0], b[1])?,
            byte(b[2], b[3])?,
            byte(b[4], b[5])?,
            255,
        )),
        8 => Some(Color::from_rgba8(
            byte(b[0], b[1])?,
            byte(b[2], b[3])?,
            byte(b[4], b[5])?,
            byte(b[6], b[7])?,
        )),
        _ => None,
    }
}

fn parse_rgba_args(args: &str, with_alpha: bool) -> Option<Color> {
    let mut parts = args.split(',').map(str::trim);

    let mut channel = || -> Option<u8> {
        let v: f32 = parts.next()?.parse().ok()?;
        Some(v.clamp(0.0, 255.0).round() as u8)
    };
    let r = channel()?;
    let g = channel()?;
    let b = channel()?;

    let a = if with_alpha {
        let v: f32 = parts.next()?.parse().ok()?;
        v.clamp(0.0, 1.0)
    } else {
        1.0
    };

    if parts.next().is_some() {
        return None;
    }
    Some(Color::from_straight(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        a,
    ))
}

fn named(name: &str) -> Option<Color> {
    let (r, g, b, a) = match name {
        "white" => (255, 255, 255, 255),
        "black" => (0, 0, 0, 255),
        "red" => (255, 0, 0, 255),
        "green" => (0, 128, 0, 255),
        "lime" => (0, 255, 0, 255),
        "blue" => (0, 0, 255, 255),
        "yellow" => (255, 255, 0, 255),
        "cyan" => (0, 255, 255, 255),
        "magenta" => (255, 0, 255, 255),
        "gray" | "grey" => (128, 128, 128, 255),
        "orange" => (255, 165, 0, 255),
        "transparent" => (0, 0, 0, 0),
        _ => return None,
    };
    Some(Color::from_rgba8(r, g, b, a))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight(spec: &str) -> (f32, f32, f32, f32) {
        parse_color(spec).to_straight()
    }

    // ── hex ───────────────────────────────────────────────────────────────

    #[test]
    fn hex_six_digit() {
        assert_eq!(straight("#ff0000"), (1.0, 0.0, 0.0, 1.0));
        assert_eq!(straight("#00FF00"), (0.0, 1.0, 0.0, 1.0));
    }

    #[test]
    fn hex_three_digit_expands_nibbles() {
        assert_eq!(straight("#f00"), (1.0, 0.0, 0.0, 1.0));
        let (r, ..) = straight("#a00");
        assert!((r - 170.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn hex_eight_digit_carries_alpha() {
        let (_, _, _, a) = straight("#ff000080");
        assert!((a - 128.0 / 255.0).abs() < 1e-6);
    }

    // ── functional ────────────────────────────────────────────────────────

    #[test]
    fn rgb_functional() {
        let (r, g, b, a) = straight("rgb(0, 128, 255)");
        assert_eq!(r, 0.0);
        assert!((g - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(b, 1.0);
        assert_eq!(a, 1.0);
    }

    #[test]
    fn rgba_functional_with_float_alpha() {
        let (r, _, _, a) = straight("rgba(255, 0, 0, 0.5)");
        assert!((r - 1.0).abs() < 1e-6);
        assert_eq!(a, 0.5);
    }

    #[test]
    fn rgb_rejects_extra_args() {
        assert!(try_parse_color("rgb(1, 2, 3, 4)").is_none());
    }

    // ── named + fallback ──────────────────────────────────────────────────

    #[test]
    fn named_colors() {
        assert_eq!(straight("black"), (0.0, 0.0, 0.0, 1.0));
        assert_eq!(straight("  WHITE "), (1.0, 1.0, 1.0, 1.0));
    }

    #[test]
    fn garbage_falls_back_to_white() {
        assert_eq!(parse_color("not-a-color"), Color::WHITE);
        assert_eq!(parse_color("#zz0000"), Color::WHITE);
        assert_eq!(parse_color(""), Color::WHITE);
        assert_eq!(parse_color("rgb(1,2)"), Color::WHITE);
    }
}
