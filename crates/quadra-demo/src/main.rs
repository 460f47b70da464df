//! Demo: a small animated scene touching every drawing operation — sprite
//! blits (whole, scaled, sub-rectangle), solid fills, transform save/restore,
//! rectangular clipping, vector paths with gradient fills, and text.

use std::sync::Arc;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use quadra_engine::batch::BatchConfig;
use quadra_engine::logging::{init_logging, LoggingConfig};
use quadra_engine::time::FrameClock;
use quadra_engine::{
    parse_color, Bitmap, Color, FillStyle, GpuInit, GpuRenderer, LinearGradient, LogDiagnostics,
    Surface,
};

struct Assets {
    ship: Bitmap,
    tiles: Bitmap,
    font: Option<Arc<fontdue::Font>>,
}

impl Assets {
    fn load() -> Result<Self> {
        // 16x16 checker "ship" sprite with a transparent border.
        let ship = Bitmap::from_fn(16, 16, |x, y| {
            if x == 0 || y == 0 || x == 15 || y == 15 {
                [0, 0, 0, 0]
            } else if (x / 4 + y / 4) % 2 == 0 {
                [230, 90, 40, 255]
            } else {
                [250, 200, 60, 255]
            }
        })?;

        // 2x1 tile strip: grass | water. Drawn per-tile via draw_region.
        let tiles = Bitmap::from_fn(16, 8, |x, _| {
            if x < 8 {
                [60, 160, 70, 255]
            } else {
                [40, 90, 200, 255]
            }
        })?;

        let font = load_system_font();
        if font.is_none() {
            log::warn!("no system font found; text will be skipped");
        }

        Ok(Self { ship, tiles, font })
    }
}

struct DemoApp {
    renderer: Option<GpuRenderer>,
    assets: Assets,
    clock: FrameClock,
    t: f32,
}

impl DemoApp {
    fn new(assets: Assets) -> Self {
        Self {
            renderer: None,
            assets,
            clock: FrameClock::new(),
            t: 0.0,
        }
    }

    fn paint(renderer: &mut GpuRenderer, assets: &Assets, t: f32) {
        let s: &mut dyn Surface = renderer;
        s.clear(parse_color("#101020"));

        // Tile strip along the bottom, alternating sub-rectangles of one
        // texture (stays in a single batch).
        for i in 0..40 {
            let sx = if i % 2 == 0 { 0.0 } else { 8.0 };
            s.draw_region(&assets.tiles, i as f32 * 24.0, 440.0, 24.0, 24.0, sx, 0.0, 8.0, 8.0);
        }

        // Orbiting sprites under a shared scale.
        s.save();
        s.translate(320.0, 220.0);
        s.scale(2.0, 2.0);
        for k in 0..8 {
            let a = t + k as f32 * std::f32::consts::FRAC_PI_4;
            s.draw_whole(&assets.ship, a.cos() * 60.0 - 8.0, a.sin() * 60.0 - 8.0);
        }
        s.draw_scaled(&assets.ship, -16.0, -16.0, 32.0, 32.0);
        s.restore();

        // A clipped "minimap" panel in the corner.
        s.save();
        s.translate(16.0, 16.0);
        s.clip_rect(0.0, 0.0, 120.0, 90.0);
        s.fill_rect(0.0, 0.0, 120.0, 90.0, parse_color("rgba(0, 0, 0, 0.5)"));
        s.draw_scaled(&assets.tiles, -10.0, -10.0, 160.0, 120.0);
        s.restore();

        // Gradient-filled path triangle plus a stroked outline.
        let mut grad = LinearGradient::new(480.0, 120.0, 600.0, 240.0);
        grad.add_color_stop(0.0, parse_color("#ff0080"));
        grad.add_color_stop(1.0, parse_color("#8000ff"));
        s.set_fill_style(FillStyle::from(grad));
        s.begin_path();
        s.move_to(540.0, 120.0);
        s.line_to(600.0, 240.0);
        s.line_to(480.0, 240.0);
        s.close_path();
        s.fill();
        s.set_stroke_style(FillStyle::solid(Color::WHITE));
        s.set_line_width(2.0);
        s.stroke();

        if let Some(font) = &assets.font {
            s.set_font(font.clone(), 18.0);
            s.set_fill_style(FillStyle::solid(parse_color("#e0e0e0")));
            s.fill_text("quadra demo", 16.0, 470.0);
        }
    }
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }
        let attrs = Window::default_attributes()
            .with_title("quadra demo")
            .with_inner_size(LogicalSize::new(960.0, 480.0));
        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };
        match GpuRenderer::new(
            window,
            GpuInit::default(),
            &BatchConfig::default(),
            LogDiagnostics::sink(),
        ) {
            Ok(renderer) => {
                self.clock.reset();
                renderer.window().request_redraw();
                self.renderer = Some(renderer);
            }
            Err(e) => {
                log::error!("renderer initialization failed: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);
        if let Some(renderer) = &self.renderer {
            renderer.window().request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(new_size) => {
                renderer.resize(new_size);
                renderer.window().request_redraw();
            }

            WindowEvent::RedrawRequested => {
                self.t += self.clock.tick().dt;
                match renderer.begin_frame() {
                    Ok(true) => {
                        Self::paint(renderer, &self.assets, self.t);
                        renderer.end_frame();
                    }
                    Ok(false) => {} // transient surface error; skip
                    Err(e) => {
                        log::error!("frame failed: {e:#}");
                        event_loop.exit();
                    }
                }
            }

            _ => {}
        }
    }
}

// Best-effort lookup of a common system font; the demo runs without text if
// none of these paths exist on the current platform.
fn load_system_font() -> Option<Arc<fontdue::Font>> {
    let candidates = [
        // Linux
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/noto/NotoSans-Regular.ttf",
        // macOS
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/Library/Fonts/Arial.ttf",
        // Windows
        "C:\\Windows\\Fonts\\arial.ttf",
        "C:\\Windows\\Fonts\\segoeui.ttf",
    ];
    let bytes = candidates.iter().find_map(|p| std::fs::read(p).ok())?;
    fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
        .ok()
        .map(Arc::new)
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let assets = Assets::load()?;
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let mut app = DemoApp::new(assets);
    event_loop
        .run_app(&mut app)
        .context("event loop terminated with error")?;
    Ok(())
}
