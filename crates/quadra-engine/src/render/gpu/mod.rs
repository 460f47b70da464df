//! GPU backend: the batched surface running on a wgpu executor, bound to a
//! winit window.

mod context;
mod executor;

pub use context::{Gpu, GpuFrame, GpuInit, SurfaceErrorAction};
pub use executor::WgpuTarget;

use std::sync::Arc;

use anyhow::Result;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::batch::BatchConfig;
use crate::coords::Viewport;
use crate::diag::{DiagSink, Diagnostic};
use crate::image::Bitmap;
use crate::paint::{Color, FillStyle};
use crate::surface::Surface;

use super::batched::BatchedSurface;

/// The windowed GPU renderer: a [`Gpu`] context plus a
/// [`BatchedSurface`] executing on [`WgpuTarget`].
///
/// Frame protocol: `begin_frame` → [`Surface`] calls → `end_frame`. Draws
/// outside a frame are ignored with a warning rather than panicking, so a
/// skipped frame (surface timeout) degrades gracefully.
pub struct GpuRenderer {
    gpu: Gpu,
    surface: BatchedSurface<WgpuTarget>,
    diag: DiagSink,
}

impl GpuRenderer {
    pub fn new(
        window: Arc<Window>,
        init: GpuInit,
        config: &BatchConfig,
        diag: DiagSink,
    ) -> Result<Self> {
        let gpu = pollster::block_on(Gpu::new(window, init))?;
        let size = gpu.size();
        let target = WgpuTarget::new(
            gpu.device().clone(),
            gpu.queue().clone(),
            gpu.surface_format(),
            size.width,
            size.height,
        );
        let surface = BatchedSurface::new(
            target,
            Viewport::new(size.width, size.height),
            config,
            diag.clone(),
        )?;
        Ok(Self { gpu, surface, diag })
    }

    pub fn window(&self) -> &Arc<Window> {
        self.gpu.window()
    }

    /// Acquires the next swapchain image. Returns `Ok(false)` when the frame
    /// should be skipped (transient surface error, or the surface was just
    /// reconfigured).
    pub fn begin_frame(&mut self) -> Result<bool> {
        match self.gpu.begin_frame() {
            Ok(frame) => {
                self.surface.target_mut().begin_frame(frame);
                Ok(true)
            }
            Err(err) => match self.gpu.handle_surface_error(err.clone()) {
                SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => Ok(false),
                SurfaceErrorAction::Fatal => {
                    anyhow::bail!("surface error is fatal: {err}")
                }
            },
        }
    }

    /// Flushes pending quads, submits the frame and presents it.
    pub fn end_frame(&mut self) {
        self.surface.flush();
        if let Some(frame) = self.surface.target_mut().take_frame() {
            self.gpu.submit(frame);
        }
        for detail in self.gpu.drain_driver_errors() {
            self.diag.report(Diagnostic::DriverError { detail });
        }
    }

    /// Window resize: reconfigures the swapchain and re-derives
    /// resolution-dependent renderer state.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize(new_size);
        self.surface
            .update_resolution(new_size.width.max(1), new_size.height.max(1));
    }
}

// The renderer IS a surface; delegation keeps the batcher private while
// letting game code draw on the renderer directly.
impl Surface for GpuRenderer {
    fn clear(&mut self, color: Color) {
        self.surface.clear(color);
    }

    fn draw_region(
        &mut self,
        image: &Bitmap,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        sx: f32,
        sy: f32,
        sw: f32,
        sh: f32,
    ) {
        self.surface.draw_region(image, x, y, w, h, sx, sy, sw, sh);
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        self.surface.fill_rect(x, y, w, h, color);
    }

    fn save(&mut self) {
        self.surface.save();
    }

    fn restore(&mut self) {
        self.surface.restore();
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.surface.scale(sx, sy);
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        self.surface.translate(tx, ty);
    }

    fn clip_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.surface.clip_rect(x, y, w, h);
    }

    fn begin_path(&mut self) {
        self.surface.begin_path();
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.surface.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.surface.line_to(x, y);
    }

    fn close_path(&mut self) {
        self.surface.close_path();
    }

    fn fill(&mut self) {
        self.surface.fill();
    }

    fn stroke(&mut self) {
        self.surface.stroke();
    }

    fn set_fill_style(&mut self, style: FillStyle) {
        self.surface.set_fill_style(style);
    }

    fn set_stroke_style(&mut self, style: FillStyle) {
        self.surface.set_stroke_style(style);
    }

    fn set_line_width(&mut self, width: f32) {
        self.surface.set_line_width(width);
    }

    fn set_font(&mut self, font: Arc<fontdue::Font>, size: f32) {
        self.surface.set_font(font, size);
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32) {
        self.surface.fill_text(text, x, y);
    }

    fn update_resolution(&mut self, width: u32, height: u32) {
        self.surface.update_resolution(width, height);
    }
}
