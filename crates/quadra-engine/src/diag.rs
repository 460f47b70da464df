//! Structured renderer diagnostics.
//!
//! Per-frame defects (bad geometry, driver errors, missing resources) never
//! interrupt an interactive game loop; they are reported through a sink the
//! host injects at construction. The default sink forwards to the `log`
//! facade; tests capture events instead of scraping log output.

use std::cell::RefCell;
use std::rc::Rc;

/// A renderer defect report.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A draw received a non-finite coordinate and was skipped.
    NonFiniteGeometry { op: &'static str },
    /// The graphics layer reported an error after a flush.
    DriverError { detail: String },
    /// `fill_text` was called with no font registered.
    MissingFont,
    /// `clip_rect` under a rotated transform clips to the bounding box.
    /// Reported once per surface.
    RotatedClip,
    /// A resolution change could not be applied; the surface keeps its
    /// previous size.
    SurfaceResizeFailed { detail: String },
}

/// Sink for renderer diagnostics.
pub trait Diagnostics {
    fn report(&self, diagnostic: Diagnostic);
}

/// Shared diagnostics handle. The renderer is single-threaded by contract, so
/// plain `Rc` sharing between a surface and its collaborators is sufficient.
pub type DiagSink = Rc<dyn Diagnostics>;

/// Default sink: forwards to the `log` facade.
#[derive(Debug, Default)]
pub struct LogDiagnostics;

impl LogDiagnostics {
    pub fn sink() -> DiagSink {
        Rc::new(LogDiagnostics)
    }
}

impl Diagnostics for LogDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::NonFiniteGeometry { op } => {
                log::warn!("skipped {op}: non-finite coordinates");
            }
            Diagnostic::DriverError { detail } => {
                log::error!("graphics driver error: {detail}");
            }
            Diagnostic::MissingFont => {
                log::warn!("fill_text called with no font set; text dropped");
            }
            Diagnostic::RotatedClip => {
                log::warn!("clip_rect under a rotated transform clips to the bounding box");
            }
            Diagnostic::SurfaceResizeFailed { detail } => {
                log::error!("surface resize failed: {detail}");
            }
        }
    }
}

/// Capturing sink for tests: records every event for later assertion.
#[derive(Debug, Default)]
pub struct CapturingDiagnostics {
    events: RefCell<Vec<Diagnostic>>,
}

impl CapturingDiagnostics {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Diagnostic> {
        self.events.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl Diagnostics for CapturingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        self.events.borrow_mut().push(diagnostic);
    }
}
