//! Screen-Space Fluid Settings
//!
//! Construction parameters of the fluid pass. They are read once when the
//! pass is built and are immutable for its lifetime; changing any of them
//! means building a new pass.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_ssf::{LayerMask, RenderQueueRange, SsfSettings};
//!
//! let settings = SsfSettings::default()
//!     .with_blur_iterations(4)
//!     .with_layer_mask(LayerMask::WATER)
//!     .with_render_queue_range(RenderQueueRange::OPAQUE);
//! ```
//!
//! Settings are `serde`-serializable so hosts can keep them in their own
//! configuration files.

use serde::{Deserialize, Serialize};

use crate::renderer::graph::stage::RenderPassEvent;
use crate::scene::filter::{FilteringSettings, LayerMask, RenderQueueRange};

/// Blur pyramid depth used when nothing else is configured.
pub const DEFAULT_BLUR_ITERATIONS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsfSettings {
    /// Ordering token handed to the frame scheduler.
    pub event: RenderPassEvent,
    /// Number of half-resolution blur levels. `0` disables blurring.
    pub blur_iterations: u32,
    /// Layers whose renderers contribute fluid depth.
    pub layer_mask: LayerMask,
    /// Render queues whose renderers contribute fluid depth.
    pub render_queue_range: RenderQueueRange,
}

impl Default for SsfSettings {
    fn default() -> Self {
        Self {
            event: RenderPassEvent::default(),
            blur_iterations: DEFAULT_BLUR_ITERATIONS,
            layer_mask: LayerMask::all(),
            render_queue_range: RenderQueueRange::OPAQUE,
        }
    }
}

impl SsfSettings {
    #[must_use]
    pub fn with_event(mut self, event: impl Into<RenderPassEvent>) -> Self {
        self.event = event.into();
        self
    }

    #[must_use]
    pub fn with_blur_iterations(mut self, iterations: u32) -> Self {
        self.blur_iterations = iterations;
        self
    }

    #[must_use]
    pub fn with_layer_mask(mut self, mask: LayerMask) -> Self {
        self.layer_mask = mask;
        self
    }

    #[must_use]
    pub fn with_render_queue_range(mut self, range: impl Into<RenderQueueRange>) -> Self {
        self.render_queue_range = range.into();
        self
    }

    /// Filter applied to the depth capture draw.
    #[must_use]
    pub fn filtering(&self) -> FilteringSettings {
        FilteringSettings::new(self.render_queue_range, self.layer_mask)
    }
}
