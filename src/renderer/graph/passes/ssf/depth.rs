//! Depth capture
//!
//! Draws the billboard spheres selected by the pass filter into the
//! single-channel depth target with their depth-only sub-program. The target
//! is cleared to black first, so an empty selection leaves the sentinel value
//! everywhere.

use glam::Vec4;

use crate::renderer::graph::command::{ClearFlags, CommandBuffer};
use crate::renderer::graph::target::RenderTargetHandle;
use crate::scene::camera::RenderingData;
use crate::scene::filter::{DrawingSettings, FilteringSettings, PerObjectData, ShaderTagId};

/// Tag of the per-renderer sub-program that writes sphere depth.
pub const DEPTH_SHADER_TAG: &str = "SsfBillboardSphereDepth";

/// Value the depth target holds where no sphere was drawn.
pub const DEPTH_CLEAR_COLOR: Vec4 = Vec4::ZERO;

pub struct DepthCapture {
    shader_tag: ShaderTagId,
    filtering: FilteringSettings,
}

impl DepthCapture {
    #[must_use]
    pub fn new(filtering: FilteringSettings) -> Self {
        Self {
            shader_tag: ShaderTagId::new(DEPTH_SHADER_TAG),
            filtering,
        }
    }

    #[must_use]
    pub fn filtering(&self) -> &FilteringSettings {
        &self.filtering
    }

    #[must_use]
    pub fn shader_tag(&self) -> ShaderTagId {
        self.shader_tag
    }

    /// Clears `target` and draws every matching renderer into it.
    /// Returns the number of renderers drawn.
    pub fn record(
        &self,
        cmd: &mut CommandBuffer,
        target: RenderTargetHandle,
        data: &RenderingData<'_>,
    ) -> usize {
        cmd.clear_render_target(target, ClearFlags::ALL, DEPTH_CLEAR_COLOR);

        // Depth only: no lights, probes or lightmaps.
        let mut drawing =
            DrawingSettings::new(self.shader_tag, data.camera.default_opaque_sorting);
        drawing.per_object_data = PerObjectData::empty();

        let renderers = data
            .cull_results
            .draw_list(&drawing, &self.filtering, &data.camera.view);
        let count = renderers.len();
        cmd.draw_renderers(target, drawing.shader_tag, drawing.per_object_data, renderers);
        count
    }
}
