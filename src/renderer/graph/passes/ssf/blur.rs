//! Blur pyramid
//!
//! Approximates a wide blur of the fluid depth by walking down a chain of
//! half-resolution targets and back up again.
//!
//! ```text
//!  N = 3, depth 512²
//!
//!  depth ─down─► blur[0] 256² ─down─► blur[1] 128² ─down─► blur[2] 64²
//!                   ▲                    ▲                    │
//!                   └──────up─────── blur[1] ◄──────up────────┘
//!
//!  smoothed depth = blur[0]
//! ```
//!
//! Levels are an arena of `N` targets addressed by index. The up phase starts
//! at `N - 2`: `blur[N - 1]` already holds the coarsest result and is only
//! ever a source, so no step reads and writes the same target.

use crate::errors::Result;
use crate::renderer::graph::command::CommandBuffer;
use crate::renderer::graph::material::ShaderPassIndex;
use crate::renderer::graph::target::{
    NamedTarget, RenderTargetDescriptor, RenderTargetHandle, TargetFilterMode,
};
use crate::renderer::graph::transient::{AcquireScope, RenderTargetPool};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlurPhase {
    DownSample,
    UpSample,
}

/// One blit of the pyramid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlurStep {
    pub phase: BlurPhase,
    pub source: RenderTargetHandle,
    pub destination: RenderTargetHandle,
}

/// The ordered blits of one pyramid run and the target holding the result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlurPlan {
    pub steps: Vec<BlurStep>,
    pub output: RenderTargetHandle,
}

impl BlurPlan {
    pub fn phase(&self, phase: BlurPhase) -> impl Iterator<Item = &BlurStep> {
        self.steps.iter().filter(move |s| s.phase == phase)
    }
}

pub struct BlurPyramid {
    levels: Vec<NamedTarget>,
}

impl BlurPyramid {
    /// Builds the level names `_BlurTemp0 .. _BlurTemp{N-1}`.
    #[must_use]
    pub fn new(iterations: u32) -> Self {
        Self {
            levels: (0..iterations)
                .map(|i| NamedTarget::new(format!("_BlurTemp{i}")))
                .collect(),
        }
    }

    #[inline]
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.levels.len()
    }

    #[must_use]
    pub fn levels(&self) -> &[NamedTarget] {
        &self.levels
    }

    /// Descriptor of every level: each halves its predecessor (floor),
    /// starting from `base`, and samples bilinearly.
    #[must_use]
    pub fn level_descriptors(&self, base: &RenderTargetDescriptor) -> Vec<RenderTargetDescriptor> {
        let mut descs = Vec::with_capacity(self.levels.len());
        let mut current = *base;
        for _ in &self.levels {
            current = current.halved(TargetFilterMode::Bilinear);
            descs.push(current);
        }
        descs
    }

    /// Acquires every level, sized from `base`.
    pub fn acquire<P: RenderTargetPool + ?Sized>(
        &self,
        scope: &mut AcquireScope<'_, P>,
        base: &RenderTargetDescriptor,
    ) -> Result<Vec<RenderTargetDescriptor>> {
        let descs = self.level_descriptors(base);
        for (level, desc) in self.levels.iter().zip(&descs) {
            scope.acquire(level, desc)?;
        }
        Ok(descs)
    }

    /// The blit sequence for a pyramid fed from `source`.
    ///
    /// - `N == 0`: no steps, the output is `source`.
    /// - `N == 1`: one down-sample, the output is `blur[0]`.
    /// - `N >= 2`: `N` down-samples then `N - 1` up-samples, output `blur[0]`.
    #[must_use]
    pub fn plan(&self, source: RenderTargetHandle) -> BlurPlan {
        let n = self.levels.len();
        let mut steps = Vec::with_capacity((2 * n).saturating_sub(1));
        let mut current = source;

        // 0 -> 1 -> 2
        for level in &self.levels {
            let destination = level.handle();
            steps.push(BlurStep {
                phase: BlurPhase::DownSample,
                source: current,
                destination,
            });
            current = destination;
        }

        // 2 -> 1 -> 0, skipping the coarsest level as a destination
        for i in (0..n.saturating_sub(1)).rev() {
            let destination = self.levels[i].handle();
            steps.push(BlurStep {
                phase: BlurPhase::UpSample,
                source: current,
                destination,
            });
            current = destination;
        }

        BlurPlan {
            steps,
            output: current,
        }
    }

    /// Records the pyramid and returns the handle holding the smoothed depth.
    pub fn record(
        &self,
        cmd: &mut CommandBuffer,
        source: RenderTargetHandle,
        down_sampling: ShaderPassIndex,
        up_sampling: ShaderPassIndex,
    ) -> RenderTargetHandle {
        let plan = self.plan(source);
        for step in &plan.steps {
            debug_assert_ne!(step.source, step.destination);
            let pass = match step.phase {
                BlurPhase::DownSample => down_sampling,
                BlurPhase::UpSample => up_sampling,
            };
            cmd.blit(step.source, step.destination, pass);
        }
        plan.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::graph::target::RenderTargetFormat;

    fn depth_handle() -> RenderTargetHandle {
        RenderTargetHandle::from_name("_SsfDepthTexture")
    }

    #[test]
    fn three_levels_walk_down_then_up() {
        let pyramid = BlurPyramid::new(3);
        let blur: Vec<_> = pyramid.levels().iter().map(NamedTarget::handle).collect();
        let plan = pyramid.plan(depth_handle());

        let expected = [
            (BlurPhase::DownSample, depth_handle(), blur[0]),
            (BlurPhase::DownSample, blur[0], blur[1]),
            (BlurPhase::DownSample, blur[1], blur[2]),
            (BlurPhase::UpSample, blur[2], blur[1]),
            (BlurPhase::UpSample, blur[1], blur[0]),
        ];
        let actual: Vec<_> = plan
            .steps
            .iter()
            .map(|s| (s.phase, s.source, s.destination))
            .collect();
        assert_eq!(actual, expected);
        assert_eq!(plan.output, blur[0]);
    }

    #[test]
    fn empty_pyramid_passes_source_through() {
        let plan = BlurPyramid::new(0).plan(depth_handle());
        assert!(plan.steps.is_empty());
        assert_eq!(plan.output, depth_handle());
    }

    #[test]
    fn level_descriptors_halve_from_base() {
        let base = RenderTargetDescriptor::new(
            512,
            300,
            RenderTargetFormat::SingleChannelFloat,
            TargetFilterMode::Nearest,
        );
        let descs = BlurPyramid::new(3).level_descriptors(&base);
        let sizes: Vec<_> = descs.iter().map(|d| (d.width, d.height)).collect();
        assert_eq!(sizes, [(256, 150), (128, 75), (64, 37)]);
        assert!(descs.iter().all(|d| d.filter == TargetFilterMode::Bilinear));
    }
}
