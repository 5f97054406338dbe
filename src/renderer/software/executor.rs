//! CPU command replay
//!
//! Replays a [`CommandBuffer`] against a [`SoftwareTargetPool`] with the
//! programs of a [`SoftwareMaterial`]. Used as the reference backend in tests
//! and for headless validation of the pass output.
//!
//! Blits evaluate the whole destination into a fresh texel buffer before
//! storing it, so a blit whose source and destination alias reads the
//! pre-blit contents everywhere.

use crate::errors::{Result, SsfError};
use crate::renderer::graph::command::{
    ClearFlags, CommandBuffer, ExecutionStats, RenderCommand, RenderTargetIdentifier,
};
use crate::renderer::graph::material::{ShaderPassIndex, ShaderPassLookup};
use crate::renderer::software::material::{
    BlitContext, RendererContext, SoftwareBlend, SoftwareGlobals, SoftwareMaterial,
};
use crate::renderer::software::pool::SoftwareTargetPool;
use crate::scene::camera::RenderingData;
use crate::scene::cull::RendererId;
use crate::scene::filter::ShaderTagId;

/// Replays command buffers. Global parameters persist across buffers, as
/// they do on a GPU command stream.
#[derive(Default)]
pub struct SoftwareExecutor {
    globals: SoftwareGlobals,
    sample_depth: usize,
}

impl SoftwareExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn globals(&self) -> &SoftwareGlobals {
        &self.globals
    }

    pub fn execute(
        &mut self,
        cmd: &CommandBuffer,
        pool: &mut SoftwareTargetPool,
        material: &SoftwareMaterial,
        data: &RenderingData<'_>,
    ) -> Result<ExecutionStats> {
        let mut stats = ExecutionStats::default();

        for command in cmd {
            match command {
                RenderCommand::BeginSample(name) => {
                    self.sample_depth += 1;
                    log::trace!("[{}] begin '{name}'", cmd.name());
                }
                RenderCommand::EndSample(name) => {
                    self.sample_depth = self.sample_depth.saturating_sub(1);
                    log::trace!("[{}] end '{name}'", cmd.name());
                }
                RenderCommand::ClearRenderTarget {
                    target,
                    flags,
                    color,
                } => {
                    let image = pool.resolve_mut(*target)?;
                    // Images carry no depth/stencil planes.
                    if flags.contains(ClearFlags::COLOR) {
                        image.fill(*color);
                    }
                    stats.clears += 1;
                }
                RenderCommand::DrawRenderers {
                    target,
                    shader_tag,
                    renderers,
                    ..
                } => {
                    stats.renderers_drawn +=
                        Self::draw(pool, material, data, *target, *shader_tag, renderers)?;
                    stats.draws += 1;
                }
                RenderCommand::Blit {
                    source,
                    destination,
                    pass,
                } => {
                    self.blit(pool, material, *source, *destination, *pass)?;
                    stats.blits += 1;
                }
                RenderCommand::SetGlobalMatrix { name, value } => {
                    self.globals.matrices.insert(*name, *value);
                }
                RenderCommand::SetGlobalTexture { name, target } => {
                    self.globals.textures.insert(*name, *target);
                }
            }
        }

        if self.sample_depth != 0 {
            log::warn!(
                "[{}] {} profiling scopes left open",
                cmd.name(),
                self.sample_depth
            );
            self.sample_depth = 0;
        }

        log::debug!("[{}] replayed: {stats:?}", cmd.name());
        Ok(stats)
    }

    fn blit(
        &self,
        pool: &mut SoftwareTargetPool,
        material: &SoftwareMaterial,
        source: RenderTargetIdentifier,
        destination: RenderTargetIdentifier,
        pass: ShaderPassIndex,
    ) -> Result<()> {
        let kernel = material
            .blit_kernel(pass)
            .ok_or(SsfError::ShaderPassOutOfRange(pass))?;

        let texels = {
            let src = pool.resolve(source)?;
            let dst = pool.resolve(destination)?;
            let ctx = BlitContext {
                source: src,
                globals: &self.globals,
                pool: &*pool,
            };

            let (width, height) = (dst.width(), dst.height());
            let mut texels = Vec::with_capacity((width * height) as usize);
            for y in 0..height {
                for x in 0..width {
                    texels.push(kernel(&ctx, dst.texel_center(x, y)));
                }
            }
            texels
        };

        pool.resolve_mut(destination)?.replace_texels(texels);
        Ok(())
    }

    fn draw(
        pool: &mut SoftwareTargetPool,
        material: &SoftwareMaterial,
        data: &RenderingData<'_>,
        target: RenderTargetIdentifier,
        shader_tag: ShaderTagId,
        renderers: &[RendererId],
    ) -> Result<u32> {
        let image = pool.resolve_mut(target)?;
        let Some(program) = material.renderer_program(shader_tag) else {
            log::warn!(
                "material '{}' has no renderer program for tag {:#018x}; {} renderers skipped",
                material.name(),
                shader_tag.to_u64(),
                renderers.len()
            );
            return Ok(0);
        };

        let mut drawn = 0;
        for id in renderers {
            let Some(renderer) = data.cull_results.get(*id) else {
                log::warn!("renderer {id} is not in the cull results");
                continue;
            };
            let ctx = RendererContext {
                renderer,
                camera: data.camera,
            };

            for y in 0..image.height() {
                for x in 0..image.width() {
                    let Some(value) = (program.kernel)(&ctx, image.texel_center(x, y)) else {
                        continue;
                    };
                    let value = match program.blend {
                        SoftwareBlend::Replace => value,
                        SoftwareBlend::NearestDepth => {
                            let stored = image.get(x, y);
                            if stored.x > 0.0 && stored.x <= value.x {
                                continue;
                            }
                            value
                        }
                    };
                    image.set(x, y, value);
                }
            }
            drawn += 1;
        }
        Ok(drawn)
    }
}
