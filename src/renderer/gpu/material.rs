//! GPU fluid material
//!
//! Named fullscreen programs for `Blit` and per-tag renderer programs for
//! `DrawRenderers`. Indices returned by [`ShaderPassLookup::find_pass`] are
//! positions in the blit program list.
//!
//! Blit programs share one bind group layout (see `GpuExecutor`):
//!
//! | Binding | Resource                                  |
//! |---------|-------------------------------------------|
//! | 0       | source texture                            |
//! | 1       | source sampler (point or bilinear)        |
//! | 2       | `SsfGlobals` uniform (dynamic offset)     |
//! | 3       | `_SsfDepthNormalTexture`                  |
//! | 4       | its sampler                               |
//!
//! Renderer programs get a camera uniform at binding 0 and one instance of
//! `vec4(center.xyz, radius)` per sphere at vertex location 0.

use std::borrow::Cow;

use rustc_hash::FxHashMap;

use crate::renderer::graph::material::{ShaderPassIndex, ShaderPassLookup};
use crate::renderer::graph::passes::ssf::{
    DEPTH_NORMAL_PASS, DEPTH_SHADER_TAG, DOWN_SAMPLING_PASS, LIT_PASS, UP_SAMPLING_PASS,
};
use crate::scene::filter::ShaderTagId;

/// A WGSL program: module, entry points and output blending.
///
/// Blending is off unless set with [`with_blend`](Self::with_blend); the
/// single-channel float targets are not blendable on most devices.
#[derive(Clone, Debug)]
pub struct GpuShaderProgram {
    pub label: String,
    pub module: wgpu::ShaderModule,
    pub vertex_entry: &'static str,
    pub fragment_entry: &'static str,
    pub blend: Option<wgpu::BlendState>,
}

impl GpuShaderProgram {
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        module: &wgpu::ShaderModule,
        vertex_entry: &'static str,
        fragment_entry: &'static str,
    ) -> Self {
        Self {
            label: label.into(),
            module: module.clone(),
            vertex_entry,
            fragment_entry,
            blend: None,
        }
    }

    #[must_use]
    pub fn with_blend(mut self, blend: Option<wgpu::BlendState>) -> Self {
        self.blend = blend;
        self
    }
}

pub struct GpuMaterial {
    name: String,
    passes: Vec<(String, GpuShaderProgram)>,
    renderer_programs: FxHashMap<ShaderTagId, GpuShaderProgram>,
}

impl GpuMaterial {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passes: Vec::new(),
            renderer_programs: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn with_pass(mut self, name: impl Into<String>, program: GpuShaderProgram) -> Self {
        self.passes.push((name.into(), program));
        self
    }

    #[must_use]
    pub fn with_renderer_program(mut self, tag: &str, program: GpuShaderProgram) -> Self {
        self.renderer_programs.insert(ShaderTagId::new(tag), program);
        self
    }

    /// The built-in fluid material (`ssf_fluid.wgsl` + `ssf_sphere_depth.wgsl`).
    #[must_use]
    pub fn fluid(device: &wgpu::Device) -> Self {
        let fluid = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("SSF Fluid Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!(
                "shaders/ssf_fluid.wgsl"
            ))),
        });
        let sphere = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("SSF Sphere Depth Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!(
                "shaders/ssf_sphere_depth.wgsl"
            ))),
        });

        let blit = |label: &str, entry| GpuShaderProgram::new(label, &fluid, "vs_main", entry);

        Self::new("SsfFluid")
            .with_pass(
                DOWN_SAMPLING_PASS,
                blit("SSF DownSampling", "fs_down_sampling"),
            )
            .with_pass(UP_SAMPLING_PASS, blit("SSF UpSampling", "fs_up_sampling"))
            .with_pass(DEPTH_NORMAL_PASS, blit("SSF DepthNormal", "fs_depth_normal"))
            .with_pass(LIT_PASS, blit("SSF Lit", "fs_lit"))
            .with_renderer_program(
                DEPTH_SHADER_TAG,
                GpuShaderProgram::new("SSF Sphere Depth", &sphere, "vs_main", "fs_main"),
            )
    }

    #[must_use]
    pub fn pass(&self, index: ShaderPassIndex) -> Option<&GpuShaderProgram> {
        self.passes.get(index.index()).map(|(_, p)| p)
    }

    #[must_use]
    pub fn renderer_program(&self, tag: ShaderTagId) -> Option<&GpuShaderProgram> {
        self.renderer_programs.get(&tag)
    }
}

impl ShaderPassLookup for GpuMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn find_pass(&self, pass_name: &str) -> Option<ShaderPassIndex> {
        self.passes
            .iter()
            .position(|(name, _)| name == pass_name)
            .map(|i| ShaderPassIndex(i as u32))
    }
}
