//! CPU shader programs
//!
//! A [`SoftwareMaterial`] stands in for a compiled GPU material: named blit
//! programs evaluated per destination texel, and per-tag renderer programs
//! evaluated per texel for every drawn renderer.

use glam::{Mat4, Vec2, Vec3, Vec4};
use rustc_hash::FxHashMap;

use crate::renderer::graph::command::RenderTargetIdentifier;
use crate::renderer::graph::material::{ShaderPassIndex, ShaderPassLookup};
use crate::renderer::software::image::SoftwareImage;
use crate::renderer::software::pool::SoftwareTargetPool;
use crate::scene::camera::CameraData;
use crate::scene::cull::VisibleRenderer;
use crate::scene::filter::ShaderTagId;

/// Global shader parameters set through the command stream.
#[derive(Clone, Debug, Default)]
pub struct SoftwareGlobals {
    pub matrices: FxHashMap<&'static str, Mat4>,
    pub textures: FxHashMap<&'static str, RenderTargetIdentifier>,
}

/// Inputs visible to a blit program.
pub struct BlitContext<'a> {
    pub(crate) source: &'a SoftwareImage,
    pub(crate) globals: &'a SoftwareGlobals,
    pub(crate) pool: &'a SoftwareTargetPool,
}

impl BlitContext<'_> {
    /// Samples the blit source with its own filter.
    #[must_use]
    pub fn sample_source(&self, uv: Vec2) -> Vec4 {
        self.source.sample(uv)
    }

    /// Size of one source texel in UV units.
    #[must_use]
    pub fn source_texel_size(&self) -> Vec2 {
        self.source.texel_size()
    }

    #[must_use]
    pub fn matrix(&self, name: &str) -> Option<Mat4> {
        self.globals.matrices.get(name).copied()
    }

    /// Samples a global texture, `None` when it is unbound or not live.
    #[must_use]
    pub fn sample_global(&self, name: &str, uv: Vec2) -> Option<Vec4> {
        let target = self.globals.textures.get(name)?;
        self.pool.resolve(*target).ok().map(|image| image.sample(uv))
    }
}

/// Inputs visible to a renderer program.
pub struct RendererContext<'a> {
    pub renderer: &'a VisibleRenderer,
    pub camera: &'a CameraData,
}

impl RendererContext<'_> {
    /// View-space hit point of the camera ray through `uv` with the
    /// renderer's billboard sphere, `None` on a miss.
    ///
    /// `uv` addresses the render target (origin at the top-left texel row),
    /// which is rasterized with the render-into-texture projection.
    #[must_use]
    pub fn sphere_hit(&self, uv: Vec2) -> Option<Vec3> {
        let clip_to_view = self.camera.clip_to_view();
        let ndc = Vec2::new(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0);
        let origin = clip_to_view.project_point3(ndc.extend(0.0));
        let dir = (clip_to_view.project_point3(ndc.extend(0.5)) - origin).try_normalize()?;

        let center = self
            .camera
            .view
            .transform_point3(self.renderer.sphere.center);
        let radius = self.renderer.sphere.radius;

        // |o + t·d - c|² = r²
        let oc = origin - center;
        let b = dir.dot(oc);
        let disc = b * b - (oc.length_squared() - radius * radius);
        if disc < 0.0 {
            return None;
        }
        let t = -b - disc.sqrt();
        (t >= 0.0).then(|| origin + dir * t)
    }

    /// Positive view depth of [`sphere_hit`](Self::sphere_hit).
    #[must_use]
    pub fn sphere_depth(&self, uv: Vec2) -> Option<f32> {
        self.sphere_hit(uv).map(|p| -p.z)
    }
}

/// How a renderer program's output combines with the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SoftwareBlend {
    #[default]
    Replace,
    /// Keeps the nearer of the stored and incoming `x` depth. Zero is the
    /// cleared background and always loses.
    NearestDepth,
}

pub type BlitKernel = Box<dyn Fn(&BlitContext<'_>, Vec2) -> Vec4 + Send + Sync>;
/// Returns `None` to discard the texel.
pub type RendererKernel = Box<dyn Fn(&RendererContext<'_>, Vec2) -> Option<Vec4> + Send + Sync>;

pub(crate) struct RendererProgram {
    pub(crate) blend: SoftwareBlend,
    pub(crate) kernel: RendererKernel,
}

pub struct SoftwareMaterial {
    name: String,
    passes: Vec<(String, BlitKernel)>,
    renderer_programs: FxHashMap<ShaderTagId, RendererProgram>,
}

impl SoftwareMaterial {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passes: Vec::new(),
            renderer_programs: FxHashMap::default(),
        }
    }

    /// Appends a named blit program.
    #[must_use]
    pub fn with_pass<F>(mut self, name: impl Into<String>, kernel: F) -> Self
    where
        F: Fn(&BlitContext<'_>, Vec2) -> Vec4 + Send + Sync + 'static,
    {
        self.passes.push((name.into(), Box::new(kernel)));
        self
    }

    /// Registers the program used by `DrawRenderers` for `tag`.
    #[must_use]
    pub fn with_renderer_program<F>(mut self, tag: &str, blend: SoftwareBlend, kernel: F) -> Self
    where
        F: Fn(&RendererContext<'_>, Vec2) -> Option<Vec4> + Send + Sync + 'static,
    {
        self.renderer_programs.insert(
            ShaderTagId::new(tag),
            RendererProgram {
                blend,
                kernel: Box::new(kernel),
            },
        );
        self
    }

    pub(crate) fn blit_kernel(&self, pass: ShaderPassIndex) -> Option<&BlitKernel> {
        self.passes.get(pass.index()).map(|(_, kernel)| kernel)
    }

    pub(crate) fn renderer_program(&self, tag: ShaderTagId) -> Option<&RendererProgram> {
        self.renderer_programs.get(&tag)
    }
}

impl ShaderPassLookup for SoftwareMaterial {
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
