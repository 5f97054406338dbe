//! Reference fluid material
//!
//! CPU versions of the fluid programs shipped with the wgpu backend
//! (`ssf_fluid.wgsl`, `ssf_sphere_depth.wgsl`). Both backends share the same
//! filter footprints and shading constants, so the CPU output is the
//! expected image for a given command stream.

use glam::{Mat4, Vec2, Vec3, Vec4, Vec4Swizzles};

use crate::renderer::graph::passes::ssf::{
    DEPTH_NORMAL_PASS, DEPTH_NORMAL_TEXTURE, DEPTH_SHADER_TAG, DOWN_SAMPLING_PASS, LIT_PASS,
    MATRIX_CLIP_TO_VIEW, UP_SAMPLING_PASS,
};
use crate::renderer::software::material::{BlitContext, SoftwareBlend, SoftwareMaterial};

pub const FLUID_COLOR: Vec3 = Vec3::new(0.16, 0.45, 0.85);
pub const FLUID_OPACITY: f32 = 0.8;
pub const SPECULAR_POWER: f32 = 64.0;
pub const FRESNEL_STRENGTH: f32 = 0.2;

/// View-space direction towards the light.
#[must_use]
pub fn light_direction() -> Vec3 {
    Vec3::new(0.3, 0.6, 0.75).normalize()
}

impl SoftwareMaterial {
    /// The four fluid blit programs plus the sphere depth renderer program.
    #[must_use]
    pub fn fluid() -> Self {
        Self::new("SsfFluid")
            .with_pass(DOWN_SAMPLING_PASS, down_sample)
            .with_pass(UP_SAMPLING_PASS, up_sample)
            .with_pass(DEPTH_NORMAL_PASS, depth_normal)
            .with_pass(LIT_PASS, lit)
            .with_renderer_program(DEPTH_SHADER_TAG, SoftwareBlend::NearestDepth, |ctx, uv| {
                ctx.sphere_depth(uv).map(|d| Vec4::new(d, 0.0, 0.0, 1.0))
            })
    }
}

/// 4 bilinear taps one source texel out on the diagonals.
pub fn down_sample(ctx: &BlitContext<'_>, uv: Vec2) -> Vec4 {
    let o = ctx.source_texel_size();
    let sum = ctx.sample_source(uv + Vec2::new(-o.x, -o.y))
        + ctx.sample_source(uv + Vec2::new(o.x, -o.y))
        + ctx.sample_source(uv + Vec2::new(-o.x, o.y))
        + ctx.sample_source(uv + Vec2::new(o.x, o.y));
    sum * 0.25
}

/// 3×3 tent over the coarser source.
pub fn up_sample(ctx: &BlitContext<'_>, uv: Vec2) -> Vec4 {
    let o = ctx.source_texel_size();
    let mut sum = Vec4::ZERO;
    for (dy, wy) in [(-1.0, 1.0), (0.0, 2.0), (1.0, 1.0)] {
        for (dx, wx) in [(-1.0, 1.0), (0.0, 2.0), (1.0, 1.0)] {
            sum += ctx.sample_source(uv + Vec2::new(dx * o.x, dy * o.y)) * (wx * wy);
        }
    }
    sum / 16.0
}

/// View-space position of the texel at `uv` holding linear `depth`.
#[must_use]
pub fn view_position(clip_to_view: Mat4, uv: Vec2, depth: f32) -> Vec3 {
    let ndc = Vec2::new(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0);
    let a = clip_to_view.project_point3(ndc.extend(0.0));
    let b = clip_to_view.project_point3(ndc.extend(0.5));
    let span = a.z - b.z;
    if span.abs() <= f32::EPSILON {
        return a;
    }
    a + (b - a) * ((depth + a.z) / span)
}

/// Packs the reconstructed view normal into rgb and coverage into a.
pub fn depth_normal(ctx: &BlitContext<'_>, uv: Vec2) -> Vec4 {
    let depth = ctx.sample_source(uv).x;
    if depth <= 0.0 {
        return Vec4::ZERO;
    }
    let clip_to_view = ctx.matrix(MATRIX_CLIP_TO_VIEW).unwrap_or(Mat4::IDENTITY);
    let t = ctx.source_texel_size();
    let center = view_position(clip_to_view, uv, depth);

    // One-sided difference towards the neighbor closest in depth.
    let derivative = |step: Vec2| {
        let mut best: Option<Vec3> = None;
        for sign in [1.0, -1.0] {
            let n_uv = uv + step * sign;
            let n_depth = ctx.sample_source(n_uv).x;
            if n_depth <= 0.0 {
                continue;
            }
            let delta = (view_position(clip_to_view, n_uv, n_depth) - center) * sign;
            if best.is_none_or(|b| delta.z.abs() < b.z.abs()) {
                best = Some(delta);
            }
        }
        best
    };

    let normal = match (derivative(Vec2::new(t.x, 0.0)), derivative(Vec2::new(0.0, t.y))) {
        (Some(dx), Some(dy)) => dx.cross(dy).try_normalize().unwrap_or(Vec3::Z),
        _ => Vec3::Z,
    };
    let normal = if normal.z < 0.0 { -normal } else { normal };

    (normal * 0.5 + Vec3::splat(0.5)).extend(1.0)
}

/// Shades covered texels and blends them over the camera color.
pub fn lit(ctx: &BlitContext<'_>, uv: Vec2) -> Vec4 {
    let base = ctx.sample_source(uv);
    let packed = ctx
        .sample_global(DEPTH_NORMAL_TEXTURE, uv)
        .unwrap_or(Vec4::ZERO);
    if packed.w < 0.5 {
        return base;
    }

    let n = (packed.xyz() * 2.0 - Vec3::ONE).normalize_or(Vec3::Z);
    let l = light_direction();
    let v = Vec3::Z;
    let h = (l + v).normalize();

    let diffuse = n.dot(l).max(0.0);
    let specular = n.dot(h).max(0.0).powf(SPECULAR_POWER);
    let fresnel = (1.0 - n.dot(v).clamp(0.0, 1.0)).powi(5);

    let surface = FLUID_COLOR * (0.25 + 0.75 * diffuse);
    let rgb = base.xyz().lerp(surface, FLUID_OPACITY)
        + Vec3::splat(specular + FRESNEL_STRENGTH * fresnel);
    rgb.extend(base.w)
}
