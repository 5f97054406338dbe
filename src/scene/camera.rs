//! Per-frame camera data
//!
//! The camera is owned by the host. The pass only borrows what it needs for
//! one call: the target resolution (configure) and the view/projection
//! matrices plus sorting preference (execute).
//!
//! Projection matrices are expected in the GL convention (clip-space depth in
//! `-1..1`, e.g. [`Mat4::perspective_rh_gl`]). [`gpu_projection_matrix`]
//! converts them to whatever the device expects.

use glam::{Mat4, Vec4};

use crate::scene::cull::CullResults;
use crate::scene::filter::SortingCriteria;

/// Resolution of the camera's color target for this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct CameraTargetDescriptor {
    pub width: u32,
    pub height: u32,
}

impl CameraTargetDescriptor {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Clip-space depth range of a graphics API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DepthRange {
    /// OpenGL: `-1..1`.
    NegativeOneToOne,
    /// D3D / Metal / Vulkan / WebGPU: `0..1`.
    ZeroToOne,
}

/// Clip-space and texture-space conventions of the executing device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClipSpaceConvention {
    pub depth_range: DepthRange,
    /// Near plane maps to depth 1 and far plane to depth 0.
    pub reversed_z: bool,
    /// Texture V coordinate 0 is the top row of a render target.
    pub uv_starts_at_top: bool,
}

impl ClipSpaceConvention {
    /// OpenGL: `-1..1` depth, bottom-left texture origin.
    pub const OPENGL: Self = Self {
        depth_range: DepthRange::NegativeOneToOne,
        reversed_z: false,
        uv_starts_at_top: false,
    };

    /// WebGPU (wgpu): `0..1` depth, top-left texture origin.
    pub const WGPU: Self = Self {
        depth_range: DepthRange::ZeroToOne,
        reversed_z: false,
        uv_starts_at_top: true,
    };
}

impl Default for ClipSpaceConvention {
    fn default() -> Self {
        Self::WGPU
    }
}

/// Converts a GL-convention projection matrix into the matrix the device
/// actually consumes.
///
/// - Depth is remapped from `-1..1` to `0..1` when the device uses that range.
/// - With `reversed_z`, depth is then mirrored (`z' = w - z`).
/// - With `render_into_texture` on a device whose texture origin is the
///   bottom row, clip-space Y is flipped. Render-target programs address
///   texels top-down (`ndc.y = 1 - 2v`), so rows of a target then line up
///   with the host's camera image. Top-origin devices (wgpu) need no flip.
#[must_use]
pub fn gpu_projection_matrix(
    projection: Mat4,
    render_into_texture: bool,
    convention: ClipSpaceConvention,
) -> Mat4 {
    let mut adjust = Mat4::IDENTITY;

    if convention.depth_range == DepthRange::ZeroToOne {
        // z' = 0.5 z + 0.5 w
        adjust = Mat4::from_cols(
            Vec4::X,
            Vec4::Y,
            Vec4::new(0.0, 0.0, 0.5, 0.0),
            Vec4::new(0.0, 0.0, 0.5, 1.0),
        );
    }

    if convention.reversed_z {
        let (z_scale, w_bias) = match convention.depth_range {
            // z' = w - z  over 0..1
            DepthRange::ZeroToOne => (-1.0, 1.0),
            // z' = -z  over -1..1
            DepthRange::NegativeOneToOne => (-1.0, 0.0),
        };
        let reverse = Mat4::from_cols(
            Vec4::X,
            Vec4::Y,
            Vec4::new(0.0, 0.0, z_scale, 0.0),
            Vec4::new(0.0, 0.0, w_bias, 1.0),
        );
        adjust = reverse * adjust;
    }

    if render_into_texture && !convention.uv_starts_at_top {
        adjust = Mat4::from_diagonal(Vec4::new(1.0, -1.0, 1.0, 1.0)) * adjust;
    }

    adjust * projection
}

/// Inverse of the device projection: maps clip-space positions of a render
/// target back into view space.
#[must_use]
pub fn clip_to_view_matrix(projection: Mat4, convention: ClipSpaceConvention) -> Mat4 {
    gpu_projection_matrix(projection, true, convention).inverse()
}

/// Camera state for one frame, borrowed from the host.
#[derive(Clone, Debug)]
pub struct CameraData {
    pub target: CameraTargetDescriptor,
    pub view: Mat4,
    /// GL-convention projection.
    pub projection: Mat4,
    /// Sorting the host would use for opaque geometry on this camera.
    pub default_opaque_sorting: SortingCriteria,
    pub clip_space: ClipSpaceConvention,
}

impl CameraData {
    #[must_use]
    pub fn new(target: CameraTargetDescriptor, view: Mat4, projection: Mat4) -> Self {
        Self {
            target,
            view,
            projection,
            default_opaque_sorting: SortingCriteria::CommonOpaque,
            clip_space: ClipSpaceConvention::default(),
        }
    }

    /// Clip-to-view transform for sampling render targets of this camera.
    #[inline]
    #[must_use]
    pub fn clip_to_view(&self) -> Mat4 {
        clip_to_view_matrix(self.projection, self.clip_space)
    }
}

/// Everything `execute` reads from the host for one camera.
#[derive(Clone, Copy, Debug)]
pub struct RenderingData<'a> {
    pub camera: &'a CameraData,
    pub cull_results: &'a CullResults,
}

impl<'a> RenderingData<'a> {
    #[must_use]
    pub const fn new(camera: &'a CameraData, cull_results: &'a CullResults) -> Self {
        Self {
            camera,
            cull_results,
        }
    }
}
