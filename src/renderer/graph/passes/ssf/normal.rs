//! Normal reconstruction
//!
//! Rebuilds view-space normals from the smoothed depth. The depth-normal
//! program needs the clip-to-view transform of the render target it samples,
//! published as a global before the blit.

use crate::renderer::graph::command::CommandBuffer;
use crate::renderer::graph::material::ShaderPassIndex;
use crate::renderer::graph::target::RenderTargetHandle;
use crate::scene::camera::CameraData;

/// Global matrix consumed by the depth-normal program.
pub const MATRIX_CLIP_TO_VIEW: &str = "_MatrixClipToView";

pub fn record(
    cmd: &mut CommandBuffer,
    camera: &CameraData,
    smoothed_depth: RenderTargetHandle,
    normal_target: RenderTargetHandle,
    depth_normal_pass: ShaderPassIndex,
) {
    cmd.set_global_matrix(MATRIX_CLIP_TO_VIEW, camera.clip_to_view());
    cmd.blit(smoothed_depth, normal_target, depth_normal_pass);
}
