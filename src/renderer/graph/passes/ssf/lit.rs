//! Lit composite
//!
//! Blends the lit fluid surface onto the camera color buffer. The blit reads
//! and writes the same camera target; the lit program samples its source as
//! if it were separate memory. Backends that cannot sample a texture they
//! render into (wgpu among them) snapshot the source first.

use crate::renderer::graph::command::{CameraTargetId, CommandBuffer};
use crate::renderer::graph::material::ShaderPassIndex;
use crate::renderer::graph::target::RenderTargetHandle;

/// Global texture holding view-space normals (rgb) and fluid coverage (a).
pub const DEPTH_NORMAL_TEXTURE: &str = "_SsfDepthNormalTexture";

pub fn record(
    cmd: &mut CommandBuffer,
    normal_target: RenderTargetHandle,
    color_target: CameraTargetId,
    lit_pass: ShaderPassIndex,
) {
    cmd.set_global_texture(DEPTH_NORMAL_TEXTURE, normal_target);
    cmd.blit(color_target, color_target, lit_pass);
}
