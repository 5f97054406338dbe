//! Render Node Trait
//!
//! The contract between an injected pass and the external frame scheduler.
//! For every camera and frame the scheduler calls, in order:
//!
//! 1. [`configure`](RenderNode::configure): acquire per-frame targets sized
//!    from the camera.
//! 2. [`execute`](RenderNode::execute): record commands. Read-only on the
//!    node; everything mutable was settled in `configure`.
//! 3. [`cleanup`](RenderNode::cleanup): release what `configure` acquired.
//!
//! [`render_camera`] runs the three steps and guarantees that cleanup happens
//! even when execute fails.

use crate::errors::Result;
use crate::renderer::graph::command::CommandBuffer;
use crate::renderer::graph::stage::RenderPassEvent;
use crate::renderer::graph::transient::RenderTargetPool;
use crate::scene::camera::{CameraTargetDescriptor, RenderingData};

pub trait RenderNode {
    /// Node name, used for debug groups and logs.
    fn name(&self) -> &str;

    /// Where the scheduler should inject this node.
    fn event(&self) -> RenderPassEvent;

    /// Acquires and prepares per-frame targets.
    fn configure(
        &mut self,
        pool: &mut dyn RenderTargetPool,
        camera_target: &CameraTargetDescriptor,
    ) -> Result<()>;

    /// Records GPU work into `cmd`.
    fn execute(&self, cmd: &mut CommandBuffer, data: &RenderingData<'_>) -> Result<()>;

    /// Releases everything `configure` acquired.
    fn cleanup(&mut self, pool: &mut dyn RenderTargetPool);
}

/// Configure → execute → cleanup for one camera.
///
/// Cleanup runs on every path once configure succeeded. A configure failure
/// leaves nothing acquired, so nothing needs releasing.
pub fn render_camera<N: RenderNode + ?Sized>(
    node: &mut N,
    pool: &mut dyn RenderTargetPool,
    cmd: &mut CommandBuffer,
    data: &RenderingData<'_>,
) -> Result<()> {
    node.configure(pool, &data.camera.target)?;
    let executed = node.execute(cmd, data);
    node.cleanup(pool);
    if let Err(err) = &executed {
        log::warn!("{}: execute failed: {err}", node.name());
    }
    executed
}
