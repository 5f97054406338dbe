//! Render pass organisation
//!
//! Provides:
//! - [`RenderNode`]: the lifecycle contract driven by the frame scheduler
//! - [`RenderStage`] / [`RenderPassEvent`]: injection ordering tokens
//! - [`CommandBuffer`]: recorded command stream replayed by backends
//! - [`RenderTargetPool`], [`AcquireScope`], [`FrameManifest`]: frame-scoped targets
//! - [`ShaderPassLookup`]: construction-time sub-program resolution
//! - [`passes`]: concrete passes

pub mod command;
pub mod material;
pub mod node;
pub mod passes;
pub mod stage;
pub mod target;
pub mod transient;

pub use command::{
    BlitRecord, CameraTargetId, ClearFlags, CommandBuffer, ExecutionStats, RenderCommand,
    RenderTargetIdentifier,
};
pub use material::{PassNames, ShaderPassIndex, ShaderPassLookup};
pub use node::{RenderNode, render_camera};
pub use stage::{RenderPassEvent, RenderStage};
pub use target::{
    NamedTarget, RenderTargetDescriptor, RenderTargetFormat, RenderTargetHandle, TargetFilterMode,
};
pub use transient::{AcquireScope, FrameManifest, RenderTargetPool};
