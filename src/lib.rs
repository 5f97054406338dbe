//! Screen-space fluid rendering for the Myth engine.
//!
//! The fluid pass draws particles as billboard spheres into a depth target,
//! smooths that depth with a down/up blur pyramid, rebuilds view-space
//! normals from it and shades the surface onto the camera color.
//!
//! ```text
//!  SsfPass::configure ─► acquire depth, blur[0..N], normal
//!  SsfPass::execute   ─► CommandBuffer ─► GpuExecutor / SoftwareExecutor
//!  SsfPass::cleanup   ─► release everything configure acquired
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod errors;
pub mod renderer;
pub mod scene;

pub use errors::{Result, SsfError};
pub use renderer::gpu::{GpuExecutor, GpuMaterial, GpuShaderProgram, GpuTargetPool};
pub use renderer::graph::passes::{SsfPass, SsfPrograms};
pub use renderer::graph::{
    AcquireScope, CameraTargetId, ClearFlags, CommandBuffer, ExecutionStats, FrameManifest,
    RenderCommand, RenderNode, RenderPassEvent, RenderStage, RenderTargetDescriptor,
    RenderTargetFormat, RenderTargetHandle, RenderTargetIdentifier, RenderTargetPool,
    ShaderPassIndex, ShaderPassLookup, TargetFilterMode, render_camera,
};
pub use renderer::settings::SsfSettings;
pub use renderer::software::{SoftwareExecutor, SoftwareImage, SoftwareMaterial, SoftwareTargetPool};
pub use scene::{
    BillboardSphere, CameraData, CameraTargetDescriptor, ClipSpaceConvention, CullResults,
    FilteringSettings, LayerMask, RenderQueueRange, RenderingData, ShaderTagId, SortingCriteria,
    VisibleRenderer,
};
