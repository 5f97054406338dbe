//! wgpu backend
//!
//! - [`GpuTargetPool`]: transient textures behind [`RenderTargetPool`](crate::renderer::graph::RenderTargetPool)
//! - [`GpuMaterial`]: WGSL programs addressed by sub-program name or shader tag
//! - [`GpuExecutor`]: replays a command stream into a `wgpu::CommandEncoder`

pub mod executor;
pub mod material;
pub mod tracked;
pub mod transient_pool;

pub use executor::GpuExecutor;
pub use material::{GpuMaterial, GpuShaderProgram};
pub use tracked::Tracked;
pub use transient_pool::{GpuTargetPool, TargetTexture};
