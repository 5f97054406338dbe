//! CPU reference backend
//!
//! Replays recorded command buffers on the CPU. Slow, but deterministic and
//! available without a GPU adapter.

pub mod executor;
pub mod fluid;
pub mod image;
pub mod material;
pub mod pool;

pub use executor::SoftwareExecutor;
pub use image::SoftwareImage;
pub use material::{
    BlitContext, BlitKernel, RendererContext, RendererKernel, SoftwareBlend, SoftwareGlobals,
    SoftwareMaterial,
};
pub use pool::SoftwareTargetPool;
