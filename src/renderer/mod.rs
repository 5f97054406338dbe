//! Fluid renderer
//!
//! - [`graph`]: pass lifecycle, recorded commands, frame-scoped targets and
//!   the screen-space fluid pass itself
//! - [`gpu`]: wgpu backend replaying recorded commands
//! - [`software`]: CPU reference backend
//! - [`settings`]: construction parameters of the fluid pass

pub mod gpu;
pub mod graph;
pub mod settings;
pub mod software;

pub use settings::{DEFAULT_BLUR_ITERATIONS, SsfSettings};
