//! Render pass implementations

pub mod ssf;

pub use ssf::{SsfPass, SsfPrograms};
