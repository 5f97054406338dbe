//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`SsfError`] covers three families of failure:
//! - Configuration errors raised while constructing a pass (missing shader
//!   sub-programs). These are fatal: a pass with a missing stage would break
//!   the data dependencies of the whole pipeline.
//! - Resource errors surfaced by a render target pool (allocation failure).
//!   The pass never retries; it propagates them to the frame scheduler.
//! - Lifecycle and backend errors (executing before setup/configure, a command
//!   stream that references resources the backend does not know).
//!
//! Degenerate inputs (zero blur iterations, no matching renderers, a
//! zero-area viewport) are not errors.
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, SsfError>`.

use thiserror::Error;

use crate::renderer::graph::command::CameraTargetId;
use crate::renderer::graph::material::ShaderPassIndex;
use crate::renderer::graph::target::RenderTargetHandle;

/// The main error type for the screen-space fluid pass and its backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SsfError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A named shader sub-program could not be resolved in a material.
    #[error("Shader pass '{pass}' not found in material '{material}'")]
    MissingShaderPass {
        /// Name of the material that was searched
        material: String,
        /// Name of the sub-program that is missing
        pass: &'static str,
    },

    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// The render target pool failed to provide a buffer.
    #[error("Failed to allocate render target '{name}': {reason}")]
    TargetAllocation {
        /// Logical name of the target
        name: String,
        /// Pool-specific failure description
        reason: String,
    },

    /// A command referenced a render target that is not live in the pool.
    #[error("Render target {0:?} is not allocated in this frame")]
    UnknownRenderTarget(RenderTargetHandle),

    /// A command referenced a camera color target the backend was not given.
    #[error("Camera target {0:?} was not provided to the backend")]
    UnknownCameraTarget(CameraTargetId),

    /// A command referenced a shader pass index the material does not have.
    #[error("Shader pass index {0:?} is out of range")]
    ShaderPassOutOfRange(ShaderPassIndex),

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// `execute` was called before `setup` provided a color target.
    #[error("No camera color target bound; call setup() before execute()")]
    ColorTargetNotBound,

    /// `execute` was called without a successful `configure` for this frame.
    #[error("Pass executed without a configured frame")]
    FrameNotConfigured,
}

/// Alias for `Result<T, SsfError>`.
pub type Result<T> = std::result::Result<T, SsfError>;
