//! Render Stage Definitions
//!
//! `RenderStage` is the engine's coarse frame ordering. A [`RenderPassEvent`]
//! refines it with a signed offset so that several injected passes can share
//! a stage in a defined order. The fluid pass treats its event as an opaque
//! token: only the external scheduler interprets it.

use serde::{Deserialize, Serialize};

/// Render stage enumeration, in execution order.
///
/// | Stage | Typical content |
/// |-------|-----------------|
/// | `PreProcess` | Resource upload, compute pre-processing |
/// | `ShadowMap` | Shadow maps |
/// | `Opaque` | Opaque geometry |
/// | `Skybox` | Sky / background |
/// | `BeforeTransparent` | Screen-space effects over the opaque image (SSF, SSSSS) |
/// | `Transparent` | Alpha-blended geometry |
/// | `PostProcess` | Bloom, tone mapping, FXAA |
/// | `UI` | Overlays |
#[derive(
    Debug, Hash, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum RenderStage {
    PreProcess = 0,
    ShadowMap = 1,
    Opaque = 2,
    Skybox = 3,
    /// Fluid surfaces are composited here by default: after the sky so the
    /// lit surface blends over the finished background, before transparent
    /// geometry that should sort over the fluid.
    #[default]
    BeforeTransparent = 4,
    Transparent = 5,
    PostProcess = 6,
    UI = 7,
}

impl RenderStage {
    #[inline]
    #[must_use]
    pub const fn order(self) -> u8 {
        self as u8
    }

    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PreProcess => "PreProcess",
            Self::ShadowMap => "ShadowMap",
            Self::Opaque => "Opaque",
            Self::Skybox => "Skybox",
            Self::BeforeTransparent => "BeforeTransparent",
            Self::Transparent => "Transparent",
            Self::PostProcess => "PostProcess",
            Self::UI => "UI",
        }
    }
}

/// Ordering token of an injected pass: a stage plus an offset inside it.
///
/// Ordered lexicographically, stage first.
#[derive(
    Debug, Hash, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct RenderPassEvent {
    pub stage: RenderStage,
    #[serde(default)]
    pub offset: i32,
}

impl RenderPassEvent {
    #[must_use]
    pub const fn new(stage: RenderStage) -> Self {
        Self { stage, offset: 0 }
    }

    #[must_use]
    pub const fn with_offset(self, offset: i32) -> Self {
        Self { offset, ..self }
    }
}

impl From<RenderStage> for RenderPassEvent {
    fn from(stage: RenderStage) -> Self {
        Self::new(stage)
    }
}
