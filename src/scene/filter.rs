//! Draw Filtering Criteria
//!
//! Host-side selectors that decide which visible renderers a draw call
//! considers: a render queue range, a layer mask and a shader tag. These are
//! supplied once at pass construction and never change afterwards.

use std::fmt;
use std::ops::RangeInclusive;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::scene::cull::VisibleRenderer;

bitflags! {
    /// 32-slot layer selector. Bit `n` selects renderers on layer `n`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct LayerMask: u32 {
        const DEFAULT = 1 << 0;
        const TRANSPARENT_FX = 1 << 1;
        const IGNORE_RAYCAST = 1 << 2;
        const WATER = 1 << 4;
        const UI = 1 << 5;
        const _ = !0;
    }
}

impl LayerMask {
    /// Mask selecting a single layer. Layers outside `0..32` select nothing.
    #[inline]
    #[must_use]
    pub const fn layer(index: u8) -> Self {
        if index < 32 {
            Self::from_bits_retain(1 << index)
        } else {
            Self::empty()
        }
    }

    /// Whether a renderer on `layer` passes this mask.
    #[inline]
    #[must_use]
    pub const fn includes_layer(self, layer: u8) -> bool {
        layer < 32 && self.bits() & (1 << layer) != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::all()
    }
}

/// Inclusive range of render queue values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderQueueRange {
    pub min: i32,
    pub max: i32,
}

impl RenderQueueRange {
    /// Geometry, alpha-tested and everything else drawn before the skybox.
    pub const OPAQUE: Self = Self::new(0, 2500);
    /// Alpha-blended geometry.
    pub const TRANSPARENT: Self = Self::new(2501, 5000);
    /// Every queue.
    pub const ALL: Self = Self::new(0, 5000);

    #[inline]
    #[must_use]
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    #[inline]
    #[must_use]
    pub const fn contains(&self, queue: i32) -> bool {
        self.min <= queue && queue <= self.max
    }
}

impl Default for RenderQueueRange {
    fn default() -> Self {
        Self::OPAQUE
    }
}

impl From<RangeInclusive<i32>> for RenderQueueRange {
    fn from(range: RangeInclusive<i32>) -> Self {
        Self::new(*range.start(), *range.end())
    }
}

/// Queue + layer selection for a `DrawRenderers` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilteringSettings {
    pub render_queue_range: RenderQueueRange,
    pub layer_mask: LayerMask,
}

impl FilteringSettings {
    #[must_use]
    pub const fn new(render_queue_range: RenderQueueRange, layer_mask: LayerMask) -> Self {
        Self {
            render_queue_range,
            layer_mask,
        }
    }

    #[inline]
    #[must_use]
    pub fn matches(&self, renderer: &VisibleRenderer) -> bool {
        self.render_queue_range.contains(renderer.render_queue)
            && self.layer_mask.includes_layer(renderer.layer)
    }
}

/// Stable identifier of a shader tag (the name of a per-renderer sub-program).
///
/// Derived from the tag name with xxh3 so that ids are identical across runs
/// and processes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderTagId(u64);

impl ShaderTagId {
    #[inline]
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(xxh3_64(name.as_bytes()))
    }

    #[inline]
    #[must_use]
    pub const fn to_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ShaderTagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShaderTagId({:#018x})", self.0)
    }
}

impl From<&str> for ShaderTagId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Draw ordering applied to the filtered renderer list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortingCriteria {
    /// Render queue, then front-to-back by view depth, then renderer id.
    #[default]
    CommonOpaque,
    /// Render queue, then renderer id. Used on GPUs with hidden surface
    /// removal where depth ordering buys nothing.
    RenderQueue,
    /// Keep the culling order.
    None,
}

bitflags! {
    /// Per-object data a draw call asks the host to upload.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct PerObjectData: u32 {
        const LIGHT_PROBE = 1 << 0;
        const REFLECTION_PROBES = 1 << 1;
        const LIGHTMAPS = 1 << 2;
        const LIGHT_DATA = 1 << 3;
        const MOTION_VECTORS = 1 << 4;
    }
}

/// How a `DrawRenderers` call shades and orders its renderers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawingSettings {
    pub shader_tag: ShaderTagId,
    pub sorting: SortingCriteria,
    pub per_object_data: PerObjectData,
}

impl DrawingSettings {
    #[must_use]
    pub fn new(shader_tag: ShaderTagId, sorting: SortingCriteria) -> Self {
        Self {
            shader_tag,
            sorting,
            per_object_data: PerObjectData::empty(),
        }
    }
}
