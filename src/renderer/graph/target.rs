//! Render target descriptors and handles
//!
//! Targets are addressed by logical name. A [`RenderTargetHandle`] is the
//! xxh3 hash of that name, so the same name always yields the same handle and
//! pools can treat repeated acquisitions within a frame as idempotent.

use std::fmt;

use xxhash_rust::xxh3::xxh3_64;

/// Pixel format of a pass-owned render target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderTargetFormat {
    /// One 32-bit float channel (depth fields).
    SingleChannelFloat,
    /// Four 8-bit unorm channels (packed normal + depth).
    Rgba8,
}

/// Sampling filter used when a target is read as a texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum TargetFilterMode {
    #[default]
    Nearest,
    Bilinear,
}

/// Full description of a per-frame render target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderTargetDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: RenderTargetFormat,
    pub filter: TargetFilterMode,
    pub sample_count: u32,
}

impl RenderTargetDescriptor {
    /// Single-sample descriptor.
    #[must_use]
    pub const fn new(
        width: u32,
        height: u32,
        format: RenderTargetFormat,
        filter: TargetFilterMode,
    ) -> Self {
        Self {
            width,
            height,
            format,
            filter,
            sample_count: 1,
        }
    }

    /// Same descriptor at half the linear resolution (floor), with the given
    /// filter.
    #[must_use]
    pub const fn halved(&self, filter: TargetFilterMode) -> Self {
        Self {
            width: self.width / 2,
            height: self.height / 2,
            filter,
            ..*self
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Frame-scoped handle of a named render target.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetHandle(u64);

impl RenderTargetHandle {
    #[inline]
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self(xxh3_64(name.as_bytes()))
    }

    #[inline]
    #[must_use]
    pub const fn to_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for RenderTargetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RenderTargetHandle({:#018x})", self.0)
    }
}

/// A target name paired with its handle, built once at pass construction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NamedTarget {
    name: String,
    handle: RenderTargetHandle,
}

impl NamedTarget {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let handle = RenderTargetHandle::from_name(&name);
        Self { name, handle }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub const fn handle(&self) -> RenderTargetHandle {
        self.handle
    }
}
