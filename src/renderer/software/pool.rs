//! CPU render target pool

use rustc_hash::FxHashMap;

use crate::errors::{Result, SsfError};
use crate::renderer::graph::command::{CameraTargetId, RenderTargetIdentifier};
use crate::renderer::graph::target::{RenderTargetDescriptor, RenderTargetHandle};
use crate::renderer::graph::transient::RenderTargetPool;
use crate::renderer::software::image::{SoftwareImage, texel_count};

/// Largest image whose texel storage fits in one allocation.
const MAX_IMAGE_TEXELS: u64 = (isize::MAX as u64) / std::mem::size_of::<glam::Vec4>() as u64;

struct PooledImage {
    desc: RenderTargetDescriptor,
    image: SoftwareImage,
}

/// Pool of CPU images plus the host's camera color images.
///
/// Acquiring a name twice with the same descriptor returns the live image
/// untouched; a different descriptor replaces it with a fresh one.
#[derive(Default)]
pub struct SoftwareTargetPool {
    live: FxHashMap<RenderTargetHandle, PooledImage>,
    cameras: FxHashMap<CameraTargetId, SoftwareImage>,
    /// Texel budget; `None` means unlimited.
    max_texels: Option<u64>,
    total_allocations: u64,
}

impl SoftwareTargetPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool that refuses allocations once `max_texels` would be exceeded.
    #[must_use]
    pub fn with_texel_budget(max_texels: u64) -> Self {
        Self {
            max_texels: Some(max_texels),
            ..Self::default()
        }
    }

    // ── Camera targets ─────────────────────────────────────────────────────

    pub fn insert_camera_target(&mut self, id: CameraTargetId, image: SoftwareImage) {
        self.cameras.insert(id, image);
    }

    #[must_use]
    pub fn camera_target(&self, id: CameraTargetId) -> Option<&SoftwareImage> {
        self.cameras.get(&id)
    }

    // ── Queries ────────────────────────────────────────────────────────────

    /// Number of pass-owned targets currently acquired.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    pub fn is_live(&self, handle: RenderTargetHandle) -> bool {
        self.live.contains_key(&handle)
    }

    /// Images created by `acquire` so far (idempotent re-acquisitions excluded).
    #[must_use]
    pub fn total_allocations(&self) -> u64 {
        self.total_allocations
    }

    #[must_use]
    pub fn descriptor(&self, handle: RenderTargetHandle) -> Option<&RenderTargetDescriptor> {
        self.live.get(&handle).map(|p| &p.desc)
    }

    #[must_use]
    pub fn image(&self, handle: RenderTargetHandle) -> Option<&SoftwareImage> {
        self.live.get(&handle).map(|p| &p.image)
    }

    /// Resolves any command target to its image.
    pub fn resolve(&self, target: RenderTargetIdentifier) -> Result<&SoftwareImage> {
        match target {
            RenderTargetIdentifier::Temporary(handle) => self
                .image(handle)
                .ok_or(SsfError::UnknownRenderTarget(handle)),
            RenderTargetIdentifier::Camera(id) => self
                .cameras
                .get(&id)
                .ok_or(SsfError::UnknownCameraTarget(id)),
        }
    }

    pub fn resolve_mut(&mut self, target: RenderTargetIdentifier) -> Result<&mut SoftwareImage> {
        match target {
            RenderTargetIdentifier::Temporary(handle) => self
                .live
                .get_mut(&handle)
                .map(|p| &mut p.image)
                .ok_or(SsfError::UnknownRenderTarget(handle)),
            RenderTargetIdentifier::Camera(id) => self
                .cameras
                .get_mut(&id)
                .ok_or(SsfError::UnknownCameraTarget(id)),
        }
    }

    fn live_texels(&self) -> u64 {
        self.live
            .values()
            .map(|p| texel_count(p.image.width(), p.image.height()))
            .sum()
    }
}

impl RenderTargetPool for SoftwareTargetPool {
    fn acquire(
        &mut self,
        name: &str,
        desc: &RenderTargetDescriptor,
    ) -> Result<RenderTargetHandle> {
        let handle = RenderTargetHandle::from_name(name);

        if self.live.get(&handle).is_some_and(|p| p.desc == *desc) {
            return Ok(handle);
        }

        let requested = texel_count(desc.width, desc.height);
        if requested > MAX_IMAGE_TEXELS || usize::try_from(requested).is_err() {
            return Err(SsfError::TargetAllocation {
                name: name.to_owned(),
                reason: format!(
                    "{}x{} image does not fit in addressable memory",
                    desc.width, desc.height
                ),
            });
        }

        if let Some(budget) = self.max_texels {
            let replaced = self
                .live
                .get(&handle)
                .map_or(0, |p| texel_count(p.image.width(), p.image.height()));
            if self.live_texels() - replaced + requested > budget {
                return Err(SsfError::TargetAllocation {
                    name: name.to_owned(),
                    reason: format!("texel budget of {budget} exceeded"),
                });
            }
        }

        let image = SoftwareImage::from_descriptor(desc);
        self.live.insert(handle, PooledImage { desc: *desc, image });
        self.total_allocations += 1;
        Ok(handle)
    }

    fn release(&mut self, handle: RenderTargetHandle) {
        self.live.remove(&handle);
    }
}
