//! Transient Target Pool
//!
//! GPU texture pool behind the [`RenderTargetPool`] contract. Passes acquire
//! named targets in **configure**, the executor reads them while replaying
//! the command stream, and **cleanup** hands them back. Released textures
//! stay in a free list and are recycled by later acquisitions with a
//! matching key.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 GpuTargetPool                       │
//! │                                                     │
//! │  active:  FxHashMap<RenderTargetHandle, Pooled>     │
//! │  free:    FxHashMap<PoolKey, Vec<Pooled>>           │
//! │  cameras: FxHashMap<CameraTargetId, Tracked<View>>  │
//! │                                                     │
//! │  acquire(name, desc) → handle   (configure)         │
//! │  view(target)                   (replay)            │
//! │  release(handle)                (cleanup)           │
//! │  trim(max_idle_frames)          (between frames)    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Textures are never destroyed during normal rendering. Call
//! [`GpuTargetPool::trim`] once per frame (or after a resolution change) to
//! drop stale ones.

use rustc_hash::FxHashMap;

use crate::errors::{Result, SsfError};
use crate::renderer::gpu::tracked::Tracked;
use crate::renderer::graph::command::{CameraTargetId, RenderTargetIdentifier};
use crate::renderer::graph::target::{
    RenderTargetDescriptor, RenderTargetFormat, RenderTargetHandle, TargetFilterMode,
};
use crate::renderer::graph::transient::RenderTargetPool;

/// Usages every pooled target is created with: render into, sample from, and
/// copy out of for aliasing blits.
pub const TARGET_USAGE: wgpu::TextureUsages = wgpu::TextureUsages::RENDER_ATTACHMENT
    .union(wgpu::TextureUsages::TEXTURE_BINDING)
    .union(wgpu::TextureUsages::COPY_SRC)
    .union(wgpu::TextureUsages::COPY_DST);

/// Physical format of a logical target format.
///
/// `R32Float` is only filterable with `FLOAT32_FILTERABLE`; without it the
/// single-channel target falls back to `R16Float` so bilinear blur levels
/// stay sampleable.
#[must_use]
pub fn texture_format(format: RenderTargetFormat, float32_filterable: bool) -> wgpu::TextureFormat {
    match format {
        RenderTargetFormat::SingleChannelFloat if float32_filterable => {
            wgpu::TextureFormat::R32Float
        }
        RenderTargetFormat::SingleChannelFloat => wgpu::TextureFormat::R16Float,
        RenderTargetFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
    }
}

/// Texture extent for a descriptor; zero dimensions become one texel.
#[must_use]
pub fn physical_extent(desc: &RenderTargetDescriptor) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: desc.width.max(1),
        height: desc.height.max(1),
        depth_or_array_layers: 1,
    }
}

// ─── Internal Types ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
struct PoolKey {
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    sample_count: u32,
}

struct PooledTexture {
    texture: wgpu::Texture,
    view: Tracked<wgpu::TextureView>,
    filter: TargetFilterMode,
    /// Frames spent in the free list without reuse.
    idle_frames: u32,
}

impl PooledTexture {
    fn new(device: &wgpu::Device, name: &str, key: PoolKey) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(name),
            size: wgpu::Extent3d {
                width: key.width,
                height: key.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: key.sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: key.format,
            usage: TARGET_USAGE,
            view_formats: &[],
        });
        let view = Tracked::new(texture.create_view(&wgpu::TextureViewDescriptor::default()));

        Self {
            texture,
            view,
            filter: TargetFilterMode::Nearest,
            idle_frames: 0,
        }
    }

    fn key(&self) -> PoolKey {
        PoolKey {
            width: self.texture.width(),
            height: self.texture.height(),
            format: self.texture.format(),
            sample_count: self.texture.sample_count(),
        }
    }
}

/// A texture the executor can render into and sample from.
pub struct TargetTexture<'a> {
    pub texture: &'a wgpu::Texture,
    pub view: &'a Tracked<wgpu::TextureView>,
    pub filter: TargetFilterMode,
}

struct CameraTexture {
    texture: wgpu::Texture,
    view: Tracked<wgpu::TextureView>,
}

// ─── Pool Implementation ──────────────────────────────────────────────────────

pub struct GpuTargetPool {
    device: wgpu::Device,
    float32_filterable: bool,
    max_dimension: u32,

    active: FxHashMap<RenderTargetHandle, PooledTexture>,
    free: FxHashMap<PoolKey, Vec<PooledTexture>>,
    cameras: FxHashMap<CameraTargetId, CameraTexture>,

    nearest_sampler: Tracked<wgpu::Sampler>,
    linear_sampler: Tracked<wgpu::Sampler>,
}

impl GpuTargetPool {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let float32_filterable = device
            .features()
            .contains(wgpu::Features::FLOAT32_FILTERABLE);

        let sampler = |label, filter| {
            Tracked::new(device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(label),
                mag_filter: filter,
                min_filter: filter,
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                ..Default::default()
            }))
        };

        Self {
            device: device.clone(),
            float32_filterable,
            max_dimension: device.limits().max_texture_dimension_2d,
            active: FxHashMap::default(),
            free: FxHashMap::default(),
            cameras: FxHashMap::default(),
            nearest_sampler: sampler("SSF Point Sampler", wgpu::FilterMode::Nearest),
            linear_sampler: sampler("SSF Bilinear Sampler", wgpu::FilterMode::Linear),
        }
    }

    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[must_use]
    pub fn format_of(&self, format: RenderTargetFormat) -> wgpu::TextureFormat {
        texture_format(format, self.float32_filterable)
    }

    // ── Camera targets ─────────────────────────────────────────────────────

    /// Registers the host's color target for `id`.
    ///
    /// The texture needs `RENDER_ATTACHMENT | TEXTURE_BINDING | COPY_SRC`:
    /// the lit composite samples and writes it in the same blit.
    pub fn insert_camera_target(&mut self, id: CameraTargetId, texture: wgpu::Texture) {
        let view = Tracked::new(texture.create_view(&wgpu::TextureViewDescriptor::default()));
        self.cameras.insert(id, CameraTexture { texture, view });
    }

    pub fn remove_camera_target(&mut self, id: CameraTargetId) {
        self.cameras.remove(&id);
    }

    // ── Replay access ──────────────────────────────────────────────────────

    pub fn target(&self, target: RenderTargetIdentifier) -> Result<TargetTexture<'_>> {
        match target {
            RenderTargetIdentifier::Temporary(handle) => self
                .active
                .get(&handle)
                .map(|p| TargetTexture {
                    texture: &p.texture,
                    view: &p.view,
                    filter: p.filter,
                })
                .ok_or(SsfError::UnknownRenderTarget(handle)),
            RenderTargetIdentifier::Camera(id) => self
                .cameras
                .get(&id)
                .map(|c| TargetTexture {
                    texture: &c.texture,
                    view: &c.view,
                    filter: TargetFilterMode::Bilinear,
                })
                .ok_or(SsfError::UnknownCameraTarget(id)),
        }
    }

    #[must_use]
    pub fn sampler(&self, filter: TargetFilterMode) -> &Tracked<wgpu::Sampler> {
        match filter {
            TargetFilterMode::Nearest => &self.nearest_sampler,
            TargetFilterMode::Bilinear => &self.linear_sampler,
        }
    }

    // ── Frame boundary ─────────────────────────────────────────────────────

    /// Returns every active texture to the free list.
    pub fn reset(&mut self) {
        let active: Vec<_> = self.active.drain().map(|(_, t)| t).collect();
        for t in active {
            self.recycle(t);
        }
    }

    /// Drops free textures idle for more than `max_idle_frames` calls.
    pub fn trim(&mut self, max_idle_frames: u32) {
        for bucket in self.free.values_mut() {
            for t in bucket.iter_mut() {
                t.idle_frames += 1;
            }
            bucket.retain(|t| t.idle_frames <= max_idle_frames);
        }
        self.free.retain(|_, bucket| !bucket.is_empty());
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Active plus free textures.
    #[must_use]
    pub fn total_texture_count(&self) -> usize {
        self.active.len() + self.free.values().map(Vec::len).sum::<usize>()
    }

    fn recycle(&mut self, mut texture: PooledTexture) {
        texture.idle_frames = 0;
        self.free.entry(texture.key()).or_default().push(texture);
    }
}

impl RenderTargetPool for GpuTargetPool {
    fn acquire(
        &mut self,
        name: &str,
        desc: &RenderTargetDescriptor,
    ) -> Result<RenderTargetHandle> {
        let handle = RenderTargetHandle::from_name(name);
        let extent = physical_extent(desc);

        if extent.width > self.max_dimension || extent.height > self.max_dimension {
            return Err(SsfError::TargetAllocation {
                name: name.to_owned(),
                reason: format!(
                    "{}x{} exceeds the device limit of {}",
                    extent.width, extent.height, self.max_dimension
                ),
            });
        }

        let key = PoolKey {
            width: extent.width,
            height: extent.height,
            format: self.format_of(desc.format),
            sample_count: desc.sample_count.max(1),
        };

        if let Some(existing) = self.active.remove(&handle) {
            if existing.key() == key {
                self.active.insert(
                    handle,
                    PooledTexture {
                        filter: desc.filter,
                        ..existing
                    },
                );
                return Ok(handle);
            }
            self.recycle(existing);
        }

        let mut pooled = match self.free.get_mut(&key).and_then(Vec::pop) {
            Some(t) => t,
            None => {
                log::debug!(
                    "Creating transient target '{name}': {}x{} {:?}",
                    key.width,
                    key.height,
                    key.format
                );
                PooledTexture::new(&self.device, name, key)
            }
        };
        pooled.filter = desc.filter;
        pooled.idle_frames = 0;

        self.active.insert(handle, pooled);
        Ok(handle)
    }

    fn release(&mut self, handle: RenderTargetHandle) {
        if let Some(texture) = self.active.remove(&handle) {
            self.recycle(texture);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_channel_falls_back_without_float32_filtering() {
        assert_eq!(
            texture_format(RenderTargetFormat::SingleChannelFloat, true),
            wgpu::TextureFormat::R32Float
        );
        assert_eq!(
            texture_format(RenderTargetFormat::SingleChannelFloat, false),
            wgpu::TextureFormat::R16Float
        );
        assert_eq!(
            texture_format(RenderTargetFormat::Rgba8, false),
            wgpu::TextureFormat::Rgba8Unorm
        );
    }

    #[test]
    fn zero_sized_descriptors_get_one_texel() {
        let desc = RenderTargetDescriptor::new(
            0,
            7,
            RenderTargetFormat::Rgba8,
            TargetFilterMode::Nearest,
        );
        let extent = physical_extent(&desc);
        assert_eq!((extent.width, extent.height), (1, 7));
    }
}
