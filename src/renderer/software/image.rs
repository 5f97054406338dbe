//! CPU render target storage

use glam::{Vec2, Vec4};

use crate::renderer::graph::target::{RenderTargetDescriptor, TargetFilterMode};

/// Texel count of a `width × height` image once clamped to one texel.
#[inline]
#[must_use]
pub fn texel_count(width: u32, height: u32) -> u64 {
    u64::from(width.max(1)) * u64::from(height.max(1))
}

/// RGBA32F image with a sampling filter. Single-channel targets use `x`.
#[derive(Clone, Debug, PartialEq)]
pub struct SoftwareImage {
    width: u32,
    height: u32,
    filter: TargetFilterMode,
    texels: Vec<Vec4>,
}

impl SoftwareImage {
    /// A `width × height` image filled with `value`. Dimensions are clamped
    /// to at least one texel.
    #[must_use]
    pub fn filled(width: u32, height: u32, filter: TargetFilterMode, value: Vec4) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            filter,
            texels: vec![value; width as usize * height as usize],
        }
    }

    #[must_use]
    pub fn from_descriptor(desc: &RenderTargetDescriptor) -> Self {
        Self::filled(desc.width, desc.height, desc.filter, Vec4::ZERO)
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn filter(&self) -> TargetFilterMode {
        self.filter
    }

    #[must_use]
    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }

    /// Size of one texel in UV units.
    #[must_use]
    pub fn texel_size(&self) -> Vec2 {
        Vec2::new(1.0 / self.width as f32, 1.0 / self.height as f32)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Vec4 {
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        self.texels[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: Vec4) {
        let index = self.index(x, y);
        self.texels[index] = value;
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn fill(&mut self, value: Vec4) {
        self.texels.fill(value);
    }

    /// UV of the center of texel `(x, y)`; `(0, 0)` is the top-left corner.
    #[inline]
    #[must_use]
    pub fn texel_center(&self, x: u32, y: u32) -> Vec2 {
        Vec2::new(
            (x as f32 + 0.5) / self.width as f32,
            (y as f32 + 0.5) / self.height as f32,
        )
    }

    /// Samples with the image's own filter and clamp-to-edge addressing.
    #[must_use]
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        match self.filter {
            TargetFilterMode::Nearest => self.sample_nearest(uv),
            TargetFilterMode::Bilinear => self.sample_bilinear(uv),
        }
    }

    #[must_use]
    pub fn sample_nearest(&self, uv: Vec2) -> Vec4 {
        let x = (uv.x * self.width as f32).floor().max(0.0) as u32;
        let y = (uv.y * self.height as f32).floor().max(0.0) as u32;
        self.get(x, y)
    }

    #[must_use]
    pub fn sample_bilinear(&self, uv: Vec2) -> Vec4 {
        let px = uv.x * self.width as f32 - 0.5;
        let py = uv.y * self.height as f32 - 0.5;
        let x0 = px.floor();
        let y0 = py.floor();
        let tx = px - x0;
        let ty = py - y0;

        let clamp_x = |v: f32| v.clamp(0.0, (self.width - 1) as f32) as u32;
        let clamp_y = |v: f32| v.clamp(0.0, (self.height - 1) as f32) as u32;
        let (xa, xb) = (clamp_x(x0), clamp_x(x0 + 1.0));
        let (ya, yb) = (clamp_y(y0), clamp_y(y0 + 1.0));

        let top = self.get(xa, ya).lerp(self.get(xb, ya), tx);
        let bottom = self.get(xa, yb).lerp(self.get(xb, yb), tx);
        top.lerp(bottom, ty)
    }

    /// Replaces all texels, keeping size and filter.
    pub(crate) fn replace_texels(&mut self, texels: Vec<Vec4>) {
        debug_assert_eq!(texels.len(), self.texels.len());
        self.texels = texels;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bilinear_interpolates_between_texel_centers() {
        let mut image = SoftwareImage::filled(2, 1, TargetFilterMode::Bilinear, Vec4::ZERO);
        image.set(1, 0, Vec4::ONE);

        let mid = image.sample(Vec2::new(0.5, 0.5));
        assert!((mid.x - 0.5).abs() < 1e-6);
        assert_eq!(image.sample(Vec2::new(0.25, 0.5)), Vec4::ZERO);
        assert_eq!(image.sample(Vec2::new(0.75, 0.5)), Vec4::ONE);
    }

    #[test]
    fn nearest_clamps_outside_uv() {
        let mut image = SoftwareImage::filled(2, 2, TargetFilterMode::Nearest, Vec4::ZERO);
        image.set(1, 1, Vec4::ONE);
        assert_eq!(image.sample(Vec2::new(2.0, 2.0)), Vec4::ONE);
        assert_eq!(image.sample(Vec2::new(-1.0, -1.0)), Vec4::ZERO);
    }

    #[test]
    fn texel_count_does_not_wrap_in_u32() {
        assert_eq!(texel_count(70_000, 70_000), 4_900_000_000);
        assert_eq!(texel_count(0, 5), 5);
    }

    #[test]
    fn zero_sized_images_hold_one_texel() {
        let image = SoftwareImage::filled(0, 0, TargetFilterMode::Nearest, Vec4::ONE);
        assert_eq!((image.width(), image.height()), (1, 1));
    }
}
