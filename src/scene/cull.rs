//! Culling Results
//!
//! The visible-renderer list handed over by the host's culling system. Only
//! the data the fluid pass consumes is modelled: queue/layer metadata for
//! filtering, the billboard sphere for depth sorting and rasterisation, and the
//! shader tags the renderer's material exposes.

use glam::{Mat4, Vec3};
use smallvec::SmallVec;

use crate::scene::filter::{DrawingSettings, FilteringSettings, ShaderTagId, SortingCriteria};

/// Host-assigned renderer identifier.
pub type RendererId = u32;

/// Camera-facing quad shaded as a sphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BillboardSphere {
    /// World-space center.
    pub center: Vec3,
    /// World-space radius.
    pub radius: f32,
}

impl BillboardSphere {
    #[must_use]
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

/// A renderer that survived culling this frame.
#[derive(Clone, Debug)]
pub struct VisibleRenderer {
    pub id: RendererId,
    /// Layer index in `0..32`.
    pub layer: u8,
    pub render_queue: i32,
    pub sphere: BillboardSphere,
    /// Tags of the sub-programs this renderer's material provides.
    pub shader_tags: SmallVec<[ShaderTagId; 2]>,
}

impl VisibleRenderer {
    #[must_use]
    pub fn new(id: RendererId, sphere: BillboardSphere) -> Self {
        Self {
            id,
            layer: 0,
            render_queue: 2000,
            sphere,
            shader_tags: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn with_layer(mut self, layer: u8) -> Self {
        self.layer = layer;
        self
    }

    #[must_use]
    pub fn with_render_queue(mut self, queue: i32) -> Self {
        self.render_queue = queue;
        self
    }

    #[must_use]
    pub fn with_shader_tag(mut self, tag: ShaderTagId) -> Self {
        self.shader_tags.push(tag);
        self
    }

    #[inline]
    #[must_use]
    pub fn has_tag(&self, tag: ShaderTagId) -> bool {
        self.shader_tags.contains(&tag)
    }

    /// Distance along the view direction (positive in front of a right-handed
    /// camera looking down -Z).
    #[inline]
    #[must_use]
    pub fn view_depth(&self, view: &Mat4) -> f32 {
        -view.transform_point3(self.sphere.center).z
    }
}

/// The visible set produced by the host culling system.
#[derive(Clone, Debug, Default)]
pub struct CullResults {
    pub renderers: Vec<VisibleRenderer>,
}

impl CullResults {
    #[must_use]
    pub fn new(renderers: Vec<VisibleRenderer>) -> Self {
        Self { renderers }
    }

    #[must_use]
    pub fn get(&self, id: RendererId) -> Option<&VisibleRenderer> {
        self.renderers.iter().find(|r| r.id == id)
    }

    /// Ids of the renderers a `DrawRenderers` call would draw, in draw order.
    ///
    /// A renderer is drawn when it exposes the drawing tag and passes the
    /// queue/layer filter.
    #[must_use]
    pub fn draw_list(
        &self,
        drawing: &DrawingSettings,
        filtering: &FilteringSettings,
        view: &Mat4,
    ) -> Vec<RendererId> {
        let mut items: Vec<(&VisibleRenderer, f32)> = self
            .renderers
            .iter()
            .filter(|r| r.has_tag(drawing.shader_tag) && filtering.matches(r))
            .map(|r| (r, r.view_depth(view)))
            .collect();

        match drawing.sorting {
            SortingCriteria::CommonOpaque => items.sort_by(|(a, da), (b, db)| {
                a.render_queue
                    .cmp(&b.render_queue)
                    .then(da.total_cmp(db))
                    .then(a.id.cmp(&b.id))
            }),
            SortingCriteria::RenderQueue => items.sort_by(|(a, _), (b, _)| {
                a.render_queue.cmp(&b.render_queue).then(a.id.cmp(&b.id))
            }),
            SortingCriteria::None => {}
        }

        items.into_iter().map(|(r, _)| r.id).collect()
    }
}
