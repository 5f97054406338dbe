//! Host-side scene data consumed by the fluid pass
//!
//! - [`filter`]: queue/layer/tag selection and draw ordering
//! - [`cull`]: the visible renderer list
//! - [`camera`]: per-frame camera data and projection conventions

pub mod camera;
pub mod cull;
pub mod filter;

pub use camera::{
    CameraData, CameraTargetDescriptor, ClipSpaceConvention, DepthRange, RenderingData,
    clip_to_view_matrix, gpu_projection_matrix,
};
pub use cull::{BillboardSphere, CullResults, RendererId, VisibleRenderer};
pub use filter::{
    DrawingSettings, FilteringSettings, LayerMask, PerObjectData, RenderQueueRange,
    ShaderTagId, SortingCriteria,
};
