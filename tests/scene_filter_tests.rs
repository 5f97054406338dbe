//! Draw filtering, sorting and settings tests
//!
//! Tests for:
//! - Queue range / layer mask / shader tag selection
//! - CommonOpaque, RenderQueue and None draw ordering
//! - SsfSettings defaults, builders and serde round trips

use glam::{Mat4, Vec3};
use myth_ssf::renderer::DEFAULT_BLUR_ITERATIONS;
use myth_ssf::scene::DrawingSettings;
use myth_ssf::*;

// ============================================================================
// Helpers
// ============================================================================

fn tag() -> ShaderTagId {
    ShaderTagId::new("SsfBillboardSphereDepth")
}

fn renderer(id: u32, z: f32, queue: i32, layer: u8) -> VisibleRenderer {
    VisibleRenderer::new(id, BillboardSphere::new(Vec3::new(0.0, 0.0, z), 0.5))
        .with_render_queue(queue)
        .with_layer(layer)
        .with_shader_tag(tag())
}

fn scene() -> CullResults {
    CullResults::new(vec![
        renderer(1, -10.0, 2000, 0),
        renderer(2, -2.0, 2000, 0),
        renderer(3, -5.0, 2000, 4),
        renderer(4, -20.0, 1000, 4),
        renderer(5, -1.0, 3000, 0),
    ])
}

fn draw(sorting: SortingCriteria, filtering: FilteringSettings) -> Vec<u32> {
    scene().draw_list(
        &DrawingSettings::new(tag(), sorting),
        &filtering,
        &Mat4::IDENTITY,
    )
}

// ============================================================================
// Filtering
// ============================================================================

#[test]
fn opaque_range_excludes_transparent_queue() {
    let ids = draw(SortingCriteria::None, FilteringSettings::default());
    assert_eq!(ids, [1, 2, 3, 4]);
}

#[test]
fn layer_mask_selects_layers() {
    let filtering = FilteringSettings::new(RenderQueueRange::ALL, LayerMask::WATER);
    assert_eq!(draw(SortingCriteria::None, filtering), [3, 4]);

    let filtering = FilteringSettings::new(RenderQueueRange::ALL, LayerMask::empty());
    assert!(draw(SortingCriteria::None, filtering).is_empty());
}

#[test]
fn renderers_without_the_tag_are_skipped() {
    let mut cull = scene();
    cull.renderers
        .push(VisibleRenderer::new(6, BillboardSphere::new(Vec3::NEG_Z, 1.0)));
    let ids = cull.draw_list(
        &DrawingSettings::new(tag(), SortingCriteria::None),
        &FilteringSettings::default(),
        &Mat4::IDENTITY,
    );
    assert!(!ids.contains(&6));
}

#[test]
fn filtering_settings_match_both_criteria() {
    let filtering = FilteringSettings::new(RenderQueueRange::new(1500, 2500), LayerMask::layer(0));
    assert!(filtering.matches(&renderer(1, -1.0, 2000, 0)));
    assert!(!filtering.matches(&renderer(1, -1.0, 1000, 0)));
    assert!(!filtering.matches(&renderer(1, -1.0, 2000, 3)));
}

// ============================================================================
// Sorting
// ============================================================================

#[test]
fn common_opaque_sorts_by_queue_then_front_to_back() {
    let ids = draw(SortingCriteria::CommonOpaque, FilteringSettings::default());
    assert_eq!(ids, [4, 2, 3, 1]);
}

#[test]
fn render_queue_sorting_ignores_depth() {
    let ids = draw(SortingCriteria::RenderQueue, FilteringSettings::default());
    assert_eq!(ids, [4, 1, 2, 3]);
}

#[test]
fn view_depth_uses_the_camera_view() {
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, -30.0), Vec3::ZERO, Vec3::Y);
    let ids = scene().draw_list(
        &DrawingSettings::new(tag(), SortingCriteria::CommonOpaque),
        &FilteringSettings::new(RenderQueueRange::new(2000, 2000), LayerMask::all()),
        &view,
    );
    // Seen from behind, the farthest sphere is now the nearest.
    assert_eq!(ids, [1, 3, 2]);
}

// ============================================================================
// Settings
// ============================================================================

#[test]
fn settings_defaults() {
    let settings = SsfSettings::default();
    assert_eq!(settings.blur_iterations, DEFAULT_BLUR_ITERATIONS);
    assert_eq!(settings.layer_mask, LayerMask::all());
    assert_eq!(settings.render_queue_range, RenderQueueRange::OPAQUE);
    assert_eq!(settings.event.stage, RenderStage::BeforeTransparent);
    assert_eq!(settings.filtering(), FilteringSettings::default());
}

#[test]
fn settings_builders() {
    let settings = SsfSettings::default()
        .with_event(RenderStage::Skybox)
        .with_blur_iterations(0)
        .with_layer_mask(LayerMask::WATER | LayerMask::DEFAULT)
        .with_render_queue_range(2000..=2450);

    assert_eq!(settings.event, RenderPassEvent::new(RenderStage::Skybox));
    assert_eq!(settings.blur_iterations, 0);
    let filtering = settings.filtering();
    assert!(filtering.layer_mask.includes_layer(4));
    assert!(filtering.layer_mask.includes_layer(0));
    assert!(!filtering.layer_mask.includes_layer(1));
    assert_eq!(filtering.render_queue_range, RenderQueueRange::new(2000, 2450));
}

#[test]
fn settings_json_round_trip() {
    let settings = SsfSettings::default()
        .with_event(RenderPassEvent::new(RenderStage::Skybox).with_offset(-3))
        .with_blur_iterations(5)
        .with_layer_mask(LayerMask::WATER);

    let json = serde_json::to_string(&settings).unwrap();
    let back: SsfSettings = serde_json::from_str(&json).unwrap();
    assert_eq!(back, settings);
}

#[test]
fn settings_json_fills_missing_fields() {
    let settings: SsfSettings =
        serde_json::from_str(r#"{ "blur_iterations": 6, "event": { "stage": "Opaque" } }"#)
            .unwrap();

    assert_eq!(settings.blur_iterations, 6);
    assert_eq!(settings.event, RenderPassEvent::new(RenderStage::Opaque));
    assert_eq!(settings.layer_mask, LayerMask::all());
    assert_eq!(settings.render_queue_range, RenderQueueRange::OPAQUE);
}
