//! SSF pass lifecycle and command recording tests
//!
//! Tests for:
//! - Construction-time sub-program resolution (fail fast, nothing allocated)
//! - Configure: target count, sizes, formats and filters
//! - Blur pyramid step sequence for N = 0, 1, 2, 3
//! - Execute: exact command order, globals, lifecycle errors
//! - Cleanup: releases exactly the configured set, on every path

use glam::{Mat4, Vec3, Vec4};
use myth_ssf::renderer::graph::PassNames;
use myth_ssf::renderer::graph::passes::ssf::{
    BlurPhase, BlurPyramid, DEPTH_NORMAL_TEXTURE, DEPTH_SHADER_TAG, DEPTH_TEXTURE,
    MATRIX_CLIP_TO_VIEW, NORMAL_TEXTURE, PROFILING_SCOPE,
};
use myth_ssf::scene::PerObjectData;
use myth_ssf::*;

// ============================================================================
// Helpers
// ============================================================================

fn fluid_names() -> PassNames {
    PassNames::new(
        "SsfFluid",
        ["DownSampling", "UpSampling", "DepthNormal", "SsfLit"],
    )
}

fn camera(width: u32, height: u32) -> CameraData {
    CameraData::new(
        CameraTargetDescriptor::new(width, height),
        Mat4::IDENTITY,
        Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 0.1, 100.0),
    )
}

fn sphere(id: u32, z: f32) -> VisibleRenderer {
    VisibleRenderer::new(id, BillboardSphere::new(Vec3::new(0.0, 0.0, z), 0.5))
        .with_shader_tag(ShaderTagId::new(DEPTH_SHADER_TAG))
}

fn pass(iterations: u32) -> SsfPass {
    let settings = SsfSettings::default().with_blur_iterations(iterations);
    let mut pass = SsfPass::new(settings, &fluid_names()).unwrap();
    pass.setup(CameraTargetId(0));
    pass
}

fn temp(name: &str) -> RenderTargetIdentifier {
    RenderTargetIdentifier::Temporary(RenderTargetHandle::from_name(name))
}

/// Pool that logs every acquire/release.
#[derive(Default)]
struct RecordingPool {
    live: Vec<RenderTargetHandle>,
    acquired: Vec<(String, RenderTargetDescriptor)>,
    released: Vec<RenderTargetHandle>,
    /// Issue handles unrelated to the requested name.
    own_handles: bool,
}

impl RenderTargetPool for RecordingPool {
    fn acquire(
        &mut self,
        name: &str,
        desc: &RenderTargetDescriptor,
    ) -> Result<RenderTargetHandle> {
        let handle = if self.own_handles {
            RenderTargetHandle::from_name(&format!("pool#{}", self.acquired.len()))
        } else {
            RenderTargetHandle::from_name(name)
        };
        self.acquired.push((name.to_owned(), *desc));
        if !self.live.contains(&handle) {
            self.live.push(handle);
        }
        Ok(handle)
    }

    fn release(&mut self, handle: RenderTargetHandle) {
        self.released.push(handle);
        self.live.retain(|h| *h != handle);
    }
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn programs_resolve_in_material_order() {
    let programs = SsfPrograms::resolve(&fluid_names()).unwrap();
    assert_eq!(programs.down_sampling, ShaderPassIndex(0));
    assert_eq!(programs.up_sampling, ShaderPassIndex(1));
    assert_eq!(programs.depth_normal, ShaderPassIndex(2));
    assert_eq!(programs.lit, ShaderPassIndex(3));
}

#[test]
fn missing_lit_program_fails_construction() {
    let material = PassNames::new("Broken", ["DownSampling", "UpSampling", "DepthNormal"]);
    let err = SsfPass::new(SsfSettings::default(), &material)
        .err()
        .unwrap();
    assert_eq!(
        err,
        SsfError::MissingShaderPass {
            material: "Broken".to_owned(),
            pass: "SsfLit",
        }
    );
    assert!(err.to_string().contains("SsfLit"));
}

#[test]
fn pass_reports_its_event() {
    let settings = SsfSettings::default()
        .with_event(RenderPassEvent::new(RenderStage::Skybox).with_offset(10));
    let pass = SsfPass::new(settings, &fluid_names()).unwrap();
    assert_eq!(pass.event().stage, RenderStage::Skybox);
    assert_eq!(pass.event().offset, 10);
}

// ============================================================================
// Configure
// ============================================================================

#[test]
fn configure_acquires_depth_blur_and_normal() {
    let mut pool = RecordingPool::default();
    let mut pass = pass(3);
    pass.configure(&mut pool, &CameraTargetDescriptor::new(512, 512))
        .unwrap();

    let names: Vec<_> = pool.acquired.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(
        names,
        [
            DEPTH_TEXTURE,
            "_BlurTemp0",
            "_BlurTemp1",
            "_BlurTemp2",
            NORMAL_TEXTURE
        ]
    );

    let (_, depth) = pool.acquired[0];
    assert_eq!((depth.width, depth.height), (512, 512));
    assert_eq!(depth.format, RenderTargetFormat::SingleChannelFloat);
    assert_eq!(depth.filter, TargetFilterMode::Nearest);

    let (_, normal) = pool.acquired[4];
    assert_eq!((normal.width, normal.height), (512, 512));
    assert_eq!(normal.format, RenderTargetFormat::Rgba8);

    assert_eq!(pass.manifest().len(), 5);
    assert_eq!(pool.live.len(), 5);
}

#[test]
fn blur_levels_halve_with_floor() {
    let mut pool = RecordingPool::default();
    let mut pass = pass(4);
    pass.configure(&mut pool, &CameraTargetDescriptor::new(300, 97))
        .unwrap();

    let blur = &pass.frame_targets().unwrap().blur;
    let sizes: Vec<_> = blur.iter().map(|d| (d.width, d.height)).collect();
    assert_eq!(sizes, [(150, 48), (75, 24), (37, 12), (18, 6)]);
    assert!(blur.iter().all(|d| d.filter == TargetFilterMode::Bilinear));
    assert!(
        blur.iter()
            .all(|d| d.format == RenderTargetFormat::SingleChannelFloat)
    );
}

#[test]
fn blur_buffer_count_matches_iterations() {
    for n in 0..6 {
        let mut pool = RecordingPool::default();
        let mut pass = pass(n);
        pass.configure(&mut pool, &CameraTargetDescriptor::new(256, 256))
            .unwrap();

        let frame = pass.frame_targets().unwrap();
        assert_eq!(frame.blur.len(), n as usize);
        for (i, desc) in frame.blur.iter().enumerate() {
            assert_eq!(desc.width, 256 >> (i + 1));
            assert_eq!(desc.height, 256 >> (i + 1));
        }
        assert_eq!(pass.manifest().len(), n as usize + 2);
    }
}

#[test]
fn reconfigure_without_cleanup_releases_stale_targets() {
    let mut pool = RecordingPool::default();
    let mut pass = pass(2);
    pass.configure(&mut pool, &CameraTargetDescriptor::new(64, 64))
        .unwrap();
    assert!(pool.released.is_empty());

    pass.configure(&mut pool, &CameraTargetDescriptor::new(32, 32))
        .unwrap();
    assert_eq!(pool.released.len(), 4);
    assert_eq!(pool.live.len(), 4);
    assert_eq!(pass.frame_targets().unwrap().camera.width, 32);
}

#[test]
fn allocation_failure_releases_partial_set() {
    // depth 4096 + blur 1024 + 256 fits, normal 4096 does not.
    let mut pool = SoftwareTargetPool::with_texel_budget(6000);
    let mut pass = pass(2);

    let err = pass
        .configure(&mut pool, &CameraTargetDescriptor::new(64, 64))
        .unwrap_err();
    assert!(matches!(err, SsfError::TargetAllocation { ref name, .. } if name == NORMAL_TEXTURE));
    assert_eq!(pool.live_count(), 0);
    assert!(pass.manifest().is_empty());
    assert!(pass.frame_targets().is_none());
}

#[test]
fn pool_issuing_its_own_handles_fails_configure() {
    let mut pool = RecordingPool {
        own_handles: true,
        ..Default::default()
    };
    let mut pass = pass(2);

    let err = pass
        .configure(&mut pool, &CameraTargetDescriptor::new(64, 64))
        .unwrap_err();
    assert!(matches!(err, SsfError::TargetAllocation { ref name, .. } if name == DEPTH_TEXTURE));
    assert!(pool.live.is_empty());
    assert!(pass.manifest().is_empty());
    assert!(pass.frame_targets().is_none());
}

// ============================================================================
// Blur Pyramid
// ============================================================================

#[test]
fn scenario_b_three_levels() {
    let pyramid = BlurPyramid::new(3);
    let depth = RenderTargetHandle::from_name(DEPTH_TEXTURE);
    let blur: Vec<_> = pyramid.levels().iter().map(|l| l.handle()).collect();
    let plan = pyramid.plan(depth);

    let down: Vec<_> = plan
        .phase(BlurPhase::DownSample)
        .map(|s| s.destination)
        .collect();
    let up: Vec<_> = plan
        .phase(BlurPhase::UpSample)
        .map(|s| s.destination)
        .collect();
    assert_eq!(down, [blur[0], blur[1], blur[2]]);
    assert_eq!(up, [blur[1], blur[0]]);
    assert_eq!(plan.output, blur[0]);
}

#[test]
fn single_level_has_no_up_sample() {
    let pyramid = BlurPyramid::new(1);
    let depth = RenderTargetHandle::from_name(DEPTH_TEXTURE);
    let plan = pyramid.plan(depth);

    assert_eq!(plan.phase(BlurPhase::DownSample).count(), 1);
    assert_eq!(plan.phase(BlurPhase::UpSample).count(), 0);
    assert_eq!(plan.output, pyramid.levels()[0].handle());
}

#[test]
fn no_step_reads_its_own_destination() {
    let depth = RenderTargetHandle::from_name(DEPTH_TEXTURE);
    for n in 0..8 {
        let plan = BlurPyramid::new(n).plan(depth);
        assert_eq!(plan.steps.len(), (2 * n as usize).saturating_sub(1));
        assert_eq!(plan.phase(BlurPhase::DownSample).count(), n as usize);
        assert_eq!(
            plan.phase(BlurPhase::UpSample).count(),
            (n as usize).saturating_sub(1)
        );
        assert!(plan.steps.iter().all(|s| s.source != s.destination));

        // Each step reads what the previous one wrote.
        for pair in plan.steps.windows(2) {
            assert_eq!(pair[1].source, pair[0].destination);
        }
    }
}

#[test]
fn zero_iterations_smooth_the_raw_depth() {
    let pass = pass(0);
    assert_eq!(pass.smoothed_depth_target(), pass.depth_target());
    assert_eq!(pass.blur_pyramid().iterations(), 0);
}

// ============================================================================
// Execute
// ============================================================================

#[test]
fn execute_records_stages_in_order() {
    let mut pool = RecordingPool::default();
    let mut pass = pass(2);
    let camera = camera(64, 64);
    let cull = CullResults::new(vec![sphere(7, -8.0), sphere(3, -2.0), sphere(5, -4.0)]);
    let data = RenderingData::new(&camera, &cull);

    pass.configure(&mut pool, &camera.target).unwrap();
    let mut cmd = CommandBuffer::new("ssf");
    pass.execute(&mut cmd, &data).unwrap();

    let color = RenderTargetIdentifier::Camera(CameraTargetId(0));
    let depth = temp(DEPTH_TEXTURE);
    let blur0 = temp("_BlurTemp0");
    let blur1 = temp("_BlurTemp1");
    let normal = temp(NORMAL_TEXTURE);

    let expected = vec![
        RenderCommand::BeginSample(PROFILING_SCOPE),
        RenderCommand::ClearRenderTarget {
            target: depth,
            flags: ClearFlags::ALL,
            color: Vec4::ZERO,
        },
        RenderCommand::DrawRenderers {
            target: depth,
            shader_tag: ShaderTagId::new(DEPTH_SHADER_TAG),
            per_object_data: PerObjectData::empty(),
            renderers: vec![3, 5, 7],
        },
        RenderCommand::Blit {
            source: depth,
            destination: blur0,
            pass: ShaderPassIndex(0),
        },
        RenderCommand::Blit {
            source: blur0,
            destination: blur1,
            pass: ShaderPassIndex(0),
        },
        RenderCommand::Blit {
            source: blur1,
            destination: blur0,
            pass: ShaderPassIndex(1),
        },
        RenderCommand::SetGlobalMatrix {
            name: MATRIX_CLIP_TO_VIEW,
            value: camera.clip_to_view(),
        },
        RenderCommand::Blit {
            source: blur0,
            destination: normal,
            pass: ShaderPassIndex(2),
        },
        RenderCommand::SetGlobalTexture {
            name: DEPTH_NORMAL_TEXTURE,
            target: normal,
        },
        RenderCommand::Blit {
            source: color,
            destination: color,
            pass: ShaderPassIndex(3),
        },
        RenderCommand::EndSample(PROFILING_SCOPE),
    ];
    assert_eq!(cmd.commands(), expected.as_slice());
}

#[test]
fn zero_iterations_feed_depth_straight_to_normals() {
    let mut pool = RecordingPool::default();
    let mut pass = pass(0);
    let camera = camera(256, 256);
    let cull = CullResults::default();

    pass.configure(&mut pool, &camera.target).unwrap();
    let mut cmd = CommandBuffer::new("ssf");
    pass.execute(&mut cmd, &RenderingData::new(&camera, &cull))
        .unwrap();

    let blits: Vec<_> = cmd.blits().collect();
    assert_eq!(blits.len(), 2);
    assert_eq!(blits[0].source, temp(DEPTH_TEXTURE));
    assert_eq!(blits[0].destination, temp(NORMAL_TEXTURE));
}

#[test]
fn filtered_out_renderers_are_not_drawn() {
    let settings = SsfSettings::default()
        .with_blur_iterations(1)
        .with_layer_mask(LayerMask::WATER)
        .with_render_queue_range(2000..=2100);
    let mut pass = SsfPass::new(settings, &fluid_names()).unwrap();
    pass.setup(CameraTargetId(0));

    let camera = camera(32, 32);
    let cull = CullResults::new(vec![
        sphere(1, -3.0).with_layer(4),
        sphere(2, -3.0).with_layer(0),
        sphere(3, -3.0).with_layer(4).with_render_queue(3000),
        VisibleRenderer::new(4, BillboardSphere::new(Vec3::NEG_Z, 1.0)).with_layer(4),
    ]);

    let mut pool = RecordingPool::default();
    pass.configure(&mut pool, &camera.target).unwrap();
    let mut cmd = CommandBuffer::new("ssf");
    pass.execute(&mut cmd, &RenderingData::new(&camera, &cull))
        .unwrap();

    let drawn = cmd.iter().find_map(|c| match c {
        RenderCommand::DrawRenderers { renderers, .. } => Some(renderers.clone()),
        _ => None,
    });
    assert_eq!(drawn, Some(vec![1]));
}

#[test]
fn execute_without_setup_fails() {
    let mut pass = SsfPass::new(SsfSettings::default(), &fluid_names()).unwrap();
    let mut pool = RecordingPool::default();
    let camera = camera(16, 16);
    let cull = CullResults::default();
    pass.configure(&mut pool, &camera.target).unwrap();

    let mut cmd = CommandBuffer::new("ssf");
    let err = pass
        .execute(&mut cmd, &RenderingData::new(&camera, &cull))
        .unwrap_err();
    assert_eq!(err, SsfError::ColorTargetNotBound);
    assert!(cmd.is_empty());
}

#[test]
fn execute_without_configure_fails() {
    let pass = pass(1);
    let camera = camera(16, 16);
    let cull = CullResults::default();
    let mut cmd = CommandBuffer::new("ssf");
    let err = pass
        .execute(&mut cmd, &RenderingData::new(&camera, &cull))
        .unwrap_err();
    assert_eq!(err, SsfError::FrameNotConfigured);
    assert!(cmd.is_empty());
}

#[test]
fn zero_area_camera_records_nothing() {
    let mut pool = RecordingPool::default();
    let mut pass = pass(3);
    let camera = camera(0, 128);
    let cull = CullResults::new(vec![sphere(1, -2.0)]);

    pass.configure(&mut pool, &camera.target).unwrap();
    let mut cmd = CommandBuffer::new("ssf");
    pass.execute(&mut cmd, &RenderingData::new(&camera, &cull))
        .unwrap();
    assert!(cmd.is_empty());

    pass.cleanup(&mut pool);
    assert!(pool.live.is_empty());
}

#[test]
fn setup_refreshes_color_target() {
    let mut pass = pass(0);
    assert_eq!(pass.color_target(), Some(CameraTargetId(0)));
    pass.setup(CameraTargetId(9));

    let mut pool = RecordingPool::default();
    let camera = camera(8, 8);
    let cull = CullResults::default();
    pass.configure(&mut pool, &camera.target).unwrap();
    let mut cmd = CommandBuffer::new("ssf");
    pass.execute(&mut cmd, &RenderingData::new(&camera, &cull))
        .unwrap();

    let lit = cmd.blits().last().unwrap();
    assert_eq!(lit.source, RenderTargetIdentifier::Camera(CameraTargetId(9)));
    assert_eq!(lit.destination, lit.source);
}

// ============================================================================
// Cleanup
// ============================================================================

#[test]
fn cleanup_releases_exactly_what_configure_acquired() {
    for n in [0, 1, 2, 5] {
        let mut pool = RecordingPool::default();
        let mut pass = pass(n);
        pass.configure(&mut pool, &CameraTargetDescriptor::new(128, 64))
            .unwrap();
        let acquired: Vec<_> = pass.manifest().handles().to_vec();

        pass.cleanup(&mut pool);
        assert_eq!(pool.released, acquired);
        assert!(pool.live.is_empty());
        assert!(pass.manifest().is_empty());
        assert!(pass.frame_targets().is_none());

        // A second cleanup is a no-op.
        pass.cleanup(&mut pool);
        assert_eq!(pool.released.len(), acquired.len());
    }
}

#[test]
fn render_camera_cleans_up_after_execute_error() {
    let mut pass = SsfPass::new(SsfSettings::default(), &fluid_names()).unwrap();
    let mut pool = SoftwareTargetPool::new();
    let camera = camera(32, 32);
    let cull = CullResults::default();
    let mut cmd = CommandBuffer::new("ssf");

    let result = render_camera(
        &mut pass,
        &mut pool,
        &mut cmd,
        &RenderingData::new(&camera, &cull),
    );
    assert_eq!(result, Err(SsfError::ColorTargetNotBound));
    assert_eq!(pool.live_count(), 0);
    assert!(pass.manifest().is_empty());
}

#[test]
fn render_camera_runs_the_full_lifecycle() {
    let mut pass = pass(3);
    let mut pool = SoftwareTargetPool::new();
    let camera = camera(64, 32);
    let cull = CullResults::new(vec![sphere(1, -3.0)]);
    let mut cmd = CommandBuffer::new("ssf");

    render_camera(
        &mut pass,
        &mut pool,
        &mut cmd,
        &RenderingData::new(&camera, &cull),
    )
    .unwrap();

    assert_eq!(pool.live_count(), 0);
    assert_eq!(pool.total_allocations(), 5);
    assert_eq!(cmd.blits().count(), 2 * 3 - 1 + 2);
}
