//! Screen-Space Fluid (SSF) Pass
//!
//! Renders particle-like billboard spheres as a continuous fluid surface.
//!
//! # Data Flow
//!
//! ```text
//!  CullResults ──► Depth Capture ──► _SsfDepthTexture (R float, point)
//!                                          │
//!                                   Blur Pyramid (N levels, bilinear)
//!                                          │ smoothed depth
//!                                          ▼
//!  _MatrixClipToView ──────────► Normal Reconstruction ──► _SsfNormalTexture (RGBA8)
//!                                                               │ _SsfDepthNormalTexture
//!                                                               ▼
//!  Camera color ◄──────────────────────────────────────── Lit Composite
//! ```
//!
//! # Lifecycle
//!
//! - [`SsfPass::new`]: resolves the four sub-programs by name and fails if any
//!   is missing. Target names are fixed here.
//! - [`SsfPass::setup`]: binds the camera color target (may be refreshed every
//!   frame).
//! - `configure` / `execute` / `cleanup` through [`RenderNode`].
//!
//! Everything except the camera color target is owned by the pass for one
//! frame and released in `cleanup`.

mod blur;
mod depth;
mod lit;
mod normal;

pub use blur::{BlurPhase, BlurPlan, BlurPyramid, BlurStep};
pub use depth::{DEPTH_CLEAR_COLOR, DEPTH_SHADER_TAG, DepthCapture};
pub use lit::DEPTH_NORMAL_TEXTURE;
pub use normal::MATRIX_CLIP_TO_VIEW;

use crate::errors::{Result, SsfError};
use crate::renderer::graph::command::{CameraTargetId, CommandBuffer};
use crate::renderer::graph::material::{ShaderPassIndex, ShaderPassLookup};
use crate::renderer::graph::node::RenderNode;
use crate::renderer::graph::stage::RenderPassEvent;
use crate::renderer::graph::target::{
    NamedTarget, RenderTargetDescriptor, RenderTargetFormat, RenderTargetHandle, TargetFilterMode,
};
use crate::renderer::graph::transient::{AcquireScope, FrameManifest, RenderTargetPool};
use crate::renderer::settings::SsfSettings;
use crate::scene::camera::{CameraTargetDescriptor, RenderingData};

/// Debug group / profiling scope name.
pub const PROFILING_SCOPE: &str = "Ssf";

pub const DOWN_SAMPLING_PASS: &str = "DownSampling";
pub const UP_SAMPLING_PASS: &str = "UpSampling";
pub const DEPTH_NORMAL_PASS: &str = "DepthNormal";
pub const LIT_PASS: &str = "SsfLit";

pub const DEPTH_TEXTURE: &str = "_SsfDepthTexture";
pub const NORMAL_TEXTURE: &str = "_SsfNormalTexture";

// ─── Programs ─────────────────────────────────────────────────────────────────

/// Sub-program indices resolved once from the fluid material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SsfPrograms {
    pub down_sampling: ShaderPassIndex,
    pub up_sampling: ShaderPassIndex,
    pub depth_normal: ShaderPassIndex,
    pub lit: ShaderPassIndex,
}

impl SsfPrograms {
    /// Looks up `DownSampling`, `UpSampling`, `DepthNormal` and `SsfLit`.
    pub fn resolve<M: ShaderPassLookup + ?Sized>(material: &M) -> Result<Self> {
        let find = |pass: &'static str| {
            material
                .find_pass(pass)
                .ok_or_else(|| SsfError::MissingShaderPass {
                    material: material.name().to_owned(),
                    pass,
                })
        };

        Ok(Self {
            down_sampling: find(DOWN_SAMPLING_PASS)?,
            up_sampling: find(UP_SAMPLING_PASS)?,
            depth_normal: find(DEPTH_NORMAL_PASS)?,
            lit: find(LIT_PASS)?,
        })
    }
}

// ─── Frame State ──────────────────────────────────────────────────────────────

/// Descriptors of the targets acquired by the last `configure`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameTargets {
    pub camera: CameraTargetDescriptor,
    pub depth: RenderTargetDescriptor,
    pub normal: RenderTargetDescriptor,
    pub blur: Vec<RenderTargetDescriptor>,
}

// ─── Pass ─────────────────────────────────────────────────────────────────────

pub struct SsfPass {
    settings: SsfSettings,
    programs: SsfPrograms,
    depth_capture: DepthCapture,

    depth_target: NamedTarget,
    normal_target: NamedTarget,
    blur: BlurPyramid,

    /// Borrowed camera color target, refreshed by `setup`.
    color_target: Option<CameraTargetId>,

    // === Per-frame state (configure → cleanup) ===
    frame: Option<FrameTargets>,
    manifest: FrameManifest,
}

impl SsfPass {
    /// Builds the pass. Fails if `material` lacks any fluid sub-program, in
    /// which case nothing is ever allocated.
    pub fn new<M: ShaderPassLookup + ?Sized>(settings: SsfSettings, material: &M) -> Result<Self> {
        let programs = SsfPrograms::resolve(material)?;

        log::debug!(
            "SSF pass created from '{}': {} blur iterations, queues {}..={}, layers {:#010x}",
            material.name(),
            settings.blur_iterations,
            settings.render_queue_range.min,
            settings.render_queue_range.max,
            settings.layer_mask.bits(),
        );

        Ok(Self {
            depth_capture: DepthCapture::new(settings.filtering()),
            programs,
            depth_target: NamedTarget::new(DEPTH_TEXTURE),
            normal_target: NamedTarget::new(NORMAL_TEXTURE),
            blur: BlurPyramid::new(settings.blur_iterations),
            settings,
            color_target: None,
            frame: None,
            manifest: FrameManifest::default(),
        })
    }

    /// Binds the camera color target the lit composite writes into.
    pub fn setup(&mut self, color_target: CameraTargetId) {
        self.color_target = Some(color_target);
    }

    // ── Accessors ──────────────────────────────────────────────────────────

    #[must_use]
    pub fn settings(&self) -> &SsfSettings {
        &self.settings
    }

    #[must_use]
    pub fn programs(&self) -> SsfPrograms {
        self.programs
    }

    #[must_use]
    pub fn color_target(&self) -> Option<CameraTargetId> {
        self.color_target
    }

    #[must_use]
    pub fn depth_target(&self) -> RenderTargetHandle {
        self.depth_target.handle()
    }

    #[must_use]
    pub fn normal_target(&self) -> RenderTargetHandle {
        self.normal_target.handle()
    }

    #[must_use]
    pub fn blur_pyramid(&self) -> &BlurPyramid {
        &self.blur
    }

    /// Target holding the smoothed depth once the pyramid has run.
    #[must_use]
    pub fn smoothed_depth_target(&self) -> RenderTargetHandle {
        self.blur.plan(self.depth_target.handle()).output
    }

    /// Descriptors of the current frame, `None` outside configure → cleanup.
    #[must_use]
    pub fn frame_targets(&self) -> Option<&FrameTargets> {
        self.frame.as_ref()
    }

    /// Handles acquired by the last `configure` and not yet released.
    #[must_use]
    pub fn manifest(&self) -> &FrameManifest {
        &self.manifest
    }
}

impl RenderNode for SsfPass {
    fn name(&self) -> &str {
        "SSF Pass"
    }

    fn event(&self) -> RenderPassEvent {
        self.settings.event
    }

    fn configure(
        &mut self,
        pool: &mut dyn RenderTargetPool,
        camera_target: &CameraTargetDescriptor,
    ) -> Result<()> {
        if !self.manifest.is_empty() {
            log::warn!(
                "SSF pass configured again without cleanup; releasing {} stale targets",
                self.manifest.len()
            );
            self.manifest.release_all(pool);
        }
        self.frame = None;

        let (w, h) = (camera_target.width, camera_target.height);
        let depth = RenderTargetDescriptor::new(
            w,
            h,
            RenderTargetFormat::SingleChannelFloat,
            TargetFilterMode::Nearest,
        );
        let normal =
            RenderTargetDescriptor::new(w, h, RenderTargetFormat::Rgba8, TargetFilterMode::Nearest);

        let mut scope = AcquireScope::new(pool);
        scope.acquire(&self.depth_target, &depth)?;
        let blur = self.blur.acquire(&mut scope, &depth)?;
        scope.acquire(&self.normal_target, &normal)?;
        self.manifest = scope.commit();

        log::debug!(
            "SSF targets acquired for {}×{}: depth + normal + {} blur levels",
            w,
            h,
            blur.len()
        );

        self.frame = Some(FrameTargets {
            camera: *camera_target,
            depth,
            normal,
            blur,
        });
        Ok(())
    }

    fn execute(&self, cmd: &mut CommandBuffer, data: &RenderingData<'_>) -> Result<()> {
        let color_target = self.color_target.ok_or(SsfError::ColorTargetNotBound)?;
        let frame = self.frame.as_ref().ok_or(SsfError::FrameNotConfigured)?;

        if frame.camera.is_empty() {
            log::trace!("SSF pass skipped: zero-area camera target");
            return Ok(());
        }

        cmd.begin_sample(PROFILING_SCOPE);

        // 1. Sphere depth
        let drawn = self
            .depth_capture
            .record(cmd, self.depth_target.handle(), data);

        // 2. Blur
        let smoothed = self.blur.record(
            cmd,
            self.depth_target.handle(),
            self.programs.down_sampling,
            self.programs.up_sampling,
        );

        // 3. Normals
        normal::record(
            cmd,
            data.camera,
            smoothed,
            self.normal_target.handle(),
            self.programs.depth_normal,
        );

        // 4. Lighting
        lit::record(
            cmd,
            self.normal_target.handle(),
            color_target,
            self.programs.lit,
        );

        cmd.end_sample(PROFILING_SCOPE);

        log::trace!(
            "SSF pass recorded: {drawn} renderers, {} blur steps",
            (2 * self.blur.iterations()).saturating_sub(1)
        );
        Ok(())
    }

    fn cleanup(&mut self, pool: &mut dyn RenderTargetPool) {
        let released = self.manifest.release_all(pool);
        self.frame = None;
        log::trace!("SSF pass released {released} targets");
    }
}
