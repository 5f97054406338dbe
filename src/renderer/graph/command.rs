//! Recorded render commands
//!
//! Passes never talk to a GPU API directly. During **execute** they record an
//! ordered [`CommandBuffer`]; a backend (the wgpu executor or the CPU
//! reference executor) replays it later. Every command observes the effects
//! of all earlier commands in the same buffer.

use std::fmt;

use bitflags::bitflags;
use glam::{Mat4, Vec4};

use crate::renderer::graph::material::ShaderPassIndex;
use crate::renderer::graph::target::RenderTargetHandle;
use crate::scene::cull::RendererId;
use crate::scene::filter::{PerObjectData, ShaderTagId};

/// Host-assigned identifier of a camera color target.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CameraTargetId(pub u32);

/// Where a command reads from or writes to.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTargetIdentifier {
    /// A pass-owned target acquired from the frame's pool.
    Temporary(RenderTargetHandle),
    /// The camera's color buffer, borrowed from the host.
    Camera(CameraTargetId),
}

impl fmt::Debug for RenderTargetIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temporary(handle) => write!(f, "Temporary({:#018x})", handle.to_u64()),
            Self::Camera(id) => write!(f, "Camera({})", id.0),
        }
    }
}

impl From<RenderTargetHandle> for RenderTargetIdentifier {
    fn from(handle: RenderTargetHandle) -> Self {
        Self::Temporary(handle)
    }
}

impl From<CameraTargetId> for RenderTargetIdentifier {
    fn from(id: CameraTargetId) -> Self {
        Self::Camera(id)
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u8 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
        const ALL = Self::COLOR.bits() | Self::DEPTH.bits() | Self::STENCIL.bits();
    }
}

/// One recorded operation.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderCommand {
    /// Opens a named profiling/debug scope.
    BeginSample(&'static str),
    /// Closes the innermost profiling/debug scope.
    EndSample(&'static str),
    ClearRenderTarget {
        target: RenderTargetIdentifier,
        flags: ClearFlags,
        color: Vec4,
    },
    /// Draws `renderers` (already filtered and sorted) with the sub-program
    /// tagged `shader_tag`.
    DrawRenderers {
        target: RenderTargetIdentifier,
        shader_tag: ShaderTagId,
        per_object_data: PerObjectData,
        renderers: Vec<RendererId>,
    },
    /// Full-target copy of `source` into `destination` through `pass`.
    Blit {
        source: RenderTargetIdentifier,
        destination: RenderTargetIdentifier,
        pass: ShaderPassIndex,
    },
    SetGlobalMatrix {
        name: &'static str,
        value: Mat4,
    },
    SetGlobalTexture {
        name: &'static str,
        target: RenderTargetIdentifier,
    },
}

/// A single blit, as returned by [`CommandBuffer::blits`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlitRecord {
    pub source: RenderTargetIdentifier,
    pub destination: RenderTargetIdentifier,
    pub pass: ShaderPassIndex,
}

/// Counters reported by a backend after replaying a [`CommandBuffer`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    pub clears: u32,
    pub draws: u32,
    pub renderers_drawn: u32,
    pub blits: u32,
}

/// Ordered command stream for one pass execution.
#[derive(Clone, Debug, Default)]
pub struct CommandBuffer {
    name: String,
    commands: Vec<RenderCommand>,
}

impl CommandBuffer {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: Vec::with_capacity(32),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    // ── Recording ──────────────────────────────────────────────────────────

    pub fn begin_sample(&mut self, name: &'static str) {
        self.push(RenderCommand::BeginSample(name));
    }

    pub fn end_sample(&mut self, name: &'static str) {
        self.push(RenderCommand::EndSample(name));
    }

    pub fn clear_render_target(
        &mut self,
        target: impl Into<RenderTargetIdentifier>,
        flags: ClearFlags,
        color: Vec4,
    ) {
        self.push(RenderCommand::ClearRenderTarget {
            target: target.into(),
            flags,
            color,
        });
    }

    pub fn draw_renderers(
        &mut self,
        target: impl Into<RenderTargetIdentifier>,
        shader_tag: ShaderTagId,
        per_object_data: PerObjectData,
        renderers: Vec<RendererId>,
    ) {
        self.push(RenderCommand::DrawRenderers {
            target: target.into(),
            shader_tag,
            per_object_data,
            renderers,
        });
    }

    pub fn blit(
        &mut self,
        source: impl Into<RenderTargetIdentifier>,
        destination: impl Into<RenderTargetIdentifier>,
        pass: ShaderPassIndex,
    ) {
        self.push(RenderCommand::Blit {
            source: source.into(),
            destination: destination.into(),
            pass,
        });
    }

    pub fn set_global_matrix(&mut self, name: &'static str, value: Mat4) {
        self.push(RenderCommand::SetGlobalMatrix { name, value });
    }

    pub fn set_global_texture(
        &mut self,
        name: &'static str,
        target: impl Into<RenderTargetIdentifier>,
    ) {
        self.push(RenderCommand::SetGlobalTexture {
            name,
            target: target.into(),
        });
    }

    fn push(&mut self, command: RenderCommand) {
        log::trace!("[{}] {:?}", self.name, command);
        self.commands.push(command);
    }

    // ── Inspection ─────────────────────────────────────────────────────────

    #[must_use]
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RenderCommand> {
        self.commands.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// All blits in record order.
    pub fn blits(&self) -> impl Iterator<Item = BlitRecord> + '_ {
        self.commands.iter().filter_map(|command| match *command {
            RenderCommand::Blit {
                source,
                destination,
                pass,
            } => Some(BlitRecord {
                source,
                destination,
                pass,
            }),
            _ => None,
        })
    }

    /// Forgets all recorded commands, keeping the allocation.
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl<'a> IntoIterator for &'a CommandBuffer {
    type Item = &'a RenderCommand;
    type IntoIter = std::slice::Iter<'a, RenderCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}
