//! wgpu Command Replay
//!
//! Translates a recorded [`CommandBuffer`] into wgpu render passes on a
//! caller-provided [`wgpu::CommandEncoder`].
//!
//! # Replay
//!
//! Replay runs in two sweeps over the stream:
//!
//! 1. **Upload**: walks the commands while tracking `SetGlobal*` state and
//!    snapshots the globals every blit sees into one slot of a dynamic-offset
//!    uniform buffer. Sphere instances of every draw go into one vertex
//!    buffer. Both are written with a single `queue.write_buffer` each.
//! 2. **Encode**: one render pass per clear, draw and blit, in stream order.
//!
//! Because each blit binds its own uniform slot, a global changed between two
//! blits is observed by the second one only, exactly as the stream orders it.
//!
//! # Aliasing Blits
//!
//! A render pass cannot sample the texture it renders into. A blit whose
//! source is its destination first copies the source into a scratch texture
//! and samples that instead.
//!
//! # Depth
//!
//! `DrawRenderers` depth-tests against a `Depth32Float` buffer shared by all
//! targets of the same size. `ClearRenderTarget` with [`ClearFlags::DEPTH`]
//! clears it.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec4};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::errors::{Result, SsfError};
use crate::renderer::gpu::material::{GpuMaterial, GpuShaderProgram};
use crate::renderer::gpu::tracked::Tracked;
use crate::renderer::gpu::transient_pool::GpuTargetPool;
use crate::renderer::graph::command::{
    ClearFlags, CommandBuffer, ExecutionStats, RenderCommand, RenderTargetIdentifier,
};
use crate::renderer::graph::material::ShaderPassIndex;
use crate::renderer::graph::passes::ssf::{DEPTH_NORMAL_TEXTURE, MATRIX_CLIP_TO_VIEW};
use crate::renderer::graph::target::TargetFilterMode;
use crate::scene::camera::{RenderingData, gpu_projection_matrix};
use crate::scene::filter::ShaderTagId;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

// ─── Uniform Layouts ──────────────────────────────────────────────────────────

/// Mirrors `SsfGlobals` in `ssf_fluid.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct BlitGlobals {
    clip_to_view: Mat4,
    source_texel_size: Vec2,
    _padding: Vec2,
}

/// Mirrors `CameraUniforms` in `ssf_sphere_depth.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct CameraUniforms {
    view: Mat4,
    projection: Mat4,
}

fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

// ─── Cache Keys ───────────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct BlitBindKey {
    source_view: u64,
    source_sampler: u64,
    depth_normal_view: u64,
    depth_normal_sampler: u64,
    globals_generation: u64,
}

struct ScratchTexture {
    texture: wgpu::Texture,
    view: Tracked<wgpu::TextureView>,
}

// ─── Executor ─────────────────────────────────────────────────────────────────

pub struct GpuExecutor {
    device: wgpu::Device,
    queue: wgpu::Queue,

    blit_layout: wgpu::BindGroupLayout,
    blit_pipeline_layout: wgpu::PipelineLayout,
    camera_layout: wgpu::BindGroupLayout,
    renderer_pipeline_layout: wgpu::PipelineLayout,

    blit_pipelines: FxHashMap<(ShaderPassIndex, wgpu::TextureFormat), wgpu::RenderPipeline>,
    renderer_pipelines: FxHashMap<(ShaderTagId, wgpu::TextureFormat, bool), wgpu::RenderPipeline>,
    blit_bind_groups: FxHashMap<BlitBindKey, wgpu::BindGroup>,

    globals_buffer: wgpu::Buffer,
    globals_stride: u32,
    globals_capacity: u32,
    /// Bumped whenever `globals_buffer` is reallocated.
    globals_generation: u64,

    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    instance_buffer: wgpu::Buffer,
    instance_capacity: u64,

    /// Bound at binding 3 while no depth-normal texture is set.
    fallback_view: Tracked<wgpu::TextureView>,
    scratch: Option<ScratchTexture>,
    depth_buffers: FxHashMap<(u32, u32), wgpu::TextureView>,
}

impl GpuExecutor {
    #[must_use]
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let sampler_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };

        let blit_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("SSF Blit BindGroup Layout"),
            entries: &[
                texture_entry(0),
                sampler_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<BlitGlobals>() as u64
                        ),
                    },
                    count: None,
                },
                texture_entry(3),
                sampler_entry(4),
            ],
        });
        let blit_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("SSF Blit Pipeline Layout"),
            bind_group_layouts: &[Some(&blit_layout)],
            immediate_size: 0,
        });

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("SSF Camera BindGroup Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<CameraUniforms>() as u64
                    ),
                },
                count: None,
            }],
        });
        let renderer_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("SSF Renderer Pipeline Layout"),
                bind_group_layouts: &[Some(&camera_layout)],
                immediate_size: 0,
            });

        let min_alignment = device.limits().min_uniform_buffer_offset_alignment.max(1);
        let globals_stride = align_to(std::mem::size_of::<BlitGlobals>() as u32, min_alignment);
        let globals_buffer = Self::create_globals_buffer(device, globals_stride, 8);

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("SSF Camera Uniforms"),
            size: std::mem::size_of::<CameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("SSF Camera BindGroup"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let instance_capacity = 256 * std::mem::size_of::<Vec4>() as u64;
        let instance_buffer = Self::create_instance_buffer(device, instance_capacity);

        let fallback = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("SSF Fallback Texture"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            fallback.as_image_copy(),
            &[0u8; 4],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: None,
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        let fallback_view =
            Tracked::new(fallback.create_view(&wgpu::TextureViewDescriptor::default()));

        Self {
            device: device.clone(),
            queue: queue.clone(),
            blit_layout,
            blit_pipeline_layout,
            camera_layout,
            renderer_pipeline_layout,
            blit_pipelines: FxHashMap::default(),
            renderer_pipelines: FxHashMap::default(),
            blit_bind_groups: FxHashMap::default(),
            globals_buffer,
            globals_stride,
            globals_capacity: 8,
            globals_generation: 0,
            camera_buffer,
            camera_bind_group,
            instance_buffer,
            instance_capacity,
            fallback_view,
            scratch: None,
            depth_buffers: FxHashMap::default(),
        }
    }

    fn create_globals_buffer(device: &wgpu::Device, stride: u32, slots: u32) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("SSF Blit Globals"),
            size: u64::from(stride) * u64::from(slots),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_instance_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("SSF Sphere Instances"),
            size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Layout every blit program of a [`GpuMaterial`] is compiled against.
    #[must_use]
    pub fn blit_bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.blit_layout
    }

    #[must_use]
    pub fn camera_bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.camera_layout
    }

    /// Records `cmd` into `encoder`. Uniform and instance data are uploaded
    /// through the queue, so `encoder` must be submitted after this call.
    pub fn execute(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        cmd: &CommandBuffer,
        pool: &GpuTargetPool,
        material: &GpuMaterial,
        data: &RenderingData<'_>,
    ) -> Result<ExecutionStats> {
        let draw_ranges = self.upload(cmd, pool, data)?;
        let mut stats = ExecutionStats::default();
        let mut used_bind_groups = FxHashSet::default();
        let mut blit_slot = 0u32;
        let mut draw_index = 0usize;
        let mut depth_normal: Option<RenderTargetIdentifier> = None;

        for command in cmd {
            match command {
                RenderCommand::BeginSample(name) => encoder.push_debug_group(name),
                RenderCommand::EndSample(_) => encoder.pop_debug_group(),
                RenderCommand::ClearRenderTarget {
                    target,
                    flags,
                    color,
                } => {
                    self.encode_clear(encoder, pool, data, *target, *flags, *color)?;
                    stats.clears += 1;
                }
                RenderCommand::DrawRenderers {
                    target, shader_tag, ..
                } => {
                    let range = draw_ranges[draw_index].clone();
                    draw_index += 1;
                    let drawn = range.len() as u32;
                    self.encode_draw(encoder, pool, material, data, *target, *shader_tag, range)?;
                    stats.draws += 1;
                    stats.renderers_drawn += drawn;
                }
                RenderCommand::Blit {
                    source,
                    destination,
                    pass,
                } => {
                    let key = self.encode_blit(
                        encoder,
                        pool,
                        material,
                        *source,
                        *destination,
                        *pass,
                        depth_normal,
                        blit_slot,
                    )?;
                    used_bind_groups.insert(key);
                    blit_slot += 1;
                    stats.blits += 1;
                }
                RenderCommand::SetGlobalMatrix { .. } => {}
                RenderCommand::SetGlobalTexture { name, target } => {
                    if *name == DEPTH_NORMAL_TEXTURE {
                        depth_normal = Some(*target);
                    }
                }
            }
        }

        // Bind groups over textures not seen this frame may reference
        // recycled or dropped views.
        self.blit_bind_groups
            .retain(|key, _| used_bind_groups.contains(key));

        log::debug!("[{}] encoded: {stats:?}", cmd.name());
        Ok(stats)
    }

    // ── Upload sweep ───────────────────────────────────────────────────────

    fn upload(
        &mut self,
        cmd: &CommandBuffer,
        pool: &GpuTargetPool,
        data: &RenderingData<'_>,
    ) -> Result<Vec<std::ops::Range<u32>>> {
        let mut clip_to_view = Mat4::IDENTITY;
        let mut globals: Vec<BlitGlobals> = Vec::new();
        let mut instances: Vec<Vec4> = Vec::new();
        let mut draw_ranges = Vec::new();

        for command in cmd {
            match command {
                RenderCommand::SetGlobalMatrix { name, value } => {
                    if *name == MATRIX_CLIP_TO_VIEW {
                        clip_to_view = *value;
                    } else {
                        log::trace!("global matrix '{name}' has no slot in the blit layout");
                    }
                }
                RenderCommand::Blit { source, .. } => {
                    let texture = pool.target(*source)?.texture;
                    globals.push(BlitGlobals {
                        clip_to_view,
                        source_texel_size: Vec2::new(
                            1.0 / texture.width() as f32,
                            1.0 / texture.height() as f32,
                        ),
                        _padding: Vec2::ZERO,
                    });
                }
                RenderCommand::DrawRenderers { renderers, .. } => {
                    let start = instances.len() as u32;
                    instances.extend(renderers.iter().filter_map(|id| {
                        let renderer = data.cull_results.get(*id);
                        if renderer.is_none() {
                            log::warn!("renderer {id} is not in the cull results");
                        }
                        renderer.map(|r| r.sphere.center.extend(r.sphere.radius))
                    }));
                    draw_ranges.push(start..instances.len() as u32);
                }
                _ => {}
            }
        }

        if !globals.is_empty() {
            let slots = globals.len() as u32;
            if slots > self.globals_capacity {
                let capacity = slots.next_power_of_two();
                self.globals_buffer =
                    Self::create_globals_buffer(&self.device, self.globals_stride, capacity);
                self.globals_capacity = capacity;
                self.globals_generation += 1;
                self.blit_bind_groups.clear();
            }

            let stride = self.globals_stride as usize;
            let mut bytes = vec![0u8; stride * globals.len()];
            for (slot, g) in bytes.chunks_exact_mut(stride).zip(&globals) {
                slot[..std::mem::size_of::<BlitGlobals>()].copy_from_slice(bytemuck::bytes_of(g));
            }
            self.queue.write_buffer(&self.globals_buffer, 0, &bytes);
        }

        if !instances.is_empty() {
            let size = std::mem::size_of_val(instances.as_slice()) as u64;
            if size > self.instance_capacity {
                self.instance_capacity = size.next_power_of_two();
                self.instance_buffer =
                    Self::create_instance_buffer(&self.device, self.instance_capacity);
            }
            self.queue
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));

            let camera = data.camera;
            let uniforms = CameraUniforms {
                view: camera.view,
                projection: gpu_projection_matrix(camera.projection, true, camera.clip_space),
            };
            self.queue
                .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&uniforms));
        }

        Ok(draw_ranges)
    }

    // ── Encode sweep ───────────────────────────────────────────────────────

    fn depth_view(&mut self, width: u32, height: u32) -> wgpu::TextureView {
        let device = &self.device;
        self.depth_buffers
            .entry((width, height))
            .or_insert_with(|| {
                log::debug!("Creating SSF depth buffer {width}x{height}");
                device
                    .create_texture(&wgpu::TextureDescriptor {
                        label: Some("SSF Depth Buffer"),
                        size: wgpu::Extent3d {
                            width,
                            height,
                            depth_or_array_layers: 1,
                        },
                        mip_level_count: 1,
                        sample_count: 1,
                        dimension: wgpu::TextureDimension::D2,
                        format: DEPTH_FORMAT,
                        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                        view_formats: &[],
                    })
                    .create_view(&wgpu::TextureViewDescriptor::default())
            })
            .clone()
    }

    fn encode_clear(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        pool: &GpuTargetPool,
        data: &RenderingData<'_>,
        target: RenderTargetIdentifier,
        flags: ClearFlags,
        color: Vec4,
    ) -> Result<()> {
        let target = pool.target(target)?;
        let depth_view = flags
            .contains(ClearFlags::DEPTH)
            .then(|| self.depth_view(target.texture.width(), target.texture.height()));
        let far = if data.camera.clip_space.reversed_z {
            0.0
        } else {
            1.0
        };

        let color_load = if flags.contains(ClearFlags::COLOR) {
            wgpu::LoadOp::Clear(wgpu::Color {
                r: f64::from(color.x),
                g: f64::from(color.y),
                b: f64::from(color.z),
                a: f64::from(color.w),
            })
        } else {
            wgpu::LoadOp::Load
        };

        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("SSF Clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: depth_view.as_ref().map(|view| {
                wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(far),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }
            }),
            ..Default::default()
        });
        Ok(())
    }

    fn encode_draw(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        pool: &GpuTargetPool,
        material: &GpuMaterial,
        data: &RenderingData<'_>,
        target: RenderTargetIdentifier,
        shader_tag: ShaderTagId,
        instances: std::ops::Range<u32>,
    ) -> Result<()> {
        let Some(program) = material.renderer_program(shader_tag) else {
            log::warn!(
                "material has no renderer program for tag {:#018x}; draw skipped",
                shader_tag.to_u64()
            );
            return Ok(());
        };
        if instances.is_empty() {
            return Ok(());
        }

        let target = pool.target(target)?;
        let format = target.texture.format();
        let reversed_z = data.camera.clip_space.reversed_z;
        let depth_view = self.depth_view(target.texture.width(), target.texture.height());

        let pipeline = {
            let device = &self.device;
            let layout = &self.renderer_pipeline_layout;
            self.renderer_pipelines
                .entry((shader_tag, format, reversed_z))
                .or_insert_with(|| {
                    create_renderer_pipeline(device, layout, program, format, reversed_z)
                })
                .clone()
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&program.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });
        pass.set_pipeline(&pipeline);
        pass.set_bind_group(0, &self.camera_bind_group, &[]);
        pass.set_vertex_buffer(0, self.instance_buffer.slice(..));
        pass.draw(0..6, instances);
        Ok(())
    }

    fn encode_blit(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        pool: &GpuTargetPool,
        material: &GpuMaterial,
        source: RenderTargetIdentifier,
        destination: RenderTargetIdentifier,
        pass_index: ShaderPassIndex,
        depth_normal: Option<RenderTargetIdentifier>,
        slot: u32,
    ) -> Result<BlitBindKey> {
        let program = material
            .pass(pass_index)
            .ok_or(SsfError::ShaderPassOutOfRange(pass_index))?;
        let src = pool.target(source)?;
        let dst = pool.target(destination)?;
        let format = dst.texture.format();

        let source_view = if source == destination {
            self.snapshot(encoder, src.texture)
        } else {
            src.view.clone()
        };
        let source_sampler = pool.sampler(src.filter);

        let (dn_view, dn_sampler) = match depth_normal {
            Some(target) => {
                let dn = pool.target(target)?;
                (dn.view.clone(), pool.sampler(dn.filter))
            }
            None => (
                self.fallback_view.clone(),
                pool.sampler(TargetFilterMode::Nearest),
            ),
        };

        let key = BlitBindKey {
            source_view: source_view.id(),
            source_sampler: source_sampler.id(),
            depth_normal_view: dn_view.id(),
            depth_normal_sampler: dn_sampler.id(),
            globals_generation: self.globals_generation,
        };
        let bind_group = {
            let device = &self.device;
            let layout = &self.blit_layout;
            let globals = &self.globals_buffer;
            self.blit_bind_groups
                .entry(key)
                .or_insert_with(|| {
                    device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some("SSF Blit BindGroup"),
                        layout,
                        entries: &[
                            wgpu::BindGroupEntry {
                                binding: 0,
                                resource: wgpu::BindingResource::TextureView(&source_view),
                            },
                            wgpu::BindGroupEntry {
                                binding: 1,
                                resource: wgpu::BindingResource::Sampler(source_sampler),
                            },
                            wgpu::BindGroupEntry {
                                binding: 2,
                                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                                    buffer: globals,
                                    offset: 0,
                                    size: wgpu::BufferSize::new(
                                        std::mem::size_of::<BlitGlobals>() as u64,
                                    ),
                                }),
                            },
                            wgpu::BindGroupEntry {
                                binding: 3,
                                resource: wgpu::BindingResource::TextureView(&dn_view),
                            },
                            wgpu::BindGroupEntry {
                                binding: 4,
                                resource: wgpu::BindingResource::Sampler(dn_sampler),
                            },
                        ],
                    })
                })
                .clone()
        };

        let pipeline = {
            let device = &self.device;
            let layout = &self.blit_pipeline_layout;
            self.blit_pipelines
                .entry((pass_index, format))
                .or_insert_with(|| create_blit_pipeline(device, layout, program, format))
                .clone()
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&program.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: dst.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: blit_load_op(destination, program.blend.is_some()),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            ..Default::default()
        });
        pass.set_pipeline(&pipeline);
        pass.set_bind_group(0, &bind_group, &[slot * self.globals_stride]);
        pass.draw(0..3, 0..1);

        Ok(key)
    }

    /// Copies `source` into the scratch texture and returns its view. The
    /// scratch texture is reallocated when size or format change.
    fn snapshot(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        source: &wgpu::Texture,
    ) -> Tracked<wgpu::TextureView> {
        let size = source.size();
        let format = source.format();

        let scratch = match self.scratch.take() {
            Some(s) if s.texture.size() == size && s.texture.format() == format => s,
            _ => {
                log::debug!(
                    "Creating SSF scratch texture {}x{} {format:?}",
                    size.width,
                    size.height
                );
                let texture = self.device.create_texture(&wgpu::TextureDescriptor {
                    label: Some("SSF Blit Scratch"),
                    size,
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                    view_formats: &[],
                });
                let view =
                    Tracked::new(texture.create_view(&wgpu::TextureViewDescriptor::default()));
                ScratchTexture { texture, view }
            }
        };

        encoder.copy_texture_to_texture(
            source.as_image_copy(),
            scratch.texture.as_image_copy(),
            size,
        );
        let view = scratch.view.clone();
        self.scratch = Some(scratch);
        view
    }
}

// ─── Pipeline Construction ────────────────────────────────────────────────────

fn create_blit_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    program: &GpuShaderProgram,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    log::debug!("Compiling SSF blit pipeline '{}' for {format:?}", program.label);

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&program.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &program.module,
            entry_point: Some(program.vertex_entry),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &program.module,
            entry_point: Some(program.fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: program.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

fn create_renderer_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    program: &GpuShaderProgram,
    format: wgpu::TextureFormat,
    reversed_z: bool,
) -> wgpu::RenderPipeline {
    log::debug!(
        "Compiling SSF renderer pipeline '{}' for {format:?}",
        program.label
    );

    let instance_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vec4>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &wgpu::vertex_attr_array![0 => Float32x4],
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&program.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &program.module,
            entry_point: Some(program.vertex_entry),
            buffers: &[instance_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &program.module,
            entry_point: Some(program.fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: program.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: Some(true),
            depth_compare: if reversed_z {
                Some(wgpu::CompareFunction::Greater)
            } else {
                Some(wgpu::CompareFunction::Less)
            },
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

/// Camera targets and blended programs keep the destination contents; a
/// plain blit into a pass-owned target overwrites every texel.
fn blit_load_op(
    destination: RenderTargetIdentifier,
    blended: bool,
) -> wgpu::LoadOp<wgpu::Color> {
    if blended || matches!(destination, RenderTargetIdentifier::Camera(_)) {
        wgpu::LoadOp::Load
    } else {
        wgpu::LoadOp::Clear(wgpu::Color::BLACK)
    }
}
