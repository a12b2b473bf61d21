//! WGPU-based rendering engine
//!
//! Implements [`ShaderBackend`] and [`DrawBackend`] on top of wgpu. The scene
//! composer drives it in immediate-mode style; draws are recorded during the
//! frame and replayed in order into a single depth-tested render pass when
//! the frame ends.
//!
//! Every program reads its uniforms from `@group(0) @binding(0)`. Uniform
//! writes land in a per-program staging block; each draw snapshots that block
//! into a slot of the per-frame uniform arena and binds it with a dynamic
//! offset. Textures live in `@group(1)`.

use log::{debug, error, warn};
use std::{collections::HashMap, num::NonZeroU64, sync::Arc};
use thiserror::Error;
use wgpu::util::DeviceExt;

use super::{
    draw::{DrawBackend, MeshHandle, TextureHandle, Topology},
    pipeline_manager::{PipelineKey, PipelineManager, ProgramModules},
};
use crate::gfx::{
    geometry::GeometryData,
    resources::texture_resource::{TextureImage, TextureResource},
    shader::{
        reflect::{reflect_stage, UniformBlock, TEXTURE_GROUP, UNIFORM_GROUP},
        ProgramHandle, ShaderBackend, StageHandle, StageKind, UniformLocation, UniformValue,
    },
};

/// Size of one uniform arena slot; also the largest uniform block a
/// program may declare
pub const UNIFORM_SLOT_SIZE: u64 = 256;

const INITIAL_ARENA_SLOTS: u64 = 64;

/// Failure to bring up the device
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable graphics adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("cannot open graphics device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}

struct CompiledStage {
    kind: StageKind,
    module: wgpu::ShaderModule,
    entry_point: String,
    uniform_block: Option<UniformBlock>,
}

struct LinkedProgram {
    label: String,
    modules: ProgramModules,
    uniform_block: UniformBlock,
    staging: Vec<u8>,
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: Option<wgpu::Buffer>,
    element_count: u32,
    topology: Topology,
}

struct GpuTexture {
    // Kept alive for the bind group
    _resource: TextureResource,
    bind_group: wgpu::BindGroup,
}

/// Uniform slots written during one frame
struct UniformArena {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: u64,
    bytes: Vec<u8>,
}

impl UniformArena {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, capacity: u64) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Uniform Arena"),
            size: capacity * UNIFORM_SLOT_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform Arena Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(UNIFORM_SLOT_SIZE),
                }),
            }],
        });

        Self {
            buffer,
            bind_group,
            capacity,
            bytes: Vec::new(),
        }
    }

    /// Appends a block and returns its dynamic offset
    fn push(&mut self, block: &[u8]) -> u32 {
        let offset = self.bytes.len();
        self.bytes.extend_from_slice(block);
        self.bytes.resize(offset + UNIFORM_SLOT_SIZE as usize, 0);
        offset as u32
    }

    fn slots_used(&self) -> u64 {
        self.bytes.len() as u64 / UNIFORM_SLOT_SIZE
    }
}

struct DrawCall {
    key: PipelineKey,
    mesh: MeshHandle,
    texture: Option<TextureHandle>,
    uniform_offset: u32,
}

#[derive(Default)]
struct FrameState {
    program: Option<ProgramHandle>,
    texture: Option<TextureHandle>,
    blending: bool,
    draws: Vec<DrawCall>,
}

/// Core rendering engine managing GPU resources and draw calls
pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    pipeline_manager: PipelineManager,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    arena: UniformArena,
    white_texture: GpuTexture,
    stages: HashMap<StageHandle, CompiledStage>,
    programs: HashMap<ProgramHandle, LinkedProgram>,
    meshes: Vec<GpuMesh>,
    textures: Vec<GpuTexture>,
    frame: FrameState,
    next_handle: u32,
}

impl RenderEngine {
    /// Creates a new rendering engine for a window surface
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<RenderEngine, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = TextureResource::create_depth_texture(&device, &config, "depth_texture");

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_manager = PipelineManager::new(
            device.clone(),
            &[&uniform_layout, &texture_layout],
            format,
            TextureResource::DEPTH_FORMAT,
        );
        let arena = UniformArena::new(&device, &uniform_layout, INITIAL_ARENA_SLOTS);
        let white_texture =
            Self::create_gpu_texture(&device, &queue, &texture_layout, &TextureImage::white(), "white");

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth_texture,
            pipeline_manager,
            uniform_layout,
            texture_layout,
            arena,
            white_texture,
            stages: HashMap::new(),
            programs: HashMap::new(),
            meshes: Vec::new(),
            textures: Vec::new(),
            frame: FrameState::default(),
            next_handle: 1,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn allocate_handle(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn create_gpu_texture(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        image: &TextureImage,
        label: &str,
    ) -> GpuTexture {
        let resource = TextureResource::create_from_image(device, queue, image, label);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&resource.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&resource.sampler),
                },
            ],
        });

        GpuTexture {
            _resource: resource,
            bind_group,
        }
    }

    /// Runs `create` inside a validation error scope
    fn with_validation<T>(&self, create: impl FnOnce(&wgpu::Device) -> T) -> Result<T, String> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create(&self.device);
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(err.to_string()),
            None => Ok(value),
        }
    }

    /// Grows the uniform arena if this frame used more slots than it holds
    fn ensure_arena_capacity(&mut self) {
        let needed = self.arena.slots_used();
        if needed <= self.arena.capacity {
            return;
        }
        let capacity = needed.next_power_of_two();
        debug!("Growing uniform arena to {} slots", capacity);
        let bytes = std::mem::take(&mut self.arena.bytes);
        self.arena = UniformArena::new(&self.device, &self.uniform_layout, capacity);
        self.arena.bytes = bytes;
    }

    fn texture_bind_group(&self, texture: Option<TextureHandle>) -> &wgpu::BindGroup {
        texture
            .and_then(|handle| self.textures.get(handle.0 as usize))
            .map(|texture| &texture.bind_group)
            .unwrap_or(&self.white_texture.bind_group)
    }
}

impl ShaderBackend for RenderEngine {
    fn compile_stage(
        &mut self,
        kind: StageKind,
        label: &str,
        source: &str,
    ) -> Result<StageHandle, String> {
        let reflected = reflect_stage(kind, source)?;
        if let Some(block) = &reflected.uniform_block {
            if u64::from(block.size) > UNIFORM_SLOT_SIZE {
                return Err(format!(
                    "uniform block is {} bytes, at most {} are supported",
                    block.size, UNIFORM_SLOT_SIZE
                ));
            }
        }

        let module = self.with_validation(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        })?;

        let handle = StageHandle(self.allocate_handle());
        self.stages.insert(
            handle,
            CompiledStage {
                kind,
                module,
                entry_point: reflected.entry_point,
                uniform_block: reflected.uniform_block,
            },
        );
        Ok(handle)
    }

    fn link_program(
        &mut self,
        label: &str,
        stages: &[StageHandle],
    ) -> Result<ProgramHandle, String> {
        let mut vertex = None;
        let mut fragment = None;
        let mut uniform_block = UniformBlock::default();

        for handle in stages {
            let stage = self
                .stages
                .get(handle)
                .ok_or_else(|| format!("unknown stage {:?}", handle))?;
            match stage.kind {
                StageKind::Vertex => vertex = Some(stage),
                StageKind::Fragment => fragment = Some(stage),
                StageKind::Geometry => {
                    return Err("geometry stages cannot be linked on this backend".to_owned())
                }
            }
            if let Some(block) = &stage.uniform_block {
                uniform_block = uniform_block.merge(block)?;
            }
        }

        let (Some(vertex), Some(fragment)) = (vertex, fragment) else {
            return Err("a program needs both a vertex and a fragment stage".to_owned());
        };

        let modules = ProgramModules {
            vertex: vertex.module.clone(),
            vertex_entry: vertex.entry_point.clone(),
            fragment: fragment.module.clone(),
            fragment_entry: fragment.entry_point.clone(),
        };

        let handle = ProgramHandle(self.allocate_handle());
        let key = PipelineKey {
            program: handle,
            topology: Topology::Triangles,
            blend: false,
        };
        let config = self.pipeline_manager.config_for(label, key);
        let pipeline =
            self.with_validation(|_| self.pipeline_manager.create_pipeline(&config, &modules))?;
        self.pipeline_manager.insert_pipeline(key, pipeline);

        let staging = vec![0u8; uniform_block.size as usize];
        self.programs.insert(
            handle,
            LinkedProgram {
                label: label.to_owned(),
                modules,
                uniform_block,
                staging,
            },
        );
        Ok(handle)
    }

    fn delete_stage(&mut self, stage: StageHandle) {
        self.stages.remove(&stage);
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        if self.programs.remove(&program).is_some() {
            self.pipeline_manager.remove_program(program);
        }
        if self.frame.program == Some(program) {
            self.frame.program = None;
        }
    }

    fn bind_program(&mut self, program: Option<ProgramHandle>) {
        self.frame.program = program.filter(|handle| self.programs.contains_key(handle));
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let program = self.programs.get(&program)?;
        program
            .uniform_block
            .member(name)
            .map(|(index, _)| UniformLocation(index as u32))
    }

    fn write_uniform(
        &mut self,
        program: ProgramHandle,
        location: UniformLocation,
        value: UniformValue,
    ) -> Result<(), String> {
        let program = self
            .programs
            .get_mut(&program)
            .ok_or_else(|| format!("unknown program {:?}", program))?;
        let member = program
            .uniform_block
            .members
            .get(location.0 as usize)
            .ok_or_else(|| format!("invalid uniform location {}", location.0))?;

        let start = member.offset as usize;
        let end = start + member.ty.size() as usize;
        let dst = program
            .staging
            .get_mut(start..end)
            .ok_or_else(|| format!("uniform '{}' lies outside its block", member.name))?;
        member.ty.encode(value, dst)
    }

    fn live_object_count(&self) -> usize {
        self.stages.len() + self.programs.len()
    }
}

impl DrawBackend for RenderEngine {
    fn upload_mesh(&mut self, label: &str, mesh: &GeometryData) -> MeshHandle {
        let vertices = mesh.to_vertices();
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Vertex Buffer", label)),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = (!mesh.indices.is_empty()).then(|| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} Index Buffer", label)),
                    contents: bytemuck::cast_slice(&mesh.indices),
                    usage: wgpu::BufferUsages::INDEX,
                })
        });

        self.meshes.push(GpuMesh {
            vertex_buffer,
            index_buffer,
            element_count: mesh.element_count(),
            topology: mesh.topology,
        });
        MeshHandle(self.meshes.len() as u32 - 1)
    }

    fn upload_texture(&mut self, label: &str, image: &TextureImage) -> TextureHandle {
        let texture = Self::create_gpu_texture(
            &self.device,
            &self.queue,
            &self.texture_layout,
            image,
            label,
        );
        self.textures.push(texture);
        TextureHandle(self.textures.len() as u32 - 1)
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, &self.config, "depth_texture");
    }

    fn begin_frame(&mut self) {
        self.frame = FrameState::default();
        self.arena.bytes.clear();
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>) {
        if unit != 0 {
            warn!("Texture unit {} is not supported, binding to unit 0", unit);
        }
        self.frame.texture = texture;
    }

    fn set_blending(&mut self, enabled: bool) {
        self.frame.blending = enabled;
    }

    fn draw_mesh(&mut self, mesh: MeshHandle) {
        let Some(program_handle) = self.frame.program else {
            debug!("Draw of mesh {:?} skipped: no program bound", mesh);
            return;
        };
        let Some(gpu_mesh) = self.meshes.get(mesh.0 as usize) else {
            warn!("Draw of unknown mesh {:?} skipped", mesh);
            return;
        };
        let Some(program) = self.programs.get(&program_handle) else {
            return;
        };

        let key = PipelineKey {
            program: program_handle,
            topology: gpu_mesh.topology,
            blend: self.frame.blending,
        };
        self.pipeline_manager
            .ensure_pipeline(key, &program.label, &program.modules);

        let uniform_offset = self.arena.push(&program.staging);
        self.frame.draws.push(DrawCall {
            key,
            mesh,
            texture: self.frame.texture,
            uniform_offset,
        });
    }

    fn end_frame(&mut self) {
        self.ensure_arena_capacity();
        if !self.arena.bytes.is_empty() {
            self.queue
                .write_buffer(&self.arena.buffer, 0, &self.arena.bytes);
        }

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(err) => {
                error!("Cannot acquire surface texture: {}", err);
                return;
            }
        };
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for draw in &self.frame.draws {
                let (Some(pipeline), Some(mesh)) = (
                    self.pipeline_manager.get_pipeline(&draw.key),
                    self.meshes.get(draw.mesh.0 as usize),
                ) else {
                    continue;
                };

                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(
                    UNIFORM_GROUP,
                    &self.arena.bind_group,
                    &[draw.uniform_offset],
                );
                render_pass.set_bind_group(
                    TEXTURE_GROUP,
                    self.texture_bind_group(draw.texture),
                    &[],
                );
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                match &mesh.index_buffer {
                    Some(indices) => {
                        render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(0..mesh.element_count, 0, 0..1);
                    }
                    None => render_pass.draw(0..mesh.element_count, 0..1),
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        self.frame.draws.clear();
    }
}
