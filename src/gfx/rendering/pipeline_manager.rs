//! Render pipeline variants for linked shader programs
//!
//! A linked program can be drawn with different primitive topologies and with
//! or without alpha blending. Each combination needs its own wgpu pipeline;
//! variants are created lazily on first use and cached until the program is
//! deleted.

use std::{collections::HashMap, sync::Arc};
use wgpu::*;

use super::{draw::Topology, vertex::Vertex3D};
use crate::gfx::shader::ProgramHandle;

/// Vertex and fragment modules of one linked program
#[derive(Debug, Clone)]
pub struct ProgramModules {
    pub vertex: ShaderModule,
    pub vertex_entry: String,
    pub fragment: ShaderModule,
    pub fragment_entry: String,
}

/// Render state of one pipeline variant
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub label: String,
    pub primitive_topology: PrimitiveTopology,
    pub cull_mode: Option<Face>,
    pub color_format: TextureFormat,
    pub depth_format: Option<TextureFormat>,
    pub blend: BlendState,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            label: "Default Pipeline".to_string(),
            primitive_topology: PrimitiveTopology::TriangleList,
            cull_mode: None,
            color_format: TextureFormat::Bgra8Unorm,
            depth_format: None,
            blend: BlendState::REPLACE,
        }
    }
}

impl PipelineConfig {
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_owned();
        self
    }

    pub fn with_primitive_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.primitive_topology = topology;
        self
    }

    pub fn with_color_format(mut self, format: TextureFormat) -> Self {
        self.color_format = format;
        self
    }

    /// Enables depth testing against a buffer of `format`
    pub fn with_depth_format(mut self, format: TextureFormat) -> Self {
        self.depth_format = Some(format);
        self
    }

    /// Source-alpha / one-minus-source-alpha blending when `enabled`
    pub fn with_alpha_blending(mut self, enabled: bool) -> Self {
        self.blend = if enabled {
            BlendState::ALPHA_BLENDING
        } else {
            BlendState::REPLACE
        };
        self
    }
}

/// Identifies one cached pipeline variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub program: ProgramHandle,
    pub topology: Topology,
    pub blend: bool,
}

/// Caches pipeline variants per program
pub struct PipelineManager {
    device: Arc<Device>,
    layout: PipelineLayout,
    color_format: TextureFormat,
    depth_format: TextureFormat,
    pipelines: HashMap<PipelineKey, RenderPipeline>,
}

impl PipelineManager {
    /// Creates a manager whose pipelines all share `bind_group_layouts`
    pub fn new(
        device: Arc<Device>,
        bind_group_layouts: &[&BindGroupLayout],
        color_format: TextureFormat,
        depth_format: TextureFormat,
    ) -> Self {
        let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Program Pipeline Layout"),
            bind_group_layouts,
            push_constant_ranges: &[],
        });

        Self {
            device,
            layout,
            color_format,
            depth_format,
            pipelines: HashMap::new(),
        }
    }

    /// Render state for a key, before it is turned into a pipeline
    pub fn config_for(&self, label: &str, key: PipelineKey) -> PipelineConfig {
        let blend = if key.blend { " blended" } else { "" };
        PipelineConfig::default()
            .with_label(&format!("{} {:?}{}", label, key.topology, blend))
            .with_primitive_topology(key.topology.to_wgpu())
            .with_color_format(self.color_format)
            .with_depth_format(self.depth_format)
            .with_alpha_blending(key.blend)
    }

    /// Builds and caches a variant unless it already exists
    pub fn ensure_pipeline(&mut self, key: PipelineKey, label: &str, modules: &ProgramModules) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        let config = self.config_for(label, key);
        let pipeline = self.create_pipeline(&config, modules);
        self.pipelines.insert(key, pipeline);
    }

    pub fn insert_pipeline(&mut self, key: PipelineKey, pipeline: RenderPipeline) {
        self.pipelines.insert(key, pipeline);
    }

    pub fn get_pipeline(&self, key: &PipelineKey) -> Option<&RenderPipeline> {
        self.pipelines.get(key)
    }

    /// Drops every variant built for `program`
    pub fn remove_program(&mut self, program: ProgramHandle) {
        self.pipelines.retain(|key, _| key.program != program);
    }

    /// Creates a render pipeline from configuration
    pub fn create_pipeline(&self, config: &PipelineConfig, modules: &ProgramModules) -> RenderPipeline {
        let color_targets = [Some(ColorTargetState {
            format: config.color_format,
            blend: Some(config.blend),
            write_mask: ColorWrites::ALL,
        })];

        let depth_stencil = config.depth_format.map(|format| DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: CompareFunction::Less,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        });

        self.device
            .create_render_pipeline(&RenderPipelineDescriptor {
                label: Some(&config.label),
                layout: Some(&self.layout),
                vertex: VertexState {
                    module: &modules.vertex,
                    entry_point: Some(&modules.vertex_entry),
                    buffers: &[Vertex3D::desc()],
                    compilation_options: PipelineCompilationOptions::default(),
                },
                fragment: Some(FragmentState {
                    module: &modules.fragment,
                    entry_point: Some(&modules.fragment_entry),
                    targets: &color_targets,
                    compilation_options: PipelineCompilationOptions::default(),
                }),
                primitive: PrimitiveState {
                    topology: config.primitive_topology,
                    strip_index_format: None,
                    front_face: FrontFace::Ccw,
                    cull_mode: config.cull_mode,
                    polygon_mode: PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil,
                multisample: MultisampleState::default(),
                multiview: None,
                cache: None,
            })
    }
}
