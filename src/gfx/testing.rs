//! GPU-free backend and file helpers for unit tests

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use tempfile::TempDir;

use crate::gfx::{
    geometry::GeometryData,
    rendering::{DrawBackend, MeshHandle, TextureHandle},
    resources::TextureImage,
    shader::{
        ProgramHandle, ShaderBackend, StageHandle, StageKind, UniformLocation, UniformValue,
    },
};

/// One call observed by [`RecordingBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    Bind(Option<ProgramHandle>),
    Uniform {
        program: ProgramHandle,
        name: String,
        value: UniformValue,
    },
    BindTexture(u32, Option<TextureHandle>),
    Blend(bool),
    Draw {
        program: ProgramHandle,
        mesh: MeshHandle,
    },
    BeginFrame,
    EndFrame,
    Resize(u32, u32),
}

/// Records every backend call instead of talking to a device
///
/// Sources containing `COMPILE_ERROR` fail to compile; a program fails to
/// link when any of its stage sources contains `LINK_ERROR`. Uniform names in
/// `missing_uniforms` have no location.
#[derive(Default)]
pub struct RecordingBackend {
    pub events: Vec<BackendEvent>,
    pub missing_uniforms: HashSet<String>,
    stages: HashMap<StageHandle, String>,
    programs: HashSet<ProgramHandle>,
    program_labels: HashMap<ProgramHandle, String>,
    uniform_names: RefCell<Vec<String>>,
    mesh_labels: Vec<String>,
    texture_labels: Vec<String>,
    bound: Option<ProgramHandle>,
    next_handle: u32,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    /// Label a program was linked with, also after it was deleted
    pub fn program_label(&self, program: ProgramHandle) -> Option<&str> {
        self.program_labels.get(&program).map(String::as_str)
    }

    pub fn mesh_label(&self, mesh: MeshHandle) -> Option<&str> {
        self.mesh_labels.get(mesh.0 as usize).map(String::as_str)
    }

    pub fn texture_label(&self, texture: TextureHandle) -> Option<&str> {
        self.texture_labels.get(texture.0 as usize).map(String::as_str)
    }

    /// `(program label, mesh label)` of every draw, in order
    pub fn draws(&self) -> Vec<(String, String)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                BackendEvent::Draw { program, mesh } => Some((
                    self.program_label(*program).unwrap_or("?").to_owned(),
                    self.mesh_label(*mesh).unwrap_or("?").to_owned(),
                )),
                _ => None,
            })
            .collect()
    }

    /// Uniform writes as `(program label, name, value)`
    pub fn uniform_writes(&self) -> Vec<(String, String, UniformValue)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                BackendEvent::Uniform {
                    program,
                    name,
                    value,
                } => Some((
                    self.program_label(*program).unwrap_or("?").to_owned(),
                    name.clone(),
                    *value,
                )),
                _ => None,
            })
            .collect()
    }
}

impl ShaderBackend for RecordingBackend {
    fn compile_stage(
        &mut self,
        _kind: StageKind,
        _label: &str,
        source: &str,
    ) -> Result<StageHandle, String> {
        if source.contains("COMPILE_ERROR") {
            return Err("error: expected ';'".to_owned());
        }
        let handle = StageHandle(self.allocate());
        self.stages.insert(handle, source.to_owned());
        Ok(handle)
    }

    fn link_program(
        &mut self,
        label: &str,
        stages: &[StageHandle],
    ) -> Result<ProgramHandle, String> {
        let broken = stages.iter().any(|stage| {
            self.stages
                .get(stage)
                .is_some_and(|source| source.contains("LINK_ERROR"))
        });
        if broken {
            return Err("error: stage interfaces do not match".to_owned());
        }
        let handle = ProgramHandle(self.allocate());
        self.programs.insert(handle);
        self.program_labels.insert(handle, label.to_owned());
        Ok(handle)
    }

    fn delete_stage(&mut self, stage: StageHandle) {
        self.stages.remove(&stage);
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program);
        if self.bound == Some(program) {
            self.bound = None;
        }
    }

    fn bind_program(&mut self, program: Option<ProgramHandle>) {
        self.bound = program;
        self.events.push(BackendEvent::Bind(program));
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        if !self.programs.contains(&program) || self.missing_uniforms.contains(name) {
            return None;
        }
        let mut names = self.uniform_names.borrow_mut();
        let index = match names.iter().position(|known| known == name) {
            Some(index) => index,
            None => {
                names.push(name.to_owned());
                names.len() - 1
            }
        };
        Some(UniformLocation(index as u32))
    }

    fn write_uniform(
        &mut self,
        program: ProgramHandle,
        location: UniformLocation,
        value: UniformValue,
    ) -> Result<(), String> {
        let name = self
            .uniform_names
            .borrow()
            .get(location.0 as usize)
            .cloned()
            .ok_or_else(|| format!("invalid uniform location {}", location.0))?;
        self.events.push(BackendEvent::Uniform {
            program,
            name,
            value,
        });
        Ok(())
    }

    fn live_object_count(&self) -> usize {
        self.stages.len() + self.programs.len()
    }
}

impl DrawBackend for RecordingBackend {
    fn upload_mesh(&mut self, label: &str, _mesh: &GeometryData) -> MeshHandle {
        self.mesh_labels.push(label.to_owned());
        MeshHandle(self.mesh_labels.len() as u32 - 1)
    }

    fn upload_texture(&mut self, label: &str, _image: &TextureImage) -> TextureHandle {
        self.texture_labels.push(label.to_owned());
        TextureHandle(self.texture_labels.len() as u32 - 1)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.events.push(BackendEvent::Resize(width, height));
    }

    fn begin_frame(&mut self) {
        self.events.push(BackendEvent::BeginFrame);
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>) {
        self.events.push(BackendEvent::BindTexture(unit, texture));
    }

    fn set_blending(&mut self, enabled: bool) {
        self.events.push(BackendEvent::Blend(enabled));
    }

    fn draw_mesh(&mut self, mesh: MeshHandle) {
        if let Some(program) = self.bound.filter(|program| self.programs.contains(program)) {
            self.events.push(BackendEvent::Draw { program, mesh });
        }
    }

    fn end_frame(&mut self) {
        self.events.push(BackendEvent::EndFrame);
    }
}

/// Fresh, empty directory removed when the returned guard drops
pub fn scratch_dir(name: &str) -> TempDir {
    tempfile::Builder::new()
        .prefix(&format!("orrery-{name}-"))
        .tempdir()
        .expect("create scratch dir")
}

/// Writes `contents` to `dir/name`, replacing any previous file
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write scratch file");
    path
}
