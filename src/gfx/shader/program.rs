//! Shader program lifecycle
//!
//! A [`ShaderProgram`] remembers the source paths of its stages and owns at
//! most one linked program on the backend. Reloading always starts from a
//! clean slate: the previous program and its stages are released first, and
//! any failure along the way releases whatever that attempt allocated, so the
//! program is either fully linked or absent.

use log::{debug, error, info, warn};
use std::{
    fs,
    path::{Path, PathBuf},
};

use super::{
    backend::{ProgramHandle, ShaderBackend, StageHandle, StageKind, UniformValue},
    ShaderError,
};

/// Stage objects compiled during one reload attempt
///
/// Must be either handed over to a [`LinkedProgram`] or discarded through
/// the backend; the reload path does one or the other on every exit.
struct PendingStages(Vec<StageHandle>);

impl PendingStages {
    fn discard<B: ShaderBackend + ?Sized>(self, backend: &mut B) {
        for stage in self.0 {
            backend.delete_stage(stage);
        }
    }
}

struct LinkedProgram {
    program: ProgramHandle,
    stages: Vec<StageHandle>,
}

/// One vertex/fragment(/geometry) program loaded from files
pub struct ShaderProgram {
    label: String,
    vertex_path: PathBuf,
    fragment_path: PathBuf,
    geometry_path: Option<PathBuf>,
    linked: Option<LinkedProgram>,
}

impl ShaderProgram {
    /// Creates an empty, unusable program
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_owned(),
            vertex_path: PathBuf::new(),
            fragment_path: PathBuf::new(),
            geometry_path: None,
            linked: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn vertex_path(&self) -> &Path {
        &self.vertex_path
    }

    pub fn fragment_path(&self) -> &Path {
        &self.fragment_path
    }

    pub fn geometry_path(&self) -> Option<&Path> {
        self.geometry_path.as_deref()
    }

    /// Stores the stage paths, then compiles and links them
    pub fn load<B: ShaderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        vertex_path: impl Into<PathBuf>,
        fragment_path: impl Into<PathBuf>,
        geometry_path: Option<PathBuf>,
    ) -> Result<(), ShaderError> {
        self.vertex_path = vertex_path.into();
        self.fragment_path = fragment_path.into();
        self.geometry_path = geometry_path;
        self.reload(backend)
    }

    /// Recompiles and relinks all stages from disk
    ///
    /// Stages whose file cannot be read are skipped. On error the program is
    /// left unusable and no backend objects from this attempt survive.
    pub fn reload<B: ShaderBackend + ?Sized>(&mut self, backend: &mut B) -> Result<(), ShaderError> {
        self.release(backend);

        let mut stage_files = vec![
            (StageKind::Vertex, self.vertex_path.clone()),
            (StageKind::Fragment, self.fragment_path.clone()),
        ];
        if let Some(geometry) = &self.geometry_path {
            stage_files.push((StageKind::Geometry, geometry.clone()));
        }

        let mut pending = PendingStages(Vec::with_capacity(stage_files.len()));
        for (kind, path) in stage_files {
            let source = match fs::read_to_string(&path) {
                Ok(source) => source,
                Err(err) => {
                    warn!(
                        "Shader '{}': cannot open {} stage \"{}\": {}",
                        self.label,
                        kind,
                        path.display(),
                        err
                    );
                    continue;
                }
            };

            let stage_label = format!("{} ({})", self.label, kind);
            match backend.compile_stage(kind, &stage_label, &source) {
                Ok(stage) => pending.0.push(stage),
                Err(log) => {
                    error!("Shader: cannot compile \"{}\"\n{}", path.display(), log);
                    pending.discard(backend);
                    return Err(ShaderError::Compile { path, stage: kind, log });
                }
            }
        }

        if pending.0.is_empty() {
            error!("Shader '{}': no stage could be loaded", self.label);
            return Err(ShaderError::NoStages {
                label: self.label.clone(),
            });
        }

        match backend.link_program(&self.label, &pending.0) {
            Ok(program) => {
                debug!(
                    "Shader '{}' linked from {} stage(s)",
                    self.label,
                    pending.0.len()
                );
                self.linked = Some(LinkedProgram {
                    program,
                    stages: pending.0,
                });
                Ok(())
            }
            Err(log) => {
                error!("Shader '{}': cannot link program:\n{}", self.label, log);
                pending.discard(backend);
                Err(ShaderError::Link {
                    label: self.label.clone(),
                    log,
                })
            }
        }
    }

    /// Releases the linked program and its stages. Safe to call repeatedly.
    pub fn release<B: ShaderBackend + ?Sized>(&mut self, backend: &mut B) {
        if let Some(linked) = self.linked.take() {
            backend.delete_program(linked.program);
            for stage in linked.stages {
                backend.delete_stage(stage);
            }
        }
    }

    /// True when the program is fully linked
    pub fn is_usable(&self) -> bool {
        self.linked.is_some()
    }

    pub fn handle(&self) -> Option<ProgramHandle> {
        self.linked.as_ref().map(|linked| linked.program)
    }

    /// Binds the program for subsequent draws
    ///
    /// Does nothing on an unusable program. Returns whether a program was
    /// bound, so callers can skip draws that would have no shader.
    pub fn use_program<B: ShaderBackend + ?Sized>(&self, backend: &mut B) -> bool {
        match self.handle() {
            Some(program) => {
                backend.bind_program(Some(program));
                true
            }
            None => false,
        }
    }

    /// Unbinds whatever program is current
    pub fn disable<B: ShaderBackend + ?Sized>(&self, backend: &mut B) {
        backend.bind_program(None);
    }

    /// Writes a uniform by name
    ///
    /// A name the linked program does not expose is reported unless
    /// `optional` is set; uniforms a stage never reads may have been
    /// compiled out.
    pub fn set_uniform<B: ShaderBackend + ?Sized>(
        &self,
        backend: &mut B,
        name: &str,
        value: impl Into<UniformValue>,
        optional: bool,
    ) {
        let Some(program) = self.handle() else {
            return;
        };

        let Some(location) = backend.uniform_location(program, name) else {
            if !optional {
                error!(
                    "Shader '{}': invalid uniform location for: {}",
                    self.label, name
                );
            }
            return;
        };

        if let Err(err) = backend.write_uniform(program, location, value.into()) {
            error!("Shader '{}': cannot set uniform {}: {}", self.label, name, err);
        }
    }
}

/// Reloads every program in `programs`, logging a summary
///
/// Returns the number of programs that ended up usable.
pub fn reload_all<B: ShaderBackend + ?Sized>(
    backend: &mut B,
    programs: &mut [&mut ShaderProgram],
) -> usize {
    info!("Reloading shaders...");
    let mut usable = 0;
    for program in programs.iter_mut() {
        if program.reload(backend).is_ok() {
            usable += 1;
        }
    }
    info!("{}/{} shader programs usable", usable, programs.len());
    usable
}
