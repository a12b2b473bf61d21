//! Shader program management
//!
//! Programs are loaded from per-stage source files, can be hot-reloaded at
//! runtime, and expose uniforms by name. Compile and link failures are
//! reported and leave the affected program unusable without taking the rest
//! of the frame down.

pub mod backend;
pub mod program;
pub mod reflect;

use std::path::PathBuf;
use thiserror::Error;

pub use backend::{
    ProgramHandle, ShaderBackend, StageHandle, StageKind, UniformLocation, UniformValue,
};
pub use program::{reload_all, ShaderProgram};

/// Why a program could not be (re)built
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("shader '{label}': no stage source could be read")]
    NoStages { label: String },

    #[error("cannot compile {stage} shader \"{}\": {log}", path.display())]
    Compile {
        path: PathBuf,
        stage: StageKind,
        log: String,
    },

    #[error("cannot link shader program '{label}': {log}")]
    Link { label: String, log: String },
}
