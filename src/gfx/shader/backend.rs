//! GPU-facing seam for shader programs
//!
//! [`ShaderBackend`] is the narrow set of operations a [`ShaderProgram`] needs
//! from the graphics device: compiling individual stages, linking them into a
//! program, binding it, and writing uniforms by name. The wgpu implementation
//! lives in [`RenderEngine`]; tests use a recording backend.
//!
//! [`ShaderProgram`]: super::program::ShaderProgram
//! [`RenderEngine`]: crate::gfx::rendering::RenderEngine

use cgmath::{Matrix3, Matrix4, Vector3, Vector4};
use std::fmt;

/// Pipeline stage a source file is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
    Geometry,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::Vertex => "vertex",
            StageKind::Fragment => "fragment",
            StageKind::Geometry => "geometry",
        };
        f.write_str(name)
    }
}

/// Backend handle of one compiled stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageHandle(pub u32);

/// Backend handle of a linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// Resolved uniform slot inside a linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// A typed value that can be written to a uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec3(Vector3<f32>),
    Vec4(Vector4<f32>),
    Mat3(Matrix3<f32>),
    Mat4(Matrix4<f32>),
}

impl UniformValue {
    /// Short type name used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            UniformValue::Bool(_) => "bool",
            UniformValue::Int(_) => "int",
            UniformValue::Float(_) => "float",
            UniformValue::Vec3(_) => "vec3",
            UniformValue::Vec4(_) => "vec4",
            UniformValue::Mat3(_) => "mat3",
            UniformValue::Mat4(_) => "mat4",
        }
    }
}

impl From<bool> for UniformValue {
    fn from(value: bool) -> Self {
        UniformValue::Bool(value)
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        UniformValue::Int(value)
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        UniformValue::Float(value)
    }
}

impl From<Vector3<f32>> for UniformValue {
    fn from(value: Vector3<f32>) -> Self {
        UniformValue::Vec3(value)
    }
}

impl From<Vector4<f32>> for UniformValue {
    fn from(value: Vector4<f32>) -> Self {
        UniformValue::Vec4(value)
    }
}

impl From<Matrix3<f32>> for UniformValue {
    fn from(value: Matrix3<f32>) -> Self {
        UniformValue::Mat3(value)
    }
}

impl From<Matrix4<f32>> for UniformValue {
    fn from(value: Matrix4<f32>) -> Self {
        UniformValue::Mat4(value)
    }
}

/// Shader operations required from the graphics device
///
/// Errors are returned as diagnostic strings produced by the device's
/// compiler or linker; callers decide how to report them.
pub trait ShaderBackend {
    /// Compiles a single stage from its full source text
    fn compile_stage(
        &mut self,
        kind: StageKind,
        label: &str,
        source: &str,
    ) -> Result<StageHandle, String>;

    /// Links compiled stages into one program
    fn link_program(&mut self, label: &str, stages: &[StageHandle])
        -> Result<ProgramHandle, String>;

    /// Releases a compiled stage. Unknown handles are ignored.
    fn delete_stage(&mut self, stage: StageHandle);

    /// Releases a linked program. Unknown handles are ignored.
    fn delete_program(&mut self, program: ProgramHandle);

    /// Makes `program` current for subsequent draws, or unbinds with `None`
    fn bind_program(&mut self, program: Option<ProgramHandle>);

    /// Looks up a uniform by name in a linked program
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Writes a value into a program's uniform slot
    fn write_uniform(
        &mut self,
        program: ProgramHandle,
        location: UniformLocation,
        value: UniformValue,
    ) -> Result<(), String>;

    /// Number of stage and program objects currently allocated
    fn live_object_count(&self) -> usize;
}
