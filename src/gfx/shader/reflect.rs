//! WGSL stage compilation and uniform reflection
//!
//! Each stage lives in its own WGSL file. naga parses and validates it, finds
//! the entry point for the requested stage and reflects the uniform block at
//! `@group(0) @binding(0)`, so uniforms can be written by name the way a
//! classic program object exposes them.

use naga::{
    valid::{Capabilities, ValidationFlags, Validator},
    AddressSpace, ScalarKind, TypeInner, VectorSize,
};

use super::backend::{StageKind, UniformValue};

/// Bind group holding the per-draw uniform block
pub const UNIFORM_GROUP: u32 = 0;
/// Bind group holding the texture and its sampler
pub const TEXTURE_GROUP: u32 = 1;

/// Member type of a reflected uniform block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformType {
    Int,
    Float,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
}

impl UniformType {
    /// Size in bytes under WGSL uniform layout rules
    pub fn size(self) -> u32 {
        match self {
            UniformType::Int | UniformType::Float => 4,
            UniformType::Vec3 => 12,
            UniformType::Vec4 => 16,
            // three columns, each padded to 16 bytes
            UniformType::Mat3 => 48,
            UniformType::Mat4 => 64,
        }
    }

    /// Writes `value` into `dst` using this member's layout
    ///
    /// Booleans are stored as integers since WGSL forbids `bool` in the
    /// uniform address space.
    pub fn encode(self, value: UniformValue, dst: &mut [u8]) -> Result<(), String> {
        let size = self.size() as usize;
        if dst.len() < size {
            return Err(format!("destination too small for {:?}", self));
        }

        match (self, value) {
            (UniformType::Int, UniformValue::Int(v)) => {
                dst[..4].copy_from_slice(bytemuck::bytes_of(&v));
            }
            (UniformType::Int, UniformValue::Bool(v)) => {
                dst[..4].copy_from_slice(bytemuck::bytes_of(&(v as i32)));
            }
            (UniformType::Float, UniformValue::Float(v)) => {
                dst[..4].copy_from_slice(bytemuck::bytes_of(&v));
            }
            (UniformType::Vec3, UniformValue::Vec3(v)) => {
                let data: [f32; 3] = v.into();
                dst[..12].copy_from_slice(bytemuck::cast_slice(&data));
            }
            (UniformType::Vec4, UniformValue::Vec4(v)) => {
                let data: [f32; 4] = v.into();
                dst[..16].copy_from_slice(bytemuck::cast_slice(&data));
            }
            (UniformType::Mat3, UniformValue::Mat3(m)) => {
                let columns: &[[f32; 3]; 3] = m.as_ref();
                for (i, column) in columns.iter().enumerate() {
                    let padded = [column[0], column[1], column[2], 0.0];
                    dst[i * 16..(i + 1) * 16].copy_from_slice(bytemuck::cast_slice(&padded));
                }
            }
            (UniformType::Mat4, UniformValue::Mat4(m)) => {
                let columns: &[[f32; 4]; 4] = m.as_ref();
                dst[..64].copy_from_slice(bytemuck::cast_slice(columns));
            }
            (expected, value) => {
                return Err(format!(
                    "type mismatch: uniform is {:?}, value is {}",
                    expected,
                    value.kind()
                ));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformMember {
    pub name: String,
    pub offset: u32,
    pub ty: UniformType,
}

/// Layout of the uniform struct bound at `@group(0) @binding(0)`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UniformBlock {
    pub size: u32,
    pub members: Vec<UniformMember>,
}

impl UniformBlock {
    /// Finds a member by name, returning its index and description
    pub fn member(&self, name: &str) -> Option<(usize, &UniformMember)> {
        self.members
            .iter()
            .enumerate()
            .find(|(_, member)| member.name == name)
    }

    /// Combines the blocks declared by two stages of one program
    ///
    /// Stages may declare different subsets of members, but a name used by
    /// both must agree on offset and type, and distinct members must not
    /// overlap.
    pub fn merge(&self, other: &UniformBlock) -> Result<UniformBlock, String> {
        let mut merged = self.clone();

        for member in &other.members {
            if let Some((_, existing)) = merged.member(&member.name) {
                if existing.offset != member.offset || existing.ty != member.ty {
                    return Err(format!(
                        "uniform '{}' declared as {:?}@{} and {:?}@{}",
                        member.name, existing.ty, existing.offset, member.ty, member.offset
                    ));
                }
                continue;
            }

            let start = member.offset;
            let end = start + member.ty.size();
            if let Some(clash) = merged.members.iter().find(|m| {
                let m_end = m.offset + m.ty.size();
                start < m_end && m.offset < end
            }) {
                return Err(format!(
                    "uniform '{}' overlaps '{}'",
                    member.name, clash.name
                ));
            }
            merged.members.push(member.clone());
        }

        merged.size = merged.size.max(other.size);
        merged.members.sort_by_key(|member| member.offset);
        Ok(merged)
    }
}

/// Result of compiling one WGSL stage
#[derive(Debug, Clone)]
pub struct ReflectedStage {
    pub kind: StageKind,
    pub entry_point: String,
    pub uniform_block: Option<UniformBlock>,
}

/// Parses, validates and reflects a WGSL stage
pub fn reflect_stage(kind: StageKind, source: &str) -> Result<ReflectedStage, String> {
    let naga_stage = match kind {
        StageKind::Vertex => naga::ShaderStage::Vertex,
        StageKind::Fragment => naga::ShaderStage::Fragment,
        StageKind::Geometry => {
            return Err("geometry stages are not supported by the wgpu backend".to_owned())
        }
    };

    let module = naga::front::wgsl::parse_str(source).map_err(|err| err.emit_to_string(source))?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|err| err.into_inner().to_string())?;

    let entry_point = module
        .entry_points
        .iter()
        .find(|entry| entry.stage == naga_stage)
        .map(|entry| entry.name.clone())
        .ok_or_else(|| format!("no @{} entry point", kind))?;

    let mut uniform_block = None;
    for (_, variable) in module.global_variables.iter() {
        if variable.space != AddressSpace::Uniform {
            continue;
        }
        let Some(binding) = &variable.binding else {
            continue;
        };
        if binding.group != UNIFORM_GROUP || binding.binding != 0 {
            return Err(format!(
                "uniform buffer at @group({}) @binding({}); only @group({}) @binding(0) is supported",
                binding.group, binding.binding, UNIFORM_GROUP
            ));
        }
        uniform_block = Some(reflect_block(&module, variable.ty)?);
    }

    Ok(ReflectedStage {
        kind,
        entry_point,
        uniform_block,
    })
}

fn reflect_block(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
) -> Result<UniformBlock, String> {
    let TypeInner::Struct { members, span } = &module.types[ty].inner else {
        return Err("uniform binding must be a struct".to_owned());
    };

    let mut block = UniformBlock {
        size: *span,
        members: Vec::with_capacity(members.len()),
    };

    for member in members {
        let name = member.name.clone().unwrap_or_default();
        let ty = member_type(&module.types[member.ty].inner)
            .ok_or_else(|| format!("uniform member '{}' has an unsupported type", name))?;
        block.members.push(UniformMember {
            name,
            offset: member.offset,
            ty,
        });
    }

    Ok(block)
}

fn member_type(inner: &TypeInner) -> Option<UniformType> {
    match inner {
        TypeInner::Scalar(scalar) if scalar.width == 4 => match scalar.kind {
            ScalarKind::Sint | ScalarKind::Uint => Some(UniformType::Int),
            ScalarKind::Float => Some(UniformType::Float),
            _ => None,
        },
        TypeInner::Vector { size, scalar } if scalar.kind == ScalarKind::Float => match size {
            VectorSize::Tri => Some(UniformType::Vec3),
            VectorSize::Quad => Some(UniformType::Vec4),
            _ => None,
        },
        TypeInner::Matrix { columns, rows, .. } => match (columns, rows) {
            (VectorSize::Tri, VectorSize::Tri) => Some(UniformType::Mat3),
            (VectorSize::Quad, VectorSize::Quad) => Some(UniformType::Mat4),
            _ => None,
        },
        _ => None,
    }
}
