//! Assembled export document

use chsmodel_core::Mat4x4;

use crate::animation::AnimationCurveSet;
use crate::index::{IndexBuffer, IndexWidth};
use crate::material::MaterialRecord;
use crate::schema::{AttributeSchema, MeshFlags};

/// One fully encoded mesh
#[derive(Debug, Clone, PartialEq)]
pub struct MeshRecord {
    /// Unique within the document
    pub id: String,
    /// Row-major, as captured from the host
    pub transform: Mat4x4,
    pub flags: MeshFlags,
    pub schema: AttributeSchema,
    /// Interleaved per `schema`
    pub vertex_buffer: Vec<f32>,
    pub index_buffer: IndexBuffer,
    pub material: MaterialRecord,
    pub animation: Option<AnimationCurveSet>,
}

impl MeshRecord {
    pub fn index_width(&self) -> IndexWidth {
        self.index_buffer.width()
    }

    pub fn unique_vertex_count(&self) -> usize {
        match self.schema.total_stride() {
            0 => 0,
            stride => self.vertex_buffer.len() / stride,
        }
    }

    /// Raw vertex bytes in host byte order
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertex_buffer)
    }
}

/// Root of one export: model id plus meshes in visit order.
///
/// Meshes can only be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    model_id: String,
    meshes: Vec<MeshRecord>,
}

impl Document {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            meshes: Vec::new(),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn meshes(&self) -> &[MeshRecord] {
        &self.meshes
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.meshes.iter().any(|m| m.id == id)
    }

    pub fn push(&mut self, mesh: MeshRecord) {
        self.meshes.push(mesh);
    }
}
