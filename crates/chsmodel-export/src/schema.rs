//! Vertex attribute catalog and per-mesh schema selection

use serde::{Deserialize, Serialize};

/// Vertex attributes a ChsModel mesh can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    Position,
    Normal,
    TexCoord0,
    VertexColor,
}

/// Static description of one attribute as written to the metadata document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub attribute: VertexAttribute,
    /// Value of the `id` attribute in `ChsAttribute`
    pub id: &'static str,
    /// Number of floats per vertex
    pub stride: usize,
    /// GL component type name
    pub gl_type: &'static str,
    /// Shader binding slot
    pub slot: u32,
}

/// Fixed attribute catalog, in interleaving order
pub static ATTRIBUTE_CATALOG: [AttributeDescriptor; 4] = [
    AttributeDescriptor {
        attribute: VertexAttribute::Position,
        id: "position",
        stride: 3,
        gl_type: "GL_FLOAT",
        slot: 0,
    },
    AttributeDescriptor {
        attribute: VertexAttribute::Normal,
        id: "normal",
        stride: 3,
        gl_type: "GL_FLOAT",
        slot: 1,
    },
    AttributeDescriptor {
        attribute: VertexAttribute::TexCoord0,
        id: "texcoord0",
        stride: 2,
        gl_type: "GL_FLOAT",
        slot: 3,
    },
    AttributeDescriptor {
        attribute: VertexAttribute::VertexColor,
        id: "vertexColor",
        stride: 4,
        gl_type: "GL_FLOAT",
        slot: 2,
    },
];

impl VertexAttribute {
    /// Catalog entry for this attribute
    pub fn descriptor(self) -> &'static AttributeDescriptor {
        ATTRIBUTE_CATALOG
            .iter()
            .find(|d| d.attribute == self)
            .unwrap_or(&ATTRIBUTE_CATALOG[0])
    }

    /// Look up an attribute by its metadata id
    pub fn from_id(id: &str) -> Option<Self> {
        ATTRIBUTE_CATALOG
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.attribute)
    }
}

/// Capability flags of a mesh, fixed when its record is created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshFlags {
    pub has_uv: bool,
    pub has_vertex_color: bool,
    pub has_texture: bool,
    pub is_animated: bool,
}

/// Ordered subset of the attribute catalog selected for one mesh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSchema {
    attributes: Vec<&'static AttributeDescriptor>,
}

impl AttributeSchema {
    /// Select attributes from capability flags.
    ///
    /// Position and normal are always present. `texcoord0` needs both UVs and a
    /// texture to sample; `vertexColor` only needs a color set.
    pub fn from_flags(flags: &MeshFlags) -> Self {
        let attributes = ATTRIBUTE_CATALOG
            .iter()
            .filter(|d| match d.attribute {
                VertexAttribute::Position | VertexAttribute::Normal => true,
                VertexAttribute::TexCoord0 => flags.has_uv && flags.has_texture,
                VertexAttribute::VertexColor => flags.has_vertex_color,
            })
            .collect();

        Self { attributes }
    }

    /// Selected attributes in interleaving order
    pub fn attributes(&self) -> &[&'static AttributeDescriptor] {
        &self.attributes
    }

    pub fn contains(&self, attribute: VertexAttribute) -> bool {
        self.attributes.iter().any(|d| d.attribute == attribute)
    }

    /// Floats per interleaved vertex
    pub fn total_stride(&self) -> usize {
        self.attributes.iter().map(|d| d.stride).sum()
    }

    /// Float offset of an attribute within one interleaved vertex
    pub fn offset_of(&self, attribute: VertexAttribute) -> Option<usize> {
        let mut offset = 0;
        for d in &self.attributes {
            if d.attribute == attribute {
                return Some(offset);
            }
            offset += d.stride;
        }
        None
    }
}
