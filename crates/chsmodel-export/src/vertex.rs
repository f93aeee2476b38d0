//! Interleaved vertex buffer encoding

use chsmodel_core::{Error, Result};

use crate::dedup::VertexKey;
use crate::schema::{AttributeSchema, VertexAttribute};
use crate::source::{SamplingSpace, SceneSource};

/// Samples one mesh's unique vertices into a single interleaved float buffer
pub struct VertexBufferEncoder<'a, S: SceneSource> {
    source: &'a S,
    node: &'a S::Node,
    mesh: &'a str,
    schema: &'a AttributeSchema,
    space: SamplingSpace,
}

impl<'a, S: SceneSource> VertexBufferEncoder<'a, S> {
    pub fn new(
        source: &'a S,
        node: &'a S::Node,
        mesh: &'a str,
        schema: &'a AttributeSchema,
        space: SamplingSpace,
    ) -> Self {
        Self {
            source,
            node,
            mesh,
            schema,
            space,
        }
    }

    /// Encode all unique vertices in index order.
    ///
    /// The result always holds `unique.len() * schema.total_stride()` floats.
    pub fn encode(&self, unique: &[VertexKey]) -> Result<Vec<f32>> {
        let mut buffer = Vec::with_capacity(unique.len() * self.schema.total_stride());

        for key in unique {
            for descriptor in self.schema.attributes() {
                match descriptor.attribute {
                    VertexAttribute::Position => {
                        let p = self
                            .source
                            .vertex_position(self.node, key.vertex, self.space)
                            .ok_or_else(|| self.out_of_range("vertex", key.vertex))?
                            .homogenize();
                        buffer.extend_from_slice(&p.to_array());
                    }
                    VertexAttribute::Normal => {
                        let n = self
                            .source
                            .vertex_normal(self.node, key.vertex, self.space)
                            .ok_or_else(|| self.out_of_range("normal", key.vertex))?
                            .normalize();
                        buffer.extend_from_slice(&n.to_array());
                    }
                    VertexAttribute::TexCoord0 => {
                        let uv_id = key.uv.ok_or_else(|| {
                            Error::malformed(
                                self.mesh,
                                format!("corner on vertex {} has no uv", key.vertex),
                            )
                        })?;
                        let uv = self
                            .source
                            .uv(self.node, uv_id)
                            .ok_or_else(|| self.out_of_range("uv", uv_id))?;
                        buffer.extend_from_slice(&[uv.x, uv.y]);
                    }
                    VertexAttribute::VertexColor => {
                        let color = self
                            .source
                            .vertex_color(self.node, key.vertex)
                            .ok_or_else(|| self.out_of_range("color", key.vertex))?;
                        buffer.extend_from_slice(&color.to_array());
                    }
                }
            }
        }

        debug_assert_eq!(buffer.len(), unique.len() * self.schema.total_stride());
        Ok(buffer)
    }

    fn out_of_range(&self, what: &str, id: u32) -> Error {
        Error::malformed(self.mesh, format!("{} id {} out of range", what, id))
    }
}
