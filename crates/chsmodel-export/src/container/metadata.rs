//! Metadata document generation

use chsmodel_core::{Error, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::*;
use crate::document::{Document, MeshRecord};
use crate::material::{MaterialChannel, MaterialRecord};

/// Render the metadata document for `document`.
///
/// In text mode buffer elements carry their values; in hybrid mode they
/// only carry counts.
pub fn build_metadata(document: &Document, format: ContainerFormat) -> Result<Vec<u8>> {
    let mut builder = MetadataBuilder {
        writer: Writer::new_with_indent(Vec::new(), b' ', 4),
        format,
    };

    builder.start(
        EL_MODEL,
        &[
            ("meshCount", document.mesh_count().to_string()),
            ("id", document.model_id().to_string()),
        ],
    )?;
    for mesh in document.meshes() {
        builder.mesh(mesh)?;
    }
    builder.end(EL_MODEL)?;

    Ok(builder.writer.into_inner())
}

struct MetadataBuilder {
    writer: Writer<Vec<u8>>,
    format: ContainerFormat,
}

impl MetadataBuilder {
    fn mesh(&mut self, mesh: &MeshRecord) -> Result<()> {
        self.start(EL_MESH, &[("id", mesh.id.clone())])?;

        for descriptor in mesh.schema.attributes() {
            self.empty(
                EL_ATTRIBUTE,
                &[
                    ("id", descriptor.id.to_string()),
                    ("stride", descriptor.stride.to_string()),
                    ("type", descriptor.gl_type.to_string()),
                ],
            )?;
        }

        let vertex_attrs = [("count", mesh.vertex_buffer.len().to_string())];
        match self.format {
            ContainerFormat::Text => {
                self.text_element(EL_VERTEX_BUFFER, &vertex_attrs, &join(&mesh.vertex_buffer))?
            }
            ContainerFormat::Hybrid => self.empty(EL_VERTEX_BUFFER, &vertex_attrs)?,
        }

        let index_attrs = [
            ("isShort", mesh.index_width().is_short().to_string()),
            ("count", mesh.index_buffer.len().to_string()),
        ];
        match self.format {
            ContainerFormat::Text => self.text_element(
                EL_INDEX_BUFFER,
                &index_attrs,
                &join(&mesh.index_buffer.to_u32_vec()),
            )?,
            ContainerFormat::Hybrid => self.empty(EL_INDEX_BUFFER, &index_attrs)?,
        }

        self.text_element(EL_TRANSFORM, &[], &join(&mesh.transform.to_flat()))?;

        if let Some(animation) = &mesh.animation {
            self.start(EL_CURVE_SET, &[])?;
            for (channel, curve) in animation.iter() {
                let mut triplets = Vec::with_capacity(curve.keys.len() * 3);
                for key in &curve.keys {
                    triplets.push(key.time.to_string());
                    triplets.push(curve.kind.code().to_string());
                    triplets.push(key.value.to_string());
                }
                self.text_element(
                    EL_CURVE,
                    &[
                        ("name", channel.name().to_string()),
                        ("count", curve.keys.len().to_string()),
                    ],
                    &triplets.join(" "),
                )?;
            }
            self.end(EL_CURVE_SET)?;
        }

        self.material(mesh)?;
        self.end(EL_MESH)
    }

    fn material(&mut self, mesh: &MeshRecord) -> Result<()> {
        let channel = MaterialChannel::Diffuse.info();

        self.start(EL_MATERIAL, &[])?;
        self.empty(EL_VERTEX_SHADER, &[("src", VERTEX_SHADER_SRC.to_string())])?;
        self.empty(EL_FRAGMENT_SHADER, &[("src", FRAGMENT_SHADER_SRC.to_string())])?;
        self.bool_property("hasVertexColor", mesh.flags.has_vertex_color)?;
        self.bool_property("hasTexture", mesh.flags.has_texture)?;

        match &mesh.material {
            MaterialRecord::Texture { filename } => self.empty(
                EL_TEXTURE,
                &[
                    ("filename", filename.clone()),
                    ("sampler", channel.sampler.to_string()),
                    ("unit", channel.unit.to_string()),
                ],
            )?,
            MaterialRecord::Color(color) => self.text_element(
                EL_PROPERTY,
                &[
                    ("name", channel.property.to_string()),
                    ("type", "vec4".to_string()),
                    ("count", "4".to_string()),
                ],
                &join(&color.to_array()),
            )?,
        }

        self.end(EL_MATERIAL)
    }

    fn bool_property(&mut self, name: &str, value: bool) -> Result<()> {
        self.empty(
            EL_PROPERTY,
            &[
                ("name", name.to_string()),
                ("type", "bool".to_string()),
                ("value", value.to_string()),
            ],
        )
    }

    fn start(&mut self, name: &str, attrs: &[(&str, String)]) -> Result<()> {
        self.write(Event::Start(element(name, attrs)))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, String)]) -> Result<()> {
        self.write(Event::Empty(element(name, attrs)))
    }

    /// Element with a text body; an empty body collapses to an empty element
    fn text_element(&mut self, name: &str, attrs: &[(&str, String)], text: &str) -> Result<()> {
        if text.is_empty() {
            return self.empty(name, attrs);
        }
        self.start(name, attrs)?;
        self.write(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn write(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(Error::metadata)
    }
}

fn element<'a>(name: &'a str, attrs: &'a [(&'a str, String)]) -> BytesStart<'a> {
    BytesStart::new(name).with_attributes(attrs.iter().map(|(k, v)| (*k, v.as_str())))
}

/// Space separated decimal rendering
fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
