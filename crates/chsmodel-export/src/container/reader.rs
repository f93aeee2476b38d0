//! Container parsing and validation

use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;

use byteorder::{NativeEndian, ReadBytesExt};
use chsmodel_core::{Color, Error, Mat4x4, Result, ResultExt};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use tracing::debug;

use super::*;
use crate::animation::{CurveKind, Keyframe};
use crate::index::{IndexBuffer, IndexWidth};

/// Parsed `ChsModel` root
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataSummary {
    pub model_id: String,
    /// Value of the `meshCount` attribute
    pub mesh_count: usize,
    pub meshes: Vec<MeshSummary>,
}

/// Parsed `ChsMesh` element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshSummary {
    pub id: String,
    /// Attribute ids in interleaving order
    pub attributes: Vec<String>,
    /// Floats per interleaved vertex
    pub total_stride: usize,
    /// Float count of the vertex buffer
    pub vertex_buffer_count: usize,
    pub index_count: usize,
    pub index_width: IndexWidth,
    pub has_texture: bool,
    pub has_vertex_color: bool,
    pub texture: Option<String>,
    pub diffuse_color: Option<Color>,
    pub transform: Option<Mat4x4>,
    pub curves: Vec<CurveSummary>,
}

impl MeshSummary {
    fn new(id: String) -> Self {
        Self {
            id,
            attributes: Vec::new(),
            total_stride: 0,
            vertex_buffer_count: 0,
            index_count: 0,
            index_width: IndexWidth::Narrow,
            has_texture: false,
            has_vertex_color: false,
            texture: None,
            diffuse_color: None,
            transform: None,
            curves: Vec::new(),
        }
    }

    /// Number of interleaved vertices
    pub fn vertex_count(&self) -> usize {
        match self.total_stride {
            0 => 0,
            stride => self.vertex_buffer_count / stride,
        }
    }
}

/// Parsed `ChsAnimCurve` element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveSummary {
    pub name: String,
    pub count: usize,
    /// Kind taken from the type field of the first key
    pub kind: Option<CurveKind>,
    pub keys: Vec<Keyframe>,
}

/// Buffers of one mesh, decoded at their declared widths
#[derive(Debug, Clone, PartialEq)]
pub struct MeshPayload {
    pub vertices: Vec<f32>,
    pub indices: IndexBuffer,
}

impl MeshPayload {
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// A parsed and validated ChsModel file
#[derive(Debug, Clone)]
pub struct ChsModelFile {
    pub format: ContainerFormat,
    /// Metadata document with padding removed
    pub metadata: String,
    pub summary: MetadataSummary,
    /// One entry per mesh, in document order
    pub payloads: Vec<MeshPayload>,
}

impl ChsModelFile {
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        Self::from_bytes(&bytes).with_context(|| format!("reading {}", path.display()))
    }

    /// Parse a container, detecting the variant from its first bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.starts_with(MAGIC) {
            return Self::parse_hybrid(bytes);
        }

        match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'<') => Self::parse_text(bytes),
            _ => Err(Error::InvalidMagic {
                expected: MAGIC.to_vec(),
                found: bytes.iter().take(MAGIC.len()).copied().collect(),
            }),
        }
    }

    pub fn mesh(&self, id: &str) -> Option<(&MeshSummary, &MeshPayload)> {
        self.summary
            .meshes
            .iter()
            .zip(&self.payloads)
            .find(|(summary, _)| summary.id == id)
    }

    fn parse_text(bytes: &[u8]) -> Result<Self> {
        let metadata = metadata_str(bytes)?;
        let mut parsed = parse_metadata(&metadata)?;

        let mut meshes = Vec::with_capacity(parsed.meshes.len());
        let mut payloads = Vec::with_capacity(parsed.meshes.len());
        for mesh in std::mem::take(&mut parsed.meshes) {
            let vertices = mesh.vertices.unwrap_or_default();
            let indices = mesh.indices.unwrap_or_default();
            let indices = match mesh.summary.index_width {
                IndexWidth::Wide => IndexBuffer::Wide(indices),
                IndexWidth::Narrow => IndexBuffer::Narrow(
                    indices
                        .into_iter()
                        .map(u16::try_from)
                        .collect::<std::result::Result<_, _>>()
                        .map_err(|_| {
                            Error::invalid_data(format!(
                                "mesh '{}' declares short indices but stores wider values",
                                mesh.summary.id
                            ))
                        })?,
                ),
            };
            let payload = MeshPayload { vertices, indices };
            validate_payload(&mesh.summary, &payload)?;
            meshes.push(mesh.summary);
            payloads.push(payload);
        }

        Ok(Self {
            format: ContainerFormat::Text,
            metadata,
            summary: parsed.into_summary(meshes),
            payloads,
        })
    }

    fn parse_hybrid(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        cursor.set_position(MAGIC.len() as u64);

        let metadata_len = read_u32(&mut cursor)? as usize;
        let metadata_bytes = take(&mut cursor, metadata_len)?;
        let metadata = metadata_str(metadata_bytes)?;
        let mut parsed = parse_metadata(&metadata)?;

        let mut meshes = Vec::with_capacity(parsed.meshes.len());
        let mut payloads = Vec::with_capacity(parsed.meshes.len());
        for mesh in std::mem::take(&mut parsed.meshes) {
            let summary = mesh.summary;

            let vertex_size = read_u32(&mut cursor)? as usize;
            let vertex_bytes = take(&mut cursor, vertex_size)?;
            if vertex_size % 4 != 0 {
                return Err(Error::invalid_data(format!(
                    "vertex buffer of mesh '{}' is {} bytes, not a whole number of floats",
                    summary.id, vertex_size
                )));
            }
            let vertices = vertex_bytes
                .chunks_exact(4)
                .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                .collect();

            let index_size = read_u32(&mut cursor)? as usize;
            let index_bytes = take(&mut cursor, index_size)?;
            let indices = IndexBuffer::from_bytes(index_bytes, summary.index_width).ok_or_else(|| {
                Error::invalid_data(format!(
                    "index buffer of mesh '{}' is {} bytes, not a whole number of indices",
                    summary.id, index_size
                ))
            })?;

            let payload = MeshPayload { vertices, indices };
            validate_payload(&summary, &payload)?;
            meshes.push(summary);
            payloads.push(payload);
        }

        let consumed = cursor.position() as usize;
        if consumed != bytes.len() {
            return Err(Error::invalid_data(format!(
                "{} trailing bytes after the last mesh",
                bytes.len() - consumed
            )));
        }

        Ok(Self {
            format: ContainerFormat::Hybrid,
            metadata,
            summary: parsed.into_summary(meshes),
            payloads,
        })
    }
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32> {
    let offset = cursor.position();
    cursor
        .read_u32::<NativeEndian>()
        .map_err(|_| Error::UnexpectedEof { offset })
}

fn take<'a>(cursor: &mut Cursor<&'a [u8]>, len: usize) -> Result<&'a [u8]> {
    let data: &'a [u8] = *cursor.get_ref();
    let start = cursor.position() as usize;
    let end = start
        .checked_add(len)
        .filter(|&end| end <= data.len())
        .ok_or(Error::UnexpectedEof {
            offset: data.len() as u64,
        })?;
    cursor.set_position(end as u64);
    Ok(&data[start..end])
}

/// Metadata bytes as text, alignment padding and terminators removed
fn metadata_str(bytes: &[u8]) -> Result<String> {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8(bytes[..end].to_vec())
        .map_err(|_| Error::metadata("metadata is not valid UTF-8"))
}

fn validate_payload(summary: &MeshSummary, payload: &MeshPayload) -> Result<()> {
    if payload.vertices.len() != summary.vertex_buffer_count {
        return Err(Error::invalid_data(format!(
            "mesh '{}' declares {} vertex floats, buffer holds {}",
            summary.id,
            summary.vertex_buffer_count,
            payload.vertices.len()
        )));
    }
    if summary.total_stride > 0 && summary.vertex_buffer_count % summary.total_stride != 0 {
        return Err(Error::invalid_data(format!(
            "mesh '{}' vertex buffer is not a multiple of its stride {}",
            summary.id, summary.total_stride
        )));
    }
    if payload.indices.len() != summary.index_count {
        return Err(Error::invalid_data(format!(
            "mesh '{}' declares {} indices, buffer holds {}",
            summary.id,
            summary.index_count,
            payload.indices.len()
        )));
    }
    let vertex_count = summary.vertex_count();
    if let Some(&max) = payload.indices.to_u32_vec().iter().max() {
        if max as usize >= vertex_count {
            return Err(Error::invalid_data(format!(
                "mesh '{}' index {} out of range for {} vertices",
                summary.id, max, vertex_count
            )));
        }
    }
    Ok(())
}

// ==================== Metadata Parsing ====================

struct ParsedMesh {
    summary: MeshSummary,
    vertices: Option<Vec<f32>>,
    indices: Option<Vec<u32>>,
}

struct ParsedMetadata {
    model_id: String,
    mesh_count: usize,
    meshes: Vec<ParsedMesh>,
}

impl ParsedMetadata {
    fn into_summary(self, meshes: Vec<MeshSummary>) -> MetadataSummary {
        MetadataSummary {
            model_id: self.model_id,
            mesh_count: self.mesh_count,
            meshes,
        }
    }
}

/// Element whose text body is being read
enum TextTarget {
    VertexBuffer,
    IndexBuffer,
    Transform,
    Curve { name: String, count: usize },
    DiffuseColor,
}

fn parse_metadata(xml: &str) -> Result<ParsedMetadata> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut root: Option<(String, usize)> = None;
    let mut meshes = Vec::new();
    let mut current: Option<ParsedMesh> = None;
    let mut target: Option<TextTarget> = None;

    loop {
        match reader.read_event().map_err(Error::metadata)? {
            Event::Start(e) => {
                target = open_element(&e, &mut root, &mut current)?;
            }
            Event::Empty(e) => {
                open_element(&e, &mut root, &mut current)?;
                if e.name().as_ref() == EL_MESH.as_bytes() {
                    meshes.extend(current.take());
                }
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(Error::metadata)?;
                if let (Some(target), Some(mesh)) = (target.take(), current.as_mut()) {
                    read_text(target, &text, mesh)?;
                }
            }
            Event::End(e) => {
                target = None;
                if e.name().as_ref() == EL_MESH.as_bytes() {
                    if let Some(mesh) = current.take() {
                        meshes.push(mesh);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let (model_id, mesh_count) =
        root.ok_or_else(|| Error::metadata(format!("missing {} root element", EL_MODEL)))?;
    if mesh_count != meshes.len() {
        return Err(Error::invalid_data(format!(
            "meshCount is {} but {} meshes are present",
            mesh_count,
            meshes.len()
        )));
    }
    debug!(model = %model_id, meshes = mesh_count, "Parsed metadata");

    Ok(ParsedMetadata {
        model_id,
        mesh_count,
        meshes,
    })
}

/// Apply one opening tag; returns the text target it starts, if any
fn open_element(
    e: &BytesStart<'_>,
    root: &mut Option<(String, usize)>,
    current: &mut Option<ParsedMesh>,
) -> Result<Option<TextTarget>> {
    let qname = e.name();
    let name = String::from_utf8_lossy(qname.as_ref()).into_owned();
    let attrs = Attributes::from_element(e)?;

    if name == EL_MODEL {
        *root = Some((
            attrs.require(&name, "id")?.to_string(),
            attrs.parse(&name, "meshCount")?,
        ));
        return Ok(None);
    }
    if root.is_none() {
        return Err(Error::metadata(format!("{} outside {}", name, EL_MODEL)));
    }
    if name == EL_MESH {
        *current = Some(ParsedMesh {
            summary: MeshSummary::new(attrs.require(&name, "id")?.to_string()),
            vertices: None,
            indices: None,
        });
        return Ok(None);
    }

    let mesh = match current.as_mut() {
        Some(mesh) => &mut mesh.summary,
        None => return Err(Error::metadata(format!("{} outside {}", name, EL_MESH))),
    };

    let target = match name.as_str() {
        EL_ATTRIBUTE => {
            mesh.attributes.push(attrs.require(&name, "id")?.to_string());
            mesh.total_stride += attrs.parse::<usize>(&name, "stride")?;
            None
        }
        EL_VERTEX_BUFFER => {
            mesh.vertex_buffer_count = attrs.parse(&name, "count")?;
            Some(TextTarget::VertexBuffer)
        }
        EL_INDEX_BUFFER => {
            mesh.index_width = IndexWidth::from_is_short(attrs.parse(&name, "isShort")?);
            mesh.index_count = attrs.parse(&name, "count")?;
            Some(TextTarget::IndexBuffer)
        }
        EL_TRANSFORM => Some(TextTarget::Transform),
        EL_CURVE => Some(TextTarget::Curve {
            name: attrs.require(&name, "name")?.to_string(),
            count: attrs.parse(&name, "count")?,
        }),
        EL_TEXTURE => {
            mesh.texture = Some(attrs.require(&name, "filename")?.to_string());
            None
        }
        EL_PROPERTY => match attrs.require(&name, "name")? {
            "hasVertexColor" => {
                mesh.has_vertex_color = attrs.parse(&name, "value")?;
                None
            }
            "hasTexture" => {
                mesh.has_texture = attrs.parse(&name, "value")?;
                None
            }
            "diffuseColor" => Some(TextTarget::DiffuseColor),
            _ => None,
        },
        _ => None,
    };
    Ok(target)
}

fn read_text(target: TextTarget, text: &str, mesh: &mut ParsedMesh) -> Result<()> {
    match target {
        TextTarget::VertexBuffer => mesh.vertices = Some(parse_list(text, EL_VERTEX_BUFFER)?),
        TextTarget::IndexBuffer => mesh.indices = Some(parse_list(text, EL_INDEX_BUFFER)?),
        TextTarget::Transform => {
            let values: Vec<f32> = parse_list(text, EL_TRANSFORM)?;
            let flat = <[f32; 16]>::try_from(values.as_slice()).map_err(|_| {
                Error::metadata(format!("{} needs 16 values, found {}", EL_TRANSFORM, values.len()))
            })?;
            mesh.summary.transform = Some(Mat4x4::from_flat(&flat));
        }
        TextTarget::Curve { name, count } => {
            let values: Vec<f32> = parse_list(text, EL_CURVE)?;
            if values.len() != count * 3 {
                return Err(Error::metadata(format!(
                    "curve '{}' declares {} keys but holds {} values",
                    name,
                    count,
                    values.len()
                )));
            }
            let kind = values.get(1).and_then(|&code| CurveKind::from_code(code as u32));
            let keys = values
                .chunks_exact(3)
                .map(|t| Keyframe {
                    time: t[0],
                    value: t[2],
                })
                .collect();
            mesh.summary.curves.push(CurveSummary {
                name,
                count,
                kind,
                keys,
            });
        }
        TextTarget::DiffuseColor => {
            let values: Vec<f32> = parse_list(text, "diffuseColor")?;
            match values.as_slice() {
                &[r, g, b, a] => mesh.summary.diffuse_color = Some(Color::new(r, g, b, a)),
                _ => return Err(Error::metadata("diffuseColor needs 4 values")),
            }
        }
    }
    Ok(())
}

fn parse_list<T: FromStr>(text: &str, element: &str) -> Result<Vec<T>> {
    text.split_whitespace()
        .map(|v| {
            v.parse()
                .map_err(|_| Error::metadata(format!("invalid value '{}' in {}", v, element)))
        })
        .collect()
}

/// Unescaped attributes of one element
struct Attributes(Vec<(String, String)>);

impl Attributes {
    fn from_element(e: &BytesStart<'_>) -> Result<Self> {
        let mut pairs = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(Error::metadata)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(Error::metadata)?.into_owned();
            pairs.push((key, value));
        }
        Ok(Self(pairs))
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn require(&self, element: &str, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| Error::metadata(format!("{} is missing attribute '{}'", element, key)))
    }

    fn parse<T: FromStr>(&self, element: &str, key: &str) -> Result<T> {
        let raw = self.require(element, key)?;
        raw.parse().map_err(|_| {
            Error::metadata(format!(
                "{} attribute '{}' has invalid value '{}'",
                element, key, raw
            ))
        })
    }
}
