//! Export orchestration

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use chsmodel_core::{Error, Result};
use serde::Serialize;
use tracing::{debug, warn};

use crate::animation::AnimationEncoder;
use crate::container::{encode_document, model_id_from_path, ContainerFormat};
use crate::dedup::deduplicate;
use crate::document::{Document, MeshRecord};
use crate::index::IndexBuffer;
use crate::material::{MaterialChannel, MaterialResolver};
use crate::options::ExportOptions;
use crate::schema::{AttributeSchema, MeshFlags, VertexAttribute};
use crate::source::SceneSource;
use crate::vertex::VertexBufferEncoder;

/// Outcome of one export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// Id written into the container header
    pub model_id: String,
    pub format: ContainerFormat,
    /// Meshes that made it into the document
    pub meshes_exported: usize,
    /// Hidden or malformed meshes left out of the document
    pub meshes_skipped: usize,
    /// Container size in bytes, metadata and payload included
    pub bytes_written: usize,
}

/// ChsModel exporter
///
/// Holds only options; every call runs its own session, so one exporter can
/// be reused for any number of scenes.
#[derive(Debug, Clone, Default)]
pub struct ModelExporter {
    options: ExportOptions,
}

impl ModelExporter {
    /// Exporter with fixed options
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    /// Options every export through this exporter uses
    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Collect every eligible mesh of `source` into a document
    pub fn build_document<S: SceneSource>(&self, source: &S, model_id: &str) -> Result<Document> {
        ExportSession::new(source, &self.options, model_id)
            .run()
            .map(|(document, _)| document)
    }

    /// Export to `sink` with a single bulk write.
    ///
    /// Nothing reaches the sink unless the whole container encoded.
    pub fn export<S: SceneSource, W: Write>(
        &self,
        source: &S,
        model_id: &str,
        sink: &mut W,
    ) -> Result<ExportSummary> {
        let (summary, bytes) = self.encode(source, model_id)?;
        sink.write_all(&bytes).map_err(Error::sink)?;
        sink.flush().map_err(Error::sink)?;
        Ok(summary)
    }

    /// Export to a file, deriving the model id from its name unless overridden
    pub fn export_to_path<S: SceneSource>(&self, source: &S, path: &Path) -> Result<ExportSummary> {
        let model_id = self
            .options
            .model_id
            .clone()
            .unwrap_or_else(|| model_id_from_path(path));
        crate::log_export_start!(model_id, path);
        let start = Instant::now();

        let encoded = crate::logging::instrument_export(&model_id, || self.encode(source, &model_id));
        let (summary, bytes) = match encoded {
            Ok(encoded) => encoded,
            Err(e) => {
                crate::log_export_error!(model_id, e);
                return Err(e);
            }
        };

        let written = if self.options.atomic_write {
            write_atomic(path, &bytes)
        } else {
            write_direct(path, &bytes)
        };
        if let Err(e) = written {
            crate::log_export_error!(model_id, e);
            return Err(e);
        }

        crate::log_export_complete!(
            model_id,
            start.elapsed(),
            summary.meshes_exported,
            summary.bytes_written
        );
        Ok(summary)
    }

    fn encode<S: SceneSource>(&self, source: &S, model_id: &str) -> Result<(ExportSummary, Vec<u8>)> {
        let (document, skipped) = ExportSession::new(source, &self.options, model_id).run()?;
        let bytes = encode_document(&document, self.options.format)?;

        let summary = ExportSummary {
            model_id: model_id.to_string(),
            format: self.options.format,
            meshes_exported: document.mesh_count(),
            meshes_skipped: skipped,
            bytes_written: bytes.len(),
        };
        Ok((summary, bytes))
    }
}

fn sink_error(path: &Path) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |source| Error::SinkUnavailable {
        path: Some(path.to_path_buf()),
        source,
    }
}

fn write_direct(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(sink_error(path))?;
    file.write_all(bytes).map_err(sink_error(path))?;
    file.flush().map_err(sink_error(path))
}

/// Write beside the destination, then rename into place
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(sink_error(path))?;
    temp.write_all(bytes).map_err(sink_error(path))?;
    temp.flush().map_err(sink_error(path))?;
    temp.persist(path).map_err(|e| sink_error(path)(e.error))?;
    Ok(())
}

/// State of one export call: the growing document
struct ExportSession<'a, S: SceneSource> {
    source: &'a S,
    options: &'a ExportOptions,
    animation: AnimationEncoder,
    document: Document,
    skipped: usize,
}

impl<'a, S: SceneSource> ExportSession<'a, S> {
    fn new(source: &'a S, options: &'a ExportOptions, model_id: &str) -> Self {
        Self {
            source,
            options,
            animation: AnimationEncoder::new(source.unit_factors()),
            document: Document::new(model_id),
            skipped: 0,
        }
    }

    fn run(mut self) -> Result<(Document, usize)> {
        for node in self.source.leaf_mesh_nodes() {
            if self.options.skip_hidden && !self.source.is_visible(&node) {
                debug!(node = ?node, "Skipping hidden mesh");
                self.skipped += 1;
                continue;
            }

            match self.encode_mesh(&node) {
                Ok(mut record) => {
                    record.id = self.unique_id(record.id);
                    self.document.push(record);
                }
                Err(e) if e.is_mesh_local() => {
                    warn!(error = %e, "Excluding mesh from export");
                    self.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        if self.document.is_empty() {
            return Err(Error::EmptyExportSet);
        }
        Ok((self.document, self.skipped))
    }

    fn encode_mesh(&self, node: &S::Node) -> Result<MeshRecord> {
        let source = self.source;
        let name = source.mesh_name(node);

        let material = MaterialResolver::new(source, node, &name).resolve(MaterialChannel::Diffuse);
        let capabilities = source.mesh_capabilities(node);
        let flags = MeshFlags {
            has_uv: capabilities.has_uv,
            has_vertex_color: capabilities.has_vertex_color,
            has_texture: material.has_texture(),
            is_animated: source.is_animated(node),
        };
        let schema = AttributeSchema::from_flags(&flags);
        let transform = source.local_transform(node);

        let corners = source.polygon_corners(node);
        let dedup = deduplicate(&corners, schema.contains(VertexAttribute::TexCoord0));
        let width = self
            .options
            .index_width_policy
            .select(source.polygon_count(node), dedup.unique_vertex_count());

        let vertex_buffer =
            VertexBufferEncoder::new(source, node, &name, &schema, self.options.sampling_space)
                .encode(&dedup.unique)?;
        let index_buffer = IndexBuffer::from_indices(dedup.indices, width);

        let animation = if flags.is_animated {
            let curves = self.animation.encode(&source.driven_curves(node));
            if curves.is_empty() {
                debug!(mesh = %name, "Animated mesh has no exportable curves");
                None
            } else {
                Some(curves)
            }
        } else {
            None
        };

        debug!(
            mesh = %name,
            vertices = vertex_buffer.len() / schema.total_stride(),
            indices = index_buffer.len(),
            width = ?index_buffer.width(),
            "Encoded mesh"
        );

        Ok(MeshRecord {
            id: name,
            transform,
            flags,
            schema,
            vertex_buffer,
            index_buffer,
            material,
            animation,
        })
    }

    /// Suffix repeated mesh names so ids stay unique within the document
    fn unique_id(&self, id: String) -> String {
        if !self.document.contains_id(&id) {
            return id;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}_{}", id, n);
            if !self.document.contains_id(&candidate) {
                warn!(mesh = %id, renamed = %candidate, "Duplicate mesh name");
                return candidate;
            }
            n += 1;
        }
    }
}
