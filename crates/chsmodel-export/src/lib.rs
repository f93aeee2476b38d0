//! ChsModel Export Pipeline
//!
//! Turns the meshes of a scene into a ChsModel container:
//! - vertex deduplication and index buffers (16 or 32-bit)
//! - attribute schema selection and interleaved vertex encoding
//! - diffuse material resolution (texture or flat color)
//! - transform and visibility animation curves
//! - text and hybrid container writing, plus a validating reader
//!
//! The host scene is reached only through [`SceneSource`].

pub mod animation;
pub mod container;
pub mod dedup;
pub mod document;
pub mod exporter;
pub mod index;
pub mod logging;
pub mod material;
pub mod options;
pub mod schema;
pub mod source;
pub mod vertex;

#[cfg(test)]
mod test_scene;

pub use animation::{
    AnimationChannel, AnimationCurve, AnimationCurveSet, AnimationEncoder, CurveKind, Keyframe,
    UnitFactors,
};
pub use container::{encode_document, ChsModelFile, ContainerFormat, ContainerWriter};
pub use dedup::{deduplicate, Deduplicated, VertexDeduplicator, VertexKey};
pub use document::{Document, MeshRecord};
pub use exporter::{ExportSummary, ModelExporter};
pub use index::{IndexBuffer, IndexWidth, IndexWidthPolicy};
pub use material::{MaterialChannel, MaterialRecord, MaterialResolver};
pub use options::ExportOptions;
pub use schema::{AttributeSchema, MeshFlags, VertexAttribute};
pub use source::{
    ChannelQuery, Connection, Corner, DrivenCurve, MeshCapabilities, SamplingSpace, SceneSource,
};
pub use vertex::VertexBufferEncoder;
