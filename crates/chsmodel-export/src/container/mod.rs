//! ChsModel container format
//!
//! A ChsModel file is an XML metadata document, optionally followed by a
//! packed binary payload:
//!
//! ```text
//! hybrid:  "chmo" | u32 metadataLength | metadata (zero padded to 4) |
//!          per mesh: u32 vertexBytes | f32 vertices | u32 indexBytes | u16/u32 indices
//! text:    metadata only, buffer values inlined as decimal text
//! ```
//!
//! All integers and buffer entries use host byte order.

mod metadata;
mod reader;
mod writer;

pub use metadata::build_metadata;
pub use reader::{ChsModelFile, CurveSummary, MeshPayload, MeshSummary, MetadataSummary};
pub use writer::{aligned_len, encode_document, ContainerWriter, WriterState};

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Magic bytes opening a hybrid container
pub const MAGIC: &[u8; 4] = b"chmo";

/// File extension, without the dot
pub const EXTENSION: &str = "chsmodel";

/// Metadata alignment inside a hybrid container
pub const ALIGNMENT: usize = 4;

/// Shader sources referenced by every material
pub const VERTEX_SHADER_SRC: &str = "Shader.vsh";
pub const FRAGMENT_SHADER_SRC: &str = "Shader.fsh";

// Element names
pub const EL_MODEL: &str = "ChsModel";
pub const EL_MESH: &str = "ChsMesh";
pub const EL_ATTRIBUTE: &str = "ChsAttribute";
pub const EL_VERTEX_BUFFER: &str = "ChsVertexBuffer";
pub const EL_INDEX_BUFFER: &str = "ChsIndexBuffer";
pub const EL_TRANSFORM: &str = "ChsTransform";
pub const EL_CURVE_SET: &str = "ChsAnimCurveSet";
pub const EL_CURVE: &str = "ChsAnimCurve";
pub const EL_MATERIAL: &str = "ChsMaterial";
pub const EL_VERTEX_SHADER: &str = "ChsVertexShader";
pub const EL_FRAGMENT_SHADER: &str = "ChsFragmentShader";
pub const EL_PROPERTY: &str = "ChsProperty";
pub const EL_TEXTURE: &str = "ChsTexture";

/// Container variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    /// Metadata only, values inlined
    Text,
    /// Magic header, aligned metadata, binary payload
    #[default]
    Hybrid,
}

impl std::str::FromStr for ContainerFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "xml" => Ok(ContainerFormat::Text),
            "hybrid" | "binary" => Ok(ContainerFormat::Hybrid),
            _ => Err(format!("Unknown container format: {}", s)),
        }
    }
}

impl std::fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerFormat::Text => write!(f, "text"),
            ContainerFormat::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// Whether a path names a ChsModel file (by extension, case-insensitive)
pub fn is_chsmodel_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(EXTENSION))
        .unwrap_or(false)
}

/// Model id for an output path: the file name without the `.chsmodel` extension
pub fn model_id_from_path(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let suffix_len = EXTENSION.len() + 1;
    if is_chsmodel_path(path) && name.len() > suffix_len {
        name[..name.len() - suffix_len].to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_is_chsmodel_path() {
        assert!(is_chsmodel_path(Path::new("out/ship.chsmodel")));
        assert!(is_chsmodel_path(Path::new("SHIP.CHSMODEL")));
        assert!(!is_chsmodel_path(Path::new("ship.glb")));
        assert!(!is_chsmodel_path(Path::new("chsmodel")));
    }

    #[test]
    fn test_model_id_from_path() {
        assert_eq!(model_id_from_path(&PathBuf::from("/tmp/ship.chsmodel")), "ship");
        assert_eq!(model_id_from_path(&PathBuf::from("crate.v2.chsmodel")), "crate.v2");
        assert_eq!(model_id_from_path(&PathBuf::from("ship.bin")), "ship.bin");
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("binary".parse(), Ok(ContainerFormat::Hybrid));
        assert_eq!("XML".parse(), Ok(ContainerFormat::Text));
        assert!("zip".parse::<ContainerFormat>().is_err());
    }
}
