//! Export options

use std::path::Path;

use chsmodel_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::container::ContainerFormat;
use crate::index::IndexWidthPolicy;
use crate::source::SamplingSpace;

/// ChsModel export options
///
/// Loadable from YAML or JSON; every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportOptions {
    /// Container variant to write
    pub format: ContainerFormat,
    /// How 16 vs 32-bit indices are chosen
    pub index_width_policy: IndexWidthPolicy,
    /// Space positions and normals are sampled in
    pub sampling_space: SamplingSpace,
    /// Overrides the id derived from the output file name
    pub model_id: Option<String>,
    /// Write to a temporary file and rename it into place
    pub atomic_write: bool,
    /// Skip invisible and intermediate meshes
    pub skip_hidden: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ContainerFormat::Hybrid,
            index_width_policy: IndexWidthPolicy::TriangleEstimate,
            sampling_space: SamplingSpace::Object,
            model_id: None,
            atomic_write: false,
            skip_hidden: true,
        }
    }
}

impl ExportOptions {
    /// Parse YAML options; missing keys take their defaults
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(Error::invalid_config)
    }

    /// Parse JSON options; missing keys take their defaults
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(Error::invalid_config)
    }

    /// Load from a `.yaml`, `.yml` or `.json` file
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;

        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&text),
            "json" => Self::from_json_str(&text),
            _ => Err(Error::invalid_config(format!(
                "unsupported options file '{}', expected .yaml, .yml or .json",
                path.display()
            ))),
        }
    }
}
