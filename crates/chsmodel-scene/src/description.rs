//! Serializable scene description

use std::path::Path;

use chsmodel_core::{Error, Mat4x4, Result};
use chsmodel_export::{Connection, Corner, DrivenCurve, UnitFactors};
use serde::{Deserialize, Serialize};

/// A whole scene: flat node list plus host units
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    pub units: UnitFactors,
    /// Nodes in declaration order; parents are referenced by name
    pub nodes: Vec<NodeDescription>,
}

impl SceneDescription {
    /// Parse a YAML description
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text)
            .map_err(|e| Error::invalid_data(format!("invalid scene description: {}", e)))
    }

    /// Parse a JSON description
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::invalid_data(format!("invalid scene description: {}", e)))
    }

    /// Load a `.json`, `.yaml` or `.yml` description
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
            "json" => Self::from_json_str(&text),
            "yaml" | "yml" => Self::from_yaml_str(&text),
            _ => Err(Error::invalid_config(format!(
                "unsupported scene file '{}', expected .json, .yaml or .yml",
                path.display()
            ))),
        }
    }
}

/// One scene node, optionally carrying a mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescription {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Construction-history object that is never exported
    #[serde(default)]
    pub intermediate: bool,
    /// Row-major local matrix, identity when absent
    #[serde(default)]
    pub transform: Option<[f32; 16]>,
    #[serde(default)]
    pub mesh: Option<MeshDescription>,
    /// Whether the node's transform or visibility is driven
    #[serde(default)]
    pub animated: bool,
    #[serde(default)]
    pub curves: Vec<DrivenCurve>,
}

fn default_true() -> bool {
    true
}

impl NodeDescription {
    /// Declared transform, identity when absent
    pub fn local_matrix(&self) -> Mat4x4 {
        self.transform
            .as_ref()
            .map(Mat4x4::from_flat)
            .unwrap_or(Mat4x4::IDENTITY)
    }
}

/// Polygon mesh data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshDescription {
    pub positions: Vec<[f32; 3]>,
    /// Per-vertex normals; smoothed normals are computed when absent
    pub normals: Option<Vec<[f32; 3]>>,
    pub uvs: Vec<[f32; 2]>,
    pub colors: Vec<[f32; 4]>,
    pub polygons: Vec<Vec<CornerDescription>>,
    pub material: Option<MaterialDescription>,
}

/// A polygon corner, either a bare vertex id or a vertex/uv pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CornerDescription {
    Vertex(u32),
    Full(Corner),
}

impl CornerDescription {
    /// Bare vertex ids become corners without a uv
    pub fn to_corner(self) -> Corner {
        match self {
            CornerDescription::Vertex(vertex) => Corner::new(vertex, None),
            CornerDescription::Full(corner) => corner,
        }
    }
}

/// Diffuse channel of the shader assigned to a mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialDescription {
    /// Image file feeding the channel
    pub texture: Option<String>,
    /// Any other upstream node
    pub connection: Option<Connection>,
    /// The channel's own RGB value
    pub color: Option<[f32; 3]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_description() {
        let yaml = r#"
units:
  angular: 57.29578
nodes:
  - name: root
    transform: [1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 5, 0, 0, 1]
  - name: tri
    parent: root
    mesh:
      positions: [[0, 0, 0], [1, 0, 0], [0, 1, 0]]
      polygons: [[0, 1, 2]]
      material:
        color: [1, 0, 0]
"#;
        let scene = SceneDescription::from_yaml_str(yaml).unwrap();
        assert_eq!(scene.nodes.len(), 2);
        assert_eq!(scene.units.linear, 1.0);
        assert_eq!(scene.nodes[0].local_matrix().m[3][0], 5.0);

        let tri = &scene.nodes[1];
        assert!(tri.visible);
        assert_eq!(tri.parent.as_deref(), Some("root"));
        let mesh = tri.mesh.as_ref().unwrap();
        assert!(mesh.normals.is_none());
        assert_eq!(mesh.polygons[0][2].to_corner(), Corner::new(2, None));
    }

    #[test]
    fn test_json_corner_forms() {
        let json = r#"{"nodes": [{"name": "q", "mesh": {
            "positions": [[0,0,0],[1,0,0],[1,1,0]],
            "uvs": [[0,0],[1,0],[1,1]],
            "polygons": [[{"vertex": 0, "uv": 0}, {"vertex": 1, "uv": 1}, 2]]
        }}]}"#;
        let scene = SceneDescription::from_json_str(json).unwrap();
        let corners: Vec<Corner> = scene.nodes[0].mesh.as_ref().unwrap().polygons[0]
            .iter()
            .map(|c| c.to_corner())
            .collect();
        assert_eq!(
            corners,
            vec![Corner::new(0, Some(0)), Corner::new(1, Some(1)), Corner::new(2, None)]
        );
    }

    #[test]
    fn test_invalid_description() {
        let err = SceneDescription::from_json_str(r#"{"nodes": [{"visible": true}]}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidData { .. }));
    }
}
