//! Scene collaborator interface.
//!
//! The exporter never walks a host scene graph itself. A host integration
//! (or the in-memory scene used by the CLI) implements [`SceneSource`] and the
//! pipeline only asks it the questions below, one mesh node at a time.

use chsmodel_core::{Color, Mat4x4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::animation::{CurveKind, UnitFactors};
use crate::material::MaterialChannel;

/// One polygon corner: a geometric vertex plus the uv it uses at that corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Corner {
    pub vertex: u32,
    #[serde(default)]
    pub uv: Option<u32>,
}

impl Corner {
    pub fn new(vertex: u32, uv: Option<u32>) -> Self {
        Self { vertex, uv }
    }
}

/// Per-mesh data sets the host can provide
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshCapabilities {
    /// Mesh has a usable uv set
    pub has_uv: bool,
    /// Mesh has a color set
    pub has_vertex_color: bool,
}

/// Coordinate space positions and normals are sampled in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingSpace {
    /// Mesh-local coordinates
    #[default]
    Object,
    /// Coordinates after the full parent chain
    World,
}

/// What sits on the other end of a material channel connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Connection {
    /// An image-producing node reading the given file
    Image { path: String },
    /// Any other shading node (ramps, procedurals, ...)
    Node { type_name: String },
}

/// Result of following one material channel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelQuery {
    /// Upstream connection, if the channel is driven
    pub connection: Option<Connection>,
    /// The channel's own RGB value, if readable
    pub value: Option<[f32; 3]>,
}

/// A keyframed curve driving one attribute of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrivenCurve {
    /// Curve object name, e.g. `pCube1_translateX`
    pub name: String,
    pub kind: CurveKind,
    /// `(time in seconds, raw value)` in source order
    pub keys: Vec<(f32, f32)>,
}

/// Read-only view of a host scene
pub trait SceneSource {
    /// Handle identifying a mesh node
    type Node: Clone + std::fmt::Debug;

    /// Mesh leaves, depth-first, in a deterministic order
    fn leaf_mesh_nodes(&self) -> Vec<Self::Node>;

    /// Whether the node is visible and not an intermediate object
    fn is_visible(&self, node: &Self::Node) -> bool;

    /// Name written as the mesh id
    fn mesh_name(&self, node: &Self::Node) -> String;

    fn mesh_capabilities(&self, node: &Self::Node) -> MeshCapabilities;

    /// Number of polygons in the source mesh
    fn polygon_count(&self, node: &Self::Node) -> usize;

    /// Polygon corners, polygon by polygon
    fn polygon_corners(&self, node: &Self::Node) -> Vec<Corner>;

    /// Homogeneous vertex position; `None` if the id is out of range
    fn vertex_position(&self, node: &Self::Node, vertex: u32, space: SamplingSpace) -> Option<Vec4>;

    /// Smoothed vertex normal; `None` if the id is out of range
    fn vertex_normal(&self, node: &Self::Node, vertex: u32, space: SamplingSpace) -> Option<Vec3>;

    fn uv(&self, node: &Self::Node, uv: u32) -> Option<Vec2>;

    fn vertex_color(&self, node: &Self::Node, vertex: u32) -> Option<Color>;

    fn local_transform(&self, node: &Self::Node) -> Mat4x4;

    /// Follow a material channel of the shader assigned to the node
    fn follow_channel(&self, node: &Self::Node, channel: MaterialChannel) -> ChannelQuery;

    /// Whether the node or any ancestor has a driven transform or visibility
    fn is_animated(&self, _node: &Self::Node) -> bool {
        false
    }

    /// Animation curves reachable upstream of the node
    fn driven_curves(&self, _node: &Self::Node) -> Vec<DrivenCurve> {
        Vec::new()
    }

    /// Host unit conversion factors
    fn unit_factors(&self) -> UnitFactors {
        UnitFactors::default()
    }
}
