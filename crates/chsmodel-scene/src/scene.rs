//! In-memory scene graph

use std::collections::HashMap;
use std::path::Path;

use chsmodel_core::{Color, Error, Mat4x4, Result, ResultExt, Vec2, Vec3, Vec4};
use chsmodel_export::{
    ChannelQuery, Connection, Corner, DrivenCurve, MaterialChannel, MeshCapabilities,
    SamplingSpace, SceneSource, UnitFactors,
};
use tracing::debug;

use crate::description::{MaterialDescription, NodeDescription, SceneDescription};
use crate::normals::smooth_normals;

/// Resolved mesh data of one node
#[derive(Debug, Clone)]
struct SceneMesh {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    uvs: Vec<Vec2>,
    colors: Vec<Color>,
    polygons: Vec<Vec<Corner>>,
    material: Option<MaterialDescription>,
}

#[derive(Debug, Clone)]
struct SceneNode {
    name: String,
    parent: Option<usize>,
    children: Vec<usize>,
    visible: bool,
    intermediate: bool,
    transform: Mat4x4,
    animated: bool,
    curves: Vec<DrivenCurve>,
    mesh: Option<SceneMesh>,
}

/// Scene graph built from a [`SceneDescription`]
///
/// Nodes are addressed by their index in the description.
#[derive(Debug, Clone)]
pub struct InMemoryScene {
    nodes: Vec<SceneNode>,
    roots: Vec<usize>,
    units: UnitFactors,
}

impl InMemoryScene {
    /// Load and validate a `.json`, `.yaml` or `.yml` scene description
    pub fn from_path(path: &Path) -> Result<Self> {
        SceneDescription::from_path(path)
            .and_then(Self::from_description)
            .with_context(|| format!("loading scene {}", path.display()))
    }

    /// Resolve parents, check the hierarchy and prepare normals
    pub fn from_description(description: SceneDescription) -> Result<Self> {
        let mut index = HashMap::with_capacity(description.nodes.len());
        for (i, node) in description.nodes.iter().enumerate() {
            if index.insert(node.name.clone(), i).is_some() {
                return Err(Error::invalid_data(format!("duplicate node name '{}'", node.name)));
            }
        }

        let mut nodes = Vec::with_capacity(description.nodes.len());
        for node in description.nodes {
            let parent = match &node.parent {
                Some(name) => Some(*index.get(name).ok_or_else(|| {
                    Error::invalid_data(format!(
                        "node '{}' has unknown parent '{}'",
                        node.name, name
                    ))
                })?),
                None => None,
            };
            nodes.push(Self::build_node(node, parent)?);
        }

        let mut roots = Vec::new();
        for i in 0..nodes.len() {
            let parent = nodes[i].parent;
            match parent {
                Some(p) => nodes[p].children.push(i),
                None => roots.push(i),
            }
        }

        let scene = Self {
            nodes,
            roots,
            units: description.units,
        };
        for i in 0..scene.nodes.len() {
            if scene.ancestors(i).any(|a| a == i) {
                return Err(Error::invalid_data(format!(
                    "node '{}' is its own ancestor",
                    scene.nodes[i].name
                )));
            }
        }

        debug!(
            nodes = scene.nodes.len(),
            meshes = scene.nodes.iter().filter(|n| n.mesh.is_some()).count(),
            "Scene loaded"
        );
        Ok(scene)
    }

    fn build_node(node: NodeDescription, parent: Option<usize>) -> Result<SceneNode> {
        let transform = node.local_matrix();
        let mesh = match node.mesh {
            Some(mesh) => {
                let positions: Vec<Vec3> = mesh.positions.into_iter().map(Vec3::from).collect();
                let polygons: Vec<Vec<Corner>> = mesh
                    .polygons
                    .into_iter()
                    .map(|p| p.into_iter().map(|c| c.to_corner()).collect())
                    .collect();
                let normals = match mesh.normals {
                    Some(normals) if normals.len() == positions.len() => {
                        normals.into_iter().map(Vec3::from).collect()
                    }
                    Some(normals) => {
                        return Err(Error::invalid_data(format!(
                            "node '{}' has {} normals for {} positions",
                            node.name,
                            normals.len(),
                            positions.len()
                        )))
                    }
                    None => smooth_normals(&positions, &polygons),
                };
                Some(SceneMesh {
                    positions,
                    normals,
                    uvs: mesh.uvs.into_iter().map(Vec2::from).collect(),
                    colors: mesh.colors.into_iter().map(Color::from).collect(),
                    polygons,
                    material: mesh.material,
                })
            }
            None => None,
        };

        Ok(SceneNode {
            name: node.name,
            parent,
            children: Vec::new(),
            visible: node.visible,
            intermediate: node.intermediate,
            transform,
            animated: node.animated,
            curves: node.curves,
            mesh,
        })
    }

    /// Number of nodes, meshless ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the scene has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Index of the first node named `name`
    pub fn find(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    /// Parent chain, nearest first. Bounded by the node count.
    fn ancestors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.nodes[node].parent, move |&p| self.nodes[p].parent)
            .take(self.nodes.len())
    }

    /// Local matrix composed with every ancestor (row vectors: `p * L * P`)
    pub fn world_matrix(&self, node: usize) -> Mat4x4 {
        self.ancestors(node).fold(self.nodes[node].transform, |m, a| {
            m.multiply(&self.nodes[a].transform)
        })
    }

    fn mesh(&self, node: usize) -> Option<&SceneMesh> {
        self.nodes.get(node).and_then(|n| n.mesh.as_ref())
    }
}

impl SceneSource for InMemoryScene {
    type Node = usize;

    fn leaf_mesh_nodes(&self) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if self.nodes[node].mesh.is_some() {
                out.push(node);
            }
            stack.extend(self.nodes[node].children.iter().rev());
        }
        out
    }

    fn is_visible(&self, node: &usize) -> bool {
        let n = &self.nodes[*node];
        n.visible && !n.intermediate && self.ancestors(*node).all(|a| self.nodes[a].visible)
    }

    fn mesh_name(&self, node: &usize) -> String {
        self.nodes[*node].name.clone()
    }

    fn mesh_capabilities(&self, node: &usize) -> MeshCapabilities {
        self.mesh(*node)
            .map(|m| MeshCapabilities {
                has_uv: !m.uvs.is_empty(),
                has_vertex_color: !m.colors.is_empty(),
            })
            .unwrap_or_default()
    }

    fn polygon_count(&self, node: &usize) -> usize {
        self.mesh(*node).map_or(0, |m| m.polygons.len())
    }

    fn polygon_corners(&self, node: &usize) -> Vec<Corner> {
        self.mesh(*node).map(|m| m.polygons.concat()).unwrap_or_default()
    }

    fn vertex_position(&self, node: &usize, vertex: u32, space: SamplingSpace) -> Option<Vec4> {
        let p = self.mesh(*node)?.positions.get(vertex as usize)?;
        let point = Vec4::point(p.x, p.y, p.z);
        Some(match space {
            SamplingSpace::Object => point,
            SamplingSpace::World => self.world_matrix(*node).transform_point(&point),
        })
    }

    fn vertex_normal(&self, node: &usize, vertex: u32, space: SamplingSpace) -> Option<Vec3> {
        let n = *self.mesh(*node)?.normals.get(vertex as usize)?;
        Some(match space {
            SamplingSpace::Object => n,
            SamplingSpace::World => self.world_matrix(*node).transform_normal(&n),
        })
    }

    fn uv(&self, node: &usize, uv: u32) -> Option<Vec2> {
        self.mesh(*node)?.uvs.get(uv as usize).copied()
    }

    fn vertex_color(&self, node: &usize, vertex: u32) -> Option<Color> {
        self.mesh(*node)?.colors.get(vertex as usize).copied()
    }

    fn local_transform(&self, node: &usize) -> Mat4x4 {
        self.nodes[*node].transform
    }

    fn follow_channel(&self, node: &usize, _channel: MaterialChannel) -> ChannelQuery {
        match self.mesh(*node).and_then(|m| m.material.as_ref()) {
            Some(material) => ChannelQuery {
                connection: material
                    .texture
                    .clone()
                    .map(|path| Connection::Image { path })
                    .or_else(|| material.connection.clone()),
                value: material.color,
            },
            None => ChannelQuery::default(),
        }
    }

    fn is_animated(&self, node: &usize) -> bool {
        self.nodes[*node].animated || self.ancestors(*node).any(|a| self.nodes[a].animated)
    }

    fn driven_curves(&self, node: &usize) -> Vec<DrivenCurve> {
        self.nodes[*node].curves.clone()
    }

    fn unit_factors(&self) -> UnitFactors {
        self.units
    }
}
