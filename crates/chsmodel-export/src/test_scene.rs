//! Minimal in-crate scene used by the unit tests

use chsmodel_core::{Color, Mat4x4, Vec2, Vec3, Vec4};

use crate::animation::UnitFactors;
use crate::material::MaterialChannel;
use crate::source::{
    ChannelQuery, Corner, DrivenCurve, MeshCapabilities, SamplingSpace, SceneSource,
};

#[derive(Debug, Clone, Default)]
pub struct MockMesh {
    pub name: String,
    pub visible: bool,
    pub positions: Vec<Vec4>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub colors: Vec<Color>,
    pub polygons: Vec<Vec<Corner>>,
    pub transform: Mat4x4,
    pub world: Mat4x4,
    pub diffuse: ChannelQuery,
    pub animated: bool,
    pub curves: Vec<DrivenCurve>,
}

impl MockMesh {
    /// A single quad split into two triangles sharing an edge
    pub fn quad(name: &str) -> Self {
        let corners = |ids: [u32; 3]| ids.iter().map(|&v| Corner::new(v, Some(v))).collect();
        Self {
            name: name.to_string(),
            visible: true,
            positions: vec![
                Vec4::point(0.0, 0.0, 0.0),
                Vec4::point(1.0, 0.0, 0.0),
                Vec4::point(1.0, 1.0, 0.0),
                Vec4::point(0.0, 1.0, 0.0),
            ],
            normals: vec![Vec3::new(0.0, 0.0, 2.0); 4],
            uvs: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            colors: Vec::new(),
            polygons: vec![corners([0, 1, 2]), corners([0, 2, 3])],
            transform: Mat4x4::IDENTITY,
            world: Mat4x4::IDENTITY,
            diffuse: ChannelQuery {
                connection: None,
                value: Some([0.5, 0.5, 0.5]),
            },
            animated: false,
            curves: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockScene {
    pub meshes: Vec<MockMesh>,
    pub units: UnitFactors,
}

impl MockScene {
    pub fn with_meshes(meshes: Vec<MockMesh>) -> Self {
        Self {
            meshes,
            units: UnitFactors::default(),
        }
    }
}

impl SceneSource for MockScene {
    type Node = usize;

    fn leaf_mesh_nodes(&self) -> Vec<usize> {
        (0..self.meshes.len()).collect()
    }

    fn is_visible(&self, node: &usize) -> bool {
        self.meshes[*node].visible
    }

    fn mesh_name(&self, node: &usize) -> String {
        self.meshes[*node].name.clone()
    }

    fn mesh_capabilities(&self, node: &usize) -> MeshCapabilities {
        let mesh = &self.meshes[*node];
        MeshCapabilities {
            has_uv: !mesh.uvs.is_empty(),
            has_vertex_color: !mesh.colors.is_empty(),
        }
    }

    fn polygon_count(&self, node: &usize) -> usize {
        self.meshes[*node].polygons.len()
    }

    fn polygon_corners(&self, node: &usize) -> Vec<Corner> {
        self.meshes[*node].polygons.concat()
    }

    fn vertex_position(&self, node: &usize, vertex: u32, space: SamplingSpace) -> Option<Vec4> {
        let mesh = &self.meshes[*node];
        let p = *mesh.positions.get(vertex as usize)?;
        Some(match space {
            SamplingSpace::Object => p,
            SamplingSpace::World => mesh.world.transform_point(&p),
        })
    }

    fn vertex_normal(&self, node: &usize, vertex: u32, space: SamplingSpace) -> Option<Vec3> {
        let mesh = &self.meshes[*node];
        let n = *mesh.normals.get(vertex as usize)?;
        Some(match space {
            SamplingSpace::Object => n,
            SamplingSpace::World => mesh.world.transform_normal(&n),
        })
    }

    fn uv(&self, node: &usize, uv: u32) -> Option<Vec2> {
        self.meshes[*node].uvs.get(uv as usize).copied()
    }

    fn vertex_color(&self, node: &usize, vertex: u32) -> Option<Color> {
        self.meshes[*node].colors.get(vertex as usize).copied()
    }

    fn local_transform(&self, node: &usize) -> Mat4x4 {
        self.meshes[*node].transform
    }

    fn follow_channel(&self, node: &usize, _channel: MaterialChannel) -> ChannelQuery {
        self.meshes[*node].diffuse.clone()
    }

    fn is_animated(&self, node: &usize) -> bool {
        self.meshes[*node].animated
    }

    fn driven_curves(&self, node: &usize) -> Vec<DrivenCurve> {
        self.meshes[*node].curves.clone()
    }

    fn unit_factors(&self) -> UnitFactors {
        self.units
    }
}
