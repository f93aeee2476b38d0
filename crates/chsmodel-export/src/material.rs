//! Material channel resolution

use chsmodel_core::{Color, Error, Result};
use tracing::{debug, warn};

use crate::source::{Connection, SceneSource};

/// Material inputs the exporter understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialChannel {
    Diffuse,
}

/// Static description of a material channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialChannelInfo {
    pub channel: MaterialChannel,
    /// Shader attribute followed on the host side
    pub host_attribute: &'static str,
    /// Property name written for a flat color
    pub property: &'static str,
    /// Sampler name written for a texture
    pub sampler: &'static str,
    /// Texture unit the sampler binds to
    pub unit: u32,
}

pub static MATERIAL_CHANNELS: [MaterialChannelInfo; 1] = [MaterialChannelInfo {
    channel: MaterialChannel::Diffuse,
    host_attribute: "color",
    property: "diffuseColor",
    sampler: "diffuseTexture",
    unit: 0,
}];

impl MaterialChannel {
    pub fn info(self) -> &'static MaterialChannelInfo {
        match self {
            MaterialChannel::Diffuse => &MATERIAL_CHANNELS[0],
        }
    }
}

/// Resolved diffuse channel of one mesh
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialRecord {
    /// Image file name, directories stripped
    Texture { filename: String },
    /// Flat color, alpha always 1.0
    Color(Color),
}

impl MaterialRecord {
    pub fn has_texture(&self) -> bool {
        matches!(self, MaterialRecord::Texture { .. })
    }
}

impl Default for MaterialRecord {
    fn default() -> Self {
        MaterialRecord::Color(Color::WHITE)
    }
}

/// Last path component, accepting both separator styles
pub fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Resolves material channels for one mesh node
pub struct MaterialResolver<'a, S: SceneSource> {
    source: &'a S,
    node: &'a S::Node,
    mesh: &'a str,
}

impl<'a, S: SceneSource> MaterialResolver<'a, S> {
    pub fn new(source: &'a S, node: &'a S::Node, mesh: &'a str) -> Self {
        Self { source, node, mesh }
    }

    /// Resolve a channel, reporting when neither a texture nor a value exists
    pub fn try_resolve(&self, channel: MaterialChannel) -> Result<MaterialRecord> {
        let query = self.source.follow_channel(self.node, channel);

        if let Some(Connection::Image { path }) = &query.connection {
            let filename = basename(path);
            if !filename.is_empty() {
                return Ok(MaterialRecord::Texture {
                    filename: filename.to_string(),
                });
            }
            debug!(mesh = %self.mesh, path = %path, "Image connection without file name");
        }

        match query.value {
            Some([r, g, b]) => Ok(MaterialRecord::Color(Color::rgb(r, g, b))),
            None => Err(Error::UnresolvableMaterial {
                mesh: self.mesh.to_string(),
                channel: channel.info().host_attribute.to_string(),
            }),
        }
    }

    /// Resolve a channel, falling back to opaque white
    pub fn resolve(&self, channel: MaterialChannel) -> MaterialRecord {
        self.try_resolve(channel).unwrap_or_else(|e| {
            warn!(error = %e, "Using default white material");
            MaterialRecord::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ChannelQuery;
    use crate::test_scene::{MockMesh, MockScene};

    fn scene_with(diffuse: ChannelQuery) -> MockScene {
        let mut mesh = MockMesh::quad("pPlane1");
        mesh.diffuse = diffuse;
        MockScene::with_meshes(vec![mesh])
    }

    fn resolve(scene: &MockScene) -> MaterialRecord {
        MaterialResolver::new(scene, &0, "pPlane1").resolve(MaterialChannel::Diffuse)
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("/textures/brick/wall.png"), "wall.png");
        assert_eq!(basename("C:\\art\\wood.tga"), "wood.tga");
        assert_eq!(basename("plain.jpg"), "plain.jpg");
        assert_eq!(basename("dir/"), "");
    }

    #[test]
    fn test_connected_image_becomes_texture() {
        let scene = scene_with(ChannelQuery {
            connection: Some(Connection::Image {
                path: "/project/sourceimages/brick.png".into(),
            }),
            value: Some([0.2, 0.3, 0.4]),
        });
        let record = resolve(&scene);
        assert_eq!(record, MaterialRecord::Texture { filename: "brick.png".into() });
        assert!(record.has_texture());
    }

    #[test]
    fn test_unconnected_channel_uses_own_color() {
        let scene = scene_with(ChannelQuery {
            connection: None,
            value: Some([0.2, 0.3, 0.4]),
        });
        let record = resolve(&scene);
        assert_eq!(record, MaterialRecord::Color(Color::new(0.2, 0.3, 0.4, 1.0)));
        assert!(!record.has_texture());
    }

    #[test]
    fn test_non_image_connection_falls_back_to_color() {
        let scene = scene_with(ChannelQuery {
            connection: Some(Connection::Node { type_name: "ramp".into() }),
            value: Some([1.0, 0.0, 0.0]),
        });
        assert_eq!(resolve(&scene), MaterialRecord::Color(Color::rgb(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_empty_image_path_falls_back_to_color() {
        let scene = scene_with(ChannelQuery {
            connection: Some(Connection::Image { path: "textures/".into() }),
            value: Some([0.0, 1.0, 0.0]),
        });
        assert_eq!(resolve(&scene), MaterialRecord::Color(Color::rgb(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_unresolvable_defaults_to_white() {
        let scene = scene_with(ChannelQuery::default());
        let resolver = MaterialResolver::new(&scene, &0, "pPlane1");

        let err = resolver.try_resolve(MaterialChannel::Diffuse).unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(resolver.resolve(MaterialChannel::Diffuse), MaterialRecord::Color(Color::WHITE));
    }
}
