//! ChsModel In-Memory Scene
//!
//! A small scene graph loaded from JSON or YAML descriptions. It implements
//! [`chsmodel_export::SceneSource`], so scenes can be exported without a host
//! application.

pub mod description;
pub mod normals;
pub mod scene;

pub use description::{CornerDescription, MaterialDescription, MeshDescription, NodeDescription, SceneDescription};
pub use normals::smooth_normals;
pub use scene::InMemoryScene;
