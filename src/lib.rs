//! A decorative 3D space scene: a textured earth orbited by a rocket and
//! moon, a sun, spinning meteorite clusters, a UFO, a starfield and a glowing
//! fade-in title.
//!
//! The crate separates the simulation (scene graph plus per-frame animation
//! state, all plain data driven by explicit time) from the wgpu renderer and
//! the window host, so the whole animation system runs and tests headless.

pub mod animation;
pub mod app;
pub mod assets;
pub mod manifest;
pub mod mesh;
pub mod render;
pub mod scene;
pub mod sim;
pub mod starfield;

pub use animation::{FadeIn, Group, GroupBindings, Spinner};
pub use app::WindowViewport;
pub use assets::{AssetError, AssetLoader, LoadCompletion};
pub use manifest::{AssetEntry, AssetKind, Manifest};
pub use mesh::{load_obj_from_str, uv_sphere, MeshData};
pub use render::{CameraParams, LightParams, Renderer};
pub use scene::{DrawInstance, NodeId, SceneGraph, SceneNode};
pub use sim::Simulation;
pub use starfield::{Integration, Starfield};
