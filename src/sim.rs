//! The simulation context owned by the render loop.
//!
//! One `Simulation` holds the scene graph and every piece of animation state;
//! the frame loop drains loader completions into it, advances it once per
//! frame, and hands its flattened instances to the renderer. All shared
//! mutable state lives here instead of in globals, and time is an explicit
//! argument throughout.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::Duration;

use glam::Vec3;
use rand::Rng;

use crate::animation::{advance_orbits, advance_spins, FadeIn, Group, GroupBindings, Spinner};
use crate::app;
use crate::assets::{bind, LoadCompletion};
use crate::mesh::{uv_sphere, MeshData};
use crate::scene::{DrawInstance, NodeId, SceneGraph, SceneNode};
use crate::starfield::{Integration, Starfield};

pub const EARTH_RADIUS: f32 = 18.0;
pub const SUN_RADIUS: f32 = 250.0;
pub const SUN_POSITION: Vec3 = Vec3::new(-400.0, 250.0, 250.0);
const SPHERE_SEGMENTS: u32 = 30;

pub struct Simulation {
    scene: SceneGraph,
    groups: GroupBindings,
    spinners: Vec<Spinner>,
    fade: FadeIn,
    starfield: Starfield,
    meshes: HashMap<String, MeshData>,
    overlay: Option<NodeId>,
    frame: u64,
}

impl Simulation {
    pub fn new(integration: Integration) -> Self {
        Self::with_rng(&mut rand::rng(), integration)
    }

    /// Builds the static scene topology: earth group (with the procedural
    /// earth sphere, rocket group and moon group inside), sun sphere aimed at
    /// the earth, ufo group, and the star layer.
    pub fn with_rng(rng: &mut impl Rng, integration: Integration) -> Self {
        let mut scene = SceneGraph::new();
        let mut meshes = HashMap::new();

        let planet = scene.insert_root(SceneNode::group("earth-group"));
        let mut earth = SceneNode::with_mesh("earth", "earth");
        earth.cast_shadow = true;
        scene.insert_child(planet, earth);
        meshes.insert(
            "earth".to_string(),
            uv_sphere(EARTH_RADIUS, SPHERE_SEGMENTS, SPHERE_SEGMENTS),
        );

        let rocket = scene.insert_child(planet, SceneNode::group("rocket-group"));
        let moon = scene.insert_child(planet, SceneNode::group("moon-group"));

        // The animated delta accumulates on the group; the sphere inside
        // keeps its fixed aim toward the earth.
        let sun = scene.insert_root(SceneNode::group("sun-group"));
        let mut sun_sphere = SceneNode::with_mesh("sun", "sun");
        sun_sphere.position = SUN_POSITION;
        sun_sphere.rotation = app::look_at_rotation(SUN_POSITION, Vec3::ZERO);
        sun_sphere.cast_shadow = true;
        scene.insert_child(sun, sun_sphere);
        meshes.insert(
            "sun".to_string(),
            uv_sphere(SUN_RADIUS, SPHERE_SEGMENTS, SPHERE_SEGMENTS),
        );

        let ufo = scene.insert_root(SceneNode::group("ufo-group"));

        Self {
            scene,
            groups: GroupBindings {
                rocket,
                moon,
                planet,
                sun,
                ufo,
            },
            spinners: Vec::new(),
            fade: FadeIn::new(),
            starfield: Starfield::new(rng, integration),
            meshes,
            overlay: None,
            frame: 0,
        }
    }

    /// Attaches a loader completion to the scene. `now` arms the fade timer
    /// when the overlay binds.
    pub fn absorb(&mut self, completion: LoadCompletion, now: Duration) {
        let outcome = bind(
            &mut self.scene,
            &self.groups,
            &mut self.spinners,
            &mut self.meshes,
            completion,
        );
        if let Some(id) = outcome.overlay {
            self.overlay = Some(id);
            self.fade.arm(now);
        }
    }

    /// One frame tick: group orbits, instance spins, overlay fade, starfield.
    pub fn advance_frame(&mut self, now: Duration) {
        advance_orbits(&mut self.scene, &self.groups);
        advance_spins(&mut self.scene, &self.spinners);
        if let Some(overlay) = self.overlay {
            self.scene.node_mut(overlay).opacity = self.fade.opacity(now);
        }
        self.starfield.step();
        self.frame += 1;
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn draw_instances(&self) -> Vec<DrawInstance> {
        self.scene.flatten()
    }

    pub fn meshes(&self) -> &HashMap<String, MeshData> {
        &self.meshes
    }

    pub fn starfield(&self) -> &Starfield {
        &self.starfield
    }

    pub fn starfield_mut(&mut self) -> &mut Starfield {
        &mut self.starfield
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn spinners(&self) -> &[Spinner] {
        &self.spinners
    }

    pub fn group_rotation(&self, group: Group) -> Vec3 {
        self.scene.node(self.groups.id(group)).rotation
    }

    pub fn overlay_opacity(&self) -> Option<f32> {
        self.overlay.map(|id| self.scene.node(id).opacity)
    }

    /// Human-readable final state, printed by the headless mode.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Final state after {} frames:", self.frame);
        for group in Group::ALL {
            let rotation = self.group_rotation(group);
            let _ = writeln!(
                out,
                " - {} rot=({:.4}, {:.4}, {:.4})",
                group.name(),
                rotation.x,
                rotation.y,
                rotation.z
            );
        }
        let velocity = self.starfield.velocities().first().copied().unwrap_or(0.0);
        let _ = writeln!(
            out,
            " - stars count={} yaw={:.4} velocity={:.4}",
            self.starfield.len(),
            self.starfield.yaw(),
            velocity
        );
        if let Some(opacity) = self.overlay_opacity() {
            let _ = writeln!(out, " - overlay opacity={opacity:.2}");
        }
        out
    }
}
