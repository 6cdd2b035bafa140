//! Asset loading and scene binding.
//!
//! A worker thread reads and parses mesh files off the frame loop and hands
//! completions back over a channel; [`bind`] attaches each completion to the
//! scene graph the way the original presentation wires its load callbacks:
//! shadow flags on the whole subtree, a fixed placement, and cluster cloning
//! for the decorative meteorite sets. A failed load logs a warning and leaves
//! its group empty.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use glam::Vec3;
use log::{debug, warn};
use thiserror::Error;

use crate::animation::{Group, GroupBindings, Spinner};
use crate::app;
use crate::manifest::{AssetEntry, AssetKind};
use crate::mesh::{load_obj_from_str, MeshData};
use crate::scene::{NodeId, SceneGraph, SceneNode};

/// Distance from the camera to the overlay text, along the view direction.
const OVERLAY_DISTANCE: f32 = 85.0;
/// Overlay glow color (#fc6703).
const OVERLAY_COLOR: Vec3 = Vec3::new(252.0 / 255.0, 103.0 / 255.0, 3.0 / 255.0);

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// A successfully loaded asset, ready to bind.
#[derive(Debug, Clone)]
pub struct LoadCompletion {
    pub entry: AssetEntry,
    pub mesh: MeshData,
}

/// Background loader delivering completions over a channel. Loads complete
/// in no guaranteed order; the frame loop drains them between updates.
pub struct AssetLoader {
    receiver: Receiver<LoadCompletion>,
    handle: Option<JoinHandle<()>>,
}

impl AssetLoader {
    /// Spawns the worker thread for every manifest entry. Paths are resolved
    /// relative to `root`.
    pub fn spawn(root: PathBuf, entries: Vec<AssetEntry>) -> Self {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::spawn(move || {
            for entry in entries {
                match load_entry(&root, &entry) {
                    Ok(mesh) => {
                        debug!("loaded asset {} from {}", entry.name, entry.path);
                        if sender.send(LoadCompletion { entry, mesh }).is_err() {
                            return;
                        }
                    }
                    Err(err) => warn!("asset {} unavailable: {err:#}", entry.name),
                }
            }
        });
        Self {
            receiver,
            handle: Some(handle),
        }
    }

    /// Completions that have arrived since the last call. Never blocks.
    pub fn drain(&self) -> Vec<LoadCompletion> {
        self.receiver.try_iter().collect()
    }

    /// Blocks until the worker has attempted every entry and returns all
    /// remaining completions. Used by the headless mode to make frame counts
    /// deterministic.
    pub fn wait(mut self) -> Vec<LoadCompletion> {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.receiver.try_iter().collect()
    }
}

fn load_entry(root: &Path, entry: &AssetEntry) -> Result<MeshData, AssetError> {
    let path = root.join(&entry.path);
    let text = std::fs::read_to_string(&path).map_err(|source| AssetError::Read {
        path: path.clone(),
        source,
    })?;
    load_obj_from_str(&text).map_err(|source| AssetError::Parse { path, source })
}

/// Transform literals for a cluster instance, and its fixed spin velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterInstance {
    pub position: Vec3,
    pub velocity: Vec3,
    pub scale: f32,
}

const fn cluster(position: [f32; 3], velocity: [f32; 3], scale: f32) -> ClusterInstance {
    ClusterInstance {
        position: Vec3::new(position[0], position[1], position[2]),
        velocity: Vec3::new(velocity[0], velocity[1], velocity[2]),
        scale,
    }
}

/// First meteorite set: 6 instances.
pub const METEORITE_CLUSTER: [ClusterInstance; 6] = [
    cluster([0.0, 50.0, -200.0], [0.001, 0.002, 0.001], 150.0),
    cluster([150.0, 90.0, 50.0], [0.002, 0.001, 0.002], 230.0),
    cluster([-100.0, 90.0, -50.0], [0.003, 0.003, 0.001], 140.0),
    cluster([250.0, -200.0, -100.0], [0.001, 0.006, 0.002], 200.0),
    cluster([-70.0, -10.0, -10.0], [0.002, 0.002, 0.003], 45.0),
    cluster([-200.0, 60.0, -50.0], [0.003, 0.001, 0.004], 30.0),
];

/// Second meteorite set: 8 instances.
pub const METEORITE2_CLUSTER: [ClusterInstance; 8] = [
    cluster([50.0, 200.0, 120.0], [0.003, 0.002, 0.001], 150.0),
    cluster([10.0, -100.0, 70.0], [0.002, 0.001, 0.002], 130.0),
    cluster([-70.0, -90.0, -50.0], [0.003, 0.003, 0.001], 140.0),
    cluster([50.0, -50.0, -100.0], [0.001, 0.01, 0.005], 50.0),
    cluster([-70.0, -100.0, 70.0], [0.003, 0.003, 0.002], 105.0),
    cluster([150.0, -50.0, 50.0], [0.0025, 0.002, 0.004], 165.0),
    cluster([-100.0, 160.0, 50.0], [0.001, 0.004, 0.001], 140.0),
    cluster([150.0, 200.0, -50.0], [0.003, 0.006, 0.004], 20.0),
];

/// Cluster table and template scale for a known cluster asset.
pub fn cluster_table(name: &str) -> Option<(&'static [ClusterInstance], f32)> {
    match name {
        "meteorite" => Some((&METEORITE_CLUSTER, 60.0)),
        "meteorite2" => Some((&METEORITE2_CLUSTER, 100.0)),
        _ => None,
    }
}

/// Placement literal for a single-model asset: target group, position,
/// uniform scale.
fn model_placement(name: &str) -> Option<(Group, Vec3, f32)> {
    match name {
        "rocket" => Some((Group::Rocket, Vec3::new(0.0, 46.0, 0.0), 5.8)),
        "moon" => Some((Group::Moon, Vec3::new(80.0, 0.0, 0.0), 1.65)),
        "ufo" => Some((Group::Ufo, Vec3::new(100.0, 0.0, 0.0), 0.04)),
        _ => None,
    }
}

/// What binding a completion produced.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BindOutcome {
    /// Nodes inserted into the scene (the model node, or one per clone).
    pub inserted: Vec<NodeId>,
    /// Set when the overlay bound; the caller arms the fade timer.
    pub overlay: Option<NodeId>,
}

/// Attaches a loaded asset to the scene.
///
/// Models land in their named group; cluster templates are cloned once per
/// table row with the row's position, scale and spin; the overlay is placed
/// in front of the camera at opacity 0. Assets with no known placement are
/// dropped with a warning.
pub fn bind(
    scene: &mut SceneGraph,
    groups: &GroupBindings,
    spinners: &mut Vec<Spinner>,
    meshes: &mut HashMap<String, MeshData>,
    completion: LoadCompletion,
) -> BindOutcome {
    let LoadCompletion { entry, mesh } = completion;
    let mut outcome = BindOutcome::default();
    meshes.insert(entry.name.clone(), mesh);

    match entry.kind {
        AssetKind::Model => {
            let Some((group, position, scale)) = model_placement(&entry.name) else {
                warn!("no placement for model {}; leaving it unbound", entry.name);
                return outcome;
            };
            let mut node = SceneNode::with_mesh(&entry.name, &entry.name);
            node.position = position;
            node.scale = Vec3::splat(scale);
            let id = scene.insert_child(groups.id(group), node);
            scene.mark_shadows(id);
            outcome.inserted.push(id);
        }
        AssetKind::Cluster => {
            let Some((table, template_scale)) = cluster_table(&entry.name) else {
                warn!("no cluster table for {}; leaving it unbound", entry.name);
                return outcome;
            };
            let mut template = SceneNode::with_mesh(&entry.name, &entry.name);
            template.scale = Vec3::splat(template_scale);
            let template = scene.insert_detached(template);
            for (index, instance) in table.iter().enumerate() {
                let clone = scene.clone_subtree_as_root(template);
                let node = scene.node_mut(clone);
                node.name = format!("{}-{index}", entry.name);
                node.position = instance.position;
                node.scale = Vec3::splat(instance.scale);
                scene.mark_shadows(clone);
                spinners.push(Spinner {
                    node: clone,
                    velocity: instance.velocity,
                });
                outcome.inserted.push(clone);
            }
        }
        AssetKind::Overlay => {
            let forward = app::camera_forward();
            let mut node = SceneNode::with_mesh(&entry.name, &entry.name);
            node.position = app::CAMERA_POSITION + forward * OVERLAY_DISTANCE;
            node.rotation = app::look_at_rotation(node.position, app::CAMERA_POSITION);
            node.color = OVERLAY_COLOR;
            node.opacity = 0.0;
            let id = scene.insert_root(node);
            outcome.inserted.push(id);
            outcome.overlay = Some(id);
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneNode;
    use std::io::Write;

    fn scaffold() -> (SceneGraph, GroupBindings) {
        let mut scene = SceneGraph::new();
        let planet = scene.insert_root(SceneNode::group("planet"));
        let rocket = scene.insert_child(planet, SceneNode::group("rocket"));
        let moon = scene.insert_child(planet, SceneNode::group("moon"));
        let sun = scene.insert_root(SceneNode::group("sun"));
        let ufo = scene.insert_root(SceneNode::group("ufo"));
        (
            scene,
            GroupBindings {
                rocket,
                moon,
                planet,
                sun,
                ufo,
            },
        )
    }

    fn completion(name: &str, kind: AssetKind) -> LoadCompletion {
        LoadCompletion {
            entry: AssetEntry {
                name: name.to_string(),
                path: format!("models/{name}.obj"),
                kind,
            },
            mesh: stub_mesh(),
        }
    }

    fn stub_mesh() -> MeshData {
        load_obj_from_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap()
    }

    #[test]
    fn cluster_tables_match_configured_sizes() {
        assert_eq!(METEORITE_CLUSTER.len(), 6);
        assert_eq!(METEORITE2_CLUSTER.len(), 8);
        assert_eq!(METEORITE_CLUSTER[3].velocity, Vec3::new(0.001, 0.006, 0.002));
        assert_eq!(METEORITE2_CLUSTER[5].scale, 165.0);
        assert_eq!(METEORITE2_CLUSTER[7].position, Vec3::new(150.0, 200.0, -50.0));
    }

    #[test]
    fn model_binds_into_its_group_with_shadows() {
        let (mut scene, groups) = scaffold();
        let mut spinners = Vec::new();
        let mut meshes = HashMap::new();
        let outcome = bind(
            &mut scene,
            &groups,
            &mut spinners,
            &mut meshes,
            completion("rocket", AssetKind::Model),
        );

        assert_eq!(outcome.inserted.len(), 1);
        let id = outcome.inserted[0];
        assert_eq!(scene.children(groups.rocket), &[id]);
        let node = scene.node(id);
        assert_eq!(node.position, Vec3::new(0.0, 46.0, 0.0));
        assert_eq!(node.scale, Vec3::splat(5.8));
        assert!(node.cast_shadow && node.receive_shadow);
        assert!(spinners.is_empty());
        assert!(meshes.contains_key("rocket"));
    }

    #[test]
    fn cluster_binding_clones_every_table_row() {
        let (mut scene, groups) = scaffold();
        let mut spinners = Vec::new();
        let mut meshes = HashMap::new();
        let outcome = bind(
            &mut scene,
            &groups,
            &mut spinners,
            &mut meshes,
            completion("meteorite", AssetKind::Cluster),
        );

        assert_eq!(outcome.inserted.len(), 6);
        assert_eq!(spinners.len(), 6);
        for (index, (&id, instance)) in outcome
            .inserted
            .iter()
            .zip(METEORITE_CLUSTER.iter())
            .enumerate()
        {
            let node = scene.node(id);
            assert_eq!(node.position, instance.position, "instance {index}");
            assert_eq!(node.scale, Vec3::splat(instance.scale), "instance {index}");
            assert_eq!(spinners[index].node, id);
            assert_eq!(spinners[index].velocity, instance.velocity);
            assert!(node.cast_shadow);
        }
    }

    #[test]
    fn second_cluster_uses_its_own_table() {
        let (mut scene, groups) = scaffold();
        let mut spinners = Vec::new();
        let mut meshes = HashMap::new();
        let outcome = bind(
            &mut scene,
            &groups,
            &mut spinners,
            &mut meshes,
            completion("meteorite2", AssetKind::Cluster),
        );
        assert_eq!(outcome.inserted.len(), 8);
        assert_eq!(
            spinners[3].velocity,
            Vec3::new(0.001, 0.01, 0.005),
        );
    }

    #[test]
    fn overlay_starts_fully_transparent() {
        let (mut scene, groups) = scaffold();
        let mut spinners = Vec::new();
        let mut meshes = HashMap::new();
        let outcome = bind(
            &mut scene,
            &groups,
            &mut spinners,
            &mut meshes,
            completion("title", AssetKind::Overlay),
        );
        let id = outcome.overlay.expect("overlay id");
        let node = scene.node(id);
        assert_eq!(node.opacity, 0.0);
        let from_camera = (node.position - app::CAMERA_POSITION).length();
        assert!((from_camera - OVERLAY_DISTANCE).abs() < 1e-3);
    }

    #[test]
    fn unknown_model_is_dropped() {
        let (mut scene, groups) = scaffold();
        let before = scene.len();
        let mut spinners = Vec::new();
        let mut meshes = HashMap::new();
        let outcome = bind(
            &mut scene,
            &groups,
            &mut spinners,
            &mut meshes,
            completion("asteroid-belt", AssetKind::Model),
        );
        assert!(outcome.inserted.is_empty());
        assert_eq!(scene.len(), before);
    }

    #[test]
    fn loader_delivers_good_files_and_skips_bad_ones() {
        let dir = tempfile::tempdir().unwrap();
        let models = dir.path().join("models");
        std::fs::create_dir(&models).unwrap();
        let mut file = std::fs::File::create(models.join("rocket.obj")).unwrap();
        writeln!(file, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3").unwrap();

        let entries = vec![
            AssetEntry {
                name: "rocket".into(),
                path: "models/rocket.obj".into(),
                kind: AssetKind::Model,
            },
            AssetEntry {
                name: "moon".into(),
                path: "models/missing.obj".into(),
                kind: AssetKind::Model,
            },
        ];
        let loader = AssetLoader::spawn(dir.path().to_path_buf(), entries);
        let completions = loader.wait();
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].entry.name, "rocket");
        assert_eq!(completions[0].mesh.vertex_count(), 3);
    }
}
