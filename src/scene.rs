use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Handle to a node stored in a [`SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

/// A point in the scene graph: local transform, optional mesh payload and
/// the render attributes the shader cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<String>,
    #[serde(default)]
    pub position: Vec3,
    /// Euler angles in radians, applied Z * Y * X.
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
    #[serde(default = "default_color")]
    pub color: Vec3,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default)]
    pub cast_shadow: bool,
    #[serde(default)]
    pub receive_shadow: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<NodeId>,
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

fn default_color() -> Vec3 {
    Vec3::ONE
}

fn default_opacity() -> f32 {
    1.0
}

impl Default for SceneNode {
    fn default() -> Self {
        Self {
            name: String::new(),
            mesh: None,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            color: default_color(),
            opacity: 1.0,
            cast_shadow: false,
            receive_shadow: false,
            children: Vec::new(),
        }
    }
}

impl SceneNode {
    /// Creates an empty group node. Groups carry no mesh and exist only to
    /// propagate their transform to children.
    pub fn group(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Creates a node that renders the named mesh.
    pub fn with_mesh(name: &str, mesh: &str) -> Self {
        Self {
            name: name.to_string(),
            mesh: Some(mesh.to_string()),
            ..Self::default()
        }
    }

    /// Local transform matrix: translation * rotation (Z, then Y, then X) * scale.
    pub fn local_matrix(&self) -> Mat4 {
        let rotation = Mat4::from_rotation_z(self.rotation.z)
            * Mat4::from_rotation_y(self.rotation.y)
            * Mat4::from_rotation_x(self.rotation.x);
        Mat4::from_translation(self.position) * rotation * Mat4::from_scale(self.scale)
    }
}

/// A mesh-bearing node flattened into world space, ready for the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawInstance {
    pub mesh: String,
    pub model: Mat4,
    pub color: Vec3,
    pub opacity: f32,
}

/// Arena-backed scene graph. Nodes are owned by the graph; parents own their
/// children only in the transform-propagation sense.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    roots: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node as a top-level root.
    pub fn insert_root(&mut self, node: SceneNode) -> NodeId {
        let id = self.push(node);
        self.roots.push(id);
        id
    }

    /// Inserts a node that is neither a root nor anyone's child. Detached
    /// nodes are never drawn; cluster templates live here so they can be
    /// cloned without appearing in the scene themselves.
    pub fn insert_detached(&mut self, node: SceneNode) -> NodeId {
        self.push(node)
    }

    /// Inserts a node as a child of `parent`.
    ///
    /// # Panics
    /// Panics if `parent` is not a valid id for this graph.
    pub fn insert_child(&mut self, parent: NodeId, node: SceneNode) -> NodeId {
        let id = self.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    fn push(&mut self, node: SceneNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SceneNode {
        &mut self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Depth-first ids of `id` and every node below it.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            for child in self.nodes[current.0].children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// Marks every mesh node in the subtree as shadow-casting and
    /// shadow-receiving.
    pub fn mark_shadows(&mut self, root: NodeId) {
        for id in self.descendants(root) {
            let node = &mut self.nodes[id.0];
            if node.mesh.is_some() {
                node.cast_shadow = true;
                node.receive_shadow = true;
            }
        }
    }

    /// Deep-copies the subtree rooted at `template` and inserts the copy as a
    /// new top-level root. The copy shares nothing with the template.
    pub fn clone_subtree_as_root(&mut self, template: NodeId) -> NodeId {
        let copy = self.clone_into(template);
        self.roots.push(copy);
        copy
    }

    fn clone_into(&mut self, source: NodeId) -> NodeId {
        let mut node = self.nodes[source.0].clone();
        let children = std::mem::take(&mut node.children);
        let id = self.push(node);
        for child in children {
            let copy = self.clone_into(child);
            self.nodes[id.0].children.push(copy);
        }
        id
    }

    /// Flattens the graph into world-space draw instances, depth-first from
    /// the roots, propagating parent transforms.
    pub fn flatten(&self) -> Vec<DrawInstance> {
        let mut out = Vec::new();
        for root in &self.roots {
            self.flatten_from(*root, Mat4::IDENTITY, &mut out);
        }
        out
    }

    fn flatten_from(&self, id: NodeId, parent: Mat4, out: &mut Vec<DrawInstance>) {
        let node = &self.nodes[id.0];
        let world = parent * node.local_matrix();
        if let Some(mesh) = &node.mesh {
            out.push(DrawInstance {
                mesh: mesh.clone(),
                model: world,
                color: node.color,
                opacity: node.opacity,
            });
        }
        for child in &node.children {
            self.flatten_from(*child, world, out);
        }
    }
}
