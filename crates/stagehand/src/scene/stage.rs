//! Stage render graph
//!
//! The stage is the engine's mirror of what a renderer draws: a forest of
//! nodes with transforms. Entity nodes stand in for game objects, drawable
//! nodes carry renderable shapes, and group nodes hold both together. The
//! ownership tree in [`World`](crate::ecs::World) is kept in sync with it
//! explicitly.

use crate::foundation::collections::{EntityId, NodeId, SlotMap};
use crate::foundation::math::{Mat4, Transform, Vec3};
use thiserror::Error;

/// Stage graph errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageError {
    /// Node handle is stale or was never issued by this stage
    #[error("Stage node {0:?} not found")]
    NodeNotFound(NodeId),

    /// Parenting would make a node its own ancestor
    #[error("Cannot parent node {node:?} under {parent:?}: would create a cycle")]
    HierarchyCycle {
        /// Node being moved
        node: NodeId,
        /// Requested parent
        parent: NodeId,
    },
}

/// Renderable geometry carried by a drawable node
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Axis-aligned box with the given full size
    Cuboid(Vec3),
    /// Sphere with the given radius
    Sphere(f32),
    /// Flat quad with width and height
    Plane(f32, f32),
    /// Textured 2D quad
    Sprite {
        /// Asset key of the texture
        texture: String,
        /// Width in stage units
        width: f32,
        /// Height in stage units
        height: f32,
    },
}

/// Something the render target draws
#[derive(Debug, Clone, PartialEq)]
pub struct Drawable {
    /// Geometry
    pub shape: Shape,
    /// RGBA color
    pub color: [f32; 4],
    /// Draw as wireframe (debug geometry)
    pub wireframe: bool,
}

impl Drawable {
    /// Solid white drawable
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            color: [1.0, 1.0, 1.0, 1.0],
            wireframe: false,
        }
    }

    /// Builder: set color
    #[must_use]
    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    /// Builder: draw as wireframe
    #[must_use]
    pub fn wireframe(mut self) -> Self {
        self.wireframe = true;
        self
    }
}

/// What a node stands for
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Plain transform node (scene roots, decoration groups)
    Group,
    /// Mirror of a game object
    Entity(EntityId),
    /// Renderable leaf
    Drawable(Drawable),
}

/// One node in the stage graph
#[derive(Debug, Clone)]
pub struct Node {
    /// Debug name
    pub name: Option<String>,
    /// Node payload
    pub kind: NodeKind,
    /// Local transform relative to the parent
    pub transform: Transform,
    /// Hidden nodes hide their whole subtree
    pub visible: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    /// Create a detached node
    pub fn new(kind: NodeKind) -> Self {
        Self {
            name: None,
            kind,
            transform: Transform::default(),
            visible: true,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Plain group node
    pub fn group() -> Self {
        Self::new(NodeKind::Group)
    }

    /// Drawable leaf node
    pub fn drawable(drawable: Drawable) -> Self {
        Self::new(NodeKind::Drawable(drawable))
    }

    /// Builder: set debug name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder: set local transform
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Parent node, if attached
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Entity mirrored by this node
    pub fn entity(&self) -> Option<EntityId> {
        match self.kind {
            NodeKind::Entity(entity) => Some(entity),
            _ => None,
        }
    }
}

/// Slot-map backed render graph
#[derive(Debug, Default)]
pub struct Stage {
    nodes: SlotMap<NodeId, Node>,
}

impl Stage {
    /// Create an empty stage
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
        }
    }

    /// Add a node with no parent
    pub fn insert_detached(&mut self, mut node: Node) -> NodeId {
        node.parent = None;
        node.children.clear();
        self.nodes.insert(node)
    }

    /// Add a node, optionally under a parent (appended as last child)
    pub fn insert(&mut self, mut node: Node, parent: Option<NodeId>) -> Result<NodeId, StageError> {
        if let Some(parent) = parent {
            if !self.nodes.contains_key(parent) {
                return Err(StageError::NodeNotFound(parent));
            }
        }
        node.parent = parent;
        node.children.clear();
        let id = self.nodes.insert(node);
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.push(id);
        }
        Ok(id)
    }

    /// Remove a node and its whole subtree; returns how many nodes went away
    pub fn remove(&mut self, id: NodeId) -> Result<usize, StageError> {
        self.detach(id)?;
        let doomed = self.subtree(id);
        for node in &doomed {
            self.nodes.remove(*node);
        }
        Ok(doomed.len())
    }

    /// Move a node under a new parent (`None` detaches it)
    pub fn reparent(&mut self, id: NodeId, parent: Option<NodeId>) -> Result<(), StageError> {
        if !self.nodes.contains_key(id) {
            return Err(StageError::NodeNotFound(id));
        }
        if let Some(parent) = parent {
            if !self.nodes.contains_key(parent) {
                return Err(StageError::NodeNotFound(parent));
            }
            if self.is_ancestor_or_self(id, parent) {
                return Err(StageError::HierarchyCycle { node: id, parent });
            }
        }
        self.detach(id)?;
        if let Some(parent) = parent {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.push(id);
            }
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = parent;
        }
        Ok(())
    }

    /// Unlink a node from its parent, keeping it and its subtree alive
    pub fn detach(&mut self, id: NodeId) -> Result<(), StageError> {
        let parent = self
            .nodes
            .get_mut(id)
            .ok_or(StageError::NodeNotFound(id))?
            .parent
            .take();
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|child| *child != id);
        }
        Ok(())
    }

    /// Look up a node
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Look up a node mutably
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Whether the handle refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the stage has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first pre-order walk from `start`, children in insertion order
    pub fn traverse(
        &self,
        start: NodeId,
        mut visit: impl FnMut(NodeId, &Node),
    ) -> Result<(), StageError> {
        if !self.nodes.contains_key(start) {
            return Err(StageError::NodeNotFound(start));
        }
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(id) {
                visit(id, node);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        Ok(())
    }

    /// `start` and all of its descendants in traversal order
    pub fn subtree(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        // A missing start simply yields an empty list.
        let _ = self.traverse(start, |id, _| out.push(id));
        out
    }

    /// Composite transform from the graph root down to `id`
    pub fn world_transform(&self, id: NodeId) -> Option<Mat4> {
        let mut node = self.nodes.get(id)?;
        let mut matrix = node.transform.to_matrix();
        while let Some(parent) = node.parent.and_then(|p| self.nodes.get(p)) {
            matrix = parent.transform.to_matrix() * matrix;
            node = parent;
        }
        Some(matrix)
    }

    /// A node renders only if it and every ancestor are visible
    pub fn is_visible_in_tree(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current.and_then(|c| self.nodes.get(c)) {
            if !node.visible {
                return false;
            }
            current = node.parent;
        }
        current.is_none()
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, mut id: NodeId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.nodes.get(id).and_then(|node| node.parent) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }
}
