//! Transform component
//!
//! Holds an entity's logical position, rotation and scale and pushes them
//! into the render nodes of its render proxies. Proxies are captured when
//! the transform attaches (for proxies already present) and through
//! `on_component_attached` for proxies attached later.

use super::{proxy_node, proxy_nodes};
use crate::ecs::{Component, ComponentContext, ComponentId, ComponentKey, EcsError, System};
use crate::foundation::collections::NodeId;
use crate::foundation::math::{Transform, Vec3};

/// Logical units to stage units
pub const DEFAULT_DIVIDER: f32 = 16.0;

/// Spatial state of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct TransformComponent {
    position: Vec3,
    /// Euler angles in radians
    rotation: Vec3,
    scale: Vec3,
    divider: f32,
    dirty: bool,
    targets: Vec<NodeId>,
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            divider: DEFAULT_DIVIDER,
            dirty: true,
            targets: Vec::new(),
        }
    }
}

impl TransformComponent {
    /// Identity transform
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from position only
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Builder: scale factor applied to positions when pushed into nodes
    #[must_use]
    pub fn with_divider(mut self, divider: f32) -> Self {
        self.divider = divider;
        self.dirty = true;
        self
    }

    /// Logical position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Euler rotation in radians
    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    /// Scale
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Set the logical position
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.dirty = true;
    }

    /// Move by a delta
    pub fn translate(&mut self, delta: Vec3) {
        self.set_position(self.position + delta);
    }

    /// Set the Euler rotation
    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = rotation;
        self.dirty = true;
    }

    /// Set the scale
    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.dirty = true;
    }

    /// Whether a push is pending for the next step
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Render nodes this transform drives
    pub fn targets(&self) -> &[NodeId] {
        &self.targets
    }

    /// Transform written into target nodes
    pub fn node_transform(&self) -> Transform {
        Transform::from_position(self.position * self.divider)
            .with_euler(self.rotation)
            .with_scale(self.scale)
    }

    fn capture(&mut self, node: Option<NodeId>) {
        if let Some(node) = node {
            if !self.targets.contains(&node) {
                self.targets.push(node);
                self.dirty = true;
            }
        }
    }
}

impl Component for TransformComponent {
    const ID: ComponentId = ComponentId::new("TransformComponent");
    type System = TransformSystem;

    fn on_attach(&mut self, ctx: &mut ComponentContext<'_>) {
        for node in proxy_nodes(ctx.world(), ctx.entity()) {
            self.capture(Some(node));
        }
    }

    fn on_detach(&mut self, _ctx: &mut ComponentContext<'_>) {
        self.targets.clear();
    }

    fn on_component_attached(
        &mut self,
        id: ComponentId,
        sibling: ComponentKey,
        ctx: &mut ComponentContext<'_>,
    ) {
        self.capture(proxy_node(ctx.world(), id, sibling));
    }
}

/// Pushes dirty transforms into their target nodes
pub struct TransformSystem;

impl System<TransformComponent> for TransformSystem {
    fn on_step(
        _dt: f32,
        component: &mut TransformComponent,
        ctx: &mut ComponentContext<'_>,
    ) -> Result<(), EcsError> {
        if !component.dirty {
            return Ok(());
        }
        let transform = component.node_transform();
        let stage = ctx.stage_mut();
        component.targets.retain(|id| stage.contains(*id));
        for id in &component.targets {
            if let Some(node) = stage.get_mut(*id) {
                node.transform = transform;
            }
        }
        component.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::{MeshComponent, SpriteComponent};
    use crate::ecs::World;
    use crate::scene::Shape;
    use approx::assert_relative_eq;

    fn mesh() -> MeshComponent {
        MeshComponent::new(Shape::Sphere(0.5))
    }

    #[test]
    fn test_captures_mesh_attached_later() {
        let mut world = World::new();
        let e = world.spawn();
        world.add_component(e, TransformComponent::from_position(Vec3::new(1.0, 2.0, 0.0))).unwrap();
        let mesh_key = world.add_component(e, mesh()).unwrap();

        let mesh_node = world.component::<MeshComponent>(mesh_key).unwrap().node().unwrap();
        assert_eq!(world.get_component::<TransformComponent>(e).unwrap().targets(), &[mesh_node]);

        world.step(e, 0.016).unwrap();
        let pushed = world.stage().get(mesh_node).unwrap().transform.position;
        assert_relative_eq!(pushed, Vec3::new(16.0, 32.0, 0.0));
        assert!(!world.get_component::<TransformComponent>(e).unwrap().is_dirty());
    }

    #[test]
    fn test_captures_mesh_attached_earlier() {
        let mut world = World::new();
        let e = world.spawn();
        world.add_component(e, mesh()).unwrap();
        world
            .add_component(e, TransformComponent::new().with_divider(1.0))
            .unwrap();

        let transform = world.get_component_mut::<TransformComponent>(e).unwrap();
        assert_eq!(transform.targets().len(), 1);
        transform.translate(Vec3::new(3.0, 0.0, 0.0));
        let target = transform.targets()[0];

        world.step(e, 0.016).unwrap();
        assert_relative_eq!(
            world.stage().get(target).unwrap().transform.position,
            Vec3::new(3.0, 0.0, 0.0)
        );
    }

    #[test]
    fn test_removed_mesh_is_dropped_from_targets() {
        let mut world = World::new();
        let e = world.spawn();
        world.add_component(e, TransformComponent::new()).unwrap();
        world.add_component(e, mesh()).unwrap();
        world.remove_component(e, MeshComponent::ID).unwrap();

        world.get_component_mut::<TransformComponent>(e).unwrap().set_scale(Vec3::new(2.0, 2.0, 2.0));
        world.step(e, 0.016).unwrap();
        assert!(world.get_component::<TransformComponent>(e).unwrap().targets().is_empty());
    }

    #[test]
    fn test_captures_sprite_and_mesh_proxies() {
        let mut world = World::new();
        let e = world.spawn();
        let sprite_key = world.add_component(e, SpriteComponent::new("hull")).unwrap();
        world
            .add_component(e, TransformComponent::from_position(Vec3::new(2.0, 1.0, 0.0)).with_divider(1.0))
            .unwrap();
        let mesh_key = world.add_component(e, mesh()).unwrap();

        let sprite_node = world.component::<SpriteComponent>(sprite_key).unwrap().node().unwrap();
        let mesh_node = world.component::<MeshComponent>(mesh_key).unwrap().node().unwrap();
        assert_eq!(
            world.get_component::<TransformComponent>(e).unwrap().targets(),
            &[sprite_node, mesh_node]
        );

        world.step(e, 0.016).unwrap();
        for node in [sprite_node, mesh_node] {
            assert_relative_eq!(
                world.stage().get(node).unwrap().transform.position,
                Vec3::new(2.0, 1.0, 0.0)
            );
        }
    }
}
