//! Debug mesh render proxy
//!
//! Owns one drawable node parented under the entity's stage node.

use super::{insert_proxy, release_proxy, set_proxy_visible};
use crate::ecs::{Component, ComponentContext, ComponentId, System};
use crate::foundation::collections::NodeId;
use crate::scene::{Drawable, Shape};

/// Render proxy that puts a drawable on the stage for its entity
#[derive(Debug, Clone)]
pub struct MeshComponent {
    drawable: Drawable,
    node: Option<NodeId>,
}

impl MeshComponent {
    /// Proxy for a shape, white until colored
    pub fn new(shape: Shape) -> Self {
        Self {
            drawable: Drawable::new(shape),
            node: None,
        }
    }

    /// Builder: set color
    #[must_use]
    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.drawable.color = color;
        self
    }

    /// Drawable node created on awake
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// What gets drawn
    pub fn drawable(&self) -> &Drawable {
        &self.drawable
    }
}

impl Component for MeshComponent {
    const ID: ComponentId = ComponentId::new("MeshComponent");
    type System = MeshSystem;

    fn on_detach(&mut self, ctx: &mut ComponentContext<'_>) {
        release_proxy(ctx, &mut self.node);
    }
}

/// Creates, hides and removes mesh nodes
pub struct MeshSystem;

impl System<MeshComponent> for MeshSystem {
    fn on_awake(component: &mut MeshComponent, ctx: &mut ComponentContext<'_>) {
        component.node = insert_proxy(ctx, component.drawable.clone(), "mesh");
    }

    fn on_destroy(component: &mut MeshComponent, ctx: &mut ComponentContext<'_>) {
        release_proxy(ctx, &mut component.node);
    }

    fn on_enable(component: &mut MeshComponent, ctx: &mut ComponentContext<'_>) {
        set_proxy_visible(ctx, component.node, true);
    }

    fn on_disable(component: &mut MeshComponent, ctx: &mut ComponentContext<'_>) {
        set_proxy_visible(ctx, component.node, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::World;
    use crate::foundation::math::Vec3;
    use crate::scene::NodeKind;

    #[test]
    fn test_awake_creates_child_drawable() {
        let mut world = World::new();
        let e = world.spawn();
        let key = world
            .add_component(e, MeshComponent::new(Shape::Cuboid(Vec3::new(1.0, 1.0, 1.0))))
            .unwrap();

        let node = world.component::<MeshComponent>(key).unwrap().node().unwrap();
        let stage_node = world.stage().get(node).unwrap();
        assert_eq!(stage_node.parent(), world.node(e));
        assert!(matches!(stage_node.kind, NodeKind::Drawable(_)));
    }

    #[test]
    fn test_disable_hides_and_detach_removes() {
        let mut world = World::new();
        let e = world.spawn();
        let key = world.add_component(e, MeshComponent::new(Shape::Sphere(1.0))).unwrap();
        let node = world.component::<MeshComponent>(key).unwrap().node().unwrap();

        world.set_component_enabled(e, MeshComponent::ID, false).unwrap();
        assert!(!world.stage().get(node).unwrap().visible);

        world.remove_component(e, MeshComponent::ID).unwrap();
        assert!(!world.stage().contains(node));
    }

    #[test]
    fn test_entity_destroy_removes_node() {
        let mut world = World::new();
        let e = world.spawn();
        world.add_component(e, MeshComponent::new(Shape::Plane(2.0, 1.0))).unwrap();
        assert_eq!(world.stage().len(), 2);

        world.destroy(e).unwrap();
        assert!(world.stage().is_empty());
    }
}
