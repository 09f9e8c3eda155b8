//! Box collider
//!
//! Tracks a world-space AABB for a box of fixed size that follows the
//! entity's render proxy (or the entity node when it has none). An optional
//! wireframe node shows the box when debugging.

use super::{proxy_node, proxy_nodes};
use crate::ecs::{Component, ComponentContext, ComponentId, ComponentKey, EcsError, System};
use crate::foundation::collections::NodeId;
use crate::foundation::math::Vec3;
use crate::scene::{Drawable, Node, Shape, AABB};

/// Axis-aligned collision volume
#[derive(Debug, Clone)]
pub struct BoxColliderComponent {
    size: Vec3,
    bounds: AABB,
    debug: bool,
    target: Option<NodeId>,
    debug_node: Option<NodeId>,
}

impl BoxColliderComponent {
    /// Box with the given full size
    pub fn new(size: Vec3) -> Self {
        Self {
            size,
            bounds: AABB::from_center_extents(Vec3::zeros(), size * 0.5),
            debug: false,
            target: None,
            debug_node: None,
        }
    }

    /// Builder: show a wireframe of the box
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// World-space bounds as of the last step
    pub fn bounds(&self) -> AABB {
        self.bounds
    }

    /// Whether two colliders overlap
    pub fn intersects(&self, other: &Self) -> bool {
        self.bounds.intersects(&other.bounds)
    }

    /// Node whose world transform the box follows
    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    fn local_box(&self) -> AABB {
        AABB::from_center_extents(Vec3::zeros(), self.size * 0.5)
    }

    fn refresh(&mut self, ctx: &mut ComponentContext<'_>) {
        let Some(follow) = self.target.filter(|t| ctx.stage().contains(*t)).or_else(|| ctx.node())
        else {
            return;
        };
        if let Some(matrix) = ctx.stage().world_transform(follow) {
            self.bounds = self.local_box().transformed(&matrix);
        }
        let follow_transform = self
            .target
            .and_then(|t| ctx.stage().get(t))
            .map(|node| node.transform);
        if let (Some(debug), Some(transform)) = (self.debug_node, follow_transform) {
            if let Some(node) = ctx.stage_mut().get_mut(debug) {
                node.transform = transform;
            }
        }
    }

    fn release_debug_node(&mut self, ctx: &mut ComponentContext<'_>) {
        if let Some(node) = self.debug_node.take() {
            if ctx.stage().contains(node) {
                if let Err(err) = ctx.stage_mut().remove(node) {
                    log::warn!("Failed to remove collider debug node: {err}");
                }
            }
        }
    }
}

impl Component for BoxColliderComponent {
    const ID: ComponentId = ComponentId::new("BoxColliderComponent");
    type System = BoxColliderSystem;

    fn on_attach(&mut self, ctx: &mut ComponentContext<'_>) {
        self.target = proxy_nodes(ctx.world(), ctx.entity()).first().copied();
        self.refresh(ctx);
    }

    fn on_detach(&mut self, ctx: &mut ComponentContext<'_>) {
        self.release_debug_node(ctx);
    }

    fn on_component_attached(
        &mut self,
        id: ComponentId,
        sibling: ComponentKey,
        ctx: &mut ComponentContext<'_>,
    ) {
        if self.target.is_none() {
            self.target = proxy_node(ctx.world(), id, sibling);
        }
    }
}

/// Keeps collider bounds in sync with the stage
pub struct BoxColliderSystem;

impl System<BoxColliderComponent> for BoxColliderSystem {
    fn on_awake(component: &mut BoxColliderComponent, ctx: &mut ComponentContext<'_>) {
        let parent = ctx.node();
        let mut node = Node::drawable(
            Drawable::new(Shape::Cuboid(component.size))
                .with_color([0.0, 1.0, 0.0, 1.0])
                .wireframe(),
        )
        .with_name("collider");
        node.visible = component.debug;
        match ctx.stage_mut().insert(node, parent) {
            Ok(id) => component.debug_node = Some(id),
            Err(err) => log::warn!("Collider debug node not created: {err}"),
        }
    }

    fn on_step(
        _dt: f32,
        component: &mut BoxColliderComponent,
        ctx: &mut ComponentContext<'_>,
    ) -> Result<(), EcsError> {
        component.refresh(ctx);
        Ok(())
    }

    fn on_destroy(component: &mut BoxColliderComponent, ctx: &mut ComponentContext<'_>) {
        component.release_debug_node(ctx);
    }
}
