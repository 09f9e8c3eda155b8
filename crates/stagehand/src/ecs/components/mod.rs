//! Built-in components
//!
//! Render proxies, transform propagation, box colliders and frame-driven
//! animation, each with its system.

pub mod box_collider;
pub mod generic_animation;
pub mod mesh;
pub mod sprite;
pub mod transform;

pub use box_collider::{BoxColliderComponent, BoxColliderSystem};
pub use generic_animation::{GenericAnimationComponent, GenericAnimationSystem};
pub use mesh::{MeshComponent, MeshSystem};
pub use sprite::{SpriteComponent, SpriteSystem};
pub use transform::{TransformComponent, TransformSystem};

use crate::ecs::component::Component;
use crate::ecs::{ComponentContext, ComponentId, ComponentKey, EntityId, World};
use crate::foundation::collections::NodeId;
use crate::scene::{Drawable, Node};

/// Stage node of the render proxy attached as `key`, if `id` names one
pub(crate) fn proxy_node(world: &World, id: ComponentId, key: ComponentKey) -> Option<NodeId> {
    if id == MeshComponent::ID {
        world.component::<MeshComponent>(key).and_then(MeshComponent::node)
    } else if id == SpriteComponent::ID {
        world.component::<SpriteComponent>(key).and_then(SpriteComponent::node)
    } else {
        None
    }
}

/// Stage nodes of every render proxy on `entity`, in attach order
pub(crate) fn proxy_nodes(world: &World, entity: EntityId) -> Vec<NodeId> {
    world
        .component_keys(entity)
        .into_iter()
        .filter_map(|key| {
            let id = world.component_dyn(key)?.id();
            proxy_node(world, id, key)
        })
        .collect()
}

/// Insert a drawable node under the entity's stage node
fn insert_proxy(ctx: &mut ComponentContext<'_>, drawable: Drawable, name: &str) -> Option<NodeId> {
    let parent = ctx.node();
    let node = Node::drawable(drawable).with_name(name);
    match ctx.stage_mut().insert(node, parent) {
        Ok(id) => Some(id),
        Err(err) => {
            log::warn!("{name} for {:?} has no stage node: {err}", ctx.entity());
            None
        }
    }
}

fn release_proxy(ctx: &mut ComponentContext<'_>, node: &mut Option<NodeId>) {
    if let Some(id) = node.take() {
        if ctx.stage().contains(id) {
            if let Err(err) = ctx.stage_mut().remove(id) {
                log::warn!("Failed to remove render proxy node: {err}");
            }
        }
    }
}

fn set_proxy_visible(ctx: &mut ComponentContext<'_>, node: Option<NodeId>, visible: bool) {
    let Some(id) = node else { return };
    if let Some(node) = ctx.stage_mut().get_mut(id) {
        node.visible = visible;
    }
}
