//! Context handed to component and system hooks

use super::error::EcsError;
use super::world::World;
use crate::foundation::collections::{ComponentKey, EntityId, NodeId};
use crate::scene::Stage;

/// Where a hook is running: the owning entity, the component's own key and
/// the world that holds both.
///
/// While a hook runs, its component is checked out of the world, so world
/// lookups do not see it. Removing the component or destroying its entity
/// from inside the hook is allowed and completes when the hook returns.
pub struct ComponentContext<'w> {
    world: &'w mut World,
    entity: EntityId,
    key: ComponentKey,
}

impl<'w> ComponentContext<'w> {
    pub(crate) fn new(world: &'w mut World, entity: EntityId, key: ComponentKey) -> Self {
        Self { world, entity, key }
    }

    /// Owning entity
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// This component's key
    pub fn key(&self) -> ComponentKey {
        self.key
    }

    /// The world
    pub fn world(&self) -> &World {
        self.world
    }

    /// The world, mutably
    pub fn world_mut(&mut self) -> &mut World {
        self.world
    }

    /// Render node mirroring the owning entity
    pub fn node(&self) -> Option<NodeId> {
        self.world.node(self.entity)
    }

    /// The world's render graph
    pub fn stage(&self) -> &Stage {
        self.world.stage()
    }

    /// The world's render graph, mutably
    pub fn stage_mut(&mut self) -> &mut Stage {
        self.world.stage_mut()
    }

    /// Detach this component from its entity
    pub fn remove_self(&mut self) -> Result<(), EcsError> {
        self.world.remove_component(self.entity, self.key)
    }

    /// Destroy the owning entity
    pub fn destroy_entity(&mut self) -> Result<(), EcsError> {
        self.world.destroy(self.entity)
    }
}
