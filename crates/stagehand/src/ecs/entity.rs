//! Per-entity bookkeeping

use super::component::{AnyComponent, ComponentId};
use crate::events::EventRegistry;
use crate::foundation::collections::{ComponentKey, EntityId, NodeId};

/// Payload of add/remove component notifications
pub struct ComponentEvent<'a> {
    /// Entity the component was attached to or removed from
    pub entity: EntityId,
    /// Tag of the component
    pub id: ComponentId,
    /// Key the instance had while attached
    pub key: ComponentKey,
    /// The instance itself
    pub component: &'a dyn AnyComponent,
}

/// Callback run when an entity is destroyed
pub type DestroyHandler = dyn FnMut(EntityId);

/// Callback run when a component is attached or removed
pub type ComponentHandler = dyn FnMut(&ComponentEvent<'_>);

/// The three event registries every entity carries
#[derive(Default)]
pub(crate) struct EntityEvents {
    pub(crate) on_destroy: EventRegistry<DestroyHandler>,
    pub(crate) on_add_component: EventRegistry<ComponentHandler>,
    pub(crate) on_remove_component: EventRegistry<ComponentHandler>,
}

/// Which component registry a notification goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ComponentEventKind {
    Added,
    Removed,
}

/// Arena record for one game object
pub(crate) struct EntityRecord {
    pub(crate) name: Option<String>,
    /// Attached components in attach order
    pub(crate) components: Vec<ComponentKey>,
    pub(crate) parent: Option<EntityId>,
    pub(crate) children: Vec<EntityId>,
    pub(crate) node: NodeId,
    pub(crate) destroyed: bool,
    pub(crate) events: EntityEvents,
}

impl EntityRecord {
    pub(crate) fn new(name: Option<String>, node: NodeId) -> Self {
        Self {
            name,
            components: Vec::new(),
            parent: None,
            children: Vec::new(),
            node,
            destroyed: false,
            events: EntityEvents::default(),
        }
    }

    pub(crate) fn component_registry(
        &mut self,
        kind: ComponentEventKind,
    ) -> &mut EventRegistry<ComponentHandler> {
        match kind {
            ComponentEventKind::Added => &mut self.events.on_add_component,
            ComponentEventKind::Removed => &mut self.events.on_remove_component,
        }
    }
}
