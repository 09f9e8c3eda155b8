//! ECS error types

use super::component::ComponentId;
use crate::events::EventError;
use crate::foundation::collections::{EntityId, SubscriptionId};
use crate::scene::StageError;
use thiserror::Error;

/// Errors raised by [`World`](super::World) operations and component systems
#[derive(Error, Debug)]
pub enum EcsError {
    /// A component with the same tag is already attached
    #[error("Component {component} is already attached to entity {entity:?}")]
    DuplicateComponent {
        /// Target entity
        entity: EntityId,
        /// Tag of the rejected component
        component: ComponentId,
    },

    /// Nothing attached matches the query
    #[error("No component matching {query} on entity {entity:?}")]
    ComponentNotFound {
        /// Queried entity
        entity: EntityId,
        /// What was looked for, as displayed
        query: String,
    },

    /// Handle is stale or was never issued
    #[error("Entity {0:?} not found")]
    EntityNotFound(EntityId),

    /// The entity exists but has been destroyed
    #[error("Entity {0:?} has been destroyed")]
    EntityDestroyed(EntityId),

    /// Unsubscribe with a token that is not registered
    #[error("Subscription {0:?} not found")]
    SubscriptionNotFound(SubscriptionId),

    /// Parenting would make an entity its own ancestor
    #[error("Cannot parent entity {child:?} under {parent:?}: would create a cycle")]
    HierarchyCycle {
        /// Requested parent
        parent: EntityId,
        /// Entity being moved
        child: EntityId,
    },

    /// `child` is not a direct child of `parent`
    #[error("Entity {child:?} is not a child of {parent:?}")]
    NotAChild {
        /// Expected parent
        parent: EntityId,
        /// Entity that was expected to be a child
        child: EntityId,
    },

    /// Render graph failure while mirroring the hierarchy
    #[error("Stage error: {0}")]
    Stage(#[from] StageError),

    /// A system's step reported a failure
    #[error("System for {component} failed: {message}")]
    System {
        /// Tag of the component whose system failed
        component: ComponentId,
        /// Failure description
        message: String,
    },
}

impl EcsError {
    /// Failure raised from inside a system hook
    pub fn system(component: ComponentId, message: impl Into<String>) -> Self {
        Self::System {
            component,
            message: message.into(),
        }
    }
}

impl From<EventError> for EcsError {
    fn from(err: EventError) -> Self {
        match err {
            EventError::SubscriptionNotFound(id) => Self::SubscriptionNotFound(id),
        }
    }
}
