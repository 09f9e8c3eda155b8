//! Multi-subscriber event registries
//!
//! Key principles:
//! - Subscribing returns an opaque [`SubscriptionId`] token
//! - Unsubscribing by token is O(1) and reports unknown tokens
//! - Dispatch order is unspecified; handlers must not depend on each other

use crate::foundation::collections::{SlotMap, SubscriptionId};
use thiserror::Error;

/// Event registry errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventError {
    /// The token was never issued by this registry or was already removed
    #[error("Subscription {0:?} not found")]
    SubscriptionNotFound(SubscriptionId),
}

/// Ordered set of callbacks keyed by subscription token.
///
/// `F` is usually an unsized closure type such as `dyn FnMut(EntityId)`.
pub struct EventRegistry<F: ?Sized> {
    handlers: SlotMap<SubscriptionId, Box<F>>,
}

impl<F: ?Sized> EventRegistry<F> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            handlers: SlotMap::with_key(),
        }
    }

    /// Register a handler and return its token
    pub fn subscribe(&mut self, handler: Box<F>) -> SubscriptionId {
        self.handlers.insert(handler)
    }

    /// Remove a handler by token, dropping it
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> Result<(), EventError> {
        self.handlers
            .remove(id)
            .map(drop)
            .ok_or(EventError::SubscriptionNotFound(id))
    }

    /// Whether the token is still registered
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.handlers.contains_key(id)
    }

    /// Number of live subscriptions
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether there are no subscriptions
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Drop every handler
    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    /// Visit every handler once
    pub fn for_each_mut(&mut self, mut visit: impl FnMut(&mut F)) {
        for handler in self.handlers.values_mut() {
            visit(handler.as_mut());
        }
    }
}

impl<F: ?Sized> Default for EventRegistry<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> std::fmt::Debug for EventRegistry<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("subscriptions", &self.handlers.len())
            .finish()
    }
}
