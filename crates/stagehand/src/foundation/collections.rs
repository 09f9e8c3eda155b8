//! Handle types backed by slot maps
//!
//! Every arena in the engine (entities, component slots, stage nodes,
//! subscriptions, ticker tasks) is a [`SlotMap`] keyed by one of these
//! generational handles, so stale handles are detected instead of aliasing
//! a newer object.

pub use slotmap::{Key, SecondaryMap, SlotMap};

slotmap::new_key_type! {
    /// Identity of a game object in a [`World`](crate::ecs::World)
    pub struct EntityId;

    /// Identity of one attached component instance
    pub struct ComponentKey;

    /// Identity of a node in a [`Stage`](crate::scene::Stage)
    pub struct NodeId;

    /// Opaque token returned from an event subscription
    pub struct SubscriptionId;

    /// Handle to a per-frame ticker task
    pub struct TaskId;
}
