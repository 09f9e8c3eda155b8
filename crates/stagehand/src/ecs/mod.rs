//! Entity-Component-System runtime
//!
//! Game objects live in a [`World`] arena. Each attached [`Component`] is
//! paired at compile time with a stateless [`System`] that implements its
//! behavior; the world drives attach/detach lifecycles and per-frame
//! stepping through that pairing.

pub mod component;
pub mod components;
pub mod context;
pub mod entity;
pub mod error;
pub mod system;
pub mod world;

pub use component::{AnyComponent, Component, ComponentId, ComponentQuery};
pub use context::ComponentContext;
pub use entity::{ComponentEvent, ComponentHandler, DestroyHandler};
pub use error::EcsError;
pub use system::System;
pub use world::World;

pub use crate::foundation::collections::{ComponentKey, EntityId};
