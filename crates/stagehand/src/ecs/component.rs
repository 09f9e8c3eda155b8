//! Component identity and type-erased dispatch
//!
//! A component kind names its tag and its [`System`] at definition time:
//!
//! ```
//! use stagehand::ecs::{Component, ComponentId, System};
//!
//! struct Health(u32);
//! struct HealthSystem;
//!
//! impl System<Health> for HealthSystem {}
//!
//! impl Component for Health {
//!     const ID: ComponentId = ComponentId::new("Health");
//!     type System = HealthSystem;
//! }
//! ```
//!
//! The pairing is resolved by the compiler, so there is no tag-to-system
//! table that could be missing an entry at runtime.

use super::context::ComponentContext;
use super::error::EcsError;
use super::system::System;
use crate::foundation::collections::ComponentKey;
use std::any::Any;
use std::fmt;

/// Identity tag shared by every instance of one component kind.
///
/// Attachment checks and `has_component` compare tags, never Rust types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(&'static str);

impl ComponentId {
    /// Wrap a tag string
    pub const fn new(tag: &'static str) -> Self {
        Self(tag)
    }

    /// The tag string
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A unit of per-entity state whose behavior lives in its [`System`].
///
/// The hooks here are the component's own reactions; the system hooks cover
/// awake, step, enable/disable and destroy.
pub trait Component: Any + Sized {
    /// Identity tag, unique per component kind
    const ID: ComponentId;

    /// Stateless dispatcher for this kind
    type System: System<Self>;

    /// Called once after the system's `on_awake`, when attached to an entity
    fn on_attach(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Called when removed from its entity (not on entity destruction)
    fn on_detach(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// A sibling attached after this one has just finished attaching
    fn on_component_attached(
        &mut self,
        _id: ComponentId,
        _sibling: ComponentKey,
        _ctx: &mut ComponentContext<'_>,
    ) {
    }
}

/// Object-safe view of any [`Component`], used for storage and dispatch
pub trait AnyComponent: Any {
    /// Identity tag of the concrete kind
    fn id(&self) -> ComponentId;

    /// Rust type name, for diagnostics
    fn type_name(&self) -> &'static str;

    /// Upcast for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Owned upcast for downcasting
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Run the system's `on_awake`
    fn system_awake(&mut self, ctx: &mut ComponentContext<'_>);

    /// Run the system's `on_step`
    fn system_step(&mut self, dt: f32, ctx: &mut ComponentContext<'_>) -> Result<(), EcsError>;

    /// Run the system's `on_destroy`
    fn system_destroy(&mut self, ctx: &mut ComponentContext<'_>);

    /// Run the system's `on_enable`
    fn system_enable(&mut self, ctx: &mut ComponentContext<'_>);

    /// Run the system's `on_disable`
    fn system_disable(&mut self, ctx: &mut ComponentContext<'_>);

    /// Run the component's `on_attach`
    fn hook_attach(&mut self, ctx: &mut ComponentContext<'_>);

    /// Run the component's `on_detach`
    fn hook_detach(&mut self, ctx: &mut ComponentContext<'_>);

    /// Run the component's `on_component_attached`
    fn hook_component_attached(
        &mut self,
        id: ComponentId,
        sibling: ComponentKey,
        ctx: &mut ComponentContext<'_>,
    );
}

impl<C: Component> AnyComponent for C {
    fn id(&self) -> ComponentId {
        C::ID
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<C>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn system_awake(&mut self, ctx: &mut ComponentContext<'_>) {
        <C::System as System<C>>::on_awake(self, ctx);
    }

    fn system_step(&mut self, dt: f32, ctx: &mut ComponentContext<'_>) -> Result<(), EcsError> {
        <C::System as System<C>>::on_step(dt, self, ctx)
    }

    fn system_destroy(&mut self, ctx: &mut ComponentContext<'_>) {
        <C::System as System<C>>::on_destroy(self, ctx);
    }

    fn system_enable(&mut self, ctx: &mut ComponentContext<'_>) {
        <C::System as System<C>>::on_enable(self, ctx);
    }

    fn system_disable(&mut self, ctx: &mut ComponentContext<'_>) {
        <C::System as System<C>>::on_disable(self, ctx);
    }

    fn hook_attach(&mut self, ctx: &mut ComponentContext<'_>) {
        Component::on_attach(self, ctx);
    }

    fn hook_detach(&mut self, ctx: &mut ComponentContext<'_>) {
        Component::on_detach(self, ctx);
    }

    fn hook_component_attached(
        &mut self,
        id: ComponentId,
        sibling: ComponentKey,
        ctx: &mut ComponentContext<'_>,
    ) {
        Component::on_component_attached(self, id, sibling, ctx);
    }
}

impl dyn AnyComponent {
    /// Whether the concrete kind is `C`
    pub fn is<C: Component>(&self) -> bool {
        self.as_any().is::<C>()
    }

    /// Borrow as the concrete kind
    pub fn downcast_ref<C: Component>(&self) -> Option<&C> {
        self.as_any().downcast_ref::<C>()
    }

    /// Mutably borrow as the concrete kind
    pub fn downcast_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.as_any_mut().downcast_mut::<C>()
    }
}

impl fmt::Debug for dyn AnyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyComponent")
            .field("id", &self.id())
            .field("type", &self.type_name())
            .finish()
    }
}

/// What to match when removing or testing for a component.
///
/// A `&str` converts to [`ComponentQuery::Name`], so tags read back from
/// saved data match without being `'static`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentQuery<'a> {
    /// Any component carrying this tag
    Tag(ComponentId),
    /// Any component whose tag string equals this name
    Name(&'a str),
    /// One specific attached instance
    Key(ComponentKey),
}

impl ComponentQuery<'static> {
    /// Query by component kind
    pub fn of<C: Component>() -> Self {
        Self::Tag(C::ID)
    }
}

impl ComponentQuery<'_> {
    /// Whether the attached instance `key` with tag `id` matches
    pub fn matches(&self, key: ComponentKey, id: ComponentId) -> bool {
        match *self {
            Self::Tag(tag) => id == tag,
            Self::Name(name) => id.as_str() == name,
            Self::Key(wanted) => key == wanted,
        }
    }
}

impl From<ComponentId> for ComponentQuery<'_> {
    fn from(id: ComponentId) -> Self {
        Self::Tag(id)
    }
}

impl<'a> From<&'a str> for ComponentQuery<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a String> for ComponentQuery<'a> {
    fn from(name: &'a String) -> Self {
        Self::Name(name.as_str())
    }
}

impl From<ComponentKey> for ComponentQuery<'_> {
    fn from(key: ComponentKey) -> Self {
        Self::Key(key)
    }
}

impl fmt::Display for ComponentQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(id) => write!(f, "tag '{id}'"),
            Self::Name(name) => write!(f, "tag '{name}'"),
            Self::Key(key) => write!(f, "instance {key:?}"),
        }
    }
}
