//! Stateless per-kind dispatchers

use super::component::Component;
use super::context::ComponentContext;
use super::error::EcsError;

/// Behavior for every component of kind `C`.
///
/// Systems hold no per-instance state: each hook receives the target
/// component explicitly. All hooks default to no-ops.
pub trait System<C: Component> {
    /// First hook on attach, before the component's own `on_attach`
    fn on_awake(_component: &mut C, _ctx: &mut ComponentContext<'_>) {}

    /// Once per frame while attached and enabled
    fn on_step(_dt: f32, _component: &mut C, _ctx: &mut ComponentContext<'_>) -> Result<(), EcsError> {
        Ok(())
    }

    /// The owning entity is being destroyed
    fn on_destroy(_component: &mut C, _ctx: &mut ComponentContext<'_>) {}

    /// The component was re-enabled
    fn on_enable(_component: &mut C, _ctx: &mut ComponentContext<'_>) {}

    /// The component was disabled; it will not step until re-enabled
    fn on_disable(_component: &mut C, _ctx: &mut ComponentContext<'_>) {}
}
