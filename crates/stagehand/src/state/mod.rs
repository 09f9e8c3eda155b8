//! Application states
//!
//! A [`State`] is one top-level mode of the game (menu, gameplay, a test
//! harness) and owns exactly one [`Scene`]. The [`StateManager`] keeps at
//! most one state current and walks it through
//! preload → awake → step → destroy.

mod manager;

pub use manager::StateManager;

use crate::assets::AssetError;
use crate::ecs::EcsError;
use crate::engine::EngineContext;
use crate::platform::PlatformError;
use crate::save::SaveError;
use crate::scene::{Scene, SceneError};
use futures::future::{FutureExt, LocalBoxFuture};
use std::any::Any;
use thiserror::Error;

/// Parameters handed to [`State::on_awake`]
pub type StateParams = Box<dyn Any>;

/// Future returned by [`State::preload`]
pub type Preload = LocalBoxFuture<'static, Result<(), StateError>>;

/// State errors
#[derive(Error, Debug)]
pub enum StateError {
    /// Scene failure, including System errors raised while stepping
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// Entity/component failure outside a scene step
    #[error(transparent)]
    Ecs(#[from] EcsError),

    /// Asset loading failed
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// Save handling failed
    #[error(transparent)]
    Save(#[from] SaveError),

    /// Platform call failed
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// Preload rejected; the transition was aborted
    #[error("Preload of state '{state}' failed: {reason}")]
    PreloadFailed {
        /// State being entered
        state: String,
        /// Rejection message
        reason: String,
    },

    /// Operation needs a current state
    #[error("No active state")]
    NoActiveState,

    /// Game-defined failure
    #[error("{0}")]
    Custom(String),
}

/// One application mode.
///
/// Hooks get the shared [`EngineContext`]. Only `on_awake` must be
/// written; the rest default to plain scene delegation.
pub trait State {
    /// Name for logs and [`StateManager::is_current`]
    fn name(&self) -> &str;

    /// The scene this state owns
    fn scene(&self) -> &Scene;

    /// The scene this state owns, mutably
    fn scene_mut(&mut self) -> &mut Scene;

    /// Prepare the state.
    ///
    /// The body runs synchronously with engine access (queue assets here).
    /// The returned future is polled once per frame until it resolves;
    /// `on_awake` runs only after it resolves with `Ok`.
    fn preload(&mut self, _ctx: &mut EngineContext) -> Preload {
        futures::future::ready(Ok(())).boxed_local()
    }

    /// Build the scene contents
    fn on_awake(
        &mut self,
        ctx: &mut EngineContext,
        params: Option<StateParams>,
    ) -> Result<(), StateError>;

    /// Per-frame logic; overrides must still step the scene
    fn on_step(&mut self, ctx: &mut EngineContext) -> Result<(), StateError> {
        let dt = ctx.delta_time();
        self.scene_mut().on_step(dt)?;
        Ok(())
    }

    /// Release what the state created. The default destroys every scene
    /// object and unmounts the scene.
    fn on_destroy(&mut self, ctx: &mut EngineContext) -> Result<(), StateError> {
        self.scene_mut().on_destroy(ctx.render_target_mut(), true)?;
        Ok(())
    }
}
