//! Core engine implementation
//!
//! The [`Engine`] owns the [`EngineContext`] and the [`StateManager`] and
//! turns frames into calls: ticker tasks, then the current state's step,
//! then any transition the state requested, then one render.

mod context;
mod ticker;

pub use context::EngineContext;
pub use ticker::Ticker;

use crate::assets::{load_with_retry, AssetError, AssetLoader, AssetSource};
use crate::core::config::{ApplicationConfig, ConfigError};
use crate::foundation::logging;
use crate::foundation::time::{FrameLimiter, Stopwatch, Timer};
use crate::platform::{PlatformError, PlatformSdk, ProgressTracker};
use crate::save::SaveHandler;
use crate::scene::{RenderTarget, SceneError};
use crate::state::{State, StateError, StateManager, StateParams};
use futures::executor::block_on;
use std::path::PathBuf;
use thiserror::Error;

/// Main engine struct
pub struct Engine {
    ctx: EngineContext,
    states: StateManager,
    booted: bool,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("ctx", &self.ctx)
            .field("states", &self.states)
            .field("booted", &self.booted)
            .finish()
    }
}

impl Engine {
    /// Validate `config`, start logging and build the default collaborators
    pub fn new(config: ApplicationConfig) -> Result<Self, EngineError> {
        config.validate()?;
        logging::init(&config.engine.log_level);
        log::info!("Initializing engine...");
        if config.engine.debug_mode {
            log::debug!("Engine config: {config:?}");
        }

        Ok(Self {
            ctx: EngineContext::new(&config),
            states: StateManager::new(),
            booted: false,
        })
    }

    /// Builder: replace the render target
    #[must_use]
    pub fn with_render_target(mut self, target: Box<dyn RenderTarget>) -> Self {
        self.ctx.set_render_target(target);
        self
    }

    /// Builder: replace the asset loader
    #[must_use]
    pub fn with_asset_loader(mut self, assets: Box<dyn AssetLoader>) -> Self {
        self.ctx.set_assets(assets);
        self
    }

    /// Builder: replace the platform SDK
    #[must_use]
    pub fn with_platform(mut self, platform: Box<dyn PlatformSdk>) -> Self {
        self.ctx.set_platform(platform);
        self
    }

    /// Builder: replace the save handler
    #[must_use]
    pub fn with_save_handler(mut self, saves: SaveHandler) -> Self {
        self.ctx.set_saves(saves);
        self
    }

    /// Shared services
    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Shared services, mutably
    pub fn context_mut(&mut self) -> &mut EngineContext {
        &mut self.ctx
    }

    /// State sequencing
    pub fn states(&self) -> &StateManager {
        &self.states
    }

    /// Whether `boot` completed
    pub fn is_booted(&self) -> bool {
        self.booted
    }

    /// Bring the platform up, load boot assets and enter `initial`.
    ///
    /// Order: `platform.initialize()`, boot assets with bounded retry while
    /// reporting monotonic 0..=100 progress, `platform.start_game()`, then
    /// the initial state.
    pub fn boot(
        &mut self,
        initial: Box<dyn State>,
        params: Option<StateParams>,
    ) -> Result<(), EngineError> {
        if self.booted {
            return Err(EngineError::InitializationFailed("engine already booted".to_string()));
        }

        let stopwatch = Stopwatch::start_new();
        block_on(self.ctx.platform_mut().initialize())?;
        log::info!("Platform initialized");

        self.load_boot_assets()?;

        block_on(self.ctx.platform_mut().start_game())?;
        self.booted = true;
        log::info!(
            "Engine booted in {:.1}ms, entering '{}'",
            stopwatch.elapsed_millis(),
            initial.name()
        );

        self.change_state(initial, params)
    }

    fn load_boot_assets(&mut self) -> Result<(), EngineError> {
        let entries = self.ctx.config().assets.boot_assets.clone();
        let retry = self.ctx.config().assets.retry;
        let (assets, platform) = self.ctx.loading_parts();

        for entry in &entries {
            assets.add(&entry.key, AssetSource::Path(PathBuf::from(&entry.path)))?;
        }

        let mut tracker = ProgressTracker::new();
        let mut report = |fraction: f32| {
            if let Some(percent) = tracker.advance(fraction) {
                if let Err(err) = block_on(platform.set_loading_progress(percent)) {
                    log::warn!("Failed to report loading progress: {err}");
                }
            }
        };
        let loaded = load_with_retry(assets, &retry, Some(&mut report as &mut dyn FnMut(f32)))?;
        report(1.0);
        log::info!("Loaded {loaded} boot asset(s)");
        Ok(())
    }

    /// Switch state immediately, outside the frame loop
    pub fn change_state(
        &mut self,
        state: Box<dyn State>,
        params: Option<StateParams>,
    ) -> Result<(), EngineError> {
        self.states.set_state(state, params, &mut self.ctx)?;
        Ok(())
    }

    /// Run one frame with the given delta
    pub fn tick(&mut self, dt: f32) -> Result<(), EngineError> {
        self.ctx.begin_frame(dt);
        self.ctx.ticker_mut().tick(dt);
        self.states.on_step(&mut self.ctx)?;
        if let Some((state, params)) = self.ctx.take_requested_state() {
            self.states.set_state(state, params, &mut self.ctx)?;
        }
        self.states.render(&mut self.ctx)?;
        Ok(())
    }

    /// Tick until `quit` is called or the configured frame limit is hit.
    ///
    /// The current state is destroyed on the way out. Returns the number of
    /// frames run.
    pub fn run(&mut self) -> Result<u64, EngineError> {
        let max_frames = self.ctx.config().engine.max_frames;
        let mut limiter = FrameLimiter::new(self.ctx.ticker().max_fps());
        let mut timer = Timer::new();
        let mut frames = 0;
        log::info!("Starting main loop...");

        while !self.ctx.is_quitting() && max_frames.map_or(true, |max| frames < max) {
            limiter.begin_frame();
            timer.update();
            self.tick(timer.delta_time())?;
            frames += 1;
            limiter.end_frame();
        }

        log::info!(
            "Main loop finished after {frames} frames ({:.1} fps average)",
            timer.average_fps()
        );
        self.shutdown()?;
        Ok(frames)
    }

    /// Destroy the current state
    pub fn shutdown(&mut self) -> Result<(), EngineError> {
        self.states.clear(&mut self.ctx)?;
        log::info!("Engine shutdown complete");
        Ok(())
    }
}

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Boot could not complete
    #[error("Engine initialization failed: {0}")]
    InitializationFailed(String),

    /// Configuration rejected
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A state hook failed
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Platform SDK call failed
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Boot assets failed after retrying
    #[error("Asset system error: {0}")]
    Asset(#[from] AssetError),

    /// Rendering the current scene failed
    #[error("Rendering error: {0}")]
    Render(#[from] SceneError),
}
