//! Shared engine services handed to every state hook

use super::ticker::Ticker;
use crate::assets::{AssetLoader, FileAssetLoader};
use crate::core::config::ApplicationConfig;
use crate::platform::{DummySdk, PlatformSdk};
use crate::save::SaveHandler;
use crate::scene::{Camera, HeadlessTarget, RenderTarget};
use crate::state::{State, StateParams};

/// Everything a state may reach during a hook.
///
/// There is no global engine instance; states receive this by `&mut`.
pub struct EngineContext {
    config: ApplicationConfig,
    render_target: Box<dyn RenderTarget>,
    camera: Camera,
    assets: Box<dyn AssetLoader>,
    platform: Box<dyn PlatformSdk>,
    saves: SaveHandler,
    ticker: Ticker,
    delta_time: f32,
    frame: u64,
    requested: Option<(Box<dyn State>, Option<StateParams>)>,
    quit: bool,
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("camera", &self.camera)
            .field("saves", &self.saves)
            .field("ticker", &self.ticker)
            .field("delta_time", &self.delta_time)
            .field("frame", &self.frame)
            .field("quit", &self.quit)
            .finish_non_exhaustive()
    }
}

impl EngineContext {
    /// Context with the default collaborators: a headless render target,
    /// the dummy platform, a file loader rooted at the assets directory and
    /// the configured save backend
    pub fn new(config: &ApplicationConfig) -> Self {
        Self {
            render_target: Box::new(HeadlessTarget::new()),
            camera: Camera::from_config(&config.camera),
            assets: Box::new(FileAssetLoader::new(&config.assets.assets_dir)),
            platform: Box::new(DummySdk::new()),
            saves: SaveHandler::from_config(&config.saves),
            ticker: Ticker::new(config.engine.target_fps),
            delta_time: 0.0,
            frame: 0,
            requested: None,
            quit: false,
            config: config.clone(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    /// Seconds since the previous frame
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Frames ticked so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub(crate) fn begin_frame(&mut self, dt: f32) {
        self.delta_time = dt;
        self.frame += 1;
    }

    /// Scene camera
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Scene camera, mutably
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Render backend
    pub fn render_target(&self) -> &dyn RenderTarget {
        self.render_target.as_ref()
    }

    /// Render backend, mutably
    pub fn render_target_mut(&mut self) -> &mut dyn RenderTarget {
        self.render_target.as_mut()
    }

    pub(crate) fn set_render_target(&mut self, target: Box<dyn RenderTarget>) {
        self.render_target = target;
    }

    pub(crate) fn render_parts(&mut self) -> (&mut dyn RenderTarget, &Camera) {
        (self.render_target.as_mut(), &self.camera)
    }

    /// Asset loader
    pub fn assets(&self) -> &dyn AssetLoader {
        self.assets.as_ref()
    }

    /// Asset loader, mutably
    pub fn assets_mut(&mut self) -> &mut dyn AssetLoader {
        self.assets.as_mut()
    }

    pub(crate) fn set_assets(&mut self, assets: Box<dyn AssetLoader>) {
        self.assets = assets;
    }

    /// Hosting platform
    pub fn platform(&self) -> &dyn PlatformSdk {
        self.platform.as_ref()
    }

    /// Hosting platform, mutably
    pub fn platform_mut(&mut self) -> &mut dyn PlatformSdk {
        self.platform.as_mut()
    }

    pub(crate) fn set_platform(&mut self, platform: Box<dyn PlatformSdk>) {
        self.platform = platform;
    }

    /// Loader and platform together, for progress reporting while loading
    pub(crate) fn loading_parts(&mut self) -> (&mut dyn AssetLoader, &mut dyn PlatformSdk) {
        (self.assets.as_mut(), self.platform.as_mut())
    }

    /// Save handler
    pub fn saves(&self) -> &SaveHandler {
        &self.saves
    }

    /// Save handler, mutably
    pub fn saves_mut(&mut self) -> &mut SaveHandler {
        &mut self.saves
    }

    pub(crate) fn set_saves(&mut self, saves: SaveHandler) {
        self.saves = saves;
    }

    /// Per-frame task list
    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    /// Per-frame task list, mutably
    pub fn ticker_mut(&mut self) -> &mut Ticker {
        &mut self.ticker
    }

    /// Ask for a transition once the current step returns.
    ///
    /// A later request in the same frame replaces an earlier one.
    pub fn request_state(&mut self, state: Box<dyn State>, params: Option<StateParams>) {
        if let Some((previous, _)) = &self.requested {
            log::warn!(
                "State '{}' requested over pending request for '{}'",
                state.name(),
                previous.name()
            );
        }
        self.requested = Some((state, params));
    }

    /// Whether a transition is waiting
    pub fn has_requested_state(&self) -> bool {
        self.requested.is_some()
    }

    pub(crate) fn take_requested_state(&mut self) -> Option<(Box<dyn State>, Option<StateParams>)> {
        self.requested.take()
    }

    /// Stop the run loop after the current frame
    pub fn quit(&mut self) {
        log::info!("Engine shutdown requested");
        self.quit = true;
    }

    /// Whether `quit` was called
    pub fn is_quitting(&self) -> bool {
        self.quit
    }
}
