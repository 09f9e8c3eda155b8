//! Platform SDK abstraction
//!
//! The hosting platform (a social-gaming SDK, or nothing at all when running
//! locally) is reached through [`PlatformSdk`]. Calls are asynchronous on
//! real platforms, so the trait is `async`; the engine drives it with
//! `futures::executor::block_on` during boot.

use crate::save::SaveData;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Platform errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// Call made before `initialize` resolved
    #[error("Platform SDK is not initialized")]
    NotInitialized,

    /// Loading progress outside 0..=100
    #[error("Loading progress {0} is outside 0..=100")]
    InvalidProgress(u8),

    /// The platform refused the call
    #[error("Platform call failed: {0}")]
    Rejected(String),
}

/// Who is playing and where
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Platform player id
    pub player_id: String,
    /// Display name
    pub player_name: String,
    /// Picture URL, when the platform exposes one
    pub picture_url: Option<String>,
    /// Id of the context (thread, group) the game runs in
    pub context_id: String,
    /// Context kind, e.g. `SOLO`
    pub context_type: String,
}

/// Hosting platform contract
#[async_trait(?Send)]
pub trait PlatformSdk {
    /// Bring the SDK up; awaited before anything is rendered
    async fn initialize(&mut self) -> Result<(), PlatformError>;

    /// Tell the platform the game is ready to be shown
    async fn start_game(&mut self) -> Result<(), PlatformError>;

    /// Report absolute (not incremental) loading progress, 0..=100
    async fn set_loading_progress(&mut self, progress: u8) -> Result<(), PlatformError>;

    /// Whether `initialize` has completed
    fn is_ready(&self) -> bool;

    /// Current player
    fn player_info(&self) -> PlayerInfo;

    /// Pass-through save
    async fn save(&mut self, data: &SaveData) -> Result<(), PlatformError>;

    /// Pass-through load
    async fn load(&mut self) -> Result<SaveData, PlatformError>;

    /// Flush pending saves
    async fn flush(&mut self) -> Result<(), PlatformError>;
}

/// Keeps reported loading progress monotonic
#[derive(Debug, Default, Clone, Copy)]
pub struct ProgressTracker {
    last: Option<u8>,
}

impl ProgressTracker {
    /// Fresh tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Percentage for `fraction`, or `None` if it would not move forward
    pub fn advance(&mut self, fraction: f32) -> Option<u8> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let percent = (fraction.clamp(0.0, 1.0) * 100.0).round() as u8;
        if self.last.is_some_and(|last| percent <= last) {
            return None;
        }
        self.last = Some(percent);
        Some(percent)
    }

    /// Last reported percentage
    pub fn last(&self) -> Option<u8> {
        self.last
    }
}

/// Local stand-in used when no platform is present
#[derive(Debug, Default)]
pub struct DummySdk {
    initialized: bool,
    started: bool,
    progress: Vec<u8>,
    store: SaveData,
}

impl DummySdk {
    /// Uninitialized SDK
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `start_game` ran
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Every progress value reported so far
    pub fn progress_history(&self) -> &[u8] {
        &self.progress
    }
}

#[async_trait(?Send)]
impl PlatformSdk for DummySdk {
    async fn initialize(&mut self) -> Result<(), PlatformError> {
        self.initialized = true;
        log::debug!("DummySdk initialized");
        Ok(())
    }

    async fn start_game(&mut self) -> Result<(), PlatformError> {
        if !self.initialized {
            return Err(PlatformError::NotInitialized);
        }
        self.started = true;
        Ok(())
    }

    async fn set_loading_progress(&mut self, progress: u8) -> Result<(), PlatformError> {
        if progress > 100 {
            return Err(PlatformError::InvalidProgress(progress));
        }
        log::trace!("Loading progress {progress}%");
        self.progress.push(progress);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.initialized
    }

    fn player_info(&self) -> PlayerInfo {
        PlayerInfo {
            player_id: "1234".to_string(),
            player_name: "TEST".to_string(),
            picture_url: None,
            context_id: "4321".to_string(),
            context_type: "SOLO".to_string(),
        }
    }

    async fn save(&mut self, data: &SaveData) -> Result<(), PlatformError> {
        self.store.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn load(&mut self) -> Result<SaveData, PlatformError> {
        Ok(self.store.clone())
    }

    async fn flush(&mut self) -> Result<(), PlatformError> {
        Ok(())
    }
}
