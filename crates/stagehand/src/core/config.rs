//! # Unified Configuration System
//!
//! All configuration structures for the engine live here. Every struct is
//! serde-serializable so the whole tree can be loaded from TOML or RON via
//! the [`Config`] trait.
//!
//! ## Configuration Categories
//!
//! - **Engine Config**: logging, debug features, frame cap
//! - **Camera Config**: projection kind and placement of the scene camera
//! - **Asset Config**: asset root, boot assets, load retry
//! - **Save Config**: save file location, load retry

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use crate::config::{Config, ConfigError};
use crate::foundation::retry::RetryPolicy;

/// # Engine Configuration
///
/// Core engine behavior configuration including logging, debug features,
/// and frame pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default log filter, overridden by `RUST_LOG`
    pub log_level: String,
    /// Whether to enable debug features (collider debug meshes, verbose logs)
    pub debug_mode: bool,
    /// Frame rate cap for the run loop
    pub target_fps: Option<u32>,
    /// Stop the run loop after this many frames
    pub max_frames: Option<u64>,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            debug_mode: cfg!(debug_assertions),
            target_fps: Some(60),
            max_frames: None,
        }
    }

    /// Set log level
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable debug mode
    #[must_use]
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }

    /// Set target FPS; `None` removes the cap
    #[must_use]
    pub fn with_target_fps(mut self, fps: Option<u32>) -> Self {
        self.target_fps = fps;
        self
    }

    /// Stop after a fixed number of frames
    #[must_use]
    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Projection used by the scene camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraKind {
    /// Parallel projection, used by 2D scenes
    Orthographic,
    /// Perspective projection
    Perspective,
}

impl FromStr for CameraKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "orthographic" => Ok(Self::Orthographic),
            "perspective" => Ok(Self::Perspective),
            _ => Err(ConfigError::UnknownCameraKind(s.to_string())),
        }
    }
}

impl fmt::Display for CameraKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Orthographic => f.write_str("orthographic"),
            Self::Perspective => f.write_str("perspective"),
        }
    }
}

/// # Camera Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Projection kind
    pub kind: CameraKind,
    /// Vertical field of view for perspective cameras
    pub fov_degrees: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
    /// Visible height in world units for orthographic cameras
    pub ortho_height: f32,
    /// Eye position
    pub position: [f32; 3],
    /// Look-at point
    pub target: [f32; 3],
    /// Surface aspect ratio (width / height)
    pub aspect: f32,
}

impl CameraConfig {
    /// Default camera of the given kind
    pub fn new(kind: CameraKind) -> Self {
        Self {
            kind,
            fov_degrees: 45.0,
            near: 0.1,
            far: 1000.0,
            ortho_height: 10.0,
            position: [0.0, 0.0, 10.0],
            target: [0.0, 0.0, 0.0],
            aspect: 16.0 / 9.0,
        }
    }

    /// Set the eye position
    #[must_use]
    pub fn with_position(mut self, position: [f32; 3]) -> Self {
        self.position = position;
        self
    }

    /// Validate the camera parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.near <= 0.0 || self.far <= self.near {
            return Err(ConfigError::Invalid(format!(
                "camera clip planes must satisfy 0 < near < far (near={}, far={})",
                self.near, self.far
            )));
        }
        if self.aspect <= 0.0 {
            return Err(ConfigError::Invalid("camera aspect must be positive".to_string()));
        }
        if self.kind == CameraKind::Perspective && !(1.0..179.0).contains(&self.fov_degrees) {
            return Err(ConfigError::Invalid(format!(
                "perspective fov out of range: {}",
                self.fov_degrees
            )));
        }
        Ok(())
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self::new(CameraKind::Perspective)
    }
}

/// One asset loaded during boot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    /// Lookup key
    pub key: String,
    /// Path relative to the assets directory
    pub path: String,
}

impl AssetEntry {
    /// Create an entry
    pub fn new(key: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            path: path.into(),
        }
    }
}

/// # Asset Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Base directory for assets
    pub assets_dir: String,
    /// Retry applied to failed loads
    pub retry: RetryPolicy,
    /// Assets loaded before the first state starts
    pub boot_assets: Vec<AssetEntry>,
}

impl AssetConfig {
    /// Create a new asset configuration
    pub fn new() -> Self {
        Self {
            assets_dir: "resources".to_string(),
            retry: RetryPolicy::default(),
            boot_assets: Vec::new(),
        }
    }

    /// Set assets directory
    #[must_use]
    pub fn with_assets_dir(mut self, dir: impl Into<String>) -> Self {
        self.assets_dir = dir.into();
        self
    }

    /// Add a boot asset
    #[must_use]
    pub fn with_boot_asset(mut self, entry: AssetEntry) -> Self {
        self.boot_assets.push(entry);
        self
    }

    /// Set the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Save Configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// JSON save file; `None` keeps saves in memory
    pub path: Option<String>,
    /// Retry applied to loads
    pub retry: RetryPolicy,
}

/// # Complete Application Configuration
///
/// Top-level configuration that encompasses all engine subsystems.
/// This is the main configuration structure applications should use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Engine core configuration
    pub engine: EngineConfig,
    /// Scene camera
    pub camera: CameraConfig,
    /// Asset system configuration
    pub assets: AssetConfig,
    /// Save system configuration
    pub saves: SaveConfig,
}

impl ApplicationConfig {
    /// Replace the engine section
    #[must_use]
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Replace the camera section
    #[must_use]
    pub fn with_camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    /// Replace the asset section
    #[must_use]
    pub fn with_assets(mut self, assets: AssetConfig) -> Self {
        self.assets = assets;
        self
    }

    /// Replace the save section
    #[must_use]
    pub fn with_saves(mut self, saves: SaveConfig) -> Self {
        self.saves = saves;
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.camera.validate()?;
        if self.engine.log_level.trim().is_empty() {
            return Err(ConfigError::Invalid("log level cannot be empty".to_string()));
        }
        if self.assets.retry.max_attempts == 0 || self.saves.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Config for ApplicationConfig {}
