//! # Core Engine Module
//!
//! Shared configuration used by every subsystem.
//!
//! ## Organization
//!
//! - **Config**: Unified configuration tree for all engine subsystems

pub mod config;

// Re-export commonly used config types
pub use config::{
    ApplicationConfig,
    AssetConfig,
    AssetEntry,
    CameraConfig,
    CameraKind,
    Config,
    ConfigError,
    EngineConfig,
    SaveConfig,
};
