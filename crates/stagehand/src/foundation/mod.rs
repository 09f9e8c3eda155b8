//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and operations
//! - Handle types for arenas
//! - Time management
//! - Logging utilities
//! - Bounded retry for collaborator calls

pub mod math;
pub mod collections;
pub mod time;
pub mod logging;
pub mod retry;
