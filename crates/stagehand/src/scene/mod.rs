//! Render graph, render targets and scenes
//!
//! - [`Stage`]: the render graph game objects are mirrored into
//! - [`RenderTarget`]: backend contract, with [`HeadlessTarget`] built in
//! - [`Scene`]: a world mounted beneath one stage root

pub mod bounds;
pub mod container;
pub mod render;
pub mod stage;

pub use bounds::AABB;
pub use container::{Scene, SceneError};
pub use render::{Camera, FrameStats, HeadlessTarget, RenderError, RenderTarget};
pub use stage::{Drawable, Node, NodeKind, Shape, Stage, StageError};
