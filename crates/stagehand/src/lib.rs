//! # Stagehand
//!
//! An entity-component runtime for small games, with a scene graph, a state
//! machine for top-level game modes and narrow contracts for the services
//! around it.
//!
//! ## Features
//!
//! - **ECS**: game objects in an arena, components paired with stateless
//!   systems at compile time
//! - **Scenes**: a render-graph mirror of the object hierarchy, stepped
//!   depth-first
//! - **States**: preload → awake → step → destroy, one state at a time
//! - **Collaborators**: asset loader, platform SDK and save backends behind
//!   traits, with local implementations
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stagehand::prelude::*;
//!
//! struct Menu {
//!     scene: Scene,
//! }
//!
//! impl State for Menu {
//!     fn name(&self) -> &str {
//!         "menu"
//!     }
//!
//!     fn scene(&self) -> &Scene {
//!         &self.scene
//!     }
//!
//!     fn scene_mut(&mut self) -> &mut Scene {
//!         &mut self.scene
//!     }
//!
//!     fn on_awake(
//!         &mut self,
//!         _ctx: &mut EngineContext,
//!         _params: Option<StateParams>,
//!     ) -> Result<(), StateError> {
//!         let logo = self.scene.spawn_object("logo")?;
//!         self.scene
//!             .world_mut()
//!             .add_component(logo, MeshComponent::new(Shape::Cuboid(Vec3::new(1.0, 1.0, 1.0))))?;
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApplicationConfig::default();
//!     let mut engine = Engine::new(config)?;
//!     engine.boot(Box::new(Menu { scene: Scene::new() }), None)?;
//!     engine.run()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Configuration
pub mod config;
pub mod core;

// Runtime
pub mod foundation;
pub mod events;
pub mod ecs;
pub mod scene;
pub mod state;

// Collaborators
pub mod assets;
pub mod platform;
pub mod save;

pub mod engine;

pub use engine::{Engine, EngineContext, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{AssetLoader, AssetSource, FileAssetLoader},
        core::config::{ApplicationConfig, CameraConfig, CameraKind, Config, EngineConfig},
        ecs::{
            components::{
                BoxColliderComponent, GenericAnimationComponent, MeshComponent,
                SpriteComponent, TransformComponent,
            },
            Component, ComponentContext, ComponentId, EcsError, EntityId, System, World,
        },
        engine::{Engine, EngineContext, EngineError, Ticker},
        foundation::{
            math::{Mat4, Transform, Vec3},
            time::{Stopwatch, Timer},
        },
        platform::{DummySdk, PlatformSdk},
        save::{SaveData, SaveHandler},
        scene::{Camera, HeadlessTarget, RenderTarget, Scene, SceneError, Shape},
        state::{State, StateError, StateManager, StateParams},
    };
}
