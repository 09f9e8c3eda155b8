//! Headless sandbox
//!
//! Boots the engine with the local collaborators, shows a title state for a
//! moment, then switches to a small play state with a bobbing ship.
//!
//! Usage: `sandbox [config.toml|config.ron]`

use futures::FutureExt;
use stagehand::prelude::*;
use stagehand::state::Preload;
use thiserror::Error;

const DEFAULT_CONFIG: &str = "sandbox.toml";
const DEFAULT_FRAMES: u64 = 240;
const TITLE_SECONDS: f32 = 1.0;

#[derive(Error, Debug)]
enum SandboxError {
    #[error("Configuration error: {0}")]
    Config(#[from] stagehand::config::ConfigError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Moves the ship up and down following its animation progress
struct Bob {
    height: f32,
}

struct BobSystem;

impl System<Bob> for BobSystem {
    fn on_step(_dt: f32, bob: &mut Bob, ctx: &mut ComponentContext<'_>) -> Result<(), EcsError> {
        let entity = ctx.entity();
        let Some(progress) = ctx
            .world()
            .get_component::<GenericAnimationComponent>(entity)
            .map(GenericAnimationComponent::progress)
        else {
            return Ok(());
        };
        if let Some(transform) = ctx.world_mut().get_component_mut::<TransformComponent>(entity) {
            let mut position = transform.position();
            position.y = (progress - 0.5) * bob.height;
            transform.set_position(position);
        }
        Ok(())
    }
}

impl Component for Bob {
    const ID: ComponentId = ComponentId::new("Bob");
    type System = BobSystem;
}

struct Title {
    scene: Scene,
    elapsed: f32,
}

impl Title {
    fn new() -> Self {
        Self { scene: Scene::new(), elapsed: 0.0 }
    }
}

impl State for Title {
    fn name(&self) -> &str {
        "title"
    }

    fn scene(&self) -> &Scene {
        &self.scene
    }

    fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    fn on_awake(
        &mut self,
        _ctx: &mut EngineContext,
        _params: Option<StateParams>,
    ) -> Result<(), StateError> {
        let logo = self.scene.spawn_object("logo")?;
        self.scene.world_mut().add_component(
            logo,
            MeshComponent::new(Shape::Cuboid(Vec3::new(4.0, 1.0, 0.2))).with_color([0.9, 0.8, 0.2, 1.0]),
        )?;
        Ok(())
    }

    fn on_step(&mut self, ctx: &mut EngineContext) -> Result<(), StateError> {
        let dt = ctx.delta_time();
        self.scene.on_step(dt)?;
        self.elapsed += dt;
        if self.elapsed >= TITLE_SECONDS && !ctx.has_requested_state() {
            log::info!("Title done after {:.2}s", self.elapsed);
            ctx.request_state(Box::new(Play::new()), Some(Box::new(3_u32)));
        }
        Ok(())
    }
}

struct Play {
    scene: Scene,
    frames: u64,
}

impl Play {
    fn new() -> Self {
        Self { scene: Scene::new(), frames: 0 }
    }
}

impl State for Play {
    fn name(&self) -> &str {
        "play"
    }

    fn scene(&self) -> &Scene {
        &self.scene
    }

    fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    fn preload(&mut self, ctx: &mut EngineContext) -> Preload {
        ctx.saves_mut().set_allowed_to_save(true);
        async {
            log::debug!("Play preload finished");
            Ok::<(), StateError>(())
        }
        .boxed_local()
    }

    fn on_awake(
        &mut self,
        ctx: &mut EngineContext,
        params: Option<StateParams>,
    ) -> Result<(), StateError> {
        let lives = params
            .and_then(|p| p.downcast::<u32>().ok())
            .map_or(1, |lives| *lives);
        log::info!("Play started with {lives} lives");

        let ship = self.scene.spawn_object("ship")?;
        let world = self.scene.world_mut();
        world.add_component(ship, MeshComponent::new(Shape::Sphere(0.5)))?;
        world.add_component(ship, TransformComponent::new().with_divider(1.0))?;
        world.add_component(ship, GenericAnimationComponent::new(0.5).looping())?;
        world.add_component(ship, Bob { height: 2.0 })?;
        world.add_component(
            ship,
            BoxColliderComponent::new(Vec3::new(1.0, 1.0, 1.0)).with_debug(ctx.config().engine.debug_mode),
        )?;

        for i in 0..lives {
            let marker = self.scene.spawn_object(format!("life-{i}"))?;
            let world = self.scene.world_mut();
            world.add_component(marker, SpriteComponent::new("life").with_size(0.3, 0.3))?;
            #[allow(clippy::cast_precision_loss)]
            let x = -3.0 + i as f32 * 0.4;
            world.add_component(
                marker,
                TransformComponent::from_position(Vec3::new(x, 2.5, 0.0)).with_divider(1.0),
            )?;
        }
        Ok(())
    }

    fn on_step(&mut self, ctx: &mut EngineContext) -> Result<(), StateError> {
        self.scene.on_step(ctx.delta_time())?;
        self.frames += 1;
        Ok(())
    }

    fn on_destroy(&mut self, ctx: &mut EngineContext) -> Result<(), StateError> {
        let mut data = SaveData::new();
        data.insert("frames_played".to_string(), self.frames.into());
        if let Err(err) = ctx.saves_mut().save(&data) {
            log::warn!("Progress not saved: {err}");
        }
        self.scene.on_destroy(ctx.render_target_mut(), true)?;
        Ok(())
    }
}

fn run() -> Result<(), SandboxError> {
    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let mut config = ApplicationConfig::load_or_default(&path)?;
    if config.engine.max_frames.is_none() {
        config.engine.max_frames = Some(DEFAULT_FRAMES);
    }

    let mut engine = Engine::new(config)?;
    engine.boot(Box::new(Title::new()), None)?;
    let frames = engine.run()?;

    log::info!(
        "Sandbox finished after {frames} frames, saving {}",
        if engine.context().saves().allowed_to_save() { "enabled" } else { "disabled" }
    );
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        log::error!("{err}");
        eprintln!("sandbox: {err}");
        std::process::exit(1);
    }
}
