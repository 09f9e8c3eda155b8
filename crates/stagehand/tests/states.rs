//! Integration tests for state transitions driven through the engine

use futures::future::{poll_fn, FutureExt};
use stagehand::ecs::{Component, ComponentContext, ComponentId, EntityId, System};
use stagehand::prelude::*;
use stagehand::scene::{FrameStats, NodeKind, RenderError, Stage};
use stagehand::state::Preload;
use stagehand::foundation::collections::NodeId;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::task::Poll;

type Counts = Rc<RefCell<HashMap<EntityId, u32>>>;
type Frames = Rc<RefCell<Vec<(NodeId, FrameStats)>>>;

/// Render target that records what every frame drew
struct Recorder {
    frames: Frames,
    mounted: Vec<NodeId>,
}

impl RenderTarget for Recorder {
    fn mount(&mut self, _stage: &Stage, root: NodeId) -> Result<(), RenderError> {
        self.mounted.push(root);
        Ok(())
    }

    fn unmount(&mut self, root: NodeId) {
        self.mounted.retain(|r| *r != root);
    }

    fn render(&mut self, stage: &Stage, root: NodeId, _camera: &Camera) -> Result<(), RenderError> {
        if !self.mounted.contains(&root) {
            return Err(RenderError::NotMounted(root));
        }
        let mut stats = FrameStats::default();
        stage.traverse(root, |_, node| {
            stats.nodes += 1;
            if matches!(node.kind, NodeKind::Drawable(_)) {
                stats.drawables += 1;
            }
        })?;
        self.frames.borrow_mut().push((root, stats));
        Ok(())
    }

    fn add_render_pass(&mut self, _name: &str) {}

    fn remove_render_pass(&mut self, _name: &str) {}
}

/// Counts destroy dispatches per entity
struct Tally(Counts);

struct TallySystem;

impl System<Tally> for TallySystem {
    fn on_destroy(c: &mut Tally, ctx: &mut ComponentContext<'_>) {
        *c.0.borrow_mut().entry(ctx.entity()).or_default() += 1;
    }
}

impl Component for Tally {
    const ID: ComponentId = ComponentId::new("Tally");
    type System = TallySystem;
}

/// Three counted entities
struct Lobby {
    counts: Counts,
    spawned: Rc<RefCell<Vec<EntityId>>>,
    scene: Scene,
}

impl State for Lobby {
    fn name(&self) -> &str {
        "lobby"
    }

    fn scene(&self) -> &Scene {
        &self.scene
    }

    fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    fn on_awake(&mut self, _ctx: &mut EngineContext, _params: Option<StateParams>) -> Result<(), StateError> {
        for name in ["a", "b", "c"] {
            let entity = self.scene.spawn_object(name)?;
            self.scene
                .world_mut()
                .add_component(entity, Tally(self.counts.clone()))?;
            self.spawned.borrow_mut().push(entity);
        }
        Ok(())
    }
}

/// Mesh-only state whose preload waits on a flag
struct Arena {
    release: Rc<Cell<bool>>,
    events: Rc<RefCell<Vec<&'static str>>>,
    scene: Scene,
}

impl State for Arena {
    fn name(&self) -> &str {
        "arena"
    }

    fn scene(&self) -> &Scene {
        &self.scene
    }

    fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    fn preload(&mut self, _ctx: &mut EngineContext) -> Preload {
        self.events.borrow_mut().push("preload");
        let release = self.release.clone();
        let events = self.events.clone();
        poll_fn(move |_| {
            if release.get() {
                events.borrow_mut().push("preload resolved");
                Poll::Ready(Ok(()))
            } else {
                Poll::Pending
            }
        })
        .boxed_local()
    }

    fn on_awake(&mut self, _ctx: &mut EngineContext, _params: Option<StateParams>) -> Result<(), StateError> {
        self.events.borrow_mut().push("awake");
        let ship = self.scene.spawn_object("ship")?;
        self.scene
            .world_mut()
            .add_component(ship, MeshComponent::new(Shape::Sphere(1.0)))?;
        Ok(())
    }
}

fn engine(frames: &Frames) -> Engine {
    let config = ApplicationConfig::default()
        .with_engine(EngineConfig::new().with_target_fps(None));
    Engine::new(config)
        .unwrap()
        .with_render_target(Box::new(Recorder {
            frames: frames.clone(),
            mounted: Vec::new(),
        }))
}

#[test]
fn test_transition_destroys_old_entities_once_and_renders_new_scene_after_awake() {
    let frames = Frames::default();
    let counts = Counts::default();
    let spawned = Rc::new(RefCell::new(Vec::new()));
    let mut engine = engine(&frames);

    engine
        .boot(
            Box::new(Lobby {
                counts: counts.clone(),
                spawned: spawned.clone(),
                scene: Scene::new(),
            }),
            None,
        )
        .unwrap();
    engine.tick(0.016).unwrap();
    let lobby_root = frames.borrow()[0].0;

    let release = Rc::new(Cell::new(false));
    let events = Rc::new(RefCell::new(Vec::new()));
    engine
        .change_state(
            Box::new(Arena {
                release: release.clone(),
                events: events.clone(),
                scene: Scene::new(),
            }),
            None,
        )
        .unwrap();

    assert_eq!(spawned.borrow().len(), 3);
    for entity in spawned.borrow().iter() {
        assert_eq!(counts.borrow().get(entity), Some(&1));
    }

    // Preload pending: nothing is rendered for the new state.
    engine.tick(0.016).unwrap();
    assert_eq!(frames.borrow().len(), 1);
    assert_eq!(*events.borrow(), ["preload"]);

    release.set(true);
    engine.tick(0.016).unwrap();
    assert_eq!(*events.borrow(), ["preload", "preload resolved", "awake"]);

    let frames = frames.borrow();
    let (root, stats) = frames.last().copied().unwrap();
    assert_ne!(root, lobby_root);
    assert_eq!(stats.drawables, 1);

    engine.shutdown().unwrap();
    for entity in spawned.borrow().iter() {
        assert_eq!(counts.borrow().get(entity), Some(&1));
    }
}
