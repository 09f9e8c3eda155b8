//! State sequencing

use super::{Preload, State, StateError, StateParams};
use crate::engine::EngineContext;
use futures::task::noop_waker_ref;
use futures::FutureExt;
use std::task::{Context, Poll};

enum Phase {
    Preloading(Preload),
    Awake,
}

struct Active {
    state: Box<dyn State>,
    phase: Phase,
    params: Option<StateParams>,
}

/// Owns the current state and drives its lifecycle.
///
/// Transitions are immediate: [`StateManager::set_state`] destroys the
/// current state before the new one is applied. A pending preload is
/// polled once inside `set_state` and then once per [`StateManager::on_step`],
/// so an already-resolved preload awakes the state synchronously.
#[derive(Default)]
pub struct StateManager {
    current: Option<Active>,
}

impl std::fmt::Debug for StateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateManager")
            .field("current", &self.current_name())
            .field("awake", &self.is_awake())
            .finish()
    }
}

impl StateManager {
    /// Manager with no state
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any state is current, awake or not
    pub fn has_state(&self) -> bool {
        self.current.is_some()
    }

    /// Whether the current state has finished preloading
    pub fn is_awake(&self) -> bool {
        matches!(self.current, Some(Active { phase: Phase::Awake, .. }))
    }

    /// Name of the current state
    pub fn current_name(&self) -> Option<&str> {
        self.current.as_ref().map(|active| active.state.name())
    }

    /// Whether the current state is called `name`
    pub fn is_current(&self, name: &str) -> bool {
        self.current_name() == Some(name)
    }

    /// The current state, awake or not
    pub fn current(&self) -> Option<&dyn State> {
        self.current.as_ref().map(|active| active.state.as_ref())
    }

    /// The current state, mutably
    pub fn current_mut(&mut self) -> Result<&mut dyn State, StateError> {
        match self.current.as_mut() {
            Some(active) => Ok(active.state.as_mut()),
            None => Err(StateError::NoActiveState),
        }
    }

    /// Replace the current state.
    ///
    /// In order: the current state's `on_destroy` (a pending preload is
    /// dropped first), the new scene's `on_apply`, the new state's
    /// `preload`, and `on_awake` once that preload resolves.
    pub fn set_state(
        &mut self,
        state: Box<dyn State>,
        params: Option<StateParams>,
        ctx: &mut EngineContext,
    ) -> Result<(), StateError> {
        self.clear(ctx)?;

        let mut state = state;
        log::info!("Entering state '{}'", state.name());
        state.scene_mut().on_apply(ctx.render_target_mut())?;
        let preload = state.preload(ctx);
        self.current = Some(Active {
            state,
            phase: Phase::Preloading(preload),
            params,
        });
        self.poll_preload(ctx)
    }

    /// Destroy the current state, if any, leaving none
    pub fn clear(&mut self, ctx: &mut EngineContext) -> Result<(), StateError> {
        let Some(mut previous) = self.current.take() else {
            return Ok(());
        };
        if matches!(previous.phase, Phase::Preloading(_)) {
            log::warn!("Cancelling preload of state '{}'", previous.state.name());
        }
        previous.phase = Phase::Awake;
        log::info!("Leaving state '{}'", previous.state.name());
        previous.state.on_destroy(ctx)
    }

    /// Advance the current state by one frame.
    ///
    /// While preloading this only polls the preload. Without a state it
    /// does nothing.
    pub fn on_step(&mut self, ctx: &mut EngineContext) -> Result<(), StateError> {
        match self.current.as_mut() {
            None => Ok(()),
            Some(Active { phase: Phase::Preloading(_), .. }) => self.poll_preload(ctx),
            Some(active) => active.state.on_step(ctx),
        }
    }

    /// Render the awake state's scene; a preloading state renders nothing
    pub fn render(&self, ctx: &mut EngineContext) -> Result<(), crate::scene::SceneError> {
        match &self.current {
            Some(Active { state, phase: Phase::Awake, .. }) => {
                let (target, camera) = ctx.render_parts();
                state.scene().render(target, camera)
            }
            _ => Ok(()),
        }
    }

    fn poll_preload(&mut self, ctx: &mut EngineContext) -> Result<(), StateError> {
        let Some(active) = self.current.as_mut() else {
            return Ok(());
        };
        let Phase::Preloading(preload) = &mut active.phase else {
            return Ok(());
        };

        let mut cx = Context::from_waker(noop_waker_ref());
        match preload.poll_unpin(&mut cx) {
            Poll::Pending => Ok(()),
            Poll::Ready(Ok(())) => {
                active.phase = Phase::Awake;
                let params = active.params.take();
                log::info!("State '{}' preloaded", active.state.name());
                if let Err(err) = active.state.on_awake(ctx, params) {
                    log::error!("State '{}' failed to awake: {err}", active.state.name());
                    self.clear(ctx)?;
                    return Err(err);
                }
                Ok(())
            }
            Poll::Ready(Err(err)) => {
                let state = active.state.name().to_string();
                log::error!("Preload of state '{state}' failed: {err}");
                self.clear(ctx)?;
                Err(StateError::PreloadFailed {
                    state,
                    reason: err.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ApplicationConfig;
    use crate::ecs::{Component, ComponentContext, ComponentId, EcsError, System};
    use crate::scene::Scene;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;
    type Gate = Rc<Cell<Option<Result<(), StateError>>>>;

    struct Marker(Log);

    struct MarkerSystem;

    impl System<Marker> for MarkerSystem {
        fn on_step(_dt: f32, c: &mut Marker, _ctx: &mut ComponentContext<'_>) -> Result<(), EcsError> {
            c.0.borrow_mut().push("entity:step".into());
            Ok(())
        }

        fn on_destroy(c: &mut Marker, _ctx: &mut ComponentContext<'_>) {
            c.0.borrow_mut().push("entity:destroy".into());
        }
    }

    impl Component for Marker {
        const ID: ComponentId = ComponentId::new("marker");
        type System = MarkerSystem;
    }

    struct Recorder {
        name: &'static str,
        log: Log,
        gate: Option<Gate>,
        scene: Scene,
    }

    impl Recorder {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                log: log.clone(),
                gate: None,
                scene: Scene::new(),
            }
        }

        fn gated(mut self, gate: &Gate) -> Self {
            self.gate = Some(gate.clone());
            self
        }

        fn push(&self, event: &str) {
            self.log.borrow_mut().push(format!("{}:{event}", self.name));
        }
    }

    impl State for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn scene(&self) -> &Scene {
            &self.scene
        }

        fn scene_mut(&mut self) -> &mut Scene {
            &mut self.scene
        }

        fn preload(&mut self, _ctx: &mut EngineContext) -> Preload {
            self.push("preload");
            match self.gate.clone() {
                None => futures::future::ready(Ok(())).boxed_local(),
                Some(gate) => futures::future::poll_fn(move |_| match gate.take() {
                    Some(result) => Poll::Ready(result),
                    None => Poll::Pending,
                })
                .boxed_local(),
            }
        }

        fn on_awake(
            &mut self,
            _ctx: &mut EngineContext,
            params: Option<StateParams>,
        ) -> Result<(), StateError> {
            let level = params.and_then(|p| p.downcast::<u32>().ok()).map_or(0, |l| *l);
            self.push(&format!("awake({level})"));
            let entity = self.scene.spawn_object("thing")?;
            self.scene
                .world_mut()
                .add_component(entity, Marker(self.log.clone()))?;
            Ok(())
        }

        fn on_destroy(&mut self, ctx: &mut EngineContext) -> Result<(), StateError> {
            self.push("destroy");
            self.scene.on_destroy(ctx.render_target_mut(), true)?;
            Ok(())
        }
    }

    fn context() -> EngineContext {
        crate::foundation::logging::init_test();
        EngineContext::new(&ApplicationConfig::default())
    }

    #[test]
    fn test_ready_preload_awakes_synchronously() {
        let log = Log::default();
        let mut ctx = context();
        let mut states = StateManager::new();

        states
            .set_state(Box::new(Recorder::new("menu", &log)), Some(Box::new(3_u32)), &mut ctx)
            .unwrap();
        assert!(states.is_awake());
        assert!(states.is_current("menu"));
        assert_eq!(*log.borrow(), ["menu:preload", "menu:awake(3)"]);
    }

    #[test]
    fn test_destroy_precedes_preload_and_awake_waits_for_it() {
        let log = Log::default();
        let gate = Gate::default();
        let mut ctx = context();
        let mut states = StateManager::new();

        states.set_state(Box::new(Recorder::new("s1", &log)), None, &mut ctx).unwrap();
        states
            .set_state(Box::new(Recorder::new("s2", &log).gated(&gate)), None, &mut ctx)
            .unwrap();

        states.on_step(&mut ctx).unwrap();
        assert!(!states.is_awake());

        gate.set(Some(Ok(())));
        states.on_step(&mut ctx).unwrap();
        assert!(states.is_awake());
        states.on_step(&mut ctx).unwrap();

        assert_eq!(
            *log.borrow(),
            [
                "s1:preload",
                "s1:awake(0)",
                "s1:destroy",
                "entity:destroy",
                "s2:preload",
                "s2:awake(0)",
                "entity:step",
            ]
        );
    }

    #[test]
    fn test_failed_preload_aborts_transition() {
        let log = Log::default();
        let gate = Gate::default();
        gate.set(Some(Err(StateError::Custom("no network".into()))));
        let mut ctx = context();
        let mut states = StateManager::new();

        let result = states.set_state(Box::new(Recorder::new("s", &log).gated(&gate)), None, &mut ctx);
        match result {
            Err(StateError::PreloadFailed { state, reason }) => {
                assert_eq!(state, "s");
                assert_eq!(reason, "no network");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(!states.has_state());
        assert_eq!(*log.borrow(), ["s:preload", "s:destroy"]);
    }

    #[test]
    fn test_overlapping_set_state_cancels_pending_preload() {
        let log = Log::default();
        let gate = Gate::default();
        let mut ctx = context();
        let mut states = StateManager::new();

        states
            .set_state(Box::new(Recorder::new("slow", &log).gated(&gate)), None, &mut ctx)
            .unwrap();
        states.set_state(Box::new(Recorder::new("fast", &log)), None, &mut ctx).unwrap();
        gate.set(Some(Ok(())));
        states.on_step(&mut ctx).unwrap();

        assert!(states.is_current("fast"));
        assert_eq!(
            *log.borrow(),
            ["slow:preload", "slow:destroy", "fast:preload", "fast:awake(0)", "entity:step"]
        );
    }

    #[test]
    fn test_step_and_render_without_state_are_no_ops() {
        let mut ctx = context();
        let mut states = StateManager::new();
        states.on_step(&mut ctx).unwrap();
        states.render(&mut ctx).unwrap();
        assert!(matches!(states.current_mut(), Err(StateError::NoActiveState)));
    }
}
