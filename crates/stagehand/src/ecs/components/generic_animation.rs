//! Frame-driven generic animation
//!
//! Advances a progress value in `[0, 1]` a little every step and hands it to
//! a callback, so tweens never block or await. Looping animations ping-pong
//! between the ends; one-shot animations stop at 1 and can remove
//! themselves.

use crate::ecs::{Component, ComponentContext, ComponentId, EcsError, System};

/// Callback receiving `(dt, progress)` each step
pub type TickFn = Box<dyn FnMut(f32, f32)>;

/// Progress-based tween driver
pub struct GenericAnimationComponent {
    /// Progress per second
    speed: f32,
    progress: f32,
    looping: bool,
    reversing: bool,
    remove_when_done: bool,
    on_tick: Option<TickFn>,
}

impl GenericAnimationComponent {
    /// Animation advancing at `speed` progress per second
    pub fn new(speed: f32) -> Self {
        Self {
            speed,
            progress: 0.0,
            looping: false,
            reversing: false,
            remove_when_done: false,
            on_tick: None,
        }
    }

    /// Builder: callback invoked after every advance
    #[must_use]
    pub fn on_tick(mut self, tick: impl FnMut(f32, f32) + 'static) -> Self {
        self.on_tick = Some(Box::new(tick));
        self
    }

    /// Builder: bounce between 0 and 1 forever
    #[must_use]
    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    /// Builder: detach from the entity once finished
    #[must_use]
    pub fn remove_when_done(mut self) -> Self {
        self.remove_when_done = true;
        self
    }

    /// Current progress in `[0, 1]`
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Whether progress is currently running backwards
    pub fn is_reversing(&self) -> bool {
        self.reversing
    }

    /// One-shot animation that reached the end
    pub fn is_done(&self) -> bool {
        !self.looping && self.progress >= 1.0
    }

    /// Restart from zero
    pub fn reset(&mut self) {
        self.progress = 0.0;
        self.reversing = false;
    }

    fn advance(&mut self, dt: f32) {
        let direction = if self.reversing { -1.0 } else { 1.0 };
        self.progress = (self.progress + self.speed * dt * direction).clamp(0.0, 1.0);
        if self.looping {
            if self.progress >= 1.0 {
                self.reversing = true;
            } else if self.progress <= 0.0 {
                self.reversing = false;
            }
        }
    }
}

impl std::fmt::Debug for GenericAnimationComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericAnimationComponent")
            .field("speed", &self.speed)
            .field("progress", &self.progress)
            .field("looping", &self.looping)
            .field("reversing", &self.reversing)
            .finish_non_exhaustive()
    }
}

impl Component for GenericAnimationComponent {
    const ID: ComponentId = ComponentId::new("GenericAnimationComponent");
    type System = GenericAnimationSystem;
}

/// Steps generic animations
pub struct GenericAnimationSystem;

impl System<GenericAnimationComponent> for GenericAnimationSystem {
    fn on_step(
        dt: f32,
        component: &mut GenericAnimationComponent,
        ctx: &mut ComponentContext<'_>,
    ) -> Result<(), EcsError> {
        if component.is_done() {
            if component.remove_when_done {
                ctx.remove_self()?;
            }
            return Ok(());
        }
        component.advance(dt);
        let progress = component.progress;
        if let Some(tick) = component.on_tick.as_mut() {
            tick(dt, progress);
        }
        Ok(())
    }
}
