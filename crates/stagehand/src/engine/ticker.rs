//! Per-frame task list

use crate::foundation::collections::{SlotMap, TaskId};

type Task = Box<dyn FnMut(f32)>;

/// Ordered callbacks run once per frame before the state steps
pub struct Ticker {
    tasks: SlotMap<TaskId, Task>,
    order: Vec<TaskId>,
    max_fps: Option<u32>,
}

impl std::fmt::Debug for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticker")
            .field("tasks", &self.order.len())
            .field("max_fps", &self.max_fps)
            .finish()
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new(Some(60))
    }
}

impl Ticker {
    /// Empty ticker capped at `max_fps` (`None` = uncapped)
    pub fn new(max_fps: Option<u32>) -> Self {
        Self {
            tasks: SlotMap::with_key(),
            order: Vec::new(),
            max_fps,
        }
    }

    /// Frame rate cap
    pub fn max_fps(&self) -> Option<u32> {
        self.max_fps
    }

    /// Change the frame rate cap
    pub fn set_max_fps(&mut self, max_fps: Option<u32>) {
        self.max_fps = max_fps.filter(|fps| *fps > 0);
    }

    /// Append a task; it runs after every task added before it
    pub fn add(&mut self, task: impl FnMut(f32) + 'static) -> TaskId {
        let id = self.tasks.insert(Box::new(task));
        self.order.push(id);
        id
    }

    /// Remove a task. Unknown handles only log a warning.
    pub fn remove(&mut self, id: TaskId) -> bool {
        if self.tasks.remove(id).is_none() {
            log::warn!("Failed to remove ticker task {id:?}: not registered");
            return false;
        }
        self.order.retain(|task| *task != id);
        true
    }

    /// Number of tasks
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether there are no tasks
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Run every task with the frame delta
    pub fn tick(&mut self, dt: f32) {
        for id in &self.order {
            if let Some(task) = self.tasks.get_mut(*id) {
                task(dt);
            }
        }
    }
}
