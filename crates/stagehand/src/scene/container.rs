//! Scene: the set of game objects mounted under one stage root

use super::render::{Camera, RenderError, RenderTarget};
use super::stage::{Node, NodeKind, StageError};
use crate::ecs::{EcsError, World};
use crate::foundation::collections::{EntityId, NodeId};
use thiserror::Error;

/// Scene errors
#[derive(Error, Debug)]
pub enum SceneError {
    /// Entity/component failure, including a System's step error
    #[error(transparent)]
    Ecs(#[from] EcsError),

    /// Render graph failure
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Render target failure
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The entity is unknown, destroyed, or not part of this scene
    #[error("Entity {0:?} is not a valid object for this scene")]
    InvalidObject(EntityId),

    /// Render requested before any root exists
    #[error("Scene has no stage root")]
    NoRoot,
}

/// A world plus the stage root its objects are mounted beneath.
///
/// Only entities whose render node sits under the root take part in
/// [`Scene::on_step`] and [`Scene::render`]. The root is created lazily.
pub struct Scene {
    world: World,
    root: Option<NodeId>,
    mounted: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Empty scene; no root exists until the first object or `on_apply`
    pub fn new() -> Self {
        Self {
            world: World::new(),
            root: None,
            mounted: false,
        }
    }

    /// The entity arena
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The entity arena, mutably
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Stage root, if created
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Whether the root is mounted on a render target
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn ensure_root(&mut self) -> NodeId {
        if let Some(root) = self.root.filter(|r| self.world.stage().contains(*r)) {
            return root;
        }
        let root = self
            .world
            .stage_mut()
            .insert_detached(Node::group().with_name("scene-root"));
        log::trace!("Created scene root {root:?}");
        self.root = Some(root);
        root
    }

    /// Spawn an entity and add it to the scene in one go
    pub fn spawn_object(&mut self, name: impl Into<String>) -> Result<EntityId, SceneError> {
        let entity = self.world.spawn_named(name);
        self.add_object(entity)?;
        Ok(entity)
    }

    /// Mount `entity` directly beneath the scene root.
    ///
    /// An entity owned by a parent entity is released from it first.
    pub fn add_object(&mut self, entity: EntityId) -> Result<(), SceneError> {
        let node = self
            .world
            .node(entity)
            .ok_or(SceneError::InvalidObject(entity))?;
        let root = self.ensure_root();
        self.world.unlink_from_parent(entity);
        self.world.stage_mut().reparent(node, Some(root))?;
        log::debug!("Added {entity:?} to scene");
        Ok(())
    }

    /// Detach `entity` from the scene, destroying its subtree if asked.
    ///
    /// With `destroy`, every entity in the node's subtree is destroyed,
    /// including entities mounted there without an ownership link.
    pub fn remove_object(&mut self, entity: EntityId, destroy: bool) -> Result<(), SceneError> {
        let node = self
            .world
            .node(entity)
            .ok_or(SceneError::InvalidObject(entity))?;
        if !self.contains_node(node) {
            return Err(SceneError::InvalidObject(entity));
        }

        if destroy {
            for member in self.entities_under(node) {
                self.world.destroy(member)?;
            }
        } else {
            self.world.unlink_from_parent(entity);
            self.world.stage_mut().detach(node)?;
        }
        log::debug!("Removed {entity:?} from scene (destroy: {destroy})");
        Ok(())
    }

    /// Remove every top-level object
    pub fn remove_all_objects(&mut self, destroy: bool) -> Result<(), SceneError> {
        for entity in self.objects() {
            self.remove_object(entity, destroy)?;
        }
        Ok(())
    }

    /// Entities mounted directly under the root, in stage order
    pub fn objects(&self) -> Vec<EntityId> {
        let stage = self.world.stage();
        self.root
            .and_then(|root| stage.get(root))
            .map(|root| {
                root.children()
                    .iter()
                    .filter_map(|child| stage.get(*child).and_then(Node::entity))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every entity in the scene, depth-first, parents before children
    pub fn entities(&self) -> Vec<EntityId> {
        self.root
            .map(|root| self.entities_under(root))
            .unwrap_or_default()
    }

    fn entities_under(&self, start: NodeId) -> Vec<EntityId> {
        let mut out = Vec::new();
        // Missing start yields no entities.
        let _ = self.world.stage().traverse(start, |_, node| {
            if let NodeKind::Entity(entity) = node.kind {
                out.push(entity);
            }
        });
        out
    }

    fn contains_node(&self, node: NodeId) -> bool {
        let Some(root) = self.root else {
            return false;
        };
        let stage = self.world.stage();
        let mut cursor = stage.get(node).and_then(Node::parent);
        while let Some(current) = cursor {
            if current == root {
                return true;
            }
            cursor = stage.get(current).and_then(Node::parent);
        }
        false
    }

    /// Step every entity in traversal order.
    ///
    /// The visit order is fixed when the call starts. Entities destroyed
    /// during the pass are skipped; the first System error ends the pass.
    pub fn on_step(&mut self, dt: f32) -> Result<(), SceneError> {
        for entity in self.entities() {
            if self.world.contains(entity) {
                self.world.step(entity, dt)?;
            }
        }
        Ok(())
    }

    /// Mount the root on `target`
    pub fn on_apply(&mut self, target: &mut dyn RenderTarget) -> Result<(), SceneError> {
        let root = self.ensure_root();
        target.mount(self.world.stage(), root)?;
        self.mounted = true;
        log::debug!("Scene root {root:?} mounted");
        Ok(())
    }

    /// Remove all objects (destroying them if asked) and unmount the root
    pub fn on_destroy(
        &mut self,
        target: &mut dyn RenderTarget,
        destroy_objects: bool,
    ) -> Result<(), SceneError> {
        self.remove_all_objects(destroy_objects)?;
        if let Some(root) = self.root.take() {
            if self.mounted {
                target.unmount(root);
            }
            if self.world.stage().contains(root) {
                self.world.stage_mut().remove(root)?;
            }
        }
        self.mounted = false;
        let reaped = self.world.reap_destroyed();
        log::debug!("Scene torn down, {reaped} entities reaped");
        Ok(())
    }

    /// Issue exactly one render call for the mounted root
    pub fn render(&self, target: &mut dyn RenderTarget, camera: &Camera) -> Result<(), SceneError> {
        let root = match self.root {
            Some(root) if self.mounted => root,
            Some(root) => return Err(RenderError::NotMounted(root).into()),
            None => return Err(SceneError::NoRoot),
        };
        target.render(self.world.stage(), root, camera)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{Component, ComponentContext, ComponentId, System};
    use crate::scene::HeadlessTarget;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        log: Log,
        fail: bool,
    }

    struct RecorderSystem;

    impl System<Recorder> for RecorderSystem {
        fn on_step(_dt: f32, recorder: &mut Recorder, ctx: &mut ComponentContext<'_>) -> Result<(), EcsError> {
            let name = ctx.world().name(ctx.entity()).unwrap_or("?").to_string();
            recorder.log.borrow_mut().push(name);
            if recorder.fail {
                return Err(EcsError::system(Recorder::ID, "boom"));
            }
            Ok(())
        }

        fn on_destroy(recorder: &mut Recorder, ctx: &mut ComponentContext<'_>) {
            let name = ctx.world().name(ctx.entity()).unwrap_or("?").to_string();
            recorder.log.borrow_mut().push(format!("destroy {name}"));
        }
    }

    impl Component for Recorder {
        const ID: ComponentId = ComponentId::new("recorder");
        type System = RecorderSystem;
    }

    fn recorder(scene: &mut Scene, entity: EntityId, log: &Log, fail: bool) {
        scene
            .world_mut()
            .add_component(entity, Recorder { log: log.clone(), fail })
            .unwrap();
    }

    #[test]
    fn test_step_visits_depth_first_in_insertion_order() {
        let log = Log::default();
        let mut scene = Scene::new();
        let spawn = |scene: &mut Scene, name: &str, parent: Option<EntityId>| {
            let entity = match parent {
                None => scene.spawn_object(name).unwrap(),
                Some(parent) => {
                    let child = scene.world_mut().spawn_named(name);
                    scene.world_mut().add_child(parent, child).unwrap();
                    child
                }
            };
            recorder(scene, entity, &log, false);
            entity
        };

        let x = spawn(&mut scene, "x", None);
        let y = spawn(&mut scene, "y", None);
        let _z = spawn(&mut scene, "z", None);
        let x1 = spawn(&mut scene, "x1", Some(x));
        spawn(&mut scene, "x1a", Some(x1));
        spawn(&mut scene, "x2", Some(x));
        spawn(&mut scene, "y1", Some(y));

        scene.on_step(0.016).unwrap();
        assert_eq!(*log.borrow(), ["x", "x1", "x1a", "x2", "y", "y1", "z"]);
    }

    #[test]
    fn test_detached_entities_are_not_stepped() {
        let log = Log::default();
        let mut scene = Scene::new();
        let inside = scene.spawn_object("inside").unwrap();
        let outside = scene.world_mut().spawn_named("outside");
        recorder(&mut scene, inside, &log, false);
        recorder(&mut scene, outside, &log, false);

        scene.on_step(0.016).unwrap();
        assert_eq!(*log.borrow(), ["inside"]);
    }

    #[test]
    fn test_step_error_stops_the_pass() {
        crate::foundation::logging::init_test();
        let log = Log::default();
        let mut scene = Scene::new();
        for (name, fail) in [("a", false), ("b", true), ("c", false)] {
            let entity = scene.spawn_object(name).unwrap();
            recorder(&mut scene, entity, &log, fail);
        }

        let result = scene.on_step(0.016);
        assert!(matches!(result, Err(SceneError::Ecs(EcsError::System { .. }))));
        assert_eq!(*log.borrow(), ["a", "b"]);
    }

    #[test]
    fn test_remove_object_without_destroy_keeps_entity() {
        let mut scene = Scene::new();
        let entity = scene.spawn_object("keep").unwrap();

        scene.remove_object(entity, false).unwrap();
        assert!(scene.objects().is_empty());
        assert!(scene.world().contains(entity));
        assert!(matches!(
            scene.remove_object(entity, false),
            Err(SceneError::InvalidObject(_))
        ));
    }

    #[test]
    fn test_remove_object_destroys_subtree() {
        let log = Log::default();
        let mut scene = Scene::new();
        let parent = scene.spawn_object("parent").unwrap();
        let child = scene.world_mut().spawn_named("child");
        scene.world_mut().add_child(parent, child).unwrap();
        recorder(&mut scene, parent, &log, false);
        recorder(&mut scene, child, &log, false);

        scene.remove_object(parent, true).unwrap();
        assert!(!scene.world().contains(parent));
        assert!(!scene.world().contains(child));
        assert_eq!(*log.borrow(), ["destroy parent", "destroy child"]);
    }

    #[test]
    fn test_apply_render_destroy_cycle() {
        let mut scene = Scene::new();
        let mut target = HeadlessTarget::new();
        scene.spawn_object("a").unwrap();
        scene.spawn_object("b").unwrap();

        assert!(scene.render(&mut target, &Camera::default()).is_err());
        scene.on_apply(&mut target).unwrap();
        scene.render(&mut target, &Camera::default()).unwrap();
        assert_eq!(target.frames(), 1);

        scene.on_destroy(&mut target, true).unwrap();
        assert!(target.mounted().is_empty());
        assert!(scene.world().is_empty());
        assert!(scene.objects().is_empty());
    }
}
