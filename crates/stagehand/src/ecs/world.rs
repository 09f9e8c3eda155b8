//! Entity and component arena
//!
//! The [`World`] owns every game object, every attached component and the
//! [`Stage`] that mirrors the object hierarchy for rendering. Entities are
//! created by [`World::spawn`] and live until [`World::destroy`]; nothing is
//! freed by scope exit.
//!
//! ## Dispatch
//!
//! Component instances live in slots. To run a hook, the world checks the
//! instance out of its slot, hands it a [`ComponentContext`] with
//! `&mut World`, and checks it back in afterwards. A removal or destroy
//! requested for a checked-out instance is recorded on the slot and finished
//! at check-in, so a component can remove itself or destroy its own entity
//! from inside a hook. Likewise, a sibling attached while an instance is
//! checked out is queued on its slot and announced to it at check-in.
//!
//! ## Stepping
//!
//! [`World::step`] walks a snapshot of the entity's component list taken on
//! entry. Components attached during the step first run on the next step;
//! components removed during the step are skipped from then on.

use super::component::{AnyComponent, Component, ComponentId, ComponentQuery};
use super::context::ComponentContext;
use super::entity::{ComponentEvent, ComponentEventKind, EntityRecord};
use super::error::EcsError;
use crate::foundation::collections::{ComponentKey, EntityId, NodeId, SlotMap, SubscriptionId};
use crate::scene::{Node, NodeKind, Stage};

/// Removal state of a component slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Nothing,
    Detach,
    Destroy,
}

struct ComponentSlot {
    owner: EntityId,
    id: ComponentId,
    enabled: bool,
    pending: Pending,
    /// `None` while the instance is checked out for a hook
    instance: Option<Box<dyn AnyComponent>>,
    /// Sibling attachments that arrived while checked out, delivered at check-in
    deferred: Vec<(ComponentId, ComponentKey)>,
}

impl ComponentSlot {
    fn is_active(&self) -> bool {
        self.pending == Pending::Nothing
    }
}

/// Arena of game objects and their components
pub struct World {
    entities: SlotMap<EntityId, EntityRecord>,
    components: SlotMap<ComponentKey, ComponentSlot>,
    stage: Stage,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Create an empty world
    pub fn new() -> Self {
        Self {
            entities: SlotMap::with_key(),
            components: SlotMap::with_key(),
            stage: Stage::new(),
        }
    }

    // ---------------------------------------------------------------------
    // Entities
    // ---------------------------------------------------------------------

    /// Create a game object with its own (detached) render node
    pub fn spawn(&mut self) -> EntityId {
        self.spawn_record(None)
    }

    /// Create a named game object
    pub fn spawn_named(&mut self, name: impl Into<String>) -> EntityId {
        self.spawn_record(Some(name.into()))
    }

    fn spawn_record(&mut self, name: Option<String>) -> EntityId {
        let stage = &mut self.stage;
        let entity = self.entities.insert_with_key(|id| {
            let mut node = Node::new(NodeKind::Entity(id));
            node.name.clone_from(&name);
            EntityRecord::new(name, stage.insert_detached(node))
        });
        log::trace!("Spawned entity {entity:?}");
        entity
    }

    /// Whether the entity exists and has not been destroyed
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.get(entity).is_some_and(|record| !record.destroyed)
    }

    /// True once `destroy` has run, and for handles this world never issued
    pub fn is_queued_for_destruction(&self, entity: EntityId) -> bool {
        self.entities.get(entity).map_or(true, |record| record.destroyed)
    }

    /// Live (not destroyed) entities
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities
            .iter()
            .filter(|(_, record)| !record.destroyed)
            .map(|(id, _)| id)
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.entities().count()
    }

    /// Whether there are no live entities
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Debug name given at spawn
    pub fn name(&self, entity: EntityId) -> Option<&str> {
        self.entities.get(entity)?.name.as_deref()
    }

    /// Render node mirroring the entity
    pub fn node(&self, entity: EntityId) -> Option<NodeId> {
        let record = self.entities.get(entity)?;
        (!record.destroyed).then_some(record.node)
    }

    /// The render graph
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// The render graph, mutably
    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }

    fn live(&self, entity: EntityId) -> Result<&EntityRecord, EcsError> {
        match self.entities.get(entity) {
            None => Err(EcsError::EntityNotFound(entity)),
            Some(record) if record.destroyed => Err(EcsError::EntityDestroyed(entity)),
            Some(record) => Ok(record),
        }
    }

    fn live_mut(&mut self, entity: EntityId) -> Result<&mut EntityRecord, EcsError> {
        match self.entities.get_mut(entity) {
            None => Err(EcsError::EntityNotFound(entity)),
            Some(record) if record.destroyed => Err(EcsError::EntityDestroyed(entity)),
            Some(record) => Ok(record),
        }
    }

    /// Destroy an entity.
    ///
    /// Order: on-destroy subscribers, then every attached component's system
    /// `on_destroy` in attach order, then the component list is cleared,
    /// children are destroyed recursively, and the render node is removed.
    /// Components are not sent `on_detach`. Destroying an already destroyed
    /// entity does nothing.
    pub fn destroy(&mut self, entity: EntityId) -> Result<(), EcsError> {
        let record = self
            .entities
            .get_mut(entity)
            .ok_or(EcsError::EntityNotFound(entity))?;
        if record.destroyed {
            log::trace!("Entity {entity:?} already destroyed");
            return Ok(());
        }
        record.destroyed = true;

        let mut on_destroy = std::mem::take(&mut record.events.on_destroy);
        on_destroy.for_each_mut(|handler| handler(entity));

        let keys = self
            .entities
            .get(entity)
            .map(|record| record.components.clone())
            .unwrap_or_default();
        for key in keys {
            self.begin_removal(entity, key, Pending::Destroy);
        }

        let Some(record) = self.entities.get_mut(entity) else {
            return Ok(());
        };
        record.components.clear();
        record.events = super::entity::EntityEvents::default();
        let children = std::mem::take(&mut record.children);
        let parent = record.parent.take();
        let node = record.node;

        for child in children {
            self.destroy(child)?;
        }
        if let Some(parent) = parent.and_then(|p| self.entities.get_mut(p)) {
            parent.children.retain(|child| *child != entity);
        }
        if self.stage.contains(node) {
            self.stage.remove(node)?;
        }

        log::debug!("Destroyed entity {entity:?}");
        Ok(())
    }

    /// Free the arena entries of destroyed entities; returns how many
    pub fn reap_destroyed(&mut self) -> usize {
        let before = self.entities.len();
        self.entities.retain(|_, record| !record.destroyed);
        before - self.entities.len()
    }

    // ---------------------------------------------------------------------
    // Hierarchy
    // ---------------------------------------------------------------------

    /// Parent `child` under `parent` in both the ownership tree and the stage.
    ///
    /// The child is moved out of any previous parent. Destroying `parent`
    /// destroys `child`.
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) -> Result<(), EcsError> {
        let parent_node = self.live(parent)?.node;
        let child_node = self.live(child)?.node;

        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == child {
                return Err(EcsError::HierarchyCycle { parent, child });
            }
            cursor = self.entities.get(current).and_then(|record| record.parent);
        }

        self.unlink_from_parent(child);
        self.stage.reparent(child_node, Some(parent_node))?;
        self.live_mut(child)?.parent = Some(parent);
        self.live_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Undo [`World::add_child`]; the child's render node becomes detached
    pub fn remove_child(&mut self, parent: EntityId, child: EntityId) -> Result<(), EcsError> {
        if self.live(child)?.parent != Some(parent) {
            return Err(EcsError::NotAChild { parent, child });
        }
        self.unlink_from_parent(child);
        let node = self.live(child)?.node;
        self.stage.detach(node)?;
        Ok(())
    }

    /// Drop the ownership link to the current parent, if any
    pub(crate) fn unlink_from_parent(&mut self, child: EntityId) {
        let parent = self
            .entities
            .get_mut(child)
            .and_then(|record| record.parent.take());
        if let Some(record) = parent.and_then(|p| self.entities.get_mut(p)) {
            record.children.retain(|c| *c != child);
        }
    }

    /// Owning parent entity
    pub fn parent(&self, entity: EntityId) -> Option<EntityId> {
        self.entities.get(entity)?.parent
    }

    /// Child entities in insertion order
    pub fn children(&self, entity: EntityId) -> &[EntityId] {
        self.entities
            .get(entity)
            .map_or(&[], |record| record.children.as_slice())
    }

    // ---------------------------------------------------------------------
    // Components
    // ---------------------------------------------------------------------

    /// Attach a component.
    ///
    /// Fails with [`EcsError::DuplicateComponent`] if the tag is already
    /// attached, leaving the entity untouched. Otherwise, in order: the
    /// component is appended, its system's `on_awake` runs, its own
    /// `on_attach` runs, every previously attached sibling gets
    /// `on_component_attached` in attach order, and add-component
    /// subscribers are notified.
    pub fn add_component<C: Component>(
        &mut self,
        entity: EntityId,
        component: C,
    ) -> Result<ComponentKey, EcsError> {
        self.add_boxed(entity, Box::new(component))
    }

    /// Attach an already boxed component; see [`World::add_component`]
    pub fn add_boxed(
        &mut self,
        entity: EntityId,
        component: Box<dyn AnyComponent>,
    ) -> Result<ComponentKey, EcsError> {
        let id = component.id();
        let earlier = self.live(entity)?.components.clone();
        if self.has_component(entity, id) {
            return Err(EcsError::DuplicateComponent {
                entity,
                component: id,
            });
        }

        let key = self.components.insert(ComponentSlot {
            owner: entity,
            id,
            enabled: true,
            pending: Pending::Nothing,
            instance: Some(component),
            deferred: Vec::new(),
        });
        self.live_mut(entity)?.components.push(key);
        log::trace!("Attaching {id} to {entity:?}");

        self.dispatch(key, |c, ctx| c.system_awake(ctx));
        self.dispatch(key, |c, ctx| c.hook_attach(ctx));
        for sibling in earlier {
            if !self.is_attached_to(sibling, entity) {
                continue;
            }
            let delivered = self.dispatch(sibling, |c, ctx| c.hook_component_attached(id, key, ctx));
            if delivered.is_none() {
                // The sibling's own hook is running; it hears about us when it returns.
                if let Some(slot) = self.components.get_mut(sibling) {
                    slot.deferred.push((id, key));
                }
            }
        }
        self.emit_component_event(entity, key, ComponentEventKind::Added);
        Ok(key)
    }

    /// Detach one component.
    ///
    /// Runs its `on_detach`, removes it from the list and notifies
    /// remove-component subscribers with the removed instance. Fails with
    /// [`EcsError::ComponentNotFound`] without side effects if nothing
    /// matches.
    pub fn remove_component<'q>(
        &mut self,
        entity: EntityId,
        query: impl Into<ComponentQuery<'q>>,
    ) -> Result<(), EcsError> {
        let key = self.find_or_fail(entity, query.into())?;
        self.begin_removal(entity, key, Pending::Detach);
        Ok(())
    }

    /// Detach every component in current list order
    pub fn remove_all_components(&mut self, entity: EntityId) -> Result<(), EcsError> {
        let keys = self.live(entity)?.components.clone();
        for key in keys {
            if self.is_attached_to(key, entity) {
                self.begin_removal(entity, key, Pending::Detach);
            }
        }
        Ok(())
    }

    /// Whether a component with the query's tag is attached.
    ///
    /// A key query is resolved to its tag first, so this compares identity
    /// tags in every case. Destroyed and unknown entities have nothing.
    pub fn has_component<'q>(&self, entity: EntityId, query: impl Into<ComponentQuery<'q>>) -> bool {
        let query = match query.into() {
            ComponentQuery::Key(key) => match self.components.get(key) {
                Some(slot) => ComponentQuery::Tag(slot.id),
                None => return false,
            },
            by_tag => by_tag,
        };
        self.active_slots(entity).any(|(key, slot)| query.matches(key, slot.id))
    }

    /// First attached component of kind `C`
    pub fn get_component<C: Component>(&self, entity: EntityId) -> Option<&C> {
        self.active_slots(entity)
            .find_map(|(_, slot)| slot.instance.as_deref()?.downcast_ref::<C>())
    }

    /// First attached component of kind `C`, mutably
    pub fn get_component_mut<C: Component>(&mut self, entity: EntityId) -> Option<&mut C> {
        let key = self.component_key::<C>(entity)?;
        self.component_mut::<C>(key)
    }

    /// Key of the first attached component of kind `C`
    pub fn component_key<C: Component>(&self, entity: EntityId) -> Option<ComponentKey> {
        self.active_slots(entity)
            .find(|(_, slot)| {
                slot.instance
                    .as_deref()
                    .is_some_and(|instance| instance.is::<C>())
            })
            .map(|(key, _)| key)
    }

    /// Component instance by key, if it is of kind `C`
    pub fn component<C: Component>(&self, key: ComponentKey) -> Option<&C> {
        self.components
            .get(key)?
            .instance
            .as_deref()?
            .downcast_ref::<C>()
    }

    /// Component instance by key, mutably
    pub fn component_mut<C: Component>(&mut self, key: ComponentKey) -> Option<&mut C> {
        self.components
            .get_mut(key)?
            .instance
            .as_deref_mut()?
            .downcast_mut::<C>()
    }

    /// Type-erased component instance by key
    pub fn component_dyn(&self, key: ComponentKey) -> Option<&dyn AnyComponent> {
        self.components.get(key)?.instance.as_deref()
    }

    /// Attached component keys in attach order
    pub fn component_keys(&self, entity: EntityId) -> Vec<ComponentKey> {
        self.active_slots(entity).map(|(key, _)| key).collect()
    }

    /// Attached component tags in attach order
    pub fn component_ids(&self, entity: EntityId) -> Vec<ComponentId> {
        self.active_slots(entity).map(|(_, slot)| slot.id).collect()
    }

    /// Owner of an attached component
    pub fn owner(&self, key: ComponentKey) -> Option<EntityId> {
        self.components
            .get(key)
            .filter(|slot| slot.is_active())
            .map(|slot| slot.owner)
    }

    /// Enable or disable a component.
    ///
    /// The system's `on_enable`/`on_disable` runs only when the flag actually
    /// changes. Disabled components are skipped by [`World::step`].
    pub fn set_component_enabled<'q>(
        &mut self,
        entity: EntityId,
        query: impl Into<ComponentQuery<'q>>,
        enabled: bool,
    ) -> Result<(), EcsError> {
        let key = self.find_or_fail(entity, query.into())?;
        let Some(slot) = self.components.get_mut(key) else {
            return Ok(());
        };
        if slot.enabled == enabled {
            return Ok(());
        }
        slot.enabled = enabled;
        let dispatched = if enabled {
            self.dispatch(key, |c, ctx| c.system_enable(ctx))
        } else {
            self.dispatch(key, |c, ctx| c.system_disable(ctx))
        };
        if dispatched.is_none() {
            log::debug!("Component {key:?} toggled while checked out; hook skipped");
        }
        Ok(())
    }

    /// Whether an attached component is enabled
    pub fn is_component_enabled(&self, key: ComponentKey) -> bool {
        self.components
            .get(key)
            .is_some_and(|slot| slot.is_active() && slot.enabled)
    }

    /// Run every enabled component's system `on_step` in attach order.
    ///
    /// The first system error stops the walk and is returned.
    pub fn step(&mut self, entity: EntityId, dt: f32) -> Result<(), EcsError> {
        let snapshot = self.live(entity)?.components.clone();
        for key in snapshot {
            if self.is_queued_for_destruction(entity) {
                break;
            }
            let runnable = self.components.get(key).is_some_and(|slot| {
                slot.owner == entity && slot.enabled && slot.is_active() && slot.instance.is_some()
            });
            if !runnable {
                continue;
            }
            if let Some(result) = self.dispatch(key, |c, ctx| c.system_step(dt, ctx)) {
                result?;
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Subscriptions
    // ---------------------------------------------------------------------

    /// Subscribe to an entity's destruction
    pub fn on_destroy(
        &mut self,
        entity: EntityId,
        handler: impl FnMut(EntityId) + 'static,
    ) -> Result<SubscriptionId, EcsError> {
        Ok(self
            .live_mut(entity)?
            .events
            .on_destroy
            .subscribe(Box::new(handler)))
    }

    /// Remove a destroy subscription
    pub fn off_destroy(&mut self, entity: EntityId, id: SubscriptionId) -> Result<(), EcsError> {
        self.live_mut(entity)?.events.on_destroy.unsubscribe(id)?;
        Ok(())
    }

    /// Subscribe to components being attached
    pub fn on_add_component(
        &mut self,
        entity: EntityId,
        handler: impl FnMut(&ComponentEvent<'_>) + 'static,
    ) -> Result<SubscriptionId, EcsError> {
        Ok(self
            .live_mut(entity)?
            .component_registry(ComponentEventKind::Added)
            .subscribe(Box::new(handler)))
    }

    /// Remove an add-component subscription
    pub fn off_add_component(&mut self, entity: EntityId, id: SubscriptionId) -> Result<(), EcsError> {
        self.live_mut(entity)?
            .component_registry(ComponentEventKind::Added)
            .unsubscribe(id)?;
        Ok(())
    }

    /// Subscribe to components being removed
    pub fn on_remove_component(
        &mut self,
        entity: EntityId,
        handler: impl FnMut(&ComponentEvent<'_>) + 'static,
    ) -> Result<SubscriptionId, EcsError> {
        Ok(self
            .live_mut(entity)?
            .component_registry(ComponentEventKind::Removed)
            .subscribe(Box::new(handler)))
    }

    /// Remove a remove-component subscription
    pub fn off_remove_component(
        &mut self,
        entity: EntityId,
        id: SubscriptionId,
    ) -> Result<(), EcsError> {
        self.live_mut(entity)?
            .component_registry(ComponentEventKind::Removed)
            .unsubscribe(id)?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn active_slots(&self, entity: EntityId) -> impl Iterator<Item = (ComponentKey, &ComponentSlot)> + '_ {
        self.entities
            .get(entity)
            .map(|record| record.components.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|key| {
                self.components
                    .get(*key)
                    .filter(|slot| slot.is_active())
                    .map(|slot| (*key, slot))
            })
    }

    fn find_or_fail(&self, entity: EntityId, query: ComponentQuery<'_>) -> Result<ComponentKey, EcsError> {
        self.live(entity)?;
        self.active_slots(entity)
            .find(|(key, slot)| query.matches(*key, slot.id))
            .map(|(key, _)| key)
            .ok_or_else(|| EcsError::ComponentNotFound {
                entity,
                query: query.to_string(),
            })
    }

    fn is_attached_to(&self, key: ComponentKey, entity: EntityId) -> bool {
        self.components
            .get(key)
            .is_some_and(|slot| slot.owner == entity && slot.is_active())
    }

    /// Check the instance out, run `f`, check it back in.
    ///
    /// Returns `None` without running `f` if the slot is gone, leaving, or
    /// already checked out.
    fn dispatch<R>(
        &mut self,
        key: ComponentKey,
        f: impl FnOnce(&mut dyn AnyComponent, &mut ComponentContext<'_>) -> R,
    ) -> Option<R> {
        let slot = self.components.get_mut(key)?;
        if !slot.is_active() {
            return None;
        }
        let mut instance = slot.instance.take()?;
        let owner = slot.owner;
        let result = f(instance.as_mut(), &mut ComponentContext::new(self, owner, key));
        self.check_in(key, instance);
        Some(result)
    }

    fn check_in(&mut self, key: ComponentKey, instance: Box<dyn AnyComponent>) {
        let Some(slot) = self.components.get_mut(key) else {
            return;
        };
        match slot.pending {
            Pending::Nothing => {
                slot.instance = Some(instance);
                let owner = slot.owner;
                let deferred = std::mem::take(&mut slot.deferred);
                for (id, sibling) in deferred {
                    if self.is_attached_to(sibling, owner) {
                        self.dispatch(key, |c, ctx| c.hook_component_attached(id, sibling, ctx));
                    }
                }
            }
            how => {
                let owner = slot.owner;
                self.finish_removal(owner, key, instance, how);
            }
        }
    }

    fn begin_removal(&mut self, entity: EntityId, key: ComponentKey, how: Pending) {
        let Some(slot) = self.components.get_mut(key) else {
            return;
        };
        slot.pending = how;
        match slot.instance.take() {
            Some(instance) => self.finish_removal(entity, key, instance, how),
            // Checked out by a running hook; check_in finishes the job.
            None => self.unlink_component(entity, key),
        }
    }

    fn finish_removal(
        &mut self,
        entity: EntityId,
        key: ComponentKey,
        mut instance: Box<dyn AnyComponent>,
        how: Pending,
    ) {
        match how {
            Pending::Nothing => {
                if let Some(slot) = self.components.get_mut(key) {
                    slot.instance = Some(instance);
                }
            }
            Pending::Detach => {
                instance.hook_detach(&mut ComponentContext::new(self, entity, key));
                self.unlink_component(entity, key);
                self.components.remove(key);
                log::trace!("Detached {} from {entity:?}", instance.id());
                self.notify(entity, key, instance.as_ref(), ComponentEventKind::Removed);
            }
            Pending::Destroy => {
                instance.system_destroy(&mut ComponentContext::new(self, entity, key));
                self.components.remove(key);
            }
        }
    }

    fn unlink_component(&mut self, entity: EntityId, key: ComponentKey) {
        if let Some(record) = self.entities.get_mut(entity) {
            record.components.retain(|k| *k != key);
        }
    }

    fn emit_component_event(&mut self, entity: EntityId, key: ComponentKey, kind: ComponentEventKind) {
        let Self {
            entities,
            components,
            ..
        } = self;
        let Some(instance) = components.get(key).and_then(|slot| slot.instance.as_deref()) else {
            return;
        };
        if let Some(record) = entities.get_mut(entity) {
            let event = ComponentEvent {
                entity,
                id: instance.id(),
                key,
                component: instance,
            };
            record.component_registry(kind).for_each_mut(|handler| handler(&event));
        }
    }

    fn notify(
        &mut self,
        entity: EntityId,
        key: ComponentKey,
        instance: &dyn AnyComponent,
        kind: ComponentEventKind,
    ) {
        if let Some(record) = self.entities.get_mut(entity) {
            let event = ComponentEvent {
                entity,
                id: instance.id(),
                key,
                component: instance,
            };
            record.component_registry(kind).for_each_mut(|handler| handler(&event));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::System;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        log: Log,
        siblings: Vec<ComponentId>,
    }

    struct RecorderSystem;

    impl System<Recorder> for RecorderSystem {
        fn on_awake(c: &mut Recorder, _ctx: &mut ComponentContext<'_>) {
            c.log.borrow_mut().push(format!("{}:awake", c.name));
        }

        fn on_step(_dt: f32, c: &mut Recorder, _ctx: &mut ComponentContext<'_>) -> Result<(), EcsError> {
            c.log.borrow_mut().push(format!("{}:step", c.name));
            Ok(())
        }

        fn on_destroy(c: &mut Recorder, _ctx: &mut ComponentContext<'_>) {
            c.log.borrow_mut().push(format!("{}:destroy", c.name));
        }

        fn on_enable(c: &mut Recorder, _ctx: &mut ComponentContext<'_>) {
            c.log.borrow_mut().push(format!("{}:enable", c.name));
        }

        fn on_disable(c: &mut Recorder, _ctx: &mut ComponentContext<'_>) {
            c.log.borrow_mut().push(format!("{}:disable", c.name));
        }
    }

    impl Component for Recorder {
        const ID: ComponentId = ComponentId::new("Recorder");
        type System = RecorderSystem;

        fn on_attach(&mut self, _ctx: &mut ComponentContext<'_>) {
            self.log.borrow_mut().push(format!("{}:attach", self.name));
        }

        fn on_detach(&mut self, _ctx: &mut ComponentContext<'_>) {
            self.log.borrow_mut().push(format!("{}:detach", self.name));
        }

        fn on_component_attached(
            &mut self,
            id: ComponentId,
            _sibling: ComponentKey,
            _ctx: &mut ComponentContext<'_>,
        ) {
            self.siblings.push(id);
            self.log.borrow_mut().push(format!("{}:saw:{id}", self.name));
        }
    }

    /// Second kind so an entity can hold two recorders
    struct Other(Recorder);
    struct OtherSystem;

    impl System<Other> for OtherSystem {
        fn on_step(_dt: f32, c: &mut Other, _ctx: &mut ComponentContext<'_>) -> Result<(), EcsError> {
            c.0.log.borrow_mut().push(format!("{}:step", c.0.name));
            Ok(())
        }

        fn on_destroy(c: &mut Other, _ctx: &mut ComponentContext<'_>) {
            c.0.log.borrow_mut().push(format!("{}:destroy", c.0.name));
        }
    }

    impl Component for Other {
        const ID: ComponentId = ComponentId::new("Other");
        type System = OtherSystem;
    }

    /// Removes itself on its first step
    struct OneShot;
    struct OneShotSystem;

    impl System<OneShot> for OneShotSystem {
        fn on_step(_dt: f32, _c: &mut OneShot, ctx: &mut ComponentContext<'_>) -> Result<(), EcsError> {
            ctx.remove_self()
        }
    }

    impl Component for OneShot {
        const ID: ComponentId = ComponentId::new("OneShot");
        type System = OneShotSystem;
    }

    /// Fails every step
    struct Faulty;
    struct FaultySystem;

    impl System<Faulty> for FaultySystem {
        fn on_step(_dt: f32, _c: &mut Faulty, _ctx: &mut ComponentContext<'_>) -> Result<(), EcsError> {
            Err(EcsError::system(Faulty::ID, "boom"))
        }
    }

    impl Component for Faulty {
        const ID: ComponentId = ComponentId::new("Faulty");
        type System = FaultySystem;
    }

    fn recorder(name: &'static str, log: &Log) -> Recorder {
        Recorder {
            name,
            log: Rc::clone(log),
            siblings: Vec::new(),
        }
    }

    fn take(log: &Log) -> Vec<String> {
        std::mem::take(&mut *log.borrow_mut())
    }

    #[test]
    fn test_attach_runs_awake_then_attach() {
        let log = Log::default();
        let mut world = World::new();
        let e = world.spawn();

        world.add_component(e, recorder("a", &log)).unwrap();

        assert_eq!(take(&log), ["a:awake", "a:attach"]);
        assert!(world.has_component(e, Recorder::ID));
        assert!(world.has_component(e, "Recorder"));
        assert!(world.get_component::<Recorder>(e).unwrap().siblings.is_empty());
    }

    #[test]
    fn test_duplicate_attach_is_rejected_without_mutation() {
        let log = Log::default();
        let mut world = World::new();
        let e = world.spawn();
        let first = world.add_component(e, recorder("a", &log)).unwrap();
        take(&log);

        let err = world.add_component(e, recorder("b", &log)).unwrap_err();

        assert!(matches!(err, EcsError::DuplicateComponent { component, .. } if component == Recorder::ID));
        assert_eq!(world.component_keys(e), vec![first]);
        assert!(take(&log).is_empty());
    }

    #[test]
    fn test_siblings_notified_in_attach_order() {
        let log = Log::default();
        let mut world = World::new();
        let e = world.spawn();

        world.add_component(e, recorder("a", &log)).unwrap();
        world.add_component(e, Other(recorder("b", &log))).unwrap();

        assert_eq!(
            take(&log),
            ["a:awake", "a:attach", "a:saw:Other"]
        );
        assert_eq!(world.get_component::<Recorder>(e).unwrap().siblings, vec![Other::ID]);
    }

    #[test]
    fn test_remove_missing_component_fails_cleanly() {
        let log = Log::default();
        let mut world = World::new();
        let e = world.spawn();
        world.add_component(e, recorder("a", &log)).unwrap();
        take(&log);

        let err = world.remove_component(e, Other::ID).unwrap_err();

        assert!(matches!(err, EcsError::ComponentNotFound { .. }));
        assert_eq!(world.component_ids(e), vec![Recorder::ID]);
        assert!(take(&log).is_empty());
    }

    #[test]
    fn test_remove_fires_detach_and_one_notification() {
        let log = Log::default();
        let mut world = World::new();
        let e = world.spawn();
        let key = world.add_component(e, recorder("a", &log)).unwrap();
        take(&log);

        let removed = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&removed);
        world
            .on_remove_component(e, move |event| {
                let name = event.component.downcast_ref::<Recorder>().map(|p| p.name);
                sink.borrow_mut().push((event.key, name));
            })
            .unwrap();

        world.remove_component(e, ComponentQuery::of::<Recorder>()).unwrap();

        assert_eq!(take(&log), ["a:detach"]);
        assert_eq!(*removed.borrow(), vec![(key, Some("a"))]);
        assert!(!world.has_component(e, Recorder::ID));
        assert!(world.component::<Recorder>(key).is_none());
    }

    #[test]
    fn test_has_component_by_key_compares_tags() {
        let log = Log::default();
        let mut world = World::new();
        let a = world.spawn();
        let b = world.spawn();
        let key_on_a = world.add_component(a, recorder("a", &log)).unwrap();
        world.add_component(b, recorder("b", &log)).unwrap();

        assert!(world.has_component(b, key_on_a));
        world.remove_component(b, Recorder::ID).unwrap();
        assert!(!world.has_component(b, key_on_a));
    }

    #[test]
    fn test_step_order_and_disable() {
        let log = Log::default();
        let mut world = World::new();
        let e = world.spawn();
        world.add_component(e, recorder("a", &log)).unwrap();
        world.add_component(e, Other(recorder("b", &log))).unwrap();
        take(&log);

        world.step(e, 0.016).unwrap();
        assert_eq!(take(&log), ["a:step", "b:step"]);

        world.set_component_enabled(e, Recorder::ID, false).unwrap();
        world.set_component_enabled(e, Recorder::ID, false).unwrap();
        world.step(e, 0.016).unwrap();
        assert_eq!(take(&log), ["a:disable", "b:step"]);

        world.set_component_enabled(e, Recorder::ID, true).unwrap();
        assert_eq!(take(&log), ["a:enable"]);
    }

    #[test]
    fn test_component_can_remove_itself_during_step() {
        let log = Log::default();
        let mut world = World::new();
        let e = world.spawn();
        world.add_component(e, OneShot).unwrap();
        world.add_component(e, recorder("a", &log)).unwrap();
        take(&log);

        world.step(e, 0.1).unwrap();
        assert!(!world.has_component(e, OneShot::ID));
        assert_eq!(take(&log), ["a:step"]);

        world.step(e, 0.1).unwrap();
        assert_eq!(take(&log), ["a:step"]);
    }

    #[test]
    fn test_step_error_stops_remaining_components() {
        let log = Log::default();
        let mut world = World::new();
        let e = world.spawn();
        world.add_component(e, Faulty).unwrap();
        world.add_component(e, recorder("a", &log)).unwrap();
        take(&log);

        let err = world.step(e, 0.1).unwrap_err();
        assert!(matches!(err, EcsError::System { component, .. } if component == Faulty::ID));
        assert!(take(&log).is_empty());
        // The failing component is still attached and intact.
        assert!(world.has_component(e, Faulty::ID));
    }

    #[test]
    fn test_destroy_cascades_and_is_idempotent() {
        let log = Log::default();
        let mut world = World::new();
        let parent = world.spawn();
        let child = world.spawn();
        world.add_child(parent, child).unwrap();
        world.add_component(parent, recorder("p", &log)).unwrap();
        world.add_component(child, recorder("c", &log)).unwrap();
        take(&log);

        let fired = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&fired);
        world.on_destroy(parent, move |_| *counter.borrow_mut() += 1).unwrap();

        world.destroy(parent).unwrap();
        world.destroy(parent).unwrap();

        assert_eq!(take(&log), ["p:destroy", "c:destroy"]);
        assert_eq!(*fired.borrow(), 1);
        assert!(world.is_queued_for_destruction(parent));
        assert!(world.is_queued_for_destruction(child));
        assert!(!world.has_component(parent, Recorder::ID));
        assert!(world.stage().is_empty());
        assert!(matches!(
            world.add_component(parent, recorder("late", &log)),
            Err(EcsError::EntityDestroyed(_))
        ));
        assert!(matches!(world.step(parent, 0.1), Err(EcsError::EntityDestroyed(_))));
    }

    #[test]
    fn test_add_child_rejects_cycles() {
        let mut world = World::new();
        let a = world.spawn();
        let b = world.spawn();
        world.add_child(a, b).unwrap();

        assert!(matches!(world.add_child(b, a), Err(EcsError::HierarchyCycle { .. })));
        assert!(matches!(world.add_child(a, a), Err(EcsError::HierarchyCycle { .. })));

        let a_node = world.node(a).unwrap();
        let b_node = world.node(b).unwrap();
        assert_eq!(world.stage().get(b_node).unwrap().parent(), Some(a_node));

        world.remove_child(a, b).unwrap();
        assert!(world.children(a).is_empty());
        assert_eq!(world.stage().get(b_node).unwrap().parent(), None);
        assert!(matches!(world.remove_child(a, b), Err(EcsError::NotAChild { .. })));
    }

    #[test]
    fn test_unsubscribe_unknown_token() {
        let mut world = World::new();
        let e = world.spawn();
        let id = world.on_add_component(e, |_| {}).unwrap();
        world.off_add_component(e, id).unwrap();

        assert!(matches!(
            world.off_add_component(e, id),
            Err(EcsError::SubscriptionNotFound(_))
        ));
    }

    #[test]
    fn test_reap_destroyed() {
        let mut world = World::new();
        let a = world.spawn();
        world.spawn();
        world.destroy(a).unwrap();

        assert_eq!(world.len(), 1);
        assert_eq!(world.reap_destroyed(), 1);
        assert!(world.is_queued_for_destruction(a));
        assert!(matches!(world.destroy(a), Err(EcsError::EntityNotFound(_))));
    }

    /// Attaches `Tail` when it sees `Other` arrive
    struct Chain(Log);
    struct ChainSystem;

    impl System<Chain> for ChainSystem {}

    impl Component for Chain {
        const ID: ComponentId = ComponentId::new("Chain");
        type System = ChainSystem;

        fn on_component_attached(
            &mut self,
            id: ComponentId,
            _sibling: ComponentKey,
            ctx: &mut ComponentContext<'_>,
        ) {
            self.0.borrow_mut().push(format!("chain:saw:{id}"));
            if id == Other::ID {
                let entity = ctx.entity();
                ctx.world_mut().add_component(entity, Tail).unwrap();
            }
        }
    }

    struct Tail;
    struct TailSystem;

    impl System<Tail> for TailSystem {}

    impl Component for Tail {
        const ID: ComponentId = ComponentId::new("Tail");
        type System = TailSystem;
    }

    #[test]
    fn test_attach_from_sibling_hook_reaches_that_sibling() {
        let log = Log::default();
        let mut world = World::new();
        let e = world.spawn();
        world.add_component(e, Chain(Rc::clone(&log))).unwrap();

        world.add_component(e, Other(recorder("b", &log))).unwrap();

        assert_eq!(world.component_ids(e), vec![Chain::ID, Other::ID, Tail::ID]);
        assert_eq!(take(&log), ["chain:saw:Other", "chain:saw:Tail"]);
    }

    #[test]
    fn test_queries_accept_runtime_tags() {
        let log = Log::default();
        let mut world = World::new();
        let e = world.spawn();
        world.add_component(e, recorder("a", &log)).unwrap();
        take(&log);

        let saved = String::from("Recorder");
        assert!(world.has_component(e, saved.as_str()));
        assert!(!world.has_component(e, String::from("Other").as_str()));

        world.set_component_enabled(e, &saved, false).unwrap();
        assert_eq!(take(&log), ["a:disable"]);

        world.remove_component(e, saved.as_str()).unwrap();
        assert!(!world.has_component(e, Recorder::ID));

        let err = world.remove_component(e, saved.as_str()).unwrap_err();
        assert!(matches!(err, EcsError::ComponentNotFound { ref query, .. } if query == "tag 'Recorder'"));
    }
}
