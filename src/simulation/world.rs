//! Entity-component world
//!
//! Typed, sparse, reusable storage for per-agent data. Each component
//! kind gets a dense pool indexed by entity id, grown lazily; a per-entity
//! bitmask records membership and is the single source of truth for it.
//! Entity ids are recycled most-recently-freed first.

use anyhow::{bail, Context, Result};
use std::any::Any;

use super::components::{Component, ComponentKind, ComponentMask, MAX_COMPONENT_KINDS};
use super::types::EntityId;

/// Type-erased view of a component pool, enough for entity teardown.
trait ErasedPool {
    fn clear_slot(&mut self, id: EntityId);
    fn reserve(&mut self, additional: usize);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Dense pool for one component kind, indexed by entity id.
struct Pool<T: Component> {
    slots: Vec<Option<T>>,
}

impl<T: Component> Pool<T> {
    fn new() -> Self {
        Self { slots: Vec::new() }
    }

    fn insert(&mut self, id: EntityId, component: T) -> &mut T {
        let index = id.0 as usize;
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index].insert(component)
    }

    fn get(&self, id: EntityId) -> Option<&T> {
        self.slots.get(id.0 as usize).and_then(|slot| slot.as_ref())
    }

    fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.slots
            .get_mut(id.0 as usize)
            .and_then(|slot| slot.as_mut())
    }
}

impl<T: Component> ErasedPool for Pool<T> {
    fn clear_slot(&mut self, id: EntityId) {
        if let Some(slot) = self.slots.get_mut(id.0 as usize) {
            *slot = None;
        }
    }

    fn reserve(&mut self, additional: usize) {
        self.slots.reserve(additional);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// The entity-component world owning all component storage.
pub struct World {
    /// Component membership per allocated entity id.
    masks: Vec<ComponentMask>,
    /// Whether the id is allocated and not destroyed.
    live: Vec<bool>,
    /// Destroyed ids available for reuse, most recent last.
    free_ids: Vec<EntityId>,
    /// One pool slot per component kind, created on first use.
    pools: Vec<Option<Box<dyn ErasedPool>>>,
    /// Number of live entities.
    entity_count: usize,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        let mut pools = Vec::with_capacity(MAX_COMPONENT_KINDS);
        pools.resize_with(MAX_COMPONENT_KINDS, || None);
        Self {
            masks: Vec::new(),
            live: Vec::new(),
            free_ids: Vec::new(),
            pools,
            entity_count: 0,
        }
    }

    /// Allocate a fresh entity id, reusing the most recently freed one
    /// when available. The new entity carries no components.
    pub fn create_entity(&mut self) -> EntityId {
        let id = match self.free_ids.pop() {
            Some(id) => {
                self.live[id.0 as usize] = true;
                id
            }
            None => {
                let id = EntityId(self.masks.len() as u32);
                self.masks.push(ComponentMask::EMPTY);
                self.live.push(true);
                id
            }
        };
        self.entity_count += 1;
        id
    }

    /// Destroy an entity, removing every attached component and returning
    /// the id to the free pool. No-op if the entity is not alive.
    pub fn destroy_entity(&mut self, id: EntityId) {
        if !self.is_live(id) {
            return;
        }
        let index = id.0 as usize;
        for pool in self.pools.iter_mut().flatten() {
            pool.clear_slot(id);
        }
        self.masks[index] = ComponentMask::EMPTY;
        self.live[index] = false;
        self.free_ids.push(id);
        self.entity_count -= 1;
    }

    /// Whether the id refers to an allocated, not-yet-destroyed entity.
    pub fn is_live(&self, id: EntityId) -> bool {
        self.live.get(id.0 as usize).copied().unwrap_or(false)
    }

    /// An entity exists once it is live and holds at least one component.
    pub fn entity_exists(&self, id: EntityId) -> bool {
        self.is_live(id) && !self.masks[id.0 as usize].is_empty()
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.entity_count
    }

    /// Attach a component, overwriting any previous one of the same kind.
    /// Fails when the entity id is unknown or destroyed; that indicates a
    /// programming error in the calling layer and is never absorbed.
    pub fn add_component<T: Component>(&mut self, id: EntityId, component: T) -> Result<&mut T> {
        if !self.is_live(id) {
            bail!("unknown entity {:?}", id);
        }
        self.masks[id.0 as usize] = self.masks[id.0 as usize].with(T::KIND);
        let pool = self.pool_mut::<T>();
        Ok(pool.insert(id, component))
    }

    /// Read a component. Fails when the entity does not hold one.
    pub fn get_component<T: Component>(&self, id: EntityId) -> Result<&T> {
        if !self.has_component::<T>(id) {
            bail!("entity {:?} has no {} component", id, T::NAME);
        }
        self.pool::<T>()
            .and_then(|pool| pool.get(id))
            .with_context(|| format!("{} pool slot missing for {:?}", T::NAME, id))
    }

    /// Mutable access to a component. Fails when the entity does not hold one.
    pub fn get_component_mut<T: Component>(&mut self, id: EntityId) -> Result<&mut T> {
        if !self.has_component::<T>(id) {
            bail!("entity {:?} has no {} component", id, T::NAME);
        }
        self.pool_mut::<T>()
            .get_mut(id)
            .with_context(|| format!("{} pool slot missing for {:?}", T::NAME, id))
    }

    /// Detach a component, clearing the pool slot and the membership bit.
    /// Silent no-op when the entity or component is missing.
    pub fn remove_component<T: Component>(&mut self, id: EntityId) {
        if !self.is_live(id) {
            return;
        }
        let index = id.0 as usize;
        self.masks[index] = self.masks[index].without(T::KIND);
        if let Some(pool) = self.pools[T::KIND.index()].as_mut() {
            pool.clear_slot(id);
        }
    }

    pub fn has_component<T: Component>(&self, id: EntityId) -> bool {
        self.has_kind(id, T::KIND)
    }

    pub fn has_kind(&self, id: EntityId, kind: ComponentKind) -> bool {
        self.is_live(id) && self.masks[id.0 as usize].contains(kind)
    }

    /// All live entities whose membership mask is a superset of `required`,
    /// in ascending id order.
    pub fn entities_with(&self, required: ComponentMask) -> Vec<EntityId> {
        let mut result = Vec::new();
        for (index, mask) in self.masks.iter().enumerate() {
            if self.live[index] && mask.contains_all(required) && !mask.is_empty() {
                result.push(EntityId(index as u32));
            }
        }
        result
    }

    /// Number of live entities whose mask is a superset of `required`,
    /// without materializing the id list.
    pub fn count_with(&self, required: ComponentMask) -> usize {
        self.masks
            .iter()
            .enumerate()
            .filter(|(index, mask)| {
                self.live[*index] && mask.contains_all(required) && !mask.is_empty()
            })
            .count()
    }

    /// All live entity ids, in ascending order.
    pub fn live_entities(&self) -> Vec<EntityId> {
        (0..self.live.len())
            .filter(|&index| self.live[index])
            .map(|index| EntityId(index as u32))
            .collect()
    }

    /// Capacity hint for an expected number of additional entities.
    /// Amortizes allocations only; observable behavior is unchanged.
    pub fn reserve(&mut self, additional: usize) {
        self.masks.reserve(additional);
        self.live.reserve(additional);
        for pool in self.pools.iter_mut().flatten() {
            pool.reserve(additional);
        }
    }

    /// Destroy every live entity. Pools and kind registrations survive.
    pub fn clear_entities(&mut self) {
        for id in self.live_entities() {
            self.destroy_entity(id);
        }
    }

    fn pool<T: Component>(&self) -> Option<&Pool<T>> {
        self.pools[T::KIND.index()]
            .as_ref()
            .and_then(|pool| pool.as_any().downcast_ref::<Pool<T>>())
    }

    fn pool_mut<T: Component>(&mut self) -> &mut Pool<T> {
        let slot = &mut self.pools[T::KIND.index()];
        if slot.is_none() {
            *slot = Some(Box::new(Pool::<T>::new()));
        }
        slot.as_mut()
            .and_then(|pool| pool.as_any_mut().downcast_mut::<Pool<T>>())
            .expect("pool slot holds the pool for its own kind")
    }
}
