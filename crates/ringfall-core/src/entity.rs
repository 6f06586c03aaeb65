//! Entity records and the registry that owns them.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use rapier3d::prelude::RigidBodyHandle;
use serde::{Deserialize, Serialize};

use crate::collab::SceneNode;

/// Unique identifier for an entity within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Closed set of entity variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    #[default]
    Normal,
    /// The rarer, higher-value variant (the golden ball).
    Special,
}

/// Position and orientation (quaternion `[x, y, z, w]`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: [f32; 3],
    pub rotation: [f32; 4],
}

impl Transform {
    pub const fn from_position(position: [f32; 3]) -> Self {
        Self {
            position,
            rotation: [0.0, 0.0, 0.0, 1.0],
        }
    }

    /// Height above the reference plane (the Y coordinate).
    pub fn height(&self) -> f32 {
        self.position[1]
    }

    /// Distance to `center` measured in the horizontal XZ plane.
    pub fn planar_distance(&self, center: [f32; 3]) -> f32 {
        let dx = self.position[0] - center[0];
        let dz = self.position[2] - center[2];
        (dx * dx + dz * dz).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().chain(self.rotation.iter()).all(|v| v.is_finite())
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_position([0.0; 3])
    }
}

/// One spawned object: a scene node and a rigid body under one identity.
///
/// The two handles are owned exclusively by the entity and are released
/// together by the session when the entity leaves the registry.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub node: SceneNode,
    pub body: RigidBodyHandle,
    pub radius: f32,
    pub spawned_at: Duration,
    pub transform: Transform,
    has_scored: bool,
}

impl Entity {
    pub fn new(
        id: EntityId,
        kind: EntityKind,
        node: SceneNode,
        body: RigidBodyHandle,
        radius: f32,
        spawned_at: Duration,
        transform: Transform,
    ) -> Self {
        Self {
            id,
            kind,
            node,
            body,
            radius,
            spawned_at,
            transform,
            has_scored: false,
        }
    }

    pub fn has_scored(&self) -> bool {
        self.has_scored
    }

    /// Sets the scored flag. Returns `false` if it was already set.
    pub fn mark_scored(&mut self) -> bool {
        !std::mem::replace(&mut self.has_scored, true)
    }
}

/// Owns the live entities of a session.
///
/// Entities live in insertion-ordered slots. Removal leaves a tombstone, so it
/// is O(1) and never shifts another entity during a pass over the slots;
/// [`EntityRegistry::compact`] squeezes tombstones out once they make up
/// half of the slots.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    slots: Vec<Option<Entity>>,
    index: HashMap<EntityId, usize>,
    live: usize,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entity at the end of the iteration order.
    pub fn add(&mut self, entity: Entity) {
        if self.index.contains_key(&entity.id) {
            tracing::warn!(id = %entity.id, "duplicate entity id ignored");
            return;
        }
        self.index.insert(entity.id, self.slots.len());
        self.slots.push(Some(entity));
        self.live += 1;
    }

    /// Removes the entity in `slot`, if any.
    pub fn remove_at(&mut self, slot: usize) -> Option<Entity> {
        let entity = self.slots.get_mut(slot)?.take()?;
        self.index.remove(&entity.id);
        self.live -= 1;
        Some(entity)
    }

    /// Removes an entity by id. Unknown ids are a no-op.
    pub fn remove_by_id(&mut self, id: EntityId) -> Option<Entity> {
        let Some(&slot) = self.index.get(&id) else {
            tracing::debug!(%id, "remove_by_id on unknown entity");
            return None;
        };
        self.remove_at(slot)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        let slot = *self.index.get(&id)?;
        self.slots[slot].as_ref()
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let slot = *self.index.get(&id)?;
        self.slots[slot].as_mut()
    }

    /// Entity currently stored in `slot`.
    pub fn slot(&self, slot: usize) -> Option<&Entity> {
        self.slots.get(slot)?.as_ref()
    }

    pub fn slot_mut(&mut self, slot: usize) -> Option<&mut Entity> {
        self.slots.get_mut(slot)?.as_mut()
    }

    /// Number of slots, live or not. Valid bound for a slot-by-slot pass.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live entities in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.slots.iter_mut().flatten()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.iter().map(|e| e.id).collect()
    }

    /// Drops tombstones once they make up at least half of the slots.
    ///
    /// Must not be called while a slot-by-slot pass is in progress.
    pub fn compact(&mut self) {
        let dead = self.slots.len() - self.live;
        if dead == 0 || dead * 2 < self.slots.len() {
            return;
        }
        self.slots.retain(Option::is_some);
        self.index.clear();
        for (slot, entity) in self.slots.iter().flatten().enumerate() {
            self.index.insert(entity.id, slot);
        }
    }

    /// Removes every entity, in insertion order.
    pub fn drain(&mut self) -> Vec<Entity> {
        self.index.clear();
        self.live = 0;
        self.slots.drain(..).flatten().collect()
    }
}
