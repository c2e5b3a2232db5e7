//! Weak entity slots.

use crate::entity::{Entity, EntityId, EntityRef};
use std::fmt;

/// A single non-owning reference to an indexed entity.
///
/// A slot is alive while some owner still holds a strong handle to its
/// referent. Liveness is re-evaluated on every access.
pub struct WeakSlot<R: EntityRef> {
    weak: R::Weak,
    entity_id: EntityId,
}

impl<R: EntityRef> WeakSlot<R> {
    /// Creates a slot pointing at `entity`.
    pub fn new(entity: &R) -> Self {
        Self {
            weak: entity.downgrade(),
            entity_id: entity.entity().entity_id(),
        }
    }

    /// Returns the referent if it is still alive.
    pub fn get(&self) -> Option<R> {
        R::upgrade(&self.weak)
    }

    /// Returns true if the referent is still alive.
    pub fn is_alive(&self) -> bool {
        self.get().is_some()
    }

    /// Returns the id of the entity this slot was last pointed at.
    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    /// Points the slot at a different entity.
    pub fn repoint(&mut self, entity: &R) {
        self.weak = entity.downgrade();
        self.entity_id = entity.entity().entity_id();
    }
}

impl<R: EntityRef> Clone for WeakSlot<R> {
    fn clone(&self) -> Self {
        Self {
            weak: self.weak.clone(),
            entity_id: self.entity_id,
        }
    }
}

impl<R: EntityRef> fmt::Debug for WeakSlot<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakSlot")
            .field("entity_id", &self.entity_id)
            .field("alive", &self.is_alive())
            .finish()
    }
}
