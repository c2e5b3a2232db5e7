//! Strong and weak entity handles.
//!
//! The owner of an entity (an entity cache, a data context) holds it through
//! a strong handle. Indexes only ever keep the matching weak handle and
//! upgrade it on every access; liveness is never cached.

use super::EntityId;
use std::rc::{self, Rc};
use std::sync::{self, Arc};

/// A value that can be registered in an index.
pub trait Entity {
    /// Returns the entity's primary key.
    fn entity_id(&self) -> EntityId;
}

/// A strong, cloneable handle to an entity with a weak counterpart.
///
/// Implemented for [`Rc`] (single-threaded owners) and [`Arc`].
pub trait EntityRef: Clone {
    /// The entity type behind the handle.
    type Entity: Entity;

    /// Non-owning counterpart of the handle.
    type Weak: Clone;

    /// Borrows the entity.
    fn entity(&self) -> &Self::Entity;

    /// Creates a weak handle to the same entity.
    fn downgrade(&self) -> Self::Weak;

    /// Recovers a strong handle if the entity is still owned somewhere.
    fn upgrade(weak: &Self::Weak) -> Option<Self>;
}

impl<E: Entity> EntityRef for Rc<E> {
    type Entity = E;
    type Weak = rc::Weak<E>;

    fn entity(&self) -> &E {
        self
    }

    fn downgrade(&self) -> rc::Weak<E> {
        Rc::downgrade(self)
    }

    fn upgrade(weak: &rc::Weak<E>) -> Option<Self> {
        weak.upgrade()
    }
}

impl<E: Entity> EntityRef for Arc<E> {
    type Entity = E;
    type Weak = sync::Weak<E>;

    fn entity(&self) -> &E {
        self
    }

    fn downgrade(&self) -> sync::Weak<E> {
        Arc::downgrade(self)
    }

    fn upgrade(weak: &sync::Weak<E>) -> Option<Self> {
        weak.upgrade()
    }
}
