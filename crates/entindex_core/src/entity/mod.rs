//! Entity identity and weak handles.

mod handle;
mod id;

pub use handle::{Entity, EntityRef};
pub use id::EntityId;
