//! Composite weak indexes.
//!
//! An index is a tree with one level per key field. Branch levels map one
//! field's value to the subtree below it; the last level is a
//! [`WeakEntrySet`] mapping the final field's value to weak slots.
//!
//! ```text
//! (AccountId, EffectiveDate)
//!
//!   Branch
//!   ├── 1 ─ Leaf { 2020-01-01 → [e1], 2020-06-01 → [e2] }
//!   └── 2 ─ Leaf { 2020-01-01 → [e3] }
//! ```
//!
//! Dead slots are dropped while a query walks over them, and a parent
//! erases any child left empty by the walk.

mod accessor;
mod definition;
mod engine;
mod entry_set;
mod key;
mod node;
mod slot;
mod spec;

#[cfg(test)]
pub(crate) mod testing;

pub use accessor::{accessors, Accessor, AccessorKind, QueryOutput};
pub use definition::{FieldDefinition, IndexDefinition};
pub use engine::IndexEngine;
pub use entry_set::WeakEntrySet;
pub use key::{KeyKind, KeyValue};
pub use node::CompositeIndexNode;
pub use slot::WeakSlot;
pub use spec::{FieldDescriptor, IndexSpec, KeyExtractor};
