//! # entindex core
//!
//! In-process secondary indexes over live entities.
//!
//! Entities are strongly owned elsewhere (an entity cache, a data context);
//! the indexes in this crate only hold weak back-references and reclaim
//! dead entries lazily while they are traversed.
//!
//! This crate provides:
//! - Composite, multi-field ordered indexes ([`CompositeIndexNode`])
//! - Weak leaf storage with lazy pruning ([`WeakEntrySet`], [`WeakSlot`])
//! - Per-class orchestration and query dispatch ([`IndexEngine`])
//! - The generated-accessor query surface as data ([`Accessor`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use entindex_core::{FieldDescriptor, IndexEngine, IndexSpec, KeyKind, KeyValue};
//! use std::rc::Rc;
//!
//! let spec = IndexSpec::new("ix_snapshot_account_date")
//!     .field(FieldDescriptor::new("AccountId", KeyKind::Integer, |s: &Snapshot| s.account.into()))
//!     .field(
//!         FieldDescriptor::new("EffectiveDate", KeyKind::Timestamp, |s: &Snapshot| s.date.into())
//!             .range()
//!             .time_series(),
//!     );
//!
//! let mut engine: IndexEngine<Rc<Snapshot>> = IndexEngine::default();
//! let by_account = engine.define_index(spec)?;
//!
//! engine.add(&snapshot)?;
//! let history = engine.get_by(by_account, &[KeyValue::Integer(1)])?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod entity;
mod error;
mod index;
mod stats;
mod types;

pub use config::IndexEngineConfig;
pub use entity::{Entity, EntityId, EntityRef};
pub use error::{CoreError, CoreResult};
pub use index::{
    accessors, Accessor, AccessorKind, CompositeIndexNode, FieldDefinition, FieldDescriptor,
    IndexDefinition, IndexEngine, IndexSpec, KeyExtractor, KeyKind, KeyValue, QueryOutput,
    WeakEntrySet, WeakSlot,
};
pub use stats::{IndexStats, SweepStats};
pub use types::{IndexId, Timestamp};
