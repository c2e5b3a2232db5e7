//! Test fixtures and engine helpers.
//!
//! Provides two sample entity classes, their index specifications, and an
//! [`OwnerCache`] that plays the part of the data context which strongly
//! owns loaded entities.

use entindex_core::{
    Entity, EntityId, FieldDescriptor, IndexEngine, IndexId, IndexSpec, KeyExtractor, KeyKind,
    KeyValue, Timestamp,
};
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

/// Returns midnight UTC of a calendar date.
///
/// # Panics
///
/// Panics if the date does not exist.
pub fn date(year: i32, month: u32, day: u32) -> Timestamp {
    let midnight = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid calendar date");
    Timestamp::from_millis(midnight.and_utc().timestamp_millis())
}

/// Returns midnight UTC `days` days after the epoch.
pub fn day(days: i64) -> Timestamp {
    Timestamp::from_millis(Duration::days(days).num_milliseconds())
}

/// A dated balance snapshot of an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    /// Primary key.
    pub id: EntityId,
    /// Owning account.
    pub account_id: i64,
    /// Date the snapshot takes effect.
    pub effective_date: Timestamp,
    /// Balance in minor units.
    pub balance: i64,
}

impl AccountSnapshot {
    /// Creates a snapshot with a fresh random id.
    pub fn new(account_id: i64, effective_date: Timestamp) -> Self {
        Self::with_id(EntityId::new(), account_id, effective_date)
    }

    /// Creates a snapshot with a fixed id.
    pub fn with_id(id: EntityId, account_id: i64, effective_date: Timestamp) -> Self {
        Self {
            id,
            account_id,
            effective_date,
            balance: 0,
        }
    }
}

impl Entity for AccountSnapshot {
    fn entity_id(&self) -> EntityId {
        self.id
    }
}

/// `ix_snapshot_account_date`: `(AccountId, EffectiveDate)`, non-unique,
/// with `EffectiveDate` range-capable and time-series.
pub fn snapshot_spec() -> IndexSpec<AccountSnapshot> {
    IndexSpec::new("ix_snapshot_account_date")
        .field(FieldDescriptor::new(
            "AccountId",
            KeyKind::Integer,
            |s: &AccountSnapshot| s.account_id.into(),
        ))
        .field(
            FieldDescriptor::new("EffectiveDate", KeyKind::Timestamp, |s: &AccountSnapshot| {
                s.effective_date.into()
            })
            .range()
            .time_series(),
        )
}

/// The snapshot index as a JSON definition list.
pub const SNAPSHOT_DEFINITIONS: &str = r#"[
  {
    "name": "ix_snapshot_account_date",
    "fields": [
      { "name": "AccountId", "kind": "integer" },
      { "name": "EffectiveDate", "kind": "timestamp", "range": true, "time_series": true }
    ]
  },
  {
    "name": "ix_snapshot_balance",
    "fields": [ { "name": "Balance", "kind": "integer", "range": true } ]
  }
]"#;

/// Resolves [`AccountSnapshot`] field names to extractors.
pub fn resolve_snapshot_field(name: &str) -> Option<KeyExtractor<AccountSnapshot>> {
    let extractor: KeyExtractor<AccountSnapshot> = match name {
        "AccountId" => Arc::new(|s: &AccountSnapshot| KeyValue::from(s.account_id)),
        "EffectiveDate" => Arc::new(|s: &AccountSnapshot| KeyValue::from(s.effective_date)),
        "Balance" => Arc::new(|s: &AccountSnapshot| KeyValue::from(s.balance)),
        _ => return None,
    };
    Some(extractor)
}

/// An engine with [`snapshot_spec`] registered.
pub fn snapshot_engine() -> (IndexEngine<Rc<AccountSnapshot>>, IndexId) {
    let mut engine = IndexEngine::default();
    let id = engine
        .define_index(snapshot_spec())
        .expect("snapshot spec is valid");
    (engine, id)
}

/// A customer with a unique email and an optional region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    /// Primary key.
    pub id: EntityId,
    /// Unique email address.
    pub email: String,
    /// Sales region, if assigned.
    pub region: Option<String>,
}

impl Customer {
    /// Creates a customer without a region.
    pub fn new(email: &str) -> Self {
        Self {
            id: EntityId::new(),
            email: email.to_owned(),
            region: None,
        }
    }

    /// Assigns a region.
    #[must_use]
    pub fn in_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_owned());
        self
    }
}

impl Entity for Customer {
    fn entity_id(&self) -> EntityId {
        self.id
    }
}

/// `ix_customer_email`: unique, range-capable `Email`.
pub fn customer_email_spec() -> IndexSpec<Customer> {
    IndexSpec::new("ix_customer_email")
        .unique()
        .field(
            FieldDescriptor::new("Email", KeyKind::Text, |c: &Customer| c.email.as_str().into())
                .range(),
        )
}

/// `ix_customer_region_email`: `(Region?, Email)`, non-unique.
pub fn customer_region_spec() -> IndexSpec<Customer> {
    IndexSpec::new("ix_customer_region_email")
        .field(
            FieldDescriptor::new("Region", KeyKind::Text, |c: &Customer| {
                c.region.clone().into()
            })
            .nullable(),
        )
        .field(FieldDescriptor::new("Email", KeyKind::Text, |c: &Customer| {
            c.email.as_str().into()
        }))
}

/// An engine with both customer indexes registered, in that order.
pub fn customer_engine() -> (IndexEngine<Rc<Customer>>, IndexId, IndexId) {
    let mut engine = IndexEngine::default();
    let by_email = engine
        .define_index(customer_email_spec())
        .expect("email spec is valid");
    let by_region = engine
        .define_index(customer_region_spec())
        .expect("region spec is valid");
    (engine, by_email, by_region)
}

/// Strong owner of loaded entities, keyed by primary key.
///
/// Holding an entity keeps its index entries alive; releasing it is the
/// only way an entity leaves the indexes.
#[derive(Debug)]
pub struct OwnerCache<E> {
    owned: HashMap<EntityId, Rc<E>>,
}

impl<E> Default for OwnerCache<E> {
    fn default() -> Self {
        Self {
            owned: HashMap::new(),
        }
    }
}

impl<E: Entity> OwnerCache<E> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of `entity`, replacing any previous incarnation
    /// with the same id, and returns a handle for registration.
    pub fn hold(&mut self, entity: E) -> Rc<E> {
        let handle = Rc::new(entity);
        self.owned.insert(handle.entity_id(), Rc::clone(&handle));
        handle
    }

    /// Drops the cache's strong handle. Returns false if it held none.
    pub fn release(&mut self, id: &EntityId) -> bool {
        self.owned.remove(id).is_some()
    }

    /// Returns the owned entity with `id`.
    pub fn get(&self, id: &EntityId) -> Option<&Rc<E>> {
        self.owned.get(id)
    }

    /// Iterates over every owned entity in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<E>> {
        self.owned.values()
    }

    /// Number of owned entities.
    pub fn len(&self) -> usize {
        self.owned.len()
    }

    /// Returns true if nothing is owned.
    pub fn is_empty(&self) -> bool {
        self.owned.is_empty()
    }
}
