//! Shared fixtures for the index unit tests.

use super::key::KeyKind;
use super::spec::{FieldDescriptor, IndexSpec};
use crate::entity::{Entity, EntityId};
use crate::types::Timestamp;
use std::rc::Rc;

#[derive(Debug)]
pub(crate) struct Item {
    pub id: EntityId,
    pub group: i64,
    pub rank: i64,
    pub at: Timestamp,
    pub label: Option<String>,
}

impl Item {
    pub fn new(id: u128, group: i64, rank: i64) -> Self {
        Self {
            id: EntityId::from_u128(id),
            group,
            rank,
            at: Timestamp::from_millis(rank),
            label: None,
        }
    }

    pub fn labeled(id: u128, group: i64, rank: i64, label: &str) -> Self {
        Self {
            label: Some(label.to_owned()),
            ..Self::new(id, group, rank)
        }
    }
}

impl Entity for Item {
    fn entity_id(&self) -> EntityId {
        self.id
    }
}

pub(crate) fn item(id: u128, group: i64, rank: i64) -> Rc<Item> {
    Rc::new(Item::new(id, group, rank))
}

pub(crate) fn ids(items: &[Rc<Item>]) -> Vec<u128> {
    items.iter().map(|i| i.id.as_uuid().as_u128()).collect()
}

/// `(Group, Rank)` with `Rank` range-capable and time-series.
pub(crate) fn item_spec(name: &str, unique: bool) -> IndexSpec<Item> {
    let spec = IndexSpec::new(name)
        .field(FieldDescriptor::new("Group", KeyKind::Integer, |i: &Item| {
            i.group.into()
        }))
        .field(
            FieldDescriptor::new("Rank", KeyKind::Integer, |i: &Item| i.rank.into())
                .range()
                .time_series(),
        );
    if unique {
        spec.unique()
    } else {
        spec
    }
}

/// Single-field `Rank` index.
pub(crate) fn rank_spec(name: &str, unique: bool) -> IndexSpec<Item> {
    let spec = IndexSpec::new(name).field(
        FieldDescriptor::new("Rank", KeyKind::Integer, |i: &Item| i.rank.into()).range(),
    );
    if unique {
        spec.unique()
    } else {
        spec
    }
}

/// `(Label?, Group)` with a nullable leading field.
pub(crate) fn label_spec(name: &str) -> IndexSpec<Item> {
    IndexSpec::new(name)
        .field(
            FieldDescriptor::new("Label", KeyKind::Text, |i: &Item| i.label.clone().into())
                .nullable(),
        )
        .field(FieldDescriptor::new("Group", KeyKind::Integer, |i: &Item| {
            i.group.into()
        }))
}
