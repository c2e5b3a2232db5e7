//! Property-based test generators using proptest.
//!
//! Operations are drawn from small id, account and day pools so that
//! generated sequences collide on keys, repoint slots and release
//! entities often enough to exercise pruning.

use entindex_core::{EntityId, KeyValue, Timestamp};
use proptest::prelude::*;

use crate::fixtures::day;

/// Strategy for generating an entity ID out of a pool of `pool` ids.
pub fn pooled_id_strategy(pool: u8) -> impl Strategy<Value = EntityId> {
    (0..pool).prop_map(|n| EntityId::from_u128(u128::from(n) + 1))
}

/// Strategy for generating a day in the first `days` days after the epoch.
pub fn day_strategy(days: i64) -> impl Strategy<Value = Timestamp> {
    (0..days).prop_map(day)
}

/// Strategy for generating non-null key values of mixed kinds.
pub fn key_value_strategy() -> impl Strategy<Value = KeyValue> {
    prop_oneof![
        any::<bool>().prop_map(KeyValue::Bool),
        any::<i64>().prop_map(KeyValue::Integer),
        any::<i64>().prop_map(|ms| KeyValue::Timestamp(Timestamp::from_millis(ms))),
        any::<u128>().prop_map(|n| KeyValue::Guid(EntityId::from_u128(n).into())),
        "[a-z]{0,8}".prop_map(KeyValue::Text),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(KeyValue::Bytes),
    ]
}

/// One step of a generated index workload over account snapshots.
#[derive(Debug, Clone)]
pub enum IndexOperation {
    /// Load an entity, replacing any previous incarnation with the same id.
    Load {
        /// Entity ID
        id: EntityId,
        /// Account the snapshot belongs to
        account: i64,
        /// Effective date
        date: Timestamp,
    },
    /// Release the owner's strong handle.
    Release {
        /// Entity ID
        id: EntityId,
    },
    /// Query every snapshot of an account.
    Query {
        /// Account to query
        account: i64,
    },
    /// Run a full sweep.
    Prune,
}

/// Strategy for generating index operations.
pub fn index_operation_strategy() -> impl Strategy<Value = IndexOperation> {
    prop_oneof![
        4 => (pooled_id_strategy(16), 0..4i64, day_strategy(12))
            .prop_map(|(id, account, date)| IndexOperation::Load { id, account, date }),
        2 => pooled_id_strategy(16).prop_map(|id| IndexOperation::Release { id }),
        2 => (0..4i64).prop_map(|account| IndexOperation::Query { account }),
        1 => Just(IndexOperation::Prune),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<IndexOperation>> {
    prop::collection::vec(index_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn pooled_ids_stay_in_pool(id in pooled_id_strategy(4)) {
            let n = id.as_uuid().as_u128();
            prop_assert!((1..=4).contains(&n));
        }

        #[test]
        fn generated_keys_are_never_null(key in key_value_strategy()) {
            prop_assert!(!key.is_null());
            prop_assert!(key > KeyValue::Null);
        }

        #[test]
        fn sequences_respect_bounds(ops in operation_sequence_strategy(5, 10)) {
            prop_assert!(ops.len() >= 5);
            prop_assert!(ops.len() < 10);
        }
    }
}
