//! Leaf storage: ordered terminal keys to weak entity slots.

use super::key::KeyValue;
use super::slot::WeakSlot;
use crate::entity::{Entity, EntityId, EntityRef};
use crate::stats::SweepStats;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;
use tracing::debug;

/// A borrowed key range.
pub(crate) type KeyBounds<'a> = (Bound<&'a KeyValue>, Bound<&'a KeyValue>);

/// Returns true if `bounds` cannot contain any key.
///
/// `BTreeMap::range` panics on inverted ranges, so every range scan checks
/// this first.
pub(crate) fn is_degenerate(bounds: &KeyBounds<'_>) -> bool {
    match (bounds.0, bounds.1) {
        (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
        (Bound::Included(lo), Bound::Excluded(hi))
        | (Bound::Excluded(lo), Bound::Included(hi))
        | (Bound::Excluded(lo), Bound::Excluded(hi)) => lo >= hi,
        _ => false,
    }
}

/// Result of adding an entity to a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AddOutcome {
    /// A new slot was created.
    Inserted,
    /// An existing slot now points at the entity.
    Repointed,
}

/// Everything stored under one terminal key.
enum LeafEntry<R: EntityRef> {
    /// Unique index: at most one entity per key.
    Single(WeakSlot<R>),
    /// Non-unique index: slots in insertion order, at most one per entity id.
    Multi(Vec<WeakSlot<R>>),
}

impl<R: EntityRef> LeafEntry<R> {
    /// Pushes every live referent onto `out` and drops dead slots.
    ///
    /// Returns false once nothing under this key is alive.
    fn collect(&mut self, out: &mut Vec<R>, sweep: &mut SweepStats) -> bool {
        match self {
            LeafEntry::Single(slot) => match slot.get() {
                Some(entity) => {
                    out.push(entity);
                    true
                }
                None => {
                    sweep.dead_slots += 1;
                    false
                }
            },
            LeafEntry::Multi(slots) => {
                let before = slots.len();
                slots.retain(|slot| match slot.get() {
                    Some(entity) => {
                        out.push(entity);
                        true
                    }
                    None => false,
                });
                sweep.dead_slots += before - slots.len();
                !slots.is_empty()
            }
        }
    }

    /// Drops dead slots without producing referents.
    fn prune(&mut self, sweep: &mut SweepStats) -> bool {
        match self {
            LeafEntry::Single(slot) => {
                let alive = slot.is_alive();
                if !alive {
                    sweep.dead_slots += 1;
                }
                alive
            }
            LeafEntry::Multi(slots) => {
                let before = slots.len();
                slots.retain(WeakSlot::is_alive);
                sweep.dead_slots += before - slots.len();
                !slots.is_empty()
            }
        }
    }

    fn slot_count(&self) -> usize {
        match self {
            LeafEntry::Single(_) => 1,
            LeafEntry::Multi(slots) => slots.len(),
        }
    }
}

/// Ordered map from a terminal key to weakly referenced entities.
///
/// In a unique set each key holds one [`WeakSlot`] and adding under an
/// existing key repoints it. In a non-unique set each key holds a multiset
/// in insertion order; adding an entity whose id is already present at that
/// key repoints the existing slot, anything else is appended.
///
/// Every read drops the dead slots it passes over and erases keys left with
/// nothing alive. Keys are collected first and erased after the scan.
pub struct WeakEntrySet<R: EntityRef> {
    unique: bool,
    entries: BTreeMap<KeyValue, LeafEntry<R>>,
}

impl<R: EntityRef> WeakEntrySet<R> {
    /// Creates an empty set.
    pub fn new(unique: bool) -> Self {
        Self {
            unique,
            entries: BTreeMap::new(),
        }
    }

    /// Returns true if no key is present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of keys, dead or alive.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the number of slots, dead or alive.
    pub fn slot_count(&self) -> usize {
        self.entries.values().map(LeafEntry::slot_count).sum()
    }

    pub(crate) fn add(&mut self, key: KeyValue, entity: &R) -> AddOutcome {
        let id = entity.entity().entity_id();
        if let Some(entry) = self.entries.get_mut(&key) {
            match entry {
                LeafEntry::Single(slot) => {
                    if slot.entity_id() != id && slot.is_alive() {
                        debug!(
                            key = %key,
                            previous = %slot.entity_id(),
                            entity = %id,
                            "unique key repointed to a different live entity"
                        );
                    }
                    slot.repoint(entity);
                    AddOutcome::Repointed
                }
                LeafEntry::Multi(slots) => match find_slot(slots, id) {
                    Some(slot) => {
                        slot.repoint(entity);
                        AddOutcome::Repointed
                    }
                    None => {
                        slots.push(WeakSlot::new(entity));
                        AddOutcome::Inserted
                    }
                },
            }
        } else {
            let entry = if self.unique {
                LeafEntry::Single(WeakSlot::new(entity))
            } else {
                LeafEntry::Multi(vec![WeakSlot::new(entity)])
            };
            self.entries.insert(key, entry);
            AddOutcome::Inserted
        }
    }

    /// Returns the live entity under `key`, the first one for a multiset.
    pub fn try_get(&mut self, key: &KeyValue, sweep: &mut SweepStats) -> Option<R> {
        let mut found = Vec::new();
        self.get(key, &mut found, sweep);
        found.into_iter().next()
    }

    /// Pushes every live entity under `key`, in insertion order.
    pub fn get(&mut self, key: &KeyValue, out: &mut Vec<R>, sweep: &mut SweepStats) {
        if let Some(entry) = self.entries.get_mut(key) {
            if !entry.collect(out, sweep) {
                self.entries.remove(key);
                sweep.dead_keys += 1;
            }
        }
    }

    /// Pushes live entities with keys `>= key`.
    pub fn get_from(&mut self, key: &KeyValue, out: &mut Vec<R>, sweep: &mut SweepStats) {
        self.scan((Bound::Included(key), Bound::Unbounded), out, sweep);
    }

    /// Pushes live entities with keys `< key`.
    pub fn get_until(&mut self, key: &KeyValue, out: &mut Vec<R>, sweep: &mut SweepStats) {
        self.scan((Bound::Unbounded, Bound::Excluded(key)), out, sweep);
    }

    /// Pushes live entities with keys in `[lo, hi)`.
    pub fn get_over(
        &mut self,
        lo: &KeyValue,
        hi: &KeyValue,
        out: &mut Vec<R>,
        sweep: &mut SweepStats,
    ) {
        self.scan((Bound::Included(lo), Bound::Excluded(hi)), out, sweep);
    }

    /// Pushes every live entity in key order.
    pub fn get_all(&mut self, out: &mut Vec<R>, sweep: &mut SweepStats) {
        self.scan((Bound::Unbounded, Bound::Unbounded), out, sweep);
    }

    /// Returns the live entity with the greatest non-null key `<= key`.
    ///
    /// When several entities share that key the most recently added one
    /// wins.
    pub fn latest_at(&mut self, key: &KeyValue, sweep: &mut SweepStats) -> Option<R> {
        let floor = KeyValue::Null;
        let bounds: KeyBounds<'_> = (Bound::Excluded(&floor), Bound::Included(key));
        if is_degenerate(&bounds) {
            return None;
        }

        let mut dead = Vec::new();
        let mut found = None;
        for (candidate, entry) in self.entries.range_mut::<KeyValue, _>(bounds).rev() {
            let mut live = Vec::new();
            if entry.collect(&mut live, sweep) {
                found = live.pop();
                break;
            }
            dead.push(candidate.clone());
        }
        self.erase(dead, sweep);
        found
    }

    /// Drops every dead slot and empty key without producing results.
    pub fn sweep(&mut self, sweep: &mut SweepStats) {
        let dead: Vec<KeyValue> = self
            .entries
            .iter_mut()
            .filter_map(|(key, entry)| (!entry.prune(sweep)).then(|| key.clone()))
            .collect();
        self.erase(dead, sweep);
    }

    pub(crate) fn scan(&mut self, bounds: KeyBounds<'_>, out: &mut Vec<R>, sweep: &mut SweepStats) {
        if is_degenerate(&bounds) {
            return;
        }

        let mut dead = Vec::new();
        for (key, entry) in self.entries.range_mut::<KeyValue, _>(bounds) {
            if !entry.collect(out, sweep) {
                dead.push(key.clone());
            }
        }
        self.erase(dead, sweep);
    }

    fn erase(&mut self, dead: Vec<KeyValue>, sweep: &mut SweepStats) {
        for key in dead {
            if self.entries.remove(&key).is_some() {
                sweep.dead_keys += 1;
            }
        }
    }
}

fn find_slot<R: EntityRef>(slots: &mut [WeakSlot<R>], id: EntityId) -> Option<&mut WeakSlot<R>> {
    slots.iter_mut().find(|slot| slot.entity_id() == id)
}

impl<R: EntityRef> fmt::Debug for WeakEntrySet<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakEntrySet")
            .field("unique", &self.unique)
            .field("keys", &self.entries.len())
            .field("slots", &self.slot_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::testing::{ids, item, Item};
    use proptest::prelude::*;
    use std::rc::Rc;

    fn int(v: i64) -> KeyValue {
        KeyValue::Integer(v)
    }

    fn set_with(unique: bool, items: &[Rc<Item>]) -> WeakEntrySet<Rc<Item>> {
        let mut set = WeakEntrySet::new(unique);
        for i in items {
            set.add(int(i.rank), i);
        }
        set
    }

    #[test]
    fn unique_add_upserts() {
        let a = item(1, 0, 5);
        let b = item(2, 0, 5);
        let mut set = WeakEntrySet::new(true);

        assert_eq!(set.add(int(5), &a), AddOutcome::Inserted);
        assert_eq!(set.add(int(5), &b), AddOutcome::Repointed);

        let mut sweep = SweepStats::default();
        let found = set.try_get(&int(5), &mut sweep).unwrap();
        assert!(Rc::ptr_eq(&found, &b));
        assert_eq!(set.slot_count(), 1);
    }

    #[test]
    fn multiset_keeps_distinct_entities() {
        let a = item(1, 0, 5);
        let b = item(2, 0, 5);
        let mut set = WeakEntrySet::new(false);
        set.add(int(5), &a);
        set.add(int(5), &b);

        let mut out = Vec::new();
        set.get(&int(5), &mut out, &mut SweepStats::default());
        assert_eq!(ids(&out), vec![1, 2]);
    }

    #[test]
    fn multiset_repoints_same_entity_id() {
        let old = item(1, 0, 5);
        let other = item(2, 0, 5);
        let mut set = WeakEntrySet::new(false);
        set.add(int(5), &old);
        set.add(int(5), &other);

        let reloaded = item(1, 0, 5);
        assert_eq!(set.add(int(5), &reloaded), AddOutcome::Repointed);
        drop(old);

        let mut out = Vec::new();
        set.get(&int(5), &mut out, &mut SweepStats::default());
        assert_eq!(ids(&out), vec![1, 2]);
        assert!(Rc::ptr_eq(&out[0], &reloaded));
    }

    #[test]
    fn dead_key_is_erased_on_lookup() {
        let a = item(1, 0, 5);
        let mut set = set_with(true, &[a.clone()]);
        drop(a);

        let mut sweep = SweepStats::default();
        assert!(set.try_get(&int(5), &mut sweep).is_none());
        assert_eq!(sweep.dead_slots, 1);
        assert_eq!(sweep.dead_keys, 1);
        assert!(set.is_empty());
    }

    #[test]
    fn range_boundaries() {
        let items: Vec<_> = (1..=5).map(|r| item(r as u128, 0, r * 10)).collect();
        let mut set = set_with(false, &items);
        let mut sweep = SweepStats::default();

        let mut out = Vec::new();
        set.get_from(&int(30), &mut out, &mut sweep);
        assert_eq!(ids(&out), vec![3, 4, 5]);

        out.clear();
        set.get_until(&int(30), &mut out, &mut sweep);
        assert_eq!(ids(&out), vec![1, 2]);

        out.clear();
        set.get_over(&int(20), &int(40), &mut out, &mut sweep);
        assert_eq!(ids(&out), vec![2, 3]);

        out.clear();
        set.get_all(&mut out, &mut sweep);
        assert_eq!(ids(&out), vec![1, 2, 3, 4, 5]);
        assert!(sweep.is_empty());
    }

    #[test]
    fn inverted_over_is_empty() {
        let items = vec![item(1, 0, 10), item(2, 0, 20)];
        let mut set = set_with(false, &items);
        let mut out = Vec::new();
        set.get_over(&int(20), &int(10), &mut out, &mut SweepStats::default());
        assert!(out.is_empty());
        set.get_over(&int(10), &int(10), &mut out, &mut SweepStats::default());
        assert!(out.is_empty());
    }

    #[test]
    fn ties_follow_insertion_order() {
        let items = vec![item(3, 0, 7), item(1, 0, 7), item(2, 0, 1)];
        let mut set = set_with(false, &items);
        let mut out = Vec::new();
        set.get_all(&mut out, &mut SweepStats::default());
        assert_eq!(ids(&out), vec![2, 3, 1]);
    }

    #[test]
    fn scan_prunes_then_idempotent() {
        let mut items: Vec<_> = (1..=4).map(|r| item(r as u128, 0, r as i64)).collect();
        let mut set = set_with(false, &items);
        items.remove(1);
        items.remove(1);

        let mut sweep = SweepStats::default();
        let mut first = Vec::new();
        set.get_all(&mut first, &mut sweep);
        assert_eq!(ids(&first), vec![1, 4]);
        assert_eq!(sweep.dead_keys, 2);
        assert_eq!(set.len(), 2);

        let mut again = SweepStats::default();
        let mut second = Vec::new();
        set.get_all(&mut second, &mut again);
        assert_eq!(ids(&second), ids(&first));
        assert!(again.is_empty());
    }

    #[test]
    fn latest_at_picks_greatest_key_at_or_before() {
        let items = vec![item(1, 0, 10), item(2, 0, 20), item(3, 0, 30)];
        let mut set = set_with(false, &items);
        let mut sweep = SweepStats::default();

        let found = set.latest_at(&int(25), &mut sweep).unwrap();
        assert_eq!(found.id, EntityId::from_u128(2));
        let found = set.latest_at(&int(20), &mut sweep).unwrap();
        assert_eq!(found.id, EntityId::from_u128(2));
        assert!(set.latest_at(&int(9), &mut sweep).is_none());
    }

    #[test]
    fn latest_at_skips_and_erases_dead_keys() {
        let mut items = vec![item(1, 0, 10), item(2, 0, 20), item(3, 0, 30)];
        let mut set = set_with(false, &items);
        items.truncate(1);

        let mut sweep = SweepStats::default();
        let found = set.latest_at(&int(35), &mut sweep).unwrap();
        assert_eq!(found.id, EntityId::from_u128(1));
        assert_eq!(sweep.dead_keys, 2);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn latest_at_tie_prefers_last_added() {
        let items = vec![item(1, 0, 10), item(2, 0, 10)];
        let mut set = set_with(false, &items);
        let found = set.latest_at(&int(10), &mut SweepStats::default()).unwrap();
        assert_eq!(found.id, EntityId::from_u128(2));
    }

    #[test]
    fn null_keys_sort_first_and_are_not_time_points() {
        let a = item(1, 0, 0);
        let b = item(2, 0, 0);
        let mut set = WeakEntrySet::new(false);
        set.add(int(5), &a);
        set.add(KeyValue::Null, &b);

        let mut out = Vec::new();
        set.get_all(&mut out, &mut SweepStats::default());
        assert_eq!(ids(&out), vec![2, 1]);
        assert!(set.latest_at(&int(1), &mut SweepStats::default()).is_none());
    }

    #[test]
    fn sweep_without_results() {
        let mut items = vec![item(1, 0, 1), item(2, 0, 1), item(3, 0, 2)];
        let mut set = set_with(false, &items);
        items.remove(0);
        items.remove(1);

        let mut sweep = SweepStats::default();
        set.sweep(&mut sweep);
        assert_eq!(sweep.dead_slots, 2);
        assert_eq!(sweep.dead_keys, 1);
        assert_eq!(set.len(), 1);
        assert_eq!(set.slot_count(), 1);
    }

    fn ranks(out: &[Rc<Item>]) -> Vec<i64> {
        out.iter().map(|i| i.rank).collect()
    }

    proptest! {
        #[test]
        fn bounded_scans_match_filtered_keys(
            keys in prop::collection::vec(0..40i64, 0..32),
            lo in 0..42i64,
            hi in 0..42i64,
        ) {
            let items: Vec<_> = keys
                .iter()
                .enumerate()
                .map(|(n, rank)| item(n as u128 + 1, 0, *rank))
                .collect();
            let mut set = set_with(false, &items);
            let mut sorted = keys.clone();
            sorted.sort_unstable();
            let mut sweep = SweepStats::default();

            let mut out = Vec::new();
            set.get_from(&int(lo), &mut out, &mut sweep);
            let want: Vec<_> = sorted.iter().copied().filter(|k| *k >= lo).collect();
            prop_assert_eq!(ranks(&out), want);

            out.clear();
            set.get_until(&int(hi), &mut out, &mut sweep);
            let want: Vec<_> = sorted.iter().copied().filter(|k| *k < hi).collect();
            prop_assert_eq!(ranks(&out), want);

            out.clear();
            set.get_over(&int(lo), &int(hi), &mut out, &mut sweep);
            let want: Vec<_> = sorted.iter().copied().filter(|k| lo <= *k && *k < hi).collect();
            prop_assert_eq!(ranks(&out), want);
            prop_assert!(sweep.is_empty());
        }

        #[test]
        fn released_entities_never_come_back(
            keys in prop::collection::vec(0..8i64, 1..24),
            released in prop::collection::vec(any::<bool>(), 24),
        ) {
            let mut items: Vec<_> = keys
                .iter()
                .enumerate()
                .map(|(n, rank)| item(n as u128 + 1, 0, *rank))
                .collect();
            let mut set = set_with(false, &items);
            let mut flags = released.iter();
            items.retain(|_| !flags.next().copied().unwrap_or(false));

            let mut out = Vec::new();
            set.get_all(&mut out, &mut SweepStats::default());
            let mut got = ids(&out);
            got.sort_unstable();
            let mut want = ids(&items);
            want.sort_unstable();
            prop_assert_eq!(got, want);
            prop_assert_eq!(set.slot_count(), items.len());
        }
    }
}
