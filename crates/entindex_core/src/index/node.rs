//! Composite index tree.

use super::entry_set::{is_degenerate, AddOutcome, KeyBounds, WeakEntrySet};
use super::key::KeyValue;
use crate::entity::EntityRef;
use crate::stats::SweepStats;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;

/// One level of a composite index.
///
/// A tree for an index of `N` fields has `N - 1` branch levels, each keyed
/// by exactly one field's value, above a [`WeakEntrySet`] keyed by the last
/// field. Children are created on first add along a key path and erased
/// only when a traversal finds nothing alive beneath them.
pub enum CompositeIndexNode<R: EntityRef> {
    /// Exact-match level routing to the next field.
    Branch(BTreeMap<KeyValue, CompositeIndexNode<R>>),
    /// Terminal level.
    Leaf(WeakEntrySet<R>),
}

impl<R: EntityRef> CompositeIndexNode<R> {
    /// Creates an empty node for `levels` remaining key fields.
    pub fn new(levels: usize, unique: bool) -> Self {
        if levels <= 1 {
            CompositeIndexNode::Leaf(WeakEntrySet::new(unique))
        } else {
            CompositeIndexNode::Branch(BTreeMap::new())
        }
    }

    /// Returns true if nothing is stored beneath this node.
    pub fn is_empty(&self) -> bool {
        match self {
            CompositeIndexNode::Branch(children) => children.is_empty(),
            CompositeIndexNode::Leaf(set) => set.is_empty(),
        }
    }

    /// Returns the number of slots beneath this node, dead or alive.
    pub fn slot_count(&self) -> usize {
        match self {
            CompositeIndexNode::Branch(children) => {
                children.values().map(CompositeIndexNode::slot_count).sum()
            }
            CompositeIndexNode::Leaf(set) => set.slot_count(),
        }
    }

    /// Routes `entity` along `key` to its leaf, creating missing levels.
    ///
    /// `key` must hold one value per remaining level.
    pub(crate) fn add(&mut self, key: &[KeyValue], entity: &R, unique: bool) -> AddOutcome {
        match self {
            CompositeIndexNode::Leaf(set) => {
                debug_assert_eq!(key.len(), 1);
                set.add(key[0].clone(), entity)
            }
            CompositeIndexNode::Branch(children) => {
                debug_assert!(key.len() > 1);
                let (head, rest) = key.split_at(1);
                children
                    .entry(head[0].clone())
                    .or_insert_with(|| CompositeIndexNode::new(rest.len(), unique))
                    .add(rest, entity, unique)
            }
        }
    }

    /// Walks the exact-match `prefix` and applies `op` to the node reached.
    ///
    /// On the way back up, each level erases the child it descended into if
    /// `op` left that child empty. Returns `None` when the prefix matches no
    /// stored path.
    pub(crate) fn descend<T>(
        &mut self,
        prefix: &[KeyValue],
        sweep: &mut SweepStats,
        op: &mut dyn FnMut(&mut CompositeIndexNode<R>, &mut SweepStats) -> T,
    ) -> Option<T> {
        let Some((head, rest)) = prefix.split_first() else {
            return Some(op(self, sweep));
        };
        let CompositeIndexNode::Branch(children) = self else {
            return None;
        };
        let child = children.get_mut(head)?;
        let result = child.descend(rest, sweep, op);
        if child.is_empty() {
            children.remove(head);
            sweep.dead_keys += 1;
        }
        result
    }

    /// Pushes every live entity beneath this node in key order.
    pub fn collect_all(&mut self, out: &mut Vec<R>, sweep: &mut SweepStats) {
        self.scan((Bound::Unbounded, Bound::Unbounded), out, sweep);
    }

    /// Pushes live entities whose key at this level lies in `bounds`.
    ///
    /// Deeper levels are unconstrained and contribute in their own order.
    pub(crate) fn scan(&mut self, bounds: KeyBounds<'_>, out: &mut Vec<R>, sweep: &mut SweepStats) {
        match self {
            CompositeIndexNode::Leaf(set) => set.scan(bounds, out, sweep),
            CompositeIndexNode::Branch(children) => {
                if is_degenerate(&bounds) {
                    return;
                }
                let mut empty = Vec::new();
                for (key, child) in children.range_mut::<KeyValue, _>(bounds) {
                    child.collect_all(out, sweep);
                    if child.is_empty() {
                        empty.push(key.clone());
                    }
                }
                for key in empty {
                    children.remove(&key);
                    sweep.dead_keys += 1;
                }
            }
        }
    }

    /// Drops every dead slot and empty subtree beneath this node.
    pub fn sweep(&mut self, sweep: &mut SweepStats) {
        match self {
            CompositeIndexNode::Leaf(set) => set.sweep(sweep),
            CompositeIndexNode::Branch(children) => {
                let mut empty = Vec::new();
                for (key, child) in children.iter_mut() {
                    child.sweep(sweep);
                    if child.is_empty() {
                        empty.push(key.clone());
                    }
                }
                for key in empty {
                    children.remove(&key);
                    sweep.dead_keys += 1;
                }
            }
        }
    }

    /// Exact lookup of a full key; pushes every live match.
    pub fn get(&mut self, key: &[KeyValue], out: &mut Vec<R>, sweep: &mut SweepStats) {
        let Some((last, prefix)) = key.split_last() else {
            return;
        };
        self.descend(prefix, sweep, &mut |node, sweep| {
            if let CompositeIndexNode::Leaf(set) = node {
                set.get(last, out, sweep);
            }
        });
    }

    /// Prefix lookup: the union of everything under an exact-match prefix,
    /// ordered by the remaining fields.
    ///
    /// A prefix covering every field is an exact lookup.
    pub fn get_by_prefix(&mut self, prefix: &[KeyValue], out: &mut Vec<R>, sweep: &mut SweepStats) {
        if prefix.is_empty() {
            self.collect_all(out, sweep);
            return;
        }
        match self {
            CompositeIndexNode::Leaf(set) => {
                if let [key] = prefix {
                    set.get(key, out, sweep);
                }
            }
            CompositeIndexNode::Branch(children) => {
                let (head, rest) = prefix.split_at(1);
                let Some(child) = children.get_mut(&head[0]) else {
                    return;
                };
                child.get_by_prefix(rest, out, sweep);
                if child.is_empty() {
                    children.remove(&head[0]);
                    sweep.dead_keys += 1;
                }
            }
        }
    }

    /// Range scan over the field following `prefix`.
    pub(crate) fn range(
        &mut self,
        prefix: &[KeyValue],
        bounds: KeyBounds<'_>,
        out: &mut Vec<R>,
        sweep: &mut SweepStats,
    ) {
        self.descend(prefix, sweep, &mut |node, sweep| node.scan(bounds, out, sweep));
    }

    /// Keys `>= key` on the field following `prefix`.
    pub fn get_from(
        &mut self,
        prefix: &[KeyValue],
        key: &KeyValue,
        out: &mut Vec<R>,
        sweep: &mut SweepStats,
    ) {
        self.range(prefix, (Bound::Included(key), Bound::Unbounded), out, sweep);
    }

    /// Keys `< key` on the field following `prefix`.
    pub fn get_until(
        &mut self,
        prefix: &[KeyValue],
        key: &KeyValue,
        out: &mut Vec<R>,
        sweep: &mut SweepStats,
    ) {
        self.range(prefix, (Bound::Unbounded, Bound::Excluded(key)), out, sweep);
    }

    /// Keys in `[lo, hi)` on the field following `prefix`.
    pub fn get_over(
        &mut self,
        prefix: &[KeyValue],
        lo: &KeyValue,
        hi: &KeyValue,
        out: &mut Vec<R>,
        sweep: &mut SweepStats,
    ) {
        self.range(prefix, (Bound::Included(lo), Bound::Excluded(hi)), out, sweep);
    }

    /// Latest entity under `prefix` whose last key is `<= at`.
    ///
    /// `prefix` must cover every field but the last.
    pub fn get_at(&mut self, prefix: &[KeyValue], at: &KeyValue, sweep: &mut SweepStats) -> Option<R> {
        self.descend(prefix, sweep, &mut |node, sweep| match node {
            CompositeIndexNode::Leaf(set) => set.latest_at(at, sweep),
            CompositeIndexNode::Branch(_) => None,
        })
        .flatten()
    }
}

impl<R: EntityRef> fmt::Debug for CompositeIndexNode<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositeIndexNode::Branch(children) => f
                .debug_map()
                .entries(children.iter().map(|(k, v)| (k.to_string(), v)))
                .finish(),
            CompositeIndexNode::Leaf(set) => fmt::Debug::fmt(set, f),
        }
    }
}
