//! Index Engine - per-class orchestration of composite weak indexes.
//!
//! The owner of an entity class (an entity cache or data context) holds one
//! `IndexEngine` and registers one [`IndexSpec`] per declared index when it
//! is constructed. The engine then:
//!
//! 1. Registers every loaded entity in all indexes ([`IndexEngine::add`])
//! 2. Answers exact, prefix, range and as-of queries by index id
//! 3. Reclaims dead entries while answering those queries
//!
//! # Invariants
//!
//! - The engine never owns entities; it holds only weak handles
//! - An entity is registered in every index or in none
//! - Absence is never an error: lookups return empty vectors or `None`
//! - Liveness is evaluated on every access, never cached

use super::definition::IndexDefinition;
use super::entry_set::AddOutcome;
use super::key::KeyValue;
use super::node::CompositeIndexNode;
use super::spec::IndexSpec;
use crate::config::IndexEngineConfig;
use crate::entity::{Entity, EntityRef};
use crate::error::{CoreError, CoreResult};
use crate::stats::{IndexStats, SweepStats};
use crate::types::IndexId;
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// One registered index: its specification and its tree.
pub(crate) struct RegisteredIndex<R: EntityRef> {
    pub(crate) spec: IndexSpec<R::Entity>,
    pub(crate) root: CompositeIndexNode<R>,
}

impl<R: EntityRef> RegisteredIndex<R> {
    fn new(spec: IndexSpec<R::Entity>) -> Self {
        let root = CompositeIndexNode::new(spec.depth(), spec.unique);
        Self { spec, root }
    }

    /// Checks a query prefix against the leading fields.
    fn check_prefix(&self, prefix: &[KeyValue], max_len: usize, validate: bool) -> CoreResult<()> {
        if prefix.len() > max_len {
            return Err(CoreError::unsupported_query(
                &self.spec.name,
                format!(
                    "{} key values supplied, at most {} allowed here",
                    prefix.len(),
                    max_len
                ),
            ));
        }
        if validate {
            for (depth, value) in prefix.iter().enumerate() {
                self.check_value(depth, value)?;
            }
        }
        Ok(())
    }

    /// Checks one key value against the field at `depth`.
    fn check_value(&self, depth: usize, value: &KeyValue) -> CoreResult<()> {
        let field = &self.spec.fields()[depth];
        if field.accepts(value) {
            Ok(())
        } else {
            Err(CoreError::invalid_key(
                &self.spec.name,
                format!(
                    "field {} ({}{}) does not accept {}",
                    field.name(),
                    field.kind(),
                    if field.is_nullable() { ", nullable" } else { "" },
                    value
                ),
            ))
        }
    }

    /// Checks that a range query may end at the field after `prefix`.
    ///
    /// Returns false when validation is off and a bound does not fit the
    /// field; such a range matches nothing.
    fn check_range(&self, prefix: &[KeyValue], bounds: &[&KeyValue], validate: bool) -> CoreResult<bool> {
        let depth = self.spec.depth();
        self.check_prefix(prefix, depth - 1, validate)?;
        let field = &self.spec.fields()[prefix.len()];
        if !field.is_range() {
            return Err(CoreError::unsupported_query(
                &self.spec.name,
                format!("field {} is not range-capable", field.name()),
            ));
        }
        if validate {
            for bound in bounds {
                self.check_value(prefix.len(), bound)?;
            }
        }
        Ok(bounds.iter().all(|bound| field.accepts(bound)))
    }
}

/// The per-class index engine.
///
/// Single-threaded: every operation takes `&mut self`, including
/// reads, because reads prune. Callers sharing an engine across threads
/// must serialize access themselves.
pub struct IndexEngine<R: EntityRef> {
    /// Configuration.
    config: IndexEngineConfig,
    /// Registered indexes, indexed by `IndexId`.
    indexes: Vec<RegisteredIndex<R>>,
    /// Index name -> id.
    names: HashMap<String, IndexId>,
    /// Statistics.
    stats: IndexStats,
}

impl<R: EntityRef> Default for IndexEngine<R> {
    fn default() -> Self {
        Self::new(IndexEngineConfig::default())
    }
}

impl<R: EntityRef> IndexEngine<R> {
    /// Creates an engine with no indexes.
    #[must_use]
    pub fn new(config: IndexEngineConfig) -> Self {
        Self {
            config,
            indexes: Vec::new(),
            names: HashMap::new(),
            stats: IndexStats::default(),
        }
    }

    /// Creates an engine and registers `specs` in order.
    pub fn with_indexes<I>(config: IndexEngineConfig, specs: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = IndexSpec<R::Entity>>,
    {
        let mut engine = Self::new(config);
        for spec in specs {
            engine.define_index(spec)?;
        }
        Ok(engine)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &IndexEngineConfig {
        &self.config
    }

    /// Returns a snapshot of the counters.
    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    /// Registers an index.
    ///
    /// Entities added before this call are not back-filled; the new index
    /// fills up as entities are loaded again.
    pub fn define_index(&mut self, spec: IndexSpec<R::Entity>) -> CoreResult<IndexId> {
        spec.validate()?;
        if self.names.contains_key(&spec.name) {
            return Err(CoreError::DuplicateIndex { name: spec.name });
        }

        let id = IndexId::new(self.indexes.len() as u32);
        debug!(index = %spec.name, %id, fields = spec.depth(), unique = spec.unique, "defined index");
        self.names.insert(spec.name.clone(), id);
        self.indexes.push(RegisteredIndex::new(spec));
        Ok(id)
    }

    /// Looks up an index id by name.
    #[must_use]
    pub fn index_id(&self, name: &str) -> Option<IndexId> {
        self.names.get(name).copied()
    }

    /// Returns the ids of all registered indexes in registration order.
    pub fn index_ids(&self) -> impl Iterator<Item = IndexId> + '_ {
        (0..self.indexes.len()).map(|slot| IndexId::new(slot as u32))
    }

    /// Returns the specification of an index.
    pub fn spec(&self, index: IndexId) -> CoreResult<&IndexSpec<R::Entity>> {
        self.indexes
            .get(index.slot())
            .map(|entry| &entry.spec)
            .ok_or(CoreError::UnknownIndex { id: index })
    }

    /// Returns the definitions of all registered indexes.
    #[must_use]
    pub fn definitions(&self) -> Vec<IndexDefinition> {
        self.indexes.iter().map(|entry| entry.spec.to_definition()).collect()
    }

    /// Returns the number of weak slots held by an index, dead or alive.
    pub fn slot_count(&self, index: IndexId) -> CoreResult<usize> {
        self.indexes
            .get(index.slot())
            .map(|entry| entry.root.slot_count())
            .ok_or(CoreError::UnknownIndex { id: index })
    }

    /// Registers `entity` in every index.
    ///
    /// The entity is projected onto all indexes before any tree is touched,
    /// so an entity rejected by one index is registered in none.
    pub fn add(&mut self, entity: &R) -> CoreResult<()> {
        let mut keys = Vec::with_capacity(self.indexes.len());
        for entry in &self.indexes {
            match entry.spec.project(entity.entity()) {
                Ok(key) => keys.push(key),
                Err(err) => {
                    self.stats.rejected_adds += 1;
                    warn!(index = %entry.spec.name, error = %err, "rejected entity");
                    return Err(err);
                }
            }
        }

        for (entry, key) in self.indexes.iter_mut().zip(keys) {
            if entry.root.add(&key, entity, entry.spec.unique) == AddOutcome::Repointed {
                self.stats.repointed_slots += 1;
            }
        }
        self.stats.adds += 1;
        trace!(entity = %entity.entity().entity_id(), indexes = self.indexes.len(), "registered entity");
        Ok(())
    }

    /// Returns every live entity whose leading key fields equal `prefix`.
    ///
    /// A full key on a unique index yields at most one entity; shorter
    /// prefixes yield the union of everything beneath them, ordered by the
    /// remaining fields.
    pub fn get_by(&mut self, index: IndexId, prefix: &[KeyValue]) -> CoreResult<Vec<R>> {
        let validate = self.config.validate_query_keys;
        let entry = entry_mut(&mut self.indexes, index)?;
        entry.check_prefix(prefix, entry.spec.depth(), validate)?;

        let mut out = Vec::new();
        let mut sweep = SweepStats::default();
        entry.root.get_by_prefix(prefix, &mut out, &mut sweep);

        if prefix.len() == entry.spec.depth() {
            self.stats.lookups += 1;
        } else {
            self.stats.scans += 1;
        }
        finish(&mut self.stats, &self.config, &entry.spec.name, sweep, out.len());
        Ok(out)
    }

    /// Returns the entity under a full key of a unique index.
    pub fn get_one(&mut self, index: IndexId, key: &[KeyValue]) -> CoreResult<Option<R>> {
        let validate = self.config.validate_query_keys;
        let entry = entry_mut(&mut self.indexes, index)?;
        if !entry.spec.is_unique_at(key.len()) {
            return Err(CoreError::unsupported_query(
                &entry.spec.name,
                "single-entity lookups need a full key on a unique index",
            ));
        }
        entry.check_prefix(key, entry.spec.depth(), validate)?;

        let mut out = Vec::with_capacity(1);
        let mut sweep = SweepStats::default();
        entry.root.get(key, &mut out, &mut sweep);

        self.stats.lookups += 1;
        finish(&mut self.stats, &self.config, &entry.spec.name, sweep, out.len());
        Ok(out.into_iter().next())
    }

    /// Entities under `prefix` whose next key field is `>= key`.
    pub fn get_from(
        &mut self,
        index: IndexId,
        prefix: &[KeyValue],
        key: &KeyValue,
    ) -> CoreResult<Vec<R>> {
        let validate = self.config.validate_query_keys;
        let entry = entry_mut(&mut self.indexes, index)?;
        let mut out = Vec::new();
        if !entry.check_range(prefix, &[key], validate)? {
            self.stats.scans += 1;
            return Ok(out);
        }

        let mut sweep = SweepStats::default();
        entry.root.get_from(prefix, key, &mut out, &mut sweep);

        self.stats.scans += 1;
        finish(&mut self.stats, &self.config, &entry.spec.name, sweep, out.len());
        Ok(out)
    }

    /// Entities under `prefix` whose next key field is `< key`.
    pub fn get_until(
        &mut self,
        index: IndexId,
        prefix: &[KeyValue],
        key: &KeyValue,
    ) -> CoreResult<Vec<R>> {
        let validate = self.config.validate_query_keys;
        let entry = entry_mut(&mut self.indexes, index)?;
        let mut out = Vec::new();
        if !entry.check_range(prefix, &[key], validate)? {
            self.stats.scans += 1;
            return Ok(out);
        }

        let mut sweep = SweepStats::default();
        entry.root.get_until(prefix, key, &mut out, &mut sweep);

        self.stats.scans += 1;
        finish(&mut self.stats, &self.config, &entry.spec.name, sweep, out.len());
        Ok(out)
    }

    /// Entities under `prefix` whose next key field lies in `[lo, hi)`.
    pub fn get_over(
        &mut self,
        index: IndexId,
        prefix: &[KeyValue],
        lo: &KeyValue,
        hi: &KeyValue,
    ) -> CoreResult<Vec<R>> {
        let validate = self.config.validate_query_keys;
        let entry = entry_mut(&mut self.indexes, index)?;
        let mut out = Vec::new();
        if !entry.check_range(prefix, &[lo, hi], validate)? {
            self.stats.scans += 1;
            return Ok(out);
        }

        let mut sweep = SweepStats::default();
        entry.root.get_over(prefix, lo, hi, &mut out, &mut sweep);

        self.stats.scans += 1;
        finish(&mut self.stats, &self.config, &entry.spec.name, sweep, out.len());
        Ok(out)
    }

    /// The latest entity under `prefix` whose time-series key is `<= at`.
    ///
    /// `prefix` must supply every key field but the last, which must be a
    /// time-series field.
    pub fn get_at(
        &mut self,
        index: IndexId,
        prefix: &[KeyValue],
        at: &KeyValue,
    ) -> CoreResult<Option<R>> {
        let validate = self.config.validate_query_keys;
        let entry = entry_mut(&mut self.indexes, index)?;
        let depth = entry.spec.depth();
        let last = &entry.spec.fields()[depth - 1];
        if !last.is_time_series() {
            return Err(CoreError::unsupported_query(
                &entry.spec.name,
                format!("field {} is not a time-series field", last.name()),
            ));
        }
        if prefix.len() != depth - 1 {
            return Err(CoreError::unsupported_query(
                &entry.spec.name,
                format!(
                    "as-of lookups need {} leading key values, got {}",
                    depth - 1,
                    prefix.len()
                ),
            ));
        }
        entry.check_prefix(prefix, depth - 1, validate)?;
        if at.is_null() || (validate && !last.accepts(at)) {
            return Err(CoreError::invalid_key(
                &entry.spec.name,
                format!("{at} is not a point in field {}", last.name()),
            ));
        }
        if !last.accepts(at) {
            self.stats.lookups += 1;
            return Ok(None);
        }

        let mut sweep = SweepStats::default();
        let found = entry.root.get_at(prefix, at, &mut sweep);

        self.stats.lookups += 1;
        finish(&mut self.stats, &self.config, &entry.spec.name, sweep, usize::from(found.is_some()));
        Ok(found)
    }

    /// Every live entity in the index, in key order.
    pub fn get_all(&mut self, index: IndexId) -> CoreResult<Vec<R>> {
        self.get_by(index, &[])
    }

    /// Sweeps every index for dead slots and empty subtrees.
    ///
    /// Reads already prune what they touch; this reclaims the parts of an
    /// index that are never read.
    pub fn prune(&mut self) -> SweepStats {
        let mut total = SweepStats::default();
        for entry in &mut self.indexes {
            let mut sweep = SweepStats::default();
            entry.root.sweep(&mut sweep);
            if !sweep.is_empty() {
                debug!(
                    index = %entry.spec.name,
                    dead_slots = sweep.dead_slots,
                    dead_keys = sweep.dead_keys,
                    "swept index"
                );
            }
            total += sweep;
        }
        self.stats.record_sweep(total);
        total
    }
}

fn entry_mut<R: EntityRef>(
    indexes: &mut [RegisteredIndex<R>],
    index: IndexId,
) -> CoreResult<&mut RegisteredIndex<R>> {
    indexes
        .get_mut(index.slot())
        .ok_or(CoreError::UnknownIndex { id: index })
}

/// Books a finished query: pruning counters, pruning and large-scan logs.
fn finish(
    stats: &mut IndexStats,
    config: &IndexEngineConfig,
    index: &str,
    sweep: SweepStats,
    returned: usize,
) {
    if !sweep.is_empty() {
        debug!(
            index,
            dead_slots = sweep.dead_slots,
            dead_keys = sweep.dead_keys,
            "pruned dead entries"
        );
        stats.record_sweep(sweep);
    }
    if returned > config.scan_warning_threshold {
        warn!(
            index,
            returned,
            threshold = config.scan_warning_threshold,
            "large index scan"
        );
    }
}
