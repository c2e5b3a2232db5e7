//! Index specifications.

use super::key::{KeyKind, KeyValue};
use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Projects one key field out of an entity.
///
/// Returns [`KeyValue::Null`] when the entity has no value for the field.
pub type KeyExtractor<E> = Arc<dyn Fn(&E) -> KeyValue + Send + Sync>;

/// Describes one key field of an index.
pub struct FieldDescriptor<E> {
    name: String,
    kind: KeyKind,
    nullable: bool,
    range: bool,
    time_series: bool,
    extractor: KeyExtractor<E>,
}

impl<E> FieldDescriptor<E> {
    /// Creates a required, exact-match-only field.
    pub fn new<F>(name: impl Into<String>, kind: KeyKind, extractor: F) -> Self
    where
        F: Fn(&E) -> KeyValue + Send + Sync + 'static,
    {
        Self::with_extractor(name, kind, Arc::new(extractor))
    }

    /// Creates a field from an already shared extractor.
    pub fn with_extractor(
        name: impl Into<String>,
        kind: KeyKind,
        extractor: KeyExtractor<E>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            range: false,
            time_series: false,
            extractor,
        }
    }

    /// Allows the field to be absent.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Enables `From` / `Until` / `Over` queries ending at this field.
    #[must_use]
    pub fn range(mut self) -> Self {
        self.range = true;
        self
    }

    /// Enables "as of" queries ending at this field.
    #[must_use]
    pub fn time_series(mut self) -> Self {
        self.time_series = true;
        self
    }

    /// Returns the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the comparable type.
    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    /// Returns true if the field may be absent.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns true if range queries may end at this field.
    pub fn is_range(&self) -> bool {
        self.range
    }

    /// Returns true if "as of" queries may end at this field.
    pub fn is_time_series(&self) -> bool {
        self.time_series
    }

    /// Returns true if `value` may be stored or queried under this field.
    pub fn accepts(&self, value: &KeyValue) -> bool {
        match value.kind() {
            None => self.nullable,
            Some(kind) => kind == self.kind,
        }
    }

    pub(crate) fn extract(&self, entity: &E) -> KeyValue {
        (self.extractor)(entity)
    }
}

impl<E> Clone for FieldDescriptor<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            nullable: self.nullable,
            range: self.range,
            time_series: self.time_series,
            extractor: Arc::clone(&self.extractor),
        }
    }
}

impl<E> fmt::Debug for FieldDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("nullable", &self.nullable)
            .field("range", &self.range)
            .field("time_series", &self.time_series)
            .finish_non_exhaustive()
    }
}

/// Specification for one index on an entity class.
///
/// The field order is the key order: the first field is the outermost
/// level of the composite tree, the last field keys the leaves.
pub struct IndexSpec<E> {
    /// Name of the index, unique per engine.
    pub name: String,
    /// Whether a full key identifies at most one entity.
    pub unique: bool,
    fields: Vec<FieldDescriptor<E>>,
}

impl<E> IndexSpec<E> {
    /// Creates an empty, non-unique specification.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique: false,
            fields: Vec::new(),
        }
    }

    /// Appends a key field.
    #[must_use]
    pub fn field(mut self, field: FieldDescriptor<E>) -> Self {
        self.fields.push(field);
        self
    }

    /// Makes this a unique index.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Returns the key fields in key order.
    pub fn fields(&self) -> &[FieldDescriptor<E>] {
        &self.fields
    }

    /// Returns the number of key fields, which is also the tree depth.
    pub fn depth(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if a query over the first `depth` fields yields at most
    /// one entity.
    pub fn is_unique_at(&self, depth: usize) -> bool {
        self.unique && depth == self.fields.len()
    }

    /// Checks the structural rules every registered index must obey.
    pub fn validate(&self) -> CoreResult<()> {
        if self.fields.is_empty() {
            return Err(CoreError::invalid_index_spec(
                &self.name,
                "an index needs at least one key field",
            ));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(CoreError::invalid_index_spec(
                    &self.name,
                    format!("field {} appears more than once", field.name),
                ));
            }
        }

        let last = self.fields.len() - 1;
        for (depth, field) in self.fields.iter().enumerate() {
            if !field.time_series {
                continue;
            }
            if depth != last {
                return Err(CoreError::invalid_index_spec(
                    &self.name,
                    format!("time-series field {} must be the last key field", field.name),
                ));
            }
            if !field.kind.is_temporal() {
                return Err(CoreError::invalid_index_spec(
                    &self.name,
                    format!(
                        "time-series field {} has non-temporal kind {}",
                        field.name, field.kind
                    ),
                ));
            }
        }
        Ok(())
    }
}

impl<E: Entity> IndexSpec<E> {
    /// Projects an entity onto this index's key fields.
    ///
    /// A missing value for a required field, or a value of the wrong kind,
    /// is a contract violation and rejects the entity.
    pub fn project(&self, entity: &E) -> CoreResult<Vec<KeyValue>> {
        let mut key = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let value = field.extract(entity);
            match value.kind() {
                None if !field.nullable => {
                    return Err(CoreError::invalid_entity(
                        &self.name,
                        &field.name,
                        entity.entity_id(),
                        "is null but the field is not nullable",
                    ));
                }
                Some(kind) if kind != field.kind => {
                    return Err(CoreError::invalid_entity(
                        &self.name,
                        &field.name,
                        entity.entity_id(),
                        format!("has kind {kind}, expected {}", field.kind),
                    ));
                }
                _ => {}
            }
            key.push(value);
        }
        Ok(key)
    }
}

impl<E> Clone for IndexSpec<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            unique: self.unique,
            fields: self.fields.clone(),
        }
    }
}

impl<E> fmt::Debug for IndexSpec<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexSpec")
            .field("name", &self.name)
            .field("unique", &self.unique)
            .field("fields", &self.fields)
            .finish()
    }
}
