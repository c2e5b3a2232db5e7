//! Serializable index definitions.
//!
//! The metadata model that describes entity classes hands index layouts to
//! the engine as plain data. A definition carries everything about an index
//! except how to read field values out of an entity; binding supplies that.
//!
//! ```json
//! [
//!   {
//!     "name": "ix_snapshot_account_date",
//!     "fields": [
//!       { "name": "AccountId", "kind": "integer" },
//!       { "name": "EffectiveDate", "kind": "timestamp", "range": true, "time_series": true }
//!     ]
//!   }
//! ]
//! ```

use super::key::KeyKind;
use super::spec::{FieldDescriptor, IndexSpec, KeyExtractor};
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Persisted description of one key field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field name, as known to the entity class.
    pub name: String,
    /// Comparable type of the field.
    pub kind: KeyKind,
    /// Whether the field may be absent.
    #[serde(default)]
    pub nullable: bool,
    /// Whether range queries may end at this field.
    #[serde(default)]
    pub range: bool,
    /// Whether "as of" queries may end at this field.
    #[serde(default)]
    pub time_series: bool,
}

/// Persisted description of one index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Name of the index.
    pub name: String,
    /// Whether a full key identifies at most one entity.
    #[serde(default)]
    pub unique: bool,
    /// Key fields in key order.
    pub fields: Vec<FieldDefinition>,
}

impl IndexDefinition {
    /// Parses a JSON array of index definitions.
    pub fn parse_list(json: &str) -> CoreResult<Vec<IndexDefinition>> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes a list of definitions as pretty-printed JSON.
    pub fn to_json(definitions: &[IndexDefinition]) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(definitions)?)
    }
}

impl<E> IndexSpec<E> {
    /// Binds a definition to extractors.
    ///
    /// `resolve` maps a field name to the function that reads it; a field it
    /// cannot resolve fails with [`CoreError::UnboundField`].
    pub fn from_definition<F>(definition: &IndexDefinition, mut resolve: F) -> CoreResult<Self>
    where
        F: FnMut(&str) -> Option<KeyExtractor<E>>,
    {
        let mut spec = IndexSpec::new(&definition.name);
        if definition.unique {
            spec = spec.unique();
        }
        for field in &definition.fields {
            let extractor = resolve(&field.name).ok_or_else(|| CoreError::UnboundField {
                index: definition.name.clone(),
                field: field.name.clone(),
            })?;
            let mut descriptor = FieldDescriptor::with_extractor(&field.name, field.kind, extractor);
            if field.nullable {
                descriptor = descriptor.nullable();
            }
            if field.range {
                descriptor = descriptor.range();
            }
            if field.time_series {
                descriptor = descriptor.time_series();
            }
            spec = spec.field(descriptor);
        }
        spec.validate()?;
        Ok(spec)
    }

    /// Describes this specification without its extractors.
    pub fn to_definition(&self) -> IndexDefinition {
        IndexDefinition {
            name: self.name.clone(),
            unique: self.unique,
            fields: self
                .fields()
                .iter()
                .map(|field| FieldDefinition {
                    name: field.name().to_owned(),
                    kind: field.kind(),
                    nullable: field.is_nullable(),
                    range: field.is_range(),
                    time_series: field.is_time_series(),
                })
                .collect(),
        }
    }
}
