//! Named query surface.
//!
//! An entity class exposes one accessor per index, prefix length and query
//! kind, named the way generated data-access code names them:
//!
//! | index `(AccountId, EffectiveDate)` on `Snapshot`      | kind   |
//! |-------------------------------------------------------|--------|
//! | `GetSnapshotCollectionByAccountId`                    | By     |
//! | `GetSnapshotCollectionByAccountIdAndEffectiveDate`    | By     |
//! | `GetSnapshotByAccountIdAtEffectiveDate`               | At     |
//! | `GetSnapshotCollectionByAccountIdFromEffectiveDate`   | From   |
//!
//! [`accessors`] enumerates them as data and [`IndexEngine::execute`] runs
//! one against the engine.

use super::engine::IndexEngine;
use super::key::KeyValue;
use super::spec::IndexSpec;
use crate::entity::EntityRef;
use crate::error::{CoreError, CoreResult};
use crate::types::IndexId;
use std::fmt;

/// Kind of query an accessor performs at its depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorKind {
    /// Exact match on the leading fields.
    By,
    /// Exact match with every nullable leading field queried as `Null`.
    ByNullable,
    /// Latest entry at or before a point in time.
    At,
    /// Keys `>=` a bound.
    From,
    /// Keys `<` a bound.
    Until,
    /// Keys in `[lo, hi)`.
    Over,
}

impl AccessorKind {
    fn infix(self) -> &'static str {
        match self {
            AccessorKind::By | AccessorKind::ByNullable => "By",
            AccessorKind::At => "At",
            AccessorKind::From => "From",
            AccessorKind::Until => "Until",
            AccessorKind::Over => "Over",
        }
    }
}

impl fmt::Display for AccessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessorKind::ByNullable => f.write_str("ByNullable"),
            other => f.write_str(other.infix()),
        }
    }
}

/// One named accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor {
    /// Index the accessor queries.
    pub index: IndexId,
    /// Query kind.
    pub kind: AccessorKind,
    /// Number of key fields the accessor addresses.
    pub depth: usize,
    /// True if the accessor yields at most one entity.
    pub single: bool,
    /// Generated name.
    pub name: String,
    /// Argument names, in call order.
    pub params: Vec<String>,
}

impl Accessor {
    /// Number of key values `execute` expects.
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Result of running an accessor.
#[derive(Debug, Clone)]
pub enum QueryOutput<R> {
    /// Single-or-absent result.
    One(Option<R>),
    /// Ordered list result.
    Many(Vec<R>),
}

impl<R> QueryOutput<R> {
    /// Flattens either shape into a vector.
    pub fn into_vec(self) -> Vec<R> {
        match self {
            QueryOutput::One(found) => found.into_iter().collect(),
            QueryOutput::Many(all) => all,
        }
    }
}

/// Enumerates every accessor of an index.
///
/// Accessors are ordered by depth, then `By`, `ByNullable`, `At`, `From`,
/// `Until`, `Over`.
pub fn accessors<E>(class: &str, index: IndexId, spec: &IndexSpec<E>) -> Vec<Accessor> {
    let fields = spec.fields();
    let mut out = Vec::new();

    for depth in 1..=fields.len() {
        let leading = &fields[..depth];
        let last = &leading[depth - 1];
        let names: Vec<&str> = leading.iter().map(|f| f.name()).collect();
        let unique = spec.is_unique_at(depth);

        out.push(Accessor {
            index,
            kind: AccessorKind::By,
            depth,
            single: unique,
            name: by_name(class, unique, &names, None),
            params: names.iter().map(|n| (*n).to_owned()).collect(),
        });

        if leading.iter().any(|f| f.is_nullable()) {
            let suffixed: Vec<String> = leading
                .iter()
                .map(|f| {
                    if f.is_nullable() {
                        format!("{}IsNull", f.name())
                    } else {
                        f.name().to_owned()
                    }
                })
                .collect();
            let suffixed: Vec<&str> = suffixed.iter().map(String::as_str).collect();
            out.push(Accessor {
                index,
                kind: AccessorKind::ByNullable,
                depth,
                single: false,
                name: by_name(class, false, &suffixed, None),
                params: leading
                    .iter()
                    .filter(|f| !f.is_nullable())
                    .map(|f| f.name().to_owned())
                    .collect(),
            });
        }

        let mut bounded = Vec::new();
        if last.is_time_series() {
            bounded.push(AccessorKind::At);
        }
        if last.is_range() {
            bounded.extend([AccessorKind::From, AccessorKind::Until, AccessorKind::Over]);
        }
        for kind in bounded {
            let single = kind == AccessorKind::At;
            let mut params: Vec<String> = names.iter().map(|n| (*n).to_owned()).collect();
            if kind == AccessorKind::Over {
                let field = last.name();
                params.pop();
                params.push(format!("from{field}"));
                params.push(format!("until{field}"));
            }
            out.push(Accessor {
                index,
                kind,
                depth,
                single,
                name: by_name(class, single, &names, Some(kind)),
                params,
            });
        }
    }
    out
}

/// `Get{Class}[Collection]By{F1}{F2}And{Fn}` for exact matches,
/// `Get{Class}[Collection][By{F1}..]{Kind}{Fn}` for bounded ones.
fn by_name(class: &str, single: bool, fields: &[&str], bounded: Option<AccessorKind>) -> String {
    let mut name = format!("Get{class}");
    if !single {
        name.push_str("Collection");
    }
    let Some((last, leading)) = fields.split_last() else {
        return name;
    };
    match bounded {
        None => {
            name.push_str("By");
            name.push_str(&leading.concat());
            if !leading.is_empty() {
                name.push_str("And");
            }
        }
        Some(kind) => {
            if !leading.is_empty() {
                name.push_str("By");
                name.push_str(&leading.concat());
            }
            name.push_str(kind.infix());
        }
    }
    name.push_str(last);
    name
}

impl<R: EntityRef> IndexEngine<R> {
    /// Runs a named accessor with its arguments in call order.
    pub fn execute(&mut self, accessor: &Accessor, args: &[KeyValue]) -> CoreResult<QueryOutput<R>> {
        let spec = self.spec(accessor.index)?;
        if args.len() != accessor.arity() {
            return Err(CoreError::invalid_key(
                &spec.name,
                format!(
                    "{} takes {} key values, got {}",
                    accessor.name,
                    accessor.arity(),
                    args.len()
                ),
            ));
        }

        let index = accessor.index;
        let depth = accessor.depth;
        match accessor.kind {
            AccessorKind::By => self.exact(index, args, accessor.single),
            AccessorKind::ByNullable => {
                let mut supplied = args.iter();
                let mut key = Vec::with_capacity(depth);
                for field in &spec.fields()[..depth] {
                    if field.is_nullable() {
                        key.push(KeyValue::Null);
                    } else if let Some(value) = supplied.next() {
                        key.push(value.clone());
                    }
                }
                self.exact(index, &key, accessor.single)
            }
            AccessorKind::At => {
                let (at, prefix) = split_bound(accessor, args)?;
                Ok(QueryOutput::One(self.get_at(index, prefix, at)?))
            }
            AccessorKind::From => {
                let (key, prefix) = split_bound(accessor, args)?;
                Ok(QueryOutput::Many(self.get_from(index, prefix, key)?))
            }
            AccessorKind::Until => {
                let (key, prefix) = split_bound(accessor, args)?;
                Ok(QueryOutput::Many(self.get_until(index, prefix, key)?))
            }
            AccessorKind::Over => match args {
                [prefix @ .., lo, hi] => Ok(QueryOutput::Many(self.get_over(index, prefix, lo, hi)?)),
                _ => Err(CoreError::unsupported_query(
                    &accessor.name,
                    "range accessors need both bounds",
                )),
            },
        }
    }

    fn exact(&mut self, index: IndexId, key: &[KeyValue], single: bool) -> CoreResult<QueryOutput<R>> {
        if single {
            Ok(QueryOutput::One(self.get_one(index, key)?))
        } else {
            Ok(QueryOutput::Many(self.get_by(index, key)?))
        }
    }
}

fn split_bound<'a>(
    accessor: &Accessor,
    args: &'a [KeyValue],
) -> CoreResult<(&'a KeyValue, &'a [KeyValue])> {
    args.split_last().ok_or_else(|| {
        CoreError::unsupported_query(&accessor.name, "bounded accessors need a key value")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::testing::{ids, item, item_spec, label_spec, rank_spec, Item};
    use std::rc::Rc;

    fn names(list: &[Accessor]) -> Vec<&str> {
        list.iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn composite_time_series_index() {
        let spec = item_spec("ix_group_rank", false);
        let list = accessors("Item", IndexId::new(0), &spec);
        assert_eq!(
            names(&list),
            vec![
                "GetItemCollectionByGroup",
                "GetItemCollectionByGroupAndRank",
                "GetItemByGroupAtRank",
                "GetItemCollectionByGroupFromRank",
                "GetItemCollectionByGroupUntilRank",
                "GetItemCollectionByGroupOverRank",
            ]
        );
        let over = &list[5];
        assert_eq!(over.params, vec!["Group", "fromRank", "untilRank"]);
        assert_eq!(over.arity(), 3);
        assert!(list[2].single);
    }

    #[test]
    fn unique_full_key_is_single() {
        let spec = item_spec("ix_group_rank", true);
        let list = accessors("Item", IndexId::new(0), &spec);
        assert_eq!(list[0].name, "GetItemCollectionByGroup");
        assert!(!list[0].single);
        assert_eq!(list[1].name, "GetItemByGroupAndRank");
        assert!(list[1].single);
    }

    #[test]
    fn single_field_range_names() {
        let spec = rank_spec("ix_rank", true);
        let list = accessors("Item", IndexId::new(0), &spec);
        assert_eq!(
            names(&list),
            vec![
                "GetItemByRank",
                "GetItemCollectionFromRank",
                "GetItemCollectionUntilRank",
                "GetItemCollectionOverRank",
            ]
        );
    }

    #[test]
    fn nullable_fields_get_null_accessors() {
        let spec = label_spec("ix_label_group");
        let list = accessors("Item", IndexId::new(0), &spec);
        assert_eq!(
            names(&list),
            vec![
                "GetItemCollectionByLabel",
                "GetItemCollectionByLabelIsNull",
                "GetItemCollectionByLabelAndGroup",
                "GetItemCollectionByLabelIsNullAndGroup",
            ]
        );
        assert!(list[1].params.is_empty());
        assert_eq!(list[3].params, vec!["Group"]);
    }

    #[test]
    fn null_accessors_always_return_collections() {
        let spec = label_spec("ix_label_group").unique();
        let list = accessors("Item", IndexId::new(0), &spec);
        assert_eq!(list[2].name, "GetItemByLabelAndGroup");
        assert!(list[2].single);
        assert_eq!(list[3].name, "GetItemCollectionByLabelIsNullAndGroup");
        assert!(!list[3].single);

        let mut engine: IndexEngine<Rc<Item>> = IndexEngine::default();
        let id = engine.define_index(label_spec("ix_label_group").unique()).unwrap();
        let list = accessors("Item", id, engine.spec(id).unwrap());
        let items = vec![item(1, 1, 0), Rc::new(Item::labeled(2, 1, 0, "red"))];
        for i in &items {
            engine.add(i).unwrap();
        }
        match engine.execute(&list[3], &[KeyValue::Integer(1)]).unwrap() {
            QueryOutput::Many(found) => assert_eq!(ids(&found), vec![1]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn execute_dispatches_by_kind() {
        let mut engine: IndexEngine<Rc<Item>> = IndexEngine::default();
        let id = engine.define_index(item_spec("ix_group_rank", false)).unwrap();
        let list = accessors("Item", id, engine.spec(id).unwrap());
        let items = vec![item(1, 1, 10), item(2, 1, 20), item(3, 2, 10)];
        for i in &items {
            engine.add(i).unwrap();
        }
        let int = KeyValue::Integer;

        let by_group = engine.execute(&list[0], &[int(1)]).unwrap().into_vec();
        assert_eq!(ids(&by_group), vec![1, 2]);

        match engine.execute(&list[2], &[int(1), int(15)]).unwrap() {
            QueryOutput::One(Some(found)) => assert!(Rc::ptr_eq(&found, &items[0])),
            other => panic!("unexpected {other:?}"),
        }

        let from = engine.execute(&list[3], &[int(1), int(15)]).unwrap().into_vec();
        assert_eq!(ids(&from), vec![2]);
        let until = engine.execute(&list[4], &[int(1), int(15)]).unwrap().into_vec();
        assert_eq!(ids(&until), vec![1]);
        let over = engine
            .execute(&list[5], &[int(1), int(10), int(20)])
            .unwrap()
            .into_vec();
        assert_eq!(ids(&over), vec![1]);
    }

    #[test]
    fn execute_null_accessor() {
        let mut engine: IndexEngine<Rc<Item>> = IndexEngine::default();
        let id = engine.define_index(label_spec("ix_label_group")).unwrap();
        let list = accessors("Item", id, engine.spec(id).unwrap());
        let items = vec![item(1, 1, 0), Rc::new(Item::labeled(2, 1, 0, "red")), item(3, 2, 0)];
        for i in &items {
            engine.add(i).unwrap();
        }

        let nulls = engine.execute(&list[1], &[]).unwrap().into_vec();
        assert_eq!(ids(&nulls), vec![1, 3]);
        let null_group = engine
            .execute(&list[3], &[KeyValue::Integer(2)])
            .unwrap()
            .into_vec();
        assert_eq!(ids(&null_group), vec![3]);
    }

    #[test]
    fn execute_checks_arity() {
        let mut engine: IndexEngine<Rc<Item>> = IndexEngine::default();
        let id = engine.define_index(rank_spec("ix_rank", false)).unwrap();
        let list = accessors("Item", id, engine.spec(id).unwrap());
        assert!(matches!(
            engine.execute(&list[0], &[]),
            Err(CoreError::InvalidKey { .. })
        ));
    }
}
