//! Row schema model (component C2): the `RowType` trait a `#[derive(Row)]`
//! struct implements, and the `RowInfo` descriptor `RowInfo::find` builds and
//! caches from it.
//!
//! `RowType` is declarative column metadata plus a `type_name()`/`columns()`
//! surface a derive macro fills in; `RowInfo` is the resolved descriptor
//! built from it once per type and cached.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use itertools::Itertools;
use parking_lot::Mutex;

use crate::codec::{self, KeyCodec, TypeFlags, ValueCodec};
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Str,
    Bytes,
}

impl TypeKind {
    /// Build the codec used when this type backs a key column.
    pub fn key_codec(self, flags: TypeFlags) -> Box<dyn KeyCodec> {
        match self {
            TypeKind::Bool => Box::new(codec::BoolCodec::new(flags)),
            TypeKind::I8 => Box::new(codec::I8Codec::new(flags)),
            TypeKind::I16 => Box::new(codec::I16Codec::new(flags)),
            TypeKind::I32 => Box::new(codec::I32Codec::new(flags)),
            TypeKind::I64 => Box::new(codec::I64Codec::new(flags)),
            TypeKind::U8 => Box::new(codec::U8Codec::new(flags)),
            TypeKind::U16 => Box::new(codec::U16Codec::new(flags)),
            TypeKind::U32 => Box::new(codec::U32Codec::new(flags)),
            TypeKind::U64 => Box::new(codec::U64Codec::new(flags)),
            TypeKind::F32 => Box::new(codec::F32Codec::new(flags)),
            TypeKind::F64 => Box::new(codec::F64Codec::new(flags)),
            TypeKind::Str => Box::new(codec::StringCodec::new(flags)),
            TypeKind::Bytes => Box::new(codec::BlobCodec::new(flags)),
        }
    }

    /// Build the codec used when this type backs a value column.
    pub fn value_codec(self, flags: TypeFlags) -> Box<dyn ValueCodec> {
        match self {
            TypeKind::Bool => Box::new(codec::BoolCodec::new(flags)),
            TypeKind::I8 => Box::new(codec::I8Codec::new(flags)),
            TypeKind::I16 => Box::new(codec::I16Codec::new(flags)),
            TypeKind::I32 => Box::new(codec::I32Codec::new(flags)),
            TypeKind::I64 => Box::new(codec::I64Codec::new(flags)),
            TypeKind::U8 => Box::new(codec::U8Codec::new(flags)),
            TypeKind::U16 => Box::new(codec::U16Codec::new(flags)),
            TypeKind::U32 => Box::new(codec::U32Codec::new(flags)),
            TypeKind::U64 => Box::new(codec::U64Codec::new(flags)),
            TypeKind::F32 => Box::new(codec::F32Codec::new(flags)),
            TypeKind::F64 => Box::new(codec::F64Codec::new(flags)),
            TypeKind::Str => Box::new(codec::StringCodec::new(flags)),
            TypeKind::Bytes => Box::new(codec::BlobCodec::new(flags)),
        }
    }
}

/// One column as declared by a `#[derive(Row)]` struct: name, logical type,
/// flags, and whether it belongs to the primary key.
#[derive(Debug, Clone, Copy)]
pub struct ColumnDecl {
    pub name: &'static str,
    pub kind: TypeKind,
    pub flags: TypeFlags,
    pub primary_key: bool,
    /// Marks this column as carrying the automatic-key-generator contract
    /// of §4.7.1 (only meaningful when `primary_key` is also true).
    pub automatic: bool,
}

/// One column of a secondary index or alternate key: a reference to a
/// declared column plus an index-local sort direction, which may differ from
/// the column's own declared direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexColumnDecl {
    pub column: &'static str,
    pub descending: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct IndexGroupDecl {
    pub name: &'static str,
    pub unique: bool,
    pub columns: &'static [IndexColumnDecl],
    /// Extra value columns copied into the index entry so reads can be
    /// satisfied without a join back to the primary row.
    pub covering: &'static [&'static str],
}

/// Implemented by generated code for a user row struct. Pure metadata: no
/// instance state, which is why every method is `'static`.
pub trait RowType {
    fn type_name() -> &'static str;
    fn columns() -> &'static [ColumnDecl];
    fn alternate_keys() -> &'static [IndexGroupDecl] {
        &[]
    }
    fn secondary_indexes() -> &'static [IndexGroupDecl] {
        &[]
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub kind: TypeKind,
    pub flags: TypeFlags,
    pub automatic: bool,
}

#[derive(Debug, Clone)]
pub struct IndexColumn {
    /// Index into `RowInfo::all_columns`.
    pub column: usize,
    pub descending: bool,
}

#[derive(Debug, Clone)]
pub struct IndexSpec {
    pub name: String,
    pub unique: bool,
    pub key: Vec<IndexColumn>,
    pub covering: Vec<usize>,
}

/// The resolved, validated shape of a row type: column order, which columns
/// form the primary key, and what alternate keys / secondary indexes exist.
///
/// Column ordering is deterministic: primary key
/// columns keep their declaration order; value columns are sorted by name.
/// This makes the encoded layout independent of any incidental reordering of
/// struct fields that doesn't change the declared primary-key order.
#[derive(Debug, Clone)]
pub struct RowInfo {
    pub type_name: String,
    pub all_columns: Vec<Column>,
    pub key_columns: Vec<usize>,
    pub value_columns: Vec<usize>,
    pub alternate_keys: Vec<IndexSpec>,
    pub secondary_indexes: Vec<IndexSpec>,
}

impl RowInfo {
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.all_columns.iter().position(|c| c.name == name)
    }

    fn build<T: RowType>() -> Result<RowInfo, Error> {
        let type_name = T::type_name();
        let decls = T::columns();

        let mut seen = HashMap::with_capacity(decls.len());
        for (i, decl) in decls.iter().enumerate() {
            if let Some(prev) = seen.insert(decl.name, i) {
                let _ = prev;
                return Err(Error::MalformedRowType(format!(
                    "{type_name}: duplicate column `{}`",
                    decl.name
                )));
            }
        }

        let mut key_decl_indices: Vec<usize> = decls
            .iter()
            .enumerate()
            .filter(|(_, d)| d.primary_key)
            .map(|(i, _)| i)
            .collect();
        if key_decl_indices.is_empty() {
            return Err(Error::MalformedRowType(format!(
                "{type_name}: no primary key columns declared"
            )));
        }
        // Declaration order is already the iteration order; this sort is a
        // no-op but documents the invariant explicitly.
        key_decl_indices.sort_unstable();

        let value_decl_indices: Vec<usize> = decls
            .iter()
            .enumerate()
            .filter(|(_, d)| !d.primary_key)
            .map(|(i, _)| i)
            .sorted_by_key(|&i| decls[i].name)
            .collect();

        // Renumber: primary key columns first (declaration order), then
        // value columns (name order). `all_columns` is indexed by this new
        // order; `orig_to_new` translates a declaration index to it.
        let mut all_columns = Vec::with_capacity(decls.len());
        let mut orig_to_new = vec![0usize; decls.len()];
        for &orig in key_decl_indices.iter().chain(value_decl_indices.iter()) {
            orig_to_new[orig] = all_columns.len();
            let d = &decls[orig];
            all_columns.push(Column {
                name: d.name.to_string(),
                kind: d.kind,
                flags: d.flags,
                automatic: d.automatic,
            });
        }
        let key_columns: Vec<usize> = key_decl_indices.iter().map(|&i| orig_to_new[i]).collect();
        let value_columns: Vec<usize> = value_decl_indices.iter().map(|&i| orig_to_new[i]).collect();

        let resolve_group = |group: &IndexGroupDecl| -> Result<IndexSpec, Error> {
            if group.columns.is_empty() {
                return Err(Error::MalformedRowType(format!(
                    "{type_name}: index `{}` has no columns",
                    group.name
                )));
            }
            let mut key = Vec::with_capacity(group.columns.len());
            for ic in group.columns {
                let idx = all_columns.iter().position(|c| c.name == ic.column).ok_or_else(|| {
                    Error::MalformedRowType(format!(
                        "{type_name}: index `{}` references unknown column `{}`",
                        group.name, ic.column
                    ))
                })?;
                key.push(IndexColumn {
                    column: idx,
                    descending: ic.descending,
                });
            }
            let mut covering = Vec::with_capacity(group.covering.len());
            for name in group.covering {
                let idx = all_columns.iter().position(|c| c.name == *name).ok_or_else(|| {
                    Error::MalformedRowType(format!(
                        "{type_name}: index `{}` covers unknown column `{}`",
                        group.name, name
                    ))
                })?;
                covering.push(idx);
            }
            Ok(IndexSpec {
                name: group.name.to_string(),
                unique: group.unique,
                key,
                covering,
            })
        };

        let mut alternate_keys = Vec::new();
        for group in T::alternate_keys() {
            alternate_keys.push(resolve_group(group)?);
        }
        let mut secondary_indexes = Vec::new();
        for group in T::secondary_indexes() {
            secondary_indexes.push(resolve_group(group)?);
        }
        reduce_index_sets(&mut alternate_keys);
        reduce_index_sets(&mut secondary_indexes);

        Ok(RowInfo {
            type_name: type_name.to_string(),
            all_columns,
            key_columns,
            value_columns,
            alternate_keys,
            secondary_indexes,
        })
    }
}

/// Drops any index whose (column, direction) sequence is a duplicate or an
/// ordered prefix of another index already kept — an index is redundant
/// once a broader one covers the same leading columns in the same
/// directions, since any lookup the narrower index could serve, the broader
/// one serves too.
fn reduce_index_sets(specs: &mut Vec<IndexSpec>) {
    let mut kept: Vec<IndexSpec> = Vec::with_capacity(specs.len());
    'outer: for spec in specs.drain(..) {
        for existing in &kept {
            if is_key_prefix(&spec.key, &existing.key) {
                continue 'outer;
            }
        }
        kept.retain(|existing| !is_key_prefix(&existing.key, &spec.key));
        kept.push(spec);
    }
    *specs = kept;
}

fn is_key_prefix(shorter: &[IndexColumn], longer: &[IndexColumn]) -> bool {
    if shorter.len() > longer.len() {
        return false;
    }
    shorter
        .iter()
        .zip(longer.iter())
        .all(|(a, b)| a.column == b.column && a.descending == b.descending)
}

type RowInfoCache = Mutex<ahash::AHashMap<TypeId, Arc<RowInfo>>>;

fn cache() -> &'static RowInfoCache {
    static CACHE: OnceLock<RowInfoCache> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(ahash::AHashMap::new()))
}

/// Resolve and cache the `RowInfo` for `T`. Declaration errors are returned
/// on first resolution and are not cached, so a caller can fix the
/// declaration and retry within the same process (useful for tests that
/// construct several ad hoc row types).
pub fn find<T: RowType + 'static>() -> Result<Arc<RowInfo>, Error> {
    let key = TypeId::of::<T>();
    if let Some(info) = cache().lock().get(&key) {
        return Ok(info.clone());
    }
    let info = Arc::new(RowInfo::build::<T>()?);
    cache().lock().insert(key, info.clone());
    Ok(info)
}

/// Test-only escape hatch: global caches must be resettable so repeated test
/// runs in the same process don't observe stale `RowInfo`s for a type
/// defined locally inside a test function (via a locally scoped TypeId that
/// happens to collide across test binaries is not a real risk, but ad hoc
/// redefinition within one test run is).
#[cfg(any(test, feature = "test-util"))]
pub fn clear_row_info_cache() {
    cache().lock().clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Simple;
    impl RowType for Simple {
        fn type_name() -> &'static str {
            "Simple"
        }
        fn columns() -> &'static [ColumnDecl] {
            &[
                ColumnDecl {
                    name: "id",
                    kind: TypeKind::I64,
                    flags: TypeFlags::empty(),
                    primary_key: true,
                    automatic: false,
                },
                ColumnDecl {
                    name: "zebra",
                    kind: TypeKind::Str,
                    flags: TypeFlags::empty(),
                    primary_key: false,
                    automatic: false,
                },
                ColumnDecl {
                    name: "apple",
                    kind: TypeKind::Str,
                    flags: TypeFlags::empty(),
                    primary_key: false,
                    automatic: false,
                },
            ]
        }
    }

    #[test]
    fn value_columns_sorted_by_name() {
        clear_row_info_cache();
        let info = find::<Simple>().unwrap();
        assert_eq!(info.key_columns.len(), 1);
        assert_eq!(info.all_columns[info.key_columns[0]].name, "id");
        let value_names: Vec<_> = info
            .value_columns
            .iter()
            .map(|&i| info.all_columns[i].name.as_str())
            .collect();
        assert_eq!(value_names, vec!["apple", "zebra"]);
    }

    struct NoKey;
    impl RowType for NoKey {
        fn type_name() -> &'static str {
            "NoKey"
        }
        fn columns() -> &'static [ColumnDecl] {
            &[ColumnDecl {
                name: "a",
                kind: TypeKind::I32,
                flags: TypeFlags::empty(),
                primary_key: false,
                automatic: false,
            }]
        }
    }

    #[test]
    fn missing_primary_key_is_malformed() {
        clear_row_info_cache();
        assert!(matches!(find::<NoKey>(), Err(Error::MalformedRowType(_))));
    }

    struct DupName;
    impl RowType for DupName {
        fn type_name() -> &'static str {
            "DupName"
        }
        fn columns() -> &'static [ColumnDecl] {
            &[
                ColumnDecl {
                    name: "a",
                    kind: TypeKind::I32,
                    flags: TypeFlags::empty(),
                    primary_key: true,
                    automatic: false,
                },
                ColumnDecl {
                    name: "a",
                    kind: TypeKind::I32,
                    flags: TypeFlags::empty(),
                    primary_key: false,
                    automatic: false,
                },
            ]
        }
    }

    #[test]
    fn duplicate_column_name_is_malformed() {
        clear_row_info_cache();
        assert!(matches!(find::<DupName>(), Err(Error::MalformedRowType(_))));
    }

    #[test]
    fn index_prefix_reduction_drops_redundant_narrower_index() {
        let mut specs = vec![
            IndexSpec {
                name: "by_a".into(),
                unique: false,
                key: vec![IndexColumn { column: 0, descending: false }],
                covering: vec![],
            },
            IndexSpec {
                name: "by_a_b".into(),
                unique: false,
                key: vec![
                    IndexColumn { column: 0, descending: false },
                    IndexColumn { column: 1, descending: false },
                ],
                covering: vec![],
            },
        ];
        reduce_index_sets(&mut specs);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "by_a_b");
    }
}
