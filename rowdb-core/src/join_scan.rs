//! Secondary/joined scan (component C8): walking a secondary index or
//! alternate key and joining each entry back to its primary row.
//!
//! The scan is a small explicit state machine rather than a single loop
//! body, since each step (advance the index cursor, derive the primary
//! key, load the primary row, decide whether the join is still consistent)
//! can each independently need to retry or bail without re-entering the
//! whole `next()` call.

use ahash::{AHashMap, AHashSet};

use crate::encode::{decode_primary_key, decode_value, encode_primary_key};
use crate::error::Error;
use crate::row::GenericRow;
use crate::row::RowFields;
use crate::schema::{IndexSpec, RowInfo};
use crate::store::{Cursor, Isolation, View};
use crate::table::Table;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// A non-unique secondary index: its entry key is the declared index
    /// columns followed by whatever primary key columns aren't already
    /// part of it, so that entries stay unique even when the index columns
    /// repeat across rows.
    Secondary,
    /// A unique alternate key: its entry value is the encoded primary key
    /// of the row it identifies.
    Alternate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// The index cursor sits on an entry not yet joined.
    Positioned,
    /// The current entry's primary key has been derived but not yet
    /// loaded/validated.
    NeedJoin,
    /// The current entry was joined and returned to the caller.
    Emitted,
    Done,
}

/// Decode the secondary key's own declared index columns from `entry_key`,
/// in declaration order. Used both to recover a plain secondary entry's
/// uncovered primary-key suffix and to re-verify a joined row's indexed
/// columns against what the entry actually encodes.
fn decode_index_key_columns(
    primary_info: &RowInfo,
    spec: &IndexSpec,
    entry_key: &[u8],
) -> Result<(AHashMap<usize, Value>, usize), Error> {
    let mut offset = 0;
    let mut decoded: AHashMap<usize, Value> = AHashMap::new();
    for ic in &spec.key {
        let c = &primary_info.all_columns[ic.column];
        let flags = c.flags.with_descending(ic.descending);
        let codec = c.kind.key_codec(flags);
        let (value, new_offset) = codec.decode(entry_key, offset).map_err(Error::CorruptEncoding)?;
        offset = new_offset;
        decoded.insert(ic.column, value);
    }
    Ok((decoded, offset))
}

/// Recover the primary key bytes a secondary index entry refers to.
pub fn secondary_to_primary_key(
    primary_info: &RowInfo,
    spec: &IndexSpec,
    entry_key: &[u8],
) -> Result<Vec<u8>, Error> {
    let (mut decoded, mut offset) = decode_index_key_columns(primary_info, spec, entry_key)?;
    let covered: AHashSet<usize> = spec.key.iter().map(|ic| ic.column).collect();
    for &pk_col in &primary_info.key_columns {
        if covered.contains(&pk_col) {
            continue;
        }
        let c = &primary_info.all_columns[pk_col];
        let codec = c.kind.key_codec(c.flags);
        let (value, new_offset) = codec.decode(entry_key, offset).map_err(Error::CorruptEncoding)?;
        offset = new_offset;
        decoded.insert(pk_col, value);
    }

    let mut row = GenericRow::new(primary_info);
    for &pk_col in &primary_info.key_columns {
        if let Some(v) = decoded.get(&pk_col) {
            row.set_value(pk_col, v.clone());
        }
    }
    encode_primary_key(primary_info, &row)
}

/// Recover the primary key bytes an alternate-key entry refers to: stored
/// directly as the entry's value.
pub fn alternate_to_primary_key(entry_value: &[u8]) -> Vec<u8> {
    entry_value.to_vec()
}

/// The secondary-vs-primary consistency check (§4.8 step 4): re-derive each
/// indexed column from the entry itself and compare it against the primary
/// row that was just loaded for this entry's key, filtering out a stale
/// entry (one pointing at a row whose indexed columns have since changed
/// but whose index entry hasn't been cleaned up yet) rather than joining it
/// to the wrong row.
///
/// A plain secondary index only ever indexes value columns plus whatever
/// primary-key columns it didn't already cover, and those primary-key
/// columns are verified for free by the key join itself, so only the value
/// columns are re-checked (and would be the only ones restored on a
/// mismatch, were there a persistent row to restore). An alternate key's
/// declared columns are checked in full, key columns included, since there
/// is no separate join step establishing their correctness.
fn check_consistency(
    primary_info: &RowInfo,
    spec: &IndexSpec,
    kind: IndexKind,
    entry_key: &[u8],
    primary_key: &[u8],
    primary_value: &[u8],
) -> Result<bool, Error> {
    let (from_entry, _) = decode_index_key_columns(primary_info, spec, entry_key)?;
    let from_value = decode_value(primary_info, primary_info, primary_value)?;
    let mut from_pk: Option<Vec<(usize, Value)>> = None;

    for ic in &spec.key {
        let col = ic.column;
        let is_pk_column = primary_info.key_columns.contains(&col);
        if kind == IndexKind::Secondary && is_pk_column {
            continue;
        }
        let Some(expected) = from_entry.get(&col) else {
            continue;
        };
        let actual = if is_pk_column {
            let decoded = match &from_pk {
                Some(d) => d,
                None => {
                    from_pk = Some(decode_primary_key(primary_info, primary_key)?);
                    from_pk.as_ref().unwrap()
                }
            };
            decoded.iter().find(|(c, _)| *c == col).map(|(_, v)| v)
        } else {
            from_value.iter().find(|(c, _)| *c == col).map(|(_, v)| v)
        };
        if actual != Some(expected) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Walks a secondary index or alternate key view, joining each entry back
/// to the primary row it names.
pub struct JoinedScan<'a, SV: View, PV: View> {
    cursor: SV::Cursor,
    spec: &'a IndexSpec,
    kind: IndexKind,
    primary_info: &'a RowInfo,
    primary_view: &'a PV,
    isolation: Isolation,
    state: ScanState,
}

impl<'a, SV: View, PV: View> JoinedScan<'a, SV, PV> {
    pub fn new(
        secondary_view: &'a SV,
        spec: &'a IndexSpec,
        kind: IndexKind,
        primary_info: &'a RowInfo,
        primary_view: &'a PV,
        isolation: Isolation,
    ) -> Self {
        Self {
            cursor: secondary_view.cursor(),
            spec,
            kind,
            primary_info,
            primary_view,
            isolation,
            state: ScanState::Done,
        }
    }

    pub fn start(&mut self) -> Result<(), Error> {
        self.cursor.next()?;
        self.state = if self.cursor.key().is_some() {
            ScanState::Positioned
        } else {
            ScanState::Done
        };
        Ok(())
    }

    /// Advance to the next secondary entry whose primary row still exists,
    /// returning its primary key and encoded value. A secondary entry whose
    /// primary row has since been deleted is a normal, expected race under
    /// `ReadCommitted` (the scan doesn't hold a lock across the whole walk)
    /// and is silently skipped rather than surfaced as
    /// [`Error::ConcurrentSchemaChange`] or similar; only a caller asking
    /// for `Serializable` isolation should ever observe that race as an
    /// error, and this core leaves enforcing that to the lock manager, not
    /// this scan.
    pub fn next(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>, Error> {
        loop {
            match self.state {
                ScanState::Done => return Ok(None),
                ScanState::Emitted => {
                    self.cursor.next()?;
                    self.state = if self.cursor.key().is_some() {
                        ScanState::Positioned
                    } else {
                        ScanState::Done
                    };
                }
                ScanState::Positioned => {
                    self.state = ScanState::NeedJoin;
                }
                ScanState::NeedJoin => {
                    let entry_key = self.cursor.key().expect("Positioned implies a current entry").to_vec();
                    let entry_value = self.cursor.value().unwrap_or(&[]).to_vec();
                    let primary_key = match self.kind {
                        IndexKind::Secondary => secondary_to_primary_key(self.primary_info, self.spec, &entry_key)?,
                        IndexKind::Alternate => alternate_to_primary_key(&entry_value),
                    };
                    match self.primary_view.load(&primary_key)? {
                        Some(primary_value) => {
                            self.state = ScanState::Emitted;
                            if !check_consistency(
                                self.primary_info,
                                self.spec,
                                self.kind,
                                &entry_key,
                                &primary_key,
                                &primary_value,
                            )? {
                                continue;
                            }
                            return Ok(Some((primary_key, primary_value)));
                        }
                        None => {
                            self.state = ScanState::Emitted;
                            continue;
                        }
                    }
                }
            }
        }
    }

    pub fn isolation(&self) -> Isolation {
        self.isolation
    }
}

/// Secondary indexes and alternate keys are read-only: any write discovered
/// while iterating a join must be routed back through the primary table
/// rather than applied to the index view directly, since the index's own
/// entries are derived, not authoritative.
pub fn route_update_through_primary<V: View, R: RowFields>(
    primary_table: &Table<V>,
    row: &mut R,
) -> Result<bool, Error> {
    primary_table.update(row)
}

/// Returns the error a direct write attempt against a secondary/alternate
/// view should produce.
pub fn unmodifiable_view_error(name: &str) -> Error {
    Error::UnmodifiableView(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::TypeFlags;
    use crate::schema::{clear_row_info_cache, find, ColumnDecl, IndexColumn, RowType, TypeKind};
    use crate::table::Table;
    use rowdb_mem::MemView;

    struct Person;
    impl RowType for Person {
        fn type_name() -> &'static str {
            "join_scan_tests::Person"
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
                    name: "city",
                    kind: TypeKind::Str,
                    flags: TypeFlags::empty(),
                    primary_key: false,
                    automatic: false,
                },
            ]
        }
    }

    #[test]
    fn secondary_to_primary_key_recovers_pk_suffix() {
        clear_row_info_cache();
        let info = find::<Person>().unwrap();
        let city_col = info.find_column("city").unwrap();
        let id_col = info.find_column("id").unwrap();
        let spec = IndexSpec {
            name: "by_city".into(),
            unique: false,
            key: vec![IndexColumn {
                column: city_col,
                descending: false,
            }],
            covering: vec![],
        };

        let mut row = GenericRow::new(&info);
        row.set_value(id_col, Value::I64(Some(7)));
        row.set_value(city_col, Value::Str(Some("nyc".into())));

        // Build the index entry key exactly as a secondary index would:
        // index columns, then uncovered pk columns.
        let city_codec = info.all_columns[city_col].kind.key_codec(TypeFlags::empty());
        let id_codec = info.all_columns[id_col].kind.key_codec(TypeFlags::empty());
        let mut entry_key = Vec::new();
        let size = city_codec.encode_size(&Value::Str(Some("nyc".into()))).unwrap()
            + id_codec.encode_size(&Value::I64(Some(7))).unwrap();
        entry_key.resize(size, 0);
        let offset = city_codec
            .encode(&Value::Str(Some("nyc".into())), &mut entry_key, 0)
            .unwrap();
        id_codec.encode(&Value::I64(Some(7)), &mut entry_key, offset).unwrap();

        let pk = secondary_to_primary_key(&info, &spec, &entry_key).unwrap();
        let expected = encode_primary_key(&info, &row).unwrap();
        assert_eq!(pk, expected);
    }

    #[test]
    fn joined_scan_skips_entries_whose_primary_row_is_gone() {
        clear_row_info_cache();
        let info = find::<Person>().unwrap();
        let primary = MemView::new();
        let table = Table::new(primary.clone(), info.clone(), 1);

        let mut row = GenericRow::new(&info);
        row.set_value(0, Value::I64(Some(1)));
        row.set_value(1, Value::Str(Some("nyc".into())));
        table.insert(&mut row).unwrap();

        let secondary = MemView::new();
        let id_col = info.find_column("id").unwrap();
        let city_col = info.find_column("city").unwrap();
        let spec = IndexSpec {
            name: "by_city".into(),
            unique: false,
            key: vec![IndexColumn {
                column: city_col,
                descending: false,
            }],
            covering: vec![],
        };
        let pk = crate::encode::encode_primary_key(&info, &row).unwrap();
        let city_codec = info.all_columns[city_col].kind.key_codec(TypeFlags::empty());
        let id_codec = info.all_columns[id_col].kind.key_codec(TypeFlags::empty());
        let mut entry_key = vec![0u8; city_codec.encode_size(&Value::Str(Some("nyc".into()))).unwrap() + pk.len()];
        let offset = city_codec
            .encode(&Value::Str(Some("nyc".into())), &mut entry_key, 0)
            .unwrap();
        id_codec.encode(&Value::I64(Some(1)), &mut entry_key, offset).unwrap();
        secondary.store(&entry_key, &[]).unwrap();

        // Delete the primary row so the secondary entry is now stale.
        table.delete(&row).unwrap();

        let mut scan = JoinedScan::new(
            &secondary,
            &spec,
            IndexKind::Secondary,
            &info,
            &primary,
            Isolation::ReadCommitted,
        );
        scan.start().unwrap();
        assert_eq!(scan.next().unwrap(), None);
    }

    #[test]
    fn joined_scan_filters_an_entry_whose_indexed_column_no_longer_matches() {
        clear_row_info_cache();
        let info = find::<Person>().unwrap();
        let primary = MemView::new();
        let table = Table::new(primary.clone(), info.clone(), 1);

        let mut row = GenericRow::new(&info);
        row.set_value(0, Value::I64(Some(1)));
        row.set_value(1, Value::Str(Some("nyc".into())));
        table.insert(&mut row).unwrap();

        let secondary = MemView::new();
        let id_col = info.find_column("id").unwrap();
        let city_col = info.find_column("city").unwrap();
        let spec = IndexSpec {
            name: "by_city".into(),
            unique: false,
            key: vec![IndexColumn {
                column: city_col,
                descending: false,
            }],
            covering: vec![],
        };
        let pk = crate::encode::encode_primary_key(&info, &row).unwrap();
        let city_codec = info.all_columns[city_col].kind.key_codec(TypeFlags::empty());
        let id_codec = info.all_columns[id_col].kind.key_codec(TypeFlags::empty());
        // Stale entry: still keyed under "sf", even though the row's city
        // was since changed (here: was always "nyc") without the index
        // entry being cleaned up.
        let mut entry_key = vec![0u8; city_codec.encode_size(&Value::Str(Some("sf".into()))).unwrap() + pk.len()];
        let offset = city_codec
            .encode(&Value::Str(Some("sf".into())), &mut entry_key, 0)
            .unwrap();
        id_codec.encode(&Value::I64(Some(1)), &mut entry_key, offset).unwrap();
        secondary.store(&entry_key, &[]).unwrap();

        let mut scan = JoinedScan::new(
            &secondary,
            &spec,
            IndexKind::Secondary,
            &info,
            &primary,
            Isolation::ReadCommitted,
        );
        scan.start().unwrap();
        assert_eq!(scan.next().unwrap(), None);
    }
}
