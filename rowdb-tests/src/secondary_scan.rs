//! A struct needing a secondary index declares `RowType` by hand rather
//! than through `#[derive(Row)]` (the derive only ever emits the default,
//! empty `alternate_keys`/`secondary_indexes`), the same pattern
//! `rowdb-core`'s own `join_scan` tests use.

use rowdb::codec::TypeFlags;
use rowdb::row::{GenericRow, RowFields};
use rowdb::schema::{find, ColumnDecl, IndexColumnDecl, IndexGroupDecl, RowType, TypeKind};
use rowdb::value::Value;
use rowdb::Table;
use rowdb::join_scan::{secondary_to_primary_key, IndexKind, JoinedScan};
use rowdb::store::{Isolation, View};
use rowdb_mem::MemView;

struct Employee;

impl RowType for Employee {
    fn type_name() -> &'static str {
        "rowdb_tests::secondary_scan::Employee"
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
                name: "department",
                kind: TypeKind::Str,
                flags: TypeFlags::empty(),
                primary_key: false,
                automatic: false,
            },
        ]
    }

    fn secondary_indexes() -> &'static [IndexGroupDecl] {
        &[IndexGroupDecl {
            name: "by_department",
            unique: false,
            columns: &[IndexColumnDecl {
                column: "department",
                descending: false,
            }],
            covering: &[],
        }]
    }
}

fn build_secondary_entry(info: &rowdb::RowInfo, department: &str, id: i64) -> Vec<u8> {
    let dept_col = info.find_column("department").unwrap();
    let id_col = info.find_column("id").unwrap();
    let dept_codec = info.all_columns[dept_col].kind.key_codec(TypeFlags::empty());
    let id_codec = info.all_columns[id_col].kind.key_codec(TypeFlags::empty());
    let dept_value = Value::Str(Some(department.to_string()));
    let id_value = Value::I64(Some(id));
    let size = dept_codec.encode_size(&dept_value).unwrap() + id_codec.encode_size(&id_value).unwrap();
    let mut buf = vec![0u8; size];
    let offset = dept_codec.encode(&dept_value, &mut buf, 0).unwrap();
    id_codec.encode(&id_value, &mut buf, offset).unwrap();
    buf
}

#[test]
fn joined_scan_recovers_every_row_in_a_department() {
    crate::init_logs();
    let info = find::<Employee>().unwrap();
    let primary = MemView::new();
    let table = Table::new(primary.clone(), info.clone(), 1);

    let dept_col = info.find_column("department").unwrap();
    let id_col = info.find_column("id").unwrap();

    for (id, department) in [(1i64, "eng"), (2, "eng"), (3, "sales")] {
        let mut row = GenericRow::new(&info);
        row.set_value(id_col, Value::I64(Some(id)));
        row.set_value(dept_col, Value::Str(Some(department.to_string())));
        table.insert(&mut row).unwrap();
    }

    let secondary = MemView::new();
    let spec = &info.secondary_indexes[0];
    for (id, department) in [(1i64, "eng"), (2, "eng"), (3, "sales")] {
        let entry_key = build_secondary_entry(&info, department, id);
        secondary.store(&entry_key, &[]).unwrap();
    }

    let mut scan = JoinedScan::new(&secondary, spec, IndexKind::Secondary, &info, &primary, Isolation::ReadCommitted);
    scan.start().unwrap();
    let mut ids = Vec::new();
    while let Some((pk, _value)) = scan.next().unwrap() {
        let decoded = rowdb::encode::decode_primary_key(&info, &pk).unwrap();
        ids.push(decoded[0].1.as_i64().unwrap());
    }
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn joined_scan_skips_an_entry_whose_primary_row_was_deleted_mid_scan() {
    crate::init_logs();
    let info = find::<Employee>().unwrap();
    let primary = MemView::new();
    let table = Table::new(primary.clone(), info.clone(), 1);

    let dept_col = info.find_column("department").unwrap();
    let id_col = info.find_column("id").unwrap();
    let mut row = GenericRow::new(&info);
    row.set_value(id_col, Value::I64(Some(5)));
    row.set_value(dept_col, Value::Str(Some("ops".into())));
    table.insert(&mut row).unwrap();

    let secondary = MemView::new();
    let spec = &info.secondary_indexes[0];
    let entry_key = build_secondary_entry(&info, "ops", 5);
    secondary.store(&entry_key, &[]).unwrap();

    // Simulate a concurrent delete of the primary row discovered between the
    // secondary scan positioning on the entry and joining it back.
    table.delete(&row).unwrap();

    let mut scan = JoinedScan::new(&secondary, spec, IndexKind::Secondary, &info, &primary, Isolation::ReadCommitted);
    scan.start().unwrap();
    assert_eq!(scan.next().unwrap(), None);
}

#[test]
fn secondary_to_primary_key_rebuilds_the_exact_primary_key_bytes() {
    crate::init_logs();
    let info = find::<Employee>().unwrap();
    let spec = &info.secondary_indexes[0];
    let entry_key = build_secondary_entry(&info, "eng", 11);

    let pk = secondary_to_primary_key(&info, spec, &entry_key).unwrap();

    let id_col = info.find_column("id").unwrap();
    let dept_col = info.find_column("department").unwrap();
    let mut row = GenericRow::new(&info);
    row.set_value(id_col, Value::I64(Some(11)));
    row.set_value(dept_col, Value::Str(Some("eng".into())));
    let expected = rowdb::encode::encode_primary_key(&info, &row).unwrap();
    assert_eq!(pk, expected);
}
