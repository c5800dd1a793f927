//! A row type can't be versioned by re-deriving the same struct (the derive
//! always emits one fixed `RowType`), so the old/new schema pair here is two
//! distinct hand-declared `RowType`s sharing a type name, registered against
//! their respective schema versions through a [`VersionedRegistry`] the way
//! a long-lived table would track its own evolution.

use std::sync::Arc;

use rowdb::codec::TypeFlags;
use rowdb::registry::{SchemaRegistry, VersionedRegistry};
use rowdb::row::GenericRow;
use rowdb::row::RowFields;
use rowdb::schema::{find, ColumnDecl, RowType, TypeKind};
use rowdb::value::Value;
use rowdb::Table;
use rowdb_mem::MemView;

struct AccountV1;
impl RowType for AccountV1 {
    fn type_name() -> &'static str {
        "rowdb_tests::schema_evolution::Account"
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
                name: "balance",
                kind: TypeKind::I64,
                flags: TypeFlags::empty(),
                primary_key: false,
                automatic: false,
            },
        ]
    }
}

struct AccountV2;
impl RowType for AccountV2 {
    fn type_name() -> &'static str {
        "rowdb_tests::schema_evolution::Account"
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
                name: "balance",
                kind: TypeKind::I64,
                flags: TypeFlags::empty(),
                primary_key: false,
                automatic: false,
            },
            ColumnDecl {
                name: "currency",
                kind: TypeKind::Str,
                flags: TypeFlags::NULLABLE,
                primary_key: false,
                automatic: false,
            },
        ]
    }
}

#[test]
fn a_column_added_after_the_row_was_written_decodes_to_its_type_default() {
    crate::init_logs();
    let old_info = find::<AccountV1>().unwrap();
    let new_info = find::<AccountV2>().unwrap();

    let registry: Arc<dyn SchemaRegistry> = Arc::new(VersionedRegistry::new(1, old_info.clone()));

    let view = MemView::new();
    let old_table = Table::new(view.clone(), old_info.clone(), 1);
    let mut row = GenericRow::new(&old_info);
    row.set_value(old_info.find_column("id").unwrap(), Value::I64(Some(1)));
    row.set_value(old_info.find_column("balance").unwrap(), Value::I64(Some(500)));
    old_table.insert(&mut row).unwrap();

    let new_table = Table::new(view, new_info.clone(), 2).with_schema_registry(registry);
    let mut lookup = GenericRow::new(&new_info);
    lookup.set_value(new_info.find_column("id").unwrap(), Value::I64(Some(1)));
    assert!(new_table.load(&mut lookup).unwrap());

    assert_eq!(lookup.get_value(new_info.find_column("balance").unwrap()), Value::I64(Some(500)));
    assert_eq!(lookup.get_value(new_info.find_column("currency").unwrap()), Value::Str(None));
}

#[test]
fn merge_against_an_old_row_fills_the_new_column_from_its_type_default() {
    crate::init_logs();
    let old_info = find::<AccountV1>().unwrap();
    let new_info = find::<AccountV2>().unwrap();

    let registry: Arc<dyn SchemaRegistry> = Arc::new(VersionedRegistry::new(1, old_info.clone()));

    let view = MemView::new();
    let old_table = Table::new(view.clone(), old_info.clone(), 1);
    let mut row = GenericRow::new(&old_info);
    row.set_value(old_info.find_column("id").unwrap(), Value::I64(Some(2)));
    row.set_value(old_info.find_column("balance").unwrap(), Value::I64(Some(50)));
    old_table.insert(&mut row).unwrap();

    let new_table = Table::new(view, new_info.clone(), 2).with_schema_registry(registry);
    let mut patch = GenericRow::new(&new_info);
    patch.set_value(new_info.find_column("id").unwrap(), Value::I64(Some(2)));
    patch.set_value(new_info.find_column("balance").unwrap(), Value::I64(Some(75)));
    assert!(new_table.merge(&mut patch).unwrap());

    let mut lookup = GenericRow::new(&new_info);
    lookup.set_value(new_info.find_column("id").unwrap(), Value::I64(Some(2)));
    assert!(new_table.load(&mut lookup).unwrap());
    assert_eq!(lookup.get_value(new_info.find_column("balance").unwrap()), Value::I64(Some(75)));
    assert_eq!(lookup.get_value(new_info.find_column("currency").unwrap()), Value::Str(None));
}

#[test]
fn writing_through_the_new_schema_then_reading_through_it_again_roundtrips() {
    crate::init_logs();
    let new_info = find::<AccountV2>().unwrap();
    let table = Table::new(MemView::new(), new_info.clone(), 2);

    let mut row = GenericRow::new(&new_info);
    row.set_value(new_info.find_column("id").unwrap(), Value::I64(Some(9)));
    row.set_value(new_info.find_column("balance").unwrap(), Value::I64(Some(10)));
    row.set_value(new_info.find_column("currency").unwrap(), Value::Str(Some("usd".into())));
    table.insert(&mut row).unwrap();

    let mut lookup = GenericRow::new(&new_info);
    lookup.set_value(new_info.find_column("id").unwrap(), Value::I64(Some(9)));
    assert!(table.load(&mut lookup).unwrap());
    assert_eq!(
        lookup.get_value(new_info.find_column("currency").unwrap()),
        Value::Str(Some("usd".into()))
    );
}
