//! Scenario 6: `Person` persisted at schema v1, then re-declared with an
//! added nullable `country` value column; loading the old row through the
//! new schema yields `country=null`, with that column's state CLEAN (a
//! defaulted value, not UNSET) rather than erroring.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rowdb::codec::TypeFlags;
    use rowdb::registry::{SchemaRegistry, VersionedRegistry};
    use rowdb::row::{GenericRow, RowFields};
    use rowdb::schema::{find, ColumnDecl, RowType, TypeKind};
    use rowdb::value::Value;
    use rowdb::Table;
    use rowdb_mem::MemView;

    struct PersonV1;
    impl RowType for PersonV1 {
        fn type_name() -> &'static str {
            "schema_evolution_scenario::Person"
        }
        fn columns() -> &'static [ColumnDecl] {
            &[
                ColumnDecl { name: "id", kind: TypeKind::I64, flags: TypeFlags::empty(), primary_key: true, automatic: false },
                ColumnDecl { name: "name", kind: TypeKind::Str, flags: TypeFlags::empty(), primary_key: false, automatic: false },
                ColumnDecl { name: "age", kind: TypeKind::I32, flags: TypeFlags::NULLABLE, primary_key: false, automatic: false },
                ColumnDecl { name: "city", kind: TypeKind::Str, flags: TypeFlags::empty(), primary_key: false, automatic: false },
            ]
        }
    }

    struct PersonV2;
    impl RowType for PersonV2 {
        fn type_name() -> &'static str {
            "schema_evolution_scenario::Person"
        }
        fn columns() -> &'static [ColumnDecl] {
            &[
                ColumnDecl { name: "id", kind: TypeKind::I64, flags: TypeFlags::empty(), primary_key: true, automatic: false },
                ColumnDecl { name: "name", kind: TypeKind::Str, flags: TypeFlags::empty(), primary_key: false, automatic: false },
                ColumnDecl { name: "age", kind: TypeKind::I32, flags: TypeFlags::NULLABLE, primary_key: false, automatic: false },
                ColumnDecl { name: "city", kind: TypeKind::Str, flags: TypeFlags::empty(), primary_key: false, automatic: false },
                ColumnDecl { name: "country", kind: TypeKind::Str, flags: TypeFlags::NULLABLE, primary_key: false, automatic: false },
            ]
        }
    }

    #[test]
    fn loading_an_old_row_through_the_new_schema_defaults_country_to_clean_null() {
        let old_info = find::<PersonV1>().unwrap();
        let new_info = find::<PersonV2>().unwrap();

        let view = MemView::new();
        let old_table = Table::new(view.clone(), old_info.clone(), 1);
        let mut row = GenericRow::new(&old_info);
        row.set_value(old_info.find_column("id").unwrap(), Value::I64(Some(7)));
        row.set_value(old_info.find_column("name").unwrap(), Value::Str(Some("Ada".into())));
        row.set_value(old_info.find_column("age").unwrap(), Value::I32(Some(36)));
        row.set_value(old_info.find_column("city").unwrap(), Value::Str(Some("London".into())));
        old_table.insert(&mut row).unwrap();

        let registry: Arc<dyn SchemaRegistry> = Arc::new(VersionedRegistry::new(1, old_info.clone()));
        let new_table = Table::new(view, new_info.clone(), 2).with_schema_registry(registry);

        let mut lookup = GenericRow::new(&new_info);
        lookup.set_value(new_info.find_column("id").unwrap(), Value::I64(Some(7)));
        assert!(new_table.load(&mut lookup).unwrap());

        assert_eq!(lookup.get_value(new_info.find_column("name").unwrap()), Value::Str(Some("Ada".into())));
        assert_eq!(lookup.get_value(new_info.find_column("age").unwrap()), Value::I32(Some(36)));
        assert_eq!(lookup.get_value(new_info.find_column("city").unwrap()), Value::Str(Some("London".into())));

        let country_col = new_info.find_column("country").unwrap();
        assert_eq!(lookup.get_value(country_col), Value::Str(None));
        assert!(lookup.state().is_clean(country_col));
    }
}
