//! `Person { id (PK), name, age (nullable), city }` with a `(-city, +name)`
//! secondary index: exercises insert/load/exists, a partial update, and a
//! joined secondary scan over a compound key whose leading column is both
//! descending and variable-length.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rowdb::codec::TypeFlags;
    use rowdb::row::{GenericRow, RowFields};
    use rowdb::schema::{find, ColumnDecl, IndexColumnDecl, IndexGroupDecl, IndexSpec, RowType, TypeKind};
    use rowdb::store::{Isolation, View};
    use rowdb::value::Value;
    use rowdb::{RowInfo, Table};
    use rowdb::join_scan::{secondary_to_primary_key, IndexKind, JoinedScan};
    use rowdb::encode::decode_primary_key;
    use rowdb_mem::MemView;

    struct Person;

    impl RowType for Person {
        fn type_name() -> &'static str {
            "person_scenarios::Person"
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
                    name: "name",
                    kind: TypeKind::Str,
                    flags: TypeFlags::empty(),
                    primary_key: false,
                    automatic: false,
                },
                ColumnDecl {
                    name: "age",
                    kind: TypeKind::I32,
                    flags: TypeFlags::NULLABLE,
                    primary_key: false,
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

        fn secondary_indexes() -> &'static [IndexGroupDecl] {
            &[IndexGroupDecl {
                name: "by_city_name",
                unique: false,
                columns: &[
                    IndexColumnDecl { column: "city", descending: true },
                    IndexColumnDecl { column: "name", descending: false },
                ],
                covering: &[],
            }]
        }
    }

    fn person(info: &RowInfo, id: i64, name: &str, age: Option<i32>, city: &str) -> GenericRow {
        let mut row = GenericRow::new(info);
        row.set_value(info.find_column("id").unwrap(), Value::I64(Some(id)));
        row.set_value(info.find_column("name").unwrap(), Value::Str(Some(name.to_string())));
        row.set_value(info.find_column("age").unwrap(), Value::I32(age));
        row.set_value(info.find_column("city").unwrap(), Value::Str(Some(city.to_string())));
        row
    }

    /// Builds a secondary entry key exactly as a trigger maintaining this
    /// index would: the declared index columns (each with its own sort
    /// direction folded into the column's key codec), followed by whatever
    /// primary-key columns the index doesn't already cover.
    fn build_secondary_entry(info: &RowInfo, spec: &IndexSpec, row: &GenericRow) -> Vec<u8> {
        let mut parts = Vec::new();
        for ic in &spec.key {
            let c = &info.all_columns[ic.column];
            let codec = c.kind.key_codec(c.flags.with_descending(ic.descending));
            parts.push((codec, row.get_value(ic.column)));
        }
        let covered: HashSet<usize> = spec.key.iter().map(|ic| ic.column).collect();
        for &pk_col in &info.key_columns {
            if covered.contains(&pk_col) {
                continue;
            }
            let c = &info.all_columns[pk_col];
            parts.push((c.kind.key_codec(c.flags), row.get_value(pk_col)));
        }
        let size: usize = parts.iter().map(|(codec, v)| codec.encode_size(v).unwrap()).sum();
        let mut buf = vec![0u8; size];
        let mut offset = 0;
        for (codec, value) in &parts {
            offset = codec.encode(value, &mut buf, offset).unwrap();
        }
        buf
    }

    #[test]
    fn insert_and_load_by_primary_key() {
        let info = find::<Person>().unwrap();
        let table = Table::new(MemView::new(), info.clone(), 1);

        let mut row = person(&info, 7, "Ada", Some(36), "London");
        assert!(table.insert(&mut row).unwrap());
        for col in 0..4 {
            assert!(row.state().is_clean(col));
        }

        let mut lookup = person(&info, 7, "", None, "");
        assert!(table.load(&mut lookup).unwrap());
        assert_eq!(lookup.get_value(info.find_column("name").unwrap()), Value::Str(Some("Ada".into())));
        assert_eq!(lookup.get_value(info.find_column("age").unwrap()), Value::I32(Some(36)));
        assert_eq!(lookup.get_value(info.find_column("city").unwrap()), Value::Str(Some("London".into())));
        for col in 0..4 {
            assert!(lookup.state().is_clean(col));
        }

        assert!(table.exists(&row).unwrap());
        let absent = person(&info, 8, "", None, "");
        assert!(!table.exists(&absent).unwrap());
    }

    #[test]
    fn partial_update_touches_only_the_age_column() {
        let info = find::<Person>().unwrap();
        let table = Table::new(MemView::new(), info.clone(), 1);

        let mut row = person(&info, 7, "Ada", Some(36), "London");
        table.insert(&mut row).unwrap();

        let mut patch = GenericRow::new(&info);
        patch.set_value(info.find_column("id").unwrap(), Value::I64(Some(7)));
        patch.set_value(info.find_column("age").unwrap(), Value::I32(Some(37)));
        assert!(table.update(&mut patch).unwrap());

        let mut lookup = person(&info, 7, "", None, "");
        assert!(table.load(&mut lookup).unwrap());
        assert_eq!(lookup.get_value(info.find_column("name").unwrap()), Value::Str(Some("Ada".into())));
        assert_eq!(lookup.get_value(info.find_column("age").unwrap()), Value::I32(Some(37)));
        assert_eq!(lookup.get_value(info.find_column("city").unwrap()), Value::Str(Some("London".into())));
    }

    #[test]
    fn secondary_scan_over_a_two_string_compound_key_returns_city_descending() {
        let info = find::<Person>().unwrap();
        let primary = MemView::new();
        let table = Table::new(primary.clone(), info.clone(), 1);

        let rows = [
            person(&info, 7, "Ada", Some(36), "London"),
            person(&info, 8, "Ada", Some(40), "Paris"),
            person(&info, 9, "Bob", Some(25), "London"),
        ];

        let secondary = MemView::new();
        let spec = &info.secondary_indexes[0];
        for mut row in rows {
            table.insert(&mut row).unwrap();
            let entry_key = build_secondary_entry(&info, spec, &row);
            secondary.store(&entry_key, &[]).unwrap();
        }

        let mut scan = JoinedScan::new(&secondary, spec, IndexKind::Secondary, &info, &primary, Isolation::ReadCommitted);
        scan.start().unwrap();
        let mut ids = Vec::new();
        while let Some((pk, _value)) = scan.next().unwrap() {
            let decoded = decode_primary_key(&info, &pk).unwrap();
            ids.push(decoded[0].1.as_i64().unwrap());
        }
        assert_eq!(ids, vec![8, 7, 9]);

        // Paris sorts first only because the city column is descending;
        // confirm the encoded entry doesn't collide with London's bytes.
        let paris_entry = build_secondary_entry(&info, spec, &person(&info, 8, "Ada", Some(40), "Paris"));
        let london_entry = build_secondary_entry(&info, spec, &person(&info, 7, "Ada", Some(36), "London"));
        assert!(paris_entry < london_entry);
    }

    #[test]
    fn secondary_scan_skips_a_row_deleted_between_position_and_join() {
        let info = find::<Person>().unwrap();
        let primary = MemView::new();
        let table = Table::new(primary.clone(), info.clone(), 1);

        let mut ada_london = person(&info, 7, "Ada", Some(36), "London");
        let mut bob_london = person(&info, 9, "Bob", Some(25), "London");
        table.insert(&mut ada_london).unwrap();
        table.insert(&mut bob_london).unwrap();

        let secondary = MemView::new();
        let spec = &info.secondary_indexes[0];
        secondary.store(&build_secondary_entry(&info, spec, &ada_london), &[]).unwrap();
        secondary.store(&build_secondary_entry(&info, spec, &bob_london), &[]).unwrap();

        // Another transaction deletes id=7 after the secondary entries were
        // written but before this scan joins them back.
        table.delete(&ada_london).unwrap();

        let mut scan = JoinedScan::new(&secondary, spec, IndexKind::Secondary, &info, &primary, Isolation::ReadCommitted);
        scan.start().unwrap();
        let mut ids = Vec::new();
        while let Some((pk, _value)) = scan.next().unwrap() {
            ids.push(decode_primary_key(&info, &pk).unwrap()[0].1.as_i64().unwrap());
        }
        assert_eq!(ids, vec![9]);
    }

    #[test]
    fn secondary_to_primary_key_rebuilds_the_exact_primary_key_bytes() {
        let info = find::<Person>().unwrap();
        let spec = &info.secondary_indexes[0];
        let row = person(&info, 11, "Ada", Some(36), "Rome");
        let entry_key = build_secondary_entry(&info, spec, &row);

        let pk = secondary_to_primary_key(&info, spec, &entry_key).unwrap();
        let expected = rowdb::encode::encode_primary_key(&info, &row).unwrap();
        assert_eq!(pk, expected);
    }
}
