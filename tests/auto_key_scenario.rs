//! `Event { id (PK, automatic [1, 1_000_000)), what }`: two inserts without
//! an explicit id each get a distinct generated id inside the declared
//! range, strictly increasing absent wraparound.

#[cfg(test)]
mod tests {
    use rowdb::row::RowFields;
    use rowdb::schema::find;
    use rowdb::state::RowState;
    use rowdb::value::Value;
    use rowdb::{Row, Table};
    use rowdb_mem::MemView;

    #[derive(Row)]
    struct Event {
        #[row(state)]
        state: RowState,
        #[row(key, automatic)]
        id: i64,
        what: String,
    }

    impl Event {
        fn unkeyed(what: &str) -> Self {
            Self {
                state: RowState::new(2),
                id: 0,
                what: what.to_string(),
            }
        }
    }

    #[test]
    fn two_inserts_get_distinct_increasing_ids_within_the_declared_range() {
        let info = find::<Event>().unwrap();
        let id_col = info.find_column("id").unwrap();
        let table = Table::new(MemView::new(), info.clone(), 1).with_auto_key(id_col, 1).unwrap();

        let mut first = Event::unkeyed("boot");
        assert!(table.insert(&mut first).unwrap());
        let mut second = Event::unkeyed("boot");
        assert!(table.insert(&mut second).unwrap());

        assert_ne!(first.id, second.id);
        assert!((1..1_000_000).contains(&first.id));
        assert!((1..1_000_000).contains(&second.id));
        assert!(second.id > first.id);
    }
}
