use rowdb::row::RowFields;
use rowdb::schema::find;
use rowdb::state::RowState;
use rowdb::value::Value;
use rowdb::{Row, Table};
use rowdb_mem::MemView;

/// `id` is declared as `i8` so the generator's wraparound kicks in after a
/// couple of inserts, without needing thousands of rows to reach the bound.
#[derive(Row)]
struct Counter {
    #[row(state)]
    state: RowState,
    #[row(key, automatic)]
    id: i8,
    label: String,
}

impl Counter {
    fn unkeyed(label: &str) -> Self {
        Self {
            state: RowState::new(2),
            id: 0,
            label: label.to_string(),
        }
    }
}

#[test]
fn automatic_key_wraps_at_the_column_type_boundary() {
    crate::init_logs();
    let info = find::<Counter>().unwrap();
    let id_col = info.find_column("id").unwrap();
    let table = Table::new(MemView::new(), info.clone(), 1)
        .with_auto_key(id_col, (i8::MAX - 1) as i64)
        .unwrap();

    let mut first = Counter::unkeyed("a");
    assert!(table.insert(&mut first).unwrap());
    assert_eq!(first.id, i8::MAX - 1);

    let mut second = Counter::unkeyed("b");
    assert!(table.insert(&mut second).unwrap());
    assert_eq!(second.id, i8::MAX);

    let mut third = Counter::unkeyed("c");
    assert!(table.insert(&mut third).unwrap());
    assert_eq!(third.id, i8::MIN);
}

#[test]
fn explicitly_set_key_is_left_untouched_by_the_generator() {
    crate::init_logs();
    let info = find::<Counter>().unwrap();
    let id_col = info.find_column("id").unwrap();
    let table = Table::new(MemView::new(), info.clone(), 1)
        .with_auto_key(id_col, 0)
        .unwrap();

    let mut row = Counter::unkeyed("explicit");
    row.set_value(id_col, Value::I8(Some(42)));
    assert!(table.insert(&mut row).unwrap());
    assert_eq!(row.id, 42);

    let mut next = Counter::unkeyed("auto");
    assert!(table.insert(&mut next).unwrap());
    assert_eq!(next.id, 0);
}
