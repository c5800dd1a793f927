use rowdb::row::RowFields;
use rowdb::schema::find;
use rowdb::state::RowState;
use rowdb::value::Value;
use rowdb::{Row, Table};
use rowdb_mem::MemView;

/// Value columns sorted by name land as `a_first, b_middle, c_last`. A
/// patch row only ever sets the columns it's changing -- `b_middle` and
/// whichever of `a_first`/`c_last` isn't touched stay `UNSET` on `patch`
/// itself, and the untouched column's stored bytes are expected to come
/// back unchanged regardless of its position in the column order.
#[derive(Row)]
struct Record {
    #[row(state)]
    state: RowState,
    #[row(key)]
    id: i64,
    a_first: i32,
    b_middle: String,
    c_last: i32,
}

fn stored(info: &rowdb::RowInfo, id: i64, a: i32, b: &str, c: i32) -> Record {
    let mut row = Record {
        state: RowState::new(4),
        id: 0,
        a_first: 0,
        b_middle: String::new(),
        c_last: 0,
    };
    row.set_value(info.find_column("id").unwrap(), Value::I64(Some(id)));
    row.set_value(info.find_column("a_first").unwrap(), Value::I32(Some(a)));
    row.set_value(info.find_column("b_middle").unwrap(), Value::Str(Some(b.to_string())));
    row.set_value(info.find_column("c_last").unwrap(), Value::I32(Some(c)));
    row
}

#[test]
fn partial_update_of_the_last_column_leaves_earlier_columns_untouched() {
    crate::init_logs();
    let info = find::<Record>().unwrap();
    let table = Table::new(MemView::new(), info.clone(), 1);

    let mut row = stored(&info, 1, 10, "mid", 30);
    table.insert(&mut row).unwrap();

    let mut patch = stored(&info, 1, 10, "mid", 30);
    patch.state_mut().reset();
    patch.set_value(info.find_column("id").unwrap(), Value::I64(Some(1)));
    patch.set_value(info.find_column("c_last").unwrap(), Value::I32(Some(999)));
    assert!(table.update(&mut patch).unwrap());

    let mut lookup = stored(&info, 1, 0, "", 0);
    assert!(table.load(&mut lookup).unwrap());
    assert_eq!(lookup.a_first, 10);
    assert_eq!(lookup.b_middle, "mid");
    assert_eq!(lookup.c_last, 999);
}

#[test]
fn partial_update_of_the_first_column_leaves_later_columns_untouched() {
    crate::init_logs();
    let info = find::<Record>().unwrap();
    let table = Table::new(MemView::new(), info.clone(), 1);

    let mut row = stored(&info, 3, 10, "mid", 30);
    table.insert(&mut row).unwrap();

    let mut patch = Record {
        state: RowState::new(4),
        id: 0,
        a_first: 0,
        b_middle: String::new(),
        c_last: 0,
    };
    patch.set_value(info.find_column("id").unwrap(), Value::I64(Some(3)));
    patch.set_value(info.find_column("a_first").unwrap(), Value::I32(Some(-1)));
    assert!(table.update(&mut patch).unwrap());

    let mut lookup = stored(&info, 3, 0, "", 0);
    assert!(table.load(&mut lookup).unwrap());
    assert_eq!(lookup.a_first, -1);
    assert_eq!(lookup.b_middle, "mid");
    assert_eq!(lookup.c_last, 30);
}

#[test]
fn update_on_a_missing_row_is_not_an_error() {
    crate::init_logs();
    let info = find::<Record>().unwrap();
    let table = Table::new(MemView::new(), info.clone(), 1);
    let mut row = stored(&info, 1, 1, "x", 1);
    assert!(!table.update(&mut row).unwrap());
}

#[test]
fn merge_fills_unset_columns_from_the_stored_row() {
    crate::init_logs();
    let info = find::<Record>().unwrap();
    let table = Table::new(MemView::new(), info.clone(), 1);

    let mut row = stored(&info, 2, 1, "first", 2);
    table.insert(&mut row).unwrap();

    let mut patch = Record {
        state: RowState::new(4),
        id: 0,
        a_first: 0,
        b_middle: String::new(),
        c_last: 0,
    };
    patch.set_value(info.find_column("id").unwrap(), Value::I64(Some(2)));
    patch.set_value(info.find_column("a_first").unwrap(), Value::I32(Some(99)));
    assert!(table.merge(&mut patch).unwrap());

    let mut lookup = stored(&info, 2, 0, "", 0);
    assert!(table.load(&mut lookup).unwrap());
    assert_eq!(lookup.a_first, 99);
    assert_eq!(lookup.b_middle, "first");
    assert_eq!(lookup.c_last, 2);
}
