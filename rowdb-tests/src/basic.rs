use rowdb::row::RowFields;
use rowdb::schema::find;
use rowdb::state::RowState;
use rowdb::value::Value;
use rowdb::{Row, Table};
use rowdb_mem::MemView;

#[derive(Row)]
struct Widget {
    #[row(state)]
    state: RowState,
    #[row(key)]
    id: i64,
    name: Option<String>,
    weight: f32,
}

impl Widget {
    fn new() -> Self {
        Self {
            state: RowState::new(3),
            id: 0,
            name: None,
            weight: 0.0,
        }
    }
}

fn with_id(info: &rowdb::RowInfo, id: i64) -> Widget {
    let mut row = Widget::new();
    row.set_value(info.find_column("id").unwrap(), Value::I64(Some(id)));
    row
}

#[test]
fn insert_then_load_by_primary_key() {
    crate::init_logs();
    let info = find::<Widget>().unwrap();
    let table = Table::new(MemView::new(), info.clone(), 1);

    let mut row = with_id(&info, 1);
    row.set_value(info.find_column("name").unwrap(), Value::Str(Some("gizmo".into())));
    row.set_value(info.find_column("weight").unwrap(), Value::F32(Some(2.5)));
    assert!(table.insert(&mut row).unwrap());

    let mut lookup = with_id(&info, 1);
    assert!(table.load(&mut lookup).unwrap());
    assert_eq!(lookup.name, Some("gizmo".into()));
    assert_eq!(lookup.weight, 2.5);
}

#[test]
fn load_of_absent_row_returns_false() {
    crate::init_logs();
    let info = find::<Widget>().unwrap();
    let table = Table::new(MemView::new(), info.clone(), 1);
    let mut row = with_id(&info, 404);
    assert!(!table.load(&mut row).unwrap());
}

#[test]
fn delete_then_load_finds_nothing() {
    crate::init_logs();
    let info = find::<Widget>().unwrap();
    let table = Table::new(MemView::new(), info.clone(), 1);

    let mut row = with_id(&info, 7);
    table.store(&mut row).unwrap();
    assert!(table.exists(&row).unwrap());

    assert!(table.delete(&row).unwrap());
    assert!(!table.exists(&row).unwrap());
    let mut lookup = with_id(&info, 7);
    assert!(!table.load(&mut lookup).unwrap());
}

#[test]
fn insert_rejects_a_duplicate_primary_key() {
    crate::init_logs();
    let info = find::<Widget>().unwrap();
    let table = Table::new(MemView::new(), info.clone(), 1);

    let mut first = with_id(&info, 1);
    assert!(table.insert(&mut first).unwrap());

    let mut second = with_id(&info, 1);
    assert!(!table.insert(&mut second).unwrap());
}
