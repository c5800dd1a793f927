//! The trait a `#[derive(Row)]` struct implements, plus a generic row
//! container used where no concrete struct type is in scope (tests, the
//! in-memory reference backend).
//!
//! A row carries the per-column [`RowState`] bitmap alongside its values,
//! since dirtiness is tracked at the row level rather than inferred from a
//! round trip to the backing store.

use std::sync::Arc;

use crate::schema::RowInfo;
use crate::state::RowState;
use crate::value::Value;

/// Column names shared cheaply across many row instances of the same type.
pub type RowNames = Arc<[String]>;

/// Implemented by generated code for a user row struct: get/set a column's
/// runtime value by its `RowInfo`-assigned index, and expose the per-column
/// dirty-tracking bitmap. This stands in for the per-field accessor/mutator
/// method pairs a reflective language would generate, since Rust has none.
pub trait RowFields {
    fn get_value(&self, column: usize) -> Value;
    fn set_value(&mut self, column: usize, value: Value);
    fn state(&self) -> &RowState;
    fn state_mut(&mut self) -> &mut RowState;
}

/// A row with no associated struct type: values addressed purely by index,
/// used by the in-memory reference backend and by tests that build ad hoc
/// `RowInfo`s.
#[derive(Debug, Clone)]
pub struct GenericRow {
    values: Vec<Value>,
    state: RowState,
}

impl GenericRow {
    pub fn new(info: &RowInfo) -> Self {
        Self {
            values: vec![Value::Null; info.all_columns.len()],
            state: RowState::new(info.all_columns.len()),
        }
    }

    pub fn from_values(info: &RowInfo, values: Vec<Value>) -> Self {
        assert_eq!(values.len(), info.all_columns.len());
        let mut state = RowState::new(info.all_columns.len());
        for i in 0..values.len() {
            if !values[i].is_null() {
                state.set(i, crate::state::CLEAN);
            }
        }
        Self { values, state }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl RowFields for GenericRow {
    fn get_value(&self, column: usize) -> Value {
        self.values[column].clone()
    }

    fn set_value(&mut self, column: usize, value: Value) {
        self.values[column] = value;
        self.state.set(
            column,
            if self.values[column].is_null() {
                crate::state::UNSET
            } else {
                crate::state::DIRTY
            },
        );
    }

    fn state(&self) -> &RowState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RowState {
        &mut self.state
    }
}
