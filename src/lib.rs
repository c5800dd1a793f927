//! Facade crate: re-exports the row/index core and its `#[derive(Row)]`
//! macro as a single dependency.
//!
//! A crate using `#[derive(rowdb::Row)]` only needs this dependency: the
//! generated code refers to `::rowdb::...` paths, which this glob
//! re-export resolves straight through to `rowdb-core`'s modules (so
//! `rowdb::codec::TypeFlags`, `rowdb::schema::RowType`, `rowdb::row::RowFields`
//! and so on are all reachable without depending on `rowdb-core` directly).

pub use rowdb_core::*;
pub use rowdb_macros::Row;
