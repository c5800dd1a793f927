//! Core row/index subsystem for an embedded ordered key/value store:
//! column codecs, row schema resolution, per-column dirty tracking, the
//! encode/decode and partial-update pipelines, copy-on-write triggers, the
//! primary table operations, and joined secondary/alternate-key scans.
//!
//! No concrete storage backend lives here; see `rowdb-mem` for the one
//! reference implementation of [`store::View`] this workspace carries.

pub mod codec;
pub mod encode;
pub mod error;
pub mod join_scan;
pub mod key_gen;
pub mod registry;
pub mod row;
pub mod schema;
pub mod state;
pub mod store;
pub mod table;
pub mod transform;
pub mod trigger;
pub mod value;

pub use error::{Error, Result};
pub use row::{GenericRow, RowFields, RowNames};
pub use schema::{find, ColumnDecl, IndexColumnDecl, IndexGroupDecl, RowInfo, RowType, TypeKind};
pub use table::Table;
pub use value::Value;
