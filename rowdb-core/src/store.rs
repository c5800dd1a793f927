//! External storage interfaces: the ordered key/value view,
//! cursor, lock manager, and transaction this core is built against but does
//! not implement. A concrete backend (see `rowdb-mem` for the one reference
//! implementation carried in this workspace) provides these.
//!
//! This core's concurrency comes from the lock manager and the underlying
//! store, not from network I/O, so every trait here is plain and
//! synchronous -- there is nothing for a caller to `.await`.

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Upgradable,
    Exclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Isolation {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// Acquires and releases locks keyed by encoded row key bytes. Implementors
/// decide the granularity (per-key, per-range, per-page); this core only
/// needs the mode contract.
pub trait LockManager: Send + Sync {
    fn lock(&self, key: &[u8], mode: LockMode) -> Result<(), Error>;
    fn unlock(&self, key: &[u8]);
}

/// A movable position over an ordered view's entries.
pub trait Cursor {
    fn key(&self) -> Option<&[u8]>;
    fn value(&self) -> Option<&[u8]>;
    fn next(&mut self) -> Result<(), Error>;
    fn prev(&mut self) -> Result<(), Error>;
    /// Position exactly at `key`, or past it with no current entry if
    /// absent.
    fn find(&mut self, key: &[u8]) -> Result<(), Error>;
    /// Position at the smallest key `>= key`.
    fn find_ge(&mut self, key: &[u8]) -> Result<(), Error>;
}

/// An ordered byte-string key/value space, scoped to one logical table or
/// index. All methods operate within the ambient transaction, if any, that
/// the concrete backend associates with the calling thread/handle.
pub trait View: Send + Sync {
    type Cursor: Cursor;

    fn cursor(&self) -> Self::Cursor;
    fn load(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error>;
    fn exists(&self, key: &[u8]) -> Result<bool, Error>;
    fn store(&self, key: &[u8], value: &[u8]) -> Result<(), Error>;
    /// Stores only if `key` is absent; returns `false` without writing if it
    /// is already present.
    fn insert(&self, key: &[u8], value: &[u8]) -> Result<bool, Error>;
    /// Removes `key`; returns `false` if it was already absent.
    fn delete(&self, key: &[u8]) -> Result<bool, Error>;
}

/// A unit of work across one or more `View`s, with the isolation level
/// governing whether concurrent writers are visible to in-progress scans
/// (relevant to the consistency of a secondary scan joined against the primary view).
pub trait Transaction {
    fn isolation(&self) -> Isolation;
    fn commit(self: Box<Self>) -> Result<(), Error>;
    fn rollback(self: Box<Self>) -> Result<(), Error>;
}
