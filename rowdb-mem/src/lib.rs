//! A single in-memory reference backend implementing `rowdb_core::store`'s
//! `View`/`Cursor`/`LockManager`/`Transaction` traits over a
//! `parking_lot::RwLock<BTreeMap<Vec<u8>, Vec<u8>>>`.
//!
//! Grounded on the `weaver` storage example's unbuffered in-memory table
//! (`BTreeMap` guarded by `parking_lot`, atomic auto-increment ids), trimmed
//! to exactly the ordered-store contract this core needs. Concrete
//! persistent backends are out of scope for this workspace; this crate
//! exists to drive `rowdb-core`'s own tests and the `rowdb-tests`/root
//! `tests/` integration suites against something real rather than mocks.

use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use rowdb_core::error::Error;
use rowdb_core::store::{Cursor, Isolation, LockManager, LockMode, Transaction, View};

#[derive(Clone, Default)]
pub struct MemView {
    data: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

pub struct MemCursor {
    data: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
    current: Option<(Vec<u8>, Vec<u8>)>,
}

impl Cursor for MemCursor {
    fn key(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(k, _)| k.as_slice())
    }

    fn value(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(_, v)| v.as_slice())
    }

    fn next(&mut self) -> Result<(), Error> {
        let guard = self.data.read();
        let entry = match &self.current {
            Some((k, _)) => guard
                .range((Bound::Excluded(k.clone()), Bound::Unbounded))
                .next(),
            None => guard.iter().next(),
        };
        self.current = entry.map(|(k, v)| (k.clone(), v.clone()));
        Ok(())
    }

    fn prev(&mut self) -> Result<(), Error> {
        let guard = self.data.read();
        let entry = match &self.current {
            Some((k, _)) => guard.range::<Vec<u8>, _>(..k.clone()).next_back(),
            None => guard.iter().next_back(),
        };
        self.current = entry.map(|(k, v)| (k.clone(), v.clone()));
        Ok(())
    }

    fn find(&mut self, key: &[u8]) -> Result<(), Error> {
        let guard = self.data.read();
        self.current = guard.get(key).map(|v| (key.to_vec(), v.clone()));
        Ok(())
    }

    fn find_ge(&mut self, key: &[u8]) -> Result<(), Error> {
        let guard = self.data.read();
        let entry = guard.range(key.to_vec()..).next();
        self.current = entry.map(|(k, v)| (k.clone(), v.clone()));
        Ok(())
    }
}

impl View for MemView {
    type Cursor = MemCursor;

    fn cursor(&self) -> Self::Cursor {
        MemCursor {
            data: self.data.clone(),
            current: None,
        }
    }

    fn load(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.data.read().get(key).cloned())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, Error> {
        Ok(self.data.read().contains_key(key))
    }

    fn store(&self, key: &[u8], value: &[u8]) -> Result<(), Error> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn insert(&self, key: &[u8], value: &[u8]) -> Result<bool, Error> {
        let mut guard = self.data.write();
        if guard.contains_key(key) {
            return Ok(false);
        }
        guard.insert(key.to_vec(), value.to_vec());
        Ok(true)
    }

    fn delete(&self, key: &[u8]) -> Result<bool, Error> {
        Ok(self.data.write().remove(key).is_some())
    }
}

/// A lock manager sufficient to exercise the core's retry/deadlock paths in
/// tests: a single in-process key set, with no actual blocking or waiting.
/// A real backend would queue waiters and detect cycles; this one simply
/// refuses a second lock on an already-held key.
#[derive(Default)]
pub struct MemLockManager {
    held: Mutex<HashSet<Vec<u8>>>,
}

impl MemLockManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LockManager for MemLockManager {
    fn lock(&self, key: &[u8], _mode: LockMode) -> Result<(), Error> {
        let mut guard = self.held.lock();
        if !guard.insert(key.to_vec()) {
            return Err(Error::LockTimeout(format!("{key:?}")));
        }
        Ok(())
    }

    fn unlock(&self, key: &[u8]) {
        self.held.lock().remove(key);
    }
}

pub struct MemTransaction {
    isolation: Isolation,
}

impl MemTransaction {
    pub fn new(isolation: Isolation) -> Self {
        Self { isolation }
    }
}

impl Transaction for MemTransaction {
    fn isolation(&self) -> Isolation {
        self.isolation
    }

    fn commit(self: Box<Self>) -> Result<(), Error> {
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<(), Error> {
        Ok(())
    }
}
