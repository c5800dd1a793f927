//! Primary table operations (component C7): the load/store family built on
//! top of the codec, schema, state, encode, transform, and trigger pieces.
//!
//! `load` returns whether the row existed, `insert`/`update` return whether
//! the write took effect, and `store` is an unconditional upsert -- plain
//! synchronous methods, since there is no network round trip to await.

use std::sync::Arc;

use crate::encode::{decode_value, encode_primary_key, encode_value, read_schema_version};
use crate::error::Error;
use crate::key_gen::AutoKeyGenerator;
use crate::registry::SchemaRegistry;
use crate::row::RowFields;
use crate::schema::RowInfo;
use crate::state::DIRTY;
use crate::store::View;
use crate::transform::transform_update;
use crate::trigger::{with_trigger, TriggerSlot};

/// A primary table: one `View` holding `RowInfo`-encoded rows keyed by
/// their primary key.
pub struct Table<V: View> {
    view: V,
    info: Arc<RowInfo>,
    schema_version: u32,
    trigger: TriggerSlot,
    auto_key: Option<(usize, AutoKeyGenerator)>,
    registry: Option<Arc<dyn SchemaRegistry>>,
}

impl<V: View> Table<V> {
    pub fn new(view: V, info: Arc<RowInfo>, schema_version: u32) -> Self {
        Self {
            view,
            info,
            schema_version,
            trigger: TriggerSlot::new(),
            auto_key: None,
            registry: None,
        }
    }

    /// Attach an automatic-key generator to `column` (must be a primary key
    /// column marked `automatic` in its declaration).
    pub fn with_auto_key(mut self, column: usize, start: i64) -> Result<Self, Error> {
        let c = &self.info.all_columns[column];
        let gen = AutoKeyGenerator::new(c.kind, start)?;
        self.auto_key = Some((column, gen));
        Ok(self)
    }

    /// Attach a schema registry, letting `load`/`merge` resolve the `RowInfo`
    /// a stored entry was actually encoded against (from the schema version
    /// prefix) instead of assuming every stored entry matches this table's
    /// current schema.
    pub fn with_schema_registry(mut self, registry: Arc<dyn SchemaRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// The `RowInfo` a stored entry was encoded against: resolved through the
    /// registry when one is attached, otherwise assumed to be this table's
    /// own current schema.
    fn stored_info_for(&self, bytes: &[u8]) -> Result<Arc<RowInfo>, Error> {
        match &self.registry {
            Some(registry) => {
                let (version, _) = read_schema_version(bytes)?;
                registry.row_info_for_version(version)
            }
            None => Ok(self.info.clone()),
        }
    }

    pub fn info(&self) -> &Arc<RowInfo> {
        &self.info
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn trigger_slot(&self) -> &TriggerSlot {
        &self.trigger
    }

    fn assign_auto_key<R: RowFields>(&self, row: &mut R) {
        if let Some((col, gen)) = &self.auto_key {
            if row.state().is_unset(*col) {
                let v = gen.next_value();
                row.set_value(*col, v);
                row.state_mut().set(*col, crate::state::CLEAN);
            }
        }
    }

    /// Every column (key and value) must be set -- clean or dirty -- before
    /// a full encode. Returns the offending column names rather than just
    /// failing the first codec call, so callers see the whole gap at once.
    fn require_all_set<R: RowFields>(&self, row: &R) -> Result<(), Error> {
        let missing: Vec<&str> = (0..self.info.all_columns.len())
            .filter(|&c| row.state().is_unset(c))
            .map(|c| self.info.all_columns[c].name.as_str())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::RequiredColumnUnset(missing.join(", ")))
        }
    }

    fn apply_decoded_value<R: RowFields>(&self, row: &mut R, bytes: &[u8]) -> Result<(), Error> {
        let stored_info = self.stored_info_for(bytes)?;
        let decoded = decode_value(&self.info, &stored_info, bytes)?;
        for (col, value) in decoded {
            row.set_value(col, value);
            row.state_mut().set(col, crate::state::CLEAN);
        }
        Ok(())
    }

    /// Load the row matching `row`'s current primary key columns. Returns
    /// `false` (not an error -- a missing row is a normal outcome) when nothing
    /// matches.
    pub fn load<R: RowFields>(&self, row: &mut R) -> Result<bool, Error> {
        let key = encode_primary_key(&self.info, row)?;
        match self.view.load(&key)? {
            Some(bytes) => {
                self.apply_decoded_value(row, &bytes)?;
                for &c in &self.info.key_columns {
                    row.state_mut().set(c, crate::state::CLEAN);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn exists<R: RowFields>(&self, row: &R) -> Result<bool, Error> {
        let key = encode_primary_key(&self.info, row)?;
        self.view.exists(&key)
    }

    /// Unconditional upsert.
    pub fn store<R: RowFields>(&self, row: &mut R) -> Result<(), Error> {
        self.assign_auto_key(row);
        self.require_all_set(row)?;
        let key = encode_primary_key(&self.info, row)?;
        let value = encode_value(&self.info, self.schema_version, row)?;
        let old = self.view.load(&key)?;
        self.view.store(&key, &value)?;
        with_trigger(&self.trigger, |t| {
            if let Some(t) = t {
                t.store(&key, old.as_deref(), &value)?;
            }
            Ok(())
        })?;
        row.state_mut().mark_all_clean();
        Ok(())
    }

    /// Write only if no row with this key already exists.
    pub fn insert<R: RowFields>(&self, row: &mut R) -> Result<bool, Error> {
        self.assign_auto_key(row);
        self.require_all_set(row)?;
        let key = encode_primary_key(&self.info, row)?;
        let value = encode_value(&self.info, self.schema_version, row)?;
        let inserted = self.view.insert(&key, &value)?;
        if inserted {
            with_trigger(&self.trigger, |t| {
                if let Some(t) = t {
                    t.insert(&key, &value)?;
                }
                Ok(())
            })?;
            row.state_mut().mark_all_clean();
        }
        Ok(inserted)
    }

    /// Write only if a row with this key already exists.
    pub fn replace<R: RowFields>(&self, row: &mut R) -> Result<bool, Error> {
        self.require_all_set(row)?;
        let key = encode_primary_key(&self.info, row)?;
        let old = self.view.load(&key)?;
        if old.is_none() {
            return Ok(false);
        }
        let value = encode_value(&self.info, self.schema_version, row)?;
        self.view.store(&key, &value)?;
        with_trigger(&self.trigger, |t| {
            if let Some(t) = t {
                t.store(&key, old.as_deref(), &value)?;
            }
            Ok(())
        })?;
        row.state_mut().mark_all_clean();
        Ok(true)
    }

    /// Unconditional upsert that returns the row's previous contents, if
    /// any.
    pub fn exchange<R: RowFields + Default>(&self, row: &mut R) -> Result<Option<R>, Error> {
        self.require_all_set(row)?;
        let key = encode_primary_key(&self.info, row)?;
        let old_bytes = self.view.load(&key)?;
        let value = encode_value(&self.info, self.schema_version, row)?;
        self.view.store(&key, &value)?;
        with_trigger(&self.trigger, |t| {
            if let Some(t) = t {
                t.store(&key, old_bytes.as_deref(), &value)?;
            }
            Ok(())
        })?;
        row.state_mut().mark_all_clean();
        match old_bytes {
            Some(bytes) => {
                let mut old_row = R::default();
                for &c in &self.info.key_columns {
                    old_row.set_value(c, row.get_value(c));
                    old_row.state_mut().set(c, crate::state::CLEAN);
                }
                self.apply_decoded_value(&mut old_row, &bytes)?;
                Ok(Some(old_row))
            }
            None => Ok(None),
        }
    }

    /// Partial update: only `row`'s dirty value columns are applied,
    /// reusing the rest of the stored entry's bytes. Fails silently (`Ok
    /// (false)`) if the row doesn't exist, matching `NoSuchRow`'s "not an
    /// error" status. If every column is already CLEAN, the stored entry is
    /// left untouched and only the trigger path runs.
    pub fn update<R: RowFields>(&self, row: &mut R) -> Result<bool, Error> {
        let key = encode_primary_key(&self.info, row)?;
        let Some(original) = self.view.load(&key)? else {
            return Ok(false);
        };
        if !row.state().check_any_dirty(self.info.value_columns.iter().copied()) {
            with_trigger(&self.trigger, |t| {
                if let Some(t) = t {
                    t.store(&key, Some(&original), &original)?;
                }
                Ok(())
            })?;
            row.state_mut().mark_all_undirty();
            return Ok(true);
        }
        let updated = transform_update(&self.info, self.schema_version, &original, row)?;
        self.view.store(&key, &updated)?;
        with_trigger(&self.trigger, |t| {
            if let Some(t) = t {
                t.store(&key, Some(&original), &updated)?;
            }
            Ok(())
        })?;
        row.state_mut().mark_all_undirty();
        Ok(true)
    }

    /// Like [`Table::update`], but columns `row` left unset are filled in
    /// from the stored row rather than left at their type default, so a
    /// caller can build a sparse patch without first loading the row.
    pub fn merge<R: RowFields>(&self, row: &mut R) -> Result<bool, Error> {
        let key = encode_primary_key(&self.info, row)?;
        let Some(original) = self.view.load(&key)? else {
            return Ok(false);
        };
        let stored_info = self.stored_info_for(&original)?;
        let existing = decode_value(&self.info, &stored_info, &original)?;
        for (col, value) in existing {
            if row.state().get(col) != DIRTY {
                row.set_value(col, value);
                row.state_mut().set(col, crate::state::CLEAN);
            }
        }
        let merged = encode_value(&self.info, self.schema_version, row)?;
        self.view.store(&key, &merged)?;
        with_trigger(&self.trigger, |t| {
            if let Some(t) = t {
                t.store(&key, Some(&original), &merged)?;
            }
            Ok(())
        })?;
        row.state_mut().mark_all_clean();
        Ok(true)
    }

    pub fn delete<R: RowFields>(&self, row: &R) -> Result<bool, Error> {
        let key = encode_primary_key(&self.info, row)?;
        let Some(old) = self.view.load(&key)? else {
            return Ok(false);
        };
        let deleted = self.view.delete(&key)?;
        if deleted {
            with_trigger(&self.trigger, |t| {
                if let Some(t) = t {
                    t.delete(&key, &old)?;
                }
                Ok(())
            })?;
        }
        Ok(deleted)
    }

    /// Wipe a row instance's tracked state back to blank, for reuse with a
    /// fresh primary key (e.g. iterating a batch of inserts with one
    /// stack-allocated row).
    pub fn reset<R: RowFields>(&self, row: &mut R) {
        row.state_mut().reset();
    }
}
