//! Copy-on-write trigger protocol (component C6): an optional observer
//! attached to a table that is notified of inserts/stores/deletes, swapped
//! in and out without blocking readers of the current trigger.
//!
//! Grounded on the nearcore/SpacetimeDB use of `arc_swap::ArcSwap` for a
//! shared pointer many readers dereference concurrently while a writer
//! occasionally replaces it wholesale -- exactly the shape of "install a new
//! trigger, let in-flight operations finish against the old one".

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    /// The trigger runs normally.
    Active,
    /// The trigger is installed but intentionally not invoked (e.g. during
    /// bulk load).
    Skip,
    /// The trigger is mid-replacement; callers must retry rather than run
    /// it or treat it as absent.
    Disabled,
}

pub trait Trigger: Send + Sync {
    fn mode(&self) -> TriggerMode;
    fn insert(&self, key: &[u8], value: &[u8]) -> Result<(), Error>;
    fn store(&self, key: &[u8], old_value: Option<&[u8]>, new_value: &[u8]) -> Result<(), Error>;
    fn delete(&self, key: &[u8], old_value: &[u8]) -> Result<(), Error>;
}

/// Holds the table's current trigger, if any, behind a lock-free
/// copy-on-write pointer.
#[derive(Default)]
pub struct TriggerSlot {
    current: ArcSwapOption<dyn Trigger>,
}

impl TriggerSlot {
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::from(None),
        }
    }

    pub fn set(&self, trigger: Option<Arc<dyn Trigger>>) {
        self.current.store(trigger);
    }

    pub fn snapshot(&self) -> Option<Arc<dyn Trigger>> {
        self.current.load_full()
    }
}

/// Run `f` against the table's current trigger, honoring [`TriggerMode`]:
/// `Active` passes the trigger through, `Skip` passes `None` so `f` can
/// still do its non-trigger work, and `Disabled` spins until the slot
/// settles into one of the other two states. A disabled trigger is always a
/// transient state (a writer is mid-swap); spinning briefly is cheaper and
/// simpler than plumbing a condvar through every call site for a window that
/// closes in at most a few instructions.
pub fn with_trigger<R>(
    slot: &TriggerSlot,
    mut f: impl FnMut(Option<&Arc<dyn Trigger>>) -> Result<R, Error>,
) -> Result<R, Error> {
    loop {
        let snapshot = slot.snapshot();
        match snapshot.as_ref().map(|t| t.mode()) {
            Some(TriggerMode::Disabled) => {
                std::thread::yield_now();
                continue;
            }
            Some(TriggerMode::Skip) | None => return f(None),
            Some(TriggerMode::Active) => return f(snapshot.as_ref()),
        }
    }
}
