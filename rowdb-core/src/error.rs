//! The error taxonomy callers match on: one variant per distinguishable
//! failure, carrying just enough context to act on it. Callers need to tell
//! `UniquenessViolation` apart from `ConcurrentSchemaChange` to decide
//! whether a retry makes sense, so this stays a structured enum rather than
//! an opaque boxed error.

use thiserror::Error;

use crate::codec::CodecError;

#[derive(Debug, Error)]
pub enum Error {
    /// A `RowType` could not be turned into a `RowInfo`: duplicate column
    /// names, an alternate key or secondary index referencing an unknown
    /// column, an empty primary key, or similar declaration-time defects.
    #[error("malformed row type: {0}")]
    MalformedRowType(String),

    /// A column marked required (non-nullable, no default) was left unset
    /// at encode time.
    #[error("required column `{0}` was not set")]
    RequiredColumnUnset(String),

    /// A uniqueness constraint on a primary key or alternate key was
    /// violated by an insert or a replace-into-occupied-slot.
    #[error("uniqueness violation on `{0}`")]
    UniquenessViolation(String),

    /// A write was attempted against a read-only / joined view that cannot
    /// accept direct mutation.
    #[error("view `{0}` is not modifiable")]
    UnmodifiableView(String),

    /// The row's schema changed between encode and decode in a way that
    /// cannot be reconciled by versioned defaulting.
    #[error("concurrent schema change on `{0}`")]
    ConcurrentSchemaChange(String),

    /// Bytes read back from storage do not parse as a valid encoding for
    /// the expected schema version.
    #[error("corrupt encoding: {0}")]
    CorruptEncoding(#[from] CodecError),

    /// The owning database/table handle has already been closed.
    #[error("database is closed")]
    DatabaseClosed,

    /// A lock request could not be granted within its allotted time.
    #[error("lock timeout waiting on `{0}`")]
    LockTimeout(String),

    /// The lock manager detected a cycle and aborted this request to break
    /// it.
    #[error("deadlock detected waiting on `{0}`")]
    Deadlock(String),
}

pub type Result<T> = std::result::Result<T, Error>;

// `NoSuchRow` is deliberately not an `Error` variant: it's a normal outcome
// of load/exchange/delete, modeled as `Option`/`bool` returns instead of an
// `Err`, the way `find_one` returns `Option<T>` rather than erroring when
// nothing matches.
