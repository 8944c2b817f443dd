//! Error taxonomy shared by the table, the bucket store and the C ABI.

use std::collections::TryReserveError;
use std::fmt;
use thiserror::Error;

/// Failure reported by a table operation.
///
/// Every variant leaves the table exactly as it was before the call.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// The allocator refused to grow a bucket or to build a table.
    #[error("allocation failed")]
    OutOfMemory,

    /// Growing a bucket would overflow its bounded capacity counter.
    #[error("bucket capacity out of range")]
    CapacityOverflow,

    /// No entry matches the key.
    #[error("key not found")]
    NotFound,

    /// `add_unique` found an entry for the key already.
    #[error("key already exists")]
    AlreadyExists,
}

impl From<TryReserveError> for Error {
    fn from(_: TryReserveError) -> Self {
        Error::OutOfMemory
    }
}

/// A rejected insertion. Carries the error together with the key and value
/// that were not stored, so ownership goes back to the caller.
#[derive(Error)]
#[error("{kind}")]
pub struct InsertError<K, V> {
    kind: Error,
    key: K,
    value: V,
}

impl<K, V> InsertError<K, V> {
    pub(crate) fn new(kind: Error, key: K, value: V) -> Self {
        Self { kind, key, value }
    }

    pub fn kind(&self) -> Error {
        self.kind
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    /// Recover the rejected key and value.
    pub fn into_inner(self) -> (K, V) {
        (self.key, self.value)
    }
}

// Keys and values are not required to be Debug.
impl<K, V> fmt::Debug for InsertError<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertError")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<K, V> PartialEq<Error> for InsertError<K, V> {
    fn eq(&self, other: &Error) -> bool {
        self.kind == *other
    }
}
