//! seeded-hashmap: an embeddable hash map with a fixed set of buckets,
//! integer or NUL-terminated string keys, a per-process randomized hash
//! seed, and caller-supplied destructors for keys and values.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a small map whose worst case under adversarial input is bounded
//!   by seeding, and whose ownership story is explicit: the table owns what
//!   it is given and releases it through the caller's destructors.
//! - Layers:
//!   - `hashers`: Wang integer mix, MurmurHash3 x86_32 and SSE4.2 CRC32C.
//!   - `seed`: the process-wide `HashState` (odd seed + variant), decided
//!     once from the first available entropy source.
//!   - `strategy`: `TableKey` maps a key type to a `KeyRef`; `Strategy`
//!     binds kind, seed and variant into hash/compare.
//!   - `bucket`: 512 buckets, each a growable array sized in 64-entry steps.
//!   - `table`: `Table<K, V>` with add/add_unique/find/delete/destroy.
//!   - `iter`: a detached `Cursor` and a borrowing `Iter`.
//!   - `ffi`: the `hashmap_*` C ABI over raw pointer keys and values.
//!
//! Constraints
//! - Single-threaded tables: destructors are `FnMut` without `Send`.
//! - The bucket count never changes; buckets grow and shrink on their own.
//! - Each entry caches its hash, so the comparator only runs on hash hits.
//! - The seed and variant are fixed before the first table hashes anything,
//!   so a table's hashes stay valid for its whole life.
//!
//! Destructor policy
//! - An entry leaves the table on overwrite, delete, or table drop. Its
//!   value destructor runs first, then its key destructor, exactly once.
//! - A rejected insert runs no destructor; the pair comes back in the
//!   [`InsertError`].
//! - Destructors receive ownership and cannot see the table, so they cannot
//!   reenter it.
//!
//! Iteration
//! - Order is bucket-major, then insertion order within a bucket, and is
//!   otherwise unspecified.
//! - [`Cursor`] may outlive a mutation of its table. It stays in bounds but
//!   may skip or repeat entries afterwards.

mod bucket;
mod error;
pub mod ffi;
mod hashers;
mod iter;
mod seed;
mod strategy;
mod table;
mod table_proptest;

pub use bucket::{bucket_index, N_BUCKETS, STEP};
pub use error::{Error, InsertError};
pub use hashers::{murmur3_32, wang_u32, Sse42};
pub use iter::{Cursor, Iter};
pub use seed::{
    draw_seed, hash_state, initialize, EntropySource, HashState, HashVariant, InitConfig,
    KernelRandom, RandomDevice, DEFAULT_ODD_CONSTANT,
};
pub use strategy::{until_nul, KeyKind, KeyRef, Strategy, TableKey};
pub use table::{BucketStats, Destructor, Table, TableBuilder};
