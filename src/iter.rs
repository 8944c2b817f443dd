//! Bucket-major iteration.
//!
//! [`Cursor`] is a detached position that is handed the table on every
//! step, so the caller may mutate the table between steps. Doing so is a
//! precondition violation: a delete compacts its bucket and an add may land
//! behind the cursor, so entries can be skipped or seen twice. The cursor
//! never reads out of bounds. [`Iter`] borrows the table for its whole
//! lifetime and so cannot observe mutation at all.

use crate::bucket::N_BUCKETS;
use crate::table::Table;
use core::iter::FusedIterator;

/// Resumable position in a table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    bucket: usize,
    /// `None` before the first step.
    entry: Option<usize>,
}

impl Cursor {
    /// Cursor before the first entry of bucket 0.
    pub const fn new() -> Self {
        Self {
            bucket: 0,
            entry: None,
        }
    }

    pub(crate) const fn from_parts(bucket: usize, entry: Option<usize>) -> Self {
        Self { bucket, entry }
    }

    pub(crate) const fn parts(&self) -> (usize, Option<usize>) {
        (self.bucket, self.entry)
    }

    /// `true` once `next` has returned `None`.
    pub fn is_exhausted(&self) -> bool {
        self.bucket >= N_BUCKETS
    }

    /// Advance and return the pair under the cursor, or `None` when every
    /// bucket has been visited. Stays exhausted afterwards.
    pub fn next<'t, K, V>(&mut self, table: &'t Table<K, V>) -> Option<(&'t K, &'t V)> {
        let mut entry = self.entry.map_or(0, |e| e + 1);
        let used = table.bucket(self.bucket).map_or(0, |b| b.len());

        if entry >= used {
            entry = 0;
            self.bucket = (self.bucket + 1..N_BUCKETS)
                .find(|&i| table.bucket(i).is_some_and(|b| !b.is_empty()))
                .unwrap_or(N_BUCKETS);
        }
        self.entry = Some(entry);

        let e = table.bucket(self.bucket)?.get(entry)?;
        Some((&e.key, &e.value))
    }
}

/// Borrowing iterator over `(key, value)` pairs in bucket-major order.
pub struct Iter<'a, K, V> {
    table: &'a Table<K, V>,
    cursor: Cursor,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(table: &'a Table<K, V>) -> Self {
        Self {
            table,
            cursor: Cursor::new(),
            remaining: table.count(),
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let item = self.cursor.next(self.table)?;
        self.remaining = self.remaining.saturating_sub(1);
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn fresh_table_yields_nothing() {
        let t: Table<u32, u32> = Table::new();
        let mut c = Cursor::new();
        assert_eq!(c.next(&t), None);
        assert!(c.is_exhausted());
        assert_eq!(c.next(&t), None);
        assert_eq!(t.iter().count(), 0);
    }

    /// Invariant: a full pass yields every stored pair exactly once.
    #[test]
    fn full_pass_yields_each_pair_once() {
        let mut t: Table<u32, u32> = Table::new();
        for i in 0..5000 {
            t.add(i, i * 2).unwrap();
        }
        let mut seen = BTreeSet::new();
        let mut c = Cursor::new();
        while let Some((k, v)) = c.next(&t) {
            assert_eq!(*v, k * 2);
            assert!(seen.insert(*k), "duplicate {k}");
        }
        assert_eq!(seen.len(), 5000);
        assert_eq!(t.iter().len(), 5000);
        assert_eq!((&t).into_iter().count(), 5000);
    }

    #[test]
    fn order_is_bucket_major() {
        let mut t: Table<String, ()> = Table::new();
        for i in 0..2000 {
            t.add(format!("k{i}"), ()).unwrap();
        }
        let strategy = t.strategy();
        let buckets: Vec<usize> = t
            .iter()
            .map(|(k, _)| crate::bucket::bucket_index(strategy.hash(crate::TableKey::as_key(k))))
            .collect();
        assert!(buckets.windows(2).all(|w| w[0] <= w[1]));
    }

    /// Deleting behind the cursor between steps may skip entries but never
    /// reads out of bounds and still terminates.
    #[test]
    fn mutation_between_steps_is_bounded() {
        let mut t: Table<u32, u32> = Table::new();
        for i in 0..3000 {
            t.add(i, i).unwrap();
        }
        let mut c = Cursor::new();
        let mut steps = 0;
        while let Some((&k, _)) = c.next(&t) {
            t.delete(&k).unwrap();
            steps += 1;
            assert!(steps <= 3000);
        }
        assert!(c.is_exhausted());
        assert!(t.count() < 3000);
    }

    #[test]
    fn cursor_round_trips_through_parts() {
        let c = Cursor::from_parts(7, Some(3));
        assert_eq!(c.parts(), (7, Some(3)));
        assert_eq!(Cursor::new().parts(), (0, None));
    }
}
