//! Bucket store: one growable entry array per bucket.
//!
//! Capacity is tracked in a bounded `u32` counter that moves in whole
//! `STEP`-entry increments. Growth keeps one free slot of headroom; shrink
//! keeps one spare step, so a bucket hovering around a step boundary does
//! not reallocate on every insert/delete pair.

use crate::error::Error;
use std::mem;
use std::vec;

/// Number of buckets in every table. A power of two.
pub const N_BUCKETS: usize = 512;

/// Growth step of a bucket, in entries.
pub const STEP: u32 = 64;

const BUCKET_MASK: u32 = N_BUCKETS as u32 - 1;

/// Bucket addressed by `hash`.
#[inline]
pub fn bucket_index(hash: u32) -> usize {
    (hash & BUCKET_MASK) as usize
}

/// Capacity after one growth step, or `CapacityOverflow`.
#[inline]
pub(crate) fn grown_total(total: u32) -> Result<u32, Error> {
    total.checked_add(STEP).ok_or(Error::CapacityOverflow)
}

/// Capacity after removing down to `used` entries, if a shrink is due.
#[inline]
pub(crate) fn shrunk_total(used: u32, total: u32) -> Option<u32> {
    let steps_used = used / STEP;
    let steps_total = total / STEP;
    (steps_used + 1 < steps_total).then(|| (steps_used + 1) * STEP)
}

#[derive(Debug)]
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) hash: u32,
}

#[derive(Debug)]
pub(crate) struct Bucket<K, V> {
    entries: Vec<Entry<K, V>>,
    total: u32,
    /// Lowered in tests to reach the overflow path without 2^32 entries.
    #[cfg(test)]
    ceiling: u32,
}

impl<K, V> Bucket<K, V> {
    pub(crate) const fn new() -> Self {
        Self {
            entries: Vec::new(),
            total: 0,
            #[cfg(test)]
            ceiling: u32::MAX,
        }
    }

    #[cfg(test)]
    pub(crate) fn set_ceiling(&mut self, ceiling: u32) {
        self.ceiling = ceiling;
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Allocated capacity, in entries.
    #[inline]
    pub(crate) fn total(&self) -> u32 {
        self.total
    }

    #[inline]
    pub(crate) fn get(&self, idx: usize) -> Option<&Entry<K, V>> {
        self.entries.get(idx)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, idx: usize) -> Option<&mut Entry<K, V>> {
        self.entries.get_mut(idx)
    }

    /// First entry whose cached hash is `hash` and whose key satisfies `eq`.
    /// `eq` only runs on hash matches.
    #[inline]
    pub(crate) fn position<F>(&self, hash: u32, mut eq: F) -> Option<usize>
    where
        F: FnMut(&K) -> bool,
    {
        self.entries
            .iter()
            .position(|e| e.hash == hash && eq(&e.key))
    }

    /// Make room for one more entry, growing by one step when the headroom
    /// is used up. On error the bucket is unchanged.
    pub(crate) fn reserve_slot(&mut self) -> Result<(), Error> {
        let used = self.entries.len();
        if used + 1 >= self.total as usize {
            let new_total = grown_total(self.total)?;
            #[cfg(test)]
            if new_total > self.ceiling {
                return Err(Error::CapacityOverflow);
            }
            self.entries
                .try_reserve_exact((new_total as usize).saturating_sub(used))?;
            log::trace!("bucket grown to {} slots", new_total);
            self.total = new_total;
        }
        Ok(())
    }

    /// Append after a successful `reserve_slot`.
    #[inline]
    pub(crate) fn push(&mut self, entry: Entry<K, V>) {
        debug_assert!(self.entries.len() < self.total as usize);
        self.entries.push(entry);
    }

    /// Remove the entry at `idx`, shifting every later entry down by one, then
    /// shrink if the hysteresis threshold is crossed.
    pub(crate) fn remove(&mut self, idx: usize) -> Entry<K, V> {
        let entry = self.entries.remove(idx);
        if let Some(new_total) = shrunk_total(self.entries.len() as u32, self.total) {
            self.entries.shrink_to(new_total as usize);
            log::trace!("bucket shrunk to {} slots", new_total);
            self.total = new_total;
        }
        entry
    }

    /// Detach every entry; the storage goes with the returned iterator.
    pub(crate) fn take_all(&mut self) -> vec::IntoIter<Entry<K, V>> {
        self.total = 0;
        mem::take(&mut self.entries).into_iter()
    }
}
