//! Table: strategy + fixed bucket store + caller destructors.

use crate::bucket::{bucket_index, Bucket, Entry, N_BUCKETS};
use crate::error::{Error, InsertError};
use crate::iter::Iter;
use crate::strategy::{KeyKind, Strategy, TableKey};
use core::borrow::Borrow;
use core::fmt;
use core::mem;

/// Caller-supplied release action for a key or value leaving the table.
pub type Destructor<T> = Box<dyn FnMut(T)>;

struct Destructors<K, V> {
    key: Option<Destructor<K>>,
    value: Option<Destructor<V>>,
}

impl<K, V> Destructors<K, V> {
    /// Value first, then key. Without a destructor the item is just dropped.
    fn release(&mut self, key: K, value: V) {
        match self.value.as_mut() {
            Some(free) => free(value),
            None => drop(value),
        }
        match self.key.as_mut() {
            Some(free) => free(key),
            None => drop(key),
        }
    }
}

/// Configures destructors for a new [`Table`].
pub struct TableBuilder<K, V> {
    destructors: Destructors<K, V>,
}

impl<K: TableKey, V> TableBuilder<K, V> {
    fn new() -> Self {
        Self {
            destructors: Destructors {
                key: None,
                value: None,
            },
        }
    }

    /// Run `f` on every key that leaves the table.
    pub fn key_destructor<F>(mut self, f: F) -> Self
    where
        F: FnMut(K) + 'static,
    {
        self.destructors.key = Some(Box::new(f));
        self
    }

    /// Run `f` on every value that leaves the table.
    pub fn value_destructor<F>(mut self, f: F) -> Self
    where
        F: FnMut(V) + 'static,
    {
        self.destructors.value = Some(Box::new(f));
        self
    }

    pub fn build(self) -> Table<K, V> {
        let buckets = (0..N_BUCKETS).map(|_| Bucket::new()).collect();
        Table::assemble(self.destructors, buckets)
    }

    /// Like `build`, but reports allocator refusal instead of aborting.
    pub fn try_build(self) -> Result<Table<K, V>, Error> {
        let mut buckets = Vec::new();
        buckets.try_reserve_exact(N_BUCKETS)?;
        buckets.extend((0..N_BUCKETS).map(|_| Bucket::new()));
        Ok(Table::assemble(self.destructors, buckets.into_boxed_slice()))
    }
}

/// Occupancy summary. A bucket far longer than `entries / 512` suggests
/// colliding input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BucketStats {
    pub entries: usize,
    pub occupied_buckets: usize,
    pub longest_bucket: usize,
    pub allocated_slots: usize,
}

/// Hash map with a fixed set of 512 buckets.
///
/// Keys and values are moved in and never cloned. When an entry leaves the
/// table (overwrite, delete, or table drop) the value destructor runs, then
/// the key destructor, exactly once each.
pub struct Table<K, V> {
    count: usize,
    strategy: Strategy,
    destructors: Destructors<K, V>,
    buckets: Box<[Bucket<K, V>]>,
}

impl<K: TableKey, V> Table<K, V> {
    /// Table without destructors.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> TableBuilder<K, V> {
        TableBuilder::new()
    }

    /// Table with optional destructors.
    pub fn with_destructors(key: Option<Destructor<K>>, value: Option<Destructor<V>>) -> Self {
        let mut builder = Self::builder();
        builder.destructors = Destructors { key, value };
        builder.build()
    }

    fn assemble(destructors: Destructors<K, V>, buckets: Box<[Bucket<K, V>]>) -> Self {
        debug_assert_eq!(buckets.len(), N_BUCKETS);
        Self {
            count: 0,
            strategy: Strategy::for_kind(K::KIND),
            destructors,
            buckets,
        }
    }

    pub fn kind(&self) -> KeyKind {
        K::KIND
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Hash, bucket index and in-bucket position of `key`.
    fn locate<Q>(&self, key: &Q) -> (u32, usize, Option<usize>)
    where
        K: Borrow<Q>,
        Q: TableKey + ?Sized,
    {
        let probe = key.as_key();
        let hash = self.strategy.hash(probe);
        let idx = bucket_index(hash);
        let strategy = self.strategy;
        let pos = self.buckets[idx].position(hash, |k| {
            strategy.matches(<K as Borrow<Q>>::borrow(k).as_key(), probe)
        });
        (hash, idx, pos)
    }

    /// Insert or replace. A replaced entry's value and key go through the
    /// destructors. On error nothing changed and the pair is handed back.
    pub fn add(&mut self, key: K, value: V) -> Result<(), InsertError<K, V>> {
        let (hash, idx, pos) = self.locate(&key);
        let bucket = &mut self.buckets[idx];

        if let Some(entry) = pos.and_then(|i| bucket.get_mut(i)) {
            let old_value = mem::replace(&mut entry.value, value);
            let old_key = mem::replace(&mut entry.key, key);
            self.destructors.release(old_key, old_value);
            return Ok(());
        }

        if let Err(e) = bucket.reserve_slot() {
            log::warn!("add failed on bucket {}: {}", idx, e);
            return Err(InsertError::new(e, key, value));
        }
        bucket.push(Entry { key, value, hash });
        self.count += 1;
        Ok(())
    }

    /// Insert only if the key is absent. An existing entry is left untouched
    /// and no destructor runs; the rejected pair is handed back.
    pub fn add_unique(&mut self, key: K, value: V) -> Result<(), InsertError<K, V>> {
        let (hash, idx, pos) = self.locate(&key);
        if pos.is_some() {
            return Err(InsertError::new(Error::AlreadyExists, key, value));
        }

        let bucket = &mut self.buckets[idx];
        if let Err(e) = bucket.reserve_slot() {
            log::warn!("add_unique failed on bucket {}: {}", idx, e);
            return Err(InsertError::new(e, key, value));
        }
        bucket.push(Entry { key, value, hash });
        self.count += 1;
        Ok(())
    }

    pub fn find<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: TableKey + ?Sized,
    {
        let (_, idx, pos) = self.locate(key);
        pos.and_then(|i| self.buckets[idx].get(i)).map(|e| &e.value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: TableKey + ?Sized,
    {
        self.locate(key).2.is_some()
    }

    /// Remove `key`, running its destructors. Later entries of the same
    /// bucket shift down one slot, which disturbs any in-flight [`Cursor`].
    ///
    /// [`Cursor`]: crate::Cursor
    pub fn delete<Q>(&mut self, key: &Q) -> Result<(), Error>
    where
        K: Borrow<Q>,
        Q: TableKey + ?Sized,
    {
        let (_, idx, pos) = self.locate(key);
        let i = pos.ok_or(Error::NotFound)?;
        let entry = self.buckets[idx].remove(i);
        self.count -= 1;
        self.destructors.release(entry.key, entry.value);
        Ok(())
    }

    /// Release every entry through the destructors, then the storage.
    /// Dropping the table does the same.
    pub fn destroy(self) {
        drop(self);
    }
}

impl<K, V> Table<K, V> {
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self)
    }

    pub(crate) fn bucket(&self, idx: usize) -> Option<&Bucket<K, V>> {
        self.buckets.get(idx)
    }

    pub fn stats(&self) -> BucketStats {
        self.buckets.iter().fold(BucketStats::default(), |mut s, b| {
            s.entries += b.len();
            s.occupied_buckets += usize::from(!b.is_empty());
            s.longest_bucket = s.longest_bucket.max(b.len());
            s.allocated_slots += b.total() as usize;
            s
        })
    }
}

impl<K: TableKey, V> Default for Table<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Drop for Table<K, V> {
    fn drop(&mut self) {
        for bucket in self.buckets.iter_mut() {
            for entry in bucket.take_all() {
                self.destructors.release(entry.key, entry.value);
            }
        }
        self.count = 0;
    }
}

impl<K, V> fmt::Debug for Table<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("count", &self.count)
            .field("kind", &self.strategy.kind())
            .field("variant", &self.strategy.variant())
            .finish_non_exhaustive()
    }
}

impl<'a, K, V> IntoIterator for &'a Table<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
