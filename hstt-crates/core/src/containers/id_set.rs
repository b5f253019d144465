use std::fmt::Debug;
use std::fmt::Formatter;
use std::marker::PhantomData;

use fixedbitset::FixedBitSet;

use super::StorageKey;

/// A set of handles drawn from a fixed universe `0..capacity`, stored as a bit set.
///
/// Used for meet domains (sets of times) and task domains (sets of resources), where subset
/// tests and shifting by an offset are on the hot path of every assignment.
pub struct IdSet<Key> {
    key: PhantomData<Key>,
    bits: FixedBitSet,
}

impl<Key> Clone for IdSet<Key> {
    fn clone(&self) -> Self {
        Self {
            key: PhantomData,
            bits: self.bits.clone(),
        }
    }
}

impl<Key> PartialEq for IdSet<Key> {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<Key> Eq for IdSet<Key> {}

impl<Key: StorageKey + Debug> Debug for IdSet<Key> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<Key: StorageKey> IdSet<Key> {
    /// Creates an empty set over the universe `0..capacity`.
    pub fn empty(capacity: usize) -> Self {
        Self {
            key: PhantomData,
            bits: FixedBitSet::with_capacity(capacity),
        }
    }

    /// Creates the set containing the whole universe `0..capacity`.
    pub fn full(capacity: usize) -> Self {
        let mut bits = FixedBitSet::with_capacity(capacity);
        bits.insert_range(..);
        Self {
            key: PhantomData,
            bits,
        }
    }

    pub fn from_keys(capacity: usize, keys: impl IntoIterator<Item = Key>) -> Self {
        let mut set = Self::empty(capacity);
        for key in keys {
            set.insert(key);
        }
        set
    }

    pub fn singleton(capacity: usize, key: Key) -> Self {
        Self::from_keys(capacity, [key])
    }

    pub fn capacity(&self) -> usize {
        self.bits.len()
    }

    /// Inserts `key`; keys outside the universe are ignored.
    pub fn insert(&mut self, key: Key) {
        if key.index() < self.bits.len() {
            self.bits.insert(key.index());
        }
    }

    pub fn remove(&mut self, key: Key) {
        if key.index() < self.bits.len() {
            self.bits.set(key.index(), false);
        }
    }

    pub fn contains(&self, key: Key) -> bool {
        self.bits.contains(key.index())
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones(..)
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_clear()
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    pub fn first(&self) -> Option<Key> {
        self.bits.ones().next().map(Key::create_from_index)
    }

    pub fn iter(&self) -> impl Iterator<Item = Key> + '_ {
        self.bits.ones().map(Key::create_from_index)
    }

    pub fn is_subset(&self, other: &IdSet<Key>) -> bool {
        self.bits.is_subset(&other.bits)
    }

    pub fn is_disjoint(&self, other: &IdSet<Key>) -> bool {
        self.bits.is_disjoint(&other.bits)
    }

    pub fn intersect_with(&mut self, other: &IdSet<Key>) {
        self.bits.intersect_with(&other.bits);
    }

    pub fn union_with(&mut self, other: &IdSet<Key>) {
        self.bits.union_with(&other.bits);
    }

    pub fn difference_with(&mut self, other: &IdSet<Key>) {
        self.bits.difference_with(&other.bits);
    }

    pub fn intersection(&self, other: &IdSet<Key>) -> IdSet<Key> {
        let mut result = self.clone();
        result.intersect_with(other);
        result
    }

    /// Returns `{ k + offset | k in self }`, dropping elements which leave the universe.
    pub fn shifted(&self, offset: usize) -> IdSet<Key> {
        let mut result = Self::empty(self.capacity());
        for index in self.bits.ones() {
            if index + offset < self.capacity() {
                result.bits.insert(index + offset);
            }
        }
        result
    }
}
