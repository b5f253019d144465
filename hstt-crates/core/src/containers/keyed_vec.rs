use std::marker::PhantomData;
use std::ops::Index;
use std::ops::IndexMut;

/// Structure for storing elements of type `Value`, the structure can only be indexed by structures
/// of type `Key`.
///
/// Every arena of the solution (meets, tasks, nodes, layers, zones, monitors) is a [`KeyedVec`]
/// indexed by its own handle type, so that a meet handle can never be used to look up a task.
#[derive(Debug, Hash, PartialEq, Eq)]
pub struct KeyedVec<Key, Value> {
    /// [PhantomData] to ensure that the [KeyedVec] is bound to the structure
    key: PhantomData<Key>,
    /// Storage of the elements of type `Value`
    elements: Vec<Value>,
}

impl<Key, Value: Clone> Clone for KeyedVec<Key, Value> {
    fn clone(&self) -> Self {
        Self {
            key: PhantomData,
            elements: self.elements.clone(),
        }
    }
}

impl<Key, Value> Default for KeyedVec<Key, Value> {
    fn default() -> Self {
        Self {
            key: PhantomData,
            elements: Vec::default(),
        }
    }
}

impl<Key, Value> From<Vec<Value>> for KeyedVec<Key, Value> {
    fn from(elements: Vec<Value>) -> Self {
        Self {
            key: PhantomData,
            elements,
        }
    }
}

impl<Key: StorageKey, Value> KeyedVec<Key, Value> {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Add a new value to the vector.
    ///
    /// Returns the key for the inserted value.
    pub fn push(&mut self, value: Value) -> Key {
        self.elements.push(value);

        Key::create_from_index(self.elements.len() - 1)
    }

    /// Returns the key which the next call to [`KeyedVec::push`] will hand out.
    pub fn next_key(&self) -> Key {
        Key::create_from_index(self.elements.len())
    }

    pub fn get(&self, key: Key) -> Option<&Value> {
        self.elements.get(key.index())
    }

    /// Iterate over the values in the vector.
    pub fn iter(&self) -> impl Iterator<Item = &'_ Value> {
        self.elements.iter()
    }

    /// Iterate over the values in the vector together with their keys.
    pub fn iter_with_keys(&self) -> impl Iterator<Item = (Key, &'_ Value)> {
        self.elements
            .iter()
            .enumerate()
            .map(|(index, value)| (Key::create_from_index(index), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = Key> {
        (0..self.elements.len()).map(Key::create_from_index)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &'_ mut Value> {
        self.elements.iter_mut()
    }
}

impl<Key: StorageKey, Value: Clone> KeyedVec<Key, Value> {
    pub(crate) fn resize(&mut self, new_len: usize, value: Value) {
        self.elements.resize(new_len, value)
    }

    /// Makes sure `key` is a valid index, filling any new slots with `default_value`.
    pub(crate) fn accomodate(&mut self, key: Key, default_value: Value) {
        if key.index() >= self.elements.len() {
            self.elements.resize(key.index() + 1, default_value);
        }
    }
}

impl<Key: StorageKey, Value> Index<Key> for KeyedVec<Key, Value> {
    type Output = Value;

    fn index(&self, index: Key) -> &Self::Output {
        &self.elements[index.index()]
    }
}

impl<Key: StorageKey, Value> Index<&Key> for KeyedVec<Key, Value> {
    type Output = Value;

    fn index(&self, index: &Key) -> &Self::Output {
        &self.elements[index.index()]
    }
}

impl<Key: StorageKey, Value> IndexMut<Key> for KeyedVec<Key, Value> {
    fn index_mut(&mut self, index: Key) -> &mut Self::Output {
        &mut self.elements[index.index()]
    }
}

impl<Key: StorageKey, Value> IndexMut<&Key> for KeyedVec<Key, Value> {
    fn index_mut(&mut self, index: &Key) -> &mut Self::Output {
        &mut self.elements[index.index()]
    }
}

/// A handle which can be converted to and from a `usize` position.
///
/// # Example
/// ```
/// # use hstt_core::containers::StorageKey;
/// # use hstt_core::containers::KeyedVec;
/// #[derive(Clone, Copy)]
/// struct Key(usize);
///
/// impl StorageKey for Key {
///     fn index(&self) -> usize {
///         self.0
///     }
///
///     fn create_from_index(index: usize) -> Self {
///         Key(index)
///     }
/// }
///
/// let mut keyed_vec: KeyedVec<Key, &str> = KeyedVec::default();
/// let key = keyed_vec.push("monday");
/// assert_eq!(keyed_vec[key], "monday");
/// ```
pub trait StorageKey: Clone + Copy {
    fn index(&self) -> usize;

    fn create_from_index(index: usize) -> Self;
}

impl StorageKey for usize {
    fn index(&self) -> usize {
        *self
    }

    fn create_from_index(index: usize) -> Self {
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_handed_out_in_insertion_order() {
        let mut keyed_vec: KeyedVec<usize, char> = KeyedVec::default();

        let a = keyed_vec.push('a');
        let b = keyed_vec.push('b');

        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(keyed_vec.next_key(), 2);
        assert_eq!(
            keyed_vec.iter_with_keys().collect::<Vec<_>>(),
            vec![(0, &'a'), (1, &'b')]
        );
    }

    #[test]
    fn accomodate_does_not_shrink() {
        let mut keyed_vec: KeyedVec<usize, u8> = KeyedVec::default();
        keyed_vec.accomodate(4, 7);
        keyed_vec[1] = 3;
        keyed_vec.accomodate(2, 0);

        assert_eq!(keyed_vec.len(), 5);
        assert_eq!(keyed_vec[1], 3);
        assert_eq!(keyed_vec[4], 7);
    }
}
