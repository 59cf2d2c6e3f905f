//! A priority queue that supports removing arbitrary elements.

/// Queue of values ordered by key, smallest key first.
///
/// Equal keys come out in the order they were inserted.
/// Backed by a vector sorted in descending order so that popping is O(1)
/// and inserting or removing is O(n).
#[derive(Clone, Debug)]
pub struct PriorityQueue<K, V> {
    entries: Vec<Entry<K, V>>,
}

#[derive(Clone, Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
}

impl<K, V> Default for PriorityQueue<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: Ord, V: PartialEq> PriorityQueue<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: K, value: V) {
        // entries with an equal key stay behind the new one
        // so that they're popped first
        let idx = self.entries.partition_point(|e| e.key > key);
        self.entries.insert(idx, Entry { key, value });
    }

    /// Remove and return the entry with the smallest key.
    pub fn pop(&mut self) -> Option<(K, V)> {
        self.entries.pop().map(|e| (e.key, e.value))
    }

    pub fn peek(&self) -> Option<(&K, &V)> {
        self.entries.last().map(|e| (&e.key, &e.value))
    }

    /// Remove the first entry holding the given value.
    /// Returns whether anything was removed; removing a missing value does nothing.
    pub fn remove(&mut self, value: &V) -> bool {
        match self.entries.iter().position(|e| e.value == *value) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
