//! An insertion-ordered map that refuses to silently overwrite a key.
//!
//! Symbol tables and overload tables both need "first definition wins, later
//! ones are diagnostics" semantics; this wraps `indexmap::IndexMap` with a
//! plain `Clone` bound on the value type, since Spice's tables build their own
//! diagnostics from the returned previous value rather than needing per-value
//! span extraction at insert time.

use std::hash::Hash;

use indexmap::IndexMap;

/// Insertion-ordered map that reports whether a key was already present.
#[derive(Debug, Clone)]
pub struct SpiceMap<K, V> {
    inner: IndexMap<K, V>,
}

impl<K, V> Default for SpiceMap<K, V> {
    fn default() -> Self {
        Self { inner: IndexMap::new() }
    }
}

impl<K: Eq + Hash, V> SpiceMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` under `key`. Returns the previous value if `key` was
    /// already present, so the caller can turn that into a duplicate-name
    /// diagnostic instead of silently shadowing it.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.inner.insert(key, value)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.inner.get_mut(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.inner.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.inner.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.inner.iter()
    }

    pub fn entry_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.inner.entry(key).or_default()
    }
}

impl<K: Eq + Hash, V> FromIterator<(K, V)> for SpiceMap<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self { inner: IndexMap::from_iter(iter) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_reports_previous_value_on_duplicate() {
        let mut map = SpiceMap::new();
        assert_eq!(map.insert("a", 1), None);
        assert_eq!(map.insert("a", 2), Some(1));
        assert_eq!(map.get(&"a"), Some(&2));
    }

    #[test]
    fn preserves_insertion_order() {
        let mut map = SpiceMap::new();
        map.insert("z", 1);
        map.insert("a", 2);
        map.insert("m", 3);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec![&"z", &"a", &"m"]);
    }
}
