#[cfg(test)]
#[path = "./table_tests.rs"]
mod tests;

use crate::value::{Key, Value};
use crate::Span;
use foldhash::HashMap;

/// Tables with at least this many entries use the hash index for lookups.
const INDEXED_TABLE_THRESHOLD: usize = 6;

/// How a table came to exist in the source text.
///
/// Only [`TableKind::Inline`] affects what may be added to a parsed
/// table; the serializer treats the other kinds uniformly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TableKind {
    /// Created as the parent of a header path, e.g. `a` in `[a.b]`.
    #[default]
    Implicit,
    /// Created by a dotted key such as `a.b = 1`.
    Dotted,
    /// Declared by its own `[header]`.
    Header,
    /// Written as `{ ... }`, closed once parsed.
    Inline,
}

/// A TOML table: key-value pairs in insertion order.
///
/// Lookups are linear for small tables; once a table reaches a handful of
/// entries a `foldhash` index from key name to position is maintained
/// alongside the entry list.
#[derive(Clone, Default)]
pub struct Table {
    entries: Vec<(Key, Value)>,
    index: Option<HashMap<String, usize>>,
    kind: TableKind,
    span: Span,
}

impl Table {
    /// Creates an empty [`TableKind::Implicit`] table.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(kind: TableKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub(crate) fn with_kind_and_span(kind: TableKind, span: Span) -> Self {
        Self {
            kind,
            span,
            ..Self::default()
        }
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: TableKind) {
        self.kind = kind;
    }

    /// Byte span of the header, key or `{` that introduced the table.
    pub fn span(&self) -> Span {
        self.span
    }

    pub(crate) fn set_span(&mut self, span: Span) {
        self.span = span;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn find_index(&self, name: &str) -> Option<usize> {
        match &self.index {
            Some(index) => index.get(name).copied(),
            None => self.entries.iter().position(|(k, _)| k.name == name),
        }
    }

    pub fn get_key_value(&self, name: &str) -> Option<(&Key, &Value)> {
        let idx = self.find_index(name)?;
        let (k, v) = &self.entries[idx];
        Some((k, v))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        let idx = self.find_index(name)?;
        Some(&self.entries[idx].1)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        let idx = self.find_index(name)?;
        Some(&mut self.entries[idx].1)
    }

    pub(crate) fn entry_at_mut(&mut self, idx: usize) -> &mut (Key, Value) {
        &mut self.entries[idx]
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.find_index(name).is_some()
    }

    /// Inserts a value, returning the previous value for the key.
    ///
    /// Replacing keeps the key at its original position; new keys are
    /// appended.
    pub fn insert(&mut self, key: impl Into<Key>, value: Value) -> Option<Value> {
        let key = key.into();
        if let Some(idx) = self.find_index(&key.name) {
            return Some(std::mem::replace(&mut self.entries[idx].1, value));
        }
        self.push_entry(key, value);
        None
    }

    /// Appends without checking for an existing key.
    pub(crate) fn push_entry(&mut self, key: Key, value: Value) {
        let idx = self.entries.len();
        if let Some(index) = &mut self.index {
            index.insert(key.name.clone(), idx);
        }
        self.entries.push((key, value));
        if self.index.is_none() && self.entries.len() >= INDEXED_TABLE_THRESHOLD {
            self.rebuild_index();
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.remove_entry(name).map(|(_, v)| v)
    }

    /// Removes an entry, keeping the order of the remaining ones.
    pub fn remove_entry(&mut self, name: &str) -> Option<(Key, Value)> {
        let idx = self.find_index(name)?;
        let entry = self.entries.remove(idx);
        self.rebuild_index();
        Some(entry)
    }

    fn rebuild_index(&mut self) {
        if self.entries.len() < INDEXED_TABLE_THRESHOLD {
            self.index = None;
            return;
        }
        let index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, (k, _))| (k.name.clone(), i))
            .collect();
        self.index = Some(index);
    }

    pub fn entries(&self) -> &[(Key, Value)] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (Key, Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.entries.iter_mut().map(|(_, v)| v)
    }

    pub(crate) fn is_indexed(&self) -> bool {
        self.index.is_some()
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(&k.name).is_some_and(|ov| ov == v))
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in &self.entries {
            map.entry(k, v);
        }
        map.finish()
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a (Key, Value);
    type IntoIter = std::slice::Iter<'a, (Key, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for Table {
    type Item = (Key, Value);
    type IntoIter = std::vec::IntoIter<(Key, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<Key>> FromIterator<(K, Value)> for Table {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut table = Table::new();
        for (k, v) in iter {
            table.insert(k, v);
        }
        table
    }
}

impl std::ops::Index<&str> for Table {
    type Output = Value;

    /// Panics when the key is missing; use [`Table::get`] otherwise.
    fn index(&self, key: &str) -> &Value {
        match self.get(key) {
            Some(v) => v,
            None => panic!("no entry for key `{key}`"),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Table {
    fn serialize<S>(&self, ser: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = ser.serialize_map(Some(self.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(&k.name, v)?;
        }
        map.end()
    }
}
