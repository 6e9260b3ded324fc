#[cfg(test)]
#[path = "./document_tests.rs"]
mod tests;

use crate::parser::parse_key_path;
use crate::table::TableKind;
use crate::value::{Key, Value};
use crate::{Array, Error, ErrorKind, Table};

/// A parsed TOML document.
///
/// Paths given to the accessors use TOML key syntax, so `server.port`,
/// `"with.dot".port` and `'literal'.x` all work. When reading, a segment
/// made of digits indexes into an array: `servers.0.name`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    root: Table,
}

enum Container<'t> {
    Table(&'t mut Table),
    Array(&'t mut Array),
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(root: Table) -> Self {
        Document { root }
    }

    pub fn root(&self) -> &Table {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Table {
        &mut self.root
    }

    pub fn into_table(self) -> Table {
        self.root
    }

    /// Looks up the value at `path`.
    ///
    /// Returns `Ok(None)` when any segment is missing and an error only when
    /// `path` itself is malformed.
    pub fn get(&self, path: &str) -> Result<Option<&Value>, Error> {
        let keys = parse_key_path(path)?;
        let Some((first, rest)) = keys.split_first() else {
            return Ok(None);
        };
        let mut current = match self.root.get(&first.name) {
            Some(v) => v,
            None => return Ok(None),
        };
        for key in rest {
            let next = match current {
                Value::Table(t) => t.get(&key.name),
                Value::Array(a) => match key.name.parse::<usize>() {
                    Ok(idx) => a.get(idx),
                    Err(_) => None,
                },
                _ => None,
            };
            match next {
                Some(v) => current = v,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Mutable counterpart of [`Document::get`].
    ///
    /// Values replaced through the returned reference are not type checked
    /// until the document is serialized.
    pub fn get_mut(&mut self, path: &str) -> Result<Option<&mut Value>, Error> {
        let keys = parse_key_path(path)?;
        let Some((last, parents)) = keys.split_last() else {
            return Ok(None);
        };
        let Some(container) = walk(&mut self.root, parents, false)? else {
            return Ok(None);
        };
        Ok(match container {
            Container::Table(t) => t.get_mut(&last.name),
            Container::Array(a) => match last.name.parse::<usize>() {
                Ok(idx) => a.get_mut(idx),
                Err(_) => None,
            },
        })
    }

    /// Sets the value at `path`, creating missing parent tables, and returns
    /// the value it replaced.
    ///
    /// An existing key keeps its position; a new one is appended to its
    /// table. A final digit segment addresses an array element, where the
    /// index may be one past the end to append.
    pub fn set(&mut self, path: &str, value: Value) -> Result<Option<Value>, Error> {
        let keys = parse_key_path(path)?;
        self.set_keys(&keys, value)
    }

    /// [`Document::set`] with the path already split into keys.
    pub(crate) fn set_keys(&mut self, keys: &[Key], value: Value) -> Result<Option<Value>, Error> {
        let invalid = || -> Error { ErrorKind::InvalidPath(joined(keys)).into() };
        let Some((last, parents)) = keys.split_last() else {
            return Err(invalid());
        };
        let Some(container) = walk(&mut self.root, parents, true)? else {
            return Err(invalid());
        };
        match container {
            Container::Table(t) => Ok(t.insert(last.clone(), value)),
            Container::Array(a) => {
                let Ok(idx) = last.name.parse::<usize>() else {
                    return Err(ErrorKind::NotATable {
                        path: joined(parents),
                    }
                    .into());
                };
                if idx == a.len() {
                    a.push(value)?;
                    return Ok(None);
                }
                let Some(slot) = a.get_mut(idx) else {
                    return Err(invalid());
                };
                let previous = std::mem::replace(slot, value);
                if let Err(e) = a.check_homogeneous() {
                    if let Some(slot) = a.get_mut(idx) {
                        *slot = previous;
                    }
                    return Err(e);
                }
                Ok(Some(previous))
            }
        }
    }

    /// Removes the value at `path`, returning it if it existed.
    pub fn remove(&mut self, path: &str) -> Result<Option<Value>, Error> {
        let keys = parse_key_path(path)?;
        let Some((last, parents)) = keys.split_last() else {
            return Ok(None);
        };
        let Some(container) = walk(&mut self.root, parents, false)? else {
            return Ok(None);
        };
        Ok(match container {
            Container::Table(t) => t.remove(&last.name),
            Container::Array(a) => match last.name.parse::<usize>() {
                Ok(idx) => a.remove(idx),
                Err(_) => None,
            },
        })
    }

    /// Sets several fields of one section, creating the section if needed.
    ///
    /// An empty `section` addresses the root table.
    pub fn update_section<K, I>(&mut self, section: &str, fields: I) -> Result<(), Error>
    where
        K: Into<Key>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let table = if section.trim().is_empty() {
            &mut self.root
        } else {
            let keys = parse_key_path(section)?;
            match walk(&mut self.root, &keys, true)? {
                Some(Container::Table(t)) => t,
                _ => {
                    return Err(ErrorKind::NotATable {
                        path: joined(&keys),
                    }
                    .into());
                }
            }
        };
        for (key, value) in fields {
            table.insert(key, value);
        }
        Ok(())
    }

    /// Serializes the document, see [`crate::to_string`].
    pub fn to_toml(&self) -> Result<String, Error> {
        crate::ser::to_string(self)
    }
}

/// Walks `keys` from `root`, optionally creating missing tables on the way.
fn walk<'t>(
    root: &'t mut Table,
    keys: &[Key],
    create: bool,
) -> Result<Option<Container<'t>>, Error> {
    let mut current = Container::Table(root);
    for (depth, key) in keys.iter().enumerate() {
        let next = match current {
            Container::Table(t) => {
                if create && !t.contains_key(&key.name) {
                    t.insert(key.clone(), Value::Table(Table::with_kind(TableKind::Header)));
                }
                t.get_mut(&key.name)
            }
            Container::Array(a) => match key.name.parse::<usize>() {
                Ok(idx) => a.get_mut(idx),
                Err(_) => None,
            },
        };
        current = match next {
            Some(Value::Table(t)) => Container::Table(t),
            Some(Value::Array(a)) => Container::Array(a),
            Some(_) if create => {
                return Err(ErrorKind::NotATable {
                    path: joined(&keys[..=depth]),
                }
                .into());
            }
            _ => return Ok(None),
        };
    }
    Ok(Some(current))
}

fn joined(keys: &[Key]) -> String {
    keys.iter().map(Key::as_str).collect::<Vec<_>>().join(".")
}
