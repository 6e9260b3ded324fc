#[cfg(test)]
#[path = "./array_tests.rs"]
mod tests;

use crate::value::Value;
use crate::{Error, ErrorKind, Span};

/// How an array was written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ArrayKind {
    /// `[ ... ]`
    #[default]
    Inline,
    /// A sequence of `[[name]]` sections.
    Tables,
}

/// A TOML array.
///
/// Inline arrays hold a single element type. Integers may join an array of
/// floats (and vice versa), in which case every integer is coerced to a
/// float.
#[derive(Clone, Default)]
pub struct Array {
    values: Vec<Value>,
    kind: ArrayKind,
    span: Span,
}

impl Array {
    /// Creates an empty inline array.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty array of tables.
    pub fn of_tables() -> Self {
        Self {
            kind: ArrayKind::Tables,
            ..Self::default()
        }
    }

    pub(crate) fn with_kind_and_span(kind: ArrayKind, span: Span) -> Self {
        Self {
            kind,
            span,
            ..Self::default()
        }
    }

    pub fn kind(&self) -> ArrayKind {
        self.kind
    }

    pub fn is_array_of_tables(&self) -> bool {
        self.kind == ArrayKind::Tables
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub(crate) fn set_span(&mut self, span: Span) {
        self.span = span;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.values.get_mut(index)
    }

    pub fn last_mut(&mut self) -> Option<&mut Value> {
        self.values.last_mut()
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.values.pop()
    }

    /// Removes the element at `index`, shifting the rest down.
    pub fn remove(&mut self, index: usize) -> Option<Value> {
        if index < self.values.len() {
            Some(self.values.remove(index))
        } else {
            None
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }

    /// The common element type name, `None` when empty.
    pub fn element_type(&self) -> Option<&'static str> {
        self.values.first().map(Value::element_type)
    }

    /// Appends a value, rejecting one whose type differs from the elements
    /// already present.
    ///
    /// An array of tables only accepts tables.
    pub fn push(&mut self, value: Value) -> Result<(), Error> {
        if self.kind == ArrayKind::Tables && !matches!(value, Value::Table(_)) {
            return Err(ErrorKind::MixedArray {
                expected: "table",
                found: value.element_type(),
            }
            .into());
        }
        let Some(expected) = self.element_type() else {
            self.values.push(value);
            return Ok(());
        };
        let found = value.element_type();
        if expected == found {
            self.values.push(value);
            return Ok(());
        }
        match (expected, value) {
            ("float", Value::Integer(i)) => {
                self.values.push(Value::Float(i.to_f64()));
                Ok(())
            }
            ("integer", Value::Float(f)) => {
                for v in &mut self.values {
                    if let Value::Integer(i) = v {
                        *v = Value::Float(i.to_f64());
                    }
                }
                self.values.push(Value::Float(f));
                Ok(())
            }
            _ => Err(ErrorKind::MixedArray { expected, found }.into()),
        }
    }

    /// Checks the homogeneity rules against the current elements, which may
    /// have been replaced through [`Array::get_mut`].
    pub(crate) fn check_homogeneous(&self) -> Result<(), Error> {
        let Some(expected) = self.element_type() else {
            return Ok(());
        };
        for value in &self.values {
            let found = value.element_type();
            if found != expected
                && !matches!((expected, found), ("integer", "float") | ("float", "integer"))
            {
                return Err(ErrorKind::MixedArray { expected, found }.into());
            }
        }
        Ok(())
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl std::fmt::Debug for Array {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(&self.values).finish()
    }
}

impl TryFrom<Vec<Value>> for Array {
    type Error = Error;

    fn try_from(values: Vec<Value>) -> Result<Self, Error> {
        let mut array = Array::new();
        for value in values {
            array.push(value)?;
        }
        Ok(array)
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl<'a> IntoIterator for &'a mut Array {
    type Item = &'a mut Value;
    type IntoIter = std::slice::IterMut<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter_mut()
    }
}

impl IntoIterator for Array {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
