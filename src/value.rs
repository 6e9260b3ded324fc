#[cfg(test)]
#[path = "./value_tests.rs"]
mod tests;

use crate::time::{Datetime, DatetimeKind};
use crate::{Array, Span, Table};
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use std::fmt;

/// A TOML integer.
///
/// Values that fit in 64 bits are stored as [`Integer::I64`]; anything wider
/// keeps arbitrary precision in [`Integer::Big`] and is never silently turned
/// into a float.
#[derive(Clone, Debug)]
pub enum Integer {
    I64(i64),
    Big(BigInt),
}

impl Integer {
    /// Returns the value as an `i64` if it fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Integer::I64(v) => Some(*v),
            Integer::Big(v) => v.to_i64(),
        }
    }

    pub fn is_negative(&self) -> bool {
        match self {
            Integer::I64(v) => *v < 0,
            Integer::Big(v) => v.sign() == num_bigint::Sign::Minus,
        }
    }

    /// Nearest float, used when an integer joins an array of floats.
    pub fn to_f64(&self) -> f64 {
        match self {
            Integer::I64(v) => *v as f64,
            Integer::Big(v) => v.to_f64().unwrap_or(f64::NAN),
        }
    }

    /// Collapses a big integer that fits in 64 bits back to [`Integer::I64`].
    pub(crate) fn normalize(self) -> Integer {
        match self {
            Integer::Big(v) => match v.to_i64() {
                Some(small) => Integer::I64(small),
                None => Integer::Big(v),
            },
            small => small,
        }
    }
}

impl PartialEq for Integer {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Integer::I64(a), Integer::I64(b)) => a == b,
            (Integer::Big(a), Integer::Big(b)) => a == b,
            (Integer::I64(a), Integer::Big(b)) | (Integer::Big(b), Integer::I64(a)) => {
                b.to_i64() == Some(*a)
            }
        }
    }
}

impl Eq for Integer {}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Integer::I64(v) => fmt::Display::fmt(v, f),
            Integer::Big(v) => fmt::Display::fmt(v, f),
        }
    }
}

impl From<i64> for Integer {
    fn from(v: i64) -> Self {
        Integer::I64(v)
    }
}

impl From<BigInt> for Integer {
    fn from(v: BigInt) -> Self {
        Integer::Big(v).normalize()
    }
}

/// A table key together with where it was written.
///
/// Keys compare and hash by name only; the span is informational and is
/// [`Span::default`] for keys created through the API.
#[derive(Clone)]
pub struct Key {
    pub name: String,
    pub span: Span,
}

impl Key {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            span: Span::default(),
        }
    }

    pub(crate) fn spanned(name: String, span: Span) -> Self {
        Self { name, span }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Key {}

impl std::hash::Hash for Key {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.name, f)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::new(name)
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::new(name)
    }
}

/// A TOML value.
///
/// Equality is value equality: tables compare as unordered maps, the
/// [`TableKind`](crate::TableKind) and [`ArrayKind`](crate::ArrayKind) of
/// containers are ignored, floats compare bitwise (so `-0.0 != 0.0` and every
/// NaN equals every other NaN).
///
/// # Examples
///
/// ```
/// let doc = toml_patchwork::parse("x = 42\ny = 42.0")?;
/// assert_eq!(doc.get("x")?.and_then(|v| v.as_i64()), Some(42));
/// assert_ne!(doc.get("x")?, doc.get("y")?);
/// # Ok::<(), toml_patchwork::Error>(())
/// ```
#[derive(Clone)]
pub enum Value {
    String(String),
    Integer(Integer),
    Float(f64),
    Boolean(bool),
    Datetime(Datetime),
    Array(Array),
    Table(Table),
}

impl Value {
    /// Returns the TOML type name (e.g. `"string"`, `"integer"`, `"table"`).
    pub fn type_str(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Datetime(_) => "datetime",
            Value::Array(_) => "array",
            Value::Table(_) => "table",
        }
    }

    /// Type name used for array homogeneity, where each datetime shape
    /// counts as its own type.
    pub(crate) fn element_type(&self) -> &'static str {
        match self {
            Value::Datetime(dt) => match dt.kind() {
                DatetimeKind::OffsetDatetime => "offset datetime",
                DatetimeKind::LocalDatetime => "local datetime",
                DatetimeKind::LocalDate => "local date",
                DatetimeKind::LocalTime => "local time",
            },
            other => other.type_str(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<&Integer> {
        match self {
            Value::Integer(i) => Some(i),
            _ => None,
        }
    }

    /// Returns the integer if it fits in an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_integer().and_then(Integer::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&Datetime> {
        match self {
            Value::Datetime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_table_mut(&mut self) -> Option<&mut Table> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Returns `true` for arrays written as `[[name]]` sections.
    pub fn is_array_of_tables(&self) -> bool {
        matches!(self, Value::Array(a) if a.is_array_of_tables())
    }

    /// Looks up `key` when this value is a table.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_table().and_then(|t| t.get(key))
    }
}

fn float_eq(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => float_eq(*a, *b),
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Datetime(a), Value::Datetime(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Table(a), Value::Table(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => fmt::Debug::fmt(s, f),
            Value::Integer(i) => fmt::Display::fmt(i, f),
            Value::Float(v) => fmt::Debug::fmt(v, f),
            Value::Boolean(b) => fmt::Debug::fmt(b, f),
            Value::Datetime(dt) => fmt::Debug::fmt(dt, f),
            Value::Array(a) => fmt::Debug::fmt(a, f),
            Value::Table(t) => fmt::Debug::fmt(t, f),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(Integer::I64(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(Integer::I64(v as i64))
    }
}

impl From<Integer> for Value {
    fn from(v: Integer) -> Self {
        Value::Integer(v)
    }
}

impl From<BigInt> for Value {
    fn from(v: BigInt) -> Self {
        Value::Integer(Integer::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<Datetime> for Value {
    fn from(v: Datetime) -> Self {
        Value::Datetime(v)
    }
}

impl From<Array> for Value {
    fn from(v: Array) -> Self {
        Value::Array(v)
    }
}

impl From<Table> for Value {
    fn from(v: Table) -> Self {
        Value::Table(v)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Value {
    fn serialize<S>(&self, ser: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Value::String(s) => ser.serialize_str(s),
            Value::Integer(Integer::I64(i)) => ser.serialize_i64(*i),
            Value::Integer(big) => ser.collect_str(big),
            Value::Float(f) => ser.serialize_f64(*f),
            Value::Boolean(b) => ser.serialize_bool(*b),
            Value::Datetime(dt) => dt.serialize(ser),
            Value::Array(arr) => {
                use serde::ser::SerializeSeq;
                let mut seq = ser.serialize_seq(Some(arr.len()))?;
                for ele in arr {
                    seq.serialize_element(ele)?;
                }
                seq.end()
            }
            Value::Table(tab) => tab.serialize(ser),
        }
    }
}
