//! The value model: what can cross a template boundary.
//!
//! Templates and props carry [`Value`]s, not strings. Strings, numbers
//! and booleans flow into markup as text; everything else (structured
//! data, callbacks, live node collections) travels by reference
//! identifier and comes back out of the registry unchanged on the
//! consuming side.

use std::fmt;
use std::rc::Rc;

use filament_dom::NodeId;
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Insertion-ordered property mapping (camelCase keys).
pub type PropMap = IndexMap<String, Value>;

/// A callback value. Invoked with a borrowed argument list, returns a
/// value (use [`Value::Null`] for "nothing").
pub type Callback = Rc<dyn Fn(&[Value]) -> Value>;

/// A value passed through a template or a prop mapping.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// Structured data (objects, arrays) carried as JSON.
    Data(serde_json::Value),
    /// A nested property mapping; spreadable into attributes.
    Map(PropMap),
    /// A callback.
    Func(Callback),
    /// Live nodes, insertable into content position.
    Nodes(Vec<NodeId>),
}

impl Value {
    pub fn func(f: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Value::Func(Rc::new(f))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Data(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&PropMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_func(&self) -> Option<&Callback> {
        match self {
            Value::Func(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_nodes(&self) -> Option<&[NodeId]> {
        match self {
            Value::Nodes(n) => Some(n),
            _ => None,
        }
    }

    /// Invokes a callback value. `None` when the value is not callable.
    pub fn call(&self, args: &[Value]) -> Option<Value> {
        self.as_func().map(|f| f(args))
    }

    /// Text form for primitives; `None` for values that must travel by
    /// reference.
    pub(crate) fn primitive_text(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(format_number(*n)),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// Formats a number the way markup expects: integral floats drop the
/// fraction (`3.0` → `"3"`), everything else uses the shortest display.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Data(v) => write!(f, "Data({})", v),
            Value::Map(m) => f.debug_tuple("Map").field(m).finish(),
            Value::Func(_) => f.write_str("Func(..)"),
            Value::Nodes(n) => f.debug_tuple("Nodes").field(n).finish(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Data(a), Value::Data(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Func(a), Value::Func(b)) => Rc::ptr_eq(a, b),
            (Value::Nodes(a), Value::Nodes(b)) => a == b,
            _ => false,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Value::String(s) => serializer.serialize_str(s),
            Value::Data(v) => v.serialize(serializer),
            Value::Map(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            // Callbacks and live nodes have no data representation.
            Value::Func(_) | Value::Nodes(_) => serializer.serialize_unit(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Data(v)
    }
}

impl From<PropMap> for Value {
    fn from(m: PropMap) -> Self {
        Value::Map(m)
    }
}

impl From<Vec<NodeId>> for Value {
    fn from(nodes: Vec<NodeId>) -> Self {
        Value::Nodes(nodes)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(42.42), "42.42");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.5), "0.5");
    }

    #[test]
    fn integral_numbers_serialize_as_integers() {
        let mut props = PropMap::new();
        props.insert("num".into(), Value::Number(100.0));
        props.insert("str".into(), Value::String("0x".into()));
        let json = serde_json::to_string(&Value::Map(props)).unwrap();
        assert_eq!(json, r#"{"num":100,"str":"0x"}"#);
    }

    #[test]
    fn callbacks_invoke() {
        let v = Value::func(|_| Value::from("hello, world"));
        assert_eq!(v.call(&[]).unwrap().as_str(), Some("hello, world"));
    }

    #[test]
    fn primitive_text_covers_only_primitives() {
        assert_eq!(Value::from(2.2).primitive_text().as_deref(), Some("2.2"));
        assert_eq!(Value::from(true).primitive_text().as_deref(), Some("true"));
        assert!(Value::Data(serde_json::json!([1])).primitive_text().is_none());
        assert!(Value::Null.primitive_text().is_none());
    }
}
