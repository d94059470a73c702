//! Renderable Values
//!
//! Everything a template binding can receive is a [`Value`]. The enum is
//! closed: each part kind matches on it and rejects what it cannot render.
//!
//! # Change Detection
//!
//! Parts skip a commit when the new value is [`Value::same_as`] the last
//! committed one. Primitives compare by value; nodes, listeners and objects
//! compare by identity. Template results and lists always go through their
//! own diffing, and directives are always re-invoked.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::directive::DirectiveResult;
use crate::dom::{EventListener, Node};
use crate::template::TemplateResult;

#[derive(Clone)]
pub enum Value {
    /// Renders nothing: clears child content, removes attributes.
    Nothing,
    /// Leaves whatever is currently rendered untouched.
    NoChange,
    /// Empty string in attribute positions, empty content in child positions.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Template(TemplateResult),
    List(Vec<Value>),
    Node(Node),
    Listener(EventListener),
    Directive(DirectiveResult),
    /// Opaque payload for property bindings.
    Object(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Wrap an arbitrary value for a property binding.
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        Value::Object(Arc::new(value))
    }

    pub fn as_object<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Object(object) => (**object).downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(text) => Some(text),
            _ => None,
        }
    }

    /// Name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nothing => "nothing",
            Value::NoChange => "no-change",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Template(_) => "template result",
            Value::List(_) => "list",
            Value::Node(_) => "node",
            Value::Listener(_) => "event listener",
            Value::Directive(_) => "directive",
            Value::Object(_) => "object",
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_)
        )
    }

    /// Whether a part may skip committing `other` after committing `self`.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nothing, Value::Nothing) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Node(a), Value::Node(b)) => a.is_same_node(b),
            (Value::Listener(a), Value::Listener(b)) => a.same_as(b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Truthiness used by boolean attribute bindings.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nothing | Value::NoChange | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// String form of a primitive; `Null` is the empty string. `None` for
    /// values with no string form.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => Some(String::new()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(format_float(*f)),
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

/// Integral floats print without a fraction, as markup authors expect.
fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::NoChange, Value::NoChange) => true,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Template(a), Value::Template(b)) => a == b,
            (Value::Directive(a), Value::Directive(b)) => a.same_as(b),
            _ => self.same_as(other),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nothing => f.write_str("Nothing"),
            Value::NoChange => f.write_str("NoChange"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Template(result) => fmt::Debug::fmt(result, f),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Node(node) => f.debug_tuple("Node").field(node).finish(),
            Value::Listener(listener) => fmt::Debug::fmt(listener, f),
            Value::Directive(result) => fmt::Debug::fmt(result, f),
            Value::Object(_) => f.write_str("Object(..)"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value.into())
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        match i64::try_from(value) {
            Ok(value) => Value::Int(value),
            Err(_) => Value::Float(value as f64),
        }
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Str(value.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<TemplateResult> for Value {
    fn from(value: TemplateResult) -> Self {
        Value::Template(value)
    }
}

impl From<Node> for Value {
    fn from(value: Node) -> Self {
        Value::Node(value)
    }
}

impl From<&Node> for Value {
    fn from(value: &Node) -> Self {
        Value::Node(value.clone())
    }
}

impl From<EventListener> for Value {
    fn from(value: EventListener) -> Self {
        Value::Listener(value)
    }
}

impl From<DirectiveResult> for Value {
    fn from(value: DirectiveResult) -> Self {
        Value::Directive(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_identity() {
        assert!(Value::from("a").same_as(&Value::from("a")));
        assert!(Value::from(3).same_as(&Value::Int(3)));
        assert!(!Value::from(3).same_as(&Value::Float(3.0)));
        assert!(!Value::NoChange.same_as(&Value::NoChange));
        assert!(!Value::from(vec![1]).same_as(&Value::from(vec![1])));
    }

    #[test]
    fn test_reference_identity() {
        let node = Node::element("p");
        let object = Value::object(5u8);

        assert!(Value::from(&node).same_as(&Value::from(&node)));
        assert!(!Value::from(&node).same_as(&Value::from(Node::element("p"))));
        assert!(object.same_as(&object.clone()));
        assert!(!object.same_as(&Value::object(5u8)));
        assert_eq!(object.as_object::<u8>(), Some(&5));
    }

    #[test]
    fn test_attribute_strings() {
        assert_eq!(Value::Null.to_text().as_deref(), Some(""));
        assert_eq!(Value::from(2.0).to_text().as_deref(), Some("2"));
        assert_eq!(Value::from(2.5).to_text().as_deref(), Some("2.5"));
        assert_eq!(Value::from(false).to_text().as_deref(), Some("false"));
        assert_eq!(Value::Nothing.to_text(), None);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::from("").is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(Value::from(vec![0]).is_truthy());
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }
}
