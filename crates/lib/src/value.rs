//! Resolved attribute values.
//!
//! A [`Value`] is what an attribute holds once every layer has been applied,
//! every nested builder made and every deferred function unwrapped. Literal
//! data (numbers, strings, lists, maps) sits next to two opaque kinds:
//!
//! - [`Object`] - an already constructed value of any `'static` type, such as
//!   the product of a nested builder or a handler instance from a definition
//! - [`Function`] - a function kept as data, the result of unwrapping a
//!   [`Deferred`](crate::deferred::Deferred)
//!
//! Typed extraction goes through [`FromValue`].

use std::any::{Any, type_name};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::error::{FactoryError, Result};

/// An already constructed value of arbitrary type.
///
/// Cloning an `Object` shares the underlying value.
#[derive(Clone)]
pub struct Object {
  value: Rc<dyn Any>,
  type_name: &'static str,
}

impl Object {
  pub fn new<T: Any>(value: T) -> Self {
    Self {
      value: Rc::new(value),
      type_name: type_name::<T>(),
    }
  }

  /// Name of the concrete type held, for diagnostics.
  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  pub fn is<T: Any>(&self) -> bool {
    self.value.is::<T>()
  }

  pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
    self.value.downcast_ref::<T>()
  }

  /// Take the held value out, cloning it if the object is shared.
  pub fn downcast<T: Any + Clone>(self) -> std::result::Result<T, Self> {
    let type_name = self.type_name;
    match self.value.downcast::<T>() {
      Ok(rc) => Ok(Rc::unwrap_or_clone(rc)),
      Err(value) => Err(Self { value, type_name }),
    }
  }
}

impl PartialEq for Object {
  fn eq(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.value, &other.value)
  }
}

impl fmt::Debug for Object {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Object({})", self.type_name)
  }
}

/// A function stored as a final attribute value.
///
/// The engine never calls it. Typical contents are `fn` pointers or
/// `Rc<dyn Fn(..)>` handles; [`Function::get`] hands back a copy of whichever
/// type was stored.
#[derive(Clone, PartialEq)]
pub struct Function(Object);

impl Function {
  pub fn new<F: Any + Clone>(function: F) -> Self {
    Self(Object::new(function))
  }

  pub fn type_name(&self) -> &'static str {
    self.0.type_name()
  }

  pub fn get<F: Any + Clone>(&self) -> Option<F> {
    self.0.downcast_ref::<F>().cloned()
  }
}

impl fmt::Debug for Function {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Function({})", self.type_name())
  }
}

/// A fully resolved attribute value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
  #[default]
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  String(String),
  List(Vec<Value>),
  Map(IndexMap<String, Value>),
  Object(Object),
  Function(Function),
}

impl Value {
  /// Wrap an already constructed value.
  pub fn object<T: Any>(value: T) -> Self {
    Value::Object(Object::new(value))
  }

  pub fn is_null(&self) -> bool {
    matches!(self, Value::Null)
  }

  /// Short name of the variant, used in type mismatch errors.
  pub fn kind(&self) -> &'static str {
    match self {
      Value::Null => "null",
      Value::Bool(_) => "bool",
      Value::Int(_) => "int",
      Value::Float(_) => "float",
      Value::String(_) => "string",
      Value::List(_) => "list",
      Value::Map(_) => "map",
      Value::Object(_) => "object",
      Value::Function(_) => "function",
    }
  }

  /// Extract a constructed object of type `T`.
  pub fn into_object<T: Any + Clone>(self) -> Result<T> {
    match self {
      Value::Object(object) => object.downcast::<T>().map_err(|object| mismatch(type_name::<T>(), object.type_name())),
      other => Err(mismatch(type_name::<T>(), other.kind())),
    }
  }

  /// Extract a function value of type `F`.
  pub fn into_function<F: Any + Clone>(self) -> Result<F> {
    match self {
      Value::Function(function) => function
        .get::<F>()
        .ok_or_else(|| mismatch(type_name::<F>(), function.type_name())),
      other => Err(mismatch(type_name::<F>(), other.kind())),
    }
  }

  /// Render literal data as JSON. Objects and functions have no JSON form.
  pub fn to_json(&self) -> Option<serde_json::Value> {
    serde_json::to_value(self).ok()
  }
}

impl Serialize for Value {
  fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match self {
      Value::Null => serializer.serialize_unit(),
      Value::Bool(b) => serializer.serialize_bool(*b),
      Value::Int(i) => serializer.serialize_i64(*i),
      Value::Float(f) => serializer.serialize_f64(*f),
      Value::String(s) => serializer.serialize_str(s),
      Value::List(items) => {
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
          seq.serialize_element(item)?;
        }
        seq.end()
      }
      Value::Map(entries) => {
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (k, v) in entries {
          map.serialize_entry(k, v)?;
        }
        map.end()
      }
      Value::Object(object) => Err(S::Error::custom(format!(
        "object of type {} has no data representation",
        object.type_name()
      ))),
      Value::Function(function) => Err(S::Error::custom(format!(
        "function of type {} has no data representation",
        function.type_name()
      ))),
    }
  }
}

/// JSON numbers that fit `i64` become [`Value::Int`]. Every other number,
/// including unsigned integers above `i64::MAX`, becomes [`Value::Float`] and
/// may lose precision; reading one back as an integer is a type mismatch.
impl From<serde_json::Value> for Value {
  fn from(json: serde_json::Value) -> Self {
    match json {
      serde_json::Value::Null => Value::Null,
      serde_json::Value::Bool(b) => Value::Bool(b),
      serde_json::Value::Number(n) => match n.as_i64() {
        Some(i) => Value::Int(i),
        None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
      },
      serde_json::Value::String(s) => Value::String(s),
      serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
      serde_json::Value::Object(entries) => Value::Map(entries.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
    }
  }
}

macro_rules! value_from_int {
  ($($t:ty),*) => {
    $(
      impl From<$t> for Value {
        fn from(i: $t) -> Self {
          Value::Int(i64::from(i))
        }
      }
    )*
  };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
  fn from(b: bool) -> Self {
    Value::Bool(b)
  }
}

impl From<f32> for Value {
  fn from(f: f32) -> Self {
    Value::Float(f64::from(f))
  }
}

impl From<f64> for Value {
  fn from(f: f64) -> Self {
    Value::Float(f)
  }
}

impl From<String> for Value {
  fn from(s: String) -> Self {
    Value::String(s)
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Value::String(s.to_string())
  }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
  fn from(items: Vec<T>) -> Self {
    Value::List(items.into_iter().map(Into::into).collect())
  }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(value: Option<T>) -> Self {
    value.map_or(Value::Null, Into::into)
  }
}

impl From<IndexMap<String, Value>> for Value {
  fn from(entries: IndexMap<String, Value>) -> Self {
    Value::Map(entries)
  }
}

impl From<Object> for Value {
  fn from(object: Object) -> Self {
    Value::Object(object)
  }
}

impl From<Function> for Value {
  fn from(function: Function) -> Self {
    Value::Function(function)
  }
}

/// Typed extraction from a resolved [`Value`].
///
/// Constructed objects are not covered by a blanket impl; a fixture type that
/// appears inside lists or maps implements this with
/// [`Value::into_object`]:
///
/// ```
/// use fixtory_lib::value::{FromValue, Value};
///
/// #[derive(Clone)]
/// struct Account {
///   id: i64,
/// }
///
/// impl FromValue for Account {
///   fn from_value(value: Value) -> fixtory_lib::Result<Self> {
///     value.into_object()
///   }
/// }
///
/// let accounts: Vec<Account> = FromValue::from_value(Value::List(vec![Value::object(Account { id: 7 })])).unwrap();
/// assert_eq!(accounts[0].id, 7);
/// ```
pub trait FromValue: Sized {
  fn from_value(value: Value) -> Result<Self>;
}

/// Type mismatch without an attribute name; callers that know the key attach it.
pub(crate) fn mismatch(expected: &'static str, found: &'static str) -> FactoryError {
  FactoryError::TypeMismatch {
    attribute: String::new(),
    expected,
    found,
  }
}

macro_rules! int_from_value {
  ($($t:ty),*) => {
    $(
      impl FromValue for $t {
        fn from_value(value: Value) -> Result<Self> {
          match value {
            Value::Int(i) => <$t>::try_from(i).map_err(|_| mismatch(stringify!($t), "int out of range")),
            other => Err(mismatch(stringify!($t), other.kind())),
          }
        }
      }
    )*
  };
}

int_from_value!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl FromValue for f64 {
  fn from_value(value: Value) -> Result<Self> {
    match value {
      Value::Float(f) => Ok(f),
      Value::Int(i) => Ok(i as f64),
      other => Err(mismatch("f64", other.kind())),
    }
  }
}

impl FromValue for bool {
  fn from_value(value: Value) -> Result<Self> {
    match value {
      Value::Bool(b) => Ok(b),
      other => Err(mismatch("bool", other.kind())),
    }
  }
}

impl FromValue for String {
  fn from_value(value: Value) -> Result<Self> {
    match value {
      Value::String(s) => Ok(s),
      other => Err(mismatch("string", other.kind())),
    }
  }
}

impl FromValue for Value {
  fn from_value(value: Value) -> Result<Self> {
    Ok(value)
  }
}

impl FromValue for serde_json::Value {
  fn from_value(value: Value) -> Result<Self> {
    value.to_json().ok_or_else(|| mismatch("json", value.kind()))
  }
}

impl<T: FromValue> FromValue for Option<T> {
  fn from_value(value: Value) -> Result<Self> {
    match value {
      Value::Null => Ok(None),
      other => T::from_value(other).map(Some),
    }
  }
}

impl<T: FromValue> FromValue for Vec<T> {
  fn from_value(value: Value) -> Result<Self> {
    match value {
      Value::List(items) => items.into_iter().map(T::from_value).collect(),
      other => Err(mismatch("list", other.kind())),
    }
  }
}

impl<T: FromValue> FromValue for IndexMap<String, T> {
  fn from_value(value: Value) -> Result<Self> {
    match value {
      Value::Map(entries) => entries.into_iter().map(|(k, v)| Ok((k, T::from_value(v)?))).collect(),
      other => Err(mismatch("map", other.kind())),
    }
  }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
  fn from_value(value: Value) -> Result<Self> {
    match value {
      Value::Map(entries) => entries.into_iter().map(|(k, v)| Ok((k, T::from_value(v)?))).collect(),
      other => Err(mismatch("map", other.kind())),
    }
  }
}
