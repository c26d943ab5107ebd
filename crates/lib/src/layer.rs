//! Override layers and the entries they carry.
//!
//! A builder is a stack of layers applied in registration order. Each layer is
//! either a literal map of attribute entries or a whole-map transformer that
//! computes such a map from the attributes accumulated so far.
//!
//! An entry ([`Attr`]) is one of:
//! - a literal [`Value`]
//! - a [`Lazy`] function of the accumulated attributes, evaluated when its
//!   layer is applied
//! - a nested builder, made once all layers are collapsed
//! - a [`Deferred`] function, unwrapped at the very end
//! - a list or map of entries (so nested builders can sit inside containers)

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::attributes::Attributes;
use crate::deferred::Deferred;
use crate::error::{FactoryError, Result};
use crate::value::{Function, Object, Value};

/// A builder that can be made from inside another builder's attributes.
pub trait Nested {
  /// Make the object and wrap it as a [`Value::Object`].
  fn make_value(&self) -> Result<Value>;

  /// Type name of the object this builder produces.
  fn target_name(&self) -> &'static str;
}

type LazyFn = dyn Fn(&Attributes) -> anyhow::Result<Attr>;

/// A per-property function of the accumulated attributes.
#[derive(Clone)]
pub struct Lazy(Rc<LazyFn>);

impl Lazy {
  pub fn new<F, R>(f: F) -> Self
  where
    F: Fn(&Attributes) -> anyhow::Result<R> + 'static,
    R: Into<Attr>,
  {
    Self(Rc::new(move |attrs: &Attributes| f(attrs).map(Into::into)))
  }

  /// Evaluate against `attrs`. The result must be a concrete entry.
  pub(crate) fn evaluate(&self, key: &str, attrs: &Attributes) -> Result<Attr> {
    match (self.0)(attrs).map_err(FactoryError::from_caller)? {
      Attr::Lazy(_) => Err(FactoryError::invalid_shape(format!(
        "lazy value for '{key}' returned another lazy value"
      ))),
      attr => Ok(attr),
    }
  }
}

impl fmt::Debug for Lazy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Lazy")
  }
}

/// One attribute entry inside a layer.
#[derive(Clone)]
pub enum Attr {
  Value(Value),
  Lazy(Lazy),
  Builder(Rc<dyn Nested>),
  Deferred(Deferred),
  List(Vec<Attr>),
  Map(IndexMap<String, Attr>),
}

impl Attr {
  pub fn lazy<F, R>(f: F) -> Self
  where
    F: Fn(&Attributes) -> anyhow::Result<R> + 'static,
    R: Into<Attr>,
  {
    Attr::Lazy(Lazy::new(f))
  }

  /// Wrap an already constructed object (a handler, a client, a prior fixture).
  pub fn object<T: std::any::Any>(value: T) -> Self {
    Attr::Value(Value::object(value))
  }

  pub fn list<I, T>(items: I) -> Self
  where
    I: IntoIterator<Item = T>,
    T: Into<Attr>,
  {
    Attr::List(items.into_iter().map(Into::into).collect())
  }

  pub fn map<I, K, T>(entries: I) -> Self
  where
    I: IntoIterator<Item = (K, T)>,
    K: Into<String>,
    T: Into<Attr>,
  {
    Attr::Map(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
  }

  pub fn kind(&self) -> &'static str {
    match self {
      Attr::Value(value) => value.kind(),
      Attr::Lazy(_) => "lazy",
      Attr::Builder(_) => "builder",
      Attr::Deferred(_) => "deferred",
      Attr::List(_) => "list",
      Attr::Map(_) => "map",
    }
  }

  /// The entry as plain data, if it holds nothing that still needs resolving.
  pub fn literal(&self) -> Option<Value> {
    match self {
      Attr::Value(value) => Some(value.clone()),
      Attr::List(items) => items.iter().map(Attr::literal).collect::<Option<Vec<_>>>().map(Value::List),
      Attr::Map(entries) => entries
        .iter()
        .map(|(k, v)| v.literal().map(|v| (k.clone(), v)))
        .collect::<Option<IndexMap<_, _>>>()
        .map(Value::Map),
      Attr::Lazy(_) | Attr::Builder(_) | Attr::Deferred(_) => None,
    }
  }
}

impl fmt::Debug for Attr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Attr::Value(value) => f.debug_tuple("Value").field(value).finish(),
      Attr::Lazy(lazy) => lazy.fmt(f),
      Attr::Builder(nested) => write!(f, "Builder({})", nested.target_name()),
      Attr::Deferred(deferred) => f.debug_tuple("Deferred").field(deferred).finish(),
      Attr::List(items) => f.debug_tuple("List").field(items).finish(),
      Attr::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
    }
  }
}

macro_rules! attr_from_value {
  ($($t:ty),*) => {
    $(
      impl From<$t> for Attr {
        fn from(value: $t) -> Self {
          Attr::Value(Value::from(value))
        }
      }
    )*
  };
}

attr_from_value!(
  bool,
  i8,
  i16,
  i32,
  i64,
  u8,
  u16,
  u32,
  f32,
  f64,
  String,
  &str,
  Value,
  Object,
  Function,
  serde_json::Value
);

impl From<Lazy> for Attr {
  fn from(lazy: Lazy) -> Self {
    Attr::Lazy(lazy)
  }
}

impl From<Deferred> for Attr {
  fn from(deferred: Deferred) -> Self {
    Attr::Deferred(deferred)
  }
}

impl From<Vec<Attr>> for Attr {
  fn from(items: Vec<Attr>) -> Self {
    Attr::List(items)
  }
}

impl From<IndexMap<String, Attr>> for Attr {
  fn from(entries: IndexMap<String, Attr>) -> Self {
    Attr::Map(entries)
  }
}

/// An ordered map of attribute entries.
#[derive(Debug, Clone, Default)]
pub struct Overrides(IndexMap<String, Attr>);

impl Overrides {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, key: impl Into<String>, value: impl Into<Attr>) -> Self {
    self.set(key, value);
    self
  }

  /// Add a per-property function of the accumulated attributes.
  pub fn lazy<F, R>(self, key: impl Into<String>, f: F) -> Self
  where
    F: Fn(&Attributes) -> anyhow::Result<R> + 'static,
    R: Into<Attr>,
  {
    self.with(key, Attr::lazy(f))
  }

  pub fn set(&mut self, key: impl Into<String>, value: impl Into<Attr>) {
    self.0.insert(key.into(), value.into());
  }

  pub fn get(&self, key: &str) -> Option<&Attr> {
    self.0.get(key)
  }

  pub fn contains(&self, key: &str) -> bool {
    self.0.contains_key(key)
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.0.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Convert a JSON object into literal entries.
  pub fn from_json(json: &serde_json::Value) -> Result<Self> {
    match json {
      serde_json::Value::Object(entries) => Ok(
        entries
          .iter()
          .map(|(k, v)| (k.clone(), Attr::Value(Value::from(v.clone()))))
          .collect(),
      ),
      other => Err(FactoryError::invalid_shape(format!(
        "layer must be a map or a function, found {}",
        json_kind(other)
      ))),
    }
  }
}

fn json_kind(json: &serde_json::Value) -> &'static str {
  match json {
    serde_json::Value::Null => "null",
    serde_json::Value::Bool(_) => "bool",
    serde_json::Value::Number(_) => "number",
    serde_json::Value::String(_) => "string",
    serde_json::Value::Array(_) => "array",
    serde_json::Value::Object(_) => "object",
  }
}

impl<K: Into<String>, V: Into<Attr>> FromIterator<(K, V)> for Overrides {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
  }
}

impl IntoIterator for Overrides {
  type Item = (String, Attr);
  type IntoIter = indexmap::map::IntoIter<String, Attr>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.into_iter()
  }
}

type TransformFn = dyn Fn(&Attributes) -> anyhow::Result<Layer>;

/// A whole-map transformer: computes a layer from the accumulated attributes.
#[derive(Clone)]
pub struct Transform(Rc<TransformFn>);

impl Transform {
  pub(crate) fn apply(&self, attrs: &Attributes) -> Result<Layer> {
    (self.0)(attrs).map_err(FactoryError::from_caller)
  }
}

/// One unit of override, applied in registration order.
#[derive(Clone)]
pub enum Layer {
  /// Literal entries.
  Map(Overrides),
  /// A JSON document. Only objects are valid; the shape is checked when the
  /// layer is applied, not when it is registered.
  Json(serde_json::Value),
  /// A function of the accumulated attributes returning a map layer.
  Transform(Transform),
}

impl Layer {
  pub fn transform<F, L>(f: F) -> Self
  where
    F: Fn(&Attributes) -> anyhow::Result<L> + 'static,
    L: Into<Layer>,
  {
    Layer::Transform(Transform(Rc::new(move |attrs: &Attributes| f(attrs).map(Into::into))))
  }
}

impl fmt::Debug for Layer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Layer::Map(overrides) => f.debug_tuple("Map").field(overrides).finish(),
      Layer::Json(json) => f.debug_tuple("Json").field(json).finish(),
      Layer::Transform(_) => f.write_str("Transform"),
    }
  }
}

impl From<Overrides> for Layer {
  fn from(overrides: Overrides) -> Self {
    Layer::Map(overrides)
  }
}

impl From<serde_json::Value> for Layer {
  fn from(json: serde_json::Value) -> Self {
    Layer::Json(json)
  }
}
