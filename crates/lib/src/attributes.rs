//! Attribute maps seen by caller code.
//!
//! - [`Attributes`] is the accumulator handed to lazy values and transformer
//!   layers while layers are being collapsed.
//! - [`Arguments`] is the final, fully resolved map handed to a factory's
//!   constructor, restricted to the keys the definition declares.

use std::any::Any;
use std::cell::RefCell;

use indexmap::IndexMap;

use crate::error::{FactoryError, Result};
use crate::layer::{Attr, Overrides};
use crate::value::{FromValue, Value};

/// The in-progress attribute map.
///
/// Definition defaults stay pending until something reads them or the
/// collapse finishes. Each runs at most once per make: the first read stores
/// its result, and later reads see that stored value.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
  entries: IndexMap<String, Attr>,
  settled: RefCell<IndexMap<String, Attr>>,
  evaluating: RefCell<Vec<String>>,
}

impl Attributes {
  /// Read an attribute as `T`.
  ///
  /// A definition default that has not been evaluated yet is evaluated against
  /// this same map. Nested builders and deferred values are not readable here;
  /// they only resolve after all layers are applied, so reading a key that
  /// holds one fails with [`FactoryError::TypeMismatch`]. A default that reads
  /// itself, directly or through other defaults, fails with
  /// [`FactoryError::CyclicAttribute`].
  pub fn get<T: FromValue>(&self, key: &str) -> Result<T> {
    match self.value(key)? {
      Some(value) => T::from_value(value).map_err(|e| e.for_attribute(key)),
      None => Err(FactoryError::UndefinedAttribute {
        attribute: key.to_string(),
      }),
    }
  }

  /// Read an attribute as a [`Value`], or `None` if no layer has set it.
  pub fn value(&self, key: &str) -> Result<Option<Value>> {
    let Some(entry) = self.settle_entry(key)? else {
      return Ok(None);
    };
    entry.literal().map(Some).ok_or_else(|| FactoryError::TypeMismatch {
      attribute: key.to_string(),
      expected: "literal value",
      found: entry.kind(),
    })
  }

  /// The raw entry for `key`, without evaluating anything.
  pub fn entry(&self, key: &str) -> Option<&Attr> {
    self.entries.get(key)
  }

  pub fn contains(&self, key: &str) -> bool {
    self.entries.contains_key(key)
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.entries.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Render the map as JSON, if every entry is already literal data.
  pub fn to_json(&self) -> Option<serde_json::Value> {
    self
      .entries
      .iter()
      .map(|(k, v)| v.literal().and_then(|v| v.to_json()).map(|v| (k.clone(), v)))
      .collect::<Option<serde_json::Map<_, _>>>()
      .map(serde_json::Value::Object)
  }

  /// The entry for `key` with a pending default evaluated, once.
  pub(crate) fn settle_entry(&self, key: &str) -> Result<Option<Attr>> {
    let Some(entry) = self.entries.get(key) else {
      return Ok(None);
    };
    let Attr::Lazy(lazy) = entry else {
      return Ok(Some(entry.clone()));
    };
    if let Some(attr) = self.settled.borrow().get(key) {
      return Ok(Some(attr.clone()));
    }
    if self.evaluating.borrow().iter().any(|k| k == key) {
      return Err(FactoryError::CyclicAttribute {
        attribute: key.to_string(),
      });
    }

    self.evaluating.borrow_mut().push(key.to_string());
    let evaluated = lazy.evaluate(key, self);
    self.evaluating.borrow_mut().pop();

    let attr = evaluated?;
    self.settled.borrow_mut().insert(key.to_string(), attr.clone());
    Ok(Some(attr))
  }

  /// Write defaults evaluated by reads back into the map.
  ///
  /// A key overwritten since its default was read keeps the newer value.
  pub(crate) fn flush_settled(&mut self) {
    for (key, attr) in std::mem::take(self.settled.get_mut()) {
      match self.entries.get_mut(&key) {
        Some(entry) if matches!(entry, Attr::Lazy(_)) => *entry = attr,
        _ => {}
      }
    }
  }

  /// Replace the value for `key`. An existing key keeps its position.
  pub(crate) fn set(&mut self, key: String, attr: Attr) {
    self.entries.insert(key, attr);
  }

  /// Keys whose entries are still unevaluated lazy values, in map order.
  pub(crate) fn pending(&self) -> Vec<String> {
    self
      .entries
      .iter()
      .filter(|(_, attr)| matches!(attr, Attr::Lazy(_)))
      .map(|(k, _)| k.clone())
      .collect()
  }

  pub(crate) fn into_entries(self) -> IndexMap<String, Attr> {
    self.entries
  }
}

impl From<Overrides> for Attributes {
  fn from(overrides: Overrides) -> Self {
    Self {
      entries: overrides.into_iter().collect(),
      ..Self::default()
    }
  }
}

/// Resolved named arguments for a factory constructor.
#[derive(Debug, Clone)]
pub struct Arguments {
  target: &'static str,
  values: IndexMap<String, Value>,
}

impl Arguments {
  pub(crate) fn new(target: &'static str, values: IndexMap<String, Value>) -> Self {
    Self { target, values }
  }

  /// Type name of the object being constructed.
  pub fn target(&self) -> &'static str {
    self.target
  }

  /// Remove a required argument and convert it.
  ///
  /// # Errors
  ///
  /// [`FactoryError::MissingRequiredAttribute`] if the resolved map has no
  /// such key, [`FactoryError::TypeMismatch`] if it cannot be converted.
  pub fn take<T: FromValue>(&mut self, key: &str) -> Result<T> {
    let value = self.take_value(key)?;
    T::from_value(value).map_err(|e| e.for_attribute(key))
  }

  /// Remove an argument that may be absent or null.
  pub fn take_optional<T: FromValue>(&mut self, key: &str) -> Result<Option<T>> {
    match self.values.shift_remove(key) {
      None | Some(Value::Null) => Ok(None),
      Some(value) => T::from_value(value).map(Some).map_err(|e| e.for_attribute(key)),
    }
  }

  /// Remove a required argument holding a constructed object.
  pub fn take_object<T: Any + Clone>(&mut self, key: &str) -> Result<T> {
    self.take_value(key)?.into_object::<T>().map_err(|e| e.for_attribute(key))
  }

  /// Remove a required argument holding a function value.
  pub fn take_function<F: Any + Clone>(&mut self, key: &str) -> Result<F> {
    self
      .take_value(key)?
      .into_function::<F>()
      .map_err(|e| e.for_attribute(key))
  }

  fn take_value(&mut self, key: &str) -> Result<Value> {
    self
      .values
      .shift_remove(key)
      .ok_or_else(|| FactoryError::MissingRequiredAttribute {
        attribute: key.to_string(),
        target: self.target,
      })
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.values.get(key)
  }

  pub fn contains(&self, key: &str) -> bool {
    self.values.contains_key(key)
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.values.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn into_values(self) -> IndexMap<String, Value> {
    self.values
  }

  /// Render the arguments as JSON, if they are all literal data.
  pub fn to_json(&self) -> Option<serde_json::Value> {
    serde_json::to_value(&self.values).ok()
  }
}
