//! Deferred-value wrapper.
//!
//! Lazy attributes are functions the engine calls while collapsing layers.
//! When the attribute itself should *be* a function (a callback property on
//! the constructed object, say), wrap it in [`Deferred`]: the engine carries
//! it through resolution untouched and unwraps it to a
//! [`Value::Function`](crate::value::Value::Function) at the very end.

use std::any::Any;

use crate::value::{Function, Value};

/// Marker holding a function that is data, not a lazy computation.
#[derive(Debug, Clone, PartialEq)]
pub struct Deferred(Function);

impl Deferred {
  pub fn of<F: Any + Clone>(function: F) -> Self {
    Self(Function::new(function))
  }

  /// Remove the wrapper. The function is not invoked.
  pub fn unwrap(self) -> Value {
    Value::Function(self.0)
  }
}
