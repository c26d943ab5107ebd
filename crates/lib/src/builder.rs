//! Factories and the builders that layer overrides on top of them.
//!
//! A [`Factory`] declares, once per target type, the base attribute map
//! (its definition) and how to construct the target from resolved
//! [`Arguments`]. A [`Builder`] accumulates override layers and
//! post-construction callbacks for one factory and makes objects from them.
//!
//! # Example
//!
//! ```
//! use fixtory_lib::{Arguments, Builder, Factory, Overrides, Result};
//! use serde_json::json;
//!
//! struct Account {
//!   id: i64,
//!   name: String,
//! }
//!
//! #[derive(Default)]
//! struct AccountFactory;
//!
//! impl Factory for AccountFactory {
//!   type Target = Account;
//!
//!   fn definition(&self) -> Result<Overrides> {
//!     Ok(Overrides::new().with("id", 1).with("name", "John Doe"))
//!   }
//!
//!   fn construct(&self, mut args: Arguments) -> Result<Account> {
//!     Ok(Account {
//!       id: args.take("id")?,
//!       name: args.take("name")?,
//!     })
//!   }
//! }
//!
//! let account = AccountFactory::new()?
//!   .state(json!({"id": 2, "name": "John Smith"}))
//!   .make_with(json!({"id": 3}))?;
//! assert_eq!(account.id, 3);
//! assert_eq!(account.name, "John Smith");
//! # Ok::<(), fixtory_lib::FactoryError>(())
//! ```

use std::any::type_name;
use std::rc::Rc;

use tracing::debug;

use crate::attributes::Arguments;
use crate::error::{FactoryError, Result};
use crate::layer::{Attr, Layer, Nested, Overrides};
use crate::resolve::resolve;
use crate::value::Value;

/// Declares how to build one target type.
pub trait Factory: Sized + 'static {
  type Target: 'static;

  /// The base attribute map. Its keys are the only attributes that reach
  /// [`Factory::construct`]; entries may be lazy defaults or nested builders.
  fn definition(&self) -> Result<Overrides>;

  /// Build the target from resolved arguments.
  ///
  /// Use [`Arguments::take`] for each constructor parameter so that a missing
  /// attribute surfaces as [`FactoryError::MissingRequiredAttribute`].
  fn construct(&self, args: Arguments) -> Result<Self::Target>;

  /// Start a builder seeded with this factory's definition.
  fn new() -> Result<Builder<Self>>
  where
    Self: Default,
  {
    Builder::from_factory(Self::default())
  }
}

type Callback<T> = Rc<dyn Fn(&mut T) -> anyhow::Result<()>>;

/// Accumulates layers and callbacks for a factory.
///
/// Named states are added with an extension trait on `Builder<YourFactory>`:
///
/// ```ignore
/// trait AccountStates {
///   fn john_smith(self) -> Self;
/// }
///
/// impl AccountStates for Builder<AccountFactory> {
///   fn john_smith(self) -> Self {
///     self.state(json!({"id": 2, "name": "John Smith"}))
///   }
/// }
/// ```
pub struct Builder<F: Factory> {
  factory: F,
  definition: Overrides,
  layers: Vec<Layer>,
  callbacks: Vec<Callback<F::Target>>,
}

impl<F: Factory> Builder<F> {
  /// Capture the factory's definition as the first layer.
  pub fn from_factory(factory: F) -> Result<Self> {
    let definition = factory.definition()?;
    Ok(Self {
      factory,
      definition,
      layers: Vec::new(),
      callbacks: Vec::new(),
    })
  }

  /// Append an override layer. Nothing is evaluated until the next make.
  pub fn state(mut self, layer: impl Into<Layer>) -> Self {
    self.layers.push(layer.into());
    self
  }

  /// Append a callback run against every constructed object, in registration order.
  pub fn after<C>(mut self, callback: C) -> Self
  where
    C: Fn(&mut F::Target) -> anyhow::Result<()> + 'static,
  {
    self.callbacks.push(Rc::new(callback));
    self
  }

  /// Resolve all layers, construct the target and run the callbacks.
  pub fn make(&self) -> Result<F::Target> {
    let target = type_name::<F::Target>();
    debug!(
      fixture = target,
      layers = self.layer_count(),
      callbacks = self.callbacks.len(),
      "making fixture"
    );

    let args = resolve(&self.definition, &self.layers, target)?;
    let mut object = self.factory.construct(args)?;
    for callback in &self.callbacks {
      callback(&mut object).map_err(FactoryError::from_caller)?;
    }
    Ok(object)
  }

  /// Append `layer` and make.
  ///
  /// The layer stays on the builder, so later makes see it too.
  pub fn make_with(&mut self, layer: impl Into<Layer>) -> Result<F::Target> {
    self.layers.push(layer.into());
    self.make()
  }

  /// Make `count` independent objects from the current layers.
  pub fn make_many(&self, count: usize) -> Result<Vec<F::Target>> {
    (0..count).map(|_| self.make()).collect()
  }

  /// Number of layers including the definition.
  pub fn layer_count(&self) -> usize {
    self.layers.len() + 1
  }

  pub fn factory(&self) -> &F {
    &self.factory
  }
}

impl<F: Factory> Nested for Builder<F> {
  fn make_value(&self) -> Result<Value> {
    self.make().map(Value::object)
  }

  fn target_name(&self) -> &'static str {
    type_name::<F::Target>()
  }
}

impl<F: Factory> From<Builder<F>> for Attr {
  fn from(builder: Builder<F>) -> Self {
    Attr::Builder(Rc::new(builder))
  }
}
