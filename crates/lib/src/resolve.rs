//! Layer resolution.
//!
//! Collapses a definition and an ordered list of override layers into the
//! flat argument map a factory constructor consumes.
//!
//! # Resolution Algorithm
//!
//! 1. Seed the accumulator with the definition, verbatim. Lazy defaults stay
//!    pending.
//! 2. For each later layer, in order:
//!    - a transformer layer is called with the accumulator and yields a map
//!    - every lazy entry of that map is evaluated against the accumulator as it
//!      stood before the layer
//!    - the entries replace earlier values (last write wins)
//! 3. Evaluate the definition defaults nothing overrode, in definition order,
//!    against the merged accumulator. A default is evaluated at most once: the
//!    first read (from a layer or from another default) fixes its value.
//! 4. Make nested builders (also inside lists and maps) and unwrap deferred
//!    functions.
//! 5. Drop every key the definition does not declare.
//!
//! Lazy values in override layers therefore see only what came before them,
//! while lazy defaults in the definition see the final overrides: a default
//! `price = id * 10` follows an `id` set by any later layer.

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::attributes::{Arguments, Attributes};
use crate::error::{FactoryError, Result};
use crate::layer::{Attr, Layer, Overrides};
use crate::value::Value;

/// Resolve `definition` plus `layers` into constructor arguments for `target`.
pub fn resolve(definition: &Overrides, layers: &[Layer], target: &'static str) -> Result<Arguments> {
  debug!(fixture = target, layers = layers.len(), "resolving attributes");
  let attrs = collapse(definition, layers)?;
  realize(attrs, definition, target)
}

/// Fold all layers into one accumulator (steps 1-3).
///
/// The result holds no lazy entries at the top level but may still contain
/// nested builders and deferred functions.
pub fn collapse(definition: &Overrides, layers: &[Layer]) -> Result<Attributes> {
  let mut attrs = Attributes::from(definition.clone());

  for (index, layer) in layers.iter().enumerate() {
    trace!(index, ?layer, "applying layer");
    apply_layer(&mut attrs, layer)?;
    attrs.flush_settled();
  }

  for key in attrs.pending() {
    attrs.settle_entry(&key)?;
  }
  attrs.flush_settled();

  Ok(attrs)
}

fn apply_layer(attrs: &mut Attributes, layer: &Layer) -> Result<()> {
  let overrides = match layer {
    Layer::Map(overrides) => overrides.clone(),
    Layer::Json(json) => Overrides::from_json(json)?,
    Layer::Transform(transform) => match transform.apply(attrs)? {
      Layer::Map(overrides) => overrides,
      Layer::Json(json) => Overrides::from_json(&json)?,
      Layer::Transform(_) => {
        return Err(FactoryError::invalid_shape("transformer layer returned another transformer"));
      }
    },
  };

  let mut evaluated = Vec::with_capacity(overrides.len());
  for (key, attr) in overrides {
    let attr = match attr {
      Attr::Lazy(lazy) => lazy.evaluate(&key, attrs)?,
      other => other,
    };
    evaluated.push((key, attr));
  }

  for (key, attr) in evaluated {
    attrs.set(key, attr);
  }
  Ok(())
}

/// Make nested builders, unwrap deferred values and restrict to the
/// definition's keys (steps 4-5).
pub fn realize(attrs: Attributes, definition: &Overrides, target: &'static str) -> Result<Arguments> {
  let mut values = IndexMap::with_capacity(attrs.len());
  for (key, attr) in attrs.into_entries() {
    let value = realize_attr(attr).map_err(|e| e.for_attribute(&key))?;
    values.insert(key, value);
  }

  values.retain(|key, _| {
    let declared = definition.contains(key);
    if !declared {
      trace!(fixture = target, key = key.as_str(), "dropping undeclared attribute");
    }
    declared
  });

  Ok(Arguments::new(target, values))
}

fn realize_attr(attr: Attr) -> Result<Value> {
  match attr {
    Attr::Value(value) => Ok(value),
    Attr::Builder(nested) => nested.make_value(),
    Attr::Deferred(deferred) => Ok(deferred.unwrap()),
    Attr::List(items) => items.into_iter().map(realize_attr).collect::<Result<Vec<_>>>().map(Value::List),
    Attr::Map(entries) => entries
      .into_iter()
      .map(|(k, v)| Ok((k, realize_attr(v)?)))
      .collect::<Result<IndexMap<_, _>>>()
      .map(Value::Map),
    // Top-level lazies are gone after `collapse`; this one sits in a container.
    Attr::Lazy(_) => Err(FactoryError::invalid_shape(
      "lazy values are only evaluated at the top level of a layer, found one inside a container",
    )),
  }
}
