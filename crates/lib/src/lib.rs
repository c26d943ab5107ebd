//! fixtory-lib: declarative, layered construction of test fixtures
//!
//! A [`Factory`] declares a base attribute map (its definition) and how to
//! construct its target type. A [`Builder`] stacks override layers on top of
//! that definition and makes fully-formed objects from them:
//!
//! - `Layer`: a literal map of attribute entries, a JSON object, or a
//!   transformer computing a map from the attributes accumulated so far
//! - `Attr`: one entry - a literal, a lazy function, a nested builder, or a
//!   deferred function kept as data
//! - `resolve`: the engine collapsing definition and layers into the
//!   `Arguments` a constructor consumes

pub mod attributes;
pub mod builder;
pub mod deferred;
pub mod error;
pub mod layer;
pub mod resolve;
pub mod value;

pub use attributes::{Arguments, Attributes};
pub use builder::{Builder, Factory};
pub use deferred::Deferred;
pub use error::{FactoryError, Result};
pub use layer::{Attr, Layer, Overrides};
pub use value::{FromValue, Value};
