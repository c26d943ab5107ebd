//! Error types for fixture construction.

use thiserror::Error;

/// Errors that can occur while resolving layers or constructing a target.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum FactoryError {
  /// The resolved attributes lack a key the target constructor requires.
  ///
  /// This is a configuration error: the definition omits a required property.
  #[error("missing required attribute '{attribute}' for {target}")]
  MissingRequiredAttribute { attribute: String, target: &'static str },

  /// Caller code read an attribute no layer has set.
  #[error("attribute '{attribute}' is not defined")]
  UndefinedAttribute { attribute: String },

  /// A default read itself while it was being evaluated, directly or through
  /// other defaults.
  #[error("attribute '{attribute}' depends on itself")]
  CyclicAttribute { attribute: String },

  /// A layer or a per-property value does not have a shape the engine can apply.
  #[error("invalid override shape: {reason}")]
  InvalidOverrideShape { reason: String },

  /// A resolved value could not be converted to the type the caller asked for.
  #[error("attribute '{attribute}' expected {expected}, found {found}")]
  TypeMismatch {
    attribute: String,
    expected: &'static str,
    found: &'static str,
  },

  /// An error raised inside a caller-supplied function (lazy value,
  /// transformer layer, or post-construction callback).
  #[error(transparent)]
  Caller(anyhow::Error),
}

impl FactoryError {
  pub(crate) fn invalid_shape(reason: impl Into<String>) -> Self {
    Self::InvalidOverrideShape { reason: reason.into() }
  }

  /// Convert an error returned by caller code.
  ///
  /// A `FactoryError` that travelled through caller code (for example a nested
  /// `make()` inside a lazy value) comes back as itself rather than wrapped.
  pub(crate) fn from_caller(err: anyhow::Error) -> Self {
    match err.downcast::<FactoryError>() {
      Ok(inner) => inner,
      Err(other) => Self::Caller(other),
    }
  }

  /// Attach an attribute name to a bare type mismatch.
  pub(crate) fn for_attribute(self, key: &str) -> Self {
    match self {
      Self::TypeMismatch {
        attribute,
        expected,
        found,
      } if attribute.is_empty() => Self::TypeMismatch {
        attribute: key.to_string(),
        expected,
        found,
      },
      other => other,
    }
  }
}

/// Result alias used throughout the crate.
pub type Result<T, E = FactoryError> = std::result::Result<T, E>;
