//! Tolerant decoding of enum-like columns.

use serde::{Deserialize, Deserializer, Serialize};

/// A column value that is usually one of `T`'s variants.
///
/// Admin tooling writes `status` and `payment_method` directly, so rows can
/// carry values this client does not know about. Those decode as
/// [`Lenient::Unknown`] instead of failing the whole list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Lenient<T> {
    Known(T),
    Unknown(String),
}

impl<T: Copy> Lenient<T> {
    /// The recognised value, if any.
    #[must_use]
    pub const fn known(&self) -> Option<T> {
        match self {
            Self::Known(value) => Some(*value),
            Self::Unknown(_) => None,
        }
    }
}

impl<T> Lenient<T> {
    /// Deserialize a column that may be null or missing. Both decode as an
    /// empty [`Lenient::Unknown`].
    ///
    /// Use with `#[serde(default, deserialize_with = "Lenient::nullable")]`.
    ///
    /// # Errors
    ///
    /// Fails only if the value is neither null, a string nor a `T`.
    pub fn nullable<'de, D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Ok(Option::<Self>::deserialize(deserializer)?.unwrap_or_default())
    }
}

impl<T> Default for Lenient<T> {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

impl<T> From<T> for Lenient<T> {
    fn from(value: T) -> Self {
        Self::Known(value)
    }
}
