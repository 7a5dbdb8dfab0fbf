//! Field deserializers for partial-update bodies. Pair each with
//! `#[serde(default)]` so an absent key stays `None`.

use serde::{Deserialize, Deserializer};

/// Nullable column: `null` deserializes to `Some(None)` and clears the value.
pub fn nullable<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// NOT NULL column: a present key must carry a value, `null` is rejected.
pub fn required<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(de).map(Some)
}
