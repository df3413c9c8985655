//! Serde helpers for fields the builder API may send as `null`.

use serde::{Deserialize, Deserializer};

/// Reads `null` as the type's default value. Use together with
/// `#[serde(default)]` so a missing key is accepted too.
pub(crate) fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
