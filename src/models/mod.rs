//! Core data models for the photo catalog.
//!
//! These entities mirror the stored documents one-to-one and serialize
//! naturally as JSON via `serde`, whichever backend holds them.

pub mod album;
pub mod photo;
pub mod user;

use serde::{Deserialize, Deserializer};

/// Deserialize an explicit `null` as the type's default. Pair with
/// `#[serde(default)]` so an absent field behaves the same way.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
