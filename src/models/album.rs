//! Represents an album, a named grouping of photos.

use super::null_as_default;
use serde::{Deserialize, Serialize};

/// An album. Names are not guaranteed unique.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Album {
    pub id: i64,

    /// Display name; lookups compare it case-insensitively. Albums stored
    /// without a name read as `""` and never match a lookup.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

impl Album {
    /// Case-insensitive exact match against `name`.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}
