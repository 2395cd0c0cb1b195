//! Represents a photo record and its read-only denormalized view.

use super::null_as_default;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A single photo document as stored by any backend.
///
/// `id`, `date` and `owner` are never rewritten by the catalog; only `title`,
/// `description` and `tags` change in place.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Photo {
    /// Unique, immutable identifier.
    pub id: i64,

    /// Name of the image file on disk.
    pub filename: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,

    /// ISO-8601 timestamp, kept verbatim.
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,

    /// Ids of the albums this photo belongs to. Order carries no meaning.
    #[serde(default, deserialize_with = "null_as_default")]
    pub albums: Vec<i64>,

    /// Case-preserved tags, unique under case-insensitive comparison.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,

    /// Owning user id. Legacy records have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<i64>,

    /// Legacy records may carry `null` or nothing; both read as empty text.
    #[serde(default, deserialize_with = "null_as_default")]
    pub resolution: Resolution,

    /// Fields this service does not know about, carried through rewrites.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Photo {
    /// True if `tag` matches an existing tag ignoring case.
    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = tag.to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == wanted)
    }

    /// True if any of the photo's albums is in `album_ids`.
    pub fn in_any_album(&self, album_ids: &[i64]) -> bool {
        self.albums.iter().any(|id| album_ids.contains(id))
    }
}

/// Stored resolution: either free text (`"1920x1080"`) or a `[width, height]` pair.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum Resolution {
    Dimensions([u32; 2]),
    Text(String),
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::Text(String::new())
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Dimensions([w, h]) => write!(f, "{}x{}", w, h),
            Resolution::Text(text) => f.write_str(text),
        }
    }
}

/// Denormalized projection of a photo, assembled on read and never persisted.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoView {
    pub id: i64,
    pub filename: String,
    pub title: String,
    pub description: String,
    pub date: String,
    pub album_names: Vec<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
}

/// Render a stored timestamp as `"<Month> <day>, <year>"`, e.g. `"January 5, 2025"`.
///
/// Accepts RFC 3339, naive date-times and plain dates. Anything else is
/// returned unchanged.
pub fn format_photo_date(raw: &str) -> String {
    const READABLE: &str = "%B %-d, %Y";

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format(READABLE).to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format(READABLE).to_string();
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.format(READABLE).to_string();
    }
    raw.to_string()
}
