//! src/services/store.rs
//!
//! CatalogStore: the storage capability the catalog engine depends on.
//! Backends provide the collection reads and the two targeted writes; the
//! targeted queries have default implementations over the collection reads
//! which a backend can override with something cheaper.

use crate::models::{album::Album, photo::Photo, user::User};
use async_trait::async_trait;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("collection `{collection}` is corrupt: {reason}")]
    Corrupt {
        collection: &'static str,
        reason: String,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Photo fields that may be rewritten through `update_photo_fields`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhotoField {
    Title,
    Description,
}

impl PhotoField {
    /// Key of this field inside a stored photo document.
    pub fn key(self) -> &'static str {
        match self {
            PhotoField::Title => "title",
            PhotoField::Description => "description",
        }
    }

    /// Write `value` into the matching field of `photo`.
    pub fn apply(self, photo: &mut Photo, value: &str) {
        match self {
            PhotoField::Title => photo.title = value.to_string(),
            PhotoField::Description => photo.description = value.to_string(),
        }
    }
}

/// Result of a set-wise tag insertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagInsert {
    /// The tag was appended.
    Added,
    /// A tag equal under case-insensitive comparison was already present.
    AlreadyPresent,
    /// No photo with the given id exists.
    Missing,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All photos, in storage iteration order.
    async fn get_all_photos(&self) -> StoreResult<Vec<Photo>>;

    /// All albums, in storage iteration order.
    async fn get_all_albums(&self) -> StoreResult<Vec<Album>>;

    /// All users, in storage iteration order.
    async fn get_all_users(&self) -> StoreResult<Vec<User>>;

    /// Partial update by id: only the supplied fields change.
    /// Returns false if no photo matched.
    async fn update_photo_fields(
        &self,
        id: i64,
        fields: &[(PhotoField, String)],
    ) -> StoreResult<bool>;

    /// Add `tag` to the photo's tag list unless an equal tag (ignoring case)
    /// is already there. Must be atomic with respect to other writers of the
    /// same backend.
    async fn add_tag_set_wise(&self, id: i64, tag: &str) -> StoreResult<TagInsert>;

    /// Cheap round-trip proving the backend is reachable.
    async fn health_check(&self) -> StoreResult<()>;

    async fn find_photo_by_id(&self, id: i64) -> StoreResult<Option<Photo>> {
        Ok(self
            .get_all_photos()
            .await?
            .into_iter()
            .find(|photo| photo.id == id))
    }

    /// Albums whose id is in `ids`, in storage iteration order.
    async fn get_albums_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Album>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .get_all_albums()
            .await?
            .into_iter()
            .filter(|album| ids.contains(&album.id))
            .collect())
    }

    /// Albums whose name equals `name` ignoring case.
    async fn find_albums_by_name(&self, name: &str) -> StoreResult<Vec<Album>> {
        Ok(self
            .get_all_albums()
            .await?
            .into_iter()
            .filter(|album| album.is_named(name))
            .collect())
    }

    /// Photos belonging to at least one of `album_ids`, in storage iteration order.
    async fn get_photos_by_album_ids(&self, album_ids: &[i64]) -> StoreResult<Vec<Photo>> {
        if album_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .get_all_photos()
            .await?
            .into_iter()
            .filter(|photo| photo.in_any_album(album_ids))
            .collect())
    }

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self
            .get_all_users()
            .await?
            .into_iter()
            .find(|user| user.id == id))
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .get_all_users()
            .await?
            .into_iter()
            .find(|user| user.username == username))
    }
}

/// Every document of every collection, used for seeding and import.
#[derive(Clone, Debug, Default)]
pub struct CatalogSnapshot {
    pub photos: Vec<Photo>,
    pub albums: Vec<Album>,
    pub users: Vec<User>,
}

impl CatalogSnapshot {
    /// Read every collection from `store`.
    pub async fn capture(store: &dyn CatalogStore) -> StoreResult<Self> {
        Ok(Self {
            photos: store.get_all_photos().await?,
            albums: store.get_all_albums().await?,
            users: store.get_all_users().await?,
        })
    }
}

/// Append `tag` to `photo` unless it is already present ignoring case.
/// Shared by the backends that hold documents in memory.
pub(crate) fn insert_tag(photo: &mut Photo, tag: &str) -> TagInsert {
    if photo.has_tag(tag) {
        TagInsert::AlreadyPresent
    } else {
        photo.tags.push(tag.to_string());
        TagInsert::Added
    }
}
