//! src/services/catalog_service.rs
//!
//! CatalogService: resolves photo references into denormalized views, applies
//! partial updates, adds tags set-wise and lists photos by album name. It only
//! talks to storage through `CatalogStore`, so any backend can sit beneath it.
//!
//! The `*_owned_*` operations run the access gate first and return before
//! touching albums or users when the caller does not own the photo.

use crate::{
    models::{
        photo::{Photo, PhotoView, format_photo_date},
        user::UserView,
    },
    services::{
        access_gate::{Access, AccessGate, DenyReason},
        store::{CatalogStore, PhotoField, StoreError, TagInsert},
    },
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Shown in place of an owner whose user record cannot be resolved.
pub const UNKNOWN_OWNER: &str = "Unknown";

/// First line of every album CSV export.
pub const CSV_HEADER: &str = "filename,resolution,tags";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("photo {0} could not be found")]
    NotFound(i64),
    #[error("no album named `{0}` could be found")]
    AlbumNotFound(String),
    #[error("access to photo {0} is forbidden: you can only access your own photos")]
    Forbidden(i64),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// How a mutation ended. Only `Applied` and `Unchanged` count as success.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MutationStatus {
    Applied,
    Unchanged,
    /// The tag is already on the photo, ignoring case.
    AlreadyExists,
    /// The photo disappeared between the read and the write.
    Vanished,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct MutationReport {
    pub status: MutationStatus,
    pub message: String,
}

impl MutationReport {
    fn new(status: MutationStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn success(&self) -> bool {
        matches!(
            self.status,
            MutationStatus::Applied | MutationStatus::Unchanged
        )
    }
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    gate: AccessGate,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            gate: AccessGate::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    /// Fetch a photo and resolve its album names and owner.
    pub async fn resolve_photo_view(&self, photo_id: i64) -> CatalogResult<PhotoView> {
        let photo = self.fetch_photo(photo_id).await?;
        self.assemble_view(photo).await
    }

    /// Replace title and/or description. `None` and blank strings leave the
    /// field untouched; a call that changes nothing still succeeds.
    pub async fn update_photo_fields(
        &self,
        photo_id: i64,
        new_title: Option<&str>,
        new_description: Option<&str>,
    ) -> CatalogResult<MutationReport> {
        let photo = self.fetch_photo(photo_id).await?;
        self.apply_update(&photo, new_title, new_description).await
    }

    /// Append `new_tag` unless the photo already carries it in any case.
    pub async fn add_tag_to_photo(
        &self,
        photo_id: i64,
        new_tag: &str,
    ) -> CatalogResult<MutationReport> {
        let tag = validate_tag(new_tag)?;
        let photo = self.fetch_photo(photo_id).await?;
        self.apply_tag(&photo, tag).await
    }

    /// All photos in any album whose name matches `album_name` ignoring case.
    pub async fn list_photos_by_album_name(&self, album_name: &str) -> CatalogResult<Vec<Photo>> {
        let wanted = album_name.trim();
        if wanted.is_empty() {
            return Err(CatalogError::InvalidInput(
                "album name must not be blank".into(),
            ));
        }

        let albums = self.store.find_albums_by_name(wanted).await?;
        if albums.is_empty() {
            return Err(CatalogError::AlbumNotFound(wanted.to_string()));
        }

        let album_ids: Vec<i64> = albums.iter().map(|a| a.id).collect();
        debug!("album `{}` resolved to ids {:?}", wanted, album_ids);
        Ok(self.store.get_photos_by_album_ids(&album_ids).await?)
    }

    /// Same as `resolve_photo_view`, restricted to the photo's owner.
    pub async fn view_owned_photo(&self, user_id: i64, photo_id: i64) -> CatalogResult<PhotoView> {
        let photo = self.owned_photo(user_id, photo_id).await?;
        self.assemble_view(photo).await
    }

    /// Same as `update_photo_fields`, restricted to the photo's owner.
    pub async fn update_owned_photo(
        &self,
        user_id: i64,
        photo_id: i64,
        new_title: Option<&str>,
        new_description: Option<&str>,
    ) -> CatalogResult<MutationReport> {
        let photo = self.owned_photo(user_id, photo_id).await?;
        self.apply_update(&photo, new_title, new_description).await
    }

    /// Same as `add_tag_to_photo`, restricted to the photo's owner.
    pub async fn tag_owned_photo(
        &self,
        user_id: i64,
        photo_id: i64,
        new_tag: &str,
    ) -> CatalogResult<MutationReport> {
        let tag = validate_tag(new_tag)?;
        let photo = self.owned_photo(user_id, photo_id).await?;
        self.apply_tag(&photo, tag).await
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> CatalogResult<UserView> {
        match self.gate.authenticate(username, password).await? {
            Some(user) => {
                info!(user_id = user.id, "user authenticated");
                Ok(user)
            }
            None => {
                warn!("authentication failed for `{}`", username);
                Err(CatalogError::InvalidCredentials)
            }
        }
    }

    async fn fetch_photo(&self, photo_id: i64) -> CatalogResult<Photo> {
        self.store
            .find_photo_by_id(photo_id)
            .await?
            .ok_or(CatalogError::NotFound(photo_id))
    }

    async fn owned_photo(&self, user_id: i64, photo_id: i64) -> CatalogResult<Photo> {
        match self.gate.authorize(user_id, photo_id).await? {
            Access::Allow(photo) => Ok(photo),
            Access::Deny(DenyReason::NotFound) => Err(CatalogError::NotFound(photo_id)),
            Access::Deny(DenyReason::Forbidden) => Err(CatalogError::Forbidden(photo_id)),
        }
    }

    async fn assemble_view(&self, photo: Photo) -> CatalogResult<PhotoView> {
        let albums = self.store.get_albums_by_ids(&photo.albums).await?;
        // Keep the photo's own album order; ids without an album are dropped.
        let album_names = photo
            .albums
            .iter()
            .filter_map(|id| albums.iter().find(|album| album.id == *id))
            .map(|album| album.name.clone())
            .collect();

        let owner_name = match photo.owner {
            Some(owner_id) => Some(self.owner_name(owner_id).await),
            None => None,
        };

        Ok(PhotoView {
            id: photo.id,
            date: format_photo_date(&photo.date),
            filename: photo.filename,
            title: photo.title,
            description: photo.description,
            album_names,
            tags: photo.tags,
            owner_name,
        })
    }

    async fn owner_name(&self, owner_id: i64) -> String {
        match self.store.find_user_by_id(owner_id).await {
            Ok(Some(user)) => user.username,
            Ok(None) => UNKNOWN_OWNER.to_string(),
            Err(err) => {
                warn!(owner_id, "owner lookup failed: {}", err);
                UNKNOWN_OWNER.to_string()
            }
        }
    }

    async fn apply_update(
        &self,
        photo: &Photo,
        new_title: Option<&str>,
        new_description: Option<&str>,
    ) -> CatalogResult<MutationReport> {
        let mut fields = Vec::new();
        for (field, value, current) in [
            (PhotoField::Title, new_title, photo.title.as_str()),
            (PhotoField::Description, new_description, photo.description.as_str()),
        ] {
            if let Some(value) = value.filter(|v| !v.trim().is_empty() && *v != current) {
                fields.push((field, value.to_string()));
            }
        }

        let matched = self.store.update_photo_fields(photo.id, &fields).await?;
        if !matched {
            warn!(photo_id = photo.id, "photo vanished before update");
            return Ok(MutationReport::new(
                MutationStatus::Vanished,
                "Error updating photo: it no longer exists.",
            ));
        }

        if fields.is_empty() {
            Ok(MutationReport::new(
                MutationStatus::Unchanged,
                "Photo left unchanged.",
            ))
        } else {
            info!(photo_id = photo.id, fields = fields.len(), "photo updated");
            Ok(MutationReport::new(
                MutationStatus::Applied,
                "Photo has been updated successfully!",
            ))
        }
    }

    async fn apply_tag(&self, photo: &Photo, tag: &str) -> CatalogResult<MutationReport> {
        if photo.has_tag(tag) {
            return Ok(already_tagged(tag));
        }

        match self.store.add_tag_set_wise(photo.id, tag).await? {
            TagInsert::Added => {
                info!(photo_id = photo.id, tag, "tag added");
                Ok(MutationReport::new(
                    MutationStatus::Applied,
                    "Tag added successfully!",
                ))
            }
            TagInsert::AlreadyPresent => Ok(already_tagged(tag)),
            TagInsert::Missing => {
                warn!(photo_id = photo.id, "photo vanished before tagging");
                Ok(MutationReport::new(
                    MutationStatus::Vanished,
                    "Error adding tag: the photo no longer exists.",
                ))
            }
        }
    }
}

fn validate_tag(raw: &str) -> CatalogResult<&str> {
    let tag = raw.trim();
    if tag.is_empty() {
        return Err(CatalogError::InvalidInput("tag must not be blank".into()));
    }
    Ok(tag)
}

fn already_tagged(tag: &str) -> MutationReport {
    MutationReport::new(
        MutationStatus::AlreadyExists,
        format!("The tag \"{}\" already exists on this photo.", tag),
    )
}

/// Render photos as `filename,resolution,tags` lines under a fixed header.
///
/// Tags are joined with `:`. Fields are not quoted, so commas inside
/// filenames or tags are not supported.
pub fn render_album_csv(photos: &[Photo]) -> String {
    let mut lines = Vec::with_capacity(photos.len() + 1);
    lines.push(CSV_HEADER.to_string());
    for photo in photos {
        lines.push(format!(
            "{},{},{}",
            photo.filename,
            photo.resolution,
            photo.tags.join(":")
        ));
    }
    lines.join("\n")
}
