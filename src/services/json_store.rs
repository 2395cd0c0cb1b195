//! src/services/json_store.rs
//!
//! JsonFileStore: flat-file backend keeping each collection in its own JSON
//! document (`photos.json`, `albums.json`, `users.json`) under one directory.
//! Writes go through an in-process lock and land atomically via a temporary
//! file plus rename, so readers never observe a half-written collection.
//! Processes sharing the directory are not coordinated.

use crate::{
    models::{album::Album, photo::Photo, user::User},
    services::store::{
        CatalogSnapshot, CatalogStore, PhotoField, StoreError, StoreResult, TagInsert, insert_tag,
    },
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
    sync::Mutex,
};
use tracing::debug;
use uuid::Uuid;

const PHOTOS_FILE: &str = "photos.json";
const ALBUMS_FILE: &str = "albums.json";
const USERS_FILE: &str = "users.json";

/// Older data sets store a lone photo object instead of an array.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

pub struct JsonFileStore {
    /// Directory holding the three collection files.
    pub base_path: PathBuf,

    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn collection_path(&self, file: &str) -> PathBuf {
        self.base_path.join(file)
    }

    /// Read a collection file. A missing file is an empty collection.
    async fn read_raw(&self, file: &str) -> StoreResult<Option<String>> {
        let path = self.collection_path(file);
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("collection file {} missing, treating as empty", path.display());
                Ok(None)
            }
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    async fn read_collection<T: DeserializeOwned>(&self, file: &str) -> StoreResult<Vec<T>> {
        match self.read_raw(file).await? {
            Some(content) => Ok(serde_json::from_str(&content)?),
            None => Ok(Vec::new()),
        }
    }

    async fn read_photos(&self) -> StoreResult<Vec<Photo>> {
        let Some(content) = self.read_raw(PHOTOS_FILE).await? else {
            return Ok(Vec::new());
        };
        let parsed: OneOrMany<Photo> =
            serde_json::from_str(&content).map_err(|err| StoreError::Corrupt {
                collection: "photos",
                reason: err.to_string(),
            })?;
        Ok(parsed.into())
    }

    /// Atomically replace a collection file.
    ///
    /// Writes pretty-printed JSON to a temporary sibling, fsyncs it and
    /// renames it over the target. The temporary file is removed on failure.
    async fn write_collection<T: Serialize>(&self, file: &str, items: &[T]) -> StoreResult<()> {
        let target = self.collection_path(file);
        fs::create_dir_all(&self.base_path).await?;
        let tmp_path = self.base_path.join(format!(".tmp-{}", Uuid::new_v4()));
        let content = serde_json::to_vec_pretty(items)?;

        if let Err(err) = write_synced(&tmp_path, &content).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        if let Err(err) = fs::rename(&tmp_path, &target).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }

        debug!("saved {} records to {}", items.len(), target.display());
        Ok(())
    }

    /// Write every collection of `snapshot`, replacing what is on disk.
    pub async fn save_snapshot(&self, snapshot: &CatalogSnapshot) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.write_collection(PHOTOS_FILE, &snapshot.photos).await?;
        self.write_collection(ALBUMS_FILE, &snapshot.albums).await?;
        self.write_collection(USERS_FILE, &snapshot.users).await
    }
}

async fn write_synced(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(content).await?;
    file.flush().await?;
    file.sync_all().await
}

#[async_trait]
impl CatalogStore for JsonFileStore {
    async fn get_all_photos(&self) -> StoreResult<Vec<Photo>> {
        self.read_photos().await
    }

    async fn get_all_albums(&self) -> StoreResult<Vec<Album>> {
        self.read_collection(ALBUMS_FILE).await
    }

    async fn get_all_users(&self) -> StoreResult<Vec<User>> {
        self.read_collection(USERS_FILE).await
    }

    async fn update_photo_fields(
        &self,
        id: i64,
        fields: &[(PhotoField, String)],
    ) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut photos = self.read_photos().await?;
        let Some(photo) = photos.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        if fields.is_empty() {
            return Ok(true);
        }
        for (field, value) in fields {
            field.apply(photo, value);
        }
        self.write_collection(PHOTOS_FILE, &photos).await?;
        Ok(true)
    }

    async fn add_tag_set_wise(&self, id: i64, tag: &str) -> StoreResult<TagInsert> {
        let _guard = self.write_lock.lock().await;
        let mut photos = self.read_photos().await?;
        let Some(photo) = photos.iter_mut().find(|p| p.id == id) else {
            return Ok(TagInsert::Missing);
        };
        let outcome = insert_tag(photo, tag);
        if outcome == TagInsert::Added {
            self.write_collection(PHOTOS_FILE, &photos).await?;
        }
        Ok(outcome)
    }

    async fn health_check(&self) -> StoreResult<()> {
        let meta = fs::metadata(&self.base_path).await?;
        if meta.is_dir() {
            Ok(())
        } else {
            Err(StoreError::Io(io::Error::new(
                ErrorKind::NotADirectory,
                format!("{} is not a directory", self.base_path.display()),
            )))
        }
    }
}
