//! In-memory `CatalogStore`, used by tests and by callers embedding the
//! catalog without any persistence.

use crate::{
    models::{album::Album, photo::Photo, user::User},
    services::store::{
        CatalogSnapshot, CatalogStore, PhotoField, StoreResult, TagInsert, insert_tag,
    },
};
use async_trait::async_trait;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<CatalogSnapshot>,
}

impl MemoryStore {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self {
            data: RwLock::new(snapshot),
        }
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn get_all_photos(&self) -> StoreResult<Vec<Photo>> {
        Ok(self.data.read().await.photos.clone())
    }

    async fn get_all_albums(&self) -> StoreResult<Vec<Album>> {
        Ok(self.data.read().await.albums.clone())
    }

    async fn get_all_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.data.read().await.users.clone())
    }

    async fn update_photo_fields(
        &self,
        id: i64,
        fields: &[(PhotoField, String)],
    ) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        let Some(photo) = data.photos.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        for (field, value) in fields {
            field.apply(photo, value);
        }
        Ok(true)
    }

    async fn add_tag_set_wise(&self, id: i64, tag: &str) -> StoreResult<TagInsert> {
        let mut data = self.data.write().await;
        Ok(match data.photos.iter_mut().find(|p| p.id == id) {
            Some(photo) => insert_tag(photo, tag),
            None => TagInsert::Missing,
        })
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
