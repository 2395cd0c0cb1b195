//! src/services/document_store.rs
//!
//! SqliteDocumentStore: document-database backend. Each collection is a
//! SQLite table holding one JSON document per row, keyed by the entity id.
//! Field updates are single `json_set` statements, so writers touching
//! different fields of the same photo never clobber each other. Tag set-adds
//! run under `BEGIN IMMEDIATE`, which serializes them across processes.

use crate::{
    models::{album::Album, photo::Photo, user::User},
    services::store::{
        CatalogSnapshot, CatalogStore, PhotoField, StoreResult, TagInsert, insert_tag,
    },
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sqlx::{
    QueryBuilder, SqliteConnection, SqlitePool,
    sqlite::{Sqlite, SqliteConnectOptions, SqlitePoolOptions},
};
use std::{str::FromStr, sync::Arc};
use tracing::debug;

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Clone)]
pub struct SqliteDocumentStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl SqliteDocumentStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Open a pool for `database_url`, creating the database file if needed.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Self::new(Arc::new(pool)))
    }

    /// Create the collection tables if they do not exist yet.
    pub async fn migrate(&self) -> StoreResult<()> {
        let statements = SCHEMA
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        tracing::info!("Running {} migration statements...", statements.len());
        for stmt in statements {
            debug!("Executing migration SQL: {}", stmt);
            sqlx::query(stmt).execute(&*self.db).await?;
        }
        Ok(())
    }

    /// Insert or replace every document of `snapshot` in one transaction.
    pub async fn import(&self, snapshot: &CatalogSnapshot) -> StoreResult<()> {
        let mut tx = self.db.begin().await?;
        for photo in &snapshot.photos {
            sqlx::query("INSERT OR REPLACE INTO photos (id, doc) VALUES (?, ?)")
                .bind(photo.id)
                .bind(serde_json::to_string(photo)?)
                .execute(&mut *tx)
                .await?;
        }
        for album in &snapshot.albums {
            sqlx::query("INSERT OR REPLACE INTO albums (id, doc) VALUES (?, ?)")
                .bind(album.id)
                .bind(serde_json::to_string(album)?)
                .execute(&mut *tx)
                .await?;
        }
        for user in &snapshot.users {
            sqlx::query("INSERT OR REPLACE INTO users (id, username, doc) VALUES (?, ?, ?)")
                .bind(user.id)
                .bind(&user.username)
                .bind(serde_json::to_string(user)?)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::info!(
            "Imported {} photos, {} albums, {} users",
            snapshot.photos.len(),
            snapshot.albums.len(),
            snapshot.users.len()
        );
        Ok(())
    }

    async fn fetch_docs<T: DeserializeOwned>(&self, sql: &str) -> StoreResult<Vec<T>> {
        let rows = sqlx::query_scalar::<_, String>(sql)
            .fetch_all(&*self.db)
            .await?;
        parse_docs(rows)
    }

    /// Check-and-append under the write lock already held by `conn`.
    async fn insert_tag_locked(
        conn: &mut SqliteConnection,
        id: i64,
        tag: &str,
    ) -> StoreResult<TagInsert> {
        let doc = sqlx::query_scalar::<_, String>("SELECT doc FROM photos WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        let Some(doc) = doc else {
            return Ok(TagInsert::Missing);
        };

        let mut photo: Photo = serde_json::from_str(&doc)?;
        let outcome = insert_tag(&mut photo, tag);
        if outcome == TagInsert::Added {
            sqlx::query("UPDATE photos SET doc = json_set(doc, '$.tags', json(?)) WHERE id = ?")
                .bind(serde_json::to_string(&photo.tags)?)
                .bind(id)
                .execute(&mut *conn)
                .await?;
        }
        Ok(outcome)
    }
}

fn parse_docs<T: DeserializeOwned>(rows: Vec<String>) -> StoreResult<Vec<T>> {
    rows.iter()
        .map(|doc| serde_json::from_str(doc).map_err(Into::into))
        .collect()
}

#[async_trait]
impl CatalogStore for SqliteDocumentStore {
    async fn get_all_photos(&self) -> StoreResult<Vec<Photo>> {
        self.fetch_docs("SELECT doc FROM photos ORDER BY id").await
    }

    async fn get_all_albums(&self) -> StoreResult<Vec<Album>> {
        self.fetch_docs("SELECT doc FROM albums ORDER BY id").await
    }

    async fn get_all_users(&self) -> StoreResult<Vec<User>> {
        self.fetch_docs("SELECT doc FROM users ORDER BY id").await
    }

    async fn update_photo_fields(
        &self,
        id: i64,
        fields: &[(PhotoField, String)],
    ) -> StoreResult<bool> {
        if fields.is_empty() {
            let exists = sqlx::query_scalar::<_, i64>("SELECT 1 FROM photos WHERE id = ?")
                .bind(id)
                .fetch_optional(&*self.db)
                .await?;
            return Ok(exists.is_some());
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE photos SET doc = json_set(doc");
        for (field, value) in fields {
            builder.push(", '$.");
            builder.push(field.key());
            builder.push("', ");
            builder.push_bind(value.clone());
        }
        builder.push(") WHERE id = ");
        builder.push_bind(id);

        let result = builder.build().execute(&*self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_tag_set_wise(&self, id: i64, tag: &str) -> StoreResult<TagInsert> {
        // Dropping `tx` on error or cancellation rolls back before the
        // connection is reused.
        let mut tx = self.db.begin_with("BEGIN IMMEDIATE").await?;
        let outcome = Self::insert_tag_locked(&mut *tx, id, tag).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        Ok(())
    }

    async fn find_photo_by_id(&self, id: i64) -> StoreResult<Option<Photo>> {
        let doc = sqlx::query_scalar::<_, String>("SELECT doc FROM photos WHERE id = ?")
            .bind(id)
            .fetch_optional(&*self.db)
            .await?;
        Ok(doc.map(|d| serde_json::from_str(&d)).transpose()?)
    }

    async fn get_albums_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Album>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT doc FROM albums WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        builder.push(") ORDER BY id");

        let rows: Vec<String> = builder
            .build_query_scalar()
            .fetch_all(&*self.db)
            .await?;
        parse_docs(rows)
    }

    // Name matching stays on the default implementation: SQLite's `lower()`
    // and NOCASE only fold ASCII, which would disagree with the other backends.

    async fn get_photos_by_album_ids(&self, album_ids: &[i64]) -> StoreResult<Vec<Photo>> {
        if album_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT doc FROM photos WHERE EXISTS (\
             SELECT 1 FROM json_each(photos.doc, '$.albums') WHERE json_each.value IN (",
        );
        let mut separated = builder.separated(", ");
        for id in album_ids {
            separated.push_bind(*id);
        }
        builder.push(")) ORDER BY id");

        let rows: Vec<String> = builder
            .build_query_scalar()
            .fetch_all(&*self.db)
            .await?;
        parse_docs(rows)
    }

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let doc = sqlx::query_scalar::<_, String>("SELECT doc FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&*self.db)
            .await?;
        Ok(doc.map(|d| serde_json::from_str(&d)).transpose()?)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let doc = sqlx::query_scalar::<_, String>("SELECT doc FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&*self.db)
            .await?;
        Ok(doc.map(|d| serde_json::from_str(&d)).transpose()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn database_url(dir: &tempfile::TempDir) -> String {
        format!("sqlite://{}", dir.path().join("catalog.db").display())
    }

    async fn seeded_store(dir: &tempfile::TempDir) -> SqliteDocumentStore {
        let store = SqliteDocumentStore::connect(&database_url(dir))
            .await
            .unwrap();
        seed(&store).await;
        store
    }

    /// A store whose pool holds exactly one connection, so every call reuses it.
    async fn single_connection_store(dir: &tempfile::TempDir) -> SqliteDocumentStore {
        let options = SqliteConnectOptions::from_str(&database_url(dir))
            .unwrap()
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        let store = SqliteDocumentStore::new(Arc::new(pool));
        seed(&store).await;
        store
    }

    async fn seed(store: &SqliteDocumentStore) {
        store.migrate().await.unwrap();

        let snapshot = CatalogSnapshot {
            photos: serde_json::from_value(json!([
                {"id": 54781, "filename": "sunset.jpg", "title": "Old", "description": "d",
                 "date": "2025-01-05T19:45:00", "albums": [3], "tags": ["sunset"],
                 "owner": 9, "resolution": [1920, 1080]},
                {"id": 54782, "filename": "tower.jpg", "title": "Tower", "description": "",
                 "date": "2025-01-06T10:00:00", "albums": [4, 5], "tags": [],
                 "resolution": "800x600"}
            ]))
            .unwrap(),
            albums: serde_json::from_value(json!([
                {"id": 3, "name": "Nature"},
                {"id": 4, "name": "City"},
                {"id": 5, "name": "nature"}
            ]))
            .unwrap(),
            users: serde_json::from_value(json!([
                {"id": 9, "username": "mahgoub", "password": "pw"}
            ]))
            .unwrap(),
        };
        store.import(&snapshot).await.unwrap();
    }

    #[tokio::test]
    async fn targeted_queries_return_matching_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir).await;

        let photo = store.find_photo_by_id(54781).await.unwrap().unwrap();
        assert_eq!(photo.tags, vec!["sunset"]);
        assert!(store.find_photo_by_id(1).await.unwrap().is_none());

        let albums = store.get_albums_by_ids(&[3, 5, 99]).await.unwrap();
        assert_eq!(albums.len(), 2);

        let named = store.find_albums_by_name("NATURE").await.unwrap();
        let ids: Vec<i64> = named.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![3, 5]);

        let photos = store.get_photos_by_album_ids(&[5]).await.unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].id, 54782);

        let user = store.find_user_by_username("mahgoub").await.unwrap().unwrap();
        assert_eq!(user.id, 9);
        assert!(store.find_user_by_id(10).await.unwrap().is_none());
        assert!(store.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn json_set_updates_only_requested_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir).await;

        let matched = store
            .update_photo_fields(54781, &[(PhotoField::Description, "golden hour".into())])
            .await
            .unwrap();
        assert!(matched);

        let photo = store.find_photo_by_id(54781).await.unwrap().unwrap();
        assert_eq!(photo.title, "Old");
        assert_eq!(photo.description, "golden hour");
        assert_eq!(photo.resolution.to_string(), "1920x1080");

        assert!(store.update_photo_fields(54781, &[]).await.unwrap());
        assert!(!store.update_photo_fields(1, &[]).await.unwrap());
        assert!(
            !store
                .update_photo_fields(1, &[(PhotoField::Title, "x".into())])
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn set_add_is_idempotent_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir).await;

        let (a, b) = tokio::join!(
            store.add_tag_set_wise(54782, "bridge"),
            store.add_tag_set_wise(54782, "BRIDGE")
        );
        let outcomes = [a.unwrap(), b.unwrap()];
        assert!(outcomes.contains(&TagInsert::Added));
        assert!(outcomes.contains(&TagInsert::AlreadyPresent));

        let photo = store.find_photo_by_id(54782).await.unwrap().unwrap();
        assert_eq!(photo.tags.len(), 1);
        assert_eq!(
            store.add_tag_set_wise(1, "x").await.unwrap(),
            TagInsert::Missing
        );
    }

    #[tokio::test]
    async fn cancelled_set_add_leaves_connection_usable() {
        let dir = tempfile::tempdir().unwrap();
        let store = single_connection_store(&dir).await;

        for micros in 1..=25u64 {
            let tag = format!("t{micros}");
            let _ = tokio::time::timeout(
                Duration::from_micros(micros),
                store.add_tag_set_wise(54782, &tag),
            )
            .await;
        }

        assert_eq!(
            store.add_tag_set_wise(54782, "after").await.unwrap(),
            TagInsert::Added
        );
        let photo = store.find_photo_by_id(54782).await.unwrap().unwrap();
        assert!(photo.has_tag("after"));
    }

    #[tokio::test]
    async fn failed_set_add_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = single_connection_store(&dir).await;

        // Valid JSON that is not a photo document.
        sqlx::query("INSERT INTO photos (id, doc) VALUES (?, ?)")
            .bind(7_i64)
            .bind(r#"{"id": 7}"#)
            .execute(&*store.db)
            .await
            .unwrap();

        assert!(store.add_tag_set_wise(7, "broken").await.is_err());
        assert_eq!(
            store.add_tag_set_wise(54782, "bridge").await.unwrap(),
            TagInsert::Added
        );
        assert_eq!(
            store.add_tag_set_wise(54782, "Bridge").await.unwrap(),
            TagInsert::AlreadyPresent
        );
    }
}
