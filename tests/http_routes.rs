//! Integration tests driving the catalog router end to end.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use photo_catalog::handlers::AppState;
use photo_catalog::routes::routes::routes;
use photo_catalog::services::catalog_service::CatalogService;
use photo_catalog::services::json_store::JsonFileStore;
use photo_catalog::services::memory_store::MemoryStore;
use photo_catalog::services::store::CatalogSnapshot;
use serde_json::{Value, json};
use tower::ServiceExt;

fn snapshot() -> CatalogSnapshot {
    CatalogSnapshot {
        photos: serde_json::from_value(json!([
            {"id": 54781, "filename": "sunset.jpg", "title": "Old", "description": "Evening",
             "date": "2025-01-05T19:45:00", "albums": [3], "tags": ["sunset"],
             "owner": 9, "resolution": [1920, 1080]},
            {"id": 54782, "filename": "tower.jpg", "title": "Tower", "description": "",
             "date": "2025-03-10T09:00:00", "albums": [3, 4], "tags": ["city", "night"],
             "owner": 7, "resolution": "800x600"}
        ]))
        .unwrap(),
        albums: serde_json::from_value(json!([
            {"id": 3, "name": "Nature"},
            {"id": 4, "name": "City"}
        ]))
        .unwrap(),
        users: serde_json::from_value(json!([
            {"id": 9, "username": "mahgoub", "password": "secret"},
            {"id": 7, "username": "ali", "password": "hunter2"}
        ]))
        .unwrap(),
    }
}

fn test_router(enforce_ownership: bool) -> Router {
    let store = Arc::new(MemoryStore::new(snapshot()));
    let state = AppState {
        catalog: CatalogService::new(store),
        enforce_ownership,
    };
    routes().with_state(state)
}

async fn request(
    router: &Router,
    method: Method,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Vec<u8>), String> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("X-User-Id", user);
    }

    let req = if let Some(payload) = body {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        let bytes =
            serde_json::to_vec(&payload).map_err(|err| format!("serialize request body: {err}"))?;
        builder
            .body(Body::from(bytes))
            .map_err(|err| format!("build request: {err}"))?
    } else {
        builder
            .body(Body::empty())
            .map_err(|err| format!("build request: {err}"))?
    };

    let response = router
        .clone()
        .oneshot(req)
        .await
        .map_err(|err| format!("route request: {err}"))?;
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .map_err(|err| format!("read response body: {err}"))?;
    Ok((status, body.to_vec()))
}

async fn json_request(
    router: &Router,
    method: Method,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value), String> {
    let (status, bytes) = request(router, method, uri, user, body).await?;
    let parsed = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).map_err(|err| format!("parse response body: {err}"))?
    };
    Ok((status, parsed))
}

#[tokio::test]
async fn owner_sees_denormalized_view() -> Result<(), String> {
    let router = test_router(true);
    let (status, body) =
        json_request(&router, Method::GET, "/photos/54781", Some("9"), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["albumNames"], json!(["Nature"]));
    assert_eq!(body["tags"], json!(["sunset"]));
    assert_eq!(body["date"], json!("January 5, 2025"));
    assert_eq!(body["ownerName"], json!("mahgoub"));
    Ok(())
}

#[tokio::test]
async fn ownership_is_enforced_on_photo_routes() -> Result<(), String> {
    let router = test_router(true);

    let (status, body) =
        json_request(&router, Method::GET, "/photos/54781", Some("7"), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], json!(403));

    let (status, _) = json_request(&router, Method::GET, "/photos/54781", None, None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) =
        json_request(&router, Method::GET, "/photos/54781", Some("nine"), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = json_request(&router, Method::GET, "/photos/1", Some("9"), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = json_request(
        &router,
        Method::POST,
        "/photos/54781/tags",
        Some("7"),
        Some(json!({"tag": "stolen"})),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn unscoped_router_serves_any_photo() -> Result<(), String> {
    let router = test_router(false);
    let (status, body) = json_request(&router, Method::GET, "/photos/54782", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["albumNames"], json!(["Nature", "City"]));

    let (status, _) = json_request(&router, Method::GET, "/photos/abc", None, None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn patch_with_blank_fields_keeps_values() -> Result<(), String> {
    let router = test_router(true);
    let (status, body) = json_request(
        &router,
        Method::PATCH,
        "/photos/54781",
        Some("9"),
        Some(json!({"title": "", "description": ""})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["status"], json!("unchanged"));

    let (status, body) = json_request(
        &router,
        Method::PATCH,
        "/photos/54781",
        Some("9"),
        Some(json!({"title": "Golden"})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("applied"));

    let (_, view) = json_request(&router, Method::GET, "/photos/54781", Some("9"), None).await?;
    assert_eq!(view["title"], json!("Golden"));
    assert_eq!(view["description"], json!("Evening"));
    Ok(())
}

#[tokio::test]
async fn duplicate_tag_returns_conflict() -> Result<(), String> {
    let router = test_router(true);
    let (status, body) = json_request(
        &router,
        Method::POST,
        "/photos/54781/tags",
        Some("9"),
        Some(json!({"tag": "Sunset"})),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["status"], json!("already_exists"));

    let (status, _) = json_request(
        &router,
        Method::POST,
        "/photos/54781/tags",
        Some("9"),
        Some(json!({"tag": "   "})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = json_request(
        &router,
        Method::POST,
        "/photos/54781/tags",
        Some("9"),
        Some(json!({"tag": "Beach"})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    Ok(())
}

#[tokio::test]
async fn album_listing_and_csv_export() -> Result<(), String> {
    let router = test_router(true);

    let (status, body) =
        json_request(&router, Method::GET, "/albums/nature/photos", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    let (status, csv) = request(&router, Method::GET, "/albums/NATURE/csv", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        String::from_utf8(csv).map_err(|err| err.to_string())?,
        "filename,resolution,tags\n\
         sunset.jpg,1920x1080,sunset\n\
         tower.jpg,800x600,city:night"
    );

    let (status, body) =
        json_request(&router, Method::GET, "/albums/Pets/photos", None, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], json!(404));
    Ok(())
}

#[tokio::test]
async fn login_returns_user_without_password() -> Result<(), String> {
    let router = test_router(true);
    let (status, body) = json_request(
        &router,
        Method::POST,
        "/login",
        None,
        Some(json!({"username": "ali", "password": "hunter2"})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": 7, "username": "ali"}));

    let (status, _) = json_request(
        &router,
        Method::POST,
        "/login",
        None,
        Some(json!({"username": "ali", "password": "wrong"})),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn flat_file_backend_persists_through_the_router() -> Result<(), String> {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let store = Arc::new(JsonFileStore::new(dir.path()));
    store
        .save_snapshot(&snapshot())
        .await
        .map_err(|err| err.to_string())?;

    let router = routes().with_state(AppState {
        catalog: CatalogService::new(store),
        enforce_ownership: true,
    });

    let (status, _) = json_request(
        &router,
        Method::POST,
        "/photos/54782/tags",
        Some("7"),
        Some(json!({"tag": "Bridge"})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let reopened = JsonFileStore::new(dir.path());
    let catalog = CatalogService::new(Arc::new(reopened));
    let view = catalog
        .resolve_photo_view(54782)
        .await
        .map_err(|err| err.to_string())?;
    assert_eq!(view.tags, vec!["city", "night", "Bridge"]);

    let (status, body) = json_request(&router, Method::GET, "/readyz", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
    Ok(())
}
