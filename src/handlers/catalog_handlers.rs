//! HTTP handlers for photo, album and login operations.
//! Ownership-scoped routes read the caller from the `X-User-Id` header.

use crate::{
    errors::AppError,
    handlers::AppState,
    models::{
        photo::{Photo, PhotoView},
        user::UserView,
    },
    services::catalog_service::{MutationReport, MutationStatus, render_album_csv},
};
use axum::{
    Json,
    body::Body,
    extract::{FromRequestParts, Path, State},
    http::{HeaderValue, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Body of `POST /login`.
#[derive(Debug, Deserialize)]
pub struct LoginReq {
    pub username: String,
    pub password: String,
}

/// Body of `PATCH /photos/{id}`. Absent or empty fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdatePhotoReq {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Body of `POST /photos/{id}/tags`.
#[derive(Debug, Deserialize)]
pub struct AddTagReq {
    pub tag: String,
}

/// Caller identity taken from `X-User-Id`, if the header is present.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Option<i64>);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(USER_ID_HEADER) else {
            return Ok(Caller(None));
        };
        raw.to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(|id| Caller(Some(id)))
            .ok_or_else(|| AppError::bad_request("X-User-Id must be an integer user id"))
    }
}

impl Caller {
    /// The user id to scope by, `None` when ownership is not enforced.
    fn scope(self, state: &AppState) -> Result<Option<i64>, AppError> {
        if !state.enforce_ownership {
            return Ok(None);
        }
        self.0
            .map(Some)
            .ok_or_else(|| AppError::bad_request("X-User-Id header is required"))
    }
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginReq>,
) -> Result<Json<UserView>, AppError> {
    let user = state
        .catalog
        .authenticate(&req.username, &req.password)
        .await?;
    Ok(Json(user))
}

/// `GET /photos/{id}` — denormalized photo view.
pub async fn get_photo(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    caller: Caller,
) -> Result<Json<PhotoView>, AppError> {
    let photo_id = parse_photo_id(&raw_id)?;
    let view = match caller.scope(&state)? {
        Some(user_id) => state.catalog.view_owned_photo(user_id, photo_id).await?,
        None => state.catalog.resolve_photo_view(photo_id).await?,
    };
    Ok(Json(view))
}

/// `PATCH /photos/{id}` — update title and/or description.
pub async fn update_photo(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    caller: Caller,
    Json(req): Json<UpdatePhotoReq>,
) -> Result<Response, AppError> {
    let photo_id = parse_photo_id(&raw_id)?;
    let title = req.title.as_deref();
    let description = req.description.as_deref();
    let report = match caller.scope(&state)? {
        Some(user_id) => {
            state
                .catalog
                .update_owned_photo(user_id, photo_id, title, description)
                .await?
        }
        None => {
            state
                .catalog
                .update_photo_fields(photo_id, title, description)
                .await?
        }
    };
    Ok(report_response(report))
}

/// `POST /photos/{id}/tags` — add one tag.
pub async fn add_tag(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    caller: Caller,
    Json(req): Json<AddTagReq>,
) -> Result<Response, AppError> {
    let photo_id = parse_photo_id(&raw_id)?;
    let report = match caller.scope(&state)? {
        Some(user_id) => {
            state
                .catalog
                .tag_owned_photo(user_id, photo_id, &req.tag)
                .await?
        }
        None => state.catalog.add_tag_to_photo(photo_id, &req.tag).await?,
    };
    Ok(report_response(report))
}

/// `GET /albums/{name}/photos` — photos of every album with that name.
pub async fn list_album_photos(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Photo>>, AppError> {
    let photos = state.catalog.list_photos_by_album_name(&name).await?;
    Ok(Json(photos))
}

/// `GET /albums/{name}/csv` — the same listing as `filename,resolution,tags` CSV.
pub async fn album_csv(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let photos = state.catalog.list_photos_by_album_name(&name).await?;
    let csv = render_album_csv(&photos);
    let etag = format!("\"{:x}\"", md5::compute(csv.as_bytes()));

    let mut response = Response::new(Body::from(csv));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    if let Ok(value) = HeaderValue::from_str(&etag) {
        headers.insert(header::ETAG, value);
    }
    Ok(response)
}

fn parse_photo_id(raw: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::bad_request(format!("invalid photo id `{}`", raw)))
}

fn report_response(report: MutationReport) -> Response {
    let status = match report.status {
        MutationStatus::Applied | MutationStatus::Unchanged => StatusCode::OK,
        MutationStatus::AlreadyExists => StatusCode::CONFLICT,
        MutationStatus::Vanished => StatusCode::NOT_FOUND,
    };
    let body = serde_json::json!({
        "success": report.success(),
        "status": report.status,
        "message": report.message,
    });
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_ids_must_be_integers() {
        assert_eq!(parse_photo_id(" 54781 ").unwrap(), 54781);
        let err = parse_photo_id("abc").unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
