//! Defines routes for all catalog operations.
//!
//! ## Structure
//! - **Probes**
//!   - `GET    /healthz`, `GET /readyz`
//!
//! - **Users**
//!   - `POST   /login` — plain credential check, returns `{id, username}`
//!
//! - **Photos** (owner-only when ownership is enforced, caller in `X-User-Id`)
//!   - `GET    /photos/{id}` — denormalized view
//!   - `PATCH  /photos/{id}` — update title/description
//!   - `POST   /photos/{id}/tags` — add a tag
//!
//! - **Albums**
//!   - `GET    /albums/{name}/photos` — photos of every album with that name
//!   - `GET    /albums/{name}/csv` — same listing as CSV

use crate::handlers::{
    AppState,
    catalog_handlers::{add_tag, album_csv, get_photo, list_album_photos, login, update_photo},
    health_handlers::{healthz, readyz},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for all catalog routes.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/login", post(login))
        // Photo routes
        .route("/photos/{id}", get(get_photo).patch(update_photo))
        .route("/photos/{id}/tags", post(add_tag))
        // Album routes
        .route("/albums/{name}/photos", get(list_album_photos))
        .route("/albums/{name}/csv", get(album_csv))
}
