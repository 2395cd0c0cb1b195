//! HTTP adapters. Handlers only marshal requests into `CatalogService` calls
//! and marshal the results back out.

use crate::services::catalog_service::CatalogService;

pub mod catalog_handlers;
pub mod health_handlers;

/// Shared state carried by the router to every handler.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    /// When set, photo routes require `X-User-Id` and only serve its owner.
    pub enforce_ownership: bool,
}
