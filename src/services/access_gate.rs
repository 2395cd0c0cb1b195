//! Ownership checks and credential matching.

use crate::{
    models::{
        photo::Photo,
        user::{User, UserView},
    },
    services::store::{CatalogStore, StoreResult},
};
use std::{fmt, sync::Arc};
use tracing::warn;

/// Why a caller was refused access to a photo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DenyReason {
    NotFound,
    Forbidden,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::NotFound => f.write_str("not found"),
            DenyReason::Forbidden => f.write_str("forbidden"),
        }
    }
}

/// Outcome of an ownership check. `Allow` hands back the photo that was read
/// so callers do not fetch it a second time.
#[derive(Clone, Debug, PartialEq)]
pub enum Access {
    Allow(Photo),
    Deny(DenyReason),
}

#[derive(Clone)]
pub struct AccessGate {
    store: Arc<dyn CatalogStore>,
}

impl AccessGate {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Allow only if the photo exists and `user_id` owns it.
    /// Unowned legacy photos are denied to everyone.
    pub async fn authorize(&self, user_id: i64, photo_id: i64) -> StoreResult<Access> {
        let Some(photo) = self.store.find_photo_by_id(photo_id).await? else {
            warn!(user_id, photo_id, "access denied: photo not found");
            return Ok(Access::Deny(DenyReason::NotFound));
        };
        if photo.owner != Some(user_id) {
            warn!(user_id, photo_id, owner = ?photo.owner, "access denied: not the owner");
            return Ok(Access::Deny(DenyReason::Forbidden));
        }
        Ok(Access::Allow(photo))
    }

    /// Exact, plain-text match of both fields. Returns `None` on any mismatch.
    pub async fn authenticate(&self, username: &str, password: &str) -> StoreResult<Option<UserView>> {
        let user = self.store.find_user_by_username(username).await?;
        Ok(user
            .filter(|u: &User| u.password == password)
            .map(|u| UserView::from(&u)))
    }
}
