use axum_cookie::prelude::*;
use base64::{Engine as _, engine::general_purpose};
use tracing::warn;

use listfilter_core::domain::common::ListFilterError;
use listfilter_core::domain::selection::{PersistedSelection, SelectionStore};

/// Keeps the filter selection in a browser cookie, one cookie per store
/// key, the value base64-encoded JSON. Requires `CookieLayer` on the
/// router. A cookie that no longer decodes is treated as absent rather
/// than an error, since clients may hand back anything.
#[derive(Clone)]
pub struct CookieSelectionStore {
    cookies: CookieManager,
}

impl CookieSelectionStore {
    pub fn new(cookies: CookieManager) -> Self {
        Self { cookies }
    }
}

impl SelectionStore for CookieSelectionStore {
    async fn read(&self, key: &str) -> Result<Option<PersistedSelection>, ListFilterError> {
        let Some(cookie) = self.cookies.get(key) else {
            return Ok(None);
        };
        let payload = match general_purpose::STANDARD.decode(cookie.value()) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Discarding undecodable filter cookie '{}': {}", key, e);
                return Ok(None);
            }
        };
        match serde_json::from_slice(&payload) {
            Ok(selection) => Ok(Some(selection)),
            Err(e) => {
                warn!("Discarding undecodable filter cookie '{}': {}", key, e);
                Ok(None)
            }
        }
    }

    async fn write(&self, key: &str, selection: &PersistedSelection) -> Result<(), ListFilterError> {
        let payload =
            serde_json::to_vec(selection).map_err(|e| ListFilterError::StoreWrite(e.to_string()))?;

        let mut cookie = Cookie::new(key.to_string(), general_purpose::STANDARD.encode(payload));
        cookie.set_http_only(true);
        cookie.set_secure(true);
        cookie.set_path("/");
        self.cookies.add(cookie);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ListFilterError> {
        self.cookies.remove(key);
        Ok(())
    }
}
