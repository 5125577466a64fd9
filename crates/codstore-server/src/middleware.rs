use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Admin auth settings used by middleware.
///
/// The config layer guarantees a key is present outside development, so a
/// missing key here only ever means a local dev run.
#[derive(Debug, Clone)]
pub struct AuthState {
    admin_key: Option<Arc<str>>,
}

impl AuthState {
    #[must_use]
    pub fn from_config(config: &codstore_core::AppConfig) -> Self {
        let admin_key = config.admin_key.as_deref().map(Arc::from);
        if admin_key.is_none() {
            tracing::warn!(
                "CODSTORE_ADMIN_KEY not set; admin auth disabled in development environment"
            );
        }
        Self { admin_key }
    }

    #[cfg(test)]
    pub fn with_key(key: Option<&str>) -> Self {
        Self {
            admin_key: key.map(Arc::from),
        }
    }

    fn allows(&self, presented: Option<&[u8]>) -> bool {
        match (&self.admin_key, presented) {
            (None, _) => true,
            // ct_eq on slices is length-checked without early exit on content.
            (Some(expected), Some(presented)) => {
                expected.as_bytes().ct_eq(presented).unwrap_u8() == 1
            }
            (Some(_), None) => false,
        }
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

impl IntoResponse for MiddlewareErrorBody {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, Json(self)).into_response()
    }
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware enforcing the `X-Admin-Key` shared secret when configured.
pub async fn require_admin_key(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    let presented = req.headers().get("x-admin-key").map(HeaderValue::as_bytes);

    if auth.allows(presented) {
        next.run(req).await
    } else {
        MiddlewareErrorBody {
            error: MiddlewareError {
                code: "unauthorized",
                message: "missing or invalid admin key",
            },
        }
        .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_key_is_allowed() {
        let auth = AuthState::with_key(Some("secret-key"));
        assert!(auth.allows(Some(b"secret-key")));
    }

    #[test]
    fn wrong_or_missing_key_is_rejected() {
        let auth = AuthState::with_key(Some("secret-key"));
        assert!(!auth.allows(Some(b"secret-kex")));
        assert!(!auth.allows(Some(b"secret")));
        assert!(!auth.allows(None));
    }

    #[test]
    fn disabled_auth_allows_everything() {
        let auth = AuthState::with_key(None);
        assert!(auth.allows(None));
        assert!(auth.allows(Some(b"anything")));
    }
}
