use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::api::error::ApiError;

/// Shared bearer token; `None` disables the check
#[derive(Debug, Clone, Default)]
pub struct BearerAuth {
    token: Option<Arc<str>>,
}

impl BearerAuth {
    pub fn new(token: Option<&str>) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()).map(Arc::from),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    pub fn accepts(&self, header: Option<&str>) -> bool {
        let Some(expected) = self.token.as_deref() else {
            return true;
        };
        header
            .and_then(|h| h.strip_prefix("Bearer "))
            .is_some_and(|presented| bool::from(presented.as_bytes().ct_eq(expected.as_bytes())))
    }
}

/// Middleware for `axum::middleware::from_fn_with_state`
pub async fn require_bearer(State(auth): State<BearerAuth>, req: Request, next: Next) -> Result<Response, ApiError> {
    let header = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if !auth.accepts(header) {
        warn!(path = %req.uri().path(), "Rejected request without valid bearer token");
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_accepts_anything() {
        let auth = BearerAuth::new(None);
        assert!(!auth.is_enabled());
        assert!(auth.accepts(None));
        assert!(BearerAuth::new(Some("")).accepts(Some("garbage")));
    }

    #[test]
    fn test_token_check() {
        let auth = BearerAuth::new(Some("s3cret"));
        assert!(auth.accepts(Some("Bearer s3cret")));
        assert!(!auth.accepts(Some("Bearer s3cre")));
        assert!(!auth.accepts(Some("s3cret")));
        assert!(!auth.accepts(None));
    }

    #[test]
    fn test_token_length_mismatch_is_rejected() {
        let auth = BearerAuth::new(Some("s3cret"));
        assert!(!auth.accepts(Some("Bearer s3cret-and-more")));
        assert!(!auth.accepts(Some("Bearer ")));
    }
}
