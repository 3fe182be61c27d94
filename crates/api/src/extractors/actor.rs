//! Acting employee header extractor.
//!
//! Authentication happens upstream; the gateway forwards the acting
//! employee's id so audit log entries can name who did what.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::HeaderName, request::Parts},
};

use crate::error::ApiError;

/// Header carrying the acting employee id.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";

/// Optional acting employee. `None` when the header is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Actor(pub Option<i64>);

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_name = HeaderName::from_static(ACTOR_ID_HEADER);
        let Some(value) = parts.headers.get(&header_name) else {
            return Ok(Actor(None));
        };
        value
            .to_str()
            .ok()
            .map(str::trim)
            .and_then(|s| s.parse::<i64>().ok())
            .map(|id| Actor(Some(id)))
            .ok_or_else(|| ApiError::Validation(format!("Invalid {} header", ACTOR_ID_HEADER)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<Actor, ApiError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(ACTOR_ID_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Actor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_actor_present() {
        assert_eq!(extract(Some("42")).await.unwrap(), Actor(Some(42)));
    }

    #[tokio::test]
    async fn test_actor_absent() {
        assert_eq!(extract(None).await.unwrap(), Actor(None));
    }

    #[tokio::test]
    async fn test_actor_malformed() {
        assert!(matches!(
            extract(Some("admin")).await,
            Err(ApiError::Validation(_))
        ));
    }
}
