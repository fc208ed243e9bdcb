//! Admin identity extractor.
//!
//! Authentication happens upstream; this service trusts the gateway to pass
//! the authenticated admin in `X-Admin-Id` and, optionally, `X-Admin-Name`.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

pub const ADMIN_ID_HEADER: &str = "X-Admin-Id";
pub const ADMIN_NAME_HEADER: &str = "X-Admin-Name";

const MAX_HEADER_VALUE_LENGTH: usize = 255;

/// The administrator performing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminActor {
    pub id: String,
    /// Display name; falls back to the id when the name header is absent.
    pub name: String,
}

impl AdminActor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header_value(parts, ADMIN_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("Missing X-Admin-Id header".to_string()))?;

        if id.len() > MAX_HEADER_VALUE_LENGTH {
            return Err(ApiError::Unauthorized("Invalid X-Admin-Id header".to_string()));
        }

        let name = header_value(parts, ADMIN_NAME_HEADER)
            .filter(|n| n.len() <= MAX_HEADER_VALUE_LENGTH)
            .unwrap_or(id);

        Ok(AdminActor::new(id, name))
    }
}
