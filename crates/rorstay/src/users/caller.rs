use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::domain::UserRole;

/// Header carrying the authenticated user id, set by the authentication gateway.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the authenticated user's role.
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Identity and role of whoever issued the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: String,
    pub role: UserRole,
}

impl Caller {
    pub fn new(id: impl Into<String>, role: UserRole) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallerRejection {
    #[error("missing authenticated user")]
    Missing,
    #[error("unrecognized role '{0}'")]
    UnknownRole(String),
}

impl IntoResponse for CallerRejection {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = CallerRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, USER_ID_HEADER).ok_or(CallerRejection::Missing)?;
        let raw_role = header(parts, USER_ROLE_HEADER).ok_or(CallerRejection::Missing)?;
        let role = UserRole::parse(raw_role)
            .ok_or_else(|| CallerRejection::UnknownRole(raw_role.to_string()))?;
        Ok(Caller::new(id, role))
    }
}
