//! Request/response plumbing shared by the route modules.

use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;

/// Success envelope: `{"success": true, "data": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: None,
        data,
    })
}

pub fn ok_with<T: Serialize>(message: impl Into<String>, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: Some(message.into()),
        data,
    })
}

/// JSON body that has passed its `validator` rules.
pub struct ValidJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Parse a path id, answering 400 rather than 404 for garbage.
pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("invalid id: {raw}")))
}

/// Parse an optional vocabulary query parameter (`?status=...`).
pub fn parse_opt<T>(raw: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: std::str::FromStr<Err = imitra_core::DomainError>,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Ok(Some(s.parse()?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imitra_core::Status;

    #[test]
    fn bad_ids_are_client_errors() {
        assert!(matches!(parse_id("not-a-uuid"), Err(ApiError::BadRequest(_))));
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn optional_vocabulary() {
        assert_eq!(parse_opt::<Status>(Some("in_progress")).unwrap(), Some(Status::InProgress));
        assert_eq!(parse_opt::<Status>(Some("")).unwrap(), None);
        assert_eq!(parse_opt::<Status>(None).unwrap(), None);
        assert!(parse_opt::<Status>(Some("done")).is_err());
    }
}
