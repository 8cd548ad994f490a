use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use vidhub_auth::TokenError;
use vidhub_db::queries::is_unique_violation;
use vidhub_types::api::ApiResponse;

/// Every failure a handler can report. Rendered as the standard envelope with
/// `data: null` and `success: false`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("storage error: {0:#}")]
    Storage(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if is_unique_violation(&err) {
            ApiError::Conflict("Resource already exists".into())
        } else {
            ApiError::Storage(err)
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(e) => ApiError::Storage(anyhow::Error::new(e)),
            TokenError::Expired => ApiError::Unauthorized("Token expired".into()),
            TokenError::Invalid | TokenError::WrongKind { .. } => {
                ApiError::Unauthorized("Invalid token".into())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Storage(e) => {
                error!("Internal error: {:#}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ApiResponse::new(status.as_u16(), serde_json::Value::Null, message);
        (status, Json(body)).into_response()
    }
}

/// Parse a path or query identifier, naming it in the error.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::InvalidArgument(format!("Invalid {}", what)))
}

/// Trimmed, non-empty text field.
pub fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::InvalidArgument(format!("{} is required", field)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn storage_errors_are_masked() {
        let response = ApiError::Storage(anyhow::anyhow!("disk on fire")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Internal server error");
        assert_eq!(json["success"], false);
        assert!(json["data"].is_null());
    }

    #[test]
    fn token_errors_are_unauthorized() {
        assert_eq!(ApiError::from(TokenError::Expired).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(TokenError::Invalid).status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn ids_and_required_fields() {
        assert!(matches!(parse_id("nope", "video id"), Err(ApiError::InvalidArgument(_))));
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "video id").unwrap(), id);

        assert_eq!(required("  hi ", "content").unwrap(), "hi");
        assert!(required("   ", "content").is_err());
    }
}
