//! Route-level errors, rendered as `{ "error": ..., "status": ... }`.

use arena_lights::UnknownColor;
use arena_safety::SafetyError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error(transparent)]
    Color(#[from] UnknownColor),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Safety(_) | Self::Color(_) => StatusCode::BAD_REQUEST,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}
