use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use ducat_engine::EngineError;

/// Engine failures carried to the HTTP edge. Storage errors are logged
/// and masked; everything else surfaces its message verbatim.
pub struct ApiError(EngineError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            EngineError::Validation(_) => (StatusCode::BAD_REQUEST, self.0.to_string()),
            EngineError::InsufficientFunds(_) => {
                (StatusCode::PAYMENT_REQUIRED, self.0.to_string())
            }
            EngineError::NotAuthorized(_) => (StatusCode::FORBIDDEN, self.0.to_string()),
            EngineError::NotFound(_) => (StatusCode::NOT_FOUND, self.0.to_string()),
            EngineError::Cooldown(_) => (StatusCode::TOO_MANY_REQUESTS, self.0.to_string()),
            EngineError::Storage(err) => {
                error!(%err, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
