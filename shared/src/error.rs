use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    UnprocessableEntity(String),
    #[error("{0}")]
    CapacityExceeded(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    EntityNotFound(String),
    #[error("{0}")]
    ValidationError(#[from] garde::Report),
    #[error("トランザクションを実行できませんでした。")]
    TransactionError(#[source] sqlx::Error),
    #[error("データベース処理実行中にエラーが発生しました。")]
    SpecificOperationError(#[source] sqlx::Error),
    #[error("No rows affected: {0}")]
    NoRowsAffectedError(String),
    #[error("{0}")]
    KeyValueStoreError(#[from] redis::RedisError),
    #[error("{0}")]
    BcryptError(#[from] bcrypt::BcryptError),
    #[error("{0}")]
    ConvertToUuidError(#[from] uuid::Error),
    #[error("{0}")]
    ConversionEntityError(String),
    #[error("Failed to render the ticket document: {0}")]
    TicketRenderError(String),
    #[error("Authentication is required")]
    UnauthenticatedError,
    #[error("{0}")]
    ForbiddenOperation(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::UnprocessableEntity(_)
            | AppError::CapacityExceeded(_)
            | AppError::ValidationError(_)
            | AppError::ConvertToUuidError(_) => StatusCode::BAD_REQUEST,
            AppError::EntityNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::UnauthenticatedError => StatusCode::UNAUTHORIZED,
            AppError::ForbiddenOperation(_) => StatusCode::FORBIDDEN,
            AppError::TransactionError(_)
            | AppError::SpecificOperationError(_)
            | AppError::NoRowsAffectedError(_)
            | AppError::KeyValueStoreError(_)
            | AppError::BcryptError(_)
            | AppError::ConversionEntityError(_)
            | AppError::TicketRenderError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            tracing::error!(
                error.cause_chain = ?self,
                error.message = %self,
                "Unexpected error happened"
            );
        } else {
            tracing::warn!(
                error.cause_chain = ?self,
                error.message = %self,
                "Client error returned"
            );
        }

        // すべてのエラーは同じ形の JSON エンベロープで返す
        let body = json!({
            "statusCode": status_code.as_u16(),
            "message": self.to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        (status_code, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_expected_status_codes() {
        assert_eq!(
            AppError::EntityNotFound("Event not found".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::UnprocessableEntity("Only draft events can be published".into())
                .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::CapacityExceeded("Event capacity would be exceeded".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Conflict("You already have a pending reservation for this event".into())
                .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::UnauthenticatedError.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::ForbiddenOperation("You can only cancel your own reservations".into())
                .status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn error_response_uses_json_envelope() {
        let res = AppError::EntityNotFound("Reservation not found".into()).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["statusCode"], 404);
        assert_eq!(body["message"], "Reservation not found");
        assert!(body["timestamp"].is_string());
    }
}
