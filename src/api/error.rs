use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::application::AppError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Error returned by every handler. Rendered as `{"message": ...}`.
#[derive(Debug)]
pub enum ApiError {
    App(AppError),
    /// The request body or query string could not be decoded.
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::App(err) => match err {
                AppError::InvalidId { .. }
                | AppError::Validation(_)
                | AppError::InsufficientFunds { .. } => StatusCode::BAD_REQUEST,
                AppError::BudgetNotFound(_)
                | AppError::ExpenseNotFound(_)
                | AppError::NoExpenses(_) => StatusCode::NOT_FOUND,
                AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError::App(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::BadRequest(text) => text.clone(),
            ApiError::App(AppError::Database(err)) => {
                tracing::error!(error = ?err, "storage failure while handling request");
                "Unexpected storage error".to_string()
            }
            ApiError::App(err) => err.to_string(),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ValidationError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                AppError::InvalidId {
                    kind: "budget",
                    value: "nope".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::Validation(ValidationError::EmptyUpdate),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::InsufficientFunds {
                    available: 1,
                    required: 2,
                },
                StatusCode::BAD_REQUEST,
            ),
            (AppError::BudgetNotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::NoExpenses("x".into()), StatusCode::NOT_FOUND),
            (
                AppError::Database(anyhow::anyhow!("disk I/O error")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }
}
