use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::quota::QuotaError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("daily limit reached ({used}/{limit} questions), come back tomorrow")]
    LimitExceeded { used: u32, limit: u32 },
    #[error("service temporarily unavailable, retry later")]
    Unavailable(#[source] anyhow::Error),
    #[error("upstream solver failed: {0}")]
    BadGateway(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<QuotaError> for AppError {
    fn from(e: QuotaError) -> Self {
        match e {
            QuotaError::AccountNotFound { .. } => AppError::NotFound("Account not found".into()),
            QuotaError::StoreUnavailable { source, .. } => AppError::Unavailable(source.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::LimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Db(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = ?self, %status, "request failed");
        }
        // internal details stay in the logs
        let body = match &self {
            AppError::Db(_) | AppError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        };
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::store::StoreError;

    #[test]
    fn quota_errors_map_to_fail_closed_statuses() {
        let missing: AppError = QuotaError::AccountNotFound {
            email: "a@b.co".into(),
        }
        .into();
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let down: AppError = QuotaError::StoreUnavailable {
            source: StoreError(anyhow::anyhow!("timeout")),
            used: 2,
            limit: 5,
        }
        .into();
        assert_eq!(down.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn limit_exceeded_is_too_many_requests() {
        let err = AppError::LimitExceeded { used: 5, limit: 5 };
        assert!(err.to_string().contains("5/5"));
        assert_eq!(err.into_response().status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
