use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Failures surfaced to callers of the request/response surface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{message}")]
    Unknown {
        message: String,
        cause: Option<String>,
    },
    #[error("{message}")]
    Internal {
        message: String,
        cause: Option<String>,
    },
}

impl AppError {
    /// Wraps an unexpected capability failure, keeping its message and debug cause.
    pub fn unknown<E>(err: E) -> Self
    where
        E: std::error::Error,
    {
        AppError::Unknown {
            message: err.to_string(),
            cause: Some(format!("{:?}", err)),
        }
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: std::error::Error,
    {
        AppError::Internal {
            message: err.to_string(),
            cause: Some(format!("{:?}", err)),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::PermissionDenied(_) => "permission-denied",
            AppError::InvalidArgument(_) => "invalid-argument",
            AppError::Unknown { .. } => "unknown",
            AppError::Internal { .. } => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::Unknown { .. } | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let (message, details) = match self {
            AppError::PermissionDenied(msg) | AppError::InvalidArgument(msg) => (msg, None),
            AppError::Unknown { message, cause } => (message, cause),
            AppError::Internal { message, cause } => {
                tracing::error!(message = %message, cause = ?cause, "Internal error");
                (message, cause)
            }
        };

        let body = Json(ErrorResponse {
            error: ErrorBody {
                code,
                message,
                details,
            },
        });

        (status, body).into_response()
    }
}

/// How an operation treats the failure of one of its effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Return the failure to the caller of the operation.
    Propagate,
    /// Report the failure to diagnostics and carry on.
    BestEffort,
}

impl FailurePolicy {
    /// Applies the policy to an effect's result. `Ok(None)` means a failure was absorbed.
    pub fn apply<T, E>(self, result: Result<T, E>, effect: &'static str) -> Result<Option<T>, E>
    where
        E: std::fmt::Display,
    {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) => match self {
                FailurePolicy::Propagate => Err(err),
                FailurePolicy::BestEffort => {
                    tracing::error!(effect, error = %err, "Best-effort effect failed");
                    Ok(None)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn response_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn app_error_into_response_maps_status_and_code() {
        let response = AppError::PermissionDenied("denied".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = response_json(response).await;
        assert_eq!(json["error"]["message"], "denied");
        assert_eq!(json["error"]["code"], "permission-denied");
        assert!(json["error"]["details"].is_null());

        let response = AppError::InvalidArgument("Email is required".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"]["message"], "Email is required");
        assert_eq!(json["error"]["code"], "invalid-argument");
    }

    #[tokio::test]
    async fn unknown_and_internal_carry_the_cause() {
        let response = AppError::Unknown {
            message: "no user record".to_string(),
            cause: Some("NotFound(\"a@x.com\")".to_string()),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "unknown");
        assert_eq!(json["error"]["message"], "no user record");
        assert_eq!(json["error"]["details"], "NotFound(\"a@x.com\")");

        let io = std::io::Error::new(std::io::ErrorKind::Other, "export rejected");
        let response = AppError::internal(io).into_response();
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "internal");
        assert_eq!(json["error"]["message"], "export rejected");
        assert!(json["error"]["details"].is_string());
    }

    #[test]
    fn propagate_policy_returns_the_error() {
        let result: Result<(), String> = Err("boom".to_string());
        assert_eq!(
            FailurePolicy::Propagate.apply(result, "test"),
            Err("boom".to_string())
        );
    }

    #[test]
    fn best_effort_policy_absorbs_the_error() {
        let result: Result<u8, String> = Err("boom".to_string());
        assert_eq!(FailurePolicy::BestEffort.apply(result, "test"), Ok(None));
        assert_eq!(
            FailurePolicy::BestEffort.apply(Ok::<u8, String>(7), "test"),
            Ok(Some(7))
        );
    }
}
