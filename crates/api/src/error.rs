//! JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cimiento_core::projection::ProjectionError;
use cimiento_shared::AppError;
use serde_json::json;
use tracing::error;

/// Builds a `{"error", "message"}` response with an explicit code.
pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Maps any error convertible to [`AppError`] to its JSON response.
///
/// Internal errors are logged and their details withheld from the client.
pub fn error_response(err: impl Into<AppError>) -> Response {
    let err = err.into();
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let code = err.error_code().to_lowercase();

    if err.is_internal() {
        error!(error = %err, "Request failed");
        return json_error(status, &code, "An internal error occurred");
    }

    json_error(status, &code, err.to_string())
}

/// Maps an engine error to a response.
///
/// Limit and horizon violations break business rules; everything else is
/// bad input.
pub fn projection_error_response(err: &ProjectionError) -> Response {
    let app = match err {
        ProjectionError::CreditLimitExceeded { .. } | ProjectionError::HorizonTooLong { .. } => {
            AppError::BusinessRule(err.to_string())
        }
        _ => AppError::Validation(err.to_string()),
    };
    error_response(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rstest::rstest;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let response = error_response(AppError::NotFound("Scenario not found".into()));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["error"], "not_found");
        assert_eq!(body["message"], "Not found: Scenario not found");
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let response = error_response(AppError::Database("connection refused".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "database_error");
        assert_eq!(body["message"], "An internal error occurred");
    }

    #[rstest]
    #[case(AppError::Validation("x".into()), StatusCode::BAD_REQUEST)]
    #[case(AppError::BusinessRule("x".into()), StatusCode::UNPROCESSABLE_ENTITY)]
    #[case(AppError::Conflict("x".into()), StatusCode::CONFLICT)]
    #[case(AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_status_mapping(#[case] err: AppError, #[case] expected: StatusCode) {
        assert_eq!(error_response(err).status(), expected);
    }

    #[tokio::test]
    async fn test_projection_errors() {
        let response = projection_error_response(&ProjectionError::HorizonTooLong {
            horizon: 300,
            max: 240,
        });
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = projection_error_response(&ProjectionError::InvalidDiscountRate);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
