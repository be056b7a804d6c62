use crate::application::{error::ErrorReport, posts::PostError};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// `{success:false, error, message?}` as returned by the post endpoints.
#[derive(Debug, Serialize)]
pub struct ApiErrorEnvelope {
    pub success: bool,
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `{error}` as returned by the block endpoint.
#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Envelope,
    Bare,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: &'static str,
    message: Option<String>,
    shape: Shape,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, error: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status,
            error,
            message: None,
            shape: Shape::Envelope,
            detail: detail.into(),
        }
    }

    pub fn bad_request(error: &'static str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error, error)
    }

    pub fn post_not_found(slug: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "Post not found",
            format!("no post with slug `{slug}`"),
        )
    }

    /// Upstream or mapping failure on a post endpoint; the cause is echoed
    /// in `message`.
    pub fn posts_failed(err: &PostError) -> Self {
        Self {
            message: Some(err.to_string()),
            ..Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch blog posts",
                err.to_string(),
            )
        }
    }

    pub fn blocks_failed(err: &PostError) -> Self {
        Self {
            shape: Shape::Bare,
            ..Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch table blocks",
                err.to_string(),
            )
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = match self.shape {
            Shape::Envelope => (
                self.status,
                Json(ApiErrorEnvelope {
                    success: false,
                    error: self.error,
                    message: self.message,
                }),
            )
                .into_response(),
            Shape::Bare => (self.status, Json(ApiErrorBody { error: self.error })).into_response(),
        };
        ErrorReport::from_message("infra::http::api", self.status, self.detail).attach(&mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use serde_json::{Value, json};

    use super::*;
    use crate::application::source::SourceError;

    async fn body_of(error: ApiError) -> (StatusCode, Value, bool) {
        let response = error.into_response();
        let status = response.status();
        let has_report = response.extensions().get::<ErrorReport>().is_some();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        (
            status,
            serde_json::from_slice(&bytes).expect("json"),
            has_report,
        )
    }

    #[tokio::test]
    async fn envelope_echoes_cause() {
        let err = PostError::Source(SourceError::Transport("connection reset".to_string()));
        let (status, body, has_report) = body_of(ApiError::posts_failed(&err)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({
                "success": false,
                "error": "Failed to fetch blog posts",
                "message": "upstream request failed: connection reset"
            })
        );
        assert!(has_report);
    }

    #[tokio::test]
    async fn not_found_omits_message() {
        let (status, body, _) = body_of(ApiError::post_not_found("missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"success": false, "error": "Post not found"}));
    }

    #[tokio::test]
    async fn block_errors_are_bare() {
        let err = PostError::Source(SourceError::NotFound);
        let (status, body, _) = body_of(ApiError::blocks_failed(&err)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Failed to fetch table blocks"}));
    }
}
