//! Typed failure taxonomy for the detection pipeline.
//!
//! Every stage-local failure is converted into one of these variants at the
//! orchestrator boundary and rendered as a `{success: false, error}` JSON
//! body with the matching status class. Nothing escapes to the transport
//! layer as an unhandled fault, and nothing is retried.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum DetectError {
    /// Missing or malformed request input (absent image, bad base64,
    /// unreadable container, unparseable body).
    #[error("{0}")]
    BadRequest(String),

    /// The selected model is not loaded or no runtime is available.
    #[error("{0}")]
    ServiceUnavailable(String),

    /// The model raised during its forward pass.
    #[error("detection failed: {0}")]
    Inference(String),

    /// Annotation or encoding failure after a successful forward pass.
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
}

impl DetectError {
    pub(crate) fn status(&self) -> StatusCode {
        match self {
            DetectError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DetectError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            DetectError::Inference(_) | DetectError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl ResponseError for DetectError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        let message = self.to_string();
        HttpResponse::build(self.status()).json(ErrorBody {
            success: false,
            error: &message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_map_to_expected_status_classes() {
        assert_eq!(
            DetectError::BadRequest("no image data provided".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DetectError::ServiceUnavailable("models not loaded".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            DetectError::Inference("forward pass failed".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            DetectError::Internal("encode failed".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_body_reports_failure_with_message() {
        let response = DetectError::BadRequest("no image data provided".into()).error_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
