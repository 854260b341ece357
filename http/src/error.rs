//! Boundary adapter: tagged service results to transport status codes.

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use hyper::Response;

use formway_service::ServiceError;

use crate::dto::ErrorBody;

/// Ingress-level errors (bind/serve, not request handling).
#[derive(Debug, thiserror::Error)]
pub enum IngressError {
    #[error("invalid bind address {addr}: {reason}")]
    InvalidAddr { addr: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("route table error: {0}")]
    RouteTable(String),
}

/// The 1:1 mapping from the tagged result to a status code.
pub fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
        ServiceError::Forbidden => StatusCode::FORBIDDEN,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Conflict(_) => StatusCode::CONFLICT,
        ServiceError::Problem(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Render a service error as the wire error body.
pub fn error_response(err: &ServiceError) -> Response<Full<Bytes>> {
    let status = status_for(err);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(formway.http.error = %err, "Request failed");
    }
    let body = ErrorBody {
        error: err.kind().to_string(),
        message: err.to_string(),
    };
    let bytes = serde_json::to_vec(&body).unwrap_or_default();
    Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(bytes)))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_is_one_to_one() {
        assert_eq!(
            status_for(&ServiceError::Validation("empty".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&ServiceError::NotFound("questionnaire")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&ServiceError::Conflict("taken".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&ServiceError::Unauthorized),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_for(&ServiceError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            status_for(&ServiceError::Problem("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_body_carries_kind_and_message() {
        let response = error_response(&ServiceError::NotFound("answer"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
