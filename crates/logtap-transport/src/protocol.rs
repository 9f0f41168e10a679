//! Wire metadata and error mapping for the paging protocol.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use logtap_core::{SessionError, SessionId};
use serde::Serialize;

/// Response header carrying the session's absolute deadline, Unix epoch
/// milliseconds.
pub const DEADLINE_HEADER: &str = "deadline";

/// `Link` header value pointing a client at its next page fetch.
#[must_use]
pub fn next_page_link(id: SessionId, page: u64) -> String {
    format!("</sessions?id={id}&page={page}>; rel=\"next\"")
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Error surface of the paging routes.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request was malformed before the registry was consulted.
    #[error("{0}")]
    BadRequest(String),
    /// Typed registry or session failure.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Session(SessionError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Session(SessionError::Expired(_)) => StatusCode::GONE,
            Self::Session(SessionError::BadPage { .. }) => StatusCode::CONFLICT,
            Self::Session(SessionError::InvariantViolation(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("session subsystem failure: {self}");
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
