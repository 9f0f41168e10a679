//! HTTP surface for the diagnostic session paging protocol.
//!
//! Provides:
//! - `session_router` - axum routes for session creation and page fetching
//! - `ApiError` - error-to-status mapping for the typed session errors
//! - `Link`/`Deadline` response metadata for the cursor-paging contract

pub mod http;
pub mod protocol;

pub use http::session_router;
pub use protocol::ApiError;
