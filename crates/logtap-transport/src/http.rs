//! HTTP routes for session creation and page fetching.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderName, header},
    response::IntoResponse,
    routing::post,
};
use logtap_core::Tag;
use logtap_session::{Session, SessionRegistry};

use crate::protocol::{ApiError, DEADLINE_HEADER, next_page_link};

/// Shared handler state.
#[derive(Clone)]
struct AppState {
    registry: Arc<SessionRegistry>,
}

/// Build the `/sessions` router over `registry`.
///
/// The embedder mounts this (possibly nested under its own base path) and
/// owns listener setup; see the demo server for full wiring.
#[must_use]
pub fn session_router(registry: Arc<SessionRegistry>) -> Router {
    Router::new()
        .route("/sessions", post(create_session).get(fetch_page))
        .with_state(AppState { registry })
}

/// `Link` + `Deadline` response metadata for a session's next fetch.
fn page_metadata(session: &Session) -> [(HeaderName, String); 2] {
    [
        (header::LINK, next_page_link(session.id(), session.page())),
        (
            HeaderName::from_static(DEADLINE_HEADER),
            session.deadline_ms().to_string(),
        ),
    ]
}

fn first_param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// `POST /sessions?k1=v1&k2=v2` - mint a session tagged with the query
/// pairs. Duplicate keys are rejected. The new identifier, initial page,
/// and absolute deadline travel back as response metadata; there is no
/// body.
async fn create_session(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, ApiError> {
    let mut tags: Vec<Tag> = Vec::with_capacity(params.len());
    for (key, value) in params {
        if tags.iter().any(|t| t.key == key) {
            return Err(ApiError::BadRequest(
                "query params cannot contain duplicate pairs".to_string(),
            ));
        }
        tags.push(Tag::new(key, value));
    }

    let session = state.registry.create(tags)?;
    Ok(page_metadata(&session))
}

/// `GET /sessions?id={id}&page={n}` - drain up to one page of records.
///
/// Succeeds only for the session's current page; the response carries the
/// drained batch as JSON plus updated `Link`/`Deadline` metadata.
async fn fetch_page(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, ApiError> {
    let id = first_param(&params, "id")
        .ok_or_else(|| ApiError::BadRequest("missing id query param".to_string()))?;
    let page_str = first_param(&params, "page")
        .ok_or_else(|| ApiError::BadRequest("missing page query param".to_string()))?;
    let page: u64 = page_str
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid page value: {page_str}")))?;

    let session = state.registry.get(id)?;
    let batch = session.fetch_page(page)?;

    Ok((page_metadata(&session), Json(batch)))
}
