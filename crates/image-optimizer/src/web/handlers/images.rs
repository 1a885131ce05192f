//! Optimized image delivery

use axum::{
    extract::{OriginalUri, Query, State},
    http::{
        HeaderName, HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};

use crate::web::{AppState, extractors::OriginQuery, responses::handle_error};

/// Route prefix stripped from the request path before option parsing.
pub const IMAGE_ROUTE_PREFIX: &str = "/api/image";

const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000";
const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// `GET /api/image/{*path}`
///
/// The raw (still percent-encoded) path is used so the option grammar and
/// URL decoding see exactly what the client sent.
pub async fn optimize_image(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<OriginQuery>,
) -> Response {
    let raw_path = uri
        .path()
        .strip_prefix(IMAGE_ROUTE_PREFIX)
        .unwrap_or_else(|| uri.path());

    match state.optimizer.optimize_request(raw_path, query.origin()).await {
        Ok(image) => (
            StatusCode::OK,
            [
                (CONTENT_TYPE, HeaderValue::from_static(image.content_type)),
                (CACHE_CONTROL, HeaderValue::from_static(IMMUTABLE_CACHE_CONTROL)),
                (X_CACHE, HeaderValue::from_static(image.cache_status.as_str())),
            ],
            image.bytes,
        )
            .into_response(),
        Err(e) => handle_error(e),
    }
}
