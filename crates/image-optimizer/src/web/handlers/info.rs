//! Source image inspection

use axum::{
    extract::{Query, State},
    response::Response,
};

use crate::{
    errors::{AppError, ParamsError},
    web::{
        AppState,
        extractors::InfoQuery,
        responses::{handle_error, ok},
    },
};

/// `GET /api/info?url=` reports the source image's width, height and format.
pub async fn image_info(State(state): State<AppState>, Query(query): Query<InfoQuery>) -> Response {
    let Some(url) = query.url() else {
        return handle_error(AppError::Parameter(ParamsError::MissingPath));
    };

    match state.optimizer.info(url).await {
        Ok(info) => ok(info),
        Err(e) => handle_error(e),
    }
}
