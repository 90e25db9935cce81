//! HTTP handlers for static asset serving.

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::IntoResponse,
};
use tracing::{debug, instrument};

use crate::static_assets;

/// Serve an embedded file under `/static/`
#[instrument]
pub async fn serve_embedded_asset(Path(path): Path<String>) -> impl IntoResponse {
    let path = path.trim_start_matches('/');

    match static_assets::Assets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime.to_string()),
                    (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
                ],
                content.data.into_owned(),
            )
                .into_response()
        }
        None => {
            debug!("No embedded asset at {path}");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
