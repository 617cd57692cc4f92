//! Asset server: serves images kept by the local asset store over HTTP.
//!
//! The local store hands out public URLs of the form `<base>/<filename>`;
//! mounting this router at that base makes those URLs resolvable.

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::{path::PathBuf, sync::Arc};
use tokio::fs;
use tracing::{debug, warn};

use crate::mime_detect::{detect_mime_type, is_inline_safe};

/// State shared by asset server routes.
#[derive(Clone)]
pub struct MediaServerState {
    pub media_dir: Arc<PathBuf>,
}

/// Build the asset server Axum router.
///
/// Mount at the store's public prefix (e.g. `/assets`):
///   GET /assets/:filename  serves a stored image
pub fn media_router(media_dir: PathBuf) -> Router {
    let state = MediaServerState {
        media_dir: Arc::new(media_dir),
    };
    Router::new()
        .route("/:filename", get(serve_media))
        .with_state(state)
}

/// Filenames are flat; anything that could walk out of the store is refused.
pub fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains("..")
        && !filename.contains('/')
        && !filename.contains('\\')
}

/// GET /:filename: return a stored image.
async fn serve_media(
    Path(filename): Path<String>,
    State(state): State<MediaServerState>,
) -> Response {
    if !is_safe_filename(&filename) {
        warn!(filename = %filename, "Rejected suspicious asset path");
        return (StatusCode::BAD_REQUEST, "Invalid filename").into_response();
    }

    let path = state.media_dir.join(&filename);
    debug!(path = %path.display(), "Serving asset");

    match fs::read(&path).await {
        Ok(bytes) => {
            let mime = detect_mime_type(&path);
            let disposition = if is_inline_safe(mime) {
                format!("inline; filename=\"{filename}\"")
            } else {
                format!("attachment; filename=\"{filename}\"")
            };
            let disposition = HeaderValue::from_str(&disposition)
                .unwrap_or_else(|_| HeaderValue::from_static("inline"));

            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, HeaderValue::from_static(mime)),
                    (header::CONTENT_DISPOSITION, disposition),
                    (header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=86400")),
                ],
                bytes,
            )
                .into_response()
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, "Asset not found").into_response()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read asset");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read asset").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[test]
    fn rejects_traversal() {
        assert!(is_safe_filename("parcel_1700000000000.jpg"));
        assert!(!is_safe_filename("../secret.jpg"));
        assert!(!is_safe_filename("a/b.jpg"));
        assert!(!is_safe_filename(""));
    }

    #[tokio::test]
    async fn serves_stored_image() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("parcel_1.jpg"), [0xFF, 0xD8, 0xFF]).unwrap();
        let app = media_router(dir.path().to_path_buf());

        let resp = app
            .oneshot(Request::get("/parcel_1.jpg").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/jpeg");
    }

    #[tokio::test]
    async fn missing_image_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let app = media_router(dir.path().to_path_buf());
        let resp = app
            .oneshot(Request::get("/nope.jpg").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
