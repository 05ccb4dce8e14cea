//! Static file serving

use std::path::{Path, PathBuf};

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

/// File served for the root and for directory requests
pub const INDEX_FILE: &str = "index.html";

/// Serves files from a single root directory
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Serve `rel` (a request path without the leading slash)
    pub async fn serve(&self, rel: &str) -> Response {
        let rel = rel.trim_start_matches('/');
        let rel = if rel.is_empty() { INDEX_FILE } else { rel };

        // Prevent path traversal: canonicalize and ensure the requested path stays within root.
        let Ok(canon_root) = self.root.canonicalize() else {
            warn!("Static root {} is not accessible", self.root.display());
            return (StatusCode::INTERNAL_SERVER_ERROR, "Static root not accessible").into_response();
        };
        let Ok(mut canon_req) = self.root.join(rel).canonicalize() else {
            return (StatusCode::NOT_FOUND, "File not found").into_response();
        };
        if !canon_req.starts_with(&canon_root) {
            warn!("Rejected path outside static root: {}", rel);
            return (StatusCode::FORBIDDEN, "Forbidden").into_response();
        }

        if canon_req.is_dir() {
            canon_req.push(INDEX_FILE);
        }

        match tokio::fs::read(&canon_req).await {
            Ok(bytes) => {
                debug!("Serving {} ({} bytes)", canon_req.display(), bytes.len());
                (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, content_type(&canon_req))],
                    bytes,
                )
                    .into_response()
            }
            Err(_) => (StatusCode::NOT_FOUND, "File not found").into_response(),
        }
    }
}

fn content_type(path: &Path) -> String {
    use mime_guess::mime;

    let guessed = mime_guess::from_path(path).first_or_octet_stream();
    if guessed.type_() == mime::TEXT || guessed.subtype() == mime::JAVASCRIPT {
        format!("{}; charset=utf-8", guessed.essence_str())
    } else {
        guessed.essence_str().to_string()
    }
}
