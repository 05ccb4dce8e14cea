//! Web server implementation

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::WebConfig;
use crate::static_files::StaticFiles;

/// Static asset server
#[derive(Clone)]
pub struct WebServer {
    state: Arc<WebServerState>,
}

struct WebServerState {
    static_files: StaticFiles,
}

impl WebServer {
    /// Create a new web server
    pub fn new(cfg: &WebConfig) -> Self {
        Self {
            state: Arc::new(WebServerState {
                static_files: StaticFiles::new(cfg.static_dir.clone()),
            }),
        }
    }

    /// Build the router: `/` and `/<asset>`, nothing else
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(index_handler))
            .route("/*path", get(static_handler))
            .fallback(not_found_handler)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Start the web server and run until Ctrl-C
    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    /// Run on an already bound listener until `shutdown` resolves
    pub async fn serve_with_shutdown(
        self,
        listener: tokio::net::TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        info!(
            "Notably web server listening on http://{} (static root: {})",
            listener.local_addr()?,
            self.state.static_files.root().display()
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Web server stopped");
        Ok(())
    }
}

/// Build a server from `cfg` and run it until Ctrl-C
pub async fn serve(cfg: WebConfig) -> anyhow::Result<()> {
    let addr = cfg.addr();
    WebServer::new(&cfg).serve(addr).await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => {
            warn!("Cannot listen for Ctrl-C, running until killed: {}", e);
            std::future::pending::<()>().await
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn index_handler(State(state): State<Arc<WebServerState>>) -> Response {
    state.static_files.serve("").await
}

async fn static_handler(
    State(state): State<Arc<WebServerState>>,
    Path(path): Path<String>,
) -> Response {
    state.static_files.serve(&path).await
}

async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}
