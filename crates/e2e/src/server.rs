//! Server management - running and health checking the web server

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use notably_web::{WebConfig, WebServer};

use crate::error::{E2eError, E2eResult};

/// How the server under test is run
enum ServerProcess {
    /// A `notably-web` binary in a subprocess
    Spawned(Child),
    /// The router on this runtime
    InProcess {
        shutdown: Option<oneshot::Sender<()>>,
        task: JoinHandle<anyhow::Result<()>>,
    },
}

/// Handle to a running server
pub struct ServerHandle {
    process: ServerProcess,
    pub base_url: String,
    pub port: u16,
}

impl ServerHandle {
    /// Start the server described by `config`
    pub async fn start(config: ServerConfig) -> E2eResult<Self> {
        match config.binary_path.clone() {
            Some(binary) => Self::spawn(binary, config).await,
            None => Self::in_process(config).await,
        }
    }

    /// Spawn the notably-web binary
    async fn spawn(binary: PathBuf, config: ServerConfig) -> E2eResult<Self> {
        let port = match config.port {
            Some(port) => port,
            None => find_free_port()?,
        };
        let base_url = format!("http://127.0.0.1:{}", port);

        info!("Spawning web server on port {}", port);

        let mut cmd = Command::new(&binary);
        cmd.env("PORT", port.to_string())
            .env("NOTABLY_WEB_HOST", "127.0.0.1")
            .env("NOTABLY_STATIC_DIR", &config.static_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().map_err(|e| {
            E2eError::ServerStartup(format!("Failed to spawn {}: {}", binary.display(), e))
        })?;

        let handle = ServerHandle {
            process: ServerProcess::Spawned(child),
            base_url: base_url.clone(),
            port,
        };

        handle.wait_for_healthy(config.startup_timeout).await?;

        info!("Server is healthy at {}", base_url);
        Ok(handle)
    }

    /// Serve the router from this process
    async fn in_process(config: ServerConfig) -> E2eResult<Self> {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", config.port.unwrap_or(0))).await?;
        let port = listener.local_addr()?.port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let server = WebServer::new(&WebConfig {
            port,
            static_dir: config.static_dir.clone(),
            ..Default::default()
        });

        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(server.serve_with_shutdown(listener, async move {
            let _ = rx.await;
        }));

        let handle = ServerHandle {
            process: ServerProcess::InProcess {
                shutdown: Some(tx),
                task,
            },
            base_url: base_url.clone(),
            port,
        };

        handle.wait_for_healthy(config.startup_timeout).await?;

        info!("In-process server is healthy at {}", base_url);
        Ok(handle)
    }

    /// Wait for the server to answer `GET /`
    async fn wait_for_healthy(&self, timeout_duration: Duration) -> E2eResult<()> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match client.get(&self.base_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Health check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for server to start...");
                    }
                    // Connection refused is expected while server is starting
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(E2eError::ServerHealthCheck(attempts))
    }

    /// Get the base URL for this server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop the server
    pub fn stop(&mut self) -> E2eResult<()> {
        match &mut self.process {
            ServerProcess::Spawned(child) => {
                info!("Stopping server (pid: {})", child.id());

                // Try graceful shutdown first
                #[cfg(unix)]
                {
                    use nix::sys::signal::{kill, Signal};
                    use nix::unistd::Pid;

                    let pid = Pid::from_raw(child.id() as i32);
                    if kill(pid, Signal::SIGTERM).is_ok() {
                        std::thread::sleep(Duration::from_millis(200));
                    }
                }

                // Force kill if still running
                let _ = child.kill();
                let _ = child.wait();
            }
            ServerProcess::InProcess { shutdown, task } => {
                if let Some(tx) = shutdown.take() {
                    info!("Stopping in-process server");
                    let _ = tx.send(());
                }
                if task.is_finished() {
                    debug!("In-process server already exited");
                }
            }
        }
        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Configuration for running a server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to a notably-web binary (None = serve in-process)
    pub binary_path: Option<PathBuf>,

    /// Directory containing the page assets
    pub static_dir: PathBuf,

    /// Port to listen on (None = find free port)
    pub port: Option<u16>,

    /// Timeout for server startup
    pub startup_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            static_dir: PathBuf::from(notably_web::config::DEFAULT_STATIC_DIR),
            port: None,
            startup_timeout: Duration::from_secs(30),
        }
    }
}

/// Find a free port to use
fn find_free_port() -> E2eResult<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_free_port() {
        let port = find_free_port().unwrap();
        assert!(port > 0);
    }

    #[tokio::test]
    async fn in_process_server_serves_index() {
        let server = ServerHandle::start(ServerConfig::default()).await.unwrap();

        let body = reqwest::get(server.base_url()).await.unwrap().text().await.unwrap();
        assert!(body.contains("new-note-input"));
    }
}
