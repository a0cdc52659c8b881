//! Serve entrypoint shared by the binary and the tests.

use crate::{
    DaemonConfig,
    gateway::{Gateway, Limits, uds},
};
use anyhow::{Context, Result};
use mcore::Adapter;
use model::Registry;
use std::path::{Path, PathBuf};
use tokio::{net::UnixListener, sync::oneshot, task::JoinHandle};

/// Handle returned by [`serve`]: the socket path and the shutdown trigger.
pub struct ServeHandle {
    /// The unix domain socket the gateway is listening on.
    pub socket_path: PathBuf,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<std::io::Result<()>>>,
}

impl ServeHandle {
    /// Stop accepting, let in-flight exchanges finish, and remove the
    /// socket file.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            join.await??;
        }
        if let Err(e) = std::fs::remove_file(&self.socket_path) {
            tracing::debug!("socket {} not removed: {e}", self.socket_path.display());
        }
        Ok(())
    }
}

/// Build the registry from `config` and serve it.
///
/// The registry is built before anything touches the filesystem, so a
/// configuration with colliding model ids never creates a socket.
pub async fn serve(config: &DaemonConfig, socket: Option<&Path>) -> Result<ServeHandle> {
    let registry = Registry::from_configs(&config.providers)?;
    tracing::info!(
        "registered {} models from {} providers",
        registry.len(),
        config.providers.len()
    );
    let gateway = Gateway::new(registry, Limits::from(&config.server));
    serve_gateway(gateway, &config.socket_path(socket)).await
}

/// Bind `path` and serve `gateway` on it until the handle is shut down.
pub async fn serve_gateway<A: Adapter>(gateway: Gateway<A>, path: &Path) -> Result<ServeHandle> {
    let listener = bind(path)?;
    tracing::info!("gateway listening on {}", path.display());

    let app = uds::router(gateway);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("received shutdown signal");
            })
            .await
    });

    Ok(ServeHandle {
        socket_path: path.to_path_buf(),
        shutdown_tx: Some(shutdown_tx),
        join: Some(join),
    })
}

fn bind(path: &Path) -> Result<UnixListener> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    if path.exists() {
        tracing::debug!("removing stale socket {}", path.display());
        std::fs::remove_file(path)
            .with_context(|| format!("failed to remove stale socket {}", path.display()))?;
    }
    UnixListener::bind(path).with_context(|| format!("failed to bind {}", path.display()))
}
