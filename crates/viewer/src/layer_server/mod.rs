mod routes;

use std::net::SocketAddr;

use tokio::sync::oneshot;

pub use routes::{ViewerState, create_router};

/// Local HTTP server exposing the map layers and panel
///
/// Stops when dropped.
pub struct LayerServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl LayerServer {
    pub async fn start(bind: SocketAddr, state: ViewerState) -> Result<Self, std::io::Error> {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let listener = tokio::net::TcpListener::bind(bind).await?;
        let addr = listener.local_addr()?;
        let app = create_router(state);

        tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(error) = served {
                tracing::error!(%error, "Layer server failed");
            }
        });

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for LayerServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
