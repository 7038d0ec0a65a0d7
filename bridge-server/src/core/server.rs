use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use crate::api;
use crate::core::ServerState;

/// HTTP server plus the background workers it owns
pub struct Server {
    state: ServerState,
}

impl Server {
    pub fn with_state(state: ServerState) -> Self {
        Self { state }
    }

    /// Run until ctrl-c
    pub async fn run(self) -> anyhow::Result<()> {
        let state = self.state;

        // best effort: the bridge still serves requests when an
        // upstream is down at boot
        if let Err(e) = state.erp.authenticate().await {
            tracing::warn!(error = %e, "ERP authentication deferred");
        }
        if let Err(e) = state
            .resolver
            .setup_subscription(&state.config.public_url)
            .await
        {
            tracing::warn!(error = %e, "subscription registration deferred");
        }

        if state.config.inventory_sync_enabled {
            let worker = Arc::clone(&state.inventory);
            let token = state.shutdown.clone();
            tokio::spawn(worker.run(token));
        } else {
            tracing::info!("inventory sync disabled");
        }

        let app = api::build_app(state.clone());
        let addr = format!("0.0.0.0:{}", state.config.http_port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding {addr}"))?;
        tracing::info!(addr = %addr, "bridge listening");

        let shutdown = state.shutdown.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("shutdown signal received");
                shutdown.cancel();
            })
            .await
            .context("http server")?;

        tracing::info!("bridge stopped");
        Ok(())
    }
}
