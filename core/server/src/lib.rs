//! HTTP surface for ResumeVault.
//!
//! Wires the identity and vault crates to an axum router:
//! - `/auth/*`: local signup and login, password change, Google OAuth
//! - `/resumes/*`: upload, list, usage and delete for the bearer's documents
//! - `/files/*`: stored objects, when the local backend is in use

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::{ServerConfig, StorageBackend};
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;

use tokio::net::TcpListener;
use tracing::{info, warn};

use resumevault_common::Result;

/// Run the server until Ctrl-C or SIGTERM.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let app = router(state);

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, frontend = %config.frontend_url, "ResumeVault listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
