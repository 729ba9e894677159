use std::sync::Arc;

use anyhow::{Context, Result};
use neuroscan_core::{init_tracing, load_config};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tumor_classifier::{fetch_and_load, router, AppState, ModelSlot};

const SERVICE: &str = "tumor-classifier";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(SERVICE)?;
    let settings = load_config(SERVICE)?;
    info!(?settings, "config loaded");

    let model = Arc::new(ModelSlot::new());
    let app = router(AppState::new(model.clone()), &settings.server);
    let listener = TcpListener::bind(settings.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", settings.server.bind))?;
    info!(addr = %listener.local_addr()?, "listening");

    // Eager load: starts right away, but the listener is already up so `/`
    // answers while the artifact downloads. A failed load is not retried.
    let model_settings = settings.model.clone();
    tokio::spawn(async move {
        model.initialize(fetch_and_load(&model_settings)).await;
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;
    info!("shutdown");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
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
}
