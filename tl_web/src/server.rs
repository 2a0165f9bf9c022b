//! ABOUTME: HTTP server lifecycle with graceful shutdown
//! ABOUTME: Drains in-flight requests after SIGTERM/SIGINT before returning

use crate::ServiceInstance;
use actix_web::HttpServer;
use std::future::Future;
use std::net::TcpListener;
use std::time::Duration;
use tl_core::{Error, Result};
use tracing::{error, info};

/// Serve on `bind_addr` until a termination signal arrives
pub async fn serve(
    instance: ServiceInstance,
    bind_addr: &str,
    shutdown_timeout: Duration,
) -> Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .map_err(|e| Error::Config(format!("Failed to bind {}: {}", bind_addr, e)))?;
    serve_listener(instance, listener, shutdown_timeout, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
///
/// On shutdown the readiness gate closes first, then the listener stops
/// accepting and in-flight requests get up to `shutdown_timeout` to finish.
pub async fn serve_listener<F>(
    instance: ServiceInstance,
    listener: TcpListener,
    shutdown_timeout: Duration,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map_err(|e| Error::Config(format!("Listener has no local address: {}", e)))?;
    let readiness = instance.obs.readiness.clone();
    let kind = instance.obs.kind;

    info!(service = kind.service_name(), %addr, "Starting web server");

    let server = HttpServer::new(move || instance.app())
        .disable_signals()
        .shutdown_timeout(shutdown_timeout.as_secs().max(1))
        .listen(listener)
        .map_err(|e| Error::Config(format!("Failed to listen on {}: {}", addr, e)))?
        .run();

    let handle = server.handle();
    tokio::spawn(async move {
        shutdown.await;
        info!("Shutdown requested; closing readiness and draining connections");
        readiness.set_ready(false);
        handle.stop(true).await;
    });

    server
        .await
        .map_err(|e| Error::Config(format!("Web server error: {}", e)))?;

    info!(service = kind.service_name(), "Web server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating shutdown"),
    }
}
