use crate::{build_router, AppState};
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// Serve the API on `listener` until `shutdown` resolves. In-flight requests
/// get `grace` to finish before the server stops waiting for them.
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState,
    shutdown: F,
    grace: Duration,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(
        %addr,
        backend = state.service.store().backend_tag(),
        "scantrack listening"
    );

    let draining = Arc::new(Notify::new());
    let notify = Arc::clone(&draining);
    let server = axum::serve(listener, build_router(state)).with_graceful_shutdown(async move {
        shutdown.await;
        info!("Shutdown signal received, draining requests");
        notify.notify_one();
    });

    tokio::select! {
        result = server.into_future() => result,
        _ = async {
            draining.notified().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(grace_secs = grace.as_secs(), "Grace period elapsed with requests in flight");
            Ok(())
        }
    }
}

/// Resolve on SIGINT or SIGTERM (Ctrl-C elsewhere).
pub async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
                return;
            }
            (Err(err), _) | (_, Err(err)) => {
                warn!(error = %err, "Failed to register signal handlers, falling back to ctrl-c");
            }
        }
    }
    wait_for_ctrl_c(tokio::signal::ctrl_c()).await;
}

/// Resolve once `ctrl_c` fires. A registration error never resolves.
async fn wait_for_ctrl_c<F>(ctrl_c: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(err) = ctrl_c.await {
        error!(error = %err, "Failed to listen for ctrl-c, shutdown signals are disabled");
        std::future::pending::<()>().await;
    }
}
