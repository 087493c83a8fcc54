//! Serve command - run the HTTP API until SIGINT/SIGTERM

use crate::cli::error::HelpfulError;
use anyhow::Context;
use scantrack_server::{serve, wait_for_shutdown_signal, AppState, ScanService, ServeArgs, StoreArgs};
use std::time::Duration;
use tracing::info;

pub fn run(store: StoreArgs, args: ServeArgs) -> anyhow::Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("scantrack-http")
        .build()
        .context("Failed to build tokio runtime")?;

    rt.block_on(async move {
        let location = store.location();
        let backend = store
            .open()
            .await
            .map_err(|err| HelpfulError::store_open_failed(&location, store.store, &err))?;
        info!(store = store.store.as_str(), path = %location.display(), "Store opened");

        let listener = tokio::net::TcpListener::bind(args.bind).await.map_err(|err| {
            HelpfulError::new(format!("Cannot listen on {}", args.bind))
                .with_context(err.to_string())
                .with_suggestion("TRY: Pick another address with --bind HOST:PORT")
        })?;

        serve(
            listener,
            AppState::new(ScanService::new(backend)),
            wait_for_shutdown_signal(),
            Duration::from_secs(args.shutdown_grace_secs),
        )
        .await
        .context("HTTP server failed")?;

        info!("Scantrack stopped");
        Ok::<(), anyhow::Error>(())
    })
}
