//! Command-line subcommands for Scantrack.
//!
//! `serve` hosts the HTTP API; `scan`, `list`, `logs` and `totals` talk to
//! the store directly and share the service layer with the server.

pub mod error;
pub mod output;

pub mod list;
pub mod logs;
pub mod scan;
pub mod serve;
pub mod totals;

use anyhow::Result;
use error::HelpfulError;
use scantrack_server::{ScanService, StoreArgs};
use std::future::Future;

/// Run a one-shot command against the configured store.
pub(crate) fn with_service<T, F, Fut>(store: &StoreArgs, f: F) -> Result<T>
where
    F: FnOnce(ScanService) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        let location = store.location();
        let backend = store
            .open()
            .await
            .map_err(|err| HelpfulError::store_open_failed(&location, store.store, &err))?;
        f(ScanService::new(backend)).await
    })
}
