//! Scantrack HTTP service
//!
//! Routes:
//! - `POST /scans` record a scan (`{barcode, responsible, increment?}`)
//! - `GET /scans` every counter, most recent activity first
//! - `GET /scans/logs?barcode=&limit=` movement history, newest first
//! - `GET /scans/totals` distinct barcodes and summed quantity
//! - `GET /healthz` store reachability

pub mod config;
mod error;
mod http;
mod server;
pub mod service;

pub use config::{ServeArgs, StoreArgs, StoreKind, DEFAULT_BIND_ADDR};
pub use error::ScanError;
pub use server::{serve, wait_for_shutdown_signal};
pub use service::{LogQuery, ScanRequest, ScanService};

use axum::middleware;
use axum::routing::get;
use axum::Router;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ScanService>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(service: ScanService) -> Self {
        Self {
            service: Arc::new(service),
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(http::handlers::healthz_handler))
        .route(
            "/scans",
            get(http::handlers::list_scans_handler).post(http::handlers::record_scan_handler),
        )
        .route("/scans/logs", get(http::handlers::scan_logs_handler))
        .route("/scans/totals", get(http::handlers::scan_totals_handler))
        .fallback(http::handlers::not_found_handler)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            http::request_tracing::request_tracing_middleware,
        ))
        .with_state(state)
}
