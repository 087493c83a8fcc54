use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use scantrack_db::{JsonFileScanStore, ScanStore, SqliteScanStore};
use scantrack_server::{build_router, serve, AppState, ScanService};
use serde_json::Value;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

async fn start_server(store: Arc<dyn ScanStore>) -> SocketAddr {
    let app = build_router(AppState::new(ScanService::new(store)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve") });
    addr
}

async fn sqlite_server(tmp: &TempDir) -> (SocketAddr, SqliteScanStore) {
    let store = SqliteScanStore::open(tmp.path().join("scans.db"))
        .await
        .expect("open sqlite");
    let addr = start_server(Arc::new(store.clone())).await;
    (addr, store)
}

async fn send_raw(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<&str>,
) -> (u16, String, String) {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    if let Some(payload) = body {
        req.push_str("Content-Type: application/json\r\n");
        req.push_str(&format!("Content-Length: {}\r\n", payload.len()));
    }
    for (k, v) in headers {
        req.push_str(&format!("{k}: {v}\r\n"));
    }
    req.push_str("\r\n");
    if let Some(payload) = body {
        req.push_str(payload);
    }
    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response must have separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("http status");
    (status, head.to_string(), body.to_string())
}

async fn get_json(addr: SocketAddr, path: &str) -> (u16, Value) {
    let (status, _, body) = send_raw(addr, "GET", path, &[], None).await;
    (status, serde_json::from_str(&body).expect("json body"))
}

async fn post_scan(addr: SocketAddr, body: &str) -> (u16, Value) {
    let (status, _, body) = send_raw(addr, "POST", "/scans", &[], Some(body)).await;
    (status, serde_json::from_str(&body).expect("json body"))
}

async fn check_alice_bob_flow(addr: SocketAddr) {
    let (status, first) = post_scan(addr, r#"{"barcode":"ABC123","responsible":"Alice"}"#).await;
    assert_eq!(status, 200);
    assert_eq!(first["quantity"], 1);
    assert_eq!(first["responsible"], "Alice");
    assert_eq!(first["firstScanned"], first["lastScanned"]);

    let (status, second) = post_scan(addr, r#"{"barcode":"ABC123","responsible":"Bob"}"#).await;
    assert_eq!(status, 200);
    assert_eq!(second["quantity"], 2);
    assert_eq!(second["responsible"], "Bob");
    assert_eq!(second["firstScanned"], first["firstScanned"]);

    let (status, third) = post_scan(
        addr,
        r#"{"barcode":"ABC123","responsible":"Bob","increment":-1}"#,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(third["quantity"], 1);

    let (status, logs) = get_json(addr, "/scans/logs?barcode=ABC123").await;
    assert_eq!(status, 200);
    let logs = logs.as_array().expect("log array");
    assert_eq!(logs.len(), 3);
    assert_eq!(logs[0]["delta"], -1);
    assert_eq!(logs[0]["quantityAfter"], third["quantity"]);
    assert_eq!(logs[0]["actorName"], "Bob");
    assert_eq!(logs[2]["actorName"], "Alice");
}

#[tokio::test]
async fn scan_flow_over_sqlite() {
    let tmp = TempDir::new().unwrap();
    let (addr, _store) = sqlite_server(&tmp).await;
    check_alice_bob_flow(addr).await;
}

#[tokio::test]
async fn scan_flow_over_json_file() {
    let tmp = TempDir::new().unwrap();
    let store = JsonFileScanStore::open(tmp.path().join("barcodes.json"))
        .await
        .unwrap();
    let addr = start_server(Arc::new(store)).await;
    check_alice_bob_flow(addr).await;
}

#[tokio::test]
async fn missing_fields_are_client_errors() {
    let tmp = TempDir::new().unwrap();
    let (addr, _store) = sqlite_server(&tmp).await;

    for body in [
        r#"{}"#,
        r#"{"barcode":"ABC123"}"#,
        r#"{"responsible":"Alice"}"#,
        r#"{"barcode":"","responsible":"Alice"}"#,
    ] {
        let (status, json) = post_scan(addr, body).await;
        assert_eq!(status, 400, "body {body}");
        assert_eq!(json["error"], "Barcode and responsible are required");
    }

    let (status, json) = post_scan(addr, "{not json").await;
    assert_eq!(status, 400);
    assert!(json["error"].is_string());

    let (_, totals) = get_json(addr, "/scans/totals").await;
    assert_eq!(totals["totalCodes"], 0);
}

#[tokio::test]
async fn negative_first_scan_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let (addr, _store) = sqlite_server(&tmp).await;

    let (status, json) = post_scan(
        addr,
        r#"{"barcode":"NEW","responsible":"Alice","increment":-1}"#,
    )
    .await;
    assert_eq!(status, 400);
    assert!(json["error"].as_str().unwrap().contains("NEW"));

    let (_, scans) = get_json(addr, "/scans").await;
    assert_eq!(scans.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn listing_and_totals_agree() {
    let tmp = TempDir::new().unwrap();
    let (addr, _store) = sqlite_server(&tmp).await;

    post_scan(addr, r#"{"barcode":"A","responsible":"Alice","increment":3}"#).await;
    post_scan(addr, r#"{"barcode":"B","responsible":"Alice","increment":2}"#).await;
    post_scan(addr, r#"{"barcode":"C","responsible":"Alice"}"#).await;
    post_scan(addr, r#"{"barcode":"B","responsible":"Bob","increment":-5}"#).await;

    let (status, scans) = get_json(addr, "/scans").await;
    assert_eq!(status, 200);
    let scans = scans.as_array().unwrap();
    assert_eq!(scans.len(), 3);
    let sum: i64 = scans.iter().map(|s| s["quantity"].as_i64().unwrap()).sum();
    assert_eq!(sum, 4);

    let (status, totals) = get_json(addr, "/scans/totals").await;
    assert_eq!(status, 200);
    assert_eq!(totals["totalCodes"], 3);
    assert_eq!(totals["totalProductsScanned"], sum);
}

#[tokio::test]
async fn records_are_listed_newest_first() {
    let tmp = TempDir::new().unwrap();
    let (addr, _store) = sqlite_server(&tmp).await;

    for barcode in ["FIRST", "SECOND", "THIRD"] {
        let body = format!(r#"{{"barcode":"{barcode}","responsible":"Alice"}}"#);
        post_scan(addr, &body).await;
    }

    let (_, scans) = get_json(addr, "/scans").await;
    let order: Vec<&str> = scans
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["barcode"].as_str().unwrap())
        .collect();
    assert_eq!(order, vec!["THIRD", "SECOND", "FIRST"]);
}

#[tokio::test]
async fn logs_require_barcode_and_honour_limit() {
    let tmp = TempDir::new().unwrap();
    let (addr, _store) = sqlite_server(&tmp).await;

    let (status, json) = get_json(addr, "/scans/logs").await;
    assert_eq!(status, 400);
    assert_eq!(json["error"], "Barcode parameter is required");

    let (status, _) = get_json(addr, "/scans/logs?barcode=").await;
    assert_eq!(status, 400);

    for _ in 0..4 {
        post_scan(addr, r#"{"barcode":"LIM","responsible":"Alice"}"#).await;
    }
    let (status, logs) = get_json(addr, "/scans/logs?barcode=LIM&limit=2").await;
    assert_eq!(status, 200);
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["quantityAfter"], 4);

    let (status, _) = get_json(addr, "/scans/logs?barcode=LIM&limit=lots").await;
    assert_eq!(status, 400);

    let (status, logs) = get_json(addr, "/scans/logs?barcode=UNKNOWN").await;
    assert_eq!(status, 200);
    assert_eq!(logs.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn closed_store_reports_service_unavailable() {
    let tmp = TempDir::new().unwrap();
    let (addr, store) = sqlite_server(&tmp).await;

    let (status, json) = get_json(addr, "/healthz").await;
    assert_eq!(status, 200);
    assert_eq!(json["status"], "ok");

    store.close().await;

    for path in ["/scans", "/scans/totals", "/scans/logs?barcode=A", "/healthz"] {
        let (status, head, body) = send_raw(addr, "GET", path, &[], None).await;
        assert_eq!(status, 503, "path {path}");
        assert!(head.to_ascii_lowercase().contains("retry-after: 3"));
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"], "Database not available");
    }

    let (status, _) = post_scan(addr, r#"{"barcode":"A","responsible":"Alice"}"#).await;
    assert_eq!(status, 503);
}

#[tokio::test]
async fn request_id_is_echoed_or_generated() {
    let tmp = TempDir::new().unwrap();
    let (addr, _store) = sqlite_server(&tmp).await;

    let (_, head, _) = send_raw(addr, "GET", "/healthz", &[("x-request-id", "scan-42")], None).await;
    assert!(head.to_ascii_lowercase().contains("x-request-id: scan-42"));

    let (_, head, _) = send_raw(addr, "GET", "/healthz", &[], None).await;
    assert!(head.to_ascii_lowercase().contains("x-request-id: req-"));
}

#[tokio::test]
async fn unknown_route_is_json_not_found() {
    let tmp = TempDir::new().unwrap();
    let (addr, _store) = sqlite_server(&tmp).await;

    let (status, json) = get_json(addr, "/products/LP-PRO-01").await;
    assert_eq!(status, 404);
    assert_eq!(json["error"], "Not found");
}

#[tokio::test]
async fn serve_stops_on_shutdown_signal() {
    let tmp = TempDir::new().unwrap();
    let store = SqliteScanStore::open(tmp.path().join("scans.db"))
        .await
        .unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(serve(
        listener,
        AppState::new(ScanService::new(Arc::new(store))),
        async move {
            let _ = stop_rx.await;
        },
        Duration::from_secs(2),
    ));

    let (status, _) = get_json(addr, "/healthz").await;
    assert_eq!(status, 200);

    stop_tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server should stop")
        .expect("join");
    assert!(result.is_ok());
}
