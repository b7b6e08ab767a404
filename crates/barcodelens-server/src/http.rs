// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Embedded HTTP/1.1 front end for the scanner.
//
// Works directly on raw TCP: the request head is parsed just enough to route
// it and find the body, the body is read up to its `Content-Length`, and
// every response closes the connection.
//
// # Routes
//
//   - `GET /`                 welcome message
//   - `POST /scan-barcode/`   run a scan (trailing slash optional)
//   - `OPTIONS *`             CORS preflight, answered with 204
//
// Uploads arrive either as `multipart/form-data` with a `file` field or as a
// raw image body.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::Serialize;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};

use barcodelens_core::config::ServiceConfig;
use barcodelens_core::error::{BarcodelensError, ErrorCategory, Result, ScanError};
use barcodelens_core::human_errors::humanize_scan_error;
use barcodelens_core::types::{RawImage, ScanId, ServerStatus};
use barcodelens_scan::ScanOrchestrator;

use crate::multipart::{self, FILE_FIELD};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Largest request head (request line plus headers) we will buffer.
const MAX_HEAD_BYTES: usize = 16 * 1024;

/// Greeting returned by `GET /`.
const WELCOME_MESSAGE: &str = "Selamat datang di server kami";

const SCAN_PATH: &str = "/scan-barcode";

// ---------------------------------------------------------------------------
// Minimal HTTP request parser
// ---------------------------------------------------------------------------

/// Request line and headers of an incoming request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    /// Request target with any query string removed.
    pub path: String,
    /// Header names are stored lower-cased.
    pub headers: Vec<(String, String)>,
}

impl RequestHead {
    /// First value of header `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Declared body length; absent means no body.
    pub fn content_length(&self) -> std::result::Result<usize, String> {
        match self.header("content-length") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| format!("invalid Content-Length '{value}'")),
            None => Ok(0),
        }
    }
}

/// Parse the bytes before the blank line that ends the request head.
pub fn parse_request_head(head: &[u8]) -> Option<RequestHead> {
    let text = std::str::from_utf8(head).ok()?;
    let mut lines = text.split("\r\n");

    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_ascii_uppercase();
    let target = request_line.next()?;
    let version = request_line.next()?;
    if !version.starts_with("HTTP/1.") {
        return None;
    }
    let path = target.split(['?', '#']).next().unwrap_or(target).to_string();

    let headers = lines
        .filter(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    Some(RequestHead {
        method,
        path,
        headers,
    })
}

/// Find the first occurrence of `needle` in `haystack`.
pub fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Error body. `detail` carries the raw failure text; the rest is the
/// humanised version for display.
#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
    category: ErrorCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<String>,
}

/// An HTTP response waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    fn json(status: u16, body: &impl Serialize) -> Self {
        // Serializing our own structs cannot fail; fall back to an empty object.
        let body = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
        Self {
            status,
            headers: vec![("Content-Type".into(), "application/json".into())],
            body,
        }
    }

    fn empty(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    fn error(status: u16, category: ErrorCategory, detail: impl Into<String>) -> Self {
        Self::json(
            status,
            &ErrorBody {
                detail: detail.into(),
                category,
                message: None,
                suggestion: None,
            },
        )
    }

    fn scan_failure(err: &ScanError) -> Self {
        let human = humanize_scan_error(err);
        Self::json(
            err.http_status(),
            &ErrorBody {
                detail: err.to_string(),
                category: err.category(),
                message: Some(human.message),
                suggestion: Some(human.suggestion),
            },
        )
    }

    fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Serialize status line, headers and body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, reason_phrase(self.status));
        for (name, value) in &self.headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n",
            self.body.len()
        ));
        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        411 => "Length Required",
        413 => "Payload Too Large",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Add CORS headers when the request's `Origin` is on the allow-list.
fn apply_cors(response: Response, origin: Option<&str>, config: &ServiceConfig) -> Response {
    match origin {
        Some(origin) if config.origin_allowed(origin) => response
            .with_header("Access-Control-Allow-Origin", origin)
            .with_header("Access-Control-Allow-Credentials", "true")
            .with_header("Vary", "Origin"),
        _ => response,
    }
}

/// Answer a CORS preflight. Credentials rule out `*`, so the requested
/// method and headers are echoed back.
fn preflight(head: &RequestHead) -> Response {
    let methods = head
        .header("access-control-request-method")
        .unwrap_or("GET, POST, OPTIONS")
        .to_string();
    let mut response = Response::empty(204).with_header("Access-Control-Allow-Methods", methods);
    if let Some(headers) = head.header("access-control-request-headers") {
        response = response.with_header("Access-Control-Allow-Headers", headers);
    }
    response
}

// ---------------------------------------------------------------------------
// Shared state passed to connection handlers
// ---------------------------------------------------------------------------

struct SharedState {
    orchestrator: ScanOrchestrator,
    config: ServiceConfig,
    active_connections: Arc<AtomicU32>,
}

// ---------------------------------------------------------------------------
// ScanServer
// ---------------------------------------------------------------------------

/// HTTP front end bound to the address in [`ServiceConfig`].
pub struct ScanServer {
    config: ServiceConfig,
    orchestrator: ScanOrchestrator,
    status: ServerStatus,
    /// Notification handle used to signal a graceful shutdown.
    shutdown_signal: Arc<Notify>,
    /// Handle to the Tokio task running the accept loop.
    task_handle: Option<JoinHandle<()>>,
    active_connections: Arc<AtomicU32>,
    local_addr: Option<SocketAddr>,
}

impl ScanServer {
    /// Create a stopped server. Call [`ScanServer::start`] to begin accepting.
    pub fn new(config: ServiceConfig, orchestrator: ScanOrchestrator) -> Self {
        Self {
            config,
            orchestrator,
            status: ServerStatus::Stopped,
            shutdown_signal: Arc::new(Notify::new()),
            task_handle: None,
            active_connections: Arc::new(AtomicU32::new(0)),
            local_addr: None,
        }
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    pub fn active_connections(&self) -> u32 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Address actually bound, once started. Useful with port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Bind the listener and spawn the accept loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or already in use.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if let (ServerStatus::Running, Some(addr)) = (self.status, self.local_addr) {
            debug!(%addr, "HTTP server already running");
            return Ok(addr);
        }

        self.status = ServerStatus::Starting;

        let bind_addr = self.config.socket_address();
        let listener = match TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                self.status = ServerStatus::Stopped;
                return Err(BarcodelensError::Server(format!("bind {bind_addr}: {e}")));
            }
        };
        let local_addr = listener
            .local_addr()
            .map_err(|e| BarcodelensError::Server(format!("local address: {e}")))?;

        info!(
            addr = %local_addr,
            detector = self.orchestrator.detector_name(),
            "HTTP server listening"
        );

        let shared = Arc::new(SharedState {
            orchestrator: self.orchestrator.clone(),
            config: self.config.clone(),
            active_connections: Arc::clone(&self.active_connections),
        });
        let shutdown = Arc::clone(&self.shutdown_signal);

        let handle = tokio::spawn(async move {
            Self::accept_loop(listener, shutdown, shared).await;
        });

        self.task_handle = Some(handle);
        self.local_addr = Some(local_addr);
        self.status = ServerStatus::Running;
        Ok(local_addr)
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    /// Requests already in flight run to completion.
    pub async fn stop(&mut self) -> Result<()> {
        if self.status != ServerStatus::Running {
            return Ok(());
        }

        info!(
            addr = ?self.local_addr,
            in_flight = self.active_connections(),
            "stopping HTTP server"
        );
        self.shutdown_signal.notify_one();

        if let Some(handle) = self.task_handle.take() {
            handle
                .await
                .map_err(|e| BarcodelensError::Server(format!("task join: {e}")))?;
        }

        self.status = ServerStatus::Stopped;
        self.local_addr = None;
        info!("HTTP server stopped");
        Ok(())
    }

    async fn accept_loop(listener: TcpListener, shutdown: Arc<Notify>, shared: Arc<SharedState>) {
        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    debug!("accept loop received shutdown signal");
                    break;
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            let state = Arc::clone(&shared);
                            let span = info_span!("request", scan_id = %ScanId::new(), peer = %peer_addr);
                            tokio::spawn(
                                async move {
                                    state.active_connections.fetch_add(1, Ordering::Relaxed);
                                    if let Err(e) = handle_connection(stream, &state).await {
                                        warn!(error = %e, "connection handler error");
                                    }
                                    state.active_connections.fetch_sub(1, Ordering::Relaxed);
                                }
                                .instrument(span),
                            );
                        }
                        Err(e) => {
                            error!(error = %e, "failed to accept connection");
                        }
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Connection handling
// ---------------------------------------------------------------------------

/// Read one request, dispatch it and write the response.
async fn handle_connection(mut stream: TcpStream, state: &SharedState) -> Result<()> {
    let mut buf = Vec::with_capacity(8192);
    let mut chunk = [0u8; 8192];

    let head_end = loop {
        if let Some(pos) = find_subsequence(&buf, b"\r\n\r\n") {
            break pos;
        }
        if buf.len() > MAX_HEAD_BYTES {
            let response = Response::error(400, ErrorCategory::BadInput, "request head too large");
            return send_response(&mut stream, &response).await;
        }
        let n = stream
            .read(&mut chunk)
            .await
            .map_err(|e| BarcodelensError::Server(format!("read request head: {e}")))?;
        if n == 0 {
            debug!(bytes = buf.len(), "connection closed before request head completed");
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let Some(head) = parse_request_head(&buf[..head_end]) else {
        let response = Response::error(400, ErrorCategory::BadInput, "malformed HTTP request");
        return send_response(&mut stream, &response).await;
    };
    debug!(method = %head.method, path = %head.path, "request received");

    let origin = head.header("origin").map(str::to_string);
    let response = match read_body(&mut stream, &head, &buf[head_end + 4..], &state.config).await? {
        Ok(body) => route(&head, body, state).await,
        Err(response) => response,
    };
    let response = apply_cors(response, origin.as_deref(), &state.config);

    send_response(&mut stream, &response).await?;
    info!(
        method = %head.method,
        path = %head.path,
        status = response.status,
        "response sent"
    );
    Ok(())
}

/// Read the request body, or produce the error response that replaces it.
async fn read_body(
    stream: &mut TcpStream,
    head: &RequestHead,
    already_read: &[u8],
    config: &ServiceConfig,
) -> Result<std::result::Result<Vec<u8>, Response>> {
    if head
        .header("transfer-encoding")
        .is_some_and(|te| te.to_ascii_lowercase().contains("chunked"))
    {
        return Ok(Err(Response::error(
            411,
            ErrorCategory::BadInput,
            "chunked uploads are not supported; send Content-Length",
        )));
    }

    let length = match head.content_length() {
        Ok(length) => length,
        Err(detail) => return Ok(Err(Response::error(400, ErrorCategory::BadInput, detail))),
    };
    if length > config.max_upload_bytes {
        warn!(length, limit = config.max_upload_bytes, "upload rejected as too large");
        return Ok(Err(Response::error(
            413,
            ErrorCategory::BadInput,
            format!("upload exceeds {} bytes", config.max_upload_bytes),
        )));
    }

    let mut body = Vec::with_capacity(length);
    body.extend_from_slice(&already_read[..already_read.len().min(length)]);
    if body.len() < length {
        let mut rest = vec![0u8; length - body.len()];
        stream
            .read_exact(&mut rest)
            .await
            .map_err(|e| BarcodelensError::Server(format!("read request body: {e}")))?;
        body.extend_from_slice(&rest);
    }
    Ok(Ok(body))
}

/// Dispatch on method and path.
async fn route(head: &RequestHead, body: Vec<u8>, state: &SharedState) -> Response {
    if head.method == "OPTIONS" {
        return preflight(head);
    }

    let path = head.path.trim_end_matches('/');
    match (head.method.as_str(), path) {
        ("GET", "") => Response::json(200, &json!({ "message": WELCOME_MESSAGE })),
        ("POST", SCAN_PATH) => handle_scan(head, body, &state.orchestrator).await,
        (_, "") | (_, SCAN_PATH) => {
            Response::error(405, ErrorCategory::BadInput, "Method Not Allowed")
        }
        _ => Response::error(404, ErrorCategory::NotFound, "Not Found"),
    }
}

/// Extract the upload and run it through the orchestrator.
async fn handle_scan(head: &RequestHead, body: Vec<u8>, orchestrator: &ScanOrchestrator) -> Response {
    let content_type = head.header("content-type");

    let upload = match content_type.and_then(multipart::boundary_from_content_type) {
        None => RawImage::from_upload(body, content_type),
        Some(Err(e)) => return Response::error(400, ErrorCategory::BadInput, e.to_string()),
        Some(Ok(boundary)) => {
            let parts = match multipart::parse_multipart(&body, &boundary) {
                Ok(parts) => parts,
                Err(e) => return Response::error(400, ErrorCategory::BadInput, e.to_string()),
            };
            match multipart::find_field(parts, FILE_FIELD) {
                Some(part) => {
                    debug!(filename = ?part.filename, content_type = ?part.content_type, "file part received");
                    RawImage::from_upload(part.data, part.content_type.as_deref())
                        .with_filename_hint(part.filename.as_deref())
                }
                None => {
                    return Response::error(
                        422,
                        ErrorCategory::BadInput,
                        format!("form field '{FILE_FIELD}' is required"),
                    );
                }
            }
        }
    };

    match orchestrator.scan(upload).await {
        Ok(result) => Response::json(200, &result),
        Err(err) => {
            match err.category() {
                ErrorCategory::Internal => error!(error = %err, "scan failed"),
                _ => info!(kind = ?err.kind(), "scan rejected"),
            }
            Response::scan_failure(&err)
        }
    }
}

/// Write the response and flush.
async fn send_response(stream: &mut TcpStream, response: &Response) -> Result<()> {
    stream
        .write_all(&response.to_bytes())
        .await
        .map_err(|e| BarcodelensError::Server(format!("write response: {e}")))?;
    stream
        .flush()
        .await
        .map_err(|e| BarcodelensError::Server(format!("flush response: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use async_trait::async_trait;
    use barcodelens_core::types::ProductInfo;
    use barcodelens_lookup::{ProductLookup, interpret_body};
    use barcodelens_vision::{BarcodeDecoder, ProcessedImage, RawSymbol, SymbolDetector};
    use image::{DynamicImage, GrayImage, ImageFormat, Luma};
    use serde_json::Value;

    // -- Request parsing ----------------------------------------------------

    #[test]
    fn request_head_is_parsed() {
        let raw = b"POST /scan-barcode/?debug=1 HTTP/1.1\r\nHost: localhost\r\nContent-Length: 42\r\nContent-Type: image/png";
        let head = parse_request_head(raw).unwrap();
        assert_eq!(head.method, "POST");
        assert_eq!(head.path, "/scan-barcode/");
        assert_eq!(head.header("content-type"), Some("image/png"));
        assert_eq!(head.header("HOST"), Some("localhost"));
        assert_eq!(head.content_length(), Ok(42));
    }

    #[test]
    fn garbage_head_is_rejected() {
        assert!(parse_request_head(b"\x16\x03\x01 tls hello").is_none());
        assert!(parse_request_head(b"GET /").is_none());
    }

    #[test]
    fn bad_content_length_is_an_error() {
        let head = parse_request_head(b"POST / HTTP/1.1\r\nContent-Length: lots").unwrap();
        assert!(head.content_length().is_err());
    }

    #[test]
    fn find_subsequence_locates_needle() {
        assert_eq!(find_subsequence(b"ab\r\n\r\ncd", b"\r\n\r\n"), Some(2));
        assert_eq!(find_subsequence(b"abc", b"zz"), None);
    }

    #[test]
    fn response_serializes_with_length_and_close() {
        let bytes = Response::json(200, &json!({"ok": true})).to_bytes();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: application/json\r\n"));
        assert!(text.contains("Content-Length: 11\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(text.ends_with("\r\n\r\n{\"ok\":true}"));
    }

    #[test]
    fn cors_only_for_allowed_origins() {
        let config = ServiceConfig::default();
        let allowed = apply_cors(Response::empty(200), Some("http://127.0.0.1:5500"), &config);
        assert!(allowed.headers.contains(&(
            "Access-Control-Allow-Origin".to_string(),
            "http://127.0.0.1:5500".to_string()
        )));
        assert!(allowed.headers.contains(&(
            "Access-Control-Allow-Credentials".to_string(),
            "true".to_string()
        )));

        let denied = apply_cors(Response::empty(200), Some("https://evil.example"), &config);
        assert!(denied.headers.is_empty());
    }

    // -- End to end -----------------------------------------------------------

    struct Canned(Vec<RawSymbol>);

    impl SymbolDetector for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        fn detect(&self, _image: &ProcessedImage) -> Result<Vec<RawSymbol>> {
            Ok(self.0.clone())
        }
    }

    /// Knows exactly one product.
    struct OneProduct;

    #[async_trait]
    impl ProductLookup for OneProduct {
        async fn lookup(&self, barcode: &str) -> Result<ProductInfo> {
            Ok(match barcode {
                "3017620422003" => interpret_body(
                    br#"{"status":1,"product":{"product_name":"Nutella","ecoscore_grade":"d"}}"#,
                ),
                _ => ProductInfo::NotFound,
            })
        }
    }

    fn white_png() -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(GrayImage::from_pixel(32, 32, Luma([255])))
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    async fn start_server(symbols: Vec<RawSymbol>, max_upload_bytes: usize) -> ScanServer {
        let config = ServiceConfig {
            bind_address: "127.0.0.1".into(),
            port: 0,
            max_upload_bytes,
            ..ServiceConfig::default()
        };
        let orchestrator =
            ScanOrchestrator::new(BarcodeDecoder::new(Canned(symbols)), Arc::new(OneProduct));
        let mut server = ScanServer::new(config, orchestrator);
        server.start().await.unwrap();
        server
    }

    /// Send raw request bytes; return (status, headers, body).
    async fn exchange(addr: SocketAddr, request: &[u8]) -> (u16, String, Vec<u8>) {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request).await.unwrap();
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();

        let split = find_subsequence(&raw, b"\r\n\r\n").unwrap();
        let head = String::from_utf8(raw[..split].to_vec()).unwrap();
        let status = head.split_whitespace().nth(1).unwrap().parse().unwrap();
        (status, head, raw[split + 4..].to_vec())
    }

    fn post(path: &str, content_type: &str, body: &[u8]) -> Vec<u8> {
        let mut request = format!(
            "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n\r\n",
            body.len()
        )
        .into_bytes();
        request.extend_from_slice(body);
        request
    }

    #[tokio::test]
    async fn root_returns_welcome_message() {
        let mut server = start_server(Vec::new(), 1024).await;
        let addr = server.local_addr().unwrap();

        let (status, _, body) = exchange(addr, b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert_eq!(status, 200);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Selamat datang di server kami");

        server.stop().await.unwrap();
        assert_eq!(server.status(), ServerStatus::Stopped);
    }

    #[tokio::test]
    async fn raw_image_upload_is_scanned() {
        let mut server = start_server(
            vec![
                RawSymbol::new("EAN13", "3017620422003"),
                RawSymbol::new("EAN13", "0000000000000"),
            ],
            1 << 20,
        )
        .await;
        let addr = server.local_addr().unwrap();

        let (status, _, body) = exchange(addr, &post("/scan-barcode/", "image/png", &white_png())).await;
        assert_eq!(status, 200);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["barcodes"][0]["type"], "EAN13");
        assert_eq!(json["barcodes"][0]["product_info"]["Nama_produk"], "Nutella");
        assert_eq!(json["barcodes"][0]["product_info"]["Merk"], "tidak didaftarka");
        assert_eq!(json["barcodes"][1]["product_info"]["error"], "Produk tidak ditemukan");

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn multipart_upload_without_trailing_slash() {
        let mut server = start_server(vec![RawSymbol::new("QRCODE", "hello")], 1 << 20).await;
        let addr = server.local_addr().unwrap();

        let mut form = Vec::new();
        form.extend_from_slice(
            b"--zzz\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.png\"\r\nContent-Type: image/png\r\n\r\n",
        );
        form.extend_from_slice(&white_png());
        form.extend_from_slice(b"\r\n--zzz--\r\n");

        let (status, _, body) = exchange(
            addr,
            &post("/scan-barcode", "multipart/form-data; boundary=zzz", &form),
        )
        .await;
        assert_eq!(status, 200);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["barcodes"][0]["data"], "hello");

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn scan_failures_map_to_status_codes() {
        let mut server = start_server(Vec::new(), 1 << 20).await;
        let addr = server.local_addr().unwrap();

        let (status, _, body) = exchange(addr, &post("/scan-barcode/", "image/png", &white_png())).await;
        assert_eq!(status, 400);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["detail"], "Tidak ada barcode yang terdeteksi");
        assert_eq!(json["category"], "not_found");

        let (status, _, body) = exchange(addr, &post("/scan-barcode/", "image/png", b"nope")).await;
        assert_eq!(status, 400);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["category"], "bad_input");

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn oversized_upload_is_refused() {
        let mut server = start_server(Vec::new(), 16).await;
        let addr = server.local_addr().unwrap();

        let request = b"POST /scan-barcode/ HTTP/1.1\r\nContent-Type: image/png\r\nContent-Length: 1000000\r\n\r\n";
        let (status, _, _) = exchange(addr, request).await;
        assert_eq!(status, 413);

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_routes_and_methods() {
        let mut server = start_server(Vec::new(), 1024).await;
        let addr = server.local_addr().unwrap();

        let (status, _, _) = exchange(addr, b"GET /nope HTTP/1.1\r\n\r\n").await;
        assert_eq!(status, 404);
        let (status, _, _) = exchange(addr, b"GET /scan-barcode/ HTTP/1.1\r\n\r\n").await;
        assert_eq!(status, 405);

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn preflight_echoes_allowed_origin() {
        let mut server = start_server(Vec::new(), 1024).await;
        let addr = server.local_addr().unwrap();

        let request = b"OPTIONS /scan-barcode/ HTTP/1.1\r\n\
            Origin: http://127.0.0.1:5500\r\n\
            Access-Control-Request-Method: POST\r\n\
            Access-Control-Request-Headers: content-type\r\n\r\n";
        let (status, head, _) = exchange(addr, request).await;
        assert_eq!(status, 204);
        assert!(head.contains("Access-Control-Allow-Origin: http://127.0.0.1:5500"));
        assert!(head.contains("Access-Control-Allow-Methods: POST"));
        assert!(head.contains("Access-Control-Allow-Headers: content-type"));

        server.stop().await.unwrap();
    }
}
