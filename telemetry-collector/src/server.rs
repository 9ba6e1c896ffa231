//! HTTP API of the collector.
//!
//! ```text
//! POST /telemetry          ingest one JSON object        201 | 400 | 413
//! GET  /telemetry          full history, accept order    200
//! GET  /telemetry/latest   latest record per source      200
//! GET  /health             liveness                      200
//! ```
//!
//! Every response body is JSON. Failures carry an `error` field; its text
//! is informational only.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use telemetry_types::{TelemetryRecord, CONTENT_TYPE_JSON};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::ingest::Ingestor;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5001";
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Configuration for the HTTP listener.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:5001")
    pub listen_addr: String,
    /// Largest accepted request body
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    /// Create a new builder for ServerConfig.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for ServerConfig.
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    listen_addr: Option<String>,
    max_body_bytes: Option<usize>,
}

impl ServerConfigBuilder {
    /// Set the listen address.
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = Some(addr.into());
        self
    }

    /// Set the request body limit in bytes.
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = Some(limit);
        self
    }

    /// Build the ServerConfig.
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            listen_addr: self
                .listen_addr
                .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
            max_body_bytes: self.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES),
        }
    }
}

/// The collector's HTTP front end.
#[derive(Debug, Clone)]
pub struct CollectorServer {
    config: ServerConfig,
    ingestor: Ingestor,
}

impl CollectorServer {
    pub fn new(config: ServerConfig, ingestor: Ingestor) -> Self {
        Self { config, ingestor }
    }

    /// Bind the configured listen address.
    pub async fn bind(&self) -> std::io::Result<TcpListener> {
        TcpListener::bind(&self.config.listen_addr).await
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Each connection is served on its own task. Once `shutdown` fires no
    /// new connection is accepted; connections already being served are
    /// left to finish on their own.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = listener.local_addr()?;
        info!(addr = %addr, "Collector HTTP API listening");

        let state = Arc::new(self);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(addr = %addr, "No longer accepting connections");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => state.clone().spawn_connection(stream, peer),
                        Err(e) => warn!(error = %e, "Failed to accept connection"),
                    }
                }
            }
        }
    }

    fn spawn_connection(self: Arc<Self>, stream: tokio::net::TcpStream, peer: SocketAddr) {
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                let state = self.clone();
                async move {
                    Ok::<_, Infallible>(
                        handle_request(req, &state.ingestor, state.config.max_body_bytes).await,
                    )
                }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!(peer = %peer, error = %e, "Connection closed with error");
            }
        });
    }
}

#[derive(Serialize)]
struct Accepted<'a> {
    message: &'static str,
    data: &'a TelemetryRecord,
    count: usize,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Route and answer a single request.
///
/// Generic over the body type so it can be driven without a socket.
pub async fn handle_request<B>(
    req: Request<B>,
    ingestor: &Ingestor,
    max_body_bytes: usize,
) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match (&method, path.as_str()) {
        (&Method::POST, "/telemetry") => ingest(req, ingestor, max_body_bytes).await,
        (&Method::GET, "/telemetry") => list_all(ingestor),
        (&Method::GET, "/telemetry/latest") => latest(ingestor),
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => {
            json_response(StatusCode::OK, &HealthResponse { status: "ok" })
        }
        (_, "/telemetry") => method_not_allowed("GET, POST"),
        (_, "/telemetry/latest") | (_, "/health") | (_, "/healthz") => method_not_allowed("GET"),
        _ => error_response(StatusCode::NOT_FOUND, format!("No route for {}", path)),
    };

    debug!(method = %method, path = %path, status = response.status().as_u16(), "Handled request");
    response
}

async fn ingest<B>(req: Request<B>, ingestor: &Ingestor, max_body_bytes: usize) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body = match Limited::new(req.into_body(), max_body_bytes).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            return error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("Body exceeds {} bytes", max_body_bytes),
            );
        }
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, format!("Failed to read body: {}", e));
        }
    };

    match ingestor.ingest_body(&body) {
        Ok(appended) => json_response(
            StatusCode::CREATED,
            &Accepted {
                message: "Telemetry received",
                data: &appended.record,
                count: appended.count,
            },
        ),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

fn list_all(ingestor: &Ingestor) -> Response<Full<Bytes>> {
    let snapshot = ingestor.store().snapshot();
    let records: Vec<&TelemetryRecord> = snapshot.iter().map(Arc::as_ref).collect();
    json_response(StatusCode::OK, &records)
}

fn latest(ingestor: &Ingestor) -> Response<Full<Bytes>> {
    let latest = ingestor.store().latest();
    let by_source: std::collections::BTreeMap<&str, &TelemetryRecord> = latest
        .iter()
        .map(|(source, record)| (source.as_str(), record.as_ref()))
        .collect();
    json_response(StatusCode::OK, &by_source)
}

fn method_not_allowed(allow: &'static str) -> Response<Full<Bytes>> {
    let mut response = error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".into());
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static(allow));
    response
}

fn error_response(status: StatusCode, error: String) -> Response<Full<Bytes>> {
    json_response(status, &ErrorBody { error })
}

fn json_response<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(bytes) => respond(status, bytes),
        Err(e) => {
            error!(error = %e, "Failed to serialize response");
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                br#"{"error":"Failed to serialize response"}"#.to_vec(),
            )
        }
    }
}

fn respond(status: StatusCode, body: Vec<u8>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use serde_json::{json, Value};

    fn request(method: Method, uri: &str, body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    async fn call(ingestor: &Ingestor, req: Request<Full<Bytes>>) -> (StatusCode, Value) {
        let response = handle_request(req, ingestor, 1024).await;
        let status = response.status();
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:5001");
        assert_eq!(config.max_body_bytes, 1024 * 1024);
        assert_eq!(ServerConfig::builder().build(), config);
    }

    #[test]
    fn test_server_config_builder() {
        let config = ServerConfig::builder()
            .listen_addr("127.0.0.1:8080")
            .max_body_bytes(64)
            .build();

        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.max_body_bytes, 64);
    }

    #[tokio::test]
    async fn test_health() {
        let ingestor = Ingestor::new(Store::new());
        let (status, body) = call(&ingestor, request(Method::GET, "/health", "")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_post_returns_created_record() {
        let ingestor = Ingestor::new(Store::new());
        let (status, body) = call(
            &ingestor,
            request(Method::POST, "/telemetry", r#"{"source_id":1,"value":21.3}"#),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Telemetry received");
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"]["attributes"], json!({"source_id": 1, "value": 21.3}));
        assert!(body["data"]["received_at"].is_string());
    }

    #[tokio::test]
    async fn test_post_invalid_json_is_bad_request() {
        let ingestor = Ingestor::new(Store::new());
        let (status, body) =
            call(&ingestor, request(Method::POST, "/telemetry", "source_id=1")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert!(ingestor.store().is_empty());
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let ingestor = Ingestor::new(Store::new());
        let big = format!(r#"{{"blob":"{}"}}"#, "x".repeat(2048));
        let (status, body) = call(&ingestor, request(Method::POST, "/telemetry", &big)).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body["error"].is_string());
        assert!(ingestor.store().is_empty());
    }

    #[tokio::test]
    async fn test_list_all_and_latest() {
        let ingestor = Ingestor::new(Store::new());
        for body in [
            r#"{"source_id":1,"value":21.3}"#,
            r#"{"source_id":2,"value":19.0}"#,
            r#"{"source_id":1,"value":21.5}"#,
        ] {
            call(&ingestor, request(Method::POST, "/telemetry", body)).await;
        }

        let (status, all) = call(&ingestor, request(Method::GET, "/telemetry", "")).await;
        assert_eq!(status, StatusCode::OK);
        let values: Vec<f64> = all
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["value"].as_f64().unwrap())
            .collect();
        assert_eq!(values, vec![21.3, 19.0, 21.5]);

        let (status, latest) = call(&ingestor, request(Method::GET, "/telemetry/latest", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(latest["1"]["value"], 21.5);
        assert_eq!(latest["2"]["value"], 19.0);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let ingestor = Ingestor::new(Store::new());
        let (status, body) = call(&ingestor, request(Method::GET, "/temperature", "")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn wrong_method_lists_allowed_methods() {
        let ingestor = Ingestor::new(Store::new());
        let response =
            handle_request(request(Method::DELETE, "/telemetry", ""), &ingestor, 1024).await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(ALLOW).unwrap(), "GET, POST");
    }
}
