//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tower::ServiceExt;

use upload_gateway::lifecycle::startup;
use upload_gateway::{GatewayConfig, HttpServer, Shutdown};

pub const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
pub const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];
pub const PDF_HEADER: &[u8] = b"%PDF-1.4\n";
pub const GIF_HEADER: &[u8] = b"GIF89a";

const BOUNDARY: &str = "----gateway-test-boundary";

/// A gateway configuration rooted in a private temp directory.
pub struct TestGateway {
    pub root: TempDir,
    pub config: GatewayConfig,
}

impl TestGateway {
    pub async fn new() -> Self {
        Self::with(|_| {}).await
    }

    pub async fn with(customize: impl FnOnce(&mut GatewayConfig)) -> Self {
        let root = tempfile::tempdir().unwrap();
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        config.storage.upload_dir = root.path().join("uploads");
        config.storage.temp_dir = root.path().join("temp_uploads");
        config.storage.audit_log = root.path().join("upload.log");
        config.storage.public_dir = None;
        customize(&mut config);

        startup::prepare_storage(&config.storage).await.unwrap();
        Self { root, config }
    }

    pub fn router(&self) -> Router {
        HttpServer::new(self.config.clone()).router()
    }

    pub fn stored_files(&self) -> Vec<String> {
        names(&self.config.storage.upload_dir)
    }

    pub fn staged_files(&self) -> Vec<String> {
        names(&self.config.storage.temp_dir)
    }

    pub fn audit_lines(&self) -> Vec<String> {
        std::fs::read_to_string(&self.config.storage.audit_log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// One part of a hand-built multipart body.
pub struct Part<'a> {
    pub name: &'a str,
    pub file_name: Option<&'a str>,
    pub content_type: &'a str,
    pub data: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn file(file_name: &'a str, data: &'a [u8]) -> Self {
        Self {
            name: "uploaded_file",
            file_name: Some(file_name),
            content_type: "application/octet-stream",
            data,
        }
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    part.name, file_name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name).as_bytes(),
            ),
        }
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", part.content_type).as_bytes());
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// POST `body` to `/upload` in-process, as if sent from `peer`.
pub async fn post_upload(router: Router, peer: &str, content_type: &str, body: Vec<u8>) -> Response<Body> {
    let peer: SocketAddr = peer.parse().unwrap();
    let mut request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();
    request.extensions_mut().insert(ConnectInfo(peer));
    router.oneshot(request).await.unwrap()
}

pub async fn upload_parts(router: Router, peer: &str, parts: &[Part<'_>]) -> Response<Body> {
    let content_type = format!("multipart/form-data; boundary={}", BOUNDARY);
    post_upload(router, peer, &content_type, multipart_body(parts)).await
}

pub async fn upload_file(router: Router, peer: &str, file_name: &str, data: &[u8]) -> Response<Body> {
    upload_parts(router, peer, &[Part::file(file_name, data)]).await
}

/// Decoded query of a `303` redirect to `/`.
pub fn redirect_query<B>(response: &Response<B>) -> HashMap<String, String> {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    let query = location.strip_prefix("/?").expect("redirect to /");
    url::form_urlencoded::parse(query.as_bytes()).into_owned().collect()
}

/// Start the real server on an ephemeral port. Keep the returned
/// `Shutdown` alive for as long as the server should run.
pub async fn start_server(server: HttpServer) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}
