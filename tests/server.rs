//! The gateway over a real socket.

mod common;

use std::time::Duration;

use common::*;
use reqwest::multipart::{Form, Part as FormPart};
use upload_gateway::HttpServer;

fn form(file_name: &str, data: Vec<u8>) -> Form {
    Form::new().part("uploaded_file", FormPart::bytes(data).file_name(file_name.to_string()))
}

#[tokio::test]
async fn test_upload_over_http() {
    let gateway = TestGateway::new().await;
    let (addr, _shutdown) = start_server(HttpServer::new(gateway.config.clone())).await;
    let client = http_client();

    let mut data = PNG_HEADER.to_vec();
    data.extend_from_slice(&[1u8; 512]);
    let response = client
        .post(format!("http://{}/upload", addr))
        .multipart(form("holiday.png", data))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::SEE_OTHER);
    assert!(response.headers().contains_key("x-request-id"));
    let location = response.headers()["location"].to_str().unwrap().to_string();
    assert!(location.starts_with("/?status=success&file="));

    let lines = gateway.audit_lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("IP: 127.0.0.1 - SUCCESS - File: holiday.png"));
}

#[tokio::test]
async fn test_public_dir_is_served() {
    let gateway = TestGateway::new().await;
    let public = gateway.root.path().join("public");
    std::fs::create_dir(&public).unwrap();
    std::fs::write(public.join("index.html"), "<form></form>").unwrap();

    let mut config = gateway.config.clone();
    config.storage.public_dir = Some(public);
    let (addr, _shutdown) = start_server(HttpServer::new(config)).await;

    let response = http_client()
        .get(format!("http://{}/", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.text().await.unwrap(), "<form></form>");
}

#[tokio::test]
async fn test_graceful_shutdown_stops_accepting() {
    let gateway = TestGateway::new().await;
    let (addr, shutdown) = start_server(HttpServer::new(gateway.config.clone())).await;

    shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let result = http_client()
        .post(format!("http://{}/upload", addr))
        .multipart(form("late.png", PNG_HEADER.to_vec()))
        .timeout(Duration::from_secs(2))
        .send()
        .await;
    assert!(result.is_err());
}
