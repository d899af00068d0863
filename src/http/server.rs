//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the upload handler
//! - Wire up middleware (request ID, tracing, timeout, body limit, headers)
//! - Serve the upload form directory as fallback
//! - Bind server to listener with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{multipart::MultipartRejection, ConnectInfo, DefaultBodyLimit, Multipart, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use futures_util::TryStreamExt;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::http::request::{propagate_request_id_layer, request_span, set_request_id_layer};
use crate::http::response::upload_redirect;
use crate::security::headers::{client_identity, nosniff_layer};
use crate::security::rate_limit::{RateLimiter, SlidingWindowLimiter, UnlimitedLimiter};
use crate::upload::{ClientIdentity, StoredFile, StreamError, UploadError, UploadPipeline};

/// Multipart field carrying the file.
pub const FILE_FIELD: &str = "uploaded_file";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<UploadPipeline>,
    pub trust_forwarded_for: bool,
    /// Deadline for receiving and processing one upload.
    pub upload_timeout: Duration,
}

/// HTTP server for the upload gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let limiter: Arc<dyn RateLimiter> = if config.rate_limit.enabled {
            Arc::new(SlidingWindowLimiter::from_config(&config.rate_limit))
        } else {
            Arc::new(UnlimitedLimiter)
        };
        Self::with_limiter(config, limiter)
    }

    /// Create a server around an externally owned limiter.
    pub fn with_limiter(config: GatewayConfig, limiter: Arc<dyn RateLimiter>) -> Self {
        let state = AppState {
            pipeline: Arc::new(UploadPipeline::from_config(&config, limiter)),
            trust_forwarded_for: config.rate_limit.trust_forwarded_for,
            upload_timeout: Duration::from_secs(config.limits.request_timeout_secs),
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// `/upload` enforces its own deadline so a timed out upload is still
    /// audited and redirected; the layer timeout covers everything else.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let body_limit = config
            .limits
            .max_upload_bytes
            .saturating_add(config.limits.multipart_overhead_bytes);

        let mut router = Router::new();
        if let Some(public_dir) = &config.storage.public_dir {
            router = router.fallback_service(ServeDir::new(public_dir));
        }

        router
            .layer(TimeoutLayer::new(Duration::from_secs(config.limits.request_timeout_secs)))
            .route(
                "/upload",
                post(upload_handler).layer(DefaultBodyLimit::max(usize::try_from(body_limit).unwrap_or(usize::MAX))),
            )
            .with_state(state)
            .layer(nosniff_layer())
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_upload_bytes = self.config.limits.max_upload_bytes,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// `POST /upload`: gate on the quota, then stream the `uploaded_file` part
/// through the pipeline and redirect back to the form.
async fn upload_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let client = client_identity(peer, &headers, state.trust_forwarded_for);
    let pipeline = &state.pipeline;

    if let Err(err) = pipeline.admit(&client) {
        return upload_redirect(&Err(err)).into_response();
    }

    let result = match tokio::time::timeout(state.upload_timeout, receive_upload(pipeline, &client, multipart)).await {
        Ok(result) => result,
        // The dropped attempt's staged file is removed by its guard.
        Err(_) => {
            tracing::warn!(client = %client, timeout_secs = state.upload_timeout.as_secs(), "Upload timed out");
            Err(pipeline
                .reject(&client, "", UploadError::Interrupted("request timed out".into()))
                .await)
        }
    };

    upload_redirect(&result).into_response()
}

async fn receive_upload(
    pipeline: &UploadPipeline,
    client: &ClientIdentity,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<StoredFile, UploadError> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            return Err(pipeline
                .reject(client, "", UploadError::Interrupted(rejection.body_text()))
                .await);
        }
    };

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some(FILE_FIELD) => {
                let original_name = field.file_name().unwrap_or_default().to_string();
                let body = field.map_err(StreamError::from);
                return pipeline.process(client, &original_name, body).await;
            }
            // Other parts are drained by the next call.
            Ok(Some(_)) => continue,
            Ok(None) => return Err(pipeline.reject(client, "", UploadError::MissingFile).await),
            Err(e) => {
                let err = match StreamError::from(e) {
                    StreamError::LimitExceeded => UploadError::TooLarge {
                        max_bytes: pipeline.max_upload_bytes(),
                    },
                    StreamError::Interrupted(reason) => UploadError::Interrupted(reason),
                };
                return Err(pipeline.reject(client, "", err).await);
            }
        }
    }
}
