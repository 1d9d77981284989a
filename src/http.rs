//! HTTP API for swap cards
//!
//! - `GET /health` - Health check with table counts
//! - `GET /api/swaps/cards?limit=&offset=` - Swap cards for the viewer
//!
//! The viewer id is read from a trusted header (default `x-viewer-id`) set by
//! the upstream auth gateway. It is not re-validated here.
//!
//! ## Example Usage
//!
//! ```bash
//! curl -H "x-viewer-id: alice" \
//!      "http://localhost:8095/api/swaps/cards?limit=10&offset=0"
//! ```

use crate::config::Config;
use crate::error::StorageError;
use crate::services::{self, Services};
use crate::swap_cards::{CancelFlag, PageRequest};
use crate::views::SwapCardsView;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Pagination query string
#[derive(Debug, Default, Deserialize)]
struct CardsQuery {
    limit: Option<i64>,
    offset: Option<i64>,
}

/// HTTP server state
pub struct HttpServer {
    services: Arc<Services>,
    config: Arc<Config>,
    bind_addr: SocketAddr,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(services: Arc<Services>, config: Arc<Config>, bind_addr: SocketAddr) -> Self {
        Self {
            services,
            config,
            bind_addr,
        }
    }

    /// Run the HTTP server
    pub async fn run(self: Arc<Self>) -> Result<(), StorageError> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        info!(addr = %self.bind_addr, "HTTP server listening");

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let server = self.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let server = server.clone();
                    async move { server.handle_request(req).await }
                });

                if let Err(err) = http1::Builder::new()
                    .serve_connection(io, service)
                    .await
                {
                    warn!(addr = %remote_addr, error = %err, "Connection error");
                }
            });
        }
    }

    /// Route requests to handlers
    async fn handle_request(
        &self,
        req: Request<Incoming>,
    ) -> Result<Response<Full<Bytes>>, hyper::Error> {
        let path = req.uri().path().to_string();
        let method = req.method().clone();

        debug!(method = %method, path = %path, "Incoming request");

        let response = match (method, path.as_str()) {
            (Method::GET, "/health") => self.handle_health(),
            (Method::GET, "/api/swaps/cards") => {
                let viewer_id = req
                    .headers()
                    .get(self.config.viewer_header.as_str())
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                self.handle_swap_cards(viewer_id, req.uri().query()).await
            }
            (_, "/health") | (_, "/api/swaps/cards") => services::method_not_allowed(),
            _ => services::not_found("Not Found"),
        };

        Ok(response)
    }

    /// Health check endpoint
    fn handle_health(&self) -> Response<Full<Bytes>> {
        services::from_result(self.services.db.stats().map(|stats| {
            serde_json::json!({
                "status": "ok",
                "bookings": stats.booking_count,
                "swaps": stats.swap_count,
                "proposals": stats.proposal_count,
            })
        }))
    }

    /// GET /api/swaps/cards
    pub async fn handle_swap_cards(
        &self,
        viewer_id: Option<String>,
        query: Option<&str>,
    ) -> Response<Full<Bytes>> {
        let viewer_id = match viewer_id.filter(|v| !v.trim().is_empty()) {
            Some(v) => v,
            None => return services::unauthorized("Missing viewer identity"),
        };

        let params: CardsQuery = match query {
            Some(q) => match serde_urlencoded::from_str(q) {
                Ok(p) => p,
                Err(e) => return services::bad_request(&format!("Invalid query: {}", e)),
            },
            None => CardsQuery::default(),
        };

        let page = match PageRequest::from_query(
            params.limit,
            params.offset,
            self.config.default_page_limit,
            self.config.max_page_limit,
        ) {
            Ok(page) => page,
            Err(e) => return services::error_response(e),
        };

        // Flips the flag if hyper drops this future on client disconnect
        let cancel = CancelFlag::new();
        let _guard = cancel.drop_guard();

        let service = self.services.swap_cards.clone();
        let result = tokio::task::spawn_blocking(move || {
            service
                .list_cards(&viewer_id, page, &cancel)
                .map(SwapCardsView::from)
        })
        .await
        .unwrap_or_else(|e| Err(StorageError::Internal(format!("Aggregation task failed: {}", e))));

        services::from_result(result)
    }
}
