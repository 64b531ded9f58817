//! Management exporter: republishes live metric values over HTTP
//!
//! Exposes the aggregator's textual report at /report, the JSON snapshot
//! at /status, and a liveness probe at /health. Uses hyper for the HTTP
//! server. Lifecycle is bound to the aggregator: attach starts the
//! listener, shutdown stops it through a watch channel.

use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

use crate::services::aggregator::MetricsAggregator;

/// Handle HTTP requests
async fn handle_request(
    req: Request<hyper::body::Incoming>,
    aggregator: Arc<MetricsAggregator>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/report") => {
            let body = aggregator.report();
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "text/plain; charset=utf-8")
                .body(Full::new(Bytes::from(body)))
                .expect("static response should not fail"))
        }
        (&Method::GET, "/status") => {
            let snapshot = aggregator.snapshot();
            let body =
                serde_json::to_string(&snapshot).unwrap_or_else(|_| "{}".to_string());
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "application/json")
                .body(Full::new(Bytes::from(body)))
                .expect("static response should not fail"))
        }
        (&Method::GET, "/health") => Ok(Response::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::from("ok")))
            .expect("static response should not fail")),
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("Not Found")))
            .expect("static response should not fail")),
    }
}

/// Serve the management exporter until the shutdown channel fires.
pub async fn serve(
    port: u16,
    aggregator: Arc<MetricsAggregator>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!(port = %port, "management_exporter_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let aggregator = aggregator.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let aggregator = aggregator.clone();
                                async move { handle_request(req, aggregator).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "exporter_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "exporter_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("management_exporter_stopped");
                    return Ok(());
                }
            }
        }
    }
}
