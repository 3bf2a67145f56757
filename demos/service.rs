//! Minimal pylon service — a hyper server driving the full pipeline.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example service
//!
//! Try:
//!   curl -i http://localhost:3000/orders/42
//!   curl -i http://localhost:3000/orders/42 -H 'X-Transaction-ID: abc123'
//!   curl -i http://localhost:3000/broken
//!   curl -i http://localhost:3000/healthz        # not tracked

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};

use pylon::{
    Category, CorrelationOptions, Failure, Method, Pipeline, Request, RequestTrackingOptions,
    Response, Status, VersionTrackingOptions,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let pipeline = Arc::new(
        Pipeline::new(handler)
            .with_version_tracking(VersionTrackingOptions::new(env!("CARGO_PKG_VERSION")))
            .with_request_tracking(
                RequestTrackingOptions::default()
                    .exclude_path("/healthz")
                    .exclude_header("authorization"),
            )
            .with_correlation(CorrelationOptions::default().extract_upstream_service(true))
            .with_error_handling(Category::fixed("demo-api")),
    );

    serve("0.0.0.0:3000", pipeline).await;
}

// The application handler — everything cross-cutting already happened.
async fn handler(req: Request) -> Result<Response, Failure> {
    // A transport-classified failure: the status code travels with it.
    if req.body().len() > 64 * 1024 {
        return Err(Failure::transport(413, "body exceeds demo limit"));
    }

    match (req.method(), req.path()) {
        (Method::Get, "/healthz") => Ok(Response::text("ok")),
        (Method::Get, path) if path.starts_with("/orders/") => {
            let id = &path["/orders/".len()..];
            let tx = req
                .correlation()
                .map(|c| c.transaction_id().to_owned())
                .unwrap_or_default();
            Ok(Response::json(
                format!(r#"{{"order":"{id}","transaction":"{tx}"}}"#).into_bytes(),
            ))
        }
        (_, "/broken") => Err(Failure::internal("demo: downstream dependency exploded")),
        _ => Ok(Response::status(Status::NotFound)),
    }
}

// ── Server plumbing (the external collaborator) ───────────────────────────────

async fn serve(addr: &str, pipeline: Arc<Pipeline>) {
    let addr: SocketAddr = addr.parse().expect("invalid socket address");
    let listener = TcpListener::bind(addr).await.expect("bind failed");

    info!(%addr, "demo service listening");

    let mut tasks = tokio::task::JoinSet::new();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                break;
            }

            res = listener.accept() => {
                let (stream, remote_addr) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let pipeline = Arc::clone(&pipeline);
                let io = TokioIo::new(stream);

                tasks.spawn(async move {
                    let svc = service_fn(move |req| {
                        let pipeline = Arc::clone(&pipeline);
                        async move { dispatch(pipeline, req).await }
                    });

                    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                        .serve_connection(io, svc)
                        .await
                    {
                        error!(peer = %remote_addr, "connection error: {e}");
                    }
                });
            }

            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    while tasks.join_next().await.is_some() {}
    info!("demo service stopped");
}

/// Bridges one hyper request into the pipeline and back.
async fn dispatch(
    pipeline: Arc<Pipeline>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<Full<bytes::Bytes>>, Infallible> {
    let Ok(method) = req.method().as_str().parse::<Method>() else {
        return Ok(http::Response::builder()
            .status(http::StatusCode::METHOD_NOT_ALLOWED)
            .body(Full::default())
            .unwrap());
    };
    let path = req.uri().path().to_owned();
    let headers = req
        .headers()
        .iter()
        .filter_map(|(k, v)| Some((k.as_str().to_owned(), v.to_str().ok()?.to_owned())))
        .collect();
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes().to_vec(),
        Err(e) => {
            // Failed before the pipeline could run; answer at the transport.
            error!("body read failed: {e}");
            return Ok(http::Response::builder()
                .status(http::StatusCode::BAD_REQUEST)
                .body(Full::default())
                .unwrap());
        }
    };

    let outcome = pipeline.handle(Request::new(method, path, headers, body)).await;
    // With error handling composed outermost, `handle` never returns `Err`.
    let response = outcome.unwrap_or_else(|_| Response::status(Status::InternalServerError));
    Ok(to_http(response))
}

fn to_http(res: Response) -> http::Response<Full<bytes::Bytes>> {
    let mut builder = http::Response::builder().status(res.status_code());
    for (name, value) in res.headers() {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .body(Full::new(bytes::Bytes::from(res.body().to_vec())))
        .unwrap()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
