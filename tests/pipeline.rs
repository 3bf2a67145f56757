//! End-to-end tests of the composed middleware chain.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pylon::{
    Category, CorrelationOptions, Failure, Method, Pipeline, Recorder, Request, RequestRecord,
    RequestTrackingOptions, Response, Status, VersionTrackingOptions,
};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn get(path: &str, headers: &[(&str, &str)]) -> Request {
    let headers = headers
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    Request::new(Method::Get, path, headers, Vec::new())
}

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<RequestRecord>>>);

impl Recorder for Capture {
    fn record(&self, record: RequestRecord) {
        self.0.lock().unwrap().push(record);
    }
}

impl Capture {
    fn records(&self) -> Vec<RequestRecord> {
        self.0.lock().unwrap().clone()
    }
}

/// Counts `ERROR`-level events emitted while the guard is alive.
struct ErrorCounter(Arc<AtomicUsize>);

impl<S: tracing::Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::ERROR {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn count_errors() -> (Arc<AtomicUsize>, tracing::subscriber::DefaultGuard) {
    let count = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(ErrorCounter(Arc::clone(&count)));
    let guard = tracing::subscriber::set_default(subscriber);
    (count, guard)
}

async fn hello(_req: Request) -> Response {
    Response::text("hello")
}

// ── Correlation properties ────────────────────────────────────────────────────

#[tokio::test]
async fn every_response_carries_non_empty_correlation_ids() {
    let pipeline = Pipeline::new(hello)
        .with_correlation(CorrelationOptions::default())
        .with_error_handling(Category::default());

    for path in ["/a", "/b", "/c"] {
        let res = pipeline.handle(get(path, &[])).await.unwrap();
        assert!(!res.header("X-Operation-ID").unwrap().is_empty());
        assert!(!res.header("X-Transaction-ID").unwrap().is_empty());
    }
}

#[tokio::test]
async fn operation_ids_differ_between_requests() {
    let pipeline = Pipeline::new(hello).with_correlation(CorrelationOptions::default());

    let a = pipeline.handle(get("/", &[])).await.unwrap();
    let b = pipeline.handle(get("/", &[])).await.unwrap();
    assert_ne!(a.header("X-Operation-ID"), b.header("X-Operation-ID"));
}

#[tokio::test]
async fn inbound_transaction_id_propagates_upstream_extraction_disabled() {
    // Scenario: X-Transaction-ID: abc123, upstream extraction off.
    async fn assert_no_upstream(req: Request) -> Response {
        let info = req.correlation().unwrap();
        assert_eq!(info.upstream_service_id(), None);
        Response::text("ok")
    }

    let pipeline = Pipeline::new(assert_no_upstream)
        .with_correlation(CorrelationOptions::default())
        .with_error_handling(Category::default());

    let req = get("/", &[("X-Transaction-ID", "abc123"), ("X-Upstream-Service", "billing")]);
    let res = pipeline.handle(req).await.unwrap();

    assert_eq!(res.header("X-Transaction-ID"), Some("abc123"));
    assert!(!res.header("X-Operation-ID").unwrap().is_empty());
}

// ── Failure mapping properties ────────────────────────────────────────────────

#[tokio::test]
async fn unclassified_failure_maps_to_500_and_logs_once() {
    async fn boom(_req: Request) -> Result<Response, Failure> {
        Err(Failure::internal("stack trace: at line 42 in secret_module"))
    }
    let pipeline = Pipeline::new(boom)
        .with_correlation(CorrelationOptions::default())
        .with_error_handling(Category::fixed("test-api"));

    let (errors, _guard) = count_errors();
    let res = pipeline.handle(get("/", &[])).await.unwrap();

    assert_eq!(res.status_code(), 500);
    assert!(res.body().is_empty(), "internal detail must not leak");
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    // correlation still present on the mapped response
    assert!(res.header("X-Operation-ID").is_some());
    assert!(res.header("X-Transaction-ID").is_some());
}

#[tokio::test]
async fn transport_failure_keeps_its_status_and_logs_once() {
    async fn too_big(_req: Request) -> Result<Response, Failure> {
        Err(Failure::transport(413, "payload exceeds configured maximum"))
    }
    let pipeline = Pipeline::new(too_big).with_error_handling(Category::default());

    let (errors, _guard) = count_errors();
    let res = pipeline.handle(get("/upload", &[])).await.unwrap();

    assert_eq!(res.status_code(), 413);
    assert!(res.body().is_empty());
    assert_eq!(errors.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn successful_requests_log_no_errors() {
    let pipeline = Pipeline::new(hello).with_error_handling(Category::default());

    let (errors, _guard) = count_errors();
    pipeline.handle(get("/", &[])).await.unwrap();
    assert_eq!(errors.load(Ordering::SeqCst), 0);
}

// ── Tracking properties ───────────────────────────────────────────────────────

#[tokio::test]
async fn excluded_path_completes_without_telemetry() {
    let capture = Capture::default();
    let pipeline = Pipeline::new(hello)
        .with_request_tracking_recorder(
            RequestTrackingOptions::default().exclude_path("/health"),
            capture.clone(),
        )
        .with_correlation(CorrelationOptions::default())
        .with_error_handling(Category::default());

    let res = pipeline.handle(get("/health", &[])).await.unwrap();
    assert_eq!(res.status_code(), 200);
    assert!(capture.records().is_empty());

    let res = pipeline.handle(get("/orders", &[])).await.unwrap();
    assert_eq!(res.status_code(), 200);
    assert_eq!(capture.records().len(), 1);
}

#[tokio::test]
async fn tracked_record_carries_identity_and_mapped_status() {
    async fn boom(_req: Request) -> Result<Response, Failure> {
        Err(Failure::internal("boom"))
    }
    let capture = Capture::default();
    let pipeline = Pipeline::new(boom)
        .with_request_tracking_recorder(RequestTrackingOptions::default(), capture.clone())
        .with_correlation(CorrelationOptions::default())
        .with_error_handling(Category::default());

    let res = pipeline.handle(get("/orders", &[])).await.unwrap();
    assert_eq!(res.status_code(), 500);

    let records = capture.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, 500, "tracking must see the mapped status");
    assert_eq!(records[0].path, "/orders");
    let op = records[0].operation_id.as_deref().unwrap();
    assert_eq!(res.header("X-Operation-ID"), Some(op));
}

#[tokio::test]
async fn excluded_headers_never_reach_telemetry() {
    let capture = Capture::default();
    let pipeline = Pipeline::new(hello)
        .with_request_tracking_recorder(
            RequestTrackingOptions::default().exclude_header("authorization"),
            capture.clone(),
        )
        .with_correlation(CorrelationOptions::default())
        .with_error_handling(Category::default());

    pipeline
        .handle(get("/orders", &[("Authorization", "Bearer shh"), ("Accept", "*/*")]))
        .await
        .unwrap();

    let records = capture.records();
    assert!(records[0]
        .metadata
        .iter()
        .all(|(k, _)| !k.eq_ignore_ascii_case("authorization")));
}

// ── Version tracking ──────────────────────────────────────────────────────────

#[tokio::test]
async fn version_is_stamped_on_success_and_mapped_failures() {
    async fn flaky(req: Request) -> Result<Response, Failure> {
        if req.path() == "/bad" {
            Err(Failure::internal("boom"))
        } else {
            Ok(Response::status(Status::Ok))
        }
    }
    let pipeline = Pipeline::new(flaky)
        .with_version_tracking(VersionTrackingOptions::new("2.0.1"))
        .with_correlation(CorrelationOptions::default())
        .with_error_handling(Category::default());

    let ok = pipeline.handle(get("/good", &[])).await.unwrap();
    assert_eq!(ok.header("X-Version"), Some("2.0.1"));

    let err = pipeline.handle(get("/bad", &[])).await.unwrap();
    assert_eq!(err.status_code(), 500);
    assert_eq!(err.header("X-Version"), Some("2.0.1"));
}

// ── Concurrency ───────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_keep_their_own_identity() {
    async fn echo_tx(req: Request) -> Response {
        // a suspension point between identity creation and use
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        Response::text(req.correlation().unwrap().transaction_id().to_owned())
    }
    let pipeline = Arc::new(
        Pipeline::new(echo_tx)
            .with_correlation(CorrelationOptions::default())
            .with_error_handling(Category::default()),
    );

    let mut tasks = Vec::new();
    for i in 0..32 {
        let pipeline = Arc::clone(&pipeline);
        tasks.push(tokio::spawn(async move {
            let tx = format!("tx-{i}");
            let res = pipeline
                .handle(get("/", &[("X-Transaction-ID", tx.as_str())]))
                .await
                .unwrap();
            assert_eq!(res.body(), tx.as_bytes());
            assert_eq!(res.header("X-Transaction-ID"), Some(tx.as_str()));
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
}
