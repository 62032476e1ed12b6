mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::TestApp;
use service_core::middleware::tracing::REQUEST_ID_HEADER;
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Collects the `request_id` field of every span opened.
#[derive(Clone, Default)]
struct SpanRequestIds(Arc<Mutex<Vec<String>>>);

struct RequestIdVisitor<'a>(&'a mut Option<String>);

impl Visit for RequestIdVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "request_id" {
            *self.0 = Some(format!("{:?}", value));
        }
    }
}

impl<S: Subscriber> Layer<S> for SpanRequestIds {
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        let mut request_id = None;
        attrs.record(&mut RequestIdVisitor(&mut request_id));
        if let Some(request_id) = request_id {
            self.0.lock().unwrap().push(request_id);
        }
    }
}

#[tokio::test]
async fn health_and_readiness_report_ok() {
    let app = TestApp::new();

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "pos-service-test");

    let (status, body) = app.get("/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn metrics_endpoint_serves_text() {
    let app = TestApp::new();

    let (status, _) = app.get("/metrics").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn request_id_is_echoed() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(REQUEST_ID_HEADER, "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(REQUEST_ID_HEADER).unwrap(),
        "req-123"
    );

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
}

#[tokio::test]
async fn generated_request_id_is_on_the_http_span() {
    let app = TestApp::new();
    let ids = SpanRequestIds::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(ids.clone()));

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let assigned = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let recorded = ids.0.lock().unwrap().clone();
    assert_eq!(recorded, vec![assigned]);
}
