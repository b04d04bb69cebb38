//! Router-level tests with in-memory plot source and classifier.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use cinemood::api_types::ApiLabelScore;
use cinemood::classify::{EmotionClassifier, EmotionModel, ModelState, RawPrediction};
use cinemood::config::ClassifierConfig;
use cinemood::fetch::PlotSource;
use cinemood::orchestrator::Pipeline;
use cinemood::segment::{Segmenter, Strategy};
use cinemood::server::{build_router, AppState};

const INCEPTION: &str = "Cobb laughs with his team. A storm of fear grips the dream. \
    They laugh at the plan. Nothing happens for a while. The kick arrives.";

struct Library;

#[async_trait]
impl PlotSource for Library {
    async fn lookup(&self, title: &str) -> Result<Option<String>> {
        match title {
            "Inception" => Ok(Some(INCEPTION.to_string())),
            "Offline" => Err(anyhow!("connection refused")),
            _ => Ok(None),
        }
    }
}

struct KeywordModel;

#[async_trait]
impl EmotionModel for KeywordModel {
    async fn predict(&self, texts: &[&str]) -> Result<Vec<RawPrediction>> {
        Ok(texts
            .iter()
            .map(|t| {
                let label = if t.contains("laugh") {
                    "joy"
                } else if t.contains("fear") {
                    "fear"
                } else if t.contains("kick") {
                    "surprise"
                } else {
                    "neutral"
                };
                RawPrediction::Candidates(vec![
                    ApiLabelScore { label: "sadness".into(), score: 0.05 },
                    ApiLabelScore { label: label.into(), score: 0.91 },
                ])
            })
            .collect())
    }
}

fn app_with(state: ModelState) -> axum::Router {
    let classifier = EmotionClassifier::new(state, &ClassifierConfig::default());
    let pipeline = Pipeline::new(Arc::new(Library), Segmenter::new(Strategy::Unicode), classifier);
    build_router(AppState::new(pipeline), &["http://localhost:3000".to_string()])
}

fn app() -> axum::Router {
    app_with(ModelState::Ready(Arc::new(KeywordModel)))
}

async fn make_request(app: &axum::Router, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(path);
    let request = match body {
        Some(json_body) => {
            request = request.header("content-type", "application/json");
            request.body(Body::from(json_body.to_string())).unwrap()
        }
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}

#[tokio::test]
async fn test_health_reports_classifier_state() {
    let (status, body) = make_request(&app(), Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["classifier"], "ready");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let down = app_with(ModelState::Unavailable { reason: "not loaded".into() });
    let (_, body) = make_request(&down, Method::GET, "/api/health", None).await;
    assert_eq!(body["classifier"], "unavailable");
}

#[tokio::test]
async fn test_analyze_by_title() {
    let (status, body) =
        make_request(&app(), Method::POST, "/api/analyze", Some(json!({ "title": "Inception" }))).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(body["title"], "Inception");
    let emotions = body["emotions"].as_array().unwrap();
    assert_eq!(emotions.len(), 5);
    assert_eq!(emotions[0]["index"], 1);
    assert_eq!(emotions[0]["emotion"], "joy");
    assert_eq!(emotions[0]["score"], 0.91);

    assert_eq!(body["emotion_totals"]["joy"], 40.0);
    assert_eq!(body["emotion_totals"]["neutral"], 20.0);
    let prominent = body["prominent_emotions"].as_array().unwrap();
    assert_eq!(prominent[0]["label"], "joy");
    assert_eq!(prominent[0]["count"], 2);
    assert_eq!(prominent[0]["percentage"], 50.0);
    assert!(prominent.iter().all(|p| p["label"] != "neutral"));
    assert!(body["insights"].as_str().unwrap().starts_with("The analysis covers 4 emotional scenes"));

    assert_eq!(body["scene_data"]["scenes"], json!([1, 2, 3, 4, 5]));
    assert_eq!(body["scene_data"]["emotions"], json!([1, 5, 1, 4, 3]));

    let csv = STANDARD.decode(body["csv_data"].as_str().unwrap()).unwrap();
    assert!(String::from_utf8(csv).unwrap().starts_with("Scene,Chunk,Emotion,Score\n1,"));
    let pdf = STANDARD.decode(body["pdf_data"].as_str().unwrap()).unwrap();
    assert!(pdf.starts_with(b"%PDF-"));
    let svg = STANDARD.decode(body["emotion_distribution"].as_str().unwrap()).unwrap();
    assert!(String::from_utf8(svg).unwrap().starts_with("<svg"));
    assert_eq!(body["warnings"], json!([]));
}

#[tokio::test]
async fn test_custom_plot_wins_over_title() {
    let (status, body) = make_request(
        &app(),
        Method::POST,
        "/api/analyze",
        Some(json!({ "title": "Inception", "custom_plot": "They laugh all night." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plot"], "They laugh all night.");
    assert_eq!(body["emotions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_input_is_bad_request() {
    let (status, body) =
        make_request(&app(), Method::POST, "/api/analyze", Some(json!({ "title": "  ", "custom_plot": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert_eq!(body["error"]["message"], "Either title or custom_plot must be provided");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/analyze")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_title_is_not_found() {
    let (status, body) = make_request(
        &app(),
        Method::POST,
        "/api/analyze",
        Some(json!({ "title": "NonExistent Movie 12345" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "SOURCE_NOT_FOUND");
    assert_eq!(body["error"]["message"], "Could not find plot for 'NonExistent Movie 12345'");
}

#[tokio::test]
async fn test_source_transport_failure_is_bad_gateway() {
    let (status, body) =
        make_request(&app(), Method::POST, "/api/analyze", Some(json!({ "title": "Offline" }))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "SOURCE_UNAVAILABLE");
}

#[tokio::test]
async fn test_unavailable_classifier_is_service_unavailable() {
    let app = app_with(ModelState::Unavailable { reason: "not loaded".into() });
    let (status, body) =
        make_request(&app, Method::POST, "/api/analyze", Some(json!({ "custom_plot": "A quiet day." }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "CLASSIFICATION_UNAVAILABLE");
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/analyze")
        .header("origin", "http://localhost:3000")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "http://localhost:3000"
    );
}
