//! Wikipedia and classifier clients against local axum stubs.

use axum::{extract::Query, routing::{get, post}, Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use cinemood::classify::{EmotionClassifier, EmotionModel, HttpEmotionModel, ModelState, RawPrediction};
use cinemood::config::{ClassifierConfig, PlotSourceConfig};
use cinemood::fetch::{PlotSource, WikipediaPlotSource};

async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn wiki(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    if q.get("list").map(String::as_str) == Some("search") {
        let hits = match q.get("srsearch").map(String::as_str) {
            Some("Inception") => json!([{ "title": "Inception (disambiguation)" }, { "title": "Inception" }]),
            Some("Stub Film") => json!([{ "title": "Stub Film" }]),
            _ => json!([]),
        };
        return Json(json!({ "query": { "search": hits } }));
    }

    let page = match q.get("titles").map(String::as_str) {
        Some("Inception (disambiguation)") => json!({
            "title": "Inception (disambiguation)",
            "extract": "Inception may refer to:\nInception (film)",
            "pageprops": { "disambiguation": "" }
        }),
        Some("Inception") => json!({
            "title": "Inception",
            "extract": "Inception is a 2010 film.\n\n== Plot ==\nCobb enters a dream.\nHe laughs.\n\n== Cast ==\nLeonardo DiCaprio",
        }),
        Some("Stub Film") => json!({
            "title": "Stub Film",
            "extract": "Stub Film is a short film about a lighthouse keeper.",
        }),
        Some(other) => json!({ "title": other, "missing": true }),
        None => json!({ "title": "", "missing": true }),
    };
    Json(json!({ "query": { "pages": [page] } }))
}

/// Every input gets two candidates; "BOOM" makes the whole batch fail.
async fn classifier(Json(body): Json<Value>) -> Result<Json<Value>, axum::http::StatusCode> {
    let inputs = body["inputs"].as_array().cloned().unwrap_or_default();
    if inputs.iter().any(|i| i.as_str().unwrap_or("").contains("BOOM")) {
        return Err(axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }
    let out: Vec<Value> = inputs
        .iter()
        .map(|i| {
            let winner = if i.as_str().unwrap_or("").contains("laugh") { "joy" } else { "neutral" };
            json!([
                { "label": winner, "score": 0.8765 },
                { "label": "anger", "score": 0.0123 }
            ])
        })
        .collect();
    Ok(Json(Value::Array(out)))
}

fn plot_source(addr: SocketAddr) -> WikipediaPlotSource {
    let cfg = PlotSourceConfig {
        api_base: format!("http://{}/w/api.php", addr),
        ..PlotSourceConfig::default()
    };
    WikipediaPlotSource::new(&cfg).unwrap()
}

fn classifier_config(addr: SocketAddr) -> ClassifierConfig {
    ClassifierConfig {
        endpoint: format!("http://{}/classify", addr),
        api_token_env: String::new(),
        batch_size: 2,
        max_parallel_batches: 2,
        ..ClassifierConfig::default()
    }
}

#[tokio::test]
async fn test_wikipedia_skips_disambiguation_and_takes_plot_section() {
    let addr = spawn(Router::new().route("/w/api.php", get(wiki))).await;
    let plot = plot_source(addr).lookup("Inception").await.unwrap();
    assert_eq!(plot.as_deref(), Some("Cobb enters a dream.\nHe laughs."));
}

#[tokio::test]
async fn test_wikipedia_falls_back_to_lead_text() {
    let addr = spawn(Router::new().route("/w/api.php", get(wiki))).await;
    let plot = plot_source(addr).lookup("Stub Film").await.unwrap();
    assert_eq!(plot.as_deref(), Some("Stub Film is a short film about a lighthouse keeper."));
}

#[tokio::test]
async fn test_wikipedia_no_results_is_none() {
    let addr = spawn(Router::new().route("/w/api.php", get(wiki))).await;
    assert!(plot_source(addr).lookup("NonExistent Movie 12345").await.unwrap().is_none());
}

#[tokio::test]
async fn test_wikipedia_unreachable_is_error() {
    // Bound then dropped, so nothing is listening.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    assert!(plot_source(addr).lookup("Inception").await.is_err());
}

#[tokio::test]
async fn test_http_model_parses_candidate_lists() {
    let addr = spawn(Router::new().route("/classify", post(classifier))).await;
    let model = HttpEmotionModel::new(&classifier_config(addr)).unwrap();
    let preds = model.predict(&["They laugh.", "A door."]).await.unwrap();

    assert_eq!(preds.len(), 2);
    assert!(matches!(&preds[0], RawPrediction::Candidates(c) if c.len() == 2));
    assert_eq!(preds[0].dominant().unwrap().label, "joy");
    assert_eq!(preds[1].dominant().unwrap().label, "neutral");
}

#[tokio::test]
async fn test_failed_batch_marks_only_its_scenes_unknown() {
    let addr = spawn(Router::new().route("/classify", post(classifier))).await;
    let cfg = classifier_config(addr);
    let model = HttpEmotionModel::new(&cfg).unwrap();
    let classifier = EmotionClassifier::new(ModelState::Ready(Arc::new(model)), &cfg);

    let scenes: Vec<String> = ["They laugh.", "BOOM goes the car.", "Quiet.", "More laugh."]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let labeled = classifier.classify(&scenes).await;

    let labels: Vec<&str> = labeled.iter().map(|s| s.emotion.as_str()).collect();
    assert_eq!(labels, vec!["unknown", "unknown", "neutral", "joy"]);
    assert_eq!(labeled[3].score, 0.8765);
    assert_eq!(labeled[0].score, 0.0);
}
