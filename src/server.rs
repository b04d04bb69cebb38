//! HTTP surface: `POST /api/analyze` and `GET /api/health`.

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult, PipelineError};
use crate::models::{AnalysisReport, LabeledScene, PlotInput, ProminentEmotion, SceneSeries};
use crate::orchestrator::Pipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            startup_time: Utc::now(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub custom_plot: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub title: String,
    pub plot: String,
    pub emotions: Vec<LabeledScene>,
    pub insights: String,
    pub emotion_totals: BTreeMap<String, f64>,
    pub prominent_emotions: Vec<ProminentEmotion>,
    pub scene_data: SceneSeries,
    /// Base64 SVG.
    pub emotion_distribution: Option<String>,
    pub csv_data: Option<String>,
    pub pdf_data: Option<String>,
    pub warnings: Vec<String>,
}

impl From<AnalysisReport> for AnalyzeResponse {
    fn from(report: AnalysisReport) -> Self {
        Self {
            emotion_distribution: report.chart_svg.map(|svg| STANDARD.encode(svg.as_bytes())),
            csv_data: report.csv.map(|csv| STANDARD.encode(csv)),
            pdf_data: report.pdf.map(|pdf| STANDARD.encode(pdf)),
            title: report.title,
            plot: report.plot,
            emotions: report.result.scenes,
            insights: report.result.insight_text,
            emotion_totals: report.result.emotion_totals,
            prominent_emotions: report.result.prominent_emotions,
            scene_data: report.series,
            warnings: report.warnings,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub classifier: String,
    pub uptime_seconds: u64,
}

/// POST /api/analyze
pub async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let input = PlotInput::from_parts(req.title, req.custom_plot).ok_or(PipelineError::MissingInput)?;

    let report = state.pipeline.run(input).await.map_err(|e| {
        warn!("Analysis failed - code={}, error={}", e.code(), e);
        ApiError::from(e)
    })?;
    Ok(Json(report.into()))
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds()
        .max(0) as u64;
    let classifier = if state.pipeline.classifier().is_available() { "ready" } else { "unavailable" };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        classifier: classifier.to_string(),
        uptime_seconds,
    })
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin - origin={}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any)
}

pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/api/analyze", post(analyze))
        .route("/api/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
}

/// Binds and serves until the process is stopped.
pub async fn serve(state: AppState, bind: &str, allowed_origins: &[String]) -> Result<()> {
    let app = build_router(state, allowed_origins);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;
    info!("HTTP server listening - addr={}", bind);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
