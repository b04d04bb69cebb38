use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api_types::{ApiInferenceParameters, ApiInferenceRequest, ApiLabelScore};
use crate::budget::cap_scene_text;
use crate::config::ClassifierConfig;
use crate::insights::round_to;
use crate::models::LabeledScene;

/// What the model said about one input.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPrediction {
    Single(ApiLabelScore),
    Candidates(Vec<ApiLabelScore>),
    Malformed,
}

impl RawPrediction {
    pub fn from_value(v: &Value) -> Self {
        match v {
            Value::Array(items) => {
                let parsed: Option<Vec<ApiLabelScore>> = items
                    .iter()
                    .map(|i| serde_json::from_value(i.clone()).ok())
                    .collect();
                match parsed {
                    Some(c) if !c.is_empty() => RawPrediction::Candidates(c),
                    _ => RawPrediction::Malformed,
                }
            }
            Value::Object(_) => serde_json::from_value(v.clone())
                .map(RawPrediction::Single)
                .unwrap_or(RawPrediction::Malformed),
            _ => RawPrediction::Malformed,
        }
    }

    /// Highest score wins; ties go to the earliest candidate.
    pub fn dominant(&self) -> Option<&ApiLabelScore> {
        match self {
            RawPrediction::Single(s) => Some(s),
            RawPrediction::Candidates(c) => c.iter().fold(None, |best: Option<&ApiLabelScore>, cand| match best {
                Some(b) if b.score >= cand.score => Some(b),
                _ => Some(cand),
            }),
            RawPrediction::Malformed => None,
        }
    }
}

/// A text-classification capability. One prediction per input, same order.
#[async_trait]
pub trait EmotionModel: Send + Sync {
    async fn predict(&self, texts: &[&str]) -> Result<Vec<RawPrediction>>;
}

pub enum ModelState {
    Ready(Arc<dyn EmotionModel>),
    Unavailable { reason: String },
}

pub struct EmotionClassifier {
    state: ModelState,
    batch_size: usize,
    max_parallel_batches: usize,
    max_scene_tokens: usize,
}

impl EmotionClassifier {
    pub fn new(state: ModelState, cfg: &ClassifierConfig) -> Self {
        Self {
            state,
            batch_size: cfg.batch_size.max(1),
            max_parallel_batches: cfg.max_parallel_batches.max(1),
            max_scene_tokens: cfg.max_scene_tokens.max(1),
        }
    }

    /// HTTP model when an endpoint is configured, unavailable otherwise.
    pub fn from_config(cfg: &ClassifierConfig) -> Self {
        let state = if cfg.endpoint.trim().is_empty() {
            ModelState::Unavailable { reason: "no classifier endpoint configured".to_string() }
        } else {
            match HttpEmotionModel::new(cfg) {
                Ok(model) => ModelState::Ready(Arc::new(model)),
                Err(e) => ModelState::Unavailable { reason: format!("{:#}", e) },
            }
        };
        if let ModelState::Unavailable { reason } = &state {
            warn!("Emotion classifier unavailable - reason={}", reason);
        }
        Self::new(state, cfg)
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.state {
            ModelState::Ready(_) => None,
            ModelState::Unavailable { reason } => Some(reason),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, ModelState::Ready(_))
    }

    /// Labels every scene in order. Returns an empty vec when the model is
    /// unavailable or when every batch failed.
    pub async fn classify(&self, scenes: &[String]) -> Vec<LabeledScene> {
        let model = match &self.state {
            ModelState::Ready(m) => m,
            ModelState::Unavailable { .. } => {
                warn!("Emotion classification skipped: classifier unavailable");
                return Vec::new();
            }
        };
        if scenes.is_empty() {
            warn!("Emotion classification skipped: no scenes");
            return Vec::new();
        }

        let start = std::time::Instant::now();
        info!(
            "Classifying emotions - scenes={}, batch_size={}, max_parallel={}",
            scenes.len(),
            self.batch_size,
            self.max_parallel_batches
        );

        let capped: Vec<&str> = scenes
            .iter()
            .map(|s| cap_scene_text(s, self.max_scene_tokens))
            .collect();
        let batches: Vec<&[&str]> = capped.chunks(self.batch_size).collect();

        let mut predictions: Vec<Option<RawPrediction>> = Vec::with_capacity(scenes.len());
        let mut succeeded = 0usize;

        for group in batches.chunks(self.max_parallel_batches) {
            let tasks = group.iter().map(|batch| model.predict(batch));
            let results = futures::future::join_all(tasks).await;

            for (batch, result) in group.iter().zip(results) {
                match result {
                    Ok(preds) if preds.len() == batch.len() => {
                        succeeded += 1;
                        predictions.extend(preds.into_iter().map(Some));
                    }
                    Ok(preds) => {
                        warn!(
                            "Classifier returned misaligned batch - expected={}, got={}",
                            batch.len(),
                            preds.len()
                        );
                        predictions.extend(std::iter::repeat_with(|| None).take(batch.len()));
                    }
                    Err(e) => {
                        warn!("Classifier batch failed - size={}, error={:#}", batch.len(), e);
                        predictions.extend(std::iter::repeat_with(|| None).take(batch.len()));
                    }
                }
            }
        }

        if succeeded == 0 {
            warn!("Error during emotion classification: every batch failed");
            return Vec::new();
        }

        let labeled: Vec<LabeledScene> = scenes
            .iter()
            .zip(predictions)
            .enumerate()
            .map(|(i, (text, pred))| label_scene(i + 1, text, pred))
            .collect();

        let unknown = labeled.iter().filter(|s| s.emotion == crate::models::UNKNOWN).count();
        info!(
            "Emotion classification completed - duration={:.2}s, scenes={}, unknown={}",
            start.elapsed().as_secs_f32(),
            labeled.len(),
            unknown
        );
        labeled
    }
}

fn label_scene(index: usize, text: &str, pred: Option<RawPrediction>) -> LabeledScene {
    let dominant = pred.as_ref().and_then(RawPrediction::dominant);
    match dominant {
        Some(d) if d.score.is_finite() && !d.label.trim().is_empty() => LabeledScene {
            index,
            text: text.to_string(),
            emotion: d.label.trim().to_lowercase(),
            score: round_to(d.score.clamp(0.0, 1.0), 4),
        },
        _ => {
            let preview: String = text.chars().take(50).collect();
            warn!("Could not classify emotion for scene {}: '{}...'", index, preview);
            LabeledScene::unknown(index, text)
        }
    }
}

/// Hugging Face style text-classification endpoint.
pub struct HttpEmotionModel {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpEmotionModel {
    pub fn new(cfg: &ClassifierConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("Building classifier HTTP client")?;
        Ok(Self {
            client,
            endpoint: cfg.endpoint.clone(),
            token: cfg.api_token(),
        })
    }
}

#[async_trait]
impl EmotionModel for HttpEmotionModel {
    async fn predict(&self, texts: &[&str]) -> Result<Vec<RawPrediction>> {
        let start = std::time::Instant::now();
        let body = ApiInferenceRequest {
            inputs: texts,
            parameters: ApiInferenceParameters { top_k: None },
        };

        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("Request failed for {}", self.endpoint))?
            .error_for_status()
            .with_context(|| format!("HTTP error for {}", self.endpoint))?;

        let value: Value = resp
            .json()
            .await
            .with_context(|| format!("Decoding JSON for {}", self.endpoint))?;

        let items = match value {
            Value::Array(items) => items,
            other => return Err(anyhow!("Expected a JSON array from classifier, got: {}", other)),
        };

        debug!(
            "Classifier batch completed - inputs={}, duration={:.2}s",
            texts.len(),
            start.elapsed().as_secs_f32()
        );
        Ok(items.iter().map(RawPrediction::from_value).collect())
    }
}
