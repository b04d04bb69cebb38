use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const NEUTRAL: &str = "neutral";
pub const UNKNOWN: &str = "unknown";

/// One classified unit of narrative text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledScene {
    pub index: usize,    // 1-based, original order
    pub text: String,    // trimmed, never empty
    pub emotion: String, // classifier vocabulary, open-ended
    pub score: f64,      // [0.0, 1.0], 4 decimals
}

impl LabeledScene {
    pub fn unknown(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            emotion: UNKNOWN.to_string(),
            score: 0.0,
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.emotion == NEUTRAL
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProminentEmotion {
    pub label: String,
    pub count: usize,
    pub percentage: f64, // of the emotional (non-neutral) subset
    pub significance: String,
}

/// Aggregate over one plot. Built once per request and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub scenes: Vec<LabeledScene>,
    pub emotion_totals: BTreeMap<String, f64>, // label -> % of all scenes
    pub prominent_emotions: Vec<ProminentEmotion>,
    pub insight_text: String,
}

/// Scene-by-scene series for timeline plots: numeric emotion codes aligned with indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneSeries {
    pub scenes: Vec<usize>,
    pub emotions: Vec<u8>,
    pub scores: Vec<f64>,
}

/// Where the plot text comes from.
#[derive(Debug, Clone)]
pub enum PlotInput {
    Title(String),
    Text { title: Option<String>, text: String },
}

impl PlotInput {
    /// Prefers non-blank raw text over a title, mirroring the HTTP contract.
    pub fn from_parts(title: Option<String>, text: Option<String>) -> Option<Self> {
        let title = title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        let text = text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        match (title, text) {
            (title, Some(text)) => Some(PlotInput::Text { title, text }),
            (Some(title), None) => Some(PlotInput::Title(title)),
            (None, None) => None,
        }
    }

    pub fn display_title(&self) -> &str {
        match self {
            PlotInput::Title(t) => t,
            PlotInput::Text { title: Some(t), .. } => t,
            PlotInput::Text { title: None, .. } => "Custom Plot",
        }
    }
}

/// Rendered outputs for one analysis; each artifact is optional because
/// rendering failures only drop the affected artifact.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub title: String,
    pub plot: String,
    pub result: AnalysisResult,
    pub series: SceneSeries,
    pub chart_svg: Option<String>,
    pub csv: Option<Vec<u8>>,
    pub pdf: Option<Vec<u8>>,
    pub markdown: String,
    pub warnings: Vec<String>,
}
