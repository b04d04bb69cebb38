//! Scene-emotion aggregation and insight text.
//!
//! Everything here is pure: no I/O, no allocation beyond the result. Faults in
//! the input (non-finite scores, blank labels) never escape `aggregate`; they
//! collapse into the degenerate result instead.

use itertools::Itertools;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::{debug, error};

use crate::models::{AnalysisResult, LabeledScene, ProminentEmotion, SceneSeries, NEUTRAL};

pub const NO_DATA_TEXT: &str = "No analysis data available to generate insights.";
pub const FAILURE_TEXT: &str = "Could not generate insights due to an error.";
pub const MAX_PROMINENT: usize = 3;

const FALLBACK_SIGNIFICANCE: &str =
    "This emotion plays a significant role in shaping the narrative's emotional landscape.";

const SIGNIFICANCE: &[(&str, &str)] = &[
    ("joy", "This suggests the narrative focuses on positive outcomes, achievements, or moments of happiness, characterizing it as uplifting or comedic."),
    ("sadness", "This indicates a strong presence of loss, disappointment, or melancholy, suggesting a dramatic or tragic storyline."),
    ("anger", "This points towards conflict, frustration, or confrontation being central themes, common in action, thriller, or intense drama genres."),
    ("fear", "This suggests suspense, tension, or danger are significant elements, typical of horror, thriller, or suspense genres."),
    ("disgust", "This highlights a character's strong aversion to something, often related to moral or physical repulsion."),
    ("surprise", "This indicates unexpected events or twists play a noticeable role, potentially adding intrigue or humor depending on context."),
];

#[derive(Debug, Error, PartialEq)]
pub enum InsightError {
    #[error("scene {index} has a blank emotion label")]
    BlankLabel { index: usize },
    #[error("scene {index} has invalid score {score}")]
    InvalidScore { index: usize, score: f64 },
}

/// Narrative reading of a dominant label; unseen labels get the generic text.
pub fn significance(label: &str) -> &'static str {
    SIGNIFICANCE
        .iter()
        .find(|(l, _)| *l == label)
        .map(|(_, s)| *s)
        .unwrap_or(FALLBACK_SIGNIFICANCE)
}

pub fn aggregate(scenes: &[LabeledScene]) -> AnalysisResult {
    if scenes.is_empty() || scenes.iter().all(|s| s.emotion.trim().is_empty()) {
        return degenerate(scenes, NO_DATA_TEXT);
    }

    match try_aggregate(scenes) {
        Ok(result) => result,
        Err(e) => {
            error!("Insight generation failed - scenes={}, error={}", scenes.len(), e);
            degenerate(scenes, FAILURE_TEXT)
        }
    }
}

fn degenerate(scenes: &[LabeledScene], text: &str) -> AnalysisResult {
    AnalysisResult {
        scenes: scenes.to_vec(),
        emotion_totals: BTreeMap::new(),
        prominent_emotions: Vec::new(),
        insight_text: text.to_string(),
    }
}

fn try_aggregate(scenes: &[LabeledScene]) -> Result<AnalysisResult, InsightError> {
    for s in scenes {
        if s.emotion.trim().is_empty() {
            return Err(InsightError::BlankLabel { index: s.index });
        }
        if !s.score.is_finite() || !(0.0..=1.0).contains(&s.score) {
            return Err(InsightError::InvalidScore { index: s.index, score: s.score });
        }
    }

    let emotion_totals = emotion_totals(scenes);

    let emotional: Vec<&LabeledScene> = scenes.iter().filter(|s| s.emotion != NEUTRAL).collect();
    let subset_size = emotional.len();

    let prominent_emotions: Vec<ProminentEmotion> = rank_labels(emotional.iter().copied())
        .into_iter()
        .take(MAX_PROMINENT)
        .map(|(label, count)| ProminentEmotion {
            percentage: percent(count, subset_size),
            significance: significance(&label).to_string(),
            label,
            count,
        })
        .collect();

    let insight_text = if subset_size == 0 {
        format!(
            "The analysis covers {} scenes, all of them neutral; no dominant emotion stands out.",
            scenes.len()
        )
    } else {
        compose_insight(subset_size, &prominent_emotions)
    };

    debug!(
        "Aggregation done - scenes={}, labels={}, emotional={}, prominent={}",
        scenes.len(),
        emotion_totals.len(),
        subset_size,
        prominent_emotions.len()
    );

    Ok(AnalysisResult {
        scenes: scenes.to_vec(),
        emotion_totals,
        prominent_emotions,
        insight_text,
    })
}

/// Percentage of all scenes (neutral and unknown included) per label.
pub fn emotion_totals(scenes: &[LabeledScene]) -> BTreeMap<String, f64> {
    rank_labels(scenes.iter())
        .into_iter()
        .map(|(label, count)| (label, percent(count, scenes.len())))
        .collect()
}

/// Distinct labels by descending count; equal counts keep first-appearance order.
pub fn rank_labels<'a>(scenes: impl Iterator<Item = &'a LabeledScene> + Clone) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for s in scenes.clone() {
        *counts.entry(s.emotion.as_str()).or_default() += 1;
    }

    let mut ranked: Vec<(String, usize)> = scenes
        .map(|s| s.emotion.as_str())
        .unique()
        .map(|label| (label.to_string(), counts[label]))
        .collect();
    // stable sort keeps first-appearance order among ties
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

fn compose_insight(subset_size: usize, prominent: &[ProminentEmotion]) -> String {
    let mut out = format!(
        "The analysis covers {} emotional scenes (excluding neutral).\n\n",
        subset_size
    );
    for (rank, p) in prominent.iter().enumerate() {
        out.push_str(&format!(
            "{}. **{}** appears in {} scenes ({:.1}%)\n",
            rank + 1,
            title_case(&p.label),
            p.count,
            p.percentage
        ));
        out.push_str(&format!("   {}\n\n", p.significance));
    }
    out
}

pub fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(100.0 * count as f64 / total as f64, 1)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Uppercases the first letter of every alphabetic run, lowercases the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Numeric code per scene for timeline plots. Labels outside the map plot as neutral.
pub fn scene_series(scenes: &[LabeledScene]) -> SceneSeries {
    fn code(label: &str) -> u8 {
        match label {
            "joy" => 1,
            "disgust" => 2,
            "surprise" => 3,
            "neutral" => 4,
            "fear" => 5,
            "sadness" => 6,
            "anger" => 7,
            _ => 4,
        }
    }

    SceneSeries {
        scenes: scenes.iter().map(|s| s.index).collect(),
        emotions: scenes.iter().map(|s| code(&s.emotion)).collect(),
        scores: scenes.iter().map(|s| s.score).collect(),
    }
}
