use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::chart::{build_chart, render_svg};
use crate::classify::EmotionClassifier;
use crate::config::Config;
use crate::error::PipelineError;
use crate::export::scenes_to_csv;
use crate::fetch::{PlotSource, WikipediaPlotSource};
use crate::insights::{aggregate, scene_series};
use crate::models::{AnalysisReport, PlotInput};
use crate::render::render_markdown;
use crate::report::{render_pdf, ReportInput};
use crate::segment::Segmenter;

/// Stateless per-request pipeline. Shared read-only across requests.
pub struct Pipeline {
    plot_source: Arc<dyn PlotSource>,
    segmenter: Arc<Segmenter>,
    classifier: EmotionClassifier,
}

impl Pipeline {
    pub fn new(plot_source: Arc<dyn PlotSource>, segmenter: Segmenter, classifier: EmotionClassifier) -> Self {
        Self {
            plot_source,
            segmenter: Arc::new(segmenter),
            classifier,
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let plot_source = Arc::new(WikipediaPlotSource::new(&cfg.plot_source)?);
        let segmenter = Segmenter::new(cfg.segmenter.strategy);
        let classifier = EmotionClassifier::from_config(&cfg.classifier);
        Ok(Self::new(plot_source, segmenter, classifier))
    }

    pub fn classifier(&self) -> &EmotionClassifier {
        &self.classifier
    }

    /// fetch → segment → classify → aggregate → render.
    pub async fn run(&self, input: PlotInput) -> Result<AnalysisReport, PipelineError> {
        let pipeline_start = std::time::Instant::now();
        let title = input.display_title().to_string();
        info!("Pipeline started - title={}", title);

        // 1) plot text
        let plot = match input {
            PlotInput::Text { text, .. } => {
                info!("Processing custom plot text - chars={}", text.chars().count());
                text
            }
            PlotInput::Title(t) => match self.plot_source.lookup(&t).await {
                Ok(Some(plot)) => plot,
                Ok(None) => return Err(PipelineError::SourceNotFound(t)),
                Err(e) => {
                    error!("Plot source failed - title={}, error={:#}", t, e);
                    return Err(PipelineError::SourceUnavailable(e));
                }
            },
        };

        // 2) scenes, on the blocking pool like the PDF render below
        let segmenter = Arc::clone(&self.segmenter);
        let text = plot.clone();
        let chunks = tokio::task::spawn_blocking(move || segmenter.segment(&text))
            .await
            .map_err(|e| PipelineError::Internal(format!("segmentation task: {}", e)))?;
        if chunks.is_empty() {
            return Err(PipelineError::SegmentationEmpty);
        }
        debug!("Scenes prepared - count={}", chunks.len());

        // 3) labels
        if let Some(reason) = self.classifier.unavailable_reason() {
            return Err(PipelineError::ClassificationUnavailable(reason.to_string()));
        }
        let labeled = self.classifier.classify(&chunks).await;
        if labeled.is_empty() {
            return Err(PipelineError::ClassificationEmpty);
        }

        // 4) statistics + insights; never fails
        let result = aggregate(&labeled);
        let series = scene_series(&labeled);

        // 5) artifacts; a failure drops only that artifact
        let mut warnings = Vec::new();
        let chart = build_chart(&result.scenes);
        let chart_svg = chart.as_ref().map(render_svg);
        if chart_svg.is_none() {
            warnings.push("Failed to generate emotion distribution graph".to_string());
        }

        let csv = Some(scenes_to_csv(&result.scenes).into_bytes());

        let (pdf_title, pdf_plot, pdf_insights) = (title.clone(), plot.clone(), result.insight_text.clone());
        let (pdf_chart, pdf_scenes) = (chart.clone(), result.scenes.clone());
        let rendered = tokio::task::spawn_blocking(move || {
            render_pdf(&ReportInput {
                title: &pdf_title,
                plot: &pdf_plot,
                insights: &pdf_insights,
                chart: pdf_chart.as_ref(),
                scenes: &pdf_scenes,
                generated_at: Utc::now(),
            })
        })
        .await;
        let pdf = match rendered {
            Ok(Ok(bytes)) => Some(bytes),
            Ok(Err(e)) => {
                warn!("PDF report generation failed - error={:#}", e);
                warnings.push("Failed to generate PDF report".to_string());
                None
            }
            Err(e) => {
                warn!("PDF report task failed - error={}", e);
                warnings.push("Failed to generate PDF report".to_string());
                None
            }
        };

        let markdown = render_markdown(&title, &result);

        info!(
            "Pipeline completed - title={}, scenes={}, labels={}, duration={:.2}s",
            title,
            result.scenes.len(),
            result.emotion_totals.len(),
            pipeline_start.elapsed().as_secs_f32()
        );

        Ok(AnalysisReport {
            title,
            plot,
            result,
            series,
            chart_svg,
            csv,
            pdf,
            markdown,
            warnings,
        })
    }
}
