use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use std::{fs, path::Path, path::PathBuf};
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::models::{AnalysisReport, LabeledScene};

pub const CSV_HEADER: &str = "Scene,Chunk,Emotion,Score";

/// Row-oriented export of labeled scenes.
pub fn scenes_to_csv(scenes: &[LabeledScene]) -> String {
    let mut out = String::with_capacity(64 * (scenes.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');
    for s in scenes {
        out.push_str(&format!(
            "{},{},{},{}\n",
            s.index,
            csv_field(&s.text),
            csv_field(&s.emotion),
            csv_score(s.score)
        ));
    }
    out
}

/// Whole numbers keep one decimal ("0.0", "1.0").
fn csv_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{:.1}", score)
    } else {
        score.to_string()
    }
}

fn csv_field(value: &str) -> String {
    if value.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Stable directory name: slugged title plus a hash of the plot text.
pub fn run_dir_name(title: &str, plot: &str) -> String {
    let slug: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let slug = if slug.is_empty() { "plot".to_string() } else { slug };
    format!("{}-{:016x}", slug, xxh3_64(plot.as_bytes()))
}

/// Writes every available artifact into `<out_dir>/<run dir>/` and returns that directory.
pub fn write_all(out_dir: &Path, report: &AnalysisReport) -> Result<PathBuf> {
    let run_dir = out_dir.join(run_dir_name(&report.title, &report.plot));
    fs::create_dir_all(&run_dir).with_context(|| format!("create {:?}", run_dir))?;

    let analysis = json!({
        "title": report.title,
        "plot": report.plot,
        "result": report.result,
        "scene_data": report.series,
        "warnings": report.warnings,
    });
    write_json(run_dir.join("analysis.json"), &analysis)?;

    write_bytes(run_dir.join("insights.md"), report.markdown.as_bytes())?;

    match &report.csv {
        Some(csv) => write_bytes(run_dir.join("analysis.csv"), csv)?,
        None => warn!("CSV export unavailable, skipped"),
    }
    match &report.chart_svg {
        Some(svg) => write_bytes(run_dir.join("emotion_distribution.svg"), svg.as_bytes())?,
        None => warn!("Chart unavailable, skipped"),
    }
    match &report.pdf {
        Some(pdf) => write_bytes(run_dir.join("report.pdf"), pdf)?,
        None => warn!("PDF report unavailable, skipped"),
    }

    info!("Artifacts written - directory={}", run_dir.display());
    Ok(run_dir)
}

fn write_json<P: AsRef<Path>, T: ?Sized + Serialize>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    let data = serde_json::to_vec_pretty(value).with_context(|| format!("serialize {:?}", path))?;
    write_bytes(path, &data)
}

fn write_bytes<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, data).with_context(|| format!("write {:?}", path))?;
    debug!("Wrote {}", path.display());
    Ok(())
}
