use serde::Serialize;
use std::fmt::Write as _;

use crate::insights::rank_labels;
use crate::models::LabeledScene;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    /// Components in 0..=1 for PDF fill operators.
    pub fn unit(&self) -> (f32, f32, f32) {
        (self.0 as f32 / 255.0, self.1 as f32 / 255.0, self.2 as f32 / 255.0)
    }
}

pub const DEFAULT_COLOR: Rgb = Rgb(128, 128, 128); // grey

const EMOTION_COLORS: &[(&str, Rgb)] = &[
    ("joy", Rgb(255, 215, 0)),            // gold
    ("sadness", Rgb(100, 149, 237)),      // cornflowerblue
    ("anger", Rgb(255, 0, 0)),            // red
    ("fear", Rgb(128, 0, 128)),           // purple
    ("love", Rgb(240, 128, 128)),         // lightcoral
    ("surprise", Rgb(255, 165, 0)),       // orange
    ("neutral", Rgb(128, 128, 128)),      // grey
    ("disgust", Rgb(128, 128, 0)),        // olive
    ("guilt", Rgb(165, 42, 42)),          // brown
    ("shame", Rgb(169, 169, 169)),        // darkgrey
    ("unknown", Rgb(0, 0, 0)),            // black
];

pub fn emotion_color(label: &str) -> Rgb {
    EMOTION_COLORS
        .iter()
        .find(|(l, _)| *l == label)
        .map(|(_, c)| *c)
        .unwrap_or(DEFAULT_COLOR)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartBar {
    pub label: String,
    pub count: usize,
    pub color: Rgb,
}

/// Emotion distribution over all scenes, tallest bar first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub bars: Vec<ChartBar>,
}

impl ChartSpec {
    pub fn max_count(&self) -> usize {
        self.bars.iter().map(|b| b.count).max().unwrap_or(0)
    }
}

/// `None` when there is nothing to plot.
pub fn build_chart(scenes: &[LabeledScene]) -> Option<ChartSpec> {
    if scenes.is_empty() {
        return None;
    }
    let bars = rank_labels(scenes.iter())
        .into_iter()
        .map(|(label, count)| ChartBar {
            color: emotion_color(&label),
            label,
            count,
        })
        .collect();
    Some(ChartSpec {
        title: "Overall Emotion Distribution in Movie Plot".to_string(),
        x_label: "Emotion".to_string(),
        y_label: "Number of Scenes (Chunks)".to_string(),
        bars,
    })
}

/// "Nice" y-axis step so there are at most ~8 gridlines.
pub fn tick_step(max: usize) -> usize {
    let mut step = 1;
    for candidate in [1usize, 2, 5, 10, 20, 25, 50, 100, 200, 250, 500, 1000] {
        step = candidate;
        if max / candidate <= 8 {
            break;
        }
    }
    step
}

const W: f32 = 800.0;
const H: f32 = 480.0;
const LEFT: f32 = 70.0;
const RIGHT: f32 = 20.0;
const TOP: f32 = 50.0;
const BOTTOM: f32 = 110.0;

pub fn render_svg(spec: &ChartSpec) -> String {
    let plot_w = W - LEFT - RIGHT;
    let plot_h = H - TOP - BOTTOM;
    let max = spec.max_count().max(1);
    let step = tick_step(max);
    let y_top = max.div_ceil(step) * step;
    let scale = plot_h / y_top as f32;
    let slot = plot_w / spec.bars.len().max(1) as f32;
    let bar_w = slot * 0.7;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{W}" height="{H}" viewBox="0 0 {W} {H}" font-family="Helvetica, Arial, sans-serif">"#
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="30" font-size="20" text-anchor="middle">{}</text>"#,
        W / 2.0,
        escape_xml(&spec.title)
    );

    // dashed y grid + tick labels
    let mut tick = 0;
    while tick <= y_top {
        let y = TOP + plot_h - tick as f32 * scale;
        let _ = writeln!(
            svg,
            r##"<line x1="{LEFT}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="#cccccc" stroke-dasharray="4 3"/>"##,
            LEFT + plot_w
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="12" text-anchor="end">{tick}</text>"#,
            LEFT - 8.0,
            y + 4.0
        );
        tick += step;
    }

    for (i, bar) in spec.bars.iter().enumerate() {
        let x = LEFT + i as f32 * slot + (slot - bar_w) / 2.0;
        let h = bar.count as f32 * scale;
        let y = TOP + plot_h - h;
        let cx = x + bar_w / 2.0;
        let _ = writeln!(
            svg,
            r#"<rect x="{x:.1}" y="{y:.1}" width="{bar_w:.1}" height="{h:.1}" fill="{}"/>"#,
            bar.color.hex()
        );
        let _ = writeln!(
            svg,
            r#"<text x="{cx:.1}" y="{:.1}" font-size="12" text-anchor="middle">{}</text>"#,
            y - 4.0,
            bar.count
        );
        let ly = TOP + plot_h + 16.0;
        let _ = writeln!(
            svg,
            r#"<text x="{cx:.1}" y="{ly:.1}" font-size="12" text-anchor="end" transform="rotate(-45 {cx:.1} {ly:.1})">{}</text>"#,
            escape_xml(&bar.label)
        );
    }

    // axes
    let _ = writeln!(
        svg,
        r#"<line x1="{LEFT}" y1="{TOP}" x2="{LEFT}" y2="{:.1}" stroke="black"/>"#,
        TOP + plot_h
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{LEFT}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="black"/>"#,
        TOP + plot_h,
        LEFT + plot_w,
        TOP + plot_h
    );
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" font-size="14" text-anchor="middle">{}</text>"#,
        LEFT + plot_w / 2.0,
        H - 12.0,
        escape_xml(&spec.x_label)
    );
    let _ = writeln!(
        svg,
        r#"<text x="20" y="{:.1}" font-size="14" text-anchor="middle" transform="rotate(-90 20 {:.1})">{}</text>"#,
        TOP + plot_h / 2.0,
        TOP + plot_h / 2.0,
        escape_xml(&spec.y_label)
    );
    svg.push_str("</svg>\n");
    svg
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
