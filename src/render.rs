// src/render.rs
use crate::insights::title_case;
use crate::models::AnalysisResult;

pub fn render_markdown(title: &str, result: &AnalysisResult) -> String {
    let mut md = String::new();
    md.push_str(&format!("# Emotional Arc: {}\n\n", title.trim()));

    md.push_str("## Insights\n");
    md.push_str(&format!("{}\n\n", result.insight_text.trim()));

    if !result.emotion_totals.is_empty() {
        md.push_str("## Emotion Totals\n");
        md.push_str("| Emotion | Share of scenes |\n|---|---|\n");
        let mut totals: Vec<(&String, &f64)> = result.emotion_totals.iter().collect();
        totals.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (label, pct) in totals {
            md.push_str(&format!("| {} | {:.1}% |\n", title_case(label), pct));
        }
        md.push('\n');
    }

    if !result.scenes.is_empty() {
        md.push_str("## Scenes\n");
        for s in &result.scenes {
            md.push_str(&format!("- **{}** {} ({:.2}): {}\n", s.index, s.emotion, s.score, s.text));
        }
    }

    md
}
