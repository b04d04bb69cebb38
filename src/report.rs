//! Paginated PDF report: plot, insights, distribution chart and the scene table.
//!
//! Uses the PDF base-14 Helvetica family with WinAnsi encoding, so no font
//! files are embedded. Text outside Latin-1 is replaced by `?`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::io::Write;
use tracing::{debug, warn};

use crate::chart::ChartSpec;
use crate::models::LabeledScene;

pub const REPORT_HEADER: &str = "Cinemood: Movie Emotion Analysis Report";
pub const CHART_PLACEHOLDER: &str = "[Emotion graph unavailable]";

const PAGE_W: f32 = 595.28;
const PAGE_H: f32 = 841.89;
const MARGIN: f32 = 42.52; // 15mm
const CONTENT_TOP: f32 = 64.0;
const CONTENT_BOTTOM: f32 = PAGE_H - 48.0;
const MM: f32 = 2.835;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
    Italic,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Italic => "F3",
        }
    }
}

pub struct ReportInput<'a> {
    pub title: &'a str,
    pub plot: &'a str,
    pub insights: &'a str,
    pub chart: Option<&'a ChartSpec>,
    pub scenes: &'a [LabeledScene],
    pub generated_at: DateTime<Utc>,
}

pub fn render_pdf(input: &ReportInput<'_>) -> Result<Vec<u8>> {
    let mut doc = Layout::new();

    doc.text_line(&format!("Analysis for: {}", input.title), Font::Bold, 16.0, 22.0);
    doc.text_line(
        &format!("Generated {}", input.generated_at.format("%Y-%m-%d %H:%M UTC")),
        Font::Italic,
        9.0,
        14.0,
    );
    doc.gap(8.0);

    doc.heading("Plot Summary Used:");
    doc.paragraph(input.plot, Font::Regular, 10.0, 14.0);
    doc.gap(10.0);

    doc.heading("Emotional Arc Insights:");
    doc.paragraph(&input.insights.replace("**", ""), Font::Regular, 10.0, 14.0);
    doc.gap(10.0);

    match input.chart {
        Some(chart) if !chart.bars.is_empty() => {
            doc.heading("Overall Emotion Distribution:");
            doc.chart(chart);
        }
        _ => {
            warn!("Chart unavailable for PDF report, drawing placeholder");
            doc.text_line(CHART_PLACEHOLDER, Font::Italic, 10.0, 14.0);
        }
    }

    if !input.scenes.is_empty() {
        doc.new_page();
        doc.heading("Scene-by-Scene Emotion Details:");
        doc.gap(6.0);
        doc.scene_table(input.scenes);
    }

    let pages = doc.finish();
    debug!("PDF layout completed - pages={}", pages.len());
    assemble(&pages, input.title, input.generated_at)
}

/* -------------------------------------------------------------------------- */
/* Layout                                                                     */
/* -------------------------------------------------------------------------- */

struct Layout {
    pages: Vec<Vec<u8>>,
    current: Vec<u8>,
    y: f32, // distance from the top edge
}

impl Layout {
    fn new() -> Self {
        let mut l = Self { pages: Vec::new(), current: Vec::new(), y: CONTENT_TOP };
        l.start_page();
        l
    }

    fn content_width(&self) -> f32 {
        PAGE_W - 2.0 * MARGIN
    }

    fn start_page(&mut self) {
        let w = text_width(REPORT_HEADER, 12.0);
        self.raw_text(REPORT_HEADER, Font::Bold, 12.0, (PAGE_W - w) / 2.0, 36.0);
        self.y = CONTENT_TOP;
    }

    fn end_page(&mut self) {
        let label = format!("Page {}", self.pages.len() + 1);
        let w = text_width(&label, 8.0);
        self.raw_text(&label, Font::Italic, 8.0, (PAGE_W - w) / 2.0, PAGE_H - 24.0);
        self.pages.push(std::mem::take(&mut self.current));
    }

    fn new_page(&mut self) {
        self.end_page();
        self.start_page();
    }

    fn ensure(&mut self, height: f32) -> bool {
        if self.y + height > CONTENT_BOTTOM {
            self.new_page();
            return true;
        }
        false
    }

    fn gap(&mut self, h: f32) {
        self.y += h;
    }

    fn finish(mut self) -> Vec<Vec<u8>> {
        self.end_page();
        self.pages
    }

    fn raw_text(&mut self, text: &str, font: Font, size: f32, x: f32, y_top: f32) {
        let _ = write!(
            self.current,
            "BT /{} {:.1} Tf {:.2} {:.2} Td (",
            font.resource(),
            size,
            x,
            PAGE_H - y_top
        );
        self.current.extend(escape_pdf(&to_latin1(text)));
        self.current.extend_from_slice(b") Tj ET\n");
    }

    fn text_line(&mut self, text: &str, font: Font, size: f32, line_h: f32) {
        self.ensure(line_h);
        self.raw_text(text, font, size, MARGIN, self.y + size);
        self.y += line_h;
    }

    fn heading(&mut self, text: &str) {
        // keep a heading with at least a couple of lines of its body
        self.ensure(48.0);
        self.text_line(text, Font::Bold, 12.0, 20.0);
    }

    fn paragraph(&mut self, text: &str, font: Font, size: f32, line_h: f32) {
        for line in wrap(text, size, self.content_width()) {
            self.text_line(&line, font, size, line_h);
        }
    }

    fn fill_rect(&mut self, x: f32, y_top: f32, w: f32, h: f32, rgb: (f32, f32, f32)) {
        let _ = writeln!(
            self.current,
            "{:.3} {:.3} {:.3} rg {:.2} {:.2} {:.2} {:.2} re f 0 0 0 rg",
            rgb.0,
            rgb.1,
            rgb.2,
            x,
            PAGE_H - y_top - h,
            w,
            h
        );
    }

    fn stroke_rect(&mut self, x: f32, y_top: f32, w: f32, h: f32) {
        let _ = writeln!(self.current, "0.5 w {:.2} {:.2} {:.2} {:.2} re S", x, PAGE_H - y_top - h, w, h);
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let _ = writeln!(
            self.current,
            "0.7 w {:.2} {:.2} m {:.2} {:.2} l S",
            x1,
            PAGE_H - y1,
            x2,
            PAGE_H - y2
        );
    }

    fn chart(&mut self, spec: &ChartSpec) {
        let width = self.content_width() * 0.8;
        let height = width * 0.5;
        let label_band = 16.0;
        self.ensure(height + label_band + 12.0);

        let x0 = MARGIN + 24.0;
        let top = self.y + 12.0;
        let base = top + height;
        let max = spec.max_count().max(1) as f32;
        let slot = (width - 24.0) / spec.bars.len().max(1) as f32;
        let bar_w = slot * 0.7;

        for (i, bar) in spec.bars.iter().enumerate() {
            let h = bar.count as f32 / max * (height - 12.0);
            let x = x0 + i as f32 * slot + (slot - bar_w) / 2.0;
            self.fill_rect(x, base - h, bar_w, h, bar.color.unit());

            let count = bar.count.to_string();
            let cw = text_width(&count, 8.0);
            self.raw_text(&count, Font::Regular, 8.0, x + (bar_w - cw) / 2.0, base - h - 2.0);

            let label = truncate_to_width(&bar.label, 7.0, slot - 2.0);
            let lw = text_width(&label, 7.0);
            self.raw_text(&label, Font::Regular, 7.0, x + (bar_w - lw) / 2.0, base + 10.0);
        }
        self.line(x0, top, x0, base);
        self.line(x0, base, x0 + width - 24.0, base);

        self.y = base + label_band + 8.0;
    }

    fn scene_table(&mut self, scenes: &[LabeledScene]) {
        let scene_w = 15.0 * MM;
        let emotion_w = 25.0 * MM;
        let score_w = 15.0 * MM;
        let chunk_w = self.content_width() - scene_w - emotion_w - score_w - 5.0 * MM;
        let widths = [scene_w, emotion_w, score_w, chunk_w];
        let line_h = 10.0;
        let pad = 3.0;
        let max_lines = ((CONTENT_BOTTOM - CONTENT_TOP - 40.0) / line_h) as usize;

        self.table_header(&widths);
        for scene in scenes {
            let mut chunk_lines = wrap(&scene.text, 8.0, chunk_w - 2.0 * pad);
            if chunk_lines.len() > max_lines {
                chunk_lines.truncate(max_lines);
                if let Some(last) = chunk_lines.last_mut() {
                    last.push_str(" ...");
                }
            }
            let row_h = chunk_lines.len().max(1) as f32 * line_h + 2.0 * pad;
            if self.ensure(row_h) {
                self.table_header(&widths);
            }

            let cells = [
                vec![scene.index.to_string()],
                vec![truncate_to_width(&scene.emotion, 8.0, emotion_w - 2.0 * pad)],
                vec![format!("{:.4}", scene.score)],
                chunk_lines,
            ];
            let mut x = MARGIN;
            for (col, (w, lines)) in widths.iter().zip(cells.iter()).enumerate() {
                self.stroke_rect(x, self.y, *w, row_h);
                for (n, line) in lines.iter().enumerate() {
                    let tx = if col == 3 { x + pad } else { x + (w - text_width(line, 8.0)) / 2.0 };
                    self.raw_text(line, Font::Regular, 8.0, tx, self.y + pad + 8.0 + n as f32 * line_h);
                }
                x += w;
            }
            self.y += row_h;
        }
    }

    fn table_header(&mut self, widths: &[f32; 4]) {
        let h = 7.0 * MM;
        self.ensure(h);
        let mut x = MARGIN;
        for (w, name) in widths.iter().zip(["Scene", "Emotion", "Score", "Chunk Text"]) {
            self.stroke_rect(x, self.y, *w, h);
            let tw = text_width(name, 9.0);
            self.raw_text(name, Font::Bold, 9.0, x + (w - tw) / 2.0, self.y + h / 2.0 + 3.0);
            x += w;
        }
        self.y += h;
    }
}

/* -------------------------------------------------------------------------- */
/* Text metrics and encoding                                                  */
/* -------------------------------------------------------------------------- */

// Helvetica advance widths for 0x20..=0x7E, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

fn char_width(b: u8) -> u16 {
    match b {
        0x20..=0x7E => HELVETICA_WIDTHS[(b - 0x20) as usize],
        _ => 556,
    }
}

fn text_width(text: &str, size: f32) -> f32 {
    to_latin1(text).iter().map(|b| char_width(*b) as f32).sum::<f32>() * size / 1000.0
}

/// Latin-1 bytes; anything else (and the C1 range WinAnsi reassigns) becomes `?`.
pub fn to_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x09 | 0x0A | 0x0D => b' ',
            0x00..=0x1F => b' ',
            0x80..=0x9F => b'?',
            cp @ 0x20..=0xFF => cp as u8,
            _ => b'?',
        })
        .collect()
}

fn escape_pdf(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    for &b in bytes {
        if matches!(b, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(b);
    }
    out
}

fn truncate_to_width(text: &str, size: f32, max_w: f32) -> String {
    if text_width(text, size) <= max_w {
        return text.to_string();
    }
    let mut out = String::new();
    for c in text.chars() {
        out.push(c);
        if text_width(&format!("{}..", out), size) > max_w {
            out.pop();
            break;
        }
    }
    format!("{}..", out)
}

/// Greedy word wrap; words wider than the line are split by character.
fn wrap(text: &str, size: f32, max_w: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for para in text.split('\n') {
        let mut line = String::new();
        for word in para.split_whitespace() {
            let candidate = if line.is_empty() { word.to_string() } else { format!("{} {}", line, word) };
            if text_width(&candidate, size) <= max_w {
                line = candidate;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if text_width(word, size) <= max_w {
                line = word.to_string();
            } else {
                for c in word.chars() {
                    line.push(c);
                    if text_width(&line, size) > max_w {
                        line.pop();
                        lines.push(std::mem::take(&mut line));
                        line.push(c);
                    }
                }
            }
        }
        lines.push(line);
    }
    // collapse runs of blank lines produced by blank paragraphs
    lines.dedup_by(|a, b| a.is_empty() && b.is_empty());
    lines
}

/* -------------------------------------------------------------------------- */
/* File assembly                                                              */
/* -------------------------------------------------------------------------- */

fn assemble(pages: &[Vec<u8>], title: &str, generated_at: DateTime<Utc>) -> Result<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = Vec::new();
    buf.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

    let first_page = 7;
    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", first_page + 2 * i))
        .collect();

    let mut begin = |buf: &mut Vec<u8>, id: usize| -> Result<()> {
        debug_assert_eq!(offsets.len() + 1, id);
        offsets.push(buf.len());
        write!(buf, "{} 0 obj\n", id)?;
        Ok(())
    };

    begin(&mut buf, 1)?;
    buf.extend_from_slice(b"<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

    begin(&mut buf, 2)?;
    write!(buf, "<< /Type /Pages /Kids [{}] /Count {} >>\nendobj\n", kids.join(" "), pages.len())?;

    for (id, base) in [(3, "Helvetica"), (4, "Helvetica-Bold"), (5, "Helvetica-Oblique")] {
        begin(&mut buf, id)?;
        write!(
            buf,
            "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>\nendobj\n",
            base
        )?;
    }

    begin(&mut buf, 6)?;
    buf.extend_from_slice(b"<< /Title (");
    buf.extend(escape_pdf(&to_latin1(title)));
    write!(
        buf,
        ") /Producer (cinemood {}) /CreationDate (D:{}Z) >>\nendobj\n",
        env!("CARGO_PKG_VERSION"),
        generated_at.format("%Y%m%d%H%M%S")
    )?;

    for (i, content) in pages.iter().enumerate() {
        let page_id = first_page + 2 * i;
        begin(&mut buf, page_id)?;
        write!(
            buf,
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
             /Resources << /Font << /F1 3 0 R /F2 4 0 R /F3 5 0 R >> >> /Contents {} 0 R >>\nendobj\n",
            PAGE_W,
            PAGE_H,
            page_id + 1
        )?;

        begin(&mut buf, page_id + 1)?;
        write!(buf, "<< /Length {} >>\nstream\n", content.len())?;
        buf.extend_from_slice(content);
        buf.extend_from_slice(b"\nendstream\nendobj\n");
    }

    let xref_at = buf.len();
    write!(buf, "xref\n0 {}\n0000000000 65535 f \n", offsets.len() + 1)?;
    for off in &offsets {
        write!(buf, "{:010} 00000 n \n", off)?;
    }
    write!(
        buf,
        "trailer\n<< /Size {} /Root 1 0 R /Info 6 0 R >>\nstartxref\n{}\n%%EOF\n",
        offsets.len() + 1,
        xref_at
    )?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::build_chart;

    fn scenes(n: usize) -> Vec<LabeledScene> {
        (1..=n)
            .map(|i| LabeledScene {
                index: i,
                text: format!("Scene {} where the (hero) walks through a long corridor full of doors.", i),
                emotion: if i % 2 == 0 { "joy".into() } else { "fear".into() },
                score: 0.8765,
            })
            .collect()
    }

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle.as_bytes())
    }

    fn count(haystack: &[u8], needle: &str) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle.as_bytes()).count()
    }

    fn input<'a>(scenes: &'a [LabeledScene], chart: Option<&'a ChartSpec>, plot: &'a str) -> ReportInput<'a> {
        ReportInput {
            title: "Inception",
            plot,
            insights: "The analysis covers 2 emotional scenes (excluding neutral).\n\n1. **Joy** appears in 1 scenes (50.0%)\n",
            chart,
            scenes,
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn document_is_structurally_complete() {
        let s = scenes(4);
        let chart = build_chart(&s);
        let pdf = render_pdf(&input(&s, chart.as_ref(), "Cobb enters the dream.")).unwrap();

        assert!(pdf.starts_with(b"%PDF-1.4"));
        assert!(pdf.ends_with(b"%%EOF\n"));
        assert!(contains(&pdf, "(Analysis for: Inception)"));
        assert!(contains(&pdf, "(Overall Emotion Distribution:)"));
        assert!(contains(&pdf, "(Scene-by-Scene Emotion Details:)"));
        assert!(contains(&pdf, "(Page 2)"));
        // markdown bold is stripped from insights
        assert!(contains(&pdf, "(1. Joy appears in 1 scenes \\(50.0%\\))"));
        assert!(!contains(&pdf, CHART_PLACEHOLDER));
    }

    #[test]
    fn missing_chart_draws_placeholder() {
        let s = scenes(2);
        let pdf = render_pdf(&input(&s, None, "Plot.")).unwrap();
        assert!(contains(&pdf, CHART_PLACEHOLDER));
        assert!(!contains(&pdf, "(Overall Emotion Distribution:)"));
    }

    #[test]
    fn non_latin1_text_is_replaced_not_fatal() {
        let s = scenes(1);
        let pdf = render_pdf(&input(&s, None, "Chihiro enters 湯屋 — café")).unwrap();
        assert!(contains(&pdf, "Chihiro enters ?? ? caf"));
    }

    #[test]
    fn long_tables_paginate_with_repeated_header() {
        let s = scenes(120);
        let chart = build_chart(&s);
        let pdf = render_pdf(&input(&s, chart.as_ref(), "Plot.")).unwrap();
        let pages = count(&pdf, "/Type /Page ");
        assert!(pages >= 3, "pages={}", pages);
        assert!(count(&pdf, "(Chunk Text)") >= pages - 1);
        assert!(contains(&pdf, &format!("/Count {}", pages)));
    }

    #[test]
    fn wrap_respects_width_and_keeps_words() {
        let lines = wrap("one two three four five six seven eight nine ten", 10.0, 80.0);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| text_width(l, 10.0) <= 80.0));
        assert_eq!(lines.join(" "), "one two three four five six seven eight nine ten");
    }

    #[test]
    fn wrap_breaks_overlong_words() {
        let lines = wrap(&"x".repeat(200), 10.0, 50.0);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| text_width(l, 10.0) <= 50.0));
    }

    #[test]
    fn latin1_mapping() {
        assert_eq!(to_latin1("é"), vec![0xE9]);
        assert_eq!(to_latin1("日"), b"?".to_vec());
        assert_eq!(to_latin1("a\tb"), b"a b".to_vec());
    }
}
