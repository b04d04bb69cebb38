use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("{strategy} produced no spans for non-blank text")]
    NoSpans { strategy: &'static str },
    #[error("{strategy} failed: {reason}")]
    Failed { strategy: &'static str, reason: String },
}

/// Where the fallback chain starts. Strategies before it are treated as unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Unicode,
    Rules,
    Lines,
}

pub trait SentenceSplitter: Send + Sync {
    fn name(&self) -> &'static str;
    fn split(&self, text: &str) -> Result<Vec<String>, SegmentError>;
}

/// UAX #29 sentence boundaries, rejoined where a boundary follows an
/// abbreviation or a single initial ("Dr.", "Mr.", "J.").
pub struct UnicodeSentences;

impl SentenceSplitter for UnicodeSentences {
    fn name(&self) -> &'static str {
        "unicode"
    }

    fn split(&self, text: &str) -> Result<Vec<String>, SegmentError> {
        let mut out = Vec::new();
        let mut pending = String::new();
        for sentence in text.unicode_sentences() {
            pending.push_str(sentence);
            let trimmed = pending.trim_end();
            let after_abbreviation = trimmed
                .strip_suffix('.')
                .map(RuleSentences::is_abbreviation)
                .unwrap_or(false);
            if !after_abbreviation {
                out.push(std::mem::take(&mut pending));
            }
        }
        if !pending.is_empty() {
            out.push(pending);
        }
        Ok(out)
    }
}

const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "st", "jr", "sr", "vs", "prof", "gen", "col", "lt", "sgt", "capt", "no",
];

/// Terminal punctuation followed by whitespace and a sentence opener.
pub struct RuleSentences;

impl RuleSentences {
    fn is_abbreviation(before: &str) -> bool {
        let word = before
            .rsplit(|c: char| c.is_whitespace())
            .next()
            .unwrap_or("")
            .trim_start_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        // single initials like "J. R. R."
        ABBREVIATIONS.contains(&word.as_str()) || (word.chars().count() == 1 && word.chars().all(char::is_alphabetic))
    }
}

impl SentenceSplitter for RuleSentences {
    fn name(&self) -> &'static str {
        "rules"
    }

    fn split(&self, text: &str) -> Result<Vec<String>, SegmentError> {
        let mut out = Vec::new();
        let mut start = 0;
        let chars: Vec<(usize, char)> = text.char_indices().collect();

        let mut i = 0;
        while i < chars.len() {
            let (pos, c) = chars[i];
            if matches!(c, '.' | '!' | '?') {
                // swallow runs like "?!" or "..." and closing quotes/brackets
                let mut j = i + 1;
                while j < chars.len() && matches!(chars[j].1, '.' | '!' | '?' | '"' | '\'' | ')' | '”' | '’') {
                    j += 1;
                }
                let end = chars.get(j).map(|(p, _)| *p).unwrap_or(text.len());
                let next_opener = chars[j..]
                    .iter()
                    .skip_while(|(_, ch)| ch.is_whitespace())
                    .map(|(_, ch)| *ch)
                    .next();
                let followed_by_space = chars.get(j).map(|(_, ch)| ch.is_whitespace()).unwrap_or(true);
                let opens = next_opener
                    .map(|ch| ch.is_uppercase() || ch.is_numeric() || matches!(ch, '"' | '\'' | '“' | '‘' | '('))
                    .unwrap_or(true);

                if followed_by_space && opens && !(c == '.' && Self::is_abbreviation(&text[start..pos])) {
                    out.push(text[start..end].to_string());
                    start = end;
                }
                i = j;
                continue;
            }
            i += 1;
        }
        if start < text.len() {
            out.push(text[start..].to_string());
        }
        Ok(out)
    }
}

pub struct LineSplitter;

impl SentenceSplitter for LineSplitter {
    fn name(&self) -> &'static str {
        "lines"
    }

    fn split(&self, text: &str) -> Result<Vec<String>, SegmentError> {
        Ok(text.split('\n').map(str::to_string).collect())
    }
}

/// Ordered chain of splitters; the first one that yields spans wins.
pub struct Segmenter {
    chain: Vec<Box<dyn SentenceSplitter>>,
}

impl Segmenter {
    pub fn new(start: Strategy) -> Self {
        let all: Vec<(Strategy, Box<dyn SentenceSplitter>)> = vec![
            (Strategy::Unicode, Box::new(UnicodeSentences)),
            (Strategy::Rules, Box::new(RuleSentences)),
            (Strategy::Lines, Box::new(LineSplitter)),
        ];
        let chain = all
            .into_iter()
            .skip_while(|(s, _)| *s != start)
            .map(|(_, splitter)| splitter)
            .collect();
        Self { chain }
    }

    pub fn with_chain(chain: Vec<Box<dyn SentenceSplitter>>) -> Self {
        Self { chain }
    }

    /// Splits `text` into trimmed, non-empty scenes in original order.
    pub fn segment(&self, text: &str) -> Vec<String> {
        let normalized: String = text.nfc().collect();
        if normalized.trim().is_empty() {
            return Vec::new();
        }

        // paragraphs never share a sentence, so they can be split independently
        let paragraphs = paragraphs(&normalized);
        let scenes: Vec<String> = paragraphs
            .par_iter()
            .map(|p| self.segment_paragraph(p))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect();

        debug!(
            "Segmentation completed - paragraphs={}, scenes={}",
            paragraphs.len(),
            scenes.len()
        );
        scenes
    }

    fn segment_paragraph(&self, paragraph: &str) -> Vec<String> {
        for splitter in &self.chain {
            match splitter.split(paragraph) {
                Ok(spans) => {
                    let spans = clean(spans);
                    if !spans.is_empty() {
                        return spans;
                    }
                    warn!("{}", SegmentError::NoSpans { strategy: splitter.name() });
                }
                Err(e) => warn!("Segmentation strategy failed, falling back - error={}", e),
            }
        }
        // every strategy failed; newline split is the floor
        clean(paragraph.split('\n').map(str::to_string).collect())
    }
}

fn paragraphs(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    let mut last_end = 0;
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let blank = line.trim().is_empty();
        match (blank, start) {
            (false, None) => start = Some(offset),
            (true, Some(s)) => {
                out.push(&text[s..last_end]);
                start = None;
            }
            _ => {}
        }
        offset += line.len();
        if !blank {
            last_end = offset;
        }
    }
    if let Some(s) = start {
        out.push(&text[s..last_end]);
    }
    out
}

fn clean(spans: Vec<String>) -> Vec<String> {
    spans
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
