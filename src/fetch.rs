use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api_types::*;
use crate::config::PlotSourceConfig;

const PLOT_SECTIONS: &[&str] = &["Plot", "Synopsis"];

/// Looks up plot text by movie title. `Ok(None)` means not found.
#[async_trait]
pub trait PlotSource: Send + Sync {
    async fn lookup(&self, title: &str) -> Result<Option<String>>;
}

pub struct WikipediaPlotSource {
    client: Client,
    api_base: String,
    search_limit: usize,
}

impl WikipediaPlotSource {
    pub fn new(cfg: &PlotSourceConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("Building plot source HTTP client")?;
        Ok(Self {
            client,
            api_base: cfg.api_base.clone(),
            search_limit: cfg.search_limit.max(1),
        })
    }

    async fn search(&self, title: &str) -> Result<Vec<String>> {
        let limit = self.search_limit.to_string();
        let resp: ApiSearchResponse = self
            .client
            .get(&self.api_base)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", title),
                ("srlimit", limit.as_str()),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .send()
            .await
            .with_context(|| format!("Search request failed for '{}'", title))?
            .error_for_status()
            .with_context(|| format!("Search HTTP error for '{}'", title))?
            .json()
            .await
            .with_context(|| format!("Decoding search JSON for '{}'", title))?;

        Ok(resp
            .query
            .map(|q| q.search.into_iter().map(|h| h.title).collect())
            .unwrap_or_default())
    }

    async fn page(&self, page_title: &str) -> Result<Option<ApiPage>> {
        let resp: ApiPageResponse = self
            .client
            .get(&self.api_base)
            .query(&[
                ("action", "query"),
                ("prop", "extracts|pageprops"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", page_title),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .send()
            .await
            .with_context(|| format!("Page request failed for '{}'", page_title))?
            .error_for_status()
            .with_context(|| format!("Page HTTP error for '{}'", page_title))?
            .json()
            .await
            .with_context(|| format!("Decoding page JSON for '{}'", page_title))?;

        Ok(resp
            .query
            .and_then(|q| q.pages.into_iter().next())
            .filter(|p| !p.missing))
    }
}

#[async_trait]
impl PlotSource for WikipediaPlotSource {
    async fn lookup(&self, title: &str) -> Result<Option<String>> {
        let start = std::time::Instant::now();
        info!("Fetching plot - title={}", title);

        let candidates = self.search(title).await?;
        if candidates.is_empty() {
            warn!("No Wikipedia page found - title={}", title);
            return Ok(None);
        }
        debug!("Search candidates - title={}, candidates={:?}", title, candidates);

        for candidate in &candidates {
            let Some(page) = self.page(candidate).await? else {
                warn!("Wikipedia page not found precisely - candidate={}", candidate);
                continue;
            };
            if page.is_disambiguation() {
                warn!("Disambiguation page skipped - candidate={}", page.title);
                continue;
            }
            let Some(extract) = page.extract.as_deref() else {
                continue;
            };
            if let Some(plot) = plot_from_extract(extract) {
                info!(
                    "Plot fetch completed - title={}, page={}, duration={:.2}s, chars={}",
                    title,
                    page.title,
                    start.elapsed().as_secs_f32(),
                    plot.chars().count()
                );
                return Ok(Some(plot));
            }
            warn!("No usable content on page - candidate={}", page.title);
        }

        warn!("Could not find plot for title={}", title);
        Ok(None)
    }
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(=+)\s*(.*?)\s*(=+)\s*$").expect("static regex"))
}

/// "Plot" section, else "Synopsis", else the lead text before the first heading.
pub fn plot_from_extract(extract: &str) -> Option<String> {
    for name in PLOT_SECTIONS {
        if let Some(section) = section_text(extract, name) {
            debug!("Using '{}' section", name);
            return Some(section);
        }
    }

    let lead: Vec<&str> = extract
        .lines()
        .take_while(|l| !heading_re().is_match(l.trim()))
        .collect();
    let lead = lead.join("\n").trim().to_string();
    if lead.is_empty() {
        None
    } else {
        debug!("Using page lead as plot fallback");
        Some(lead)
    }
}

/// Body of the named section, up to the next heading of any level.
pub fn section_text(extract: &str, name: &str) -> Option<String> {
    let mut lines = extract.lines();
    lines.by_ref().find(|l| {
        heading_re()
            .captures(l.trim())
            .map(|c| c[2].eq_ignore_ascii_case(name))
            .unwrap_or(false)
    })?;

    let body: Vec<&str> = lines.take_while(|l| !heading_re().is_match(l.trim())).collect();
    let body = body.join("\n").trim().to_string();
    if body.is_empty() {
        None
    } else {
        Some(body)
    }
}
