use serde::{Deserialize, Serialize};
use serde_json::Value;

/* MediaWiki Action API (formatversion=2) */

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSearchResponse {
    #[serde(default)]
    pub query: Option<ApiSearchQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSearchQuery {
    #[serde(default)]
    pub search: Vec<ApiSearchHit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSearchHit {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiPageResponse {
    #[serde(default)]
    pub query: Option<ApiPageQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiPageQuery {
    #[serde(default)]
    pub pages: Vec<ApiPage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiPage {
    pub title: String,
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub extract: Option<String>,
    #[serde(default)]
    pub pageprops: Option<ApiPageProps>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiPageProps {
    #[serde(default)]
    pub disambiguation: Option<Value>, // present (usually "") on disambiguation pages
}

impl ApiPage {
    pub fn is_disambiguation(&self) -> bool {
        self.pageprops
            .as_ref()
            .map(|p| p.disambiguation.is_some())
            .unwrap_or(false)
    }
}

/* Text-classification inference endpoint */

#[derive(Debug, Clone, Serialize)]
pub struct ApiInferenceRequest<'a> {
    pub inputs: &'a [&'a str],
    pub parameters: ApiInferenceParameters,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiInferenceParameters {
    pub top_k: Option<u32>, // null asks for every label
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiLabelScore {
    pub label: String,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disambiguation_flag_is_read_from_pageprops() {
        let raw = r#"{"query":{"pages":[
            {"title":"Mercury","pageprops":{"disambiguation":""},"extract":"Mercury may refer to:"},
            {"title":"Inception","extract":"Inception is a 2010 film."}
        ]}}"#;
        let resp: ApiPageResponse = serde_json::from_str(raw).unwrap();
        let pages = resp.query.unwrap().pages;
        assert!(pages[0].is_disambiguation());
        assert!(!pages[1].is_disambiguation());
    }

    #[test]
    fn request_serializes_null_top_k() {
        let inputs = ["one", "two"];
        let req = ApiInferenceRequest {
            inputs: &inputs,
            parameters: ApiInferenceParameters { top_k: None },
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["inputs"][1], "two");
        assert!(v["parameters"]["top_k"].is_null());
    }
}
