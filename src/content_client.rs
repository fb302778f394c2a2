//! Client for the blog's generated-content endpoints (daily English patterns, IT news).

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time;

use crate::error_chain_fmt;

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(30);
const PATTERNS_PATH: &str = "/api/generate-english";
const NEWS_PATH: &str = "/api/generate-news";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PatternsResponse {
    #[serde(default)]
    pub day: u32,
    pub patterns: Vec<PatternItem>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PatternItem {
    pub pattern: String,
    pub meaning: String,
    #[serde(default)]
    pub meaning_ja: Option<String>,
    #[serde(default)]
    pub examples: Vec<PatternExample>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PatternExample {
    pub sentence: String,
    pub translation: String,
    #[serde(default)]
    pub translation_ja: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewsResponse {
    pub date: String,
    pub sources: Vec<NewsSource>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewsSource {
    pub title: LocalizedText,
    pub url: String,
    pub summary: LocalizedText,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LocalizedText {
    pub original: String,
    pub ko: String,
    pub ja: String,
    pub en: String,
}

impl LocalizedText {
    /// Korean text, falling back to the original wording.
    pub fn korean(&self) -> &str {
        if self.ko.trim().is_empty() {
            &self.original
        } else {
            &self.ko
        }
    }
}

#[derive(thiserror::Error)]
pub enum ContentError {
    #[error("영어 패턴 콘텐츠를 가져오지 못했습니다.")]
    Patterns(#[source] FetchError),
    #[error("IT 뉴스 콘텐츠를 가져오지 못했습니다.")]
    News(#[source] FetchError),
}

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("request failed")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),
    #[error("response is not valid content JSON")]
    InvalidJson(#[from] serde_json::Error),
}

impl std::fmt::Debug for ContentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

pub struct ContentClient {
    http_client: Client,
    base_url: String,
}

impl ContentClient {
    pub fn new(
        base_url: String,
        timeout: Option<time::Duration>,
    ) -> Result<ContentClient, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()?;

        Ok(ContentClient {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[tracing::instrument(name = "Fetching English patterns", skip(self))]
    pub async fn fetch_patterns(&self) -> Result<PatternsResponse, ContentError> {
        self.fetch(PATTERNS_PATH).await.map_err(ContentError::Patterns)
    }

    #[tracing::instrument(name = "Fetching IT news", skip(self))]
    pub async fn fetch_news(&self) -> Result<NewsResponse, ContentError> {
        self.fetch(NEWS_PATH).await.map_err(ContentError::News)
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let response = self
            .http_client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::UnexpectedStatus(response.status().as_u16()));
        }

        let text = response.text().await?;
        parse_lenient(&text)
    }
}

/// Parses generated JSON, tolerating prose around the object.
///
/// Generated payloads sometimes arrive wrapped in a sentence or a code fence, so when the
/// whole text is not valid JSON the outermost `{ ... }` span is tried instead.
pub fn parse_lenient<T: DeserializeOwned>(text: &str) -> Result<T, FetchError> {
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(err) => match (text.find('{'), text.rfind('}')) {
            (Some(start), Some(end)) if start < end => {
                Ok(serde_json::from_str(&text[start..=end])?)
            }
            _ => Err(err.into()),
        },
    }
}
