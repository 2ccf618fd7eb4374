// src/ingest/jikan.rs
// Catalog source backed by the Jikan REST API (top-anime listing).

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::source::{CatalogSource, RawPage, SourceError};
use crate::config::SourceConfig;

pub const DEFAULT_BASE_URL: &str = "https://api.jikan.moe/v4";

pub struct JikanSource {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TopAnimePage {
    #[serde(default)]
    data: Vec<Value>,
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    has_next_page: Option<bool>,
}

impl JikanSource {
    pub fn from_config(cfg: &SourceConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout())
            .build()
            .context("building http client")?;
        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn top_anime_url(&self) -> String {
        format!("{}/top/anime", self.base_url)
    }

    fn parse_page_body(body: &str) -> Result<RawPage, SourceError> {
        let page: TopAnimePage = serde_json::from_str(body)
            .map_err(|e| SourceError::Other(format!("decoding page body: {e}")))?;
        Ok(RawPage {
            records: page.data,
            has_next_page: page.pagination.and_then(|p| p.has_next_page),
        })
    }
}

/// Maps reqwest transport failures onto the classified source error.
fn classify_transport(err: reqwest::Error) -> SourceError {
    if err.is_timeout() {
        SourceError::Timeout
    } else {
        SourceError::Other(err.to_string())
    }
}

#[async_trait]
impl CatalogSource for JikanSource {
    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<RawPage, SourceError> {
        let resp = self
            .client
            .get(self.top_anime_url())
            .query(&[("page", page), ("limit", per_page)])
            .send()
            .await
            .map_err(classify_transport)?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited);
        }
        if !status.is_success() {
            return Err(SourceError::Other(format!("unexpected status {status}")));
        }

        let body = resp.text().await.map_err(classify_transport)?;
        Self::parse_page_body(&body)
    }

    fn name(&self) -> &'static str {
        "jikan"
    }
}
