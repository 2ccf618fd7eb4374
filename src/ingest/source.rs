// src/ingest/source.rs
// The remote-source contract and the raw-record-to-title conversion.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::catalog::{AnimeTitle, SYNOPSIS_PLACEHOLDER, UNKNOWN_LABEL};

/// Classified source failure. Every kind is retried up to the page budget;
/// the kind only selects the backoff delay.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("source rate limited the request")]
    RateLimited,
    #[error("source request timed out")]
    Timeout,
    #[error("source error: {0}")]
    Other(String),
}

impl SourceError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::RateLimited => "rate_limited",
            SourceError::Timeout => "timeout",
            SourceError::Other(_) => "other",
        }
    }
}

/// One fetched page: raw JSON records plus the source's pagination hint.
/// Records are decoded individually so one malformed entry cannot sink the
/// page.
#[derive(Debug, Default, Clone)]
pub struct RawPage {
    pub records: Vec<Value>,
    pub has_next_page: Option<bool>,
}

/// Capability consumed by the ingestor. Transport, authentication, and URL
/// construction live behind this trait.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<RawPage, SourceError>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, thiserror::Error)]
#[error("malformed record: {0}")]
pub struct MalformedRecord(pub String);

#[derive(Debug, Deserialize)]
struct RawRecord {
    title: Option<String>,
    score: Option<f64>,
    #[serde(rename = "type")]
    kind: Option<String>,
    status: Option<String>,
    episodes: Option<u32>,
    members: Option<u64>,
    popularity: Option<u32>,
    #[serde(default)]
    genres: Vec<RawGenre>,
    synopsis: Option<String>,
    aired: Option<RawAired>,
}

#[derive(Debug, Deserialize)]
struct RawGenre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawAired {
    from: Option<String>,
}

/// Converts one raw source record into a typed title. A record without a
/// usable name is malformed; everything else degrades to the documented
/// placeholders.
pub fn parse_record(value: Value) -> Result<AnimeTitle, MalformedRecord> {
    let raw: RawRecord =
        serde_json::from_value(value).map_err(|e| MalformedRecord(e.to_string()))?;

    let name = raw
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| MalformedRecord("missing title".to_string()))?;

    let genres: BTreeSet<String> = raw
        .genres
        .into_iter()
        .map(|g| g.name.trim().to_string())
        .filter(|g| !g.is_empty())
        .collect();

    let year = raw
        .aired
        .and_then(|a| a.from)
        .as_deref()
        .and_then(parse_year);

    Ok(AnimeTitle {
        name,
        kind: non_empty_or(raw.kind, UNKNOWN_LABEL),
        status: non_empty_or(raw.status, UNKNOWN_LABEL),
        rating: raw.score,
        episodes: raw.episodes,
        members: raw.members,
        popularity: raw.popularity,
        year,
        genres,
        synopsis: normalize_synopsis(raw.synopsis.as_deref()),
    })
}

fn non_empty_or(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn parse_year(ts: &str) -> Option<i32> {
    OffsetDateTime::parse(ts, &Rfc3339).ok().map(|dt| dt.year())
}

const MAL_REWRITE_TAIL: &str = "[Written by MAL Rewrite]";
const SYNOPSIS_MAX_CHARS: usize = 1500;

/// Cleans a source synopsis: entity decode, tag strip, attribution-tail
/// removal, whitespace collapse, length cap. Empty input yields the
/// placeholder.
pub fn normalize_synopsis(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return SYNOPSIS_PLACEHOLDER.to_string();
    };

    let mut out = html_escape::decode_html_entities(raw).to_string();

    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    out = out.replace(MAL_REWRITE_TAIL, "");

    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > SYNOPSIS_MAX_CHARS {
        out = out.chars().take(SYNOPSIS_MAX_CHARS).collect();
    }

    if out.is_empty() {
        SYNOPSIS_PLACEHOLDER.to_string()
    } else {
        out
    }
}
