use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use nw_core::{CanonicalArticle, Result, Source};

use crate::config::ProviderSettings;
use crate::providers::{send_for_text, FetchOutcome, Provider};

/// GNews search. The free tier signals quota exhaustion with a success
/// status whose body carries a textual "limit" indicator, so the body is
/// sniffed before the typed parse.
pub struct GNews {
    client: Client,
    settings: ProviderSettings,
}

#[derive(Debug, Deserialize)]
struct GNewsResponse {
    #[serde(default)]
    articles: Vec<GNewsArticle>,
}

#[derive(Debug, Deserialize)]
struct GNewsArticle {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
    image: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    source: Option<GNewsSource>,
}

#[derive(Debug, Deserialize)]
struct GNewsSource {
    name: Option<String>,
}

impl GNews {
    pub fn new(client: Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }
}

fn value_text(value: &Value) -> String {
    value
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

fn limit_reached(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    let Ok(payload) = serde_json::from_str::<Value>(body) else {
        return false;
    };
    let mut texts: Vec<String> = Vec::new();
    match payload.get("errors") {
        Some(Value::Array(items)) => texts.extend(items.iter().map(value_text)),
        Some(other) if !other.is_null() => texts.push(value_text(other)),
        _ => {}
    }
    for key in ["message", "error"] {
        if let Some(value) = payload.get(key) {
            if !value.is_null() {
                texts.push(value_text(value));
            }
        }
    }
    texts.iter().any(|text| text.to_lowercase().contains("limit"))
}

fn map_article(raw: GNewsArticle) -> CanonicalArticle {
    let source_name = raw.source.and_then(|s| s.name);
    CanonicalArticle {
        source: Source::resolve(None, source_name, raw.url.as_deref()),
        author: None,
        title: raw.title,
        description: raw.description,
        url: raw.url,
        // GNews calls the image field `image` rather than `urlToImage`.
        image_url: raw.image,
        published_at: raw.published_at,
        content: raw.content,
        category: None,
    }
}

#[async_trait]
impl Provider for GNews {
    fn name(&self) -> &'static str {
        "gnews"
    }

    async fn fetch(&self, query: &str, language: Option<&str>) -> Result<FetchOutcome> {
        let Some(api_key) = self.settings.api_key.as_deref() else {
            info!(provider = self.name(), "API key not configured; skipping fetch");
            return Ok(FetchOutcome::Skipped);
        };

        let mut params = vec![
            ("q", query.to_string()),
            ("max", self.settings.max_results.to_string()),
            ("apikey", api_key.to_string()),
        ];
        if let Some(language) = language {
            params.push(("lang", language.to_string()));
        }

        let request = self
            .client
            .get(&self.settings.base_url)
            .query(&params)
            .header("X-Api-Key", api_key);
        let (status, body) = match send_for_text(request).await {
            Ok(result) => result,
            Err(e) => {
                warn!(provider = self.name(), error = %e, "request failed");
                return Ok(FetchOutcome::Failed(e.to_string()));
            }
        };

        if limit_reached(status, &body) {
            warn!(provider = self.name(), "daily cap reached; skipping results until quota resets");
            return Ok(FetchOutcome::RateLimited);
        }
        if !status.is_success() {
            warn!(provider = self.name(), %status, "non-success response");
            return Ok(FetchOutcome::Failed(format!("status {}", status)));
        }

        let payload: GNewsResponse = match serde_json::from_str(&body) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(provider = self.name(), error = %e, "unparseable payload; skipping results");
                return Ok(FetchOutcome::Failed(e.to_string()));
            }
        };

        let articles = payload
            .articles
            .into_iter()
            .take(self.settings.max_results)
            .map(map_article)
            .collect();
        Ok(FetchOutcome::Articles(articles))
    }
}
