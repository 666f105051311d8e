use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{info, warn};

use nw_core::article::{first_in_list, join_byline};
use nw_core::{CanonicalArticle, Result, Source};

use crate::config::ProviderSettings;
use crate::providers::{send_for_text, FetchOutcome, Provider};

/// NewsData.io `latest` feed. Quota exhaustion can arrive as a 429 or as a
/// success-shaped payload whose status/message/code mentions the limit.
pub struct NewsData {
    client: Client,
    settings: ProviderSettings,
}

#[derive(Debug, Deserialize)]
struct NewsDataResponse {
    status: Option<String>,
    message: Option<String>,
    code: Option<String>,
    #[serde(default)]
    results: Vec<NewsDataArticle>,
}

#[derive(Debug, Deserialize)]
struct NewsDataArticle {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    link: Option<String>,
    image_url: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    source_id: Option<String>,
    source_name: Option<String>,
    creator: Option<CreatorField>,
    #[serde(default)]
    category: Vec<String>,
}

/// The byline arrives either as a single string or as a list of names.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CreatorField {
    One(String),
    Many(Vec<String>),
}

impl NewsData {
    pub fn new(client: Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }
}

fn limit_reached(status: StatusCode, payload: &NewsDataResponse) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    let status_text = payload.status.as_deref().unwrap_or("").to_lowercase();
    let message = payload.message.as_deref().unwrap_or("").to_lowercase();
    let code = payload.code.as_deref().unwrap_or("").to_lowercase();
    message.contains("limit")
        || message.contains("rate")
        || status_text == "rate limit exceeded"
        || code == "429"
        || code == "rate limit exceeded"
}

fn map_article(raw: NewsDataArticle) -> CanonicalArticle {
    let author = match raw.creator {
        Some(CreatorField::Many(names)) => join_byline(&names),
        Some(CreatorField::One(name)) => {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        None => None,
    };
    CanonicalArticle {
        source: Source::resolve(raw.source_id, raw.source_name, raw.link.as_deref()),
        author,
        title: raw.title,
        description: raw.description,
        url: raw.link,
        image_url: raw.image_url,
        published_at: raw.pub_date,
        content: raw.content,
        category: first_in_list(&raw.category).map(str::to_string),
    }
}

#[async_trait]
impl Provider for NewsData {
    fn name(&self) -> &'static str {
        "newsdata"
    }

    async fn fetch(&self, query: &str, language: Option<&str>) -> Result<FetchOutcome> {
        let Some(api_key) = self.settings.api_key.as_deref() else {
            info!(provider = self.name(), "API key not configured; skipping fetch");
            return Ok(FetchOutcome::Skipped);
        };

        let mut params = vec![
            ("apikey", api_key.to_string()),
            ("q", query.to_string()),
            ("size", self.settings.max_results.to_string()),
        ];
        if let Some(language) = language {
            params.push(("language", language.to_string()));
        }

        let request = self
            .client
            .get(&self.settings.base_url)
            .query(&params)
            .header("X-ACCESS-KEY", api_key);
        let (status, body) = match send_for_text(request).await {
            Ok(result) => result,
            Err(e) => {
                warn!(provider = self.name(), error = %e, "request failed");
                return Ok(FetchOutcome::Failed(e.to_string()));
            }
        };

        let payload: NewsDataResponse = match serde_json::from_str(&body) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(provider = self.name(), error = %e, "unparseable payload; skipping results");
                return Ok(FetchOutcome::Failed(e.to_string()));
            }
        };

        if !status.is_success() || payload.status.as_deref() != Some("success") {
            if limit_reached(status, &payload) {
                warn!(provider = self.name(), "rate limit reached; skipping until quota resets");
                return Ok(FetchOutcome::RateLimited);
            }
            warn!(provider = self.name(), %status, message = ?payload.message, "non-success response");
            return Ok(FetchOutcome::Failed(format!("status {}", status)));
        }

        let articles = payload
            .results
            .into_iter()
            .take(self.settings.max_results)
            .map(map_article)
            .collect();
        Ok(FetchOutcome::Articles(articles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_detection() {
        let payload: NewsDataResponse = serde_json::from_str(
            r#"{"status": "error", "message": "Rate limit exceeded", "code": "429"}"#,
        )
        .unwrap();
        assert!(limit_reached(StatusCode::OK, &payload));

        let payload: NewsDataResponse =
            serde_json::from_str(r#"{"status": "error", "message": "bad parameter"}"#).unwrap();
        assert!(!limit_reached(StatusCode::BAD_REQUEST, &payload));
        assert!(limit_reached(StatusCode::TOO_MANY_REQUESTS, &payload));
    }

    #[test]
    fn test_map_article_joins_creator_list() {
        let json = r#"{
            "title": "Flood warning",
            "description": "desc",
            "content": "body",
            "link": "https://www.example.org/flood?ref=rss",
            "image_url": "https://example.org/img.png",
            "pubDate": "2024-03-04 08:30:00",
            "source_id": "example",
            "source_name": "Example Org",
            "creator": ["Ana Ruiz", "Bo Chen"],
            "category": ["", "environment", "world"]
        }"#;
        let raw: NewsDataArticle = serde_json::from_str(json).unwrap();
        let article = map_article(raw);
        assert_eq!(article.author.as_deref(), Some("Ana Ruiz, Bo Chen"));
        assert_eq!(article.category.as_deref(), Some("environment"));
        assert_eq!(article.source.id.as_deref(), Some("example"));
    }

    #[test]
    fn test_map_article_string_creator() {
        let json = r#"{"title": "t", "creator": "Solo Writer", "category": []}"#;
        let raw: NewsDataArticle = serde_json::from_str(json).unwrap();
        let article = map_article(raw);
        assert_eq!(article.author.as_deref(), Some("Solo Writer"));
        assert_eq!(article.category, None);
    }
}
