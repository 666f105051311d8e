use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{info, warn};

use nw_core::article::join_byline;
use nw_core::urlnorm::hostname;
use nw_core::{CanonicalArticle, Result, Source};

use crate::config::ProviderSettings;
use crate::providers::{send_for_text, FetchOutcome, Provider};

/// World News API full-text search. Articles carry full `text`; the source
/// label falls back from the URL hostname to the reported country.
pub struct WorldNews {
    client: Client,
    settings: ProviderSettings,
}

#[derive(Debug, Deserialize)]
struct WorldNewsResponse {
    #[serde(default)]
    news: Vec<WorldNewsArticle>,
}

#[derive(Debug, Deserialize)]
struct WorldNewsArticle {
    title: Option<String>,
    summary: Option<String>,
    text: Option<String>,
    url: Option<String>,
    image: Option<String>,
    publish_date: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    source_country: Option<String>,
    category: Option<String>,
}

impl WorldNews {
    pub fn new(client: Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }
}

fn map_article(raw: WorldNewsArticle) -> CanonicalArticle {
    let label = hostname(raw.url.as_deref()).or(raw.source_country);
    CanonicalArticle {
        source: Source::resolve(label.clone(), label, raw.url.as_deref()),
        author: join_byline(&raw.authors),
        title: raw.title,
        description: raw.summary.clone(),
        url: raw.url,
        image_url: raw.image,
        published_at: raw.publish_date,
        content: raw.text.or(raw.summary),
        category: raw.category.filter(|c| !c.trim().is_empty()),
    }
}

#[async_trait]
impl Provider for WorldNews {
    fn name(&self) -> &'static str {
        "worldnews"
    }

    async fn fetch(&self, query: &str, language: Option<&str>) -> Result<FetchOutcome> {
        let Some(api_key) = self.settings.api_key.as_deref() else {
            info!(provider = self.name(), "API key not configured; skipping fetch");
            return Ok(FetchOutcome::Skipped);
        };

        let mut params = vec![
            ("api-key", api_key.to_string()),
            ("text", query.to_string()),
            ("number", self.settings.max_results.to_string()),
        ];
        if let Some(language) = language {
            params.push(("language", language.to_string()));
        }

        let request = self
            .client
            .get(&self.settings.base_url)
            .query(&params)
            .header("x-api-key", api_key);
        let (status, body) = match send_for_text(request).await {
            Ok(result) => result,
            Err(e) => {
                warn!(provider = self.name(), error = %e, "request failed");
                return Ok(FetchOutcome::Failed(e.to_string()));
            }
        };

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(provider = self.name(), "rate limit reached; skipping until quota resets");
            return Ok(FetchOutcome::RateLimited);
        }
        if !status.is_success() {
            warn!(provider = self.name(), %status, "non-success response");
            return Ok(FetchOutcome::Failed(format!("status {}", status)));
        }

        let payload: WorldNewsResponse = match serde_json::from_str(&body) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(provider = self.name(), error = %e, "unparseable payload; skipping results");
                return Ok(FetchOutcome::Failed(e.to_string()));
            }
        };

        let articles = payload
            .news
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
    fn test_map_article() {
        let json = r#"{
            "title": "Summit concludes",
            "summary": "short version",
            "text": "long version of the story",
            "url": "https://www.tagespost.de/summit",
            "image": "https://tagespost.de/img.jpg",
            "publish_date": "2024-05-01 12:00:00",
            "authors": ["K. Meyer"],
            "source_country": "de",
            "category": "politics"
        }"#;
        let raw: WorldNewsArticle = serde_json::from_str(json).unwrap();
        let article = map_article(raw);
        assert_eq!(article.source.name.as_deref(), Some("tagespost.de"));
        assert_eq!(article.author.as_deref(), Some("K. Meyer"));
        assert_eq!(article.content.as_deref(), Some("long version of the story"));
        assert_eq!(article.description.as_deref(), Some("short version"));
        assert_eq!(article.category.as_deref(), Some("politics"));
    }

    #[test]
    fn test_content_falls_back_to_summary() {
        let json = r#"{"title": "t", "summary": "only a summary", "source_country": "fr"}"#;
        let raw: WorldNewsArticle = serde_json::from_str(json).unwrap();
        let article = map_article(raw);
        assert_eq!(article.content.as_deref(), Some("only a summary"));
        // no URL, so the country code is the source label
        assert_eq!(article.source.name.as_deref(), Some("fr"));
    }
}
