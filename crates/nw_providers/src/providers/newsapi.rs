use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::warn;

use nw_core::{CanonicalArticle, Error, Result, Source};

use crate::config::ProviderSettings;
use crate::providers::{FetchOutcome, Provider};

/// NewsAPI.org `everything` search. This is the system's primary data
/// source: a missing credential is a configuration error and upstream
/// failures propagate to the caller instead of degrading silently.
pub struct NewsApi {
    client: Client,
    settings: ProviderSettings,
    sort_by: String,
}

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    status: Option<String>,
    message: Option<String>,
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
struct NewsApiArticle {
    source: Option<NewsApiSource>,
    author: Option<String>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(rename = "urlToImage")]
    url_to_image: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSource {
    id: Option<String>,
    name: Option<String>,
}

impl NewsApi {
    pub fn new(client: Client, settings: ProviderSettings, sort_by: String) -> Self {
        Self {
            client,
            settings,
            sort_by,
        }
    }
}

fn map_article(raw: NewsApiArticle) -> CanonicalArticle {
    let (id, name) = raw
        .source
        .map(|s| (s.id, s.name))
        .unwrap_or((None, None));
    CanonicalArticle {
        source: Source::resolve(id, name, raw.url.as_deref()),
        author: raw.author,
        title: raw.title,
        description: raw.description,
        url: raw.url,
        image_url: raw.url_to_image,
        published_at: raw.published_at,
        content: raw.content,
        category: None,
    }
}

#[async_trait]
impl Provider for NewsApi {
    fn name(&self) -> &'static str {
        "newsapi"
    }

    fn required(&self) -> bool {
        true
    }

    async fn fetch(&self, query: &str, language: Option<&str>) -> Result<FetchOutcome> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("NEWS_API_KEY is not configured".to_string()))?;

        let mut params = vec![
            ("q", query.to_string()),
            ("pageSize", self.settings.max_results.to_string()),
            ("sortBy", self.sort_by.clone()),
            ("apiKey", api_key.to_string()),
        ];
        if let Some(language) = language {
            params.push(("language", language.to_string()));
        }

        let response = self
            .client
            .get(&self.settings.base_url)
            .query(&params)
            .header("X-Api-Key", api_key)
            .header("Authorization", api_key)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(provider = self.name(), "rate limit reached; skipping until quota resets");
            return Ok(FetchOutcome::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!(
                "NewsAPI responded with {}: {}",
                status, body
            )));
        }

        let payload: NewsApiResponse = response.json().await?;
        if payload.status.as_deref() != Some("ok") {
            return Err(Error::Upstream(
                payload.message.unwrap_or_else(|| "NewsAPI error".to_string()),
            ));
        }

        let articles = payload
            .articles
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
            "source": {"id": null, "name": "CoinDesk"},
            "author": "Jane Doe",
            "title": "Markets Rally",
            "description": "Stocks climbed today",
            "url": "https://www.coindesk.com/rally?ref=home",
            "urlToImage": "https://coindesk.com/image.jpg",
            "publishedAt": "2024-01-15T10:00:00Z",
            "content": "Full excerpt here"
        }"#;
        let raw: NewsApiArticle = serde_json::from_str(json).unwrap();
        let article = map_article(raw);
        assert_eq!(article.source.name.as_deref(), Some("CoinDesk"));
        // id was null, falls back to hostname
        assert_eq!(article.source.id.as_deref(), Some("coindesk.com"));
        assert_eq!(article.author.as_deref(), Some("Jane Doe"));
        assert_eq!(article.category, None);
    }

    #[test]
    fn test_response_without_articles() {
        let payload: NewsApiResponse =
            serde_json::from_str(r#"{"status": "error", "message": "apiKeyInvalid"}"#).unwrap();
        assert_eq!(payload.status.as_deref(), Some("error"));
        assert!(payload.articles.is_empty());
    }
}
