use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{info, warn};

use nw_core::article::pick_category;
use nw_core::{CanonicalArticle, Result, Source};

use crate::config::ProviderSettings;
use crate::providers::{send_for_text, FetchOutcome, Provider};

const NYT_IMAGE_BASE: &str = "https://static01.nyt.com/";

/// New York Times Article Search. The multimedia block has shipped in two
/// shapes over time (keyed object and list), so both are probed for the
/// first usable image URL; relative URLs are rewritten against the NYT
/// static host.
pub struct Nyt {
    client: Client,
    settings: ProviderSettings,
}

#[derive(Debug, Deserialize)]
struct NytEnvelope {
    response: Option<NytResponse>,
}

#[derive(Debug, Deserialize)]
struct NytResponse {
    #[serde(default)]
    docs: Vec<NytDoc>,
}

#[derive(Debug, Deserialize)]
struct NytDoc {
    web_url: Option<String>,
    snippet: Option<String>,
    lead_paragraph: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    pub_date: Option<String>,
    section_name: Option<String>,
    type_of_material: Option<String>,
    headline: Option<NytHeadline>,
    byline: Option<NytByline>,
    #[serde(default)]
    multimedia: Option<NytMultimedia>,
}

#[derive(Debug, Deserialize)]
struct NytHeadline {
    main: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NytByline {
    original: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NytMultimedia {
    Entries(Vec<NytMedia>),
    Keyed {
        default: Option<NytImage>,
        thumbnail: Option<NytImage>,
    },
}

#[derive(Debug, Deserialize)]
struct NytMedia {
    url: Option<String>,
    default: Option<NytImage>,
    thumbnail: Option<NytImage>,
}

#[derive(Debug, Deserialize)]
struct NytImage {
    url: Option<String>,
}

impl Nyt {
    pub fn new(client: Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }
}

fn image_from(multimedia: Option<NytMultimedia>) -> Option<String> {
    let found = match multimedia? {
        NytMultimedia::Keyed { default, thumbnail } => default
            .and_then(|image| image.url)
            .or_else(|| thumbnail.and_then(|image| image.url)),
        NytMultimedia::Entries(items) => items.into_iter().find_map(|media| {
            media
                .url
                .or_else(|| media.default.and_then(|image| image.url))
                .or_else(|| media.thumbnail.and_then(|image| image.url))
        }),
    }?;
    if found.starts_with("http") {
        Some(found)
    } else {
        Some(format!("{}{}", NYT_IMAGE_BASE, found.trim_start_matches('/')))
    }
}

fn map_article(raw: NytDoc) -> CanonicalArticle {
    CanonicalArticle {
        source: Source::resolve(
            Some("nyt".to_string()),
            Some("The New York Times".to_string()),
            raw.web_url.as_deref(),
        ),
        author: raw.byline.and_then(|b| b.original),
        title: raw.headline.and_then(|h| h.main),
        description: raw.snippet,
        url: raw.web_url,
        image_url: image_from(raw.multimedia),
        published_at: raw.pub_date,
        content: raw.lead_paragraph.or(raw.abstract_text),
        category: pick_category([
            raw.section_name.as_deref(),
            raw.type_of_material.as_deref(),
        ]),
    }
}

#[async_trait]
impl Provider for Nyt {
    fn name(&self) -> &'static str {
        "nyt"
    }

    async fn fetch(&self, query: &str, language: Option<&str>) -> Result<FetchOutcome> {
        let Some(api_key) = self.settings.api_key.as_deref() else {
            info!(provider = self.name(), "API key not configured; skipping fetch");
            return Ok(FetchOutcome::Skipped);
        };

        let mut params = vec![
            ("q", query.to_string()),
            ("sort", "newest".to_string()),
            ("api-key", api_key.to_string()),
            ("page", "0".to_string()),
        ];
        if let Some(language) = language {
            params.push(("fq", format!("language.code:(\"{}\")", language)));
        }

        let request = self.client.get(&self.settings.base_url).query(&params);
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

        let payload: NytEnvelope = match serde_json::from_str(&body) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(provider = self.name(), error = %e, "unparseable payload; skipping results");
                return Ok(FetchOutcome::Failed(e.to_string()));
            }
        };

        let docs = payload.response.map(|r| r.docs).unwrap_or_default();
        let articles = docs
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
    fn test_image_from_list_rewrites_relative() {
        let multimedia: NytMultimedia = serde_json::from_str(
            r#"[{"url": "images/2024/01/photo.jpg"}, {"url": "https://other.example/x.jpg"}]"#,
        )
        .unwrap();
        assert_eq!(
            image_from(Some(multimedia)).as_deref(),
            Some("https://static01.nyt.com/images/2024/01/photo.jpg")
        );
    }

    #[test]
    fn test_image_from_keyed_shape() {
        let multimedia: NytMultimedia = serde_json::from_str(
            r#"{"default": {"url": "https://static01.nyt.com/a.jpg"}, "thumbnail": {"url": "https://static01.nyt.com/b.jpg"}}"#,
        )
        .unwrap();
        assert_eq!(
            image_from(Some(multimedia)).as_deref(),
            Some("https://static01.nyt.com/a.jpg")
        );
        assert_eq!(image_from(None), None);
    }

    #[test]
    fn test_map_article() {
        let json = r#"{
            "web_url": "https://www.nytimes.com/2024/01/15/world/story.html",
            "snippet": "A snippet",
            "lead_paragraph": "The lead paragraph.",
            "abstract": "An abstract",
            "pub_date": "2024-01-15T10:00:00+0000",
            "section_name": "World",
            "type_of_material": "News",
            "headline": {"main": "Big Headline"},
            "byline": {"original": "By Reporter Name"},
            "multimedia": []
        }"#;
        let raw: NytDoc = serde_json::from_str(json).unwrap();
        let article = map_article(raw);
        assert_eq!(article.title.as_deref(), Some("Big Headline"));
        assert_eq!(article.author.as_deref(), Some("By Reporter Name"));
        assert_eq!(article.content.as_deref(), Some("The lead paragraph."));
        assert_eq!(article.category.as_deref(), Some("World"));
        assert_eq!(article.source.id.as_deref(), Some("nyt"));
        assert_eq!(article.image_url, None);
    }
}
