use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{info, warn};

use nw_core::article::pick_category;
use nw_core::{CanonicalArticle, Result, Source};

use crate::config::ProviderSettings;
use crate::providers::{send_for_text, FetchOutcome, Provider};

/// Guardian Content API. Results sit under a nested `response` envelope and
/// the interesting fields are requested explicitly via `show-fields`.
pub struct Guardian {
    client: Client,
    settings: ProviderSettings,
}

#[derive(Debug, Deserialize)]
struct GuardianEnvelope {
    response: Option<GuardianResponse>,
}

#[derive(Debug, Deserialize)]
struct GuardianResponse {
    status: Option<String>,
    #[serde(default)]
    results: Vec<GuardianItem>,
}

#[derive(Debug, Deserialize)]
struct GuardianItem {
    #[serde(rename = "webTitle")]
    web_title: Option<String>,
    #[serde(rename = "webUrl")]
    web_url: Option<String>,
    #[serde(rename = "webPublicationDate")]
    web_publication_date: Option<String>,
    #[serde(rename = "sectionId")]
    section_id: Option<String>,
    #[serde(rename = "sectionName")]
    section_name: Option<String>,
    #[serde(default)]
    fields: GuardianFields,
}

#[derive(Debug, Default, Deserialize)]
struct GuardianFields {
    #[serde(rename = "trailText")]
    trail_text: Option<String>,
    thumbnail: Option<String>,
    byline: Option<String>,
}

impl Guardian {
    pub fn new(client: Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }
}

fn map_article(raw: GuardianItem) -> CanonicalArticle {
    CanonicalArticle {
        source: Source::resolve(
            raw.section_id,
            Some("The Guardian".to_string()),
            raw.web_url.as_deref(),
        ),
        author: raw.fields.byline,
        title: raw.web_title,
        description: raw.fields.trail_text,
        url: raw.web_url,
        image_url: raw.fields.thumbnail,
        published_at: raw.web_publication_date,
        content: None,
        category: pick_category([raw.section_name.as_deref()]),
    }
}

#[async_trait]
impl Provider for Guardian {
    fn name(&self) -> &'static str {
        "guardian"
    }

    async fn fetch(&self, query: &str, language: Option<&str>) -> Result<FetchOutcome> {
        let Some(api_key) = self.settings.api_key.as_deref() else {
            info!(provider = self.name(), "API key not configured; skipping fetch");
            return Ok(FetchOutcome::Skipped);
        };

        let mut params = vec![
            ("api-key", api_key.to_string()),
            ("q", query.to_string()),
            ("page-size", self.settings.max_results.to_string()),
            ("order-by", "newest".to_string()),
            ("show-fields", "trailText,thumbnail,byline".to_string()),
        ];
        if let Some(language) = language {
            params.push(("lang", language.to_string()));
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

        let payload: GuardianEnvelope = match serde_json::from_str(&body) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(provider = self.name(), error = %e, "unparseable payload; skipping results");
                return Ok(FetchOutcome::Failed(e.to_string()));
            }
        };
        let Some(response) = payload.response else {
            warn!(provider = self.name(), "payload missing response envelope");
            return Ok(FetchOutcome::Failed("missing response envelope".to_string()));
        };
        if response.status.as_deref() != Some("ok") {
            warn!(provider = self.name(), status = ?response.status, "response not ok");
            return Ok(FetchOutcome::Failed("response not ok".to_string()));
        }

        let articles = response
            .results
            .into_iter()
            .take(self.settings.max_results)
            .map(map_article)
            .collect();
        Ok(FetchOutcome::Articles(articles))
    }
}
