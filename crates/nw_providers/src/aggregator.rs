use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use nw_core::{dedupe, rank, CanonicalArticle, Error, Result};

use crate::config::ProvidersConfig;
use crate::providers::{FetchOutcome, GNews, Guardian, NewsApi, NewsData, Nyt, Provider, WorldNews};

/// How one adapter invocation went, consumable by monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Ok,
    Empty,
    Skipped,
    RateLimited,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderReport {
    pub provider: &'static str,
    pub status: FetchStatus,
    pub count: usize,
}

/// The merged, deduplicated, chronologically ranked result of one fan-out,
/// plus the per-provider outcome reports.
#[derive(Debug)]
pub struct Aggregate {
    pub articles: Vec<CanonicalArticle>,
    pub reports: Vec<ProviderReport>,
}

/// Issues the same logical query to every configured adapter, merges
/// whatever each contributes, and runs the dedupe/rank pipeline over the
/// union. Adapter calls run concurrently, each bounded by its own timeout;
/// the registration order is fixed and serves as the dedupe tie-break.
pub struct Aggregator {
    providers: Vec<Arc<dyn Provider>>,
    timeout: Duration,
}

impl Aggregator {
    pub fn new(providers: Vec<Arc<dyn Provider>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    /// Builds the full provider set in its fixed fan-out order with one
    /// shared HTTP client.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let providers: Vec<Arc<dyn Provider>> = vec![
            Arc::new(NewsApi::new(
                client.clone(),
                config.newsapi.clone(),
                config.newsapi_sort_by.clone(),
            )),
            Arc::new(GNews::new(client.clone(), config.gnews.clone())),
            Arc::new(NewsData::new(client.clone(), config.newsdata.clone())),
            Arc::new(WorldNews::new(client.clone(), config.worldnews.clone())),
            Arc::new(Guardian::new(client.clone(), config.guardian.clone())),
            Arc::new(Nyt::new(client, config.nyt.clone())),
        ];
        Ok(Self::new(providers, config.timeout))
    }

    pub async fn aggregate(&self, query: &str, language: Option<&str>) -> Result<Aggregate> {
        let calls = self.providers.iter().cloned().map(|provider| {
            let query = query.to_string();
            let language = language.map(str::to_string);
            let budget = self.timeout;
            async move {
                let result =
                    match tokio::time::timeout(budget, provider.fetch(&query, language.as_deref()))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) if provider.required() => Err(Error::Upstream(format!(
                            "{} timed out after {:?}",
                            provider.name(),
                            budget
                        ))),
                        Err(_) => {
                            warn!(provider = provider.name(), "provider timed out");
                            Ok(FetchOutcome::Failed("timed out".to_string()))
                        }
                    };
                (provider, result)
            }
        });

        let mut merged = Vec::new();
        let mut reports = Vec::new();
        for (provider, result) in join_all(calls).await {
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(e) if provider.required() => return Err(e),
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "provider failed");
                    FetchOutcome::Failed(e.to_string())
                }
            };
            let (status, count) = match outcome {
                FetchOutcome::Articles(articles) => {
                    let count = articles.len();
                    merged.extend(articles);
                    (
                        if count == 0 {
                            FetchStatus::Empty
                        } else {
                            FetchStatus::Ok
                        },
                        count,
                    )
                }
                FetchOutcome::Skipped => (FetchStatus::Skipped, 0),
                FetchOutcome::RateLimited => (FetchStatus::RateLimited, 0),
                FetchOutcome::Failed(_) => (FetchStatus::Failed, 0),
            };
            reports.push(ProviderReport {
                provider: provider.name(),
                status,
                count,
            });
        }

        let candidates = merged.len();
        let articles = rank(dedupe(merged));
        info!(
            query,
            candidates,
            results = articles.len(),
            "aggregated provider results"
        );
        Ok(Aggregate { articles, reports })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StaticProvider {
        name: &'static str,
        articles: Vec<CanonicalArticle>,
    }

    #[async_trait]
    impl Provider for StaticProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self, _query: &str, _language: Option<&str>) -> Result<FetchOutcome> {
            Ok(FetchOutcome::Articles(self.articles.clone()))
        }
    }

    struct BrokenProvider {
        required: bool,
    }

    #[async_trait]
    impl Provider for BrokenProvider {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn required(&self) -> bool {
            self.required
        }

        async fn fetch(&self, _query: &str, _language: Option<&str>) -> Result<FetchOutcome> {
            if self.required {
                Err(Error::Upstream("boom".to_string()))
            } else {
                Ok(FetchOutcome::Failed("boom".to_string()))
            }
        }
    }

    struct HungProvider;

    #[async_trait]
    impl Provider for HungProvider {
        fn name(&self) -> &'static str {
            "hung"
        }

        async fn fetch(&self, _query: &str, _language: Option<&str>) -> Result<FetchOutcome> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(FetchOutcome::Articles(vec![]))
        }
    }

    fn article(url: &str, published_at: &str) -> CanonicalArticle {
        CanonicalArticle {
            url: Some(url.to_string()),
            published_at: Some(published_at.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_failure_isolation() {
        let aggregator = Aggregator::new(
            vec![
                Arc::new(BrokenProvider { required: false }),
                Arc::new(StaticProvider {
                    name: "static",
                    articles: vec![article("https://ex.com/a", "2024-01-01T00:00:00Z")],
                }),
            ],
            Duration::from_secs(5),
        );
        let aggregate = aggregator.aggregate("anything", None).await.unwrap();
        assert_eq!(aggregate.articles.len(), 1);
        assert_eq!(aggregate.reports[0].status, FetchStatus::Failed);
        assert_eq!(aggregate.reports[1].status, FetchStatus::Ok);
    }

    #[tokio::test]
    async fn test_required_provider_error_propagates() {
        let aggregator = Aggregator::new(
            vec![
                Arc::new(BrokenProvider { required: true }),
                Arc::new(StaticProvider {
                    name: "static",
                    articles: vec![article("https://ex.com/a", "2024-01-01T00:00:00Z")],
                }),
            ],
            Duration::from_secs(5),
        );
        assert!(aggregator.aggregate("anything", None).await.is_err());
    }

    #[tokio::test]
    async fn test_timeout_is_an_isolated_failure() {
        let aggregator = Aggregator::new(
            vec![
                Arc::new(HungProvider),
                Arc::new(StaticProvider {
                    name: "static",
                    articles: vec![article("https://ex.com/a", "2024-01-01T00:00:00Z")],
                }),
            ],
            Duration::from_millis(50),
        );
        let aggregate = aggregator.aggregate("anything", None).await.unwrap();
        assert_eq!(aggregate.articles.len(), 1);
        assert_eq!(aggregate.reports[0].status, FetchStatus::Failed);
    }

    #[tokio::test]
    async fn test_provider_order_is_dedupe_tiebreak() {
        let mut first = article("https://ex.com/story?src=p1", "2024-01-02T00:00:00Z");
        first.title = Some("from p1".to_string());
        let mut second = article("https://ex.com/story", "2024-01-02T00:00:00Z");
        second.title = Some("from p2".to_string());

        let aggregator = Aggregator::new(
            vec![
                Arc::new(StaticProvider {
                    name: "p1",
                    articles: vec![first],
                }),
                Arc::new(StaticProvider {
                    name: "p2",
                    articles: vec![second, article("https://ex.com/other", "2024-01-03T00:00:00Z")],
                }),
            ],
            Duration::from_secs(5),
        );
        let aggregate = aggregator.aggregate("anything", None).await.unwrap();
        assert_eq!(aggregate.articles.len(), 2);
        // ranked newest first, and the duplicate kept the first provider's copy
        assert_eq!(aggregate.articles[0].url.as_deref(), Some("https://ex.com/other"));
        assert_eq!(aggregate.articles[1].title.as_deref(), Some("from p1"));
    }
}
