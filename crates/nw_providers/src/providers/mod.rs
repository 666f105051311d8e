use async_trait::async_trait;
use nw_core::{CanonicalArticle, Result};

pub mod gnews;
pub mod guardian;
pub mod newsapi;
pub mod newsdata;
pub mod nyt;
pub mod worldnews;

pub use gnews::GNews;
pub use guardian::Guardian;
pub use newsapi::NewsApi;
pub use newsdata::NewsData;
pub use nyt::Nyt;
pub use worldnews::WorldNews;

/// Structured result of one adapter invocation. Non-required adapters fold
/// every failure into one of these variants instead of returning `Err`, so
/// one degraded upstream never empties the aggregate.
#[derive(Debug)]
pub enum FetchOutcome {
    Articles(Vec<CanonicalArticle>),
    /// No credential configured; the adapter was silently skipped.
    Skipped,
    /// The upstream signaled its quota is exhausted (HTTP 429 or a textual
    /// limit indicator in the payload).
    RateLimited,
    /// Transport failure, non-success status, or unparseable payload.
    Failed(String),
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether a failure of this provider is a hard error for the whole
    /// query. Only NewsAPI is load-bearing.
    fn required(&self) -> bool {
        false
    }

    async fn fetch(&self, query: &str, language: Option<&str>) -> Result<FetchOutcome>;
}

/// Sends a request and collects status and body. Adapters sniff the body for
/// rate-limit indicators before attempting a typed parse.
pub(crate) async fn send_for_text(
    request: reqwest::RequestBuilder,
) -> std::result::Result<(reqwest::StatusCode, String), reqwest::Error> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;
    Ok((status, body))
}
