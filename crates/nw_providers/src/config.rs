use std::env;
use std::time::Duration;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_SORT: &str = "publishedAt";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const NEWSAPI_URL: &str = "https://newsapi.org/v2/everything";
const GNEWS_URL: &str = "https://gnews.io/api/v4/search";
const NEWSDATA_URL: &str = "https://newsdata.io/api/1/latest";
const WORLDNEWS_URL: &str = "https://api.worldnewsapi.com/search-news";
const GUARDIAN_URL: &str = "https://content.guardianapis.com/search";
const NYT_URL: &str = "https://api.nytimes.com/svc/search/v2/articlesearch.json";

/// Per-provider knobs, each independently overridable from the environment.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub max_results: usize,
}

impl ProviderSettings {
    fn from_env(key_var: &str, url_var: &str, default_url: &str, max_var: &str) -> Self {
        Self {
            api_key: env::var(key_var).ok().filter(|s| !s.is_empty()),
            base_url: env_or(url_var, default_url),
            max_results: env::var(max_var)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProvidersConfig {
    pub newsapi: ProviderSettings,
    pub newsapi_sort_by: String,
    pub gnews: ProviderSettings,
    pub newsdata: ProviderSettings,
    pub worldnews: ProviderSettings,
    pub guardian: ProviderSettings,
    pub nyt: ProviderSettings,
    pub timeout: Duration,
}

impl ProvidersConfig {
    pub fn from_env() -> Self {
        Self {
            newsapi: ProviderSettings::from_env(
                "NEWS_API_KEY",
                "NEWS_API_URL",
                NEWSAPI_URL,
                "NEWS_API_MAX_RESULTS",
            ),
            newsapi_sort_by: env_or("NEWS_API_SORT_BY", DEFAULT_SORT),
            gnews: ProviderSettings::from_env(
                "GNEWS_API_KEY",
                "GNEWS_API_URL",
                GNEWS_URL,
                "GNEWS_MAX_RESULTS",
            ),
            newsdata: ProviderSettings::from_env(
                "NEWSDATA_API_KEY",
                "NEWSDATA_API_URL",
                NEWSDATA_URL,
                "NEWSDATA_MAX_RESULTS",
            ),
            worldnews: ProviderSettings::from_env(
                "WORLDNEWS_API_KEY",
                "WORLDNEWS_API_URL",
                WORLDNEWS_URL,
                "WORLDNEWS_MAX_RESULTS",
            ),
            guardian: ProviderSettings::from_env(
                "GUARDIAN_API_KEY",
                "GUARDIAN_API_URL",
                GUARDIAN_URL,
                "GUARDIAN_MAX_RESULTS",
            ),
            nyt: ProviderSettings::from_env(
                "NYT_API_KEY",
                "NYT_API_URL",
                NYT_URL,
                "NYT_MAX_RESULTS",
            ),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

fn env_or(var: &str, default: &str) -> String {
    env::var(var).ok().filter(|s| !s.is_empty()).unwrap_or_else(|| default.to_string())
}
