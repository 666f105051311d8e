use serde::{Deserialize, Serialize};

use crate::urlnorm;

/// Provider-reported source identity. When a provider reports nothing, both
/// fields fall back to the hostname of the article URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl Source {
    /// Resolves a source from explicit provider fields, falling back per
    /// field to the hostname derived from the article URL.
    pub fn resolve(id: Option<String>, name: Option<String>, article_url: Option<&str>) -> Self {
        let host = urlnorm::hostname(article_url);
        Self {
            id: non_empty(id).or_else(|| host.clone()),
            name: non_empty(name).or(host),
        }
    }
}

/// The single uniform article shape every provider is mapped into. Every
/// field is optional; callers check `url` where identity matters and
/// tolerate nulls elsewhere.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanonicalArticle {
    pub source: Source,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "urlToImage")]
    pub image_url: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// First non-empty candidate wins; candidates are checked in the order the
/// adapter passes them.
pub fn pick_category<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// First non-empty element of a list-valued category field.
pub fn first_in_list(items: &[String]) -> Option<&str> {
    items
        .iter()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
}

/// Collapses a list-valued byline to a comma-joined string, or `None` when
/// nothing non-empty remains.
pub fn join_byline(names: &[String]) -> Option<String> {
    let joined = names
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}
