use serde::{Deserialize, Serialize};

use nw_core::Source;

pub mod store;

pub use store::ArchiveStore;

/// One archive row: the canonical article fields plus the query context it
/// was first seen under. Rows are created on first sighting of a normalized
/// URL and never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedArticle {
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
    pub term: Option<String>,
    pub saved_at: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Read filters for the archive. `term` is a case-insensitive substring
/// match across title, description and content; `source` and `category`
/// are exact matches. Bounding `limit`/`offset` is the caller's job.
#[derive(Debug, Clone)]
pub struct ArchiveQuery {
    pub term: Option<String>,
    pub source: Option<String>,
    pub category: Option<String>,
    pub order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ArchiveQuery {
    fn default() -> Self {
        Self {
            term: None,
            source: None,
            category: None,
            order: SortOrder::Desc,
            limit: 50,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facet {
    pub value: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveMeta {
    pub sources: Vec<Facet>,
    pub categories: Vec<Facet>,
}
