use std::path::Path;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::debug;

use nw_core::{normalize_url, CanonicalArticle, Error, Result, Source};

use crate::{ArchiveMeta, ArchiveQuery, ArchivedArticle, Facet};

/// Ordered schema migrations, applied front to back on open.
const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS news_archive (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        normalized_url TEXT NOT NULL UNIQUE,
        url TEXT,
        source_name TEXT,
        source_id TEXT,
        author TEXT,
        title TEXT,
        description TEXT,
        url_to_image TEXT,
        published_at TEXT,
        content TEXT,
        category TEXT,
        term TEXT,
        language TEXT,
        saved_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_news_archive_pub ON news_archive(published_at DESC, saved_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_news_archive_source ON news_archive(source_name)",
    "CREATE INDEX IF NOT EXISTS idx_news_archive_category ON news_archive(category)",
];

/// Durable, idempotent archive of every normalized article ever produced.
/// Opened once at startup and shared; the sqlite pool makes concurrent use
/// safe, and the UNIQUE constraint on `normalized_url` resolves races
/// between overlapping inserts without application-level locking.
pub struct ArchiveStore {
    pool: SqlitePool,
}

fn storage_err(e: sqlx::Error) -> Error {
    Error::Storage(e.to_string())
}

impl ArchiveStore {
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(storage_err)?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Storage(format!("failed to run migration {}: {}", i, e)))?;
        }
        debug!(path = %db_path.display(), migrations = MIGRATIONS.len(), "archive opened");

        Ok(Self { pool })
    }

    /// Inserts every article that has a resolvable normalized URL, skipping
    /// URLs already archived (first sighting wins). Returns the number of
    /// rows actually inserted. Safe to call concurrently with overlapping
    /// article sets.
    pub async fn upsert_all(
        &self,
        term: &str,
        language: Option<&str>,
        articles: &[CanonicalArticle],
    ) -> Result<u64> {
        let saved_at = Utc::now().to_rfc3339();
        let mut inserted = 0u64;
        for article in articles {
            let Some(normalized) = normalize_url(article.url.as_deref()) else {
                // no identity key, cannot be deduplicated against future
                // sightings, so never archived
                continue;
            };
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO news_archive (
                    normalized_url, url, source_name, source_id, author, title, description,
                    url_to_image, published_at, content, category, term, language, saved_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(normalized.as_str())
            .bind(article.url.as_deref())
            .bind(article.source.name.as_deref())
            .bind(article.source.id.as_deref())
            .bind(article.author.as_deref())
            .bind(article.title.as_deref())
            .bind(article.description.as_deref())
            .bind(article.image_url.as_deref())
            .bind(article.published_at.as_deref())
            .bind(article.content.as_deref())
            .bind(article.category.as_deref())
            .bind(term)
            .bind(language)
            .bind(saved_at.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
            inserted += result.rows_affected();
        }
        debug!(term, candidates = articles.len(), inserted, "archive upsert");
        Ok(inserted)
    }

    /// Filtered, paginated read. Returns the full filtered count alongside
    /// the requested window, ordered by publish-or-save timestamp with the
    /// row id as a stable secondary key in the same direction.
    pub async fn query(&self, query: &ArchiveQuery) -> Result<(i64, Vec<ArchivedArticle>)> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(1) FROM news_archive");
        push_filters(&mut count, query);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;

        let mut select = QueryBuilder::<Sqlite>::new(
            "SELECT url, source_name, source_id, author, title, description, url_to_image, \
             published_at, content, category, term, saved_at FROM news_archive",
        );
        push_filters(&mut select, query);
        let dir = query.order.sql();
        select.push(format!(
            " ORDER BY COALESCE(published_at, saved_at) {dir}, id {dir}"
        ));
        select.push(" LIMIT ").push_bind(query.limit);
        select.push(" OFFSET ").push_bind(query.offset);

        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;

        let articles = rows
            .into_iter()
            .map(|row| ArchivedArticle {
                source: Source {
                    id: row.get("source_id"),
                    name: row.get("source_name"),
                },
                author: row.get("author"),
                title: row.get("title"),
                description: row.get("description"),
                url: row.get("url"),
                image_url: row.get("url_to_image"),
                published_at: row.get("published_at"),
                content: row.get("content"),
                category: row.get("category"),
                term: row.get("term"),
                saved_at: row.get("saved_at"),
            })
            .collect();
        Ok((total, articles))
    }

    /// Top sources and top categories by archived row count, nulls
    /// excluded, each truncated to `limit`.
    pub async fn facets(&self, limit: i64) -> Result<ArchiveMeta> {
        Ok(ArchiveMeta {
            sources: self.facet_counts("source_name", limit).await?,
            categories: self.facet_counts("category", limit).await?,
        })
    }

    async fn facet_counts(&self, column: &str, limit: i64) -> Result<Vec<Facet>> {
        // column is one of two compile-time constants, never user input
        let sql = format!(
            "SELECT {column} AS value, COUNT(1) AS cnt FROM news_archive \
             WHERE {column} IS NOT NULL GROUP BY {column} ORDER BY cnt DESC LIMIT ?"
        );
        let rows = sqlx::query(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let value: Option<String> = row.get("value");
                value.filter(|v| !v.is_empty()).map(|value| Facet {
                    value,
                    count: row.get("cnt"),
                })
            })
            .collect())
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &ArchiveQuery) {
    let mut first = true;
    let mut sep = |first: &mut bool| {
        if *first {
            *first = false;
            " WHERE "
        } else {
            " AND "
        }
    };
    if let Some(term) = &query.term {
        let pattern = format!("%{}%", term.to_lowercase());
        builder
            .push(sep(&mut first))
            .push("(LOWER(COALESCE(title, '')) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(COALESCE(description, '')) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(COALESCE(content, '')) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(source) = &query.source {
        builder
            .push(sep(&mut first))
            .push("source_name = ")
            .push_bind(source.clone());
    }
    if let Some(category) = &query.category {
        builder
            .push(sep(&mut first))
            .push("category = ")
            .push_bind(category.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SortOrder;
    use tempfile::tempdir;

    fn article(url: Option<&str>, title: &str, source: &str, category: Option<&str>) -> CanonicalArticle {
        CanonicalArticle {
            source: Source {
                id: Some(source.to_lowercase()),
                name: Some(source.to_string()),
            },
            title: Some(title.to_string()),
            url: url.map(str::to_string),
            published_at: Some("2024-01-15T10:00:00Z".to_string()),
            category: category.map(str::to_string),
            ..Default::default()
        }
    }

    async fn open_store() -> (tempfile::TempDir, ArchiveStore) {
        let dir = tempdir().unwrap();
        let store = ArchiveStore::open(&dir.path().join("test.db")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_idempotent_upsert() {
        let (_dir, store) = open_store().await;
        let first = article(Some("https://ex.com/a?utm=1"), "Original", "X", None);
        let mut second = first.clone();
        second.url = Some("https://ex.com/a".to_string());
        second.title = Some("Later copy".to_string());

        assert_eq!(store.upsert_all("q", None, &[first]).await.unwrap(), 1);
        assert_eq!(store.upsert_all("q", None, &[second]).await.unwrap(), 0);

        let (total, rows) = store.query(&ArchiveQuery::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].title.as_deref(), Some("Original"));
    }

    #[tokio::test]
    async fn test_articles_without_url_are_skipped() {
        let (_dir, store) = open_store().await;
        let inserted = store
            .upsert_all("q", None, &[article(None, "no identity", "X", None)])
            .await
            .unwrap();
        assert_eq!(inserted, 0);
        let (total, _) = store.query(&ArchiveQuery::default()).await.unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_term_filter_is_case_insensitive_substring() {
        let (_dir, store) = open_store().await;
        store
            .upsert_all(
                "q",
                None,
                &[
                    article(Some("https://ex.com/1"), "Elections heat up", "X", None),
                    article(Some("https://ex.com/2"), "Sports roundup", "X", None),
                ],
            )
            .await
            .unwrap();

        let (total, rows) = store
            .query(&ArchiveQuery {
                term: Some("ELECTIONS".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].title.as_deref(), Some("Elections heat up"));
    }

    #[tokio::test]
    async fn test_source_category_filters_and_pagination() {
        let (_dir, store) = open_store().await;
        store
            .upsert_all(
                "q",
                Some("en"),
                &[
                    article(Some("https://ex.com/1"), "a", "X", Some("world")),
                    article(Some("https://ex.com/2"), "b", "X", Some("world")),
                    article(Some("https://ex.com/3"), "c", "Y", Some("sports")),
                ],
            )
            .await
            .unwrap();

        let (total, rows) = store
            .query(&ArchiveQuery {
                source: Some("X".to_string()),
                category: Some("world".to_string()),
                limit: 1,
                offset: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_order_direction() {
        let (_dir, store) = open_store().await;
        let mut old = article(Some("https://ex.com/old"), "old", "X", None);
        old.published_at = Some("2023-01-01T00:00:00Z".to_string());
        let new = article(Some("https://ex.com/new"), "new", "X", None);
        store.upsert_all("q", None, &[old, new]).await.unwrap();

        let (_, rows) = store.query(&ArchiveQuery::default()).await.unwrap();
        assert_eq!(rows[0].title.as_deref(), Some("new"));

        let (_, rows) = store
            .query(&ArchiveQuery {
                order: SortOrder::Asc,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(rows[0].title.as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_facets_truncated_by_limit() {
        let (_dir, store) = open_store().await;
        store
            .upsert_all(
                "q",
                None,
                &[
                    article(Some("https://ex.com/1"), "a", "X", Some("world")),
                    article(Some("https://ex.com/2"), "b", "X", None),
                    article(Some("https://ex.com/3"), "c", "X", Some("world")),
                    article(Some("https://ex.com/4"), "d", "Y", Some("sports")),
                ],
            )
            .await
            .unwrap();

        let meta = store.facets(1).await.unwrap();
        assert_eq!(meta.sources.len(), 1);
        assert_eq!(meta.sources[0].value, "X");
        assert_eq!(meta.sources[0].count, 3);
        assert_eq!(meta.categories.len(), 1);
        assert_eq!(meta.categories[0].value, "world");
        assert_eq!(meta.categories[0].count, 2);
    }
}
