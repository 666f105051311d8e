use chrono::{DateTime, NaiveDateTime, Utc};

use crate::article::CanonicalArticle;

// NYT emits colon-less offsets ("+0000"), which RFC 3339 parsing rejects.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

/// Best-effort timestamp parsing: RFC 3339 (the trailing "Z" form included)
/// first, then offset-bearing variants RFC 3339 rejects, then a fixed set of
/// common naive formats interpreted as UTC. Returns `None` when nothing
/// matches.
pub fn parse_published(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(raw, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }
    None
}

/// Stable sort, newest first. Unparseable or missing timestamps sort after
/// every valid one; ties keep input order.
pub fn rank(articles: Vec<CanonicalArticle>) -> Vec<CanonicalArticle> {
    let mut keyed: Vec<(Option<DateTime<Utc>>, CanonicalArticle)> = articles
        .into_iter()
        .map(|article| (parse_published(article.published_at.as_deref()), article))
        .collect();
    // `None < Some(_)`, so comparing b against a gives descending order with
    // missing timestamps last.
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    keyed.into_iter().map(|(_, article)| article).collect()
}
