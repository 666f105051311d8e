use std::collections::HashSet;

use crate::article::CanonicalArticle;
use crate::urlnorm::normalize_url;

/// Collapses a merged candidate list by canonical URL identity, preserving
/// input order. The first occurrence of a URL wins, so the coordinator's
/// fixed provider order decides which provider's version survives when the
/// same story is mirrored. Articles whose URL cannot be normalized are
/// always kept since identity cannot be established for them.
pub fn dedupe(articles: Vec<CanonicalArticle>) -> Vec<CanonicalArticle> {
    let mut seen: HashSet<String> = HashSet::new();
    articles
        .into_iter()
        .filter(|article| match normalize_url(article.url.as_deref()) {
            Some(url) => seen.insert(url),
            None => true,
        })
        .collect()
}
