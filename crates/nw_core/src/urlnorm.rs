use url::Url;

/// Canonicalizes a URL by stripping the query string and fragment, leaving
/// scheme, host and path untouched. Two URLs differing only in tracking
/// parameters or fragment anchors map to the same value, which is what both
/// cross-provider deduplication and the archive's uniqueness key rely on.
pub fn normalize_url(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match Url::parse(raw) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            Some(parsed.to_string())
        }
        // Not a parseable absolute URL; strip by hand so the key is still
        // stable across repeated sightings of the same string.
        Err(_) => {
            let cut = raw.find(['?', '#']).unwrap_or(raw.len());
            Some(raw[..cut].to_string())
        }
    }
}

/// Hostname of a URL with a leading "www." stripped, used as the fallback
/// source identity when a provider reports none.
pub fn hostname(raw: Option<&str>) -> Option<String> {
    let parsed = Url::parse(raw?.trim()).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}
