use crate::url::domain::parse_target_url;
use crate::UrlError;
use url::Url;

/// Normalizes a URL into the key used for duplicate suppression
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or not http(s)
/// 2. Lowercase the host (the `url` crate also drops default ports)
/// 3. Normalize path:
///    - Collapse empty segments (`//`) and dot segments
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 4. Remove fragment (everything after #)
/// 5. Remove an empty query string (trailing ?)
///
/// The normalized form is only used for identity; targets are fetched at
/// their fragment-stripped original URL so relative links keep resolving
/// against the path the server actually sees.
///
/// # Examples
///
/// ```
/// use ripple_collector::url::normalize_url;
///
/// let url = normalize_url("https://SITE.test/docs/#intro").unwrap();
/// assert_eq!(url.as_str(), "https://site.test/docs");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = parse_target_url(url_str)?;

    let host = url
        .host_str()
        .map(str::to_lowercase)
        .ok_or(UrlError::MissingDomain)?;
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}

/// Removes the fragment from a URL, leaving everything else untouched
pub fn strip_fragment(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    format!("/{}", segments.join("/"))
}
