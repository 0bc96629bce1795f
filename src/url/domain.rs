use crate::url::matcher::{glob_match, matches_wildcard};
use crate::UrlError;
use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use ripple_collector::url::extract_domain;
///
/// let url = Url::parse("https://Sub.EXAMPLE.com:8080/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("sub.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks a host against a domain policy pattern
///
/// Patterns are exact hosts, `*.`-prefixed wildcards (which also cover the
/// bare domain), or general globs when the pattern contains `*` or `?`
/// elsewhere.
pub fn host_matches(pattern: &str, host: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    if matches_wildcard(&pattern, host) {
        return true;
    }
    pattern.contains(['*', '?']) && glob_match(&pattern, host)
}

/// Parses an absolute http(s) URL suitable for crawling
pub fn parse_target_url(raw: &str) -> Result<Url, UrlError> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}

/// Resolves a link href against a base URL
///
/// Returns `None` for links that can never be crawled:
/// - empty hrefs and fragment-only anchors
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - anything that is not http(s) after resolution
pub fn resolve_link(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let resolved = base.join(href).ok()?;
    matches!(resolved.scheme(), "http" | "https").then_some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://site.test/docs/index.html").unwrap()
    }

    #[test]
    fn test_extract_lowercases_and_drops_port() {
        let url = Url::parse("https://EXAMPLE.COM:8443/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_host_matches_exact_and_wildcard() {
        assert!(host_matches("example.com", "example.com"));
        assert!(host_matches("*.example.com", "www.example.com"));
        assert!(host_matches("Example.COM", "example.com"));
        assert!(!host_matches("example.com", "other.com"));
    }

    #[test]
    fn test_host_matches_glob() {
        assert!(host_matches("docs*.example.com", "docs2.example.com"));
        assert!(!host_matches("docs*.example.com", "api.example.com"));
    }

    #[test]
    fn test_parse_target_url_requires_http() {
        assert!(parse_target_url("https://site.test/a").is_ok());
        assert!(matches!(
            parse_target_url("ftp://site.test/a"),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(matches!(
            parse_target_url("/relative/path"),
            Err(UrlError::Parse(_))
        ));
    }

    #[test]
    fn test_resolve_relative() {
        assert_eq!(
            resolve_link("page.html", &base()).unwrap().as_str(),
            "https://site.test/docs/page.html"
        );
        assert_eq!(
            resolve_link("/b", &base()).unwrap().as_str(),
            "https://site.test/b"
        );
    }

    #[test]
    fn test_resolve_skips_special_schemes() {
        assert!(resolve_link("javascript:void(0)", &base()).is_none());
        assert!(resolve_link("MAILTO:me@site.test", &base()).is_none());
        assert!(resolve_link("tel:+123", &base()).is_none());
        assert!(resolve_link("data:text/html,hi", &base()).is_none());
        assert!(resolve_link("#top", &base()).is_none());
        assert!(resolve_link("   ", &base()).is_none());
    }

    #[test]
    fn test_resolve_absolute_other_host() {
        assert_eq!(
            resolve_link("https://other.test/x", &base()).unwrap().as_str(),
            "https://other.test/x"
        );
    }
}
