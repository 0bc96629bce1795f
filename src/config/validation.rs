use crate::config::types::{CollectorConfig, Config, ExtractEntry, LimitEntry, UserAgentConfig};
use crate::url::parse_target_url;
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_collector_config(&config.collector)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_seeds(&config.seeds)?;
    validate_limits(&config.limits)?;
    validate_extract_entries(&config.extract)?;
    Ok(())
}

/// Validates collector configuration
fn validate_collector_config(config: &CollectorConfig) -> Result<(), ConfigError> {
    if let Some(depth) = config.max_depth {
        if depth < 0 || u32::try_from(depth).is_err() {
            return Err(ConfigError::Validation(format!(
                "max-depth must be between 0 and {}, got {}",
                u32::MAX,
                depth
            )));
        }
    }

    if let Some(parallelism) = config.parallelism {
        if !(1..=100).contains(&parallelism) {
            return Err(ConfigError::Validation(format!(
                "parallelism must be between 1 and 100, got {}",
                parallelism
            )));
        }
    }

    if config.request_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-ms must be > 0".to_string(),
        ));
    }

    for pattern in config
        .allowed_domains
        .iter()
        .chain(config.disallowed_domains.iter())
    {
        validate_domain_pattern(pattern)?;
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler-version cannot be empty".to_string(),
        ));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;
    }

    Ok(())
}

/// Seeds must be absolute http(s) URLs
fn validate_seeds(seeds: &[String]) -> Result<(), ConfigError> {
    for seed in seeds {
        parse_target_url(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;
    }
    Ok(())
}

fn validate_limits(limits: &[LimitEntry]) -> Result<(), ConfigError> {
    for entry in limits {
        if entry.domain_glob.trim().is_empty() {
            return Err(ConfigError::InvalidPattern(
                "domain-glob cannot be empty".to_string(),
            ));
        }

        if entry.parallelism == Some(0) {
            return Err(ConfigError::Validation(format!(
                "parallelism for '{}' must be >= 1",
                entry.domain_glob
            )));
        }
    }
    Ok(())
}

fn validate_extract_entries(entries: &[ExtractEntry]) -> Result<(), ConfigError> {
    for entry in entries {
        Selector::parse(&entry.selector).map_err(|e| {
            ConfigError::Validation(format!("Invalid selector '{}': {}", entry.selector, e))
        })?;
    }
    Ok(())
}

/// Validates a host pattern (supports `*.` prefixes and `*`/`?` globs)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    // Check if it's a wildcard pattern
    if let Some(domain) = pattern.strip_prefix("*.") {
        validate_domain_string(domain)
    } else {
        validate_domain_string(pattern)
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    // Check for invalid characters
    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '*' | '?'))
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    // Check that it doesn't start or end with a dot or hyphen
    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    // Check for consecutive dots
    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}
