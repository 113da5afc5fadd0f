//! Extracting and normalizing website domains.

use crate::core::error::{AppError, Result};
use url::Url;

/// Extracts the registrable host from a website string.
///
/// Accepts bare hosts ("example.com") as well as full URLs, strips a
/// leading `www.` and lowercases the result.
pub fn get_domain_from_url(website: &str) -> Result<String> {
    let trimmed = website.trim();
    if trimmed.is_empty() {
        return Err(AppError::DomainExtraction(
            "Website string is empty".to_string(),
        ));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let parsed = Url::parse(&candidate)?;
    let host = parsed.host_str().ok_or_else(|| {
        AppError::DomainExtraction(format!("No host found in '{}'", website))
    })?;

    let host = host.strip_prefix("www.").unwrap_or(host).to_lowercase();
    if !host.contains('.') {
        return Err(AppError::DomainExtraction(format!(
            "'{}' does not look like a domain",
            host
        )));
    }
    Ok(host)
}

/// Normalizes a website string into a fetchable URL, defaulting the
/// scheme to https when absent.
pub fn normalize_url(website: &str) -> Result<Url> {
    let trimmed = website.trim();
    if trimmed.is_empty() {
        return Err(AppError::DomainExtraction(
            "Website string is empty".to_string(),
        ));
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    Ok(Url::parse(&candidate)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_domain_from_variants() {
        assert_eq!(get_domain_from_url("https://www.example.com/contact").unwrap(), "example.com");
        assert_eq!(get_domain_from_url("example.com").unwrap(), "example.com");
        assert_eq!(get_domain_from_url("http://Sub.Example.COM").unwrap(), "sub.example.com");
    }

    #[test]
    fn rejects_empty_and_hostless() {
        assert!(get_domain_from_url("").is_err());
        assert!(get_domain_from_url("   ").is_err());
        assert!(get_domain_from_url("localhost").is_err());
    }

    #[test]
    fn normalize_defaults_to_https() {
        let url = normalize_url("example.com/about").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("example.com"));
    }
}
