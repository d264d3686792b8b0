use url::{Host, Url};

/// Validation outcome with a specific rejection reason
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self { is_valid: true, error: None }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self { is_valid: false, error: Some(msg.into()) }
    }

    pub fn reason(&self) -> &str {
        self.error.as_deref().unwrap_or("validation failed")
    }
}

/// Gate applied before every probe attempt and at the registration boundary.
///
/// Accepts `scheme://host[:port][/path]` where scheme is http or https
/// (case-insensitive) and host is a dotted DNS name, `localhost`, or a
/// dotted-quad IPv4 address.
pub fn is_valid_endpoint(candidate: &str) -> bool {
    validate_endpoint(candidate).is_valid
}

/// Validate an endpoint URL, reporting why it was rejected.
pub fn validate_endpoint(candidate: &str) -> ValidationResult {
    if candidate.trim().is_empty() {
        return ValidationResult::err("endpoint cannot be empty");
    }

    if candidate.chars().any(char::is_whitespace) {
        return ValidationResult::err("endpoint cannot contain whitespace");
    }

    let url = match Url::parse(candidate) {
        Ok(url) => url,
        Err(e) => {
            if !candidate.contains("://") {
                return ValidationResult::err("URL must include scheme (http:// or https://)");
            }
            return ValidationResult::err(format!("invalid URL: {e}"));
        }
    };

    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return ValidationResult::err(format!("invalid scheme '{scheme}', must be http or https"));
    }

    match url.host() {
        Some(Host::Ipv4(_)) => {}
        Some(Host::Ipv6(_)) => {
            return ValidationResult::err("IPv6 hosts are not supported");
        }
        Some(Host::Domain(domain)) => {
            if let Some(reason) = hostname_rejection(domain) {
                return ValidationResult::err(reason);
            }
        }
        None => return ValidationResult::err("URL must have a valid host"),
    }

    // A bare trailing separator with nothing behind it is not a path.
    if url.query() == Some("") {
        return ValidationResult::err("query separator must be followed by a query");
    }

    ValidationResult::ok()
}

/// Why a domain host fails the accepted grammar, or None if it passes.
///
/// Requires at least two dot-separated labels (or the literal `localhost`),
/// each label alphanumeric-with-inner-hyphens, the final label alphabetic
/// and 2-6 characters long. A single trailing dot is tolerated.
fn hostname_rejection(domain: &str) -> Option<String> {
    if domain.eq_ignore_ascii_case("localhost") {
        return None;
    }

    let labels: Vec<&str> = domain.trim_end_matches('.').split('.').collect();
    if labels.len() < 2 {
        return Some(format!("host '{domain}' must be a dotted domain name"));
    }

    for label in &labels {
        if label.is_empty() || label.len() > 63 {
            return Some(format!("host '{domain}' has an invalid label length"));
        }
        let chars_ok = label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        let edges_ok = !label.starts_with('-') && !label.ends_with('-');
        if !chars_ok || !edges_ok {
            return Some(format!("host '{domain}' has an invalid label '{label}'"));
        }
    }

    let tld = labels[labels.len() - 1];
    if tld.len() < 2 || tld.len() > 6 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return Some(format!("host '{domain}' has an invalid top-level label '{tld}'"));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_valid_endpoints() {
        assert!(is_valid_endpoint("http://example.com"));
        assert!(is_valid_endpoint("https://example.com"));
        assert!(is_valid_endpoint("HTTPS://EXAMPLE.COM"));
        assert!(is_valid_endpoint("https://example.com/"));
        assert!(is_valid_endpoint("https://example.com/path?q=1"));
        assert!(is_valid_endpoint("https://sub.example.co.uk"));
        assert!(is_valid_endpoint("http://example.com:8080/path"));
        assert!(is_valid_endpoint("http://localhost"));
        assert!(is_valid_endpoint("http://localhost:5000"));
        assert!(is_valid_endpoint("http://192.168.1.1"));
        assert!(is_valid_endpoint("http://127.0.0.1:8080"));
    }

    #[test]
    fn test_rejects_invalid_endpoints() {
        assert!(!is_valid_endpoint(""));
        assert!(!is_valid_endpoint("example.com"));
        assert!(!is_valid_endpoint("ftp://example.com"));
        assert!(!is_valid_endpoint("http://"));
        assert!(!is_valid_endpoint("https://"));
        assert!(!is_valid_endpoint("http://singlelabel"));
        assert!(!is_valid_endpoint("http://example.com:notaport"));
        assert!(!is_valid_endpoint("http://example.com/path with spaces"));
        assert!(!is_valid_endpoint("http://exa mple.com"));
        assert!(!is_valid_endpoint("http://example.com?"));
        assert!(!is_valid_endpoint("http://example.12345"));
        assert!(!is_valid_endpoint("http://-bad.example.com"));
    }

    #[test]
    fn test_rejection_reasons() {
        assert_eq!(
            validate_endpoint("example.com").reason(),
            "URL must include scheme (http:// or https://)"
        );
        assert!(validate_endpoint("ftp://example.com").reason().contains("invalid scheme"));
        assert!(!validate_endpoint("https://example.com").reason().contains("invalid"));
    }
}
