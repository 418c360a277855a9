//! Target normalisation and the probe catalogue.

/// Well-known API description paths, probed in this order.
pub const PROBE_PATHS: [&str; 3] = ["/openapi.json", "/swagger.json", "/docs"];

/// A domain answered from a static table instead of probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownDomain {
    pub host: &'static str,
    pub docs_url: &'static str,
    pub api_base: &'static str,
    pub auth: &'static str,
    pub openapi_source: &'static str,
}

const KNOWN_DOMAINS: &[KnownDomain] = &[KnownDomain {
    host: "openai.com",
    docs_url: "https://platform.openai.com/docs/api-reference/introduction",
    api_base: "https://api.openai.com/v1",
    auth: "bearer",
    openapi_source: "github_repo:openai/openai-openapi",
}];

/// Look up a host in the known-domain table (exact match).
pub fn known_domain(host: &str) -> Option<&'static KnownDomain> {
    KNOWN_DOMAINS.iter().find(|d| d.host == host)
}

/// Derive a bare host from a URL or host-like target.
///
/// Only the lowercase `http://` and `https://` prefixes are stripped, and
/// only when the target contains `://` at all. Anything else
/// (`HTTP://x/y`) keeps its scheme text and is cut at the first `/`.
pub fn extract_host(target: &str) -> String {
    let mut rest = target.trim();
    if rest.contains("://") {
        rest = rest.strip_prefix("http://").unwrap_or(rest);
        rest = rest.strip_prefix("https://").unwrap_or(rest);
    }
    let host = rest.split('/').next().unwrap_or(rest);
    host.strip_prefix("www.").unwrap_or(host).trim().to_string()
}

/// Probe URLs for a host, in probe order.
pub fn probe_urls(scheme: &str, host: &str) -> Vec<String> {
    PROBE_PATHS
        .iter()
        .map(|path| format!("{scheme}://{host}{path}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_host_from_url() {
        assert_eq!(extract_host("https://www.example.com/foo"), "example.com");
        assert_eq!(extract_host("http://api.example.com/v1/x"), "api.example.com");
        assert_eq!(extract_host("https://example.test"), "example.test");
    }

    #[test]
    fn test_bare_target() {
        assert_eq!(extract_host("example.com/foo"), "example.com");
        assert_eq!(extract_host("example.com"), "example.com");
        assert_eq!(extract_host("www.example.com"), "example.com");
        assert_eq!(extract_host("  openai.com  "), "openai.com");
    }

    #[test]
    fn test_scheme_match_is_case_sensitive() {
        assert_eq!(extract_host("HTTP://x/y"), "HTTP:");
    }

    #[test]
    fn test_probe_order() {
        assert_eq!(
            probe_urls("https", "example.test"),
            vec![
                "https://example.test/openapi.json",
                "https://example.test/swagger.json",
                "https://example.test/docs",
            ]
        );
    }

    #[test]
    fn test_known_domain_is_exact() {
        assert!(known_domain("openai.com").is_some());
        assert!(known_domain("api.openai.com").is_none());
    }
}
