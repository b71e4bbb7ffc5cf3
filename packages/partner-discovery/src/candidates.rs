//! Fast-path candidate URLs.
//!
//! Guesses where a site keeps its partner directory without asking the
//! mapping service. Pure: no network, same seed always yields the same list.

use indexmap::IndexSet;
use url::Url;

/// Paths that commonly host partner or integration directories.
pub const DIRECTORY_PATHS: &[&str] = &[
    "/partners",
    "/integrations",
    "/marketplace",
    "/apps",
    "/app-marketplace",
    "/ecosystem",
    "/partner-directory",
    "/technology-partners",
];

/// Subdomains that commonly host app marketplaces.
pub const DIRECTORY_SUBDOMAINS: &[&str] = &["marketplace", "app", "apps", "partners"];

/// Candidate directory URLs for a seed, most likely first.
///
/// Order: seed origin + each of [`DIRECTORY_PATHS`], then each of
/// [`DIRECTORY_SUBDOMAINS`] on the two-label root domain, then the seed
/// itself. Duplicates keep their first position.
///
/// A seed that does not parse as an absolute URL comes back unchanged as the
/// only candidate.
pub fn candidate_urls(seed: &str) -> Vec<String> {
    let parsed = match Url::parse(seed) {
        Ok(url) if url.host_str().is_some() => url,
        _ => return vec![seed.to_string()],
    };

    let origin = parsed.origin().ascii_serialization();
    let mut urls: IndexSet<String> = DIRECTORY_PATHS
        .iter()
        .map(|path| format!("{}{}", origin, path))
        .collect();

    if let Some(root) = parsed.domain().and_then(root_domain) {
        for sub in DIRECTORY_SUBDOMAINS {
            urls.insert(format!("{}://{}.{}", parsed.scheme(), sub, root));
        }
    }

    urls.insert(seed.to_string());
    urls.into_iter().collect()
}

/// The last two labels of a domain (`www.shop.acme.com` -> `acme.com`).
///
/// Single-label hosts such as `localhost` have no registrable root.
pub fn root_domain(domain: &str) -> Option<String> {
    let labels: Vec<&str> = domain
        .trim_end_matches('.')
        .split('.')
        .filter(|l| !l.is_empty())
        .collect();
    if labels.len() < 2 {
        return None;
    }
    Some(labels[labels.len() - 2..].join(".").to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unparsable_seed_is_returned_unchanged() {
        assert_eq!(candidate_urls("not a url"), vec!["not a url".to_string()]);
        assert_eq!(candidate_urls(""), vec![String::new()]);
        assert_eq!(candidate_urls("acme.com"), vec!["acme.com".to_string()]);
    }

    #[test]
    fn test_paths_then_subdomains_then_seed() {
        let urls = candidate_urls("https://www.acme.com/about?ref=x");

        assert_eq!(urls[0], "https://www.acme.com/partners");
        assert_eq!(urls[1], "https://www.acme.com/integrations");
        assert_eq!(urls[2], "https://www.acme.com/marketplace");

        let subdomain_start = DIRECTORY_PATHS.len();
        assert_eq!(urls[subdomain_start], "https://marketplace.acme.com");
        assert_eq!(urls[subdomain_start + 1], "https://app.acme.com");
        assert_eq!(urls[subdomain_start + 2], "https://apps.acme.com");
        assert_eq!(urls[subdomain_start + 3], "https://partners.acme.com");

        assert_eq!(urls.last().unwrap(), "https://www.acme.com/about?ref=x");
        assert_eq!(urls.len(), DIRECTORY_PATHS.len() + DIRECTORY_SUBDOMAINS.len() + 1);
    }

    #[test]
    fn test_deterministic() {
        let seed = "https://acme.io/";
        assert_eq!(candidate_urls(seed), candidate_urls(seed));
    }

    #[test]
    fn test_duplicates_keep_first_position() {
        let urls = candidate_urls("https://acme.com/partners");
        let count = urls
            .iter()
            .filter(|u| u.as_str() == "https://acme.com/partners")
            .count();
        assert_eq!(count, 1);
        assert_eq!(urls[0], "https://acme.com/partners");
    }

    #[test]
    fn test_port_is_kept_in_origin() {
        let urls = candidate_urls("http://localhost:3000/home");
        assert_eq!(urls[0], "http://localhost:3000/partners");
        // localhost has no two-label root, so no subdomain guesses
        assert_eq!(urls.len(), DIRECTORY_PATHS.len() + 1);
    }

    #[test]
    fn test_ip_host_gets_no_subdomains() {
        let urls = candidate_urls("http://10.0.0.1/");
        assert_eq!(urls.len(), DIRECTORY_PATHS.len() + 1);
    }

    #[test]
    fn test_root_domain() {
        assert_eq!(root_domain("www.shop.acme.com"), Some("acme.com".into()));
        assert_eq!(root_domain("Acme.COM"), Some("acme.com".into()));
        assert_eq!(root_domain("localhost"), None);
    }
}
