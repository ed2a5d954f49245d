//! Source verification: trust scoring by domain.

use std::collections::HashSet;

use tracing::debug;
use url::{ParseError, Url};

use vendorrisk_shared::{Finding, TrustConfig};

/// Findings scoring at or above this are treated as verified.
pub const VERIFIED_THRESHOLD: f64 = 0.6;

const TRUSTED_SCORE: f64 = 0.9;
const LOW_TRUST_SCORE: f64 = 0.5;
const NEUTRAL_SCORE: f64 = 0.6;
const UNPARSEABLE_SCORE: f64 = 0.3;

/// Domain allowlist plus low-trust host markers.
#[derive(Debug, Clone)]
pub struct TrustPolicy {
    trusted_domains: Vec<String>,
    low_trust_markers: Vec<String>,
}

/// Findings split by trust, in input order.
#[derive(Debug, Clone, Default)]
pub struct Verification {
    pub verified: Vec<Finding>,
    pub unverified: Vec<Finding>,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self::new(&TrustConfig::default())
    }
}

impl TrustPolicy {
    pub fn new(config: &TrustConfig) -> Self {
        Self {
            trusted_domains: lowercase_all(&config.trusted_domains),
            low_trust_markers: lowercase_all(&config.low_trust_markers),
        }
    }

    /// Heuristic trust score for a source URL.
    ///
    /// Relative and scheme-less links (`/url?q=...`, `www.x.com/a`) have no
    /// host and score neutral; only malformed absolute URLs score lowest.
    pub fn score(&self, url: &str) -> f64 {
        let host = match Url::parse(url.trim()) {
            Ok(parsed) => parsed.host_str().map(str::to_lowercase).unwrap_or_default(),
            Err(ParseError::RelativeUrlWithoutBase) => String::new(),
            Err(_) => return UNPARSEABLE_SCORE,
        };
        if host.is_empty() {
            return NEUTRAL_SCORE;
        }

        if self.trusted_domains.iter().any(|d| domain_matches(&host, d)) {
            TRUSTED_SCORE
        } else if self.low_trust_markers.iter().any(|m| host.contains(m.as_str())) {
            LOW_TRUST_SCORE
        } else {
            NEUTRAL_SCORE
        }
    }

    /// Score and split findings.
    ///
    /// Findings without a URL are dropped, as are repeats of a URL already
    /// seen. A trust score that is already set is kept.
    pub fn verify(&self, findings: &[Finding]) -> Verification {
        let mut seen = HashSet::new();
        let mut result = Verification::default();

        for finding in findings {
            if finding.url.is_empty() || !seen.insert(finding.url.as_str()) {
                continue;
            }

            let mut finding = finding.clone();
            let score = *finding
                .trust_score
                .get_or_insert_with(|| self.score(&finding.url));

            if score >= VERIFIED_THRESHOLD {
                result.verified.push(finding);
            } else {
                result.unverified.push(finding);
            }
        }

        debug!(
            verified = result.verified.len(),
            unverified = result.unverified.len(),
            "sources verified"
        );
        result
    }
}

/// Share of verified findings, rounded to two decimals.
pub fn data_confidence(verified: usize, unverified: usize) -> f64 {
    let ratio = verified as f64 / (verified + unverified).max(1) as f64;
    (ratio * 100.0).round() / 100.0
}

/// `.gov` matches a `gov` label anywhere after the first (`www.sec.gov`,
/// `www.gov.uk`); `reuters.com` matches the host itself and its subdomains.
fn domain_matches(host: &str, entry: &str) -> bool {
    if entry.starts_with('.') {
        host.ends_with(entry) || host.contains(&format!("{entry}."))
    } else {
        host == entry
            || host
                .strip_suffix(entry)
                .is_some_and(|prefix| prefix.ends_with('.'))
    }
}

fn lowercase_all(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.trim().to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_known_domains() {
        let policy = TrustPolicy::default();
        assert_eq!(policy.score("https://www.sec.gov/litigation"), 0.9);
        assert_eq!(policy.score("https://www.reuters.com/acme"), 0.9);
        assert_eq!(policy.score("https://reuters.com/acme"), 0.9);
        assert_eq!(policy.score("https://example.org/profile"), 0.9);
        assert_eq!(policy.score("https://acme.blogspot.com/post"), 0.5);
        assert_eq!(policy.score("https://www.reddit.com/r/acme"), 0.5);
        assert_eq!(policy.score("https://acme-news.example.com"), 0.6);
        assert_eq!(policy.score("https://[::1/x"), 0.3);
        assert_eq!(policy.score("https://exa mple.com/x"), 0.3);
    }

    #[test]
    fn dotted_entries_match_country_code_hosts() {
        let policy = TrustPolicy::default();
        assert_eq!(policy.score("https://www.gov.uk/x"), 0.9);
        assert_eq!(policy.score("https://www.fca.org.uk/x"), 0.9);
        assert_eq!(policy.score("https://www.unsw.edu.au/x"), 0.9);
        assert_eq!(policy.score("https://governance.example.com/x"), 0.6);
        assert_eq!(policy.score("https://www.organic.co/x"), 0.6);
    }

    #[test]
    fn hostless_links_score_neutral() {
        let policy = TrustPolicy::default();
        assert_eq!(policy.score("/url?q=https://www.reuters.com/x"), 0.6);
        assert_eq!(policy.score("www.reuters.com/x"), 0.6);
        assert_eq!(policy.score("not a url"), 0.6);

        let result = policy.verify(&[Finding::new(
            "redirect",
            "/url?q=https://www.reuters.com/x",
            "",
        )]);
        assert_eq!(result.verified.len(), 1);
        assert!(result.unverified.is_empty());
        assert_eq!(result.verified[0].trust_score, Some(0.6));
    }

    #[test]
    fn lookalike_hosts_are_not_trusted() {
        let policy = TrustPolicy::default();
        assert_eq!(policy.score("https://notreuters.com/acme"), 0.6);
        assert_eq!(policy.score("https://reuters.com.evil.io/acme"), 0.6);
    }

    #[test]
    fn verify_dedupes_and_splits() {
        let policy = TrustPolicy::default();
        let findings = vec![
            Finding::new("a", "https://www.bloomberg.com/a", "s"),
            Finding::new("dup", "https://www.bloomberg.com/a", "s"),
            Finding::new("blog", "https://x.medium.com/b", "s"),
            Finding::new("empty", "", "s"),
            Finding::new("other", "https://news.example.com/c", "s"),
        ];

        let result = policy.verify(&findings);
        let titles: Vec<_> = result.verified.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, ["a", "other"]);
        assert_eq!(result.unverified.len(), 1);
        assert_eq!(result.unverified[0].trust_score, Some(0.5));
        assert_eq!(result.verified[1].trust_score, Some(0.6));
    }

    #[test]
    fn verify_keeps_existing_score() {
        let mut finding = Finding::new("pre-scored", "https://www.reuters.com/x", "");
        finding.trust_score = Some(0.2);

        let result = TrustPolicy::default().verify(&[finding]);
        assert!(result.verified.is_empty());
        assert_eq!(result.unverified[0].trust_score, Some(0.2));
    }

    #[test]
    fn custom_allowlist_from_config() {
        let policy = TrustPolicy::new(&TrustConfig {
            trusted_domains: vec!["Acme-Regulator.eu".into()],
            low_trust_markers: vec![],
        });
        assert_eq!(policy.score("https://filings.acme-regulator.eu/1"), 0.9);
        assert_eq!(policy.score("https://acme.blogspot.com"), 0.6);
    }

    #[test]
    fn confidence_is_rounded_share() {
        assert_eq!(data_confidence(2, 1), 0.67);
        assert_eq!(data_confidence(0, 0), 0.0);
        assert_eq!(data_confidence(3, 0), 1.0);
    }
}
