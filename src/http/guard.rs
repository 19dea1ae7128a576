//! URL construction and the SSRF guard applied before any request leaves the process.

use std::net::{Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

use crate::config::RuntimeMode;
use crate::error::{Error, Result};

/// Hostnames refused in production mode.
pub const BLOCKED_HOSTS: [&str; 4] = ["localhost", "127.0.0.1", "0.0.0.0", "::1"];

/// Joins `path` onto `base` and appends `query`.
///
/// Leading slashes on `path` are collapsed so the result always stays under
/// the base URL's origin, even for inputs like `//other.host/x`.
pub fn build_url(base: &str, path: &str, query: &[(String, String)]) -> Result<Url> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let mut url = Url::parse(&joined).map_err(|e| Error::InvalidUrl(format!("{joined}: {e}")))?;
    if !query.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    Ok(url)
}

pub fn validate_url(raw: &str, mode: RuntimeMode) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))?;
    if !mode.is_production() {
        return Ok(url);
    }
    if url.scheme() != "https" {
        return Err(Error::InvalidUrl(format!(
            "{raw}: only https is allowed in production"
        )));
    }
    match url.host() {
        None => Err(Error::InvalidUrl(format!("{raw}: missing host"))),
        Some(host) if is_blocked_host(&host) => Err(Error::InvalidUrl(format!(
            "{raw}: host is blocked"
        ))),
        Some(_) => Ok(url),
    }
}

fn is_blocked_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(d) => BLOCKED_HOSTS.contains(&d.to_ascii_lowercase().as_str()),
        Host::Ipv4(ip) => *ip == Ipv4Addr::LOCALHOST || *ip == Ipv4Addr::UNSPECIFIED,
        Host::Ipv6(ip) => *ip == Ipv6Addr::LOCALHOST,
    }
}

/// Percent-encodes one path segment; unreserved characters pass through.
pub fn encode_path_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(p: &[(&str, &str)]) -> Vec<(String, String)> {
        p.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn joins_with_single_slash() {
        let u = build_url("https://api.example.com/v2/", "/droplets", &[]).unwrap();
        assert_eq!(u.as_str(), "https://api.example.com/v2/droplets");
        let u = build_url("https://api.example.com", "user", &[]).unwrap();
        assert_eq!(u.as_str(), "https://api.example.com/user");
        assert!(u.query().is_none());
    }

    #[test]
    fn keeps_origin_for_hostile_paths() {
        let base = Url::parse("https://api.example.com").unwrap();
        for p in ["//evil.test/x", "@evil.test", "/../../etc", "http://evil.test/"] {
            let u = build_url(base.as_str(), p, &[]).unwrap();
            assert_eq!(u.origin(), base.origin(), "path {p}");
        }
    }

    #[test]
    fn appends_query_pairs() {
        let u = build_url(
            "https://api.example.com",
            "/search",
            &pairs(&[("q", "a b&c"), ("page", "2")]),
        )
        .unwrap();
        let got: Vec<(String, String)> = u.query_pairs().into_owned().collect();
        assert_eq!(got, pairs(&[("q", "a b&c"), ("page", "2")]));
    }

    #[test]
    fn production_blocks_loopback_and_plain_http() {
        let prod = RuntimeMode::Production;
        assert!(validate_url("http://localhost/x", prod).is_err());
        assert!(validate_url("https://localhost/x", prod).is_err());
        assert!(validate_url("https://LOCALHOST/x", prod).is_err());
        assert!(validate_url("https://127.0.0.1:8443/x", prod).is_err());
        assert!(validate_url("https://0.0.0.0/x", prod).is_err());
        assert!(validate_url("https://[::1]/x", prod).is_err());
        assert!(validate_url("http://api.example.com/x", prod).is_err());
        assert!(validate_url("https://api.example.com/x", prod).is_ok());
    }

    #[test]
    fn development_allows_loopback() {
        let dev = RuntimeMode::Development;
        assert!(validate_url("http://localhost/x", dev).is_ok());
        assert!(validate_url("http://127.0.0.1:3000/x", dev).is_ok());
    }

    #[test]
    fn unparseable_rejected_everywhere() {
        for mode in [RuntimeMode::Development, RuntimeMode::Production] {
            assert!(matches!(
                validate_url("not a url", mode),
                Err(Error::InvalidUrl(_))
            ));
        }
    }
}
