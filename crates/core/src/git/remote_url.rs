//! Remote URL parsing.
//!
//! Derives the hosting repository (`owner/name`) and its API base URL from a
//! Git remote URL, so a working copy cloned from GitHub or GitHub Enterprise
//! needs no extra configuration to open pull requests.

use std::sync::OnceLock;

use regex_lite::Regex;

/// Host, owner and repository name extracted from a remote URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSlug {
    pub host: String,
    pub owner: String,
    pub repo: String,
}

impl RemoteSlug {
    /// `owner/repo`.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // scheme://[user@]host[:port]/owner/repo[.git][/]
        Regex::new(
            r"^(?:https?|ssh|git)://(?:[^@/]+@)?(?P<host>[^/:]+)(?::\d+)?/(?:.+/)?(?P<owner>[^/]+)/(?P<repo>[^/]+?)(?:\.git)?/?$",
        )
        .expect("static pattern is valid")
    })
}

fn scp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // [user@]host:owner/repo[.git]
        Regex::new(r"^(?:[^@/]+@)?(?P<host>[^/:]+):(?:.+/)?(?P<owner>[^/]+)/(?P<repo>[^/]+?)(?:\.git)?/?$")
            .expect("static pattern is valid")
    })
}

/// Parse an https, ssh or scp-style remote URL.
///
/// For hosts that nest repositories deeper (`host/group/sub/repo`), the last
/// two segments are taken as owner and repository.
pub fn parse_remote_url(url: &str) -> Option<RemoteSlug> {
    let url = url.trim();
    let caps = if url.contains("://") {
        url_pattern().captures(url)?
    } else {
        scp_pattern().captures(url)?
    };
    Some(RemoteSlug {
        host: caps.name("host")?.as_str().to_ascii_lowercase(),
        owner: caps.name("owner")?.as_str().to_string(),
        repo: caps.name("repo")?.as_str().to_string(),
    })
}

/// `owner/repo` for a remote URL.
pub fn parse_owner_repo(url: &str) -> Option<String> {
    parse_remote_url(url).map(|slug| slug.full_name())
}

/// REST API base URL for a hosting domain.
///
/// - `github.com` → `https://api.github.com`
/// - anything else is treated as GitHub Enterprise: `https://<host>/api/v3`
pub fn api_url_for_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.eq_ignore_ascii_case("github.com") {
        return "https://api.github.com".to_string();
    }
    format!("https://{}/api/v3", host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_urls() {
        assert_eq!(
            parse_owner_repo("https://github.com/acme/widgets.git").as_deref(),
            Some("acme/widgets")
        );
        assert_eq!(
            parse_owner_repo("https://github.com/acme/widgets").as_deref(),
            Some("acme/widgets")
        );
        assert_eq!(
            parse_owner_repo("https://token@github.com/acme/widgets/").as_deref(),
            Some("acme/widgets")
        );
    }

    #[test]
    fn test_ssh_urls() {
        assert_eq!(
            parse_owner_repo("git@github.com:acme/widgets.git").as_deref(),
            Some("acme/widgets")
        );
        let slug = parse_remote_url("ssh://git@GHE.example.com:2222/acme/widgets.git").unwrap();
        assert_eq!(slug.host, "ghe.example.com");
        assert_eq!(slug.full_name(), "acme/widgets");
    }

    #[test]
    fn test_nested_groups_take_last_two_segments() {
        assert_eq!(
            parse_owner_repo("https://git.example.com/group/sub/widgets.git").as_deref(),
            Some("sub/widgets")
        );
    }

    #[test]
    fn test_dotted_repo_names() {
        assert_eq!(
            parse_owner_repo("git@github.com:acme/widgets.rs.git").as_deref(),
            Some("acme/widgets.rs")
        );
    }

    #[test]
    fn test_unparseable() {
        assert!(parse_owner_repo("").is_none());
        assert!(parse_owner_repo("/local/path/repo").is_none());
        assert!(parse_owner_repo("https://github.com/just-owner").is_none());
    }

    #[test]
    fn test_api_url_for_host() {
        assert_eq!(api_url_for_host("github.com"), "https://api.github.com");
        assert_eq!(api_url_for_host("GitHub.com"), "https://api.github.com");
        assert_eq!(
            api_url_for_host("ghe.example.com"),
            "https://ghe.example.com/api/v3"
        );
    }
}
