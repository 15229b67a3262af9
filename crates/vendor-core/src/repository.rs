//! GitHub repository identifiers

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?github\.com/([^/\s]+)/([^/\s]+?)(?:\.git)?/?$")
        .expect("static regex")
});

static SHORTHAND_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+)$").expect("static regex")
});

/// Owner/name pair identifying a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse a GitHub URL (`https://github.com/owner/name`) or `owner/name`.
    ///
    /// Returns `None` for anything else.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let caps = URL_PATTERN
            .captures(input)
            .or_else(|| SHORTHAND_PATTERN.captures(input))?;
        Some(Self::new(&caps[1], &caps[2]))
    }

    /// Whether `input` is a full GitHub repository URL.
    pub fn is_url(input: &str) -> bool {
        URL_PATTERN.is_match(input.trim())
    }

    /// Canonical `https://github.com/owner/name` URL.
    pub fn url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://github.com/acme/widget", "acme", "widget")]
    #[case("http://www.github.com/acme/widget/", "acme", "widget")]
    #[case("https://github.com/acme/widget.git", "acme", "widget")]
    #[case("acme/widget.rs", "acme", "widget.rs")]
    fn parses_supported_forms(#[case] input: &str, #[case] owner: &str, #[case] name: &str) {
        assert_eq!(RepoId::parse(input), Some(RepoId::new(owner, name)));
    }

    #[rstest]
    #[case("https://gitlab.com/acme/widget")]
    #[case("https://github.com/acme")]
    #[case("https://github.com/acme/widget/tree/main")]
    #[case("widget")]
    #[case("")]
    fn rejects_other_forms(#[case] input: &str) {
        assert_eq!(RepoId::parse(input), None);
    }

    #[test]
    fn url_and_display() {
        let repo = RepoId::new("acme", "widget");
        assert_eq!(repo.url(), "https://github.com/acme/widget");
        assert_eq!(repo.to_string(), "acme/widget");
        assert!(RepoId::is_url(&repo.url()));
        assert!(!RepoId::is_url("acme/widget"));
    }
}
