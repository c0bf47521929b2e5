//! Path matching for the page gate.
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Prefixes match on segment boundaries: `/groups` matches `/groups` and
//!   `/groups/42`, never `/groupsx`
//! - No regex, so matching stays linear in the path length

/// One path condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatcher {
    Exact(String),
    Prefix(String),
}

impl PathMatcher {
    pub fn exact(path: impl Into<String>) -> Self {
        Self::Exact(path.into())
    }

    /// A trailing slash on `prefix` is ignored.
    pub fn prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_end_matches('/');
        Self::Prefix(if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() })
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(expected) => path == expected,
            Self::Prefix(prefix) if prefix == "/" => path.starts_with('/'),
            Self::Prefix(prefix) => match path.strip_prefix(prefix.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
        }
    }
}

/// True when any matcher accepts `path`.
pub fn any_matches(matchers: &[PathMatcher], path: &str) -> bool {
    matchers.iter().any(|m| m.matches(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact() {
        let m = PathMatcher::exact("/");
        assert!(m.matches("/"));
        assert!(!m.matches("/dashboard"));
    }

    #[test]
    fn test_prefix_respects_segments() {
        let m = PathMatcher::prefix("/groups/");
        assert!(m.matches("/groups"));
        assert!(m.matches("/groups/3f2504e0/bills"));
        assert!(!m.matches("/groupsx"));
        assert!(!m.matches("/Groups"));
    }

    #[test]
    fn test_any_matches() {
        let ms = [PathMatcher::prefix("/wallet"), PathMatcher::prefix("/bills")];
        assert!(any_matches(&ms, "/bills/1"));
        assert!(!any_matches(&ms, "/about"));
    }
}
