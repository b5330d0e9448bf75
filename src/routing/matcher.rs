//! Path prefix matching.
//!
//! # Design Decisions
//! - Literal byte-wise prefix, case-sensitive
//! - No normalization, no wildcards, no segment boundary: `/api` matches `/apiextra`
//! - An empty request path is treated as `/`

/// Matches the request path against a literal prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if `path` starts with this prefix.
    pub fn matches(&self, path: &str) -> bool {
        normalize_empty(path).starts_with(&self.prefix)
    }

    /// The part of `path` after the prefix, always starting with `/`.
    ///
    /// Returns `None` when the prefix does not match.
    pub fn strip<'a>(&self, path: &'a str) -> Option<std::borrow::Cow<'a, str>> {
        let rest = normalize_empty(path).strip_prefix(self.prefix.as_str())?;
        Some(if rest.starts_with('/') {
            rest.into()
        } else {
            format!("/{rest}").into()
        })
    }
}

fn normalize_empty(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}
