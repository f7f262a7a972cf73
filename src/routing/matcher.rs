//! Route matching logic.
//!
//! # Responsibilities
//! - Compile path patterns (`/widgets/:id`, `/files/*`)
//! - Match request paths and extract parameters
//! - Match request methods
//!
//! # Design Decisions
//! - Path matching is case-sensitive, method matching is not
//! - Empty method list = always matches (wildcard)
//! - Trailing slashes and repeated slashes are ignored
//! - No regex to guarantee O(n) matching

use std::collections::BTreeMap;

use axum::http::Method;
use percent_encoding::percent_decode_str;

/// Key under which a trailing `*` stores the rest of the path.
pub const WILDCARD_PARAM: &str = "0";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Rest,
}

/// A compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a pattern. `:name` segments capture one segment, a final `*`
    /// captures the remainder of the path.
    pub fn parse(pattern: &str) -> Self {
        let parts: Vec<&str> = split_path(pattern).collect();
        let last = parts.len().saturating_sub(1);
        let segments = parts
            .into_iter()
            .enumerate()
            .map(|(i, part)| {
                if part == "*" && i == last {
                    Segment::Rest
                } else if let Some(name) = part.strip_prefix(':').filter(|n| !n.is_empty()) {
                    Segment::Param(name.to_string())
                } else {
                    Segment::Literal(part.to_string())
                }
            })
            .collect();
        Self { segments }
    }

    /// Match a request path, returning the captured parameters.
    pub fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let mut params = BTreeMap::new();
        let mut parts = split_path(path);

        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => {
                    if parts.next()? != literal {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = parts.next()?;
                    params.insert(name.clone(), decode(value));
                }
                Segment::Rest => {
                    let rest: Vec<String> = parts.by_ref().map(decode).collect();
                    params.insert(WILDCARD_PARAM.to_string(), rest.join("/"));
                }
            }
        }

        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn decode(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

/// Matches the request method against an allow list.
#[derive(Debug, Clone, Default)]
pub struct MethodMatcher {
    allowed: Vec<Method>,
}

impl MethodMatcher {
    /// Build from configured method names; names are upper-cased.
    /// Names that are not valid methods never match.
    pub fn new<S: AsRef<str>>(methods: &[S]) -> Self {
        let allowed = methods
            .iter()
            .filter_map(|m| Method::from_bytes(m.as_ref().to_ascii_uppercase().as_bytes()).ok())
            .collect();
        Self { allowed }
    }

    pub fn matches(&self, method: &Method) -> bool {
        self.allowed.is_empty() || self.allowed.contains(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_path() {
        let pattern = PathPattern::parse("/api/widgets");
        assert_eq!(pattern.matches("/api/widgets"), Some(BTreeMap::new()));
        assert!(pattern.matches("/api/widgets/").is_some());
        assert!(pattern.matches("/api/widgets/1").is_none());
        assert!(pattern.matches("/api").is_none());
        assert!(pattern.matches("/API/widgets").is_none());
    }

    #[test]
    fn test_params_are_captured_and_decoded() {
        let pattern = PathPattern::parse("/widgets/:id/parts/:part");
        let params = pattern.matches("/widgets/42/parts/big%20bolt").unwrap();
        assert_eq!(params["id"], "42");
        assert_eq!(params["part"], "big bolt");
        assert!(pattern.matches("/widgets/42/parts").is_none());
    }

    #[test]
    fn test_trailing_wildcard() {
        let pattern = PathPattern::parse("/files/*");
        assert_eq!(pattern.matches("/files/a/b.txt").unwrap()[WILDCARD_PARAM], "a/b.txt");
        assert_eq!(pattern.matches("/files").unwrap()[WILDCARD_PARAM], "");
        assert!(pattern.matches("/other/a").is_none());
    }

    #[test]
    fn test_root_pattern() {
        let pattern = PathPattern::parse("/");
        assert!(pattern.matches("/").is_some());
        assert!(pattern.matches("/x").is_none());
    }

    #[test]
    fn test_method_matcher() {
        let any = MethodMatcher::new::<&str>(&[]);
        assert!(any.matches(&Method::DELETE));

        let some = MethodMatcher::new(&["get", "POST"]);
        assert!(some.matches(&Method::GET));
        assert!(some.matches(&Method::POST));
        assert!(!some.matches(&Method::PUT));
    }
}
