//! Path pattern matching.
//!
//! A pattern is either the wildcard `*`, which matches every path, or a `/`-separated list of
//! segments where a segment starting with `:` captures the path segment at the same position:
//!
//! ```
//! use switchyard_web::router::matcher::{match_route, MatchResult};
//!
//! let matched = match_route("/users/:id", "/users/42");
//! assert_eq!(matched.params().and_then(|p| p.get("id")).map(String::as_str), Some("42"));
//! assert_eq!(match_route("/users/:id", "/users/42/posts"), MatchResult::NoMatch);
//! ```
//!
//! Both the pattern and the path are split on `/` and the first element, the empty string in
//! front of the leading slash, is dropped. Segment counts must agree. An empty pattern segment
//! (from `//` or a trailing slash) only matches an empty path segment.
//!
//! The path is split while still percent-encoded and each segment is decoded afterwards, so an
//! encoded slash stays inside its segment:
//!
//! ```
//! use switchyard_web::router::matcher::match_route;
//!
//! let matched = match_route("/files/:name", "/files/a%2Fb");
//! assert_eq!(matched.params().and_then(|p| p.get("name")).map(String::as_str), Some("a/b"));
//! ```

use crate::request::{decode_path, Params};

const WILDCARD: &str = "*";
const PARAM_MARKER: char = ':';

/// The outcome of matching a path against a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    NoMatch,
    Match(Params),
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match(_))
    }

    /// The captured parameters, if the path matched.
    pub fn params(&self) -> Option<&Params> {
        match self {
            Self::Match(params) => Some(params),
            Self::NoMatch => None,
        }
    }

    pub fn into_params(self) -> Option<Params> {
        match self {
            Self::Match(params) => Some(params),
            Self::NoMatch => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    /// Captures the path segment under this name, which may be empty for a bare `:`.
    Param(String),
}

/// A pattern parsed once at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePattern {
    Wildcard,
    Segments(Vec<Segment>),
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Self {
        if pattern == WILDCARD {
            return Self::Wildcard;
        }

        let segments = split_segments(pattern)
            .map(|segment| match segment.strip_prefix(PARAM_MARKER) {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(segment.to_string()),
            })
            .collect();
        Self::Segments(segments)
    }

    /// Matches a raw, still percent-encoded, request path.
    pub fn matches(&self, path: &str) -> MatchResult {
        let segments = match self {
            Self::Wildcard => return MatchResult::Match(Params::new()),
            Self::Segments(segments) => segments,
        };

        let path_segments: Vec<String> = split_segments(path).map(decode_path).collect();
        if path_segments.len() != segments.len() {
            return MatchResult::NoMatch;
        }

        let mut params = Params::new();
        for (segment, value) in segments.iter().zip(path_segments) {
            match segment {
                Segment::Literal(literal) if *literal == value => {}
                Segment::Param(name) if value.strip_prefix(PARAM_MARKER) == Some(name.as_str()) => {}
                Segment::Param(name) => {
                    params.insert(name.clone(), value);
                }
                Segment::Literal(_) => return MatchResult::NoMatch,
            }
        }

        MatchResult::Match(params)
    }
}

/// Matches `path` against `pattern` without keeping the parsed pattern around.
pub fn match_route(pattern: &str, path: &str) -> MatchResult {
    RoutePattern::parse(pattern).matches(path)
}

fn split_segments(s: &str) -> impl Iterator<Item = &str> {
    s.split('/').skip(1)
}
