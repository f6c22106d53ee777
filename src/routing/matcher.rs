//! Route path patterns.
//!
//! # Responsibilities
//! - Parse `/{service}{route}` into literal, parameter and wildcard segments
//! - Match a request path segment by segment, capturing parameters
//! - Rank patterns by specificity so the router can pick the best match
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Each segment is percent-decoded before comparison, so `li%73t` matches
//!   `list`; an encoded `%2F` stays inside its segment
//! - Trailing slashes are significant (`/a/b/` does not match `/a/b`)
//! - `{name}` captures exactly one non-empty segment
//! - `{*name}` must be last and captures zero or more remaining segments
//! - No regex to guarantee O(n) matching

use std::borrow::Cow;
use std::fmt;

/// Error produced when a route path cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("path must start with '/'")]
    MissingLeadingSlash,
    #[error("segment '{0}' has an empty parameter name")]
    EmptyParam(String),
    #[error("segment '{0}' mixes literal text and a parameter")]
    InvalidSegment(String),
    #[error("wildcard '{0}' must be the last segment")]
    WildcardNotLast(String),
    #[error("parameter '{0}' appears more than once")]
    DuplicateParam(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Wildcard(String),
}

impl Segment {
    fn parse(raw: &str) -> Result<Self, PatternError> {
        let Some(inner) = raw.strip_prefix('{') else {
            if raw.contains(['{', '}']) {
                return Err(PatternError::InvalidSegment(raw.to_string()));
            }
            return Ok(Segment::Literal(raw.to_string()));
        };

        let inner = inner
            .strip_suffix('}')
            .ok_or_else(|| PatternError::InvalidSegment(raw.to_string()))?;
        if inner.contains(['{', '}']) {
            return Err(PatternError::InvalidSegment(raw.to_string()));
        }

        match inner.strip_prefix('*') {
            Some("") => Err(PatternError::EmptyParam(raw.to_string())),
            Some(name) => Ok(Segment::Wildcard(name.to_string())),
            None if inner.is_empty() => Err(PatternError::EmptyParam(raw.to_string())),
            None => Ok(Segment::Param(inner.to_string())),
        }
    }
}

/// Percent-decode one path segment. Invalid UTF-8 is left encoded.
pub fn decode_segment(raw: &str) -> Cow<'_, str> {
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

/// Parameters captured while matching a path, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    /// Value captured for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How specific a pattern is. Greater is more specific.
///
/// Compared field by field: literal segment count first, then patterns
/// without a wildcard, then total segment count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity {
    literals: usize,
    exact: bool,
    segments: usize,
}

/// A compiled route path such as `/upload/files/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parse a full path pattern. Must start with `/`.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let body = raw
            .strip_prefix('/')
            .ok_or(PatternError::MissingLeadingSlash)?;

        let mut segments = Vec::new();
        for part in body.split('/') {
            if let Some(Segment::Wildcard(name)) = segments.last() {
                return Err(PatternError::WildcardNotLast(name.clone()));
            }
            let segment = Segment::parse(part)?;
            if let Segment::Param(name) | Segment::Wildcard(name) = &segment {
                let seen = segments.iter().any(|s| {
                    matches!(s, Segment::Param(n) | Segment::Wildcard(n) if n == name)
                });
                if seen {
                    return Err(PatternError::DuplicateParam(name.clone()));
                }
            }
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match `path`, returning captured parameters on success.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let parts: Vec<Cow<'_, str>> = path
            .strip_prefix('/')?
            .split('/')
            .map(decode_segment)
            .collect();
        let mut params = Vec::new();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(literal) => {
                    if parts.get(i)?.as_ref() != literal.as_str() {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = parts.get(i)?;
                    if value.is_empty() {
                        return None;
                    }
                    params.push((name.clone(), value.to_string()));
                }
                Segment::Wildcard(name) => {
                    let rest = parts.get(i..).map(|r| r.join("/")).unwrap_or_default();
                    params.push((name.clone(), rest));
                    return Some(PathParams(params));
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(PathParams(params))
    }

    pub fn specificity(&self) -> Specificity {
        Specificity {
            literals: self
                .segments
                .iter()
                .filter(|s| matches!(s, Segment::Literal(_)))
                .count(),
            exact: !matches!(self.segments.last(), Some(Segment::Wildcard(_))),
            segments: self.segments.len(),
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        let pattern = PathPattern::parse("/orders/list").unwrap();
        assert_eq!(pattern.matches("/orders/list"), Some(PathParams::default()));
        assert!(pattern.matches("/orders/list/").is_none());
        assert!(pattern.matches("/orders").is_none());
        assert!(pattern.matches("/orders/list/extra").is_none());
        assert!(pattern.matches("/Orders/list").is_none());
        assert!(pattern.matches("orders/list").is_none());
    }

    #[test]
    fn test_param_capture() {
        let pattern = PathPattern::parse("/upload/files/{id}").unwrap();
        let params = pattern.matches("/upload/files/42").unwrap();
        assert_eq!(params.get("id"), Some("42"));
        assert!(pattern.matches("/upload/files/").is_none());
        assert!(pattern.matches("/upload/files/42/raw").is_none());
    }

    #[test]
    fn test_wildcard_capture() {
        let pattern = PathPattern::parse("/static/{*rest}").unwrap();
        assert_eq!(
            pattern.matches("/static/css/site.css").unwrap().get("rest"),
            Some("css/site.css")
        );
        assert_eq!(pattern.matches("/static").unwrap().get("rest"), Some(""));
        assert!(pattern.matches("/other/file").is_none());
    }

    #[test]
    fn test_percent_encoded_segments() {
        let pattern = PathPattern::parse("/orders/list").unwrap();
        assert!(pattern.matches("/orders/li%73t").is_some());
        assert!(pattern.matches("/%6Frders/list").is_some());

        let pattern = PathPattern::parse("/files/{name}").unwrap();
        let params = pattern.matches("/files/my%20report").unwrap();
        assert_eq!(params.get("name"), Some("my report"));
        // An encoded slash does not split the segment.
        let params = pattern.matches("/files/a%2Fb").unwrap();
        assert_eq!(params.get("name"), Some("a/b"));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            PathPattern::parse("orders"),
            Err(PatternError::MissingLeadingSlash)
        );
        assert!(matches!(
            PathPattern::parse("/a/{}"),
            Err(PatternError::EmptyParam(_))
        ));
        assert!(matches!(
            PathPattern::parse("/a/{*}"),
            Err(PatternError::EmptyParam(_))
        ));
        assert!(matches!(
            PathPattern::parse("/a/{id"),
            Err(PatternError::InvalidSegment(_))
        ));
        assert!(matches!(
            PathPattern::parse("/a/file{id}"),
            Err(PatternError::InvalidSegment(_))
        ));
        assert!(matches!(
            PathPattern::parse("/a/{*rest}/b"),
            Err(PatternError::WildcardNotLast(_))
        ));
        assert!(matches!(
            PathPattern::parse("/a/{id}/{id}"),
            Err(PatternError::DuplicateParam(_))
        ));
    }

    #[test]
    fn test_specificity_order() {
        let literal = PathPattern::parse("/a/b").unwrap().specificity();
        let param = PathPattern::parse("/a/{x}").unwrap().specificity();
        let wildcard = PathPattern::parse("/a/{*x}").unwrap().specificity();
        let deep_wildcard = PathPattern::parse("/a/b/{*x}").unwrap().specificity();

        assert!(literal > param);
        assert!(param > wildcard);
        assert!(deep_wildcard > wildcard);
    }
}
