//! Route matching logic.
//!
//! # Responsibilities
//! - Match path prefix (segment boundary, case-sensitive)
//! - Match path templates with `{name}` segment captures
//! - Match request method against an allow list
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Empty method list = always matches (wildcard)
//! - No regex to guarantee O(n) matching

use axum::http::Method;

use crate::routing::router::RouteError;

/// Path parameters captured by a template match, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// An exact path with optional `{name}` segments, e.g. `/users/{id}`.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    pattern: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a pattern. A missing leading `/` is added.
    pub fn parse(pattern: &str) -> Result<Self, RouteError> {
        let pattern = rooted(pattern);
        let mut segments = Vec::new();

        for raw in pattern[1..].split('/') {
            if let Some(name) = raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                if name.is_empty() || name.contains(&['{', '}'][..]) {
                    return Err(RouteError::InvalidPattern(pattern));
                }
                segments.push(Segment::Param(name.to_string()));
            } else if raw.contains(&['{', '}'][..]) {
                return Err(RouteError::InvalidPattern(pattern));
            } else {
                segments.push(Segment::Literal(raw.to_string()));
            }
        }

        Ok(Self { pattern, segments })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Names of the `{name}` segments, in pattern order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Match `path` exactly, returning the captured parameters.
    pub fn captures(&self, path: &str) -> Option<PathParams> {
        let rest = path.strip_prefix('/')?;
        let mut parts = rest.split('/');
        let mut params = Vec::new();

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(lit) => {
                    if lit != part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    params.push((name.clone(), part.to_string()));
                }
            }
        }

        if parts.next().is_some() {
            return None;
        }
        Some(PathParams(params))
    }
}

/// Matches a path prefix on a segment boundary: `/api` matches `/api`
/// and `/api/x` but not `/apis`.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher. Trailing slashes are ignored.
    pub fn new(prefix: &str) -> Self {
        let rooted = rooted(prefix);
        let trimmed = rooted.trim_end_matches('/');
        Self {
            prefix: if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() },
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn matches(&self, path: &str) -> bool {
        if self.prefix == "/" {
            return true;
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

/// Path condition of a route.
#[derive(Debug, Clone)]
pub enum PathMatcher {
    Prefix(PathPrefixMatcher),
    Template(PathTemplate),
}

impl PathMatcher {
    /// Build the matcher for a route registration: an empty `path` means a
    /// prefix route, otherwise an exact template below the prefix.
    pub fn for_route(path: &str, path_prefix: &str) -> Result<Self, RouteError> {
        if path.is_empty() {
            Ok(PathMatcher::Prefix(PathPrefixMatcher::new(path_prefix)))
        } else {
            PathTemplate::parse(&crate::routing::path::join(path_prefix, path)).map(PathMatcher::Template)
        }
    }

    pub fn match_path(&self, path: &str) -> Option<PathParams> {
        match self {
            PathMatcher::Prefix(p) => p.matches(path).then(PathParams::default),
            PathMatcher::Template(t) => t.captures(path),
        }
    }

    pub fn pattern(&self) -> &str {
        match self {
            PathMatcher::Prefix(p) => p.prefix(),
            PathMatcher::Template(t) => t.pattern(),
        }
    }

    /// Sort key: lower sorts first. Templates beat prefixes, then more
    /// literal segments, then longer prefixes.
    pub(crate) fn precedence(&self) -> (u8, usize) {
        match self {
            PathMatcher::Template(t) => (0, usize::MAX - t.literal_count()),
            PathMatcher::Prefix(p) => (1, usize::MAX - p.prefix().len()),
        }
    }
}

/// Matches the request method. No methods means any method.
#[derive(Debug, Clone, Default)]
pub struct MethodMatcher {
    allowed: Vec<Method>,
}

impl MethodMatcher {
    pub fn parse(methods: &[String]) -> Result<Self, RouteError> {
        let allowed = methods
            .iter()
            .map(|m| {
                Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes())
                    .map_err(|_| RouteError::InvalidMethod(m.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { allowed })
    }

    pub fn matches(&self, method: &Method) -> bool {
        self.allowed.is_empty() || self.allowed.contains(method)
    }
}

/// Names of every `{name}` placeholder in `text`, in order of appearance.
pub fn placeholders(text: &str) -> Vec<&str> {
    text.split('{')
        .skip(1)
        .filter_map(|rest| rest.split_once('}').map(|(name, _)| name))
        .collect()
}

fn rooted(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}
