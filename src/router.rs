//! Request routing against compiled operations.

use std::fmt;

use crate::compiler::Operation;

/// One `/`-separated piece of a path template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Literal(String),
    /// A `{name}` placeholder; holds the text between the braces.
    Param(String),
}

/// A path template split into segments once, at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a template such as `/dataset/{id}/records`.
    ///
    /// Any segment starting with `{` is a parameter.
    pub fn parse(template: &str) -> Self {
        let segments = template
            .split('/')
            .map(|segment| {
                if segment.starts_with('{') {
                    let name = segment.trim_start_matches('{').trim_end_matches('}');
                    Segment::Param(name.to_string())
                } else {
                    Segment::Literal(segment.to_string())
                }
            })
            .collect();

        Self {
            raw: template.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether a request path matches this template.
    ///
    /// Segment counts must be equal; literals compare byte-exact and
    /// parameters accept any non-empty segment.
    pub fn matches(&self, path: &str) -> bool {
        let mut request = path.split('/');
        let all_match = self
            .segments
            .iter()
            .all(|segment| match (segment, request.next()) {
                (Segment::Param(_), Some(value)) => !value.is_empty(),
                (Segment::Literal(literal), Some(value)) => literal == value,
                (_, None) => false,
            });
        all_match && request.next().is_none()
    }

    /// Parameter values of a matching request path, in template order.
    ///
    /// Returns `None` when the path does not match.
    pub fn captures<'p>(&self, path: &'p str) -> Option<Vec<(&str, &'p str)>> {
        if !self.matches(path) {
            return None;
        }
        let captured = self
            .segments
            .iter()
            .zip(path.split('/'))
            .filter_map(|(segment, value)| match segment {
                Segment::Param(name) => Some((name.as_str(), value)),
                Segment::Literal(_) => None,
            })
            .collect();
        Some(captured)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Find the first operation whose template matches `path` and whose method
/// equals `method`, ignoring case.
///
/// Document order breaks ties, so a literal route declared after an
/// overlapping parameterized one is never reached.
pub fn find_operation<'a>(
    operations: &'a [Operation],
    path: &str,
    method: &str,
) -> Option<&'a Operation> {
    operations
        .iter()
        .find(|op| op.method.matches(method) && op.template.matches(path))
}
