//! Path pattern matching.
//!
//! # Responsibilities
//! - Compile route paths such as `/api/users/{id}` or `/files/{rest*}`
//! - Match request paths and capture parameters
//! - Rank patterns so the most specific one wins
//!
//! # Design Decisions
//! - Literal segments are case-sensitive
//! - A catch-all segment is only valid in last position
//! - Trailing slashes are ignored
//! - No regex, matching is a single segment walk

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    CatchAll(String),
}

/// Compiled route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(path: &str) -> Self {
        let parts: Vec<&str> = split(path).collect();
        let last = parts.len().saturating_sub(1);
        let segments = parts
            .iter()
            .enumerate()
            .map(|(i, part)| match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Some(name) if i == last && name.ends_with('*') => {
                    Segment::CatchAll(name.trim_end_matches('*').to_string())
                }
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal((*part).to_string()),
            })
            .collect();

        Self {
            raw: path.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match `path`, returning captured parameters on success.
    pub fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let parts: Vec<&str> = split(path).collect();
        let mut params = BTreeMap::new();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::CatchAll(name) => {
                    params.insert(name.clone(), parts.get(i..).unwrap_or_default().join("/"));
                    return Some(params);
                }
                Segment::Literal(expected) => {
                    if parts.get(i) != Some(&expected.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = parts.get(i)?;
                    params.insert(name.clone(), (*value).to_string());
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }

    /// Ranking key; higher is more specific.
    pub fn specificity(&self) -> (usize, usize, bool) {
        let literals = self
            .segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count();
        let has_catch_all = self
            .segments
            .iter()
            .any(|s| matches!(s, Segment::CatchAll(_)));
        (literals, self.segments.len(), !has_catch_all)
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}
