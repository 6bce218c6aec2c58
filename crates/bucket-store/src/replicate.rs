//! Replication path templates.
//!
//! Operators configure templates like `user/${User}/${Topic}`; clients
//! supply tag values per upload (the HTTP layer derives them from request
//! headers). A template whose tags are all satisfied resolves to a concrete
//! prefix under which a parallel hardlink tree is built. Tag names match
//! case-insensitively; tag values pass a filename sanitizer before becoming
//! path segments.

use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// Tag name, stored uppercase for case-insensitive matching.
    Tag(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplicaTemplate {
    raw: String,
    segments: Vec<Segment>,
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("replica template is empty")]
    Empty,

    #[error("segment '{0}' is neither an alphanumeric directory name nor a '${{Tag-Name}}' token")]
    InvalidSegment(String),

    #[error("template '{0}' contains no '${{Tag-Name}}' token")]
    NoTags(String),
}

impl ReplicaTemplate {
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let trimmed = raw.trim_matches(|c: char| c == '/' || c == '.' || c.is_whitespace());
        if trimmed.is_empty() {
            return Err(TemplateError::Empty);
        }

        let mut segments = Vec::new();
        let mut has_tag = false;
        for part in trimmed.split('/') {
            if let Some(name) = parse_tag(part) {
                segments.push(Segment::Tag(name.to_ascii_uppercase()));
                has_tag = true;
            } else if is_literal(part) {
                segments.push(Segment::Literal(part.to_string()));
            } else {
                return Err(TemplateError::InvalidSegment(part.to_string()));
            }
        }
        if !has_tag {
            return Err(TemplateError::NoTags(trimmed.to_string()));
        }

        Ok(Self {
            raw: trimmed.to_string(),
            segments,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Resolve against client tags. `None` when any tag is missing or
    /// sanitizes to nothing; a partially-matched template produces no tree.
    pub fn resolve(&self, tags: &HashMap<String, String>) -> Option<PathBuf> {
        let upper: HashMap<String, &String> = tags
            .iter()
            .map(|(k, v)| (k.to_ascii_uppercase(), v))
            .collect();

        let mut path = PathBuf::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(lit) => path.push(lit),
                Segment::Tag(name) => {
                    let value = upper.get(name)?;
                    let sanitized = sanitize_segment(value);
                    if sanitized.is_empty() {
                        return None;
                    }
                    path.push(sanitized);
                }
            }
        }
        Some(path)
    }
}

fn parse_tag(part: &str) -> Option<&str> {
    let inner = part.strip_prefix("${")?.strip_suffix('}')?;
    let mut chars = inner.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if inner
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        Some(inner)
    } else {
        None
    }
}

fn is_literal(part: &str) -> bool {
    !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Reduce an arbitrary client-supplied value to a safe directory name:
/// anything outside `[A-Za-z0-9._-]` becomes `_`, and leading dots are
/// stripped so a value can never dot-escape or hide itself.
pub fn sanitize_segment(value: &str) -> String {
    let mapped: String = value
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    mapped.trim_start_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parse_and_resolve() {
        let template = ReplicaTemplate::parse("user/${User}/${Topic}").unwrap();
        let resolved = template
            .resolve(&tags(&[("user", "bob"), ("topic", "demo")]))
            .unwrap();
        assert_eq!(resolved, PathBuf::from("user/bob/demo"));
    }

    #[test]
    fn tag_names_case_insensitive() {
        let template = ReplicaTemplate::parse("t/${X-Team}").unwrap();
        assert!(template.resolve(&tags(&[("x-team", "infra")])).is_some());
        assert!(template.resolve(&tags(&[("X-TEAM", "infra")])).is_some());
    }

    #[test]
    fn missing_tag_resolves_to_none() {
        let template = ReplicaTemplate::parse("user/${User}/${Topic}").unwrap();
        assert!(template.resolve(&tags(&[("user", "bob")])).is_none());
        assert!(template.resolve(&HashMap::new()).is_none());
    }

    #[test]
    fn tag_values_sanitized() {
        let template = ReplicaTemplate::parse("user/${User}").unwrap();
        let resolved = template
            .resolve(&tags(&[("user", "../../etc")]))
            .unwrap();
        assert_eq!(resolved, PathBuf::from("user/_.._etc"));
    }

    #[test]
    fn template_without_tags_rejected() {
        assert!(matches!(
            ReplicaTemplate::parse("static/path"),
            Err(TemplateError::NoTags(_))
        ));
    }

    #[test]
    fn bad_segment_rejected() {
        assert!(matches!(
            ReplicaTemplate::parse("a b/${User}"),
            Err(TemplateError::InvalidSegment(_))
        ));
        assert!(matches!(
            ReplicaTemplate::parse("${}"),
            Err(TemplateError::InvalidSegment(_))
        ));
    }

    #[test]
    fn surrounding_slashes_trimmed() {
        let template = ReplicaTemplate::parse("/user/${User}/").unwrap();
        assert_eq!(template.raw(), "user/${User}");
    }

    #[test]
    fn sanitize_segment_cases() {
        assert_eq!(sanitize_segment("bob"), "bob");
        assert_eq!(sanitize_segment("a b/c"), "a_b_c");
        assert_eq!(sanitize_segment("..hidden"), "hidden");
        assert_eq!(sanitize_segment("  "), "");
    }
}
