//! Property paths shared by the schema tree and the theme value tree

use serde::{Deserialize, Serialize};
use std::fmt;

/// Segment of a property path
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object key: a schema property, a visual type or a variant name
    Key(String),
    /// Array position: [0], [1], etc.
    Index(usize),
}

impl PathSegment {
    /// The segment as it appears in a JSON value tree
    pub fn as_key(&self) -> String {
        match self {
            PathSegment::Key(key) => key.clone(),
            PathSegment::Index(idx) => idx.to_string(),
        }
    }

    /// Interpret the segment as an array position, if it can be one
    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathSegment::Key(key) => key.parse().ok(),
            PathSegment::Index(idx) => Some(*idx),
        }
    }
}

/// Location inside both the schema tree and a theme value tree,
/// e.g. `visualStyles.columnChart.*.title` or `border[0].width`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    segments: Vec<PathSegment>,
}

impl PropertyPath {
    /// Create a root path (empty)
    pub fn root() -> Self {
        Self { segments: vec![] }
    }

    /// Build a path from plain string segments. Every segment is a key.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: keys.into_iter().map(|k| PathSegment::Key(k.into())).collect(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Push a key segment
    pub fn push_property(&self, name: &str) -> Self {
        let mut new = self.clone();
        new.segments.push(PathSegment::Key(name.to_string()));
        new
    }

    /// Push an array index segment
    pub fn push_index(&self, idx: usize) -> Self {
        let mut new = self.clone();
        new.segments.push(PathSegment::Index(idx));
        new
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// The last segment that names an object key, skipping array positions.
    /// `title.fontColor[0]` yields `fontColor`.
    pub fn last_key(&self) -> Option<&str> {
        self.segments.iter().rev().find_map(|seg| match seg {
            PathSegment::Key(key) => Some(key.as_str()),
            PathSegment::Index(_) => None,
        })
    }

    /// Get the parent path (without the last segment)
    pub fn parent(&self) -> Self {
        let mut new = self.clone();
        new.segments.pop();
        new
    }

    /// Split off the first segment
    pub fn split_first(&self) -> Option<(&PathSegment, PropertyPath)> {
        self.segments.split_first().map(|(head, rest)| {
            (
                head,
                PropertyPath {
                    segments: rest.to_vec(),
                },
            )
        })
    }

    pub fn segments(&self) -> impl Iterator<Item = &PathSegment> {
        self.segments.iter()
    }

    /// Parse dot/bracket notation: `title.fontSize`, `border[0].width`.
    /// Malformed bracket contents are dropped.
    pub fn parse(s: &str) -> Self {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = s.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '.' => {
                    if !current.is_empty() {
                        segments.push(PathSegment::Key(std::mem::take(&mut current)));
                    }
                }
                '[' => {
                    if !current.is_empty() {
                        segments.push(PathSegment::Key(std::mem::take(&mut current)));
                    }
                    let mut index_str = String::new();
                    for c in chars.by_ref() {
                        if c == ']' {
                            break;
                        }
                        index_str.push(c);
                    }
                    if let Ok(idx) = index_str.parse::<usize>() {
                        segments.push(PathSegment::Index(idx));
                    }
                }
                _ => current.push(ch),
            }
        }

        if !current.is_empty() {
            segments.push(PathSegment::Key(current));
        }

        Self { segments }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            match seg {
                PathSegment::Key(name) if i == 0 => write!(f, "{}", name)?,
                PathSegment::Key(name) => write!(f, ".{}", name)?,
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

impl From<Vec<String>> for PropertyPath {
    fn from(keys: Vec<String>) -> Self {
        Self::from_keys(keys)
    }
}

impl From<&[&str]> for PropertyPath {
    fn from(keys: &[&str]) -> Self {
        Self::from_keys(keys.iter().copied())
    }
}

// Paths travel over the wire as plain string arrays, the same shape the
// theme editor uses for its property locations.
impl Serialize for PropertyPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let keys: Vec<String> = self.segments.iter().map(PathSegment::as_key).collect();
        keys.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PropertyPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let keys = Vec::<String>::deserialize(deserializer)?;
        Ok(Self::from_keys(keys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_path_building() {
        let path = PropertyPath::root()
            .push_property("title")
            .push_index(0)
            .push_property("fontColor");

        assert_eq!(path.to_string(), "title[0].fontColor");
        assert_eq!(path.depth(), 3);
        assert_eq!(path.last_key(), Some("fontColor"));
    }

    #[test]
    fn test_property_path_parse() {
        let path = PropertyPath::parse("visualStyles.columnChart.*.border[1].width");
        assert_eq!(path.depth(), 6);
        assert_eq!(path.to_string(), "visualStyles.columnChart.*.border[1].width");
        assert_eq!(path.segments().nth(4), Some(&PathSegment::Index(1)));
    }

    #[test]
    fn test_last_key_skips_indices() {
        let path = PropertyPath::parse("dataColors[3]");
        assert_eq!(path.last_key(), Some("dataColors"));
        assert_eq!(PropertyPath::root().last_key(), None);
    }

    #[test]
    fn test_serde_as_string_array() {
        let path = PropertyPath::root().push_property("border").push_index(2);
        let json = serde_json::to_value(&path).unwrap();
        assert_eq!(json, serde_json::json!(["border", "2"]));

        let back: PropertyPath = serde_json::from_value(json).unwrap();
        assert_eq!(back.segments().nth(1).and_then(PathSegment::as_index), Some(2));
    }
}
