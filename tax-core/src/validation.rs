//! Structural checks on raw JSON request bodies.
//!
//! Typed deserialization silently tolerates repeated keys (last one wins)
//! and does not care about key order. The checks here run on the raw text
//! first, so payloads with either defect are rejected before they reach the
//! engine.
//!
//! The text is walked once as a token stream with a [`serde`] visitor over
//! [`serde_json::Deserializer`]. Keys are only ever compared against keys of
//! the same object, so a marker name appearing inside a string value is not
//! mistaken for a key.

use std::collections::HashSet;
use std::fmt;

use serde::de::{self, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use thiserror::Error;
use tracing::warn;

use crate::models::FlatShape;

/// Violations found while inspecting the raw body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StructuralError {
    #[error("request body is empty")]
    EmptyBody,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("request body must be a JSON object")]
    NotAnObject,

    #[error("{0} is duplicated, please check and fill again")]
    DuplicateMarker(String),

    #[error("key '{0}' appears more than once in the same object")]
    DuplicateKey(String),

    #[error("expected {expected} top-level keys, found {found}")]
    KeyCount { expected: usize, found: usize },

    #[error("keys must be in the order {expected:?}, found {found:?}")]
    KeyOrder {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
}

/// Everything the checks need to know about a body, gathered in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyReport {
    /// First-level keys in literal order, repeats kept in place.
    top_level: Vec<String>,

    /// Keys seen more than once within a single object, at any depth.
    duplicates: Vec<String>,
}

impl KeyReport {
    /// Number of distinct first-level keys.
    pub fn count_top_level_keys(&self) -> usize {
        self.top_level.iter().collect::<HashSet<_>>().len()
    }

    pub fn ordered_top_level_keys(&self) -> &[String] {
        &self.top_level
    }

    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    /// Fails when any of `markers` was repeated within one object.
    pub fn check_no_duplicate_marker(
        &self,
        markers: &[&str],
    ) -> Result<(), StructuralError> {
        match self
            .duplicates
            .iter()
            .find(|key| markers.contains(&key.as_str()))
        {
            Some(marker) => {
                warn!(%marker, "rejected duplicated marker");
                Err(StructuralError::DuplicateMarker(marker.clone()))
            }
            None => Ok(()),
        }
    }

    /// Fails when any key was repeated within one object.
    pub fn check_no_duplicate_keys(&self) -> Result<(), StructuralError> {
        match self.duplicates.first() {
            Some(key) => {
                warn!(%key, "rejected duplicated key");
                Err(StructuralError::DuplicateKey(key.clone()))
            }
            None => Ok(()),
        }
    }

    /// Fails unless there are exactly `expected` distinct first-level keys.
    pub fn check_key_count(
        &self,
        expected: usize,
    ) -> Result<(), StructuralError> {
        let found = self.count_top_level_keys();
        if found != expected {
            warn!(expected, found, "rejected top-level key count");
            return Err(StructuralError::KeyCount { expected, found });
        }
        Ok(())
    }

    /// The first `expected.len()` keys must be `expected`, in that order.
    pub fn check_order(
        &self,
        expected: &[&str],
    ) -> Result<(), StructuralError> {
        let matches = self.top_level.len() >= expected.len()
            && self.top_level.iter().zip(expected).all(|(found, want)| found == want);

        if !matches {
            warn!(?expected, found = ?self.top_level, "rejected key order");
            return Err(StructuralError::KeyOrder {
                expected: expected.iter().map(|key| key.to_string()).collect(),
                found: self.top_level.clone(),
            });
        }
        Ok(())
    }

    /// Fails unless the key count equals the number of fields `T` recognises.
    pub fn match_field_count<T: FlatShape>(&self) -> Result<(), StructuralError> {
        let expected = T::FIELDS.len();
        let found = self.count_top_level_keys();
        if found != expected {
            return Err(StructuralError::FieldCount { expected, found });
        }
        Ok(())
    }
}

/// Rejects a body that is empty or only whitespace.
pub fn check_not_empty(raw: &str) -> Result<(), StructuralError> {
    if raw.trim().is_empty() {
        return Err(StructuralError::EmptyBody);
    }
    Ok(())
}

/// Walks `raw` and collects its key layout.
///
/// # Errors
///
/// Returns [`StructuralError::InvalidJson`] for malformed text (including
/// trailing content) and [`StructuralError::NotAnObject`] when the root is
/// not an object.
pub fn scan_keys(raw: &str) -> Result<KeyReport, StructuralError> {
    let mut report = KeyReport::default();
    let mut de = serde_json::Deserializer::from_str(raw);

    let root = Node {
        report: &mut report,
        depth: 0,
    }
    .deserialize(&mut de)
    .map_err(|e| StructuralError::InvalidJson(e.to_string()))?;
    de.end()
        .map_err(|e| StructuralError::InvalidJson(e.to_string()))?;

    if root != NodeKind::Object {
        return Err(StructuralError::NotAnObject);
    }
    Ok(report)
}

pub fn count_top_level_keys(raw: &str) -> Result<usize, StructuralError> {
    Ok(scan_keys(raw)?.count_top_level_keys())
}

pub fn ordered_top_level_keys(raw: &str) -> Result<Vec<String>, StructuralError> {
    Ok(scan_keys(raw)?.top_level)
}

pub fn check_order(
    raw: &str,
    expected: &[&str],
) -> Result<(), StructuralError> {
    scan_keys(raw)?.check_order(expected)
}

pub fn check_no_duplicate_marker(
    raw: &str,
    markers: &[&str],
) -> Result<(), StructuralError> {
    scan_keys(raw)?.check_no_duplicate_marker(markers)
}

pub fn check_no_duplicate_keys(raw: &str) -> Result<(), StructuralError> {
    scan_keys(raw)?.check_no_duplicate_keys()
}

pub fn match_field_count<T: FlatShape>(raw: &str) -> Result<(), StructuralError> {
    scan_keys(raw)?.match_field_count::<T>()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Object,
    Other,
}

/// Visitor for one JSON value. Objects at depth zero are the root.
struct Node<'a> {
    report: &'a mut KeyReport,
    depth: usize,
}

impl<'de> DeserializeSeed<'de> for Node<'_> {
    type Value = NodeKind;

    fn deserialize<D>(
        self,
        deserializer: D,
    ) -> Result<Self::Value, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for Node<'_> {
    type Value = NodeKind;

    fn expecting(
        &self,
        formatter: &mut fmt::Formatter,
    ) -> fmt::Result {
        formatter.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(
        self,
        _: bool,
    ) -> Result<NodeKind, E> {
        Ok(NodeKind::Other)
    }

    fn visit_i64<E: de::Error>(
        self,
        _: i64,
    ) -> Result<NodeKind, E> {
        Ok(NodeKind::Other)
    }

    fn visit_u64<E: de::Error>(
        self,
        _: u64,
    ) -> Result<NodeKind, E> {
        Ok(NodeKind::Other)
    }

    fn visit_f64<E: de::Error>(
        self,
        _: f64,
    ) -> Result<NodeKind, E> {
        Ok(NodeKind::Other)
    }

    fn visit_str<E: de::Error>(
        self,
        _: &str,
    ) -> Result<NodeKind, E> {
        Ok(NodeKind::Other)
    }

    fn visit_unit<E: de::Error>(self) -> Result<NodeKind, E> {
        Ok(NodeKind::Other)
    }

    fn visit_seq<A>(
        self,
        mut seq: A,
    ) -> Result<NodeKind, A::Error>
    where
        A: SeqAccess<'de>,
    {
        while seq
            .next_element_seed(Node {
                report: &mut *self.report,
                depth: self.depth + 1,
            })?
            .is_some()
        {}
        Ok(NodeKind::Other)
    }

    fn visit_map<A>(
        self,
        mut map: A,
    ) -> Result<NodeKind, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut seen = HashSet::new();
        while let Some(key) = map.next_key::<String>()? {
            if self.depth == 0 {
                self.report.top_level.push(key.clone());
            }
            if !seen.insert(key.clone()) && !self.report.duplicates.contains(&key) {
                self.report.duplicates.push(key);
            }
            map.next_value_seed(Node {
                report: &mut *self.report,
                depth: self.depth + 1,
            })?;
        }
        Ok(NodeKind::Object)
    }
}
