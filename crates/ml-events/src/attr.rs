//! Edge Attributes
//!
//! Attribute values carried on relationship edges and the filter used by the
//! graph-driven grouping passes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::ids::LinkType;

/// Attribute map of a single edge
pub type Attributes = BTreeMap<String, AttrValue>;

/// Value of an edge attribute: a number (compared by threshold) or a text
/// tag (compared exactly)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Number(f64),
    Text(String),
}

impl AttrValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            AttrValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            AttrValue::Number(_) => None,
        }
    }

    /// Does `self` satisfy `criterion`?
    ///
    /// Numbers pass when `self >= criterion`, text passes on exact match.
    /// A number never satisfies a text criterion and vice versa.
    pub fn satisfies(&self, criterion: &AttrValue) -> bool {
        match (self, criterion) {
            (AttrValue::Number(v), AttrValue::Number(t)) => v >= t,
            (AttrValue::Text(v), AttrValue::Text(t)) => v == t,
            _ => false,
        }
    }
}

impl From<f64> for AttrValue {
    fn from(n: f64) -> Self {
        AttrValue::Number(n)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Number(n) => write!(f, "{}", n),
            AttrValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Build an attribute map from `(name, value)` pairs
pub fn attributes<I, K, V>(pairs: I) -> Attributes
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<AttrValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Selects which edges count as grouping links.
///
/// - no attribute: every edge qualifies
/// - attribute only: edges carrying that attribute qualify
/// - attribute and value: numeric `>=` threshold or exact text match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<AttrValue>,
}

impl EdgeFilter {
    /// Every edge qualifies
    pub fn any() -> Self {
        Self::default()
    }

    /// Edges carrying `attribute`, whatever its value
    pub fn has(attribute: impl Into<String>) -> Self {
        Self {
            attribute: Some(attribute.into()),
            value: None,
        }
    }

    /// Edges whose numeric `attribute` is at least `threshold`
    pub fn at_least(attribute: impl Into<String>, threshold: f64) -> Self {
        Self {
            attribute: Some(attribute.into()),
            value: Some(AttrValue::Number(threshold)),
        }
    }

    /// Edges whose text `attribute` equals `tag`
    pub fn equals(attribute: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            attribute: Some(attribute.into()),
            value: Some(AttrValue::Text(tag.into())),
        }
    }

    pub fn matches(&self, attrs: &Attributes) -> bool {
        let Some(name) = &self.attribute else {
            return true;
        };
        match (attrs.get(name), &self.value) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(v), Some(criterion)) => v.satisfies(criterion),
        }
    }

    /// Deterministic link type for groupings driven by this filter, so that
    /// distinct attribute-based groupings never share a namespace.
    ///
    /// `has("w")` gives `w`, `at_least("w", 5.0)` gives `w>=5` and
    /// `equals("w", "5")` gives `w=5`. Operator characters inside the
    /// attribute name are backslash-escaped.
    pub fn link_type(&self) -> LinkType {
        match (&self.attribute, &self.value) {
            (None, _) => LinkType::default(),
            (Some(name), None) => LinkType(escape_name(name)),
            (Some(name), Some(AttrValue::Number(threshold))) => {
                LinkType(format!("{}>={}", escape_name(name), threshold))
            }
            (Some(name), Some(AttrValue::Text(tag))) => {
                LinkType(format!("{}={}", escape_name(name), tag))
            }
        }
    }
}

fn escape_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if matches!(ch, '\\' | '>' | '=') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
