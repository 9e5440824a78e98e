//! Attribute clause rendering for Marathon and Metronome.
//!
//! Both schedulers match a clause's regex against an agent attribute holding
//! a comma separated tag list, e.g. `"org-1,workspace-dev,location-es"`. A
//! [`TermGroup`] renders an OR of tags anchored on word boundaries:
//!
//! ```text
//! [job]        => .*\b(job\b.*)
//! [job, any]   => .*\b(job\b.*|any\b.*)
//! prefix(org-) => .*\b(org-[^,]+\b.*)
//! ```
//!
//! The schedulers AND every clause of an app, so AND is expressed by
//! emitting several clauses rather than by composing regexes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Clause operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// The attribute must match the pattern.
    Like,
    /// The attribute must not match the pattern.
    Unlike,
}

impl Operator {
    /// `Like` when `matching`, `Unlike` otherwise.
    pub fn when(matching: bool) -> Self {
        if matching {
            Operator::Like
        } else {
            Operator::Unlike
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Like => "LIKE",
            Operator::Unlike => "UNLIKE",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LIKE" => Ok(Operator::Like),
            "UNLIKE" => Ok(Operator::Unlike),
            other => Err(format!("unsupported constraint operator: {other}")),
        }
    }
}

/// An OR group of tag alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermGroup {
    alternatives: Vec<String>,
}

impl TermGroup {
    /// Group matching a single tag.
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            alternatives: vec![tag.into()],
        }
    }

    /// Group matching any of `tags`, in order.
    pub fn any_of<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            alternatives: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Group matching any tag that starts with `prefix`.
    pub fn prefix(prefix: &str) -> Self {
        Self::tag(format!("{prefix}[^,]+"))
    }

    /// Add another alternative.
    pub fn or(mut self, tag: impl Into<String>) -> Self {
        self.alternatives.push(tag.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }

    /// Render the regex. `None` for an empty group, which has no meaning.
    pub fn render(&self) -> Option<String> {
        if self.alternatives.is_empty() {
            return None;
        }
        let body = self
            .alternatives
            .iter()
            .map(|alt| format!(r"{alt}\b.*"))
            .collect::<Vec<_>>()
            .join("|");
        Some(format!(r".*\b({body})"))
    }
}

/// One `(attribute, operator, pattern)` clause.
///
/// Serializes as the 3-element array Marathon and Metronome expect:
/// `["dice_tags", "LIKE", ".*\\b(job\\b.*)"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "[String; 3]", try_from = "[String; 3]")]
pub struct AttributeConstraint {
    pub attribute: String,
    pub operator: Operator,
    pub pattern: String,
}

impl AttributeConstraint {
    pub fn new(attribute: impl Into<String>, operator: Operator, pattern: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            operator,
            pattern: pattern.into(),
        }
    }

    /// Clause over a rendered group. `None` when the group is empty.
    pub fn group(attribute: &str, operator: Operator, group: &TermGroup) -> Option<Self> {
        group
            .render()
            .map(|pattern| Self::new(attribute, operator, pattern))
    }
}

impl From<AttributeConstraint> for [String; 3] {
    fn from(c: AttributeConstraint) -> Self {
        [c.attribute, c.operator.as_str().to_string(), c.pattern]
    }
}

impl TryFrom<[String; 3]> for AttributeConstraint {
    type Error = String;

    fn try_from([attribute, operator, pattern]: [String; 3]) -> Result<Self, Self::Error> {
        Ok(Self {
            attribute,
            operator: operator.parse()?,
            pattern,
        })
    }
}
