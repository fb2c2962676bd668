//! Attribute trails, attribute patterns, and unknown sets.
//!
//! An [`Attribute`] names a value by the path that produced it: a root
//! variable followed by field and index qualifiers, e.g.
//! `request.headers["x"]`. While attribute tracking is on, every value on
//! the evaluator stack carries an [`AttributeTrail`] so the engine can tell
//! when it is about to read something the caller declared unknown or
//! missing through an [`AttributePattern`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::value::{number, EvalError, Value};

/// One step of an attribute path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Qualifier {
    /// Field select or string map key.
    String(Arc<str>),
    Int(i64),
    UInt(u64),
    Bool(bool),
}

impl Qualifier {
    pub fn field(name: &str) -> Self {
        Qualifier::String(Arc::from(name))
    }

    /// Qualifier for an index or key value. Integral doubles qualify as
    /// ints; other kinds cannot qualify an attribute.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Qualifier::String(s.clone())),
            Value::Int(i) => Some(Qualifier::Int(*i)),
            Value::UInt(u) => Some(Qualifier::UInt(*u)),
            Value::Bool(b) => Some(Qualifier::Bool(*b)),
            Value::Double(d) => number::double_as_int(*d).map(Qualifier::Int),
            _ => None,
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Qualifier::String(s) if is_identifier(s) => write!(f, ".{}", s),
            Qualifier::String(s) => write!(f, "[{:?}]", s),
            Qualifier::Int(i) => write!(f, "[{}]", i),
            Qualifier::UInt(u) => write!(f, "[{}u]", u),
            Qualifier::Bool(b) => write!(f, "[{}]", b),
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A root variable plus the qualifiers applied to it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attribute {
    variable: Arc<str>,
    qualifiers: Vec<Qualifier>,
}

impl Attribute {
    pub fn new(variable: impl Into<Arc<str>>) -> Self {
        Self {
            variable: variable.into(),
            qualifiers: Vec::new(),
        }
    }

    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.push(qualifier);
        self
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn qualifiers(&self) -> &[Qualifier] {
        &self.qualifiers
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.variable)?;
        for qualifier in &self.qualifiers {
            write!(f, "{}", qualifier)?;
        }
        Ok(())
    }
}

/// The attribute a value was derived from, or nothing when tracking is off
/// or the value is computed (a function result, a literal).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeTrail {
    attribute: Option<Arc<Attribute>>,
}

impl AttributeTrail {
    pub fn new(variable: &str) -> Self {
        Self {
            attribute: Some(Arc::new(Attribute::new(variable))),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.attribute.is_none()
    }

    pub fn attribute(&self) -> Option<&Attribute> {
        self.attribute.as_deref()
    }

    /// Extend the trail by one qualifier. An empty trail stays empty.
    pub fn step(&self, qualifier: Qualifier) -> Self {
        Self {
            attribute: self
                .attribute
                .as_ref()
                .map(|attr| Arc::new(attr.as_ref().clone().with_qualifier(qualifier))),
        }
    }
}

/// How a pattern relates to an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    None,
    /// The attribute is a strict prefix of the pattern.
    Partial,
    /// The pattern equals the attribute or is a prefix of it.
    Full,
}

/// A qualifier position in a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QualifierPattern {
    Exact(Qualifier),
    /// Matches any qualifier (`*`).
    Wildcard,
}

impl QualifierPattern {
    fn matches(&self, qualifier: &Qualifier) -> bool {
        match self {
            QualifierPattern::Wildcard => true,
            QualifierPattern::Exact(q) => q == qualifier,
        }
    }
}

/// A caller-declared attribute, possibly with wildcards, that is unknown or
/// missing for an evaluation.
///
/// ```
/// use cel_core_runtime::{Attribute, AttributePattern, MatchType, Qualifier};
///
/// let pattern = AttributePattern::new("request").field("headers").wildcard();
/// let attr = Attribute::new("request")
///     .with_qualifier(Qualifier::field("headers"))
///     .with_qualifier(Qualifier::field("x"));
/// assert_eq!(pattern.matches(&attr), MatchType::Full);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePattern {
    variable: String,
    qualifiers: Vec<QualifierPattern>,
}

impl AttributePattern {
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            qualifiers: Vec::new(),
        }
    }

    pub fn field(self, name: &str) -> Self {
        self.qualifier(QualifierPattern::Exact(Qualifier::field(name)))
    }

    pub fn index(self, index: i64) -> Self {
        self.qualifier(QualifierPattern::Exact(Qualifier::Int(index)))
    }

    pub fn key(self, key: Qualifier) -> Self {
        self.qualifier(QualifierPattern::Exact(key))
    }

    pub fn wildcard(self) -> Self {
        self.qualifier(QualifierPattern::Wildcard)
    }

    pub fn qualifier(mut self, qualifier: QualifierPattern) -> Self {
        self.qualifiers.push(qualifier);
        self
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn matches(&self, attribute: &Attribute) -> MatchType {
        if self.variable != attribute.variable() {
            return MatchType::None;
        }
        let matched = self
            .qualifiers
            .iter()
            .zip(attribute.qualifiers())
            .all(|(pattern, qualifier)| pattern.matches(qualifier));
        if !matched {
            MatchType::None
        } else if self.qualifiers.len() <= attribute.qualifiers().len() {
            MatchType::Full
        } else {
            MatchType::Partial
        }
    }
}

/// The attributes an unknown result depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UnknownSet {
    attributes: BTreeSet<Attribute>,
}

impl UnknownSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_attribute(attribute: Attribute) -> Self {
        Self {
            attributes: BTreeSet::from([attribute]),
        }
    }

    pub fn from_attributes(attributes: impl IntoIterator<Item = Attribute>) -> Self {
        Self {
            attributes: attributes.into_iter().collect(),
        }
    }

    /// Set union of the two sets.
    pub fn merge(&self, other: &UnknownSet) -> UnknownSet {
        let mut merged = self.clone();
        merged.merge_from(other);
        merged
    }

    pub fn merge_from(&mut self, other: &UnknownSet) {
        self.attributes.extend(other.attributes.iter().cloned());
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    pub fn contains(&self, attribute: &Attribute) -> bool {
        self.attributes.contains(attribute)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl fmt::Display for UnknownSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, attr) in self.attributes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", attr)?;
        }
        Ok(())
    }
}

/// Pattern checks and unknown merging for one evaluation.
///
/// The pattern slices are empty when the matching feature is disabled, so
/// every check is a no-op in that case.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AttributeUtility<'a> {
    unknown_patterns: &'a [AttributePattern],
    missing_patterns: &'a [AttributePattern],
}

impl<'a> AttributeUtility<'a> {
    pub(crate) fn new(
        unknown_patterns: &'a [AttributePattern],
        missing_patterns: &'a [AttributePattern],
    ) -> Self {
        Self {
            unknown_patterns,
            missing_patterns,
        }
    }

    /// True if the trail is covered by a missing-attribute pattern.
    pub(crate) fn check_for_missing_attribute(&self, trail: &AttributeTrail) -> bool {
        trail.attribute().is_some_and(|attr| {
            self.missing_patterns
                .iter()
                .any(|p| p.matches(attr) == MatchType::Full)
        })
    }

    /// True if the trail is covered by an unknown pattern. With
    /// `use_partial`, a trail that is only a prefix of a pattern counts too.
    pub(crate) fn check_for_unknown(&self, trail: &AttributeTrail, use_partial: bool) -> bool {
        trail.attribute().is_some_and(|attr| {
            self.unknown_patterns.iter().any(|p| match p.matches(attr) {
                MatchType::Full => true,
                MatchType::Partial => use_partial,
                MatchType::None => false,
            })
        })
    }

    pub(crate) fn create_unknown_set(&self, trail: &AttributeTrail) -> UnknownSet {
        trail
            .attribute()
            .map(|attr| UnknownSet::from_attribute(attr.clone()))
            .unwrap_or_default()
    }

    pub(crate) fn create_missing_attribute_error(&self, trail: &AttributeTrail) -> EvalError {
        let name = trail
            .attribute()
            .map(|attr| attr.to_string())
            .unwrap_or_default();
        EvalError::missing_attribute(&name)
    }

    /// Merge every `Unknown` among the values.
    pub(crate) fn merge_unknowns<'v>(
        &self,
        values: impl IntoIterator<Item = &'v Value>,
    ) -> Option<UnknownSet> {
        let mut merged: Option<UnknownSet> = None;
        for value in values {
            if let Value::Unknown(set) = value {
                merged.get_or_insert_with(UnknownSet::new).merge_from(set);
            }
        }
        merged
    }

    /// Merge the unknowns in a batch of arguments: values that are already
    /// `Unknown`, plus values whose trails match an unknown pattern.
    pub(crate) fn identify_and_merge_unknowns(
        &self,
        values: &[Value],
        trails: &[AttributeTrail],
        use_partial: bool,
    ) -> Option<UnknownSet> {
        let mut merged: Option<UnknownSet> = None;
        for (i, value) in values.iter().enumerate() {
            if let Value::Unknown(set) = value {
                merged.get_or_insert_with(UnknownSet::new).merge_from(set);
                continue;
            }
            if let Some(trail) = trails.get(i) {
                if self.check_for_unknown(trail, use_partial) {
                    merged
                        .get_or_insert_with(UnknownSet::new)
                        .merge_from(&self.create_unknown_set(trail));
                }
            }
        }
        merged
    }
}
