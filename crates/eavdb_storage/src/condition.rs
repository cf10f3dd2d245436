//! Narrowing conditions.
//!
//! A [`Condition`] is the part of a query a backend evaluates. It works on
//! the textual form of attribute values only, so it is allowed to
//! over-approximate: a backend may return ids that do not satisfy the
//! original typed predicate, but it must never drop one that does.
//!
//! ## Semantics
//!
//! Conditions are evaluated **per entity**:
//!
//! - `Kind(k)` holds when the entity's kind equals `k`
//! - `Attribute { .. }` holds when at least one attribute row of the entity
//!   has the given name (and type, if given) and passes the value test
//! - `And` / `Or` combine the per-entity results
//!
//! [`Condition::evaluate`] is the reference implementation of these rules;
//! every backend must agree with it.

use crate::types::{AttributeRow, TypeTag};
use std::fmt;

/// Test applied to the textual value of an attribute row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueTest {
    /// Any stored value.
    Present,
    /// Text equality.
    Eq(String),
    /// Text inequality.
    Ne(String),
    /// Byte-wise lexical less-than.
    Lt(String),
    /// Byte-wise lexical greater-than.
    Gt(String),
    /// Case-insensitive substring containment.
    ContainsIgnoreCase(String),
}

impl ValueTest {
    /// Applies the test to a stored value.
    #[must_use]
    pub fn test(&self, value: &str) -> bool {
        match self {
            Self::Present => true,
            Self::Eq(reference) => value == reference,
            Self::Ne(reference) => value != reference,
            Self::Lt(reference) => value < reference.as_str(),
            Self::Gt(reference) => value > reference.as_str(),
            Self::ContainsIgnoreCase(needle) => contains_ignore_case(value, needle),
        }
    }
}

/// Returns true if `haystack` contains `needle`, ignoring case.
///
/// Both sides are lower-cased with full Unicode rules.
#[must_use]
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// A narrowing condition evaluated by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Always holds.
    True,
    /// Entity kind equals the given label.
    Kind(String),
    /// Some attribute row of the entity passes the test.
    Attribute {
        /// Attribute name.
        name: String,
        /// Required type tag, `None` for any type.
        type_tag: Option<TypeTag>,
        /// Test on the textual value.
        test: ValueTest,
    },
    /// All children hold. An empty conjunction holds.
    And(Vec<Condition>),
    /// At least one child holds. An empty disjunction never holds.
    Or(Vec<Condition>),
}

impl Condition {
    /// Creates a kind condition.
    pub fn kind(kind: impl Into<String>) -> Self {
        Self::Kind(kind.into())
    }

    /// Creates an attribute condition.
    pub fn attribute(name: impl Into<String>, type_tag: Option<TypeTag>, test: ValueTest) -> Self {
        Self::Attribute {
            name: name.into(),
            type_tag,
            test,
        }
    }

    /// Conjoins conditions.
    ///
    /// Nested conjunctions are flattened and `True` children dropped. A
    /// single remaining child is returned as-is.
    pub fn and(conditions: impl IntoIterator<Item = Condition>) -> Self {
        let mut flat = Vec::new();
        for condition in conditions {
            match condition {
                Self::True => {}
                Self::And(children) => flat.extend(children),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Self::True,
            1 => flat.pop().unwrap_or(Self::True),
            _ => Self::And(flat),
        }
    }

    /// Disjoins conditions.
    ///
    /// Nested disjunctions are flattened. Any `True` child makes the whole
    /// disjunction `True`.
    pub fn or(conditions: impl IntoIterator<Item = Condition>) -> Self {
        let mut flat = Vec::new();
        for condition in conditions {
            match condition {
                Self::True => return Self::True,
                Self::Or(children) => flat.extend(children),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.pop().unwrap_or(Self::True)
        } else {
            Self::Or(flat)
        }
    }

    /// Returns true if this is the tautology.
    #[must_use]
    pub fn is_true(&self) -> bool {
        matches!(self, Self::True)
    }

    /// Evaluates the condition against one entity.
    ///
    /// `kind` is the entity's kind and `rows` all of its attribute rows.
    #[must_use]
    pub fn evaluate(&self, kind: &str, rows: &[AttributeRow]) -> bool {
        match self {
            Self::True => true,
            Self::Kind(expected) => kind == expected,
            Self::Attribute {
                name,
                type_tag,
                test,
            } => rows.iter().any(|row| {
                row.name == *name
                    && type_tag.map_or(true, |tag| row.type_tag == tag)
                    && test.test(&row.value)
            }),
            Self::And(children) => children.iter().all(|c| c.evaluate(kind, rows)),
            Self::Or(children) => children.iter().any(|c| c.evaluate(kind, rows)),
        }
    }
}

impl fmt::Display for ValueTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => f.write_str("present"),
            Self::Eq(v) => write!(f, "= {v:?}"),
            Self::Ne(v) => write!(f, "<> {v:?}"),
            Self::Lt(v) => write!(f, "< {v:?}"),
            Self::Gt(v) => write!(f, "> {v:?}"),
            Self::ContainsIgnoreCase(v) => write!(f, "contains {v:?}"),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, children: &[Condition], op: &str) -> fmt::Result {
            f.write_str("(")?;
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    write!(f, " {op} ")?;
                }
                write!(f, "{child}")?;
            }
            f.write_str(")")
        }

        match self {
            Self::True => f.write_str("true"),
            Self::Kind(kind) => write!(f, "kind = {kind:?}"),
            Self::Attribute {
                name,
                type_tag,
                test,
            } => match type_tag {
                Some(tag) => write!(f, "{name}:{tag} {test}"),
                None => write!(f, "{name} {test}"),
            },
            Self::And(children) if children.is_empty() => f.write_str("true"),
            Self::Or(children) if children.is_empty() => f.write_str("false"),
            Self::And(children) => join(f, children, "AND"),
            Self::Or(children) => join(f, children, "OR"),
        }
    }
}
