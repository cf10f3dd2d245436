//! Predicate tree.

use crate::error::{CoreError, CoreResult};

/// Comparison on an integer attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegerOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Greater than.
    Gt,
}

/// Comparison on a text attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Lexically less than.
    Lt,
    /// Lexically greater than.
    Gt,
    /// Case-insensitive substring.
    Contains,
}

/// How the children of a group are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupOp {
    /// Every child must match.
    And,
    /// At least one child must match.
    Or,
}

/// A node of a filter predicate.
///
/// Leaves compare one attribute against a literal of the attribute's type.
/// An attribute of another type never matches a comparison, whatever the
/// operator.
///
/// # Example
///
/// ```rust
/// use eavdb_core::{FilterItem, IntegerOp, TextOp};
///
/// let adult_alices = FilterItem::and(
///     FilterItem::integer("age", IntegerOp::Gt, 17),
///     FilterItem::text("name", TextOp::Contains, "alice"),
/// );
/// assert_eq!(adult_alices.leaf_count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterItem {
    /// Boolean attribute equals the value.
    Boolean {
        /// Attribute name.
        attribute: String,
        /// Expected value.
        value: bool,
    },
    /// Integer attribute compared numerically.
    Integer {
        /// Attribute name.
        attribute: String,
        /// Operator.
        op: IntegerOp,
        /// Reference value.
        value: i64,
    },
    /// Text attribute compared lexically or by containment.
    Text {
        /// Attribute name.
        attribute: String,
        /// Operator.
        op: TextOp,
        /// Reference value.
        value: String,
    },
    /// Attribute is set, with any type.
    NotNull {
        /// Attribute name.
        attribute: String,
    },
    /// Two or more children combined with `op`.
    ///
    /// Build groups with [`FilterItem::group`], [`FilterItem::and`] or
    /// [`FilterItem::or`]; [`crate::Filter::new`] rejects hand-built groups
    /// with fewer than two children.
    Group {
        /// Combinator.
        op: GroupOp,
        /// Children, at least two.
        items: Vec<FilterItem>,
    },
}

impl FilterItem {
    /// Boolean equality.
    pub fn boolean(attribute: impl Into<String>, value: bool) -> Self {
        Self::Boolean {
            attribute: attribute.into(),
            value,
        }
    }

    /// Integer comparison.
    pub fn integer(attribute: impl Into<String>, op: IntegerOp, value: i64) -> Self {
        Self::Integer {
            attribute: attribute.into(),
            op,
            value,
        }
    }

    /// Text comparison.
    pub fn text(attribute: impl Into<String>, op: TextOp, value: impl Into<String>) -> Self {
        Self::Text {
            attribute: attribute.into(),
            op,
            value: value.into(),
        }
    }

    /// Presence check.
    pub fn not_null(attribute: impl Into<String>) -> Self {
        Self::NotNull {
            attribute: attribute.into(),
        }
    }

    /// Conjunction of two items.
    #[must_use]
    pub fn and(first: FilterItem, second: FilterItem) -> Self {
        Self::Group {
            op: GroupOp::And,
            items: vec![first, second],
        }
    }

    /// Disjunction of two items.
    #[must_use]
    pub fn or(first: FilterItem, second: FilterItem) -> Self {
        Self::Group {
            op: GroupOp::Or,
            items: vec![first, second],
        }
    }

    /// Group of any number of items.
    ///
    /// # Errors
    ///
    /// Returns a validation error if fewer than two items are given.
    pub fn group(op: GroupOp, items: impl IntoIterator<Item = FilterItem>) -> CoreResult<Self> {
        let items: Vec<_> = items.into_iter().collect();
        if items.len() < 2 {
            return Err(CoreError::validation(format!(
                "a filter group needs at least two items, got {}",
                items.len()
            )));
        }
        Ok(Self::Group { op, items })
    }

    /// Returns the number of leaf comparisons in this tree.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Group { items, .. } => items.iter().map(Self::leaf_count).sum(),
            _ => 1,
        }
    }

    /// Checks the invariants of the whole tree.
    ///
    /// Every leaf must name a non-empty attribute and every group must have
    /// at least two children.
    pub(crate) fn validate(&self) -> CoreResult<()> {
        match self {
            Self::Boolean { attribute, .. }
            | Self::Integer { attribute, .. }
            | Self::Text { attribute, .. }
            | Self::NotNull { attribute } => {
                if attribute.is_empty() {
                    return Err(CoreError::validation("filter attribute name must not be empty"));
                }
                Ok(())
            }
            Self::Group { items, .. } => {
                if items.len() < 2 {
                    return Err(CoreError::validation(format!(
                        "a filter group needs at least two items, got {}",
                        items.len()
                    )));
                }
                items.iter().try_for_each(Self::validate)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_needs_two_items() {
        let one = FilterItem::group(GroupOp::Or, [FilterItem::not_null("a")]);
        assert!(matches!(one, Err(CoreError::Validation { .. })));

        let three = FilterItem::group(
            GroupOp::Or,
            [
                FilterItem::not_null("a"),
                FilterItem::not_null("b"),
                FilterItem::not_null("c"),
            ],
        )
        .unwrap();
        assert_eq!(three.leaf_count(), 3);
    }

    #[test]
    fn validate_rejects_empty_attribute() {
        let item = FilterItem::and(FilterItem::not_null("a"), FilterItem::boolean("", true));
        assert!(item.validate().is_err());
    }

    #[test]
    fn validate_rejects_hand_built_small_group() {
        let item = FilterItem::Group {
            op: GroupOp::And,
            items: vec![FilterItem::not_null("a")],
        };
        assert!(item.validate().is_err());
    }

    #[test]
    fn validate_accepts_nested_tree() {
        let item = FilterItem::or(
            FilterItem::and(
                FilterItem::integer("n", IntegerOp::Gt, 1),
                FilterItem::text("s", TextOp::Eq, "x"),
            ),
            FilterItem::boolean("b", false),
        );
        assert!(item.validate().is_ok());
        assert_eq!(item.leaf_count(), 3);
    }
}
